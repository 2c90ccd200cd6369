use serde::{Deserialize, Serialize};
use std::path::Path;
use utoipa::ToSchema;

/// Coarse category used by the file browser to pick icons and filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Document,
    Image,
    Video,
    Audio,
    Other,
}

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "xls", "xlsx", "csv", "rtf", "ods", "ppt", "odp", "md", "html",
    "htm", "epub", "pages", "fig", "psd", "ai", "indd", "xd", "sketch", "afdesign", "afphoto",
];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac"];

/// Returns the category and lowercase extension ("" when there is none).
pub fn classify_file(file_name: &str) -> (FileType, String) {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let file_type = match extension.as_str() {
        "" => FileType::Other,
        ext if DOCUMENT_EXTENSIONS.contains(&ext) => FileType::Document,
        ext if IMAGE_EXTENSIONS.contains(&ext) => FileType::Image,
        ext if VIDEO_EXTENSIONS.contains(&ext) => FileType::Video,
        ext if AUDIO_EXTENSIONS.contains(&ext) => FileType::Audio,
        _ => FileType::Other,
    };

    (file_type, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_file() {
        assert_eq!(classify_file("report.PDF"), (FileType::Document, "pdf".to_string()));
        assert_eq!(classify_file("holiday.jpeg"), (FileType::Image, "jpeg".to_string()));
        assert_eq!(classify_file("clip.mkv"), (FileType::Video, "mkv".to_string()));
        assert_eq!(classify_file("song.flac"), (FileType::Audio, "flac".to_string()));
        assert_eq!(classify_file("archive.tar.gz"), (FileType::Other, "gz".to_string()));
        assert_eq!(classify_file("Makefile"), (FileType::Other, String::new()));
    }
}
