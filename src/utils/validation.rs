use crate::error::UploadError;
use std::path::Path;

/// Rejects files larger than the configured limit before anything is stored.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), UploadError> {
    if size > max_size {
        return Err(UploadError::TooLarge {
            size,
            max: max_size,
        });
    }
    Ok(())
}

/// Strips any directory part and replaces characters the remote rejects.
/// Returns an error if nothing usable is left.
pub fn sanitize_filename(filename: &str) -> Result<String, UploadError> {
    // Only the last path component, whichever separator the caller used
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("");
    let name = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(UploadError::InvalidName(filename.to_string()));
    }

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    let sanitized = if sanitized.len() > 255 {
        let mut end = 255;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    };

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_size() {
        let max = 50 * 1024 * 1024;
        assert!(validate_file_size(1024, max).is_ok());
        assert!(validate_file_size(max, max).is_ok());
        assert!(matches!(
            validate_file_size(max + 1, max),
            Err(UploadError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf").unwrap(), "report.pdf");
        assert_eq!(sanitize_filename("my file.doc").unwrap(), "my file.doc");
        assert_eq!(sanitize_filename("a<b>.txt").unwrap(), "a_b_.txt");
        assert_eq!(sanitize_filename("测试.txt").unwrap(), "测试.txt");

        // Directory parts are dropped
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.txt").unwrap(), "notes.txt");

        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("   ").is_err());
        assert!(sanitize_filename("dir/").is_err());
    }
}
