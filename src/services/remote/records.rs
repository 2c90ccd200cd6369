use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::models::{FileDocument, FileRecord};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use url::Url;

/// Metadata half of the remote: one document per stored file.
#[async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Fails with `AlreadyExists` when `document_id` is taken.
    async fn create_record(
        &self,
        document_id: &str,
        document: &FileDocument,
    ) -> Result<FileRecord, RemoteError>;

    async fn get_record(&self, document_id: &str) -> Result<Option<FileRecord>, RemoteError>;
}

/// Document collection behind the backend-as-a-service REST API.
pub struct HttpRecordStore {
    client: reqwest::Client,
    documents_url: Url,
    project_id: Option<String>,
    api_key: Option<String>,
}

impl HttpRecordStore {
    pub fn new(
        client: reqwest::Client,
        documents_url: Url,
        project_id: Option<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            documents_url,
            project_id,
            api_key,
        }
    }

    /// `{RECORDS_API_URL}/databases/{db}/collections/{collection}/documents`
    pub fn from_config(client: reqwest::Client, config: &RemoteConfig) -> anyhow::Result<Self> {
        let base = config
            .records_api_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("RECORDS_API_URL must be set"))?;
        let documents_url = Url::parse(&format!(
            "{}/databases/{}/collections/{}/documents",
            base.trim_end_matches('/'),
            config.records_database_id,
            config.records_collection_id
        ))?;

        Ok(Self::new(
            client,
            documents_url,
            config.records_project_id.clone(),
            config.records_api_key.clone(),
        ))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = match &self.project_id {
            Some(project) => request.header("X-Appwrite-Project", project),
            None => request,
        };
        match &self.api_key {
            Some(key) => request.header("X-Appwrite-Key", key),
            None => request,
        }
    }

    fn document_url(&self, document_id: &str) -> Result<Url, RemoteError> {
        let mut url = self.documents_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Unknown("records URL cannot be a base".to_string()))?
            .push(document_id);
        Ok(url)
    }
}

async fn error_from_response(response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RemoteError::from_status(status, body)
}

#[async_trait]
impl FileRecordStore for HttpRecordStore {
    async fn create_record(
        &self,
        document_id: &str,
        document: &FileDocument,
    ) -> Result<FileRecord, RemoteError> {
        let response = self
            .authorize(self.client.post(self.documents_url.clone()))
            .json(&json!({
                "documentId": document_id,
                "data": document,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<FileRecord>().await?)
    }

    async fn get_record(&self, document_id: &str) -> Result<Option<FileRecord>, RemoteError> {
        let response = self
            .authorize(self.client.get(self.document_url(document_id)?))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(Some(response.json::<FileRecord>().await?))
    }
}
