//! Open WebUI implementation of the knowledge API: bearer-token HTTP client over reqwest.
//!
//! Every request carries `Authorization: Bearer <api_key>` and
//! `Accept: application/json`. Any non-2xx response becomes
//! [`SyncError::Remote`] with the status and the response body; transport
//! failures and unreadable JSON become a `Remote` error without a status.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::KnowledgeConfig;
use crate::contract::{KnowledgeApi, KnowledgeFile, ProcessStatus, UploadedFile};
use crate::error::SyncError;

pub struct OpenWebUiClient {
    http: Client,
    api_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct FileIdBody<'a> {
    file_id: &'a str,
}

/// The collection listing comes either wrapped in `items` or as a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum FileListing {
    Wrapped { items: Vec<KnowledgeFile> },
    Bare(Vec<KnowledgeFile>),
}

impl FileListing {
    fn into_files(self) -> Vec<KnowledgeFile> {
        match self {
            FileListing::Wrapped { items } => items,
            FileListing::Bare(items) => items,
        }
    }
}

impl OpenWebUiClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_url, api_key)
    }

    pub fn with_client(http: Client, api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            api_url,
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &KnowledgeConfig) -> Self {
        tracing::info!(
            api_url = %config.api_url,
            api_key_set = !config.api_key.is_empty(),
            "Initialised Open WebUI client"
        );
        Self::new(config.api_url.clone(), config.api_key.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SyncError> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), body = %body, "Knowledge API returned an error");
        Err(SyncError::remote(status.as_u16(), body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SyncError> {
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SyncError::Remote {
            status: Some(status),
            body: format!("unexpected response body ({e}): {body}"),
        })
    }
}

#[async_trait]
impl KnowledgeApi for OpenWebUiClient {
    async fn list_files(&self, knowledge_id: &str) -> Result<Vec<KnowledgeFile>, SyncError> {
        let request = self
            .http
            .get(self.url(&format!("/api/v1/knowledge/{knowledge_id}/files")));
        let listing: FileListing = self.send_json(request).await?;
        Ok(listing.into_files())
    }

    async fn remove_file(&self, knowledge_id: &str, file_id: &str) -> Result<(), SyncError> {
        let request = self
            .http
            .post(self.url(&format!("/api/v1/knowledge/{knowledge_id}/file/remove")))
            .json(&FileIdBody { file_id });
        self.send(request).await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<UploadedFile, SyncError> {
        let part = Part::bytes(content).file_name(filename.to_string());
        let form = Form::new().part("file", part);
        let request = self.http.post(self.url("/api/v1/files/")).multipart(form);
        self.send_json(request).await
    }

    async fn process_status(&self, file_id: &str) -> Result<ProcessStatus, SyncError> {
        let request = self
            .http
            .get(self.url(&format!("/api/v1/files/{file_id}/process/status")));
        self.send_json(request).await
    }

    async fn add_file(&self, knowledge_id: &str, file_id: &str) -> Result<(), SyncError> {
        let request = self
            .http
            .post(self.url(&format!("/api/v1/knowledge/{knowledge_id}/file/add")))
            .json(&FileIdBody { file_id });
        self.send(request).await?;
        Ok(())
    }
}
