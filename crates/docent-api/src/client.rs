//! Backend abstraction and the reqwest-based HTTP client

use async_trait::async_trait;
use futures::StreamExt;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    stream::{ByteStream, ChatResponse},
    types::{
        ChatRequest, DeleteFileRequest, FileListEnvelope, FileRecord, JsonReply,
        KnowledgeBaseRequest, LocalUpload, PresignFile, PresignRequest, PresignResponse,
        StatusEnvelope,
    },
};

const CHAT_PATH: &str = "/doc-eval/chat";
const FINAL_FILES_PATH: &str = "/doc-eval/get-final-files";
const ALL_FILES_PATH: &str = "/doc-eval/get-files-and-folders";
const PRESIGN_PATH: &str = "/doc-eval/get-presigned-urls";
const KNOWLEDGE_BASE_PATH: &str = "/doc-eval/create-knowledge-base";
const DELETE_FILE_PATH: &str = "/doc-eval/delete-file";

/// Trait for the backend a chat session talks to
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a query and open its response
    async fn open_chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Files that can scope a query.
    ///
    /// A backend that answers with a failure envelope yields an empty list.
    async fn list_files(&self) -> Result<Vec<FileRecord>>;
}

/// HTTP client for the doc-eval backend
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base URL requests are made against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Every file in every folder, including files not yet indexed
    pub async fn list_all_files(&self) -> Result<Vec<FileRecord>> {
        self.fetch_file_list(ALL_FILES_PATH).await
    }

    /// Upload local files into `folder`.
    ///
    /// Presigned URLs are requested for the whole batch, then each file is
    /// PUT to its URL. The returned records are not yet indexed.
    pub async fn upload_files(
        &self,
        user_id: Uuid,
        folder: &str,
        uploads: Vec<LocalUpload>,
    ) -> Result<Vec<FileRecord>> {
        if uploads.is_empty() {
            return Ok(Vec::new());
        }

        let request = PresignRequest {
            user_id,
            files: uploads
                .iter()
                .map(|u| PresignFile {
                    file_name: u.file_name.clone(),
                    file_type: u.content_type.clone(),
                })
                .collect(),
            folder_name: folder.to_string(),
            thread_id: folder.to_string(),
        };

        let response = self
            .client
            .post(self.url(PRESIGN_PATH))
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let presigned: PresignResponse = response.json().await?;

        if presigned.status_code != Some(200) {
            return Err(Error::Envelope(format!(
                "presign status_code {:?}",
                presigned.status_code
            )));
        }
        if presigned.urls.len() != uploads.len() {
            return Err(Error::UnexpectedResponse(format!(
                "requested {} upload URLs, received {}",
                uploads.len(),
                presigned.urls.len()
            )));
        }

        let puts = presigned
            .urls
            .into_iter()
            .zip(uploads)
            .map(|(target, upload)| async move {
                tracing::debug!("uploading {} to {}", upload.file_name, target.file_url);
                let response = self
                    .client
                    .put(&target.presigned_url)
                    .header(reqwest::header::CONTENT_TYPE, upload.content_type)
                    .body(upload.bytes)
                    .send()
                    .await?;
                ensure_success(response).await?;
                Ok::<_, Error>(FileRecord {
                    file_id: target.file_id,
                    file_name: upload.file_name,
                    folder_path: folder.to_string(),
                    rag_status: false,
                    file_url: Some(target.file_url),
                })
            });

        futures::future::try_join_all(puts).await
    }

    /// Build the knowledge base for one file
    pub async fn create_knowledge_base(
        &self,
        user_id: Uuid,
        file_id: &str,
        folder: &str,
    ) -> Result<()> {
        let request = KnowledgeBaseRequest {
            file_id_list: vec![file_id.to_string()],
            thread_id: folder.to_string(),
            upload_type: "file".to_string(),
            user_id,
        };
        self.post_status(KNOWLEDGE_BASE_PATH, &request).await
    }

    /// Delete a file from a folder
    pub async fn delete_file(&self, file_id: &str, folder: &str) -> Result<()> {
        let request = DeleteFileRequest {
            file_id: file_id.to_string(),
            thread_id: folder.to_string(),
        };
        self.post_status(DELETE_FILE_PATH, &request).await
    }

    async fn post_status<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let response = ensure_success(response).await?;
        let envelope: StatusEnvelope = response.json().await?;
        if envelope.is_success() {
            Ok(())
        } else {
            Err(Error::Envelope(envelope.failure_reason()))
        }
    }

    async fn fetch_file_list(&self, path: &str) -> Result<Vec<FileRecord>> {
        let response = self.client.get(self.url(path)).send().await?;

        if !response.status().is_success() {
            tracing::warn!(
                "file listing {} returned status {}; showing no files",
                path,
                response.status()
            );
            return Ok(Vec::new());
        }

        let envelope: FileListEnvelope = response.json().await?;
        if !envelope.is_success() {
            tracing::warn!(
                "file listing {} failed ({}); showing no files",
                path,
                envelope.failure_reason()
            );
            return Ok(Vec::new());
        }

        Ok(envelope.data.unwrap_or_default())
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        tracing::debug!(
            "opening chat: {} file(s), scope {:?}",
            request.file_id_list.len(),
            request.ticket_id
        );

        let response = self
            .client
            .post(self.url(CHAT_PATH))
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if ChatResponse::is_json_content_type(content_type.as_deref()) {
            let reply: JsonReply = response.json().await?;
            return Ok(ChatResponse::Complete(reply.final_response));
        }

        let body: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()).map_err(Error::from)),
        );
        Ok(ChatResponse::Stream(body))
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.fetch_file_list(FINAL_FILES_PATH).await
    }
}

/// Turn a non-success status into `Error::Status`, keeping the body text
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::status(status.as_u16(), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("http://localhost:8000/");
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(
            backend.url(CHAT_PATH),
            "http://localhost:8000/doc-eval/chat"
        );
    }
}
