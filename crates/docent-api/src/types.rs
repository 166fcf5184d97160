//! Wire types for the doc-eval backend

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::error::Result;

/// A document known to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Backend identifier
    pub file_id: String,
    /// Original file name, possibly carrying a `/`-delimited prefix
    pub file_name: String,
    /// `/`-delimited folder the file lives in
    #[serde(alias = "folder_name", default)]
    pub folder_path: String,
    /// Whether the knowledge base for this file has been built
    #[serde(default)]
    pub rag_status: bool,
    /// Storage location of the uploaded object
    #[serde(alias = "s3_file_url", default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl FileRecord {
    /// Create a record with the minimum set of fields
    pub fn new(
        file_id: impl Into<String>,
        file_name: impl Into<String>,
        folder_path: impl Into<String>,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            file_name: file_name.into(),
            folder_path: folder_path.into(),
            rag_status: false,
            file_url: None,
        }
    }

    /// Last path component of the file name
    pub fn display_name(&self) -> &str {
        self.file_name
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.file_name)
    }
}

/// Body of a chat query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub user_id: Uuid,
    pub query_id: String,
    pub file_id_list: Vec<String>,
    pub stream: bool,
    /// Folder scope of the selection, when one is active
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

impl ChatRequest {
    /// Build a streaming request for `query`
    pub fn new(query: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            query: query.into(),
            user_id,
            query_id: format!("query_{}", Uuid::new_v4().simple()),
            file_id_list: Vec::new(),
            stream: true,
            ticket_id: None,
        }
    }

    /// Scope the request to a set of files in one folder
    pub fn with_scope(mut self, file_ids: Vec<String>, folder: Option<String>) -> Self {
        self.file_id_list = file_ids;
        self.ticket_id = folder;
        self
    }
}

/// Non-streaming reply shape
#[derive(Debug, Clone, Deserialize)]
pub struct JsonReply {
    pub final_response: String,
}

/// Generic `{ status_code | status, data }` envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Whether the envelope reports success
    pub fn is_success(&self) -> bool {
        if self.status_code == Some(200) {
            return true;
        }
        match &self.status {
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("success"),
            Some(serde_json::Value::Number(n)) => n.as_u64() == Some(200),
            _ => false,
        }
    }

    /// Description of the failure for logs and notices
    pub fn failure_reason(&self) -> String {
        if let Some(ref message) = self.message {
            return message.clone();
        }
        match (&self.status_code, &self.status) {
            (Some(code), _) => format!("status_code {}", code),
            (None, Some(status)) => format!("status {}", status),
            (None, None) => "missing status".to_string(),
        }
    }
}

/// Envelope for the file listing endpoints
pub type FileListEnvelope = Envelope<Vec<FileRecord>>;

/// Envelope for calls that only report a status
pub type StatusEnvelope = Envelope<serde_json::Value>;

/// A file descriptor sent to obtain a presigned upload URL
#[derive(Debug, Clone, Serialize)]
pub struct PresignFile {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileType")]
    pub file_type: String,
}

/// Request for presigned upload URLs
#[derive(Debug, Clone, Serialize)]
pub struct PresignRequest {
    pub user_id: Uuid,
    pub files: Vec<PresignFile>,
    pub folder_name: String,
    pub thread_id: String,
}

/// One presigned URL, in the order of the requested files
#[derive(Debug, Clone, Deserialize)]
pub struct PresignedUrl {
    pub presigned_url: String,
    pub file_url: String,
    pub file_id: String,
}

/// Response of the presign endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PresignResponse {
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub urls: Vec<PresignedUrl>,
}

/// Request to build the knowledge base for files
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBaseRequest {
    pub file_id_list: Vec<String>,
    pub thread_id: String,
    pub upload_type: String,
    pub user_id: Uuid,
}

/// Request to delete a file
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFileRequest {
    pub file_id: String,
    pub thread_id: String,
}

/// A local file staged for upload
#[derive(Debug, Clone)]
pub struct LocalUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalUpload {
    /// Create an upload, guessing the content type from the extension
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read a local file for upload
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }
}

/// Content type for a file name
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
