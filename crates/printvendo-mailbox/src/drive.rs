//! Google Drive v3 implementation of the mailbox store.
//!
//! Machines are provisioned one folder each, named `machine_<id>`, under a
//! fixed root folder. Entries are plain files inside that folder, located by
//! name-scoped list queries. Folder ids are cached for the adapter's
//! lifetime: the mapping from machine id to folder never changes while a
//! deployment is live.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use printvendo_types::constants::STORE_OP_TIMEOUT_MS;
use printvendo_types::{EntryName, MachineId};

use crate::error::{MailboxError, Result};
use crate::traits::{EntryRef, FolderRef, Mailbox};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Subfolders created alongside every machine folder.
const MACHINE_SUBFOLDERS: [&str; 4] = ["requests", "responses", "prints", "payments"];

/// Connection settings for the Drive backend.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Folder under which all machine folders live.
    pub root_folder_id: String,
    /// OAuth bearer token for the service account.
    pub access_token: String,
    /// Metadata API base.
    pub api_base: String,
    /// Upload API base.
    pub upload_base: String,
    /// Bound on any single store operation.
    pub op_timeout: Duration,
}

impl DriveConfig {
    /// Config for the public Drive API.
    pub fn new(root_folder_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            root_folder_id: root_folder_id.into(),
            access_token: access_token.into(),
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
            op_timeout: Duration::from_millis(STORE_OP_TIMEOUT_MS),
        }
    }

    /// Point at a different API host (testing, proxies).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Point at a different upload host.
    pub fn with_upload_base(mut self, upload_base: impl Into<String>) -> Self {
        self.upload_base = upload_base.into();
        self
    }

    /// Override the per-operation timeout.
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct FileMeta {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileMeta>,
}

/// Mailbox store backed by the Google Drive v3 REST API.
pub struct DriveMailbox {
    client: Client,
    config: DriveConfig,
    /// machine folder name -> folder id
    folder_cache: RwLock<HashMap<String, String>>,
}

impl DriveMailbox {
    /// Create an adapter over a shared HTTP client.
    pub fn new(client: Client, config: DriveConfig) -> Self {
        Self {
            client,
            config,
            folder_cache: RwLock::new(HashMap::new()),
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &'static str) -> Result<Response> {
        req.timeout(self.config.op_timeout)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MailboxError::Timeout(what.to_string())
                } else {
                    MailboxError::Network(e)
                }
            })
    }

    async fn expect_success(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        Err(MailboxError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn query_files(&self, q: String) -> Result<Vec<FileMeta>> {
        let req = self
            .client
            .get(format!("{}/files", self.config.api_base))
            .query(&[
                ("q", q.as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
                ("orderBy", "createdTime desc"),
            ]);
        let resp = Self::expect_success(self.send(req, "list files").await?).await?;
        let list: FileList = resp
            .json()
            .await
            .map_err(|e| MailboxError::InvalidResponse(e.to_string()))?;
        Ok(list.files)
    }

    async fn lookup_folder(&self, machine: &MachineId) -> Result<Option<String>> {
        let folder_name = machine.folder_name();
        if let Some(id) = self.folder_cache.read().unwrap().get(&folder_name) {
            return Ok(Some(id.clone()));
        }

        // Machine ids are restricted to [A-Za-z0-9_-], so interpolating the
        // folder name into the query is quote-safe.
        let q = format!(
            "mimeType='{FOLDER_MIME}' and name='{folder_name}' and '{}' in parents and trashed=false",
            self.config.root_folder_id
        );
        let files = self.query_files(q).await?;

        match files.into_iter().next() {
            Some(meta) => {
                debug!(machine = %machine, folder_id = %meta.id, "resolved machine folder");
                self.folder_cache
                    .write()
                    .unwrap()
                    .insert(folder_name, meta.id.clone());
                Ok(Some(meta.id))
            }
            None => Ok(None),
        }
    }

    async fn create_folder(&self, name: &str, parent: &str) -> Result<String> {
        let req = self
            .client
            .post(format!("{}/files", self.config.api_base))
            .query(&[("fields", "id, name")])
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent],
            }));
        let resp = Self::expect_success(self.send(req, "create folder").await?).await?;
        let meta: FileMeta = resp
            .json()
            .await
            .map_err(|e| MailboxError::InvalidResponse(e.to_string()))?;
        Ok(meta.id)
    }

    async fn find_in_folder(&self, folder: &FolderRef, file_name: &str) -> Result<Option<EntryRef>> {
        let q = format!(
            "name='{file_name}' and '{}' in parents and trashed=false",
            folder.id
        );
        let files = self.query_files(q).await?;
        Ok(files.into_iter().next().map(|meta| EntryRef {
            id: meta.id,
            name: if meta.name.is_empty() {
                file_name.to_string()
            } else {
                meta.name
            },
        }))
    }

    async fn download(&self, entry_id: &str) -> Result<Vec<u8>> {
        let req = self
            .client
            .get(format!("{}/files/{entry_id}", self.config.api_base))
            .query(&[("alt", "media")]);
        let resp = Self::expect_success(self.send(req, "download entry").await?).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| MailboxError::InvalidResponse(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Mailbox for DriveMailbox {
    async fn ensure_folder(&self, machine: &MachineId) -> Result<FolderRef> {
        match self.lookup_folder(machine).await? {
            Some(id) => Ok(FolderRef { id }),
            None => Err(MailboxError::FolderNotFound(machine.to_string())),
        }
    }

    async fn provision(&self, machine: &MachineId) -> Result<FolderRef> {
        if let Some(id) = self.lookup_folder(machine).await? {
            return Ok(FolderRef { id });
        }

        let folder_name = machine.folder_name();
        let folder_id = self
            .create_folder(&folder_name, &self.config.root_folder_id)
            .await?;
        for subfolder in MACHINE_SUBFOLDERS {
            self.create_folder(subfolder, &folder_id).await?;
        }

        debug!(machine = %machine, folder_id = %folder_id, "provisioned machine folder");
        self.folder_cache
            .write()
            .unwrap()
            .insert(folder_name, folder_id.clone());
        Ok(FolderRef { id: folder_id })
    }

    async fn write(&self, folder: &FolderRef, name: &EntryName, bytes: &[u8]) -> Result<EntryRef> {
        let boundary = "printvendo_mailbox_boundary";
        let body = multipart_related_body(
            name.file_name(),
            &folder.id,
            name.content_type(),
            bytes,
            boundary,
        );

        let req = self
            .client
            .post(format!("{}/files", self.config.upload_base))
            .query(&[("uploadType", "multipart"), ("fields", "id, name")])
            .header(
                "Content-Type",
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);
        let resp = Self::expect_success(self.send(req, "upload entry").await?).await?;
        let meta: FileMeta = resp
            .json()
            .await
            .map_err(|e| MailboxError::InvalidResponse(e.to_string()))?;

        debug!(entry = %name, id = %meta.id, size = bytes.len(), "wrote mailbox entry");
        Ok(EntryRef {
            id: meta.id,
            name: name.file_name().to_string(),
        })
    }

    async fn read(&self, folder: &FolderRef, name: &EntryName) -> Result<Option<Vec<u8>>> {
        match self.find_in_folder(folder, name.file_name()).await? {
            Some(entry) => Ok(Some(self.download(&entry.id).await?)),
            None => Ok(None),
        }
    }

    async fn find(&self, folder: &FolderRef, name: &EntryName) -> Result<Option<EntryRef>> {
        self.find_in_folder(folder, name.file_name()).await
    }

    async fn delete(&self, entry: &EntryRef) -> Result<bool> {
        let req = self
            .client
            .delete(format!("{}/files/{}", self.config.api_base, entry.id));
        let resp = self.send(req, "delete entry").await?;

        // 404 means another consumer already deleted the entry; losing that
        // race is a normal outcome, not a failure.
        if resp.status().as_u16() == 404 {
            debug!(entry = %entry.name, "delete lost the race");
            return Ok(false);
        }
        Self::expect_success(resp).await?;
        Ok(true)
    }

    async fn list(&self, folder: &FolderRef) -> Result<Vec<EntryRef>> {
        let q = format!(
            "'{}' in parents and mimeType != '{FOLDER_MIME}' and trashed=false",
            folder.id
        );
        let files = self.query_files(q).await?;
        Ok(files
            .into_iter()
            .map(|meta| EntryRef {
                id: meta.id,
                name: meta.name,
            })
            .collect())
    }

    async fn purge(&self, folder: &FolderRef) -> Result<u32> {
        let mut deleted = 0u32;

        for entry in self.list(folder).await? {
            match self.delete(&entry).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => warn!(entry = %entry.name, error = %e, "failed to delete during purge"),
            }
        }

        // One level of subfolders (requests/responses/prints/payments).
        let q = format!(
            "'{}' in parents and mimeType = '{FOLDER_MIME}' and trashed=false",
            folder.id
        );
        for sub in self.query_files(q).await? {
            let sub_ref = FolderRef { id: sub.id };
            for entry in self.list(&sub_ref).await? {
                match self.delete(&entry).await {
                    Ok(true) => deleted += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(entry = %entry.name, error = %e, "failed to delete during purge")
                    }
                }
            }
        }

        debug!(folder = %folder.id, deleted, "purged mailbox folder");
        Ok(deleted)
    }
}

/// Assemble a `multipart/related` upload body: a JSON metadata part naming
/// the file and its parent folder, then the media part.
fn multipart_related_body(
    file_name: &str,
    parent_id: &str,
    content_type: &str,
    bytes: &[u8],
    boundary: &str,
) -> Vec<u8> {
    let metadata = json!({
        "name": file_name,
        "parents": [parent_id],
    });

    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_related_body("prompt.txt", "folder123", "text/plain", b"hello", "XYZ");
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--XYZ\r\n"));
        assert!(text.contains("Content-Type: application/json; charset=UTF-8"));
        assert!(text.contains("\"name\":\"prompt.txt\""));
        assert!(text.contains("\"parents\":[\"folder123\"]"));
        assert!(text.contains("Content-Type: text/plain\r\n\r\nhello"));
        assert!(text.ends_with("\r\n--XYZ--\r\n"));
    }

    #[test]
    fn test_config_defaults() {
        let config = DriveConfig::new("root", "token");
        assert_eq!(config.api_base, "https://www.googleapis.com/drive/v3");
        assert_eq!(config.upload_base, "https://www.googleapis.com/upload/drive/v3");
        assert_eq!(config.op_timeout, Duration::from_millis(STORE_OP_TIMEOUT_MS));
    }

    #[test]
    fn test_config_builder() {
        let config = DriveConfig::new("root", "token")
            .with_api_base("http://localhost:9999/drive")
            .with_upload_base("http://localhost:9999/upload")
            .with_op_timeout(Duration::from_secs(1));
        assert_eq!(config.api_base, "http://localhost:9999/drive");
        assert_eq!(config.upload_base, "http://localhost:9999/upload");
        assert_eq!(config.op_timeout, Duration::from_secs(1));
    }
}
