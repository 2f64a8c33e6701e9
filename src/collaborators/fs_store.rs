use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use reqwest::Client;
use std::path::{Path, PathBuf};

use crate::collaborators::{DocumentStore, SetContentOptions};
use crate::document::{Document, FileInfo, PublicationTarget};
use crate::errors::StoreError;

// @module: Document store backed by the local disk

#[derive(Debug, Default)]
struct FsState {
    current: Option<Document>,
    // source of the markup handed out by the last successful open
    pending_source: Option<FileInfo>,
}

/// Document store reading files from disk and templates from disk or HTTP
#[derive(Debug)]
pub struct FsDocumentStore {
    /// Directory relative template URLs are resolved against
    template_root: PathBuf,
    /// HTTP client for remote templates
    client: Client,
    state: RwLock<FsState>,
}

impl FsDocumentStore {
    pub fn new<P: AsRef<Path>>(template_root: P) -> Self {
        Self {
            template_root: template_root.as_ref().to_path_buf(),
            client: Client::new(),
            state: RwLock::new(FsState::default()),
        }
    }

    /// Override the publication target of the current document
    pub fn set_publication_target(&self, target: PublicationTarget) {
        if let Some(document) = self.state.write().current.as_mut() {
            document.publication_target = Some(target);
        }
    }

    /// Write the current document to `path`
    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let content = self.content().ok_or_else(|| StoreError::Io("no document loaded".to_string()))?;
        tokio::fs::write(path.as_ref(), content).await?;
        Ok(())
    }

    fn resolve_template(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.template_root.join(path)
        }
    }

    async fn fetch_remote(&self, url: &str) -> Result<String, StoreError> {
        let unreachable = |message: String| StoreError::Unreachable {
            service: url::Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| url.to_string()),
            message,
        };

        let response = self.client.get(url).send().await.map_err(|e| unreachable(e.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(unreachable(format!("HTTP {}", status)));
        }
        response.text().await.map_err(|e| unreachable(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    fn has_content(&self) -> bool {
        self.state.read().current.is_some()
    }

    async fn open(&self, file: &FileInfo) -> Result<String, StoreError> {
        debug!("Reading {}", file.path);
        let raw = tokio::fs::read_to_string(&file.path).await?;
        self.state.write().pending_source = Some(file.clone());
        Ok(raw)
    }

    async fn open_from_url(&self, url: &str) -> Result<String, StoreError> {
        let raw = if url.starts_with("http://") || url.starts_with("https://") {
            debug!("Fetching template {}", url);
            self.fetch_remote(url).await?
        } else {
            let path = self.resolve_template(url);
            debug!("Reading template {}", path.display());
            tokio::fs::read_to_string(&path).await?
        };
        // templates are unsaved documents
        self.state.write().pending_source = None;
        Ok(raw)
    }

    async fn set_content(&self, content: String, options: SetContentOptions) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let document = Document::from_markup(content, state.pending_source.clone(), options.validate_compat)?;
        state.pending_source = None;
        state.current = Some(document);
        Ok(())
    }

    fn content(&self) -> Option<String> {
        self.state.read().current.as_ref().map(|d| d.content.clone())
    }

    fn file_info(&self) -> Option<FileInfo> {
        self.state.read().current.as_ref().and_then(|d| d.source.clone())
    }

    fn publication_target(&self) -> Option<PublicationTarget> {
        self.state.read().current.as_ref().and_then(|d| d.publication_target.clone())
    }

    fn title(&self) -> Option<String> {
        self.state.read().current.as_ref().and_then(|d| d.title.clone())
    }
}
