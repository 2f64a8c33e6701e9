/*!
 * Contracts of the collaborators the lifecycle orchestrator drives.
 *
 * The editor owns the real implementations (canvas, dialogs, storage backends).
 * This module only fixes their interfaces, plus a few reference adapters:
 * - `fs_store`: document store backed by the local disk
 * - `http_transport`: JSON publish transport over HTTP
 * - `console`: headless notifier, picker, dialog and editor used by the CLI
 * - `mock`: scripted in-memory collaborators for tests
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tokio::sync::{mpsc, oneshot};

use crate::document::{FileInfo, PublicationTarget};
use crate::errors::{PickerError, StoreError, TransportError};

/// How new content is applied to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetContentOptions {
    /// Check the markup is a loadable document before accepting it
    pub validate_compat: bool,
    /// Show a loading indicator while the content is applied
    pub use_loader: bool,
}

impl Default for SetContentOptions {
    fn default() -> Self {
        Self {
            validate_compat: true,
            use_loader: false,
        }
    }
}

/// Holds the current document, the single source of truth for its content
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Whether a document is currently loaded
    fn has_content(&self) -> bool;

    /// Read the raw markup of a stored file
    async fn open(&self, file: &FileInfo) -> Result<String, StoreError>;

    /// Read the raw markup of a template
    async fn open_from_url(&self, url: &str) -> Result<String, StoreError>;

    /// Replace the current document with the given markup
    async fn set_content(&self, content: String, options: SetContentOptions) -> Result<(), StoreError>;

    /// Markup of the current document
    fn content(&self) -> Option<String>;

    /// Where the current document was opened from
    fn file_info(&self) -> Option<FileInfo>;

    /// Configured publication target of the current document
    fn publication_target(&self) -> Option<PublicationTarget>;

    /// Title of the current document
    fn title(&self) -> Option<String>;
}

/// Mimetype restriction handed to the file picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeFilter {
    pub mimetype: String,
}

impl MimeFilter {
    pub fn new(mimetype: impl Into<String>) -> Self {
        Self { mimetype: mimetype.into() }
    }
}

/// Result of a file picker interaction
#[derive(Debug, Clone, PartialEq)]
pub enum PickerSelection {
    Selected(FileInfo),
    Cancelled,
}

/// External file picker
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Let the user choose a file matching the filter
    async fn open_file(&self, filter: &MimeFilter) -> Result<PickerSelection, PickerError>;
}

/// Signal emitted by the "new website" dialog
#[derive(Debug, Clone, PartialEq)]
pub enum DialogEvent {
    /// The template list is loaded and the dialog is interactive
    Ready,
    /// A recent file was picked, `None` when the dialog was closed
    OpenFileInfo(Option<FileInfo>),
    /// A template was picked, `None` when the dialog was closed
    OpenTemplate(Option<String>),
    /// Listing the templates failed
    Error(String),
}

/// Stream of dialog signals; the dialog is done once the sender side is dropped
pub type DialogEvents = mpsc::UnboundedReceiver<DialogEvent>;

/// External "new website" dialog
pub trait TemplateDialog: Send + Sync {
    fn open(&self) -> DialogEvents;
}

/// What the publish server is asked to deploy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub target: PublicationTarget,
    /// Path of the document being published, `None` for unsaved documents
    pub source_path: Option<String>,
    pub content: String,
}

/// Status payload of an in-flight publish job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishStatus {
    pub status: String,
    #[serde(default)]
    pub stop: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PublishStatus {
    pub fn working(status: impl Into<String>) -> Self {
        Self { status: status.into(), stop: false, url: None }
    }

    pub fn finished(status: impl Into<String>) -> Self {
        Self { status: status.into(), stop: true, url: None }
    }
}

/// Remote service deploying documents
#[async_trait]
pub trait PublishTransport: Send + Sync {
    /// Start a publish job, returning the initial status text on acceptance
    async fn request_publish(&self, request: &PublishRequest) -> Result<String, TransportError>;

    /// Query the status of the running publish job
    async fn query_status(&self) -> Result<PublishStatus, TransportError>;
}

/// Resolves when the alert it was returned for is closed
pub type AlertClosed = oneshot::Receiver<()>;

/// Decorative panel shown next to a long running notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoPanel {
    pub heading: String,
    pub body: String,
}

impl InfoPanel {
    /// Panel shown while a site is being published
    pub fn publish_tips() -> Self {
        Self {
            heading: "Did you know?".to_string(),
            body: "You can keep editing while your site is being published.".to_string(),
        }
    }
}

/// Surfaces alerts, errors and progress text to the user
pub trait NotificationChannel: Send + Sync {
    /// Show a modal alert; the returned receiver resolves when it is closed
    fn alert(&self, message: &str, close_label: Option<&str>) -> AlertClosed;

    fn notify_error(&self, message: &str);

    /// Replace the text of the active notification
    fn set_text(&self, message: &str);

    fn set_info_panel(&self, panel: InfoPanel);

    /// Whether a modal notification is currently displayed
    fn is_active(&self) -> bool;
}

/// Records lifecycle events for observability
pub trait EventSink: Send + Sync {
    fn record_event(&self, category: &str, outcome: &str, action: &str, weight: i32);
}

/// Undo/redo engine of the editor
pub trait UndoHistory: Send + Sync {
    fn reset(&self);
}

/// Pane of the settings dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsPane {
    General,
    Publish,
}

/// View side effects the orchestrator triggers
pub trait EditorView: Send + Sync {
    /// Redraw after a file operation, showing an optional status message
    fn file_operation_success(&self, message: Option<&str>);

    fn open_settings(&self, pane: SettingsPane);

    fn redraw(&self);
}

pub mod console;
pub mod fs_store;
pub mod http_transport;
pub mod mock;
