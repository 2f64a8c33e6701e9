/*!
 * Common test utilities for the sitecraft test suite
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use sitecraft::app_config::Config;
use sitecraft::collaborators::mock::{
    MockDocumentStore, MockEditor, MockFilePicker, MockNotifications, MockPublishTransport,
    MockTemplateDialog, RecordingEventSink,
};
use sitecraft::collaborators::DialogEvent;
use sitecraft::lifecycle::{Callbacks, EditorContext, LifecycleOrchestrator};
use sitecraft::LifecycleError;

/// URL of the blank template in the default configuration
pub const BLANK_URL: &str = "templates/blank/desktop/editable.html";

/// Minimal valid website markup
pub const BLANK_MARKUP: &str = "<html><head><title>Blank</title></head><body></body></html>";

/// Route test logs through env_logger once per process
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Markup of a site with the given title and an optional publication target
pub fn site_markup(title: &str, target: Option<(&str, &str)>) -> String {
    let meta = match target {
        Some((path, url)) => format!(
            r#"<meta name="publication-path" content='{{"path":"{}","url":"{}"}}'>"#,
            path, url
        ),
        None => String::new(),
    };
    format!("<html><head><title>{}</title>{}</head><body><h1>{}</h1></body></html>", title, meta, title)
}

/// Configuration with fast, deterministic poller timings
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.publish.poll_interval_ms = 1000;
    config.publish.info_panel_delay_ms = Some(2000);
    config
}

/// Mocks wired into an orchestrator, kept around for assertions
pub struct Harness {
    pub store: Arc<MockDocumentStore>,
    pub picker: Arc<MockFilePicker>,
    pub dialog: Arc<MockTemplateDialog>,
    pub transport: Arc<MockPublishTransport>,
    pub notifications: Arc<MockNotifications>,
    pub events: Arc<RecordingEventSink>,
    pub editor: Arc<MockEditor>,
    pub config: Config,
}

impl Harness {
    /// Blank template available, everything else empty or cancelling
    pub fn new() -> Self {
        init_logging();
        Self {
            store: Arc::new(MockDocumentStore::new().with_template(BLANK_URL, BLANK_MARKUP)),
            picker: Arc::new(MockFilePicker::cancelling()),
            dialog: Arc::new(MockTemplateDialog::new(Vec::new())),
            transport: Arc::new(MockPublishTransport::accepting(Vec::new())),
            notifications: Arc::new(MockNotifications::new()),
            events: Arc::new(RecordingEventSink::new()),
            editor: Arc::new(MockEditor::new()),
            config: test_config(),
        }
    }

    pub fn with_store(mut self, store: MockDocumentStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn with_picker(mut self, picker: MockFilePicker) -> Self {
        self.picker = Arc::new(picker);
        self
    }

    pub fn with_dialog(mut self, events: Vec<DialogEvent>) -> Self {
        self.dialog = Arc::new(MockTemplateDialog::new(events));
        self
    }

    pub fn with_transport(mut self, transport: MockPublishTransport) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_notifications(mut self, notifications: MockNotifications) -> Self {
        self.notifications = Arc::new(notifications);
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.config.publish.max_polls = Some(max_polls);
        self
    }

    pub fn context(&self) -> EditorContext {
        EditorContext {
            store: self.store.clone(),
            file_picker: self.picker.clone(),
            template_dialog: self.dialog.clone(),
            transport: self.transport.clone(),
            notifications: self.notifications.clone(),
            events: self.events.clone(),
            undo: self.editor.clone(),
            view: self.editor.clone(),
        }
    }

    pub fn orchestrator(&self) -> LifecycleOrchestrator {
        LifecycleOrchestrator::new(self.context(), self.config.clone())
    }
}

/// Duration of `n` poll intervals of the test configuration
pub fn intervals(n: u64) -> Duration {
    Duration::from_millis(1000 * n)
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// How a set of continuations settled
#[derive(Debug, Clone, PartialEq)]
pub enum Settled<T> {
    Success(T),
    Error(LifecycleError),
    Cancel,
}

/// Records every continuation call, so tests can check a set settles once
pub struct Recorder<T> {
    calls: Arc<Mutex<Vec<Settled<T>>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Continuations pushing into this recorder
    pub fn callbacks(&self) -> Callbacks<T> {
        let (success, error, cancel) = (self.calls.clone(), self.calls.clone(), self.calls.clone());
        Callbacks::new()
            .on_success(move |value| success.lock().push(Settled::Success(value)))
            .on_error(move |e| error.lock().push(Settled::Error(e)))
            .on_cancel(move || cancel.lock().push(Settled::Cancel))
    }

    pub fn calls(&self) -> Vec<Settled<T>> {
        self.calls.lock().clone()
    }
}
