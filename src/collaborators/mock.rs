/*!
 * Mock collaborator implementations for testing.
 *
 * Every mock records what the orchestrator asked of it so tests can assert on
 * call counts and ordering:
 * - `MockDocumentStore` - in-memory files and templates, scripted failures
 * - `MockFilePicker` - selects, cancels or fails
 * - `MockTemplateDialog` - replays a scripted list of dialog events
 * - `MockPublishTransport` - accepts or rejects, then replays scripted statuses
 * - `MockNotifications` - records notices, keeps alerts open until dismissed
 * - `RecordingEventSink` / `MockEditor` - record events, undo resets and view calls
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};

use crate::collaborators::{
    AlertClosed, DialogEvent, DialogEvents, DocumentStore, EditorView, EventSink, FilePicker, InfoPanel,
    MimeFilter, NotificationChannel, PickerSelection, PublishRequest, PublishStatus, PublishTransport,
    SetContentOptions, SettingsPane, TemplateDialog, UndoHistory,
};
use crate::document::{Document, FileInfo, PublicationTarget};
use crate::errors::{PickerError, StoreError, TransportError};

// =============================================================================
// Document store
// =============================================================================

#[derive(Debug, Default)]
struct StoreState {
    current: Option<Document>,
    pending_source: Option<FileInfo>,
    files: HashMap<String, Result<String, StoreError>>,
    templates: HashMap<String, Result<String, StoreError>>,
    opened: Vec<FileInfo>,
    url_loads: Vec<String>,
    set_content_calls: usize,
}

/// In-memory document store with scripted files and templates
#[derive(Debug, Default)]
pub struct MockDocumentStore {
    state: Mutex<StoreState>,
}

impl MockDocumentStore {
    /// An empty store that knows no files or templates
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for the file at `path`
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.state.lock().files.insert(path.to_string(), Ok(content.to_string()));
        self
    }

    /// Fail when the file at `path` is opened
    pub fn with_failing_file(self, path: &str, error: StoreError) -> Self {
        self.state.lock().files.insert(path.to_string(), Err(error));
        self
    }

    /// Serve `content` for the template at `url`
    pub fn with_template(self, url: &str, content: &str) -> Self {
        self.state.lock().templates.insert(url.to_string(), Ok(content.to_string()));
        self
    }

    /// Fail when the template at `url` is loaded
    pub fn with_failing_template(self, url: &str, error: StoreError) -> Self {
        self.state.lock().templates.insert(url.to_string(), Err(error));
        self
    }

    /// Start with a document already loaded
    pub fn with_document(self, document: Document) -> Self {
        self.state.lock().current = Some(document);
        self
    }

    /// Currently loaded document
    pub fn current(&self) -> Option<Document> {
        self.state.lock().current.clone()
    }

    /// Files passed to `open`, in call order
    pub fn opened(&self) -> Vec<FileInfo> {
        self.state.lock().opened.clone()
    }

    /// URLs passed to `open_from_url`, in call order
    pub fn url_loads(&self) -> Vec<String> {
        self.state.lock().url_loads.clone()
    }

    pub fn set_content_calls(&self) -> usize {
        self.state.lock().set_content_calls
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    fn has_content(&self) -> bool {
        self.state.lock().current.is_some()
    }

    async fn open(&self, file: &FileInfo) -> Result<String, StoreError> {
        let mut state = self.state.lock();
        state.opened.push(file.clone());
        let result = state
            .files
            .get(&file.path)
            .cloned()
            .unwrap_or_else(|| Err(StoreError::NotFound(file.path.clone())));
        if result.is_ok() {
            state.pending_source = Some(file.clone());
        }
        result
    }

    async fn open_from_url(&self, url: &str) -> Result<String, StoreError> {
        let mut state = self.state.lock();
        state.url_loads.push(url.to_string());
        let result = state
            .templates
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(StoreError::NotFound(url.to_string())));
        if result.is_ok() {
            state.pending_source = None;
        }
        result
    }

    async fn set_content(&self, content: String, options: SetContentOptions) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.set_content_calls += 1;
        let source = state.pending_source.clone();
        let document = Document::from_markup(content, source, options.validate_compat)?;
        state.pending_source = None;
        state.current = Some(document);
        Ok(())
    }

    fn content(&self) -> Option<String> {
        self.state.lock().current.as_ref().map(|d| d.content.clone())
    }

    fn file_info(&self) -> Option<FileInfo> {
        self.state.lock().current.as_ref().and_then(|d| d.source.clone())
    }

    fn publication_target(&self) -> Option<PublicationTarget> {
        self.state.lock().current.as_ref().and_then(|d| d.publication_target.clone())
    }

    fn title(&self) -> Option<String> {
        self.state.lock().current.as_ref().and_then(|d| d.title.clone())
    }
}

// =============================================================================
// File picker and template dialog
// =============================================================================

/// What the mock file picker does when asked for a file
#[derive(Debug, Clone, PartialEq)]
pub enum PickerBehavior {
    Select(FileInfo),
    Cancel,
    Fail(String),
}

/// File picker with a fixed answer
#[derive(Debug)]
pub struct MockFilePicker {
    behavior: PickerBehavior,
    filters: Mutex<Vec<MimeFilter>>,
}

impl MockFilePicker {
    pub fn new(behavior: PickerBehavior) -> Self {
        Self {
            behavior,
            filters: Mutex::new(Vec::new()),
        }
    }

    pub fn selecting(file: FileInfo) -> Self {
        Self::new(PickerBehavior::Select(file))
    }

    pub fn cancelling() -> Self {
        Self::new(PickerBehavior::Cancel)
    }

    pub fn failing(message: &str) -> Self {
        Self::new(PickerBehavior::Fail(message.to_string()))
    }

    /// Filters the picker was opened with
    pub fn filters(&self) -> Vec<MimeFilter> {
        self.filters.lock().clone()
    }
}

#[async_trait]
impl FilePicker for MockFilePicker {
    async fn open_file(&self, filter: &MimeFilter) -> Result<PickerSelection, PickerError> {
        self.filters.lock().push(filter.clone());
        match &self.behavior {
            PickerBehavior::Select(file) => Ok(PickerSelection::Selected(file.clone())),
            PickerBehavior::Cancel => Ok(PickerSelection::Cancelled),
            PickerBehavior::Fail(message) => Err(PickerError::Failed(message.clone())),
        }
    }
}

/// Template dialog replaying a scripted list of events, then closing
#[derive(Debug, Default)]
pub struct MockTemplateDialog {
    script: Vec<DialogEvent>,
    opens: AtomicUsize,
}

impl MockTemplateDialog {
    pub fn new(script: Vec<DialogEvent>) -> Self {
        Self {
            script,
            opens: AtomicUsize::new(0),
        }
    }

    /// Number of times the dialog was opened
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl TemplateDialog for MockTemplateDialog {
    fn open(&self) -> DialogEvents {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        for event in &self.script {
            let _ = tx.send(event.clone());
        }
        rx
    }
}

// =============================================================================
// Publish transport
// =============================================================================

/// Publish transport with a scripted acceptance and status sequence
///
/// Once the script is exhausted, queries return the `forever` status when one is
/// set, or a connection error otherwise.
#[derive(Debug)]
pub struct MockPublishTransport {
    acceptance: Result<String, TransportError>,
    statuses: Mutex<VecDeque<Result<PublishStatus, TransportError>>>,
    forever: Option<PublishStatus>,
    requests: Mutex<Vec<PublishRequest>>,
    queries: AtomicUsize,
}

impl MockPublishTransport {
    /// Accept the request, then answer queries from `statuses`
    pub fn accepting(statuses: Vec<Result<PublishStatus, TransportError>>) -> Self {
        Self {
            acceptance: Ok("Publication started".to_string()),
            statuses: Mutex::new(statuses.into()),
            forever: None,
            requests: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
        }
    }

    /// Accept the request and report `status` on every query
    pub fn always(status: PublishStatus) -> Self {
        let mut transport = Self::accepting(Vec::new());
        transport.forever = Some(status);
        transport
    }

    /// Refuse the request
    pub fn rejecting(message: &str) -> Self {
        let mut transport = Self::accepting(Vec::new());
        transport.acceptance = Err(TransportError::Rejected(message.to_string()));
        transport
    }

    /// Publish requests received
    pub fn requests(&self) -> Vec<PublishRequest> {
        self.requests.lock().clone()
    }

    /// Number of status queries received
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublishTransport for MockPublishTransport {
    async fn request_publish(&self, request: &PublishRequest) -> Result<String, TransportError> {
        self.requests.lock().push(request.clone());
        self.acceptance.clone()
    }

    async fn query_status(&self) -> Result<PublishStatus, TransportError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().pop_front() {
            Some(result) => result,
            None => match &self.forever {
                Some(status) => Ok(status.clone()),
                None => Err(TransportError::Connection("no scripted status left".to_string())),
            },
        }
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Something shown to the user
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Alert { message: String, close_label: Option<String> },
    Error(String),
    Text(String),
    InfoPanel(InfoPanel),
}

#[derive(Debug, Default)]
struct NotifierState {
    notices: Vec<Notice>,
    open_alerts: Vec<oneshot::Sender<()>>,
    modal_active: bool,
}

/// Notification channel recording every notice
///
/// Alerts stay open until `dismiss_alerts` is called, unless the channel was built
/// with `auto_dismissing`.
#[derive(Debug, Default)]
pub struct MockNotifications {
    state: Mutex<NotifierState>,
    auto_dismiss: bool,
}

impl MockNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts are closed as soon as they are shown
    pub fn auto_dismissing() -> Self {
        Self {
            auto_dismiss: true,
            ..Self::default()
        }
    }

    /// Pretend a modal notification is already displayed
    pub fn with_active_modal(self) -> Self {
        self.state.lock().modal_active = true;
        self
    }

    /// Close every open alert
    pub fn dismiss_alerts(&self) {
        let senders: Vec<_> = self.state.lock().open_alerts.drain(..).collect();
        for sender in senders {
            let _ = sender.send(());
        }
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.state.lock().notices.clone()
    }

    /// Messages of the alerts shown
    pub fn alerts(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Alert { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Error notifications shown
    pub fn errors(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Progress texts set, in order
    pub fn texts(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                Notice::Text(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn info_panels(&self) -> usize {
        self.notices()
            .iter()
            .filter(|n| matches!(n, Notice::InfoPanel(_)))
            .count()
    }
}

impl NotificationChannel for MockNotifications {
    fn alert(&self, message: &str, close_label: Option<&str>) -> AlertClosed {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock();
        state.notices.push(Notice::Alert {
            message: message.to_string(),
            close_label: close_label.map(str::to_string),
        });
        if self.auto_dismiss {
            let _ = tx.send(());
        } else {
            state.open_alerts.push(tx);
        }
        rx
    }

    fn notify_error(&self, message: &str) {
        self.state.lock().notices.push(Notice::Error(message.to_string()));
    }

    fn set_text(&self, message: &str) {
        self.state.lock().notices.push(Notice::Text(message.to_string()));
    }

    fn set_info_panel(&self, panel: InfoPanel) {
        self.state.lock().notices.push(Notice::InfoPanel(panel));
    }

    fn is_active(&self) -> bool {
        let state = self.state.lock();
        state.modal_active || !state.open_alerts.is_empty()
    }
}

// =============================================================================
// Events, undo history and view
// =============================================================================

/// One recorded lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub category: String,
    pub outcome: String,
    pub action: String,
    pub weight: i32,
}

/// Event sink keeping every event in memory
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Number of events with the given outcome and action
    pub fn count(&self, outcome: &str, action: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.outcome == outcome && e.action == action)
            .count()
    }
}

impl EventSink for RecordingEventSink {
    fn record_event(&self, category: &str, outcome: &str, action: &str, weight: i32) {
        self.events.lock().push(RecordedEvent {
            category: category.to_string(),
            outcome: outcome.to_string(),
            action: action.to_string(),
            weight,
        });
    }
}

/// Undo history and view recording what the orchestrator triggered
#[derive(Debug, Default)]
pub struct MockEditor {
    undo_resets: AtomicUsize,
    redraws: AtomicUsize,
    successes: Mutex<Vec<Option<String>>>,
    settings: Mutex<Vec<SettingsPane>>,
}

impl MockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn undo_resets(&self) -> usize {
        self.undo_resets.load(Ordering::SeqCst)
    }

    pub fn redraws(&self) -> usize {
        self.redraws.load(Ordering::SeqCst)
    }

    /// Messages passed to `file_operation_success`
    pub fn successes(&self) -> Vec<Option<String>> {
        self.successes.lock().clone()
    }

    /// Settings panes opened
    pub fn settings_opened(&self) -> Vec<SettingsPane> {
        self.settings.lock().clone()
    }
}

impl UndoHistory for MockEditor {
    fn reset(&self) {
        self.undo_resets.fetch_add(1, Ordering::SeqCst);
    }
}

impl EditorView for MockEditor {
    fn file_operation_success(&self, message: Option<&str>) {
        self.successes.lock().push(message.map(str::to_string));
    }

    fn open_settings(&self, pane: SettingsPane) {
        self.settings.lock().push(pane);
    }

    fn redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }
}
