/*!
 * Headless collaborators used by the command line.
 *
 * There is no canvas or dialog in a terminal: selections come from command line
 * arguments, notifications are printed, and publish progress is shown with an
 * indicatif spinner.
 */

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::collaborators::{
    AlertClosed, DialogEvent, DialogEvents, EditorView, EventSink, FilePicker, InfoPanel, MimeFilter,
    NotificationChannel, PickerSelection, SettingsPane, TemplateDialog, UndoHistory,
};
use crate::document::FileInfo;
use crate::errors::PickerError;

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<[^>]+>").unwrap()
});

/// Drop markup tags from a notification text
pub fn strip_tags(message: &str) -> String {
    TAG_REGEX.replace_all(message, "").trim().to_string()
}

/// Notification channel printing to the terminal
///
/// Alerts without a close button are acknowledged as soon as they are printed.
/// Alerts with one stay open, with a spinner, until `dismiss_all` is called.
#[derive(Default)]
pub struct ConsoleNotifier {
    spinner: Mutex<Option<ProgressBar>>,
    open_alerts: Mutex<Vec<oneshot::Sender<()>>>,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close every open alert and stop the spinner
    pub fn dismiss_all(&self) {
        for sender in self.open_alerts.lock().drain(..) {
            let _ = sender.send(());
        }
        if let Some(spinner) = self.spinner.lock().take() {
            spinner.finish();
        }
    }

    fn start_spinner(&self, message: String) {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(message);
        if let Some(previous) = self.spinner.lock().replace(spinner) {
            previous.finish_and_clear();
        }
    }
}

impl NotificationChannel for ConsoleNotifier {
    fn alert(&self, message: &str, close_label: Option<&str>) -> AlertClosed {
        let (tx, rx) = oneshot::channel();
        let text = strip_tags(message);
        match close_label {
            None => {
                println!("{}", text);
                let _ = tx.send(());
            }
            Some(_) => {
                self.start_spinner(text);
                self.open_alerts.lock().push(tx);
            }
        }
        rx
    }

    fn notify_error(&self, message: &str) {
        error!("{}", strip_tags(message));
    }

    fn set_text(&self, message: &str) {
        let text = strip_tags(message);
        match self.spinner.lock().as_ref() {
            Some(spinner) => spinner.set_message(text),
            None => println!("{}", text),
        }
    }

    fn set_info_panel(&self, panel: InfoPanel) {
        let line = format!("{} {}", panel.heading, panel.body);
        match self.spinner.lock().as_ref() {
            Some(spinner) => spinner.println(line),
            None => println!("{}", line),
        }
    }

    fn is_active(&self) -> bool {
        !self.open_alerts.lock().is_empty()
    }
}

/// Event sink writing lifecycle events to the log
#[derive(Debug, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn record_event(&self, category: &str, outcome: &str, action: &str, weight: i32) {
        debug!("[{}] {} {} ({:+})", category, action, outcome, weight);
    }
}

/// File picker answering with a path given on the command line
#[derive(Debug, Default)]
pub struct PathFilePicker {
    path: Option<PathBuf>,
}

impl PathFilePicker {
    /// `None` behaves like a user cancelling the picker
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

// Mimetype of a path, guessed from its extension
fn guess_mimetype(path: &std::path::Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "html" | "htm" => Some("text/html"),
        "json" => Some("application/json"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

#[async_trait]
impl FilePicker for PathFilePicker {
    async fn open_file(&self, filter: &MimeFilter) -> Result<PickerSelection, PickerError> {
        let Some(path) = &self.path else {
            return Ok(PickerSelection::Cancelled);
        };

        if !path.is_file() {
            return Err(PickerError::Failed(format!("{} is not a file", path.display())));
        }

        if guess_mimetype(path) != Some(filter.mimetype.as_str()) {
            return Err(PickerError::Failed(format!(
                "{} is not a {} document",
                path.display(),
                filter.mimetype
            )));
        }

        Ok(PickerSelection::Selected(FileInfo::local(path.to_string_lossy())))
    }
}

/// "New website" dialog answering with the choice given on the command line
///
/// It has no template list to load, so it never reports `Ready`.
#[derive(Debug, Default)]
pub struct ArgsTemplateDialog {
    template: Option<String>,
    recent: Option<PathBuf>,
}

impl ArgsTemplateDialog {
    pub fn new(template: Option<String>, recent: Option<PathBuf>) -> Self {
        Self { template, recent }
    }
}

impl TemplateDialog for ArgsTemplateDialog {
    fn open(&self) -> DialogEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let selection = match (&self.recent, &self.template) {
            (Some(path), _) => DialogEvent::OpenFileInfo(Some(FileInfo::local(path.to_string_lossy()))),
            (None, Some(url)) => DialogEvent::OpenTemplate(Some(url.clone())),
            (None, None) => DialogEvent::OpenTemplate(None),
        };
        let _ = tx.send(selection);
        rx
    }
}

/// Undo history and view of an editor without a screen
#[derive(Debug, Default)]
pub struct HeadlessEditor;

impl UndoHistory for HeadlessEditor {
    fn reset(&self) {
        debug!("Undo history reset");
    }
}

impl EditorView for HeadlessEditor {
    fn file_operation_success(&self, message: Option<&str>) {
        if let Some(message) = message {
            info!("{}", message);
        }
    }

    fn open_settings(&self, pane: SettingsPane) {
        match pane {
            SettingsPane::Publish => println!("Use --target to set where the site is published."),
            SettingsPane::General => println!("Edit the configuration file to change the settings."),
        }
    }

    fn redraw(&self) {}
}
