use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::app_config::Config;
use crate::collaborators::{DialogEvent, MimeFilter, PickerSelection, PublishRequest, SetContentOptions, SettingsPane};
use crate::document::{FileInfo, PublicationTarget};
use crate::errors::{LifecycleError, StoreError};
use crate::events::{self, Action, EventOutcome};

use super::callbacks::Callbacks;
use super::context::EditorContext;
use super::poller::{JobState, PublishJob, PublishStatusPoller};

// @module: Document lifecycle orchestration

const NO_TARGET_MESSAGE: &str = "I do not know where to publish your site. \
Select a folder in the settings panel and do \"publish\" again.\
\nNow I will open the publish settings.";

const PUBLISH_STARTED_MESSAGE: &str = "<strong>I am about to publish your site. This may take several minutes.</strong>";

/// Phase of the publish state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishState {
    #[default]
    Idle,
    /// No target configured, the user is being sent to the settings
    SettingsPrompted,
    /// Waiting for the transport to accept the request
    Requesting,
    Polling,
    Done,
    Failed,
}

impl PublishState {
    /// Whether a publish attempt is in progress
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::SettingsPrompted | Self::Requesting | Self::Polling)
    }
}

/// Why a publish call did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A modal notification is displayed
    ModalActive,
    /// Another publish is still running
    AlreadyRunning,
}

/// Result of a publish call
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    Skipped(SkipReason),
    /// No target was configured; the publish settings were opened
    SettingsPrompted,
    /// The transport refused the request
    Rejected(String),
    /// The job was accepted and polled until it stopped
    Finished(PublishJob),
}

/// Sequences the new, open and publish flows of the edited document
pub struct LifecycleOrchestrator {
    // @field: Injected collaborators
    ctx: EditorContext,
    // @field: App configuration
    config: Config,
    // @field: Current phase of the publish state machine
    publish_state: Mutex<PublishState>,
}

impl LifecycleOrchestrator {
    pub fn new(ctx: EditorContext, config: Config) -> Self {
        Self {
            ctx,
            config,
            publish_state: Mutex::new(PublishState::Idle),
        }
    }

    pub fn context(&self) -> &EditorContext {
        &self.ctx
    }

    pub fn publish_state(&self) -> PublishState {
        *self.publish_state.lock()
    }

    fn track(&self, action: Action, outcome: EventOutcome) {
        events::track(self.ctx.events.as_ref(), action, outcome);
    }

    // =========================================================================
    // New document
    // =========================================================================

    /// Let the user start from a template, a recent file or a blank page
    pub async fn new_document(&self, mut callbacks: Callbacks<()>) {
        self.track(Action::NewFile, EventOutcome::Request);

        let mut dialog = self.ctx.template_dialog.open();
        loop {
            match dialog.recv().await {
                Some(DialogEvent::Ready) => {
                    debug!("Template dialog ready");
                    callbacks.succeed(());
                }
                None | Some(DialogEvent::OpenFileInfo(None)) | Some(DialogEvent::OpenTemplate(None)) => {
                    if self.ctx.store.has_content() {
                        debug!("Template dialog closed without selection, keeping the current document");
                        callbacks.cancel();
                    } else {
                        // never leave the editor without a document
                        self.load_blank(&mut callbacks).await;
                    }
                    break;
                }
                Some(DialogEvent::OpenFileInfo(Some(file))) => {
                    self.open_recent(file, &mut callbacks).await;
                    break;
                }
                Some(DialogEvent::OpenTemplate(Some(url))) => {
                    self.load_template(&url, &mut callbacks).await;
                    break;
                }
                Some(DialogEvent::Error(message)) => {
                    error!("Loading templates error: {}", message);
                    let err = LifecycleError::Selection(message);
                    self.on_open_error(err, "Loading templates error", None, &mut callbacks).await;
                    break;
                }
            }
        }
    }

    /// Load the default blank template
    pub async fn load_blank(&self, callbacks: &mut Callbacks<()>) {
        let url = self.config.templates.blank_template_url.clone();
        self.load_template(&url, callbacks).await;
    }

    /// Load a template by URL as the new document
    pub async fn load_template(&self, url: &str, callbacks: &mut Callbacks<()>) {
        debug!("Loading template {}", url);
        match self.ctx.store.open_from_url(url).await {
            Ok(raw) => self.on_opened(raw, Some(url), callbacks).await,
            Err(e) => {
                let message = format!("Could not load the template {}: {}", url, e);
                self.on_open_error(LifecycleError::open(message.clone(), e), &message, Some(url), callbacks).await;
            }
        }
    }

    async fn open_recent(&self, file: FileInfo, callbacks: &mut Callbacks<()>) {
        debug!("Opening recent file {}", file);
        match self.ctx.store.open(&file).await {
            Ok(raw) => self.on_opened(raw, None, callbacks).await,
            Err(e) => {
                let message = format!("Could not open this recent file, are you connected to {}?", file.service);
                self.on_open_error(LifecycleError::open(message.clone(), e), &message, None, callbacks).await;
            }
        }
    }

    // `template_url` is the template the content came from, if any.
    async fn on_opened(&self, raw: String, template_url: Option<&str>, callbacks: &mut Callbacks<()>) {
        match self.apply_content(raw).await {
            Ok(()) => {
                info!("New document loaded");
                self.ctx.view.file_operation_success(None);
                self.track(Action::NewFile, EventOutcome::Success);
                callbacks.succeed(());
            }
            Err(e) => {
                let message = e.to_string();
                self.on_open_error(LifecycleError::open(message.clone(), e), &message, template_url, callbacks).await;
            }
        }
    }

    async fn on_open_error(
        &self,
        err: LifecycleError,
        message: &str,
        template_url: Option<&str>,
        callbacks: &mut Callbacks<()>,
    ) {
        error!("Opening template error: {}", err);
        // fire and forget, nothing waits for this alert to close
        let _closed = self.ctx.notifications.alert(&format!("An error occured. {}", message), None);
        callbacks.fail(err);
        self.track(Action::NewFile, EventOutcome::Error);

        if self.ctx.store.has_content() {
            return;
        }
        if template_url == Some(self.config.templates.blank_template_url.as_str()) {
            warn!("The blank template itself failed, leaving the editor empty");
            return;
        }
        self.fallback_to_blank().await;
    }

    // Single attempt. Never reached when the failing load was the blank template.
    async fn fallback_to_blank(&self) {
        let url = &self.config.templates.blank_template_url;
        warn!("No document loaded, falling back to the blank template");

        let result = match self.ctx.store.open_from_url(url).await {
            Ok(raw) => self.apply_content(raw).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                self.ctx.view.file_operation_success(None);
                self.track(Action::NewFile, EventOutcome::Success);
            }
            Err(e) => {
                error!("Could not load the blank template {}: {}", url, e);
                self.ctx.notifications.notify_error(&format!("Error: I could not load the blank website. \n{}", e));
                self.track(Action::NewFile, EventOutcome::Error);
            }
        }
    }

    // Replace the document, then reset the undo history.
    async fn apply_content(&self, raw: String) -> Result<(), StoreError> {
        let options = SetContentOptions {
            validate_compat: true,
            use_loader: false,
        };
        self.ctx.store.set_content(raw, options).await?;
        self.ctx.undo.reset();
        Ok(())
    }

    // =========================================================================
    // Open document
    // =========================================================================

    /// Let the user pick a document and open it
    pub async fn open_document(&self, mut callbacks: Callbacks<FileInfo>) {
        self.track(Action::OpenFile, EventOutcome::Request);

        let filter = MimeFilter::new(self.config.native_mimetype.clone());
        let file = match self.ctx.file_picker.open_file(&filter).await {
            Ok(PickerSelection::Selected(file)) => file,
            Ok(PickerSelection::Cancelled) => {
                debug!("File selection cancelled");
                callbacks.cancel();
                return;
            }
            Err(e) => {
                error!("File picker error: {}", e);
                self.ctx.notifications.notify_error(&format!("Error: I did not manage to select a file. \n{}", e));
                self.track(Action::OpenFile, EventOutcome::Error);
                callbacks.fail(e.into());
                return;
            }
        };

        let result = match self.ctx.store.open(&file).await {
            Ok(raw) => self.apply_content(raw).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                let title = self.ctx.store.title().unwrap_or_else(|| "Untitled website".to_string());
                info!("Opened {}", file);
                self.ctx.view.file_operation_success(Some(&format!("{} opened.", title)));
                self.track(Action::OpenFile, EventOutcome::Success);
                callbacks.succeed(file);
            }
            Err(e) => {
                error!("Could not open {}: {}", file, e);
                self.ctx.notifications.notify_error(&format!("Error: I did not manage to open this file. \n{}", e));
                self.track(Action::OpenFile, EventOutcome::Error);
                callbacks.fail(LifecycleError::open(format!("Could not open {}", file), e));
            }
        }
    }

    // =========================================================================
    // Publish
    // =========================================================================

    /// Publish the current document to its publication target
    pub async fn publish(&self) -> PublishOutcome {
        if self.ctx.notifications.is_active() {
            warn!("Publish canceled because a modal dialog is opened already.");
            return PublishOutcome::Skipped(SkipReason::ModalActive);
        }

        let target = self.ctx.store.publication_target();
        {
            let mut state = self.publish_state.lock();
            if state.is_busy() {
                warn!("Publish canceled because a publication is already running ({:?}).", *state);
                return PublishOutcome::Skipped(SkipReason::AlreadyRunning);
            }
            *state = if target.is_some() {
                PublishState::Requesting
            } else {
                PublishState::SettingsPrompted
            };
        }

        self.track(Action::Publish, EventOutcome::Request);

        match target {
            None => self.prompt_publish_settings().await,
            Some(target) => self.publish_to(target).await,
        }
    }

    async fn prompt_publish_settings(&self) -> PublishOutcome {
        info!("No publication target configured, opening the publish settings");
        let closed = self.ctx.notifications.alert(NO_TARGET_MESSAGE, None);
        // a dropped sender counts as closed
        let _ = closed.await;

        self.ctx.view.open_settings(SettingsPane::Publish);
        self.ctx.view.redraw();
        self.track(Action::Publish, EventOutcome::Cancel);
        self.set_publish_state(PublishState::Idle);

        PublishOutcome::SettingsPrompted
    }

    async fn publish_to(&self, target: PublicationTarget) -> PublishOutcome {
        let request = PublishRequest {
            target: target.clone(),
            source_path: self.ctx.store.file_info().map(|f| f.path),
            content: self.ctx.store.content().unwrap_or_default(),
        };

        let initial_status = match self.ctx.transport.request_publish(&request).await {
            Ok(status) => status,
            Err(e) => {
                error!("Error: I did not manage to publish the file. {}", e);
                self.ctx.notifications.notify_error(&format!(
                    "I did not manage to publish the file. You may want to check the publication settings and your internet connection. \nError message: {}",
                    e
                ));
                self.track(Action::Publish, EventOutcome::Error);
                self.set_publish_state(PublishState::Failed);
                return PublishOutcome::Rejected(e.to_string());
            }
        };

        info!("Publication to '{}' accepted: {}", target.path, initial_status);
        let closed = self.ctx.notifications.alert(PUBLISH_STARTED_MESSAGE, Some("Close"));
        self.track(Action::Publish, EventOutcome::Success);
        self.set_publish_state(PublishState::Polling);

        let poller = PublishStatusPoller::new(
            self.ctx.transport.clone(),
            self.ctx.notifications.clone(),
            self.config.publish.poller_settings(),
        );
        let job = poller.run(PublishJob::new(&target, initial_status), &target, closed).await;

        self.set_publish_state(match job.state {
            JobState::Done => PublishState::Done,
            JobState::Failed | JobState::TimedOut => PublishState::Failed,
            JobState::Dismissed | JobState::Polling => PublishState::Idle,
        });

        PublishOutcome::Finished(job)
    }

    fn set_publish_state(&self, state: PublishState) {
        *self.publish_state.lock() = state;
    }
}
