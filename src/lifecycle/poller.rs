/*!
 * Publish status polling.
 *
 * Once the transport accepted a publish request, the poller queries the job status
 * on a fixed interval and mirrors every status into the active notification, until:
 * - the server reports a terminal status (`stop == true`),
 * - a status query fails (no retry),
 * - the user closes the publish notification,
 * - the optional poll budget is exhausted.
 */

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::collaborators::{AlertClosed, InfoPanel, NotificationChannel, PublishStatus, PublishTransport};
use crate::document::{index_page_url, PublicationTarget};

/// Text shown when a status query fails
pub const POLL_FAILURE_TEXT: &str = "<strong>An unknown error occurred.</strong>";

/// Text shown when the poll budget runs out
pub const POLL_TIMEOUT_TEXT: &str = "<strong>Publication is taking longer than expected, check again later.</strong>";

/// Timing of the status poller
#[derive(Debug, Clone, PartialEq)]
pub struct PollerSettings {
    /// Delay between two status queries
    pub interval: Duration,
    /// Maximum number of status queries, unlimited when `None`
    pub max_polls: Option<u32>,
    /// When to show the informational panel, never when `None`
    pub info_panel_delay: Option<Duration>,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            max_polls: None,
            info_panel_delay: Some(Duration::from_millis(2000)),
        }
    }
}

/// Where a publish job ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Polling,
    /// The server reported a terminal status
    Done,
    /// A status query failed
    Failed,
    /// The user closed the publish notification
    Dismissed,
    /// The poll budget was exhausted
    TimedOut,
}

/// One in-flight publish operation
#[derive(Debug, Clone, PartialEq)]
pub struct PublishJob {
    pub id: Uuid,
    pub target_path: String,
    /// Last text pushed to the notification
    pub status_text: String,
    /// Whether the server reported a terminal status
    pub terminal: bool,
    /// Link to the published site, once known
    pub result_url: Option<String>,
    /// Number of status queries issued
    pub polls: u32,
    pub state: JobState,
}

impl PublishJob {
    pub fn new(target: &PublicationTarget, initial_status: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_path: target.path.clone(),
            status_text: initial_status.into(),
            terminal: false,
            result_url: None,
            polls: 0,
            state: JobState::Polling,
        }
    }

    /// Fold a status payload into the job, returning the text to display
    fn apply(&mut self, status: PublishStatus, target: &PublicationTarget) -> String {
        let mut text = format!("<strong>{}</strong>", status.status);

        if status.stop {
            self.terminal = true;
            self.state = JobState::Done;

            let base = target.url.clone().or(status.url);
            if let Some(base) = base {
                let link = index_page_url(&base);
                text.push_str(&format!(
                    "<p>Preview <a target=\"_blank\" href=\"{}\">your published site here</a>.</p>",
                    link
                ));
                self.result_url = Some(link);
            }
        }

        self.status_text = text.clone();
        text
    }

    fn end(&mut self, state: JobState, text: &str) {
        self.state = state;
        self.status_text = text.to_string();
    }
}

/// Polls a publish job until it reaches a terminal state
pub struct PublishStatusPoller {
    transport: Arc<dyn PublishTransport>,
    notifications: Arc<dyn NotificationChannel>,
    settings: PollerSettings,
}

impl PublishStatusPoller {
    pub fn new(
        transport: Arc<dyn PublishTransport>,
        notifications: Arc<dyn NotificationChannel>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            transport,
            notifications,
            settings,
        }
    }

    /// Poll until the job stops, mirroring progress into the notification
    ///
    /// `closed` is the close signal of the publish alert; closing it stops polling.
    pub async fn run(&self, mut job: PublishJob, target: &PublicationTarget, mut closed: AlertClosed) -> PublishJob {
        let interval = self.settings.interval;
        info!("Polling publish job {} for '{}' every {:?}", job.id, job.target_path, interval);

        // First query one interval after acceptance
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let panel_delay = time::sleep(self.settings.info_panel_delay.unwrap_or_default());
        tokio::pin!(panel_delay);
        let mut panel_pending = self.settings.info_panel_delay.is_some();

        loop {
            tokio::select! {
                biased;

                _ = &mut closed => {
                    debug!("Publish notification closed, polling of job {} stopped", job.id);
                    job.state = JobState::Dismissed;
                    break;
                }

                _ = &mut panel_delay, if panel_pending => {
                    panel_pending = false;
                    self.notifications.set_info_panel(InfoPanel::publish_tips());
                }

                _ = ticker.tick() => {
                    if let Some(max_polls) = self.settings.max_polls {
                        if job.polls >= max_polls {
                            warn!("Publish job {} still running after {} status queries, giving up", job.id, job.polls);
                            job.end(JobState::TimedOut, POLL_TIMEOUT_TEXT);
                            self.notifications.set_text(POLL_TIMEOUT_TEXT);
                            break;
                        }
                    }

                    job.polls += 1;
                    match self.transport.query_status().await {
                        Ok(status) => {
                            debug!("Publish job {} status #{}: {} (stop: {})", job.id, job.polls, status.status, status.stop);
                            let text = job.apply(status, target);
                            self.notifications.set_text(&text);
                            if job.terminal {
                                info!("Publish job {} finished after {} status queries", job.id, job.polls);
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Error: publish status query failed: {}", e);
                            job.end(JobState::Failed, POLL_FAILURE_TEXT);
                            self.notifications.set_text(POLL_FAILURE_TEXT);
                            break;
                        }
                    }
                }
            }
        }

        job
    }
}
