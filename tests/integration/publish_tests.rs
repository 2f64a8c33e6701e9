/*!
 * Tests for the publish flow and the status polling that follows an accepted request
 */

use std::sync::Arc;
use std::time::Duration;

use sitecraft::collaborators::mock::{MockDocumentStore, MockNotifications, MockPublishTransport, Notice};
use sitecraft::collaborators::{AlertClosed, InfoPanel, NotificationChannel, PublishStatus, SettingsPane};
use sitecraft::errors::TransportError;
use sitecraft::lifecycle::poller::{POLL_FAILURE_TEXT, POLL_TIMEOUT_TEXT};
use sitecraft::lifecycle::{JobState, LifecycleOrchestrator, PublishOutcome, PublishState, SkipReason};
use sitecraft::{Document, FileInfo};

use crate::common::{intervals, site_markup, Harness};

const STARTED: &str = "<strong>I am about to publish your site. This may take several minutes.</strong>";

fn store_with_site(target: Option<(&str, &str)>) -> MockDocumentStore {
    let document = Document::from_markup(
        site_markup("Portfolio", target),
        Some(FileInfo::local("/sites/portfolio.html")),
        true,
    )
    .unwrap();
    MockDocumentStore::new().with_document(document)
}

fn finished_job(outcome: PublishOutcome) -> sitecraft::lifecycle::PublishJob {
    match outcome {
        PublishOutcome::Finished(job) => job,
        other => panic!("expected a finished job, got {:?}", other),
    }
}

/// Notifications that never report a modal, to reach the overlap guard
struct NonModalNotifications(Arc<MockNotifications>);

impl NotificationChannel for NonModalNotifications {
    fn alert(&self, message: &str, close_label: Option<&str>) -> AlertClosed {
        self.0.alert(message, close_label)
    }

    fn notify_error(&self, message: &str) {
        self.0.notify_error(message)
    }

    fn set_text(&self, message: &str) {
        self.0.set_text(message)
    }

    fn set_info_panel(&self, panel: InfoPanel) {
        self.0.set_info_panel(panel)
    }

    fn is_active(&self) -> bool {
        false
    }
}

/// Without a target the user is sent to the publish settings once the alert closes
#[tokio::test]
async fn test_publish_withoutTarget_shouldOpenPublishSettings() {
    let harness = Harness::new()
        .with_store(store_with_site(None))
        .with_notifications(MockNotifications::auto_dismissing());
    let orchestrator = harness.orchestrator();

    let outcome = orchestrator.publish().await;

    assert_eq!(outcome, PublishOutcome::SettingsPrompted);
    assert_eq!(
        harness.notifications.alerts(),
        vec!["I do not know where to publish your site. Select a folder in the settings panel and do \"publish\" again.\nNow I will open the publish settings.".to_string()]
    );
    assert_eq!(harness.editor.settings_opened(), vec![SettingsPane::Publish]);
    assert_eq!(harness.editor.redraws(), 1);
    assert!(harness.transport.requests().is_empty());
    assert_eq!(harness.events.count("request", "file.publish"), 1);
    assert_eq!(harness.events.count("cancel", "file.publish"), 1);
    assert_eq!(orchestrator.publish_state(), PublishState::Idle);
}

/// The settings only open after the user closed the alert
#[tokio::test]
async fn test_publish_withoutTarget_shouldWaitForAlertClose() {
    let harness = Harness::new().with_store(store_with_site(None));
    let orchestrator = Arc::new(harness.orchestrator());

    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.publish().await })
    };
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert!(harness.editor.settings_opened().is_empty());
    assert_eq!(orchestrator.publish_state(), PublishState::SettingsPrompted);

    harness.notifications.dismiss_alerts();
    assert_eq!(task.await.unwrap(), PublishOutcome::SettingsPrompted);
    assert_eq!(harness.editor.settings_opened(), vec![SettingsPane::Publish]);
}

/// Nothing happens while a modal notification is displayed
#[tokio::test]
async fn test_publish_withActiveModal_shouldSkipSilently() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com"))))
        .with_notifications(MockNotifications::new().with_active_modal());

    let outcome = harness.orchestrator().publish().await;

    assert_eq!(outcome, PublishOutcome::Skipped(SkipReason::ModalActive));
    assert!(harness.events.events().is_empty());
    assert!(harness.transport.requests().is_empty());
    assert!(harness.notifications.notices().is_empty());
}

/// A refused request is reported with the transport message
#[tokio::test]
async fn test_publish_withRejectedRequest_shouldNotifyError() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com"))))
        .with_transport(MockPublishTransport::rejecting("quota exceeded"));
    let orchestrator = harness.orchestrator();

    let outcome = orchestrator.publish().await;

    assert_eq!(outcome, PublishOutcome::Rejected("Publication rejected: quota exceeded".to_string()));
    assert_eq!(
        harness.notifications.errors(),
        vec!["I did not manage to publish the file. You may want to check the publication settings and your internet connection. \nError message: Publication rejected: quota exceeded".to_string()]
    );
    assert_eq!(harness.transport.queries(), 0);
    assert_eq!(harness.events.count("error", "file.publish"), 1);
    assert_eq!(orchestrator.publish_state(), PublishState::Failed);
}

/// The request carries the target, the source path and the markup
#[tokio::test(start_paused = true)]
async fn test_publish_request_shouldCarryTargetAndContent() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com"))))
        .with_transport(MockPublishTransport::always(PublishStatus::finished("Done")));

    harness.orchestrator().publish().await;

    let requests = harness.transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target.path, "/www");
    assert_eq!(requests[0].source_path.as_deref(), Some("/sites/portfolio.html"));
    assert!(requests[0].content.contains("<title>Portfolio</title>"));
}

/// Statuses are mirrored until a terminal one, which links to the published site
#[tokio::test(start_paused = true)]
async fn test_publish_withSuccessfulJob_shouldPollUntilStopAndLinkPreview() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com/"))))
        .with_transport(MockPublishTransport::accepting(vec![
            Ok(PublishStatus::working("Uploading")),
            Ok(PublishStatus::working("Uploading assets")),
            Ok(PublishStatus::finished("Published")),
        ]));
    let orchestrator = harness.orchestrator();

    let job = finished_job(orchestrator.publish().await);

    assert_eq!(job.state, JobState::Done);
    assert!(job.terminal);
    assert_eq!(job.polls, 3);
    assert_eq!(job.target_path, "/www");
    assert_eq!(job.result_url.as_deref(), Some("http://example.com/index.html"));
    assert_eq!(harness.transport.queries(), 3);

    assert_eq!(
        harness.notifications.texts(),
        vec![
            "<strong>Uploading</strong>".to_string(),
            "<strong>Uploading assets</strong>".to_string(),
            "<strong>Published</strong><p>Preview <a target=\"_blank\" href=\"http://example.com/index.html\">your published site here</a>.</p>".to_string(),
        ]
    );
    assert_eq!(
        harness.notifications.notices()[0],
        Notice::Alert {
            message: STARTED.to_string(),
            close_label: Some("Close".to_string()),
        }
    );
    assert_eq!(harness.events.count("success", "file.publish"), 1);
    assert_eq!(orchestrator.publish_state(), PublishState::Done);
}

/// The info panel shows up once, after its delay
#[tokio::test(start_paused = true)]
async fn test_publish_withLongJob_shouldShowInfoPanelOnce() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com"))))
        .with_transport(MockPublishTransport::accepting(vec![
            Ok(PublishStatus::working("1")),
            Ok(PublishStatus::working("2")),
            Ok(PublishStatus::working("3")),
            Ok(PublishStatus::finished("4")),
        ]));

    harness.orchestrator().publish().await;

    assert_eq!(harness.notifications.info_panels(), 1);
    let notices = harness.notifications.notices();
    let panel_at = notices.iter().position(|n| matches!(n, Notice::InfoPanel(_))).unwrap();
    // two seconds in: after the first status, before the second
    assert_eq!(notices[panel_at - 1], Notice::Text("<strong>1</strong>".to_string()));
    assert_eq!(notices[panel_at + 1], Notice::Text("<strong>2</strong>".to_string()));
}

/// A job finishing before the delay never shows the panel
#[tokio::test(start_paused = true)]
async fn test_publish_withQuickJob_shouldNotShowInfoPanel() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com"))))
        .with_transport(MockPublishTransport::always(PublishStatus::finished("Published")));

    harness.orchestrator().publish().await;

    assert_eq!(harness.notifications.info_panels(), 0);
}

/// The status URL is used when the target has none
#[tokio::test(start_paused = true)]
async fn test_publish_withStatusUrlOnly_shouldLinkStatusUrl() {
    let harness = Harness::new()
        .with_store(MockDocumentStore::new().with_document(
            Document::from_markup(
                r#"<html><meta name="publication-path" content="/www"><body></body></html>"#,
                None,
                true,
            )
            .unwrap(),
        ))
        .with_transport(MockPublishTransport::always(PublishStatus {
            status: "Published".to_string(),
            stop: true,
            url: Some("https://cdn.example.com/site".to_string()),
        }));

    let job = finished_job(harness.orchestrator().publish().await);

    assert_eq!(job.result_url.as_deref(), Some("https://cdn.example.com/site/index.html"));
    assert_eq!(harness.transport.requests()[0].source_path, None);
}

/// A failed status query stops polling without retry
#[tokio::test(start_paused = true)]
async fn test_publish_withFailingStatusQuery_shouldStopWithUnknownError() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com"))))
        .with_transport(MockPublishTransport::accepting(vec![
            Ok(PublishStatus::working("Uploading")),
            Err(TransportError::Connection("connection reset".to_string())),
            Ok(PublishStatus::finished("never read")),
        ]));
    let orchestrator = harness.orchestrator();

    let job = finished_job(orchestrator.publish().await);

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.polls, 2);
    assert_eq!(job.status_text, POLL_FAILURE_TEXT);
    assert_eq!(harness.notifications.texts().last().map(String::as_str), Some(POLL_FAILURE_TEXT));
    assert_eq!(harness.transport.queries(), 2);
    assert_eq!(orchestrator.publish_state(), PublishState::Failed);
}

/// A poll budget ends jobs that never stop
#[tokio::test(start_paused = true)]
async fn test_publish_withPollBudget_shouldTimeOut() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com"))))
        .with_transport(MockPublishTransport::always(PublishStatus::working("Still uploading")))
        .with_max_polls(3);
    let orchestrator = harness.orchestrator();

    let job = finished_job(orchestrator.publish().await);

    assert_eq!(job.state, JobState::TimedOut);
    assert_eq!(job.polls, 3);
    assert_eq!(harness.transport.queries(), 3);
    assert_eq!(harness.notifications.texts().last().map(String::as_str), Some(POLL_TIMEOUT_TEXT));
    assert_eq!(orchestrator.publish_state(), PublishState::Failed);
}

/// Closing the publish notification stops polling
#[tokio::test(start_paused = true)]
async fn test_publish_withDismissedNotification_shouldStopPolling() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com"))))
        .with_transport(MockPublishTransport::always(PublishStatus::working("Uploading")));
    let orchestrator = Arc::new(harness.orchestrator());

    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.publish().await })
    };

    tokio::time::sleep(intervals(3) + Duration::from_millis(500)).await;
    assert_eq!(orchestrator.publish_state(), PublishState::Polling);
    harness.notifications.dismiss_alerts();

    let job = finished_job(task.await.unwrap());
    assert_eq!(job.state, JobState::Dismissed);
    assert_eq!(job.polls, 3);

    tokio::time::sleep(intervals(5)).await;
    assert_eq!(harness.transport.queries(), 3);
    assert_eq!(orchestrator.publish_state(), PublishState::Idle);
}

/// A second publish while one is polling is rejected
#[tokio::test(start_paused = true)]
async fn test_publish_whileAnotherIsPolling_shouldSkipAsAlreadyRunning() {
    let harness = Harness::new()
        .with_store(store_with_site(Some(("/www", "http://example.com"))))
        .with_transport(MockPublishTransport::always(PublishStatus::working("Uploading")));
    let mut ctx = harness.context();
    ctx.notifications = Arc::new(NonModalNotifications(harness.notifications.clone()));
    let orchestrator = Arc::new(LifecycleOrchestrator::new(ctx, harness.config.clone()));

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.publish().await })
    };
    tokio::time::sleep(intervals(1) + Duration::from_millis(500)).await;

    let second = orchestrator.publish().await;
    assert_eq!(second, PublishOutcome::Skipped(SkipReason::AlreadyRunning));
    assert_eq!(harness.transport.requests().len(), 1);
    assert_eq!(harness.events.count("request", "file.publish"), 1);

    harness.notifications.dismiss_alerts();
    assert_eq!(finished_job(first.await.unwrap()).state, JobState::Dismissed);

    assert_eq!(orchestrator.publish_state(), PublishState::Idle);
}

/// Two statuses, the second terminal, give two texts and a preview link
#[tokio::test(start_paused = true)]
async fn test_publish_withTwoStatuses_shouldStopAfterTerminalOne() {
    let document = Document::from_markup(
        r#"<html><meta name="publication-path" content='{"url":"http://x"}'><body></body></html>"#,
        None,
        true,
    )
    .unwrap();
    let harness = Harness::new()
        .with_store(MockDocumentStore::new().with_document(document))
        .with_transport(MockPublishTransport::accepting(vec![
            Ok(PublishStatus::working("working")),
            Ok(PublishStatus::finished("done")),
        ]));

    harness.orchestrator().publish().await;
    tokio::time::sleep(intervals(5)).await;

    let texts = harness.notifications.texts();
    assert_eq!(texts.len(), 2);
    assert!(texts[1].contains("http://x/index.html"));
    assert_eq!(harness.transport.queries(), 2);
}
