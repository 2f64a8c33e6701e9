// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use sitecraft::app_config::{Config, LogLevel};
use sitecraft::collaborators::console::{
    strip_tags, ArgsTemplateDialog, ConsoleNotifier, HeadlessEditor, LogEventSink, PathFilePicker,
};
use sitecraft::collaborators::fs_store::FsDocumentStore;
use sitecraft::collaborators::DocumentStore;
use sitecraft::collaborators::http_transport::HttpPublishTransport;
use sitecraft::lifecycle::{Callbacks, EditorContext, JobState, LifecycleOrchestrator, PublishOutcome};
use sitecraft::{FileInfo, LifecycleError, PublicationTarget};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a new website from a template, a recent file or the blank page
    New {
        /// Template URL or path (relative to the template root)
        #[arg(short, long, conflicts_with = "recent")]
        template: Option<String>,

        /// Reopen a recent file instead of a template
        #[arg(short, long)]
        recent: Option<PathBuf>,

        /// Write the loaded document to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Open an existing website
    Open {
        /// Document to open
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Write the loaded document to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Publish a website and follow the publication until it finishes
    Publish {
        /// Document to publish
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Publish task server, overrides the configuration
        #[arg(short, long, env = "SITECRAFT_SERVER")]
        server: Option<String>,

        /// Publication path, overrides the one stored in the document
        #[arg(long)]
        target: Option<String>,

        /// Public URL of the published site
        #[arg(long, requires = "target")]
        target_url: Option<String>,
    },

    /// Generate shell completions for sitecraft
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// sitecraft - website document lifecycle from the command line
#[derive(Parser, Debug)]
#[command(name = "sitecraft")]
#[command(version)]
#[command(about = "Create, open and publish websites")]
#[command(long_about = "sitecraft drives the document lifecycle of a website editor without a screen.

EXAMPLES:
    sitecraft new -o site.html                     # Start from the blank template
    sitecraft new -t landing/editable.html -o a.html  # Start from a template
    sitecraft open site.html                       # Check a document loads
    sitecraft publish site.html --target /www --target-url https://example.com
    sitecraft completions bash > sitecraft.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation, filtering on the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger, later level changes go through log::set_max_level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and label for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, label) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, label, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Outcome delivered to the continuations of a lifecycle operation
enum Completion<T> {
    Done(T),
    Failed(LifecycleError),
    Cancelled,
}

// Bridge continuations to a receiver the command can await.
fn completion<T: Send + 'static>() -> (Callbacks<T>, oneshot::Receiver<Completion<T>>) {
    let (tx, rx) = oneshot::channel();
    let slot = Arc::new(Mutex::new(Some(tx)));
    let deliver = |slot: Arc<Mutex<Option<oneshot::Sender<Completion<T>>>>>, value: Completion<T>| {
        if let Some(tx) = slot.lock().take() {
            let _ = tx.send(value);
        }
    };

    let (on_success, on_error, on_cancel) = (slot.clone(), slot.clone(), slot);
    let callbacks = Callbacks::new()
        .on_success(move |value| deliver(on_success, Completion::Done(value)))
        .on_error(move |error| deliver(on_error, Completion::Failed(error)))
        .on_cancel(move || deliver(on_cancel, Completion::Cancelled));

    (callbacks, rx)
}

struct Session {
    orchestrator: LifecycleOrchestrator,
    store: Arc<FsDocumentStore>,
    notifier: Arc<ConsoleNotifier>,
}

fn build_session(
    config: &Config,
    picker: PathFilePicker,
    dialog: ArgsTemplateDialog,
) -> Result<Session> {
    let template_root = config.templates.template_root.clone().unwrap_or_else(|| ".".to_string());
    let store = Arc::new(FsDocumentStore::new(template_root));
    let notifier = Arc::new(ConsoleNotifier::new());
    let editor = Arc::new(HeadlessEditor);
    let transport = HttpPublishTransport::new(&config.publish.server_url, Duration::from_secs(config.publish.timeout_secs))
        .context("Failed to create the publish transport")?;

    let ctx = EditorContext {
        store: store.clone(),
        file_picker: Arc::new(picker),
        template_dialog: Arc::new(dialog),
        transport: Arc::new(transport),
        notifications: notifier.clone(),
        events: Arc::new(LogEventSink),
        undo: editor.clone(),
        view: editor,
    };

    Ok(Session {
        orchestrator: LifecycleOrchestrator::new(ctx, config.clone()),
        store,
        notifier,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "sitecraft", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level.into();
    }
    if let Commands::Publish { server: Some(server), .. } = &cli.command {
        config.publish.server_url = server.clone();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::New { template, recent, output } => run_new(&config, template, recent, output).await,
        Commands::Open { path, output } => run_open(&config, path, output).await,
        Commands::Publish { path, target, target_url, .. } => run_publish(&config, path, target, target_url).await,
        Commands::Completions { .. } => Ok(()),
    }
}

async fn run_new(config: &Config, template: Option<String>, recent: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let session = build_session(config, PathFilePicker::new(None), ArgsTemplateDialog::new(template, recent))?;

    let (callbacks, done) = completion::<()>();
    session.orchestrator.new_document(callbacks).await;

    match done.await {
        Ok(Completion::Done(())) => {}
        Ok(Completion::Failed(e)) => return Err(anyhow!("Could not create the website: {}", e)),
        Ok(Completion::Cancelled) | Err(_) => {
            warn!("No website was created");
            return Ok(());
        }
    }

    report_document(&session, output).await
}

async fn run_open(config: &Config, path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let session = build_session(config, PathFilePicker::new(Some(path)), ArgsTemplateDialog::default())?;
    open_with(&session).await?;
    report_document(&session, output).await
}

async fn open_with(session: &Session) -> Result<FileInfo> {
    let (callbacks, done) = completion::<FileInfo>();
    session.orchestrator.open_document(callbacks).await;

    match done.await {
        Ok(Completion::Done(file)) => Ok(file),
        Ok(Completion::Failed(e)) => Err(anyhow!("Could not open the website: {}", e)),
        Ok(Completion::Cancelled) | Err(_) => Err(anyhow!("No file selected")),
    }
}

async fn report_document(session: &Session, output: Option<PathBuf>) -> Result<()> {
    let title = session.store.title().unwrap_or_else(|| "Untitled website".to_string());
    let size = session.store.content().map(|c| c.len()).unwrap_or_default();
    info!("Loaded '{}' ({} bytes)", title, size);

    if let Some(output) = output {
        session.store.save_to(&output).await
            .map_err(|e| anyhow!("Failed to write {}: {}", output.display(), e))?;
        info!("Success: {}", output.display());
    }

    Ok(())
}

async fn run_publish(config: &Config, path: PathBuf, target: Option<String>, target_url: Option<String>) -> Result<()> {
    let session = build_session(config, PathFilePicker::new(Some(path)), ArgsTemplateDialog::default())?;
    open_with(&session).await?;

    if let Some(target) = target {
        let mut publication = PublicationTarget::new(target);
        publication.url = target_url;
        session.store.set_publication_target(publication);
    }

    // Ctrl-C closes the publish notification, which stops polling
    let notifier = session.notifier.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            notifier.dismiss_all();
        }
    });

    let outcome = session.orchestrator.publish().await;
    interrupt.abort();
    session.notifier.dismiss_all();

    match outcome {
        PublishOutcome::Finished(job) => {
            println!("{}", strip_tags(&job.status_text));
            if let Some(url) = &job.result_url {
                info!("Published site: {}", url);
            }
            match job.state {
                JobState::Failed => Err(anyhow!("Publication failed")),
                JobState::TimedOut => Err(anyhow!("Publication did not finish after {} status queries", job.polls)),
                JobState::Dismissed => {
                    warn!("Stopped following the publication, it may still be running");
                    Ok(())
                }
                JobState::Done | JobState::Polling => Ok(()),
            }
        }
        PublishOutcome::Rejected(message) => Err(anyhow!("Publication rejected: {}", message)),
        PublishOutcome::SettingsPrompted => Err(anyhow!("No publication target, use --target")),
        PublishOutcome::Skipped(reason) => Err(anyhow!("Publication skipped: {:?}", reason)),
    }
}
