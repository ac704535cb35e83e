use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};
use shared_types::{ActionPreference, PromoSender, Settings};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use unclut::actions::run_action;
use unclut::db::ActivityStore;
use unclut::gmail_client::{GmailClient, Mailbox};
use unclut::readiness::{wait_until_ready, Probe, ReadinessPolicy};
use unclut::selection::parse_sequence_numbers;
use unclut::ui::Printer;
use unclut::unsubscriber::{Unsubscriber, DEFAULT_TIMEOUT};
use unclut::{config, scanner};

#[derive(Parser)]
#[command(name = "unclut")]
#[command(about = "Unsubscribe from promotional Gmail senders and delete their mail")]
#[command(
    long_about = "Scans the Promotions tab for senders older than two weeks, lets you pick\n\
    which ones to act on, then unsubscribes, deletes their mail, or both.\n\n\
    Gmail credentials come from GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and\n\
    GOOGLE_REFRESH_TOKEN. Set DATABASE_URL to keep per-user activity counters."
)]
struct Cli {
    /// Settings file to use instead of ~/.unclut/config.toml
    #[arg(long, env = "UNCLUT_CONFIG", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Simulate every destructive action
    #[arg(long, global = true)]
    dry_run: bool,

    /// Do not ask for confirmation before acting
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview promotional senders without changing anything
    Scan,

    /// Unsubscribe from the selected senders
    Unsubscribe {
        /// Sequence numbers from the preview, e.g. "1 3 5" or "all"
        #[arg(short, long, value_name = "NUMBERS")]
        select: Option<String>,
    },

    /// Delete every message from the selected senders
    Delete {
        #[arg(short, long, value_name = "NUMBERS")]
        select: Option<String>,
    },

    /// Unsubscribe and delete
    Clean {
        #[arg(short, long, value_name = "NUMBERS")]
        select: Option<String>,
    },

    /// Use the action stored in settings (the default command)
    Run {
        #[arg(short, long, value_name = "NUMBERS")]
        select: Option<String>,
    },

    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show activity counters recorded in the database
    Stats {
        /// Account to look up; defaults to the signed-in Gmail address
        #[arg(short, long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective settings
    Show,
    /// Change one setting
    Set {
        #[arg(value_parser = PossibleValuesParser::new(config::SETTING_KEYS.iter().copied()))]
        key: String,
        value: String,
    },
    /// Restore the defaults
    Reset,
}

struct Session {
    mailbox: GmailClient,
    email: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing()?;

    let cli = Cli::parse();
    let settings_path = config::resolve_path(cli.config.as_deref())?;

    let (action, select) = match cli.command.unwrap_or(Commands::Run { select: None }) {
        Commands::Settings { action } => {
            return handle_settings(action, &settings_path, cli.dry_run);
        }
        Commands::Scan => {
            let settings = effective_settings(&settings_path, cli.dry_run)?;
            let printer = Printer::new(settings.theme);
            printer.banner();
            let session = open_session(&settings, &printer).await?;
            let senders = fetch_senders(&session, &settings, &printer).await?;
            if !senders.is_empty() {
                printer.preview(&senders);
            }
            return Ok(());
        }
        Commands::Stats { email } => {
            let settings = effective_settings(&settings_path, cli.dry_run)?;
            let printer = Printer::new(settings.theme);
            return show_stats(email, &settings, &printer).await;
        }
        Commands::Unsubscribe { select } => (Some(ActionPreference::Unsubscribe), select),
        Commands::Delete { select } => (Some(ActionPreference::Delete), select),
        Commands::Clean { select } => (Some(ActionPreference::Both), select),
        Commands::Run { select } => (None, select),
    };

    let settings = effective_settings(&settings_path, cli.dry_run)?;
    let printer = Printer::new(settings.theme);
    let action = action.unwrap_or(settings.action);
    run_command(action, select, &settings, &printer, cli.yes).await
}

/// Stored settings with environment and `--dry-run` overrides applied
fn effective_settings(path: &Path, dry_run: bool) -> Result<Settings> {
    let mut settings = config::load(path)?;
    config::apply_env(&mut settings);
    if dry_run {
        settings.dry_run = true;
    }
    Ok(settings)
}

/// Console logging filtered by RUST_LOG, plus an optional log file
fn init_tracing() -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unclut=warn".into()),
        );

    let (file_layer, guard) = match std::env::var("UNCLUT_LOG_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            let path = PathBuf::from(path.trim());
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .context("UNCLUT_LOG_FILE must name a file")?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(tracing_subscriber::EnvFilter::new("unclut=debug"));
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn open_session(settings: &Settings, printer: &Printer) -> Result<Session> {
    let mailbox = GmailClient::from_env(&settings.user_id)
        .await
        .context("Failed to initialize Gmail client. Please check your credentials.")?;

    printer.muted("Attempting to fetch user profile...");
    let client = &mailbox;
    let email = wait_until_ready(&ReadinessPolicy::default(), |_| async move {
        match client.profile_email().await {
            Ok(email) => Probe::Ready(email),
            Err(e) => Probe::NotReady(format!("{:#}", e)),
        }
    })
    .await?;

    printer.success(&format!("Logged in as: {}", email));
    Ok(Session { mailbox, email })
}

async fn fetch_senders(
    session: &Session,
    settings: &Settings,
    printer: &Printer,
) -> Result<Vec<PromoSender>> {
    let senders = printer
        .with_spinner(
            "Fetching promotional emails",
            scanner::fetch_promotional_senders(
                &session.mailbox,
                settings.max_senders,
                settings.max_emails_to_scan,
            ),
        )
        .await?;

    if senders.is_empty() {
        printer.warning("No promotional emails found.");
    }
    Ok(senders)
}

async fn run_command(
    action: ActionPreference,
    select: Option<String>,
    settings: &Settings,
    printer: &Printer,
    assume_yes: bool,
) -> Result<()> {
    printer.banner();
    let session = open_session(settings, printer).await?;
    let store = match ActivityStore::connect_from_env() {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Activity store unavailable: {:#}", e);
            printer.warning("Database logging will be disabled for this session.");
            None
        }
    };

    let senders = fetch_senders(&session, settings, printer).await?;
    if senders.is_empty() {
        return Ok(());
    }
    printer.preview(&senders);

    let selected = select_senders(&senders, select.as_deref(), printer)?;
    if selected.is_empty() {
        printer.warning("No senders selected.");
        return Ok(());
    }

    printer.info(&format!("Selected {} sender(s):", selected.len()));
    for sender in &selected {
        printer.muted(sender);
    }

    if settings.confirm && !assume_yes {
        let verb = match (action.unsubscribes(), action.deletes()) {
            (true, true) => "unsubscribing from and deleting emails from",
            (true, false) => "unsubscribing from",
            _ => "deleting emails from",
        };
        let answer = prompt(&format!("Proceed with {} these senders? (yes/no): ", verb))?;
        if answer.trim().to_lowercase() != "yes" {
            printer.warning("Operation cancelled by user.");
            return Ok(());
        }
    }

    if settings.dry_run {
        printer.warning("Dry run enabled: no changes will be made.");
    }

    let unsubscriber = Unsubscriber::new(DEFAULT_TIMEOUT)?;
    let summary = printer
        .with_spinner("Processing senders", async {
            Ok(run_action(
                action,
                &session.mailbox,
                &unsubscriber,
                &selected,
                settings.dry_run,
            )
            .await)
        })
        .await?;

    printer.summary(&summary, settings.dry_run);

    if let Some(store) = store {
        store
            .record_activity(
                &session.email,
                summary.unsubscribed as i64,
                summary.deleted as i64,
            )
            .await;
    }

    Ok(())
}

/// Sender emails chosen by `--select`, or interactively when it is absent
fn select_senders(
    senders: &[PromoSender],
    select: Option<&str>,
    printer: &Printer,
) -> Result<Vec<String>> {
    let pick = |numbers: &[usize]| -> Vec<String> {
        numbers
            .iter()
            .map(|n| senders[n - 1].sender_email.clone())
            .collect()
    };

    if let Some(input) = select {
        let selection = parse_sequence_numbers(input, senders.len());
        report_invalid(&selection.invalid, senders.len(), printer);
        return Ok(pick(&selection.valid));
    }

    printer.muted("Enter numbers separated by spaces (e.g. '1 3 5'), 'all' to select all, or 'quit' to exit.");
    loop {
        let input = prompt("Enter sequence numbers: ")?;
        let selection = parse_sequence_numbers(&input, senders.len());
        if selection.cancelled {
            return Ok(Vec::new());
        }
        report_invalid(&selection.invalid, senders.len(), printer);
        if selection.valid.is_empty() {
            printer.warning("No valid selections made.");
            continue;
        }
        return Ok(pick(&selection.valid));
    }
}

fn report_invalid(invalid: &[String], max: usize, printer: &Printer) {
    for token in invalid {
        printer.error(&format!("'{}' is not a number between 1 and {}", token, max));
    }
    if !invalid.is_empty() {
        printer.muted("Valid numbers will be processed, invalid ones ignored.");
    }
}

fn prompt(question: &str) -> Result<String> {
    print!("\n    {}", question);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

fn handle_settings(action: SettingsAction, path: &Path, dry_run: bool) -> Result<()> {
    // A broken file must not stop `set` or `reset` from repairing it
    let theme = config::load(path).map(|s| s.theme).unwrap_or_default();
    let printer = Printer::new(theme);

    match action {
        SettingsAction::Show => {
            let settings = effective_settings(path, dry_run)?;
            printer.muted(&format!("Settings file: {}", path.display()));
            println!("{}", toml::to_string_pretty(&settings)?);
        }
        SettingsAction::Set { key, value } => {
            config::set_value(path, &key, &value)?;
            printer.success(&format!("Set {} = {}", key, value));
        }
        SettingsAction::Reset => {
            config::reset(path)?;
            printer.success("Settings restored to defaults.");
        }
    }
    Ok(())
}

async fn show_stats(email: Option<String>, settings: &Settings, printer: &Printer) -> Result<()> {
    let store = ActivityStore::connect_from_env()?
        .context("DATABASE_URL is not set; activity recording is disabled")?;

    let email = match email {
        Some(email) => email,
        None => open_session(settings, printer).await?.email,
    };

    match store.get_activity(&email).await? {
        Some(activity) => {
            printer.info(&format!("Activity for {}", activity.email));
            println!("    Unsubscribed:   {}", activity.unsubs_count);
            println!("    Deleted:        {}", activity.deleted_count);
            println!(
                "    First seen:     {}",
                activity.created_at.format("%Y-%m-%d %H:%M")
            );
            println!(
                "    Last activity:  {}",
                activity.updated_at.format("%Y-%m-%d %H:%M")
            );
        }
        None => printer.warning(&format!("No activity recorded for {}", email)),
    }
    Ok(())
}
