//! kivora - command line client for the Kivora SCRUM API.

use std::{path::PathBuf, process::ExitCode, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use domain::models::user::LoginRequest;
use indicatif::{ProgressBar, ProgressStyle};
use services::services::{
    app::KivoraApp,
    config::ClientConfig,
    submission::SubmitError,
    validation::FieldKind,
};
use tracing::debug;

mod output;

#[derive(Parser)]
#[command(name = "kivora")]
#[command(author, version, about = "Kivora SCRUM client", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the client configuration (TOML)
    #[arg(short, long, global = true, env = "KIVORA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(short, long, env = "KIVORA_EMAIL")]
        email: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Notifications of the signed-in user
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },
    /// Product backlog of a project
    Backlog {
        #[command(subcommand)]
        command: BacklogCommands,
    },
    /// Check a value against a field rule, offline
    Validate {
        /// name, username, email, password, number, title or description
        field: String,
        value: String,
    },
}

#[derive(Subcommand)]
enum NotificationCommands {
    List,
    /// Poll and print the pending count until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum BacklogCommands {
    List {
        project_id: String,
    },
    /// Download the backlog as PDF
    Export {
        project_id: String,
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    utils::logging::init_tracing(if cli.verbose { "debug" } else { "warn" });

    let result = run(cli.config, cli.command).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn build_app(config_path: Option<&std::path::Path>) -> Result<KivoraApp> {
    let default_path = dirs::config_dir().map(|dir| dir.join("kivora").join("config.toml"));
    let path = config_path.map(PathBuf::from).or(default_path);
    debug!(config = ?path, "Loading configuration");
    let config = ClientConfig::load(path.as_deref()).context("loading configuration")?;
    Ok(KivoraApp::new(config)?)
}

async fn run(config: Option<PathBuf>, command: Commands) -> Result<()> {
    // Offline commands need neither config nor session.
    let app = match command {
        Commands::Validate { field, value } => return cmd_validate(&field, &value),
        _ => build_app(config.as_deref())?,
    };
    let app = &app;

    match command {
        Commands::Login { email } => cmd_login(app, email).await,
        Commands::Logout => {
            app.logout().await?;
            output::success("Signed out");
            Ok(())
        }
        Commands::Whoami => cmd_whoami(app).await,
        Commands::Notifications { command } => {
            require_session(app)?;
            match command {
                NotificationCommands::List => cmd_notifications_list(app).await,
                NotificationCommands::Watch => cmd_notifications_watch(app).await,
            }
        }
        Commands::Backlog { command } => {
            require_session(app)?;
            match command {
                BacklogCommands::List { project_id } => cmd_backlog_list(app, &project_id).await,
                BacklogCommands::Export { project_id, out } => {
                    cmd_backlog_export(app, &project_id, out).await
                }
            }
        }
        Commands::Validate { field, value } => cmd_validate(&field, &value),
    }
}

fn require_session(app: &KivoraApp) -> Result<()> {
    if app.auth().current().is_none() {
        bail!("not signed in, run `kivora login` first");
    }
    Ok(())
}

/// The text a user should see for an orchestrator failure.
fn explain(e: SubmitError) -> anyhow::Error {
    anyhow!(e.user_message())
}

async fn cmd_login(app: &KivoraApp, email: String) -> Result<()> {
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .context("reading password")?;
    let session = app
        .auth()
        .login(&LoginRequest { email, password })
        .await
        .map_err(explain)?;
    output::success(&format!("Signed in as {}", session.username));
    Ok(())
}

async fn cmd_whoami(app: &KivoraApp) -> Result<()> {
    let Some(session) = app.auth().current() else {
        output::info("Not signed in");
        return Ok(());
    };
    match app.profile().load().await {
        Ok(user) => println!("{} {} <{}> (@{})", user.name, user.surname, user.email, user.username),
        Err(_) => println!("@{} ({})", session.username, session.user_id),
    }
    Ok(())
}

async fn cmd_notifications_list(app: &KivoraApp) -> Result<()> {
    let snapshot = app.notifications().load().await.map_err(explain)?;
    output::print_notifications(&snapshot.notifications);
    output::info(&format!("{} pending", snapshot.pending_count));
    Ok(())
}

async fn cmd_notifications_watch(app: &KivoraApp) -> Result<()> {
    let poller = app.poller();
    let mut snapshots = poller.subscribe();
    let mut toasts = app.toasts().subscribe();
    poller.start();
    output::info("Watching notifications, press Ctrl-C to stop");

    let mut last = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let pending = snapshots.borrow_and_update().pending_count;
                if last != Some(pending) {
                    println!("{pending} pending");
                    last = Some(pending);
                }
            }
            Ok(toast) = toasts.recv() => output::toast(&toast),
        }
    }

    poller.stop().await;
    Ok(())
}

async fn cmd_backlog_list(app: &KivoraApp, project_id: &str) -> Result<()> {
    let items = app.backlog().load(project_id).await.map_err(explain)?;
    output::print_backlog(&items);
    Ok(())
}

async fn cmd_backlog_export(app: &KivoraApp, project_id: &str, out: PathBuf) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Exporting backlog of {project_id}"));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let pdf = app.backlog().export_pdf(project_id).await;
    spinner.finish_and_clear();
    let pdf = pdf.map_err(explain)?;

    tokio::fs::write(&out, &pdf)
        .await
        .with_context(|| format!("writing {}", out.display()))?;
    output::success(&format!("Saved {} ({} bytes)", out.display(), pdf.len()));
    Ok(())
}

fn cmd_validate(field: &str, value: &str) -> Result<()> {
    let kind = FieldKind::from_str(field)
        .map_err(|_| anyhow!("unknown field `{field}`"))?;
    match kind.check(kind_field(kind), value) {
        Ok(()) => {
            output::success(&format!("valid {kind}"));
            Ok(())
        }
        Err(e) => bail!("{}", e.message),
    }
}

fn kind_field(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Name => "name",
        FieldKind::Username => "username",
        FieldKind::Email => "email",
        FieldKind::Password => "password",
        FieldKind::Number => "phone",
        FieldKind::Title => "title",
        FieldKind::Description => "description",
    }
}
