use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use crate::{
    analytics::AnalyticsClient,
    client::{Config, HttpTunesClient},
    tester::{Tester, TesterKind, TesterOperation, TesterRegistry},
};

#[derive(Parser, Debug)]
#[command(name = "tunes", version, about = "iTunes Connect analytics and beta testers from the terminal", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// App analytics and reviews
    #[command(subcommand)]
    Analytics(AnalyticsCommand),
    /// Beta testers
    #[command(subcommand)]
    Testers(TesterCommand),
}

#[derive(Args, Debug)]
struct DateRange {
    /// First day, YYYY-MM-DD
    #[arg(long)]
    from: NaiveDate,
    /// Last day, YYYY-MM-DD
    #[arg(long)]
    to: NaiveDate,
}

#[derive(Subcommand, Debug)]
enum AnalyticsCommand {
    /// Page views, units, sales and sessions
    Apps {
        /// App ID, repeatable
        #[arg(short, long = "app", required = true)]
        apps: Vec<String>,
        #[command(flatten)]
        range: DateRange,
    },
    /// Crash time series
    Crashes {
        /// App ID, repeatable
        #[arg(short, long = "app", required = true)]
        apps: Vec<String>,
        #[command(flatten)]
        range: DateRange,
    },
    /// All-time totals for one app
    AllTime {
        #[arg(short, long)]
        app: String,
    },
    /// All reviews for one app in one storefront
    Reviews {
        #[arg(short, long)]
        app: String,
        /// Storefront country code, e.g. US
        #[arg(short, long)]
        country: String,
    },
}

#[derive(Subcommand, Debug)]
enum TesterCommand {
    /// List testers, optionally only those of one app
    List {
        #[arg(short, long, value_enum, default_value_t = TesterKind::External)]
        kind: TesterKind,
        #[arg(short, long)]
        app: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Find a tester by ID or email
    Find {
        #[arg(short, long, value_enum, default_value_t = TesterKind::External)]
        kind: TesterKind,
        #[arg(short, long)]
        app: Option<String>,
        /// Tester ID or email
        identifier: String,
    },
    /// Create an external tester
    Create {
        #[arg(short, long, value_enum, default_value_t = TesterKind::External)]
        kind: TesterKind,
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Delete a tester
    Delete {
        #[arg(short, long, value_enum, default_value_t = TesterKind::External)]
        kind: TesterKind,
        /// Tester ID or email
        identifier: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Add a tester to an app
    AddToApp {
        #[arg(short, long, value_enum, default_value_t = TesterKind::External)]
        kind: TesterKind,
        #[arg(short, long)]
        app: String,
        /// Tester ID or email
        identifier: String,
    },
    /// Remove a tester from an app
    RemoveFromApp {
        #[arg(short, long, value_enum, default_value_t = TesterKind::External)]
        kind: TesterKind,
        #[arg(short, long)]
        app: String,
        /// Tester ID or email
        identifier: String,
    },
    /// Add every tester of a kind to an app
    AddAllToApp {
        #[arg(short, long, value_enum, default_value_t = TesterKind::External)]
        kind: TesterKind,
        #[arg(short, long)]
        app: String,
    },
}

pub async fn run_cli() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = Config::from_env()?;
    let client = HttpTunesClient::new(cfg).context("Failed to build HTTP client")?;

    match cli.command {
        Commands::Analytics(cmd) => analytics_cmd(&AnalyticsClient::new(&client), cmd).await?,
        Commands::Testers(cmd) => testers_cmd(&TesterRegistry::new(&client), cmd).await?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb
}

fn print_json(v: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

async fn analytics_cmd(
    analytics: &AnalyticsClient<'_, HttpTunesClient>,
    cmd: AnalyticsCommand,
) -> Result<()> {
    let v = match cmd {
        AnalyticsCommand::Apps { apps, range } => {
            let pb = spinner("Loading app analytics...");
            let v = analytics.apps(&apps, range.from, range.to).await;
            pb.finish_and_clear();
            v?
        }
        AnalyticsCommand::Crashes { apps, range } => {
            let pb = spinner("Loading crashes...");
            let v = analytics.crashes(&apps, range.from, range.to).await;
            pb.finish_and_clear();
            v?
        }
        AnalyticsCommand::AllTime { app } => {
            let pb = spinner("Loading all-time analytics...");
            let v = analytics.all_time(&app).await;
            pb.finish_and_clear();
            v?
        }
        AnalyticsCommand::Reviews { app, country } => {
            let pb = spinner("Loading reviews...");
            let v = analytics.reviews(&app, &country).await;
            pb.finish_and_clear();
            v?
        }
    };
    print_json(&v)
}

async fn testers_cmd(
    registry: &TesterRegistry<'_, HttpTunesClient>,
    cmd: TesterCommand,
) -> Result<()> {
    match cmd {
        TesterCommand::List { kind, app, json } => {
            let pb = spinner("Loading testers...");
            let testers = match &app {
                Some(app) => registry.list_by_app(kind, app).await,
                None => registry.list(kind).await,
            };
            pb.finish_and_clear();
            let testers = testers?;
            if json {
                println!("{}", serde_json::to_string_pretty(&testers)?);
                return Ok(());
            }
            if testers.is_empty() {
                println!("No {} testers found", kind);
                return Ok(());
            }
            for t in testers {
                println!("{}", t);
            }
        }
        TesterCommand::Find {
            kind,
            app,
            identifier,
        } => {
            let tester = find_tester(registry, kind, app.as_deref(), &identifier).await?;
            println!("{}", serde_json::to_string_pretty(&tester)?);
        }
        TesterCommand::Create {
            kind,
            email,
            first_name,
            last_name,
        } => {
            let pb = spinner("Creating tester...");
            let res = registry
                .create(kind, &email, first_name.as_deref(), last_name.as_deref())
                .await;
            pb.finish_and_clear();
            let tester = res?;
            println!("Tester created: {}", tester);
        }
        TesterCommand::Delete {
            kind,
            identifier,
            yes,
        } => {
            kind.require(TesterOperation::Delete)?;
            let tester = find_tester(registry, kind, None, &identifier).await?;
            if !yes {
                let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(format!("Delete {} tester {}?", kind, tester.email))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Aborted");
                    return Ok(());
                }
            }
            let pb = spinner("Deleting tester...");
            let res = registry.delete(&tester).await;
            pb.finish_and_clear();
            res?;
            println!("Tester deleted: {}", tester.email);
        }
        TesterCommand::AddToApp {
            kind,
            app,
            identifier,
        } => {
            let tester = find_tester(registry, kind, None, &identifier).await?;
            let pb = spinner("Adding tester...");
            let res = registry.add_to_app(&tester, &app).await;
            pb.finish_and_clear();
            res?;
            println!("Added {} to app {}", tester.email, app);
        }
        TesterCommand::RemoveFromApp {
            kind,
            app,
            identifier,
        } => {
            let tester = find_tester(registry, kind, Some(app.as_str()), &identifier).await?;
            let pb = spinner("Removing tester...");
            let res = registry.remove_from_app(&tester, &app).await;
            pb.finish_and_clear();
            res?;
            println!("Removed {} from app {}", tester.email, app);
        }
        TesterCommand::AddAllToApp { kind, app } => {
            let pb = spinner("Adding testers...");
            let res = registry.add_all_to_app(kind, &app).await;
            pb.finish_and_clear();
            println!("Added {} {} testers to app {}", res?, kind, app);
        }
    }
    Ok(())
}

async fn find_tester(
    registry: &TesterRegistry<'_, HttpTunesClient>,
    kind: TesterKind,
    app: Option<&str>,
    identifier: &str,
) -> Result<Tester> {
    let pb = spinner("Looking up tester...");
    let found = match app {
        Some(app) => registry.find_by_app(kind, app, identifier).await,
        None => registry.find(kind, identifier).await,
    };
    pb.finish_and_clear();
    found?.ok_or_else(|| anyhow!("No {} tester matches {}", kind, identifier))
}
