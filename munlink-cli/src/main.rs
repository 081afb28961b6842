//! MunLink CLI - command-line client for the MunLink Zambales platform
//!
//! Exercises the SDK end to end: session bootstrap, login, and the public
//! and resident-facing endpoints.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

use munlink_client::types::{
    AnnouncementFilter, ItemFilter, LoginRequest, NewDocumentRequest,
};
use munlink_client::{ClientConfig, MunlinkClient, SessionEvent};
use munlink_core::{init_logging, LoggingConfig};

#[derive(Parser)]
#[command(name = "munlink")]
#[command(about = "Command-line client for the MunLink Zambales municipal platform")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (overrides config file and MUNLINK_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Username for commands that need authentication
    #[arg(short, long)]
    username: Option<String>,

    /// Password; falls back to MUNLINK_PASSWORD
    #[arg(short, long)]
    password: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and show the authenticated profile
    Login,

    /// Log out and invalidate the current token server-side
    Logout,

    /// Check whether a session can be restored from the refresh cookie
    Bootstrap,

    /// Show the authenticated profile
    Profile,

    /// List municipalities served by the platform
    Municipalities,

    /// List published announcements
    Announcements {
        #[arg(long)]
        municipality_id: Option<i64>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Document request services
    Documents {
        #[command(subcommand)]
        command: DocumentCommands,
    },

    /// Marketplace browsing
    Marketplace {
        #[command(subcommand)]
        command: MarketplaceCommands,
    },
}

#[derive(Subcommand)]
enum DocumentCommands {
    /// List document types residents can request
    Types,

    /// List your document requests
    List,

    /// File a new document request
    Request {
        #[arg(long)]
        type_id: i64,

        #[arg(long)]
        municipality_id: i64,

        /// "pickup" or "delivery"
        #[arg(long, default_value = "pickup")]
        delivery: String,

        #[arg(long)]
        purpose: String,
    },
}

#[derive(Subcommand)]
enum MarketplaceCommands {
    /// Browse active listings
    Items {
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        municipality_id: Option<i64>,
    },

    /// List your own listings
    Mine,
}

/// Optional TOML config, checked next to the usual platform locations.
#[derive(Debug, Default, Deserialize)]
struct CliConfig {
    #[serde(default)]
    api_url: Option<String>,
}

fn load_cli_config(path: Option<&PathBuf>) -> anyhow::Result<CliConfig> {
    let candidates = match path {
        Some(path) => vec![Some(path.clone())],
        None => vec![
            dirs::config_dir().map(|d| d.join("munlink").join("config.toml")),
            dirs::home_dir().map(|d| d.join(".munlink").join("config.toml")),
        ],
    };

    for candidate in candidates.into_iter().flatten() {
        if candidate.exists() {
            let content = std::fs::read_to_string(&candidate)
                .with_context(|| format!("reading config {}", candidate.display()))?;
            let config: CliConfig = toml::from_str(&content)
                .with_context(|| format!("parsing config {}", candidate.display()))?;
            info!(path = %candidate.display(), "Loaded configuration");
            return Ok(config);
        }
    }

    Ok(CliConfig::default())
}

/// Log in with the provided credentials, or fall back to cookie bootstrap.
async fn authenticate(client: &MunlinkClient, cli: &Cli) -> anyhow::Result<()> {
    if let Some(username) = &cli.username {
        let password = cli
            .password
            .clone()
            .or_else(|| std::env::var("MUNLINK_PASSWORD").ok())
            .context("password required: pass --password or set MUNLINK_PASSWORD")?;
        client
            .auth()
            .login(&LoginRequest {
                username: username.clone(),
                password,
            })
            .await?;
        return Ok(());
    }

    if client.bootstrap().await {
        return Ok(());
    }
    anyhow::bail!("not logged in: pass --username/--password");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::default();
    if cli.verbose {
        logging_config.level = "debug".to_string();
    }
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let file_config = load_cli_config(cli.config.as_ref())?;
    let base_config = match cli.api_url.clone().or(file_config.api_url) {
        Some(url) => ClientConfig::new(url),
        None => ClientConfig::from_env(),
    };

    let client = MunlinkClient::new(base_config)?;
    let mut events = client.subscribe();

    let result = run_command(&cli, &client).await;

    // Surface a forced logout distinctly from ordinary request errors.
    while let Ok(event) = events.try_recv() {
        if event == SessionEvent::Expired {
            warn!("Session expired; log in again with --username/--password");
        }
    }

    result
}

async fn run_command(cli: &Cli, client: &MunlinkClient) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Login => {
            authenticate(client, cli).await?;
            let profile = client.auth().profile().await?;
            println!(
                "Logged in as {} ({})",
                profile.username,
                profile.role.as_deref().unwrap_or("resident")
            );
        }

        Commands::Logout => {
            authenticate(client, cli).await?;
            client.auth().logout().await?;
            println!("Logged out");
        }

        Commands::Bootstrap => {
            if client.bootstrap().await {
                println!("Session restored");
            } else {
                println!("No restorable session");
            }
        }

        Commands::Profile => {
            authenticate(client, cli).await?;
            let profile = client.auth().profile().await?;
            println!(
                "{} <{}> municipality={}",
                profile.username,
                profile.email.as_deref().unwrap_or("-"),
                profile
                    .municipality
                    .as_ref()
                    .map(|m| m.name.as_str())
                    .unwrap_or("-")
            );
        }

        Commands::Municipalities => {
            let municipalities = client.municipalities().list().await?;
            for municipality in &municipalities {
                println!(
                    "{:>4}  {:<20} {}",
                    municipality.id,
                    municipality.name,
                    municipality.slug.as_deref().unwrap_or("")
                );
            }
        }

        Commands::Announcements {
            municipality_id,
            category,
        } => {
            let filter = AnnouncementFilter {
                municipality_id: *municipality_id,
                category: category.clone(),
                ..Default::default()
            };
            let announcements = client.announcements().list(&filter).await?;
            for announcement in &announcements {
                println!(
                    "[{}] {} - {}",
                    announcement.category.as_deref().unwrap_or("general"),
                    announcement.created_at.as_deref().unwrap_or(""),
                    announcement.title
                );
            }
        }

        Commands::Documents { command } => match command {
            DocumentCommands::Types => {
                let types = client.documents().types().await?;
                for doc_type in &types {
                    println!(
                        "{:>4}  {:<30} fee={}",
                        doc_type.id,
                        doc_type.name,
                        doc_type.fee.unwrap_or(0.0)
                    );
                }
            }
            DocumentCommands::List => {
                authenticate(client, cli).await?;
                let requests = client.documents().my_requests().await?;
                for request in &requests {
                    println!(
                        "{}  {}  {}",
                        request.request_number.as_deref().unwrap_or("-"),
                        request.status.as_deref().unwrap_or("pending"),
                        request.purpose.as_deref().unwrap_or("")
                    );
                }
            }
            DocumentCommands::Request {
                type_id,
                municipality_id,
                delivery,
                purpose,
            } => {
                authenticate(client, cli).await?;
                let request = client
                    .documents()
                    .create_request(&NewDocumentRequest {
                        document_type_id: *type_id,
                        municipality_id: *municipality_id,
                        delivery_method: delivery.clone(),
                        purpose: purpose.clone(),
                        quantity: None,
                        notes: None,
                    })
                    .await?;
                println!(
                    "Request filed: {}",
                    request.request_number.as_deref().unwrap_or("(pending number)")
                );
            }
        },

        Commands::Marketplace { command } => match command {
            MarketplaceCommands::Items {
                search,
                category,
                municipality_id,
            } => {
                let filter = ItemFilter {
                    search: search.clone(),
                    category: category.clone(),
                    municipality_id: *municipality_id,
                    ..Default::default()
                };
                let page = client.marketplace().list_items(&filter).await?;
                for item in &page.items {
                    println!(
                        "{:>5}  {:<30} {:>10}  {}",
                        item.id,
                        item.title,
                        item.price.map(|p| format!("{:.2}", p)).unwrap_or_default(),
                        item.municipality_name.as_deref().unwrap_or("")
                    );
                }
                println!("page {}/{} ({} items)", page.page, page.pages, page.total);
            }
            MarketplaceCommands::Mine => {
                authenticate(client, cli).await?;
                let items = client.marketplace().my_items().await?;
                for item in &items {
                    println!(
                        "{:>5}  {:<30} {}",
                        item.id,
                        item.title,
                        item.status.as_deref().unwrap_or("active")
                    );
                }
            }
        },
    }

    Ok(())
}
