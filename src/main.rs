use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::Path;

use amisbbs::bbs::BbsServer;
use amisbbs::config::Config;
use amisbbs::storage::{Argon2Hasher, CredentialHasher, MessageBaseDirectory, Storage};

#[derive(Parser)]
#[command(name = "amisbbs")]
#[command(about = "A dial-in style terminal Bulletin Board System")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the BBS server
    Start {
        /// Listen on this TCP port instead of the configured one
        #[arg(short, long)]
        port: Option<u16>,
        /// Also run a local caller session on this terminal
        #[arg(long)]
        console: bool,
    },
    /// Initialize a new BBS configuration
    Init,
    /// Show BBS status and statistics
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create, update, delete or list message bases
    Base {
        #[command(subcommand)]
        action: BaseAction,
    },
    /// Set the operator password that unlocks the local console
    SysopPassword,
}

#[derive(Subcommand)]
enum BaseAction {
    /// Create a message base
    Create {
        name: String,
        /// Minimum caller level to read (0 = public)
        #[arg(long, default_value_t = 0)]
        read: i64,
        /// Minimum caller level to post (0 = public)
        #[arg(long, default_value_t = 0)]
        post: i64,
    },
    /// Rename a message base and/or change its access levels
    Update {
        id: i64,
        name: String,
        #[arg(long)]
        read: i64,
        #[arg(long)]
        post: i64,
    },
    /// Delete a message base that has no messages
    Delete { id: i64 },
    /// List message bases
    List,
}

fn init_logging(verbose: u8, configured: &str) {
    let log_level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(cli.verbose, "info");
            info!("Initializing new BBS configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Start { port, console } => {
            let mut config = load_config(&cli.config, cli.verbose).await?;
            info!("Starting amisbbs v{}", env!("CARGO_PKG_VERSION"));
            if let Some(port) = port {
                config.server.port = port;
            }
            if console {
                unlock_console(&config)?;
            }
            let bbs = BbsServer::new(config).await?;
            bbs.run(console).await?;
        }
        Commands::Status { json } => {
            let config = load_config(&cli.config, cli.verbose).await?;
            if json {
                let storage = open_storage(&config)?;
                let statistics = storage.statistics()?;
                let bases = MessageBaseDirectory::new(storage.into()).list()?;
                let payload = serde_json::json!({
                    "name": config.bbs.name,
                    "sysop": config.bbs.sysop,
                    "listen": config.server.listen_addr(),
                    "allow_new_users": config.bbs.allow_new_users,
                    "statistics": statistics,
                    "message_bases": bases,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                let bbs = BbsServer::new(config).await?;
                bbs.show_status().await?;
            }
        }
        Commands::Base { action } => {
            let config = load_config(&cli.config, cli.verbose).await?;
            let directory = MessageBaseDirectory::new(open_storage(&config)?.into());
            match action {
                BaseAction::Create { name, read, post } => {
                    let id = directory.create(&name, read, post)?;
                    println!("Created message base #{} {}", id, name.trim());
                }
                BaseAction::Update { id, name, read, post } => {
                    directory.update(id, &name, read, post)?;
                    println!("Updated message base #{}", id);
                }
                BaseAction::Delete { id } => {
                    directory.delete(id)?;
                    println!("Deleted message base #{}", id);
                }
                BaseAction::List => {
                    for base in directory.list()? {
                        println!("#{:<4} {:<24} read {:<3} post {}", base.id, base.name, base.access_read, base.access_post);
                    }
                }
            }
        }
        Commands::SysopPassword => {
            let mut config = load_config(&cli.config, cli.verbose).await?;
            let first = rpassword::prompt_password("New sysop password: ")?;
            if first.is_empty() {
                bail!("Password cannot be empty");
            }
            let second = rpassword::prompt_password("Repeat password: ")?;
            if first != second {
                bail!("Passwords do not match");
            }
            let hasher = Argon2Hasher::from_config(config.argon2())?;
            config.bbs.sysop_password_hash = Some(hasher.hash(&first)?);
            config.save(&cli.config).await?;
            info!("Sysop password updated in {}", cli.config);
        }
    }

    Ok(())
}

/// Load the config file, then start logging at its configured level unless `-v` overrides it
async fn load_config(path: &str, verbose: u8) -> Result<Config> {
    let config = Config::load(path).await?;
    init_logging(verbose, &config.logging.level);
    Ok(config)
}

fn open_storage(config: &Config) -> Result<Storage> {
    Storage::open(Path::new(&config.storage.database))
        .map_err(|e| anyhow!("Failed to open database {}: {}", config.storage.database, e))
}

/// The local console is a caller session on the operator's own terminal; when a
/// sysop password is configured it must be entered first.
fn unlock_console(config: &Config) -> Result<()> {
    let Some(stored) = &config.bbs.sysop_password_hash else {
        warn!("No sysop password configured; local console is unlocked");
        return Ok(());
    };
    let entered = rpassword::prompt_password("Sysop password: ")?;
    if !Argon2Hasher::new().matches(stored, &entered) {
        bail!("Invalid sysop password");
    }
    Ok(())
}
