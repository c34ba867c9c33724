//! Lockbox CLI - run a vault server or talk to one.
//!
//! `lockbox serve` starts the HTTP server. Every other command is a client
//! call; the token from `register` or `login` is kept on disk so later
//! invocations reuse the session.

mod session;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use zeroize::Zeroizing;

use lockbox_client::VaultClient;
use lockbox_common::{CardPayload, LoginPayload, NewRecord, Record, RecordId, RecordKind};
use lockbox_crypto::{KdfParams, SigningSecret};
use lockbox_server::{serve, shutdown_signal, ServerConfig};

use session::TokenFile;

#[derive(Parser)]
#[command(name = "lockbox")]
#[command(about = "Lockbox - personal secrets vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Server URL used by client commands.
    #[arg(
        long,
        global = true,
        env = "LOCKBOX_SERVER",
        default_value = "http://127.0.0.1:3200"
    )]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the vault server.
    Serve {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on.
        #[arg(short, long, env = "LOCKBOX_ADDRESS")]
        address: Option<String>,

        /// SQLite database path, or ":memory:".
        #[arg(short, long, env = "LOCKBOX_DATABASE")]
        database: Option<String>,

        /// Session token lifetime in seconds.
        #[arg(long)]
        token_ttl: Option<u64>,

        /// Password hashing strength: "interactive", "moderate", or "sensitive".
        #[arg(long)]
        kdf: Option<String>,

        /// Token signing secret. Generated at startup when absent.
        #[arg(long, env = "LOCKBOX_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Create an account and log in.
    Register {
        /// Account name.
        username: String,
    },

    /// Log in to an existing account.
    Login {
        /// Account name.
        username: String,
    },

    /// Forget the stored session.
    Logout,

    /// Store a new record.
    Store {
        #[command(subcommand)]
        record: StoreCommand,
    },

    /// Show one record.
    Get {
        /// Record id.
        id: i64,

        /// Write binary data to this file instead of summarising it.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace a record's description and/or data.
    Update {
        /// Record id.
        id: i64,

        /// New description.
        #[arg(short, long)]
        meta: Option<String>,

        /// New data as text.
        #[arg(short, long, conflicts_with = "file")]
        text: Option<String>,

        /// New data read from a file (JSON for login and card records).
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List your records.
    List,

    /// Delete a record.
    Delete {
        /// Record id.
        id: i64,
    },

    /// Show the server version.
    Version,
}

#[derive(Subcommand)]
enum StoreCommand {
    /// A login/password pair. The password is prompted for.
    Login {
        /// Description.
        #[arg(short, long)]
        meta: String,

        /// Login name.
        #[arg(short, long)]
        login: String,
    },

    /// Free-form text.
    Text {
        /// Description.
        #[arg(short, long)]
        meta: String,

        /// The text.
        text: String,
    },

    /// A payment card. The CVV is prompted for.
    Card {
        /// Description.
        #[arg(short, long)]
        meta: String,

        /// Card number.
        #[arg(short, long)]
        number: String,

        /// Expiry date.
        #[arg(short, long)]
        date: String,
    },

    /// Contents of a file.
    Binary {
        /// Description.
        #[arg(short, long)]
        meta: String,

        /// File to store.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve {
            config,
            address,
            database,
            token_ttl,
            kdf,
            secret,
        } => {
            let config = server_config(config.as_deref(), address, database, token_ttl, kdf)?;
            cmd_serve(config, secret).await
        }

        Commands::Register { username } => cmd_register(&cli.server, &username).await,

        Commands::Login { username } => cmd_login(&cli.server, &username).await,

        Commands::Logout => cmd_logout(),

        Commands::Store { record } => cmd_store(&cli.server, record).await,

        Commands::Get { id, output } => cmd_get(&cli.server, id, output.as_deref()).await,

        Commands::Update {
            id,
            meta,
            text,
            file,
        } => cmd_update(&cli.server, id, meta, text, file.as_deref()).await,

        Commands::List => cmd_list(&cli.server).await,

        Commands::Delete { id } => cmd_delete(&cli.server, id).await,

        Commands::Version => cmd_version(&cli.server).await,
    }
}

/// Prompt for a secret without echo.
fn prompt_secret(prompt: &str) -> Result<Zeroizing<String>> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read input")?;
    Ok(Zeroizing::new(secret))
}

/// Merge the configuration file with command-line overrides.
fn server_config(
    path: Option<&Path>,
    address: Option<String>,
    database: Option<String>,
    token_ttl: Option<u64>,
    kdf: Option<String>,
) -> Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::from_json_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(address) = address {
        config.listen_addr = address;
    }
    if let Some(database) = database {
        config.database = database;
    }
    if let Some(ttl) = token_ttl {
        config.token_ttl_secs = ttl;
    }
    if let Some(preset) = kdf {
        config.kdf = KdfParams::from_preset(&preset)?;
    }
    Ok(config)
}

/// Run the server until Ctrl-C or SIGTERM.
async fn cmd_serve(config: ServerConfig, secret: Option<String>) -> Result<()> {
    let secret = match secret {
        Some(secret) => SigningSecret::from_bytes(Zeroizing::new(secret).as_bytes().to_vec())?,
        None => {
            warn!("LOCKBOX_SECRET not set; using a random signing secret, sessions will not survive a restart");
            SigningSecret::generate()
        }
    };

    let handler = config.build_handler(secret)?;
    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    serve(listener, handler, shutdown_signal()).await?;
    Ok(())
}

async fn cmd_register(server: &str, username: &str) -> Result<()> {
    let password = prompt_secret("Choose password: ")?;
    let confirm = prompt_secret("Confirm password: ")?;
    if *password != *confirm {
        bail!("Passwords do not match");
    }

    let mut client = VaultClient::new(server)?;
    let token = client.register(username, &password).await?;
    TokenFile::default_location()?.save(&token)?;

    info!("Registered and logged in as {}", username);
    Ok(())
}

async fn cmd_login(server: &str, username: &str) -> Result<()> {
    let password = prompt_secret("Password: ")?;

    let mut client = VaultClient::new(server)?;
    let token = client.login(username, &password).await?;
    TokenFile::default_location()?.save(&token)?;

    info!("Logged in as {}", username);
    Ok(())
}

fn cmd_logout() -> Result<()> {
    TokenFile::default_location()?.clear()?;
    info!("Logged out");
    Ok(())
}

/// Client carrying the stored session token.
fn session_client(server: &str) -> Result<VaultClient> {
    let token = TokenFile::default_location()?
        .load()?
        .context("Not logged in; run `lockbox login <username>` first")?;
    Ok(VaultClient::new(server)?.with_token(token))
}

async fn cmd_store(server: &str, command: StoreCommand) -> Result<()> {
    let record = match command {
        StoreCommand::Login { meta, login } => {
            let password = prompt_secret("Password to store: ")?;
            let payload = LoginPayload {
                login,
                password: password.to_string(),
            };
            NewRecord {
                kind: RecordKind::Login,
                data: payload.to_bytes()?,
                meta,
            }
        }
        StoreCommand::Text { meta, text } => NewRecord {
            kind: RecordKind::Text,
            data: text.into_bytes(),
            meta,
        },
        StoreCommand::Card { meta, number, date } => {
            let cvv = prompt_secret("CVV: ")?;
            let payload = CardPayload {
                number,
                date,
                cvv: cvv.to_string(),
            };
            NewRecord {
                kind: RecordKind::Card,
                data: payload.to_bytes()?,
                meta,
            }
        }
        StoreCommand::Binary { meta, file } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            NewRecord {
                kind: RecordKind::Binary,
                data,
                meta,
            }
        }
    };

    let id = session_client(server)?.store(&record).await?;
    println!("Stored record {}", id);
    Ok(())
}

async fn cmd_get(server: &str, id: i64, output: Option<&Path>) -> Result<()> {
    let record = session_client(server)?.retrieve(RecordId::new(id)).await?;

    println!("Record {} ({})", record.id, record.kind);
    println!("  Meta: {}", record.meta);

    match record.kind {
        RecordKind::Login => {
            let payload = LoginPayload::from_bytes(&record.data)?;
            println!("  Login: {}", payload.login);
            println!("  Password: {}", payload.password);
        }
        RecordKind::Card => {
            let payload = CardPayload::from_bytes(&record.data)?;
            println!("  Number: {}", payload.number);
            println!("  Date: {}", payload.date);
            println!("  CVV: {}", payload.cvv);
        }
        RecordKind::Text => {
            println!("  Text: {}", String::from_utf8_lossy(&record.data));
        }
        RecordKind::Binary => write_binary(&record, output)?,
    }
    Ok(())
}

fn write_binary(record: &Record, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, &record.data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("  Wrote {} bytes to {}", record.data.len(), path.display());
        }
        None => println!("  {} bytes (use --output to save)", record.data.len()),
    }
    Ok(())
}

async fn cmd_update(
    server: &str,
    id: i64,
    meta: Option<String>,
    text: Option<String>,
    file: Option<&Path>,
) -> Result<()> {
    if meta.is_none() && text.is_none() && file.is_none() {
        bail!("Nothing to update; pass --meta, --text or --file");
    }

    let client = session_client(server)?;
    let id = RecordId::new(id);
    let current = client.retrieve(id).await?;

    let data = match (text, file) {
        (Some(text), _) => text.into_bytes(),
        (None, Some(path)) => {
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        (None, None) => current.data,
    };
    let meta = meta.unwrap_or(current.meta);

    client.update(id, &meta, &data).await?;
    println!("Updated record {}", id);
    Ok(())
}

async fn cmd_list(server: &str) -> Result<()> {
    let records = session_client(server)?.list().await?;

    if records.is_empty() {
        println!("(no records)");
        return Ok(());
    }
    for record in records {
        println!("{:>6}  {:<7} {}", record.id.get(), record.kind.as_str(), record.meta);
    }
    Ok(())
}

async fn cmd_delete(server: &str, id: i64) -> Result<()> {
    let id = RecordId::new(id);
    session_client(server)?.delete(id).await?;
    println!("Deleted record {}", id);
    Ok(())
}

async fn cmd_version(server: &str) -> Result<()> {
    let version = VaultClient::new(server)?.version().await?;
    println!("client: {}", env!("CARGO_PKG_VERSION"));
    println!("server: {} {}", version.name, version.version);
    Ok(())
}
