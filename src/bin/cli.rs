//! resplite CLI Client
//!
//! Command-line interface for issuing GET and SET against a Redis server.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use resplite::{Client, ClientConfig, DEFAULT_PORT};
use tracing_subscriber::{fmt, EnvFilter};

/// resplite CLI
#[derive(Parser, Debug)]
#[command(name = "resplite-cli")]
#[command(about = "Minimal RESP client for GET and SET")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Password sent with AUTH after connecting
    #[arg(short = 'a', long)]
    password: Option<String>,

    /// Connect/read/write timeout in milliseconds (0 disables)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,resplite=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("(error) {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> resplite::Result<()> {
    let mut builder = ClientConfig::builder()
        .host(args.host)
        .port(args.port)
        .connect_timeout_ms(args.timeout_ms)
        .io_timeout_ms(args.timeout_ms);
    if let Some(password) = args.password {
        builder = builder.password(password);
    }

    let client = Client::new(builder.build())?;
    client.connect()?;

    let outcome = match args.command {
        Commands::Get { key } => client.get(&key).map(|value| match value {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        }),
        Commands::Set { key, value } => client.set(&key, &value).map(|()| println!("OK")),
    };

    client.disconnect();
    outcome
}
