//! solwallet - command line wallet for SOL transfers and address history
//!
//! ## Commands
//!
//! - **connect**: load the keypair and print the wallet identity
//! - **account**: print the lamports and owner of an account
//! - **history**: list the resolved transactions of an address
//! - **send**: sign and submit a system transfer, then wait for confirmation

// Compiler warning configuration
#![warn(dead_code)]
#![warn(unused_must_use)]

use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use solana_sdk::{pubkey::Pubkey, transaction::Transaction};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use solwallet::config::{Config, LoggingConfig};
use solwallet::history::{HistoryFetcher, ResolutionPolicy};
use solwallet::metrics::metrics;
use solwallet::rpc::{NetworkClient, RpcNetworkClient};
use solwallet::transfer::TransferFlow;
use solwallet::tx_builder::format_sol;
use solwallet::types::TransactionRecord;
use solwallet::wallet::{Approver, KeypairWallet, WalletAgent};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Sign without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Print prometheus metrics after the command
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect the wallet and print its address
    Connect,

    /// Show an account (defaults to the wallet)
    Account { address: Option<String> },

    /// List confirmed transactions of an address (defaults to the wallet)
    History {
        address: Option<String>,

        /// Fail if any listed signature cannot be resolved
        #[arg(long)]
        strict: bool,
    },

    /// Transfer SOL to DESTINATION
    Send {
        destination: String,

        /// Amount in lamports; defaults to `transfer.default_lamports`
        #[arg(long)]
        lamports: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_found = std::path::Path::new(&args.config).exists();
    let config = load_config(&args.config)?;
    init_logging(args.verbose, &config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting solwallet");
    if !config_found {
        warn!("Config file '{}' not found, using defaults", args.config);
    }

    let client = RpcNetworkClient::from_config(&config).context("Failed to create RPC client")?;
    info!(
        endpoint = client.endpoint(),
        commitment = ?client.commitment().commitment,
        "RPC client ready"
    );
    let network: Arc<dyn NetworkClient> = Arc::new(client);

    let result = run(&args, &config, network).await;

    if args.metrics {
        print!("{}", metrics().render()?);
    }
    result
}

async fn run(args: &Args, config: &Config, network: Arc<dyn NetworkClient>) -> Result<()> {
    match &args.command {
        Command::Connect => {
            let flow = transfer_flow(config, args.yes, network)?;
            let identity = flow.connect().await?;
            println!("Connected: {identity}");
        }

        Command::Account { address } => {
            let flow = transfer_flow(config, args.yes, network)?;
            let pubkey = match address {
                Some(address) => parse_address(address)?,
                None => flow.connect().await?,
            };
            match flow.inspect_account(&pubkey).await? {
                Some(snapshot) => {
                    println!("Address:    {pubkey}");
                    println!("Balance:    {} SOL", format_sol(snapshot.lamports));
                    println!("Owner:      {}", snapshot.owner);
                    println!("Data:       {} bytes", snapshot.data_len);
                    println!("Executable: {}", snapshot.executable);
                }
                None => println!("Account {pubkey} does not exist"),
            }
        }

        Command::History { address, strict } => {
            let pubkey = match address {
                Some(address) => parse_address(address)?,
                None => load_wallet(config, args.yes)?.pubkey(),
            };
            let mut fetcher = HistoryFetcher::from_config(network, &config.history);
            if *strict {
                fetcher = fetcher.with_policy(ResolutionPolicy::Strict);
            }

            let records = fetcher.fetch_history(&pubkey).await?;
            if records.is_empty() {
                println!("No transactions for {pubkey}");
            }
            for record in &records {
                println!("{}", format_record(record));
            }
        }

        Command::Send {
            destination,
            lamports,
        } => {
            let flow = transfer_flow(config, args.yes, network)?;
            flow.connect().await?;
            let lamports = lamports.unwrap_or(config.transfer.default_lamports);

            match flow.send(destination, lamports).await {
                Ok(receipt) => {
                    println!(
                        "Sent {} SOL to {}\nSignature: {}",
                        format_sol(receipt.lamports),
                        receipt.to,
                        receipt.signature
                    );
                }
                Err(err) if err.outcome_unknown() => {
                    return Err(err).context(
                        "Transfer may still land; check history before sending again",
                    );
                }
                Err(err) => return Err(err).context("Transfer failed"),
            }
        }
    }
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, logging: &LoggingConfig) -> Result<()> {
    let default_filter = if verbose {
        "solwallet=debug,info"
    } else {
        logging.level.as_str()
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    let config = if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))?
    } else {
        let mut config = Config::default();
        dotenvy::dotenv().ok();
        config.apply_env();
        config
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn load_wallet(config: &Config, assume_yes: bool) -> Result<KeypairWallet> {
    let wallet = KeypairWallet::from_file(&config.wallet.keypair_path)
        .context("Failed to load wallet")?;
    Ok(if assume_yes {
        wallet
    } else {
        wallet.with_approver(stdin_approver())
    })
}

fn transfer_flow(
    config: &Config,
    assume_yes: bool,
    network: Arc<dyn NetworkClient>,
) -> Result<TransferFlow> {
    let wallet: Arc<dyn WalletAgent> = Arc::new(load_wallet(config, assume_yes)?);
    let commitment = config.rpc.commitment_config()?;
    Ok(TransferFlow::new(network, wallet, commitment))
}

/// Ask on the terminal before every signature
fn stdin_approver() -> Approver {
    Arc::new(|tx: &Transaction| {
        let mut stderr = std::io::stderr();
        let payer = tx.message.account_keys.first().copied().unwrap_or_default();
        let _ = writeln!(
            stderr,
            "Sign transaction: fee payer {}, {} instruction(s), blockhash {}",
            payer,
            tx.message.instructions.len(),
            tx.message.recent_blockhash
        );
        let _ = write!(stderr, "Approve? [y/N] ");
        let _ = stderr.flush();

        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    })
}

fn parse_address(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address.trim()).with_context(|| format!("Invalid address '{address}'"))
}

fn format_record(record: &TransactionRecord) -> String {
    let time = record
        .block_time()
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = match record.succeeded() {
        Some(true) => "ok",
        Some(false) => "failed",
        None => "unknown",
    };
    format!(
        "{}  slot {:>10}  {}  {}",
        record.signature,
        record.slot(),
        time,
        status
    )
}
