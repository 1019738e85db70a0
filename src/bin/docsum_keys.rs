use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docsum::{
    config::Config,
    credentials::CredentialStore,
    logging,
    providers::{self, HttpProviderFactory, ProviderName},
};

#[derive(Parser)]
#[command(
    name = "docsum-keys",
    about = "Manage AI provider API keys for the document summarizer"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a key, replacing any existing key for the provider.
    Add {
        #[arg(value_parser = parse_provider)]
        provider: ProviderName,
        #[arg(long)]
        key: String,
        /// Make this provider the default.
        #[arg(long)]
        default: bool,
        /// Check the key against the provider before storing it.
        #[arg(long)]
        validate: bool,
    },
    /// Delete the stored key for a provider.
    Remove {
        #[arg(value_parser = parse_provider)]
        provider: ProviderName,
    },
    /// Use this provider when requests do not name one.
    SetDefault {
        #[arg(value_parser = parse_provider)]
        provider: ProviderName,
    },
    /// Show stored keys (masked).
    List,
    /// Check a key (or the stored key) against the provider.
    Test {
        #[arg(value_parser = parse_provider)]
        provider: ProviderName,
        #[arg(long)]
        key: Option<String>,
    },
}

fn parse_provider(raw: &str) -> Result<ProviderName, String> {
    raw.parse()
        .map_err(|()| format!("unknown provider '{raw}' (expected gemini or groq)"))
}

#[tokio::main]
async fn main() {
    logging::init_cli_tracing();
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("failed to load configuration")?;
    let store = CredentialStore::new(config.credentials_path.clone());

    match cli.command {
        Command::Add {
            provider,
            key,
            default,
            validate,
        } => {
            if validate && !check_key(&config, provider, key.trim()).await? {
                bail!("{provider} rejected the key; nothing was stored");
            }
            store.add(provider, &key).await?;
            if default {
                store.set_default(provider).await?;
            }
            println!("Stored {provider} key in {}", store.path().display());
        }
        Command::Remove { provider } => {
            store.remove(provider).await?;
            println!("Removed {provider} key");
        }
        Command::SetDefault { provider } => {
            store.set_default(provider).await?;
            println!("{provider} is now the default provider");
        }
        Command::List => {
            let entries = store.list().await?;
            if entries.is_empty() {
                println!("No providers configured");
            }
            for entry in entries {
                let marker = if entry.is_default { "*" } else { " " };
                println!(
                    "{marker} {:<8} {:<16} added {}",
                    entry.provider.as_str(), entry.masked_key, entry.added_at
                );
            }
        }
        Command::Test { provider, key } => {
            let key = match key {
                Some(key) => key,
                None => store.credential_for(provider).await?.api_key,
            };
            if check_key(&config, provider, key.trim()).await? {
                println!("{provider}: key accepted");
            } else {
                bail!("{provider}: key rejected");
            }
        }
    }
    Ok(())
}

async fn check_key(config: &Config, provider: ProviderName, key: &str) -> Result<bool> {
    let factory =
        HttpProviderFactory::from_config(config).context("failed to build HTTP client")?;
    Ok(providers::test_connection(&factory, provider, key).await?)
}
