use anyhow::Context;
use docsum::{
    api, config,
    credentials::CredentialStore,
    logging,
    providers::HttpProviderFactory,
    summarize::{SummarizeService, Workspace},
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let workspace = Workspace::new(config.upload_dir.clone(), config.output_dir.clone());
    workspace
        .sweep()
        .await
        .context("Failed to prepare upload/output directories")?;

    let credentials = Arc::new(CredentialStore::new(config.credentials_path.clone()));
    let seeded = credentials
        .seed_from_env()
        .await
        .context("Failed to seed provider keys from the environment")?;
    if !seeded.is_empty() {
        tracing::info!(providers = ?seeded, "Seeded provider keys from environment");
    }
    if !credentials.has_any().await? {
        tracing::warn!("No AI provider configured; add a key before summarizing");
    }

    let factory =
        HttpProviderFactory::from_config(config).context("Failed to build provider HTTP client")?;
    let service = SummarizeService::new(credentials, Arc::new(factory), workspace);
    let app = api::create_router(Arc::new(service));

    let (listener, port) = bind_listener().await.context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 5000..=5099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 5000-5099",
    ))
}
