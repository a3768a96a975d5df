use std::net::SocketAddr;
use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod tls;

use config::Config;
use storefront_core::{create_adapters, sync_all, CatalogStore};

/// Serves the storefront catalog as a paged product query over HTTP.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1:8443")]
    bind: SocketAddr,

    #[arg(long, default_value = "certs/server.crt")]
    cert: PathBuf,

    #[arg(long, default_value = "certs/server.key")]
    key: PathBuf,

    #[arg(long, default_value = "certs/ca.crt")]
    client_ca: PathBuf,

    #[arg(long, default_value_t = false)]
    no_tls: bool,

    /// Skip the demo collections
    #[arg(long, default_value_t = false)]
    no_seed: bool,

    /// Path to catalog configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog config");
            config::load_config(path)?
        }
        None => Config::default(),
    };

    let store = CatalogStore::with_max_page_size(cfg.max_page_size);
    if !args.no_seed {
        store.seed_example();
        info!("Seeded demo collections");
    }

    let adapters = create_adapters(&cfg.adapter)?;
    let added = sync_all(&store, &adapters).await;
    info!(
        collections = store.collections().len(),
        added,
        max_page_size = store.max_page_size(),
        "Catalog ready"
    );

    serve(api::routes(store), &args).await
}

async fn serve(app: axum::Router, args: &Args) -> anyhow::Result<()> {
    info!(bind = %args.bind, tls = !args.no_tls, "Starting storefront feed server");

    if args.no_tls {
        info!("TLS disabled (development mode)");
        axum::Server::bind(&args.bind)
            .serve(app.into_make_service())
            .await?;
        return Ok(());
    }

    let server_config = tls::make_server_config(&args.cert, &args.key, &args.client_ca)?;
    info!(client_ca = %args.client_ca.display(), "Client certificates required");
    axum_server::bind_rustls(args.bind, RustlsConfig::from_config(server_config))
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
