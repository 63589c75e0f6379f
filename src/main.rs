use claude_bridge::config::config_search_paths;
use claude_bridge::{
    build_router, AppState, BackendSelector, BrandClassifier, CredentialStore, GatewayClient,
    ProxyConfig, RequestJournal, VendorClient,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "claude-bridge",
    about = "OpenAI-compatible chat completions endpoint backed by the Claude Messages API",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Request journal path (JSONL)
    #[arg(long, default_value = "claude-bridge.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claude_bridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let journal = RequestJournal::open(&cli.log_file)?;
    let credentials = CredentialStore::from_env(&config.vendor.api_key_env);

    // A client that fails to build leaves the gateway as the only route.
    let vendor = match VendorClient::new(&config.vendor, credentials.clone()) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Claude API client not initialized: {e}");
            None
        }
    };

    let gateway = config.gateway.base_url.as_deref().map(|base_url| {
        GatewayClient::new(reqwest::Client::new(), base_url, config.gateway_api_key())
    });

    let selector = BackendSelector::new(
        Arc::new(BrandClassifier::new(&config.vendor.brand)),
        credentials.clone(),
        vendor.is_some(),
    );

    info!("claude-bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("  Claude API:  {}", config.vendor.base_url);
    info!(
        "  Credential:  {} ({})",
        config.vendor.api_key_env,
        if credentials.is_present() { "set" } else { "missing" }
    );
    info!(
        "  Gateway:     {}",
        gateway.as_ref().map_or("none", GatewayClient::completions_url)
    );
    info!("  Thinking:    {} token budget", config.translation.thinking_budget);
    info!("  Port:        {}", config.port);
    info!("  Models:      {} advertised", config.models.catalog.len());
    info!("  Journal:     {}", journal.path().display());

    #[cfg(unix)]
    spawn_credential_reload(credentials.clone());

    let state = Arc::new(AppState {
        policy: config.translation_policy(),
        config: config.clone(),
        selector,
        vendor,
        gateway,
        journal: Some(journal),
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("  OPENAI_BASE_URL=http://localhost:{}/v1", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("claude-bridge shut down");
    Ok(())
}

/// Re-read the vendor credential from the environment on SIGHUP.
#[cfg(unix)]
fn spawn_credential_reload(credentials: CredentialStore) {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::hangup()) {
        Ok(mut hangup) => {
            tokio::spawn(async move {
                while hangup.recv().await.is_some() {
                    credentials.reload();
                }
            });
        }
        Err(e) => warn!("SIGHUP handler not installed: {e}"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl+C handler failed: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => warn!("Received Ctrl+C, shutting down"),
        () = terminate => warn!("Received SIGTERM, shutting down"),
    }
}
