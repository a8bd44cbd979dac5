use clap::Parser;
use limitd_core::{config, DecisionEngine, MemoryEngine, RedisEngine, RuleCatalog};
use limitd_server::api::handlers::AppState;
use limitd_server::api::{create_router, metrics};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "limitd", about = "Distributed rate-limiting decision service")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Redis connection URL
    #[arg(long, default_value = config::DEFAULT_REDIS_URL)]
    redis_url: String,

    /// Path to the policy catalog document
    #[arg(short, long, default_value = config::DEFAULT_RULES_PATH)]
    rules: String,

    /// Keep bucket state in process memory instead of Redis.
    /// Limits are then enforced per instance, not fleet-wide.
    #[arg(long, default_value_t = false)]
    memory_store: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(
                    "limitd_server=info"
                        .parse()
                        .expect("valid directive literal"),
                )
                .add_directive(
                    "limitd_core=info"
                        .parse()
                        .expect("valid directive literal"),
                ),
        )
        .init();

    let args = Args::parse();

    if args.port == 0 {
        eprintln!("Error: port must be > 0");
        std::process::exit(1);
    }

    let catalog = match RuleCatalog::load(&args.rules) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            eprintln!("Error: failed to load rate limit rules '{}': {}", args.rules, e);
            std::process::exit(1);
        }
    };

    let engine: Arc<dyn DecisionEngine> = if args.memory_store {
        tracing::warn!("Using in-process bucket store; limits are per-instance only");
        Arc::new(MemoryEngine::new())
    } else {
        match RedisEngine::connect(&args.redis_url).await {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                eprintln!("Error: failed to connect to Redis at {}: {}", args.redis_url, e);
                eprintln!("Start one with: docker run --name redis-limitd -p 6379:6379 -d redis:alpine");
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = engine.ping().await {
        eprintln!("Error: store did not answer ping: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Connected to bucket store");

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let state = AppState {
        engine: engine.clone(),
        catalog: catalog.clone(),
        prometheus_handle,
        start_time: Instant::now(),
    };

    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", args.port);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        rules = %args.rules,
        tiers = catalog.tiers.len(),
        endpoints = catalog.endpoints.len(),
        memory_store = args.memory_store,
        "limitd ready"
    );

    // Spawn the store health gauge background task
    let health_engine = engine.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(config::STORE_HEALTH_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let connected = health_engine.ping().await.is_ok();
            metrics::update_store_health(connected);
            if !connected {
                tracing::warn!("Bucket store unreachable");
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
