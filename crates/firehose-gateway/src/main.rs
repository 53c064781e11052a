use clap::Parser;
use firehose_core::config::FirehoseConfig;
use firehose_pipeline::{
    consumer::spawn_consumer, event_queue, EventProcessor, FanoutDispatcher, RateController,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod app;
mod http;

#[derive(Parser, Debug)]
#[command(name = "firehose-gateway", version, about = "Rate-probing event pipeline with long-poll fan-out")]
struct Args {
    /// Path to firehose.toml. Falls back to FIREHOSE_CONFIG, then
    /// ~/.firehose/firehose.toml.
    #[arg(long)]
    config: Option<String>,

    /// Start the rate search immediately instead of waiting for
    /// POST /generator/start.
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "firehose_gateway=info,firehose_pipeline=info,tower_http=debug".into()
            }),
        )
        .init();

    let args = Args::parse();

    // load config: --config > FIREHOSE_CONFIG env > ~/.firehose/firehose.toml
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("FIREHOSE_CONFIG").ok());
    let mut config = FirehoseConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        FirehoseConfig::default()
    });
    if args.autostart {
        config.controller.autostart = true;
    }

    let bind = config.server.bind.clone();
    let port = config.server.port;

    // ring -> processor -> dispatcher
    let (publisher, consumer) = event_queue(config.queue.capacity)?;
    info!(capacity = config.queue.capacity, "event queue ready");
    let dispatcher = Arc::new(FanoutDispatcher::new());
    let processor = EventProcessor::new(Arc::clone(&dispatcher));
    let consumer_cancel = CancellationToken::new();
    let consumer_handle = spawn_consumer(consumer, processor, consumer_cancel.clone())?;

    let controller = RateController::new(publisher, config.controller.clone());
    let shutdown = CancellationToken::new();
    let state = Arc::new(app::AppState::new(
        config,
        controller,
        dispatcher,
        shutdown.clone(),
    ));

    if state.config.controller.autostart {
        state.controller.start()?;
    }

    let router = app::build_router(state.clone());
    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Firehose gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    // stop the producer first so the consumer can drain what is left
    if state.controller.stop().is_ok() {
        info!("waiting for rate controller to exit");
    }
    let st = Arc::clone(&state);
    tokio::task::spawn_blocking(move || st.controller.join()).await??;

    consumer_cancel.cancel();
    let processed = tokio::task::spawn_blocking(move || consumer_handle.join())
        .await?
        .map_err(|_| anyhow::anyhow!("event processor thread panicked"))?;
    info!(processed, "shutdown complete");
    Ok(())
}

/// Resolve on Ctrl-C and release every held connection.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl-C handler failed: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    shutdown.cancel();
}
