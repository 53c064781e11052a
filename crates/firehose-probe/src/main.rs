use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

mod reader;

use reader::ReaderList;

#[derive(Parser, Debug)]
#[command(name = "firehose-probe", version, about = "Open N streaming readers against a firehose gateway")]
struct Args {
    /// Stream endpoint, e.g. http://127.0.0.1:8080/stream
    url: String,

    /// Number of concurrent readers.
    #[arg(default_value_t = 1)]
    clients: usize,

    /// Serve the per-reader byte counters as JSON on GET /readers.
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Seconds between counter reports in the log; 0 disables them.
    #[arg(long, default_value_t = 10)]
    report_secs: u64,
}

#[derive(Serialize)]
struct ReadersReport {
    total: u64,
    readers: BTreeMap<String, u64>,
}

#[derive(Serialize)]
struct ReaderCount {
    name: String,
    bytes: u64,
}

/// GET /readers
async fn readers_handler(State(list): State<ReaderList>) -> Json<ReadersReport> {
    Json(ReadersReport {
        total: list.total(),
        readers: list.snapshot(),
    })
}

/// GET /readers/{name}: one counter, e.g. `reader.3`.
async fn reader_handler(
    State(list): State<ReaderList>,
    Path(name): Path<String>,
) -> Result<Json<ReaderCount>, StatusCode> {
    let bytes = list.get(&name).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ReaderCount { name, bytes }))
}

fn counters_router(list: ReaderList) -> Router {
    Router::new()
        .route("/readers", get(readers_handler))
        .route("/readers/{name}", get(reader_handler))
        .with_state(list)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "firehose_probe=info".into()),
        )
        .init();

    let args = Args::parse();
    if args.clients == 0 {
        anyhow::bail!("clients must be at least 1");
    }

    let list = ReaderList::new(&args.url, args.clients);
    let client = reqwest::Client::builder().build()?;
    info!(url = %args.url, clients = args.clients, "starting readers");

    let mut tasks = Vec::with_capacity(args.clients);
    for reader in list.readers() {
        let reader = reader.clone();
        let client = client.clone();
        tasks.push(tokio::spawn(async move { reader.run(client).await }));
    }

    if let Some(addr) = args.listen {
        let router = counters_router(list.clone());
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("reader counters on http://{}/readers", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                warn!("counter endpoint stopped: {e}");
            }
        });
    }

    if args.report_secs > 0 {
        let list = list.clone();
        let period = Duration::from_secs(args.report_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                info!(total = list.total(), readers = ?list.snapshot(), "bytes read");
            }
        });
    }

    let all_done = futures_util::future::join_all(tasks);
    tokio::select! {
        _ = all_done => info!("all readers finished"),
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!("Ctrl-C handler failed: {e}");
            }
            info!("interrupted");
        }
    }
    info!(total = list.total(), readers = ?list.snapshot(), "final counts");
    Ok(())
}
