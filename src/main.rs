// src/main.rs
use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tokio::{fs as tokio_fs, net::UdpSocket, sync::watch};
use tracing::{error, info, warn};

use tickfeed::{
    book::OrderBook,
    feed::{self, UdpTransport},
    metrics::Metrics,
    report::{self, StdoutSink},
    wire::{self, MarketUpdate},
};

const INITIAL_LEVEL_CAPACITY: usize = 4096;

#[derive(Parser, Debug)]
#[command(name = "tickfeed", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Live feed handler: ingest UDP updates, publish periodic snapshots.
    Run {
        #[arg(long, default_value = "0.0.0.0:9000")]
        listen: SocketAddr,
        /// HTTP API bind address. Omit to disable the API.
        #[arg(long)]
        http_bind: Option<SocketAddr>,
        /// Snapshot publish interval (ms).
        #[arg(long, default_value_t = 500)]
        report_interval_ms: u64,
        /// Run duration in seconds. 0 = run until Ctrl-C.
        #[arg(long, default_value_t = 0)]
        run_secs: u64,
        #[arg(long, default_value = "final_snapshot.json")]
        out: PathBuf,
    },
    /// Binary test sender: update i carries price 1000+i, qty 10*(i+1).
    Send {
        #[arg(long, default_value = "127.0.0.1:9000")]
        connect: SocketAddr,
        #[arg(long, default_value_t = 20)]
        count: u32,
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
    /// Self-contained simulation: loopback socket plus an internal sender.
    Sim {
        #[arg(long, default_value_t = 20)]
        count: u32,
        #[arg(long, default_value_t = 100)]
        send_interval_ms: u64,
        #[arg(long, default_value_t = 500)]
        report_interval_ms: u64,
        /// Run duration in seconds. 0 = run until Ctrl-C.
        #[arg(long, default_value_t = 5)]
        run_secs: u64,
        #[arg(long)]
        http_bind: Option<SocketAddr>,
        #[arg(long, default_value = "final_snapshot.json")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Run { listen, http_bind, report_interval_ms, run_secs, out } => {
            let transport = UdpTransport::bind(listen).await?;
            run_engine(transport, http_bind, report_interval_ms, run_secs, out).await
        }
        Cmd::Send { connect, count, interval_ms } => {
            send_updates(connect, count, Duration::from_millis(interval_ms)).await
        }
        Cmd::Sim { count, send_interval_ms, report_interval_ms, run_secs, http_bind, out } => {
            let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await?;
            let feed_addr = transport.local_addr()?;

            let sender = tokio::spawn(async move {
                if let Err(e) =
                    send_updates(feed_addr, count, Duration::from_millis(send_interval_ms)).await
                {
                    warn!("sender: {e:#}");
                }
            });

            run_engine(transport, http_bind, report_interval_ms, run_secs, out).await?;
            sender.await.ok();
            Ok(())
        }
    }
}

async fn run_engine(
    transport: UdpTransport,
    http_bind: Option<SocketAddr>,
    report_interval_ms: u64,
    run_secs: u64,
    out: PathBuf,
) -> Result<()> {
    // INIT: empty book, counters, shutdown flag.
    let book = Arc::new(OrderBook::new());
    book.reserve_levels(INITIAL_LEVEL_CAPACITY);
    let metrics = Arc::new(Metrics::new());
    let (stop_tx, shutdown) = watch::channel(false);

    info!(
        "engine: listen={} report_interval_ms={report_interval_ms} run_secs={run_secs}",
        transport.local_addr()?
    );

    let http_task = http_bind.map(|addr| {
        let st = AppState { metrics: metrics.clone(), book: book.clone() };
        tokio::spawn(async move {
            info!("http: listening on {addr}");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, build_api(st)).await?;
            Ok::<(), anyhow::Error>(())
        })
    });

    let report_task = tokio::spawn(report::report_loop(
        book.clone(),
        StdoutSink::default(),
        Duration::from_millis(report_interval_ms.max(1)),
        metrics.clone(),
        shutdown.clone(),
    ));

    // A hard transport failure ends ingestion only; the reporter and API keep
    // serving the last-known book state until shutdown.
    let ingest_task = {
        let book = book.clone();
        let metrics = metrics.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = feed::ingest_loop(transport, book, metrics, shutdown).await {
                error!("ingest: {e:#}");
            }
        })
    };

    // RUNNING: for the configured duration or until an external stop signal.
    if run_secs == 0 {
        tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
        info!("engine: stop signal received");
    } else {
        tokio::time::sleep(Duration::from_secs(run_secs)).await;
    }

    // STOPPING: flip the flag, wait for both loops to observe it.
    info!("engine: stopping");
    let _ = stop_tx.send(true);
    ingest_task.await.ok();
    report_task.await.ok();
    if let Some(t) = http_task {
        t.abort();
    }

    // STOPPED: final consistent snapshot for the external consumer.
    let levels = book.snapshot();
    let text = json!({
        "type": "final",
        "ts_us": report::now_micros(),
        "levels": levels,
    })
    .to_string();
    tokio_fs::write(&out, text)
        .await
        .with_context(|| format!("write final snapshot {:?}", out))?;

    info!(
        "engine: stopped; levels={} msgs={} wrote {:?}",
        levels.len(),
        metrics.msgs_total.load(std::sync::atomic::Ordering::Relaxed),
        out
    );
    Ok(())
}

async fn send_updates(connect: SocketAddr, count: u32, interval: Duration) -> Result<()> {
    let sock = UdpSocket::bind("0.0.0.0:0").await.context("bind sender socket")?;
    info!("sender: {count} updates to {connect}");

    for i in 0..count {
        let upd = MarketUpdate {
            ts_us: report::now_micros(),
            price: 1000 + i,
            qty: 10 * (i + 1),
        };
        sock.send_to(&wire::encode(&upd), connect)
            .await
            .with_context(|| format!("send update {i} to {connect}"))?;
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

#[derive(Clone)]
struct AppState {
    metrics: Arc<Metrics>,
    book: Arc<OrderBook>,
}

fn build_api(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/book", get(book_handler))
        .with_state(state)
}

async fn metrics_handler(State(st): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, st.metrics.prometheus_text())
}

async fn book_handler(State(st): State<AppState>) -> impl IntoResponse {
    // Built on demand from the live book; the publish path never renders for HTTP.
    let frame = report::encode_snapshot(report::now_micros(), &st.book.snapshot());
    (StatusCode::OK, frame)
}
