// src/feed.rs
//! Ingestion loop: pulls raw datagrams from the transport, decodes them, and
//! applies the result to the shared book.
//!
//! Framing failures are per-record and recoverable (counted, logged at debug,
//! dropped). A transport-level I/O failure ends the loop; restart policy, if
//! any, belongs to the caller. Shutdown is cooperative through a watch flag
//! observed at the receive suspension point.

use anyhow::{Context, Result};
use bytes::Bytes;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::book::OrderBook;
use crate::metrics::Metrics;
use crate::wire;

/// Large enough that an oversized datagram arrives intact and fails framing
/// instead of being silently truncated to the buffer size.
const RECV_BUF_LEN: usize = 2048;

/// The transport collaborator: yields one inbound datagram per call, blocking
/// (suspending) until one is available. Delivery is assumed unreliable and
/// unordered; the loop does not correct for either.
pub trait Transport {
    fn receive(&mut self) -> impl Future<Output = io::Result<Bytes>> + Send;
}

/// UDP datagram transport.
pub struct UdpTransport {
    sock: UdpSocket,
    buf: Box<[u8; RECV_BUF_LEN]>,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let sock = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("bind udp {addr}"))?;
        Ok(Self { sock, buf: Box::new([0u8; RECV_BUF_LEN]) })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }
}

impl Transport for UdpTransport {
    async fn receive(&mut self) -> io::Result<Bytes> {
        let (n, _from) = self.sock.recv_from(&mut self.buf[..]).await?;
        Ok(Bytes::copy_from_slice(&self.buf[..n]))
    }
}

/// Runs until the shutdown flag flips or the transport fails hard.
///
/// Updates are applied in arrival order. Returns `Ok(())` on cooperative
/// shutdown and an error only for a transport failure.
pub async fn ingest_loop<T: Transport>(
    mut transport: T,
    book: Arc<OrderBook>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            res = transport.receive() => {
                let datagram = match res {
                    Ok(d) => d,
                    Err(e) => {
                        metrics.inc_transport_err();
                        return Err(e).context("transport receive");
                    }
                };

                match wire::decode(&datagram) {
                    Ok(upd) => {
                        let t0 = Instant::now();
                        book.apply(&upd);
                        metrics.record_apply(t0.elapsed());
                        metrics.inc_total();
                    }
                    Err(e) => {
                        // Recoverable per-record failure: drop and continue.
                        metrics.inc_framing_err();
                        debug!("dropped record: {e}");
                    }
                }
            }
        }
    }

    info!("ingest: stopped");
    Ok(())
}
