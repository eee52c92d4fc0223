//! Client for a running `optexd serve`.
//!
//! A serving daemon owns the database file, so one-shot commands hand their
//! work to it over HTTP instead of opening the store themselves. Every write
//! then goes through the daemon's single store writer.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::Context;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use optex_api::{ApiResponse, SERIES_FETCH_PATH, SERIES_PATH, SeriesRequest, SeriesValue};
use tracing::debug;

/// Address to reach a server listening on `listen`. Wildcard listeners are
/// reached over loopback.
pub fn control_addr(listen: SocketAddr) -> SocketAddr {
    let ip = match listen.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, listen.port())
}

async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    body: Option<String>,
) -> anyhow::Result<(http::StatusCode, Bytes)> {
    let stream = tokio::net::TcpStream::connect(addr)
        .await
        .with_context(|| format!("no optexd server reachable at {addr}"))?;
    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut req = http::Request::builder()
        .method(method)
        .uri(path)
        .header("host", addr.to_string())
        .header("user-agent", concat!("optexd/", env!("CARGO_PKG_VERSION")));
    if body.is_some() {
        req = req.header("content-type", "application/json");
    }
    let req = req.body(Full::new(Bytes::from(body.unwrap_or_default())))?;

    let resp = sender.send_request(req).await?;
    let status = resp.status();
    let bytes = resp.into_body().collect().await?.to_bytes();
    debug!(%addr, %method, %path, %status, "control request sent");
    Ok((status, bytes))
}

async fn series_call(
    addr: SocketAddr,
    method: &str,
    path: &str,
    req: &SeriesRequest,
) -> anyhow::Result<SeriesValue> {
    let (status, bytes) = send(addr, method, path, Some(serde_json::to_string(req)?)).await?;
    let resp: ApiResponse<SeriesValue> = serde_json::from_slice(&bytes)
        .with_context(|| format!("unexpected response from server ({status})"))?;
    match resp.data {
        Some(data) if resp.success => Ok(data),
        _ => anyhow::bail!(
            "server rejected request ({status}): {}",
            resp.error.unwrap_or_default()
        ),
    }
}

/// Store `value` for one series through the server.
pub async fn update(
    addr: SocketAddr,
    metric: &str,
    labels: BTreeMap<String, String>,
    value: String,
) -> anyhow::Result<SeriesValue> {
    let req = SeriesRequest {
        metric: metric.to_string(),
        labels,
        value: Some(value),
    };
    series_call(addr, "PUT", SERIES_PATH, &req).await
}

/// Read the value of one series through the server.
pub async fn fetch(
    addr: SocketAddr,
    metric: &str,
    labels: BTreeMap<String, String>,
) -> anyhow::Result<String> {
    let req = SeriesRequest {
        metric: metric.to_string(),
        labels,
        value: None,
    };
    Ok(series_call(addr, "POST", SERIES_FETCH_PATH, &req).await?.value)
}

/// Scrape the server's exposition.
pub async fn render(addr: SocketAddr) -> anyhow::Result<String> {
    let (status, bytes) = send(addr, "GET", "/metrics", None).await?;
    anyhow::ensure!(status.is_success(), "scrape failed ({status})");
    Ok(String::from_utf8(bytes.to_vec())?)
}
