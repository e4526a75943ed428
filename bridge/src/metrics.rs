use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STD;
use base64::Engine;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::runtime::Builder;

/// Install the global Prometheus recorder and expose it over HTTP.
///
/// If the `METRICS_BASIC_AUTH` env-var is set (`USER:PASS`) every request must
/// supply a matching `Authorization: Basic <base64>` header.
pub fn serve_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("install metrics recorder")?;
    let addr = metrics_bind()?;
    serve_handle(handle.clone(), addr);
    Ok(handle)
}

/// Address for the metrics endpoint (`METRICS_BIND`, default `127.0.0.1:9184`).
pub fn metrics_bind() -> Result<SocketAddr> {
    let raw = std::env::var("METRICS_BIND").unwrap_or_else(|_| "127.0.0.1:9184".into());
    raw.parse()
        .with_context(|| format!("invalid METRICS_BIND address: {raw}"))
}

/// Serve `handle` on `addr` from a dedicated thread.
pub fn serve_handle(handle: PrometheusHandle, addr: SocketAddr) {
    let auth_header = std::env::var("METRICS_BASIC_AUTH").ok().map(|raw| {
        let token = BASE64_STD.encode(raw);
        format!("Basic {token}")
    });

    std::thread::spawn(move || {
        let runtime = match Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!(target = "metrics", "metrics runtime failed: {e}");
                return;
            }
        };

        runtime.block_on(async move {
            let make_svc = hyper::service::make_service_fn(move |_| {
                let handle = handle.clone();
                let auth_header = auth_header.clone();
                async move {
                    Ok::<_, hyper::Error>(hyper::service::service_fn(move |req| {
                        let handle = handle.clone();
                        let auth_header = auth_header.clone();
                        async move {
                            if let Some(expected) = auth_header {
                                match req.headers().get(hyper::header::AUTHORIZATION) {
                                    Some(h) if h.to_str().ok() == Some(&expected) => {}
                                    _ => {
                                        let mut resp = hyper::Response::new(hyper::Body::from("unauthorized"));
                                        *resp.status_mut() = hyper::StatusCode::UNAUTHORIZED;
                                        return Ok::<_, hyper::Error>(resp);
                                    }
                                }
                            }
                            Ok::<_, hyper::Error>(hyper::Response::new(hyper::Body::from(handle.render())))
                        }
                    }))
                }
            });

            let server = match hyper::Server::try_bind(&addr) {
                Ok(builder) => builder.serve(make_svc),
                Err(e) => {
                    tracing::error!(target = "metrics", "metrics bind {addr} failed: {e}");
                    return;
                }
            };
            tracing::info!(target = "metrics", "serving metrics on {}", server.local_addr());
            if let Err(e) = server.await {
                tracing::error!(target = "metrics", "metrics server exited: {e}");
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Bridge metrics helpers
// ---------------------------------------------------------------------------

/// Increment once per premium evaluation, labelled by outcome.
pub fn inc_premium_evaluations(premium: bool) {
    let outcome = if premium { "premium" } else { "free" };
    metrics::increment_counter!("premium_evaluations_total", "outcome" => outcome);
}

/// Increment when the upstream stream fetch fails.
pub fn inc_premium_unavailable() {
    metrics::increment_counter!("premium_unavailable_total");
}

/// Increment per JSON-RPC request sent to the node.
pub fn inc_rpc_requests(method: &str) {
    metrics::increment_counter!("rpc_requests_total", "method" => method.to_owned());
}

/// Increment per failed JSON-RPC request.
pub fn inc_rpc_errors(method: &str) {
    metrics::increment_counter!("rpc_errors_total", "method" => method.to_owned());
}

/// Increment when a read joins an identical request already in flight.
pub fn inc_inflight_joined() {
    metrics::increment_counter!("inflight_joined_total");
}

/// Increment per event handed to the host queue.
pub fn inc_host_events(name: &str) {
    metrics::increment_counter!("host_events_total", "event" => name.to_owned());
}

/// Increment per event dropped because the host queue was full or closed.
pub fn inc_host_events_dropped(name: &str) {
    metrics::increment_counter!("host_events_dropped_total", "event" => name.to_owned());
}

/// Track the number of streams in the last fetched snapshot.
pub fn set_last_stream_count(n: usize) {
    metrics::gauge!("last_stream_count", n as f64);
}
