use crate::gui_bridge::model::{AnalyzeRequest, AnalyzeResponse, ErrorBody};
use anyhow::Context;
use damagecore::{Pipeline, SeverityConfig};
use log::{info, warn};
use serde_json::json;
use std::net::SocketAddr;
use tokio::runtime::Builder;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

const BODY_LIMIT: u64 = 16 * 1024 * 1024;

/// HTTP surface for a front-end that already holds detector output.
///
/// Each request builds its own pipeline; nothing is shared between requests
/// except the immutable base configuration.
pub fn routes(
    base: SeverityConfig,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({"status": "ok"})));

    let analyze = warp::path!("analyze")
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .map(move |request: AnalyzeRequest| analyze_batch(&base, request));

    health.or(analyze)
}

fn analyze_batch(base: &SeverityConfig, request: AnalyzeRequest) -> WithStatus<Json> {
    let severity = match request.policy {
        Some(policy) => SeverityConfig {
            policy,
            ..base.clone()
        },
        None => base.clone(),
    };

    let result = Pipeline::new(severity).and_then(|pipeline| {
        let analysis = pipeline.analyze_batch(&request.batch)?;
        Ok(AnalyzeResponse::new(pipeline.policy(), analysis))
    });

    match result {
        Ok(response) => warp::reply::with_status(warp::reply::json(&response), StatusCode::OK),
        Err(err) => {
            warn!("analyze request rejected: {}", err);
            warp::reply::with_status(
                warp::reply::json(&ErrorBody {
                    error: err.to_string(),
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
    }
}

/// Serves the bridge until Ctrl+C.
pub fn serve(addr: SocketAddr, base: SeverityConfig) -> anyhow::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for the HTTP bridge")?;
    runtime.block_on(async move {
        let (bound, server) = warp::serve(routes(base))
            .try_bind_with_graceful_shutdown(addr, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .with_context(|| format!("binding HTTP bridge to {addr}"))?;
        info!("HTTP bridge listening on {} (Ctrl+C to stop)", bound);
        server.await;
        Ok(())
    })
}
