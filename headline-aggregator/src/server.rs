use crate::types::{AggregatorError, ArticleView, Result};
use crate::HeadlineAggregator;
use axum::extract::{Query, State};
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

pub type SharedAggregator = Arc<HeadlineAggregator>;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

async fn fetch_articles(
    State(aggregator): State<SharedAggregator>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<ArticleView>> {
    let articles = aggregator.fetch_articles(params.search.as_deref()).await;
    debug!("Serving {} articles (search: {:?})", articles.len(), params.search);
    Json(articles)
}

pub fn router(aggregator: SharedAggregator, cors_origin: Option<&str>) -> Result<Router> {
    Ok(Router::new()
        .route("/fetch-articles", get(fetch_articles))
        .layer(cors_layer(cors_origin)?)
        .with_state(aggregator))
}

fn cors_layer(cors_origin: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS, Method::HEAD])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    Ok(match cors_origin {
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .map_err(|_| AggregatorError::Config(format!("cors_origin '{}' is not a valid header value", origin)))?;
            layer.allow_origin(origin)
        }
        None => layer.allow_origin(Any),
    })
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
