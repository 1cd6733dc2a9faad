//! HTTP server: ingestion, the status page, static assets, and metrics.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info};

use crate::config::Config;
use crate::core::Handle;
use crate::templates::Renderer;

mod endpoints;
mod state;
#[cfg(test)]
mod test_support;
mod types;

pub use endpoints::*;
pub use state::ServerState;
pub use types::*;

pub async fn start_server(core: Handle, config: &Config) -> miette::Result<()> {
	let static_dir = config
		.web_static_dir
		.clone()
		.unwrap_or_else(|| std::env::temp_dir().join("statusd-static"));
	let renderer = Arc::new(Renderer::load(&static_dir)?);

	let state = Arc::new(ServerState { core, renderer });

	let mut app = Router::new()
		.route("/", get(handle_status))
		.route("/api/v1/alerts", post(handle_ingest))
		.route("/metrics", get(handle_metrics));

	if static_dir.exists() {
		app = app.nest_service("/static", ServeDir::new(&static_dir));
	}

	let app = app
		.layer(
			TraceLayer::new_for_http()
				.make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
				.on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false)),
		)
		.with_state(state);

	let listener = tokio::net::TcpListener::bind(config.web_endpoint)
		.await
		.map_err(|err| miette::miette!("binding HTTP server to {}: {err}", config.web_endpoint))?;
	info!("HTTP server listening on http://{}", config.web_endpoint);

	if let Err(err) = axum::serve(listener, app).await {
		error!("HTTP server error: {err}");
	}
	Ok(())
}
