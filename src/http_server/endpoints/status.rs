//! `GET /` — renders the status page for the site named by the request's
//! `Host` header.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::error::StatusdError;
use crate::http_server::state::ServerState;

pub async fn handle_status(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
	let Some(host) = headers.get(axum::http::header::HOST).and_then(|h| h.to_str().ok()) else {
		return (StatusCode::BAD_REQUEST, "missing or undecodable Host header\n").into_response();
	};
	// Strip a port suffix; site directory names never include one.
	let host = host.split(':').next().unwrap_or(host);

	let Some(view) = state.core.status(host.to_string()).await else {
		return (StatusCode::NOT_FOUND, "unknown site\n").into_response();
	};

	match state.renderer.render(&view) {
		Ok(html) => Html(html).into_response(),
		Err(err) => StatusdError::Render(err).into_response(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::http_server::test_support::test_state;

	#[tokio::test]
	async fn unknown_host_is_not_found() {
		let state = test_state().await;
		let mut headers = HeaderMap::new();
		headers.insert(axum::http::header::HOST, "nope.example".parse().unwrap());

		let response = handle_status(State(state), headers).await;
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}
}
