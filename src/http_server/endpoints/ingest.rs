//! `POST /api/v1/alerts` — token-authenticated alert ingestion.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::error::StatusdError;
use crate::http_server::state::ServerState;
use crate::http_server::types::{IngestBody, IngestResponse};

/// Pulls the bearer token out of an `Authorization` header. Only the last
/// whitespace-separated field is taken as the token, so both `Bearer <tok>`
/// and a bare `<tok>` work.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
	headers
		.get(axum::http::header::AUTHORIZATION)
		.and_then(|h| h.to_str().ok())
		.and_then(|v| v.split_whitespace().last())
}

pub async fn handle_ingest(
	State(state): State<Arc<ServerState>>,
	headers: HeaderMap,
	body: Bytes,
) -> Response {
	let Some(token) = extract_token(&headers) else {
		return StatusdError::UnknownToken.into_response();
	};

	let raw_alerts = match serde_json::from_slice::<IngestBody>(&body) {
		Ok(body) => body.alerts,
		Err(err) => return StatusdError::InvalidBody(err).into_response(),
	};
	let accepted = raw_alerts.len();

	match state.core.ingest(token.to_string(), raw_alerts).await {
		Ok(()) => (StatusCode::OK, Json(IngestResponse { accepted })).into_response(),
		Err(err) => err.into_response(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_last_token_from_authorization_header() {
		let mut headers = HeaderMap::new();
		headers.insert(axum::http::header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
		assert_eq!(extract_token(&headers), Some("abc123"));
	}

	#[test]
	fn bare_token_also_works() {
		let mut headers = HeaderMap::new();
		headers.insert(axum::http::header::AUTHORIZATION, "abc123".parse().unwrap());
		assert_eq!(extract_token(&headers), Some("abc123"));
	}

	#[test]
	fn missing_header_yields_none() {
		assert_eq!(extract_token(&HeaderMap::new()), None);
	}
}
