//! Domain error taxonomy and its mapping onto HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum StatusdError {
	#[error("unknown or missing bearer token")]
	UnknownToken,

	#[error("could not parse request body: {0}")]
	InvalidBody(#[from] serde_json::Error),

	#[error("unknown site")]
	SiteNotFound,

	#[error("could not write site configuration: {0}")]
	ConfigWrite(#[source] std::io::Error),

	#[error("could not render template: {0}")]
	Render(#[from] tera::Error),

	#[error("core actor is not accepting commands")]
	CoreUnavailable,
}

impl IntoResponse for StatusdError {
	fn into_response(self) -> Response {
		let status = match &self {
			Self::UnknownToken => StatusCode::UNAUTHORIZED,
			Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
			Self::SiteNotFound => StatusCode::NOT_FOUND,
			Self::ConfigWrite(_) | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::CoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
		};
		(status, self.to_string()).into_response()
	}
}
