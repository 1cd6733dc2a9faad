//! Request/response shapes for the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::alert::RawAlert;

/// Body of `POST /api/v1/alerts`: an Alertmanager-compatible webhook batch.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct IngestBody {
	pub alerts: Vec<RawAlert>,
}

#[derive(Serialize)]
pub struct IngestResponse {
	pub accepted: usize,
}
