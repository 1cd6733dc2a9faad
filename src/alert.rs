//! Alert parsing and the required/optional label vocabulary.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::severity::Severity;

pub const LABEL_SITE: &str = "adlermanager";
pub const LABEL_SERVICE: &str = "service";
pub const LABEL_COMPONENT: &str = "component";
pub const LABEL_SEVERITY: &str = "severity";
pub const LABEL_HEARTBEAT: &str = "heartbeat";

/// One entry of an inbound Alertmanager-compatible webhook payload.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawAlert {
	#[serde(default)]
	pub labels: HashMap<String, String>,
	#[serde(default)]
	pub annotations: HashMap<String, String>,
	#[serde(default, rename = "startsAt")]
	pub starts_at: Option<String>,
	#[serde(default, rename = "endsAt")]
	pub ends_at: Option<String>,
}

/// A parsed, normalised alert ready to fold into the incident state machine.
#[derive(Debug, Clone)]
pub struct Alert {
	pub labels: HashMap<String, String>,
	pub annotations: HashMap<String, String>,
	pub starts_at: Option<DateTime<Utc>>,
	pub ends_at: Option<DateTime<Utc>>,
	pub status: Severity,
}

impl Alert {
	pub fn label(&self, key: &str) -> Option<&str> {
		self.labels.get(key).map(String::as_str)
	}

	pub fn site(&self) -> Option<&str> {
		self.label(LABEL_SITE)
	}

	pub fn service(&self) -> Option<&str> {
		self.label(LABEL_SERVICE)
	}

	pub fn component(&self) -> Option<&str> {
		self.label(LABEL_COMPONENT)
	}

	pub fn is_heartbeat(&self) -> bool {
		matches!(
			self.label(LABEL_HEARTBEAT).map(str::to_ascii_lowercase).as_deref(),
			Some("true") | Some("1") | Some("yes")
		)
	}
}

/// Parses a raw webhook alert, deriving [`Severity`] per the import rule:
/// an alert whose `endsAt` is set and not in the future resolves to
/// [`Severity::Ok`]; otherwise severity comes from the `severity` label.
#[instrument(skip(raw))]
pub fn import(raw: RawAlert) -> Alert {
	let starts_at = raw.starts_at.as_deref().and_then(parse_timestamp);
	let ends_at = raw.ends_at.as_deref().and_then(parse_timestamp);

	let status = match ends_at {
		Some(ends) if ends <= Utc::now() => Severity::Ok,
		_ => Severity::from_label(raw.labels.get(LABEL_SEVERITY).map(String::as_str)),
	};

	debug!(?status, ?starts_at, ?ends_at, "imported alert");

	Alert {
		labels: raw.labels,
		annotations: raw.annotations,
		starts_at,
		ends_at,
		status,
	}
}

/// Parses an RFC 3339 timestamp. Unparseable input yields `None` rather
/// than rejecting the whole alert.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s)
		.map(|dt| dt.with_timezone(&Utc))
		.ok()
}

/// True if a raw alert is addressed to `site_name` and carries the
/// `service`/`component` labels required to route it further.
pub fn belongs_to_site(raw: &RawAlert, site_name: &str) -> bool {
	raw.labels.get(LABEL_SITE).map(String::as_str) == Some(site_name)
		&& raw.labels.get(LABEL_SERVICE).is_some_and(|s| !s.is_empty())
		&& raw.labels.get(LABEL_COMPONENT).is_some_and(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn raw(severity: &str, ends_at: Option<&str>) -> RawAlert {
		let mut labels = HashMap::new();
		labels.insert(LABEL_SITE.into(), "a.example".into());
		labels.insert(LABEL_SERVICE.into(), "web".into());
		labels.insert(LABEL_COMPONENT.into(), "api".into());
		labels.insert(LABEL_SEVERITY.into(), severity.into());
		RawAlert {
			labels,
			annotations: HashMap::new(),
			starts_at: None,
			ends_at: ends_at.map(String::from),
		}
	}

	#[test]
	fn maps_critical_to_error() {
		let alert = import(raw("critical", None));
		assert_eq!(alert.status, Severity::Error);
	}

	#[test]
	fn past_ends_at_forces_ok() {
		let alert = import(raw("error", Some("2000-01-01T00:00:00Z")));
		assert_eq!(alert.status, Severity::Ok);
	}

	#[test]
	fn future_ends_at_keeps_severity() {
		let alert = import(raw("warning", Some("2999-01-01T00:00:00Z")));
		assert_eq!(alert.status, Severity::Warning);
	}

	#[test]
	fn filters_by_site_and_required_labels() {
		let r = raw("error", None);
		assert!(belongs_to_site(&r, "a.example"));
		assert!(!belongs_to_site(&r, "b.example"));
	}
}
