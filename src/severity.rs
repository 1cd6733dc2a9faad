//! Severity ordering for alerts and the entities that aggregate them.

/// Alert severity, ordered from least to most severe.
///
/// The ordering is load-bearing: component, service and site status are all
/// computed as a maximum over the severities of their children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
	Ok,
	Info,
	Warning,
	Error,
}

impl Severity {
	/// Parses the `severity` label, defaulting to [`Severity::Ok`] for anything
	/// unrecognised. `critical` is accepted as an alias for [`Severity::Error`].
	pub fn from_label(s: Option<&str>) -> Self {
		match s.map(str::to_ascii_lowercase).as_deref() {
			Some("info") => Self::Info,
			Some("warning") | Some("warn") => Self::Warning,
			Some("error") | Some("critical") => Self::Error,
			_ => Self::Ok,
		}
	}

	/// The Bootstrap-ish CSS class used by the status page templates.
	pub fn css_tag(self) -> &'static str {
		match self {
			Self::Ok => "success",
			Self::Info => "info",
			Self::Warning => "warning",
			Self::Error => "danger",
		}
	}

	pub fn max(self, other: Self) -> Self {
		std::cmp::max(self, other)
	}
}

impl Default for Severity {
	fn default() -> Self {
		Self::Ok
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ordering() {
		assert!(Severity::Ok < Severity::Info);
		assert!(Severity::Info < Severity::Warning);
		assert!(Severity::Warning < Severity::Error);
	}

	#[test]
	fn critical_aliases_error() {
		assert_eq!(Severity::from_label(Some("critical")), Severity::Error);
	}

	#[test]
	fn unknown_defaults_ok() {
		assert_eq!(Severity::from_label(Some("banana")), Severity::Ok);
		assert_eq!(Severity::from_label(None), Severity::Ok);
	}
}
