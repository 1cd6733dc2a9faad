//! Per-service incident state: the set of currently active alerts, their
//! individual resolve timers, and the incident's overall group timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::alert::Alert;
use crate::core::{CoreCommand, TimerFired};
use crate::severity::Severity;
use crate::timer::Timer;

const INCIDENT_ID_FORMAT: &str = "%Y-%m-%d-%H%MZ";

struct ArmedAlertTimer {
	#[allow(dead_code, reason = "kept alive to hold the abort handle")]
	timer: Timer,
	generation: u64,
}

/// The live state of one open incident for a single service.
///
/// Born the moment the first qualifying alert arrives for a service with no
/// current incident, and torn down when its group timer fires with no
/// outstanding alerts and monitoring is not down.
pub struct IncidentManager {
	pub id: String,
	site: Arc<str>,
	service: Arc<str>,
	tx: mpsc::Sender<CoreCommand>,
	alert_resolve_timeout: Duration,
	group_timeout: Duration,

	pub active_alerts: HashMap<String, Alert>,
	alert_timers: HashMap<String, ArmedAlertTimer>,
	group_timer: Option<Timer>,
	group_generation: u64,
	next_generation: u64,

	pub monitoring_down: bool,
	pub last_alert: DateTime<Utc>,
}

/// What changed as a result of a `process_alerts` call, for the `"New"` log
/// event described by the incident-logging design notes.
pub struct NewAlerts {
	pub components: Vec<String>,
}

impl IncidentManager {
	pub fn new(
		site: Arc<str>,
		service: Arc<str>,
		now: DateTime<Utc>,
		tx: mpsc::Sender<CoreCommand>,
		alert_resolve_timeout: Duration,
		group_timeout: Duration,
	) -> Self {
		Self {
			id: now.format(INCIDENT_ID_FORMAT).to_string(),
			site,
			service,
			tx,
			alert_resolve_timeout,
			group_timeout,
			active_alerts: HashMap::new(),
			alert_timers: HashMap::new(),
			group_timer: None,
			group_generation: 0,
			next_generation: 1,
			monitoring_down: false,
			last_alert: now,
		}
	}

	fn take_generation(&mut self) -> u64 {
		let g = self.next_generation;
		self.next_generation += 1;
		g
	}

	fn arm_group_timer(&mut self) {
		let generation = self.take_generation();
		self.group_generation = generation;
		self.group_timer = Some(Timer::schedule(
			self.tx.clone(),
			self.group_timeout,
			TimerFired::GroupTimeout {
				site: self.site.clone(),
				service: self.service.clone(),
				generation,
			},
		));
	}

	fn arm_alert_timer(&mut self, component: &str) {
		let generation = self.take_generation();
		let timer = Timer::schedule(
			self.tx.clone(),
			self.alert_resolve_timeout,
			TimerFired::AlertResolve {
				site: self.site.clone(),
				service: self.service.clone(),
				component: component.to_string(),
				generation,
			},
		);
		self.alert_timers
			.insert(component.to_string(), ArmedAlertTimer { timer, generation });
	}

	/// Folds a batch of alerts in for this incident's service, merging by
	/// the max-severity rule (a fresh `OK` always wins).
	pub fn process_alerts(&mut self, alerts: &[Alert], now: DateTime<Utc>) -> NewAlerts {
		if alerts.is_empty() {
			return NewAlerts { components: Vec::new() };
		}

		self.arm_group_timer();
		self.last_alert = now;

		let mut new_components = Vec::new();

		for alert in alerts {
			let Some(component) = alert.component() else {
				continue;
			};
			let component = component.to_string();

			if !self.alert_timers.contains_key(&component) {
				new_components.push(component.clone());
			}

			let replace = match self.active_alerts.get(&component) {
				Some(existing) => alert.status == Severity::Ok || alert.status >= existing.status,
				None => true,
			};
			if replace {
				self.active_alerts.insert(component.clone(), alert.clone());
			}

			self.arm_alert_timer(&component);
		}

		if !new_components.is_empty() {
			info!(incident = %self.id, service = %self.service, components = ?new_components, "New");
		}

		NewAlerts { components: new_components }
	}

	/// Clears `monitoring_down` and re-arms the group timer if heartbeats
	/// arrived while the site's monitor was considered down.
	pub fn process_heartbeats(&mut self) {
		if self.monitoring_down {
			self.monitoring_down = false;
			self.arm_group_timer();
			info!(incident = %self.id, service = %self.service, "[Meta]MonitoringUp");
		}
	}

	/// Marks this incident as affected by the site's monitoring being down.
	/// Does not cancel the group timer; `expire` refuses to fire while this
	/// is set.
	pub fn monitoring_down(&mut self) {
		self.monitoring_down = true;
		info!(incident = %self.id, service = %self.service, "[Meta]MonitoringDown");
	}

	/// A timer-driven per-component resolve. Returns true if the generation
	/// matched (i.e. this firing was not superseded by a later re-arm).
	pub fn expire_alert(&mut self, component: &str, generation: u64) -> bool {
		let Some(armed) = self.alert_timers.get(component) else {
			return false;
		};
		if armed.generation != generation {
			debug!(incident = %self.id, component, "stale alert timer firing ignored");
			return false;
		}
		if let Some(alert) = self.active_alerts.remove(component) {
			info!(incident = %self.id, service = %self.service, component, status = ?alert.status, "Resolved");
		}
		self.alert_timers.remove(component);
		true
	}

	/// A timer-driven group expiry. Returns true if the incident should be
	/// torn down by its parent `ServiceManager`.
	pub fn expire(&mut self, generation: u64) -> bool {
		if self.group_generation != generation {
			debug!(incident = %self.id, "stale group timer firing ignored");
			return false;
		}
		!self.monitoring_down
	}

	pub fn component_status(&self, component: &str) -> Severity {
		self.active_alerts
			.get(component)
			.map(|a| a.status)
			.unwrap_or(Severity::Ok)
	}

	pub fn status(&self) -> Severity {
		self.active_alerts
			.values()
			.map(|a| a.status)
			.max()
			.unwrap_or(Severity::Ok)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::alert::{LABEL_COMPONENT, LABEL_SERVICE, LABEL_SITE};
	use std::collections::HashMap as StdHashMap;

	fn alert(component: &str, status: Severity) -> Alert {
		let mut labels = StdHashMap::new();
		labels.insert(LABEL_SITE.to_string(), "a.example".to_string());
		labels.insert(LABEL_SERVICE.to_string(), "web".to_string());
		labels.insert(LABEL_COMPONENT.to_string(), component.to_string());
		Alert {
			labels,
			annotations: StdHashMap::new(),
			starts_at: None,
			ends_at: None,
			status,
		}
	}

	fn manager() -> (IncidentManager, mpsc::Receiver<CoreCommand>) {
		let (tx, rx) = mpsc::channel(32);
		let incident = IncidentManager::new(
			Arc::from("a.example"),
			Arc::from("web"),
			Utc::now(),
			tx,
			Duration::from_secs(300),
			Duration::from_secs(3600),
		);
		(incident, rx)
	}

	#[tokio::test]
	async fn max_merge_does_not_downgrade() {
		let (mut incident, _rx) = manager();
		let now = Utc::now();
		incident.process_alerts(&[alert("api", Severity::Error)], now);
		incident.process_alerts(&[alert("api", Severity::Warning)], now);
		assert_eq!(incident.component_status("api"), Severity::Error);
	}

	#[tokio::test]
	async fn ok_always_wins() {
		let (mut incident, _rx) = manager();
		let now = Utc::now();
		incident.process_alerts(&[alert("api", Severity::Error)], now);
		incident.process_alerts(&[alert("api", Severity::Ok)], now);
		assert_eq!(incident.component_status("api"), Severity::Ok);
	}

	#[tokio::test]
	async fn stale_timer_generation_is_ignored() {
		let (mut incident, _rx) = manager();
		let now = Utc::now();
		incident.process_alerts(&[alert("api", Severity::Error)], now);
		let stale_generation = incident.alert_timers["api"].generation - 1;
		assert!(!incident.expire_alert("api", stale_generation));
		assert!(incident.active_alerts.contains_key("api"));
	}
}
