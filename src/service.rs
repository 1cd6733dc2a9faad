//! Filters alerts to one service's declared components and owns at most one
//! live incident for it.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::alert::Alert;
use crate::core::CoreCommand;
use crate::incident::IncidentManager;
use crate::severity::Severity;

pub struct ServiceManager {
	pub label: Arc<str>,
	pub component_labels: BTreeSet<String>,
	pub current_incident: Option<IncidentManager>,

	site: Arc<str>,
	tx: mpsc::Sender<CoreCommand>,
	alert_resolve_timeout: Duration,
	group_timeout: Duration,
}

impl ServiceManager {
	pub fn new(
		site: Arc<str>,
		label: Arc<str>,
		component_labels: BTreeSet<String>,
		tx: mpsc::Sender<CoreCommand>,
		alert_resolve_timeout: Duration,
		group_timeout: Duration,
	) -> Self {
		Self {
			label,
			component_labels,
			current_incident: None,
			site,
			tx,
			alert_resolve_timeout,
			group_timeout,
		}
	}

	/// Filters `alerts` to this service's own label and declared components,
	/// opening a new incident if one doesn't already exist and there is
	/// something to fold in.
	pub fn process_alerts(&mut self, alerts: &[Alert], now: DateTime<Utc>) {
		let relevant: Vec<Alert> = alerts
			.iter()
			.filter(|a| {
				a.service() == Some(self.label.as_ref())
					&& a.component().is_some_and(|c| self.component_labels.contains(c))
			})
			.cloned()
			.collect();

		if relevant.is_empty() {
			return;
		}

		let is_new = self.current_incident.is_none();
		let incident = self.current_incident.get_or_insert_with(|| {
			IncidentManager::new(
				self.site.clone(),
				self.label.clone(),
				now,
				self.tx.clone(),
				self.alert_resolve_timeout,
				self.group_timeout,
			)
		});
		if is_new {
			crate::metrics::inc_incidents_opened();
		}
		incident.process_alerts(&relevant, now);
	}

	pub fn process_heartbeats(&mut self) {
		if let Some(incident) = self.current_incident.as_mut() {
			incident.process_heartbeats();
		}
	}

	pub fn monitoring_down(&mut self) {
		if let Some(incident) = self.current_incident.as_mut() {
			incident.monitoring_down();
		}
	}

	/// Tears down the current incident if its group timer expired and
	/// monitoring isn't down. Returns true if the incident was closed.
	pub fn expire_group(&mut self, generation: u64) -> bool {
		let should_close = self
			.current_incident
			.as_mut()
			.is_some_and(|incident| incident.expire(generation));
		if should_close {
			self.current_incident = None;
		}
		should_close
	}

	pub fn expire_alert(&mut self, component: &str, generation: u64) {
		if let Some(incident) = self.current_incident.as_mut() {
			incident.expire_alert(component, generation);
		}
	}

	pub fn status(&self) -> Severity {
		self.current_incident
			.as_ref()
			.map(IncidentManager::status)
			.unwrap_or(Severity::Ok)
	}

	pub fn component_status(&self, component: &str) -> Severity {
		self.current_incident
			.as_ref()
			.map(|i| i.component_status(component))
			.unwrap_or(Severity::Ok)
	}
}
