//! One site's services and its monitoring-down detector.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::alert::{self, Alert, RawAlert};
use crate::core::{CoreCommand, TimerFired};
use crate::service::ServiceManager;
use crate::severity::Severity;
use crate::timer::Timer;

/// Operator-settable override persisted to `config.yaml`, read and written
/// by the SSH admin interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
	#[serde(default)]
	pub message: String,
	#[serde(default)]
	pub force_state: bool,
}

impl SiteConfig {
	pub fn state_is_forced(&self) -> bool {
		self.force_state && !self.message.is_empty()
	}

	/// The first paragraph of `message` (split on the first blank line).
	pub fn title(&self) -> &str {
		self.message
			.split("\n\n")
			.next()
			.unwrap_or_default()
			.trim()
	}

	/// Everything in `message` after the first paragraph.
	pub fn body(&self) -> &str {
		match self.message.split_once("\n\n") {
			Some((_, rest)) => rest.trim(),
			None => "",
		}
	}
}

/// Static definition of a service and its components, as declared in
/// `site.yml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDefinition {
	pub label: String,
	#[serde(default)]
	pub components: Vec<ComponentDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentDefinition {
	pub label: String,
}

/// Parsed `site.yml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteDefinition {
	pub title: String,
	#[serde(default)]
	pub services: Vec<ServiceDefinition>,
	#[serde(default)]
	pub ssh_users: Vec<String>,
}

pub struct SiteManager {
	pub name: Arc<str>,
	pub title: String,
	pub tokens: HashSet<String>,
	pub ssh_users: HashSet<String>,
	pub service_managers: BTreeMap<String, ServiceManager>,
	pub site_config: SiteConfig,
	pub monitoring_is_down: bool,
	pub last_updated: DateTime<Utc>,

	tx: mpsc::Sender<CoreCommand>,
	monitoring_down_timeout: Duration,
	monitoring_down_generation: u64,
	next_generation: u64,
	down_timer: Option<Timer>,
}

impl SiteManager {
	pub fn new(
		name: Arc<str>,
		definition: &SiteDefinition,
		site_config: SiteConfig,
		tokens: HashSet<String>,
		tx: mpsc::Sender<CoreCommand>,
		alert_resolve_timeout: Duration,
		group_timeout: Duration,
		monitoring_down_timeout: Duration,
	) -> Self {
		let service_managers = definition
			.services
			.iter()
			.map(|svc| {
				let labels = svc.components.iter().map(|c| c.label.clone()).collect();
				(
					svc.label.clone(),
					ServiceManager::new(
						name.clone(),
						Arc::from(svc.label.as_str()),
						labels,
						tx.clone(),
						alert_resolve_timeout,
						group_timeout,
					),
				)
			})
			.collect();

		let mut site = Self {
			name,
			title: definition.title.clone(),
			tokens,
			ssh_users: definition.ssh_users.iter().cloned().collect(),
			service_managers,
			site_config,
			monitoring_is_down: false,
			last_updated: Utc::now(),
			tx,
			monitoring_down_timeout,
			monitoring_down_generation: 0,
			next_generation: 1,
			down_timer: None,
		};
		site.arm_down_timer();
		site
	}

	fn arm_down_timer(&mut self) {
		let generation = self.next_generation;
		self.next_generation += 1;
		self.monitoring_down_generation = generation;
		self.down_timer = Some(Timer::schedule(
			self.tx.clone(),
			self.monitoring_down_timeout,
			TimerFired::MonitoringDown {
				site: self.name.clone(),
				generation,
			},
		));
	}

	/// Reconciles this `SiteManager` against a freshly-parsed definition,
	/// keeping existing `ServiceManager`s (and their live incidents) for
	/// services that still exist, dropping those that don't, and creating
	/// new ones for additions.
	pub fn reload(
		&mut self,
		definition: &SiteDefinition,
		alert_resolve_timeout: Duration,
		group_timeout: Duration,
	) {
		self.title = definition.title.clone();
		self.ssh_users = definition.ssh_users.iter().cloned().collect();

		let mut kept = BTreeMap::new();
		for svc in &definition.services {
			let labels = svc.components.iter().map(|c| c.label.clone()).collect();
			let manager = self.service_managers.remove(&svc.label).map(|mut m| {
				m.component_labels = labels;
				m
			});
			let manager = manager.unwrap_or_else(|| {
				ServiceManager::new(
					self.name.clone(),
					Arc::from(svc.label.as_str()),
					svc.components.iter().map(|c| c.label.clone()).collect(),
					self.tx.clone(),
					alert_resolve_timeout,
					group_timeout,
				)
			});
			kept.insert(svc.label.clone(), manager);
		}
		self.service_managers = kept;
	}

	/// Filters, imports and dispatches a batch of raw alerts for this site.
	/// Clears the monitoring-down state and re-arms the down timer.
	pub fn process_alerts(&mut self, raw_alerts: &[RawAlert]) {
		self.last_updated = Utc::now();
		self.monitoring_is_down = false;
		self.arm_down_timer();

		let (heartbeats, service_alerts): (Vec<Alert>, Vec<Alert>) = raw_alerts
			.iter()
			.filter(|raw| alert::belongs_to_site(raw, &self.name))
			.map(|raw| alert::import(raw.clone()))
			.partition(Alert::is_heartbeat);

		if !heartbeats.is_empty() {
			for service in self.service_managers.values_mut() {
				service.process_heartbeats();
			}
		}

		if !service_alerts.is_empty() {
			for service in self.service_managers.values_mut() {
				service.process_alerts(&service_alerts, self.last_updated);
			}
		}
	}

	/// A timer-driven declaration that the upstream monitor has gone quiet.
	/// Returns true if the generation matched.
	pub fn monitoring_down(&mut self, generation: u64) -> bool {
		if generation != self.monitoring_down_generation {
			return false;
		}
		self.monitoring_is_down = true;
		info!(site = %self.name, "[Meta]MonitoringDown");
		for service in self.service_managers.values_mut() {
			service.monitoring_down();
		}
		true
	}

	pub fn status(&self) -> Severity {
		if self.monitoring_is_down {
			return Severity::Error;
		}
		self.service_managers
			.values()
			.map(ServiceManager::status)
			.max()
			.unwrap_or(Severity::Ok)
	}
}
