//! The single-owner actor that serializes every mutation of the site tree.
//!
//! HTTP handlers, the file-watch/SIGHUP reload path, and the SSH admin
//! interface never touch [`crate::sites::SitesManager`] directly: they send
//! a [`CoreCommand`] and await the reply. Timer firings post back into the
//! same channel, which is what makes "a timer callback observes strictly
//! later state than the ingress that scheduled it" true by construction.

use std::path::PathBuf;
use std::sync::Arc;

use miette::Result;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::alert::RawAlert;
use crate::admin::{self, AdminCommand, AdminOutcome};
use crate::error::StatusdError;
use crate::metrics;
use crate::sites::{SitesManager, Timeouts};

/// The channel depth past which ingestion is rejected with a transient
/// error instead of making the HTTP handler wait indefinitely; see the
/// backpressure note in the concurrency design.
pub const COMMAND_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum TimerFired {
	GroupTimeout { site: Arc<str>, service: Arc<str>, generation: u64 },
	AlertResolve { site: Arc<str>, service: Arc<str>, component: String, generation: u64 },
	MonitoringDown { site: Arc<str>, generation: u64 },
}

pub enum CoreCommand {
	Ingest {
		token: String,
		raw_alerts: Vec<RawAlert>,
		reply: oneshot::Sender<Result<(), StatusdError>>,
	},
	TimerFired(TimerFired),
	Reload {
		reply: oneshot::Sender<Result<()>>,
	},
	Admin {
		user: String,
		command: AdminCommand,
		reply: oneshot::Sender<AdminOutcome>,
	},
	Status {
		host: String,
		reply: oneshot::Sender<Option<SiteView>>,
	},
}

/// A read-only snapshot handed to the status page template. Built inside
/// the core actor so the HTML renderer never has to touch live state.
#[derive(Debug, Clone)]
pub struct SiteView {
	pub name: String,
	pub title: String,
	pub status: crate::severity::Severity,
	pub services: Vec<ServiceView>,
	pub message_title: String,
	pub message_body: String,
	pub state_is_forced: bool,
}

#[derive(Debug, Clone)]
pub struct ServiceView {
	pub label: String,
	pub status: crate::severity::Severity,
	pub components: Vec<ComponentView>,
}

#[derive(Debug, Clone)]
pub struct ComponentView {
	pub label: String,
	pub status: crate::severity::Severity,
}

/// A cheaply-cloneable handle used by every external collaborator (HTTP
/// handlers, the admin shell, the reload triggers) to talk to the core
/// actor.
#[derive(Clone)]
pub struct Handle {
	tx: mpsc::Sender<CoreCommand>,
}

impl Handle {
	pub fn sender(&self) -> mpsc::Sender<CoreCommand> {
		self.tx.clone()
	}

	pub async fn ingest(&self, token: String, raw_alerts: Vec<RawAlert>) -> Result<(), StatusdError> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.try_send(CoreCommand::Ingest { token, raw_alerts, reply })
			.map_err(|_| StatusdError::CoreUnavailable)?;
		rx.await.map_err(|_| StatusdError::CoreUnavailable)?
	}

	pub async fn reload(&self) -> Result<()> {
		let (reply, rx) = oneshot::channel();
		self.tx
			.send(CoreCommand::Reload { reply })
			.await
			.map_err(|_| miette::miette!("core actor is gone"))?;
		rx.await.map_err(|_| miette::miette!("core actor dropped reload reply"))?
	}

	pub async fn admin(&self, user: String, command: AdminCommand) -> AdminOutcome {
		let (reply, rx) = oneshot::channel();
		if self.tx.send(CoreCommand::Admin { user, command, reply }).await.is_err() {
			return AdminOutcome::Denied;
		}
		rx.await.unwrap_or(AdminOutcome::Denied)
	}

	pub async fn status(&self, host: String) -> Option<SiteView> {
		let (reply, rx) = oneshot::channel();
		self.tx.send(CoreCommand::Status { host, reply }).await.ok()?;
		rx.await.ok().flatten()
	}
}

pub struct Core {
	sites: SitesManager,
	rx: mpsc::Receiver<CoreCommand>,
}

impl Core {
	/// Loads the site tree and returns the actor plus a [`Handle`] other
	/// tasks use to reach it. The actor itself is not started; call
	/// [`Core::run`] in its own task.
	pub fn new(data_dir: PathBuf, timeouts: Timeouts) -> Result<(Self, Handle)> {
		let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
		let sites = SitesManager::load(data_dir, tx.clone(), timeouts)?;
		Ok((Self { sites, rx }, Handle { tx }))
	}

	pub async fn run(mut self) {
		info!("core actor started");
		while let Some(command) = self.rx.recv().await {
			self.handle(command);
		}
		info!("core actor stopped");
	}

	fn handle(&mut self, command: CoreCommand) {
		match command {
			CoreCommand::Ingest { token, raw_alerts, reply } => {
				let outcome = self.handle_ingest(&token, raw_alerts);
				let _ = reply.send(outcome);
			}
			CoreCommand::TimerFired(fired) => self.handle_timer(fired),
			CoreCommand::Reload { reply } => {
				let outcome = self.sites.reload();
				if outcome.is_ok() {
					metrics::inc_reloads();
				}
				if let Err(err) = &outcome {
					error!("reload failed: {err:?}");
				}
				let _ = reply.send(outcome);
			}
			CoreCommand::Admin { user, command, reply } => {
				let outcome = admin::handle(&mut self.sites, &user, command);
				let _ = reply.send(outcome);
			}
			CoreCommand::Status { host, reply } => {
				let _ = reply.send(self.build_site_view(&host));
			}
		}
		self.refresh_gauges();
	}

	fn handle_ingest(&mut self, token: &str, raw_alerts: Vec<RawAlert>) -> Result<(), StatusdError> {
		let Some(site_name) = self.sites.site_for_token(token).map(str::to_string) else {
			metrics::inc_alerts_rejected();
			return Err(StatusdError::UnknownToken);
		};
		let Some(site) = self.sites.site_managers.get_mut(&site_name) else {
			metrics::inc_alerts_rejected();
			return Err(StatusdError::UnknownToken);
		};
		metrics::add_alerts_ingested(raw_alerts.len());
		site.process_alerts(&raw_alerts);
		Ok(())
	}

	fn handle_timer(&mut self, fired: TimerFired) {
		match fired {
			TimerFired::GroupTimeout { site, service, generation } => {
				if let Some(site_mgr) = self.sites.site_managers.get_mut(site.as_ref()) {
					if let Some(service_mgr) = site_mgr.service_managers.get_mut(service.as_ref()) {
						if service_mgr.expire_group(generation) {
							metrics::inc_incidents_resolved();
						}
					}
				}
			}
			TimerFired::AlertResolve { site, service, component, generation } => {
				if let Some(site_mgr) = self.sites.site_managers.get_mut(site.as_ref()) {
					if let Some(service_mgr) = site_mgr.service_managers.get_mut(service.as_ref()) {
						service_mgr.expire_alert(&component, generation);
					}
				}
			}
			TimerFired::MonitoringDown { site, generation } => {
				if let Some(site_mgr) = self.sites.site_managers.get_mut(site.as_ref()) {
					site_mgr.monitoring_down(generation);
				}
			}
		}
	}

	fn build_site_view(&self, host: &str) -> Option<SiteView> {
		let site = self.sites.site_managers.get(host)?;
		let services = site
			.service_managers
			.values()
			.map(|service| ServiceView {
				label: service.label.to_string(),
				status: service.status(),
				components: service
					.component_labels
					.iter()
					.map(|label| ComponentView {
						label: label.clone(),
						status: service.component_status(label),
					})
					.collect(),
			})
			.collect();

		Some(SiteView {
			name: host.to_string(),
			title: site.title.clone(),
			status: site.status(),
			services,
			message_title: site.site_config.title().to_string(),
			message_body: site.site_config.body().to_string(),
			state_is_forced: site.site_config.state_is_forced(),
		})
	}

	fn refresh_gauges(&self) {
		metrics::set_sites_loaded(self.sites.site_managers.len());
		let monitoring_down = self
			.sites
			.site_managers
			.values()
			.filter(|s| s.monitoring_is_down)
			.count();
		metrics::set_sites_monitoring_down(monitoring_down);
		let incidents_open: usize = self
			.sites
			.site_managers
			.values()
			.flat_map(|s| s.service_managers.values())
			.filter(|s| s.current_incident.is_some())
			.count();
		metrics::set_incidents_open(incidents_open);
	}
}
