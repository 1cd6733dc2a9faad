//! Owns the full site tree: loading from disk, reloading in place, and the
//! derived token→site and user→sites indices.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use miette::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::CoreCommand;
use crate::loader::{self, LoadedSite};
use crate::site::SiteManager;

pub struct Timeouts {
	pub alert_resolve: Duration,
	pub group: Duration,
	pub monitoring_down: Duration,
}

pub struct SitesManager {
	pub data_dir: PathBuf,
	pub site_managers: BTreeMap<String, SiteManager>,
	tokens: HashMap<String, String>,
	tx: mpsc::Sender<CoreCommand>,
	timeouts: Timeouts,
}

impl SitesManager {
	pub fn load(data_dir: PathBuf, tx: mpsc::Sender<CoreCommand>, timeouts: Timeouts) -> Result<Self> {
		let loaded = loader::load_site_tree(&data_dir)?;

		let mut site_managers = BTreeMap::new();
		for LoadedSite { name, definition, config, tokens } in loaded {
			let manager = SiteManager::new(
				Arc::from(name.as_str()),
				&definition,
				config,
				tokens,
				tx.clone(),
				timeouts.alert_resolve,
				timeouts.group,
				timeouts.monitoring_down,
			);
			site_managers.insert(name, manager);
		}

		let mut sites = Self {
			data_dir,
			site_managers,
			tokens: HashMap::new(),
			tx,
			timeouts,
		};
		sites.rebuild_token_index();
		Ok(sites)
	}

	fn rebuild_token_index(&mut self) {
		let mut tokens = HashMap::new();
		for (name, site) in &self.site_managers {
			for token in &site.tokens {
				if let Some(existing) = tokens.insert(token.clone(), name.clone()) {
					warn!(token_owner_a = %existing, token_owner_b = %name, "duplicate token across sites, last one wins");
				}
			}
		}
		self.tokens = tokens;
	}

	/// Re-reads every site directory, reusing existing `SiteManager`s (and
	/// thus their live incidents and timers) by directory name. Sites whose
	/// directory disappeared are dropped; new directories become new sites.
	pub fn reload(&mut self) -> Result<()> {
		let loaded = loader::load_site_tree(&self.data_dir)?;
		let mut seen = std::collections::BTreeSet::new();

		for LoadedSite { name, definition, config, tokens } in loaded {
			seen.insert(name.clone());

			if let Some(existing) = self.site_managers.get_mut(&name) {
				existing.reload(&definition, self.timeouts.alert_resolve, self.timeouts.group);
				existing.tokens = tokens;
				// config.yaml is the single source of truth for the
				// operator override: `set_site_config` writes it
				// synchronously, so the freshly-read value already
				// reflects any change made since the last reload.
				existing.site_config = config;
			} else {
				info!(site = %name, "new site discovered on reload");
				let manager = SiteManager::new(
					Arc::from(name.as_str()),
					&definition,
					config,
					tokens,
					self.tx.clone(),
					self.timeouts.alert_resolve,
					self.timeouts.group,
					self.timeouts.monitoring_down,
				);
				self.site_managers.insert(name, manager);
			}
		}

		let removed: Vec<String> = self
			.site_managers
			.keys()
			.filter(|k| !seen.contains(*k))
			.cloned()
			.collect();
		for name in removed {
			info!(site = %name, "site directory removed, dropping");
			self.site_managers.remove(&name);
		}

		self.rebuild_token_index();
		Ok(())
	}

	pub fn site_for_token(&self, token: &str) -> Option<&str> {
		self.tokens.get(token).map(String::as_str)
	}

	pub fn user_sites(&self, user: &str) -> Vec<&str> {
		self.site_managers
			.iter()
			.filter(|(_, site)| site.ssh_users.contains(user))
			.map(|(name, _)| name.as_str())
			.collect()
	}

	pub fn persist_site_config(&self, site: &str, config: &crate::site::SiteConfig) -> std::io::Result<()> {
		loader::write_site_config(&self.data_dir, site, config)
	}
}
