//! Core-side handlers for the SSH admin shell.
//!
//! The SSH transport itself (key exchange, session channel, line editing) is
//! out of scope here; this module is the thin boundary a real transport
//! would call into once it has authenticated a public key and resolved it to
//! a username. Access to `get_site_config`/`set_site_config` is scoped to
//! the sites a user is declared against in `site.yml`'s `ssh_users`.

use crate::site::SiteConfig;
use crate::sites::SitesManager;

#[derive(Debug, Clone)]
pub enum AdminCommand {
	ListSites,
	GetSiteConfig { site: String },
	SetSiteConfig { site: String, config: SiteConfig },
	WhoAmI,
}

#[derive(Debug, Clone)]
pub enum AdminOutcome {
	Sites(Vec<String>),
	Config(SiteConfig),
	WhoAmI(String),
	Ack,
	Denied,
	NotFound,
	WriteFailed(String),
}

/// Executes one admin command against the live site tree on behalf of
/// `user`. Must only ever be called from the core actor, never concurrently
/// with `process_alerts`/timer handling.
pub fn handle(sites: &mut SitesManager, user: &str, cmd: AdminCommand) -> AdminOutcome {
	match cmd {
		AdminCommand::WhoAmI => AdminOutcome::WhoAmI(user.to_string()),

		AdminCommand::ListSites => {
			AdminOutcome::Sites(sites.user_sites(user).into_iter().map(str::to_string).collect())
		}

		AdminCommand::GetSiteConfig { site } => {
			if !sites.user_sites(user).contains(&site.as_str()) {
				return AdminOutcome::Denied;
			}
			match sites.site_managers.get(&site) {
				Some(site_mgr) => AdminOutcome::Config(site_mgr.site_config.clone()),
				None => AdminOutcome::NotFound,
			}
		}

		AdminCommand::SetSiteConfig { site, config } => {
			if !sites.user_sites(user).contains(&site.as_str()) {
				return AdminOutcome::Denied;
			}
			if !sites.site_managers.contains_key(&site) {
				return AdminOutcome::NotFound;
			}
			if let Err(err) = sites.persist_site_config(&site, &config) {
				return AdminOutcome::WriteFailed(err.to_string());
			}
			sites.site_managers.get_mut(&site).unwrap().site_config = config;
			AdminOutcome::Ack
		}
	}
}
