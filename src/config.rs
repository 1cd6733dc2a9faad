//! Daemon configuration, layered CLI-over-environment in the reference
//! daemon's `clap(env = "...")` idiom.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, clap::Args)]
pub struct Config {
	/// Directory holding the `sites/` tree, tokens, and persisted overrides
	#[arg(long, env = "DATA_DIR")]
	pub data_dir: PathBuf,

	/// Address the ingestion/status HTTP server listens on
	#[arg(long, env = "WEB_ENDPOINT", default_value = "127.0.0.1:8080")]
	pub web_endpoint: SocketAddr,

	/// Directory of static assets served at `/static/*`
	#[arg(long, env = "WEB_STATIC_DIR")]
	pub web_static_dir: Option<PathBuf>,

	/// Enable the SSH admin shell
	#[arg(long, env = "SSH_ENABLED", default_value_t = false)]
	pub ssh_enabled: bool,

	/// Address the SSH admin shell listens on
	#[arg(long, env = "SSH_ENDPOINT", default_value = "127.0.0.1:8022")]
	pub ssh_endpoint: SocketAddr,

	/// Size, in bits, of generated host keys
	#[arg(long, env = "SSH_KEY_SIZE", default_value_t = 256)]
	pub ssh_key_size: u32,

	/// Directory of authorized SSH public keys, one file per user
	#[arg(long, env = "SSH_KEYS_DIR")]
	pub ssh_keys_dir: Option<PathBuf>,

	/// Minutes of silence after which a single component's alert is
	/// considered resolved
	#[arg(long, env = "ALERT_RESOLVE_MINUTES", default_value_t = 5)]
	pub alert_resolve_minutes: u64,

	/// Minutes of silence after which an incident is considered closed
	#[arg(long, env = "GROUP_INCIDENTS_MINUTES", default_value_t = 60)]
	pub group_incidents_minutes: u64,

	/// Minutes without any payload after which a site's monitor is
	/// considered down
	#[arg(long, env = "MONITORING_DOWN_MINUTES", default_value_t = 2)]
	pub monitoring_down_minutes: u64,
}

impl Config {
	pub fn alert_resolve_timeout(&self) -> Duration {
		Duration::from_secs(self.alert_resolve_minutes * 60)
	}

	pub fn group_timeout(&self) -> Duration {
		Duration::from_secs(self.group_incidents_minutes * 60)
	}

	pub fn monitoring_down_timeout(&self) -> Duration {
		Duration::from_secs(self.monitoring_down_minutes * 60)
	}

	pub fn timeouts(&self) -> crate::sites::Timeouts {
		crate::sites::Timeouts {
			alert_resolve: self.alert_resolve_timeout(),
			group: self.group_timeout(),
			monitoring_down: self.monitoring_down_timeout(),
		}
	}
}
