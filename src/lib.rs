#![deny(rust_2018_idioms)]

pub mod admin;
pub mod alert;
pub mod config;
pub mod core;
pub mod error;
mod http_server;
pub mod incident;
pub mod loader;
pub mod metrics;
pub mod service;
pub mod severity;
pub mod site;
pub mod sites;
pub mod ssh_auth;
pub mod templates;
mod timer;

use miette::Result;
use tracing::{error, info};

pub use config::Config;
pub use core::{Core, Handle};

/// Starts the core actor, the HTTP server, and the file-watch/SIGHUP reload
/// triggers, then runs until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<()> {
	info!("starting status daemon");
	metrics::init_metrics();

	let (core, handle) = Core::new(config.data_dir.clone(), config.timeouts())?;
	let core_task = tokio::spawn(core.run());

	let reload_handle = handle.clone();
	let watch_task = tokio::spawn(watch_for_reloads(config.data_dir.clone(), reload_handle));

	if let Err(err) = http_server::start_server(handle, &config).await {
		error!("HTTP server exited: {err:?}");
	}

	watch_task.abort();
	core_task.abort();
	Ok(())
}

/// Watches `<data_dir>/sites` for filesystem changes and SIGHUP, debouncing
/// bursts of changes into a single reload, in the reference daemon's
/// notify-driven watch/reload style.
async fn watch_for_reloads(data_dir: std::path::PathBuf, core: Handle) {
	use notify::{Event, EventKind, RecursiveMode, Watcher};
	use tokio::sync::mpsc;

	let (tx, mut rx) = mpsc::channel::<()>(16);

	let watch_tx = tx.clone();
	let watcher = notify::recommended_watcher(move |res: std::result::Result<Event, _>| {
		if let Ok(event) = res {
			if matches!(
				event.kind,
				EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
			) {
				let _ = watch_tx.blocking_send(());
			}
		}
	});

	let mut watcher = match watcher {
		Ok(w) => w,
		Err(err) => {
			error!("could not start file watcher: {err}");
			return;
		}
	};
	let sites_dir = data_dir.join("sites");
	if let Err(err) = watcher.watch(&sites_dir, RecursiveMode::Recursive) {
		error!(?sites_dir, "could not watch sites directory: {err}");
	}

	#[cfg(unix)]
	{
		let sighup_tx = tx.clone();
		tokio::spawn(async move {
			use tokio::signal::unix::{SignalKind, signal};
			let Ok(mut sighup) = signal(SignalKind::hangup()) else {
				return;
			};
			loop {
				sighup.recv().await;
				let _ = sighup_tx.send(()).await;
			}
		});
	}

	let mut debounce = tokio::time::interval(std::time::Duration::from_secs(2));
	debounce.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
	let mut needs_reload = false;

	loop {
		tokio::select! {
			Some(()) = rx.recv() => {
				needs_reload = true;
			}
			_ = debounce.tick() => {
				if needs_reload {
					needs_reload = false;
					info!("reloading site tree due to change");
					if let Err(err) = core.reload().await {
						error!("reload failed: {err:?}");
					}
				}
			}
		}
	}
}
