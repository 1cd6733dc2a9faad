//! Cancellable deferred callbacks.
//!
//! Timers post a [`crate::core::CoreCommand::TimerFired`] back onto the core
//! actor's channel rather than running a callback in place, which is what
//! keeps every timer firing serialized with respect to ingress and reload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::{CoreCommand, TimerFired};

/// Identifies one armed timer slot on an entity (e.g. "the group timer for
/// this incident", or "the alert timer for this component").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

fn next_timer_id() -> TimerId {
	TimerId(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
}

/// A single armed timer. Dropping or calling [`Timer::cancel`] aborts the
/// backing task; cancelling twice, or cancelling after it has already
/// fired, is a no-op.
pub struct Timer {
	id: TimerId,
	handle: JoinHandle<()>,
}

impl Timer {
	/// Arms a timer that, after `after`, sends `payload` wrapped in a
	/// [`CoreCommand::TimerFired`] to `tx`.
	pub fn schedule(tx: mpsc::Sender<CoreCommand>, after: Duration, payload: TimerFired) -> Self {
		let id = next_timer_id();
		let handle = tokio::spawn(async move {
			tokio::time::sleep(after).await;
			let _ = tx.send(CoreCommand::TimerFired(payload)).await;
		});
		Self { id, handle }
	}

	pub fn id(&self) -> TimerId {
		self.id
	}

	/// Aborts the backing task. Safe to call even if the timer already
	/// fired and its command is sitting in the channel: the firing's
	/// generation number is checked against current state by the
	/// receiver, so a stale firing is ignored even if this races it.
	pub fn cancel(self) {
		self.handle.abort();
	}
}

impl Drop for Timer {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::core::TimerFired;

	#[tokio::test(start_paused = true)]
	async fn fires_after_delay() {
		let (tx, mut rx) = mpsc::channel(8);
		let _timer = Timer::schedule(
			tx,
			Duration::from_secs(5),
			TimerFired::GroupTimeout {
				site: "a".into(),
				service: "web".into(),
				generation: 0,
			},
		);

		tokio::time::advance(Duration::from_secs(4)).await;
		assert!(rx.try_recv().is_err());

		tokio::time::advance(Duration::from_secs(2)).await;
		assert!(rx.recv().await.is_some());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_suppresses_firing() {
		let (tx, mut rx) = mpsc::channel(8);
		let timer = Timer::schedule(
			tx,
			Duration::from_secs(5),
			TimerFired::GroupTimeout {
				site: "a".into(),
				service: "web".into(),
				generation: 0,
			},
		);
		timer.cancel();

		tokio::time::advance(Duration::from_secs(10)).await;
		assert!(rx.try_recv().is_err());
	}
}
