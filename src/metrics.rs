//! Prometheus metrics for the status daemon.
//!
//! Tracks the gauges and counters named in the external-interfaces design:
//! sites loaded, sites with monitoring down, open incidents, and running
//! totals for ingestion, incident lifecycle, and reloads.

use std::sync::OnceLock;

use miette::{IntoDiagnostic, Result};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

struct Metrics {
	registry: Registry,
	sites_loaded: IntGauge,
	sites_monitoring_down: IntGauge,
	incidents_open: IntGauge,
	alerts_ingested_total: IntCounter,
	alerts_rejected_total: IntCounter,
	incidents_opened_total: IntCounter,
	incidents_resolved_total: IntCounter,
	reloads_total: IntCounter,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

fn gauge(name: &str, help: &str) -> IntGauge {
	IntGauge::new(name, help).expect("metric name/help are static and valid")
}

fn counter(name: &str, help: &str) -> IntCounter {
	IntCounter::new(name, help).expect("metric name/help are static and valid")
}

pub fn init_metrics() {
	let registry = Registry::new();

	let metrics = Metrics {
		sites_loaded: gauge("statusd_sites_loaded", "Number of sites currently loaded"),
		sites_monitoring_down: gauge(
			"statusd_sites_monitoring_down",
			"Number of sites currently in the monitoring-down state",
		),
		incidents_open: gauge("statusd_incidents_open", "Number of currently open incidents"),
		alerts_ingested_total: counter(
			"statusd_alerts_ingested_total",
			"Total alerts accepted past the site/service/component filter",
		),
		alerts_rejected_total: counter(
			"statusd_alerts_rejected_total",
			"Total raw alert batches rejected by a bad token or body",
		),
		incidents_opened_total: counter("statusd_incidents_opened_total", "Total incidents opened"),
		incidents_resolved_total: counter(
			"statusd_incidents_resolved_total",
			"Total incidents resolved",
		),
		reloads_total: counter("statusd_reloads_total", "Total configuration reloads"),
		registry,
	};

	metrics
		.registry
		.register(Box::new(metrics.sites_loaded.clone()))
		.expect("metric registration");
	metrics
		.registry
		.register(Box::new(metrics.sites_monitoring_down.clone()))
		.expect("metric registration");
	metrics
		.registry
		.register(Box::new(metrics.incidents_open.clone()))
		.expect("metric registration");
	metrics
		.registry
		.register(Box::new(metrics.alerts_ingested_total.clone()))
		.expect("metric registration");
	metrics
		.registry
		.register(Box::new(metrics.alerts_rejected_total.clone()))
		.expect("metric registration");
	metrics
		.registry
		.register(Box::new(metrics.incidents_opened_total.clone()))
		.expect("metric registration");
	metrics
		.registry
		.register(Box::new(metrics.incidents_resolved_total.clone()))
		.expect("metric registration");
	metrics
		.registry
		.register(Box::new(metrics.reloads_total.clone()))
		.expect("metric registration");

	METRICS.set(metrics).unwrap_or_else(|_| panic!("metrics already initialized"));
}

pub fn set_sites_loaded(count: usize) {
	if let Some(m) = METRICS.get() {
		m.sites_loaded.set(count as i64);
	}
}

pub fn set_sites_monitoring_down(count: usize) {
	if let Some(m) = METRICS.get() {
		m.sites_monitoring_down.set(count as i64);
	}
}

pub fn set_incidents_open(count: usize) {
	if let Some(m) = METRICS.get() {
		m.incidents_open.set(count as i64);
	}
}

pub fn add_alerts_ingested(n: usize) {
	if let Some(m) = METRICS.get() {
		m.alerts_ingested_total.inc_by(n as u64);
	}
}

pub fn inc_alerts_rejected() {
	if let Some(m) = METRICS.get() {
		m.alerts_rejected_total.inc();
	}
}

pub fn inc_incidents_opened() {
	if let Some(m) = METRICS.get() {
		m.incidents_opened_total.inc();
	}
}

pub fn inc_incidents_resolved() {
	if let Some(m) = METRICS.get() {
		m.incidents_resolved_total.inc();
	}
}

pub fn inc_reloads() {
	if let Some(m) = METRICS.get() {
		m.reloads_total.inc();
	}
}

pub fn gather_metrics() -> Result<String> {
	let metrics = METRICS.get().ok_or_else(|| miette::miette!("metrics not initialized"))?;
	let metric_families = metrics.registry.gather();
	let encoder = TextEncoder::new();
	let mut buffer = Vec::new();
	encoder.encode(&metric_families, &mut buffer).into_diagnostic()?;
	String::from_utf8(buffer).into_diagnostic()
}
