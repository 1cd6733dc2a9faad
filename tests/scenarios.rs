//! End-to-end scenarios against the core actor: a site and service are laid
//! out on disk, alerts are ingested through the same `Handle` the HTTP layer
//! uses, and the incident state machine's timers are driven deterministically
//! with `tokio::time::pause`/`advance`.

use std::collections::HashMap;
use std::time::Duration;

use statusd::alert::RawAlert;
use statusd::core::Core;
use statusd::sites::Timeouts;

fn raw_alert(site: &str, service: &str, component: &str, severity: &str, ends_at: Option<&str>) -> RawAlert {
	let mut labels = HashMap::new();
	labels.insert("adlermanager".to_string(), site.to_string());
	labels.insert("service".to_string(), service.to_string());
	labels.insert("component".to_string(), component.to_string());
	labels.insert("severity".to_string(), severity.to_string());
	serde_json::from_value(serde_json::json!({
		"labels": labels,
		"annotations": {},
		"startsAt": serde_json::Value::Null,
		"endsAt": ends_at,
	}))
	.unwrap()
}

fn heartbeat(site: &str) -> RawAlert {
	let mut labels = HashMap::new();
	labels.insert("adlermanager".to_string(), site.to_string());
	labels.insert("service".to_string(), "web".to_string());
	labels.insert("component".to_string(), "api".to_string());
	labels.insert("heartbeat".to_string(), "true".to_string());
	serde_json::from_value(serde_json::json!({
		"labels": labels,
		"annotations": {},
	}))
	.unwrap()
}

fn write_site(root: &std::path::Path, name: &str, token: &str, extra_component: Option<&str>) {
	let dir = root.join("sites").join(name);
	std::fs::create_dir_all(&dir).unwrap();
	let mut yaml = format!(
		"title: {name}\nservices:\n  - label: web\n    components:\n      - label: api\n"
	);
	if let Some(extra) = extra_component {
		yaml.push_str(&format!("      - label: {extra}\n"));
	}
	yaml.push_str("ssh_users: []\n");
	std::fs::write(dir.join("site.yml"), yaml).unwrap();
	std::fs::write(dir.join("tokens.txt"), format!("{token}\n")).unwrap();
}

fn timeouts() -> Timeouts {
	Timeouts {
		alert_resolve: Duration::from_secs(300),
		group: Duration::from_secs(3600),
		monitoring_down: Duration::from_secs(120),
	}
}

/// S1 — a single alert opens an incident, the per-component timer resolves
/// it, and the group timer later closes the incident.
#[tokio::test(start_paused = true)]
async fn single_alert_opens_and_resolves() {
	let tmp = tempfile::TempDir::new().unwrap();
	write_site(tmp.path(), "a.example", "tok-a", None);

	let (core, handle) = Core::new(tmp.path().to_path_buf(), timeouts()).unwrap();
	tokio::spawn(core.run());

	handle
		.ingest(
			"tok-a".to_string(),
			vec![raw_alert("a.example", "web", "api", "warning", None)],
		)
		.await
		.unwrap();

	let view = handle.status("a.example".to_string()).await.unwrap();
	assert_eq!(view.services[0].components[0].status, statusd::severity::Severity::Warning);

	tokio::time::advance(Duration::from_secs(301)).await;
	tokio::task::yield_now().await;

	let view = handle.status("a.example".to_string()).await.unwrap();
	assert_eq!(view.services[0].status, statusd::severity::Severity::Ok);

	tokio::time::advance(Duration::from_secs(3600)).await;
	tokio::task::yield_now().await;

	let view = handle.status("a.example".to_string()).await.unwrap();
	assert_eq!(view.services[0].status, statusd::severity::Severity::Ok);
}

/// S2 — concurrent alerts on one component merge to their maximum severity.
#[tokio::test(start_paused = true)]
async fn severity_is_max_merged() {
	let tmp = tempfile::TempDir::new().unwrap();
	write_site(tmp.path(), "a.example", "tok-a", None);

	let (core, handle) = Core::new(tmp.path().to_path_buf(), timeouts()).unwrap();
	tokio::spawn(core.run());

	handle
		.ingest("tok-a".to_string(), vec![raw_alert("a.example", "web", "api", "warning", None)])
		.await
		.unwrap();
	tokio::time::advance(Duration::from_secs(10)).await;
	handle
		.ingest("tok-a".to_string(), vec![raw_alert("a.example", "web", "api", "error", None)])
		.await
		.unwrap();
	tokio::time::advance(Duration::from_secs(10)).await;
	handle
		.ingest("tok-a".to_string(), vec![raw_alert("a.example", "web", "api", "warning", None)])
		.await
		.unwrap();

	let view = handle.status("a.example".to_string()).await.unwrap();
	assert_eq!(view.services[0].components[0].status, statusd::severity::Severity::Error);
}

/// S3 — an alert whose `endsAt` is already past forces OK, resolving the
/// component mid-flight even while other alerts are still active.
#[tokio::test(start_paused = true)]
async fn ok_resolves_mid_flight() {
	let tmp = tempfile::TempDir::new().unwrap();
	write_site(tmp.path(), "a.example", "tok-a", None);

	let (core, handle) = Core::new(tmp.path().to_path_buf(), timeouts()).unwrap();
	tokio::spawn(core.run());

	handle
		.ingest("tok-a".to_string(), vec![raw_alert("a.example", "web", "api", "error", None)])
		.await
		.unwrap();
	tokio::time::advance(Duration::from_secs(5)).await;
	handle
		.ingest(
			"tok-a".to_string(),
			vec![raw_alert("a.example", "web", "api", "error", Some("2000-01-01T00:00:00Z"))],
		)
		.await
		.unwrap();

	let view = handle.status("a.example".to_string()).await.unwrap();
	assert_eq!(view.services[0].components[0].status, statusd::severity::Severity::Ok);
}

/// S4 — monitoring-down clears and the group timer re-arms once a heartbeat
/// arrives again.
#[tokio::test(start_paused = true)]
async fn heartbeat_restores_after_monitoring_down() {
	let tmp = tempfile::TempDir::new().unwrap();
	write_site(tmp.path(), "a.example", "tok-a", None);

	let (core, handle) = Core::new(tmp.path().to_path_buf(), timeouts()).unwrap();
	tokio::spawn(core.run());

	handle
		.ingest("tok-a".to_string(), vec![raw_alert("a.example", "web", "api", "warning", None)])
		.await
		.unwrap();

	tokio::time::advance(Duration::from_secs(121)).await;
	tokio::task::yield_now().await;

	let view = handle.status("a.example".to_string()).await.unwrap();
	assert_eq!(view.status, statusd::severity::Severity::Error);

	handle
		.ingest("tok-a".to_string(), vec![heartbeat("a.example")])
		.await
		.unwrap();

	let view = handle.status("a.example".to_string()).await.unwrap();
	assert_eq!(view.status, statusd::severity::Severity::Warning);
}

/// S5 — a valid token only ever affects the site it belongs to, even when
/// the posted body names a different site.
#[tokio::test(start_paused = true)]
async fn token_routes_only_to_its_own_site() {
	let tmp = tempfile::TempDir::new().unwrap();
	write_site(tmp.path(), "site-a", "tok-a", None);
	write_site(tmp.path(), "site-b", "tok-b", None);

	let (core, handle) = Core::new(tmp.path().to_path_buf(), timeouts()).unwrap();
	tokio::spawn(core.run());

	handle
		.ingest("tok-b".to_string(), vec![raw_alert("site-a", "web", "api", "error", None)])
		.await
		.unwrap();

	let view_a = handle.status("site-a".to_string()).await.unwrap();
	let view_b = handle.status("site-b".to_string()).await.unwrap();
	assert_eq!(view_a.status, statusd::severity::Severity::Ok);
	assert_eq!(view_b.status, statusd::severity::Severity::Ok);
}

/// S6 — reloading after a component is added to `site.yml` keeps the open
/// incident's object identity (it stays open) and picks up the new
/// component for future ingress.
#[tokio::test(start_paused = true)]
async fn reload_preserves_live_incidents() {
	let tmp = tempfile::TempDir::new().unwrap();
	write_site(tmp.path(), "a.example", "tok-a", None);

	let (core, handle) = Core::new(tmp.path().to_path_buf(), timeouts()).unwrap();
	tokio::spawn(core.run());

	handle
		.ingest("tok-a".to_string(), vec![raw_alert("a.example", "web", "api", "error", None)])
		.await
		.unwrap();

	write_site(tmp.path(), "a.example", "tok-a", Some("db"));
	handle.reload().await.unwrap();

	let view = handle.status("a.example".to_string()).await.unwrap();
	assert_eq!(view.services[0].components[0].status, statusd::severity::Severity::Error);
	assert_eq!(view.services[0].components.len(), 2);

	handle
		.ingest("tok-a".to_string(), vec![raw_alert("a.example", "web", "db", "warning", None)])
		.await
		.unwrap();
	let view = handle.status("a.example".to_string()).await.unwrap();
	let db = view.services[0].components.iter().find(|c| c.label == "db").unwrap();
	assert_eq!(db.status, statusd::severity::Severity::Warning);
}
