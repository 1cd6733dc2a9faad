use std::sync::Arc;

use tempfile::TempDir;

use crate::core::Core;
use crate::sites::Timeouts;
use crate::templates::Renderer;

use super::ServerState;

fn write_fixture_site(root: &std::path::Path) {
	let site_dir = root.join("sites").join("a.example");
	std::fs::create_dir_all(&site_dir).unwrap();
	std::fs::write(
		site_dir.join("site.yml"),
		"title: A Example\nservices:\n  - label: web\n    components:\n      - label: api\nssh_users: []\n",
	)
	.unwrap();
	std::fs::write(site_dir.join("tokens.txt"), "test-token\n").unwrap();
}

pub async fn test_state() -> Arc<ServerState> {
	let tmp = TempDir::new().unwrap();
	write_fixture_site(tmp.path());

	let timeouts = Timeouts {
		alert_resolve: std::time::Duration::from_secs(300),
		group: std::time::Duration::from_secs(3600),
		monitoring_down: std::time::Duration::from_secs(120),
	};
	let (core, handle) = Core::new(tmp.path().to_path_buf(), timeouts).unwrap();
	tokio::spawn(core.run());

	// Keep the temp dir alive for the test's lifetime by leaking it; test
	// processes are short-lived so this isn't a real leak in practice.
	std::mem::forget(tmp);

	let renderer = Arc::new(Renderer::load(std::path::Path::new("/nonexistent")).unwrap());
	Arc::new(ServerState { core: handle, renderer })
}
