//! Loads the on-disk site tree: `<data_dir>/sites/<name>/{site.yml,tokens.txt,config.yaml}`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use miette::{Context as _, IntoDiagnostic, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::site::{SiteConfig, SiteDefinition};

pub struct LoadedSite {
	pub name: String,
	pub definition: SiteDefinition,
	pub config: SiteConfig,
	pub tokens: HashSet<String>,
}

/// Walks `<data_dir>/sites/*` one level deep, parsing each site directory
/// found. A directory missing `site.yml` is skipped with a warning rather
/// than failing the whole load; a directory with a malformed `site.yml`
/// reports a precise location via `serde_path_to_error` and is also
/// skipped, so one bad site never blocks the rest of the tree from loading.
pub fn load_site_tree(data_dir: &Path) -> Result<Vec<LoadedSite>> {
	let sites_dir = data_dir.join("sites");
	if !sites_dir.exists() {
		warn!(?sites_dir, "sites directory does not exist");
		return Ok(Vec::new());
	}

	let mut sites = Vec::new();

	for entry in WalkDir::new(&sites_dir).min_depth(1).max_depth(1) {
		let entry = entry.into_diagnostic().wrap_err("walking sites directory")?;
		if !entry.file_type().is_dir() {
			continue;
		}
		let dir = entry.path();
		let name = entry.file_name().to_string_lossy().to_string();

		match load_one_site(dir) {
			Ok((definition, config, tokens)) => sites.push(LoadedSite {
				name,
				definition,
				config,
				tokens,
			}),
			Err(err) => warn!(site = %name, "skipping site: {err:?}"),
		}
	}

	debug!(count = sites.len(), "loaded sites");
	Ok(sites)
}

fn load_one_site(dir: &Path) -> Result<(SiteDefinition, SiteConfig, HashSet<String>)> {
	let definition = read_site_definition(&dir.join("site.yml"))?;
	let tokens = read_tokens(&dir.join("tokens.txt"));
	let config = read_site_config(&dir.join("config.yaml"));
	Ok((definition, config, tokens))
}

fn read_site_definition(path: &PathBuf) -> Result<SiteDefinition> {
	let content = std::fs::read_to_string(path)
		.into_diagnostic()
		.wrap_err(format!("reading {path:?}"))?;
	let deserializer = serde_yaml::Deserializer::from_str(&content);
	serde_path_to_error::deserialize(deserializer)
		.into_diagnostic()
		.wrap_err(format!("parsing {path:?}"))
}

fn read_tokens(path: &PathBuf) -> HashSet<String> {
	match std::fs::read_to_string(path) {
		Ok(content) => content
			.lines()
			.map(str::trim)
			.filter(|l| !l.is_empty())
			.map(String::from)
			.collect(),
		Err(err) => {
			warn!(?path, "could not read tokens.txt, site will not accept ingestion: {err}");
			HashSet::new()
		}
	}
}

/// A missing or corrupt `config.yaml` is never fatal: the site falls back
/// to the default (empty) operator override.
fn read_site_config(path: &PathBuf) -> SiteConfig {
	std::fs::read_to_string(path)
		.ok()
		.and_then(|content| serde_yaml::from_str(&content).ok())
		.unwrap_or_default()
}

/// Persists an operator override to `config.yaml`, mode 0640.
pub fn write_site_config(data_dir: &Path, site: &str, config: &SiteConfig) -> std::io::Result<()> {
	let path = data_dir.join("sites").join(site).join("config.yaml");
	let yaml = serde_yaml::to_string(config)
		.map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
	std::fs::write(&path, yaml)?;

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640))?;
	}

	Ok(())
}
