//! Authorized-keys lookup for the SSH admin shell.
//!
//! The transport itself (key exchange, session channels) is out of scope;
//! this module is what a real transport calls once it has a client's
//! offered public key, to resolve it to a username it can then pass to
//! [`crate::admin::handle`].

use std::collections::HashMap;
use std::path::Path;

use ssh_key::PublicKey;
use tracing::warn;

/// Maps a public key fingerprint to the username it authenticates as, one
/// file per user in `ssh_keys_dir` (filename is the username, content is
/// one or more `authorized_keys`-style lines).
pub struct AuthorizedKeys {
	by_fingerprint: HashMap<String, String>,
}

impl AuthorizedKeys {
	pub fn load(dir: &Path) -> Self {
		let mut by_fingerprint = HashMap::new();

		let entries = match std::fs::read_dir(dir) {
			Ok(entries) => entries,
			Err(err) => {
				warn!(?dir, "could not read ssh keys directory: {err}");
				return Self { by_fingerprint };
			}
		};

		for entry in entries.flatten() {
			let Ok(username) = entry.file_name().into_string() else {
				continue;
			};
			let Ok(content) = std::fs::read_to_string(entry.path()) else {
				continue;
			};
			for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
				match PublicKey::from_openssh(line) {
					Ok(key) => {
						by_fingerprint.insert(key.fingerprint(ssh_key::HashAlg::Sha256).to_string(), username.clone());
					}
					Err(err) => warn!(user = %username, "invalid public key line: {err}"),
				}
			}
		}

		Self { by_fingerprint }
	}

	/// Resolves an offered public key to the username it's authorized for.
	pub fn resolve(&self, key: &PublicKey) -> Option<&str> {
		self.by_fingerprint
			.get(&key.fingerprint(ssh_key::HashAlg::Sha256).to_string())
			.map(String::as_str)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_directory_yields_empty_table() {
		let keys = AuthorizedKeys::load(Path::new("/nonexistent-statusd-test-dir"));
		assert!(keys.by_fingerprint.is_empty());
	}
}
