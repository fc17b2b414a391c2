//! File-backed [`KeyValueStore`]: one JSON object per profile directory.

use std::{
	collections::BTreeMap,
	fs,
	io::ErrorKind,
	path::{Path, PathBuf},
	sync::Mutex,
};

use crate::{Error, KeyValueStore, Result, lock};

const STORE_FILE: &str = "store.json";

pub struct FileKeyValueStore {
	path: PathBuf,
	write_lock: Mutex<()>,
}
impl FileKeyValueStore {
	/// The directory is created on first write.
	pub fn new(profile_dir: impl AsRef<Path>) -> Self {
		Self { path: profile_dir.as_ref().join(STORE_FILE), write_lock: Mutex::new(()) }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_all(&self) -> Result<BTreeMap<String, String>> {
		let raw = match fs::read_to_string(&self.path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
			Err(err) => return Err(local_store_error(&self.path, err)),
		};

		serde_json::from_str(&raw).map_err(|err| local_store_error(&self.path, err))
	}
}

impl KeyValueStore for FileKeyValueStore {
	fn get(&self, key: &str) -> Result<Option<String>> {
		Ok(self.read_all()?.remove(key))
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		let _guard = lock(&self.write_lock);
		// A corrupt document is replaced rather than blocking every later write.
		let mut entries = self.read_all().unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Discarding unreadable local store.");

			BTreeMap::new()
		});

		entries.insert(key.to_string(), value.to_string());

		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).map_err(|err| local_store_error(&self.path, err))?;
		}

		let encoded =
			serde_json::to_string_pretty(&entries).map_err(|err| local_store_error(&self.path, err))?;
		let staging = self.path.with_extension("json.tmp");

		fs::write(&staging, encoded).map_err(|err| local_store_error(&staging, err))?;
		fs::rename(&staging, &self.path).map_err(|err| local_store_error(&self.path, err))?;

		Ok(())
	}
}

fn local_store_error(path: &Path, err: impl std::fmt::Display) -> Error {
	Error::LocalStore { message: format!("{}: {err}", path.display()) }
}
