//! Disposable on-disk workspaces for tests that touch the catalog database or index snapshots.

mod error;

pub use error::{Error, Result};

use std::{
	env, fs,
	path::{Path, PathBuf},
};

use uuid::Uuid;

pub struct TestWorkspace {
	root: PathBuf,
	cleaned: bool,
}
impl TestWorkspace {
	pub fn new() -> Result<Self> {
		Self::in_dir(&env::temp_dir())
	}

	pub fn in_dir(base: &Path) -> Result<Self> {
		let root = base.join(format!("scribe_test_{}", Uuid::new_v4().simple()));

		fs::create_dir_all(&root).map_err(|err| {
			Error::Message(format!("Failed to create test workspace {root:?}: {err}."))
		})?;

		Ok(Self { root, cleaned: false })
	}

	/// Database file inside the workspace. Not created until something connects to it.
	pub fn sqlite_path(&self) -> PathBuf {
		self.root.join("data").join("notes.db")
	}

	pub fn index_path(&self) -> PathBuf {
		self.root.join("data").join("vector_store.scvi")
	}

	pub fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner()
	}

	fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		match fs::remove_dir_all(&self.root) {
			Ok(()) => {},
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
			Err(err) => return Err(err.into()),
		}

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestWorkspace {
	fn drop(&mut self) {
		if let Err(err) = self.cleanup_inner() {
			eprintln!("Test workspace cleanup failed: {err}.");
		}
	}
}
