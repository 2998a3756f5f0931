//! Bundled script resources
//!
//! Hosts that ship PHP payloads alongside the application address them as a
//! bundle root plus a relative path, mirroring how mobile bundles and
//! packaged assets are laid out. Resolution happens at call time so a bundle
//! can be constructed before its contents exist on disk.

use crate::errors::{EngineError, Result};
use std::path::{Path, PathBuf};

/// A directory holding bundled PHP scripts
#[derive(Debug, Clone)]
pub struct ScriptBundle {
    root: PathBuf,
}

impl ScriptBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative script path to an absolute one, failing with
    /// [`EngineError::ScriptNotFound`] if it does not exist. A request-time
    /// check, repeated by the orchestration right before execution.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> Result<PathBuf> {
        let candidate = self.root.join(relative.as_ref());
        if !candidate.is_file() {
            return Err(EngineError::ScriptNotFound(candidate));
        }
        candidate
            .canonicalize()
            .map_err(|_| EngineError::ScriptNotFound(candidate))
    }

    /// Address one script inside this bundle
    pub fn script(&self, relative: impl Into<PathBuf>) -> ScriptResource {
        ScriptResource {
            bundle: self.clone(),
            path: relative.into(),
        }
    }
}

/// A (bundle, relative path) pair naming one bundled script
#[derive(Debug, Clone)]
pub struct ScriptResource {
    bundle: ScriptBundle,
    path: PathBuf,
}

impl ScriptResource {
    pub fn relative_path(&self) -> &Path {
        &self.path
    }

    /// Resolve to an absolute path at call time
    pub fn resolve(&self) -> Result<PathBuf> {
        self.bundle.resolve(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolves_existing_script() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("hello.php");
        std::fs::write(&script, "<?php echo 'hi';").unwrap();

        let bundle = ScriptBundle::new(dir.path());
        let resolved = bundle.resolve("hello.php").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("hello.php"));
    }

    #[test]
    fn missing_script_is_script_not_found() {
        let dir = TempDir::new().unwrap();
        let bundle = ScriptBundle::new(dir.path());
        match bundle.resolve("ghost.php") {
            Err(EngineError::ScriptNotFound(path)) => {
                assert!(path.ends_with("ghost.php"));
            }
            other => panic!("expected ScriptNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn resource_resolution_is_deferred() {
        let dir = TempDir::new().unwrap();
        let bundle = ScriptBundle::new(dir.path());

        // Constructing the resource does not touch the filesystem.
        let resource = bundle.script("late.php");
        assert!(resource.resolve().is_err());

        std::fs::write(dir.path().join("late.php"), "<?php").unwrap();
        assert!(resource.resolve().is_ok());
    }
}
