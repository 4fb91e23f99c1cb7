//! Theory pack loading.
//!
//! Core packs are embedded at compile time and loaded on `open` when
//! `auto_load_core` is set. User packs load through the `@_ Load`
//! directive; relative paths resolve against the session's base path and
//! loading is idempotent per session × path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use include_dir::{include_dir, Dir};

use crate::error::Sys2Error;

static CORE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets/core");

pub struct TheoryLoader {
    base_path: PathBuf,
    loaded: HashSet<String>,
}

impl TheoryLoader {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            loaded: HashSet::new(),
        }
    }

    /// Embedded Core pack sources, path-sorted for a stable load order.
    pub fn core_packs() -> Vec<(String, String)> {
        let mut packs: Vec<(String, String)> = CORE_DIR
            .files()
            .filter(|f| f.path().extension().map(|e| e == "sys2").unwrap_or(false))
            .filter_map(|f| {
                f.contents_utf8()
                    .map(|text| (f.path().display().to_string(), text.to_string()))
            })
            .collect();
        packs.sort_by(|a, b| a.0.cmp(&b.0));
        packs
    }

    /// Record a load; false when this key was already loaded in this
    /// session (the caller then skips re-compilation).
    pub fn mark_loaded(&mut self, key: &str) -> bool {
        self.loaded.insert(key.to_string())
    }

    pub fn is_loaded(&self, key: &str) -> bool {
        self.loaded.contains(key)
    }

    /// Forget a theory key so a later `Load` recompiles it. Facts already
    /// committed stay in the KB; the store is append-only.
    pub fn unload(&mut self, key: &str) {
        self.loaded.remove(key);
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.base_path.join(candidate)
        }
    }

    pub fn read(&self, path: &str) -> Result<String, Sys2Error> {
        let resolved = self.resolve(path);
        std::fs::read_to_string(&resolved).map_err(|e| Sys2Error::TheoryIo {
            path: resolved.display().to_string(),
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_packs_are_embedded_and_sorted() {
        let packs = TheoryLoader::core_packs();
        assert!(!packs.is_empty());
        let names: Vec<&String> = packs.iter().map(|(n, _)| n).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn load_marking_is_idempotent() {
        let mut loader = TheoryLoader::new(PathBuf::from("."));
        assert!(loader.mark_loaded("packs/family.sys2"));
        assert!(!loader.mark_loaded("packs/family.sys2"));
        loader.unload("packs/family.sys2");
        assert!(loader.mark_loaded("packs/family.sys2"));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let loader = TheoryLoader::new(PathBuf::from("/theories"));
        assert_eq!(
            loader.resolve("packs/a.sys2"),
            PathBuf::from("/theories/packs/a.sys2")
        );
        assert_eq!(loader.resolve("/abs/b.sys2"), PathBuf::from("/abs/b.sys2"));
    }

    #[test]
    fn missing_file_reports_theory_io() {
        let loader = TheoryLoader::new(PathBuf::from("/nonexistent"));
        match loader.read("ghost.sys2") {
            Err(Sys2Error::TheoryIo { path, .. }) => {
                assert!(path.contains("ghost.sys2"));
            }
            other => panic!("expected TheoryIo, got {:?}", other.map(|_| ())),
        }
    }
}
