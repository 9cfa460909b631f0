//! Versioned graph artifact store.
//!
//! The "low-latency cache" consumed by the route-search service: a directory
//! of bincode artifacts keyed by graph version, plus a `current_version`
//! pointer file. The pointer is written via tmp-file + rename so readers
//! never observe a half-written version, and old artifacts are never touched
//! after activation.

use crate::graph_formats::{GraphArtifact, load_bincode, save_bincode};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CURRENT_VERSION_FILE: &str = "current_version";

#[derive(Debug, Clone)]
pub struct GraphStore {
    base_path: PathBuf,
}

impl GraphStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn graph_path(&self, graph_version: &str) -> PathBuf {
        self.base_path.join(format!("{}.bin", graph_version))
    }

    /// Write the artifact under its version key. Returns the written path,
    /// which doubles as the metadata row's backup path.
    pub fn save_graph(&self, artifact: &GraphArtifact) -> Result<PathBuf> {
        fs::create_dir_all(&self.base_path)
            .with_context(|| format!("creating graph store dir {}", self.base_path.display()))?;
        let path = self.graph_path(&artifact.graph_version);
        save_bincode(artifact, &path)
            .with_context(|| format!("writing graph artifact {}", path.display()))?;
        Ok(path)
    }

    pub fn load_graph(&self, graph_version: &str) -> Result<GraphArtifact> {
        let path = self.graph_path(graph_version);
        load_bincode(&path).with_context(|| format!("reading graph artifact {}", path.display()))
    }

    /// Atomically flip the current-version pointer.
    pub fn set_graph_version(&self, graph_version: &str) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        let pointer = self.base_path.join(CURRENT_VERSION_FILE);
        let tmp = self.base_path.join(format!("{}.tmp", CURRENT_VERSION_FILE));
        fs::write(&tmp, graph_version)?;
        fs::rename(&tmp, &pointer)
            .with_context(|| format!("activating graph version {}", graph_version))?;
        Ok(())
    }

    pub fn current_graph_version(&self) -> Result<Option<String>> {
        let pointer = self.base_path.join(CURRENT_VERSION_FILE);
        if !pointer.exists() {
            return Ok(None);
        }
        let version = fs::read_to_string(&pointer)?;
        Ok(Some(version.trim().to_string()))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_formats::{GraphSummary, build_adjacency};

    fn test_store(tag: &str) -> GraphStore {
        let dir = std::env::temp_dir().join(format!(
            "taiga-graph-store-{}-{}",
            tag,
            std::process::id()
        ));
        std::fs::remove_dir_all(&dir).ok();
        GraphStore::new(dir)
    }

    fn artifact(version: &str) -> GraphArtifact {
        GraphArtifact {
            graph_version: version.to_string(),
            node_ids: vec!["a".into()],
            adjacency: build_adjacency(&[]),
            summary: GraphSummary {
                dataset_version: "ds-1".into(),
                node_count: 1,
                edge_count: 0,
                built_at_unix_ms: 0,
            },
        }
    }

    #[test]
    fn save_then_load_roundtrip() {
        let store = test_store("roundtrip");
        let path = store.save_graph(&artifact("graph-v1")).unwrap();
        assert!(path.exists());
        let loaded = store.load_graph("graph-v1").unwrap();
        assert_eq!(loaded.graph_version, "graph-v1");
        std::fs::remove_dir_all(store.base_path()).ok();
    }

    #[test]
    fn pointer_flip_is_last_writer_wins() {
        let store = test_store("pointer");
        assert_eq!(store.current_graph_version().unwrap(), None);
        store.set_graph_version("graph-v1").unwrap();
        store.set_graph_version("graph-v2").unwrap();
        assert_eq!(
            store.current_graph_version().unwrap().as_deref(),
            Some("graph-v2")
        );
        std::fs::remove_dir_all(store.base_path()).ok();
    }
}
