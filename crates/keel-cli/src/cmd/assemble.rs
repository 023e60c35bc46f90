//! Walk a workspace directory into a content graph.
//!
//! One build node anchors the collection; every admitted file becomes an
//! artifact node carrying its digest, size, and media type, with an edge from
//! the anchor. The computed root is the collection's entry point and must be
//! unique; anything else is a malformed workspace.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use walkdir::WalkDir;

use keel_core::config::{validate_limits, AssemblyLimits};
use keel_core::descriptor::Descriptor;
use keel_core::graph::{ArtifactNode, BuildNode, Graph, NodeVisitor};
use keel_core::MEDIA_TYPE_FILE;

use crate::output;

#[derive(Debug, Serialize)]
pub struct AssembleOut {
    pub root: String,
    pub nodes: usize,
    pub edges: usize,
    pub artifacts: usize,
    pub total_bytes: u64,
    pub assembled_at: String,
}

pub async fn run(path: &str, max_files: Option<usize>) -> Result<()> {
    let mut limits = AssemblyLimits::default();
    if let Some(n) = max_files {
        limits.max_files = n;
    }
    validate_limits(&limits)?;

    let root_dir = Path::new(path);
    if !root_dir.is_dir() {
        return Err(anyhow!("workspace is not a directory: {path}"));
    }

    let (graph, total_bytes) = assemble_graph(root_dir, &limits)?;

    let root = graph.root().context("workspace graph has no usable root")?;

    let mut counter = ArtifactCounter::default();
    for id in collect_ids(&graph, root.id()) {
        if let Some(node) = graph.node(&id) {
            node.accept(&mut counter);
        }
    }

    let out = AssembleOut {
        root: root.id().to_string(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        artifacts: counter.artifacts,
        total_bytes,
        assembled_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
    };
    output::status("assembled", &format!("{} ({} artifacts)", out.root, out.artifacts));
    output::print(&out)?;
    Ok(())
}

/// Build the graph for a workspace directory. Files are admitted in sorted
/// order so repeated runs see identical node sets.
fn assemble_graph(root_dir: &Path, limits: &AssemblyLimits) -> Result<(Graph, u64)> {
    let collection_id = format!(
        "collection:{}",
        root_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("workspace")
    );

    let mut graph = Graph::new();
    graph
        .add_node(BuildNode::new(collection_id.clone()))
        .map_err(|e| anyhow!("collection node: {e}"))?;

    let mut files = 0usize;
    let mut total_bytes = 0u64;

    for entry in WalkDir::new(root_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        files += 1;
        if files > limits.max_files {
            return Err(anyhow!(
                "file count exceeds limit: max_files={}",
                limits.max_files
            ));
        }

        let rel = entry
            .path()
            .strip_prefix(root_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("read {}", entry.path().display()))?;
        total_bytes += bytes.len() as u64;
        if total_bytes > limits.max_total_bytes {
            return Err(anyhow!(
                "total bytes exceeds limit: max_total_bytes={}",
                limits.max_total_bytes
            ));
        }

        let desc = Descriptor::from_bytes(MEDIA_TYPE_FILE, &bytes);
        let node_id = format!("file:{rel}");
        let node = ArtifactNode::new(node_id.clone())
            .with_attribute("digest", json!(desc.digest.as_str()))
            .with_attribute("size", json!(desc.size))
            .with_attribute("mediaType", json!(desc.media_type));

        graph
            .add_node(node)
            .map_err(|e| anyhow!("artifact node: {e}"))?;
        graph
            .add_edge(&collection_id, &node_id)
            .map_err(|e| anyhow!("collection edge: {e}"))?;

        if graph.node_count() > limits.max_nodes || graph.edge_count() > limits.max_edges {
            return Err(anyhow!("graph exceeds node/edge limits"));
        }
    }

    Ok((graph, total_bytes))
}

/// Ids of the root and everything one hop out. Assembly graphs are flat, so
/// this covers the whole collection.
fn collect_ids(graph: &Graph, root_id: &str) -> Vec<String> {
    let mut ids = vec![root_id.to_string()];
    ids.extend(graph.nodes_from(root_id).iter().map(|n| n.id().to_string()));
    ids
}

#[derive(Default)]
struct ArtifactCounter {
    artifacts: usize,
}

impl NodeVisitor for ArtifactCounter {
    fn visit_artifact(&mut self, _node: &ArtifactNode) {
        self.artifacts += 1;
    }
    fn visit_build(&mut self, _node: &BuildNode) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::graph::Node;

    #[test]
    fn assembles_files_under_a_unique_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.txt"), b"beta").unwrap();

        let (graph, total) = assemble_graph(dir.path(), &AssemblyLimits::default()).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(total, 9);

        let root = graph.root().unwrap();
        assert!(root.id().starts_with("collection:"));
        assert!(graph.node("file:a.txt").is_some());
        assert!(graph.node("file:sub/b.txt").is_some());
    }

    #[test]
    fn file_limit_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();

        let mut limits = AssemblyLimits::default();
        limits.max_files = 1;
        assert!(assemble_graph(dir.path(), &limits).is_err());
    }

    #[test]
    fn artifact_nodes_carry_digests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();

        let (graph, _) = assemble_graph(dir.path(), &AssemblyLimits::default()).unwrap();
        let Some(Node::Artifact(node)) = graph.node("file:a.txt") else {
            panic!("expected artifact node");
        };
        let digest = node.attributes.get("digest").unwrap().as_str().unwrap();
        assert_eq!(digest, Descriptor::from_bytes(MEDIA_TYPE_FILE, b"alpha").digest.as_str());
    }
}
