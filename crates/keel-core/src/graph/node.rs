//! Node variants and visitor dispatch.
//!
//! Nodes are immutable once constructed. Identity (`id`) is the sole key used
//! for lookup and equality within a graph. The variant set is closed here, but
//! downstream publishing and traversal logic branches on it through
//! [`NodeVisitor`] rather than matching directly, so the graph itself never
//! needs to know what consumers do with each variant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An attributed artifact node: identifier, attribute set, optional address.
///
/// The address, when present, is the registry reference the artifact was
/// resolved from (or will be published to). Attributes are opaque to the
/// graph; their modeling is a higher-layer concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ArtifactNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
            address: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// A build node: identifier only, used while assembling a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildNode {
    pub id: String,
}

impl BuildNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Artifact(ArtifactNode),
    Build(BuildNode),
}

impl Node {
    /// The node id, unique within a graph.
    pub fn id(&self) -> &str {
        match self {
            Node::Artifact(n) => &n.id,
            Node::Build(n) => &n.id,
        }
    }

    /// Dispatch to the variant-specific visitor callback.
    pub fn accept(&self, visitor: &mut dyn NodeVisitor) {
        match self {
            Node::Artifact(n) => visitor.visit_artifact(n),
            Node::Build(n) => visitor.visit_build(n),
        }
    }
}

impl From<ArtifactNode> for Node {
    fn from(n: ArtifactNode) -> Self {
        Node::Artifact(n)
    }
}

impl From<BuildNode> for Node {
    fn from(n: BuildNode) -> Self {
        Node::Build(n)
    }
}

/// Capability-dispatch interface for branching on node variants.
pub trait NodeVisitor {
    fn visit_artifact(&mut self, node: &ArtifactNode);
    fn visit_build(&mut self, node: &BuildNode);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct CountingVisitor {
        artifacts: usize,
        builds: usize,
    }

    impl NodeVisitor for CountingVisitor {
        fn visit_artifact(&mut self, _node: &ArtifactNode) {
            self.artifacts += 1;
        }
        fn visit_build(&mut self, _node: &BuildNode) {
            self.builds += 1;
        }
    }

    #[test]
    fn accept_dispatches_by_variant() {
        let nodes: Vec<Node> = vec![
            ArtifactNode::new("a").into(),
            BuildNode::new("b").into(),
            ArtifactNode::new("c")
                .with_attribute("digest", json!("sha256:00"))
                .into(),
        ];

        let mut v = CountingVisitor::default();
        for n in &nodes {
            n.accept(&mut v);
        }
        assert_eq!(v.artifacts, 2);
        assert_eq!(v.builds, 1);
    }

    #[test]
    fn id_is_variant_independent() {
        assert_eq!(Node::from(ArtifactNode::new("x")).id(), "x");
        assert_eq!(Node::from(BuildNode::new("x")).id(), "x");
    }
}
