use serde::Deserialize;
use serde::Serialize;

use crate::content_graph::ContentGraph;
use crate::content_graph::SerializedContentGraph;
use crate::error::AssetGraphError;
use crate::options::AssetGraphOptions;

use super::AssetGraph;
use super::AssetGraphNode;
use super::EnvironmentCache;

/// Flat form of an [`AssetGraph`] used to cache it between builds
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedAssetGraph {
  #[serde(flatten)]
  pub graph: SerializedContentGraph<AssetGraphNode>,
  pub hash: Option<String>,
}

impl AssetGraph {
  pub fn serialize(&self) -> SerializedAssetGraph {
    SerializedAssetGraph {
      graph: self.graph.serialize(),
      hash: self.hash.clone(),
    }
  }

  /// Restores a graph, starting with an empty environment cache and no removal observer
  pub fn from_serialized(
    serialized: SerializedAssetGraph,
    options: AssetGraphOptions,
  ) -> Result<Self, AssetGraphError> {
    let graph = ContentGraph::from_serialized(serialized.graph)?;

    match graph.root_node_id().map(|root| graph.node(root)) {
      Some(AssetGraphNode::Root) => {}
      _ => return Err(AssetGraphError::MissingRoot),
    }

    tracing::debug!(
      nodes = graph.node_count(),
      edges = graph.edge_count(),
      "Restored asset graph"
    );

    Ok(AssetGraph {
      graph,
      hash: serialized.hash,
      env_cache: EnvironmentCache::new(),
      on_node_removed: None,
      options,
    })
  }

  pub fn to_json(&self) -> Result<String, AssetGraphError> {
    Ok(serde_json::to_string(&self.serialize())?)
  }

  pub fn from_json(json: &str, options: AssetGraphOptions) -> Result<Self, AssetGraphError> {
    let serialized: SerializedAssetGraph = serde_json::from_str(json)?;
    Self::from_serialized(serialized, options)
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::asset_graph::AssetGraph;
  use crate::asset_graph::AssetGraphNode;
  use crate::content_graph::SerializedContentGraph;
  use crate::content_graph::SerializedNode;
  use crate::error::AssetGraphError;
  use crate::options::AssetGraphOptions;
  use crate::test_utils::*;

  use super::SerializedAssetGraph;

  #[test]
  fn restores_nodes_edges_and_hash() -> anyhow::Result<()> {
    let mut fixture = ReexportFixture::new(AssetGraphOptions::default());
    fixture.visited_files();
    let hash = fixture.graph.get_hash();

    let json = fixture.graph.to_json()?;
    let mut restored = AssetGraph::from_json(&json, AssetGraphOptions::default())?;

    assert_eq!(restored.serialize(), fixture.graph.serialize());
    assert_eq!(restored.cached_hash(), Some(hash.as_str()));
    assert!(restored.env_cache().is_empty());

    // Deferral state survives, so the restored graph traverses the same way
    let mut visited = Vec::new();
    restored.traverse(None, |_, node, _| {
      if let AssetGraphNode::AssetGroup(node) = node {
        visited.push(node.asset_group.file_path.to_string_lossy().into_owned());
      }
    });
    assert_eq!(visited, fixture.visited_files());

    Ok(())
  }

  #[test]
  fn restored_graph_without_hash_recomputes_it() -> anyhow::Result<()> {
    let mut graph = AssetGraph::new();
    resolve_entry_asset(&mut graph, make_asset("index.js", &[]));

    let mut restored = AssetGraph::from_serialized(graph.serialize(), AssetGraphOptions::default())?;

    assert_eq!(restored.cached_hash(), None);
    assert_eq!(restored.get_hash(), graph.get_hash());
    Ok(())
  }

  #[test]
  fn rejects_graphs_without_a_root_node() {
    let serialized = SerializedAssetGraph {
      graph: SerializedContentGraph {
        nodes: vec![SerializedNode {
          content_key: String::from("entry_specifier:index.js"),
          node: crate::asset_graph::node_from_entry_specifier("index.js"),
        }],
        edges: vec![],
        root_node_id: Some(0),
      },
      hash: None,
    };

    assert!(matches!(
      AssetGraph::from_serialized(serialized, AssetGraphOptions::default()),
      Err(AssetGraphError::MissingRoot)
    ));
  }

  #[test]
  fn reports_malformed_json() {
    assert!(matches!(
      AssetGraph::from_json("{\"nodes\": 1}", AssetGraphOptions::default()),
      Err(AssetGraphError::Json(_))
    ));
  }
}
