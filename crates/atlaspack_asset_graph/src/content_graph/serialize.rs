use std::collections::HashMap;

use petgraph::stable_graph::StableDiGraph;
use serde::Deserialize;
use serde::Serialize;

use crate::error::AssetGraphError;

use super::ContentGraph;
use super::ContentNode;
use super::NodeId;

/// Flat representation of a [`ContentGraph`].
///
/// Node ids are compacted into positions of `nodes`. Edges are listed per source node in the
/// order they were added, so restoring them reproduces the same traversal order.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedContentGraph<N> {
  pub nodes: Vec<SerializedNode<N>>,
  pub edges: Vec<(u32, u32)>,
  pub root_node_id: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode<N> {
  pub content_key: String,
  pub node: N,
}

impl<N: ContentNode + Clone> ContentGraph<N> {
  pub fn serialize(&self) -> SerializedContentGraph<N> {
    let node_ids: Vec<NodeId> = self.node_ids().collect();
    let positions: HashMap<NodeId, u32> = node_ids
      .iter()
      .enumerate()
      .map(|(position, node_id)| (*node_id, position as u32))
      .collect();

    let mut nodes = Vec::with_capacity(node_ids.len());
    let mut edges = Vec::with_capacity(self.edge_count());

    for node_id in &node_ids {
      nodes.push(SerializedNode {
        content_key: self.content_key(*node_id).to_string(),
        node: self.node(*node_id).clone(),
      });

      for child in self.get_node_ids_connected_from(*node_id) {
        edges.push((positions[node_id], positions[&child]));
      }
    }

    SerializedContentGraph {
      nodes,
      edges,
      root_node_id: self.root_node_id.map(|root| positions[&root]),
    }
  }
}

impl<N: ContentNode> ContentGraph<N> {
  pub fn from_serialized(serialized: SerializedContentGraph<N>) -> Result<Self, AssetGraphError> {
    let SerializedContentGraph {
      nodes,
      edges,
      root_node_id,
    } = serialized;

    let node_count = nodes.len();
    let mut graph = StableDiGraph::with_capacity(node_count, edges.len());
    let mut content_key_to_node_id = HashMap::with_capacity(node_count);
    let mut node_id_to_content_key = HashMap::with_capacity(node_count);
    let mut node_ids = Vec::with_capacity(node_count);

    for SerializedNode { content_key, node } in nodes {
      let node_id = graph.add_node(node);
      if content_key_to_node_id
        .insert(content_key.clone(), node_id)
        .is_some()
      {
        return Err(AssetGraphError::DuplicateContentKey(content_key));
      }
      node_id_to_content_key.insert(node_id, content_key);
      node_ids.push(node_id);
    }

    for (from, to) in edges {
      let (Some(from_id), Some(to_id)) = (node_ids.get(from as usize), node_ids.get(to as usize))
      else {
        return Err(AssetGraphError::DanglingEdge {
          from,
          to,
          node_count,
        });
      };

      graph.add_edge(*from_id, *to_id, ());
    }

    let root_node_id = match root_node_id {
      Some(root) => Some(*node_ids.get(root as usize).ok_or(AssetGraphError::MissingRoot)?),
      None => None,
    };

    Ok(ContentGraph {
      graph,
      content_key_to_node_id,
      node_id_to_content_key,
      root_node_id,
    })
  }
}
