use std::collections::HashMap;
use std::collections::HashSet;
use std::hash::Hash;
use std::hash::Hasher;

use tracing::debug;

use crate::content_graph::NodeId;
use crate::hash::IdentifierHasher;
use crate::hash::StringHasher;
use crate::types::Asset;
use crate::types::Target;

use super::AssetGraph;
use super::AssetGraphNode;

impl AssetGraph {
  /// Digest of the output hashes of every reachable asset and the targets of every dependency.
  ///
  /// Deferred asset groups are not crossed, so nothing behind them contributes. Nodes are fed in
  /// traversal order, which follows edge insertion order. Two equivalent graphs built in a
  /// different order can hash differently.
  pub fn get_hash(&mut self) -> String {
    if let Some(hash) = &self.hash {
      return hash.clone();
    }

    let mut hasher = StringHasher::new();

    self.traverse(None, |_, node, _| match node {
      AssetGraphNode::Asset(node) => {
        let output_hash = node
          .asset
          .output_hash
          .as_deref()
          .unwrap_or_else(|| panic!("Asset {} has no output hash", node.asset.id));

        hasher.write_string(output_hash);
      }
      AssetGraphNode::Dependency(node) => {
        if let Some(target) = &node.dependency.target {
          hasher.write_string(&target_fingerprint(target));
        }
      }
      _ => {}
    });

    let hash = hasher.finish();
    self.hash = Some(hash.clone());
    hash
  }

  /// The hash computed by the last [`AssetGraph::get_hash`] call, unless the graph changed since
  pub fn cached_hash(&self) -> Option<&str> {
    self.hash.as_deref()
  }

  /// Copies the region around `changed_assets` that is new compared to `previous`.
  ///
  /// Walks parents and children of every changed asset. Nodes that already existed in `previous`
  /// are copied as the boundary of the region but not walked past. Changed assets that are not in
  /// this graph are ignored.
  pub fn get_changed_subgraph(&self, previous: &AssetGraph, changed_assets: &[Asset]) -> AssetGraph {
    let mut subgraph = AssetGraph::with_options(self.options.clone());
    let mut copied: HashMap<NodeId, NodeId> = HashMap::new();
    let mut expanded: HashSet<NodeId> = HashSet::new();

    let mut copy_node = |subgraph: &mut AssetGraph, node_id: NodeId| -> NodeId {
      *copied
        .entry(node_id)
        .or_insert_with(|| subgraph.add_node(self.graph.node(node_id).clone()))
    };

    for asset in changed_assets {
      let Some(start) = self.graph.get_node_id_for_content_key(&asset.id) else {
        continue;
      };

      copy_node(&mut subgraph, start);

      let mut queue = vec![start];
      while let Some(node_id) = queue.pop() {
        if !expanded.insert(node_id) {
          continue;
        }

        let from = copy_node(&mut subgraph, node_id);

        for child in self.graph.get_node_ids_connected_from(node_id) {
          let to = copy_node(&mut subgraph, child);
          subgraph.add_edge(from, to);

          if !previous.graph.has_content_key(self.graph.content_key(child)) {
            queue.push(child);
          }
        }

        for parent in self.graph.get_node_ids_connected_to(node_id) {
          let to = copy_node(&mut subgraph, parent);
          subgraph.add_edge(to, from);

          if !previous.graph.has_content_key(self.graph.content_key(parent)) {
            queue.push(parent);
          }
        }
      }
    }

    debug!(
      changed_assets = changed_assets.len(),
      nodes = subgraph.node_count(),
      "Computed changed subgraph"
    );

    subgraph
  }
}

fn target_fingerprint(target: &Target) -> String {
  let mut hasher = IdentifierHasher::new();
  target.hash(&mut hasher);
  format!("{:016x}", hasher.finish())
}
