use std::collections::HashMap;
use std::collections::HashSet;

use petgraph::stable_graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::Dfs;
use petgraph::visit::Reversed;
use petgraph::Direction;

use super::depth_first;
use super::TraversalActions;

pub type NodeId = NodeIndex;

/// A node that can be registered more than once under the same content key.
pub trait ContentNode {
  /// Folds a node registered under an existing content key into the node already in the graph.
  ///
  /// Bookkeeping attached to `self` must survive the merge.
  fn merge(&mut self, incoming: Self);
}

/// A directed graph where every node is also indexed by a stable content key.
///
/// Registering a content key that is already present merges into the existing node instead of
/// creating a new one, which makes node registration idempotent.
#[derive(Clone, Debug)]
pub struct ContentGraph<N> {
  pub(super) graph: StableDiGraph<N, ()>,
  pub(super) content_key_to_node_id: HashMap<String, NodeId>,
  pub(super) node_id_to_content_key: HashMap<NodeId, String>,
  pub(super) root_node_id: Option<NodeId>,
}

impl<N> Default for ContentGraph<N> {
  fn default() -> Self {
    ContentGraph {
      graph: StableDiGraph::new(),
      content_key_to_node_id: HashMap::new(),
      node_id_to_content_key: HashMap::new(),
      root_node_id: None,
    }
  }
}

impl<N: ContentNode> ContentGraph<N> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn root_node_id(&self) -> Option<NodeId> {
    self.root_node_id
  }

  pub fn set_root_node_id(&mut self, node_id: NodeId) {
    self.assert_has_node(node_id);
    self.root_node_id = Some(node_id);
  }

  pub fn add_node_by_content_key(&mut self, content_key: impl Into<String>, node: N) -> NodeId {
    let content_key = content_key.into();

    if let Some(&node_id) = self.content_key_to_node_id.get(&content_key) {
      self.node_mut(node_id).merge(node);
      return node_id;
    }

    let node_id = self.graph.add_node(node);
    self
      .content_key_to_node_id
      .insert(content_key.clone(), node_id);
    self.node_id_to_content_key.insert(node_id, content_key);

    node_id
  }

  pub fn has_node(&self, node_id: NodeId) -> bool {
    self.graph.contains_node(node_id)
  }

  pub fn has_content_key(&self, content_key: &str) -> bool {
    self.content_key_to_node_id.contains_key(content_key)
  }

  /// Looks up a content key that may legitimately be absent
  pub fn get_node_id_for_content_key(&self, content_key: &str) -> Option<NodeId> {
    self.content_key_to_node_id.get(content_key).copied()
  }

  pub fn get_node_id_by_content_key(&self, content_key: &str) -> NodeId {
    self
      .get_node_id_for_content_key(content_key)
      .unwrap_or_else(|| panic!("Graph has no node with content key {content_key}"))
  }

  pub fn get_node_by_content_key(&self, content_key: &str) -> Option<&N> {
    self
      .get_node_id_for_content_key(content_key)
      .and_then(|node_id| self.get_node(node_id))
  }

  pub fn get_node(&self, node_id: NodeId) -> Option<&N> {
    self.graph.node_weight(node_id)
  }

  pub fn node(&self, node_id: NodeId) -> &N {
    self
      .graph
      .node_weight(node_id)
      .unwrap_or_else(|| panic!("Graph has no node {}", node_id.index()))
  }

  pub fn node_mut(&mut self, node_id: NodeId) -> &mut N {
    self
      .graph
      .node_weight_mut(node_id)
      .unwrap_or_else(|| panic!("Graph has no node {}", node_id.index()))
  }

  pub fn content_key(&self, node_id: NodeId) -> &str {
    self
      .node_id_to_content_key
      .get(&node_id)
      .unwrap_or_else(|| panic!("Graph has no node {}", node_id.index()))
  }

  pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
    self.graph.node_indices()
  }

  pub fn node_count(&self) -> usize {
    self.graph.node_count()
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  /// Adds an edge unless one already connects the two nodes
  pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
    self.assert_has_node(from);
    self.assert_has_node(to);

    if self.has_edge(from, to) {
      return false;
    }

    self.graph.add_edge(from, to, ());
    true
  }

  pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
    self.graph.find_edge(from, to).is_some()
  }

  /// Children of a node, in the order their edges were added
  pub fn get_node_ids_connected_from(&self, node_id: NodeId) -> Vec<NodeId> {
    self.neighbors(node_id, Direction::Outgoing)
  }

  /// Parents of a node, in the order their edges were added
  pub fn get_node_ids_connected_to(&self, node_id: NodeId) -> Vec<NodeId> {
    self.neighbors(node_id, Direction::Incoming)
  }

  fn neighbors(&self, node_id: NodeId, direction: Direction) -> Vec<NodeId> {
    self.assert_has_node(node_id);

    // petgraph yields the most recently added edge first
    let mut neighbors: Vec<NodeId> = self
      .graph
      .neighbors_directed(node_id, direction)
      .collect();
    neighbors.reverse();
    neighbors
  }

  /// Whether the node can no longer be reached from the root.
  ///
  /// Without a root, a node is orphaned when nothing points at it.
  pub fn is_orphaned_node(&self, node_id: NodeId) -> bool {
    self.assert_has_node(node_id);

    let Some(root_node_id) = self.root_node_id else {
      return self
        .graph
        .neighbors_directed(node_id, Direction::Incoming)
        .next()
        .is_none();
    };

    let ancestors = Reversed(&self.graph);
    let mut dfs = Dfs::new(ancestors, node_id);
    while let Some(ancestor) = dfs.next(ancestors) {
      if ancestor == root_node_id {
        return false;
      }
    }

    true
  }

  /// Removes a node and every descendant that is orphaned as a result.
  ///
  /// `on_remove` runs for each removed node while it is still linked.
  pub fn remove_node<F>(&mut self, node_id: NodeId, on_remove: &mut F)
  where
    F: FnMut(&mut Self, NodeId),
  {
    self.assert_has_node(node_id);

    let mut queue = vec![node_id];
    while let Some(node_id) = queue.pop() {
      if !self.has_node(node_id) {
        continue;
      }

      on_remove(self, node_id);

      let children = self.get_node_ids_connected_from(node_id);
      self.graph.remove_node(node_id);
      if let Some(content_key) = self.node_id_to_content_key.remove(&node_id) {
        self.content_key_to_node_id.remove(&content_key);
      }

      if self.root_node_id == Some(node_id) {
        self.root_node_id = None;
      }

      for child in children.into_iter().rev() {
        if self.has_node(child) && self.is_orphaned_node(child) {
          queue.push(child);
        }
      }
    }
  }

  /// Removes the edge between two nodes, removing the child if it becomes orphaned
  pub fn remove_edge<F>(&mut self, from: NodeId, to: NodeId, on_remove: &mut F)
  where
    F: FnMut(&mut Self, NodeId),
  {
    let Some(edge) = self.graph.find_edge(from, to) else {
      return;
    };

    self.graph.remove_edge(edge);

    if self.is_orphaned_node(to) {
      self.remove_node(to, on_remove);
    }
  }

  /// Makes `to_node_ids` the children of `from`.
  ///
  /// Children present before and after keep their edge. New children are linked in the given
  /// order, then stale children are unlinked, and removed when nothing else reaches them.
  pub fn replace_node_ids_connected_to<F>(
    &mut self,
    from: NodeId,
    to_node_ids: &[NodeId],
    on_remove: &mut F,
  ) where
    F: FnMut(&mut Self, NodeId),
  {
    self.assert_has_node(from);
    for to in to_node_ids {
      self.assert_has_node(*to);
    }

    let current = self.get_node_ids_connected_from(from);
    let next: HashSet<NodeId> = to_node_ids.iter().copied().collect();

    for to in to_node_ids {
      self.add_edge(from, *to);
    }

    for child in current {
      if !next.contains(&child) && self.has_node(child) {
        self.remove_edge(from, child, on_remove);
      }
    }
  }

  /// Pre-order traversal over children, starting at `start` or the root
  pub fn traverse<F>(&self, start: Option<NodeId>, mut visit: F)
  where
    F: FnMut(NodeId, &mut TraversalActions),
  {
    let start = self.traversal_start(start);
    let mut graph = self;

    depth_first::<_, ()>(
      &mut graph,
      start,
      |graph, node_id| graph.get_node_ids_connected_from(node_id),
      |_, _, _| true,
      |_, node_id, _, actions| {
        visit(node_id, actions);
        None
      },
    );
  }

  /// Walks from `start` towards the root, threading a context from each node to its parents
  pub fn traverse_ancestors<C, F>(&self, start: NodeId, visit: F) -> Option<C>
  where
    C: Clone,
    F: FnMut(NodeId, Option<&C>, &mut TraversalActions) -> Option<C>,
  {
    self.assert_has_node(start);
    let mut graph = self;
    let mut visit = visit;

    depth_first(
      &mut graph,
      start,
      |graph, node_id| graph.get_node_ids_connected_to(node_id),
      |_, _, _| true,
      |_, node_id, context, actions| visit(node_id, context, actions),
    )
  }

  pub fn traversal_start(&self, start: Option<NodeId>) -> NodeId {
    let start = start
      .or(self.root_node_id)
      .unwrap_or_else(|| panic!("A starting node is required to traverse a graph without a root"));
    self.assert_has_node(start);
    start
  }

  fn assert_has_node(&self, node_id: NodeId) {
    if !self.has_node(node_id) {
      panic!("Graph has no node {}", node_id.index());
    }
  }
}
