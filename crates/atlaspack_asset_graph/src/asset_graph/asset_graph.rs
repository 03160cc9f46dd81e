use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use crate::content_graph::ContentGraph;
use crate::content_graph::NodeId;
use crate::content_graph::TraversalActions;
use crate::options::AssetGraphOptions;
use crate::types::Asset;
use crate::types::AssetGroup;
use crate::types::Dependency;
use crate::types::Entry;
use crate::types::Environment;
use crate::types::Target;

use super::asset_group_content_key;
use super::entry_specifier_content_key;
use super::node_from_asset;
use super::node_from_asset_group;
use super::node_from_entry_file;
use super::node_from_entry_specifier;
use super::AssetGraphNode;
use super::AssetGroupNode;
use super::AssetNode;
use super::DependencyNode;
use super::EnvironmentCache;
use super::ROOT_CONTENT_KEY;

/// Observer called with the id of every node right before it leaves the graph
pub type OnNodeRemoved = Box<dyn FnMut(NodeId) + Send>;

/// What the root of a fresh graph connects to
#[derive(Clone, Debug)]
pub enum RootConnections {
  /// Entry specifiers that still need to be resolved to files
  Entries(Vec<String>),
  /// Asset groups that are already known, skipping entry and target resolution
  AssetGroups(Vec<AssetGroup>),
}

/// The graph of entries, dependencies, asset groups and assets discovered during a build.
///
/// Each resolution method corresponds to one external request completing, and only rewires the
/// part of the graph that request owns.
pub struct AssetGraph {
  pub(super) graph: ContentGraph<AssetGraphNode>,
  pub(super) hash: Option<String>,
  pub(super) env_cache: EnvironmentCache,
  pub(super) on_node_removed: Option<OnNodeRemoved>,
  pub(super) options: AssetGraphOptions,
}

impl std::fmt::Debug for AssetGraph {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AssetGraph")
      .field("graph", &self.graph)
      .field("hash", &self.hash)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

impl Default for AssetGraph {
  fn default() -> Self {
    Self::new()
  }
}

impl AssetGraph {
  pub fn new() -> Self {
    Self::with_options(AssetGraphOptions::default())
  }

  pub fn with_options(options: AssetGraphOptions) -> Self {
    let mut graph = ContentGraph::new();
    let root_node_id = graph.add_node_by_content_key(ROOT_CONTENT_KEY, AssetGraphNode::Root);
    graph.set_root_node_id(root_node_id);

    AssetGraph {
      graph,
      hash: None,
      env_cache: EnvironmentCache::new(),
      on_node_removed: None,
      options,
    }
  }

  pub fn options(&self) -> &AssetGraphOptions {
    &self.options
  }

  /// Read access to the underlying content graph
  pub fn graph(&self) -> &ContentGraph<AssetGraphNode> {
    &self.graph
  }

  pub fn env_cache(&self) -> &EnvironmentCache {
    &self.env_cache
  }

  pub fn set_on_node_removed(&mut self, on_node_removed: impl FnMut(NodeId) + Send + 'static) {
    self.on_node_removed = Some(Box::new(on_node_removed));
  }

  pub fn root_node_id(&self) -> NodeId {
    self
      .graph
      .root_node_id()
      .unwrap_or_else(|| panic!("Asset graph has no root node"))
  }

  pub fn get_node(&self, node_id: NodeId) -> Option<&AssetGraphNode> {
    self.graph.get_node(node_id)
  }

  pub fn get_node_id_for_content_key(&self, content_key: &str) -> Option<NodeId> {
    self.graph.get_node_id_for_content_key(content_key)
  }

  pub fn node_count(&self) -> usize {
    self.graph.node_count()
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  pub fn get_node_ids_connected_from(&self, node_id: NodeId) -> Vec<NodeId> {
    self.graph.get_node_ids_connected_from(node_id)
  }

  pub fn get_node_ids_connected_to(&self, node_id: NodeId) -> Vec<NodeId> {
    self.graph.get_node_ids_connected_to(node_id)
  }

  pub fn dependency_node(&self, node_id: NodeId) -> &DependencyNode {
    match self.graph.node(node_id) {
      AssetGraphNode::Dependency(node) => node,
      other => panic!(
        "Expected node {} to be a dependency, found {}",
        node_id.index(),
        other.node_type()
      ),
    }
  }

  pub fn dependency_node_mut(&mut self, node_id: NodeId) -> &mut DependencyNode {
    match self.graph.node_mut(node_id) {
      AssetGraphNode::Dependency(node) => node,
      other => panic!(
        "Expected node {} to be a dependency, found {}",
        node_id.index(),
        other.node_type()
      ),
    }
  }

  pub fn asset_group_node(&self, node_id: NodeId) -> &AssetGroupNode {
    match self.graph.node(node_id) {
      AssetGraphNode::AssetGroup(node) => node,
      other => panic!(
        "Expected node {} to be an asset group, found {}",
        node_id.index(),
        other.node_type()
      ),
    }
  }

  pub fn asset_group_node_mut(&mut self, node_id: NodeId) -> &mut AssetGroupNode {
    match self.graph.node_mut(node_id) {
      AssetGraphNode::AssetGroup(node) => node,
      other => panic!(
        "Expected node {} to be an asset group, found {}",
        node_id.index(),
        other.node_type()
      ),
    }
  }

  pub fn asset_node(&self, node_id: NodeId) -> &AssetNode {
    match self.graph.node(node_id) {
      AssetGraphNode::Asset(node) => node,
      other => panic!(
        "Expected node {} to be an asset, found {}",
        node_id.index(),
        other.node_type()
      ),
    }
  }

  pub fn asset_node_mut(&mut self, node_id: NodeId) -> &mut AssetNode {
    match self.graph.node_mut(node_id) {
      AssetGraphNode::Asset(node) => node,
      other => panic!(
        "Expected node {} to be an asset, found {}",
        node_id.index(),
        other.node_type()
      ),
    }
  }

  /// Registers a node, merging it into the existing node with the same content key
  pub fn add_node(&mut self, node: AssetGraphNode) -> NodeId {
    self.hash = None;
    let content_key = node.content_key();
    self.graph.add_node_by_content_key(content_key, node)
  }

  pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
    self.hash = None;
    self.graph.add_edge(from, to)
  }

  /// Removes a node along with every descendant that is no longer reachable from the root
  pub fn remove_node(&mut self, node_id: NodeId) {
    self.hash = None;

    let AssetGraph {
      graph,
      on_node_removed,
      ..
    } = self;

    graph.remove_node(
      node_id,
      &mut |graph: &mut ContentGraph<AssetGraphNode>, removed: NodeId| {
        before_node_removed(graph, on_node_removed, removed)
      },
    );
  }

  /// Removes an edge, removing the child if nothing else reaches it
  pub fn remove_edge(&mut self, from: NodeId, to: NodeId) {
    self.hash = None;

    let AssetGraph {
      graph,
      on_node_removed,
      ..
    } = self;

    graph.remove_edge(
      from,
      to,
      &mut |graph: &mut ContentGraph<AssetGraphNode>, removed: NodeId| {
        before_node_removed(graph, on_node_removed, removed)
      },
    );
  }

  /// Makes `to_node_ids` the children of `from`, leaving children present in both sets untouched
  pub fn replace_node_ids_connected_to(&mut self, from: NodeId, to_node_ids: &[NodeId]) {
    self.hash = None;

    let AssetGraph {
      graph,
      on_node_removed,
      ..
    } = self;

    graph.replace_node_ids_connected_to(
      from,
      to_node_ids,
      &mut |graph: &mut ContentGraph<AssetGraphNode>, removed: NodeId| {
        before_node_removed(graph, on_node_removed, removed)
      },
    );
  }

  pub(super) fn normalize_environment(&mut self, env: &mut Arc<Environment>) {
    if self.options.dedupe_environments {
      self.env_cache.normalize(env);
    }
  }

  pub fn set_root_connections(&mut self, connections: RootConnections) {
    let root_node_id = self.root_node_id();

    let node_ids: Vec<NodeId> = match connections {
      RootConnections::Entries(entries) => entries
        .into_iter()
        .map(|entry| self.add_node(node_from_entry_specifier(entry)))
        .collect(),
      RootConnections::AssetGroups(asset_groups) => asset_groups
        .into_iter()
        .map(|mut asset_group| {
          self.normalize_environment(&mut asset_group.env);
          self.add_node(node_from_asset_group(asset_group))
        })
        .collect(),
    };

    debug!(root_connections = node_ids.len(), "Connected asset graph root");
    self.replace_node_ids_connected_to(root_node_id, &node_ids);
  }

  /// Connects an entry specifier to the files it resolved to
  pub fn resolve_entry(
    &mut self,
    entry: &str,
    resolved: Vec<Entry>,
    corresponding_request: impl Into<String>,
  ) {
    let entry_specifier_node_id = self
      .graph
      .get_node_id_by_content_key(&entry_specifier_content_key(entry));

    match self.graph.node_mut(entry_specifier_node_id) {
      AssetGraphNode::EntrySpecifier(node) => {
        node.corresponding_request = Some(corresponding_request.into());
      }
      other => panic!("Expected an entry specifier node, found {}", other.node_type()),
    }

    let entry_file_node_ids: Vec<NodeId> = resolved
      .into_iter()
      .map(|entry| self.add_node(node_from_entry_file(entry)))
      .collect();

    debug!(
      entry,
      entry_files = entry_file_node_ids.len(),
      "Resolved entry"
    );

    self.replace_node_ids_connected_to(entry_specifier_node_id, &entry_file_node_ids);
  }

  /// Connects an entry file to one dependency per target it is built for
  pub fn resolve_targets(
    &mut self,
    entry: &Entry,
    targets: Vec<Target>,
    corresponding_request: impl Into<String>,
  ) {
    let entry_file_node_id = self
      .graph
      .get_node_id_by_content_key(&super::entry_file_content_key(entry));

    match self.graph.node_mut(entry_file_node_id) {
      AssetGraphNode::EntryFile(node) => {
        node.corresponding_request = Some(corresponding_request.into());
      }
      other => panic!("Expected an entry file node, found {}", other.node_type()),
    }

    let mut dependency_node_ids = Vec::with_capacity(targets.len());
    for target in targets {
      let mut dependency =
        Dependency::entry(entry.file_path.to_string_lossy().into_owned(), target);
      self.normalize_environment(&mut dependency.env);

      let mut node = DependencyNode::new(dependency);
      if node.dependency.env.is_library {
        node.used_symbols_down.insert(String::from("*"));
      }

      dependency_node_ids.push(self.add_node(AssetGraphNode::Dependency(node)));
    }

    debug!(
      entry = %entry.file_path.display(),
      targets = dependency_node_ids.len(),
      "Resolved targets"
    );

    self.replace_node_ids_connected_to(entry_file_node_id, &dependency_node_ids);
  }

  /// Connects a dependency to the asset group it resolved to.
  ///
  /// Dependencies that resolved to nothing, such as excluded or external imports, are left
  /// without children.
  pub fn resolve_dependency(
    &mut self,
    dependency: &Dependency,
    asset_group: Option<AssetGroup>,
    corresponding_request: impl Into<String>,
  ) {
    let dependency_node_id = self.graph.get_node_id_by_content_key(&dependency.id());
    self.dependency_node_mut(dependency_node_id).corresponding_request =
      Some(corresponding_request.into());

    let Some(mut asset_group) = asset_group else {
      debug!(specifier = %dependency.specifier, "Dependency resolved to nothing");
      return;
    };

    self.normalize_environment(&mut asset_group.env);

    let asset_group_node_id = self.add_node(node_from_asset_group(asset_group));

    debug!(
      specifier = %dependency.specifier,
      dependency = dependency_node_id.index(),
      asset_group = asset_group_node_id.index(),
      "Resolved dependency"
    );

    self.replace_node_ids_connected_to(dependency_node_id, &[asset_group_node_id]);
  }

  /// Connects an asset group to the assets its transformation produced.
  ///
  /// Assets referenced by another produced asset through their unique key are inline assets.
  /// They hang off the dependency that references them instead of the group.
  pub fn resolve_asset_group(
    &mut self,
    mut asset_group: AssetGroup,
    mut assets: Vec<Asset>,
    corresponding_request: impl Into<String>,
  ) {
    self.normalize_environment(&mut asset_group.env);
    for asset in &mut assets {
      self.normalize_environment(&mut asset.env);
      for dependency in asset.dependencies.values_mut() {
        self.normalize_environment(&mut dependency.env);
      }
    }

    let content_key = asset_group_content_key(&asset_group);
    let Some(asset_group_node_id) = self.graph.get_node_id_for_content_key(&content_key) else {
      debug!(
        file_path = %asset_group.file_path.display(),
        "Asset group is no longer in the graph"
      );
      return;
    };

    self.asset_group_node_mut(asset_group_node_id).corresponding_request =
      Some(corresponding_request.into());

    // For each produced asset, the positions of the produced assets it references inline
    let dependents: Vec<Vec<usize>> = assets
      .iter()
      .map(|asset| {
        asset
          .dependencies
          .values()
          .filter_map(|dependency| {
            assets
              .iter()
              .position(|a| a.unique_key.as_deref() == Some(dependency.specifier.as_str()))
          })
          .collect()
      })
      .collect();

    let inline: HashSet<usize> = dependents.iter().flatten().copied().collect();
    let direct: Vec<usize> = (0..assets.len())
      .filter(|index| !inline.contains(index))
      .collect();

    let direct_node_ids: Vec<NodeId> = direct
      .iter()
      .map(|index| self.add_node(node_from_asset(assets[*index].clone())))
      .collect();

    debug!(
      file_path = %asset_group.file_path.display(),
      assets = assets.len(),
      direct_assets = direct_node_ids.len(),
      "Resolved asset group"
    );

    self.replace_node_ids_connected_to(asset_group_node_id, &direct_node_ids);

    // Parents are resolved before their inline assets, which only exist once the parent has
    // wired them in
    let mut resolved = HashSet::new();
    let mut queue: VecDeque<usize> = direct.into_iter().collect();
    while let Some(index) = queue.pop_front() {
      if !resolved.insert(index) {
        continue;
      }

      let asset_node_id = self.graph.get_node_id_by_content_key(&assets[index].id);
      let dependent_assets: Vec<Asset> = dependents[index]
        .iter()
        .map(|dependent| assets[*dependent].clone())
        .collect();

      self.resolve_asset(asset_node_id, &dependent_assets);
      queue.extend(dependents[index].iter().copied());
    }

    if resolved.len() < assets.len() {
      debug!(
        unreachable = assets.len() - resolved.len(),
        "Inline assets are not referenced by any directly produced asset"
      );
    }
  }

  /// Connects an asset to its dependencies, wiring inline assets straight under the
  /// dependencies that reference them
  pub fn resolve_asset(&mut self, asset_node_id: NodeId, dependent_assets: &[Asset]) {
    let asset = &self.asset_node(asset_node_id).asset;
    let asset_type = asset.file_type.clone();
    let dependencies: Vec<Dependency> = asset.dependencies.values().cloned().collect();

    let mut dependency_node_ids = Vec::with_capacity(dependencies.len());
    let mut inline_assets = Vec::new();

    for mut dependency in dependencies {
      self.normalize_environment(&mut dependency.env);

      let content_key = dependency.id();
      dependency.source_asset_type = Some(asset_type.clone());

      let mut node = DependencyNode::new(dependency);
      let dependent_asset = dependent_assets
        .iter()
        .find(|a| a.unique_key.as_deref() == Some(node.dependency.specifier.as_str()));

      if let Some(dependent_asset) = dependent_asset {
        node.complete = true;
        inline_assets.push((content_key, dependent_asset.clone()));
      }

      dependency_node_ids.push(self.add_node(AssetGraphNode::Dependency(node)));
    }

    self.asset_node_mut(asset_node_id).used_symbols_down_dirty = true;

    trace!(
      asset = asset_node_id.index(),
      dependencies = dependency_node_ids.len(),
      inline_assets = inline_assets.len(),
      "Resolved asset"
    );

    self.replace_node_ids_connected_to(asset_node_id, &dependency_node_ids);

    for (content_key, dependent_asset) in inline_assets {
      let dependency_node_id = self.graph.get_node_id_by_content_key(&content_key);
      let dependent_asset_node_id = self.add_node(node_from_asset(dependent_asset));
      self.replace_node_ids_connected_to(dependency_node_id, &[dependent_asset_node_id]);
    }
  }

  /// Every dependency that leads to an asset, through an asset group or directly for inline assets
  pub fn get_incoming_dependencies(&self, asset: &Asset) -> Vec<&Dependency> {
    let Some(asset_node_id) = self.graph.get_node_id_for_content_key(&asset.id) else {
      return Vec::new();
    };

    let mut dependencies = Vec::new();
    for parent in self.graph.get_node_ids_connected_to(asset_node_id) {
      match self.graph.node(parent) {
        AssetGraphNode::Dependency(node) => dependencies.push(&node.dependency),
        AssetGraphNode::AssetGroup(_) => {
          for grandparent in self.graph.get_node_ids_connected_to(parent) {
            if let AssetGraphNode::Dependency(node) = self.graph.node(grandparent) {
              dependencies.push(&node.dependency);
            }
          }
        }
        _ => {}
      }
    }

    dependencies
  }

  /// Pre-order traversal that does not cross edges into deferred asset groups.
  ///
  /// Crossing a dependency edge re-evaluates whether its asset group is deferred, so the
  /// traversal needs mutable access to the graph. Visitors only observe it.
  pub fn traverse<F>(&mut self, start: Option<NodeId>, mut visit: F)
  where
    F: FnMut(NodeId, &AssetGraphNode, &mut TraversalActions),
  {
    let start = self.graph.traversal_start(start);

    crate::content_graph::depth_first::<_, ()>(
      self,
      start,
      |asset_graph, node_id| asset_graph.graph.get_node_ids_connected_from(node_id),
      |asset_graph, node_id, child_node_id| asset_graph.should_visit_child(node_id, child_node_id),
      |asset_graph, node_id, _, actions| {
        visit(node_id, asset_graph.graph.node(node_id), actions);
        None
      },
    );
  }

  /// Walks from `start` towards the root, threading a context from each node to its parents
  pub fn traverse_ancestors<C, F>(&self, start: NodeId, mut visit: F) -> Option<C>
  where
    C: Clone,
    F: FnMut(NodeId, &AssetGraphNode, Option<&C>, &mut TraversalActions) -> Option<C>,
  {
    self
      .graph
      .traverse_ancestors(start, |node_id, context, actions| {
        visit(node_id, self.graph.node(node_id), context, actions)
      })
  }

  /// Like [`AssetGraph::traverse`], but only asset nodes are reported
  pub fn traverse_assets<F>(&mut self, start: Option<NodeId>, mut visit: F)
  where
    F: FnMut(NodeId, &Asset, &mut TraversalActions),
  {
    self.traverse(start, |node_id, node, actions| {
      if let AssetGraphNode::Asset(node) = node {
        visit(node_id, &node.asset, actions);
      }
    });
  }

  /// The asset groups reached first on every path from the root, skipping deferred ones
  pub fn get_entry_asset_group_nodes(&mut self) -> Vec<&AssetGroupNode> {
    let mut node_ids = Vec::new();

    self.traverse(None, |node_id, node, actions| {
      if let AssetGraphNode::AssetGroup(_) = node {
        node_ids.push(node_id);
        actions.skip_children();
      }
    });

    let graph: &AssetGraph = self;
    node_ids
      .into_iter()
      .map(|node_id| graph.asset_group_node(node_id))
      .collect()
  }

  /// The assets reached first on every path from the root, skipping deferred asset groups
  pub fn get_entry_assets(&mut self) -> Vec<&Asset> {
    let mut node_ids = Vec::new();

    self.traverse(None, |node_id, node, actions| {
      if let AssetGraphNode::Asset(_) = node {
        node_ids.push(node_id);
        actions.skip_children();
      }
    });

    let graph: &AssetGraph = self;
    node_ids
      .into_iter()
      .map(|node_id| &graph.asset_node(node_id).asset)
      .collect()
  }
}

fn before_node_removed(
  graph: &mut ContentGraph<AssetGraphNode>,
  on_node_removed: &mut Option<OnNodeRemoved>,
  node_id: NodeId,
) {
  trace!(
    node_id = node_id.index(),
    node_type = %graph.node(node_id).node_type(),
    "Removing node"
  );

  if let Some(on_node_removed) = on_node_removed {
    on_node_removed(node_id);
  }

  // Whatever an orphaned dependency pointed at has lost a source of requested symbols
  if matches!(graph.node(node_id), AssetGraphNode::Dependency(_)) && graph.is_orphaned_node(node_id)
  {
    for child in graph.get_node_ids_connected_from(node_id) {
      match graph.node_mut(child) {
        AssetGraphNode::AssetGroup(node) => node.used_symbols_down_dirty = true,
        AssetGraphNode::Asset(node) => node.used_symbols_down_dirty = true,
        other => panic!("Dependency has an unexpected {} child", other.node_type()),
      }
    }
  }
}
