use std::collections::HashSet;

use tracing::trace;

use crate::content_graph::depth_first;
use crate::content_graph::NodeId;
use crate::types::find_symbol;
use crate::types::Dependency;

use super::AssetGraph;
use super::AssetGraphNode;
use super::AssetGraphNodeType;

impl AssetGraph {
  /// Decides whether a traversal may cross the edge from `node_id` to `child_node_id`.
  ///
  /// Only dependency to asset group edges can be deferred. The decision is recomputed every time
  /// the edge is crossed until the group has been visited once, and the `has_deferred` flags of
  /// the ancestors are kept in sync with it.
  pub fn should_visit_child(&mut self, node_id: NodeId, child_node_id: NodeId) -> bool {
    if !self.options.defer_unused_dependencies {
      return true;
    }

    let (AssetGraphNode::Dependency(dependency_node), AssetGraphNode::AssetGroup(asset_group_node)) =
      (self.graph.node(node_id), self.graph.node(child_node_id))
    else {
      return true;
    };

    if asset_group_node.deferred == Some(false) {
      return true;
    }

    let previously_deferred = asset_group_node.deferred.unwrap_or(false);
    let defer = self.should_defer_dependency(
      &dependency_node.dependency,
      asset_group_node.asset_group.side_effects,
      asset_group_node.asset_group.can_defer,
    );

    self.dependency_node_mut(node_id).has_deferred = defer;
    self.asset_group_node_mut(child_node_id).deferred = Some(defer);

    if !previously_deferred && defer {
      trace!(
        dependency = node_id.index(),
        asset_group = child_node_id.index(),
        "Deferring asset group"
      );
      self.mark_parents_with_has_deferred(node_id);
    } else if previously_deferred && !defer {
      trace!(
        dependency = node_id.index(),
        asset_group = child_node_id.index(),
        "Asset group is no longer deferred"
      );
      self.unmark_parents_with_has_deferred(child_node_id);
    }

    !defer
  }

  /// Whether nothing reachable through `dependency` is used, so resolving it can wait.
  ///
  /// Requires every symbol of the dependency to be a weak re-export into an asset group without
  /// side effects. The asset owning the dependency must also not be asked for any of those
  /// symbols by its own importers.
  pub fn should_defer_dependency(
    &self,
    dependency: &Dependency,
    side_effects: Option<bool>,
    can_defer: bool,
  ) -> bool {
    let Some(dependency_symbols) = dependency.symbols.as_deref() else {
      return false;
    };

    if dependency_symbols.is_empty()
      || !dependency_symbols.iter().all(|symbol| symbol.is_weak)
      || side_effects != Some(false)
      || !can_defer
      || dependency.has_symbol("*")
    {
      return false;
    }

    let dependency_node_id = self.graph.get_node_id_by_content_key(&dependency.id());
    let parents = self.graph.get_node_ids_connected_to(dependency_node_id);
    if parents.len() != 1 {
      panic!(
        "Expected dependency {} to belong to exactly one asset, found {} parents",
        dependency.specifier,
        parents.len()
      );
    }

    let resolved_asset = &self.asset_node(parents[0]).asset;
    let locals: HashSet<&str> = dependency_symbols
      .iter()
      .map(|symbol| symbol.local.as_str())
      .collect();

    self
      .get_incoming_dependencies(resolved_asset)
      .into_iter()
      .all(|incoming| {
        let Some(incoming_symbols) = incoming.symbols.as_deref() else {
          return false;
        };

        if (incoming.env.is_library && incoming.is_entry) || incoming.has_symbol("*") {
          return false;
        }

        // An asset without symbols can't tell which import ends up in this dependency
        !incoming_symbols.iter().any(|symbol| {
          let Some(asset_symbols) = resolved_asset.symbols.as_deref() else {
            return true;
          };

          find_symbol(asset_symbols, &symbol.exported)
            .is_some_and(|asset_symbol| locals.contains(asset_symbol.local.as_str()))
        })
      })
  }

  /// Flags the assets between a newly deferred dependency and the closest asset groups above it
  pub(super) fn mark_parents_with_has_deferred(&mut self, node_id: NodeId) {
    let mut marked = Vec::new();

    self
      .graph
      .traverse_ancestors::<(), _>(node_id, |traversed, _, actions| {
        match self.graph.node(traversed).node_type() {
          AssetGraphNodeType::Asset => marked.push(traversed),
          AssetGraphNodeType::AssetGroup => {
            marked.push(traversed);
            actions.skip_children();
          }
          _ if traversed != node_id => actions.skip_children(),
          _ => {}
        }

        None
      });

    for traversed in marked {
      match self.graph.node_mut(traversed) {
        AssetGraphNode::Asset(node) => node.has_deferred = true,
        AssetGraphNode::AssetGroup(node) => node.has_deferred = true,
        _ => {}
      }
    }
  }

  /// Recomputes `has_deferred` above an asset group that is no longer deferred.
  ///
  /// Assets keep the flag only while one of their dependencies still has a deferred group. The
  /// result travels up as context so the asset group above can drop its flag as well.
  pub(super) fn unmark_parents_with_has_deferred(&mut self, node_id: NodeId) {
    depth_first(
      self,
      node_id,
      |asset_graph, traversed| asset_graph.graph.get_node_ids_connected_to(traversed),
      |_, _, _| true,
      |asset_graph, traversed, context: Option<&bool>, actions| {
        match asset_graph.graph.node(traversed).node_type() {
          AssetGraphNodeType::Asset => {
            let has_deferred = asset_graph
              .graph
              .get_node_ids_connected_from(traversed)
              .into_iter()
              .any(|child| asset_graph.graph.node(child).has_deferred());

            if !has_deferred {
              asset_graph.asset_node_mut(traversed).has_deferred = false;
            }

            Some(has_deferred)
          }
          AssetGraphNodeType::AssetGroup if traversed != node_id => {
            if context != Some(&true) {
              asset_graph.asset_group_node_mut(traversed).has_deferred = false;
            }

            actions.skip_children();
            None
          }
          AssetGraphNodeType::Dependency => {
            asset_graph.dependency_node_mut(traversed).has_deferred = false;
            None
          }
          _ if traversed != node_id => {
            actions.skip_children();
            None
          }
          _ => None,
        }
      },
    );
  }
}
