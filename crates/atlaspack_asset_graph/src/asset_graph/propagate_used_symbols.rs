use std::collections::HashSet;

use crate::content_graph::NodeId;
use crate::types::Dependency;

use super::AssetGraph;
use super::AssetGraphNode;
use super::DependencyNode;

const CHAR_STAR: &str = "*";

impl AssetGraph {
  /// Propagates the symbols an incoming dependency requests into an asset, and forwards them to
  /// the dependencies the asset re-exports from.
  ///
  /// Dependencies that end up with newly requested symbols but nothing resolved behind them are
  /// reported through `on_undeferred`, so the caller can resolve and transform them. New
  /// dependencies are always reported, since resolving them is the only way to learn whether
  /// they have side effects.
  pub fn propagate_used_symbols<F>(
    &mut self,
    asset_node_id: NodeId,
    incoming_dependency_node_id: NodeId,
    on_undeferred: &mut F,
  ) where
    F: FnMut(NodeId, &Dependency),
  {
    let mut next = vec![(asset_node_id, incoming_dependency_node_id)];

    while let Some((asset_node_id, dependency_node_id)) = next.pop() {
      let mut dependency_re_exports = HashSet::<String>::new();
      let mut dependency_wildcards = HashSet::<String>::new();
      let mut used_symbols_buf = HashSet::<String>::new();

      let requested_symbols = &self.dependency_node(dependency_node_id).used_symbols_down;
      let asset_node = self.asset_node(asset_node_id);

      if requested_symbols.contains(CHAR_STAR) {
        // A namespace request uses every export of the asset
        for symbol in asset_node.asset.symbols.iter().flatten() {
          if asset_node.used_symbols.contains(&symbol.exported) {
            continue;
          }

          used_symbols_buf.insert(symbol.exported.clone());
          if symbol.is_weak {
            dependency_re_exports.insert(symbol.local.clone());
          }
        }

        used_symbols_buf.insert(CHAR_STAR.to_string());
        dependency_wildcards.insert(CHAR_STAR.to_string());
      } else {
        for requested in requested_symbols {
          if asset_node.used_symbols.contains(requested) {
            continue;
          }

          used_symbols_buf.insert(requested.clone());

          match asset_node.asset.symbol(requested) {
            // Not exported by name, so it can only come from one of the `export *` dependencies
            None => {
              dependency_wildcards.insert(requested.clone());
            }
            Some(symbol) if symbol.is_weak => {
              dependency_re_exports.insert(symbol.local.clone());
            }
            Some(_) => {}
          }
        }
      }

      let asset_node = self.asset_node_mut(asset_node_id);
      asset_node.used_symbols.extend(used_symbols_buf);
      asset_node.used_symbols_down_dirty = false;

      for nested_dependency_node_id in self.graph.get_node_ids_connected_from(asset_node_id) {
        let DependencyNode {
          dependency,
          used_symbols_down,
          used_symbols_down_dirty,
          ..
        } = self.dependency_node_mut(nested_dependency_node_id);

        let mut updated = false;
        for symbol in dependency.symbols.iter().flatten() {
          if !symbol.is_weak {
            updated |= used_symbols_down.insert(symbol.exported.clone());
          } else if symbol.local == CHAR_STAR {
            for wildcard in &dependency_wildcards {
              updated |= used_symbols_down.insert(wildcard.clone());
            }
          } else if dependency_re_exports.contains(&symbol.local) {
            updated |= used_symbols_down.insert(symbol.exported.clone());
          }
        }

        let is_new = std::mem::replace(used_symbols_down_dirty, false);
        if !updated && !is_new {
          continue;
        }

        match self.resolved_assets(nested_dependency_node_id) {
          Some(resolved) => {
            for resolved_asset_node_id in resolved {
              if resolved_asset_node_id != asset_node_id {
                next.push((resolved_asset_node_id, nested_dependency_node_id));
              }
            }
          }
          None => {
            let dependency_node = self.dependency_node_mut(nested_dependency_node_id);
            dependency_node.deferred = false;
            on_undeferred(nested_dependency_node_id, &dependency_node.dependency);
          }
        }
      }
    }
  }

  /// Assets behind a dependency, or `None` when they are not known yet
  fn resolved_assets(&self, dependency_node_id: NodeId) -> Option<Vec<NodeId>> {
    let child = self
      .graph
      .get_node_ids_connected_from(dependency_node_id)
      .into_iter()
      .next()?;

    match self.graph.node(child) {
      AssetGraphNode::Asset(_) => Some(vec![child]),
      AssetGraphNode::AssetGroup(_) => {
        let assets = self.graph.get_node_ids_connected_from(child);
        (!assets.is_empty()).then_some(assets)
      }
      other => panic!("Dependency has an unexpected {} child", other.node_type()),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use pretty_assertions::assert_eq;

  use crate::asset_graph::node_from_asset;
  use crate::asset_graph::node_from_asset_group;
  use crate::asset_graph::node_from_dependency;
  use crate::asset_graph::AssetGraph;
  use crate::asset_graph::DependencyNode;
  use crate::content_graph::NodeId;
  use crate::test_utils::*;
  use crate::types::Asset;
  use crate::types::Dependency;
  use crate::types::Target;

  type TestSymbol<'a> = (&'a str, &'a str, bool);

  fn assert_used_symbols_down(graph: &AssetGraph, node_id: NodeId, expected: Vec<&str>) {
    assert_eq!(
      graph.dependency_node(node_id).used_symbols_down,
      expected
        .into_iter()
        .map(String::from)
        .collect::<HashSet<String>>()
    );
  }

  fn add_entry_dependency(graph: &mut AssetGraph, dependency: Dependency) -> NodeId {
    let is_library = dependency.env.is_library;
    let node_id = graph.add_node(node_from_dependency(dependency));

    if is_library {
      graph
        .dependency_node_mut(node_id)
        .used_symbols_down
        .insert(String::from("*"));
    }

    let root_node_id = graph.root_node_id();
    graph.add_edge(root_node_id, node_id);
    node_id
  }

  fn add_asset(
    graph: &mut AssetGraph,
    parent_node_id: NodeId,
    symbols: Vec<TestSymbol<'_>>,
    file_path: &str,
  ) -> (NodeId, Asset) {
    let asset = make_asset(file_path, &symbols);
    let node_id = graph.add_node(node_from_asset(asset.clone()));
    graph.add_edge(parent_node_id, node_id);
    (node_id, asset)
  }

  fn add_dependency(
    graph: &mut AssetGraph,
    parent: &(NodeId, Asset),
    specifier: &str,
    symbols: Vec<TestSymbol<'_>>,
  ) -> NodeId {
    let dependency = make_dependency(&parent.1, specifier, &symbols);
    let node_id = graph.add_node(node_from_dependency(dependency));
    graph.add_edge(parent.0, node_id);
    node_id
  }

  fn entry_graph() -> (AssetGraph, NodeId) {
    let mut graph = AssetGraph::new();
    let dependency = Dependency::entry(String::from("index.js"), Target::default());
    let entry_dependency_node_id = add_entry_dependency(&mut graph, dependency);
    (graph, entry_dependency_node_id)
  }

  #[test]
  fn requests_dependencies_of_the_entry_asset() {
    let (mut graph, entry_dependency) = entry_graph();
    let mut requested = HashSet::new();

    let index = add_asset(&mut graph, entry_dependency, vec![], "index.js");
    let dependency_a = add_dependency(&mut graph, &index, "./a.js", vec![("a", "a", false)]);

    graph.propagate_used_symbols(index.0, entry_dependency, &mut |node_id, _| {
      requested.insert(node_id);
    });

    assert_eq!(requested, HashSet::from([dependency_a]));
    assert_used_symbols_down(&graph, dependency_a, vec!["a"]);
    assert!(!graph.asset_node(index.0).used_symbols_down_dirty);
  }

  #[test]
  fn propagates_named_reexports() {
    let (mut graph, entry_dependency) = entry_graph();

    // entry.js imports "a" from library.js
    let entry = add_asset(&mut graph, entry_dependency, vec![], "entry.js");
    let library_dependency =
      add_dependency(&mut graph, &entry, "./library.js", vec![("a", "a", false)]);
    graph.propagate_used_symbols(entry.0, entry_dependency, &mut |_, _| {});

    // library.js re-exports "a" from a.js and "b" from b.js, only "a" is used
    let library = add_asset(
      &mut graph,
      library_dependency,
      vec![("a", "a", true), ("b", "b", true)],
      "library.js",
    );
    let dependency_a = add_dependency(&mut graph, &library, "./a.js", vec![("a", "a", true)]);
    let dependency_b = add_dependency(&mut graph, &library, "./b.js", vec![("b", "b", true)]);

    let mut requested = Vec::new();
    graph.propagate_used_symbols(library.0, library_dependency, &mut |node_id, _| {
      requested.push(node_id);
    });

    assert_eq!(requested, vec![dependency_a, dependency_b]);
    assert_used_symbols_down(&graph, library_dependency, vec!["a"]);
    assert_used_symbols_down(&graph, dependency_a, vec!["a"]);
    assert_used_symbols_down(&graph, dependency_b, vec![]);
    assert_eq!(
      graph.asset_node(library.0).used_symbols,
      HashSet::from([String::from("a")])
    );
  }

  #[test]
  fn propagates_wildcard_reexports() {
    let (mut graph, entry_dependency) = entry_graph();

    let entry = add_asset(&mut graph, entry_dependency, vec![], "entry.js");
    let library_dependency =
      add_dependency(&mut graph, &entry, "./library.js", vec![("a", "a", false)]);
    graph.propagate_used_symbols(entry.0, entry_dependency, &mut |_, _| {});

    // library.js has `export *` from both a.js and b.js
    let library = add_asset(&mut graph, library_dependency, vec![], "library.js");
    let dependency_a = add_dependency(&mut graph, &library, "./a.js", vec![("*", "*", true)]);
    let dependency_b = add_dependency(&mut graph, &library, "./b.js", vec![("*", "*", true)]);

    let mut requested = Vec::new();
    graph.propagate_used_symbols(library.0, library_dependency, &mut |node_id, _| {
      requested.push(node_id);
    });

    assert_eq!(requested, vec![dependency_a, dependency_b]);

    // Either wildcard could provide "a"
    assert_used_symbols_down(&graph, dependency_a, vec!["a"]);
    assert_used_symbols_down(&graph, dependency_b, vec!["a"]);
  }

  #[test]
  fn propagates_through_resolved_asset_groups() {
    let (mut graph, entry_dependency) = entry_graph();

    let entry = add_asset(&mut graph, entry_dependency, vec![], "entry.js");
    let library_dependency =
      add_dependency(&mut graph, &entry, "./library.js", vec![("a", "a", false)]);

    // library.js was already resolved and transformed behind its asset group
    let library_group = graph.add_node(node_from_asset_group(make_asset_group(
      "library.js",
      Some(false),
    )));
    graph.add_edge(library_dependency, library_group);
    let library = add_asset(&mut graph, library_group, vec![("a", "a", true)], "library.js");
    let dependency_a = add_dependency(&mut graph, &library, "./a.js", vec![("a", "a", true)]);

    let mut requested = Vec::new();
    graph.propagate_used_symbols(entry.0, entry_dependency, &mut |node_id, _| {
      requested.push(node_id);
    });

    assert_eq!(requested, vec![dependency_a]);
    assert_used_symbols_down(&graph, dependency_a, vec!["a"]);
  }

  #[test]
  fn propagates_renamed_reexports() {
    let (mut graph, entry_dependency) = entry_graph();

    let entry = add_asset(&mut graph, entry_dependency, vec![], "entry.js");
    let library_dependency =
      add_dependency(&mut graph, &entry, "./library.js", vec![("a", "a", false)]);
    graph.propagate_used_symbols(entry.0, entry_dependency, &mut |_, _| {});

    // library.js re-exports "b" from b.js as "a"
    let library = add_asset(&mut graph, library_dependency, vec![("b", "a", true)], "library.js");
    let dependency_b = add_dependency(&mut graph, &library, "./b.js", vec![("b", "b", true)]);
    graph.propagate_used_symbols(library.0, library_dependency, &mut |_, _| {});

    assert_used_symbols_down(&graph, library_dependency, vec!["a"]);
    assert_used_symbols_down(&graph, dependency_b, vec!["b"]);
  }

  #[test]
  fn propagates_namespace_reexports() {
    let (mut graph, entry_dependency) = entry_graph();

    let entry = add_asset(&mut graph, entry_dependency, vec![], "entry.js");
    let library_dependency =
      add_dependency(&mut graph, &entry, "./library.js", vec![("a", "a", false)]);
    graph.propagate_used_symbols(entry.0, entry_dependency, &mut |_, _| {});

    // export * as a from './stuff.js'
    let library = add_asset(&mut graph, library_dependency, vec![("a", "a", true)], "library.js");
    let stuff_dependency =
      add_dependency(&mut graph, &library, "./stuff.js", vec![("a", "*", true)]);
    graph.propagate_used_symbols(library.0, library_dependency, &mut |_, _| {});

    assert_used_symbols_down(&graph, library_dependency, vec!["a"]);
    assert_used_symbols_down(&graph, stuff_dependency, vec!["*"]);
  }

  #[test]
  fn library_entries_use_every_export() {
    let mut graph = AssetGraph::new();
    let target = Target {
      env: std::sync::Arc::new(crate::types::Environment {
        is_library: true,
        ..crate::types::Environment::default()
      }),
      ..Target::default()
    };
    let entry_dependency = add_entry_dependency(
      &mut graph,
      Dependency::entry(String::from("index.js"), target),
    );

    let index = add_asset(
      &mut graph,
      entry_dependency,
      vec![("x", "x", false), ("$index$y", "y", true)],
      "index.js",
    );
    let dependency_y = add_dependency(&mut graph, &index, "./y.js", vec![("$index$y", "y", true)]);

    graph.propagate_used_symbols(index.0, entry_dependency, &mut |_, _| {});

    assert_eq!(
      graph.asset_node(index.0).used_symbols,
      HashSet::from([String::from("*"), String::from("x"), String::from("y")])
    );
    assert_used_symbols_down(&graph, dependency_y, vec!["y"]);
  }

  #[test]
  fn reported_dependencies_are_no_longer_deferred() {
    let (mut graph, entry_dependency) = entry_graph();
    let index = add_asset(&mut graph, entry_dependency, vec![], "index.js");
    let dependency_a = add_dependency(&mut graph, &index, "./a.js", vec![("a", "a", false)]);
    graph.dependency_node_mut(dependency_a).deferred = true;

    graph.propagate_used_symbols(index.0, entry_dependency, &mut |_, _| {});

    let DependencyNode {
      deferred,
      used_symbols_down_dirty,
      ..
    } = graph.dependency_node(dependency_a);
    assert!(!deferred);
    assert!(!used_symbols_down_dirty);
  }
}
