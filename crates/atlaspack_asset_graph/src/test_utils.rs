use std::path::PathBuf;
use std::sync::Arc;

use crate::asset_graph::asset_group_content_key;
use crate::asset_graph::AssetGraph;
use crate::asset_graph::AssetGraphNode;
use crate::asset_graph::RootConnections;
use crate::content_graph::NodeId;
use crate::hash::hash_string;
use crate::options::AssetGraphOptions;
use crate::types::create_asset_id;
use crate::types::Asset;
use crate::types::AssetGroup;
use crate::types::CreateAssetIdParams;
use crate::types::Dependency;
use crate::types::Entry;
use crate::types::Environment;
use crate::types::FileType;
use crate::types::Symbol;
use crate::types::Target;

/// Symbols as `(local, exported, is_weak)`
pub(crate) fn make_symbols(symbols: &[(&str, &str, bool)]) -> Vec<Symbol> {
  symbols
    .iter()
    .map(|(local, exported, is_weak)| Symbol::new(*local, *exported, *is_weak))
    .collect()
}

pub(crate) fn make_asset(file_path: &str, symbols: &[(&str, &str, bool)]) -> Asset {
  let env = Arc::new(Environment::default());
  let file_type = FileType::from_extension(
    file_path
      .rsplit_once('.')
      .map(|(_, extension)| extension)
      .unwrap_or_default(),
  );

  let id = create_asset_id(CreateAssetIdParams {
    code: None,
    environment_id: &env.id(),
    file_path,
    file_type: &file_type,
    pipeline: None,
    query: None,
    unique_key: None,
  });

  Asset {
    id,
    env,
    file_path: PathBuf::from(file_path),
    file_type,
    output_hash: Some(hash_string(file_path)),
    symbols: Some(make_symbols(symbols)),
    ..Asset::default()
  }
}

pub(crate) fn make_dependency(
  source: &Asset,
  specifier: &str,
  symbols: &[(&str, &str, bool)],
) -> Dependency {
  Dependency {
    source_asset_id: Some(source.id.clone()),
    source_path: Some(source.file_path.clone()),
    symbols: Some(make_symbols(symbols)),
    ..Dependency::new(specifier.to_string(), source.env.clone())
  }
}

pub(crate) fn make_asset_group(file_path: &str, side_effects: Option<bool>) -> AssetGroup {
  AssetGroup {
    file_path: PathBuf::from(file_path),
    side_effects,
    ..AssetGroup::default()
  }
}

/// Resolves `asset` as the only entry of the graph, from the entry specifier down to the asset
pub(crate) fn resolve_entry_asset(graph: &mut AssetGraph, asset: Asset) -> NodeId {
  let file_path = asset.file_path.to_string_lossy().into_owned();
  let entry = Entry {
    file_path: asset.file_path.clone(),
    ..Entry::default()
  };

  graph.set_root_connections(RootConnections::Entries(vec![file_path.clone()]));
  graph.resolve_entry(&file_path, vec![entry.clone()], "entry_request");
  graph.resolve_targets(&entry, vec![Target::default()], "target_request");

  let entry_dependency = Dependency::entry(file_path.clone(), Target::default());
  let asset_group = make_asset_group(&file_path, None);
  graph.resolve_dependency(&entry_dependency, Some(asset_group.clone()), "path_request");

  let asset_id = asset.id.clone();
  graph.resolve_asset_group(asset_group, vec![asset], "asset_request");

  node_id(graph, &asset_id)
}

/// Builds `entry -> asset -> dependency -> group` and returns the ids of the last three
pub(crate) fn connect_dependency(
  graph: &mut AssetGraph,
  mut asset: Asset,
  dependency: Dependency,
  asset_group: AssetGroup,
) -> (NodeId, NodeId, NodeId) {
  asset.add_dependency(dependency.clone());
  let asset_node_id = resolve_entry_asset(graph, asset);

  graph.resolve_dependency(&dependency, Some(asset_group.clone()), "path_request");

  (
    asset_node_id,
    node_id(graph, &dependency.id()),
    node_id(graph, &asset_group_content_key(&asset_group)),
  )
}

pub(crate) fn node_id(graph: &AssetGraph, content_key: &str) -> NodeId {
  graph
    .get_node_id_for_content_key(content_key)
    .unwrap_or_else(|| panic!("Missing node {content_key}"))
}

/// `index.js` imports `a` from `library.js`, which re-exports `a` from `a.js` and `b` from `b.js`.
///
/// `b.js` is never transformed, so its group stays a leaf.
pub(crate) struct ReexportFixture {
  pub graph: AssetGraph,
  pub index: Asset,
  pub index_asset: NodeId,
  pub library_group: NodeId,
  pub library_asset: NodeId,
  pub library_to_b: NodeId,
  pub a_group: NodeId,
  pub b_group: NodeId,
}

impl ReexportFixture {
  pub fn new(options: AssetGraphOptions) -> Self {
    let mut graph = AssetGraph::with_options(options);

    let mut index = make_asset("index.js", &[]);
    let index_to_library = make_dependency(&index, "./library.js", &[("a", "a", false)]);
    index.add_dependency(index_to_library.clone());

    let mut library = make_asset(
      "library.js",
      &[("$library$a", "a", true), ("$library$b", "b", true)],
    );
    let library_to_a = make_dependency(&library, "./a.js", &[("$library$a", "a", true)]);
    let library_to_b = make_dependency(&library, "./b.js", &[("$library$b", "b", true)]);
    library.add_dependency(library_to_a.clone());
    library.add_dependency(library_to_b.clone());

    let a = make_asset("a.js", &[("a", "a", false)]);

    let index_asset = resolve_entry_asset(&mut graph, index.clone());

    let library_group = make_asset_group("library.js", Some(false));
    graph.resolve_dependency(&index_to_library, Some(library_group.clone()), "library");
    graph.resolve_asset_group(library_group.clone(), vec![library.clone()], "library");

    let a_group = make_asset_group("a.js", Some(false));
    graph.resolve_dependency(&library_to_a, Some(a_group.clone()), "a");
    graph.resolve_asset_group(a_group.clone(), vec![a], "a");

    let b_group = make_asset_group("b.js", Some(false));
    graph.resolve_dependency(&library_to_b, Some(b_group.clone()), "b");

    ReexportFixture {
      index_asset,
      library_group: node_id(&graph, &asset_group_content_key(&library_group)),
      library_asset: node_id(&graph, &library.id),
      library_to_b: node_id(&graph, &library_to_b.id()),
      a_group: node_id(&graph, &asset_group_content_key(&a_group)),
      b_group: node_id(&graph, &asset_group_content_key(&b_group)),
      index,
      graph,
    }
  }

  /// File paths of the asset groups a deferral aware traversal reaches, in visit order
  pub fn visited_files(&mut self) -> Vec<String> {
    let mut visited = Vec::new();

    self.graph.traverse(None, |_, node, _| {
      if let AssetGraphNode::AssetGroup(node) = node {
        visited.push(node.asset_group.file_path.to_string_lossy().into_owned());
      }
    });

    visited
  }

  /// Re-transforms `index.js` so that it also imports `b` from `library.js`
  pub fn request_b_from_index(&mut self) {
    let mut index = self.index.clone();
    let index_to_library = make_dependency(
      &index,
      "./library.js",
      &[("a", "a", false), ("b", "b", false)],
    );
    index.add_dependency(index_to_library);

    self.graph.resolve_asset_group(
      make_asset_group("index.js", None),
      vec![index.clone()],
      "asset_request",
    );
    self.index = index;
  }
}
