use std::collections::HashSet;
use std::hash::Hash;
use std::hash::Hasher;

use serde::Deserialize;
use serde::Serialize;

use crate::content_graph::ContentNode;
use crate::hash::hash_string;
use crate::hash::IdentifierHasher;
use crate::types::Asset;
use crate::types::AssetGroup;
use crate::types::Dependency;
use crate::types::Entry;

pub const ROOT_CONTENT_KEY: &str = "@@root";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssetGraphNodeType {
  Root,
  EntrySpecifier,
  EntryFile,
  Dependency,
  AssetGroup,
  Asset,
}

impl std::fmt::Display for AssetGraphNodeType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      AssetGraphNodeType::Root => "root",
      AssetGraphNodeType::EntrySpecifier => "entry_specifier",
      AssetGraphNodeType::EntryFile => "entry_file",
      AssetGraphNodeType::Dependency => "dependency",
      AssetGraphNodeType::AssetGroup => "asset_group",
      AssetGraphNodeType::Asset => "asset",
    };

    write!(f, "{name}")
  }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(clippy::large_enum_variant)]
pub enum AssetGraphNode {
  Root,
  EntrySpecifier(EntrySpecifierNode),
  EntryFile(EntryFileNode),
  Dependency(DependencyNode),
  AssetGroup(AssetGroupNode),
  Asset(AssetNode),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySpecifierNode {
  pub specifier: String,
  pub corresponding_request: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFileNode {
  pub entry: Entry,
  pub corresponding_request: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
  pub dependency: Dependency,
  pub corresponding_request: Option<String>,

  /// The dependency points at an inline asset produced alongside its owner
  pub complete: bool,
  pub deferred: bool,
  pub excluded: bool,

  /// The asset group behind this dependency is currently deferred
  pub has_deferred: bool,

  /// Symbols requested from the resolved asset
  pub used_symbols_down: HashSet<String>,
  /// Symbols the resolved asset was able to provide
  pub used_symbols_up: HashSet<String>,

  pub used_symbols_down_dirty: bool,
  pub used_symbols_up_dirty_down: bool,
  pub used_symbols_up_dirty_up: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetGroupNode {
  pub asset_group: AssetGroup,
  pub corresponding_request: Option<String>,

  /// `None` until a traversal has evaluated the dependency edge leading here
  pub deferred: Option<bool>,
  pub has_deferred: bool,
  pub used_symbols_down_dirty: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetNode {
  pub asset: Asset,
  pub has_deferred: bool,

  /// Exports of this asset that something in the graph requested
  pub used_symbols: HashSet<String>,
  pub used_symbols_down_dirty: bool,
  pub used_symbols_up_dirty: bool,
}

impl DependencyNode {
  pub fn new(dependency: Dependency) -> Self {
    DependencyNode {
      dependency,
      corresponding_request: None,
      complete: false,
      deferred: false,
      excluded: false,
      has_deferred: false,
      used_symbols_down: HashSet::new(),
      used_symbols_up: HashSet::new(),
      used_symbols_down_dirty: true,
      used_symbols_up_dirty_down: true,
      used_symbols_up_dirty_up: true,
    }
  }

  fn merge(&mut self, incoming: DependencyNode) {
    let meta = std::mem::take(&mut self.dependency.meta);
    self.dependency = incoming.dependency;
    if self.dependency.meta.is_empty() {
      self.dependency.meta = meta;
    }

    // Reflects the latest transformation of the owning asset
    self.complete = incoming.complete;
    self.used_symbols_down.extend(incoming.used_symbols_down);
  }
}

impl AssetGroupNode {
  pub fn new(asset_group: AssetGroup) -> Self {
    AssetGroupNode {
      asset_group,
      corresponding_request: None,
      deferred: None,
      has_deferred: false,
      used_symbols_down_dirty: true,
    }
  }

  /// A group stays deferrable only while every dependency resolving to it allows it
  fn merge(&mut self, incoming: AssetGroupNode) {
    let can_defer = self.asset_group.can_defer;
    self.asset_group = incoming.asset_group;
    self.asset_group.can_defer &= can_defer;
  }
}

impl AssetNode {
  pub fn new(asset: Asset) -> Self {
    AssetNode {
      asset,
      has_deferred: false,
      used_symbols: HashSet::new(),
      used_symbols_down_dirty: true,
      used_symbols_up_dirty: true,
    }
  }
}

pub fn node_from_dependency(dependency: Dependency) -> AssetGraphNode {
  AssetGraphNode::Dependency(DependencyNode::new(dependency))
}

pub fn node_from_asset_group(asset_group: AssetGroup) -> AssetGraphNode {
  AssetGraphNode::AssetGroup(AssetGroupNode::new(asset_group))
}

pub fn node_from_asset(asset: Asset) -> AssetGraphNode {
  AssetGraphNode::Asset(AssetNode::new(asset))
}

pub fn node_from_entry_specifier(specifier: impl Into<String>) -> AssetGraphNode {
  AssetGraphNode::EntrySpecifier(EntrySpecifierNode {
    specifier: specifier.into(),
    corresponding_request: None,
  })
}

pub fn node_from_entry_file(entry: Entry) -> AssetGraphNode {
  AssetGraphNode::EntryFile(EntryFileNode {
    entry,
    corresponding_request: None,
  })
}

pub fn entry_specifier_content_key(specifier: &str) -> String {
  format!("entry_specifier:{specifier}")
}

pub fn entry_file_content_key(entry: &Entry) -> String {
  let mut hasher = IdentifierHasher::new();
  entry.hash(&mut hasher);
  format!("entry_file:{:016x}", hasher.finish())
}

/// Two groups with the same key are the same input to the transformer, whatever `can_defer` says
pub fn asset_group_content_key(asset_group: &AssetGroup) -> String {
  let side_effects = match asset_group.side_effects {
    Some(side_effects) => side_effects.to_string(),
    None => String::from("null"),
  };

  let query = asset_group
    .query
    .as_ref()
    .map(|query| {
      query
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
    })
    .unwrap_or_default();

  hash_string(&format!(
    "{}{}{}{}{}:{}:{}",
    asset_group.file_path.display(),
    asset_group.env.id(),
    asset_group.is_source,
    side_effects,
    asset_group.code.as_deref().unwrap_or_default(),
    asset_group.pipeline.as_deref().unwrap_or_default(),
    query
  ))
}

impl AssetGraphNode {
  pub fn node_type(&self) -> AssetGraphNodeType {
    match self {
      AssetGraphNode::Root => AssetGraphNodeType::Root,
      AssetGraphNode::EntrySpecifier(_) => AssetGraphNodeType::EntrySpecifier,
      AssetGraphNode::EntryFile(_) => AssetGraphNodeType::EntryFile,
      AssetGraphNode::Dependency(_) => AssetGraphNodeType::Dependency,
      AssetGraphNode::AssetGroup(_) => AssetGraphNodeType::AssetGroup,
      AssetGraphNode::Asset(_) => AssetGraphNodeType::Asset,
    }
  }

  pub fn content_key(&self) -> String {
    match self {
      AssetGraphNode::Root => String::from(ROOT_CONTENT_KEY),
      AssetGraphNode::EntrySpecifier(node) => entry_specifier_content_key(&node.specifier),
      AssetGraphNode::EntryFile(node) => entry_file_content_key(&node.entry),
      AssetGraphNode::Dependency(node) => node.dependency.id(),
      AssetGraphNode::AssetGroup(node) => asset_group_content_key(&node.asset_group),
      AssetGraphNode::Asset(node) => node.asset.id.clone(),
    }
  }

  /// Whether a deferred dependency sits somewhere below this node
  pub fn has_deferred(&self) -> bool {
    match self {
      AssetGraphNode::Dependency(node) => node.has_deferred,
      AssetGraphNode::AssetGroup(node) => node.has_deferred,
      AssetGraphNode::Asset(node) => node.has_deferred,
      _ => false,
    }
  }

  pub fn as_dependency(&self) -> Option<&DependencyNode> {
    match self {
      AssetGraphNode::Dependency(node) => Some(node),
      _ => None,
    }
  }

  pub fn as_asset_group(&self) -> Option<&AssetGroupNode> {
    match self {
      AssetGraphNode::AssetGroup(node) => Some(node),
      _ => None,
    }
  }

  pub fn as_asset(&self) -> Option<&AssetNode> {
    match self {
      AssetGraphNode::Asset(node) => Some(node),
      _ => None,
    }
  }
}

impl ContentNode for AssetGraphNode {
  fn merge(&mut self, incoming: Self) {
    match (self, incoming) {
      (AssetGraphNode::Root, AssetGraphNode::Root) => {}
      (AssetGraphNode::EntrySpecifier(existing), AssetGraphNode::EntrySpecifier(incoming)) => {
        existing.specifier = incoming.specifier;
      }
      (AssetGraphNode::EntryFile(existing), AssetGraphNode::EntryFile(incoming)) => {
        existing.entry = incoming.entry;
      }
      (AssetGraphNode::Dependency(existing), AssetGraphNode::Dependency(incoming)) => {
        existing.merge(incoming);
      }
      (AssetGraphNode::AssetGroup(existing), AssetGraphNode::AssetGroup(incoming)) => {
        existing.merge(incoming);
      }
      (AssetGraphNode::Asset(existing), AssetGraphNode::Asset(incoming)) => {
        existing.asset = incoming.asset;
      }
      (existing, incoming) => panic!(
        "Cannot merge a {} node into a {} node with the same content key",
        incoming.node_type(),
        existing.node_type()
      ),
    }
  }
}
