use std::hash::Hash;
use std::hash::Hasher;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_repr::Deserialize_repr;
use serde_repr::Serialize_repr;

use crate::hash::IdentifierHasher;

use super::environment::Environment;
use super::json::JSONObject;
use super::symbol::Symbol;
use super::target::Target;
use super::AssetId;
use super::FileType;

pub fn create_dependency_id(
  source_asset_id: Option<&AssetId>,
  specifier: &str,
  environment_id: &str,
  target: Option<&Target>,
  pipeline: Option<&str>,
  specifier_type: &SpecifierType,
  priority: &Priority,
) -> String {
  let mut hasher = IdentifierHasher::new();

  source_asset_id.hash(&mut hasher);
  specifier.hash(&mut hasher);
  environment_id.hash(&mut hasher);
  target.hash(&mut hasher);
  pipeline.hash(&mut hasher);
  specifier_type.hash(&mut hasher);
  priority.hash(&mut hasher);

  let hash = hasher.finish();
  format!("{:016x}", hash)
}

/// A dependency denotes a connection between two assets
#[derive(PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
  /// The environment of the dependency
  pub env: Arc<Environment>,

  /// Whether the dependency is an entry
  pub is_entry: bool,

  /// Whether the dependency is optional
  ///
  /// If an optional dependency cannot be resolved, it will not fail the build.
  ///
  pub is_optional: bool,

  /// Plugin-specific metadata for the dependency
  ///
  /// This survives re-resolution of the asset that owns the dependency.
  ///
  #[serde(default)]
  pub meta: JSONObject,

  /// The pipeline defined in .parcelrc that the dependency should be processed with
  #[serde(default)]
  pub pipeline: Option<String>,

  /// Determines when the dependency should be loaded
  pub priority: Priority,

  /// The id of the asset with this dependency
  pub source_asset_id: Option<AssetId>,

  /// The type of the asset that owns this dependency
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_asset_type: Option<FileType>,

  /// The file path of the asset with this dependency
  pub source_path: Option<PathBuf>,

  /// The import or export specifier that connects two assets together
  pub specifier: String,

  /// How the specifier should be interpreted
  pub specifier_type: SpecifierType,

  /// The symbols this dependency imports, keyed by their exported name
  #[serde(default)]
  pub symbols: Option<Vec<Symbol>>,

  /// The target associated with an entry, if any
  #[serde(default)]
  pub target: Option<Box<Target>>,
}

impl Dependency {
  pub fn id(&self) -> String {
    create_dependency_id(
      self.source_asset_id.as_ref(),
      &self.specifier,
      &self.env.id(),
      self.target.as_deref(),
      self.pipeline.as_deref(),
      &self.specifier_type,
      &self.priority,
    )
  }

  /// Creates the dependency connecting an entry file to one of its targets
  ///
  /// Library targets request every export of the entry through a weak `*` symbol.
  pub fn entry(entry: String, target: Target) -> Dependency {
    let is_library = target.env.is_library;
    let mut symbols = None;

    if is_library {
      symbols = Some(vec![Symbol::new("*", "*", true)]);
    }

    Dependency {
      env: target.env.clone(),
      is_entry: true,
      pipeline: target.pipeline.clone(),
      specifier: entry,
      // By default in JS this is set to ESM, even though it is resolved as Url
      specifier_type: SpecifierType::Url,
      symbols,
      target: Some(Box::new(target)),
      ..Dependency::default()
    }
  }

  pub fn new(specifier: String, env: Arc<Environment>) -> Dependency {
    Dependency {
      env,
      meta: JSONObject::new(),
      specifier,
      ..Dependency::default()
    }
  }

  pub fn has_symbol(&self, exported: &str) -> bool {
    self
      .symbols
      .as_ref()
      .is_some_and(|symbols| symbols.iter().any(|s| s.exported == exported))
  }
}

/// Determines when a dependency should load
#[derive(Clone, Copy, Debug, Default, Deserialize_repr, Eq, Hash, PartialEq, Serialize_repr)]
#[repr(u32)]
pub enum Priority {
  /// Resolves the dependency synchronously, placing the resolved asset in the same bundle as the parent or another bundle that is already on the page
  #[default]
  Sync = 0,
  /// Places the dependency in a separate bundle loaded in parallel with the current bundle
  Parallel = 1,
  /// The dependency should be placed in a separate bundle that is loaded later
  Lazy = 2,
  /// The dependency should be placed in a separate bundle that is loaded conditionally
  Conditional = 3,
}

/// The type of the import specifier
#[derive(Clone, Copy, Debug, Default, Deserialize_repr, Eq, Hash, PartialEq, Serialize_repr)]
#[repr(u8)]
pub enum SpecifierType {
  /// An ES Module specifier
  ///
  /// This is parsed as an URL, but bare specifiers are treated as node_modules.
  ///
  #[default]
  Esm = 0,

  /// A CommonJS specifier
  ///
  /// This is not parsed as an URL.
  ///
  CommonJS = 1,

  /// A URL that works as in a browser
  ///
  /// Bare specifiers are treated as relative URLs.
  ///
  Url = 2,

  /// A custom specifier that must be handled by a custom resolver plugin
  Custom = 3,
}
