use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use super::environment::Environment;

/// A file that has been resolved but not transformed yet
///
/// Transforming an asset group produces one or more assets.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetGroup {
  pub file_path: PathBuf,

  pub env: Arc<Environment>,

  /// Whether the file is part of the project, and not an external dependency
  pub is_source: bool,

  /// Whether the file may have side effects when evaluated
  ///
  /// `None` means the resolver could not tell, which is treated as having side effects.
  ///
  #[serde(default)]
  pub side_effects: Option<bool>,

  /// Inline code, for groups that are not backed by a file on disk
  #[serde(default)]
  pub code: Option<String>,

  #[serde(default)]
  pub pipeline: Option<String>,

  /// Query parameters from the specifier, kept sorted by key
  #[serde(default)]
  pub query: Option<BTreeMap<String, String>>,

  /// Whether dependencies pointing at this group may defer it
  #[serde(default = "default_can_defer")]
  pub can_defer: bool,
}

fn default_can_defer() -> bool {
  true
}

impl Default for AssetGroup {
  fn default() -> Self {
    AssetGroup {
      file_path: PathBuf::default(),
      env: Arc::new(Environment::default()),
      is_source: false,
      side_effects: None,
      code: None,
      pipeline: None,
      query: None,
      can_defer: true,
    }
  }
}
