use std::hash::Hash;
use std::hash::Hasher;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use super::environment::Environment;
use super::file_type::FileType;
use super::json::JSONObject;
use super::symbol::Symbol;
use super::Dependency;

pub type AssetId = String;

#[derive(Debug)]
pub struct CreateAssetIdParams<'a> {
  pub code: Option<&'a str>,
  pub environment_id: &'a str,
  /// All paths should be normalized to a project relative string to generate a consistent hash.
  pub file_path: &'a str,
  pub file_type: &'a FileType,
  pub pipeline: Option<&'a str>,
  pub query: Option<&'a str>,
  pub unique_key: Option<&'a str>,
}

pub fn create_asset_id(params: CreateAssetIdParams<'_>) -> AssetId {
  tracing::trace!(?params, "Creating asset id");

  let CreateAssetIdParams {
    code,
    environment_id,
    file_path,
    file_type,
    pipeline,
    query,
    unique_key,
  } = params;

  let mut hasher = crate::hash::IdentifierHasher::default();

  environment_id.hash(&mut hasher);
  file_path.hash(&mut hasher);
  pipeline.hash(&mut hasher);
  code.hash(&mut hasher);
  query.hash(&mut hasher);
  file_type.hash(&mut hasher);
  unique_key.hash(&mut hasher);

  format!("{:016x}", hasher.finish())
}

/// An asset is a file or part of a file that may represent any data type including source code, binary data, etc.
///
/// Note that assets may exist in the file system or virtually.
///
#[derive(Default, PartialEq, Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
  /// The main identify hash for the asset. It is consistent for the entire
  /// build and between builds.
  pub id: AssetId,

  /// The environment of the asset
  pub env: Arc<Environment>,

  /// The file path to the asset
  pub file_path: PathBuf,

  /// The file type of the asset, which may change during transformation
  #[serde(rename = "type")]
  pub file_type: FileType,

  /// Plugin specific metadata for the asset
  pub meta: JSONObject,

  /// The pipeline defined in .parcelrc that the asset should be processed with
  pub pipeline: Option<String>,

  /// The transformer options for the asset from the dependency query string
  pub query: Option<String>,

  /// The symbols that the asset exports
  pub symbols: Option<Vec<Symbol>>,

  /// A unique key that identifies an asset
  ///
  /// When a transformer returns multiple assets, it can give them unique keys to identify them.
  /// This can be used to create dependencies between multiple assets returned by a transformer
  /// by using the unique key as the dependency specifier.
  ///
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unique_key: Option<String>,

  /// Whether this asset can be omitted if none of its exports are being used
  pub side_effects: bool,

  /// Whether this asset is part of the project, and not an external dependency
  pub is_source: bool,

  /// The hash of the transformed output
  #[serde(default)]
  pub output_hash: Option<String>,

  /// The dependencies of this asset, keyed by dependency id in the order they were found
  #[serde(default)]
  pub dependencies: IndexMap<String, Dependency>,
}

impl Asset {
  pub fn add_dependency(&mut self, dependency: Dependency) -> String {
    let id = dependency.id();
    self.dependencies.insert(id.clone(), dependency);
    id
  }

  pub fn symbol(&self, exported: &str) -> Option<&Symbol> {
    self
      .symbols
      .as_ref()
      .and_then(|symbols| super::find_symbol(symbols, exported))
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn asset_id_includes_unique_key() {
    let params = |unique_key| CreateAssetIdParams {
      code: None,
      environment_id: "env",
      file_path: "index.html",
      file_type: &FileType::Js,
      pipeline: None,
      query: None,
      unique_key,
    };

    let file_asset = create_asset_id(params(None));
    let inline_asset = create_asset_id(params(Some("inline-script")));

    assert_ne!(file_asset, inline_asset);
    assert_eq!(file_asset, create_asset_id(params(None)));
  }

  #[test]
  fn dependencies_keep_insertion_order() {
    let mut asset = Asset::default();
    let b = asset.add_dependency(Dependency::new(String::from("./b"), Arc::default()));
    let a = asset.add_dependency(Dependency::new(String::from("./a"), Arc::default()));

    assert_eq!(asset.dependencies.keys().cloned().collect::<Vec<_>>(), vec![b, a]);
  }
}
