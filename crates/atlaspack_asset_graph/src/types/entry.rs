use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// An entry file resolved from an entry specifier
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
  pub file_path: PathBuf,

  /// The package.json directory the entry belongs to
  pub package_path: PathBuf,

  /// The name of the target the entry is restricted to, if any
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target: Option<String>,
}
