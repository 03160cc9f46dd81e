use serde::Deserialize;
use serde::Serialize;

/// Switches that change how the asset graph is built
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetGraphOptions {
  /// Skip traversing into asset groups whose symbols are provably unused
  pub defer_unused_dependencies: bool,

  /// Share a single environment instance between nodes with equal environments
  pub dedupe_environments: bool,
}

impl Default for AssetGraphOptions {
  fn default() -> Self {
    AssetGraphOptions {
      defer_unused_dependencies: true,
      dedupe_environments: true,
    }
  }
}
