use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetGraphError {
  #[error("Serialized graph has no root node")]
  MissingRoot,

  #[error("Serialized graph has an edge from {from} to {to} but only {node_count} nodes")]
  DanglingEdge {
    from: u32,
    to: u32,
    node_count: usize,
  },

  #[error("Serialized graph has more than one node with content key {0}")]
  DuplicateContentKey(String),

  #[error("Failed to encode or decode the asset graph")]
  Json(#[from] serde_json::Error),
}
