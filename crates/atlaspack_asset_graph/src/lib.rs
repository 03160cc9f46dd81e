pub mod asset_graph;
pub mod content_graph;
pub mod error;
pub mod hash;
pub mod options;
pub mod types;

#[cfg(test)]
mod test_utils;
