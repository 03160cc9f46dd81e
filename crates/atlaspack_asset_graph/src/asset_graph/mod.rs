#[allow(clippy::module_inception)]
mod asset_graph;
mod deferral;
mod environment_cache;
mod incremental;
mod node;
mod propagate_used_symbols;
mod serialize;

pub use self::asset_graph::*;
pub use self::environment_cache::*;
pub use self::node::*;
pub use self::serialize::*;
