#[allow(clippy::module_inception)]
mod content_graph;
mod serialize;
mod traversal;

pub use self::content_graph::*;
pub use self::serialize::*;
pub use self::traversal::*;
