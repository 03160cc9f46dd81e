pub use self::asset::*;
pub use self::asset_group::*;
pub use self::dependency::*;
pub use self::entry::*;
pub use self::environment::*;
pub use self::file_type::*;
pub use self::json::*;
pub use self::symbol::*;
pub use self::target::*;

mod asset;
mod asset_group;
mod dependency;
mod entry;
mod environment;
mod file_type;
mod json;
mod symbol;
mod target;
