//! Zip packing and zip-slip-safe unpacking.

pub mod guard;
mod pack;
mod unpack;

pub use guard::resolve_entry;
pub use pack::pack;
pub use unpack::{default_destination, unpack};
