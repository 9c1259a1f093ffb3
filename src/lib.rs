#[macro_use]
mod macros;

pub mod dns;
pub mod parser;
pub mod serializer;
pub mod settings;
pub mod storage;

pub use storage::{Lookup, Storage};
