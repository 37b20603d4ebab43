mod config;
mod core;
mod error;
mod ops;
mod plugin;
mod serde_value;
pub mod table;
mod writer;

pub use crate::config::*;
pub use crate::core::*;
pub use crate::error::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::serde_value::*;
pub use crate::writer::*;
