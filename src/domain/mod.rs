//! Domain layer: entities and merge logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod collector;
pub mod entities;
pub mod error;
pub mod order;
pub mod sorter;

pub use collector::collect;
pub use entities::*;
pub use error::DomainError;
pub use order::{ExplicitOrder, InvertedOrder, LogicalOrder, PrefixIndexOrder};
pub use sorter::sort;
