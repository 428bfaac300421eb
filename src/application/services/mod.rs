//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, OutputWriter)
//! but are themselves concrete structs, not traits.

mod merge;
mod vault;

pub use merge::{CancelToken, MergeReport, MergeService};
pub use vault::VaultService;
