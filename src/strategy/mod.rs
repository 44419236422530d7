//! Build strategies: one per toolchain family
//!
//! A strategy is a detection predicate plus a fixed cleanup-and-build recipe.
//! Detection never touches the tree; building is the only mutating operation.

mod id_enum_macro;
mod outcome;
pub mod recipe;
mod registry;
mod strategy_id;
pub mod toolchains;

pub use outcome::{BuildOutcome, BuildStatus, FailureCategory};
pub use recipe::{Action, Step, Tolerance};
pub use registry::StrategyRegistry;
pub use strategy_id::StrategyId;
pub use toolchains::{DetectOptions, Detection, Strategy};
