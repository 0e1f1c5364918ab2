//! Background consistency engine for the sheet editor.
//!
//! One engine runs per open character document. It waits for dirty signals
//! from the interactive edit paths, rebuilds the feature map, re-evaluates
//! every row's prerequisite tree, and publishes a globally consistent set of
//! verdicts plus a repaint notification. It never exposes a result that
//! mixes two edit generations.
//!
//! Modules are organized by responsibility:
//! - [`engine`] hosts the spawn orchestration
//! - [`handle`] exposes the cloneable façade edit paths and views hold
//! - [`registry`] maps character identities to their single active engine
//! - [`worker`] keeps the background validation task internal to the crate
//! - [`config`] and [`error`] round out the public surface

pub mod config;
pub mod engine;
pub mod error;
pub mod handle;
pub mod registry;

mod shared;
mod worker;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use handle::EngineHandle;
pub use registry::EngineRegistry;
