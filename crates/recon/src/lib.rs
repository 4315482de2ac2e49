//! `asbuilt-recon` - scan-vs-model structural reconciliation engine.
//!
//! Pure engine crate: receives segmented point clouds and a model store,
//! returns per-element decisions and writes accepted changes back through
//! the store. No CLI or file-format dependencies.

pub mod config;
pub mod connect;
pub mod element;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod geometry;
pub mod lifecycle;
pub mod matcher;
pub mod model;
pub mod region;
pub mod scan;
pub mod store;
pub mod synth;

pub use config::ReconConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{ReconInput, ReconResult};
pub use store::{MemoryStore, ModelStore};
