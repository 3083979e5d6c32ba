//! Builds an object-detection training set from images held in object
//! storage, with labels carried in per-object metadata.
//!
//! - [`core::extract`] turns stored objects into image + label file pairs
//! - [`core::partition`] splits the pairs into train/val/test
//! - [`training`] writes the dataset config and hands off to a trainer
//! - [`pipeline`] runs the stages in order inside a workspace

pub mod config;
pub mod core;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod training;

pub use config::{ConfigError, PipelineConfig};
pub use crate::core::registry::ClassRegistry;
pub use pipeline::{run_pipeline, PipelineReport, Workspace};
