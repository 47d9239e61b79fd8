//! Orquestador de calibraciones: accessors, tabla de prerequisitos y drivers
//! de pipeline.

pub mod builder;
pub mod core;
pub mod graph;
pub mod outcome;
pub mod summary;

pub use builder::CalibrationsBuilder;
pub use core::Calibrations;
pub use graph::{RawRole, Stage, FULL_CHAIN, TRACE_CHAIN};
pub use outcome::{Origin, PipelineReport, Ready, Resolved, SkipReason, Supplied, Unavailable};
pub use summary::{BucketSummary, CachedEntry, CalibSummary, MaskSummary};
