//! The factory pipeline.
//!
//! Stages, in order:
//! - Resolve: project identity and marketing copy
//! - Scaffold: copy the template tree into the output directory
//! - Render: substitute tokens in place
//! - Skills: optional media generation and DNS sync
//! - Record: write the manifest

mod orchestrator;

pub use orchestrator::{
    Factory, FactoryConfig, FactoryError, FactoryOutcome, FactoryRequest, Phase, replacements,
};
