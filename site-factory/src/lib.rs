//! site-factory: scaffold marketing sites from a one-line description.
//!
//! The pipeline has three moving parts:
//! - Template rendering: a `.template` tree becomes a concrete project
//! - Skills: optional post-scaffold steps run as isolated subprocesses
//! - Media: a Runware job client that submits, polls and falls back across models

pub mod copy;
pub mod factory;
pub mod manifest;
pub mod media;
pub mod output;
pub mod project;
pub mod skills;
pub mod template;
pub mod workspace;
