//! Rendering subsystems.
//!
//! Contains the screen-space tree shadow pass.

pub mod postprocess;
