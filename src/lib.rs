// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Unused / redundant code
#![warn(unused_results)]
#![warn(unused_qualifications)]
// Cast hygiene
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]

//! Sphere-proxy tree shadows for terrain, composited in screen space with
//! wgpu.
//!
//! Every tree instance is approximated by one world-space sphere. A
//! full-screen pass reconstructs each fragment's world position from scene
//! depth and darkens it when it falls inside any sphere, fading with view
//! distance and broken up by a tiled leaf mask.
//!
//! # Key entry points
//!
//! - [`shadows::TreeShadows`] - owns the sphere set and GPU pass, with
//!   explicit activate / deactivate
//! - [`proxy::ProxySet`] - the spheres built from a terrain's tree placements
//! - [`shading::ShadowCompositor`] - CPU evaluation of the per-fragment
//!   shadow, matching the WGSL kernel
//! - [`options::Options`] - runtime configuration with TOML presets
//!
//! # Frame flow
//!
//! The host renders opaque geometry, then calls
//! [`shadows::TreeShadows::prepare`] with the frame camera and
//! [`shadows::TreeShadows::render`] with either its scene color (post effect)
//! or its sun shadow mask. The pass multiplies into the target and never
//! reads it back.

pub mod camera;
pub mod error;
pub mod gpu;
pub mod options;
pub mod proxy;
pub mod renderer;
pub mod shading;
pub mod shadows;
