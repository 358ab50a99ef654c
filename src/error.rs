//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Invalid configuration or missing host resources.
///
/// Fatal to activation: the pass stays inactive and the condition is
/// reported to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A terrain size component is zero, negative, or not finite.
    InvalidTerrainSize([f32; 3]),
    /// Sphere radius is negative or not finite.
    InvalidRadius(f32),
    /// Sphere center offset has a non-finite component.
    InvalidCenterOffset([f32; 3]),
    /// A fade or leaf parameter is outside its valid range.
    InvalidParameter {
        /// Option name.
        name: &'static str,
        /// Offending value.
        value: f32,
    },
    /// No terrain was supplied by the host.
    MissingTerrain,
    /// No sun light was supplied by the host.
    MissingSun,
    /// No scene depth texture was supplied by the host.
    MissingDepth,
    /// The render context cannot run the pass.
    Unsupported(String),
    /// A leaf mask's texel count does not match its dimensions.
    LeafMaskSize {
        /// Expected texel count (`width * height`).
        expected: usize,
        /// Supplied texel count.
        actual: usize,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTerrainSize(size) => write!(
                f,
                "terrain size must be positive and finite, got {size:?}"
            ),
            Self::InvalidRadius(radius) => write!(
                f,
                "sphere radius must be non-negative and finite, got {radius}"
            ),
            Self::InvalidCenterOffset(offset) => {
                write!(f, "sphere center offset must be finite, got {offset:?}")
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "invalid value for {name}: {value}")
            }
            Self::MissingTerrain => write!(f, "no terrain supplied"),
            Self::MissingSun => write!(f, "no sun light supplied"),
            Self::MissingDepth => write!(f, "no scene depth texture supplied"),
            Self::Unsupported(reason) => {
                write!(f, "tree shadows unsupported by render context: {reason}")
            }
            Self::LeafMaskSize { expected, actual } => write!(
                f,
                "leaf mask expects {expected} texels, got {actual}"
            ),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Errors produced by the treeshade crate.
#[derive(Debug)]
pub enum TreeShadowError {
    /// Invalid configuration or missing host resources.
    Configuration(ConfigurationError),
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// WGSL composition failure.
    Shader(String),
    /// Reading a GPU buffer back to the host failed.
    Readback(String),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Generic I/O failure.
    Io(std::io::Error),
}

impl fmt::Display for TreeShadowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "configuration error: {e}"),
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Shader(msg) => write!(f, "shader error: {msg}"),
            Self::Readback(msg) => write!(f, "buffer read-back error: {msg}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for TreeShadowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for TreeShadowError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

impl From<RenderContextError> for TreeShadowError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for TreeShadowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
