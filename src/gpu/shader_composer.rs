use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, ComposerError, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};

use crate::error::TreeShadowError;

/// Top-level shaders this crate builds pipelines from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shader {
    /// Full-screen sphere-proxy shadow kernel (`fs_main` / `fs_mask`).
    TreeShadows,
}

impl Shader {
    fn source(self) -> &'static str {
        match self {
            Self::TreeShadows => {
                include_str!("../../assets/shaders/screen/tree_shadows.wgsl")
            }
        }
    }

    fn file_path(self) -> &'static str {
        match self {
            Self::TreeShadows => "screen/tree_shadows.wgsl",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::TreeShadows => "Tree Shadows Shader",
        }
    }
}

/// Shared module definition: source and file path used in diagnostics.
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Registered in dependency order.
const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
        file_path: "modules/fullscreen.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/depth.wgsl"),
        file_path: "modules/depth.wgsl",
    },
];

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Shared WGSL modules are registered at construction time; consuming shaders
/// pull them in with `#import treeshade::module::{item}`. Composition produces
/// `naga::Module` IR directly, skipping a WGSL re-parse in wgpu.
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::Shader`] if a shared module fails to parse.
    pub fn new() -> Result<Self, TreeShadowError> {
        let mut composer = Composer::default();
        for module in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: module.source,
                    file_path: module.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    TreeShadowError::Shader(format!(
                        "failed to register '{}': {e}",
                        module.file_path
                    ))
                })?;
        }
        Ok(Self { composer })
    }

    /// Compose `shader` into a `wgpu::ShaderModule` ready for pipeline
    /// creation.
    ///
    /// # Errors
    ///
    /// Returns [`TreeShadowError::Shader`] if composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        shader: Shader,
    ) -> Result<wgpu::ShaderModule, TreeShadowError> {
        let naga_module = self
            .compose_naga(shader.source(), shader.file_path())
            .map_err(|e| {
                TreeShadowError::Shader(format!(
                    "failed to compose '{}': {e}",
                    shader.file_path()
                ))
            })?;

        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.label()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu
    /// shader module. Needs no GPU device.
    ///
    /// # Errors
    ///
    /// Returns the composer error for invalid WGSL or unresolved imports.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, Box<ComposerError>> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_shadow_shader_composes() {
        let mut composer = ShaderComposer::new().unwrap();
        let shader = Shader::TreeShadows;
        let module = composer
            .compose_naga(shader.source(), shader.file_path())
            .unwrap_or_else(|e| {
                panic!("'{}' failed to compose: {e}", shader.file_path())
            });

        let entry_points: Vec<&str> =
            module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        for name in ["vs_main", "fs_main", "fs_mask"] {
            assert!(entry_points.contains(&name), "missing entry point {name}");
        }
    }

    #[test]
    fn composed_module_validates() {
        let mut composer = ShaderComposer::new().unwrap();
        let shader = Shader::TreeShadows;
        let module = composer
            .compose_naga(shader.source(), shader.file_path())
            .unwrap();
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        );
        assert!(validator.validate(&module).is_ok());
    }
}
