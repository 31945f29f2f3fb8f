//! Test fixtures for common test scenarios.
//!
//! Descriptor texts mirror what lives in a real descriptor tree; the builder
//! helpers construct capabilities directly for resolver and runtime tests.

use std::path::{Path, PathBuf};

use crate::core::capability::{Capability, EntryPoint, Parameter, SubstituteMapping};
use crate::core::family::Family;

/// An extension whose entry points all map onto the 1.3 core.
pub const MULTITEXTURE: &str = r#"name = "GL_ARB_multitexture"
reg_no = 1

[[tokens]]
name = "GL_TEXTURE0_ARB"
value = "0x84C0"

[[tokens]]
name = "GL_TEXTURE1_ARB"
value = "0x84C1"

[[functions]]
return = "void"
name = "glActiveTextureARB"
params = [{ type = "GLenum", name = "texture" }]
mappings = [{ from = "GL_VERSION_1_3", name = "glActiveTexture" }]

[[functions]]
return = "void"
name = "glClientActiveTextureARB"
params = [{ type = "GLenum", name = "texture" }]
mappings = [{ from = "GL_VERSION_1_3", name = "glClientActiveTexture" }]
"#;

/// The core version the multitexture extension maps onto.
pub const VERSION_1_3: &str = r#"name = "GL_VERSION_1_3"

[[tokens]]
name = "GL_TEXTURE0"
value = "0x84C0"

[[functions]]
return = "void"
name = "glActiveTexture"
params = [{ type = "GLenum", name = "texture" }]

[[functions]]
return = "void"
name = "glClientActiveTexture"
params = [{ type = "GLenum", name = "texture" }]
"#;

/// A platform extension with a statically linked entry point.
pub const WGL_EXTENSIONS_STRING: &str = r#"name = "WGL_ARB_extensions_string"
reg_no = 8
predefined = "_WIN32"

[[functions]]
return = "const char*"
name = "wglGetExtensionsStringARB"
link = "static"
params = [{ type = "HDC", name = "hdc" }]
"#;

/// Descriptor without a registry number.
pub const UNREGISTERED: &str = r#"name = "GL_EXT_unregistered"

[[functions]]
return = "GLint"
name = "glUnregisteredEXT"
"#;

/// Entry point `void name(void)` with no mappings.
pub fn entry(name: &str) -> EntryPoint {
    EntryPoint::new("void", name).unwrap()
}

/// Entry point with one `GLenum` parameter and the given `(from, name)`
/// mappings, earlier preferred.
pub fn mapped(name: &str, mappings: &[(&str, &str)]) -> EntryPoint {
    let base = EntryPoint::new("void", name)
        .unwrap()
        .with_param(Parameter::new("GLenum", "mode").unwrap());
    mappings.iter().fold(base, |e, (from, sub)| {
        e.with_mapping(SubstituteMapping::new(*from, *sub).unwrap())
    })
}

/// Capability with the given entry points.
pub fn capability(name: &str, entry_points: Vec<EntryPoint>) -> Capability {
    entry_points
        .into_iter()
        .fold(Capability::new(name).unwrap(), Capability::with_entry_point)
}

/// `GL` family in the given order.
pub fn family_from(capabilities: Vec<Capability>) -> Family {
    Family::new("GL", capabilities).unwrap()
}

/// The 1.3 core followed by the multitexture extension.
pub fn multitexture_family() -> Family {
    let core = crate::core::parse_capability("GL_VERSION_1_3.toml", VERSION_1_3).unwrap();
    let ext = crate::core::parse_capability("GL_ARB_multitexture.toml", MULTITEXTURE).unwrap();
    Family::from_parts("GL", vec![core], vec![ext]).unwrap()
}

/// Fixture for a project root holding a descriptor tree.
#[derive(Debug, Clone, Default)]
pub struct DescriptorTree {
    /// Descriptor files: stem -> content.
    pub descriptors: Vec<(String, String)>,
    /// Optional `.extloader/config.toml` content.
    pub config: Option<String>,
}

impl DescriptorTree {
    pub fn new() -> Self {
        DescriptorTree::default()
    }

    /// The multitexture tree: one core and one extension.
    pub fn multitexture() -> Self {
        DescriptorTree::new()
            .with_descriptor("GL_VERSION_1_3", VERSION_1_3)
            .with_descriptor("GL_ARB_multitexture", MULTITEXTURE)
    }

    pub fn with_descriptor(mut self, stem: impl Into<String>, content: impl Into<String>) -> Self {
        self.descriptors.push((stem.into(), content.into()));
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }

    /// Write the tree under `root`; descriptors go to `root/descriptors`.
    pub fn write_to(&self, root: &Path) -> std::io::Result<PathBuf> {
        let dir = root.join("descriptors");
        std::fs::create_dir_all(&dir)?;
        for (stem, content) in &self.descriptors {
            std::fs::write(dir.join(format!("{stem}.toml")), content)?;
        }
        if let Some(config) = &self.config {
            let config_dir = root.join(".extloader");
            std::fs::create_dir_all(&config_dir)?;
            std::fs::write(config_dir.join("config.toml"), config)?;
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multitexture_family_shape() {
        let family = multitexture_family();
        assert_eq!(family.len(), 2);
        assert_eq!(family.capabilities()[0].name, "GL_VERSION_1_3");
    }

    #[test]
    fn test_descriptor_tree_writes_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = DescriptorTree::multitexture()
            .with_config("[generate]\njobs = 1\n")
            .write_to(tmp.path())
            .unwrap();

        assert!(dir.join("GL_VERSION_1_3.toml").exists());
        assert!(dir.join("GL_ARB_multitexture.toml").exists());
        assert!(tmp.path().join(".extloader/config.toml").exists());
    }
}
