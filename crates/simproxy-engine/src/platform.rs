//! ---
//! sp_section: "02-engine-binding"
//! sp_subsection: "module"
//! sp_type: "source"
//! sp_scope: "code"
//! sp_description: "Engine interface and dynamic module binding."
//! sp_version: "v0.0.0-prealpha"
//! sp_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

/// Platforms for which engine binaries are shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux64,
    Win64,
    Darwin64,
}

impl Platform {
    /// The platform the proxy was compiled for.
    pub fn current() -> Self {
        #[cfg(target_os = "windows")]
        {
            Platform::Win64
        }
        #[cfg(target_os = "macos")]
        {
            Platform::Darwin64
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            Platform::Linux64
        }
    }

    /// Directory name under `binaries/` in the standardized layout.
    pub fn dir_name(self) -> &'static str {
        match self {
            Platform::Linux64 => "linux64",
            Platform::Win64 => "win64",
            Platform::Darwin64 => "darwin64",
        }
    }

    /// Shared-module extension used on this platform.
    pub fn library_extension(self) -> &'static str {
        match self {
            Platform::Linux64 => ".so",
            Platform::Win64 => ".dll",
            Platform::Darwin64 => ".dylib",
        }
    }
}

/// Path of an engine module for an explicit platform.
pub fn module_path_for(root: &Path, engine: &str, module: &str, platform: Platform) -> PathBuf {
    root.join(engine)
        .join("binaries")
        .join(platform.dir_name())
        .join(format!("{}{}", module, platform.library_extension()))
}

/// Path of an engine module for the running platform:
/// `<root>/<engine>/binaries/<platform>/<module><ext>`.
pub fn module_path(root: &Path, engine: &str, module: &str) -> PathBuf {
    module_path_for(root, engine, module, Platform::current())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_the_standard_convention() {
        let path = module_path_for(
            Path::new("/opt/resources"),
            "Amplifier",
            "model",
            Platform::Linux64,
        );
        assert_eq!(
            path,
            PathBuf::from("/opt/resources/Amplifier/binaries/linux64/model.so")
        );
    }

    #[test]
    fn extensions_pair_with_platform_ids() {
        assert_eq!(Platform::Linux64.library_extension(), ".so");
        assert_eq!(Platform::Win64.library_extension(), ".dll");
        assert_eq!(Platform::Darwin64.library_extension(), ".dylib");
        assert_eq!(Platform::Win64.dir_name(), "win64");
    }

    #[test]
    fn current_platform_is_consistent() {
        let platform = Platform::current();
        let path = module_path(Path::new("root"), "Engine", "model");
        assert!(path
            .to_string_lossy()
            .contains(platform.dir_name()));
    }
}
