//! Toolchain configuration.
//!
//! The distribution home (`$BINDERY_HOME`, default `~/.bindery`) holds the
//! bundled libraries and a `toolchain.toml`:
//!
//! ```toml
//! [toolchain]
//! llvm_home = "/usr/lib/llvm-17"
//! sysroot = "/opt/sysroot"
//! compiler_opts = ["-fPIC"]
//!
//! [languages]
//! "Objective-C" = ["-fobjc-arc"]
//!
//! [targets.aarch64-unknown-linux-gnu]
//! sysroot = "/opt/aarch64-sysroot"
//! compiler_opts = ["--target=aarch64-unknown-linux-gnu"]
//!
//! [collaborators.indexer]
//! program = "bindery-indexer"
//! ```
//!
//! Individual keys can be overridden per run with `key=value` pairs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::def_file::parse_space_separated_args;
use crate::core::error::{InteropError, Result};
use crate::core::language::Language;
use crate::core::target::TargetTriple;

/// Environment variable naming the distribution home.
pub const HOME_ENV: &str = "BINDERY_HOME";

/// File name of the toolchain configuration inside the home.
pub const TOOLCHAIN_FILE: &str = "toolchain.toml";

/// Toolchain configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub toolchain: ToolchainSettings,

    /// Default compiler options per language, keyed by language name.
    pub languages: BTreeMap<String, Vec<String>>,

    /// Per-target settings, keyed by triple.
    pub targets: BTreeMap<String, TargetSettings>,

    pub collaborators: CollaboratorSettings,
}

/// LLVM installation and global compiler settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// LLVM installation; `clang` and linkers are taken from its `bin/`.
    pub llvm_home: Option<PathBuf>,

    /// System root headers are identified relative to.
    pub sysroot: Option<PathBuf>,

    /// Wrapper every compiler and linker invocation goes through
    /// (for example `ccache`).
    pub launcher: Option<PathBuf>,

    /// Compiler options added for every target.
    pub compiler_opts: Vec<String>,
}

/// Settings for one target triple.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSettings {
    pub sysroot: Option<PathBuf>,
    pub compiler_opts: Vec<String>,
}

/// External programs implementing the indexer and stub emitter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorSettings {
    pub indexer: Option<CommandSettings>,
    pub emitter: Option<CommandSettings>,
}

/// A program plus leading arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ToolConfig {
    /// Load toolchain configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| InteropError::io(path, e))?;

        toml::from_str(&contents).map_err(|e| {
            InteropError::config(format!(
                "failed to parse toolchain config {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load toolchain configuration with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no toolchain config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Default compiler options for a language.
    pub fn language_opts(&self, language: Language) -> Vec<String> {
        self.languages
            .get(language.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Platform compiler options for a target: global options, then the target's.
    pub fn platform_compiler_opts(&self, target: &TargetTriple) -> Vec<String> {
        let mut opts = self.toolchain.compiler_opts.clone();
        if let Some(settings) = self.targets.get(&target.triple) {
            opts.extend(settings.compiler_opts.iter().cloned());
        }
        opts
    }

    /// Sysroot for a target, falling back to the global one.
    pub fn sysroot(&self, target: &TargetTriple) -> Option<PathBuf> {
        self.targets
            .get(&target.triple)
            .and_then(|t| t.sysroot.clone())
            .or_else(|| self.toolchain.sysroot.clone())
    }

    /// Apply `key=value` overrides.
    ///
    /// Known keys: `llvm_home`, `sysroot`, `launcher`, `compiler_opts`,
    /// `indexer`, `emitter`. Unknown keys are warned about and ignored.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) {
        for (key, value) in overrides {
            match key.as_str() {
                "llvm_home" => self.toolchain.llvm_home = Some(PathBuf::from(value)),
                "sysroot" => self.toolchain.sysroot = Some(PathBuf::from(value)),
                "launcher" => self.toolchain.launcher = Some(PathBuf::from(value)),
                "compiler_opts" => {
                    self.toolchain.compiler_opts = parse_space_separated_args(value)
                }
                "indexer" => self.collaborators.indexer = Some(command_setting(value)),
                "emitter" => self.collaborators.emitter = Some(command_setting(value)),
                other => tracing::warn!("unknown toolchain property `{}` ignored", other),
            }
        }
    }
}

fn command_setting(value: &str) -> CommandSettings {
    let mut parts = parse_space_separated_args(value).into_iter();
    CommandSettings {
        program: parts.next().map(PathBuf::from).unwrap_or_default(),
        args: parts.collect(),
    }
}

/// The distribution home: `$BINDERY_HOME`, else `~/.bindery`.
pub fn bindery_home() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return Some(PathBuf::from(home));
    }
    directories::BaseDirs::new().map(|b| b.home_dir().join(".bindery"))
}

/// Path of the toolchain configuration inside a home.
pub fn toolchain_config_path(home: &Path) -> PathBuf {
    home.join(TOOLCHAIN_FILE)
}
