//! The LLVM toolchain used to compile and link stubs.
//!
//! Tool locations are taken from `llvm_home/bin` when configured, otherwise
//! looked up in `PATH`. Every invocation can be routed through a launcher
//! (for example `ccache`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::core::language::Language;
use crate::core::target::{Flavor, TargetTriple};
use crate::resolver::Distribution;
use crate::util::config::{bindery_home, toolchain_config_path, ToolConfig};
use crate::util::process::{find_executable, ProcessBuilder};

/// A prepared toolchain for one target.
#[derive(Debug, Clone)]
pub struct Tool {
    target: TargetTriple,
    flavor: Flavor,
    config: ToolConfig,
    distribution: Distribution,
}

impl Tool {
    /// Load the toolchain configuration from the distribution home and apply
    /// property overrides.
    ///
    /// `home` defaults to [`bindery_home`]; `target` to the host triple.
    pub fn prepare(
        target: Option<&str>,
        flavor: Flavor,
        home: Option<&Path>,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Tool> {
        let home = home
            .map(Path::to_path_buf)
            .or_else(bindery_home)
            .unwrap_or_else(|| PathBuf::from(".bindery"));
        let mut config = ToolConfig::load_or_default(&toolchain_config_path(&home))?;
        config.apply_overrides(overrides);

        let target = target.map(TargetTriple::new).unwrap_or_else(TargetTriple::host);
        tracing::debug!("prepared toolchain for {} ({}) from {}", target, flavor, home.display());

        Ok(Tool::from_config(config, target, flavor, Distribution::new(home)))
    }

    pub fn from_config(
        config: ToolConfig,
        target: TargetTriple,
        flavor: Flavor,
        distribution: Distribution,
    ) -> Tool {
        Tool {
            target,
            flavor,
            config,
            distribution,
        }
    }

    pub fn target(&self) -> &TargetTriple {
        &self.target
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    /// Suffixes definition-file keys are specialized with.
    pub fn substitutions(&self) -> Vec<String> {
        self.target.substitutions()
    }

    pub fn sysroot(&self) -> Option<PathBuf> {
        self.config.sysroot(&self.target)
    }

    /// Path of an LLVM tool.
    pub fn llvm_tool(&self, name: &str) -> PathBuf {
        match &self.config.toolchain.llvm_home {
            Some(home) => home.join("bin").join(name),
            None => find_executable(name).unwrap_or_else(|| PathBuf::from(name)),
        }
    }

    /// The C/Objective-C compiler.
    pub fn compiler(&self) -> PathBuf {
        self.llvm_tool("clang")
    }

    /// The C++ compiler used for auxiliary sources.
    pub fn cxx_compiler(&self) -> PathBuf {
        self.llvm_tool("clang++")
    }

    /// Default compiler options for a language, from the toolchain config.
    pub fn default_compiler_opts_for_language(&self, language: Language) -> Vec<String> {
        self.config.language_opts(language)
    }

    /// Options the target platform requires on every compilation.
    pub fn platform_compiler_opts(&self) -> Vec<String> {
        self.config.platform_compiler_opts(&self.target)
    }

    /// A process for `program`, routed through the launcher when one is set.
    pub fn command(&self, program: &Path) -> ProcessBuilder {
        match &self.config.toolchain.launcher {
            Some(launcher) => ProcessBuilder::new(launcher).arg(program),
            None => ProcessBuilder::new(program),
        }
    }
}
