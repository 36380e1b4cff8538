//! The assembled, immutable build configuration.
//!
//! A [`BuildConfiguration`] is produced once per run by
//! [`crate::ops::assemble`] from the definition file and caller overrides.
//! It exposes read-only accessors only.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::InteropError;
use crate::core::filter::{HeaderCandidate, HeaderExclusionPolicy, HeaderFilter, HeaderFilterDecision};
use crate::core::language::Language;
use crate::core::library::HeaderId;
use crate::core::target::{Flavor, GenerationMode, TargetTriple};

/// A header or module entry passed to the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeInfo {
    pub header_path: String,
    /// Module the header belongs to, for module-based libraries.
    pub module_name: Option<String>,
}

impl IncludeInfo {
    pub fn header(path: impl Into<String>) -> Self {
        IncludeInfo {
            header_path: path.into(),
            module_name: None,
        }
    }
}

/// The compiler view of a library: what to parse and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compilation {
    pub includes: Vec<IncludeInfo>,
    pub additional_preamble_lines: Vec<String>,
    pub compiler_args: Vec<String>,
    pub language: Language,
}

impl Compilation {
    /// Preamble source: includes followed by the additional lines.
    pub fn preamble(&self) -> String {
        let mut out = String::new();
        for include in &self.includes {
            out.push_str(&format!("#include <{}>\n", include.header_path));
        }
        for line in &self.additional_preamble_lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Everything the indexer needs to know about the library under build.
#[derive(Debug, Clone)]
pub struct NativeLibrary {
    pub compilation: Compilation,
    pub exclude_system_libs: bool,
    pub header_filter: HeaderFilter,
    pub header_exclusion_policy: HeaderExclusionPolicy,
    /// Headers under the sysroot are identified relative to it.
    pub sysroot: Option<PathBuf>,
}

impl NativeLibrary {
    pub fn language(&self) -> Language {
        self.compilation.language
    }

    pub fn compiler_args(&self) -> &[String] {
        &self.compilation.compiler_args
    }

    /// Stable identifier for a header path.
    pub fn header_id(&self, path: &Path) -> HeaderId {
        let relative = self
            .sysroot
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        HeaderId::new(relative.to_string_lossy().replace('\\', "/"))
    }

    /// Decide the fate of a header the indexer found.
    pub fn decide(&self, header: HeaderCandidate<'_>) -> HeaderFilterDecision {
        self.header_filter
            .decide(&self.header_exclusion_policy, header)
    }
}

/// How foreign exceptions crossing the binding boundary are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForeignExceptionMode {
    Terminate,
    ObjCWrap,
}

impl ForeignExceptionMode {
    pub fn value(&self) -> &'static str {
        match self {
            ForeignExceptionMode::Terminate => "terminate",
            ForeignExceptionMode::ObjCWrap => "objc-wrap",
        }
    }
}

impl FromStr for ForeignExceptionMode {
    type Err = InteropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terminate" => Ok(ForeignExceptionMode::Terminate),
            "objc-wrap" => Ok(ForeignExceptionMode::ObjCWrap),
            other => Err(InteropError::config(format!(
                "unknown foreign exception mode '{}'; expected 'terminate' or 'objc-wrap'",
                other
            ))),
        }
    }
}

impl fmt::Display for ForeignExceptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct BuildConfiguration {
    pub(crate) target: TargetTriple,
    pub(crate) flavor: Flavor,
    pub(crate) mode: GenerationMode,
    pub(crate) library: NativeLibrary,
    pub(crate) fq_parts: Vec<String>,
    pub(crate) lib_name: String,
    pub(crate) module_name: String,
    pub(crate) entry_point: Option<String>,
    pub(crate) excluded_functions: BTreeSet<String>,
    pub(crate) excluded_macros: BTreeSet<String>,
    pub(crate) strict_enums: BTreeSet<String>,
    pub(crate) non_strict_enums: BTreeSet<String>,
    pub(crate) no_string_conversion: BTreeSet<String>,
    pub(crate) export_forward_declarations: Vec<String>,
    pub(crate) disable_designated_initializer_checks: bool,
    pub(crate) static_libraries: Vec<String>,
    /// `static_libraries` located in `library_paths`.
    pub(crate) static_library_files: Vec<PathBuf>,
    pub(crate) library_paths: Vec<String>,
    pub(crate) linker: PathBuf,
    pub(crate) linker_opts: Vec<String>,
    pub(crate) foreign_exception_mode: Option<ForeignExceptionMode>,
}

impl BuildConfiguration {
    pub fn target(&self) -> &TargetTriple {
        &self.target
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Effective generation mode.
    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn language(&self) -> Language {
        self.library.language()
    }

    pub fn library(&self) -> &NativeLibrary {
        &self.library
    }

    pub fn includes(&self) -> &[IncludeInfo] {
        &self.library.compilation.includes
    }

    pub fn preamble_lines(&self) -> &[String] {
        &self.library.compilation.additional_preamble_lines
    }

    pub fn compiler_args(&self) -> &[String] {
        self.library.compiler_args()
    }

    pub fn header_filter(&self) -> &HeaderFilter {
        &self.library.header_filter
    }

    /// Binding package name, dot separated.
    pub fn package_name(&self) -> String {
        self.fq_parts.join(".")
    }

    pub fn fq_parts(&self) -> &[String] {
        &self.fq_parts
    }

    /// Base name of the generated native stubs.
    pub fn lib_name(&self) -> &str {
        &self.lib_name
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn entry_point(&self) -> Option<&str> {
        self.entry_point.as_deref()
    }

    pub fn excluded_functions(&self) -> &BTreeSet<String> {
        &self.excluded_functions
    }

    pub fn excluded_macros(&self) -> &BTreeSet<String> {
        &self.excluded_macros
    }

    pub fn exclude_system_libs(&self) -> bool {
        self.library.exclude_system_libs
    }

    pub fn strict_enums(&self) -> &BTreeSet<String> {
        &self.strict_enums
    }

    pub fn non_strict_enums(&self) -> &BTreeSet<String> {
        &self.non_strict_enums
    }

    pub fn no_string_conversion(&self) -> &BTreeSet<String> {
        &self.no_string_conversion
    }

    pub fn export_forward_declarations(&self) -> &[String] {
        &self.export_forward_declarations
    }

    pub fn disable_designated_initializer_checks(&self) -> bool {
        self.disable_designated_initializer_checks
    }

    pub fn static_libraries(&self) -> &[String] {
        &self.static_libraries
    }

    pub fn static_library_files(&self) -> &[PathBuf] {
        &self.static_library_files
    }

    pub fn library_paths(&self) -> &[String] {
        &self.library_paths
    }

    pub fn linker(&self) -> &Path {
        &self.linker
    }

    /// Options appended to the shared-object link command.
    pub fn linker_opts(&self) -> &[String] {
        &self.linker_opts
    }

    pub fn foreign_exception_mode(&self) -> Option<ForeignExceptionMode> {
        self.foreign_exception_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_exception_mode() {
        assert_eq!(
            "objc-wrap".parse::<ForeignExceptionMode>().unwrap(),
            ForeignExceptionMode::ObjCWrap
        );
        assert!(matches!(
            "rethrow".parse::<ForeignExceptionMode>(),
            Err(InteropError::Config(_))
        ));
    }

    #[test]
    fn test_preamble() {
        let compilation = Compilation {
            includes: vec![IncludeInfo::header("foo.h")],
            additional_preamble_lines: vec!["#define __FILE__ \"__FILE__\"".to_string()],
            compiler_args: vec![],
            language: Language::C,
        };
        assert_eq!(
            compilation.preamble(),
            "#include <foo.h>\n#define __FILE__ \"__FILE__\"\n"
        );
    }
}
