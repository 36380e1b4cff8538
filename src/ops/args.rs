//! Caller-supplied options for an interop run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::target::GenerationMode;

/// Options whose values are space separated, with `\ ` escaping a space.
pub const ESCAPED_OPTIONS: [&str; 4] = [
    "compiler-options",
    "linker-options",
    "compilerOpts",
    "linkerOpts",
];

/// Default output name.
pub const DEFAULT_OUTPUT: &str = "nativelib";

/// Overrides layered on top of the definition file.
#[derive(Debug, Clone)]
pub struct InteropArguments {
    pub def: Option<PathBuf>,
    /// Binding package name.
    pub pkg: Option<String>,
    pub output: String,
    pub target: Option<String>,
    pub mode: GenerationMode,
    /// Libraries the bindings depend on.
    pub library: Vec<String>,
    /// Directories searched for libraries.
    pub repo: Vec<PathBuf>,
    pub nodefaultlibs: bool,
    pub noendorsedlibs: bool,
    /// Headers added to the definition file's list.
    pub header: Vec<String>,
    pub header_filter_additional_search_prefix: Vec<PathBuf>,
    /// Raw values; see [`as_arg_list`].
    pub compiler_options: Vec<String>,
    /// Raw values; see [`as_arg_list`].
    pub linker_options: Vec<String>,
    /// Whether linker options were given at all, even empty.
    pub linker_options_set: bool,
    pub static_library: Vec<String>,
    pub library_path: Vec<String>,
    /// Base for relative library paths.
    pub project_dir: Option<PathBuf>,
    /// Extra sources compiled to bitcode alongside the stubs.
    pub compile_source: Vec<PathBuf>,
    pub source_compile_options: Vec<String>,
    pub verbose: bool,
    pub module_name: Option<String>,
    pub short_module_name: Option<String>,
    pub library_version: Option<String>,
    /// Write an unpacked directory instead of an archive.
    pub nopack: bool,
    pub linker: Option<String>,
    pub foreign_exception_mode: Option<String>,
    /// `key=value` toolchain property overrides.
    pub override_properties: Vec<String>,
    pub temp_dir: Option<PathBuf>,
    pub dump_bridges: bool,
    pub disable_exception_prettifier: bool,
    /// Distribution home; `$BINDERY_HOME` or `~/.bindery` when unset.
    pub home: Option<PathBuf>,
}

impl Default for InteropArguments {
    fn default() -> Self {
        InteropArguments {
            def: None,
            pkg: None,
            output: DEFAULT_OUTPUT.to_string(),
            target: None,
            mode: GenerationMode::default(),
            library: Vec::new(),
            repo: Vec::new(),
            nodefaultlibs: false,
            noendorsedlibs: false,
            header: Vec::new(),
            header_filter_additional_search_prefix: Vec::new(),
            compiler_options: Vec::new(),
            linker_options: Vec::new(),
            linker_options_set: false,
            static_library: Vec::new(),
            library_path: Vec::new(),
            project_dir: None,
            compile_source: Vec::new(),
            source_compile_options: Vec::new(),
            verbose: false,
            module_name: None,
            short_module_name: None,
            library_version: None,
            nopack: false,
            linker: None,
            foreign_exception_mode: None,
            override_properties: Vec::new(),
            temp_dir: None,
            dump_bridges: false,
            disable_exception_prettifier: false,
            home: None,
        }
    }
}

impl InteropArguments {
    /// Compiler options, split and unescaped.
    pub fn expanded_compiler_options(&self) -> Vec<String> {
        self.compiler_options
            .iter()
            .flat_map(|v| as_arg_list("compiler-options", v))
            .collect()
    }

    /// Linker options, split and unescaped.
    pub fn expanded_linker_options(&self) -> Vec<String> {
        self.linker_options
            .iter()
            .flat_map(|v| as_arg_list("linker-options", v))
            .collect()
    }
}

/// Directories and names the driver was given by its host.
#[derive(Debug, Clone)]
pub struct InternalInteropOptions {
    /// Root for generated binding sources.
    pub generated: PathBuf,
    /// Where native outputs are written.
    pub natives: PathBuf,
    /// Where the manifest addend is stored, if anywhere.
    pub manifest: Option<PathBuf>,
    /// Overrides the stub library name.
    pub cstubs_name: Option<String>,
}

impl InternalInteropOptions {
    pub fn new(generated: impl Into<PathBuf>, natives: impl Into<PathBuf>) -> Self {
        InternalInteropOptions {
            generated: generated.into(),
            natives: natives.into(),
            manifest: None,
            cstubs_name: None,
        }
    }
}

/// Split an option value into arguments.
///
/// Values of [`ESCAPED_OPTIONS`] are split on unescaped spaces and `\ ` is
/// unescaped; any other option yields the value unchanged.
pub fn as_arg_list(key: &str, value: &str) -> Vec<String> {
    if !ESCAPED_OPTIONS.contains(&key) {
        return vec![value.to_string()];
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                chars.next();
                current.push(' ');
            }
            ' ' => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

/// Parse `key=value` entries. Malformed entries are warned about and skipped.
pub fn parse_key_value_pairs(values: &[String]) -> BTreeMap<String, String> {
    values
        .iter()
        .filter_map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() => Some((key.to_string(), value.to_string())),
            _ => {
                tracing::warn!(
                    "incorrect property format: expected '<key>=<value>', got '{}'",
                    entry
                );
                None
            }
        })
        .collect()
}
