//! Definition file parsing.
//!
//! A definition file describes a native library: which headers to bind,
//! which compiler and linker options to use, and how to filter declarations.
//!
//! ```text
//! headers = foo.h bar/baz.h
//! headerFilter = foo*.h bar/**
//! compilerOpts = -DFOO=1 "-DGREETING=hello world"
//! compilerOpts.linux = -D_GNU_SOURCE
//! ---
//! static inline int foo_version(void) { return 1; }
//! ```
//!
//! Everything before the `---` separator is a property list; everything after
//! it is copied verbatim into the preamble seen by the indexer. A key suffixed
//! with a target substitution (`.linux`, `.x86_64`, or the full triple) has its
//! values appended to the unsuffixed key when building for a matching target.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::error::{InteropError, Result};
use crate::core::manifest::ManifestProperties;

const SEPARATOR: &str = "---";

/// A parsed definition file.
#[derive(Debug, Clone, Default)]
pub struct DefFile {
    /// Path of the file, if the definition came from disk.
    pub file: Option<PathBuf>,
    /// Parsed configuration values.
    pub config: DefFileConfig,
    /// Lines after the `---` separator.
    pub def_header_lines: Vec<String>,
    /// Properties forwarded to the library manifest.
    pub manifest_addend_properties: ManifestProperties,
}

impl DefFile {
    /// Load a definition file, or an empty definition when `path` is `None`.
    pub fn load(path: Option<&Path>, substitutions: &[String]) -> Result<Self> {
        match path {
            None => Ok(DefFile::default()),
            Some(path) => {
                if !path.exists() {
                    return Err(InteropError::MissingInput(path.to_path_buf()));
                }
                let text =
                    std::fs::read_to_string(path).map_err(|e| InteropError::io(path, e))?;
                let mut def = DefFile::parse(&text, substitutions);
                def.file = Some(path.to_path_buf());
                Ok(def)
            }
        }
    }

    /// Parse definition file text.
    pub fn parse(text: &str, substitutions: &[String]) -> Self {
        let mut property_text = String::new();
        let mut def_header_lines = Vec::new();
        let mut in_header = false;

        for line in text.lines() {
            if in_header {
                def_header_lines.push(line.to_string());
            } else if line.trim() == SEPARATOR {
                in_header = true;
            } else {
                property_text.push_str(line);
                property_text.push('\n');
            }
        }

        let raw = ManifestProperties::parse(&property_text);
        let values = substitute(&raw, substitutions);

        let mut manifest_addend_properties = ManifestProperties::new();
        for (key, list) in &values {
            manifest_addend_properties.insert(key.clone(), join_args(list));
        }

        DefFile {
            file: None,
            config: DefFileConfig { values },
            def_header_lines,
            manifest_addend_properties,
        }
    }

    /// File name without directories, if loaded from disk.
    pub fn file_name(&self) -> Option<String> {
        self.file
            .as_ref()
            .and_then(|f| f.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Resolve target-suffixed keys into their base keys.
fn substitute(raw: &ManifestProperties, substitutions: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut suffixed: Vec<(String, String, String)> = Vec::new();

    for (key, value) in raw.iter() {
        match key.split_once('.') {
            Some((base, suffix)) => {
                suffixed.push((base.to_string(), suffix.to_string(), value.to_string()))
            }
            None => {
                values.insert(key.to_string(), parse_space_separated_args(value));
            }
        }
    }

    // Least specific first, so the most specific value ends up last.
    for substitution in substitutions.iter().rev() {
        for (base, suffix, value) in &suffixed {
            if suffix == substitution {
                values
                    .entry(base.clone())
                    .or_default()
                    .extend(parse_space_separated_args(value));
            }
        }
    }

    values
}

/// Split a property value on whitespace, honoring quotes and backslash escapes.
pub fn parse_space_separated_args(value: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut quote: Option<char> = None;
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (_, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                    has_token = true;
                }
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                has_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

fn join_args(args: &[String]) -> String {
    args.iter()
        .map(|a| {
            if a.is_empty() || a.contains(char::is_whitespace) {
                format!("\"{}\"", a.replace('"', "\\\""))
            } else {
                a.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a repeated boolean-like option is set.
///
/// The rightmost value wins and an absent option is never true.
pub fn is_true(values: Option<&[String]>) -> bool {
    values.and_then(|v| v.last()).map(String::as_str) == Some("true")
}

/// Typed view over definition-file properties.
#[derive(Debug, Clone, Default)]
pub struct DefFileConfig {
    values: BTreeMap<String, Vec<String>>,
}

impl DefFileConfig {
    fn list(&self, key: &str) -> Vec<String> {
        self.values.get(key).cloned().unwrap_or_default()
    }

    fn single(&self, key: &str) -> Option<String> {
        self.values.get(key).and_then(|v| v.last()).cloned()
    }

    fn flag(&self, key: &str) -> bool {
        is_true(self.values.get(key).map(Vec::as_slice))
    }

    pub fn headers(&self) -> Vec<String> {
        self.list("headers")
    }

    pub fn modules(&self) -> Vec<String> {
        self.list("modules")
    }

    pub fn language(&self) -> Option<String> {
        // "Objective-C" is a single token; the full value is the language name.
        self.values.get("language").map(|v| v.join(" "))
    }

    pub fn compiler_opts(&self) -> Vec<String> {
        self.list("compilerOpts")
    }

    pub fn linker_opts(&self) -> Vec<String> {
        self.list("linkerOpts")
    }

    pub fn exclude_dependent_modules(&self) -> bool {
        self.flag("excludeDependentModules")
    }

    pub fn header_filter(&self) -> Vec<String> {
        self.list("headerFilter")
    }

    pub fn exclude_filter(&self) -> Vec<String> {
        self.list("excludeFilter")
    }

    pub fn strict_enums(&self) -> Vec<String> {
        self.list("strictEnums")
    }

    pub fn non_strict_enums(&self) -> Vec<String> {
        self.list("nonStrictEnums")
    }

    pub fn no_string_conversion(&self) -> Vec<String> {
        self.list("noStringConversion")
    }

    pub fn excluded_functions(&self) -> Vec<String> {
        self.list("excludedFunctions")
    }

    pub fn excluded_macros(&self) -> Vec<String> {
        self.list("excludedMacros")
    }

    pub fn static_libraries(&self) -> Vec<String> {
        self.list("staticLibraries")
    }

    pub fn library_paths(&self) -> Vec<String> {
        self.list("libraryPaths")
    }

    pub fn package_name(&self) -> Option<String> {
        self.single("package")
    }

    pub fn entry_points(&self) -> Vec<String> {
        self.list("entryPoint")
    }

    /// Linker executable name, `clang` unless overridden.
    pub fn linker(&self) -> String {
        self.single("linker").unwrap_or_else(|| "clang".to_string())
    }

    pub fn exclude_system_libs(&self) -> bool {
        self.flag("excludeSystemLibs")
    }

    pub fn export_forward_declarations(&self) -> Vec<String> {
        self.list("exportForwardDeclarations")
    }

    pub fn disable_designated_initializer_checks(&self) -> bool {
        self.flag("disableDesignatedInitializerChecks")
    }

    pub fn foreign_exception_mode(&self) -> Option<String> {
        self.single("foreignExceptionMode")
    }
}
