//! Library manifest properties.
//!
//! Interop libraries carry a `manifest` file of `key=value` properties. The
//! same format is used for the manifest side channel written next to the
//! artifact. Keys are kept sorted so the written file is deterministic.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{InteropError, Result};
use crate::util::fs::write_string;

/// Manifest key listing headers owned by a library.
pub const INCLUDED_HEADERS: &str = "includedHeaders";
/// Manifest key holding the package identity of a library.
pub const PACKAGE: &str = "package";
/// Manifest key marking an interop library.
pub const INTEROP: &str = "interop";
/// Manifest key naming the IR provider of metadata-mode libraries.
pub const IR_PROVIDER: &str = "ir_provider";
/// Manifest key for the foreign exception handling mode.
pub const FOREIGN_EXCEPTION_MODE: &str = "foreignExceptionMode";
/// Manifest key for the unique library name.
pub const UNIQUE_NAME: &str = "unique_name";
/// Manifest key for the short library name.
pub const SHORT_NAME: &str = "short_name";
/// Manifest key listing library dependencies.
pub const DEPENDS: &str = "depends";
/// Manifest key listing native targets.
pub const NATIVE_TARGETS: &str = "native_targets";
/// Manifest key for the library version.
pub const LIBRARY_VERSION: &str = "library_version";
/// Manifest key listing forward declarations the bindings export.
pub const EXPORT_FORWARD_DECLARATIONS: &str = "exportForwardDeclarations";

/// IR provider identifier recorded for metadata-mode interop libraries.
pub const INTEROP_IR_PROVIDER: &str = "bindery.interop";

/// Ordered property table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestProperties {
    entries: BTreeMap<String, String>,
}

impl ManifestProperties {
    /// Create an empty property table.
    pub fn new() -> Self {
        ManifestProperties {
            entries: BTreeMap::new(),
        }
    }

    /// Parse properties text.
    pub fn parse(text: &str) -> Self {
        let mut props = ManifestProperties::new();
        let mut pending = String::new();

        for raw in text.lines() {
            let line = raw.trim_start();
            if pending.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
                continue;
            }
            // An odd number of trailing backslashes continues the line.
            let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
            if trailing % 2 == 1 {
                pending.push_str(&line[..line.len() - 1]);
                continue;
            }
            pending.push_str(line);
            let logical = std::mem::take(&mut pending);
            let (key, value) = split_property(&logical);
            props.entries.insert(unescape(&key), unescape(&value));
        }

        if !pending.is_empty() {
            let (key, value) = split_property(&pending);
            props.entries.insert(unescape(&key), unescape(&value));
        }

        props
    }

    /// Load properties from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| InteropError::io(path, e))?;
        Ok(ManifestProperties::parse(&text))
    }

    /// Write properties to a file, creating parent directories.
    pub fn store(&self, path: &Path) -> Result<()> {
        write_string(path, &self.render()).map_err(|e| InteropError::io(path, e))
    }

    /// Render to properties text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(&escape(key, true));
            out.push('=');
            out.push_str(&escape(value, false));
            out.push('\n');
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Space-separated list value.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Insert a value, calling `on_replace(key, old, new)` first when an
    /// existing different value is about to be overwritten.
    pub fn put_and_run_on_replace<F>(&mut self, key: &str, value: impl Into<String>, on_replace: F)
    where
        F: FnOnce(&str, &str, &str),
    {
        let value = value.into();
        if let Some(old) = self.entries.get(key) {
            if *old != value {
                on_replace(key, old, &value);
            }
        }
        self.entries.insert(key.to_string(), value);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = (String, String)>) {
        self.entries.extend(other);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split a logical line at the first unescaped `=` or `:`.
fn split_property(line: &str) -> (String, String) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                return (
                    line[..i].trim_end().to_string(),
                    line[i + 1..].trim_start().to_string(),
                )
            }
            _ => {}
        }
    }
    (line.trim_end().to_string(), String::new())
}

fn escape(s: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '=' | ':' | ' ' if is_key => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_properties() {
        let props = ManifestProperties::parse(
            "# comment\n\
             package = org.sample\n\
             includedHeaders=foo.h bar.h\n\
             depends: stdlib \\\n    posix\n",
        );

        assert_eq!(props.get(PACKAGE), Some("org.sample"));
        assert_eq!(props.get_list(INCLUDED_HEADERS), vec!["foo.h", "bar.h"]);
        assert_eq!(props.get_list(DEPENDS), vec!["stdlib", "posix"]);
    }

    #[test]
    fn test_render_is_sorted_and_reparses() {
        let mut props = ManifestProperties::new();
        props.insert("package", "b");
        props.insert("interop", "true");
        props.insert("odd key", "line\nbreak");

        let text = props.render();
        assert!(text.starts_with("interop=true\n"));
        assert_eq!(ManifestProperties::parse(&text), props);
    }

    #[test]
    fn test_put_and_run_on_replace() {
        let mut props = ManifestProperties::new();
        props.insert(PACKAGE, "old.pkg");

        let mut replaced = None;
        props.put_and_run_on_replace(PACKAGE, "new.pkg", |_, old, new| {
            replaced = Some((old.to_string(), new.to_string()));
        });

        assert_eq!(
            replaced,
            Some(("old.pkg".to_string(), "new.pkg".to_string()))
        );
        assert_eq!(props.get(PACKAGE), Some("new.pkg"));

        let mut called = false;
        props.put_and_run_on_replace(PACKAGE, "new.pkg", |_, _, _| called = true);
        assert!(!called);
    }
}
