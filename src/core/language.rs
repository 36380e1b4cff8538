//! Native source language of an interop library.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{InteropError, Result};

/// Language of the headers being bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    /// C language (default)
    #[default]
    C,
    /// C++ (accepted but not publicly supported)
    Cpp,
    /// Objective-C
    ObjectiveC,
}

impl Language {
    /// Select the language named in a definition file.
    ///
    /// An absent value means C.
    pub fn select(name: Option<&str>) -> Result<Language> {
        match name {
            None => Ok(Language::C),
            Some("C") => Ok(Language::C),
            Some("C++") => Ok(Language::Cpp),
            Some("Objective-C") => Ok(Language::ObjectiveC),
            Some(other) => Err(InteropError::config(format!(
                "Unexpected language '{}'. Possible values are: 'C', 'Objective-C'",
                other
            ))),
        }
    }

    /// Definition-file spelling of the language.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cpp => "C++",
            Language::ObjectiveC => "Objective-C",
        }
    }

    /// Extension for generated stub sources.
    pub fn source_file_extension(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::ObjectiveC => "m",
        }
    }

    /// Value for clang's `-x` flag.
    pub fn clang_language_name(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "c++",
            Language::ObjectiveC => "objective-c",
        }
    }

    /// Compiler arguments every compilation in this language starts with.
    pub fn default_compiler_args(&self) -> Vec<String> {
        match self {
            Language::C => Vec::new(),
            Language::Cpp => vec!["-x".to_string(), "c++".to_string(), "-std=c++17".to_string()],
            Language::ObjectiveC => vec![
                "-x".to_string(),
                "objective-c".to_string(),
                "-fobjc-arc".to_string(),
            ],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
