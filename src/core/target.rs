//! Target platform, deployment flavor and generation mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// File suffix of a packed interop library.
pub const LIBRARY_SUFFIX: &str = ".bindlib";

/// A target triple (e.g., "x86_64-unknown-linux-gnu").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetTriple {
    pub triple: String,
}

impl TargetTriple {
    /// Create a new target triple.
    pub fn new(triple: impl Into<String>) -> Self {
        TargetTriple {
            triple: triple.into(),
        }
    }

    /// The triple of the machine running the build.
    pub fn host() -> Self {
        let vendor_os = match std::env::consts::OS {
            "linux" => "unknown-linux-gnu",
            "macos" => "apple-darwin",
            "windows" => "pc-windows-msvc",
            other => other,
        };
        TargetTriple::new(format!("{}-{}", std::env::consts::ARCH, vendor_os))
    }

    /// Get the architecture from the triple.
    pub fn arch(&self) -> &str {
        self.triple.split('-').next().unwrap_or(&self.triple)
    }

    /// Get the OS from the triple.
    pub fn os(&self) -> Option<&str> {
        let parts: Vec<&str> = self.triple.split('-').collect();
        match parts.len() {
            0 | 1 => None,
            2 => parts.get(1).copied(),
            _ => parts.get(2).copied(),
        }
    }

    /// Values that definition-file keys may be suffixed with
    /// (`compilerOpts.linux`, `compilerOpts.x86_64`, ...), most specific first.
    pub fn substitutions(&self) -> Vec<String> {
        let mut subs = vec![self.triple.clone()];
        if let Some(os) = self.os() {
            subs.push(os.to_string());
        }
        subs.push(self.arch().to_string());
        subs.dedup();
        subs
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.triple)
    }
}

/// File name of a shared library on the build machine.
pub fn shared_library_name(name: &str) -> String {
    format!(
        "{}{}{}",
        std::env::consts::DLL_PREFIX,
        name,
        std::env::consts::DLL_SUFFIX
    )
}

/// Deployment flavor of the produced bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// Bindings loaded at runtime from a shared object.
    Jvm,
    /// Bindings packaged ahead of time with LLVM bitcode.
    Native,
}

impl FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jvm" => Ok(Flavor::Jvm),
            "native" => Ok(Flavor::Native),
            _ => Err(format!(
                "unexpected flavor '{}'; expected 'jvm' or 'native'",
                s
            )),
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::Jvm => write!(f, "jvm"),
            Flavor::Native => write!(f, "native"),
        }
    }
}

/// What the stub emitter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Binding source code, compiled later by the caller.
    SourceCode,
    /// Serialized metadata packaged into a library.
    #[default]
    Metadata,
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sourcecode" | "source-code" | "source_code" => Ok(GenerationMode::SourceCode),
            "metadata" => Ok(GenerationMode::Metadata),
            _ => Err(format!(
                "unexpected mode '{}'; expected 'sourcecode' or 'metadata'",
                s
            )),
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::SourceCode => write!(f, "sourcecode"),
            GenerationMode::Metadata => write!(f, "metadata"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triple_parts() {
        let t = TargetTriple::new("aarch64-apple-darwin");
        assert_eq!(t.arch(), "aarch64");
        assert_eq!(t.os(), Some("darwin"));
        assert_eq!(
            t.substitutions(),
            vec!["aarch64-apple-darwin", "darwin", "aarch64"]
        );
    }

    #[test]
    fn test_short_triple() {
        let t = TargetTriple::new("x86_64-linux");
        assert_eq!(t.os(), Some("linux"));
    }

    #[test]
    fn test_parse_flavor_and_mode() {
        assert_eq!("JVM".parse::<Flavor>().unwrap(), Flavor::Jvm);
        assert_eq!("native".parse::<Flavor>().unwrap(), Flavor::Native);
        assert!("wasm".parse::<Flavor>().is_err());
        assert_eq!(
            "sourcecode".parse::<GenerationMode>().unwrap(),
            GenerationMode::SourceCode
        );
        assert_eq!(GenerationMode::default(), GenerationMode::Metadata);
    }
}
