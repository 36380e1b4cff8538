//! Test doubles for bindery unit tests.
//!
//! The indexer and stub emitter are replaced by in-process fakes, and clang
//! by a shell script that records its arguments and writes whatever file
//! follows `-o`.
//!
//! # Example
//!
//! ```rust,ignore
//! use bindery::test_support::{fake_tool, FakeEmitter, FakeIndexer};
//!
//! #[test]
//! fn test_example() {
//!     let tmp = tempfile::TempDir::new().unwrap();
//!     let tool = fake_tool(tmp.path(), Flavor::Native);
//!     let indexer = FakeIndexer::default();
//!     let emitter = FakeEmitter::with_metadata(b"meta");
//!     // Run the pipeline with the fakes...
//! }
//! ```

pub mod fixtures;

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::toolchain::Tool;
use crate::collab::{
    DriverOptions, FoundHeader, Indexer, ModulesInfo, NativeIndex, StubContext, StubEmitter,
    StubOutput,
};
use crate::core::config::{Compilation, NativeLibrary};
use crate::core::target::{Flavor, GenerationMode, TargetTriple};
use crate::resolver::Distribution;
use crate::util::config::ToolConfig;
use crate::util::fs::write_string;

pub use fixtures::*;

/// A `clang`/`clang++`/linker stand-in run through `/bin/sh`.
///
/// Appends `<tool name> <args>` to `calls.log` next to itself, saves stdin
/// to `<output>.stdin` when reading from `-`, and writes `compiled` to the
/// output file.
pub const FAKE_CLANG: &str = r#"
log="$(dirname "$0")/calls.log"
echo "$(basename "$0") $*" >> "$log"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  prev="$a"
done
for a in "$@"; do
  if [ "$a" = "-" ]; then cat > "$out.stdin"; fi
done
[ -n "$out" ] && printf 'compiled' > "$out"
exit 0
"#;

/// Install fake LLVM tools under `<dir>/llvm/bin`.
pub fn fake_llvm(dir: &Path) -> PathBuf {
    let home = dir.join("llvm");
    let bin = home.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    for name in ["clang", "clang++", "ld.lld"] {
        std::fs::write(bin.join(name), FAKE_CLANG).unwrap();
    }
    home
}

/// A tool for `x86_64-unknown-linux-gnu` that runs the fake LLVM tools.
pub fn fake_tool(dir: &Path, flavor: Flavor) -> Tool {
    let mut config = ToolConfig::default();
    config.toolchain.llvm_home = Some(fake_llvm(dir));
    config.toolchain.launcher = Some(PathBuf::from("/bin/sh"));
    Tool::from_config(
        config,
        TargetTriple::new("x86_64-unknown-linux-gnu"),
        flavor,
        Distribution::new(dir.join("dist")),
    )
}

/// Lines of the fake tools' call log.
pub fn fake_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("llvm/bin/calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Indexer reporting fixed headers.
///
/// Without explicit headers every requested include is reported as found
/// at its own name.
#[derive(Debug, Clone, Default)]
pub struct FakeIndexer {
    pub headers: Vec<FoundHeader>,
    pub modules: ModulesInfo,
    /// Fail every call with this message.
    pub fail: Option<String>,
}

impl Indexer for FakeIndexer {
    fn build_native_index(
        &self,
        library: &NativeLibrary,
        _verbose: bool,
    ) -> Result<(NativeIndex, Compilation)> {
        if let Some(message) = &self.fail {
            bail!("{}", message);
        }
        let headers = if self.headers.is_empty() {
            library
                .compilation
                .includes
                .iter()
                .map(|include| FoundHeader {
                    name: include.header_path.clone(),
                    path: PathBuf::from(&include.header_path),
                    only_via_dependent_module: false,
                })
                .collect()
        } else {
            self.headers.clone()
        };
        let index = NativeIndex::classify(library, &headers, serde_json::Value::Null);
        Ok((index, library.compilation.clone()))
    }

    fn modules_info(&self, _compilation: &Compilation, _modules: &[String]) -> Result<ModulesInfo> {
        if let Some(message) = &self.fail {
            bail!("{}", message);
        }
        Ok(self.modules.clone())
    }
}

/// Emitter writing a trivial stub source and returning fixed metadata.
#[derive(Debug, Default)]
pub struct FakeEmitter {
    pub metadata: Vec<u8>,
    /// Driver options of every run.
    pub runs: RefCell<Vec<DriverOptions>>,
}

impl FakeEmitter {
    pub fn with_metadata(metadata: &[u8]) -> Self {
        FakeEmitter {
            metadata: metadata.to_vec(),
            runs: RefCell::new(Vec::new()),
        }
    }
}

impl StubEmitter for FakeEmitter {
    fn run(&self, context: &StubContext<'_>, options: &DriverOptions) -> Result<StubOutput> {
        let headers: Vec<&str> = context
            .native_index
            .included_headers
            .iter()
            .map(|h| h.as_str())
            .collect();
        write_string(
            &options.c_stubs_path,
            &format!("/* stubs for {} */\n", headers.join(" ")),
        )?;
        self.runs.borrow_mut().push(options.clone());

        Ok(match context.mode {
            GenerationMode::SourceCode => StubOutput::SourceCode,
            GenerationMode::Metadata => StubOutput::Metadata(self.metadata.clone()),
        })
    }
}
