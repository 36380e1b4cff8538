//! Shared fakes for integration tests.
//!
//! Mirrors the crate's unit-test doubles using only the public API: an
//! in-process indexer and stub emitter, and a shell script standing in for
//! clang.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use bindery::collab::{
    DriverOptions, FoundHeader, Indexer, ModulesInfo, NativeIndex, StubContext, StubEmitter,
    StubOutput,
};
use bindery::core::config::{Compilation, NativeLibrary};
use bindery::{GenerationMode, InteropArguments, InternalInteropOptions};

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

/// Install fake LLVM tools under `<dir>/llvm/bin` and return the LLVM home.
pub fn fake_llvm(dir: &Path) -> PathBuf {
    let home = dir.join("llvm");
    let bin = home.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    for name in ["clang", "clang++", "ld.lld"] {
        std::fs::write(bin.join(name), FAKE_CLANG).unwrap();
    }
    home
}

/// Lines of the fake tools' call log.
pub fn fake_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("llvm/bin/calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Every requested include is found at its own name, plus any
/// `extra_headers` reached through them.
#[derive(Default)]
pub struct EchoIndexer {
    pub modules: ModulesInfo,
    pub extra_headers: Vec<String>,
}

impl Indexer for EchoIndexer {
    fn build_native_index(
        &self,
        library: &NativeLibrary,
        _verbose: bool,
    ) -> Result<(NativeIndex, Compilation)> {
        let headers: Vec<FoundHeader> = library
            .compilation
            .includes
            .iter()
            .map(|include| include.header_path.as_str())
            .chain(self.extra_headers.iter().map(String::as_str))
            .map(|name| FoundHeader {
                name: name.to_string(),
                path: PathBuf::from(name),
                only_via_dependent_module: false,
            })
            .collect();
        let index = NativeIndex::classify(library, &headers, serde_json::Value::Null);
        Ok((index, library.compilation.clone()))
    }

    fn modules_info(&self, _compilation: &Compilation, _modules: &[String]) -> Result<ModulesInfo> {
        Ok(self.modules.clone())
    }
}

/// Writes a one-line stub and returns fixed metadata.
pub struct FixedEmitter {
    pub metadata: Vec<u8>,
}

impl StubEmitter for FixedEmitter {
    fn run(&self, context: &StubContext<'_>, options: &DriverOptions) -> Result<StubOutput> {
        std::fs::write(&options.c_stubs_path, "int bindery_stub;\n")?;
        Ok(match context.mode {
            GenerationMode::SourceCode => StubOutput::SourceCode,
            GenerationMode::Metadata => StubOutput::Metadata(self.metadata.clone()),
        })
    }
}

/// A working directory with a fake toolchain and a definition file.
pub struct Workspace {
    pub tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fake_llvm(tmp.path());
        Workspace { tmp }
    }

    pub fn path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write an unpacked dependency library into `<dir>/<name>`.
    pub fn library(&self, dir: &str, name: &str, package: &str, headers: &[&str], depends: &[&str]) {
        let mut manifest = format!("unique_name={}\npackage={}\ninterop=true\n", name, package);
        manifest.push_str(&format!("includedHeaders={}\n", headers.join(" ")));
        if !depends.is_empty() {
            manifest.push_str(&format!("depends={}\n", depends.join(" ")));
        }
        self.write(&format!("{}/{}/manifest", dir, name), &manifest);
    }

    /// Arguments for a run of `def` on the fake toolchain.
    pub fn args(&self, def: &str) -> InteropArguments {
        InteropArguments {
            def: Some(self.write("foo.def", def)),
            pkg: Some("org.foo".to_string()),
            output: self.path().join("out/foo").display().to_string(),
            target: Some("x86_64-unknown-linux-gnu".to_string()),
            home: Some(self.path().join("home")),
            override_properties: vec![
                format!("llvm_home={}", self.path().join("llvm").display()),
                "launcher=/bin/sh".to_string(),
            ],
            ..Default::default()
        }
    }

    pub fn options(&self) -> InternalInteropOptions {
        InternalInteropOptions::new(self.path().join("generated"), self.path().join("natives"))
    }

    pub fn calls(&self) -> Vec<String> {
        fake_calls(self.path())
    }
}
