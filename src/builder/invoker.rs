//! Deterministic compiler and linker invocations.
//!
//! Two runs over identical inputs must produce byte-identical outputs, so
//! nothing that depends on the build machine's clock or the temporary file
//! names may reach the compiled code:
//!
//! - predefined macros that expand to dates, times or file names are
//!   redefined to their own names in the preamble;
//! - bitcode is compiled from stdin, so the stub source path is never
//!   recorded in it.

use std::path::{Path, PathBuf};

use crate::builder::toolchain::Tool;
use crate::core::artifact::{ArtifactKind, CompilationArtifact};
use crate::core::error::{InteropError, Result};
use crate::core::language::Language;
use crate::core::target::shared_library_name;
use crate::util::fs::ensure_dir;
use crate::util::process::run_cmd;

/// Macros whose expansion depends on the build environment.
pub const PREDEFINED_MACROS: [&str; 7] = [
    "__DATE__",
    "__TIME__",
    "__TIMESTAMP__",
    "__FILE__",
    "__FILE_NAME__",
    "__BASE_FILE__",
    "__LINE__",
];

/// Silences clang's warning about the redefinitions below.
pub const NO_MACRO_REDEFINITION_WARNING: &str = "-Wno-builtin-macro-redefined";

/// `#define M "M"` for every predefined macro.
pub fn macro_redefinitions() -> Vec<String> {
    PREDEFINED_MACROS
        .iter()
        .map(|m| format!("#define {} \"{}\"", m, m))
        .collect()
}

/// Runs compile and link steps through a [`Tool`].
#[derive(Debug, Clone, Copy)]
pub struct CompilationInvoker<'a> {
    tool: &'a Tool,
    verbose: bool,
}

impl<'a> CompilationInvoker<'a> {
    pub fn new(tool: &'a Tool, verbose: bool) -> Self {
        CompilationInvoker { tool, verbose }
    }

    /// `clang <args> -c <source> -o <output>`
    pub fn compile_object(
        &self,
        compiler_args: &[String],
        source: &Path,
        output: &Path,
    ) -> Result<CompilationArtifact> {
        let cmd = self
            .tool
            .command(&self.tool.compiler())
            .args(compiler_args)
            .arg("-c")
            .arg(source)
            .arg("-o")
            .arg(output);
        run_cmd(&cmd, self.verbose)?;
        Ok(CompilationArtifact::new(output, ArtifactKind::Object))
    }

    /// `<linker> <object> -shared -o <natives>/<lib> <linker opts>`
    ///
    /// The output name follows the platform's shared library convention.
    pub fn link_shared(
        &self,
        linker: &Path,
        object: &Path,
        natives_dir: &Path,
        lib_name: &str,
        linker_opts: &[String],
    ) -> Result<CompilationArtifact> {
        ensure_dir(natives_dir)?;
        let output = natives_dir.join(shared_library_name(lib_name));
        let cmd = self
            .tool
            .command(linker)
            .arg(object)
            .arg("-shared")
            .arg("-o")
            .arg(&output)
            .args(linker_opts);
        run_cmd(&cmd, self.verbose)?;
        Ok(CompilationArtifact::new(output, ArtifactKind::SharedObject))
    }

    /// Compile the stub source to `<natives>/<lib>.bc`, reading it from stdin.
    pub fn emit_bitcode(
        &self,
        compiler_args: &[String],
        language: Language,
        source: &Path,
        natives_dir: &Path,
        lib_name: &str,
    ) -> Result<CompilationArtifact> {
        ensure_dir(natives_dir)?;
        let output = natives_dir.join(format!("{}.bc", lib_name));
        let cmd = self
            .tool
            .command(&self.tool.compiler())
            .args(compiler_args)
            .args(["-emit-llvm", "-x", language.clang_language_name(), "-c", "-", "-o"])
            .arg(&output)
            .args(["-Xclang", "-detailed-preprocessing-record"])
            .stdin_file(source);
        run_cmd(&cmd, self.verbose)?;
        Ok(CompilationArtifact::new(output, ArtifactKind::Bitcode))
    }

    /// Compile auxiliary sources to bitcode in `natives_dir`.
    ///
    /// Outputs are named `<index>_<stem>.bc` so equally named sources from
    /// different directories don't collide.
    pub fn compile_sources(
        &self,
        natives_dir: &Path,
        sources: &[PathBuf],
        source_compile_options: &[String],
    ) -> Result<Vec<CompilationArtifact>> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }
        ensure_dir(natives_dir)?;

        let mut artifacts = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            if !source.is_file() {
                return Err(InteropError::MissingInput(source.clone()));
            }
            let output = natives_dir.join(format!("{}_{}.bc", index, file_stem(source)));
            let cmd = self
                .tool
                .command(&self.tool.cxx_compiler())
                .args(source_compile_options)
                .arg(source)
                .args(["-emit-llvm", "-c", "-o"])
                .arg(&output);
            run_cmd(&cmd, self.verbose)?;
            artifacts.push(CompilationArtifact::new(output, ArtifactKind::Bitcode));
        }
        Ok(artifacts)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
