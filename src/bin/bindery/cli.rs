//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

use bindery::core::target::{Flavor, GenerationMode};
use bindery::ops::args::DEFAULT_OUTPUT;
use bindery::ops::{parse_flavor, InteropArguments, InternalInteropOptions};

/// Bindery - builds native interop libraries from C and Objective-C headers
#[derive(Parser)]
#[command(name = "bindery")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Definition file describing the headers to bind
    #[arg(long)]
    pub def: Option<PathBuf>,

    /// Package of the generated bindings
    #[arg(long)]
    pub pkg: Option<String>,

    /// Output name
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: String,

    /// Target triple (defaults to the host)
    #[arg(long)]
    pub target: Option<String>,

    /// Binding flavor: jvm or native
    #[arg(long, default_value = "native", value_parser = flavor_value)]
    pub flavor: Flavor,

    /// Generation mode: sourcecode or metadata
    #[arg(long, default_value = "metadata")]
    pub mode: GenerationMode,

    /// Library the bindings depend on
    #[arg(short = 'l', long)]
    pub library: Vec<String>,

    /// Directory searched for libraries
    #[arg(short = 'r', long)]
    pub repo: Vec<PathBuf>,

    /// Don't link the default libraries
    #[arg(long)]
    pub nodefaultlibs: bool,

    /// Don't link the endorsed libraries
    #[arg(long)]
    pub noendorsedlibs: bool,

    /// Header added to the definition file's list
    #[arg(long)]
    pub header: Vec<String>,

    /// Additional search prefix for header filtering
    #[arg(long)]
    pub header_filter_additional_search_prefix: Vec<PathBuf>,

    /// Compiler options, space separated (`\ ` escapes a space)
    #[arg(long = "compiler-options", allow_hyphen_values = true)]
    pub compiler_options: Vec<String>,

    /// Linker options, space separated (`\ ` escapes a space)
    #[arg(long = "linker-options", allow_hyphen_values = true)]
    pub linker_options: Option<Vec<String>>,

    /// Static library embedded in the output
    #[arg(long)]
    pub static_library: Vec<String>,

    /// Directory searched for static libraries
    #[arg(long)]
    pub library_path: Vec<String>,

    /// Base directory for relative library paths
    #[arg(long)]
    pub project_dir: Option<PathBuf>,

    /// Extra source compiled to bitcode alongside the stubs
    #[arg(long)]
    pub compile_source: Vec<PathBuf>,

    /// Options for compiling extra sources
    #[arg(long = "source-compile-options", allow_hyphen_values = true)]
    pub source_compile_options: Vec<String>,

    /// Module name recorded in the library
    #[arg(long)]
    pub module_name: Option<String>,

    /// Short module name
    #[arg(long)]
    pub short_module_name: Option<String>,

    /// Library version
    #[arg(long)]
    pub library_version: Option<String>,

    /// Write an unpacked directory instead of an archive
    #[arg(long)]
    pub nopack: bool,

    /// Linker executable name
    #[arg(long)]
    pub linker: Option<String>,

    /// Foreign exception mode: terminate or objc-wrap
    #[arg(long)]
    pub foreign_exception_mode: Option<String>,

    /// Toolchain property override
    #[arg(long = "Xoverride-properties", value_name = "KEY=VALUE")]
    pub override_properties: Vec<String>,

    /// Directory for intermediate files (kept after the run)
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Ask the stub emitter to dump generated bridges
    #[arg(long)]
    pub dump_bridges: bool,

    /// Report the full error chain
    #[arg(long)]
    pub disable_exception_prettifier: bool,

    /// Distribution home
    #[arg(long, env = "BINDERY_HOME")]
    pub home: Option<PathBuf>,

    /// Directory for generated binding sources
    #[arg(long, default_value = "generated")]
    pub generated: PathBuf,

    /// Directory for native outputs
    #[arg(long, default_value = "natives")]
    pub natives: PathBuf,

    /// Where to store the manifest properties
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Stub library name
    #[arg(long)]
    pub cstubs_name: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// `--flavor` accepts what the pipeline accepts; wasm is named explicitly.
fn flavor_value(value: &str) -> Result<Flavor, String> {
    parse_flavor(value).map_err(|e| e.to_string())
}

impl Cli {
    /// Split into the pipeline's caller arguments and host options.
    pub fn into_arguments(self) -> (Flavor, InteropArguments, InternalInteropOptions) {
        let linker_options_set = self.linker_options.is_some();
        let args = InteropArguments {
            def: self.def,
            pkg: self.pkg,
            output: self.output,
            target: self.target,
            mode: self.mode,
            library: self.library,
            repo: self.repo,
            nodefaultlibs: self.nodefaultlibs,
            noendorsedlibs: self.noendorsedlibs,
            header: self.header,
            header_filter_additional_search_prefix: self.header_filter_additional_search_prefix,
            compiler_options: self.compiler_options,
            linker_options: self.linker_options.unwrap_or_default(),
            linker_options_set,
            static_library: self.static_library,
            library_path: self.library_path,
            project_dir: self.project_dir,
            compile_source: self.compile_source,
            source_compile_options: self.source_compile_options,
            verbose: self.verbose,
            module_name: self.module_name,
            short_module_name: self.short_module_name,
            library_version: self.library_version,
            nopack: self.nopack,
            linker: self.linker,
            foreign_exception_mode: self.foreign_exception_mode,
            override_properties: self.override_properties,
            temp_dir: self.temp_dir,
            dump_bridges: self.dump_bridges,
            disable_exception_prettifier: self.disable_exception_prettifier,
            home: self.home,
        };

        let mut options = InternalInteropOptions::new(self.generated, self.natives);
        options.manifest = self.manifest;
        options.cstubs_name = self.cstubs_name;

        (self.flavor, args, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linker_options_presence() {
        let cli = Cli::parse_from(["bindery", "--def", "foo.def", "--linker-options", ""]);
        let (flavor, args, _) = cli.into_arguments();
        assert_eq!(flavor, Flavor::Native);
        assert!(args.linker_options_set);

        let cli = Cli::parse_from(["bindery", "--def", "foo.def"]);
        let (_, args, options) = cli.into_arguments();
        assert!(!args.linker_options_set);
        assert_eq!(args.output, DEFAULT_OUTPUT);
        assert_eq!(options.natives, PathBuf::from("natives"));
    }

    #[test]
    fn test_repeated_options() {
        let cli = Cli::parse_from([
            "bindery",
            "--compiler-options",
            "-DA=1 -DB=2",
            "--compiler-options",
            "-DA=3",
            "--mode",
            "sourcecode",
            "-l",
            "posix",
        ]);
        let (_, args, _) = cli.into_arguments();
        assert_eq!(args.expanded_compiler_options(), vec!["-DA=1", "-DB=2", "-DA=3"]);
        assert_eq!(args.mode, GenerationMode::SourceCode);
        assert_eq!(args.library, vec!["posix"]);
    }

    #[test]
    fn test_flavor_is_typed() {
        let cli = Cli::parse_from(["bindery", "--flavor", "JVM"]);
        assert_eq!(cli.flavor, Flavor::Jvm);

        let err = Cli::try_parse_from(["bindery", "--flavor", "wasm"]).err().unwrap();
        assert!(err.to_string().contains("the wasm flavor is not supported"));

        let err = Cli::try_parse_from(["bindery", "--flavor", "python"]).err().unwrap();
        assert!(err.to_string().contains("unexpected flavor 'python'"));
    }
}
