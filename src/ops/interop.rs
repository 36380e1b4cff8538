//! The interop pipeline.
//!
//! One run assembles the configuration, resolves dependencies, has the
//! indexer and stub emitter do their work, compiles the stubs and then
//! either returns compiler flags (source code mode) or packages a library
//! (metadata mode).

use std::path::PathBuf;
use std::rc::Rc;

use crate::builder::invoker::CompilationInvoker;
use crate::builder::toolchain::Tool;
use crate::collab::{DriverOptions, Indexer, InteropConfiguration, StubContext, StubEmitter, StubOutput};
use crate::core::artifact::PackagedLibrary;
use crate::core::def_file::DefFile;
use crate::core::error::{InteropError, PrettyError, Result};
use crate::core::library::LibraryReference;
use crate::core::manifest;
use crate::core::target::{Flavor, LIBRARY_SUFFIX};
use crate::ops::args::{parse_key_value_pairs, InteropArguments, InternalInteropOptions};
use crate::ops::assemble::Assembler;
use crate::ops::package::create_interop_library;
use crate::resolver::{Imports, LibraryResolver, ResolveFlags};
use crate::util::fs::ensure_dir;
use crate::util::temp::TempFiles;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteropOutput {
    /// Flags for the compiler that builds the generated sources.
    Emitted(Vec<String>),
    /// Path of the packaged library.
    Packaged(PathBuf),
}

/// Result of [`Interop::run_reporting`].
pub type InteropResult = std::result::Result<InteropOutput, PrettyError>;

/// Parse a flavor name.
pub fn parse_flavor(name: &str) -> Result<Flavor> {
    if name.eq_ignore_ascii_case("wasm") {
        return Err(InteropError::config("the wasm flavor is not supported"));
    }
    name.parse::<Flavor>().map_err(InteropError::Config)
}

/// Where a metadata-mode library is written: the library suffix is added,
/// or stripped when writing an unpacked directory.
pub fn library_output_path(output: &str, nopack: bool) -> PathBuf {
    if nopack {
        PathBuf::from(output.strip_suffix(LIBRARY_SUFFIX).unwrap_or(output))
    } else if output.ends_with(LIBRARY_SUFFIX) {
        PathBuf::from(output)
    } else {
        PathBuf::from(format!("{}{}", output, LIBRARY_SUFFIX))
    }
}

/// Runs the pipeline with a given indexer and stub emitter.
pub struct Interop<'a> {
    indexer: &'a dyn Indexer,
    emitter: &'a dyn StubEmitter,
}

impl<'a> Interop<'a> {
    pub fn new(indexer: &'a dyn Indexer, emitter: &'a dyn StubEmitter) -> Self {
        Interop { indexer, emitter }
    }

    /// Run and convert any failure into a [`PrettyError`].
    pub fn run_reporting(
        &self,
        flavor: Flavor,
        args: &InteropArguments,
        options: &InternalInteropOptions,
    ) -> InteropResult {
        self.run(flavor, args, options)
            .map_err(|e| PrettyError::from_error(e, args.disable_exception_prettifier))
    }

    /// Run the pipeline.
    pub fn run(
        &self,
        flavor: Flavor,
        args: &InteropArguments,
        options: &InternalInteropOptions,
    ) -> Result<InteropOutput> {
        let overrides = parse_key_value_pairs(&args.override_properties);
        let tool = Tool::prepare(args.target.as_deref(), flavor, args.home.as_deref(), &overrides)?;
        let def = DefFile::load(args.def.as_deref(), &tool.substitutions())?;
        let assembler = Assembler::new(&def, args, options, &tool);

        let fq_parts = assembler.fq_parts()?;
        let lib_name = assembler.lib_name(&fq_parts);

        let resolver = LibraryResolver::new(
            args.repo.clone(),
            tool.distribution().clone(),
            tool.target().clone(),
        );
        let dependencies = match flavor {
            Flavor::Native => {
                let requested: Vec<LibraryReference> =
                    args.library.iter().map(|l| LibraryReference::new(l.clone())).collect();
                resolver
                    .resolve_with_dependencies(
                        &requested,
                        ResolveFlags {
                            no_std_lib: false,
                            no_default_libs: args.nodefaultlibs,
                            no_endorsed_libs: args.noendorsedlibs,
                        },
                    )?
                    .into_vec()
            }
            Flavor::Jvm => Vec::new(),
        };

        let temp = TempFiles::new(&lib_name, args.temp_dir.as_deref())?;
        let imports = Rc::new(Imports::from_libraries(&dependencies));
        let config = assembler.assemble(imports.clone(), &temp, self.indexer)?;

        tracing::info!("indexing {} for {}", config.package_name(), config.target());
        let (native_index, compilation) = self
            .indexer
            .build_native_index(config.library(), args.verbose)
            .map_err(InteropError::Indexer)?;
        tracing::debug!(
            "{} own headers, {} imported",
            native_index.included_headers.len(),
            native_index.imported_headers.len()
        );

        ensure_dir(&options.natives)?;
        let c_stubs = temp.create(&lib_name, &format!(".{}", config.language().source_file_extension()));

        let context = StubContext {
            configuration: InteropConfiguration::new(&config, compilation),
            native_index: &native_index,
            imports: &imports,
            flavor,
            mode: config.mode(),
            lib_name: &lib_name,
        };
        let driver_options = DriverOptions {
            entry_point: config.entry_point().map(str::to_string),
            module_name: config.module_name().to_string(),
            c_stubs_path: c_stubs.clone(),
            generated_dir: options.generated.clone(),
            fq_parts: fq_parts.clone(),
            metadata_path: temp.create(&lib_name, ".metadata"),
            dump_bridges: args.dump_bridges,
        };
        let output = self
            .emitter
            .run(&context, &driver_options)
            .map_err(InteropError::Emitter)?;

        let mut properties = def.manifest_addend_properties.clone();
        properties.insert(
            manifest::INCLUDED_HEADERS,
            native_index
                .included_headers
                .iter()
                .map(|h| h.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );
        properties.put_and_run_on_replace(manifest::PACKAGE, config.package_name(), |_, old, new| {
            tracing::warn!(
                "the package value `{}` specified in the .def file is overridden with explicit {}",
                old,
                new
            );
        });
        properties.insert(manifest::INTEROP, "true");
        if matches!(output, StubOutput::Metadata(_)) {
            properties.insert(manifest::IR_PROVIDER, manifest::INTEROP_IR_PROVIDER);
        }
        properties.extend(self.emitter.manifest_properties(&context));
        if let Some(mode) = config.foreign_exception_mode() {
            properties.insert(manifest::FOREIGN_EXCEPTION_MODE, mode.value());
        }
        if let Some(path) = &options.manifest {
            properties.store(path)?;
        }

        let invoker = CompilationInvoker::new(&tool, args.verbose);
        let compiler_args = &context.configuration.library.compiler_args;
        let native_output = match flavor {
            Flavor::Jvm => {
                let object =
                    invoker.compile_object(compiler_args, &c_stubs, &temp.create(&lib_name, ".o"))?;
                invoker.link_shared(
                    config.linker(),
                    object.path(),
                    &options.natives,
                    &lib_name,
                    config.linker_opts(),
                )?;
                object
            }
            Flavor::Native => invoker.emit_bitcode(
                compiler_args,
                config.language(),
                &c_stubs,
                &options.natives,
                &lib_name,
            )?,
        };

        let compiled = match flavor {
            Flavor::Native => invoker.compile_sources(
                &options.natives,
                &args.compile_source,
                &args.source_compile_options,
            )?,
            Flavor::Jvm => {
                if !args.compile_source.is_empty() {
                    tracing::warn!(
                        "auxiliary sources are only compiled for the native flavor; {} ignored",
                        args.compile_source.len()
                    );
                }
                Vec::new()
            }
        };

        match output {
            StubOutput::SourceCode => {
                let mut flags = Vec::new();
                for library in config.static_library_files() {
                    flags.push("-include-binary".to_string());
                    flags.push(library.display().to_string());
                }
                for artifact in &compiled {
                    flags.push("-native-library".to_string());
                    flags.push(artifact.path().display().to_string());
                }
                Ok(InteropOutput::Emitted(flags))
            }
            StubOutput::Metadata(metadata) => {
                let stdlib = resolver.resolve_with_dependencies(
                    &[],
                    ResolveFlags {
                        no_std_lib: false,
                        no_default_libs: true,
                        no_endorsed_libs: true,
                    },
                )?;
                let mut dependencies = stdlib.names();
                for name in imports.required_libraries() {
                    if !dependencies.contains(&name) {
                        dependencies.push(name);
                    }
                }

                let mut native_bitcode_files: Vec<PathBuf> =
                    compiled.iter().map(|a| a.path().to_path_buf()).collect();
                native_bitcode_files.push(native_output.path().to_path_buf());

                let library = PackagedLibrary {
                    metadata,
                    native_bitcode_files,
                    static_libraries: config.static_library_files().to_vec(),
                    target: config.target().clone(),
                    module_name: config.module_name().to_string(),
                    short_name: args.short_module_name.clone(),
                    library_version: args.library_version.clone(),
                    dependencies,
                    manifest: properties,
                };
                let output_path = library_output_path(&args.output, args.nopack);
                let path = create_interop_library(&library, &output_path, args.nopack)?;
                Ok(InteropOutput::Packaged(path))
            }
        }
    }
}
