//! Assemble the build configuration from a definition file and overrides.
//!
//! Every constraint on the inputs is checked here, before the indexer or the
//! compiler is started.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::builder::invoker::{macro_redefinitions, NO_MACRO_REDEFINITION_WARNING};
use crate::builder::overlay::overlay_compiler_flags;
use crate::builder::toolchain::Tool;
use crate::collab::Indexer;
use crate::core::config::{
    BuildConfiguration, Compilation, ForeignExceptionMode, IncludeInfo, NativeLibrary,
};
use crate::core::def_file::DefFile;
use crate::core::error::{InteropError, Result};
use crate::core::filter::{HeaderExclusionPolicy, HeaderFilter, HeaderInclusionPolicy};
use crate::core::language::Language;
use crate::core::target::{Flavor, GenerationMode, LIBRARY_SUFFIX};
use crate::ops::args::{InteropArguments, InternalInteropOptions};
use crate::resolver::Imports;
use crate::util::fs::absolutize;
use crate::util::temp::TempFiles;

/// Builds the [`BuildConfiguration`] for one run.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'a> {
    def: &'a DefFile,
    args: &'a InteropArguments,
    options: &'a InternalInteropOptions,
    tool: &'a Tool,
}

impl<'a> Assembler<'a> {
    pub fn new(
        def: &'a DefFile,
        args: &'a InteropArguments,
        options: &'a InternalInteropOptions,
        tool: &'a Tool,
    ) -> Self {
        Assembler {
            def,
            args,
            options,
            tool,
        }
    }

    /// Package name segments.
    ///
    /// Taken from the caller's package, else the definition file's `package`,
    /// else derived from the definition file name (`org.sample.def` becomes
    /// `sample.org`).
    pub fn fq_parts(&self) -> Result<Vec<String>> {
        let package = self
            .args
            .pkg
            .clone()
            .or_else(|| self.def.config.package_name());
        if let Some(package) = package {
            return Ok(package.split('.').map(str::to_string).collect());
        }

        match self.def.file_name() {
            Some(name) => Ok(name.split('.').rev().skip(1).map(str::to_string).collect()),
            None => Err(InteropError::config(
                "either a definition file or a package name must be provided",
            )),
        }
    }

    /// Base name of the native stubs.
    pub fn lib_name(&self, fq_parts: &[String]) -> String {
        self.options
            .cstubs_name
            .clone()
            .unwrap_or_else(|| format!("{}stubs", fq_parts.concat()))
    }

    /// Module name: the caller's, else the output file name without the
    /// library suffix.
    pub fn module_name(&self) -> String {
        if let Some(name) = &self.args.module_name {
            return name.clone();
        }
        let file_name = Path::new(&self.args.output)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.args.output.clone());
        file_name
            .strip_suffix(LIBRARY_SUFFIX)
            .map(str::to_string)
            .unwrap_or(file_name)
    }

    /// The mode actually used. Metadata is not available for the JVM flavor.
    pub fn effective_mode(&self) -> GenerationMode {
        match (self.args.mode, self.tool.flavor()) {
            (GenerationMode::Metadata, Flavor::Jvm) => {
                tracing::warn!(
                    "metadata mode isn't supported for the jvm flavor, falling back to sourcecode"
                );
                GenerationMode::SourceCode
            }
            (mode, _) => mode,
        }
    }

    /// Library search paths, made absolute against the project directory.
    pub fn library_paths(&self) -> Vec<String> {
        self.def
            .config
            .library_paths()
            .into_iter()
            .chain(self.args.library_path.iter().cloned())
            .map(|path| match &self.args.project_dir {
                Some(project_dir) if Path::new(&path).is_relative() => {
                    let joined = absolutize(project_dir, Path::new(&path));
                    std::path::absolute(&joined)
                        .unwrap_or(joined)
                        .display()
                        .to_string()
                }
                _ => path,
            })
            .collect()
    }

    /// Static libraries from the definition file, then the caller's.
    pub fn static_libraries(&self) -> Vec<String> {
        let mut libraries = self.def.config.static_libraries();
        libraries.extend(self.args.static_library.iter().cloned());
        libraries
    }

    /// Build the library description handed to the indexer.
    ///
    /// Module-based libraries ask the indexer for the modules' headers.
    pub fn native_library(
        &self,
        imports: Rc<Imports>,
        temp: &TempFiles,
        indexer: &dyn Indexer,
    ) -> Result<NativeLibrary> {
        let def = &self.def.config;
        let language = Language::select(def.language().as_deref())?;

        let mut headers = def.headers();
        headers.extend(self.args.header.iter().cloned());

        let mut compiler_opts = def.compiler_opts();
        compiler_opts.extend(self.tool.default_compiler_opts_for_language(language));
        compiler_opts.extend(self.args.expanded_compiler_options());
        compiler_opts.extend(overlay_compiler_flags(
            &self.args.header_filter_additional_search_prefix,
            self.def,
            temp,
        )?);
        compiler_opts.push(NO_MACRO_REDEFINITION_WARNING.to_string());

        let mut compiler_args = language.default_compiler_args();
        compiler_args.extend(compiler_opts);
        compiler_args.extend(self.tool.platform_compiler_opts());

        let mut preamble = self.def.def_header_lines.clone();
        preamble.extend(macro_redefinitions());

        let mut compilation = Compilation {
            includes: headers.iter().map(|h| IncludeInfo::header(h.clone())).collect(),
            additional_preamble_lines: preamble,
            compiler_args,
            language,
        };

        let modules = def.modules();
        let header_filter = if modules.is_empty() {
            if !headers.is_empty() && compilation.compiler_args.iter().any(|a| a == "-fmodules") {
                return Err(InteropError::config(
                    "headers are not supported in -fmodules mode",
                ));
            }
            HeaderFilter::NameBased {
                policy: HeaderInclusionPolicy::new(&def.header_filter(), &def.exclude_filter())?,
                exclude_dependent_modules: def.exclude_dependent_modules(),
            }
        } else {
            check_modules(language, &headers, &def.header_filter())?;
            let info = indexer
                .modules_info(&compilation, &modules)
                .map_err(InteropError::Indexer)?;
            compilation.includes = info.top_level_headers;
            HeaderFilter::Predefined {
                own_headers: info.own_headers,
                modules: info.modules,
            }
        };

        Ok(NativeLibrary {
            compilation,
            exclude_system_libs: def.exclude_system_libs(),
            header_filter,
            header_exclusion_policy: HeaderExclusionPolicy::new(imports),
            sysroot: self.tool.sysroot(),
        })
    }

    /// Assemble the full configuration.
    pub fn assemble(
        &self,
        imports: Rc<Imports>,
        temp: &TempFiles,
        indexer: &dyn Indexer,
    ) -> Result<BuildConfiguration> {
        let def = &self.def.config;
        let flavor = self.tool.flavor();

        if flavor == Flavor::Native && self.args.linker_options_set {
            tracing::warn!(
                "linker options are not supported for the native flavor; add them to the .def file or to the final link instead"
            );
        }

        let entry_points = def.entry_points();
        if entry_points.len() > 1 {
            return Err(InteropError::config(format!(
                "at most one 'entryPoint' may be specified, got {}",
                entry_points.join(", ")
            )));
        }

        let foreign_exception_mode = self
            .args
            .foreign_exception_mode
            .clone()
            .or_else(|| def.foreign_exception_mode())
            .map(|mode| mode.parse::<ForeignExceptionMode>())
            .transpose()?;

        let static_libraries = self.static_libraries();
        let library_paths = self.library_paths();
        let static_library_files = resolve_libraries(&static_libraries, &library_paths)?;
        if flavor == Flavor::Native {
            if let Some(missing) = self.args.compile_source.iter().find(|s| !s.is_file()) {
                return Err(InteropError::MissingInput(missing.clone()));
            }
        }

        let fq_parts = self.fq_parts()?;
        let lib_name = self.lib_name(&fq_parts);
        let mode = self.effective_mode();
        let library = self.native_library(imports, temp, indexer)?;

        let mut linker_opts = def.linker_opts();
        linker_opts.extend(self.tool.default_compiler_opts_for_language(library.language()));
        linker_opts.extend(self.args.expanded_linker_options());

        let linker_name = self.args.linker.clone().unwrap_or_else(|| def.linker());

        tracing::debug!(
            "assembled {} ({}, {}) with {} compiler args",
            fq_parts.join("."),
            flavor,
            mode,
            library.compiler_args().len()
        );

        Ok(BuildConfiguration {
            target: self.tool.target().clone(),
            flavor,
            mode,
            library,
            fq_parts,
            lib_name,
            module_name: self.module_name(),
            entry_point: entry_points.into_iter().next(),
            excluded_functions: def.excluded_functions().into_iter().collect(),
            excluded_macros: def.excluded_macros().into_iter().collect(),
            strict_enums: def.strict_enums().into_iter().collect(),
            non_strict_enums: def.non_strict_enums().into_iter().collect(),
            no_string_conversion: def.no_string_conversion().into_iter().collect(),
            export_forward_declarations: def.export_forward_declarations(),
            disable_designated_initializer_checks: def.disable_designated_initializer_checks(),
            static_libraries,
            static_library_files,
            library_paths,
            linker: self.tool.llvm_tool(&linker_name),
            linker_opts,
            foreign_exception_mode,
        })
    }
}

fn check_modules(language: Language, headers: &[String], header_filter: &[String]) -> Result<()> {
    if language != Language::ObjectiveC {
        return Err(InteropError::config(
            "'modules' are supported only when 'language = Objective-C'",
        ));
    }
    if !headers.is_empty() {
        return Err(InteropError::config(
            "'headers' and 'modules' can't be specified at the same time",
        ));
    }
    if !header_filter.is_empty() {
        return Err(InteropError::config(
            "'headerFilter' is not supported together with 'modules'",
        ));
    }
    Ok(())
}

/// Locate static libraries: the first `<path>/<lib>` that exists wins.
pub fn resolve_libraries(libraries: &[String], library_paths: &[String]) -> Result<Vec<PathBuf>> {
    libraries
        .iter()
        .map(|library| {
            library_paths
                .iter()
                .map(|dir| Path::new(dir).join(library))
                .find(|candidate| candidate.exists())
                .ok_or_else(|| {
                    InteropError::config(format!(
                        "Could not find '{}' binary in neither of {:?}",
                        library, library_paths
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::TargetTriple;
    use crate::collab::ModulesInfo;
    use crate::test_support::FakeIndexer;
    use crate::resolver::Distribution;
    use crate::util::config::ToolConfig;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn tool(flavor: Flavor) -> Tool {
        let mut config = ToolConfig::default();
        config.toolchain.llvm_home = Some(PathBuf::from("/opt/llvm"));
        config.toolchain.compiler_opts = vec!["-fPIC".to_string()];
        config
            .languages
            .insert("C".to_string(), vec!["-std=c11".to_string()]);
        Tool::from_config(
            config,
            TargetTriple::new("x86_64-unknown-linux-gnu"),
            flavor,
            Distribution::new("/opt/bindery"),
        )
    }

    fn options() -> InternalInteropOptions {
        InternalInteropOptions::new("/out/generated", "/out/natives")
    }

    fn assemble(def: &str, args: &InteropArguments, flavor: Flavor) -> Result<BuildConfiguration> {
        let def = DefFile::parse(def, &TargetTriple::new("x86_64-unknown-linux-gnu").substitutions());
        let tool = tool(flavor);
        let options = options();
        let temp = TempFiles::new("test", None).unwrap();
        Assembler::new(&def, args, &options, &tool).assemble(
            Rc::new(Imports::empty()),
            &temp,
            &FakeIndexer::default(),
        )
    }

    fn pkg_args() -> InteropArguments {
        InteropArguments {
            pkg: Some("org.sample".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_compiler_args_order() {
        let args = InteropArguments {
            compiler_options: vec!["-DCALLER".to_string()],
            header: vec!["extra.h".to_string()],
            ..pkg_args()
        };
        let config = assemble(
            "headers = foo.h\ncompilerOpts = -DDEF\n---\nint x;\n",
            &args,
            Flavor::Native,
        )
        .unwrap();

        assert_eq!(
            config.compiler_args(),
            &[
                "-DDEF",
                "-std=c11",
                "-DCALLER",
                NO_MACRO_REDEFINITION_WARNING,
                "-fPIC",
            ]
        );
        let headers: Vec<_> = config.includes().iter().map(|i| i.header_path.as_str()).collect();
        assert_eq!(headers, vec!["foo.h", "extra.h"]);
        assert_eq!(config.preamble_lines()[0], "int x;");
        assert!(config
            .preamble_lines()
            .contains(&"#define __TIME__ \"__TIME__\"".to_string()));
    }

    #[test]
    fn test_names() {
        let config = assemble("headers = foo.h\n", &pkg_args(), Flavor::Native).unwrap();
        assert_eq!(config.package_name(), "org.sample");
        assert_eq!(config.lib_name(), "orgsamplestubs");
        assert_eq!(config.module_name(), "nativelib");
        assert_eq!(config.linker(), Path::new("/opt/llvm/bin/clang"));

        let args = InteropArguments {
            output: "out/zlib.bindlib".to_string(),
            linker: Some("ld.lld".to_string()),
            ..pkg_args()
        };
        let config = assemble("package = ignored.pkg\nlinker = gold\n", &args, Flavor::Native).unwrap();
        assert_eq!(config.package_name(), "org.sample");
        assert_eq!(config.module_name(), "zlib");
        assert_eq!(config.linker(), Path::new("/opt/llvm/bin/ld.lld"));
    }

    #[test]
    fn test_package_from_def_file_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("org.sample.def");
        std::fs::write(&path, "headers = foo.h\n").unwrap();
        let def = DefFile::load(Some(&path), &[]).unwrap();
        let args = InteropArguments::default();
        let options = options();
        let tool = tool(Flavor::Native);

        let parts = Assembler::new(&def, &args, &options, &tool).fq_parts().unwrap();
        assert_eq!(parts, vec!["sample", "org"]);
    }

    #[test]
    fn test_no_def_and_no_pkg_is_rejected() {
        let err = assemble("", &InteropArguments::default(), Flavor::Native).unwrap_err();
        assert!(matches!(err, InteropError::Config(_)));
    }

    #[test]
    fn test_cstubs_name_override() {
        let def = DefFile::parse("", &[]);
        let args = pkg_args();
        let mut options = options();
        options.cstubs_name = Some("custom".to_string());
        let tool = tool(Flavor::Jvm);
        let assembler = Assembler::new(&def, &args, &options, &tool);
        assert_eq!(assembler.lib_name(&assembler.fq_parts().unwrap()), "custom");
    }

    #[test]
    fn test_metadata_falls_back_for_jvm() {
        let config = assemble("headers = foo.h\n", &pkg_args(), Flavor::Jvm).unwrap();
        assert_eq!(config.mode(), GenerationMode::SourceCode);

        let config = assemble("headers = foo.h\n", &pkg_args(), Flavor::Native).unwrap();
        assert_eq!(config.mode(), GenerationMode::Metadata);
    }

    #[test]
    fn test_modules_require_objective_c() {
        let err = assemble("modules = Foundation\n", &pkg_args(), Flavor::Native).unwrap_err();
        assert!(err.to_string().contains("Objective-C"));
    }

    #[test]
    fn test_headers_and_modules_are_exclusive() {
        let err = assemble(
            "language = Objective-C\nmodules = Foundation\nheaders = foo.h\n",
            &pkg_args(),
            Flavor::Native,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'headers' and 'modules'"));

        let err = assemble(
            "language = Objective-C\nmodules = Foundation\nheaderFilter = *.h\n",
            &pkg_args(),
            Flavor::Native,
        )
        .unwrap_err();
        assert!(err.to_string().contains("headerFilter"));
    }

    #[test]
    fn test_flat_headers_with_fmodules_rejected() {
        let err = assemble(
            "headers = foo.h\ncompilerOpts = -fmodules\n",
            &pkg_args(),
            Flavor::Native,
        )
        .unwrap_err();
        assert!(err.to_string().contains("-fmodules"));
    }

    #[test]
    fn test_modules_use_indexer_headers() {
        let def = DefFile::parse("language = Objective-C\nmodules = Foundation\n", &[]);
        let args = pkg_args();
        let options = options();
        let tool = tool(Flavor::Native);
        let temp = TempFiles::new("test", None).unwrap();
        let indexer = FakeIndexer {
            modules: ModulesInfo {
                own_headers: ["Foundation/NSString.h".to_string()].into_iter().collect(),
                modules: vec!["Foundation".to_string()],
                top_level_headers: vec![IncludeInfo {
                    header_path: "Foundation/Foundation.h".to_string(),
                    module_name: Some("Foundation".to_string()),
                }],
            },
            ..Default::default()
        };

        let config = Assembler::new(&def, &args, &options, &tool)
            .assemble(Rc::new(Imports::empty()), &temp, &indexer)
            .unwrap();

        assert_eq!(config.includes()[0].header_path, "Foundation/Foundation.h");
        match config.header_filter() {
            HeaderFilter::Predefined { own_headers, modules } => {
                assert_eq!(
                    own_headers,
                    &["Foundation/NSString.h".to_string()]
                        .into_iter()
                        .collect::<BTreeSet<_>>()
                );
                assert_eq!(modules, &vec!["Foundation".to_string()]);
            }
            other => panic!("unexpected filter: {:?}", other),
        }
    }

    #[test]
    fn test_entry_point_at_most_one() {
        let config = assemble("entryPoint = main\n", &pkg_args(), Flavor::Native).unwrap();
        assert_eq!(config.entry_point(), Some("main"));

        let err = assemble("entryPoint = a b\n", &pkg_args(), Flavor::Native).unwrap_err();
        assert!(matches!(err, InteropError::Config(_)));
    }

    #[test]
    fn test_foreign_exception_mode_caller_wins() {
        let args = InteropArguments {
            foreign_exception_mode: Some("objc-wrap".to_string()),
            ..pkg_args()
        };
        let config = assemble("foreignExceptionMode = terminate\n", &args, Flavor::Native).unwrap();
        assert_eq!(
            config.foreign_exception_mode(),
            Some(ForeignExceptionMode::ObjCWrap)
        );

        let err = assemble("foreignExceptionMode = rethrow\n", &pkg_args(), Flavor::Native)
            .unwrap_err();
        assert!(matches!(err, InteropError::Config(_)));
    }

    #[test]
    fn test_linker_opts_and_boolean_flags() {
        let args = InteropArguments {
            linker_options: vec!["-lcaller".to_string()],
            linker_options_set: true,
            ..pkg_args()
        };
        let config = assemble(
            "linkerOpts = -ldef\ndisableDesignatedInitializerChecks = true false\nexcludeSystemLibs = false true\n",
            &args,
            Flavor::Jvm,
        )
        .unwrap();

        assert_eq!(config.linker_opts(), &["-ldef", "-std=c11", "-lcaller"]);
        assert!(!config.disable_designated_initializer_checks());
        assert!(config.exclude_system_libs());
    }

    #[test]
    fn test_library_paths_relative_to_project() {
        let args = InteropArguments {
            project_dir: Some(PathBuf::from("/work/project")),
            library_path: vec!["libs".to_string(), "/abs/libs".to_string()],
            ..pkg_args()
        };
        let config = assemble("libraryPaths = vendor\n", &args, Flavor::Native).unwrap();
        assert_eq!(
            config.library_paths(),
            &["/work/project/vendor", "/work/project/libs", "/abs/libs"]
        );
    }

    #[test]
    fn test_static_libraries_resolved_up_front() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("libfoo.a"), "").unwrap();
        let args = InteropArguments {
            library_path: vec![tmp.path().display().to_string()],
            ..pkg_args()
        };

        let config = assemble("staticLibraries = libfoo.a\n", &args, Flavor::Native).unwrap();
        assert_eq!(config.static_library_files(), &[tmp.path().join("libfoo.a")]);

        let err = assemble("staticLibraries = libmissing.a\n", &args, Flavor::Native).unwrap_err();
        assert!(matches!(err, InteropError::Config(_)));
    }

    #[test]
    fn test_missing_source_is_reported_for_native_only() {
        let args = InteropArguments {
            compile_source: vec![PathBuf::from("/nonexistent/helper.cpp")],
            ..pkg_args()
        };

        let err = assemble("headers = foo.h\n", &args, Flavor::Native).unwrap_err();
        assert!(matches!(err, InteropError::MissingInput(path) if path.ends_with("helper.cpp")));
        assert!(assemble("headers = foo.h\n", &args, Flavor::Jvm).is_ok());
    }

    #[test]
    fn test_resolve_libraries() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();
        std::fs::write(second.join("libfoo.a"), "").unwrap();
        std::fs::write(first.join("libbar.a"), "").unwrap();
        std::fs::write(second.join("libbar.a"), "").unwrap();
        let paths = vec![first.display().to_string(), second.display().to_string()];

        let resolved =
            resolve_libraries(&["libfoo.a".to_string(), "libbar.a".to_string()], &paths).unwrap();
        assert_eq!(resolved, vec![second.join("libfoo.a"), first.join("libbar.a")]);

        let err = resolve_libraries(&["libnope.a".to_string()], &paths).unwrap_err();
        assert!(err.to_string().contains("Could not find 'libnope.a'"));
    }
}
