//! Interfaces to the header indexer and the stub emitter.
//!
//! Parsing native declarations and generating binding sources are not done
//! here. The pipeline talks to both collaborators through the [`Indexer`] and
//! [`StubEmitter`] traits; [`external`] implements them on top of external
//! programs speaking JSON.

pub mod external;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::config::{BuildConfiguration, Compilation, IncludeInfo, NativeLibrary};
use crate::core::filter::{HeaderCandidate, HeaderFilterDecision};
use crate::core::library::{HeaderId, PackageInfo};
use crate::core::manifest;
use crate::core::target::{Flavor, GenerationMode, TargetTriple};
use crate::resolver::Imports;

pub use external::{ExternalEmitter, ExternalIndexer};

/// A header the indexer reached while parsing the preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundHeader {
    /// Path relative to the include directory it was found through.
    pub name: String,
    /// Resolved path on disk.
    pub path: PathBuf,
    #[serde(default)]
    pub only_via_dependent_module: bool,
}

/// Result of indexing the library's headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeIndex {
    /// Headers bound by this library, sorted.
    pub included_headers: Vec<HeaderId>,
    /// Headers bound by dependencies, with their owners.
    pub imported_headers: BTreeMap<HeaderId, PackageInfo>,
    /// Symbol table, opaque to the pipeline.
    pub symbols: serde_json::Value,
}

impl NativeIndex {
    /// Sort found headers into own and imported ones.
    ///
    /// Excluded headers are dropped; looking up an imported header records
    /// its owner as a required library.
    pub fn classify(
        library: &NativeLibrary,
        headers: &[FoundHeader],
        symbols: serde_json::Value,
    ) -> NativeIndex {
        let mut own = BTreeSet::new();
        let mut imported_headers = BTreeMap::new();

        for header in headers {
            let id = library.header_id(&header.path);
            let decision = library.decide(HeaderCandidate {
                name: &header.name,
                id: &id,
                only_via_dependent_module: header.only_via_dependent_module,
            });
            match decision {
                HeaderFilterDecision::Own => {
                    own.insert(id);
                }
                HeaderFilterDecision::Imported(info) => {
                    imported_headers.insert(id, info);
                }
                HeaderFilterDecision::Excluded => {}
            }
        }

        NativeIndex {
            included_headers: own.into_iter().collect(),
            imported_headers,
            symbols,
        }
    }
}

/// Headers and modules of an Objective-C module-based library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulesInfo {
    pub own_headers: BTreeSet<String>,
    pub modules: Vec<String>,
    pub top_level_headers: Vec<IncludeInfo>,
}

/// Parses native headers.
pub trait Indexer {
    /// Index the library, returning the index and the compilation actually used.
    fn build_native_index(
        &self,
        library: &NativeLibrary,
        verbose: bool,
    ) -> Result<(NativeIndex, Compilation)>;

    /// Headers belonging to the given modules.
    fn modules_info(&self, compilation: &Compilation, modules: &[String]) -> Result<ModulesInfo>;
}

/// The binding-relevant part of the build configuration.
#[derive(Debug, Clone, Serialize)]
pub struct InteropConfiguration {
    pub library: Compilation,
    pub pkg_name: String,
    pub excluded_functions: BTreeSet<String>,
    pub excluded_macros: BTreeSet<String>,
    pub strict_enums: BTreeSet<String>,
    pub non_strict_enums: BTreeSet<String>,
    pub no_string_conversion: BTreeSet<String>,
    pub export_forward_declarations: Vec<String>,
    pub disable_designated_initializer_checks: bool,
    pub target: TargetTriple,
}

impl InteropConfiguration {
    pub fn new(config: &BuildConfiguration, compilation: Compilation) -> Self {
        InteropConfiguration {
            library: compilation,
            pkg_name: config.package_name(),
            excluded_functions: config.excluded_functions().clone(),
            excluded_macros: config.excluded_macros().clone(),
            strict_enums: config.strict_enums().clone(),
            non_strict_enums: config.non_strict_enums().clone(),
            no_string_conversion: config.no_string_conversion().clone(),
            export_forward_declarations: config.export_forward_declarations().to_vec(),
            disable_designated_initializer_checks: config.disable_designated_initializer_checks(),
            target: config.target().clone(),
        }
    }
}

/// Everything the stub emitter sees.
pub struct StubContext<'a> {
    pub configuration: InteropConfiguration,
    pub native_index: &'a NativeIndex,
    pub imports: &'a Imports,
    pub flavor: Flavor,
    pub mode: GenerationMode,
    pub lib_name: &'a str,
}

/// Where the emitter writes its outputs.
#[derive(Debug, Clone, Serialize)]
pub struct DriverOptions {
    pub entry_point: Option<String>,
    pub module_name: String,
    /// Native stub source the pipeline compiles afterwards.
    pub c_stubs_path: PathBuf,
    /// Root directory for generated binding sources.
    pub generated_dir: PathBuf,
    /// Package path segments under `generated_dir`.
    pub fq_parts: Vec<String>,
    /// Where serialized metadata is written in metadata mode.
    pub metadata_path: PathBuf,
    pub dump_bridges: bool,
}

/// What the stub emitter produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubOutput {
    /// Binding sources were written under the generated directory.
    SourceCode,
    /// Serialized binding metadata.
    Metadata(Vec<u8>),
}

/// Generates binding stubs from an index.
pub trait StubEmitter {
    fn run(&self, context: &StubContext<'_>, options: &DriverOptions) -> Result<StubOutput>;

    /// Properties the emitter contributes to the library manifest.
    fn manifest_properties(&self, context: &StubContext<'_>) -> BTreeMap<String, String> {
        forward_declaration_properties(context)
    }
}

/// The `exportForwardDeclarations` manifest entry.
pub fn forward_declaration_properties(context: &StubContext<'_>) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    properties.insert(
        manifest::EXPORT_FORWARD_DECLARATIONS.to_string(),
        context.configuration.export_forward_declarations.join(" "),
    );
    properties
}
