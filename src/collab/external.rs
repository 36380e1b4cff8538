//! Collaborators implemented by external programs.
//!
//! Each call runs `<program> <args...> <action>` with a JSON request on
//! stdin and reads a JSON response from stdout. Actions:
//!
//! - `index`: `{compilation, exclude_system_libs, verbose}` to
//!   `{headers: [FoundHeader], compilation?, symbols?}`
//! - `modules`: `{compilation, modules}` to [`ModulesInfo`]
//! - `emit`: the stub context and [`DriverOptions`] to
//!   `{kind: "sourcecode" | "metadata", manifest?}`; metadata is written to
//!   `options.metadata_path`.

use std::cell::RefCell;
use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::collab::{
    forward_declaration_properties, DriverOptions, FoundHeader, Indexer, InteropConfiguration,
    ModulesInfo, NativeIndex, StubContext, StubEmitter, StubOutput,
};
use crate::core::config::{Compilation, NativeLibrary};
use crate::core::target::{Flavor, GenerationMode};
use crate::util::config::CommandSettings;
use crate::util::process::ProcessBuilder;

fn call<Req, Resp>(command: &CommandSettings, action: &str, request: &Req) -> Result<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let input = serde_json::to_vec(request).context("failed to encode request")?;
    let cmd = ProcessBuilder::new(&command.program)
        .args(&command.args)
        .arg(action)
        .stdin(input);
    tracing::debug!("calling {}", cmd.display_command());

    let output = cmd.exec()?;
    if !output.success() {
        bail!(
            "`{}` exited with code {:?}\n{}",
            cmd.display_command(),
            output.status.code(),
            output.lines.join("\n")
        );
    }

    serde_json::from_slice(&output.stdout)
        .with_context(|| format!("invalid response from `{}`", cmd.display_command()))
}

/// Header indexer run as an external program.
#[derive(Debug, Clone)]
pub struct ExternalIndexer {
    command: CommandSettings,
}

impl ExternalIndexer {
    pub fn new(command: CommandSettings) -> Self {
        ExternalIndexer { command }
    }
}

#[derive(Serialize)]
struct IndexRequest<'a> {
    compilation: &'a Compilation,
    exclude_system_libs: bool,
    verbose: bool,
}

#[derive(Deserialize)]
struct IndexResponse {
    headers: Vec<FoundHeader>,
    #[serde(default)]
    compilation: Option<Compilation>,
    #[serde(default)]
    symbols: serde_json::Value,
}

#[derive(Serialize)]
struct ModulesRequest<'a> {
    compilation: &'a Compilation,
    modules: &'a [String],
}

impl Indexer for ExternalIndexer {
    fn build_native_index(
        &self,
        library: &NativeLibrary,
        verbose: bool,
    ) -> Result<(NativeIndex, Compilation)> {
        let response: IndexResponse = call(
            &self.command,
            "index",
            &IndexRequest {
                compilation: &library.compilation,
                exclude_system_libs: library.exclude_system_libs,
                verbose,
            },
        )?;

        let index = NativeIndex::classify(library, &response.headers, response.symbols);
        let compilation = response
            .compilation
            .unwrap_or_else(|| library.compilation.clone());
        Ok((index, compilation))
    }

    fn modules_info(&self, compilation: &Compilation, modules: &[String]) -> Result<ModulesInfo> {
        call(
            &self.command,
            "modules",
            &ModulesRequest {
                compilation,
                modules,
            },
        )
    }
}

/// Stub emitter run as an external program.
#[derive(Debug)]
pub struct ExternalEmitter {
    command: CommandSettings,
    /// Manifest entries returned by the last run.
    reported: RefCell<BTreeMap<String, String>>,
}

impl ExternalEmitter {
    pub fn new(command: CommandSettings) -> Self {
        ExternalEmitter {
            command,
            reported: RefCell::new(BTreeMap::new()),
        }
    }
}

#[derive(Serialize)]
struct EmitRequest<'a> {
    configuration: &'a InteropConfiguration,
    included_headers: Vec<&'a str>,
    /// Imported header to owning package.
    imported_headers: BTreeMap<&'a str, &'a str>,
    symbols: &'a serde_json::Value,
    flavor: Flavor,
    mode: GenerationMode,
    lib_name: &'a str,
    options: &'a DriverOptions,
}

#[derive(Deserialize)]
struct EmitResponse {
    kind: GenerationMode,
    #[serde(default)]
    manifest: BTreeMap<String, String>,
}

impl StubEmitter for ExternalEmitter {
    fn run(&self, context: &StubContext<'_>, options: &DriverOptions) -> Result<StubOutput> {
        let index = context.native_index;
        let request = EmitRequest {
            configuration: &context.configuration,
            included_headers: index.included_headers.iter().map(|h| h.as_str()).collect(),
            imported_headers: index
                .imported_headers
                .iter()
                .map(|(h, info)| (h.as_str(), info.package.as_str()))
                .collect(),
            symbols: &index.symbols,
            flavor: context.flavor,
            mode: context.mode,
            lib_name: context.lib_name,
            options,
        };

        let response: EmitResponse = call(&self.command, "emit", &request)?;
        *self.reported.borrow_mut() = response.manifest;

        match response.kind {
            GenerationMode::SourceCode => Ok(StubOutput::SourceCode),
            GenerationMode::Metadata => {
                let metadata = std::fs::read(&options.metadata_path).with_context(|| {
                    format!("emitter wrote no metadata to {}", options.metadata_path.display())
                })?;
                Ok(StubOutput::Metadata(metadata))
            }
        }
    }

    fn manifest_properties(&self, context: &StubContext<'_>) -> BTreeMap<String, String> {
        let mut properties = forward_declaration_properties(context);
        properties.extend(self.reported.borrow().clone());
        properties
    }
}
