//! Header inclusion and exclusion policy.
//!
//! Every header the indexer encounters gets exactly one
//! [`HeaderFilterDecision`]: bound by this library, dropped, or imported from
//! a dependency that already binds it. Decisions depend only on immutable
//! inputs, so asking twice in one run gives the same answer.

use std::collections::BTreeSet;
use std::rc::Rc;

use glob::{MatchOptions, Pattern};

use crate::core::error::{InteropError, Result};
use crate::core::library::{HeaderId, PackageInfo};
use crate::resolver::Imports;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compile glob patterns, reporting the first invalid one.
pub fn compile_globs(globs: &[String]) -> Result<Vec<Pattern>> {
    globs
        .iter()
        .map(|g| {
            Pattern::new(g)
                .map_err(|e| InteropError::config(format!("invalid glob pattern `{}`: {}", g, e)))
        })
        .collect()
}

/// Whether any pattern matches `name`.
///
/// `*` stays within one path component; `**` crosses directories.
pub fn matches_any(patterns: &[Pattern], name: &str) -> bool {
    patterns.iter().any(|p| p.matches_with(name, MATCH_OPTIONS))
}

/// Name-based inclusion: `headerFilter` and `excludeFilter` globs.
#[derive(Debug, Clone, Default)]
pub struct HeaderInclusionPolicy {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl HeaderInclusionPolicy {
    pub fn new(header_filter_globs: &[String], exclude_filter_globs: &[String]) -> Result<Self> {
        Ok(HeaderInclusionPolicy {
            include: compile_globs(header_filter_globs)?,
            exclude: compile_globs(exclude_filter_globs)?,
        })
    }

    /// Whether a header (by its include-relative name) belongs to the library.
    ///
    /// Without include globs everything not excluded is included.
    pub fn includes(&self, header_name: &str) -> bool {
        if matches_any(&self.exclude, header_name) {
            return false;
        }
        self.include.is_empty() || matches_any(&self.include, header_name)
    }
}

/// How headers are assigned to the library being built.
#[derive(Debug, Clone)]
pub enum HeaderFilter {
    /// Filter by header name.
    NameBased {
        policy: HeaderInclusionPolicy,
        exclude_dependent_modules: bool,
    },
    /// Headers of explicitly listed Objective-C modules.
    Predefined {
        own_headers: BTreeSet<String>,
        modules: Vec<String>,
    },
}

/// Drops headers whose declarations a dependency already binds.
#[derive(Debug, Clone)]
pub struct HeaderExclusionPolicy {
    imports: Rc<Imports>,
}

impl HeaderExclusionPolicy {
    pub fn new(imports: Rc<Imports>) -> Self {
        HeaderExclusionPolicy { imports }
    }

    /// The dependency owning `header`, if any.
    pub fn owner(&self, header: &HeaderId) -> Option<PackageInfo> {
        self.imports.get_package(header)
    }

    pub fn excludes(&self, header: &HeaderId) -> bool {
        self.imports.is_imported(header)
    }

    pub fn imports(&self) -> &Imports {
        &self.imports
    }
}

/// A header as seen by the indexer.
#[derive(Debug, Clone, Copy)]
pub struct HeaderCandidate<'a> {
    /// Path relative to the include directory it was found through.
    pub name: &'a str,
    pub id: &'a HeaderId,
    /// Reachable only through a transitively included module.
    pub only_via_dependent_module: bool,
}

/// Where the declarations of a header end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderFilterDecision {
    /// Bound by the library being built.
    Own,
    /// Dropped.
    Excluded,
    /// Bound by a dependency; referenced, never re-emitted.
    Imported(PackageInfo),
}

impl HeaderFilter {
    /// Decide the fate of a header.
    pub fn decide(
        &self,
        exclusion: &HeaderExclusionPolicy,
        header: HeaderCandidate<'_>,
    ) -> HeaderFilterDecision {
        let included = match self {
            HeaderFilter::NameBased {
                policy,
                exclude_dependent_modules,
            } => {
                policy.includes(header.name)
                    && !(*exclude_dependent_modules && header.only_via_dependent_module)
            }
            HeaderFilter::Predefined { own_headers, .. } => own_headers.contains(header.name),
        };

        if !included {
            return HeaderFilterDecision::Excluded;
        }

        match exclusion.owner(header.id) {
            Some(info) => HeaderFilterDecision::Imported(info),
            None => HeaderFilterDecision::Own,
        }
    }
}
