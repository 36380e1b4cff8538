//! Header ownership across resolved dependencies.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::library::{HeaderId, PackageInfo, ResolvedLibrary};

/// Which dependency already binds which header.
///
/// Built once per run from the resolved libraries. Lookups through
/// [`Imports::get_package`] record the owning library so the packaged
/// artifact only depends on libraries it actually references.
#[derive(Debug, Default)]
pub struct Imports {
    owners: BTreeMap<HeaderId, PackageInfo>,
    /// Unique names in resolution order.
    library_order: Vec<String>,
    required: RefCell<BTreeSet<String>>,
}

impl Imports {
    /// An empty table: nothing is imported.
    pub fn empty() -> Self {
        Imports::default()
    }

    /// Build the table from libraries in topological order.
    ///
    /// The list is walked dependents first; the first library to claim a
    /// header keeps it, so nearer dependencies win over farther ones.
    pub fn from_libraries(libraries: &[ResolvedLibrary]) -> Self {
        let mut owners = BTreeMap::new();

        for library in libraries.iter().rev() {
            // Libraries without a package identity carry no bindings.
            let Some(package) = &library.package else {
                continue;
            };
            for header in &library.included_headers {
                owners.entry(header.clone()).or_insert_with(|| PackageInfo {
                    package: package.clone(),
                    library: library.unique_name.clone(),
                });
            }
        }

        Imports {
            owners,
            library_order: libraries.iter().map(|l| l.unique_name.clone()).collect(),
            required: RefCell::new(BTreeSet::new()),
        }
    }

    /// Owner of a header, recording the owning library as required.
    pub fn get_package(&self, header: &HeaderId) -> Option<PackageInfo> {
        let info = self.owners.get(header)?;
        self.required.borrow_mut().insert(info.library.clone());
        Some(info.clone())
    }

    /// Whether a dependency owns the header, without recording anything.
    pub fn is_imported(&self, header: &HeaderId) -> bool {
        self.owners.contains_key(header)
    }

    /// Libraries referenced so far, in resolution order.
    pub fn required_libraries(&self) -> Vec<String> {
        let required = self.required.borrow();
        self.library_order
            .iter()
            .filter(|name| required.contains(*name))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
