//! ResolvedLibraries - the ordered dependency closure.
//!
//! Once created, the closure is read-only for the rest of the run.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::library::ResolvedLibrary;
use crate::resolver::errors::ResolveError;

/// Libraries in topological order (dependencies before dependents).
#[derive(Debug, Clone, Default)]
pub struct ResolvedLibraries {
    libraries: Vec<ResolvedLibrary>,
}

impl ResolvedLibraries {
    /// Order a set of libraries so every library follows its dependencies.
    ///
    /// `depends` entries naming libraries outside the set are ignored; the
    /// resolver guarantees the set is closed before calling this.
    pub fn order(libraries: Vec<ResolvedLibrary>) -> Result<Self, ResolveError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let mut name_to_node: HashMap<&str, NodeIndex> = HashMap::new();

        for (index, library) in libraries.iter().enumerate() {
            let node = graph.add_node(index);
            name_to_node.insert(library.unique_name.as_str(), node);
        }

        // Edge dep -> dependent, so a topological walk yields dependencies first.
        for library in &libraries {
            let dependent = name_to_node[library.unique_name.as_str()];
            for dep in &library.depends {
                if let Some(&dep_node) = name_to_node.get(dep.as_str()) {
                    if !graph.contains_edge(dep_node, dependent) {
                        graph.add_edge(dep_node, dependent, ());
                    }
                }
            }
        }
        drop(name_to_node);

        let order = toposort(&graph, None).map_err(|cycle| {
            let start = graph[cycle.node_id()];
            ResolveError::CycleDetected {
                libraries: cycle_path(&libraries, start),
            }
        })?;

        let mut slots: Vec<Option<ResolvedLibrary>> = libraries.into_iter().map(Some).collect();
        let ordered = order
            .into_iter()
            .filter_map(|node| slots[graph[node]].take())
            .collect();

        Ok(ResolvedLibraries { libraries: ordered })
    }

    /// Every resolved library, in topological order.
    pub fn full_list(&self) -> &[ResolvedLibrary] {
        &self.libraries
    }

    pub fn into_vec(self) -> Vec<ResolvedLibrary> {
        self.libraries
    }

    /// Unique names in topological order.
    pub fn names(&self) -> Vec<String> {
        self.libraries.iter().map(|l| l.unique_name.clone()).collect()
    }

    pub fn get(&self, unique_name: &str) -> Option<&ResolvedLibrary> {
        self.libraries.iter().find(|l| l.unique_name == unique_name)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

/// Follow `depends` from `start` until a library repeats.
fn cycle_path(libraries: &[ResolvedLibrary], start: usize) -> Vec<String> {
    let by_name: HashMap<&str, &ResolvedLibrary> = libraries
        .iter()
        .map(|l| (l.unique_name.as_str(), l))
        .collect();

    let mut path = vec![libraries[start].unique_name.clone()];
    let mut current = &libraries[start];
    while let Some(next) = current
        .depends
        .iter()
        .find_map(|d| by_name.get(d.as_str()).copied())
    {
        let repeated = path.contains(&next.unique_name);
        path.push(next.unique_name.clone());
        if repeated {
            break;
        }
        current = next;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::ManifestProperties;

    fn library(name: &str, depends: &[&str]) -> ResolvedLibrary {
        let mut manifest = ManifestProperties::new();
        manifest.insert("unique_name", name);
        manifest.insert("depends", depends.join(" "));
        ResolvedLibrary::from_manifest(format!("/libs/{}", name), name, manifest)
    }

    fn position(resolved: &ResolvedLibraries, name: &str) -> usize {
        resolved.names().iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let resolved = ResolvedLibraries::order(vec![
            library("app", &["net", "posix"]),
            library("net", &["posix", "stdlib"]),
            library("posix", &["stdlib"]),
            library("stdlib", &[]),
        ])
        .unwrap();

        for lib in resolved.full_list() {
            for dep in &lib.depends {
                assert!(position(&resolved, dep) < position(&resolved, &lib.unique_name));
            }
        }
        assert_eq!(resolved.len(), 4);
    }

    #[test]
    fn test_cycle_is_reported() {
        let err = ResolvedLibraries::order(vec![library("a", &["b"]), library("b", &["a"])])
            .unwrap_err();

        match err {
            ResolveError::CycleDetected { libraries } => {
                assert!(libraries.len() >= 3);
                assert_eq!(libraries.first(), libraries.last());
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
