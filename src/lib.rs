//! Bindery - builds native interop libraries from C and Objective-C headers
//!
//! A definition file names the headers to bind. Bindery merges it with the
//! caller's overrides and the toolchain configuration, resolves the
//! libraries the bindings depend on, lets an indexer and a stub emitter
//! produce the bindings, compiles the C stubs deterministically and either
//! returns the flags to build the generated sources with or packages a
//! library for consumers.

pub mod builder;
pub mod collab;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

/// Fake collaborators, a fake clang and on-disk fixtures for unit tests.
#[cfg(test)]
pub mod test_support;

pub use crate::core::error::{ErrorKind, InteropError, PrettyError};
pub use crate::core::target::{Flavor, GenerationMode, TargetTriple};
pub use crate::ops::{Interop, InteropArguments, InteropOutput, InternalInteropOptions};
