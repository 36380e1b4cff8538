//! High-level operations.
//!
//! This module contains the interop pipeline and the steps it is built from:
//! caller arguments, configuration assembly and packaging.

pub mod args;
pub mod assemble;
pub mod interop;
pub mod package;

pub use args::{as_arg_list, parse_key_value_pairs, InteropArguments, InternalInteropOptions};
pub use assemble::{resolve_libraries, Assembler};
pub use interop::{library_output_path, parse_flavor, Interop, InteropOutput, InteropResult};
pub use package::create_interop_library;
