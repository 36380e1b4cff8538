//! Native compilation.
//!
//! This module drives clang: it prepares the toolchain, exposes extra
//! header prefixes through a virtual overlay and compiles and links stubs
//! deterministically.

pub mod invoker;
pub mod overlay;
pub mod toolchain;

pub use invoker::{macro_redefinitions, CompilationInvoker, PREDEFINED_MACROS};
pub use overlay::overlay_compiler_flags;
pub use toolchain::Tool;
