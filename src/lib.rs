#![deny(clippy::all, clippy::pedantic, clippy::perf, clippy::suspicious)] // Catch correctness + perf + suspicious patterns early.
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Itanium and Microsoft Visual C++ symbol mangling for C++-linkage
//! declarations described by a [`symbols::SymbolTable`].
//!
//! ```
//! use cppmangle::abi::{self, MangleConfig};
//! use cppmangle::symbols::{FunctionDecl, FunctionType, SymbolId, SymbolTable, Type};
//!
//! let mut table = SymbolTable::new("app");
//! let foo = table.function(
//!     SymbolId::ROOT,
//!     "foo",
//!     FunctionDecl::new(FunctionType::new(Type::void(), Vec::new())),
//! );
//! assert_eq!(abi::mangle(&table, foo, &MangleConfig::itanium_linux64()).as_deref(), Ok("_Z3foov"));
//! assert_eq!(abi::mangle(&table, foo, &MangleConfig::msvc64()).as_deref(), Ok("?foo@@YAXXZ"));
//! ```

pub mod abi;
pub mod cli;
pub mod error;
pub mod logging;
pub mod symbols;
pub mod target;
pub mod version;

pub use abi::{CppAbi, MangleConfig, MangleError, MangleErrorKind, mangle};
pub use error::{Error, Result};
pub use target::Target;
