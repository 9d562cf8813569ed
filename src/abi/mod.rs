//! C++ ABI name mangling.
//!
//! Each call builds a fresh encoder with private back-reference tables, so
//! independent symbols may be mangled from independent threads.

mod backref;
mod config;
mod error;
pub mod itanium;
pub mod msvc;

pub use config::{CppAbi, MangleConfig, PointerWidth};
pub use error::{MangleError, MangleErrorKind};

pub(crate) use error::MangleResult;

use crate::symbols::{BasicKind, Linkage, Symbol, SymbolId, SymbolKind, SymbolTable, Type, TypeKind};

/// Mangle one function or variable for the ABI selected by `config`.
///
/// # Errors
///
/// Returns a [`MangleError`] attributed to `id` when the declaration has no
/// C++ spelling. No partial name is ever produced.
pub fn mangle(table: &SymbolTable, id: SymbolId, config: &MangleConfig) -> Result<String, MangleError> {
    match config.abi {
        CppAbi::Itanium => itanium::mangle(table, id, config),
        CppAbi::Msvc { .. } => msvc::mangle(table, id, config),
    }
}

/// Mangle every candidate of [`SymbolTable::mangle_candidates`], stopping at
/// the first failure.
///
/// # Errors
///
/// Propagates the first [`MangleError`].
pub fn mangle_all(
    table: &SymbolTable,
    config: &MangleConfig,
) -> Result<Vec<(SymbolId, String)>, MangleError> {
    table
        .mangle_candidates()
        .into_iter()
        .map(|id| mangle(table, id, config).map(|mangled| (id, mangled)))
        .collect()
}

/// Look up a symbol that is about to be mangled and check its linkage.
pub(crate) fn entry_symbol(table: &SymbolTable, id: SymbolId) -> MangleResult<&Symbol> {
    let Some(symbol) = table.get(id) else {
        return Err(MangleError::new(
            MangleErrorKind::NotMangleable,
            format!("unknown symbol {id}"),
        ));
    };
    match symbol.linkage() {
        Some(Linkage::Cpp) => Ok(symbol),
        Some(other) => Err(MangleError::new(
            MangleErrorKind::LinkageMismatch,
            format!("symbol has {other:?} linkage, expected C++"),
        )),
        None => Err(MangleError::new(
            MangleErrorKind::NotMangleable,
            format!("`{}` is neither a function nor a variable", symbol.name),
        )),
    }
}

/// Scalar kind of a type usable as a template value argument.
pub(crate) fn integral_kind(table: &SymbolTable, ty: &Type) -> Option<BasicKind> {
    let kind = match &ty.kind {
        TypeKind::Basic(kind) => *kind,
        TypeKind::Enum(id) => match table.get(*id).map(|symbol| &symbol.kind) {
            Some(SymbolKind::Enum(decl)) => decl.base,
            _ => return None,
        },
        _ => return None,
    };
    kind.is_integral().then_some(kind)
}
