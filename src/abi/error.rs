use std::error::Error as StdError;
use std::fmt;

use crate::symbols::{SourceLocation, SymbolId, SymbolTable};

/// Why a declaration has no C++ spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MangleErrorKind {
    /// `immutable` or `shared` reached the encoder.
    UnsupportedQualifier,
    /// Dynamic/associative arrays, delegates and other types without a C++ rule.
    UnsupportedType,
    /// Thread-local variables, or static arrays passed by value.
    UnsupportedStorage,
    /// Non-integral value arguments or aliases to unsupported declarations.
    UnsupportedTemplateArgument,
    /// The symbol was not declared with C++ linkage.
    LinkageMismatch,
    /// The id does not name a function or variable.
    NotMangleable,
}

impl MangleErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MangleErrorKind::UnsupportedQualifier => "unsupported qualifier",
            MangleErrorKind::UnsupportedType => "unsupported type",
            MangleErrorKind::UnsupportedStorage => "unsupported storage",
            MangleErrorKind::UnsupportedTemplateArgument => "unsupported template argument",
            MangleErrorKind::LinkageMismatch => "linkage mismatch",
            MangleErrorKind::NotMangleable => "not mangleable",
        }
    }
}

impl fmt::Display for MangleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal encoding failure, attributed to the declaration being mangled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MangleError {
    kind: MangleErrorKind,
    message: String,
    symbol: Option<String>,
    location: Option<SourceLocation>,
}

pub(crate) type MangleResult<T> = Result<T, MangleError>;

impl MangleError {
    pub fn new(kind: MangleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            symbol: None,
            location: None,
        }
    }

    pub(crate) fn unsupported_type(message: impl Into<String>) -> Self {
        Self::new(MangleErrorKind::UnsupportedType, message)
    }

    pub(crate) fn unsupported_qualifier(message: impl Into<String>) -> Self {
        Self::new(MangleErrorKind::UnsupportedQualifier, message)
    }

    pub(crate) fn unsupported_storage(message: impl Into<String>) -> Self {
        Self::new(MangleErrorKind::UnsupportedStorage, message)
    }

    pub(crate) fn unsupported_template_argument(message: impl Into<String>) -> Self {
        Self::new(MangleErrorKind::UnsupportedTemplateArgument, message)
    }

    /// Attach the declaration site of `id` unless one is already recorded.
    #[must_use]
    pub fn attributed_to(mut self, table: &SymbolTable, id: SymbolId) -> Self {
        if self.symbol.is_none() {
            self.symbol = Some(table.qualified_name(id));
            self.location = table.get(id).and_then(|symbol| symbol.location.clone());
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> MangleErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    #[must_use]
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }
}

impl fmt::Display for MangleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{location}: ")?;
        }
        match &self.symbol {
            Some(symbol) => write!(f, "cannot mangle `{symbol}`: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for MangleError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{SourceLocation, SymbolTable};

    #[test]
    fn display_includes_location_and_symbol() {
        let mut table = SymbolTable::new("app");
        let ns = table.namespace(table.root(), "N");
        table.set_location(ns, SourceLocation::new("app.d", 3, 1));
        let err = MangleError::unsupported_type("unsupported type `int[]`").attributed_to(&table, ns);
        assert_eq!(
            err.to_string(),
            "app.d:3:1: cannot mangle `N`: unsupported type `int[]`"
        );
        assert_eq!(err.kind(), MangleErrorKind::UnsupportedType);
    }

    #[test]
    fn first_attribution_wins() {
        let mut table = SymbolTable::new("app");
        let outer = table.namespace(table.root(), "outer");
        let inner = table.namespace(outer, "inner");
        let err = MangleError::unsupported_storage("static array by value")
            .attributed_to(&table, inner)
            .attributed_to(&table, outer);
        assert_eq!(err.symbol(), Some("outer::inner"));
        assert!(err.location().is_none());
    }
}
