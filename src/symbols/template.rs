use serde::{Deserialize, Serialize};

use super::{AggregateKind, SymbolId, Type};

/// Kind of a declared template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateParam {
    Type,
    Value,
    Alias,
    /// Variadic pack; it absorbs every remaining argument.
    Tuple,
}

/// The single member a template declares, when it declares exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateMember {
    Aggregate(AggregateKind),
    Function,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDecl {
    pub params: Vec<TemplateParam>,
    #[serde(default)]
    pub one_member: Option<TemplateMember>,
}

impl TemplateDecl {
    #[must_use]
    pub fn new(params: Vec<TemplateParam>) -> Self {
        Self {
            params,
            one_member: None,
        }
    }

    #[must_use]
    pub fn with_member(mut self, member: TemplateMember) -> Self {
        self.one_member = Some(member);
        self
    }
}

/// One argument of a template instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateArg {
    Type(Type),
    /// Constant expression; `value` holds the bit pattern, reinterpreted as
    /// unsigned when `ty` is an unsigned integral type.
    Value { ty: Type, value: i64 },
    /// Alias to a function, template or other declaration.
    Symbol(SymbolId),
    /// Alias to a variable (`&var` in C++).
    Variable(SymbolId),
}

/// A template bound to concrete arguments. Its eponymous member is a child
/// symbol carrying the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInstance {
    pub template: SymbolId,
    pub args: Vec<TemplateArg>,
}
