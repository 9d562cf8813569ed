//! Read-only declaration model consumed by the C++ mangler.
//!
//! A [`SymbolTable`] is an arena of declarations linked to their enclosing
//! scope. Index 0 is always the module root. The frontend that builds the
//! table owns it; encoders only borrow it for the duration of one run.

mod template;
mod types;

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use template::{TemplateArg, TemplateDecl, TemplateInstance, TemplateMember, TemplateParam};
pub use types::{
    BasicKind, FunctionType, Linkage, ParamStorage, Parameter, Qualifier, Type, TypeDisplay,
    TypeKind, Variadic,
};

/// Index of a declaration inside its [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const ROOT: SymbolId = SymbolId(0);

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declaration site used when attributing errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protection {
    Private,
    Package,
    Protected,
    #[default]
    Public,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Struct,
    Union,
    Class,
    Interface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub base: BasicKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionRole {
    #[default]
    Plain,
    Constructor,
    Destructor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub ty: FunctionType,
    #[serde(default)]
    pub role: FunctionRole,
    #[serde(default)]
    pub protection: Protection,
    /// Member declared `static` (no `this`).
    #[serde(default)]
    pub is_static: bool,
    /// Occupies a vtable slot.
    #[serde(default)]
    pub is_virtual: bool,
    /// `this` is const.
    #[serde(default)]
    pub is_const: bool,
}

impl FunctionDecl {
    #[must_use]
    pub fn new(ty: FunctionType) -> Self {
        Self {
            ty,
            role: FunctionRole::Plain,
            protection: Protection::Public,
            is_static: false,
            is_virtual: false,
            is_const: false,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: FunctionRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    #[must_use]
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn as_virtual(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    #[must_use]
    pub fn as_const(mut self) -> Self {
        self.is_const = true;
        self
    }
}

/// Storage class flags relevant to C++ linkage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClass {
    #[serde(default)]
    pub is_extern: bool,
    #[serde(default)]
    pub is_gshared: bool,
}

impl StorageClass {
    pub const EXTERN: StorageClass = StorageClass {
        is_extern: true,
        is_gshared: false,
    };
    pub const GSHARED: StorageClass = StorageClass {
        is_extern: false,
        is_gshared: true,
    };
    pub const THREAD_LOCAL: StorageClass = StorageClass {
        is_extern: false,
        is_gshared: false,
    };

    /// `extern` or `__gshared`: the only storage classes C++ can name.
    #[must_use]
    pub fn is_cpp_visible(self) -> bool {
        self.is_extern || self.is_gshared
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub ty: Type,
    #[serde(default)]
    pub linkage: Linkage,
    #[serde(default)]
    pub storage: StorageClass,
    #[serde(default)]
    pub protection: Protection,
}

impl VariableDecl {
    #[must_use]
    pub fn new(ty: Type, storage: StorageClass) -> Self {
        Self {
            ty,
            linkage: Linkage::Cpp,
            storage,
            protection: Protection::Public,
        }
    }

    #[must_use]
    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Module,
    Namespace,
    Aggregate(AggregateKind),
    Enum(EnumDecl),
    Template(TemplateDecl),
    Instance(TemplateInstance),
    Function(FunctionDecl),
    Variable(VariableDecl),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    #[serde(default)]
    pub parent: Option<SymbolId>,
    pub kind: SymbolKind,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl Symbol {
    #[must_use]
    pub fn linkage(&self) -> Option<Linkage> {
        match &self.kind {
            SymbolKind::Function(decl) => Some(decl.ty.linkage),
            SymbolKind::Variable(decl) => Some(decl.linkage),
            _ => None,
        }
    }
}

/// Arena of declarations plus the optional list of symbols to export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    #[serde(default)]
    exports: Vec<SymbolId>,
}

impl SymbolTable {
    /// Create a table whose root is a module named `module`.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            symbols: vec![Symbol {
                name: module.into(),
                parent: None,
                kind: SymbolKind::Module,
                location: None,
            }],
            exports: Vec::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> SymbolId {
        SymbolId::ROOT
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(index, symbol)| (SymbolId(index as u32), symbol))
    }

    pub fn insert(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub fn add(&mut self, parent: SymbolId, name: impl Into<String>, kind: SymbolKind) -> SymbolId {
        self.insert(Symbol {
            name: name.into(),
            parent: Some(parent),
            kind,
            location: None,
        })
    }

    pub fn namespace(&mut self, parent: SymbolId, name: impl Into<String>) -> SymbolId {
        self.add(parent, name, SymbolKind::Namespace)
    }

    pub fn aggregate(
        &mut self,
        parent: SymbolId,
        name: impl Into<String>,
        kind: AggregateKind,
    ) -> SymbolId {
        self.add(parent, name, SymbolKind::Aggregate(kind))
    }

    pub fn enumeration(
        &mut self,
        parent: SymbolId,
        name: impl Into<String>,
        base: BasicKind,
    ) -> SymbolId {
        self.add(parent, name, SymbolKind::Enum(EnumDecl { base }))
    }

    pub fn template(
        &mut self,
        parent: SymbolId,
        name: impl Into<String>,
        decl: TemplateDecl,
    ) -> SymbolId {
        self.add(parent, name, SymbolKind::Template(decl))
    }

    /// Instantiate `template` next to its declaration. The instance carries
    /// the template's name; add the eponymous member with `parent = instance`.
    pub fn instantiate(&mut self, template: SymbolId, args: Vec<TemplateArg>) -> SymbolId {
        let (name, parent) = match self.get(template) {
            Some(symbol) => (symbol.name.clone(), symbol.parent.unwrap_or(SymbolId::ROOT)),
            None => (String::new(), SymbolId::ROOT),
        };
        self.add(
            parent,
            name,
            SymbolKind::Instance(TemplateInstance { template, args }),
        )
    }

    pub fn function(
        &mut self,
        parent: SymbolId,
        name: impl Into<String>,
        decl: FunctionDecl,
    ) -> SymbolId {
        self.add(parent, name, SymbolKind::Function(decl))
    }

    pub fn variable(
        &mut self,
        parent: SymbolId,
        name: impl Into<String>,
        decl: VariableDecl,
    ) -> SymbolId {
        self.add(parent, name, SymbolKind::Variable(decl))
    }

    pub fn set_location(&mut self, id: SymbolId, location: SourceLocation) {
        if let Some(symbol) = self.symbols.get_mut(id.index()) {
            symbol.location = Some(location);
        }
    }

    pub fn export(&mut self, id: SymbolId) {
        self.exports.push(id);
    }

    #[must_use]
    pub fn exports(&self) -> &[SymbolId] {
        &self.exports
    }

    /// Symbols a driver should mangle: the explicit export list, or every
    /// function and variable declared with C++ linkage.
    #[must_use]
    pub fn mangle_candidates(&self) -> Vec<SymbolId> {
        if !self.exports.is_empty() {
            return self.exports.clone();
        }
        self.iter()
            .filter(|(_, symbol)| symbol.linkage() == Some(Linkage::Cpp))
            .map(|(id, _)| id)
            .collect()
    }

    #[must_use]
    pub fn parent(&self, id: SymbolId) -> Option<SymbolId> {
        self.get(id).and_then(|symbol| symbol.parent)
    }

    #[must_use]
    pub fn is_module(&self, id: SymbolId) -> bool {
        matches!(self.get(id).map(|s| &s.kind), Some(SymbolKind::Module))
    }

    #[must_use]
    pub fn as_instance(&self, id: SymbolId) -> Option<&TemplateInstance> {
        match self.get(id).map(|s| &s.kind) {
            Some(SymbolKind::Instance(instance)) => Some(instance),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_template(&self, id: SymbolId) -> Option<&TemplateDecl> {
        match self.get(id).map(|s| &s.kind) {
            Some(SymbolKind::Template(decl)) => Some(decl),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_function(&self, id: SymbolId) -> Option<&FunctionDecl> {
        match self.get(id).map(|s| &s.kind) {
            Some(SymbolKind::Function(decl)) => Some(decl),
            _ => None,
        }
    }

    /// The template instance `id` is the eponymous member of, if any.
    #[must_use]
    pub fn enclosing_instance(&self, id: SymbolId) -> Option<SymbolId> {
        self.parent(id)
            .filter(|parent| self.as_instance(*parent).is_some())
    }

    /// `true` when the parent scope is an aggregate (member declaration).
    #[must_use]
    pub fn is_member(&self, id: SymbolId) -> bool {
        self.parent(id).is_some_and(|parent| {
            matches!(
                self.get(parent).map(|s| &s.kind),
                Some(SymbolKind::Aggregate(_))
            )
        })
    }

    #[must_use]
    pub fn is_std_namespace(&self, id: SymbolId) -> bool {
        self.get(id).is_some_and(|symbol| {
            matches!(symbol.kind, SymbolKind::Namespace) && symbol.name == "std"
        })
    }

    /// C++-style qualified name, folding eponymous template members into
    /// their instance (`N::vector<int>::push_back`).
    #[must_use]
    pub fn qualified_name(&self, id: SymbolId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        let mut guard = self.symbols.len() + 1;
        while let Some(cursor) = current {
            guard = guard.saturating_sub(1);
            let Some(symbol) = self.get(cursor) else {
                parts.push(format!("<dangling {cursor}>"));
                break;
            };
            if guard == 0 || matches!(symbol.kind, SymbolKind::Module) {
                break;
            }
            let folded = self
                .enclosing_instance(cursor)
                .filter(|instance| self.get(*instance).is_some_and(|i| i.name == symbol.name));
            match folded {
                Some(instance) => {
                    parts.push(self.render_instance(instance));
                    current = self.parent(instance);
                }
                None => {
                    if self.as_instance(cursor).is_some() {
                        parts.push(self.render_instance(cursor));
                    } else {
                        parts.push(symbol.name.clone());
                    }
                    current = symbol.parent;
                }
            }
        }
        parts.reverse();
        parts.join("::")
    }

    fn render_instance(&self, id: SymbolId) -> String {
        let Some(symbol) = self.get(id) else {
            return String::new();
        };
        let Some(instance) = self.as_instance(id) else {
            return symbol.name.clone();
        };
        let args = instance
            .args
            .iter()
            .map(|arg| match arg {
                TemplateArg::Type(ty) => ty.display(self).to_string(),
                TemplateArg::Value { ty, value } => match &ty.kind {
                    TypeKind::Basic(kind) if kind.is_unsigned() => (*value as u64).to_string(),
                    _ => value.to_string(),
                },
                TemplateArg::Symbol(target) | TemplateArg::Variable(target) => {
                    self.qualified_name(*target)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}<{args}>", symbol.name)
    }

    /// Check that every id referenced by the table resolves and that scope
    /// chains terminate at the module root.
    ///
    /// # Errors
    ///
    /// Returns a [`DescriptorError`] naming the first inconsistency found.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        match self.symbols.first() {
            Some(symbol) if matches!(symbol.kind, SymbolKind::Module) => {}
            _ => return Err(DescriptorError::new("symbol #0 must be the module root")),
        }
        for (id, symbol) in self.iter().skip(1) {
            let Some(parent) = symbol.parent else {
                return Err(DescriptorError::new(format!(
                    "symbol {id} (`{}`) has no parent scope",
                    symbol.name
                )));
            };
            self.expect_symbol(parent, id)?;
            self.check_chain(id)?;
            match &symbol.kind {
                SymbolKind::Module => {
                    return Err(DescriptorError::new(format!(
                        "symbol {id} (`{}`) is a nested module",
                        symbol.name
                    )));
                }
                SymbolKind::Instance(instance) => {
                    if self.as_template(instance.template).is_none() {
                        return Err(DescriptorError::new(format!(
                            "instance {id} (`{}`) does not refer to a template declaration",
                            symbol.name
                        )));
                    }
                    for arg in &instance.args {
                        match arg {
                            TemplateArg::Type(ty) | TemplateArg::Value { ty, .. } => {
                                self.check_type(ty, id)?;
                            }
                            TemplateArg::Symbol(target) | TemplateArg::Variable(target) => {
                                self.expect_symbol(*target, id)?;
                            }
                        }
                    }
                }
                SymbolKind::Function(decl) => self.check_signature(&decl.ty, id)?,
                SymbolKind::Variable(decl) => self.check_type(&decl.ty, id)?,
                SymbolKind::Namespace
                | SymbolKind::Aggregate(_)
                | SymbolKind::Enum(_)
                | SymbolKind::Template(_) => {}
            }
        }
        for export in &self.exports {
            self.expect_symbol(*export, SymbolId::ROOT)?;
        }
        Ok(())
    }

    fn expect_symbol(&self, target: SymbolId, owner: SymbolId) -> Result<(), DescriptorError> {
        if self.get(target).is_some() {
            Ok(())
        } else {
            Err(DescriptorError::new(format!(
                "symbol {owner} refers to unknown symbol {target}"
            )))
        }
    }

    fn check_chain(&self, id: SymbolId) -> Result<(), DescriptorError> {
        let mut current = self.parent(id);
        for _ in 0..self.symbols.len() {
            match current {
                Some(cursor) if self.is_module(cursor) => return Ok(()),
                Some(cursor) => current = self.parent(cursor),
                None => break,
            }
        }
        Err(DescriptorError::new(format!(
            "scope chain of symbol {id} does not reach the module root"
        )))
    }

    fn check_signature(&self, signature: &FunctionType, owner: SymbolId) -> Result<(), DescriptorError> {
        self.check_type(&signature.ret, owner)?;
        for param in &signature.params {
            self.check_type(&param.ty, owner)?;
        }
        Ok(())
    }

    fn check_type(&self, ty: &Type, owner: SymbolId) -> Result<(), DescriptorError> {
        match &ty.kind {
            TypeKind::Basic(_) => Ok(()),
            TypeKind::Pointer(inner)
            | TypeKind::Reference(inner)
            | TypeKind::DynamicArray(inner)
            | TypeKind::StaticArray { element: inner, .. }
            | TypeKind::Vector { element: inner, .. } => self.check_type(inner, owner),
            TypeKind::AssociativeArray { key, value } => {
                self.check_type(key, owner)?;
                self.check_type(value, owner)
            }
            TypeKind::Function(signature) | TypeKind::Delegate(signature) => {
                self.check_signature(signature, owner)
            }
            TypeKind::Struct(target) | TypeKind::Class(target) => {
                match self.get(*target).map(|s| &s.kind) {
                    Some(SymbolKind::Aggregate(_)) => Ok(()),
                    _ => Err(DescriptorError::new(format!(
                        "symbol {owner} uses {target} as an aggregate type"
                    ))),
                }
            }
            TypeKind::Enum(target) => match self.get(*target).map(|s| &s.kind) {
                Some(SymbolKind::Enum(_)) => Ok(()),
                _ => Err(DescriptorError::new(format!(
                    "symbol {owner} uses {target} as an enum type"
                ))),
            },
        }
    }
}

/// A descriptor that is structurally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorError {
    message: String,
}

impl DescriptorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for DescriptorError {}
