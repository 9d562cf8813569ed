use std::fmt;

use serde::{Deserialize, Serialize};

use super::{SymbolId, SymbolTable};

/// Type qualifier attached to a node of the type tree.
///
/// Only `Mutable` and `Const` have a C++ spelling; the remaining qualifiers
/// are rejected by every encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualifier {
    #[default]
    Mutable,
    Const,
    Immutable,
    Shared,
    SharedConst,
}

impl Qualifier {
    #[must_use]
    pub fn is_const(self) -> bool {
        matches!(self, Qualifier::Const | Qualifier::SharedConst)
    }

    /// Qualifiers with no C++ counterpart.
    #[must_use]
    pub fn is_unrepresentable(self) -> bool {
        matches!(
            self,
            Qualifier::Immutable | Qualifier::Shared | Qualifier::SharedConst
        )
    }

    fn prefix(self) -> Option<&'static str> {
        match self {
            Qualifier::Mutable => None,
            Qualifier::Const => Some("const"),
            Qualifier::Immutable => Some("immutable"),
            Qualifier::Shared => Some("shared"),
            Qualifier::SharedConst => Some("shared(const"),
        }
    }
}

/// Built-in scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicKind {
    Void,
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Int128,
    UInt128,
    Float32,
    Float64,
    Float80,
    /// UTF-8 code unit (`char`).
    Char,
    /// UTF-16 code unit, sized like `wchar_t` on Windows.
    WChar,
    /// UTF-32 code unit.
    DChar,
    Imaginary32,
    Imaginary64,
    Imaginary80,
    Complex32,
    Complex64,
    Complex80,
}

impl BasicKind {
    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            BasicKind::Bool
                | BasicKind::Int8
                | BasicKind::UInt8
                | BasicKind::Int16
                | BasicKind::UInt16
                | BasicKind::Int32
                | BasicKind::UInt32
                | BasicKind::Int64
                | BasicKind::UInt64
                | BasicKind::Int128
                | BasicKind::UInt128
                | BasicKind::Char
                | BasicKind::WChar
                | BasicKind::DChar
        )
    }

    #[must_use]
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicKind::Bool
                | BasicKind::UInt8
                | BasicKind::UInt16
                | BasicKind::UInt32
                | BasicKind::UInt64
                | BasicKind::UInt128
                | BasicKind::Char
                | BasicKind::WChar
                | BasicKind::DChar
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BasicKind::Void => "void",
            BasicKind::Bool => "bool",
            BasicKind::Int8 => "byte",
            BasicKind::UInt8 => "ubyte",
            BasicKind::Int16 => "short",
            BasicKind::UInt16 => "ushort",
            BasicKind::Int32 => "int",
            BasicKind::UInt32 => "uint",
            BasicKind::Int64 => "long",
            BasicKind::UInt64 => "ulong",
            BasicKind::Int128 => "cent",
            BasicKind::UInt128 => "ucent",
            BasicKind::Float32 => "float",
            BasicKind::Float64 => "double",
            BasicKind::Float80 => "real",
            BasicKind::Char => "char",
            BasicKind::WChar => "wchar",
            BasicKind::DChar => "dchar",
            BasicKind::Imaginary32 => "ifloat",
            BasicKind::Imaginary64 => "idouble",
            BasicKind::Imaginary80 => "ireal",
            BasicKind::Complex32 => "cfloat",
            BasicKind::Complex64 => "cdouble",
            BasicKind::Complex80 => "creal",
        }
    }
}

/// Calling/linkage convention of a function type or declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    D,
    C,
    #[default]
    Cpp,
    Windows,
    Pascal,
}

/// Trailing variadic marker of a parameter list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variadic {
    #[default]
    None,
    /// C-style `...`.
    C,
    /// Typesafe variadic (`T[] args...`).
    Typesafe,
}

impl Variadic {
    #[must_use]
    pub fn is_variadic(self) -> bool {
        !matches!(self, Variadic::None)
    }
}

/// Storage qualifier of a single parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStorage {
    #[default]
    Value,
    Ref,
    Out,
    Lazy,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub ty: Type,
    #[serde(default)]
    pub storage: ParamStorage,
}

impl Parameter {
    #[must_use]
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            storage: ParamStorage::Value,
        }
    }

    #[must_use]
    pub fn with_storage(ty: Type, storage: ParamStorage) -> Self {
        Self { ty, storage }
    }

    /// The type a C++ caller sees: `ref`/`out` become references and `lazy`
    /// becomes a pointer to a nullary function returning the declared type.
    #[must_use]
    pub fn passed_type(&self) -> Type {
        match self.storage {
            ParamStorage::Value => self.ty.clone(),
            ParamStorage::Ref | ParamStorage::Out => self.ty.clone().reference_to(),
            ParamStorage::Lazy => Type::function(FunctionType::new(self.ty.clone(), Vec::new()))
                .pointer_to(),
        }
    }
}

/// Signature of a function or function type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub ret: Type,
    #[serde(default)]
    pub params: Vec<Parameter>,
    #[serde(default)]
    pub variadic: Variadic,
    #[serde(default)]
    pub linkage: Linkage,
    #[serde(default)]
    pub returns_ref: bool,
}

impl FunctionType {
    #[must_use]
    pub fn new(ret: Type, params: Vec<Parameter>) -> Self {
        Self {
            ret,
            params,
            variadic: Variadic::None,
            linkage: Linkage::Cpp,
            returns_ref: false,
        }
    }

    #[must_use]
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    #[must_use]
    pub fn with_variadic(mut self, variadic: Variadic) -> Self {
        self.variadic = variadic;
        self
    }

    #[must_use]
    pub fn returning_ref(mut self) -> Self {
        self.returns_ref = true;
        self
    }

    /// Return type as written in C++ (`T&` for ref returns).
    #[must_use]
    pub fn effective_return(&self) -> Type {
        if self.returns_ref {
            self.ret.clone().reference_to()
        } else {
            self.ret.clone()
        }
    }
}

/// Shape of a type node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Basic(BasicKind),
    Pointer(Box<Type>),
    Reference(Box<Type>),
    StaticArray {
        element: Box<Type>,
        #[serde(default)]
        length: Option<u64>,
    },
    Vector {
        element: Box<Type>,
        lanes: u64,
    },
    Function(Box<FunctionType>),
    /// Struct or union declared by the referenced aggregate symbol.
    Struct(SymbolId),
    /// Reference-semantics class or interface.
    Class(SymbolId),
    Enum(SymbolId),
    DynamicArray(Box<Type>),
    AssociativeArray {
        key: Box<Type>,
        value: Box<Type>,
    },
    Delegate(Box<FunctionType>),
}

/// A node of the type tree. Equality is structural, which coincides with
/// identity for a frontend that interns its types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    pub kind: TypeKind,
    #[serde(default)]
    pub qualifier: Qualifier,
}

impl Type {
    #[must_use]
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            qualifier: Qualifier::Mutable,
        }
    }

    #[must_use]
    pub fn basic(kind: BasicKind) -> Self {
        Self::new(TypeKind::Basic(kind))
    }

    #[must_use]
    pub fn void() -> Self {
        Self::basic(BasicKind::Void)
    }

    #[must_use]
    pub fn struct_of(symbol: SymbolId) -> Self {
        Self::new(TypeKind::Struct(symbol))
    }

    #[must_use]
    pub fn class_of(symbol: SymbolId) -> Self {
        Self::new(TypeKind::Class(symbol))
    }

    #[must_use]
    pub fn enum_of(symbol: SymbolId) -> Self {
        Self::new(TypeKind::Enum(symbol))
    }

    #[must_use]
    pub fn function(signature: FunctionType) -> Self {
        Self::new(TypeKind::Function(Box::new(signature)))
    }

    #[must_use]
    pub fn static_array(element: Type, length: u64) -> Self {
        Self::new(TypeKind::StaticArray {
            element: Box::new(element),
            length: Some(length),
        })
    }

    #[must_use]
    pub fn vector(element: Type, lanes: u64) -> Self {
        Self::new(TypeKind::Vector {
            element: Box::new(element),
            lanes,
        })
    }

    #[must_use]
    pub fn pointer_to(self) -> Self {
        Self::new(TypeKind::Pointer(Box::new(self)))
    }

    #[must_use]
    pub fn reference_to(self) -> Self {
        Self::new(TypeKind::Reference(Box::new(self)))
    }

    #[must_use]
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = qualifier;
        self
    }

    #[must_use]
    pub fn const_of(self) -> Self {
        self.with_qualifier(Qualifier::Const)
    }

    /// Copy of this type with the top-level qualifier removed.
    #[must_use]
    pub fn mutable_of(&self) -> Self {
        self.clone().with_qualifier(Qualifier::Mutable)
    }

    #[must_use]
    pub fn is_const(&self) -> bool {
        self.qualifier.is_const()
    }

    #[must_use]
    pub fn display<'a>(&'a self, table: &'a SymbolTable) -> TypeDisplay<'a> {
        TypeDisplay { ty: self, table }
    }
}

/// Source-like rendering of a type for diagnostics.
pub struct TypeDisplay<'a> {
    ty: &'a Type,
    table: &'a SymbolTable,
}

impl TypeDisplay<'_> {
    fn nested<'b>(&'b self, ty: &'b Type) -> TypeDisplay<'b> {
        TypeDisplay {
            ty,
            table: self.table,
        }
    }

    fn write_params(&self, f: &mut fmt::Formatter<'_>, signature: &FunctionType) -> fmt::Result {
        f.write_str("(")?;
        for (index, param) in signature.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match param.storage {
                ParamStorage::Value => {}
                ParamStorage::Ref => f.write_str("ref ")?,
                ParamStorage::Out => f.write_str("out ")?,
                ParamStorage::Lazy => f.write_str("lazy ")?,
            }
            write!(f, "{}", self.nested(&param.ty))?;
        }
        if signature.variadic.is_variadic() {
            f.write_str(if signature.params.is_empty() { "..." } else { ", ..." })?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let closing = match self.ty.qualifier.prefix() {
            Some(prefix) => {
                write!(f, "{prefix}(")?;
                if matches!(self.ty.qualifier, Qualifier::SharedConst) {
                    "))"
                } else {
                    ")"
                }
            }
            None => "",
        };
        match &self.ty.kind {
            TypeKind::Basic(kind) => f.write_str(kind.as_str())?,
            TypeKind::Pointer(inner) => write!(f, "{}*", self.nested(inner))?,
            TypeKind::Reference(inner) => write!(f, "ref {}", self.nested(inner))?,
            TypeKind::StaticArray { element, length } => match length {
                Some(length) => write!(f, "{}[{length}]", self.nested(element))?,
                None => write!(f, "{}[0]", self.nested(element))?,
            },
            TypeKind::Vector { element, lanes } => {
                write!(f, "__vector({}[{lanes}])", self.nested(element))?;
            }
            TypeKind::Function(signature) => {
                write!(f, "{} function", self.nested(&signature.ret))?;
                self.write_params(f, signature)?;
            }
            TypeKind::Delegate(signature) => {
                write!(f, "{} delegate", self.nested(&signature.ret))?;
                self.write_params(f, signature)?;
            }
            TypeKind::Struct(id) | TypeKind::Class(id) | TypeKind::Enum(id) => {
                f.write_str(&self.table.qualified_name(*id))?;
            }
            TypeKind::DynamicArray(inner) => write!(f, "{}[]", self.nested(inner))?,
            TypeKind::AssociativeArray { key, value } => {
                write!(f, "{}[{}]", self.nested(value), self.nested(key))?;
            }
        }
        f.write_str(closing)
    }
}
