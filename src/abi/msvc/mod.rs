//! Microsoft Visual C++ encoder, including the Digital Mars (DMC) dialect.
//!
//! Identifiers and top-level types are compressed through two tables of ten
//! slots each. Once a table is full, existing entries still compress but new
//! ones are written out in full.

use tracing::{debug, trace};

use super::backref::BackRefTable;
use super::{MangleConfig, MangleError, MangleErrorKind, MangleResult, entry_symbol, integral_kind};
use crate::symbols::{
    AggregateKind, BasicKind, FunctionDecl, FunctionRole, FunctionType, Linkage, Protection,
    SymbolId, SymbolKind, SymbolTable, TemplateArg, TemplateInstance, TemplateMember,
    TemplateParam, Type, TypeKind, VariableDecl, Variadic,
};

#[cfg(test)]
mod tests;

const LOG_TARGET: &str = "mangle.msvc";
const BACKREF_SLOTS: usize = 10;

/// Mangle a C++-linkage function or variable for the Microsoft ABI.
///
/// # Errors
///
/// Returns a [`MangleError`] attributed to `id` when any part of the
/// declaration has no Microsoft spelling.
pub fn mangle(table: &SymbolTable, id: SymbolId, config: &MangleConfig) -> Result<String, MangleError> {
    let mut mangler = Mangler::new(table, config);
    match mangler.mangle_symbol(id) {
        Ok(()) => {
            debug!(
                target: LOG_TARGET,
                symbol = %table.qualified_name(id),
                abi = config.abi.as_str(),
                mangled = %mangler.out,
                "mangled symbol"
            );
            Ok(mangler.out)
        }
        Err(err) => Err(err.attributed_to(table, id)),
    }
}

/// Per-call encoding context, copied into every recursive call.
#[derive(Debug, Clone, Copy, Default)]
struct Cx {
    /// Inside a pointer, reference or array; cv modifiers are explicit here.
    not_top: bool,
    /// Encoding a return type; the type table is neither read nor written.
    return_type: bool,
    /// Array element whose cv modifier was already written with the array.
    ignore_const: bool,
}

impl Cx {
    fn inner(self) -> Self {
        Self {
            not_top: true,
            ignore_const: false,
            ..self
        }
    }

    fn returning() -> Self {
        Self {
            return_type: true,
            ..Self::default()
        }
    }

    fn ignoring_const(self) -> Self {
        Self {
            ignore_const: true,
            ..self
        }
    }
}

struct Mangler<'a> {
    table: &'a SymbolTable,
    config: &'a MangleConfig,
    out: String,
    idents: BackRefTable<String>,
    types: BackRefTable<Type>,
}

impl<'a> Mangler<'a> {
    fn new(table: &'a SymbolTable, config: &'a MangleConfig) -> Self {
        Self {
            table,
            config,
            out: String::with_capacity(64),
            idents: BackRefTable::bounded(BACKREF_SLOTS),
            types: BackRefTable::bounded(BACKREF_SLOTS),
        }
    }

    fn mangle_symbol(&mut self, id: SymbolId) -> MangleResult<()> {
        let symbol = entry_symbol(self.table, id)?;
        match &symbol.kind {
            SymbolKind::Function(decl) => self.mangle_function(id, decl),
            SymbolKind::Variable(decl) => self.mangle_variable(id, decl),
            _ => Err(MangleError::new(
                MangleErrorKind::NotMangleable,
                format!("`{}` is neither a function nor a variable", symbol.name),
            )),
        }
    }

    fn dmc(&self) -> bool {
        self.config.is_dmc()
    }

    fn name(&self, id: SymbolId) -> &'a str {
        let table = self.table;
        table.get(id).map_or("", |symbol| symbol.name.as_str())
    }

    fn canonical(&self, id: SymbolId) -> SymbolId {
        self.table.enclosing_instance(id).unwrap_or(id)
    }

    fn push_digit(&mut self, index: usize) {
        self.out.push(char::from(b'0' + index as u8));
    }

    /// Encoded integer: `A@` for zero, a single digit for 1 through 10,
    /// otherwise hex digits spelled `A`..`P` and terminated by `@`.
    fn number(&mut self, value: u64) {
        match value {
            0 => self.out.push_str("A@"),
            1..=10 => self.push_digit((value - 1) as usize),
            _ => {
                let mut digits = Vec::new();
                let mut rest = value;
                while rest != 0 {
                    digits.push(char::from(b'A' + (rest % 16) as u8));
                    rest /= 16;
                }
                self.out.extend(digits.iter().rev());
                self.out.push('@');
            }
        }
    }

    // ---- declarations ------------------------------------------------------

    fn mangle_function(&mut self, id: SymbolId, decl: &FunctionDecl) -> MangleResult<()> {
        let member = self.table.is_member(id);
        let needs_this = member && !decl.is_static;
        self.out.push('?');
        self.mangle_ident(id, false)?;
        if needs_this {
            let flag = match (decl.is_virtual, decl.protection) {
                (true, Protection::Private) => 'E',
                (true, Protection::Protected) => 'M',
                (true, _) => 'U',
                (false, Protection::Private) => 'A',
                (false, Protection::Protected) => 'I',
                (false, _) => 'Q',
            };
            self.out.push(flag);
            if self.config.is_64bit() {
                self.out.push('E');
            }
            self.out.push(if decl.is_const { 'B' } else { 'A' });
        } else if member {
            self.out.push(match decl.protection {
                Protection::Private => 'C',
                Protection::Protected => 'K',
                _ => 'S',
            });
        } else {
            self.out.push('Y');
        }
        let special = decl.role != FunctionRole::Plain;
        let signature = self.function_type(&decl.ty, needs_this, special)?;
        self.out.push_str(&signature);
        Ok(())
    }

    fn mangle_variable(&mut self, id: SymbolId, decl: &VariableDecl) -> MangleResult<()> {
        if !decl.storage.is_cpp_visible() {
            return Err(MangleError::unsupported_storage(
                "C++ static non-__gshared non-extern variables are not supported",
            ));
        }
        self.out.push('?');
        self.mangle_ident(id, false)?;
        if self.table.is_member(id) {
            self.out.push(match decl.protection {
                Protection::Private => '0',
                Protection::Protected => '1',
                _ => '2',
            });
        } else {
            self.out.push('3');
        }
        let ty = &decl.ty;
        self.check_qualifier(ty)?;
        let cv = if ty.is_const() { 'B' } else { 'A' };
        let ty = match ty.kind {
            TypeKind::Pointer(_) => ty.clone(),
            _ => ty.mutable_of(),
        };
        self.encode_type(&ty, Cx::default())?;
        if matches!(ty.kind, TypeKind::Pointer(_) | TypeKind::Reference(_)) && self.config.is_64bit()
        {
            self.out.push('E');
        }
        self.out.push(cv);
        Ok(())
    }

    /// Encode the calling convention, return type and parameters into a
    /// detached buffer. The back-reference tables stay shared.
    fn function_type(
        &mut self,
        signature: &FunctionType,
        needs_this: bool,
        special: bool,
    ) -> MangleResult<String> {
        let saved = std::mem::take(&mut self.out);
        let result = self.write_function_type(signature, needs_this, special);
        let text = std::mem::replace(&mut self.out, saved);
        result.map(|()| text)
    }

    fn write_function_type(
        &mut self,
        signature: &FunctionType,
        needs_this: bool,
        special: bool,
    ) -> MangleResult<()> {
        let convention = if self.config.is_64bit() {
            'A'
        } else {
            match signature.linkage {
                Linkage::C => 'A',
                Linkage::Cpp if needs_this && signature.variadic != Variadic::C => 'E',
                Linkage::Cpp => 'A',
                Linkage::Windows => 'G',
                Linkage::Pascal => 'C',
                Linkage::D => {
                    return Err(MangleError::unsupported_type(
                        "function type with D linkage has no C++ calling convention",
                    ));
                }
            }
        };
        self.out.push(convention);

        if special {
            self.out.push('@');
        } else {
            let ret = signature.effective_return();
            let udt = match ret.kind {
                TypeKind::Struct(id) => intrinsic_code(self.name(id)).is_none(),
                TypeKind::Enum(_) => true,
                _ => false,
            };
            if udt {
                self.out.push_str("?A");
            }
            self.encode_type(&ret, Cx::returning())?;
        }

        let c_variadic = signature.variadic == Variadic::C;
        if signature.params.is_empty() {
            self.out.push(if c_variadic { 'Z' } else { 'X' });
        } else {
            for param in &signature.params {
                let ty = param.passed_type();
                if matches!(ty.kind, TypeKind::StaticArray { .. }) {
                    return Err(MangleError::unsupported_storage(
                        "unable to pass static array to extern(C++) function; use a pointer instead",
                    ));
                }
                self.encode_type(&ty, Cx::default())?;
            }
            self.out.push(if c_variadic { 'Z' } else { '@' });
        }
        self.out.push('Z');
        Ok(())
    }

    // ---- names -------------------------------------------------------------

    /// Qualified name, innermost scope first.
    fn mangle_ident(&mut self, id: SymbolId, dont_backref: bool) -> MangleResult<()> {
        let table = self.table;
        let mut current = Some(self.canonical(id));
        while let Some(scope) = current.filter(|scope| !table.is_module(*scope)) {
            self.mangle_name(scope, dont_backref)?;
            current = table.parent(scope).map(|parent| self.canonical(parent));
        }
        if !dont_backref {
            self.out.push('@');
        }
        Ok(())
    }

    fn mangle_name(&mut self, id: SymbolId, dont_backref: bool) -> MangleResult<()> {
        let table = self.table;
        if let Some(decl) = table.as_function(id) {
            match decl.role {
                FunctionRole::Destructor => {
                    self.out.push_str("?1");
                    return Ok(());
                }
                FunctionRole::Constructor => {
                    self.out.push_str("?0");
                    return Ok(());
                }
                FunctionRole::Plain => {}
            }
        }
        let (name, dmc_template) = match table.as_instance(id) {
            Some(instance) => (self.template_name(id, instance)?, self.dmc()),
            None => (self.name(id).to_string(), false),
        };
        if !dmc_template {
            if dont_backref {
                self.idents.save(name.clone());
            } else if let Some(index) = self.idents.check_and_save(name.clone()) {
                trace!(target: LOG_TARGET, index, name = %name, "identifier back-reference");
                self.push_digit(index);
                return Ok(());
            }
        }
        self.out.push_str(&name);
        self.out.push('@');
        Ok(())
    }

    /// `?$name@args`, encoded with its own fresh back-reference tables.
    fn template_name(&self, id: SymbolId, instance: &TemplateInstance) -> MangleResult<String> {
        let table = self.table;
        let name = self.name(id);
        let Some(decl) = table.as_template(instance.template) else {
            return Err(MangleError::unsupported_template_argument(format!(
                "`{name}` is not instantiated from a template declaration"
            )));
        };
        let mut nested = Mangler::new(table, self.config);
        nested.out.push_str("?$");
        nested.out.push_str(name);
        nested.idents.save(name.to_string());
        nested.out.push('@');
        if nested.dmc()
            && let Some(parent) = table.parent(id)
        {
            nested.mangle_ident(parent, true)?;
        }

        let mut in_pack = false;
        for (index, arg) in instance.args.iter().enumerate() {
            let param = if in_pack {
                TemplateParam::Type
            } else {
                match decl.params.get(index) {
                    Some(param) => *param,
                    None => {
                        return Err(MangleError::unsupported_template_argument(format!(
                            "template argument {} of `{name}` has no matching parameter",
                            index + 1
                        )));
                    }
                }
            };
            if param == TemplateParam::Tuple {
                in_pack = true;
            }
            match (param, arg) {
                (TemplateParam::Value, TemplateArg::Value { ty, value }) => {
                    nested.value_argument(ty, *value)?;
                }
                (TemplateParam::Alias, _) => nested.alias_argument(arg)?,
                (TemplateParam::Type | TemplateParam::Tuple, TemplateArg::Type(ty)) => {
                    nested.encode_type(ty, Cx::default())?;
                }
                _ => {
                    return Err(MangleError::unsupported_template_argument(format!(
                        "template argument {} of `{name}` does not match its {param:?} parameter",
                        index + 1
                    )));
                }
            }
        }
        Ok(nested.out)
    }

    fn value_argument(&mut self, ty: &Type, value: i64) -> MangleResult<()> {
        let Some(kind) = integral_kind(self.table, ty) else {
            return Err(MangleError::unsupported_template_argument(format!(
                "C++ `{}` template value parameter is not supported",
                ty.display(self.table)
            )));
        };
        self.out.push_str("$0");
        // DMC spells every value as unsigned.
        if kind.is_unsigned() || self.dmc() || value >= 0 {
            self.number(value as u64);
        } else {
            self.out.push('?');
            self.number(value.unsigned_abs());
        }
        Ok(())
    }

    fn alias_argument(&mut self, arg: &TemplateArg) -> MangleResult<()> {
        let table = self.table;
        let target = match arg {
            TemplateArg::Symbol(target) | TemplateArg::Variable(target) => *target,
            TemplateArg::Type(_) | TemplateArg::Value { .. } => {
                return Err(MangleError::unsupported_template_argument(
                    "alias template parameter requires a declaration argument",
                ));
            }
        };
        match table.get(target).map(|symbol| &symbol.kind) {
            Some(SymbolKind::Function(decl)) => {
                self.out.push_str("$1");
                self.mangle_function(target, decl)
            }
            Some(SymbolKind::Variable(decl)) => {
                self.out.push_str(if self.dmc() { "$1" } else { "$E" });
                self.mangle_variable(target, decl)
            }
            Some(SymbolKind::Template(decl)) if decl.one_member.is_some() => {
                let tag = match decl.one_member {
                    _ if self.dmc() => 'V',
                    Some(TemplateMember::Aggregate(AggregateKind::Union)) => 'T',
                    Some(TemplateMember::Aggregate(AggregateKind::Struct)) => 'U',
                    Some(TemplateMember::Aggregate(AggregateKind::Class | AggregateKind::Interface)) => {
                        'V'
                    }
                    _ => {
                        return Err(MangleError::unsupported_template_argument(
                            "C++ templates support only integral value, type parameters, alias templates and alias function parameters",
                        ));
                    }
                };
                self.out.push(tag);
                self.mangle_ident(target, false)
            }
            _ => Err(MangleError::unsupported_template_argument(format!(
                "`{}` is unsupported parameter for C++ template",
                table.qualified_name(target)
            ))),
        }
    }

    // ---- types -------------------------------------------------------------

    fn check_qualifier(&self, ty: &Type) -> MangleResult<()> {
        if ty.qualifier.is_unrepresentable() {
            return Err(MangleError::unsupported_qualifier(format!(
                "`{}` has no C++ equivalent; shared and immutable are not representable",
                ty.display(self.table)
            )));
        }
        Ok(())
    }

    /// Back-reference for a top-level type seen earlier in this run.
    fn check_type_saved(&mut self, ty: &Type, cx: Cx) -> bool {
        if cx.not_top || cx.return_type {
            return false;
        }
        match self.types.check_and_save(ty.clone()) {
            Some(index) => {
                trace!(target: LOG_TARGET, index, "type back-reference");
                self.push_digit(index);
                true
            }
            None => false,
        }
    }

    fn modifier(&mut self, ty: &Type, cx: Cx) {
        if cx.ignore_const {
            return;
        }
        if ty.is_const() {
            if cx.not_top {
                self.out.push('B');
            } else if self.dmc() && !matches!(ty.kind, TypeKind::Pointer(_)) {
                self.out.push_str("_O");
            }
        } else if cx.not_top {
            self.out.push('A');
        }
    }

    fn encode_type(&mut self, ty: &Type, cx: Cx) -> MangleResult<()> {
        self.check_qualifier(ty)?;
        match &ty.kind {
            TypeKind::Basic(kind) => self.basic_type(ty, *kind, cx),
            TypeKind::Vector { .. } => {
                if !self.check_type_saved(ty, cx) {
                    self.out.push_str("T__m128@@");
                }
                Ok(())
            }
            TypeKind::StaticArray { element, .. } => {
                if self.check_type_saved(ty, cx) {
                    return Ok(());
                }
                // The outermost dimension decays to a const pointer.
                self.out.push(if self.dmc() { 'Q' } else { 'P' });
                if matches!(element.kind, TypeKind::StaticArray { .. }) {
                    self.mangle_array(element, cx.inner())
                } else {
                    self.encode_type(element, cx.inner())
                }
            }
            TypeKind::Pointer(inner) => self.pointer_type(ty, inner, cx),
            TypeKind::Reference(inner) => {
                if self.check_type_saved(ty, cx) {
                    return Ok(());
                }
                self.out.push('A');
                if self.config.is_64bit() {
                    self.out.push('E');
                }
                if matches!(inner.kind, TypeKind::StaticArray { .. }) {
                    self.mangle_array(inner, cx.inner())
                } else {
                    self.encode_type(inner, cx.inner())
                }
            }
            TypeKind::Function(signature) => {
                let text = self.function_type(signature, false, false)?;
                if self.dmc() {
                    if self.check_type_saved(ty, cx) {
                        return Ok(());
                    }
                } else {
                    self.out.push_str("$$A6");
                }
                self.out.push_str(&text);
                Ok(())
            }
            TypeKind::Struct(id) => self.struct_type(ty, *id, cx),
            TypeKind::Enum(id) => self.enum_type(ty, *id, cx),
            TypeKind::Class(id) => {
                if self.check_type_saved(ty, cx) {
                    return Ok(());
                }
                if cx.not_top {
                    self.modifier(ty, cx);
                }
                self.out.push(if ty.is_const() { 'Q' } else { 'P' });
                if self.config.is_64bit() {
                    self.out.push('E');
                }
                self.modifier(ty, cx.inner());
                self.out.push('V');
                self.mangle_ident(*id, false)
            }
            TypeKind::DynamicArray(_) | TypeKind::AssociativeArray { .. } | TypeKind::Delegate(_) => {
                Err(MangleError::unsupported_type(format!(
                    "`{}` cannot be mapped to C++",
                    ty.display(self.table)
                )))
            }
        }
    }

    fn basic_type(&mut self, ty: &Type, kind: BasicKind, cx: Cx) -> MangleResult<()> {
        if ty.is_const() && (cx.not_top || self.dmc()) && self.check_type_saved(ty, cx) {
            return Ok(());
        }
        if kind == BasicKind::Bool && self.check_type_saved(ty, cx) {
            return Ok(());
        }
        let dmc = self.dmc();
        let code = match kind {
            BasicKind::Void => "X",
            BasicKind::Int8 => "C",
            BasicKind::UInt8 => "E",
            BasicKind::Int16 => "F",
            BasicKind::UInt16 => "G",
            BasicKind::Int32 => "H",
            BasicKind::UInt32 => "I",
            BasicKind::Float32 => "M",
            BasicKind::Int64 => "_J",
            BasicKind::UInt64 => "_K",
            BasicKind::Float64 => "N",
            BasicKind::Bool => "_N",
            BasicKind::Char => "D",
            BasicKind::DChar => "I",
            BasicKind::Float80 if dmc => "_Z",
            BasicKind::Float80 => "_T",
            BasicKind::WChar if dmc => "_Y",
            BasicKind::WChar => "_W",
            BasicKind::Int128
            | BasicKind::UInt128
            | BasicKind::Imaginary32
            | BasicKind::Imaginary64
            | BasicKind::Imaginary80
            | BasicKind::Complex32
            | BasicKind::Complex64
            | BasicKind::Complex80 => {
                return Err(MangleError::unsupported_type(format!(
                    "`{}` cannot be mapped to C++",
                    ty.display(self.table)
                )));
            }
        };
        self.modifier(ty, cx);
        self.out.push_str(code);
        Ok(())
    }

    fn pointer_type(&mut self, ty: &Type, inner: &Type, cx: Cx) -> MangleResult<()> {
        let tag = if ty.is_const() { 'Q' } else { 'P' };
        match &inner.kind {
            TypeKind::Function(signature) => {
                // Parameter types claim their slots before the pointer does.
                let text = self.function_type(signature, false, false)?;
                if self.check_type_saved(ty, cx) {
                    return Ok(());
                }
                self.out.push(tag);
                self.out.push('6');
                self.out.push_str(&text);
                Ok(())
            }
            TypeKind::StaticArray { .. } => {
                if self.check_type_saved(ty, cx) {
                    return Ok(());
                }
                self.modifier(ty, cx);
                self.out.push(if ty.is_const() || !self.dmc() { 'Q' } else { 'P' });
                if self.config.is_64bit() {
                    self.out.push('E');
                }
                self.mangle_array(inner, cx.inner())
            }
            _ => {
                if self.check_type_saved(ty, cx) {
                    return Ok(());
                }
                self.modifier(ty, cx);
                self.out.push(tag);
                if self.config.is_64bit() {
                    self.out.push('E');
                }
                self.encode_type(inner, cx.inner())
            }
        }
    }

    fn struct_type(&mut self, ty: &Type, id: SymbolId, cx: Cx) -> MangleResult<()> {
        if let Some(code) = intrinsic_code(self.name(id)) {
            if ty.is_const() && (cx.not_top || self.dmc()) && self.check_type_saved(ty, cx) {
                return Ok(());
            }
            self.modifier(ty, cx);
            self.out.push(code);
            return Ok(());
        }
        if self.check_type_saved(ty, cx) {
            return Ok(());
        }
        self.modifier(ty, cx);
        let union = matches!(
            self.table.get(id).map(|symbol| &symbol.kind),
            Some(SymbolKind::Aggregate(AggregateKind::Union))
        );
        self.out.push(if union { 'T' } else { 'U' });
        self.mangle_ident(id, false)
    }

    fn enum_type(&mut self, ty: &Type, id: SymbolId, cx: Cx) -> MangleResult<()> {
        if self.check_type_saved(ty, cx) {
            return Ok(());
        }
        let base = match self.table.get(id).map(|symbol| &symbol.kind) {
            Some(SymbolKind::Enum(decl)) => decl.base,
            _ => {
                return Err(MangleError::unsupported_type(format!(
                    "`{}` is not an enum declaration",
                    self.name(id)
                )));
            }
        };
        let size = match base {
            BasicKind::Char | BasicKind::Int8 => '0',
            BasicKind::UInt8 => '1',
            BasicKind::Int16 => '2',
            BasicKind::UInt16 => '3',
            BasicKind::Int32 => '4',
            BasicKind::UInt32 => '5',
            BasicKind::Int64 => '6',
            BasicKind::UInt64 => '7',
            other => {
                return Err(MangleError::unsupported_type(format!(
                    "enum `{}` with `{}` base cannot be mapped to C++",
                    self.name(id),
                    other.as_str()
                )));
            }
        };
        self.modifier(ty, cx);
        self.out.push('W');
        self.out.push(size);
        self.mangle_ident(id, false)
    }

    /// `T[a][b]` as `Y` <dimension count> <bounds...> <element>.
    fn mangle_array(&mut self, array: &Type, cx: Cx) -> MangleResult<()> {
        self.modifier(array, cx);
        let mut bounds = Vec::new();
        let mut element = array;
        while let TypeKind::StaticArray { element: next, length } = &element.kind {
            bounds.push(length.unwrap_or(0));
            element = next;
        }
        self.out.push('Y');
        self.number(bounds.len() as u64);
        for bound in bounds {
            self.number(bound);
        }
        self.encode_type(element, cx.ignoring_const())
    }
}

/// Structs standing in for C++ builtins D has no spelling for.
fn intrinsic_code(name: &str) -> Option<char> {
    match name {
        "__c_long_double" => Some('O'),
        "__c_long" => Some('J'),
        "__c_ulong" => Some('K'),
        _ => None,
    }
}
