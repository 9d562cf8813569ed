//! Itanium C++ ABI encoder (GCC, Clang and compatible toolchains).
//!
//! The encoder walks the scope chain and type tree once, appending to a
//! private buffer. Every substitutable entity is registered right after it
//! has been written in full, so a later identical entity becomes `S<seq>_`.

use tracing::{debug, trace};

use super::backref::BackRefTable;
use super::{MangleConfig, MangleError, MangleErrorKind, MangleResult, entry_symbol, integral_kind};
use crate::symbols::{
    BasicKind, FunctionDecl, FunctionRole, FunctionType, Linkage, Qualifier, SymbolId, SymbolKind,
    SymbolTable, TemplateArg, TemplateInstance, TemplateParam, Type, TypeKind, VariableDecl,
};


const LOG_TARGET: &str = "mangle.itanium";

/// Template arguments of `std::basic_string<char, char_traits<char>, allocator<char>>`.
const STD_STRING_ARGS: &str = "IcSt11char_traitsIcESaIcEE";
/// Template arguments of the `char` iostream specialisations.
const STD_STREAM_ARGS: &str = "IcSt11char_traitsIcEE";

/// Mangle a C++-linkage function or variable for the Itanium ABI.
///
/// # Errors
///
/// Returns a [`MangleError`] attributed to `id` when any part of the
/// declaration has no Itanium spelling.
pub fn mangle(table: &SymbolTable, id: SymbolId, config: &MangleConfig) -> Result<String, MangleError> {
    let mut mangler = Mangler::new(table, config);
    match mangler.mangle_symbol(id) {
        Ok(()) => {
            debug!(
                target: LOG_TARGET,
                symbol = %table.qualified_name(id),
                abi = "itanium",
                mangled = %mangler.out,
                "mangled symbol"
            );
            Ok(mangler.out)
        }
        Err(err) => Err(err.attributed_to(table, id)),
    }
}

/// Entity recorded in the substitution table.
#[derive(Debug, Clone, PartialEq)]
enum Component {
    /// Scope, template declaration or template instance. Eponymous template
    /// members are recorded under their instance.
    Symbol(SymbolId),
    Type(Type),
    /// Occupies the slot C++ gives to `K<class>` under a const class pointer.
    Placeholder,
}

/// Per-call encoding context, copied into every recursive call.
#[derive(Debug, Clone, Copy, Default)]
struct Cx {
    /// Type is a parameter or return type, not nested inside another type.
    top_level: bool,
    /// Speculative encoding: substitutions are neither emitted nor recorded.
    scratch: bool,
}

impl Cx {
    fn top_level(self) -> Self {
        Self {
            top_level: true,
            ..self
        }
    }

    fn nested(self) -> Self {
        Self {
            top_level: false,
            ..self
        }
    }

    fn scratch(self) -> Self {
        Self {
            scratch: true,
            ..self
        }
    }
}

struct Mangler<'a> {
    table: &'a SymbolTable,
    config: &'a MangleConfig,
    out: String,
    components: BackRefTable<Component>,
}

impl<'a> Mangler<'a> {
    fn new(table: &'a SymbolTable, config: &'a MangleConfig) -> Self {
        Self {
            table,
            config,
            out: String::with_capacity(64),
            components: BackRefTable::unbounded(),
        }
    }

    fn mangle_symbol(&mut self, id: SymbolId) -> MangleResult<()> {
        let symbol = entry_symbol(self.table, id)?;
        match &symbol.kind {
            SymbolKind::Function(decl) => self.mangle_function(id, decl, Cx::default()),
            SymbolKind::Variable(decl) => self.mangle_variable(id, decl, false, Cx::default()),
            _ => Err(MangleError::new(
                MangleErrorKind::NotMangleable,
                format!("`{}` is neither a function nor a variable", symbol.name),
            )),
        }
    }

    fn prefix(&self) -> &'static str {
        if self.config.is_darwin { "__Z" } else { "_Z" }
    }

    fn name(&self, id: SymbolId) -> &'a str {
        let table = self.table;
        table.get(id).map_or("", |symbol| symbol.name.as_str())
    }

    fn nested_scope(&self, scope: Option<SymbolId>) -> Option<SymbolId> {
        scope.filter(|scope| !self.table.is_module(*scope))
    }

    // ---- substitution table ------------------------------------------------

    fn canonical(&self, id: SymbolId) -> SymbolId {
        self.table.enclosing_instance(id).unwrap_or(id)
    }

    fn substitute(&mut self, component: &Component, cx: Cx) -> bool {
        if cx.scratch {
            return false;
        }
        let Some(index) = self.components.position(component) else {
            return false;
        };
        self.out.push('S');
        if index > 0 {
            push_seq_id(&mut self.out, index - 1);
        }
        self.out.push('_');
        trace!(target: LOG_TARGET, index, entity = ?component, "substitution");
        true
    }

    fn substitute_symbol(&mut self, id: SymbolId, cx: Cx) -> bool {
        let component = Component::Symbol(self.canonical(id));
        self.substitute(&component, cx)
    }

    fn exists(&self, component: &Component, cx: Cx) -> bool {
        !cx.scratch && self.components.position(component).is_some()
    }

    fn store(&mut self, component: Component, cx: Cx) {
        if cx.scratch {
            return;
        }
        trace!(target: LOG_TARGET, index = self.components.len(), entity = ?component, "candidate");
        self.components.push(component);
    }

    fn store_symbol(&mut self, id: SymbolId, cx: Cx) {
        let component = Component::Symbol(self.canonical(id));
        self.store(component, cx);
    }

    /// The instance's template declaration was already written once.
    fn template_seen(&self, instance: SymbolId, cx: Cx) -> bool {
        self.table
            .as_instance(instance)
            .is_some_and(|inst| self.exists(&Component::Symbol(inst.template), cx))
    }

    /// `scope` is the outermost qualifier that will be written.
    fn is_initial_qualifier(&self, scope: SymbolId, cx: Cx) -> bool {
        let table = self.table;
        let parent = match table.enclosing_instance(scope) {
            Some(instance) => {
                if self.template_seen(instance, cx) {
                    return true;
                }
                table.parent(instance)
            }
            None => table.parent(scope),
        };
        parent.is_none_or(|parent| table.is_module(parent))
    }

    /// `scope` is `::std` and nothing is written in front of it.
    fn is_std_root(&self, scope: SymbolId, cx: Cx) -> bool {
        self.table.is_std_namespace(scope) && self.is_initial_qualifier(scope, cx)
    }

    // ---- names -------------------------------------------------------------

    fn write_identifier(&mut self, name: &str) {
        self.out.push_str(&name.len().to_string());
        self.out.push_str(name);
    }

    fn source_name(&mut self, id: SymbolId, skip_name: bool, cx: Cx) -> MangleResult<()> {
        let table = self.table;
        let name = self.name(id);
        let Some(instance) = table.as_instance(id) else {
            self.write_identifier(name);
            return Ok(());
        };
        if !skip_name && !self.substitute_symbol(instance.template, cx) {
            self.store_symbol(instance.template, cx);
            self.write_identifier(name);
        }
        self.out.push('I');
        self.template_args(id, instance, cx)?;
        self.out.push('E');
        Ok(())
    }

    fn prefix_name(&mut self, scope: SymbolId, cx: Cx) -> MangleResult<()> {
        if self.substitute_symbol(scope, cx) {
            return Ok(());
        }
        let table = self.table;
        let (scope, parent) = match table.enclosing_instance(scope) {
            Some(instance) if self.template_seen(instance, cx) => (instance, None),
            Some(instance) => (instance, table.parent(instance)),
            None => (scope, table.parent(scope)),
        };
        if self.is_std_root(scope, cx) {
            self.out.push_str("St");
            return Ok(());
        }
        if let Some(parent) = self.nested_scope(parent) {
            if table.as_instance(scope).is_some() && self.is_std_root(parent, cx) {
                if self.write_std_instance(scope, cx)? {
                    self.store_symbol(scope, cx);
                }
                return Ok(());
            }
            self.prefix_name(parent, cx)?;
        }
        self.source_name(scope, false, cx)?;
        self.store_symbol(scope, cx);
        Ok(())
    }

    /// Name of an aggregate, enum or single-member template.
    fn cpp_mangle_name(&mut self, id: SymbolId, cx: Cx) -> MangleResult<()> {
        let table = self.table;
        let (entity, parent, skip_prefix) = match table.enclosing_instance(id) {
            Some(instance) => (instance, table.parent(instance), self.template_seen(instance, cx)),
            None => (id, table.parent(id), false),
        };
        match self.nested_scope(parent) {
            Some(parent) if !skip_prefix && self.is_std_root(parent, cx) => {
                if table.as_instance(entity).is_some() {
                    if !self.write_std_instance(entity, cx)? {
                        return Ok(());
                    }
                } else {
                    self.out.push_str("St");
                    self.source_name(entity, false, cx)?;
                }
            }
            Some(parent) => {
                self.out.push('N');
                if !skip_prefix {
                    self.prefix_name(parent, cx)?;
                }
                self.source_name(entity, false, cx)?;
                self.out.push('E');
            }
            None => self.source_name(entity, false, cx)?,
        }
        self.store_symbol(id, cx);
        Ok(())
    }

    /// Write a template instance declared directly in `::std`, using the
    /// standard abbreviations where the arguments match exactly. Returns
    /// whether the written name is a substitution candidate.
    fn write_std_instance(&mut self, instance: SymbolId, cx: Cx) -> MangleResult<bool> {
        match self.name(instance) {
            "allocator" => {
                self.out.push_str("Sa");
                self.source_name(instance, true, cx)?;
                Ok(true)
            }
            "basic_string" => {
                self.out.push_str("Sb");
                let start = self.out.len();
                self.source_name(instance, true, cx.scratch())?;
                if &self.out[start..] == STD_STRING_ARGS {
                    self.out.truncate(start - 2);
                    self.out.push_str("Ss");
                    return Ok(false);
                }
                self.out.truncate(start);
                self.source_name(instance, true, cx)?;
                Ok(true)
            }
            name @ ("basic_istream" | "basic_ostream" | "basic_iostream") => {
                let start = self.out.len();
                self.source_name(instance, true, cx.scratch())?;
                let matched = &self.out[start..] == STD_STREAM_ARGS;
                self.out.truncate(start);
                if matched {
                    self.out.push_str(match name {
                        "basic_istream" => "Si",
                        "basic_ostream" => "So",
                        _ => "Sd",
                    });
                    return Ok(false);
                }
                self.out.push_str("St");
                self.source_name(instance, false, cx)?;
                Ok(true)
            }
            _ => {
                self.out.push_str("St");
                self.source_name(instance, false, cx)?;
                Ok(true)
            }
        }
    }

    // ---- template arguments ------------------------------------------------

    fn template_args(
        &mut self,
        id: SymbolId,
        instance: &'a TemplateInstance,
        cx: Cx,
    ) -> MangleResult<()> {
        let table = self.table;
        let Some(decl) = table.as_template(instance.template) else {
            return Err(MangleError::unsupported_template_argument(format!(
                "`{}` is not instantiated from a template declaration",
                self.name(id)
            )));
        };
        let mut in_pack = false;
        for (index, arg) in instance.args.iter().enumerate() {
            let mut param = if in_pack {
                TemplateParam::Type
            } else {
                match decl.params.get(index) {
                    Some(param) => *param,
                    None => {
                        return Err(MangleError::unsupported_template_argument(format!(
                            "template argument {} of `{}` has no matching parameter",
                            index + 1,
                            self.name(id)
                        )));
                    }
                }
            };
            if param == TemplateParam::Tuple {
                self.out.push('I');
                in_pack = true;
                param = TemplateParam::Type;
            }
            match (param, arg) {
                (TemplateParam::Value, TemplateArg::Value { ty, value }) => {
                    self.value_argument(ty, *value, cx)?;
                }
                (TemplateParam::Alias, _) => self.alias_argument(arg, cx)?,
                (TemplateParam::Type | TemplateParam::Tuple, TemplateArg::Type(ty)) => {
                    self.encode_type(ty, cx.nested())?;
                }
                _ => {
                    return Err(MangleError::unsupported_template_argument(format!(
                        "template argument {} of `{}` does not match its {param:?} parameter",
                        index + 1,
                        self.name(id)
                    )));
                }
            }
        }
        if in_pack {
            self.out.push('E');
        }
        Ok(())
    }

    fn value_argument(&mut self, ty: &Type, value: i64, cx: Cx) -> MangleResult<()> {
        let Some(kind) = integral_kind(self.table, ty) else {
            return Err(MangleError::unsupported_template_argument(format!(
                "C++ `{}` template value parameter is not supported",
                ty.display(self.table)
            )));
        };
        self.out.push('L');
        self.encode_type(ty, cx.nested())?;
        if kind.is_unsigned() {
            self.out.push_str(&(value as u64).to_string());
        } else if value < 0 {
            self.out.push('n');
            self.out.push_str(&value.unsigned_abs().to_string());
        } else {
            self.out.push_str(&value.to_string());
        }
        self.out.push('E');
        Ok(())
    }

    fn alias_argument(&mut self, arg: &TemplateArg, cx: Cx) -> MangleResult<()> {
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
                let nested = decl.ty.linkage == Linkage::Cpp
                    && self.nested_scope(table.parent(target)).is_some();
                if nested {
                    self.out.push('X');
                }
                self.out.push('L');
                self.mangle_function(target, decl, cx)?;
                self.out.push('E');
                if nested {
                    self.out.push('E');
                }
                Ok(())
            }
            Some(SymbolKind::Variable(decl)) => {
                self.out.push('L');
                self.mangle_variable(target, decl, true, cx)?;
                self.out.push('E');
                Ok(())
            }
            Some(SymbolKind::Template(decl)) if decl.one_member.is_some() => {
                if !self.substitute_symbol(target, cx) {
                    self.cpp_mangle_name(target, cx)?;
                }
                Ok(())
            }
            _ => Err(MangleError::unsupported_template_argument(format!(
                "`{}` is unsupported parameter for C++ template",
                table.qualified_name(target)
            ))),
        }
    }

    // ---- declarations ------------------------------------------------------

    fn mangle_function(&mut self, id: SymbolId, decl: &FunctionDecl, cx: Cx) -> MangleResult<()> {
        let table = self.table;
        let signature = &decl.ty;
        // A function template is named by its instance.
        let (name_id, parent) = match table.enclosing_instance(id) {
            Some(instance) => (instance, table.parent(instance)),
            None => (id, table.parent(id)),
        };
        let prefix = self.prefix();
        self.out.push_str(prefix);
        match self.nested_scope(parent) {
            Some(parent) if signature.linkage == Linkage::Cpp && self.is_std_root(parent, cx) => {
                self.out.push_str("St");
                self.source_name(name_id, false, cx)?;
            }
            Some(parent) if signature.linkage == Linkage::Cpp => {
                self.out.push('N');
                if decl.is_const {
                    self.out.push('K');
                }
                self.prefix_name(parent, cx)?;
                match decl.role {
                    FunctionRole::Destructor => self.out.push_str("D1"),
                    FunctionRole::Constructor => self.out.push_str("C1"),
                    FunctionRole::Plain => self.source_name(name_id, false, cx)?,
                }
                self.out.push('E');
            }
            _ => self.source_name(name_id, false, cx)?,
        }
        if signature.linkage == Linkage::Cpp {
            if name_id != id {
                self.encode_type(&signature.effective_return(), cx.top_level())?;
            }
            self.encode_params(signature, cx)?;
        }
        Ok(())
    }

    fn mangle_variable(
        &mut self,
        id: SymbolId,
        decl: &VariableDecl,
        alias_argument: bool,
        cx: Cx,
    ) -> MangleResult<()> {
        if !decl.storage.is_cpp_visible() {
            return Err(MangleError::unsupported_storage(
                "C++ static non-__gshared non-extern variables are not supported",
            ));
        }
        let prefix = self.prefix();
        match self.nested_scope(self.table.parent(id)) {
            Some(parent) if self.is_std_root(parent, cx) => {
                self.out.push_str(prefix);
                self.out.push_str("St");
                self.source_name(id, false, cx)?;
            }
            Some(parent) => {
                self.out.push_str(prefix);
                self.out.push('N');
                self.prefix_name(parent, cx)?;
                self.source_name(id, false, cx)?;
                self.out.push('E');
            }
            None if alias_argument => {
                self.out.push_str(prefix);
                self.source_name(id, false, cx)?;
            }
            None => {
                if self.config.is_darwin {
                    self.out.push('_');
                }
                let name = self.name(id);
                self.out.push_str(name);
            }
        }
        Ok(())
    }

    fn encode_params(&mut self, signature: &FunctionType, cx: Cx) -> MangleResult<()> {
        for param in &signature.params {
            let mut ty = param.passed_type();
            if matches!(ty.kind, TypeKind::StaticArray { .. }) {
                return Err(MangleError::unsupported_storage(
                    "unable to pass static array to extern(C++) function; use a pointer instead",
                ));
            }
            // Top-level const does not take part in overloading.
            if ty.qualifier == Qualifier::Const
                && matches!(
                    ty.kind,
                    TypeKind::Basic(_) | TypeKind::Enum(_) | TypeKind::Struct(_) | TypeKind::Pointer(_)
                )
            {
                ty = ty.mutable_of();
            }
            self.encode_type(&ty, cx.top_level())?;
        }
        if signature.variadic.is_variadic() {
            self.out.push('z');
        } else if signature.params.is_empty() {
            self.out.push('v');
        }
        Ok(())
    }

    // ---- types -------------------------------------------------------------

    fn encode_type(&mut self, ty: &Type, cx: Cx) -> MangleResult<()> {
        if ty.qualifier.is_unrepresentable() {
            return Err(MangleError::unsupported_qualifier(format!(
                "`{}` has no C++ equivalent; shared and immutable are not representable",
                ty.display(self.table)
            )));
        }
        let konst = ty.is_const();
        match &ty.kind {
            TypeKind::Basic(kind) => {
                let (prefix, code) = self.basic_code(*kind);
                self.scalar(ty, prefix, code, cx);
                Ok(())
            }
            TypeKind::Vector { element, .. } => self.substitutable(ty, cx, |this| {
                if konst {
                    this.out.push('K');
                }
                this.out.push_str("U8__vector");
                this.encode_type(element, cx.nested())
            }),
            TypeKind::StaticArray { element, length } => self.substitutable(ty, cx, |this| {
                if konst {
                    this.out.push('K');
                }
                this.out.push('A');
                this.out.push_str(&length.unwrap_or(0).to_string());
                this.out.push('_');
                this.encode_type(element, cx.nested())
            }),
            TypeKind::Pointer(inner) => self.substitutable(ty, cx, |this| {
                if konst {
                    this.out.push('K');
                }
                this.out.push('P');
                this.encode_type(inner, cx.nested())
            }),
            TypeKind::Reference(inner) => self.substitutable(ty, cx, |this| {
                this.out.push('R');
                this.encode_type(inner, cx.nested())
            }),
            TypeKind::Function(signature) => self.substitutable(ty, cx, |this| {
                this.out.push('F');
                if signature.linkage == Linkage::C {
                    this.out.push('Y');
                }
                this.encode_type(&signature.effective_return(), cx.nested())?;
                this.encode_params(signature, cx)?;
                this.out.push('E');
                Ok(())
            }),
            TypeKind::Struct(id) => match self.name(*id) {
                "__c_long" => {
                    self.scalar(ty, None, 'l', cx);
                    Ok(())
                }
                "__c_ulong" => {
                    self.scalar(ty, None, 'm', cx);
                    Ok(())
                }
                _ => self.named_type(ty, *id, cx),
            },
            TypeKind::Enum(id) => self.named_type(ty, *id, cx),
            TypeKind::Class(id) => self.class_type(ty, *id, cx),
            TypeKind::DynamicArray(_) | TypeKind::AssociativeArray { .. } | TypeKind::Delegate(_) => {
                Err(MangleError::unsupported_type(format!(
                    "`{}` cannot be mapped to C++",
                    ty.display(self.table)
                )))
            }
        }
    }

    /// Reuse an earlier occurrence of `ty`, or write it through `body` and
    /// register it afterwards.
    fn substitutable(
        &mut self,
        ty: &Type,
        cx: Cx,
        body: impl FnOnce(&mut Self) -> MangleResult<()>,
    ) -> MangleResult<()> {
        let component = Component::Type(ty.clone());
        if self.substitute(&component, cx) {
            return Ok(());
        }
        body(self)?;
        self.store(component, cx);
        Ok(())
    }

    fn basic_code(&self, kind: BasicKind) -> (Option<char>, char) {
        let long_double = if self.config.real_is_128 { 'g' } else { 'e' };
        match kind {
            BasicKind::Void => (None, 'v'),
            BasicKind::Bool => (None, 'b'),
            BasicKind::Int8 => (None, 'a'),
            BasicKind::UInt8 => (None, 'h'),
            BasicKind::Char => (None, 'c'),
            BasicKind::Int16 => (None, 's'),
            BasicKind::UInt16 | BasicKind::WChar => (None, 't'),
            BasicKind::Int32 => (None, 'i'),
            BasicKind::UInt32 => (None, 'j'),
            BasicKind::Int64 => (None, if self.config.c_long_is_64 { 'l' } else { 'x' }),
            BasicKind::UInt64 => (None, if self.config.c_long_is_64 { 'm' } else { 'y' }),
            BasicKind::Int128 => (None, 'n'),
            BasicKind::UInt128 => (None, 'o'),
            BasicKind::Float32 => (None, 'f'),
            BasicKind::Float64 => (None, 'd'),
            BasicKind::Float80 => (None, long_double),
            BasicKind::DChar => (None, 'w'),
            BasicKind::Imaginary32 => (Some('G'), 'f'),
            BasicKind::Imaginary64 => (Some('G'), 'd'),
            BasicKind::Imaginary80 => (Some('G'), long_double),
            BasicKind::Complex32 => (Some('C'), 'f'),
            BasicKind::Complex64 => (Some('C'), 'd'),
            BasicKind::Complex80 => (Some('C'), long_double),
        }
    }

    /// Builtin type; only const or imaginary/complex forms are candidates.
    fn scalar(&mut self, ty: &Type, prefix: Option<char>, code: char, cx: Cx) {
        let candidate = ty.is_const() || prefix.is_some();
        let component = Component::Type(ty.clone());
        if candidate && self.substitute(&component, cx) {
            return;
        }
        if ty.is_const() {
            self.out.push('K');
        }
        if let Some(prefix) = prefix {
            self.out.push(prefix);
        }
        self.out.push(code);
        if candidate {
            self.store(component, cx);
        }
    }

    fn named_type(&mut self, ty: &Type, id: SymbolId, cx: Cx) -> MangleResult<()> {
        let component = Component::Type(ty.clone());
        if self.substitute(&component, cx) {
            return Ok(());
        }
        if ty.is_const() {
            self.out.push('K');
        }
        if !self.substitute_symbol(id, cx) {
            self.cpp_mangle_name(id, cx)?;
        }
        if ty.is_const() {
            self.store(component, cx);
        }
        Ok(())
    }

    /// D classes have reference semantics and appear to C++ as `C*`.
    fn class_type(&mut self, ty: &Type, id: SymbolId, cx: Cx) -> MangleResult<()> {
        let component = Component::Type(ty.clone());
        if self.substitute(&component, cx) {
            return Ok(());
        }
        let konst = ty.is_const();
        if konst && !cx.top_level {
            self.out.push('K');
        }
        self.out.push('P');
        if konst {
            self.out.push('K');
        }
        if !self.substitute_symbol(id, cx) {
            self.cpp_mangle_name(id, cx)?;
        }
        if konst {
            self.store(Component::Placeholder, cx);
        }
        self.store(component, cx);
        Ok(())
    }
}

/// `<seq-id>`: base 36 with digits `0-9A-Z`, most significant first.
fn push_seq_id(out: &mut String, mut value: usize) {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut digits = Vec::new();
    loop {
        digits.push(DIGITS[value % 36]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    out.extend(digits.iter().rev().map(|digit| char::from(*digit)));
}
