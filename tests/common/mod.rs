use std::fs;
use std::path::{Path, PathBuf};

use cppmangle::symbols::{
    AggregateKind, BasicKind, FunctionDecl, FunctionType, Parameter, SymbolId, SymbolTable,
    TemplateArg, TemplateDecl, TemplateMember, TemplateParam, Type,
};

// Not every integration crate uses every builder; keep each helper allowed on its own.
#[allow(dead_code)]
pub fn int() -> Type {
    Type::basic(BasicKind::Int32)
}

#[allow(dead_code)]
pub fn void_fn(table: &mut SymbolTable, parent: SymbolId, name: &str, params: Vec<Type>) -> SymbolId {
    let params = params.into_iter().map(Parameter::new).collect();
    table.function(
        parent,
        name,
        FunctionDecl::new(FunctionType::new(Type::void(), params)),
    )
}

/// Declare `name<args>` under `parent` with an eponymous struct member and
/// return the member.
#[allow(dead_code)]
pub fn struct_instance(
    table: &mut SymbolTable,
    parent: SymbolId,
    name: &str,
    params: Vec<TemplateParam>,
    args: Vec<TemplateArg>,
) -> SymbolId {
    let decl =
        TemplateDecl::new(params).with_member(TemplateMember::Aggregate(AggregateKind::Struct));
    let template = table.template(parent, name, decl);
    let instance = table.instantiate(template, args);
    table.aggregate(instance, name, AggregateKind::Struct)
}

/// `std::basic_string<char, std::char_traits<char>, std::allocator<char>>`.
#[allow(dead_code)]
pub fn std_string(table: &mut SymbolTable, std: SymbolId) -> Type {
    let ch = || TemplateArg::Type(Type::basic(BasicKind::Char));
    let traits = struct_instance(table, std, "char_traits", vec![TemplateParam::Type], vec![ch()]);
    let alloc = struct_instance(table, std, "allocator", vec![TemplateParam::Type], vec![ch()]);
    let string = struct_instance(
        table,
        std,
        "basic_string",
        vec![TemplateParam::Type; 3],
        vec![
            ch(),
            TemplateArg::Type(Type::struct_of(traits)),
            TemplateArg::Type(Type::struct_of(alloc)),
        ],
    );
    Type::struct_of(string)
}

#[allow(dead_code)]
pub fn write_descriptor(dir: &Path, name: &str, table: &SymbolTable) -> PathBuf {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(table)
        .unwrap_or_else(|err| panic!("serialize descriptor: {err}"));
    fs::write(&path, json).unwrap_or_else(|err| panic!("write {}: {err}", path.display()));
    path
}
