use super::{Mangler, mangle};
use crate::abi::{MangleConfig, MangleError, MangleErrorKind};
use crate::symbols::{
    AggregateKind, BasicKind, FunctionDecl, FunctionRole, FunctionType, Linkage, Parameter,
    Protection, Qualifier, StorageClass, SymbolId, SymbolTable, TemplateArg, TemplateDecl, TemplateMember,
    TemplateParam, Type, VariableDecl, Variadic,
};

fn int() -> Type {
    Type::basic(BasicKind::Int32)
}

fn signature(ret: Type, params: Vec<Type>) -> FunctionType {
    FunctionType::new(ret, params.into_iter().map(Parameter::new).collect())
}

fn void_fn(table: &mut SymbolTable, parent: SymbolId, name: &str, params: Vec<Type>) -> SymbolId {
    table.function(parent, name, FunctionDecl::new(signature(Type::void(), params)))
}

fn mangled(table: &SymbolTable, id: SymbolId, config: &MangleConfig) -> String {
    match mangle(table, id, config) {
        Ok(name) => name,
        Err(err) => panic!("expected Ok mangled name, found Err: {err}"),
    }
}

fn msvc64(table: &SymbolTable, id: SymbolId) -> String {
    mangled(table, id, &MangleConfig::msvc64())
}

fn msvc_err(table: &SymbolTable, id: SymbolId) -> MangleError {
    match mangle(table, id, &MangleConfig::msvc64()) {
        Ok(name) => panic!("expected Err, found Ok: {name}"),
        Err(err) => err,
    }
}

/// Struct template `name` with an eponymous member, instantiated with `args`.
fn struct_instance(
    table: &mut SymbolTable,
    name: &str,
    params: Vec<TemplateParam>,
    args: Vec<TemplateArg>,
) -> Type {
    let decl = TemplateDecl::new(params).with_member(TemplateMember::Aggregate(AggregateKind::Struct));
    let template = table.template(SymbolId::ROOT, name, decl);
    let instance = table.instantiate(template, args);
    Type::struct_of(table.aggregate(instance, name, AggregateKind::Struct))
}

#[test]
fn free_function_is_the_same_on_both_widths() {
    let mut table = SymbolTable::new("app");
    let foo = void_fn(&mut table, SymbolId::ROOT, "foo", Vec::new());
    assert_eq!(msvc64(&table, foo), "?foo@@YAXXZ");
    assert_eq!(mangled(&table, foo, &MangleConfig::msvc32()), "?foo@@YAXXZ");
}

#[test]
fn scopes_are_written_innermost_first() {
    let mut table = SymbolTable::new("app");
    let ns = table.namespace(SymbolId::ROOT, "N");
    let bar = void_fn(&mut table, ns, "bar", vec![int()]);
    assert_eq!(msvc64(&table, bar), "?bar@N@@YAXH@Z");
}

#[test]
fn repeated_scope_name_uses_identifier_back_reference() {
    let mut table = SymbolTable::new("app");
    let ns = table.namespace(SymbolId::ROOT, "N");
    let s = table.aggregate(ns, "S", AggregateKind::Struct);
    let f = void_fn(&mut table, ns, "f", vec![Type::struct_of(s)]);
    assert_eq!(msvc64(&table, f), "?f@N@@YAXUS@1@@Z");
}

#[test]
fn repeated_pointer_parameter_uses_type_back_reference() {
    let mut table = SymbolTable::new("app");
    let s = table.aggregate(SymbolId::ROOT, "S", AggregateKind::Struct);
    let ptr = Type::struct_of(s).pointer_to();
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![ptr.clone(), ptr]);
    assert_eq!(msvc64(&table, f), "?f@@YAXPEAUS@@0@Z");
    assert_eq!(mangled(&table, f, &MangleConfig::msvc32()), "?f@@YAXPAUS@@0@Z");
}

#[test]
fn member_functions_encode_access_and_this_qualifier() {
    let mut table = SymbolTable::new("app");
    let ns = table.namespace(SymbolId::ROOT, "N");
    let s = table.aggregate(ns, "S", AggregateKind::Struct);
    let size = table.function(s, "size", FunctionDecl::new(signature(int(), Vec::new())).as_const());
    let hook = table.function(
        s,
        "hook",
        FunctionDecl::new(signature(Type::void(), Vec::new()))
            .as_virtual()
            .with_protection(Protection::Protected),
    );
    let make = table.function(
        s,
        "make",
        FunctionDecl::new(signature(Type::void(), Vec::new())).as_static(),
    );
    assert_eq!(msvc64(&table, size), "?size@S@N@@QEBAHXZ");
    assert_eq!(mangled(&table, size, &MangleConfig::msvc32()), "?size@S@N@@QBEHXZ");
    assert_eq!(mangled(&table, hook, &MangleConfig::msvc32()), "?hook@S@N@@MAEXXZ");
    assert_eq!(msvc64(&table, make), "?make@S@N@@SAXXZ");
}

#[test]
fn constructors_and_destructors_use_special_names() {
    let mut table = SymbolTable::new("app");
    let ns = table.namespace(SymbolId::ROOT, "N");
    let s = table.aggregate(ns, "S", AggregateKind::Struct);
    let ctor = table.function(
        s,
        "this",
        FunctionDecl::new(signature(Type::void(), Vec::new())).with_role(FunctionRole::Constructor),
    );
    let dtor = table.function(
        s,
        "~this",
        FunctionDecl::new(signature(Type::void(), Vec::new())).with_role(FunctionRole::Destructor),
    );
    assert_eq!(msvc64(&table, ctor), "??0S@N@@QEAA@XZ");
    assert_eq!(msvc64(&table, dtor), "??1S@N@@QEAA@XZ");
}

#[test]
fn variables_encode_storage_digit_and_cv() {
    let mut table = SymbolTable::new("app");
    let ns = table.namespace(SymbolId::ROOT, "N");
    let p = table.variable(
        SymbolId::ROOT,
        "p",
        VariableDecl::new(int().pointer_to(), StorageClass::EXTERN),
    );
    let counter = table.variable(ns, "counter", VariableDecl::new(int(), StorageClass::GSHARED));
    let limit = table.variable(
        ns,
        "limit",
        VariableDecl::new(int().const_of(), StorageClass::EXTERN),
    );
    let s = table.aggregate(SymbolId::ROOT, "S", AggregateKind::Struct);
    let member = table.variable(s, "x", VariableDecl::new(int(), StorageClass::GSHARED));
    assert_eq!(msvc64(&table, p), "?p@@3PEAHEA");
    assert_eq!(mangled(&table, p, &MangleConfig::msvc32()), "?p@@3PAHA");
    assert_eq!(msvc64(&table, counter), "?counter@N@@3HA");
    assert_eq!(msvc64(&table, limit), "?limit@N@@3HB");
    assert_eq!(msvc64(&table, member), "?x@S@@2HA");
}

#[test]
fn thread_local_variable_is_rejected() {
    let mut table = SymbolTable::new("app");
    let tls = table.variable(
        SymbolId::ROOT,
        "tls",
        VariableDecl::new(int(), StorageClass::THREAD_LOCAL),
    );
    let err = msvc_err(&table, tls);
    assert_eq!(err.kind(), MangleErrorKind::UnsupportedStorage);
}

#[test]
fn class_parameters_are_passed_by_pointer() {
    let mut table = SymbolTable::new("app");
    let c = table.aggregate(SymbolId::ROOT, "C", AggregateKind::Class);
    let g = void_fn(&mut table, SymbolId::ROOT, "g", vec![Type::class_of(c)]);
    assert_eq!(msvc64(&table, g), "?g@@YAXPEAVC@@@Z");
}

#[test]
fn pointer_and_reference_parameters() {
    let mut table = SymbolTable::new("app");
    let printf = table.function(
        SymbolId::ROOT,
        "printf",
        FunctionDecl::new(
            signature(int(), vec![Type::basic(BasicKind::Char).const_of().pointer_to()])
                .with_variadic(Variadic::C),
        ),
    );
    let by_ref = void_fn(&mut table, SymbolId::ROOT, "g", vec![int().reference_to()]);
    let callback = void_fn(
        &mut table,
        SymbolId::ROOT,
        "h",
        vec![Type::function(signature(int(), vec![int()])).pointer_to()],
    );
    assert_eq!(msvc64(&table, printf), "?printf@@YAHPEBDZZ");
    assert_eq!(msvc64(&table, by_ref), "?g@@YAXAEAH@Z");
    assert_eq!(msvc64(&table, callback), "?h@@YAXP6AHH@Z@Z");
}

#[test]
fn aggregate_return_types_are_prefixed() {
    let mut table = SymbolTable::new("app");
    let s = table.aggregate(SymbolId::ROOT, "S", AggregateKind::Struct);
    let make = table.function(
        SymbolId::ROOT,
        "make",
        FunctionDecl::new(signature(Type::struct_of(s), Vec::new())),
    );
    assert_eq!(msvc64(&table, make), "?make@@YA?AUS@@XZ");
}

#[test]
fn enums_carry_their_underlying_size() {
    let mut table = SymbolTable::new("app");
    let color = table.enumeration(SymbolId::ROOT, "Color", BasicKind::Int32);
    let e = void_fn(&mut table, SymbolId::ROOT, "e", vec![Type::enum_of(color)]);
    assert_eq!(msvc64(&table, e), "?e@@YAXW4Color@@@Z");
}

#[test]
fn dmc_spells_const_and_long_double_differently() {
    let mut table = SymbolTable::new("app");
    let konst = int().const_of();
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![konst.clone(), konst]);
    let r = void_fn(&mut table, SymbolId::ROOT, "r", vec![Type::basic(BasicKind::Float80)]);
    assert_eq!(msvc64(&table, f), "?f@@YAXHH@Z");
    assert_eq!(mangled(&table, f, &MangleConfig::dmc32()), "?f@@YAX_OH0@Z");
    assert_eq!(msvc64(&table, r), "?r@@YAX_T@Z");
    assert_eq!(mangled(&table, r, &MangleConfig::dmc32()), "?r@@YAX_Z@Z");
}

#[test]
fn type_table_stops_growing_after_ten_entries() {
    let mut table = SymbolTable::new("app");
    let structs: Vec<Type> = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K"]
        .into_iter()
        .map(|name| Type::struct_of(table.aggregate(SymbolId::ROOT, name, AggregateKind::Struct)))
        .collect();
    let mut params = structs.clone();
    params.push(structs[10].clone());
    params.push(structs[0].clone());
    let f = void_fn(&mut table, SymbolId::ROOT, "f", params);
    assert_eq!(
        msvc64(&table, f),
        "?f@@YAXUA@@UB@@UC@@UD@@UE@@UF@@UG@@UH@@UI@@UJ@@UK@@UK@@0@Z"
    );
}

#[test]
fn template_instances_are_mangled_as_nested_names() {
    let mut table = SymbolTable::new("app");
    let vec_int = struct_instance(
        &mut table,
        "Vec",
        vec![TemplateParam::Type],
        vec![TemplateArg::Type(int())],
    );
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![vec_int.pointer_to()]);
    assert_eq!(msvc64(&table, f), "?f@@YAXPEAU?$Vec@H@@@Z");
    assert_eq!(mangled(&table, f, &MangleConfig::dmc32()), "?f@@YAXPAU?$Vec@H@@@Z");
}

#[test]
fn template_values_use_encoded_numbers() {
    let mut table = SymbolTable::new("app");
    let negative = struct_instance(
        &mut table,
        "Foo",
        vec![TemplateParam::Value],
        vec![TemplateArg::Value { ty: int(), value: -5 }],
    );
    let unsigned = struct_instance(
        &mut table,
        "Bar",
        vec![TemplateParam::Value],
        vec![TemplateArg::Value {
            ty: Type::basic(BasicKind::UInt32),
            value: 42,
        }],
    );
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![negative.pointer_to()]);
    let g = void_fn(&mut table, SymbolId::ROOT, "g", vec![unsigned.pointer_to()]);
    assert_eq!(msvc64(&table, f), "?f@@YAXPEAU?$Foo@$0?4@@@Z");
    assert_eq!(msvc64(&table, g), "?g@@YAXPEAU?$Bar@$0CK@@@@Z");
}

#[test]
fn function_alias_argument_embeds_the_mangled_function() {
    let mut table = SymbolTable::new("app");
    let foo = void_fn(&mut table, SymbolId::ROOT, "foo", Vec::new());
    let call = struct_instance(
        &mut table,
        "Call",
        vec![TemplateParam::Alias],
        vec![TemplateArg::Symbol(foo)],
    );
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![call.pointer_to()]);
    assert_eq!(msvc64(&table, f), "?f@@YAXPEAU?$Call@$1?foo@@YAXXZ@@@Z");
}

#[test]
fn namespace_alias_argument_is_rejected() {
    let mut table = SymbolTable::new("app");
    let ns = table.namespace(SymbolId::ROOT, "N");
    let bad = struct_instance(
        &mut table,
        "Bad",
        vec![TemplateParam::Alias],
        vec![TemplateArg::Symbol(ns)],
    );
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![bad.pointer_to()]);
    let err = msvc_err(&table, f);
    assert_eq!(err.kind(), MangleErrorKind::UnsupportedTemplateArgument);
    assert_eq!(err.message(), "`N` is unsupported parameter for C++ template");
}

#[test]
fn unrepresentable_types_are_rejected() {
    let mut table = SymbolTable::new("app");
    let immutable = void_fn(
        &mut table,
        SymbolId::ROOT,
        "a",
        vec![int().with_qualifier(Qualifier::Immutable)],
    );
    let slice = void_fn(
        &mut table,
        SymbolId::ROOT,
        "b",
        vec![Type::new(crate::symbols::TypeKind::DynamicArray(Box::new(int())))],
    );
    let array = void_fn(
        &mut table,
        SymbolId::ROOT,
        "c",
        vec![Type::static_array(int(), 4)],
    );
    assert_eq!(msvc_err(&table, immutable).kind(), MangleErrorKind::UnsupportedQualifier);
    assert_eq!(msvc_err(&table, slice).kind(), MangleErrorKind::UnsupportedType);
    assert_eq!(msvc_err(&table, array).kind(), MangleErrorKind::UnsupportedStorage);
}

#[test]
fn numbers_use_single_digits_then_letter_hex() {
    let table = SymbolTable::new("app");
    let config = MangleConfig::msvc64();
    let mut mangler = Mangler::new(&table, &config);
    for value in [0, 1, 10, 11, 16, 255] {
        mangler.number(value);
        mangler.out.push(' ');
    }
    assert_eq!(mangler.out, "A@ 0 9 L@ BA@ PP@ ");
}

#[test]
fn pointers_to_static_arrays_flatten_their_dimensions() {
    let mut table = SymbolTable::new("app");
    let a = void_fn(&mut table, SymbolId::ROOT, "a", vec![Type::static_array(int(), 4).pointer_to()]);
    let nested = Type::static_array(Type::static_array(int(), 2), 3);
    let b = void_fn(&mut table, SymbolId::ROOT, "b", vec![nested.pointer_to()]);
    assert_eq!(msvc64(&table, a), "?a@@YAXQEAY03H@Z");
    assert_eq!(msvc64(&table, b), "?b@@YAXQEAY121H@Z");
    assert_eq!(mangled(&table, a, &MangleConfig::dmc32()), "?a@@YAXPAY03H@Z");
}

#[test]
fn vectors_are_sse_unions() {
    let mut table = SymbolTable::new("app");
    let float4 = Type::vector(Type::basic(BasicKind::Float32), 4);
    let v = void_fn(&mut table, SymbolId::ROOT, "v", vec![float4]);
    assert_eq!(msvc64(&table, v), "?v@@YAXT__m128@@@Z");
}

#[test]
fn variable_alias_argument_differs_under_dmc() {
    let mut table = SymbolTable::new("app");
    let var = table.variable(
        SymbolId::ROOT,
        "var",
        VariableDecl::new(int(), StorageClass::EXTERN),
    );
    let holder = struct_instance(
        &mut table,
        "V",
        vec![TemplateParam::Alias],
        vec![TemplateArg::Variable(var)],
    );
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![holder.pointer_to()]);
    assert_eq!(msvc64(&table, f), "?f@@YAXPEAU?$V@$E?var@@3HA@@@Z");
    assert_eq!(mangled(&table, f, &MangleConfig::dmc32()), "?f@@YAXPAU?$V@$1?var@@3HA@@@Z");
}

#[test]
fn member_template_alias_carries_the_aggregate_tag() {
    let aliased = |kind: AggregateKind| {
        let mut table = SymbolTable::new("app");
        let decl = TemplateDecl::new(vec![TemplateParam::Type])
            .with_member(TemplateMember::Aggregate(kind));
        let w = table.template(SymbolId::ROOT, "W", decl);
        let holder = struct_instance(
            &mut table,
            "V",
            vec![TemplateParam::Alias],
            vec![TemplateArg::Symbol(w)],
        );
        let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![holder.pointer_to()]);
        (table, f)
    };

    let (table, f) = aliased(AggregateKind::Struct);
    assert_eq!(msvc64(&table, f), "?f@@YAXPEAU?$V@UW@@@@@Z");
    assert_eq!(mangled(&table, f, &MangleConfig::dmc32()), "?f@@YAXPAU?$V@VW@@@@@Z");
    let (table, f) = aliased(AggregateKind::Union);
    assert_eq!(msvc64(&table, f), "?f@@YAXPEAU?$V@TW@@@@@Z");
    let (table, f) = aliased(AggregateKind::Class);
    assert_eq!(msvc64(&table, f), "?f@@YAXPEAU?$V@VW@@@@@Z");
}

#[test]
fn calling_conventions_on_32_bit_function_pointers() {
    let mut table = SymbolTable::new("app");
    let callback = |linkage: Linkage| {
        Type::function(signature(int(), vec![int()]).with_linkage(linkage)).pointer_to()
    };
    let stdcall = void_fn(&mut table, SymbolId::ROOT, "h", vec![callback(Linkage::Windows)]);
    let pascal = void_fn(&mut table, SymbolId::ROOT, "p", vec![callback(Linkage::Pascal)]);
    assert_eq!(mangled(&table, stdcall, &MangleConfig::msvc32()), "?h@@YAXP6GHH@Z@Z");
    assert_eq!(mangled(&table, pascal, &MangleConfig::msvc32()), "?p@@YAXP6CHH@Z@Z");
    assert_eq!(msvc64(&table, stdcall), "?h@@YAXP6AHH@Z@Z");
}

#[test]
fn dmc_template_names_carry_their_scope() {
    let mut table = SymbolTable::new("app");
    let ns = table.namespace(SymbolId::ROOT, "N");
    let decl = TemplateDecl::new(vec![TemplateParam::Type])
        .with_member(TemplateMember::Aggregate(AggregateKind::Struct));
    let template = table.template(ns, "Vec", decl);
    let instance = table.instantiate(template, vec![TemplateArg::Type(int())]);
    let member = table.aggregate(instance, "Vec", AggregateKind::Struct);
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![Type::struct_of(member).pointer_to()]);
    assert_eq!(mangled(&table, f, &MangleConfig::dmc32()), "?f@@YAXPAU?$Vec@N@H@N@@@Z");
    assert_eq!(msvc64(&table, f), "?f@@YAXPEAU?$Vec@H@N@@@Z");
}
