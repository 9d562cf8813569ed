mod common;

use common::{int, struct_instance, void_fn};
use cppmangle::symbols::{
    AggregateKind, BasicKind, SymbolId, SymbolTable, TemplateArg, TemplateParam, Type, TypeKind,
};
use cppmangle::{MangleConfig, MangleErrorKind, mangle};

fn mangled(table: &SymbolTable, id: SymbolId, config: &MangleConfig) -> String {
    match mangle(table, id, config) {
        Ok(name) => name,
        Err(err) => panic!("expected Ok mangled name, found Err: {err}"),
    }
}

#[test]
fn outer_scopes_are_back_referenced_by_slot() {
    let mut table = SymbolTable::new("app");
    let a = table.namespace(SymbolId::ROOT, "A");
    let b = table.namespace(a, "B");
    let c = table.namespace(b, "C");
    let s = table.aggregate(b, "S", AggregateKind::Struct);
    let g = void_fn(&mut table, c, "g", vec![Type::struct_of(s)]);
    assert_eq!(
        mangled(&table, g, &MangleConfig::msvc64()),
        "?g@C@B@A@@YAXUS@23@@Z"
    );
}

#[test]
fn eleventh_identifier_is_never_compressed() {
    let mut table = SymbolTable::new("app");
    let mut scopes = Vec::new();
    let mut parent = SymbolId::ROOT;
    for depth in 0..10 {
        parent = table.namespace(parent, format!("n{depth}"));
        scopes.push(parent);
    }
    let s = table.aggregate(scopes[0], "S", AggregateKind::Struct);
    let t = table.aggregate(scopes[1], "T", AggregateKind::Struct);
    let f = void_fn(
        &mut table,
        parent,
        "f",
        vec![Type::struct_of(s), Type::struct_of(t)],
    );
    // `f` and n9..n1 fill all ten slots; n0, S and T are always spelled out.
    assert_eq!(
        mangled(&table, f, &MangleConfig::msvc64()),
        "?f@n9@n8@n7@n6@n5@n4@n3@n2@n1@n0@@YAXUS@n0@@UT@9n0@@@Z"
    );
}

#[test]
fn negative_template_value_is_prefixed() {
    let mut table = SymbolTable::new("app");
    let foo = struct_instance(
        &mut table,
        SymbolId::ROOT,
        "Foo",
        vec![TemplateParam::Value],
        vec![TemplateArg::Value {
            ty: int(),
            value: -5,
        }],
    );
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![Type::struct_of(foo).pointer_to()]);
    assert_eq!(
        mangled(&table, f, &MangleConfig::msvc64()),
        "?f@@YAXPEAU?$Foo@$0?4@@@Z"
    );
    assert_eq!(
        mangled(&table, f, &MangleConfig::msvc32()),
        "?f@@YAXPAU?$Foo@$0?4@@@Z"
    );
}

#[test]
fn unbounded_arrays_cannot_cross_the_boundary() {
    let mut table = SymbolTable::new("app");
    let slice = Type::new(TypeKind::DynamicArray(Box::new(Type::basic(BasicKind::Char))));
    let f = void_fn(&mut table, SymbolId::ROOT, "f", vec![slice]);
    for config in [MangleConfig::msvc64(), MangleConfig::msvc32(), MangleConfig::dmc32()] {
        match mangle(&table, f, &config) {
            Ok(name) => panic!("expected Err, found Ok: {name}"),
            Err(err) => {
                assert_eq!(err.kind(), MangleErrorKind::UnsupportedType);
                assert_eq!(err.symbol(), Some("f"));
            }
        }
    }
}
