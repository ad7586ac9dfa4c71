#![cfg(test)]

use crate::{
    Ident, Location, Module, StructDef, Type, UnionDef,
    arena::{Arena, Key as _},
    ast::StructId,
};

fn ident(name: &str) -> Ident {
    Ident::new(name, Location::new(1, 0))
}

#[test]
fn test_ident_matches_ignores_location() {
    let a = Ident::new("x", Location::new(1, 0));
    let b = Ident::new("x", Location::new(7, 3));
    assert!(a.matches(&b));
    assert_eq!(a, "x");
    assert_ne!(a, "y");
}

#[test]
fn test_arena_roundtrip() {
    let mut arena: Arena<StructId, StructDef> = Arena::new();
    assert!(arena.is_empty());
    let id = arena.insert(StructDef::new(ident("Server")));
    assert_eq!(id, StructId::from_usize(0));
    assert_eq!(arena.len(), 1);
    assert_eq!(arena[id].name, "Server");
    assert!(arena.get(StructId(1)).is_none());
}

#[test]
fn test_type_display() {
    let mut module = Module::new("test.strata");
    let sid = module.structs.insert(StructDef::new(ident("Server")));
    let uid = module.unions.insert(UnionDef {
        name: ident("Backend"),
        members: vec![Type::Struct(sid), Type::String],
    });

    assert_eq!(Type::Struct(sid).display(&module).to_string(), "Server");
    assert_eq!(Type::Union(uid).display(&module).to_string(), "Backend");
    assert_eq!(
        Type::Optional(Box::new(Type::Int)).display(&module).to_string(),
        "Int?"
    );
}
