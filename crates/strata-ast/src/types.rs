use core::fmt;
use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};

use crate::ast::{ExprId, Module, StructId, UnionId};

/// The resolved type of a value.
#[must_use]
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A boolean.
    Bool,
    /// A signed 64-bit integer.
    Int,
    /// An IEEE-754 double.
    Float,
    /// A character (UTF-8) string.
    String,
    /// A named struct.
    Struct(StructId),
    /// A named union.
    Union(UnionId),
    /// An optional of some other type.
    Optional(Box<Type>),
}

impl Type {
    /// Reports whether the type admits `null`.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Renders the type name against the module's definitions.
    pub fn display<'a>(&'a self, module: &'a Module) -> impl fmt::Display + 'a {
        TypeDisplay { ty: self, module }
    }
}

struct TypeDisplay<'a> {
    ty: &'a Type,
    module: &'a Module,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Type::Bool => write!(f, "Boolean"),
            Type::Int => write!(f, "Int"),
            Type::Float => write!(f, "Float"),
            Type::String => write!(f, "String"),
            Type::Struct(id) => match self.module.structs.get(*id) {
                Some(def) => write!(f, "{}", def.name),
                None => write!(f, "<struct #{}>", id.0),
            },
            Type::Union(id) => match self.module.unions.get(*id) {
                Some(def) => write!(f, "{}", def.name),
                None => write!(f, "<union #{}>", id.0),
            },
            Type::Optional(inner) => {
                write!(
                    f,
                    "{}?",
                    TypeDisplay {
                        ty: inner,
                        module: self.module
                    }
                )
            }
        }
    }
}

/// The resolved type table, produced by the upstream resolution phase.
///
/// Maps each expression to its resolved type. The table is read-only
/// during semantic analysis and may be shared across analyses by
/// reference.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTable {
    types: HashMap<ExprId, Type>,
}

impl TypeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the resolved type of an expression.
    pub fn insert(&mut self, id: ExprId, ty: Type) {
        self.types.insert(id, ty);
    }

    /// Returns the resolved type of an expression, if known.
    pub fn get(&self, id: ExprId) -> Option<&Type> {
        self.types.get(&id)
    }
}
