//! The closed builtin surface of the language.
//!
//! Builtins such as `print` and the type-conversion functions look
//! dynamically typed but are not: each is a fixed signature accepting
//! a finite, tagged set of value shapes. Global constants are
//! process-wide read-only values with no reinitialization. Both live
//! in frozen `const` tables constructed before any analysis runs.

/// A value shape a builtin can accept or return.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Shape {
    /// A boolean.
    Bool,
    /// A signed 64-bit integer.
    Int,
    /// An IEEE-754 double.
    Float,
    /// A string.
    String,
    /// The `null` value.
    Null,
    /// Any struct instance.
    Struct,
    /// No value; the builtin is called for effect.
    Unit,
}

/// The signature of one builtin function.
#[derive(Debug)]
pub struct BuiltinSig {
    /// The builtin's name.
    pub name: &'static str,
    /// The shapes its argument accepts.
    pub accepts: &'static [Shape],
    /// The shape it returns.
    pub returns: Shape,
}

const ANY: &[Shape] = &[
    Shape::Bool,
    Shape::Int,
    Shape::Float,
    Shape::String,
    Shape::Null,
    Shape::Struct,
];

/// Every builtin function, by name.
pub const BUILTINS: &[BuiltinSig] = &[
    BuiltinSig {
        name: "print",
        accepts: ANY,
        returns: Shape::Unit,
    },
    BuiltinSig {
        name: "toString",
        accepts: ANY,
        returns: Shape::String,
    },
    BuiltinSig {
        name: "toInt",
        accepts: &[Shape::Int, Shape::Float, Shape::String],
        returns: Shape::Int,
    },
    BuiltinSig {
        name: "toFloat",
        accepts: &[Shape::Int, Shape::Float, Shape::String],
        returns: Shape::Float,
    },
    BuiltinSig {
        name: "toBoolean",
        accepts: &[Shape::Bool, Shape::String],
        returns: Shape::Bool,
    },
];

/// Looks up a builtin signature by name.
pub fn builtin(name: &str) -> Option<&'static BuiltinSig> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// A global constant.
#[derive(Debug)]
pub struct GlobalConst {
    /// The constant's name.
    pub name: &'static str,
    /// The constant's shape.
    pub shape: Shape,
}

/// Every global constant, by name.
pub const GLOBAL_CONSTS: &[GlobalConst] = &[
    GlobalConst {
        name: "pi",
        shape: Shape::Float,
    },
    GlobalConst {
        name: "e",
        shape: Shape::Float,
    },
    GlobalConst {
        name: "infinity",
        shape: Shape::Float,
    },
    GlobalConst {
        name: "nan",
        shape: Shape::Float,
    },
    GlobalConst {
        name: "maxInt",
        shape: Shape::Int,
    },
    GlobalConst {
        name: "minInt",
        shape: Shape::Int,
    },
];

/// Looks up a global constant by name.
pub fn global_const(name: &str) -> Option<&'static GlobalConst> {
    GLOBAL_CONSTS.iter().find(|c| c.name == name)
}
