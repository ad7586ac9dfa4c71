use core::fmt;

use serde_derive::{Deserialize, Serialize};

use crate::{
    Location,
    arena::{Arena, new_key_type},
    loc::Located,
    types::Type,
};

new_key_type! {
    /// The id of a [`StructDef`] in a [`Module`].
    pub struct StructId;
}

new_key_type! {
    /// The id of a [`UnionDef`] in a [`Module`].
    pub struct UnionId;
}

new_key_type! {
    /// The stable id of an [`Expression`], assigned by the resolver.
    ///
    /// The resolved type table is keyed by these ids.
    pub struct ExprId;
}

/// An identifier.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    /// The identifier name.
    pub name: String,
    /// The source location of this identifier.
    pub loc: Location,
}

impl Ident {
    /// Creates an identifier.
    pub fn new(name: impl Into<String>, loc: Location) -> Self {
        Self {
            name: name.into(),
            loc,
        }
    }

    /// Reports whether the identifiers are the same, ignoring
    /// locations.
    pub fn matches(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.name, self.loc)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}

impl<T> PartialEq<T> for Ident
where
    T: AsRef<str> + ?Sized,
{
    fn eq(&self, other: &T) -> bool {
        self.name == other.as_ref()
    }
}

impl Located for Ident {
    fn loc(&self) -> Location {
        self.loc
    }
}

/// How many times a property may be assigned.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Mutability {
    /// `val`-like: at most one assignment per execution path.
    Single,
    /// `var`-like: any number of assignments.
    Multi,
}

/// Property visibility.
///
/// Visibility does not affect semantic analysis; it is carried for
/// downstream serializers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Visibility {
    /// Rendered into output documents.
    Public,
    /// Usable within the struct but not rendered.
    Hidden,
}

/// How many times a method may be invoked per struct instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CallKind {
    /// May be invoked at most once per execution path.
    Once,
    /// May be invoked any number of times; each invocation appends to
    /// the method's backing collection.
    Repeated,
    /// A computed, read-only member.
    Getter,
    /// A free function, not bound to an instance.
    Global,
}

/// A struct property declaration.
///
/// Mutability and optionality are fixed at declaration and never
/// change afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    /// The property name.
    pub name: Ident,
    /// The declared type.
    pub ty: Type,
    /// Single- or multi-assignment.
    pub mutability: Mutability,
    /// Whether the property is optional. Optional properties carry an
    /// implicit `null` and never require assignment.
    pub optional: bool,
    /// Property visibility.
    pub visibility: Visibility,
}

impl Located for PropertyDecl {
    fn loc(&self) -> Location {
        self.name.loc
    }
}

/// A struct method or getter declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// The method name.
    pub name: Ident,
    /// The invocation-multiplicity kind.
    pub kind: CallKind,
    /// The method body.
    pub body: Vec<Statement>,
}

impl Located for MethodDecl {
    fn loc(&self) -> Location {
        self.name.loc
    }
}

/// An `init` block: statements run when the struct is instantiated.
///
/// A struct may declare several; they execute in declaration order and
/// together form the instance body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitDecl {
    /// The block's statements.
    pub body: Vec<Statement>,
    /// The source location of the block header.
    pub loc: Location,
}

impl Located for InitDecl {
    fn loc(&self) -> Location {
        self.loc
    }
}

/// A struct definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    /// The struct name.
    pub name: Ident,
    /// Mixins, in application order. Resolved by structural inlining
    /// before analysis.
    pub mixins: Vec<StructId>,
    /// Property declarations, in declaration order.
    pub properties: Vec<PropertyDecl>,
    /// Method and getter declarations, in declaration order.
    pub methods: Vec<MethodDecl>,
    /// `init` blocks, in declaration order.
    pub inits: Vec<InitDecl>,
}

impl StructDef {
    /// Creates an empty struct definition.
    pub fn new(name: Ident) -> Self {
        Self {
            name,
            mixins: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            inits: Vec::new(),
        }
    }
}

impl Located for StructDef {
    fn loc(&self) -> Location {
        self.name.loc
    }
}

/// A named union (variant) type definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnionDef {
    /// The union name.
    pub name: Ident,
    /// The member types, in declaration order. Members may themselves
    /// be unions; they are flattened during domain decomposition.
    pub members: Vec<Type>,
}

/// One source file's resolved declarations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// The source file path.
    pub path: String,
    /// Struct definitions.
    pub structs: Arena<StructId, StructDef>,
    /// Union definitions.
    pub unions: Arena<UnionId, UnionDef>,
}

impl Module {
    /// Creates an empty module.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            structs: Arena::new(),
            unions: Arena::new(),
        }
    }
}

/// A literal value.
///
/// Float literals keep their source spelling so that patterns can be
/// compared for duplication without depending on float equality.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Literal {
    /// A boolean literal.
    Bool(bool),
    /// A signed 64-bit integer literal.
    Int(i64),
    /// A float literal, as written.
    Float(String),
    /// A string literal.
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => b.fmt(f),
            Self::Int(i) => i.fmt(f),
            Self::Float(s) => s.fmt(f),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// An expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// The resolver-assigned id, the key into the type table.
    pub id: ExprId,
    /// The expression kind.
    pub kind: ExprKind,
    /// The source location of this expression.
    pub loc: Location,
}

impl Located for Expression {
    fn loc(&self) -> Location {
        self.loc
    }
}

/// The kind of an [`Expression`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// A literal value.
    Literal(Literal),
    /// The `null` literal.
    Null,
    /// A read of an enclosing struct property.
    Property(Ident),
    /// A read of a local (`let`-bound or lambda parameter) binding.
    Local(Ident),
    /// A call in expression position.
    Call(CallExpr),
    /// An `if`/`else` expression. Both branches are required in
    /// expression position.
    If(Box<IfExpression>),
    /// A `match` expression.
    Match(Box<MatchExpression>),
    /// A lambda literal. Its body is a nested scope that observes, but
    /// does not share, the enclosing assignment facts.
    Lambda(LambdaExpression),
}

/// A call, in statement or expression position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    /// The callee: a struct method, a builtin, or a global function.
    pub method: Ident,
    /// The named selector for repeated-with-constructor-selection
    /// invocations (e.g. `build "release" { .. }`), if present.
    pub selector: Option<Ident>,
    /// Argument expressions.
    pub args: Vec<Expression>,
}

/// An `if`/`else` expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfExpression {
    /// Each `if` and `else if` branch: condition and value.
    pub branches: Vec<(Expression, Expression)>,
    /// The `else` value.
    pub fallback: Expression,
}

/// A `match` expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchExpression {
    /// The value being matched.
    pub scrutinee: Expression,
    /// The match arms, in source order.
    pub arms: Vec<MatchExprArm>,
}

/// One arm of a [`MatchExpression`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchExprArm {
    /// The arm's pattern.
    pub pattern: Pattern,
    /// The arm's value.
    pub expression: Expression,
    /// The source location of this arm.
    pub loc: Location,
}

impl Located for MatchExprArm {
    fn loc(&self) -> Location {
        self.loc
    }
}

/// A lambda literal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpression {
    /// Parameter names.
    pub params: Vec<Ident>,
    /// The lambda body.
    pub body: Vec<Statement>,
}

/// A statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `property = value`
    Assign(AssignStatement),
    /// A call in statement position.
    Call(CallStatement),
    /// `let name = value`
    Let(LetStatement),
    /// An `if` statement.
    If(IfStatement),
    /// A `match` statement.
    Match(MatchStatement),
    /// A bare expression evaluated for effect.
    Expression(Expression),
}

impl Located for Statement {
    fn loc(&self) -> Location {
        match self {
            Self::Assign(s) => s.property.loc,
            Self::Call(s) => s.call.method.loc,
            Self::Let(s) => s.name.loc,
            Self::If(s) => s.loc,
            Self::Match(s) => s.loc,
            Self::Expression(e) => e.loc,
        }
    }
}

/// An assignment to an enclosing struct property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignStatement {
    /// The property being assigned.
    pub property: Ident,
    /// The assigned value.
    pub value: Expression,
}

/// A call statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallStatement {
    /// The call itself.
    pub call: CallExpr,
}

/// A local binding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LetStatement {
    /// The bound name.
    pub name: Ident,
    /// The bound value.
    pub value: Expression,
}

/// An `if` statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    /// Each `if` and `else if` branch.
    pub branches: Vec<(Expression, Vec<Statement>)>,
    /// The `else` branch, if present.
    pub fallback: Option<Vec<Statement>>,
    /// The source location of the `if` keyword.
    pub loc: Location,
}

/// A `match` statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchStatement {
    /// The value being matched.
    pub scrutinee: Expression,
    /// The match arms, in source order.
    pub arms: Vec<MatchArm>,
    /// The source location of the `match` keyword.
    pub loc: Location,
}

/// One arm of a [`MatchStatement`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    /// The arm's pattern.
    pub pattern: Pattern,
    /// The statements executed when the pattern matches.
    pub statements: Vec<Statement>,
    /// The source location of this arm.
    pub loc: Location,
}

impl Located for MatchArm {
    fn loc(&self) -> Location {
        self.loc
    }
}

/// A `match` pattern.
///
/// Patterns are tried top to bottom; the first match wins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// `is T`: a type test.
    Is(Type),
    /// The `null` pattern.
    Null,
    /// A literal-value pattern.
    Literal(Literal),
    /// An integer range pattern.
    Range(RangePattern),
    /// The `else` (wildcard) arm.
    Else,
}

/// An integer range pattern, inclusive on both present bounds.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RangePattern {
    /// The lower bound, if bounded below.
    pub lo: Option<i64>,
    /// The upper bound, if bounded above.
    pub hi: Option<i64>,
}
