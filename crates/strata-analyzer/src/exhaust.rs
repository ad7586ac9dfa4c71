//! Match exhaustiveness and reachability.
//!
//! For every `match`, the scrutinee's resolved type decomposes into
//! an obligation: the portion of its value domain not yet proven
//! covered. Arms are processed top to bottom (first match wins), each
//! shrinking the obligation. A non-empty obligation after the last
//! arm is an error naming what is missing; an arm processed while the
//! obligation is already empty is an unreachable-pattern warning.
//!
//! Unbounded primitive domains (Int, Float, String) can never be
//! closed by literal or range arms, no matter how many; only an
//! `else` arm, or a type test covering the whole non-null domain,
//! proves them complete.
//!
//! The oracle walks bodies recursively, so matches nested inside arm
//! bodies, `if` branches, and lambda literals are all checked with
//! their own resolved scrutinee types.

use buggy::{Bug, BugExt as _, bug};
use indexmap::IndexSet;
use strata_ast::{
    ExprKind, Expression, Literal, Location, Module, Pattern, Statement, Type, TypeTable, UnionId,
};

use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics};

/// The enumerable part of a scrutinee domain.
#[derive(Clone, Debug)]
enum DomainKind {
    /// A boolean: `true` and `false`, tracked separately.
    Bool { t: bool, f: bool },
    /// A union: the member tags still uncovered.
    Tags(IndexSet<Type>),
    /// An unbounded primitive. Only a whole-domain type test or an
    /// `else` covers it.
    Open { ty: Type, covered: bool },
}

impl DomainKind {
    fn is_empty(&self) -> bool {
        match self {
            Self::Bool { t, f } => !t && !f,
            Self::Tags(tags) => tags.is_empty(),
            Self::Open { covered, .. } => *covered,
        }
    }
}

/// The uncovered remainder of one scrutinee's value domain.
#[derive(Clone, Debug)]
struct Obligation {
    /// Whether `null` is still uncovered.
    needs_null: bool,
    kind: DomainKind,
    /// Whether an `else` arm has cleared everything.
    closed: bool,
}

impl Obligation {
    /// Decomposes a resolved scrutinee type into its initial
    /// obligation.
    fn decompose(ty: &Type, module: &Module) -> Result<Self, Bug> {
        let mut needs_null = false;
        let mut base = ty;
        while let Type::Optional(inner) = base {
            needs_null = true;
            base = inner.as_ref();
        }

        let kind = match base {
            Type::Bool => DomainKind::Bool { t: true, f: true },
            Type::Union(id) => {
                let mut tags = IndexSet::new();
                let mut seen = IndexSet::new();
                flatten_union(*id, module, &mut tags, &mut needs_null, &mut seen)?;
                DomainKind::Tags(tags)
            }
            Type::Struct(_) => {
                let mut tags = IndexSet::new();
                tags.insert(base.clone());
                DomainKind::Tags(tags)
            }
            Type::Int | Type::Float | Type::String => DomainKind::Open {
                ty: base.clone(),
                covered: false,
            },
            Type::Optional(_) => {
                bug!("optional layers already stripped")
            }
        };
        Ok(Self {
            needs_null,
            kind,
            closed: false,
        })
    }

    /// Reports whether nothing remains to cover.
    fn is_satisfied(&self) -> bool {
        self.closed || (!self.needs_null && self.kind.is_empty())
    }

    /// Removes everything a type test on `ty` covers.
    fn cover_type(&mut self, ty: &Type, module: &Module) -> Result<(), Bug> {
        let mut base = ty;
        while let Type::Optional(inner) = base {
            self.needs_null = false;
            base = inner.as_ref();
        }
        match &mut self.kind {
            DomainKind::Bool { t, f } => {
                if *base == Type::Bool {
                    *t = false;
                    *f = false;
                }
            }
            DomainKind::Tags(tags) => {
                // A test on a nested union covers every tag that
                // union flattens to.
                if let Type::Union(id) = base {
                    let mut covered = IndexSet::new();
                    let mut covered_null = false;
                    let mut seen = IndexSet::new();
                    flatten_union(*id, module, &mut covered, &mut covered_null, &mut seen)?;
                    for tag in &covered {
                        tags.shift_remove(tag);
                    }
                    if covered_null {
                        self.needs_null = false;
                    }
                } else {
                    tags.shift_remove(base);
                }
            }
            DomainKind::Open { ty: prim, covered } => {
                if base == prim {
                    *covered = true;
                }
            }
        }
        Ok(())
    }

    /// Removes a literal value from an enumerable domain. Literals
    /// never close an unbounded domain.
    fn cover_literal(&mut self, lit: &Literal) {
        if let (DomainKind::Bool { t, f }, Literal::Bool(b)) = (&mut self.kind, lit) {
            if *b {
                *t = false;
            } else {
                *f = false;
            }
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }

    /// Describes the uncovered remainder, or `None` if the match is
    /// exhaustive.
    fn missing(&self, module: &Module) -> Option<String> {
        if self.is_satisfied() {
            return None;
        }
        if let DomainKind::Open { ty, covered: false } = &self.kind {
            return Some(format!(
                "matching on `{}` requires an `else` arm",
                ty.display(module)
            ));
        }

        let mut parts = Vec::new();
        match &self.kind {
            DomainKind::Bool { t, f } => {
                if *t {
                    parts.push("`true`".to_owned());
                }
                if *f {
                    parts.push("`false`".to_owned());
                }
            }
            DomainKind::Tags(tags) => {
                parts.extend(tags.iter().map(|tag| format!("`{}`", tag.display(module))));
            }
            DomainKind::Open { .. } => {}
        }
        if self.needs_null {
            parts.push("`null`".to_owned());
        }
        match parts.len() {
            0 => None,
            1 => Some(format!("{} is not covered", parts[0])),
            _ => Some(format!("{} are not covered", parts.join(", "))),
        }
    }
}

/// Flattens a union's members into non-union tags, recursing through
/// nested unions and folding optional members into the null
/// obligation. Revisits are skipped so mutually recursive unions
/// terminate.
fn flatten_union(
    id: UnionId,
    module: &Module,
    tags: &mut IndexSet<Type>,
    needs_null: &mut bool,
    seen: &mut IndexSet<UnionId>,
) -> Result<(), Bug> {
    if !seen.insert(id) {
        return Ok(());
    }
    let def = module.unions.get(id).assume("union id resolves")?;
    for member in &def.members {
        let mut base = member;
        while let Type::Optional(inner) = base {
            *needs_null = true;
            base = inner.as_ref();
        }
        match base {
            Type::Union(nested) => flatten_union(*nested, module, tags, needs_null, seen)?,
            _ => {
                tags.insert(base.clone());
            }
        }
    }
    Ok(())
}

/// Checks every `match` reachable from a body.
pub(crate) struct ExhaustPass<'a> {
    module: &'a Module,
    types: &'a TypeTable,
}

impl<'a> ExhaustPass<'a> {
    pub fn new(module: &'a Module, types: &'a TypeTable) -> Self {
        Self { module, types }
    }

    pub fn check_body(&self, stmts: &[Statement], sink: &mut Diagnostics) -> Result<(), Bug> {
        for stmt in stmts {
            self.check_stmt(stmt, sink)?;
        }
        Ok(())
    }

    fn check_stmt(&self, stmt: &Statement, sink: &mut Diagnostics) -> Result<(), Bug> {
        match stmt {
            Statement::Assign(s) => self.check_expr(&s.value, sink),
            Statement::Call(s) => {
                for arg in &s.call.args {
                    self.check_expr(arg, sink)?;
                }
                Ok(())
            }
            Statement::Let(s) => self.check_expr(&s.value, sink),
            Statement::If(s) => {
                for (cond, body) in &s.branches {
                    self.check_expr(cond, sink)?;
                    self.check_body(body, sink)?;
                }
                if let Some(body) = &s.fallback {
                    self.check_body(body, sink)?;
                }
                Ok(())
            }
            Statement::Match(s) => {
                self.check_expr(&s.scrutinee, sink)?;
                self.check_arms(
                    &s.scrutinee,
                    s.arms.iter().map(|arm| (&arm.pattern, arm.loc)),
                    s.loc,
                    sink,
                )?;
                for arm in &s.arms {
                    self.check_body(&arm.statements, sink)?;
                }
                Ok(())
            }
            Statement::Expression(e) => self.check_expr(e, sink),
        }
    }

    fn check_expr(&self, expr: &Expression, sink: &mut Diagnostics) -> Result<(), Bug> {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Null | ExprKind::Property(_) | ExprKind::Local(_) => {
                Ok(())
            }
            ExprKind::Call(call) => {
                for arg in &call.args {
                    self.check_expr(arg, sink)?;
                }
                Ok(())
            }
            ExprKind::If(ifx) => {
                for (cond, value) in &ifx.branches {
                    self.check_expr(cond, sink)?;
                    self.check_expr(value, sink)?;
                }
                self.check_expr(&ifx.fallback, sink)
            }
            ExprKind::Match(mx) => {
                self.check_expr(&mx.scrutinee, sink)?;
                self.check_arms(
                    &mx.scrutinee,
                    mx.arms.iter().map(|arm| (&arm.pattern, arm.loc)),
                    expr.loc,
                    sink,
                )?;
                for arm in &mx.arms {
                    self.check_expr(&arm.expression, sink)?;
                }
                Ok(())
            }
            ExprKind::Lambda(lambda) => self.check_body(&lambda.body, sink),
        }
    }

    /// Runs the oracle over one match's ordered arms.
    fn check_arms<'p>(
        &self,
        scrutinee: &Expression,
        arms: impl Iterator<Item = (&'p Pattern, Location)>,
        match_loc: Location,
        sink: &mut Diagnostics,
    ) -> Result<(), Bug> {
        let ty = self
            .types
            .get(scrutinee.id)
            .assume("scrutinee type resolved upstream")?;
        let mut obligation = Obligation::decompose(ty, self.module)?;
        let mut seen_literals: IndexSet<Literal> = IndexSet::new();
        let mut seen_else = false;

        for (pattern, loc) in arms {
            // A second `else` is a duplicate, not merely unreachable.
            if matches!(pattern, Pattern::Else) && seen_else {
                sink.report(
                    DiagnosticKind::DuplicateMatchPattern {
                        pattern: "else".to_owned(),
                    },
                    loc,
                );
                continue;
            }
            if obligation.is_satisfied() {
                sink.push(Diagnostic::new(
                    DiagnosticKind::UnreachablePatternAfterExhaustiveCoverage,
                    loc,
                ));
            }
            match pattern {
                Pattern::Is(test) => obligation.cover_type(test, self.module)?,
                Pattern::Null => obligation.needs_null = false,
                Pattern::Literal(lit) => {
                    if !seen_literals.insert(lit.clone()) {
                        sink.report(
                            DiagnosticKind::DuplicateMatchPattern {
                                pattern: lit.to_string(),
                            },
                            loc,
                        );
                        continue;
                    }
                    obligation.cover_literal(lit);
                }
                Pattern::Range(_) => {
                    // Ranges narrow reported gaps but never prove an
                    // unbounded domain complete.
                }
                Pattern::Else => {
                    seen_else = true;
                    obligation.close();
                }
            }
        }

        if let Some(missing) = obligation.missing(self.module) {
            sink.report(DiagnosticKind::NonExhaustiveMatch { missing }, match_loc);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strata_ast::{Ident, MatchArm, MatchStatement, RangePattern, UnionDef};

    use super::*;
    use crate::diag::Severity;

    fn loc(line: u32) -> Location {
        Location::new(line, 0)
    }

    fn scrutinee(id: u32) -> Expression {
        Expression {
            id: strata_ast::ExprId(id),
            kind: ExprKind::Local(Ident::new("subject", loc(1))),
            loc: loc(1),
        }
    }

    fn arm(pattern: Pattern, line: u32) -> MatchArm {
        MatchArm {
            pattern,
            statements: Vec::new(),
            loc: loc(line),
        }
    }

    fn match_stmt(scrutinee_id: u32, arms: Vec<MatchArm>) -> Statement {
        Statement::Match(MatchStatement {
            scrutinee: scrutinee(scrutinee_id),
            arms,
            loc: loc(1),
        })
    }

    fn check(module: &Module, types: &TypeTable, body: &[Statement]) -> Vec<Diagnostic> {
        let mut sink = Diagnostics::new();
        ExhaustPass::new(module, types)
            .check_body(body, &mut sink)
            .expect("oracle runs");
        sink.finish()
    }

    fn typed(ty: Type) -> (Module, TypeTable) {
        let module = Module::new("test.strata");
        let mut types = TypeTable::new();
        types.insert(strata_ast::ExprId(0), ty);
        (module, types)
    }

    #[test]
    fn test_bool_with_both_arms_is_exhaustive() {
        let (module, types) = typed(Type::Bool);
        let body = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Literal(Literal::Bool(true)), 2),
                arm(Pattern::Literal(Literal::Bool(false)), 3),
            ],
        )];
        assert!(check(&module, &types, &body).is_empty());
    }

    #[test]
    fn test_bool_missing_false_is_named() {
        let (module, types) = typed(Type::Bool);
        let body = vec![match_stmt(
            0,
            vec![arm(Pattern::Literal(Literal::Bool(true)), 2)],
        )];
        let diags = check(&module, &types, &body);

        assert_eq!(diags.len(), 1);
        assert!(matches!(
            &diags[0].kind,
            DiagnosticKind::NonExhaustiveMatch { missing } if missing == "`false` is not covered"
        ));
    }

    #[test]
    fn test_optional_bool_requires_null_arm() {
        let (module, types) = typed(Type::Optional(Box::new(Type::Bool)));
        let body = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Literal(Literal::Bool(true)), 2),
                arm(Pattern::Literal(Literal::Bool(false)), 3),
            ],
        )];
        let diags = check(&module, &types, &body);
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            &diags[0].kind,
            DiagnosticKind::NonExhaustiveMatch { missing } if missing == "`null` is not covered"
        ));

        let covered = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Literal(Literal::Bool(true)), 2),
                arm(Pattern::Literal(Literal::Bool(false)), 3),
                arm(Pattern::Null, 4),
            ],
        )];
        assert!(check(&module, &types, &covered).is_empty());
    }

    #[test]
    fn test_union_missing_member_is_named() {
        let mut module = Module::new("test.strata");
        let a = module.structs.insert(strata_ast::StructDef::new(Ident::new("A", loc(1))));
        let b = module.structs.insert(strata_ast::StructDef::new(Ident::new("B", loc(2))));
        let c = module.structs.insert(strata_ast::StructDef::new(Ident::new("C", loc(3))));
        let union = module.unions.insert(UnionDef {
            name: Ident::new("Abc", loc(4)),
            members: vec![Type::Struct(a), Type::Struct(b), Type::Struct(c)],
        });
        let mut types = TypeTable::new();
        types.insert(strata_ast::ExprId(0), Type::Union(union));

        let body = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Is(Type::Struct(a)), 2),
                arm(Pattern::Is(Type::Struct(b)), 3),
            ],
        )];
        let diags = check(&module, &types, &body);
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            &diags[0].kind,
            DiagnosticKind::NonExhaustiveMatch { missing } if missing == "`C` is not covered"
        ));

        let closed = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Is(Type::Struct(a)), 2),
                arm(Pattern::Is(Type::Struct(b)), 3),
                arm(Pattern::Else, 4),
            ],
        )];
        assert!(check(&module, &types, &closed).is_empty());
    }

    #[test]
    fn test_nested_union_flattens() {
        let mut module = Module::new("test.strata");
        let a = module.structs.insert(strata_ast::StructDef::new(Ident::new("A", loc(1))));
        let b = module.structs.insert(strata_ast::StructDef::new(Ident::new("B", loc(2))));
        let inner = module.unions.insert(UnionDef {
            name: Ident::new("Inner", loc(3)),
            members: vec![Type::Struct(b), Type::Int],
        });
        let outer = module.unions.insert(UnionDef {
            name: Ident::new("Outer", loc(4)),
            members: vec![Type::Struct(a), Type::Union(inner)],
        });
        let mut types = TypeTable::new();
        types.insert(strata_ast::ExprId(0), Type::Union(outer));

        // `is Inner` covers every tag the nested union contributes.
        let body = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Is(Type::Struct(a)), 2),
                arm(Pattern::Is(Type::Union(inner)), 3),
            ],
        )];
        assert!(check(&module, &types, &body).is_empty());
    }

    #[test]
    fn test_unbounded_int_always_requires_else() {
        let (module, types) = typed(Type::Int);
        let body = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Literal(Literal::Int(0)), 2),
                arm(Pattern::Literal(Literal::Int(1)), 3),
                arm(
                    Pattern::Range(RangePattern {
                        lo: Some(2),
                        hi: None,
                    }),
                    4,
                ),
            ],
        )];
        let diags = check(&module, &types, &body);
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            &diags[0].kind,
            DiagnosticKind::NonExhaustiveMatch { missing }
                if missing == "matching on `Int` requires an `else` arm"
        ));

        let closed = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Literal(Literal::Int(0)), 2),
                arm(Pattern::Else, 3),
            ],
        )];
        assert!(check(&module, &types, &closed).is_empty());
    }

    #[test]
    fn test_whole_domain_type_test_closes_open_domain() {
        let (module, types) = typed(Type::Optional(Box::new(Type::Int)));
        let body = vec![match_stmt(
            0,
            vec![arm(Pattern::Null, 2), arm(Pattern::Is(Type::Int), 3)],
        )];
        assert!(check(&module, &types, &body).is_empty());
    }

    #[test]
    fn test_arm_after_else_warns_and_compiles() {
        let (module, types) = typed(Type::Int);
        let body = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Literal(Literal::Int(0)), 2),
                arm(Pattern::Else, 3),
                arm(Pattern::Literal(Literal::Int(1)), 4),
            ],
        )];
        let diags = check(&module, &types, &body);

        assert_eq!(diags.len(), 1);
        assert!(matches!(
            diags[0].kind,
            DiagnosticKind::UnreachablePatternAfterExhaustiveCoverage
        ));
        assert_eq!(diags[0].severity(), Severity::Warning);
        assert_eq!(diags[0].primary, loc(4));
    }

    #[test]
    fn test_duplicate_literal_and_second_else_are_errors() {
        let (module, types) = typed(Type::Int);
        let body = vec![match_stmt(
            0,
            vec![
                arm(Pattern::Literal(Literal::Int(7)), 2),
                arm(Pattern::Literal(Literal::Int(7)), 3),
                arm(Pattern::Else, 4),
                arm(Pattern::Else, 5),
            ],
        )];
        let diags = check(&module, &types, &body);

        let dupes: Vec<_> = diags
            .iter()
            .filter(|d| matches!(d.kind, DiagnosticKind::DuplicateMatchPattern { .. }))
            .collect();
        assert_eq!(dupes.len(), 2);
        assert!(matches!(
            &dupes[0].kind,
            DiagnosticKind::DuplicateMatchPattern { pattern } if pattern == "7"
        ));
        assert!(matches!(
            &dupes[1].kind,
            DiagnosticKind::DuplicateMatchPattern { pattern } if pattern == "else"
        ));
    }

    #[test]
    fn test_nested_match_in_arm_body_is_checked() {
        let (module, mut types) = typed(Type::Int);
        types.insert(strata_ast::ExprId(1), Type::Bool);

        let inner = match_stmt(1, vec![arm(Pattern::Literal(Literal::Bool(true)), 3)]);
        let body = vec![match_stmt(
            0,
            vec![
                MatchArm {
                    pattern: Pattern::Literal(Literal::Int(0)),
                    statements: vec![inner],
                    loc: loc(2),
                },
                arm(Pattern::Else, 5),
            ],
        )];
        let diags = check(&module, &types, &body);

        // Only the inner boolean match is incomplete.
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            &diags[0].kind,
            DiagnosticKind::NonExhaustiveMatch { missing } if missing == "`false` is not covered"
        ));
    }
}
