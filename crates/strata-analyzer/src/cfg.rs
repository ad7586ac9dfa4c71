//! Control-flow graph construction.
//!
//! Each member body (the instance body, a method, a getter, a lambda)
//! lowers to a graph of basic blocks. The language has no loops, so
//! the graph is acyclic; blocks are allocated such that every edge
//! goes from a lower block id to a higher one, which makes id order a
//! topological order and lets the dataflow engine run in a single
//! forward pass.
//!
//! `if`/`else` and `match` (statement and expression forms alike)
//! lower to mutually exclusive sibling branches converging at a join
//! block. An `if` without an `else` contributes an implicit no-op
//! edge from the condition block to the join. Lambda bodies become
//! separate nested graphs: they observe the assignment facts captured
//! at their creation point but do not share scope with the enclosing
//! body, so a snapshot step marks where each lambda literal occurs.
//!
//! The builder assumes a type-checked AST. Structural problems here
//! are compiler bugs, not user diagnostics.

use buggy::{Bug, BugExt as _, bug};
use strata_ast::{
    CallExpr, ExprKind, Expression, IfStatement, Location, MatchStatement, Statement,
    arena::{Arena, Key},
};

use crate::{analyze::Members, builtins};

/// The id of a basic block.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct BlockId(pub u32);

impl Key for BlockId {
    #[inline]
    fn to_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn from_usize(id: usize) -> Self {
        Self(u32::try_from(id).expect("block index fits in u32"))
    }
}

/// One occurrence fact inside a block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Step {
    /// A write to the property with this index in the member set.
    Assign { prop: usize, loc: Location },
    /// An invocation of the `once` method with this index in the
    /// member set.
    Call {
        method: usize,
        selector: Option<String>,
        loc: Location,
    },
    /// A lambda literal; the engine snapshots its facts here for the
    /// nested graph with this index.
    Lambda(usize),
}

/// A basic block: sequential steps plus successor edges.
#[derive(Clone, Debug, Default)]
pub(crate) struct Block {
    pub steps: Vec<Step>,
    pub succs: Vec<BlockId>,
}

/// The control-flow graph of one member body.
#[derive(Clone, Debug)]
pub(crate) struct Cfg {
    pub blocks: Arena<BlockId, Block>,
    pub entry: BlockId,
    pub exit: BlockId,
    /// Nested lambda graphs, indexed by [`Step::Lambda`].
    pub lambdas: Vec<Cfg>,
}

impl Cfg {
    /// Predecessor lists, indexed by block id.
    pub fn preds(&self) -> Vec<Vec<BlockId>> {
        let mut preds = vec![Vec::new(); self.blocks.len()];
        for (id, block) in self.blocks.iter() {
            for &succ in &block.succs {
                preds[succ.to_usize()].push(id);
            }
        }
        preds
    }
}

/// Lowers member bodies into a [`Cfg`].
pub(crate) struct CfgBuilder<'a> {
    members: &'a Members,
    blocks: Arena<BlockId, Block>,
    lambdas: Vec<Cfg>,
}

impl<'a> CfgBuilder<'a> {
    /// Builds the graph for one body.
    pub fn build(members: &'a Members, body: &[Statement]) -> Result<Cfg, Bug> {
        Self::build_concat(members, &[body])
    }

    /// Builds one graph from several bodies executed back to back.
    ///
    /// The instance body is the concatenation of a struct's `init`
    /// blocks in declaration order.
    pub fn build_concat(members: &'a Members, bodies: &[&[Statement]]) -> Result<Cfg, Bug> {
        let mut builder = Self {
            members,
            blocks: Arena::new(),
            lambdas: Vec::new(),
        };
        let entry = builder.new_block();
        let mut cur = entry;
        for body in bodies {
            cur = builder.lower_stmts(body, cur)?;
        }
        Ok(Cfg {
            blocks: builder.blocks,
            entry,
            exit: cur,
            lambdas: builder.lambdas,
        })
    }

    fn new_block(&mut self) -> BlockId {
        self.blocks.insert(Block::default())
    }

    /// Adds an edge. Edges must increase block ids so that id order
    /// stays topological.
    fn edge(&mut self, from: BlockId, to: BlockId) -> Result<(), Bug> {
        if from >= to {
            bug!("CFG edge does not increase block id");
        }
        self.blocks
            .get_mut(from)
            .assume("edge source exists")?
            .succs
            .push(to);
        Ok(())
    }

    fn push(&mut self, block: BlockId, step: Step) -> Result<(), Bug> {
        self.blocks
            .get_mut(block)
            .assume("step target exists")?
            .steps
            .push(step);
        Ok(())
    }

    fn lower_stmts(&mut self, stmts: &[Statement], mut cur: BlockId) -> Result<BlockId, Bug> {
        for stmt in stmts {
            cur = self.lower_stmt(stmt, cur)?;
        }
        Ok(cur)
    }

    fn lower_stmt(&mut self, stmt: &Statement, cur: BlockId) -> Result<BlockId, Bug> {
        match stmt {
            Statement::Assign(s) => {
                let cur = self.lower_expr(&s.value, cur)?;
                // Only locally declared properties produce facts;
                // writes into other scopes were validated upstream.
                if let Some(prop) = self.members.prop_idx(&s.property.name) {
                    self.push(
                        cur,
                        Step::Assign {
                            prop,
                            loc: s.property.loc,
                        },
                    )?;
                }
                Ok(cur)
            }
            Statement::Call(s) => self.lower_call(&s.call, cur),
            Statement::Let(s) => self.lower_expr(&s.value, cur),
            Statement::If(s) => self.lower_if(s, cur),
            Statement::Match(s) => self.lower_match(s, cur),
            Statement::Expression(e) => self.lower_expr(e, cur),
        }
    }

    fn lower_call(&mut self, call: &CallExpr, mut cur: BlockId) -> Result<BlockId, Bug> {
        for arg in &call.args {
            cur = self.lower_expr(arg, cur)?;
        }
        // Builtins are a closed set with no multiplicity rules, and
        // only `once` methods carry call facts.
        if builtins::builtin(&call.method.name).is_none() {
            if let Some(method) = self.members.once_idx(&call.method.name) {
                self.push(
                    cur,
                    Step::Call {
                        method,
                        selector: call.selector.as_ref().map(|s| s.name.clone()),
                        loc: call.method.loc,
                    },
                )?;
            }
        }
        Ok(cur)
    }

    fn lower_if(&mut self, stmt: &IfStatement, cur: BlockId) -> Result<BlockId, Bug> {
        self.lower_branches(&stmt.branches, stmt.fallback.as_deref(), cur)
    }

    /// Lowers an `if`/`else if`/`else` chain recursively: each branch
    /// condition is evaluated on the not-taken path of the previous
    /// one, and every branch end converges on one join block.
    fn lower_branches(
        &mut self,
        branches: &[(Expression, Vec<Statement>)],
        fallback: Option<&[Statement]>,
        cur: BlockId,
    ) -> Result<BlockId, Bug> {
        let Some(((cond, body), rest)) = branches.split_first() else {
            // No conditions left: just the else branch, or nothing.
            return match fallback {
                Some(stmts) => self.lower_stmts(stmts, cur),
                None => Ok(cur),
            };
        };

        let cur = self.lower_expr(cond, cur)?;

        let then_entry = self.new_block();
        self.edge(cur, then_entry)?;
        let then_end = self.lower_stmts(body, then_entry)?;

        let (else_end, trivial_else) = if rest.is_empty() && fallback.is_none() {
            // `if` without `else`: the untaken branch is a no-op edge
            // straight from the condition block to the join.
            (cur, true)
        } else {
            let else_entry = self.new_block();
            self.edge(cur, else_entry)?;
            (self.lower_branches(rest, fallback, else_entry)?, false)
        };

        let join = self.new_block();
        self.edge(then_end, join)?;
        if trivial_else {
            self.edge(cur, join)?;
        } else {
            self.edge(else_end, join)?;
        }
        Ok(join)
    }

    fn lower_match(&mut self, stmt: &MatchStatement, cur: BlockId) -> Result<BlockId, Bug> {
        let cur = self.lower_expr(&stmt.scrutinee, cur)?;
        if stmt.arms.is_empty() {
            // The parser rejects zero-arm matches.
            bug!("match statement has no arms");
        }

        let mut arm_ends = Vec::with_capacity(stmt.arms.len());
        for arm in &stmt.arms {
            let arm_entry = self.new_block();
            self.edge(cur, arm_entry)?;
            arm_ends.push(self.lower_stmts(&arm.statements, arm_entry)?);
        }

        let join = self.new_block();
        for end in arm_ends {
            self.edge(end, join)?;
        }
        Ok(join)
    }

    /// Lowers an `if`/`else if`/`else` expression chain. Like the
    /// statement form, each condition is evaluated only on the
    /// not-taken path of the previous one; the mandatory `else` value
    /// means there is no implicit edge.
    fn lower_value_branches(
        &mut self,
        branches: &[(Expression, Expression)],
        fallback: &Expression,
        cur: BlockId,
    ) -> Result<BlockId, Bug> {
        let Some(((cond, value), rest)) = branches.split_first() else {
            return self.lower_expr(fallback, cur);
        };

        let cur = self.lower_expr(cond, cur)?;

        let then_entry = self.new_block();
        self.edge(cur, then_entry)?;
        let then_end = self.lower_expr(value, then_entry)?;

        let else_entry = self.new_block();
        self.edge(cur, else_entry)?;
        let else_end = self.lower_value_branches(rest, fallback, else_entry)?;

        let join = self.new_block();
        self.edge(then_end, join)?;
        self.edge(else_end, join)?;
        Ok(join)
    }

    fn lower_expr(&mut self, expr: &Expression, cur: BlockId) -> Result<BlockId, Bug> {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Null | ExprKind::Property(_) | ExprKind::Local(_) => {
                Ok(cur)
            }
            ExprKind::Call(call) => self.lower_call(call, cur),
            ExprKind::If(ifx) => self.lower_value_branches(&ifx.branches, &ifx.fallback, cur),
            ExprKind::Match(mx) => {
                let cur = self.lower_expr(&mx.scrutinee, cur)?;
                if mx.arms.is_empty() {
                    bug!("match expression has no arms");
                }
                let mut arm_ends = Vec::with_capacity(mx.arms.len());
                for arm in &mx.arms {
                    let arm_entry = self.new_block();
                    self.edge(cur, arm_entry)?;
                    arm_ends.push(self.lower_expr(&arm.expression, arm_entry)?);
                }
                let join = self.new_block();
                for end in arm_ends {
                    self.edge(end, join)?;
                }
                Ok(join)
            }
            ExprKind::Lambda(lambda) => {
                let nested = CfgBuilder::build(self.members, &lambda.body)?;
                let idx = self.lambdas.len();
                self.lambdas.push(nested);
                self.push(cur, Step::Lambda(idx))?;
                Ok(cur)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use strata_ast::arena::Key as _;

    use super::*;
    use crate::tests::fixtures::{
        assign, call, expr_stmt, if_stmt, lambda_expr, lit_int, members_of, prop_single,
    };

    #[test]
    fn test_straight_line_is_one_block() {
        let members = members_of(&[prop_single("a"), prop_single("b")], &[]);
        let body = vec![assign("a", lit_int(1, 1)), assign("b", lit_int(2, 2))];
        let cfg = CfgBuilder::build(&members, &body).expect("builds");

        assert_eq!(cfg.blocks.len(), 1);
        assert_eq!(cfg.entry, cfg.exit);
        let block = &cfg.blocks[cfg.entry];
        assert_eq!(block.steps.len(), 2);
        assert!(matches!(block.steps[0], Step::Assign { prop: 0, .. }));
        assert!(matches!(block.steps[1], Step::Assign { prop: 1, .. }));
    }

    #[test]
    fn test_if_else_makes_diamond() {
        let members = members_of(&[prop_single("a")], &[]);
        let body = vec![if_stmt(
            lit_int(1, 1),
            vec![assign("a", lit_int(2, 2))],
            Some(vec![assign("a", lit_int(3, 3))]),
        )];
        let cfg = CfgBuilder::build(&members, &body).expect("builds");

        // entry, then, else, join
        assert_eq!(cfg.blocks.len(), 4);
        assert_ne!(cfg.entry, cfg.exit);
        // Every edge increases the block id, so id order is
        // topological.
        for (id, block) in cfg.blocks.iter() {
            for succ in &block.succs {
                assert!(*succ > id);
            }
        }
        let preds = cfg.preds();
        assert_eq!(preds[cfg.exit.to_usize()].len(), 2);
    }

    #[test]
    fn test_if_without_else_has_noop_edge() {
        let members = members_of(&[prop_single("a")], &[]);
        let body = vec![if_stmt(lit_int(1, 1), vec![assign("a", lit_int(2, 2))], None)];
        let cfg = CfgBuilder::build(&members, &body).expect("builds");

        // entry, then, join; the untaken side is an edge, not a block.
        assert_eq!(cfg.blocks.len(), 3);
        let preds = cfg.preds();
        assert_eq!(preds[cfg.exit.to_usize()].len(), 2);
    }

    #[test]
    fn test_builtin_call_produces_no_fact() {
        let members = members_of(&[], &[("configure", true)]);
        let body = vec![
            expr_stmt(call("print", 1)),
            expr_stmt(call("configure", 2)),
        ];
        let cfg = CfgBuilder::build(&members, &body).expect("builds");

        let steps = &cfg.blocks[cfg.entry].steps;
        assert_eq!(steps.len(), 1);
        assert!(matches!(steps[0], Step::Call { method: 0, .. }));
    }

    #[test]
    fn test_lambda_becomes_nested_graph() {
        let members = members_of(&[prop_single("a")], &[("configure", true)]);
        let body = vec![expr_stmt(lambda_expr(
            vec![expr_stmt(call("configure", 3))],
            2,
        ))];
        let cfg = CfgBuilder::build(&members, &body).expect("builds");

        assert_eq!(cfg.lambdas.len(), 1);
        assert!(matches!(cfg.blocks[cfg.entry].steps[0], Step::Lambda(0)));
        let nested = &cfg.lambdas[0];
        assert!(matches!(
            nested.blocks[nested.entry].steps[0],
            Step::Call { method: 0, .. }
        ));
    }
}
