//! Definite assignment and call multiplicity.
//!
//! A single forward pass over the acyclic graph computes, for every
//! block, how often each single-assign property and each `once`
//! method has occurred along the paths reaching it. Block ids are a
//! topological order, so every predecessor's exit facts exist before
//! a block is visited and no fixed-point iteration is needed.
//!
//! Conflicts (a second write to a `val`, a second call to a `once`
//! method) are reported at the step that completes them, with the
//! earliest prior occurrence attached as a secondary location. The
//! completion check (every required property definitely assigned) is
//! the caller's to make, at the exit of the instance body only.

use buggy::{Bug, BugExt as _, bug};
use indexmap::IndexMap;
use strata_ast::{Location, arena::Key as _};

use crate::{
    analyze::{AliasMultiplicity, Members},
    cfg::{Cfg, Step},
    diag::{Diagnostic, DiagnosticKind, Diagnostics},
};

/// How often an event has occurred along the paths reaching a program
/// point.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Occurrence {
    /// On no path.
    Unassigned,
    /// On some paths but not all.
    MaybeAssigned,
    /// On every path.
    DefinitelyAssigned,
}

impl Occurrence {
    /// The meet at a join: a fact survives only if every incoming
    /// path agrees on it.
    fn meet(self, other: Self) -> Self {
        match (self, other) {
            (Self::DefinitelyAssigned, Self::DefinitelyAssigned) => Self::DefinitelyAssigned,
            (Self::Unassigned, Self::Unassigned) => Self::Unassigned,
            _ => Self::MaybeAssigned,
        }
    }
}

/// The state of one property or one call key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Slot {
    occ: Occurrence,
    /// The earliest occurrence, kept for secondary labels.
    first: Option<Location>,
}

impl Slot {
    const EMPTY: Self = Self {
        occ: Occurrence::Unassigned,
        first: None,
    };

    fn meet(self, other: Self) -> Self {
        Self {
            occ: self.occ.meet(other.occ),
            first: match (self.first, other.first) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }

    fn record(&mut self, loc: Location) {
        self.occ = Occurrence::DefinitelyAssigned;
        if self.first.is_none() {
            self.first = Some(loc);
        }
    }
}

/// Call facts are keyed by method and, when aliases are tracked
/// independently, by the invocation's selector.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct CallKey {
    method: usize,
    selector: Option<String>,
}

/// Assignment and call facts at one program point.
///
/// Property slots are positional, mirroring the member set. Call keys
/// appear when first seen; an absent key means [`Occurrence::Unassigned`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Facts {
    props: Vec<Slot>,
    calls: IndexMap<CallKey, Slot>,
}

impl Facts {
    /// The facts at the entry of an instance body: nothing has
    /// happened yet.
    pub fn entry(members: &Members) -> Self {
        Self {
            props: vec![Slot::EMPTY; members.props.len()],
            calls: IndexMap::new(),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        let props = self
            .props
            .iter()
            .zip(&other.props)
            .map(|(a, b)| a.meet(*b))
            .collect();
        let mut calls = IndexMap::new();
        for (key, slot) in &self.calls {
            let theirs = other.calls.get(key).copied().unwrap_or(Slot::EMPTY);
            calls.insert(key.clone(), slot.meet(theirs));
        }
        for (key, slot) in &other.calls {
            if !calls.contains_key(key) {
                calls.insert(key.clone(), Slot::EMPTY.meet(*slot));
            }
        }
        Self { props, calls }
    }
}

/// The dataflow engine for one member set.
pub(crate) struct AssignPass<'a> {
    members: &'a Members,
    multiplicity: AliasMultiplicity,
}

impl<'a> AssignPass<'a> {
    pub fn new(members: &'a Members, multiplicity: AliasMultiplicity) -> Self {
        Self {
            members,
            multiplicity,
        }
    }

    /// Runs the forward pass over one graph, reporting conflicts into
    /// `sink`, and returns the facts at the graph's exit.
    ///
    /// `entry` is the state flowing into the graph: empty for an
    /// instance body, the instance exit facts for a method body, a
    /// creation-point snapshot for a lambda.
    pub fn run(&self, cfg: &Cfg, entry: Facts, sink: &mut Diagnostics) -> Result<Facts, Bug> {
        let preds = cfg.preds();
        let mut out: Vec<Option<Facts>> = vec![None; cfg.blocks.len()];

        for (id, block) in cfg.blocks.iter() {
            let mut facts = if id == cfg.entry {
                entry.clone()
            } else {
                let mut incoming = preds
                    .get(id.to_usize())
                    .assume("preds indexed by block id")?
                    .iter();
                let Some(&head) = incoming.next() else {
                    bug!("non-entry CFG block has no predecessors");
                };
                let mut facts = out
                    .get(head.to_usize())
                    .assume("predecessor id in range")?
                    .clone()
                    .assume("predecessors run before successors")?;
                for &pred in incoming {
                    let prev = out
                        .get(pred.to_usize())
                        .assume("predecessor id in range")?
                        .as_ref()
                        .assume("predecessors run before successors")?;
                    facts = facts.meet(prev);
                }
                facts
            };

            for step in &block.steps {
                self.step(cfg, step, &mut facts, sink)?;
            }
            *out.get_mut(id.to_usize()).assume("block id in range")? = Some(facts);
        }

        out.get_mut(cfg.exit.to_usize())
            .assume("exit id in range")?
            .take()
            .assume("exit block was processed")
    }

    fn step(
        &self,
        cfg: &Cfg,
        step: &Step,
        facts: &mut Facts,
        sink: &mut Diagnostics,
    ) -> Result<(), Bug> {
        match step {
            Step::Assign { prop, loc } => {
                let (name, info) = self
                    .members
                    .props
                    .get_index(*prop)
                    .assume("property index from this member set")?;
                let slot = facts
                    .props
                    .get_mut(*prop)
                    .assume("facts sized to member set")?;
                if info.single && slot.occ != Occurrence::Unassigned {
                    let mut diag = Diagnostic::new(
                        DiagnosticKind::ImmutablePropertyReassigned {
                            property: name.clone(),
                        },
                        *loc,
                    );
                    if let Some(first) = slot.first {
                        diag = diag.with_secondary(first);
                    }
                    sink.push(diag);
                }
                slot.record(*loc);
            }
            Step::Call {
                method,
                selector,
                loc,
            } => {
                let (name, _) = self
                    .members
                    .onces
                    .get_index(*method)
                    .assume("method index from this member set")?;
                let key = CallKey {
                    method: *method,
                    selector: match self.multiplicity {
                        AliasMultiplicity::Shared => None,
                        AliasMultiplicity::Independent => selector.clone(),
                    },
                };
                let slot = facts.calls.entry(key).or_insert(Slot::EMPTY);
                if slot.occ != Occurrence::Unassigned {
                    let mut diag = Diagnostic::new(
                        DiagnosticKind::MethodCalledMoreThanOnce {
                            method: name.clone(),
                        },
                        *loc,
                    );
                    if let Some(first) = slot.first {
                        diag = diag.with_secondary(first);
                    }
                    sink.push(diag);
                }
                slot.record(*loc);
            }
            Step::Lambda(idx) => {
                // The lambda body runs in its own scope against a
                // snapshot of the facts at its creation point; its
                // effects do not flow back.
                let nested = cfg.lambdas.get(*idx).assume("lambda graph exists")?;
                self.run(nested, facts.clone(), sink)?;
            }
        }
        Ok(())
    }
}

/// Names every required property not definitely assigned in `facts`,
/// in declaration order.
pub(crate) fn missing_required(members: &Members, facts: &Facts) -> Vec<String> {
    members
        .props
        .iter()
        .enumerate()
        .filter(|&(i, (_, info))| {
            info.required
                && facts.props.get(i).map(|s| s.occ) != Some(Occurrence::DefinitelyAssigned)
        })
        .map(|(_, (name, _))| name.clone())
        .collect()
}
