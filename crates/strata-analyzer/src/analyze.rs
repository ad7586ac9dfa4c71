//! Per-struct analysis driver.
//!
//! Each struct is flattened (mixins structurally inlined, collisions
//! and cycles reported), lowered to control-flow graphs, and run
//! through both engines. Structs are mutually independent; an
//! internal error while analyzing one is logged and skips only that
//! struct.
//!
//! The instance body is the concatenation of every `init` block, in
//! mixin application order then declaration order. Method and getter
//! bodies run against an already-completed instance, so their entry
//! facts are the instance body's exit facts.

use buggy::{Bug, BugExt as _};
use indexmap::{IndexMap, IndexSet};
use strata_ast::{
    CallKind, InitDecl, Location, MethodDecl, Module, Mutability, Statement, StructDef, StructId,
    TypeTable,
};
use tracing::{debug, error, instrument, trace};

use crate::{
    assign::{AssignPass, Facts, missing_required},
    cfg::CfgBuilder,
    diag::{Diagnostic, DiagnosticKind, Diagnostics, Severity},
    exhaust::ExhaustPass,
};

/// How `once` multiplicity treats calls through different selectors.
///
/// When a `once` method is invoked through distinct named selectors
/// (`build "release" { .. }` vs `build "debug" { .. }`), the
/// invocations may be counted against one shared budget or tracked
/// independently per selector.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum AliasMultiplicity {
    /// All invocations of a `once` method share one budget.
    #[default]
    Shared,
    /// Each distinct selector gets its own budget.
    Independent,
}

/// One flattened property.
#[derive(Clone, Debug)]
pub(crate) struct PropInfo {
    /// Single- or multi-assignment.
    pub single: bool,
    /// Whether the property must be definitely assigned at instance
    /// completion.
    pub required: bool,
    /// The declaration site.
    pub loc: Location,
}

/// The flattened member set of one struct: its own declarations plus
/// everything its mixins contribute, in application order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Members {
    /// Properties, keyed by name in declaration order.
    pub props: IndexMap<String, PropInfo>,
    /// `once` methods, keyed by name in declaration order.
    pub onces: IndexMap<String, Location>,
}

impl Members {
    /// The positional index of a property, if it is declared.
    pub fn prop_idx(&self, name: &str) -> Option<usize> {
        self.props.get_index_of(name)
    }

    /// The positional index of a `once` method, if one is declared.
    pub fn once_idx(&self, name: &str) -> Option<usize> {
        self.onces.get_index_of(name)
    }
}

/// A struct after mixin flattening.
struct Flattened<'a> {
    members: Members,
    inits: Vec<&'a InitDecl>,
    methods: Vec<&'a MethodDecl>,
}

/// Structurally inlines a struct's mixins, in application order then
/// own declarations, reporting collisions and cycles into `sink`.
struct Flattener<'a> {
    module: &'a Module,
    root: &'a StructDef,
    /// Member name -> the struct that contributed it.
    origins: IndexMap<String, String>,
    /// The inlining path, for cycle detection.
    path: Vec<StructId>,
    /// Structs already absorbed; a diamond absorbs each struct once.
    done: IndexSet<StructId>,
    flat: Flattened<'a>,
}

impl<'a> Flattener<'a> {
    fn flatten(
        module: &'a Module,
        root_id: StructId,
        root: &'a StructDef,
        sink: &mut Diagnostics,
    ) -> Result<Flattened<'a>, Bug> {
        let mut flattener = Self {
            module,
            root,
            origins: IndexMap::new(),
            path: vec![root_id],
            done: IndexSet::from([root_id]),
            flat: Flattened {
                members: Members::default(),
                inits: Vec::new(),
                methods: Vec::new(),
            },
        };
        flattener.inline(root, sink)?;
        Ok(flattener.flat)
    }

    fn inline(&mut self, def: &'a StructDef, sink: &mut Diagnostics) -> Result<(), Bug> {
        for &mixin_id in &def.mixins {
            if self.path.contains(&mixin_id) {
                sink.report(
                    DiagnosticKind::RecursiveMixin {
                        struct_name: self.root.name.name.clone(),
                    },
                    self.root.name.loc,
                );
                continue;
            }
            if !self.done.insert(mixin_id) {
                continue;
            }
            let mixin = self
                .module
                .structs
                .get(mixin_id)
                .assume("mixin id resolves")?;
            self.path.push(mixin_id);
            self.inline(mixin, sink)?;
            self.path.pop();
        }
        self.absorb(def, sink);
        Ok(())
    }

    /// Adds one struct's own declarations to the flattened set.
    fn absorb(&mut self, def: &'a StructDef, sink: &mut Diagnostics) {
        for prop in &def.properties {
            if self.claim(&def.name.name, &prop.name.name, prop.name.loc, sink) {
                self.flat.members.props.insert(
                    prop.name.name.clone(),
                    PropInfo {
                        single: prop.mutability == Mutability::Single,
                        required: !prop.optional,
                        loc: prop.name.loc,
                    },
                );
            }
        }
        for method in &def.methods {
            if self.claim(&def.name.name, &method.name.name, method.name.loc, sink) {
                if method.kind == CallKind::Once {
                    self.flat
                        .members
                        .onces
                        .insert(method.name.name.clone(), method.name.loc);
                }
                self.flat.methods.push(method);
            }
        }
        self.flat.inits.extend(def.inits.iter());
    }

    /// Claims a member name for `contributor`, reporting a collision
    /// when a different struct already holds it.
    fn claim(
        &mut self,
        contributor: &str,
        name: &str,
        loc: Location,
        sink: &mut Diagnostics,
    ) -> bool {
        if let Some(existing) = self.origins.get(name) {
            // Same-struct duplicates were rejected upstream; only a
            // cross-struct collision is a flattening problem.
            if existing != contributor {
                let mixin = if *existing == self.root.name.name {
                    contributor.to_owned()
                } else {
                    existing.clone()
                };
                sink.push(Diagnostic::new(
                    DiagnosticKind::MixinFieldCollision {
                        struct_name: self.root.name.name.clone(),
                        mixin,
                        member: name.to_owned(),
                    },
                    loc,
                ));
            }
            return false;
        }
        self.origins.insert(name.to_owned(), contributor.to_owned());
        true
    }
}

/// Analyzes one module.
///
/// ```no_run
/// # use strata_analyzer::{AliasMultiplicity, Analyzer};
/// # fn demo(module: &strata_ast::Module, types: &strata_ast::TypeTable) {
/// let report = Analyzer::new(module, types)
///     .alias_multiplicity(AliasMultiplicity::Independent)
///     .analyze();
/// for diag in &report.diagnostics {
///     eprintln!("{diag}");
/// }
/// if report.gate() {
///     // hand off to codegen
/// }
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Analyzer<'a> {
    module: &'a Module,
    types: &'a TypeTable,
    multiplicity: AliasMultiplicity,
}

impl<'a> Analyzer<'a> {
    /// Creates an analyzer over a resolved module and its type table.
    pub fn new(module: &'a Module, types: &'a TypeTable) -> Self {
        Self {
            module,
            types,
            multiplicity: AliasMultiplicity::default(),
        }
    }

    /// Sets how selector aliases count against `once` budgets.
    #[must_use]
    pub fn alias_multiplicity(mut self, multiplicity: AliasMultiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Runs both analyses over every struct in the module.
    #[instrument(skip_all, fields(path = %self.module.path))]
    pub fn analyze(&self) -> ModuleReport {
        let mut sink = Diagnostics::new();
        for (id, def) in self.module.structs.iter() {
            if let Err(bug) = self.analyze_struct(id, def, &mut sink) {
                error!(struct_name = %def.name, %bug, "skipping struct after internal error");
            }
        }
        ModuleReport {
            path: self.module.path.clone(),
            diagnostics: sink.finish(),
        }
    }

    fn analyze_struct(
        &self,
        id: StructId,
        def: &StructDef,
        sink: &mut Diagnostics,
    ) -> Result<(), Bug> {
        debug!(struct_name = %def.name, "analyzing struct");
        let flat = Flattener::flatten(self.module, id, def, sink)?;
        let bodies: Vec<&[Statement]> = flat.inits.iter().map(|init| init.body.as_slice()).collect();

        let cfg = CfgBuilder::build_concat(&flat.members, &bodies)?;
        trace!(
            blocks = cfg.blocks.len(),
            lambdas = cfg.lambdas.len(),
            "instance body lowered"
        );
        let pass = AssignPass::new(&flat.members, self.multiplicity);
        let exit = pass.run(&cfg, Facts::entry(&flat.members), sink)?;

        // Completion is checked only at the instance body's exit.
        let missing = missing_required(&flat.members, &exit);
        if !missing.is_empty() {
            sink.report(
                DiagnosticKind::RequiredPropertyUnassignedAtCompletion {
                    struct_name: def.name.name.clone(),
                    properties: missing,
                },
                def.name.loc,
            );
        }

        // Methods and getters run against a completed instance.
        for method in &flat.methods {
            let method_cfg = CfgBuilder::build(&flat.members, &method.body)?;
            pass.run(&method_cfg, exit.clone(), sink)?;
        }

        let exhaust = ExhaustPass::new(self.module, self.types);
        for body in &bodies {
            exhaust.check_body(body, sink)?;
        }
        for method in &flat.methods {
            exhaust.check_body(&method.body, sink)?;
        }
        Ok(())
    }
}

/// The analysis result for one module.
#[derive(Clone, Debug)]
pub struct ModuleReport {
    /// The module's source path.
    pub path: String,
    /// Every finding, ordered by source position.
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleReport {
    /// Reports whether the module may proceed to code generation:
    /// true when no error-severity finding was recorded.
    pub fn gate(&self) -> bool {
        self.diagnostics
            .iter()
            .all(|d| d.severity() != Severity::Error)
    }
}

/// The analysis result for a whole compilation unit.
#[derive(Clone, Debug)]
pub struct UnitReport {
    /// Per-module reports, ordered by source path.
    pub modules: Vec<ModuleReport>,
}

impl UnitReport {
    /// Reports whether every module passed its gate.
    pub fn gate(&self) -> bool {
        self.modules.iter().all(ModuleReport::gate)
    }
}

/// Analyzes every module of a compilation unit.
///
/// Modules are mutually independent; reports are ordered by source
/// path so repeated runs produce identical output.
pub fn analyze_unit(
    modules: &[(&Module, &TypeTable)],
    multiplicity: AliasMultiplicity,
) -> UnitReport {
    let mut reports: Vec<ModuleReport> = modules
        .iter()
        .map(|(module, types)| {
            Analyzer::new(module, types)
                .alias_multiplicity(multiplicity)
                .analyze()
        })
        .collect();
    reports.sort_by(|a, b| a.path.cmp(&b.path));
    UnitReport { modules: reports }
}
