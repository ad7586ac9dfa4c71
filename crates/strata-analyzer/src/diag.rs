//! Structured diagnostics.
//!
//! Findings are data, never exceptions: both engines push everything
//! they discover into a [`Diagnostics`] sink and keep going, so one
//! compilation pass reports every problem. Rendering (caret/underline
//! layout, colors) is owned by the host's reporter, not this crate.

use core::fmt;

use strata_ast::Location;

/// Diagnostic severity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    /// Reported, but never blocks code generation.
    Warning,
    /// Blocks code generation for the whole compilation unit.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The kind of a finding.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DiagnosticKind {
    /// A second write to a single-assign property is reachable from
    /// the first along one feasible path.
    #[error("immutable property `{property}` is assigned more than once")]
    ImmutablePropertyReassigned {
        /// The property's name.
        property: String,
    },
    /// One or more required properties are not definitely assigned
    /// when the instance body completes.
    #[error(
        "required properties of `{struct_name}` are never assigned: {}",
        .properties.join(", ")
    )]
    RequiredPropertyUnassignedAtCompletion {
        /// The struct being instantiated.
        struct_name: String,
        /// Every missing property, in declaration order.
        properties: Vec<String>,
    },
    /// A `once` method is invoked twice along one feasible path.
    #[error("method `{method}` may be called at most once")]
    MethodCalledMoreThanOnce {
        /// The method's name.
        method: String,
    },
    /// A `match` does not cover its scrutinee's full value domain.
    #[error("match is not exhaustive: {missing}")]
    NonExhaustiveMatch {
        /// Human-readable description of the uncovered remainder.
        missing: String,
    },
    /// An arm occurs after previous arms already cover the full
    /// domain.
    #[error("pattern is unreachable; earlier arms already cover every value")]
    UnreachablePatternAfterExhaustiveCoverage,
    /// The same literal pattern, or a second `else` arm, appears
    /// twice in one `match`.
    #[error("duplicate match pattern `{pattern}`")]
    DuplicateMatchPattern {
        /// The duplicated pattern, as written.
        pattern: String,
    },
    /// Mixin flattening produced two members with the same name.
    #[error("mixin `{mixin}` and `{struct_name}` both declare `{member}`")]
    MixinFieldCollision {
        /// The struct being flattened.
        struct_name: String,
        /// The mixin contributing the colliding member.
        mixin: String,
        /// The colliding member name.
        member: String,
    },
    /// A struct is reachable from its own mixin list.
    #[error("recursive mixin: `{struct_name}` includes itself")]
    RecursiveMixin {
        /// The struct at the head of the cycle.
        struct_name: String,
    },
}

impl DiagnosticKind {
    /// The severity of this kind of finding.
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnreachablePatternAfterExhaustiveCoverage => Severity::Warning,
            Self::ImmutablePropertyReassigned { .. }
            | Self::RequiredPropertyUnassignedAtCompletion { .. }
            | Self::MethodCalledMoreThanOnce { .. }
            | Self::NonExhaustiveMatch { .. }
            | Self::DuplicateMatchPattern { .. }
            | Self::MixinFieldCollision { .. }
            | Self::RecursiveMixin { .. } => Severity::Error,
        }
    }
}

/// One reported finding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    /// What was found.
    pub kind: DiagnosticKind,
    /// Where it was found.
    pub primary: Location,
    /// Related locations (e.g. the first write for a reassignment).
    pub secondary: Vec<Location>,
}

impl Diagnostic {
    /// Creates a diagnostic with no secondary locations.
    pub fn new(kind: DiagnosticKind, primary: Location) -> Self {
        Self {
            kind,
            primary,
            secondary: Vec::new(),
        }
    }

    /// Adds a secondary location.
    #[must_use]
    pub fn with_secondary(mut self, loc: Location) -> Self {
        self.secondary.push(loc);
        self
    }

    /// The severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// The rendered message.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} at {}", self.severity(), self.kind, self.primary)
    }
}

/// A sink collecting every finding for one module.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finding.
    pub fn push(&mut self, diag: Diagnostic) {
        self.items.push(diag);
    }

    /// Records a finding with no secondary locations.
    pub fn report(&mut self, kind: DiagnosticKind, primary: Location) {
        self.push(Diagnostic::new(kind, primary));
    }

    /// Reports whether any error-severity finding was recorded.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity() == Severity::Error)
    }

    /// Returns the number of findings recorded so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Reports whether the sink is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finishes the sink, returning findings ordered by source
    /// position.
    ///
    /// The sort is stable, so findings at the same location keep
    /// their discovery order and repeated runs produce identical
    /// output.
    pub fn finish(mut self) -> Vec<Diagnostic> {
        self.items.sort_by_key(|d| d.primary);
        self.items
    }
}
