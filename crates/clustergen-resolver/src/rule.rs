//! Flag rules
//!
//! A rule is data: a name for logs, the phase it runs in, a [`Condition`]
//! deciding whether it applies, and an [`Effect`] on the working flag map.

use std::fmt;

use clustergen_common::{Condition, EvalContext};

/// Resolution phase; phases always run in declaration order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Version-gated removals and migrations; retired keys stay retired
    Removal,
    /// Defaults written only when absent, plus feature-off withholding
    FeatureDefault,
    /// Sovereign and on-premises values that replace generic defaults
    Environment,
    /// Literal rewrites of known stale values
    Compatibility,
}

impl Phase {
    /// Execution order
    pub const ORDER: [Phase; 4] = [
        Phase::Removal,
        Phase::FeatureDefault,
        Phase::Environment,
        Phase::Compatibility,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Removal => "removal",
            Phase::FeatureDefault => "feature-default",
            Phase::Environment => "environment",
            Phase::Compatibility => "compatibility",
        })
    }
}

/// A flag value: fixed, or computed from the context
#[derive(Clone, Copy)]
pub enum Value {
    /// Fixed string
    Literal(&'static str),
    /// Pure function of the descriptor, version and constant registry
    Computed(fn(&EvalContext<'_>) -> String),
}

impl Value {
    /// Produce the value for a context
    pub fn render(&self, ctx: &EvalContext<'_>) -> String {
        match self {
            Value::Literal(value) => (*value).to_string(),
            Value::Computed(compute) => compute(ctx),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Value::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// What a rule does to the working map
#[derive(Clone, Debug)]
pub enum Effect {
    /// Strip keys, overrides included, and retire them
    Remove(&'static [&'static str]),
    /// Carry a value to its successor key (unless the caller set it), then
    /// strip and retire the old key
    Migrate {
        /// Deprecated key
        from: &'static str,
        /// Successor key
        to: &'static str,
    },
    /// Write only if the key is absent
    SetDefault {
        /// Flag
        key: &'static str,
        /// Value to write
        value: Value,
    },
    /// Overwrite any computed value; caller overrides are kept
    Set {
        /// Flag
        key: &'static str,
        /// Value to write
        value: Value,
    },
    /// Drop computed keys whose feature is off; caller overrides are kept
    Withhold(&'static [&'static str]),
    /// Append an item to a computed comma-separated list if missing
    AppendItem {
        /// Flag holding the list
        key: &'static str,
        /// Item to append
        item: &'static str,
    },
    /// Replace an exact value, overrides included
    Rewrite {
        /// Flag
        key: &'static str,
        /// Value to match exactly
        from: &'static str,
        /// Replacement
        to: &'static str,
    },
}

/// One entry of a component's rule table
#[derive(Clone, Debug)]
pub struct Rule {
    /// Name used in logs and conflict reports
    pub name: &'static str,
    /// Phase the rule runs in
    pub phase: Phase,
    /// Whether the rule applies
    pub when: Condition,
    /// What the rule does
    pub effect: Effect,
}

impl Rule {
    /// Removal-phase rule
    pub fn removal(name: &'static str, when: Condition, effect: Effect) -> Self {
        Self::new(name, Phase::Removal, when, effect)
    }

    /// Feature-default rule
    pub fn feature_default(name: &'static str, when: Condition, effect: Effect) -> Self {
        Self::new(name, Phase::FeatureDefault, when, effect)
    }

    /// Environment rule
    pub fn environment(name: &'static str, when: Condition, effect: Effect) -> Self {
        Self::new(name, Phase::Environment, when, effect)
    }

    /// Compatibility rule
    pub fn compatibility(name: &'static str, when: Condition, effect: Effect) -> Self {
        Self::new(name, Phase::Compatibility, when, effect)
    }

    /// Rule with an explicit phase
    pub fn new(name: &'static str, phase: Phase, when: Condition, effect: Effect) -> Self {
        Self {
            name,
            phase,
            when,
            effect,
        }
    }
}

/// `SetDefault` with a literal value
pub fn set_default(key: &'static str, value: &'static str) -> Effect {
    Effect::SetDefault {
        key,
        value: Value::Literal(value),
    }
}

/// `SetDefault` with a computed value
pub fn set_default_with(key: &'static str, compute: fn(&EvalContext<'_>) -> String) -> Effect {
    Effect::SetDefault {
        key,
        value: Value::Computed(compute),
    }
}

/// `Set` with a computed value
pub fn set_with(key: &'static str, compute: fn(&EvalContext<'_>) -> String) -> Effect {
    Effect::Set {
        key,
        value: Value::Computed(compute),
    }
}

/// Expand a `(key, value)` table into one `SetDefault` rule per key
pub fn static_defaults(
    name: &'static str,
    when: Condition,
    table: &'static [(&'static str, &'static str)],
) -> impl Iterator<Item = Rule> {
    table
        .iter()
        .map(move |&(key, value)| Rule::feature_default(name, when.clone(), set_default(key, value)))
}
