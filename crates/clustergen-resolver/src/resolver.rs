//! Rule engine
//!
//! Resolution seeds a working map with the caller's overrides and runs a
//! component's rule table phase by phase. These sets keep the result
//! independent of rule order inside a table:
//!
//! - `protected`: caller keys that no default, environment value or
//!   withholding rule may touch (only removal and literal rewrites can)
//! - `retired`: keys stripped in the removal phase; later writes are skipped
//! - `withheld`: computed keys a disabled feature suppresses; later default
//!   and environment writes are skipped
//! - `defaulted`: which feature-default rule wrote each computed key, so two
//!   defaults disagreeing on a key surface as a conflict instead of
//!   "first rule wins"

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use clustergen_common::{
    ClusterSpec, ClusterVersion, ComponentKind, ConfigMap, Defaults, Error, EvalContext, Result,
};

use crate::components;
use crate::rule::{Effect, Phase, Rule};

/// Resolved maps for every component plus the components that failed
#[derive(Debug, Default)]
pub struct Resolution {
    /// Successfully resolved maps
    pub maps: BTreeMap<ComponentKind, ConfigMap>,
    /// Components whose rule table could not be applied
    pub failures: Vec<(ComponentKind, Error)>,
}

/// Resolves component flag maps for one descriptor
#[derive(Debug)]
pub struct Resolver<'a> {
    spec: &'a ClusterSpec,
    version: ClusterVersion,
    defaults: &'a Defaults,
}

impl<'a> Resolver<'a> {
    /// Create a resolver, parsing the target version once
    ///
    /// A malformed version is fatal: every gate depends on it.
    pub fn new(spec: &'a ClusterSpec, defaults: &'a Defaults) -> Result<Self> {
        let version = ClusterVersion::parse(&spec.orchestrator_version)?;
        Ok(Self {
            spec,
            version,
            defaults,
        })
    }

    /// Parsed target version
    pub fn version(&self) -> &ClusterVersion {
        &self.version
    }

    /// Evaluation context shared by every rule
    pub fn context(&self) -> EvalContext<'_> {
        EvalContext::new(self.spec, &self.version, self.defaults)
    }

    /// Resolve one component against explicit caller overrides
    pub fn resolve_component(
        &self,
        component: ComponentKind,
        overrides: &BTreeMap<String, String>,
    ) -> Result<ConfigMap> {
        apply_rules(
            &self.context(),
            component,
            components::rules_for(component),
            overrides,
        )
    }

    /// Resolve every component concurrently using the descriptor's overrides
    #[instrument(skip(self), fields(version = %self.version))]
    pub fn resolve_all(&self) -> Resolution {
        let results: Vec<(ComponentKind, Result<ConfigMap>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = ComponentKind::ALL
                .into_iter()
                .map(|component| {
                    scope.spawn(move || {
                        let overrides = self.spec.overrides_for(component);
                        (component, self.resolve_component(component, overrides))
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        let mut resolution = Resolution::default();
        for (component, result) in results {
            match result {
                Ok(map) => {
                    debug!(component = %component, flags = map.len(), "resolved component");
                    resolution.maps.insert(component, map);
                }
                Err(err) => resolution.failures.push((component, err)),
            }
        }
        resolution
    }
}

/// Resolve one component's flags with the built-in constant registry
///
/// `overrides` is the caller's (possibly partial) map for this component.
pub fn resolve(
    spec: &ClusterSpec,
    component: ComponentKind,
    overrides: &BTreeMap<String, String>,
) -> Result<ConfigMap> {
    Resolver::new(spec, Defaults::global())?.resolve_component(component, overrides)
}

/// Resolve every component with the built-in constant registry
pub fn resolve_all(spec: &ClusterSpec) -> Result<Resolution> {
    Ok(Resolver::new(spec, Defaults::global())?.resolve_all())
}

/// Run a rule table against caller overrides
///
/// Phases run in [`Phase::ORDER`]; within a phase, rules run in table order.
pub fn apply_rules(
    ctx: &EvalContext<'_>,
    component: ComponentKind,
    rules: &[Rule],
    overrides: &BTreeMap<String, String>,
) -> Result<ConfigMap> {
    let mut state = State::new(component, overrides);
    for phase in Phase::ORDER {
        for rule in rules.iter().filter(|rule| rule.phase == phase) {
            if rule.when.evaluate(ctx) {
                state.apply(ctx, rule)?;
            }
        }
    }
    Ok(ConfigMap::from(state.map))
}

struct State {
    component: ComponentKind,
    map: BTreeMap<String, String>,
    protected: BTreeSet<String>,
    retired: BTreeSet<String>,
    withheld: BTreeSet<String>,
    defaulted: BTreeMap<String, &'static str>,
}

impl State {
    fn new(component: ComponentKind, overrides: &BTreeMap<String, String>) -> Self {
        Self {
            component,
            map: overrides.clone(),
            protected: overrides.keys().cloned().collect(),
            retired: BTreeSet::new(),
            withheld: BTreeSet::new(),
            defaulted: BTreeMap::new(),
        }
    }

    fn apply(&mut self, ctx: &EvalContext<'_>, rule: &Rule) -> Result<()> {
        match &rule.effect {
            Effect::Remove(keys) => {
                for key in keys.iter() {
                    self.retire(key);
                    debug!(component = %self.component, rule = rule.name, key, "removed flag");
                }
            }
            Effect::Migrate { from, to } => {
                if let Some(value) = self.map.remove(*from) {
                    if self.writable(to) {
                        debug!(component = %self.component, rule = rule.name, from, to, "migrated flag");
                        self.map.insert((*to).to_string(), value);
                    }
                }
                self.retire(from);
            }
            Effect::SetDefault { key, value } => {
                if self.skip_retired(rule, key) || self.skip_withheld(rule, key) {
                    return Ok(());
                }
                let value = value.render(ctx);
                match self.map.get(*key) {
                    None => {
                        debug!(component = %self.component, rule = rule.name, key, %value, "set default");
                        self.map.insert((*key).to_string(), value);
                        self.defaulted.insert((*key).to_string(), rule.name);
                    }
                    Some(existing) if existing != &value => {
                        if let Some(previous) = self.defaulted.get(*key) {
                            return Err(Error::conflict(
                                self.component.name(),
                                *key,
                                format!(
                                    "rule '{}' wrote '{existing}' but rule '{}' wants '{value}'",
                                    previous, rule.name
                                ),
                            ));
                        }
                    }
                    Some(_) => {}
                }
            }
            Effect::Set { key, value } => {
                if self.skip_retired(rule, key)
                    || self.skip_withheld(rule, key)
                    || self.protected.contains(*key)
                {
                    return Ok(());
                }
                let value = value.render(ctx);
                debug!(component = %self.component, rule = rule.name, key, %value, "set environment value");
                self.map.insert((*key).to_string(), value);
                self.defaulted.remove(*key);
            }
            Effect::Withhold(keys) => {
                for key in keys.iter() {
                    if self.protected.contains(*key) {
                        continue;
                    }
                    if self.map.remove(*key).is_some() {
                        debug!(component = %self.component, rule = rule.name, key, "withheld flag");
                    }
                    self.defaulted.remove(*key);
                    self.withheld.insert((*key).to_string());
                }
            }
            Effect::AppendItem { key, item } => {
                if self.protected.contains(*key) {
                    return Ok(());
                }
                if let Some(list) = self.map.get_mut(*key) {
                    if !list.split(',').any(|existing| existing.trim() == *item) {
                        if !list.is_empty() {
                            list.push(',');
                        }
                        list.push_str(item);
                        debug!(component = %self.component, rule = rule.name, key, item, "appended item");
                    }
                }
            }
            Effect::Rewrite { key, from, to } => {
                if let Some(value) = self.map.get_mut(*key) {
                    if value.as_str() == *from {
                        debug!(component = %self.component, rule = rule.name, key, from, to, "rewrote value");
                        *value = (*to).to_string();
                    }
                }
            }
        }
        Ok(())
    }

    fn retire(&mut self, key: &str) {
        self.map.remove(key);
        self.protected.remove(key);
        self.defaulted.remove(key);
        self.retired.insert(key.to_string());
    }

    fn writable(&self, key: &str) -> bool {
        !self.retired.contains(key) && !self.protected.contains(key)
    }

    fn skip_retired(&self, rule: &Rule, key: &str) -> bool {
        let retired = self.retired.contains(key);
        if retired {
            debug!(component = %self.component, rule = rule.name, key, "skipped write to removed flag");
        }
        retired
    }

    // Caller keys are never withheld, so a protected key is not skipped here.
    fn skip_withheld(&self, rule: &Rule, key: &str) -> bool {
        let withheld = self.withheld.contains(key) && !self.protected.contains(key);
        if withheld {
            debug!(component = %self.component, rule = rule.name, key, "skipped write to withheld flag");
        }
        withheld
    }
}
