//! Component flag resolution
//!
//! Every control-plane component owns an ordered table of [`Rule`]s. The
//! resolver runs a table against the caller's overrides in four fixed
//! phases (removal, feature defaults, environment, compatibility) and
//! produces a [`ConfigMap`](clustergen_common::ConfigMap):
//!
//! - caller overrides are never replaced by computed values
//! - flags removed at the target version never appear, overrides included
//! - features that resolve to off withhold the flags they would add

#![deny(missing_docs)]

pub mod components;
pub mod resolver;
pub mod rule;

pub use components::rules_for;
pub use resolver::{apply_rules, resolve, resolve_all, Resolution, Resolver};
pub use rule::{Effect, Phase, Rule, Value};
