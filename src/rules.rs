//! Match rules combined by [`Rollout`](crate::Rollout).
//!
//! Each rule is a pure predicate over a [`MatchContext`]. Rules read configuration and the
//! store on every call and never write anything.
use std::collections::HashSet;

use crate::{
    attributes::BUCKETING_ATTRIBUTE,
    bucket::{bucket, percentile},
    Attributes, ConfigSource, ExternalStore,
};

/// Configuration key naming the deployment stage.
pub const STAGE_KEY: &str = "ENV";
/// Stages in which rollouts may be active.
pub const STAGES: [&str; 2] = ["production", "staging"];
/// Configuration key listing enabled rollouts.
pub const ROLLOUT_KEY: &str = "ROLLOUT";
/// Configuration key overriding the percentage of every rollout.
pub const PERCENT_OVERRIDE_KEY: &str = "ROLLOUT_PERCENT";
/// Percentage used when none is configured. Never matches.
pub const NO_PERCENT: i64 = -1;

/// Everything a rule may look at while evaluating a rollout.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    /// Rollout name.
    pub feature: &'a str,
    /// Request attributes.
    pub attributes: &'a Attributes,
    /// Configuration, usually the process environment.
    pub config: &'a dyn ConfigSource,
    /// Store overrides. [`NoopStore`](crate::NoopStore) when there is no store.
    pub store: &'a dyn ExternalStore,
}

impl<'a> MatchContext<'a> {
    /// Bundle the inputs of one evaluation.
    pub fn new(
        feature: &'a str,
        attributes: &'a Attributes,
        config: &'a dyn ConfigSource,
        store: &'a dyn ExternalStore,
    ) -> Self {
        MatchContext {
            feature,
            attributes,
            config,
            store,
        }
    }

    /// Configuration key for a per-feature setting, e.g. `ROLLOUT_GATOR_OWNERS`.
    pub fn config_key(&self, setting: &str) -> String {
        format!(
            "ROLLOUT_{}_{}",
            self.feature.to_uppercase(),
            setting.to_uppercase()
        )
    }

    /// Store key for a per-feature setting, e.g. `gator.rollout.owners`.
    pub fn store_key(&self, setting: &str) -> String {
        format!("{}.rollout.{}", self.feature, setting.to_lowercase())
    }
}

/// A single match condition.
pub trait Rule {
    /// Returns `true` if the condition holds for `context`.
    fn matches(&self, context: &MatchContext) -> bool;
}

/// Passes only in the stages listed in [`STAGES`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StageGate;

impl Rule for StageGate {
    fn matches(&self, context: &MatchContext) -> bool {
        context
            .config
            .get(STAGE_KEY)
            .is_some_and(|stage| STAGES.contains(&stage.as_str()))
    }
}

/// Master switch of a rollout.
///
/// On when the `ROLLOUT` configuration names the feature, or when the store holds `"1"` under
/// `<feature>.rollout.enabled`. `ROLLOUT` may list several comma-separated names. Only the part
/// of a name before the first `.` is compared, so `gator.v2` switches on `gator`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnableSwitch;

impl EnableSwitch {
    fn named_in_config(context: &MatchContext) -> bool {
        let Some(rollouts) = context.config.get(ROLLOUT_KEY) else {
            return false;
        };
        rollouts
            .split(',')
            .filter_map(|entry| entry.trim().split('.').next())
            .any(|name| !name.is_empty() && name == context.feature)
    }

    fn enabled_in_store(context: &MatchContext) -> bool {
        context
            .store
            .get_value(&context.store_key("enabled"))
            .is_some_and(|value| value == "1")
    }
}

impl Rule for EnableSwitch {
    fn matches(&self, context: &MatchContext) -> bool {
        Self::named_in_config(context) || Self::enabled_in_store(context)
    }
}

/// Matches when any attribute value is listed in the allow-list for its attribute.
///
/// The allow-list for attribute `owner` of feature `gator` is the store set
/// `gator.rollout.owners` when that set is non-empty, and the comma-separated configuration
/// value `ROLLOUT_GATOR_OWNERS` otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowList;

impl AllowList {
    /// Resolve the allow-list of `attribute`.
    pub fn members(context: &MatchContext, attribute: &str) -> HashSet<String> {
        let setting = format!("{attribute}s");

        let from_store = context.store.get_set(&context.store_key(&setting));
        if !from_store.is_empty() {
            return from_store;
        }

        context
            .config
            .get(&context.config_key(&setting))
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|member| !member.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Rule for AllowList {
    fn matches(&self, context: &MatchContext) -> bool {
        context.attributes.iter().any(|(attribute, value)| {
            let Some(member) = value.as_list_member() else {
                return false;
            };
            let matched = Self::members(context, attribute).contains(member.as_ref());
            if matched {
                log::debug!(target: "rollout",
                            feature = context.feature,
                            attribute:display = attribute;
                            "matched allow-list");
            }
            matched
        })
    }
}

/// Matches a stable slice of bucketing identifiers.
///
/// The identifier under [`BUCKETING_ATTRIBUTE`] matches when its bucket modulo 100 is below the
/// resolved percentage.
#[derive(Debug, Clone, Copy, Default)]
pub struct Percentage;

impl Percentage {
    /// Resolve the percentage for the feature.
    ///
    /// Lookup order is the `ROLLOUT_PERCENT` override, then the store's
    /// `<feature>.rollout.percent`, then `ROLLOUT_<FEATURE>_PERCENT`. Falls back to
    /// [`NO_PERCENT`].
    pub fn threshold(context: &MatchContext) -> i64 {
        if let Some(value) = context.config.get(PERCENT_OVERRIDE_KEY) {
            return parse_percent(context, PERCENT_OVERRIDE_KEY, &value);
        }

        let store_key = context.store_key("percent");
        if let Some(value) = context.store.get_value(&store_key) {
            return parse_percent(context, &store_key, &value);
        }

        let config_key = context.config_key("percent");
        if let Some(value) = context.config.get(&config_key) {
            return parse_percent(context, &config_key, &value);
        }

        NO_PERCENT
    }
}

impl Rule for Percentage {
    fn matches(&self, context: &MatchContext) -> bool {
        let Some(identifier) = context.attributes.get(BUCKETING_ATTRIBUTE) else {
            return false;
        };
        let Some(identifier_bucket) = bucket(identifier) else {
            if !identifier.is_null() {
                log::debug!(target: "rollout",
                            feature = context.feature;
                            "bucketing identifier is neither an integer nor a string");
            }
            return false;
        };

        percentile(identifier_bucket) < Self::threshold(context)
    }
}

/// Reads the leading integer of `value`, so `"50.5"` is 50 and `"10%"` is 10. Values without
/// leading digits count as 0.
fn parse_percent(context: &MatchContext, key: &str, value: &str) -> i64 {
    let trimmed = value.trim_start();
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    let sign_len = trimmed.len() - unsigned.len();
    let digits_len = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());

    let leading = if sign_len <= 1 && digits_len > 0 {
        trimmed[..sign_len + digits_len].parse::<i64>().ok()
    } else {
        None
    };

    match leading {
        Some(percent) if sign_len + digits_len == trimmed.trim_end().len() => percent,
        Some(percent) => {
            log::warn!(target: "rollout",
                       feature = context.feature,
                       key,
                       value;
                       "rollout percentage has trailing characters, using {}", percent);
            percent
        }
        None => {
            log::warn!(target: "rollout",
                       feature = context.feature,
                       key,
                       value;
                       "malformed rollout percentage, treating as 0");
            0
        }
    }
}
