use crate::{
    rules::{AllowList, EnableSwitch, MatchContext, Percentage, Rule, StageGate},
    Attributes, ConfigSource, Env, ExternalStore, NoopStore,
};

/// A named rollout evaluated for one set of request attributes.
///
/// A rollout matches when the deployment stage allows rollouts, the rollout is switched on, and
/// either one of the attributes is allow-listed or the bucketing identifier falls within the
/// rollout percentage. See the [`rules`](crate::rules) module for each condition.
///
/// Every call to [`Rollout::matches`] reads configuration and the store again. Nothing is cached.
///
/// # Examples
/// ```
/// # use std::collections::HashMap;
/// # use rollout::{Attributes, Rollout};
/// let config = HashMap::from([
///     ("ENV".to_owned(), "production".to_owned()),
///     ("ROLLOUT".to_owned(), "gator".to_owned()),
///     ("ROLLOUT_GATOR_OWNERS".to_owned(), "carlad".to_owned()),
/// ]);
/// let attributes = Attributes::from([("owner".to_owned(), "carlad".into())]);
///
/// let rollout = Rollout::new("gator", attributes).config(&config);
/// assert!(rollout.matches());
/// ```
pub struct Rollout<'a> {
    feature: String,
    attributes: Attributes,
    config: &'a dyn ConfigSource,
    store: &'a dyn ExternalStore,
}

impl<'a> Rollout<'a> {
    /// Create a rollout reading the process environment, with no store.
    pub fn new(feature: impl Into<String>, attributes: Attributes) -> Self {
        Rollout {
            feature: feature.into(),
            attributes,
            config: &Env,
            store: &NoopStore,
        }
    }

    /// Read configuration from `config` instead of the process environment.
    pub fn config(mut self, config: &'a dyn ConfigSource) -> Self {
        self.config = config;
        self
    }

    /// Consult `store` for overrides.
    pub fn store(mut self, store: &'a dyn ExternalStore) -> Self {
        self.store = store;
        self
    }

    /// Name of the rollout.
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// Attributes the rollout is evaluated against.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Decide whether the rollout is on for these attributes.
    ///
    /// Never fails. Missing configuration and store failures make the rollout not match.
    pub fn matches(&self) -> bool {
        let context = MatchContext::new(&self.feature, &self.attributes, self.config, self.store);

        let stage = StageGate.matches(&context);
        let enabled = stage && EnableSwitch.matches(&context);
        let allow_listed = enabled && AllowList.matches(&context);
        let in_percentage = enabled && !allow_listed && Percentage.matches(&context);
        let verdict = allow_listed || in_percentage;

        log::debug!(target: "rollout",
                    feature:display = self.feature,
                    stage,
                    enabled,
                    allow_listed,
                    in_percentage,
                    verdict;
                    "evaluated rollout");

        verdict
    }

    /// Run `action` if the rollout matches.
    ///
    /// Returns `None` without running `action` otherwise.
    ///
    /// ```
    /// # use std::collections::HashMap;
    /// # use rollout::{Attributes, Rollout};
    /// let config = HashMap::from([("ENV".to_owned(), "development".to_owned())]);
    /// let rollout = Rollout::new("gator", Attributes::new()).config(&config);
    /// assert_eq!(rollout.run(|| "ran"), None);
    /// ```
    pub fn run<T>(&self, action: impl FnOnce() -> T) -> Option<T> {
        self.matches().then(action)
    }
}

/// Evaluate `feature` against the process environment and `store`, running `action` if it
/// matches.
///
/// ```no_run
/// # use rollout::{Attributes, NoopStore};
/// let attributes = Attributes::from([("uid".to_owned(), 1.into())]);
/// rollout::run("sync", attributes, &NoopStore, || println!("syncing with the new worker"));
/// ```
pub fn run<T>(
    feature: impl Into<String>,
    attributes: Attributes,
    store: &dyn ExternalStore,
    action: impl FnOnce() -> T,
) -> Option<T> {
    Rollout::new(feature, attributes).store(store).run(action)
}
