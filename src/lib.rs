//! Gradual feature rollouts, decided per request.
//!
//! # Overview
//!
//! A [`Rollout`] names a feature and carries the [`Attributes`] of one request (a user id, an
//! owner name, a repository slug, ...). [`Rollout::matches`] decides whether the feature is on
//! for that request:
//!
//! - the deployment stage (`ENV`) must be `production` or `staging`,
//! - the rollout must be switched on, either by `ROLLOUT` naming it or by the store flag
//!   `<feature>.rollout.enabled` being `"1"`,
//! - and either an attribute value is allow-listed (`ROLLOUT_<FEATURE>_<ATTR>S` or the store
//!   set `<feature>.rollout.<attr>s`), or the bucketing identifier (`uid`) falls within the
//!   rollout percentage (`ROLLOUT_PERCENT`, `<feature>.rollout.percent`, or
//!   `ROLLOUT_<FEATURE>_PERCENT`).
//!
//! Configuration comes from a [`ConfigSource`], the process environment by default. Overrides
//! can be kept in an [`ExternalStore`] such as [`RedisStore`] so rollouts can be widened without
//! redeploying.
//!
//! # Error Handling
//!
//! Evaluation never fails. Missing configuration, malformed values, and an unreachable store all
//! make a rollout not match, so infrastructure problems keep new behavior switched off.
//!
//! [`Error`] is only returned when constructing store adapters.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate with the `rollout`
//! target. Every evaluation is logged at debug level; store failures and malformed percentages
//! are logged as warnings.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod attributes;
mod bucket;
mod config_source;
mod error;
#[cfg(feature = "redis")]
mod redis_store;
mod rollout;
pub mod rules;
mod store;

pub use attributes::{AttributeValue, Attributes, BUCKETING_ATTRIBUTE};
pub use bucket::bucket;
pub use config_source::{ConfigSource, Env};
pub use error::{Error, Result};
#[cfg(feature = "redis")]
pub use redis_store::{RedisStore, RedisStoreConfig};
pub use rollout::{run, Rollout};
pub use store::{ExternalStore, MemoryStore, NoopStore};
