//! Configuration for the cohort track updater.
//!
//! The core never reads the process environment; the CLI layer loads a
//! configuration file through [`load_config_from`], applies `COHORT_`-prefixed
//! environment overrides, and hands the resulting [`shared::UpdaterConfig`] to
//! the core as an explicit value.

mod load;
pub mod shared;

pub use load::{LoadConfigError, load_config_from};
