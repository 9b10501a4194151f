//! Multi-source artist discovery.
//!
//! A search fans out to every adapter through [`settle_all`], merges the answers
//! into identities ([`aggregate`], [`augment`]), attaches latest releases under a
//! soft deadline and finally splits identities whose releases disagree
//! ([`disambiguate`]).

mod aggregate;
mod disambiguate;
mod engine;
mod join;
mod types;

pub use aggregate::{aggregate, augment, platform_order};
pub use disambiguate::{disambiguate, disambiguate_group};
pub use engine::{guard_merge, DiscoveryEngine};
pub use join::{panic_message, settle_all, Settled, SourceOutcome};
pub use types::*;
