//! Release freshness for saved artists.
//!
//! The caller owns all state. A check takes an artist's platform URLs and its
//! [`ArtistReleaseState`], and returns at most one [`NewRelease`] together with
//! the updated state.

mod checker;
mod store;
mod types;

pub use checker::{ReleaseChecker, RELEASE_PRIORITY};
pub use store::{InMemoryReleaseStore, KeyedLockGuard, KeyedLocks, ReleaseStateStore};
pub use types::*;
