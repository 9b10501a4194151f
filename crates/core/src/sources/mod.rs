//! Source adapters.
//!
//! Every external platform is wrapped behind one of three capability traits:
//!
//! - [`CandidateSource`]: free-text query to candidate matches
//! - [`DirectorySource`]: free-text query to confirmed matches keyed by normalized name
//! - [`ReleaseSource`]: artist page URL to the most recent release
//!
//! Adapters enforce their own timeouts and never retry. The provided `find` and
//! `fetch_latest` wrappers are the boundary: failures are logged and become empty
//! results.

mod ampwall;
mod bandcamp;
mod discogs;
mod faircamp;
pub mod feed;
pub mod http;
mod mirlo;
mod musicbrainz;
pub mod parse;
mod qobuz;
mod types;

pub use ampwall::AmpwallSource;
pub use bandcamp::BandcampSource;
pub use discogs::DiscogsClient;
pub use faircamp::{FaircampDirectory, FaircampFeed, FaircampSite};
pub use feed::FeedItem;
pub use mirlo::{MirloFeed, MirloSource};
pub use musicbrainz::{MbArtist, MbReleaseGroup, MbUrlRelation, MusicBrainzClient};
pub use qobuz::QobuzSource;
pub use types::*;

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use crate::identity::Query;

/// A source that turns a query into candidate matches.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn id(&self) -> SourceId;

    async fn search(&self, query: &Query) -> Result<Vec<Candidate>, SourceError>;

    /// Search, folding any failure into an empty list.
    async fn find(&self, query: &Query) -> Vec<Candidate> {
        match self.search(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(source = %self.id(), query = %query.raw, error = %e, "Source search failed");
                Vec::new()
            }
        }
    }
}

/// A source that confirms matches against a listing it owns.
///
/// Results are keyed by the normalized identity they were confirmed under.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    fn id(&self) -> SourceId;

    async fn search(&self, query: &Query) -> Result<HashMap<String, DirectoryMatch>, SourceError>;

    /// Search, folding any failure into an empty map.
    async fn find(&self, query: &Query) -> HashMap<String, DirectoryMatch> {
        match self.search(query).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(source = %self.id(), query = %query.raw, error = %e, "Directory search failed");
                HashMap::new()
            }
        }
    }
}

/// A source that can report an artist's most recent release.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Latest release listed on the artist page. The date may be missing.
    async fn latest_release(&self, artist_url: &str)
        -> Result<Option<LatestRelease>, SourceError>;

    /// Latest release with its date resolved when the listing lacks one.
    ///
    /// Defaults to [`ReleaseSource::latest_release`]; sources that need a second
    /// request for the date override this.
    async fn dated_latest_release(
        &self,
        artist_url: &str,
    ) -> Result<Option<LatestRelease>, SourceError> {
        self.latest_release(artist_url).await
    }

    /// [`ReleaseSource::latest_release`], folding any failure into `None`.
    async fn fetch_latest(&self, artist_url: &str) -> Option<LatestRelease> {
        match self.latest_release(artist_url).await {
            Ok(release) => release,
            Err(e) => {
                warn!(source = %self.id(), url = artist_url, error = %e, "Release fetch failed");
                None
            }
        }
    }
}
