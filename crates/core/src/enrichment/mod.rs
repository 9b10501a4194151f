//! Secondary artist facts: official site, Discogs profile, social links and
//! whether the catalog reaches back before 2005.

mod pipeline;
pub mod social;

pub use pipeline::{EnrichmentPipeline, EnrichmentRecord};
pub use social::SocialLink;
