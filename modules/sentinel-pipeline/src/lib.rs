pub mod geocoder;
pub mod normaliser;
pub mod tagger;

pub use geocoder::{GeoResult, Geocoder};
pub use normaliser::{canonicalise, NormalisedEntity, Resolver};
pub use tagger::{dedup_by_name_and_kind, EntityKind, EntityTagger, ExtractedEntity, HeuristicTagger};
