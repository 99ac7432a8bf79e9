//! Personalized recommendation retrieval with a time-boxed cache.
//!
//! - [`RecommendationFetcher`] performs the tiered retrieval (personalized,
//!   then popular fallback).
//! - [`RecommendationStore`] owns one [`CacheRecord`] per session, serves it
//!   while fresh, and coalesces concurrent refreshes into a single fetch.
//! - [`RecommendationQuery`] is the caller-side, stateless filter/paginate
//!   transform over a served record.

pub mod catalog;
pub mod context;
pub mod entry;
pub mod error;
pub mod fetcher;
pub mod policy;
pub mod query;
pub mod record;
pub mod source;
pub mod store;
pub mod summary;

pub use catalog::{CatalogSubject, InMemoryCatalog};
pub use context::{UserContext, default_interests_for};
pub use entry::{PopularSubject, RecommendationEntry, ScoredSubject, SubjectSummary, Tier};
pub use error::FetchError;
pub use fetcher::RecommendationFetcher;
pub use policy::RecommendationPolicy;
pub use query::{RecommendationPage, RecommendationQuery};
pub use record::CacheRecord;
pub use source::{PopularSource, PreferencesSource, RecommendationSource};
pub use store::{RecommendationStore, RecordFetcher};
pub use summary::RecommendationSummary;
