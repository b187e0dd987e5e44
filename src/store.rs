//! Graph store seam.
//!
//! Every write is an upsert: match on the declared key, create only when
//! absent, then set non-key attributes. Operations that start with a MATCH on
//! existing endpoints return `false` when an endpoint is missing, in which
//! case nothing was written.

use crate::error::StoreError;
use crate::records::{LinkRecord, MovieRecord, RatingRecord, TagRecord};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[allow(async_fn_in_trait)]
pub trait GraphStore {
    /// Readiness probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Uniqueness constraints on Movie.id, Genre.name and User.id.
    async fn ensure_constraints(&self) -> StoreResult<()>;

    async fn merge_genre(&self, name: &str) -> StoreResult<()>;

    async fn genre_names(&self) -> StoreResult<Vec<String>>;

    async fn merge_movie(&self, movie: &MovieRecord) -> StoreResult<()>;

    async fn link_genre(&self, movie_id: &str, genre: &str) -> StoreResult<bool>;

    /// `user_key` is the full graph key, e.g. "User 7".
    async fn merge_user(&self, user_key: &str) -> StoreResult<()>;

    async fn merge_rating(&self, rating: &RatingRecord) -> StoreResult<bool>;

    async fn merge_tag(&self, tag: &TagRecord) -> StoreResult<bool>;

    async fn set_movie_links(&self, link: &LinkRecord) -> StoreResult<bool>;
}
