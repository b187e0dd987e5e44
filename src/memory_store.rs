//! In-memory graph store with the same match/merge semantics as the Cypher
//! in `neo4j_storage`. Test support only.

use crate::records::{LinkRecord, MovieRecord, RatingRecord, TagRecord};
use crate::store::{GraphStore, StoreResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieNode {
    pub title: String,
    pub year: String,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct GraphState {
    pub genres: BTreeSet<String>,
    pub movies: BTreeMap<String, MovieNode>,
    pub users: BTreeSet<String>,
    /// (genre, movie id)
    pub genre_edges: BTreeSet<(String, String)>,
    /// (user key, movie id) -> (rating, timestamp)
    pub ratings: BTreeMap<(String, String), (f64, String)>,
    /// (user key, movie id, tag) -> timestamp
    pub tags: BTreeMap<(String, String, String), String>,
    /// Every write in arrival order, e.g. "genre:Action", "is_genre_of:1:Comedy".
    pub log: Vec<String>,
    pub constraints_ensured: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<GraphState>,
    /// Genre whose upsert is silently lost, to exercise the seeding check.
    lost_genre: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn losing_genre(name: &str) -> Self {
        Self {
            lost_genre: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn state(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap()
    }
}

impl GraphStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn ensure_constraints(&self) -> StoreResult<()> {
        self.state().constraints_ensured = true;
        Ok(())
    }

    async fn merge_genre(&self, name: &str) -> StoreResult<()> {
        let mut state = self.state();
        if self.lost_genre.as_deref() != Some(name) {
            state.genres.insert(name.to_string());
        }
        state.log.push(format!("genre:{}", name));
        Ok(())
    }

    async fn genre_names(&self) -> StoreResult<Vec<String>> {
        Ok(self.state().genres.iter().cloned().collect())
    }

    async fn merge_movie(&self, movie: &MovieRecord) -> StoreResult<()> {
        let mut state = self.state();
        let node = state.movies.entry(movie.id.clone()).or_default();
        node.title = movie.title.clone();
        node.year = movie.year.clone();
        state.log.push(format!("movie:{}", movie.id));
        Ok(())
    }

    async fn link_genre(&self, movie_id: &str, genre: &str) -> StoreResult<bool> {
        let mut state = self.state();
        state.log.push(format!("is_genre_of:{}:{}", movie_id, genre));
        if !state.movies.contains_key(movie_id) || !state.genres.contains(genre) {
            return Ok(false);
        }
        state.genre_edges.insert((genre.to_string(), movie_id.to_string()));
        Ok(true)
    }

    async fn merge_user(&self, user_key: &str) -> StoreResult<()> {
        let mut state = self.state();
        state.users.insert(user_key.to_string());
        state.log.push(format!("user:{}", user_key));
        Ok(())
    }

    async fn merge_rating(&self, rating: &RatingRecord) -> StoreResult<bool> {
        let mut state = self.state();
        let user = rating.user_key();
        state.log.push(format!("rated:{}:{}", user, rating.movie_id));
        if !state.users.contains(&user) || !state.movies.contains_key(&rating.movie_id) {
            return Ok(false);
        }
        state.ratings.insert(
            (user, rating.movie_id.clone()),
            (rating.rating, rating.timestamp.clone()),
        );
        Ok(true)
    }

    async fn merge_tag(&self, tag: &TagRecord) -> StoreResult<bool> {
        let mut state = self.state();
        let user = tag.user_key();
        state.log.push(format!("tagged:{}:{}", user, tag.movie_id));
        if !state.users.contains(&user) || !state.movies.contains_key(&tag.movie_id) {
            return Ok(false);
        }
        state
            .tags
            .insert((user, tag.movie_id.clone(), tag.tag.clone()), tag.timestamp.clone());
        Ok(true)
    }

    async fn set_movie_links(&self, link: &LinkRecord) -> StoreResult<bool> {
        let mut state = self.state();
        state.log.push(format!("links:{}", link.movie_id));
        match state.movies.get_mut(&link.movie_id) {
            Some(node) => {
                node.imdb_id = link.imdb_id.clone();
                node.tmdb_id = link.tmdb_id.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
