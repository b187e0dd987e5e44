//! Neo4j Storage
//!
//! One auto-commit query per logical write, over a single Bolt connection.
//! Each round-trip is bounded by the configured query timeout.

use crate::config::Neo4jSettings;
use crate::error::StoreError;
use crate::records::{LinkRecord, MovieRecord, RatingRecord, TagRecord};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::store::{GraphStore, StoreResult};
use anyhow::Result;
use neo4rs::{query, BoltNull, BoltType, ConfigBuilder, Graph, Query};
use std::future::Future;
use std::time::Duration;
use tracing::info;

// ============================================================================
// Cypher
// ============================================================================

pub(crate) const CONSTRAINTS: [&str; 3] = [
    "CREATE CONSTRAINT movie_id IF NOT EXISTS FOR (m:Movie) REQUIRE m.id IS UNIQUE",
    "CREATE CONSTRAINT genre_name IF NOT EXISTS FOR (g:Genre) REQUIRE g.name IS UNIQUE",
    "CREATE CONSTRAINT user_id IF NOT EXISTS FOR (u:User) REQUIRE u.id IS UNIQUE",
];

pub(crate) const MERGE_GENRE: &str = "MERGE (g:Genre {name: $name})";

pub(crate) const GENRE_NAMES: &str = "MATCH (g:Genre) RETURN collect(g.name) AS names";

pub(crate) const MERGE_MOVIE: &str = "MERGE (m:Movie {id: $id})
     SET m.title = $title, m.year = $year";

pub(crate) const LINK_GENRE: &str = "MATCH (m:Movie {id: $movie_id}), (g:Genre {name: $genre})
     MERGE (g)-[:IS_GENRE_OF]->(m)
     RETURN count(*) AS matched";

pub(crate) const MERGE_USER: &str = "MERGE (u:User {id: $id})";

pub(crate) const MERGE_RATING: &str = "MATCH (u:User {id: $user_id}), (m:Movie {id: $movie_id})
     MERGE (u)-[r:RATED]->(m)
     SET r.rating = $rating, r.timestamp = $timestamp
     RETURN count(*) AS matched";

pub(crate) const MERGE_TAG: &str = "MATCH (u:User {id: $user_id}), (m:Movie {id: $movie_id})
     MERGE (u)-[t:TAGGED {tag: $tag}]->(m)
     SET t.timestamp = $timestamp
     RETURN count(*) AS matched";

pub(crate) const SET_MOVIE_LINKS: &str = "MATCH (m:Movie {id: $movie_id})
     SET m.imdbId = $imdb_id, m.tmdbId = $tmdb_id
     RETURN count(*) AS matched";

fn optional(value: Option<&str>) -> BoltType {
    match value {
        Some(v) => v.into(),
        None => BoltType::Null(BoltNull),
    }
}

// ============================================================================
// Store
// ============================================================================

pub struct Neo4jStore {
    graph: Graph,
    query_timeout: Duration,
}

impl Neo4jStore {
    pub async fn connect(settings: &Neo4jSettings) -> StoreResult<Self> {
        let config = ConfigBuilder::default()
            .uri(settings.uri.as_str())
            .user(settings.user.as_str())
            .password(settings.password.as_str())
            .max_connections(1)
            .build()?;
        let graph = Graph::connect(config).await?;

        Ok(Self {
            graph,
            query_timeout: settings.query_timeout,
        })
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = std::result::Result<T, neo4rs::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout {
                operation,
                after: self.query_timeout,
            }),
        }
    }

    async fn run(&self, operation: &'static str, q: Query) -> StoreResult<()> {
        self.bounded(operation, self.graph.run(q)).await
    }

    /// Run a query returning a single `matched` count and report whether
    /// anything matched.
    async fn run_matched(&self, operation: &'static str, q: Query) -> StoreResult<bool> {
        let row = self
            .bounded(operation, async {
                let mut stream = self.graph.execute(q).await?;
                stream.next().await
            })
            .await?;

        match row {
            Some(row) => {
                let matched: i64 = row.get("matched").map_err(|e| StoreError::Decode {
                    column: "matched",
                    message: e.to_string(),
                })?;
                Ok(matched > 0)
            }
            None => Ok(false),
        }
    }
}

impl GraphStore for Neo4jStore {
    async fn ping(&self) -> StoreResult<()> {
        self.run("probe readiness", query("RETURN 1")).await
    }

    async fn ensure_constraints(&self) -> StoreResult<()> {
        for statement in CONSTRAINTS {
            self.run("create constraint", query(statement)).await?;
        }
        info!("   Ensured {} uniqueness constraints", CONSTRAINTS.len());
        Ok(())
    }

    async fn merge_genre(&self, name: &str) -> StoreResult<()> {
        self.run("merge genre", query(MERGE_GENRE).param("name", name)).await
    }

    async fn genre_names(&self) -> StoreResult<Vec<String>> {
        let row = self
            .bounded("list genres", async {
                let mut stream = self.graph.execute(query(GENRE_NAMES)).await?;
                stream.next().await
            })
            .await?;

        match row {
            Some(row) => row.get("names").map_err(|e| StoreError::Decode {
                column: "names",
                message: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn merge_movie(&self, movie: &MovieRecord) -> StoreResult<()> {
        let q = query(MERGE_MOVIE)
            .param("id", movie.id.as_str())
            .param("title", movie.title.as_str())
            .param("year", movie.year.as_str());
        self.run("merge movie", q).await
    }

    async fn link_genre(&self, movie_id: &str, genre: &str) -> StoreResult<bool> {
        let q = query(LINK_GENRE)
            .param("movie_id", movie_id)
            .param("genre", genre);
        self.run_matched("merge IS_GENRE_OF", q).await
    }

    async fn merge_user(&self, user_key: &str) -> StoreResult<()> {
        self.run("merge user", query(MERGE_USER).param("id", user_key)).await
    }

    async fn merge_rating(&self, rating: &RatingRecord) -> StoreResult<bool> {
        let q = query(MERGE_RATING)
            .param("user_id", rating.user_key())
            .param("movie_id", rating.movie_id.as_str())
            .param("rating", rating.rating)
            .param("timestamp", rating.timestamp.as_str());
        self.run_matched("merge RATED", q).await
    }

    async fn merge_tag(&self, tag: &TagRecord) -> StoreResult<bool> {
        let q = query(MERGE_TAG)
            .param("user_id", tag.user_key())
            .param("movie_id", tag.movie_id.as_str())
            .param("tag", tag.tag.as_str())
            .param("timestamp", tag.timestamp.as_str());
        self.run_matched("merge TAGGED", q).await
    }

    async fn set_movie_links(&self, link: &LinkRecord) -> StoreResult<bool> {
        let q = query(SET_MOVIE_LINKS)
            .param("movie_id", link.movie_id.as_str())
            .param("imdb_id", optional(link.imdb_id.as_deref()))
            .param("tmdb_id", optional(link.tmdb_id.as_deref()));
        self.run_matched("set movie links", q).await
    }
}

/// Connect to Neo4j and wait until it answers a probe, with exponential
/// backoff. The store commonly starts alongside this process.
pub async fn connect_with_retry(settings: &Neo4jSettings, policy: &RetryPolicy) -> Result<Neo4jStore> {
    let what = format!("connect to Neo4j at {}", settings.uri);
    let store = retry_with_backoff(policy, &what, move || async move {
        let store = Neo4jStore::connect(settings).await?;
        store.ping().await?;
        Ok::<_, StoreError>(store)
    })
    .await?;

    info!("✅ Successfully connected to Neo4j");
    Ok(store)
}
