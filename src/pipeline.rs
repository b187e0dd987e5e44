//! Ordered CSV → graph ingestion.
//!
//! Stages run one after another, records one at a time in file order. A stage
//! only starts once the previous one has returned, which is what keeps every
//! relationship write after the nodes it references.

use crate::config::{RecordLimits, SourcePaths};
use crate::error::{IngestError, RecordError, StoreError};
use crate::records::{LinkRecord, MovieRecord, RatingRecord, TagRecord, KNOWN_GENRES};
use crate::store::GraphStore;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::io;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Genres,
    Movies,
    Ratings,
    Tags,
    Links,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::Genres,
        Stage::Movies,
        Stage::Ratings,
        Stage::Tags,
        Stage::Links,
    ];

    fn progress_interval(self) -> usize {
        match self {
            Stage::Movies => 1000,
            _ => 100,
        }
    }

    fn progress_label(self) -> &'static str {
        match self {
            Stage::Genres => "Genre nodes created",
            Stage::Movies => "Movie nodes created",
            Stage::Ratings => "Rating relationships created",
            Stage::Tags => "Tag relationships created",
            Stage::Links => "Movie nodes updated with links",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Genres => "genre seeding",
            Stage::Movies => "movie loading",
            Stage::Ratings => "rating loading",
            Stage::Tags => "tag loading",
            Stage::Links => "link augmentation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub processed: usize,
    /// Relationship or link writes whose endpoints did not exist.
    pub skipped_references: usize,
    /// The record cap stopped the stage with input left unread.
    pub truncated: bool,
}

impl StageReport {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            processed: 0,
            skipped_references: 0,
            truncated: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub limits: RecordLimits,
    pub strict_references: bool,
    pub ensure_constraints: bool,
}

pub struct Pipeline<'a, S: GraphStore> {
    store: &'a S,
    options: PipelineOptions,
}

impl<'a, S: GraphStore> Pipeline<'a, S> {
    pub fn new(store: &'a S, options: PipelineOptions) -> Self {
        Self { store, options }
    }

    /// Run every stage in order against the CSV files in `sources`.
    pub async fn run(&self, run_id: Uuid, sources: &SourcePaths) -> Result<RunSummary, IngestError> {
        let started_at = Utc::now();

        if self.options.ensure_constraints {
            self.store.ensure_constraints().await.map_err(IngestError::Schema)?;
        }

        let mut stages = Vec::with_capacity(Stage::ORDER.len());
        for stage in Stage::ORDER {
            let report = match sources.for_stage(stage) {
                None => self.seed_genres().await?,
                Some(path) => {
                    info!("📄 Reading {} for {}", path.display(), stage);
                    let reader = ReaderBuilder::new()
                        .has_headers(true)
                        .flexible(true)
                        .from_path(path)
                        .map_err(|source| IngestError::Open {
                            stage,
                            path: path.clone(),
                            source,
                        })?;
                    self.load_stage(stage, reader).await?
                }
            };
            stages.push(report);
        }

        Ok(RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            stages,
        })
    }

    /// Upsert every known genre, then read the store back and refuse to
    /// continue unless all of them are present.
    pub async fn seed_genres(&self) -> Result<StageReport, IngestError> {
        let stage = Stage::Genres;
        info!("🚀 Starting {}", stage);

        let mut report = StageReport::new(stage);
        for (index, genre) in KNOWN_GENRES.iter().enumerate() {
            self.store
                .merge_genre(genre)
                .await
                .map_err(|source| IngestError::Store {
                    stage,
                    line: index as u64 + 1,
                    source,
                })?;
            report.processed += 1;
        }

        let present: HashSet<String> = self
            .store
            .genre_names()
            .await
            .map_err(IngestError::GenreCheck)?
            .into_iter()
            .collect();
        let missing: Vec<String> = KNOWN_GENRES
            .iter()
            .filter(|g| !present.contains(**g))
            .map(|g| g.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::GenreSeedingIncomplete { missing });
        }

        info!("✅ {} complete: {} {}", stage, report.processed, stage.progress_label());
        Ok(report)
    }

    /// Apply one CSV-backed stage. The header row is skipped by the reader.
    pub async fn load_stage<R: io::Read>(
        &self,
        stage: Stage,
        mut reader: csv::Reader<R>,
    ) -> Result<StageReport, IngestError> {
        if stage == Stage::Genres {
            return self.seed_genres().await;
        }

        info!("🚀 Starting {}", stage);
        let limit = self.options.limits.for_stage(stage);
        let total = limit.map_or_else(|| "?".to_string(), |n| n.to_string());
        let mut report = StageReport::new(stage);

        for (index, result) in reader.records().enumerate() {
            if limit.is_some_and(|max| report.processed >= max) {
                report.truncated = true;
                info!("⏹️  {} stopped at record cap ({})", stage, report.processed);
                break;
            }

            let record = result.map_err(|source| IngestError::Read { stage, source })?;
            // Line 1 is the header.
            let line = record.position().map_or(index as u64 + 2, |p| p.line());

            report.skipped_references += self.apply(stage, &record, line).await?;
            report.processed += 1;

            if report.processed % stage.progress_interval() == 0 {
                info!("{}/{} {}", report.processed, total, stage.progress_label());
            }
        }

        if report.skipped_references > 0 {
            if self.options.strict_references {
                return Err(IngestError::UnresolvedReferences {
                    stage,
                    count: report.skipped_references,
                });
            }
            warn!(
                "⚠️  {}: {} references to missing nodes were skipped",
                stage, report.skipped_references
            );
        }

        info!("✅ {} complete: {} {}", stage, report.processed, stage.progress_label());
        Ok(report)
    }

    /// Write one record. Returns how many of its references were unresolved.
    async fn apply(&self, stage: Stage, record: &StringRecord, line: u64) -> Result<usize, IngestError> {
        let malformed = |source: RecordError| IngestError::Malformed { stage, line, source };
        let store_err = |source: StoreError| IngestError::Store { stage, line, source };

        let mut skipped = 0;
        match stage {
            Stage::Genres => {}
            Stage::Movies => {
                let movie = MovieRecord::from_record(record).map_err(malformed)?;
                self.store.merge_movie(&movie).await.map_err(store_err)?;
                for genre in &movie.genres {
                    if !self.store.link_genre(&movie.id, genre).await.map_err(store_err)? {
                        debug!("line {}: no genre {:?} for movie {}", line, genre, movie.id);
                        skipped += 1;
                    }
                }
            }
            Stage::Ratings => {
                let rating = RatingRecord::from_record(record).map_err(malformed)?;
                self.store.merge_user(&rating.user_key()).await.map_err(store_err)?;
                if !self.store.merge_rating(&rating).await.map_err(store_err)? {
                    debug!("line {}: no movie {} for rating", line, rating.movie_id);
                    skipped += 1;
                }
            }
            Stage::Tags => {
                let tag = TagRecord::from_record(record).map_err(malformed)?;
                if !self.store.merge_tag(&tag).await.map_err(store_err)? {
                    debug!("line {}: no user {} or movie {} for tag", line, tag.user_key(), tag.movie_id);
                    skipped += 1;
                }
            }
            Stage::Links => {
                let link = LinkRecord::from_record(record).map_err(malformed)?;
                if !self.store.set_movie_links(&link).await.map_err(store_err)? {
                    debug!("line {}: no movie {} for links", line, link.movie_id);
                    skipped += 1;
                }
            }
        }

        Ok(skipped)
    }
}
