//! Positional CSV records
//!
//! Each source file maps fields by position only; column names in the header
//! row are never consulted. Parsing happens before any write is issued, so a
//! record that fails here leaves nothing behind in the graph.

use crate::error::RecordError;
use csv::StringRecord;

/// Genres seeded before any movie is loaded.
pub const KNOWN_GENRES: [&str; 18] = [
    "Action",
    "Adventure",
    "Animation",
    "Children's",
    "Comedy",
    "Crime",
    "Documentary",
    "Drama",
    "Fantasy",
    "Film-Noir",
    "Horror",
    "Musical",
    "Mystery",
    "Romance",
    "Sci-Fi",
    "Thriller",
    "War",
    "Western",
];

/// Length of the " (YYYY)" suffix carried by every MovieLens title.
const YEAR_SUFFIX_LEN: usize = 7;

const USER_ID_PREFIX: &str = "User ";

fn field<'r>(record: &'r StringRecord, index: usize, name: &'static str) -> Result<&'r str, RecordError> {
    record
        .get(index)
        .ok_or(RecordError::MissingField { field: name, index })
}

/// Graph key of a user: the numeric source id prefixed with "User ".
pub fn user_key(source_id: &str) -> String {
    format!("{}{}", USER_ID_PREFIX, source_id)
}

/// Split `"Title (Year)"` into its title and year parts.
///
/// The last seven characters are the suffix; the year is the four characters
/// inside the parentheses. Works on characters, not bytes.
pub fn split_title_year(raw: &str) -> Result<(String, String), RecordError> {
    let trimmed = raw.trim_end();
    let starts: Vec<usize> = trimmed.char_indices().map(|(i, _)| i).collect();
    let n = starts.len();
    if n < YEAR_SUFFIX_LEN {
        return Err(RecordError::TitleTooShort(raw.to_string()));
    }

    let title = &trimmed[..starts[n - YEAR_SUFFIX_LEN]];
    let year = &trimmed[starts[n - 5]..starts[n - 1]];
    Ok((title.to_string(), year.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub id: String,
    pub title: String,
    pub year: String,
    pub genres: Vec<String>,
}

impl MovieRecord {
    pub fn from_record(record: &StringRecord) -> Result<Self, RecordError> {
        let id = field(record, 0, "movieId")?;
        let (title, year) = split_title_year(field(record, 1, "title")?)?;
        let genres = field(record, 2, "genres")?
            .split('|')
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            id: id.to_string(),
            title,
            year,
            genres,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingRecord {
    pub user_id: String,
    pub movie_id: String,
    pub rating: f64,
    pub timestamp: String,
}

impl RatingRecord {
    pub fn from_record(record: &StringRecord) -> Result<Self, RecordError> {
        let user_id = field(record, 0, "userId")?;
        let movie_id = field(record, 1, "movieId")?;
        let raw_rating = field(record, 2, "rating")?;
        let timestamp = field(record, 3, "timestamp")?;

        let rating = raw_rating
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite())
            .ok_or_else(|| RecordError::InvalidRating(raw_rating.to_string()))?;

        Ok(Self {
            user_id: user_id.to_string(),
            movie_id: movie_id.to_string(),
            rating,
            timestamp: timestamp.to_string(),
        })
    }

    pub fn user_key(&self) -> String {
        user_key(&self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagRecord {
    pub user_id: String,
    pub movie_id: String,
    pub tag: String,
    pub timestamp: String,
}

impl TagRecord {
    pub fn from_record(record: &StringRecord) -> Result<Self, RecordError> {
        Ok(Self {
            user_id: field(record, 0, "userId")?.to_string(),
            movie_id: field(record, 1, "movieId")?.to_string(),
            tag: field(record, 2, "tag")?.to_string(),
            timestamp: field(record, 3, "timestamp")?.to_string(),
        })
    }

    pub fn user_key(&self) -> String {
        user_key(&self.user_id)
    }
}

/// External identifiers for a movie. Empty fields become `None` so the
/// corresponding property is cleared rather than set to "".
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub movie_id: String,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
}

impl LinkRecord {
    pub fn from_record(record: &StringRecord) -> Result<Self, RecordError> {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

        Ok(Self {
            movie_id: field(record, 0, "movieId")?.to_string(),
            imdb_id: non_empty(field(record, 1, "imdbId")?),
            tmdb_id: non_empty(field(record, 2, "tmdbId")?),
        })
    }
}
