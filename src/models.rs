use jiff::civil::Date;
use serde::Serialize;

use crate::error::CatalogError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieRecord {
    pub title: String,
    pub year: Option<i32>,
    pub tmdb_id: Option<i64>,
    pub genres: Vec<String>,
    pub tag: Option<String>,
    pub rating: Option<f64>,
}

impl MovieRecord {
    /// Genres in their source form, `Action|Drama`.
    pub fn joined_genres(&self) -> String {
        self.genres.join("|")
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Rating,
    Year,
}

impl SortBy {
    pub fn parse(value: &str) -> Result<Self, CatalogError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rating" => Ok(SortBy::Rating),
            "year" => Ok(SortBy::Year),
            other => Err(CatalogError::InvalidInput(format!(
                "unknown sort field {other:?}, expected \"rating\" or \"year\""
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenreSource {
    Chart,
    Dropdown,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieCard {
    pub tmdb_id: i64,
    pub title: String,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub genres: Vec<String>,
    pub poster_url: String,
    pub detail_path: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CastMember {
    pub name: String,
    pub photo_url: Option<String>,
    pub actor_path: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieDetail {
    pub tmdb_id: i64,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub poster_url: String,
    pub rating: Option<f64>,
    pub vote_count: Option<u64>,
    pub homepage: Option<String>,
    pub companies: Vec<String>,
    pub languages: Vec<String>,
    pub trailer_video_id: Option<String>,
    pub cast: Vec<CastMember>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilmCredit {
    pub id: i64,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
}

impl FilmCredit {
    pub fn release_year(&self) -> Option<i16> {
        let raw = self.release_date.as_deref()?.trim();
        raw.parse::<Date>().ok().map(|d| d.year())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActorProfile {
    pub name: String,
    pub tmdb_person_id: i64,
    pub bio: Option<String>,
    pub photo_url: String,
    pub filmography: Vec<FilmCredit>,
}

impl ActorProfile {
    pub fn top_credits(&self, n: usize) -> &[FilmCredit] {
        &self.filmography[..self.filmography.len().min(n)]
    }
}

/// Outcome of a single remote lookup.
///
/// `NotFound` means the remote answered and had nothing; `Failed` covers
/// transport errors, unexpected statuses and undecodable bodies.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound | Lookup::Failed => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}
