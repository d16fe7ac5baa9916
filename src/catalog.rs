use std::{
    collections::HashSet,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{error::CatalogError, models::MovieRecord};

const REQUIRED_COLUMNS: [&str; 5] = ["title", "genres", "tag", "rating", "tmdbId"];

static TITLE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)").expect("valid year pattern"));

/// Immutable, deduplicated movie table built once at startup.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    records: Vec<MovieRecord>,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    title: String,
    genres: Option<String>,
    tag: Option<String>,
    rating: Option<String>,
    #[serde(rename = "tmdbId")]
    tmdb_id: Option<String>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| unavailable(path, err))?;
        Self::read(path, file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        Self::read(Path::new("<reader>"), reader)
    }

    fn read(path: &Path, reader: impl Read) -> Result<Self, CatalogError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr.headers().map_err(|err| unavailable(path, err))?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(unavailable(path, format!("missing column {column:?}")));
            }
        }

        let mut parsed = Vec::new();
        for (idx, row) in rdr.deserialize::<RawRow>().enumerate() {
            // header is line 1
            let line = idx + 2;
            let row = row.map_err(|err| unavailable(path, format!("line {line}: {err}")))?;
            let record = normalize(row)
                .map_err(|reason| unavailable(path, format!("line {line}: {reason}")))?;
            parsed.push(record);
        }

        let total = parsed.len();
        let records = dedup_by_title(parsed);
        info!(
            path = %path.display(),
            records = records.len(),
            duplicates = total - records.len(),
            "loaded catalog"
        );

        Ok(Self { records })
    }

    pub fn records(&self) -> &[MovieRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn normalize(row: RawRow) -> Result<MovieRecord, String> {
    let title = row.title.trim().to_string();
    if title.is_empty() {
        return Err("empty title".to_string());
    }

    let year = parse_title_year(&title);
    let tmdb_id = non_empty(row.tmdb_id).map(|raw| parse_tmdb_id(&raw)).transpose()?;
    let rating = non_empty(row.rating)
        .map(|raw| raw.parse::<f64>().map_err(|_| format!("rating {raw:?} is not a number")))
        .transpose()?
        .filter(|r| !r.is_nan());
    let genres = row.genres.as_deref().map(split_genres).unwrap_or_default();
    let tag = non_empty(row.tag);

    Ok(MovieRecord { title, year, tmdb_id, genres, tag, rating })
}

pub(crate) fn parse_title_year(title: &str) -> Option<i32> {
    TITLE_YEAR.captures(title).and_then(|caps| caps[1].parse().ok())
}

/// Accepts `862` as well as the float form `862.0` left behind by tools that
/// store nullable integer columns as floats.
fn parse_tmdb_id(raw: &str) -> Result<i64, String> {
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(id);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(format!("tmdbId {raw:?} is not an integer")),
    }
}

pub(crate) fn split_genres(raw: &str) -> Vec<String> {
    raw.split('|').map(str::trim).filter(|g| !g.is_empty()).map(str::to_string).collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    })
}

pub(crate) fn dedup_by_title(records: impl IntoIterator<Item = MovieRecord>) -> Vec<MovieRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            let fresh = seen.insert(r.title.clone());
            if !fresh {
                debug!(title = %r.title, "dropping duplicate title");
            }
            fresh
        })
        .collect()
}

fn unavailable(path: &Path, reason: impl ToString) -> CatalogError {
    CatalogError::DataUnavailable { path: PathBuf::from(path), reason: reason.to_string() }
}
