use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum TmdbError {
    #[error("resource not found")]
    NotFound,

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(String),
}

pub type TmdbResult<T> = Result<T, TmdbError>;

/// Raw TMDB endpoints. Implementations only move bytes and decode them;
/// assembling them into catalog types happens in `details`.
#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn movie(&self, id: i64) -> TmdbResult<MovieResponse>;
    async fn movie_videos(&self, id: i64) -> TmdbResult<VideosResponse>;
    async fn movie_credits(&self, id: i64) -> TmdbResult<CreditsResponse>;
    async fn search_person(&self, name: &str) -> TmdbResult<PersonSearchResponse>;
    async fn person(&self, id: i64) -> TmdbResult<PersonResponse>;
    async fn person_movie_credits(&self, id: i64) -> TmdbResult<PersonCreditsResponse>;
}

pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    access_token: String,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        access_token: String,
        base_url: String,
        rps: u32,
    ) -> Self {
        if api_key.trim().is_empty() && access_token.trim().is_empty() {
            tracing::warn!(
                "no TMDB_API_KEY or TMDB_ACCESS_TOKEN provided, remote lookups will fail"
            );
        }

        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, api_key, access_token, base_url, limiter }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> TmdbResult<T> {
        self.limiter.until_ready().await;

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        debug!(path = %path, "tmdb request");

        let mut req = self.client.get(url).query(query);
        if !self.access_token.trim().is_empty() {
            req = req.bearer_auth(&self.access_token);
        } else {
            req = req.query(&[("api_key", &self.api_key)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TmdbError::NotFound);
        }
        if !status.is_success() {
            return Err(TmdbError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| TmdbError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn movie(&self, id: i64) -> TmdbResult<MovieResponse> {
        self.get(&format!("/movie/{id}"), &[]).await
    }

    async fn movie_videos(&self, id: i64) -> TmdbResult<VideosResponse> {
        self.get(&format!("/movie/{id}/videos"), &[]).await
    }

    async fn movie_credits(&self, id: i64) -> TmdbResult<CreditsResponse> {
        self.get(&format!("/movie/{id}/credits"), &[]).await
    }

    async fn search_person(&self, name: &str) -> TmdbResult<PersonSearchResponse> {
        self.get("/search/person", &[("query", name)]).await
    }

    async fn person(&self, id: i64) -> TmdbResult<PersonResponse> {
        self.get(&format!("/person/{id}"), &[]).await
    }

    async fn person_movie_credits(&self, id: i64) -> TmdbResult<PersonCreditsResponse> {
        self.get(&format!("/person/{id}/movie_credits"), &[]).await
    }
}

/// Decodes a field that may be absent, null or of an unexpected type into
/// `None` instead of rejecting the whole body.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`] for lists: entries that fail to decode are dropped.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items.into_iter().filter_map(|v| serde_json::from_value(v).ok()).collect())
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Named {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SpokenLanguage {
    #[serde(default, deserialize_with = "lenient")]
    pub english_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MovieResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub runtime: Option<u32>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub genres: Vec<Named>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub vote_average: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub vote_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub homepage: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub production_companies: Vec<Named>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub spoken_languages: Vec<SpokenLanguage>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Video {
    #[serde(default, deserialize_with = "lenient")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub site: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VideosResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub results: Vec<Video>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CastEntry {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub profile_path: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreditsResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub cast: Vec<CastEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PersonHit {
    pub id: i64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PersonSearchResponse {
    /// Left raw: only the first hit is ever decoded, into a [`PersonHit`].
    #[serde(default, deserialize_with = "lenient_list")]
    pub results: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PersonResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub biography: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub profile_path: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MovieCredit {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub release_date: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PersonCreditsResponse {
    #[serde(default, deserialize_with = "lenient_list")]
    pub cast: Vec<MovieCredit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_response_tolerates_missing_and_mistyped_fields() {
        let body = r#"{
            "title": "Toy Story",
            "runtime": "eighty-one",
            "genres": [{"name": "Animation"}, {"id": 35}],
            "vote_average": 7.9,
            "homepage": null,
            "spoken_languages": "English"
        }"#;
        let movie: MovieResponse = serde_json::from_str(body).unwrap();

        assert_eq!(movie.title.as_deref(), Some("Toy Story"));
        assert_eq!(movie.runtime, None);
        assert_eq!(movie.genres.len(), 2);
        assert_eq!(movie.genres[0].name.as_deref(), Some("Animation"));
        assert_eq!(movie.genres[1].name, None);
        assert_eq!(movie.vote_average, Some(7.9));
        assert_eq!(movie.vote_count, None);
        assert_eq!(movie.homepage, None);
        assert!(movie.spoken_languages.is_empty());
        assert!(movie.production_companies.is_empty());
    }

    #[test]
    fn video_type_maps_from_reserved_name() {
        let body = r#"{"results": [{"key": "abc", "site": "YouTube", "type": "Trailer"}]}"#;
        let videos: VideosResponse = serde_json::from_str(body).unwrap();
        assert_eq!(videos.results[0].kind.as_deref(), Some("Trailer"));
    }

    #[test]
    fn search_hits_keep_their_order() {
        let body = r#"{"results": [{"name": "nobody"}, {"id": 31}]}"#;
        let search: PersonSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(search.results.len(), 2);
        assert!(serde_json::from_value::<PersonHit>(search.results[0].clone()).is_err());
        assert_eq!(serde_json::from_value::<PersonHit>(search.results[1].clone()).unwrap().id, 31);

        let search: PersonSearchResponse = serde_json::from_str(r#"{"results": "oops"}"#).unwrap();
        assert!(search.results.is_empty());
    }

    #[test]
    fn empty_object_decodes_to_defaults() {
        let credits: PersonCreditsResponse = serde_json::from_str("{}").unwrap();
        assert!(credits.cast.is_empty());
        let person: PersonResponse = serde_json::from_str("{}").unwrap();
        assert!(person.biography.is_none());
    }
}
