use std::fmt::Display;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tracing::{debug, warn};

use crate::{
    models::{ActorProfile, CastMember, FilmCredit, Lookup, MovieCard, MovieDetail, MovieRecord},
    tmdb::{CastEntry, PersonHit, TmdbApi, TmdbError, TmdbResult, Video},
};

pub const POSTER_PLACEHOLDER: &str = "https://via.placeholder.com/300x450?text=No+Image";
pub const PHOTO_PLACEHOLDER: &str = "https://via.placeholder.com/300x450?text=No+Photo";

pub const CAST_LIMIT: usize = 5;
pub const FILMOGRAPHY_LIMIT: usize = 10;

pub fn movie_detail_path(tmdb_id: i64) -> String {
    format!("/api/movie/tmdb/{tmdb_id}")
}

pub fn actor_path(name: &str) -> String {
    format!("/api/actor/{}", urlencoding::encode(name))
}

/// Turns a display name into a TMDB person id.
#[async_trait]
pub trait PersonLocator: Send + Sync {
    async fn locate(&self, api: &dyn TmdbApi, name: &str) -> Lookup<i64>;
}

/// Free-text person search that trusts the first hit. Common names can
/// resolve to the wrong person; there is no disambiguation.
pub struct FirstSearchResult;

#[async_trait]
impl PersonLocator for FirstSearchResult {
    async fn locate(&self, api: &dyn TmdbApi, name: &str) -> Lookup<i64> {
        match to_lookup("search_person", name, api.search_person(name).await) {
            Lookup::Found(resp) => match resp.results.into_iter().next() {
                Some(hit) => match serde_json::from_value::<PersonHit>(hit) {
                    Ok(hit) => Lookup::Found(hit.id),
                    Err(err) => {
                        warn!(name = %name, error = %err, "first person search hit is unusable");
                        Lookup::Failed
                    },
                },
                None => {
                    debug!(name = %name, "person search returned no results");
                    Lookup::NotFound
                },
            },
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Failed => Lookup::Failed,
        }
    }
}

pub struct MetadataResolver<'a> {
    api: &'a dyn TmdbApi,
    locator: &'a dyn PersonLocator,
    image_base_url: &'a str,
    max_concurrent: usize,
}

impl<'a> MetadataResolver<'a> {
    pub fn new(
        api: &'a dyn TmdbApi,
        locator: &'a dyn PersonLocator,
        image_base_url: &'a str,
        max_concurrent: usize,
    ) -> Self {
        Self { api, locator, image_base_url, max_concurrent }
    }

    /// Details, videos and credits are fetched independently; whatever
    /// succeeds ends up in the result.
    pub async fn fetch_movie_detail(&self, tmdb_id: i64) -> Lookup<MovieDetail> {
        let (details, videos, credits) = futures::join!(
            self.api.movie(tmdb_id),
            self.api.movie_videos(tmdb_id),
            self.api.movie_credits(tmdb_id),
        );
        let details = to_lookup("movie", tmdb_id, details);
        let videos = to_lookup("movie_videos", tmdb_id, videos);
        let credits = to_lookup("movie_credits", tmdb_id, credits);

        if !details.is_found() && !videos.is_found() && !credits.is_found() {
            return match details {
                Lookup::NotFound => Lookup::NotFound,
                _ => Lookup::Failed,
            };
        }

        let movie = details.found().unwrap_or_default();
        let trailer_video_id = videos.found().and_then(|v| pick_trailer(&v.results));
        let cast = credits.found().map(|c| self.top_cast(c.cast)).unwrap_or_default();

        debug!(
            tmdb_id = tmdb_id,
            has_trailer = trailer_video_id.is_some(),
            cast = cast.len(),
            "resolved movie detail"
        );

        Lookup::Found(MovieDetail {
            tmdb_id,
            title: movie.title,
            release_date: movie.release_date,
            overview: movie.overview,
            runtime_minutes: movie.runtime,
            genres: movie.genres.into_iter().filter_map(|g| g.name).collect(),
            poster_url: self.poster_url(movie.poster_path.as_deref()),
            rating: movie.vote_average,
            vote_count: movie.vote_count,
            homepage: movie.homepage.filter(|h| !h.trim().is_empty()),
            companies: movie.production_companies.into_iter().filter_map(|c| c.name).collect(),
            languages: movie.spoken_languages.into_iter().filter_map(|l| l.english_name).collect(),
            trailer_video_id,
            cast,
        })
    }

    pub async fn fetch_actor_by_name(&self, name: &str) -> Lookup<ActorProfile> {
        let person_id = match self.locator.locate(self.api, name).await {
            Lookup::Found(id) => id,
            Lookup::NotFound => return Lookup::NotFound,
            Lookup::Failed => return Lookup::Failed,
        };

        let (person, credits) =
            futures::join!(self.api.person(person_id), self.api.person_movie_credits(person_id));
        let person = to_lookup("person", person_id, person).found().unwrap_or_default();
        let credits =
            to_lookup("person_movie_credits", person_id, credits).found().unwrap_or_default();

        let filmography = credits
            .cast
            .into_iter()
            .map(|c| FilmCredit {
                id: c.id,
                title: c.title,
                poster_path: c.poster_path,
                release_date: c.release_date,
            })
            .collect::<Vec<_>>();

        debug!(name = %name, person_id = person_id, credits = filmography.len(), "resolved actor");

        Lookup::Found(ActorProfile {
            name: name.to_string(),
            tmdb_person_id: person_id,
            bio: person.biography.filter(|b| !b.trim().is_empty()),
            photo_url: self
                .sized_image("w300", person.profile_path.as_deref())
                .unwrap_or_else(|| PHOTO_PLACEHOLDER.to_string()),
            filmography,
        })
    }

    /// Always returns something an `<img>` can load.
    pub async fn resolve_poster_url(&self, tmdb_id: i64) -> String {
        if tmdb_id <= 0 {
            return POSTER_PLACEHOLDER.to_string();
        }
        match to_lookup("movie", tmdb_id, self.api.movie(tmdb_id).await) {
            Lookup::Found(movie) => self.poster_url(movie.poster_path.as_deref()),
            Lookup::NotFound | Lookup::Failed => POSTER_PLACEHOLDER.to_string(),
        }
    }

    /// Cards for the records that can be linked to TMDB, in input order.
    pub async fn movie_cards(&self, records: &[MovieRecord]) -> Vec<MovieCard> {
        let linked: Vec<(MovieRecord, i64)> = records
            .iter()
            .filter_map(|r| r.tmdb_id.map(|id| (r.clone(), id)))
            .collect();

        stream::iter(linked)
            .map(|(record, tmdb_id)| async move {
                let poster_url = self.resolve_poster_url(tmdb_id).await;
                MovieCard {
                    tmdb_id,
                    title: record.title,
                    year: record.year,
                    rating: record.rating,
                    genres: record.genres,
                    poster_url,
                    detail_path: movie_detail_path(tmdb_id),
                }
            })
            .buffered(self.max_concurrent.max(1))
            .collect()
            .await
    }

    pub fn credit_poster_url(&self, credit: &FilmCredit) -> String {
        self.poster_url(credit.poster_path.as_deref())
    }

    fn top_cast(&self, cast: Vec<CastEntry>) -> Vec<CastMember> {
        cast.into_iter()
            .take(CAST_LIMIT)
            .filter_map(|c| {
                let name = c.name.filter(|n| !n.trim().is_empty())?;
                Some(CastMember {
                    actor_path: actor_path(&name),
                    photo_url: self.sized_image("w185", c.profile_path.as_deref()),
                    name,
                })
            })
            .collect()
    }

    fn poster_url(&self, path: Option<&str>) -> String {
        self.sized_image("w500", path).unwrap_or_else(|| POSTER_PLACEHOLDER.to_string())
    }

    fn sized_image(&self, size: &str, path: Option<&str>) -> Option<String> {
        let path = path.map(str::trim).filter(|p| !p.is_empty())?;
        let sep = if path.starts_with('/') { "" } else { "/" };
        Some(format!("{}/{size}{sep}{path}", self.image_base_url.trim_end_matches('/')))
    }
}

fn pick_trailer(videos: &[Video]) -> Option<String> {
    videos
        .iter()
        .find(|v| v.kind.as_deref() == Some("Trailer") && v.site.as_deref() == Some("YouTube"))
        .and_then(|v| v.key.clone())
}

fn to_lookup<T>(endpoint: &'static str, key: impl Display, result: TmdbResult<T>) -> Lookup<T> {
    match result {
        Ok(value) => Lookup::Found(value),
        Err(TmdbError::NotFound) => {
            debug!(endpoint = endpoint, key = %key, "tmdb resource not found");
            Lookup::NotFound
        },
        Err(err) => {
            warn!(endpoint = endpoint, key = %key, error = %err, "tmdb lookup failed");
            Lookup::Failed
        },
    }
}
