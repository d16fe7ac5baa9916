use std::{str::FromStr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    details::{FILMOGRAPHY_LIMIT, movie_detail_path},
    error::{AppResult, CatalogError},
    models::{
        ActorProfile, GenreCount, GenreSource, Lookup, MovieCard, MovieDetail, MovieRecord, SortBy,
    },
    query::{self, CatalogQuery, GenreSelection, MAX_PAGE_SIZE, PageNav},
    stats,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/movies", get(movies))
        .route("/api/movies/page", get(page_nav))
        .route("/api/genres", get(genres))
        .route("/api/genres/top", get(top_genres))
        .route("/api/movie/tmdb/{id}", get(movie_detail))
        .route("/api/actor/{name}", get(actor))
        .route("/api/poster/{id}", get(poster))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct MoviesQuery {
    genre: Option<String>,
    chart_genre: Option<String>,
    tag: Option<String>,
    sort: Option<String>,
    page: Option<String>,
    page_size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MoviesPage {
    page: usize,
    page_size: usize,
    genre: Option<String>,
    genre_source: Option<GenreSource>,
    movies: Vec<MovieRecord>,
    cards: Vec<MovieCard>,
}

pub async fn movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MoviesQuery>,
) -> AppResult<Json<MoviesPage>> {
    let sort_by = q.sort.as_deref().map(SortBy::parse).transpose()?.unwrap_or_default();
    let page = parse_param("page", q.page.as_deref())?.unwrap_or(0);
    let page_size =
        parse_param("page_size", q.page_size.as_deref())?.unwrap_or(state.config.page_size);
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(CatalogError::InvalidInput(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        ))
        .into());
    }

    let selection = GenreSelection { dropdown: q.genre, chart: q.chart_genre };
    let resolved = selection.resolve();

    let catalog_query = CatalogQuery {
        genre: resolved.map(|(_, genre)| genre.to_string()),
        tag: q.tag,
        sort_by,
        page,
        page_size,
    };
    let records = query::query(state.catalog.records(), &catalog_query);
    tracing::debug!(
        genre = ?catalog_query.genre,
        tag = ?catalog_query.tag,
        page = page,
        matched = records.len(),
        "catalog query"
    );

    let cards = state.resolver().movie_cards(&records).await;

    Ok(Json(MoviesPage {
        page,
        page_size,
        genre: catalog_query.genre,
        genre_source: resolved.map(|(source, _)| source),
        movies: records,
        cards,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PageNavQuery {
    current: Option<String>,
    nav: PageNav,
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    page: usize,
}

pub async fn page_nav(Query(q): Query<PageNavQuery>) -> AppResult<Json<PageResponse>> {
    let current = parse_param("current", q.current.as_deref())?.unwrap_or(0);
    Ok(Json(PageResponse { page: q.nav.apply(current) }))
}

pub async fn genres(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(stats::genre_options(state.catalog.records()))
}

#[derive(Debug, Deserialize)]
pub struct TopGenresQuery {
    n: Option<String>,
}

pub async fn top_genres(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TopGenresQuery>,
) -> AppResult<Json<Vec<GenreCount>>> {
    let n = parse_param("n", q.n.as_deref())?.unwrap_or(stats::TOP_GENRES);
    Ok(Json(stats::top_genres(state.catalog.records(), n)))
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MovieDetailResponse {
    Found { movie: MovieDetail },
    NotFound { tmdb_id: i64 },
    Unavailable { tmdb_id: i64 },
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<MovieDetailResponse>> {
    let tmdb_id = parse_movie_id(&raw_id)?;

    let body = match state.resolver().fetch_movie_detail(tmdb_id).await {
        Lookup::Found(movie) => MovieDetailResponse::Found { movie },
        Lookup::NotFound => MovieDetailResponse::NotFound { tmdb_id },
        Lookup::Failed => MovieDetailResponse::Unavailable { tmdb_id },
    };
    Ok(Json(body))
}

#[derive(Debug, Serialize)]
pub struct CreditView {
    id: i64,
    title: Option<String>,
    year: Option<i16>,
    poster_url: String,
    detail_path: String,
}

#[derive(Debug, Serialize)]
pub struct ActorView {
    name: String,
    tmdb_person_id: i64,
    bio: Option<String>,
    photo_url: String,
    movies: Vec<CreditView>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActorResponse {
    Found { actor: ActorView },
    NotFound { name: String },
    Unavailable { name: String },
}

pub async fn actor(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> AppResult<Json<ActorResponse>> {
    if name.trim().is_empty() {
        return Err(CatalogError::InvalidInput("actor name is required".to_string()).into());
    }

    let resolver = state.resolver();
    let body = match resolver.fetch_actor_by_name(&name).await {
        Lookup::Found(profile) => {
            let movies = profile
                .top_credits(FILMOGRAPHY_LIMIT)
                .iter()
                .map(|credit| CreditView {
                    id: credit.id,
                    title: credit.title.clone(),
                    year: credit.release_year(),
                    poster_url: resolver.credit_poster_url(credit),
                    detail_path: movie_detail_path(credit.id),
                })
                .collect();
            let ActorProfile { name, tmdb_person_id, bio, photo_url, .. } = profile;
            ActorResponse::Found { actor: ActorView { name, tmdb_person_id, bio, photo_url, movies } }
        },
        Lookup::NotFound => ActorResponse::NotFound { name },
        Lookup::Failed => ActorResponse::Unavailable { name },
    };
    Ok(Json(body))
}

#[derive(Debug, Serialize)]
pub struct PosterResponse {
    url: String,
}

/// Unparsable ids get the placeholder, same as ids TMDB does not know.
pub async fn poster(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Json<PosterResponse> {
    let tmdb_id = raw_id.trim().parse::<i64>().unwrap_or(0);
    Json(PosterResponse { url: state.resolver().resolve_poster_url(tmdb_id).await })
}

fn parse_movie_id(raw: &str) -> Result<i64, CatalogError> {
    raw.trim()
        .parse()
        .map_err(|_| CatalogError::InvalidInput(format!("movie id {raw:?} is not a number")))
}

fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>, CatalogError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| CatalogError::InvalidInput(format!("{name} {s:?} is not a valid number"))),
    }
}

#[cfg(test)]
mod tests {
    use std::{net::SocketAddr, sync::atomic::Ordering};

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        catalog::Catalog,
        config::Config,
        details::{
            FirstSearchResult, POSTER_PLACEHOLDER,
            fake::{Canned, FakeTmdb, json},
        },
    };

    const CSV: &str = "\
title,genres,tag,rating,tmdbId
Alpha (1999),Action|Drama,heist,7.0,101
Beta (2001),Comedy,,8.5,102
Gamma (1985),Romantic Comedy,paris,6.0,
";

    fn config() -> Config {
        Config {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            catalog_path: "unused.csv".into(),
            tmdb_api_key: String::new(),
            tmdb_access_token: String::new(),
            tmdb_base_url: "http://localhost".to_string(),
            tmdb_image_base_url: "https://image.tmdb.org/t/p".to_string(),
            tmdb_rps: 4,
            tmdb_timeout_secs: 1,
            max_concurrent: 2,
            page_size: 8,
        }
    }

    fn state_with(fake: FakeTmdb) -> (Arc<AppState>, Arc<FakeTmdb>) {
        let fake = Arc::new(fake);
        let state = AppState {
            config: Arc::new(config()),
            catalog: Arc::new(Catalog::from_reader(CSV.as_bytes()).unwrap()),
            tmdb: fake.clone(),
            locator: Arc::new(FirstSearchResult),
        };
        (Arc::new(state), fake)
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
        let resp = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn movies_are_sorted_and_carded() {
        let (state, fake) = state_with(FakeTmdb::down());
        let (status, body) = get_json(state, "/api/movies").await;

        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> =
            body["movies"].as_array().unwrap().iter().map(|m| m["title"].as_str().unwrap()).collect();
        assert_eq!(titles, ["Beta (2001)", "Alpha (1999)", "Gamma (1985)"]);

        // Gamma has no tmdbId, so only two cards and two poster lookups.
        let cards = body["cards"].as_array().unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0]["poster_url"], POSTER_PLACEHOLDER);
        assert_eq!(cards[0]["detail_path"], "/api/movie/tmdb/102");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn chart_genre_overrides_dropdown() {
        let (state, _) = state_with(FakeTmdb::down());
        let (_, body) = get_json(state, "/api/movies?genre=drama&chart_genre=comedy").await;

        assert_eq!(body["genre_source"], "chart");
        assert_eq!(body["genre"], "comedy");
        assert_eq!(body["movies"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn bad_query_params_are_rejected() {
        let (state, _) = state_with(FakeTmdb::down());
        let (status, body) = get_json(state.clone(), "/api/movies?sort=title").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("sort"));

        let (status, _) = get_json(state.clone(), "/api/movies?page=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(state, "/api/movies?page_size=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_page_is_rejected_before_any_lookup() {
        let (state, fake) = state_with(FakeTmdb::down());
        let (status, body) = get_json(state.clone(), "/api/movies?page_size=1000000").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("page_size"));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);

        let (status, _) = get_json(state, &format!("/api/movies?page_size={MAX_PAGE_SIZE}")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn page_past_end_is_empty() {
        let (state, _) = state_with(FakeTmdb::down());
        let (status, body) = get_json(state, "/api/movies?page=5").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["movies"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_nav_clamps_at_zero() {
        let (state, _) = state_with(FakeTmdb::down());
        let (_, body) = get_json(state.clone(), "/api/movies/page?current=0&nav=prev").await;
        assert_eq!(body["page"], 0);
        let (_, body) = get_json(state, "/api/movies/page?current=2&nav=next").await;
        assert_eq!(body["page"], 3);
    }

    #[tokio::test]
    async fn genre_endpoints() {
        let (state, _) = state_with(FakeTmdb::down());
        let (_, body) = get_json(state.clone(), "/api/genres").await;
        assert_eq!(body, serde_json::json!(["Action", "Comedy", "Drama", "Romantic Comedy"]));

        let (_, body) = get_json(state, "/api/genres/top?n=1").await;
        assert_eq!(body, serde_json::json!([{ "genre": "Action", "count": 1 }]));
    }

    #[tokio::test]
    async fn movie_detail_rejects_non_numeric_id() {
        let (state, fake) = state_with(FakeTmdb::down());
        let (status, _) = get_json(state, "/api/movie/tmdb/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn movie_detail_reports_unavailable() {
        let (state, _) = state_with(FakeTmdb::down());
        let (status, body) = get_json(state, "/api/movie/tmdb/101").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unavailable");
    }

    #[tokio::test]
    async fn movie_detail_found_without_trailer() {
        let mut fake = FakeTmdb::down();
        fake.movie = Canned::Ok(json(r#"{"title": "Alpha", "vote_average": 7.1}"#));
        let (state, _) = state_with(fake);

        let (_, body) = get_json(state, "/api/movie/tmdb/101").await;
        assert_eq!(body["status"], "found");
        assert_eq!(body["movie"]["title"], "Alpha");
        assert_eq!(body["movie"]["trailer_video_id"], Value::Null);
        assert_eq!(body["movie"]["poster_url"], POSTER_PLACEHOLDER);
    }

    #[tokio::test]
    async fn actor_not_found_is_distinct() {
        let mut fake = FakeTmdb::down();
        fake.search = Canned::Ok(json(r#"{"results": []}"#));
        let (state, _) = state_with(fake);

        let (_, body) = get_json(state, "/api/actor/Nonexistent%20Person%20XYZ").await;
        assert_eq!(body["status"], "not_found");
        assert_eq!(body["name"], "Nonexistent Person XYZ");
    }

    #[tokio::test]
    async fn actor_filmography_is_capped() {
        let credits: Vec<Value> = (1..=15)
            .map(|i| serde_json::json!({ "id": i, "title": format!("Film {i}"), "release_date": "2001-05-01" }))
            .collect();
        let mut fake = FakeTmdb::down();
        fake.search = Canned::Ok(json(r#"{"results": [{"id": 7}]}"#));
        fake.person_credits = Canned::Ok(json(&serde_json::json!({ "cast": credits }).to_string()));
        let (state, _) = state_with(fake);

        let (_, body) = get_json(state, "/api/actor/Some%20Actor").await;
        assert_eq!(body["status"], "found");
        let movies = body["actor"]["movies"].as_array().unwrap();
        assert_eq!(movies.len(), FILMOGRAPHY_LIMIT);
        assert_eq!(movies[0]["year"], 2001);
        assert_eq!(movies[0]["detail_path"], "/api/movie/tmdb/1");
        assert_eq!(body["actor"]["bio"], Value::Null);
    }

    #[tokio::test]
    async fn poster_never_empty() {
        let (state, _) = state_with(FakeTmdb::down());
        let (_, body) = get_json(state.clone(), "/api/poster/101").await;
        assert_eq!(body["url"], POSTER_PLACEHOLDER);
        let (_, body) = get_json(state, "/api/poster/not-a-number").await;
        assert_eq!(body["url"], POSTER_PLACEHOLDER);
    }
}
