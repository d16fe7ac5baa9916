use std::cmp::Ordering;

use serde::Deserialize;

use crate::{
    catalog::dedup_by_title,
    models::{GenreSource, MovieRecord, SortBy},
};

pub const DEFAULT_PAGE_SIZE: usize = 8;
/// Each card costs one poster lookup, so pages stay small.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogQuery {
    pub genre: Option<String>,
    pub tag: Option<String>,
    pub sort_by: SortBy,
    pub page: usize,
    pub page_size: usize,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self { genre: None, tag: None, sort_by: SortBy::Rating, page: 0, page_size: DEFAULT_PAGE_SIZE }
    }
}

/// Filters, sorts and pages `records`. Never mutates the input, so repeated
/// calls with the same query return the same page.
pub fn query(records: &[MovieRecord], q: &CatalogQuery) -> Vec<MovieRecord> {
    let genre = needle(q.genre.as_deref());
    let tag = needle(q.tag.as_deref());

    let filtered = records.iter().filter(|r| {
        if let Some(genre) = &genre {
            if !contains_ci(&r.joined_genres(), genre) {
                return false;
            }
        }
        if let Some(tag) = &tag {
            let tag_hit = r.tag.as_deref().is_some_and(|t| contains_ci(t, tag));
            if !(tag_hit || contains_ci(&r.joined_genres(), tag) || contains_ci(&r.title, tag)) {
                return false;
            }
        }
        true
    });

    let mut matched = dedup_by_title(filtered.cloned());

    // sort_by is stable; reversed operands give descending order with ties in
    // their original relative order.
    matched.sort_by(|a, b| compare_field(b, a, q.sort_by));

    let start = q.page.saturating_mul(q.page_size);
    matched.into_iter().skip(start).take(q.page_size).collect()
}

fn compare_field(a: &MovieRecord, b: &MovieRecord, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Rating => cmp_missing_lowest(a.rating, b.rating, f64::total_cmp),
        SortBy::Year => cmp_missing_lowest(a.year, b.year, |x, y| x.cmp(y)),
    }
}

fn cmp_missing_lowest<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp(&a, &b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn needle(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_lowercase)
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageNav {
    Next,
    Prev,
}

impl PageNav {
    pub fn apply(self, current: usize) -> usize {
        match self {
            PageNav::Next => current.saturating_add(1),
            PageNav::Prev => current.saturating_sub(1),
        }
    }
}

/// The two inputs that can pick a genre filter. A chart click wins over the
/// dropdown whenever one is present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenreSelection {
    pub dropdown: Option<String>,
    pub chart: Option<String>,
}

impl GenreSelection {
    pub fn resolve(&self) -> Option<(GenreSource, &str)> {
        let chart = self.chart.as_deref().filter(|g| !g.is_empty());
        let dropdown = self.dropdown.as_deref().filter(|g| !g.is_empty());
        match (chart, dropdown) {
            (Some(genre), _) => Some((GenreSource::Chart, genre)),
            (None, Some(genre)) => Some((GenreSource::Dropdown, genre)),
            (None, None) => None,
        }
    }
}
