use std::collections::{BTreeSet, HashMap};

use crate::models::{GenreCount, MovieRecord};

pub const TOP_GENRES: usize = 10;

/// Genre frequencies over every record, most common first. Equal counts keep
/// the order in which the genre was first seen.
pub fn top_genres(records: &[MovieRecord], n: usize) -> Vec<GenreCount> {
    let mut counts: Vec<GenreCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for genre in records.iter().flat_map(|r| r.genres.iter()) {
        match index.get(genre.as_str()) {
            Some(&slot) => counts[slot].count += 1,
            None => {
                index.insert(genre.as_str(), counts.len());
                counts.push(GenreCount { genre: genre.clone(), count: 1 });
            },
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(n);
    counts
}

/// Sorted distinct genres, for building a genre picker.
pub fn genre_options(records: &[MovieRecord]) -> Vec<String> {
    records
        .iter()
        .flat_map(|r| r.genres.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
