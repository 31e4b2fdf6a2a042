//! Search index over cached positions: name/tag term search and
//! piece-profile similarity.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use board_core::{Board, PieceProfile};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::source::Metadata;

const NAME_WEIGHT: u32 = 2;
const TAG_WEIGHT: u32 = 1;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("token pattern is valid"));

fn tokens(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// `tags` may be an array of strings or one comma-separated string.
fn tag_list(metadata: &Metadata) -> Vec<String> {
    match metadata.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPosition {
    pub id: String,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub profile: PieceProfile,
    pub history_index: Option<usize>,
    name_terms: BTreeSet<String>,
    tag_terms: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub name: Option<String>,
    pub score: u32,
    pub history_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarPosition {
    pub id: String,
    pub similarity: f64,
    pub history_index: Option<usize>,
}

/// Entries outlive cache eviction so hits can be reloaded by history index.
#[derive(Debug, Default)]
pub struct PositionIndex {
    entries: BTreeMap<String, IndexedPosition>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&IndexedPosition> {
        self.entries.get(id)
    }

    /// Insert or refresh an entry. A known history index is kept when the
    /// update does not carry one.
    pub fn update(
        &mut self,
        id: &str,
        position: &Board,
        metadata: &Metadata,
        history_index: Option<usize>,
    ) {
        let name = metadata
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let tags = tag_list(metadata);
        let name_terms = name.as_deref().map(tokens).unwrap_or_default();
        let tag_terms = tags.iter().flat_map(|t| tokens(t)).collect();
        let history_index =
            history_index.or_else(|| self.entries.get(id).and_then(|e| e.history_index));

        self.entries.insert(
            id.to_string(),
            IndexedPosition {
                id: id.to_string(),
                name,
                tags,
                profile: position.piece_profile(),
                history_index,
                name_terms,
                tag_terms,
            },
        );
    }

    pub fn remove(&mut self, id: &str) -> Option<IndexedPosition> {
        self.entries.remove(id)
    }

    /// Term-overlap search. Each query term found in the name scores 2, in the
    /// tags 1. Only positive scores are returned, best first, ties by id.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let terms = tokens(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .values()
            .filter_map(|entry| {
                let score: u32 = terms
                    .iter()
                    .map(|term| {
                        let mut s = 0;
                        if entry.name_terms.contains(term) {
                            s += NAME_WEIGHT;
                        }
                        if entry.tag_terms.contains(term) {
                            s += TAG_WEIGHT;
                        }
                        s
                    })
                    .sum();
                (score > 0).then(|| SearchHit {
                    id: entry.id.clone(),
                    name: entry.name.clone(),
                    score,
                    history_index: entry.history_index,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits
    }

    /// Indexed positions whose piece-profile similarity to `target` is at
    /// least `threshold`, most similar first.
    pub fn similar(&self, target: &Board, threshold: f64) -> Vec<SimilarPosition> {
        let profile = target.piece_profile();
        let mut found: Vec<SimilarPosition> = self
            .entries
            .values()
            .map(|entry| SimilarPosition {
                id: entry.id.clone(),
                similarity: profile.similarity(&entry.profile),
                history_index: entry.history_index,
            })
            .filter(|s| s.similarity >= threshold)
            .collect();

        found.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.id.cmp(&b.id))
        });
        found
    }
}
