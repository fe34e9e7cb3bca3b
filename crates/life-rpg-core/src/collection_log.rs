//! Collection log: a bucket list of one-off experiences, each closed with a
//! photo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub photo: Option<String>,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub date_completed: Option<DateTime<Utc>>,
}

impl CollectionEntry {
    pub fn new(title: &str, description: &str, raw_tags: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("log_{}", Uuid::new_v4().simple()),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            tags: parse_tags(raw_tags),
            completed: false,
            photo: None,
            date_added: now,
            date_completed: None,
        }
    }
}

/// Comma-separated, trimmed, lowercased, empties dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Close an entry with its photo. False if unknown or already closed.
pub fn complete(
    entries: &mut [CollectionEntry],
    id: &str,
    photo: String,
    now: DateTime<Utc>,
) -> bool {
    match entries.iter_mut().find(|e| e.id == id && !e.completed) {
        Some(entry) => {
            entry.completed = true;
            entry.photo = Some(photo);
            entry.date_completed = Some(now);
            true
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub total: usize,
    pub completed: usize,
    /// Rounded percent.
    pub completion_rate: u8,
}

pub fn stats(entries: &[CollectionEntry]) -> CollectionStats {
    let total = entries.len();
    let completed = entries.iter().filter(|e| e.completed).count();
    let completion_rate = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    };
    CollectionStats { total, completed, completion_rate }
}

/// Distinct tags, sorted.
pub fn all_tags(entries: &[CollectionEntry]) -> Vec<String> {
    let mut tags: Vec<String> = entries.iter().flat_map(|e| e.tags.iter().cloned()).collect();
    tags.sort();
    tags.dedup();
    tags
}
