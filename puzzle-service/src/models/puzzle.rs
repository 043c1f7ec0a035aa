//! Crossword puzzles and the listing parameters that apply to them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::pagination::{Sort, SortKey};
use service_core::validation::{rune_count, FieldValidator};

use super::user::User;
use crate::utils::patch::Patch;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClueData {
    pub row: i32,
    pub col: i32,
    pub clue: String,
    pub answer: String,
}

/// Clues keyed by their grid number, e.g. `"1"`, `"14"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PuzzleData {
    #[serde(default)]
    pub across: BTreeMap<String, ClueData>,
    #[serde(default)]
    pub down: BTreeMap<String, ClueData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: i64,
    pub full_name: String,
    pub display_name: String,
    pub email: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Puzzle {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub content: PuzzleData,
    pub width: i32,
    pub height: i32,
    pub published: bool,
    pub author: Author,
    pub version: i32,
}

impl Puzzle {
    pub fn validate(&self, v: &mut FieldValidator) {
        validate_puzzle(v, &self.title, &self.description, self.width, self.height);
    }
}

/// A puzzle that has not been written yet; the store assigns id, timestamps
/// and version 1.
#[derive(Debug, Clone)]
pub struct NewPuzzle {
    pub title: String,
    pub description: String,
    pub content: PuzzleData,
    pub width: i32,
    pub height: i32,
    pub published: bool,
    pub author: Author,
}

impl NewPuzzle {
    pub fn validate(&self, v: &mut FieldValidator) {
        validate_puzzle(v, &self.title, &self.description, self.width, self.height);
    }
}

pub fn validate_puzzle(v: &mut FieldValidator, title: &str, description: &str, width: i32, height: i32) {
    v.check(!title.is_empty(), "title", "must be provided");
    v.check(
        rune_count(title) <= MAX_TITLE_CHARS,
        "title",
        format!("must not be more than {} characters long", MAX_TITLE_CHARS),
    );
    v.check(!description.is_empty(), "description", "must be provided");
    v.check(
        rune_count(description) <= MAX_DESCRIPTION_CHARS,
        "description",
        format!("must not be more than {} characters long", MAX_DESCRIPTION_CHARS),
    );
    v.check(width > 0, "width", "must be a positive integer");
    v.check(height > 0, "height", "must be a positive integer");
}

/// Fields a PATCH may touch. Anything missing from the body stays as stored.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PuzzlePatch {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub content: Patch<PuzzleData>,
    #[serde(default)]
    pub width: Patch<i32>,
    #[serde(default)]
    pub height: Patch<i32>,
    #[serde(default)]
    pub published: Patch<bool>,
}

impl PuzzlePatch {
    pub fn apply(self, puzzle: &mut Puzzle) {
        self.title.apply_to(&mut puzzle.title);
        self.description.apply_to(&mut puzzle.description);
        self.content.apply_to(&mut puzzle.content);
        self.width.apply_to(&mut puzzle.width);
        self.height.apply_to(&mut puzzle.height);
        self.published.apply_to(&mut puzzle.published);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleSort {
    Id,
    Title,
    CreatedAt,
    UpdatedAt,
}

impl PuzzleSort {
    pub const DEFAULT: Sort<PuzzleSort> = Sort {
        key: PuzzleSort::UpdatedAt,
        descending: true,
    };

    pub fn column(&self) -> &'static str {
        match self {
            PuzzleSort::Id => "id",
            PuzzleSort::Title => "title",
            PuzzleSort::CreatedAt => "created_at",
            PuzzleSort::UpdatedAt => "updated_at",
        }
    }
}

impl SortKey for PuzzleSort {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(PuzzleSort::Id),
            "title" => Some(PuzzleSort::Title),
            "created_at" => Some(PuzzleSort::CreatedAt),
            "updated_at" => Some(PuzzleSort::UpdatedAt),
            _ => None,
        }
    }
}

/// Value of the `published` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishedFilter {
    Published,
    Unpublished,
    All,
}

impl PublishedFilter {
    pub fn parse(raw: Option<&str>, v: &mut FieldValidator) -> Self {
        match raw {
            None | Some("") | Some("true") => PublishedFilter::Published,
            Some("false") => PublishedFilter::Unpublished,
            Some("all") => PublishedFilter::All,
            Some(_) => {
                v.add_error("published", "must be one of true, false or all");
                PublishedFilter::Published
            }
        }
    }

    /// `None` means no constraint on the column.
    pub fn as_condition(&self) -> Option<bool> {
        match self {
            PublishedFilter::Published => Some(true),
            PublishedFilter::Unpublished => Some(false),
            PublishedFilter::All => None,
        }
    }

    pub fn admits(&self, published: bool) -> bool {
        self.as_condition().map_or(true, |want| want == published)
    }
}
