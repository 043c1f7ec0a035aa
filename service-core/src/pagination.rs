//! Offset pagination: request parsing and count-derived metadata.

use std::collections::HashMap;

use serde::Serialize;

use crate::validation::FieldValidator;

pub const MAX_PAGE: u32 = 10_000_000;

/// Column a listing may be ordered by, paired with a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub descending: bool,
}

/// A key type that can appear in a `sort` query parameter.
pub trait SortKey: Copy + Sized {
    /// Parse the bare column name (without the `-` prefix).
    fn parse(name: &str) -> Option<Self>;
}

impl<K: SortKey> Sort<K> {
    /// `-name` sorts descending, `name` ascending.
    pub fn parse(value: &str) -> Option<Self> {
        let (name, descending) = match value.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (value, false),
        };
        K::parse(name).map(|key| Sort { key, descending })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageBounds {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for PageBounds {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<K> {
    pub page: u32,
    pub page_size: u32,
    pub sort: Sort<K>,
}

impl<K: SortKey> PageRequest<K> {
    /// Read `page`, `page_size` and `sort` from query parameters.
    ///
    /// Every parameter is checked independently; failures are recorded in `v`
    /// and the returned request holds defaults for the offending fields.
    pub fn parse(
        params: &HashMap<String, String>,
        bounds: PageBounds,
        default_sort: Sort<K>,
        v: &mut FieldValidator,
    ) -> Self {
        let page = read_int(params, "page", 1, v);
        let page_size = read_int(params, "page_size", i64::from(bounds.default_page_size), v);

        v.check(page > 0, "page", "must be greater than zero");
        v.check(
            page <= i64::from(MAX_PAGE),
            "page",
            format!("must be a maximum of {}", MAX_PAGE),
        );
        v.check(page_size > 0, "page_size", "must be greater than zero");
        v.check(
            page_size <= i64::from(bounds.max_page_size),
            "page_size",
            format!("must be a maximum of {}", bounds.max_page_size),
        );

        let sort = match params.get("sort").map(String::as_str) {
            None | Some("") => default_sort,
            Some(raw) => Sort::parse(raw).unwrap_or_else(|| {
                v.add_error("sort", "invalid sort value");
                default_sort
            }),
        };

        Self {
            page: u32::try_from(page).unwrap_or(1).max(1),
            page_size: u32::try_from(page_size)
                .unwrap_or(bounds.default_page_size)
                .max(1),
            sort,
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }
}

fn read_int(params: &HashMap<String, String>, key: &str, default: i64, v: &mut FieldValidator) -> i64 {
    match params.get(key).map(String::as_str) {
        None | Some("") => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u64,
    pub total_records: u64,
}

impl Metadata {
    pub fn calculate(total_records: u64, page: u32, page_size: u32) -> Self {
        let total_pages = if total_records == 0 {
            0
        } else {
            total_records.div_ceil(u64::from(page_size.max(1)))
        };
        Self {
            current_page: page,
            page_size,
            total_pages,
            total_records,
        }
    }
}

/// One window of a listing plus the metadata describing the whole result set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub metadata: Metadata,
}
