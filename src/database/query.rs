use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{FileExt, Rating};

/// Post excluded unconditionally, by id or by md5.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkipPost {
    Id(i64),
    Md5(String),
}

/// Declarative post filter. Tag names are not checked against any catalog
/// here; `*` in a tag name matches any run of non-space characters.
///
/// Numeric thresholds of zero mean no constraint, as do empty extension and
/// rating lists. A `top_n` of zero keeps every matching post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub extensions: Vec<FileExt>,
    pub ratings: Vec<Rating>,
    pub min_score: i64,
    pub min_favs: i64,
    pub min_date: Option<NaiveDate>,
    pub min_short_side: u32,
    pub min_area: u64,
    pub top_n: Option<usize>,
    pub skip_posts: Vec<SkipPost>,
}

impl Default for Query {
    fn default() -> Self {
        Query {
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            extensions: FileExt::ALL.to_vec(),
            ratings: Rating::ALL.to_vec(),
            min_score: 0,
            min_favs: 0,
            min_date: None,
            min_short_side: 0,
            min_area: 0,
            top_n: None,
            skip_posts: Vec::new(),
        }
    }
}

/// Fields to override in [`Query::copy_with`]; `None` keeps the original.
#[derive(Debug, Clone, Default)]
pub struct QueryPatch {
    pub include_tags: Option<Vec<String>>,
    pub exclude_tags: Option<Vec<String>>,
    pub extensions: Option<Vec<FileExt>>,
    pub ratings: Option<Vec<Rating>>,
    pub min_score: Option<i64>,
    pub min_favs: Option<i64>,
    pub min_date: Option<Option<NaiveDate>>,
    pub min_short_side: Option<u32>,
    pub min_area: Option<u64>,
    pub top_n: Option<Option<usize>>,
    pub skip_posts: Option<Vec<SkipPost>>,
}

impl Query {
    pub fn with_tags<I, S>(include_tags: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query {
            include_tags: include_tags.into_iter().map(Into::into).collect(),
            ..Query::default()
        }
    }

    /// A new query; fields left `None` in `patch` are taken from `self` as is.
    pub fn copy_with(&self, patch: QueryPatch) -> Query {
        Query {
            include_tags: patch.include_tags.unwrap_or_else(|| self.include_tags.clone()),
            exclude_tags: patch.exclude_tags.unwrap_or_else(|| self.exclude_tags.clone()),
            extensions: patch.extensions.unwrap_or_else(|| self.extensions.clone()),
            ratings: patch.ratings.unwrap_or_else(|| self.ratings.clone()),
            min_score: patch.min_score.unwrap_or(self.min_score),
            min_favs: patch.min_favs.unwrap_or(self.min_favs),
            min_date: patch.min_date.unwrap_or(self.min_date),
            min_short_side: patch.min_short_side.unwrap_or(self.min_short_side),
            min_area: patch.min_area.unwrap_or(self.min_area),
            top_n: patch.top_n.unwrap_or(self.top_n),
            skip_posts: patch.skip_posts.unwrap_or_else(|| self.skip_posts.clone()),
        }
    }

    /// Requested extensions, or `None` when every extension is accepted.
    pub fn extension_constraint(&self) -> Option<&[FileExt]> {
        let any = self.extensions.is_empty()
            || FileExt::ALL.iter().all(|ext| self.extensions.contains(ext));
        (!any).then_some(self.extensions.as_slice())
    }

    /// Requested ratings, or `None` when every rating is accepted.
    pub fn rating_constraint(&self) -> Option<&[Rating]> {
        let any = self.ratings.is_empty()
            || Rating::ALL.iter().all(|rating| self.ratings.contains(rating));
        (!any).then_some(self.ratings.as_slice())
    }

    /// Include and exclude names together, in that order.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.include_tags
            .iter()
            .chain(&self.exclude_tags)
            .map(String::as_str)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "include={:?} exclude={:?}", self.include_tags, self.exclude_tags)?;
        if let Some(extensions) = self.extension_constraint() {
            write!(f, " extensions={extensions:?}")?;
        }
        if let Some(ratings) = self.rating_constraint() {
            write!(f, " ratings={ratings:?}")?;
        }
        if self.min_score > 0 {
            write!(f, " min_score={}", self.min_score)?;
        }
        if self.min_favs > 0 {
            write!(f, " min_favs={}", self.min_favs)?;
        }
        if let Some(date) = self.min_date {
            write!(f, " min_date={date}")?;
        }
        if self.min_short_side > 0 {
            write!(f, " min_short_side={}", self.min_short_side)?;
        }
        if self.min_area > 0 {
            write!(f, " min_area={}", self.min_area)?;
        }
        if let Some(top_n) = self.top_n {
            write!(f, " top_n={top_n}")?;
        }
        if !self.skip_posts.is_empty() {
            write!(f, " skip_posts={}", self.skip_posts.len())?;
        }
        Ok(())
    }
}
