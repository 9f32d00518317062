//! Compiles a [`Query`] into a row predicate and applies it to posts.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::database::query::{Query, QueryPatch, SkipPost};
use crate::database::{Posts, TagCatalog};
use crate::error::Result;
use crate::table::Predicate;

/// Regex matching `name` as a whole whitespace-delimited token.
pub fn tag_pattern(name: &str) -> String {
    format!(r"(^|\s)({})($|\s)", wildcard(name))
}

fn wildcard(value: &str) -> String {
    regex::escape(value).replace(r"\*", r"\S*")
}

fn tag_filters(names: &[String]) -> Result<Vec<Predicate>> {
    names
        .iter()
        .map(|name| Predicate::matches("tag_string", &tag_pattern(name)))
        .collect()
}

pub fn not_deleted() -> Predicate {
    Predicate::equals("is_deleted", "t").negate()
}

/// Conjunction of every constraint the query sets; match-all when none.
pub fn compile(query: &Query) -> Result<Predicate> {
    let mut filters = Vec::new();

    if !query.include_tags.is_empty() {
        filters.push(Predicate::all(tag_filters(&query.include_tags)?));
    }
    if !query.exclude_tags.is_empty() {
        filters.push(Predicate::any(tag_filters(&query.exclude_tags)?).negate());
    }
    if let Some(extensions) = query.extension_constraint() {
        let patterns = extensions
            .iter()
            .map(|ext| Predicate::matches("file_ext", &wildcard(ext.as_str())))
            .collect::<Result<Vec<_>>>()?;
        filters.push(Predicate::any(patterns));
    }
    if let Some(ratings) = query.rating_constraint() {
        filters.push(Predicate::any(
            ratings
                .iter()
                .map(|rating| Predicate::equals("rating", rating.code())),
        ));
    }
    if query.min_score > 0 {
        filters.push(Predicate::at_least("score", query.min_score));
    }
    if query.min_favs > 0 {
        filters.push(Predicate::at_least("fav_count", query.min_favs));
    }
    if query.min_short_side > 0 {
        let side = i64::from(query.min_short_side);
        filters.push(Predicate::all([
            Predicate::at_least("image_width", side),
            Predicate::at_least("image_height", side),
        ]));
    }
    if query.min_area > 0 {
        let area = i64::try_from(query.min_area).unwrap_or(i64::MAX);
        filters.push(Predicate::product_at_least("image_width", "image_height", area));
    }
    if let Some(date) = query.min_date {
        filters.push(Predicate::text_at_least(
            "created_at",
            date.format("%Y-%m-%d").to_string(),
        ));
    }
    if !query.skip_posts.is_empty() {
        let mut ids = HashSet::new();
        let mut md5s = HashSet::new();
        for entry in &query.skip_posts {
            match entry {
                SkipPost::Id(id) => ids.insert(id.to_string()),
                SkipPost::Md5(md5) => md5s.insert(md5.clone()),
            };
        }
        if !ids.is_empty() {
            filters.push(Predicate::is_in("id", ids).negate());
        }
        if !md5s.is_empty() {
            filters.push(Predicate::is_in("md5", md5s).negate());
        }
    }

    debug!("Compiled query into {} filters", filters.len());
    Ok(Predicate::all(filters))
}

/// Query selection against a posts adapter, optionally dropping tag names the
/// catalog does not know before the predicate is built.
#[derive(Debug, Clone, Copy)]
pub struct Selector<'a> {
    catalog: &'a TagCatalog,
    include_deleted: bool,
    exclude_unknown_tags: bool,
}

impl<'a> Selector<'a> {
    pub fn new(catalog: &'a TagCatalog) -> Self {
        Selector {
            catalog,
            include_deleted: false,
            exclude_unknown_tags: false,
        }
    }

    pub fn include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    pub fn exclude_unknown_tags(mut self, exclude_unknown_tags: bool) -> Self {
        self.exclude_unknown_tags = exclude_unknown_tags;
        self
    }

    pub fn select(&self, posts: &Posts, query: &Query) -> Result<Posts> {
        if !self.exclude_unknown_tags {
            return posts.select(query, self.include_deleted);
        }
        let known = self.catalog.filter_known(query.tag_names())?;
        let keep_known = |names: &[String]| -> Vec<String> {
            names.iter().filter(|name| known.contains(*name)).cloned().collect()
        };
        let narrowed = query.copy_with(QueryPatch {
            include_tags: Some(keep_known(&query.include_tags)),
            exclude_tags: Some(keep_known(&query.exclude_tags)),
            ..QueryPatch::default()
        });
        let dropped = query.tag_names().count() - narrowed.tag_names().count();
        if dropped > 0 {
            info!("Dropped {} unknown tags from query", dropped);
        }
        posts.select(&narrowed, self.include_deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileExt, Rating, TagCategory};
    use crate::table::testing::{frame_of, tags_frame, PostRow};
    use chrono::NaiveDate;

    fn selected_ids(rows: &[PostRow], query: &Query) -> Vec<i64> {
        let posts = Posts::new(frame_of(rows)).expect("valid posts");
        let selected = posts.select(query, false).expect("selection");
        selected
            .iter()
            .expect("iteration")
            .map(|post| post.expect("decodable post").id)
            .collect()
    }

    fn scenario() -> Vec<PostRow> {
        vec![
            PostRow::new(1, "fox solo"),
            PostRow::new(2, "wolf group"),
            PostRow::new(3, "fox group"),
        ]
    }

    #[test]
    fn test_include_tags_scenario() {
        assert_eq!(selected_ids(&scenario(), &Query::with_tags(["fox"])), vec![1, 3]);
        assert_eq!(selected_ids(&scenario(), &Query::with_tags(["fox", "group"])), vec![3]);
    }

    #[test]
    fn test_exclude_tags_reject_any_match() {
        let query = Query {
            exclude_tags: vec!["solo".into(), "wolf".into()],
            ..Query::default()
        };
        assert_eq!(selected_ids(&scenario(), &query), vec![3]);
    }

    #[test]
    fn test_tag_match_is_token_bounded() {
        let rows = vec![PostRow::new(1, "foxes red_fox"), PostRow::new(2, "fox")];
        assert_eq!(selected_ids(&rows, &Query::with_tags(["fox"])), vec![2]);
        assert_eq!(selected_ids(&rows, &Query::with_tags(["fox*"])), vec![1, 2]);
        assert_eq!(selected_ids(&rows, &Query::with_tags(["*_fox"])), vec![1]);
    }

    #[test]
    fn test_tag_names_are_escaped() {
        let rows = vec![PostRow::new(1, "a.b"), PostRow::new(2, "axb")];
        assert_eq!(selected_ids(&rows, &Query::with_tags(["a.b"])), vec![1]);
    }

    #[test]
    fn test_empty_query_keeps_non_deleted() {
        let rows = vec![
            PostRow {
                score: -5,
                ..PostRow::new(1, "fox")
            },
            PostRow {
                deleted: true,
                ..PostRow::new(2, "fox")
            },
            PostRow::new(3, ""),
        ];
        assert_eq!(selected_ids(&rows, &Query::default()), vec![1, 3]);
        let posts = Posts::new(frame_of(&rows)).expect("valid posts");
        assert_eq!(posts.select(&Query::default(), true).unwrap().len().unwrap(), 3);
    }

    #[test]
    fn test_min_short_side_requires_both_sides() {
        let rows = vec![
            PostRow {
                width: 400,
                height: 600,
                ..PostRow::new(1, "fox")
            },
            PostRow {
                width: 600,
                height: 500,
                ..PostRow::new(2, "fox")
            },
        ];
        let query = Query {
            min_short_side: 500,
            ..Query::default()
        };
        assert_eq!(selected_ids(&rows, &query), vec![2]);
    }

    #[test]
    fn test_numeric_and_date_thresholds() {
        let rows = vec![
            PostRow {
                score: 10,
                fav_count: 3,
                width: 100,
                height: 100,
                ..PostRow::new(1, "fox")
            },
            PostRow {
                score: 50,
                fav_count: 30,
                created_at: "2022-06-01 12:00:00".into(),
                ..PostRow::new(2, "fox")
            },
        ];
        let by_score = Query {
            min_score: 20,
            ..Query::default()
        };
        let by_favs = Query {
            min_favs: 3,
            ..Query::default()
        };
        let by_area = Query {
            min_area: 20_000,
            ..Query::default()
        };
        let by_date = Query {
            min_date: NaiveDate::from_ymd_opt(2021, 1, 1),
            ..Query::default()
        };
        assert_eq!(selected_ids(&rows, &by_score), vec![2]);
        assert_eq!(selected_ids(&rows, &by_favs), vec![1, 2]);
        assert_eq!(selected_ids(&rows, &by_area), vec![2]);
        assert_eq!(selected_ids(&rows, &by_date), vec![2]);
    }

    #[test]
    fn test_extension_and_rating_constraints() {
        let rows = vec![
            PostRow {
                ext: "webm".to_string(),
                rating: "e".to_string(),
                ..PostRow::new(1, "fox")
            },
            PostRow {
                ext: "png".to_string(),
                rating: "q".to_string(),
                ..PostRow::new(2, "fox")
            },
            PostRow {
                ext: "jpg".to_string(),
                rating: "s".to_string(),
                ..PostRow::new(3, "fox")
            },
        ];
        let query = Query {
            extensions: vec![FileExt::Png, FileExt::Webm],
            ..Query::default()
        };
        assert_eq!(selected_ids(&rows, &query), vec![1, 2]);
        let query = Query {
            ratings: vec![Rating::Safe, Rating::Questionable],
            ..Query::default()
        };
        assert_eq!(selected_ids(&rows, &query), vec![2, 3]);
    }

    #[test]
    fn test_skip_posts_by_id_and_md5() {
        let mut rows = scenario();
        rows[2].md5 = "00000000000000000000000000000001".into();
        let query = Query {
            skip_posts: vec![SkipPost::Id(1)],
            ..Query::default()
        };
        assert_eq!(selected_ids(&rows, &query), vec![2, 3]);
        let query = Query {
            skip_posts: vec![SkipPost::Md5(format!("{:032x}", 2))],
            ..Query::default()
        };
        assert_eq!(selected_ids(&rows, &query), vec![1, 3]);
    }

    #[test]
    fn test_mixed_skip_posts_match_their_own_column() {
        let query = Query {
            skip_posts: vec![
                SkipPost::Id(1),
                SkipPost::Md5("2".into()),
                SkipPost::Md5(format!("{:032x}", 3)),
            ],
            ..Query::default()
        };
        assert_eq!(selected_ids(&scenario(), &query), vec![2]);
    }

    #[test]
    fn test_top_n_by_score_then_id() {
        let rows: Vec<PostRow> = [(1, 5), (2, 9), (3, 7), (4, 9)]
            .into_iter()
            .map(|(id, score)| PostRow {
                score,
                ..PostRow::new(id, "fox")
            })
            .collect();
        let query = Query {
            top_n: Some(3),
            ..Query::default()
        };
        assert_eq!(selected_ids(&rows, &query), vec![2, 4, 3]);
    }

    #[test]
    fn test_zero_top_n_keeps_every_row() {
        let rows = scenario();
        let query = Query {
            top_n: Some(0),
            ..Query::default()
        };
        assert_eq!(selected_ids(&rows, &query), vec![1, 2, 3]);
    }

    #[test]
    fn test_selector_drops_unknown_tags_first() -> Result<()> {
        let catalog = TagCatalog::new(tags_frame(&[(1, "fox", TagCategory::Species, 2)]))?;
        let posts = Posts::new(frame_of(&scenario()))?;
        let query = Query {
            include_tags: vec!["fox".into(), "nonexistent".into()],
            exclude_tags: vec!["also_missing".into()],
            ..Query::default()
        };
        let strict = Selector::new(&catalog).select(&posts, &query)?;
        assert!(strict.is_empty()?);
        let lenient = Selector::new(&catalog)
            .exclude_unknown_tags(true)
            .select(&posts, &query)?;
        assert_eq!(lenient.len()?, 2);
        Ok(())
    }
}
