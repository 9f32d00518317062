use std::collections::{BTreeSet, HashSet};

use tracing::info;

use crate::database::query::Query;
use crate::database::selector::Selector;
use crate::database::{Posts, TagCatalog};
use crate::error::{Error, Result};
use crate::model::TagCategory;

/// Posts and tags of one dump, selected together.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub posts: Posts,
    pub tags: TagCatalog,
}

impl Dataset {
    pub fn new(posts: Posts, tags: TagCatalog) -> Self {
        Dataset { posts, tags }
    }

    /// Strict selection: every tag the query names must be in the catalog.
    /// The returned catalog only holds tags of the selected posts, counted
    /// over those posts.
    pub fn select(&self, query: &Query) -> Result<Dataset> {
        let requested: BTreeSet<&str> = query.tag_names().collect();
        let known = self.tags.filter_known(&requested)?;
        let unknown: Vec<String> = requested
            .into_iter()
            .filter(|name| !known.contains(*name))
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(Error::UnknownTags(unknown));
        }
        let posts = self.select_posts(query, false, false)?;
        let stats = posts.tag_stats()?;
        let tags = self.select_tags(stats.keys(), None)?.with_stats(&stats)?;
        info!("Selected {} posts with {} distinct tags", posts.len()?, stats.len());
        Ok(Dataset { posts, tags })
    }

    pub fn select_posts(
        &self,
        query: &Query,
        include_deleted: bool,
        exclude_unknown_tags: bool,
    ) -> Result<Posts> {
        Selector::new(&self.tags)
            .include_deleted(include_deleted)
            .exclude_unknown_tags(exclude_unknown_tags)
            .select(&self.posts, query)
    }

    pub fn select_tags<I, S>(
        &self,
        include: I,
        categories: Option<&[TagCategory]>,
    ) -> Result<TagCatalog>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags.select(include, categories)
    }

    pub fn filter_known_tags<I, S>(&self, names: I) -> Result<HashSet<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags.filter_known(names)
    }

    pub fn reorder_tags<I, S>(&self, tags: I, ordering: &[TagCategory]) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags.reorder(tags, ordering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::testing::{frame_of, tags_frame, PostRow};

    fn dataset() -> Dataset {
        let posts = Posts::new(frame_of(&[
            PostRow::new(1, "fox solo"),
            PostRow::new(2, "wolf group"),
            PostRow::new(3, "fox group"),
        ]))
        .expect("valid posts");
        let tags = TagCatalog::new(tags_frame(&[
            (1, "fox", TagCategory::Species, 100),
            (2, "wolf", TagCategory::Species, 100),
            (3, "solo", TagCategory::General, 100),
            (4, "group", TagCategory::General, 100),
            (5, "unused", TagCategory::Meta, 100),
        ]))
        .expect("valid tags");
        Dataset::new(posts, tags)
    }

    #[test]
    fn test_select_rejects_unknown_tags() {
        let query = Query {
            include_tags: vec!["fox".into(), "dragon".into()],
            exclude_tags: vec!["bird".into()],
            ..Query::default()
        };
        match dataset().select(&query) {
            Err(Error::UnknownTags(names)) => assert_eq!(names, vec!["bird", "dragon"]),
            other => panic!("expected unknown tags error, got {other:?}"),
        }
    }

    #[test]
    fn test_select_narrows_catalog_to_selected_posts() -> Result<()> {
        let selected = dataset().select(&Query::with_tags(["fox"]))?;
        assert_eq!(selected.posts.len()?, 2);
        let tags = selected.tags.tags()?;
        let counts: Vec<(&str, i64)> =
            tags.iter().map(|t| (t.name.as_str(), t.post_count)).collect();
        assert_eq!(counts, vec![("fox", 2), ("solo", 1), ("group", 1)]);
        Ok(())
    }

    #[test]
    fn test_select_posts_can_drop_unknown_tags() -> Result<()> {
        let query = Query::with_tags(["fox", "dragon"]);
        assert_eq!(dataset().select_posts(&query, false, false)?.len()?, 0);
        assert_eq!(dataset().select_posts(&query, false, true)?.len()?, 2);
        Ok(())
    }

    #[test]
    fn test_filter_known_and_reorder_use_the_catalog() -> Result<()> {
        let dataset = dataset();
        let known = dataset.filter_known_tags(["fox", "dragon", "group"])?;
        assert_eq!(known, HashSet::from(["fox".to_string(), "group".to_string()]));
        let ordering = [TagCategory::Species, TagCategory::General];
        let ordered = dataset.reorder_tags(["group", "dragon", "fox"], &ordering)?;
        assert_eq!(ordered, vec!["fox", "group", "dragon"]);
        Ok(())
    }
}
