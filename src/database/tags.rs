use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::database::schema::{check_columns, TAG_COLUMNS};
use crate::error::{Error, Result};
use crate::model::decode::parse_int;
use crate::model::{Tag, TagCategory};
use crate::table::{Frame, Predicate, Source};

/// Lookup key for [`TagCatalog::contains`].
#[derive(Debug, Clone, Copy)]
pub enum TagKey<'a> {
    Id(i64),
    Name(&'a str),
}

impl<'a> From<&'a Tag> for TagKey<'a> {
    fn from(tag: &'a Tag) -> Self {
        TagKey::Id(tag.id)
    }
}

impl<'a> From<&'a str> for TagKey<'a> {
    fn from(name: &'a str) -> Self {
        TagKey::Name(name)
    }
}

/// Queryable set of tags backed by a tags dump.
#[derive(Clone)]
pub struct TagCatalog {
    source: Source,
    categories: Arc<OnceLock<HashMap<String, TagCategory>>>,
}

impl TagCatalog {
    pub fn new(source: impl Into<Source>) -> Result<TagCatalog> {
        let source = source.into();
        check_columns("Tags", source.column_names(), &TAG_COLUMNS)?;
        Ok(TagCatalog {
            source,
            categories: Arc::new(OnceLock::new()),
        })
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn is_lazy(&self) -> bool {
        self.source.is_lazy()
    }

    /// The subset of `names` present in the catalog.
    pub fn filter_known<I, S>(&self, names: I) -> Result<HashSet<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: HashSet<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        if wanted.is_empty() {
            return Ok(HashSet::new());
        }
        self.source.collect()?.intersect("name", &wanted)
    }

    /// Tags whose category is one of `categories` (all when `None`) and whose
    /// name is in `include` (all when empty).
    pub fn select<I, S>(&self, include: I, categories: Option<&[TagCategory]>) -> Result<TagCatalog>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: HashSet<String> = include.into_iter().map(|n| n.as_ref().to_string()).collect();
        let mut filters = Vec::new();
        if let Some(categories) = categories {
            let every = TagCategory::ALL.iter().all(|c| categories.contains(c));
            if !every {
                filters.push(Predicate::is_in(
                    "category",
                    categories.iter().map(|c| c.code().to_string()),
                ));
            }
        }
        if !names.is_empty() {
            filters.push(Predicate::is_in("name", names));
        }
        TagCatalog::new(self.source.filter(Predicate::all(filters))?)
    }

    /// Catalog restricted to the names in `update`, with their counts taken
    /// from it. Tags missing from `update` are dropped.
    pub fn with_stats(&self, update: &BTreeMap<String, u64>) -> Result<TagCatalog> {
        let frame = self.source.collect()?;
        let mut rows = Vec::new();
        for row in frame.rows() {
            let name = row.get("name")?;
            if let Some(count) = update.get(name) {
                rows.push(vec![
                    row.get("id")?.to_string(),
                    name.to_string(),
                    row.get("category")?.to_string(),
                    count.to_string(),
                ]);
            }
        }
        debug!("Joined {} of {} tags against stats", rows.len(), frame.len());
        let columns = TAG_COLUMNS.iter().map(|c| c.to_string()).collect();
        TagCatalog::new(self.source.like(Frame::from_rows(columns, rows)?))
    }

    pub fn contains<'a>(&self, key: impl Into<TagKey<'a>>) -> Result<bool> {
        let frame = self.source.collect()?;
        match key.into() {
            TagKey::Id(id) => frame.any_equals("id", &id.to_string()),
            TagKey::Name(name) => frame.any_equals("name", name),
        }
    }

    /// Orders `tags` group by group following `ordering`, each group sorted
    /// by name. Tags without a category in `ordering`, including those absent
    /// from the catalog, follow in their input order. Duplicates are dropped.
    pub fn reorder<I, S>(&self, tags: I, ordering: &[TagCategory]) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut remaining: Vec<String> = tags
            .into_iter()
            .map(|tag| tag.as_ref().to_string())
            .filter(|tag| seen.insert(tag.clone()))
            .collect();
        let categories = self.categories()?;
        let mut ordered = Vec::with_capacity(remaining.len());
        for category in ordering {
            let (mut group, rest): (Vec<String>, Vec<String>) = remaining
                .into_iter()
                .partition(|tag| categories.get(tag) == Some(category));
            group.sort();
            ordered.extend(group);
            remaining = rest;
        }
        ordered.extend(remaining);
        Ok(ordered)
    }

    pub fn category_of(&self, name: &str) -> Result<Option<TagCategory>> {
        Ok(self.categories()?.get(name).copied())
    }

    pub fn len(&self) -> Result<usize> {
        self.source.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.source.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Tag> {
        let frame = self.source.collect()?;
        let row = frame.row(index).ok_or(Error::IndexOutOfRange {
            index,
            len: frame.len(),
        })?;
        Tag::from_row(&row)
    }

    pub fn slice(&self, range: Range<usize>) -> Result<TagCatalog> {
        let len = range.end.saturating_sub(range.start);
        TagCatalog::new(self.source.slice(range.start, len)?)
    }

    pub fn reversed(&self) -> Result<TagCatalog> {
        TagCatalog::new(self.source.reverse()?)
    }

    pub fn tags(&self) -> Result<Vec<Tag>> {
        let frame = self.source.collect()?;
        frame.rows().map(|row| Tag::from_row(&row)).collect()
    }

    /// Name to category index, built on first use and shared by clones.
    fn categories(&self) -> Result<&HashMap<String, TagCategory>> {
        if let Some(index) = self.categories.get() {
            return Ok(index);
        }
        let frame = self.source.collect()?;
        let mut index = HashMap::with_capacity(frame.len());
        for row in frame.rows() {
            let raw = row.get("category")?;
            let category = TagCategory::from_code(parse_int("category", raw)?)
                .ok_or_else(|| Error::decode("category", raw, "expected a code from 0 to 8"))?;
            index.insert(row.get("name")?.to_string(), category);
        }
        Ok(self.categories.get_or_init(|| index))
    }
}

impl std::fmt::Debug for TagCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagCatalog").field("source", &self.source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_CATEGORIES_ORDER;
    use crate::table::testing::tags_frame;

    fn catalog() -> TagCatalog {
        TagCatalog::new(tags_frame(&[
            (1, "fox", TagCategory::Character, 10),
            (2, "solo", TagCategory::General, 20),
            (3, "canine", TagCategory::Species, 30),
            (4, "absurd_res", TagCategory::Meta, 40),
            (5, "duo", TagCategory::General, 50),
        ]))
        .expect("valid catalog")
    }

    fn names(catalog: &TagCatalog) -> Vec<String> {
        catalog.tags().unwrap().into_iter().map(|t| t.name).collect()
    }

    #[test]
    fn test_reorder_scenario() -> Result<()> {
        let catalog = TagCatalog::new(tags_frame(&[
            (1, "fox", TagCategory::Character, 1),
            (2, "solo", TagCategory::General, 1),
        ]))?;
        let ordered = catalog.reorder(["solo", "fox", "unknown_tag"], &DEFAULT_CATEGORIES_ORDER)?;
        assert_eq!(ordered, vec!["fox", "solo", "unknown_tag"]);
        Ok(())
    }

    #[test]
    fn test_reorder_is_a_permutation() -> Result<()> {
        let input = ["zeta", "solo", "duo", "fox", "solo", "alpha", "absurd_res", "canine"];
        let ordered = catalog().reorder(input, &DEFAULT_CATEGORIES_ORDER)?;
        assert_eq!(
            ordered,
            vec!["fox", "canine", "duo", "solo", "absurd_res", "zeta", "alpha"]
        );
        let mut sorted_output = ordered.clone();
        sorted_output.sort();
        let mut sorted_input: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        sorted_input.sort();
        sorted_input.dedup();
        assert_eq!(sorted_output, sorted_input);
        Ok(())
    }

    #[test]
    fn test_reorder_is_idempotent() -> Result<()> {
        let catalog = catalog();
        let ordering = [TagCategory::General, TagCategory::Species];
        let once = catalog.reorder(["fox", "solo", "canine", "mystery", "duo"], &ordering)?;
        assert_eq!(once, vec!["duo", "solo", "canine", "fox", "mystery"]);
        assert_eq!(catalog.reorder(&once, &ordering)?, once);
        Ok(())
    }

    #[test]
    fn test_filter_known() -> Result<()> {
        let known = catalog().filter_known(["fox", "nope", "duo"])?;
        assert_eq!(known, HashSet::from(["fox".to_string(), "duo".to_string()]));
        assert!(catalog().filter_known(Vec::<String>::new())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_select_by_name_and_category() -> Result<()> {
        let catalog = catalog();
        assert_eq!(catalog.select(Vec::<&str>::new(), None)?.len()?, 5);
        let general = catalog.select(Vec::<&str>::new(), Some(&[TagCategory::General][..]))?;
        assert_eq!(names(&general), vec!["solo", "duo"]);
        let named = catalog.select(["fox", "duo", "missing"], None)?;
        assert_eq!(names(&named), vec!["fox", "duo"]);
        let both = catalog.select(["fox", "duo"], Some(&[TagCategory::General][..]))?;
        assert_eq!(names(&both), vec!["duo"]);
        Ok(())
    }

    #[test]
    fn test_with_stats_is_an_inner_join() -> Result<()> {
        let update = BTreeMap::from([
            ("duo".to_string(), 7),
            ("fox".to_string(), 3),
            ("new".to_string(), 1),
        ]);
        let updated = catalog().with_stats(&update)?;
        let tags = updated.tags()?;
        assert_eq!(tags.len(), 2);
        assert_eq!((tags[0].name.as_str(), tags[0].post_count), ("fox", 3));
        assert_eq!((tags[1].name.as_str(), tags[1].post_count), ("duo", 7));
        assert_eq!(tags[1].category, TagCategory::General);
        Ok(())
    }

    #[test]
    fn test_contains_by_id_or_name() -> Result<()> {
        let catalog = catalog();
        let fox = catalog.get(0)?;
        assert!(catalog.contains(&fox)?);
        assert!(catalog.contains("canine")?);
        assert!(!catalog.contains("wolf")?);
        let stranger = Tag {
            id: 99,
            ..fox
        };
        assert!(!catalog.contains(&stranger)?);
        Ok(())
    }

    #[test]
    fn test_lazy_catalog_slices() -> Result<()> {
        let lazy = TagCatalog::new(catalog().source().lazy())?;
        let tail = lazy.slice(3..10)?;
        assert!(tail.is_lazy());
        assert_eq!(names(&tail), vec!["absurd_res", "duo"]);
        assert_eq!(names(&lazy.reversed()?)[0], "duo");
        assert_eq!(lazy.category_of("canine")?, Some(TagCategory::Species));
        Ok(())
    }
}
