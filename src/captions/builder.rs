use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::{Posts, TagCatalog};
use crate::error::{Error, Result};
use crate::model::{Post, Rating, TagCategory, DEFAULT_CATEGORIES_ORDER};

/// Which post attribute names its caption (and downloaded file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Naming {
    #[default]
    Id,
    Md5,
}

impl Naming {
    pub fn key(self, post: &Post) -> String {
        match self {
            Naming::Id => post.id.to_string(),
            Naming::Md5 => post.md5.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionOptions {
    pub naming: Naming,
    pub remove_underscores: bool,
    pub remove_parentheses: bool,
    pub separator: String,
    pub ordering: Vec<TagCategory>,
    /// Written first, verbatim, and never repeated in the body.
    pub tags_to_head: Vec<String>,
    /// Written after the body, verbatim, and never repeated in it.
    pub tags_to_tail: Vec<String>,
    /// Ratings whose name is appended as the last tag.
    pub add_rating_tags: Vec<Rating>,
    pub exclude_tags: Vec<String>,
}

impl Default for CaptionOptions {
    fn default() -> Self {
        CaptionOptions {
            naming: Naming::Id,
            remove_underscores: false,
            remove_parentheses: false,
            separator: ", ".to_string(),
            ordering: DEFAULT_CATEGORIES_ORDER.to_vec(),
            tags_to_head: Vec::new(),
            tags_to_tail: Vec::new(),
            add_rating_tags: Vec::new(),
            exclude_tags: Vec::new(),
        }
    }
}

impl CaptionOptions {
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(Error::Configuration(
                "tags separator can not be an empty string".to_string(),
            ));
        }
        Ok(())
    }
}

/// Underscores become spaces first, then parentheses are stripped.
pub fn format_tags(
    tags: Vec<String>,
    remove_underscores: bool,
    remove_parentheses: bool,
) -> Vec<String> {
    tags.into_iter()
        .map(|mut tag| {
            if remove_underscores {
                tag = tag.replace('_', " ");
            }
            if remove_parentheses {
                tag = tag.replace(['(', ')'], "");
            }
            tag
        })
        .collect()
}

fn caption_for(
    post: &Post,
    catalog: &TagCatalog,
    options: &CaptionOptions,
    reserved: &HashSet<&str>,
) -> Result<String> {
    let candidates = post.tags().into_iter().filter(|tag| !reserved.contains(tag));
    let ordered = catalog.reorder(candidates, &options.ordering)?;
    let mut body = format_tags(ordered, options.remove_underscores, options.remove_parentheses);
    body.splice(0..0, options.tags_to_head.iter().cloned());
    body.extend(options.tags_to_tail.iter().cloned());
    if options.add_rating_tags.contains(&post.rating) {
        body.push(post.rating.name().to_string());
    }
    Ok(body.join(&options.separator))
}

/// Caption of every post, keyed per `options.naming`. Any failure aborts the
/// whole batch.
pub fn build_captions(
    posts: &Posts,
    catalog: &TagCatalog,
    options: &CaptionOptions,
) -> Result<BTreeMap<String, String>> {
    options.validate()?;
    let reserved: HashSet<&str> = options
        .tags_to_head
        .iter()
        .chain(&options.tags_to_tail)
        .chain(&options.exclude_tags)
        .map(String::as_str)
        .collect();

    let mut captions = BTreeMap::new();
    for post in posts.iter()? {
        let post = post?;
        let caption = caption_for(&post, catalog, options, &reserved)?;
        captions.insert(options.naming.key(&post), caption);
    }
    info!("Built {} captions", captions.len());
    Ok(captions)
}
