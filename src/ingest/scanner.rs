use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::database::{Dataset, Posts, TagCatalog};
use crate::error::{Error, Result};
use crate::ingest::reader::{open_posts, open_tags, DumpFormat};

const DUMP_NAME_PATTERN: &str = r"^(posts|tags)-(\d{4}-\d{2}-\d{2})\.([A-Za-z0-9]+)$";

/// Dump files of one export date, by format.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DumpGroup {
    pub posts: BTreeMap<DumpFormat, PathBuf>,
    pub tags: BTreeMap<DumpFormat, PathBuf>,
}

/// Finds `posts-YYYY-MM-DD.<ext>` and `tags-YYYY-MM-DD.<ext>` files directly
/// inside `root`, grouped by date. Unrecognised extensions are ignored.
pub fn find_dump_files(
    root: &Path,
    specific_date: Option<NaiveDate>,
) -> Result<BTreeMap<NaiveDate, DumpGroup>> {
    let pattern = Regex::new(DUMP_NAME_PATTERN)?;
    let mut groups: BTreeMap<NaiveDate, DumpGroup> = BTreeMap::new();

    let walker = WalkDir::new(root).min_depth(1).max_depth(1).into_iter();
    for entry in walker.filter_entry(|e| e.depth() == 0 || !is_hidden(e)) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let Some(captures) = pattern.captures(name) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(&captures[2], "%Y-%m-%d") else {
            debug!("Skip {}, not a valid date", name);
            continue;
        };
        if specific_date.is_some_and(|wanted| wanted != date) {
            continue;
        }
        let Some(format) = DumpFormat::from_extension(&captures[3]) else {
            debug!("Skip {}, unknown extension", name);
            continue;
        };
        let group = groups.entry(date).or_default();
        let files = if &captures[1] == "posts" {
            &mut group.posts
        } else {
            &mut group.tags
        };
        files.insert(format, entry.path().to_path_buf());
    }
    Ok(groups)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// First file of the group that opens, in format order.
fn try_open<T>(
    files: &BTreeMap<DumpFormat, PathBuf>,
    open: impl Fn(&Path) -> Result<T>,
) -> Option<T> {
    for path in files.values() {
        match open(path) {
            Ok(opened) => return Some(opened),
            Err(e) => warn!("Can not load {}: {}", path.display(), e),
        }
    }
    None
}

/// Builds a dataset from the newest dumps in `root`.
///
/// With `strict`, only a date providing both posts and tags files is used.
/// Otherwise tags and posts may come from different dates, newest first.
pub fn autoinit_from_directory(
    root: &Path,
    specific_date: Option<NaiveDate>,
    strict: bool,
    lazy: bool,
) -> Result<Dataset> {
    let groups = find_dump_files(root, specific_date)?;
    let mut tags: Option<TagCatalog> = None;
    let mut posts: Option<Posts> = None;

    for (date, group) in groups.iter().rev() {
        if strict && (group.tags.is_empty() || group.posts.is_empty()) {
            let missed: Vec<&str> = [("tags", &group.tags), ("posts", &group.posts)]
                .into_iter()
                .filter(|(_, files)| files.is_empty())
                .map(|(kind, _)| kind)
                .collect();
            info!("Skip date {}, can not find any {} file", date, missed.join(" and "));
            continue;
        }
        if tags.is_none() {
            tags = try_open(&group.tags, |path| open_tags(path, lazy));
        }
        if posts.is_none() {
            posts = try_open(&group.posts, |path| open_posts(path, lazy));
        }
        if let (Some(tags), Some(posts)) = (&tags, &posts) {
            info!("Using dumps of {}", date);
            return Ok(Dataset::new(posts.clone(), tags.clone()));
        }
    }
    Err(Error::DumpNotFound(root.to_path_buf()))
}
