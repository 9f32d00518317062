use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::decode::parse_int;
use crate::table::Row;

/// Semantic class of a tag. The numeric codes are the dump contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    General,
    Artist,
    Rating,
    Copyright,
    Character,
    Species,
    Invalid,
    Meta,
    Lore,
}

impl TagCategory {
    pub const ALL: [TagCategory; 9] = [
        TagCategory::General,
        TagCategory::Artist,
        TagCategory::Rating,
        TagCategory::Copyright,
        TagCategory::Character,
        TagCategory::Species,
        TagCategory::Invalid,
        TagCategory::Meta,
        TagCategory::Lore,
    ];

    pub fn code(self) -> i64 {
        match self {
            TagCategory::General => 0,
            TagCategory::Artist => 1,
            TagCategory::Rating => 2,
            TagCategory::Copyright => 3,
            TagCategory::Character => 4,
            TagCategory::Species => 5,
            TagCategory::Invalid => 6,
            TagCategory::Meta => 7,
            TagCategory::Lore => 8,
        }
    }

    pub fn from_code(code: i64) -> Option<TagCategory> {
        TagCategory::ALL.into_iter().find(|category| category.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            TagCategory::General => "general",
            TagCategory::Artist => "artist",
            TagCategory::Rating => "rating",
            TagCategory::Copyright => "copyright",
            TagCategory::Character => "character",
            TagCategory::Species => "species",
            TagCategory::Invalid => "invalid",
            TagCategory::Meta => "meta",
            TagCategory::Lore => "lore",
        }
    }
}

impl FromStr for TagCategory {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        TagCategory::ALL
            .into_iter()
            .find(|category| category.name() == name)
            .ok_or_else(|| Error::Configuration(format!("unknown category '{name}'")))
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordering used for captions when the caller gives none.
pub const DEFAULT_CATEGORIES_ORDER: [TagCategory; 9] = [
    TagCategory::Character,
    TagCategory::Copyright,
    TagCategory::Lore,
    TagCategory::Species,
    TagCategory::Artist,
    TagCategory::Rating,
    TagCategory::General,
    TagCategory::Invalid,
    TagCategory::Meta,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub category: TagCategory,
    pub name: String,
    pub post_count: i64,
}

impl Tag {
    pub fn from_row(row: &Row<'_>) -> Result<Tag> {
        let raw_category = row.get("category")?;
        let code = parse_int("category", raw_category)?;
        let category = TagCategory::from_code(code)
            .ok_or_else(|| Error::decode("category", raw_category, "expected a code from 0 to 8"))?;
        Ok(Tag {
            id: parse_int("id", row.get("id")?)?,
            category,
            name: row.get("name")?.to_string(),
            post_count: parse_int("post_count", row.get("post_count")?)?,
        })
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
