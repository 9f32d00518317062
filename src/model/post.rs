use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::decode::{
    parse_bool, parse_datetime, parse_duration, parse_int, parse_opt_int, parse_required_datetime,
    parse_unsigned, parse_words,
};
use crate::table::Row;

pub const STATIC_URL: &str = "https://static1.e621.net/data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Explicit,
    Questionable,
    Safe,
}

impl Rating {
    pub const ALL: [Rating; 3] = [Rating::Explicit, Rating::Questionable, Rating::Safe];

    /// Single-letter code stored in the `rating` column.
    pub fn code(self) -> &'static str {
        match self {
            Rating::Explicit => "e",
            Rating::Questionable => "q",
            Rating::Safe => "s",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Rating::Explicit => "explicit",
            Rating::Questionable => "questionable",
            Rating::Safe => "safe",
        }
    }

    pub fn from_code(code: &str) -> Option<Rating> {
        Rating::ALL.into_iter().find(|rating| rating.code() == code)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileExt {
    Png,
    Jpg,
    Gif,
    Webm,
    Swf,
}

impl FileExt {
    pub const ALL: [FileExt; 5] = [
        FileExt::Png,
        FileExt::Jpg,
        FileExt::Gif,
        FileExt::Webm,
        FileExt::Swf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FileExt::Png => "png",
            FileExt::Jpg => "jpg",
            FileExt::Gif => "gif",
            FileExt::Webm => "webm",
            FileExt::Swf => "swf",
        }
    }
}

impl FromStr for FileExt {
    type Err = Error;

    /// Accepts both bare extensions and dotted names, using the last segment.
    fn from_str(raw: &str) -> Result<Self> {
        let ext = raw.rsplit('.').next().unwrap_or(raw);
        FileExt::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == ext)
            .ok_or_else(|| Error::decode("file_ext", raw, "unknown file extension"))
    }
}

impl fmt::Display for FileExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalogued media item, decoded from a posts dump row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: i64,
    pub uploader_id: i64,
    pub created_at: NaiveDateTime,
    pub md5: String,
    pub source: Vec<String>,
    pub rating: Rating,
    pub image_width: u32,
    pub image_height: u32,
    pub tag_string: String,
    pub locked_tags: String,
    pub fav_count: i64,
    pub raw_file_ext: String,
    pub parent_id: Option<i64>,
    pub change_seq: i64,
    pub approver_id: Option<i64>,
    pub file_size: u64,
    pub comment_count: i64,
    pub description: String,
    pub duration: Option<Duration>,
    pub updated_at: Option<NaiveDateTime>,
    pub is_deleted: bool,
    pub is_pending: bool,
    pub is_flagged: bool,
    pub score: i64,
    pub up_score: i64,
    pub down_score: i64,
    pub is_rating_locked: bool,
    pub is_status_locked: bool,
    pub is_note_locked: bool,
}

impl Post {
    pub fn from_row(row: &Row<'_>) -> Result<Post> {
        let int = |column: &str| -> Result<i64> { parse_int(column, row.get(column)?) };
        let opt_int =
            |column: &str| -> Result<Option<i64>> { parse_opt_int(column, row.get(column)?) };
        let flag = |column: &str| -> Result<bool> { Ok(parse_bool(row.get(column)?)) };
        let dimension = |column: &str| -> Result<u32> {
            let value = row.get(column)?;
            let parsed = parse_unsigned(column, value)?;
            u32::try_from(parsed).map_err(|e| Error::decode(column, value, e))
        };

        let raw_rating = row.get("rating")?;
        let rating = Rating::from_code(raw_rating)
            .ok_or_else(|| Error::decode("rating", raw_rating, "expected one of e, q, s"))?;

        Ok(Post {
            id: int("id")?,
            uploader_id: int("uploader_id")?,
            created_at: parse_required_datetime("created_at", row.get("created_at")?)?,
            md5: row.get("md5")?.to_string(),
            source: parse_words(row.get("source")?),
            rating,
            image_width: dimension("image_width")?,
            image_height: dimension("image_height")?,
            tag_string: row.get("tag_string")?.to_string(),
            locked_tags: row.get("locked_tags")?.to_string(),
            fav_count: int("fav_count")?,
            raw_file_ext: row.get("file_ext")?.to_string(),
            parent_id: opt_int("parent_id")?,
            change_seq: int("change_seq")?,
            approver_id: opt_int("approver_id")?,
            file_size: parse_unsigned("file_size", row.get("file_size")?)?,
            comment_count: int("comment_count")?,
            description: row.get("description")?.to_string(),
            duration: parse_duration("duration", row.get("duration")?)?,
            updated_at: parse_datetime("updated_at", row.get("updated_at")?)?,
            is_deleted: flag("is_deleted")?,
            is_pending: flag("is_pending")?,
            is_flagged: flag("is_flagged")?,
            score: int("score")?,
            up_score: int("up_score")?,
            down_score: int("down_score")?,
            is_rating_locked: flag("is_rating_locked")?,
            is_status_locked: flag("is_status_locked")?,
            is_note_locked: flag("is_note_locked")?,
        })
    }

    /// Distinct tags of the post, in the order they first occur in the tag string.
    pub fn tags(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.tag_string
            .split_whitespace()
            .filter(|tag| seen.insert(*tag))
            .collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_string.split_whitespace().any(|candidate| candidate == tag)
    }

    pub fn file_url(&self) -> String {
        let first = self.md5.get(..2).unwrap_or_default();
        let second = self.md5.get(2..4).unwrap_or_default();
        format!("{STATIC_URL}/{first}/{second}/{}.{}", self.md5, self.raw_file_ext)
    }

    pub fn file_ext(&self) -> Result<FileExt> {
        self.raw_file_ext.parse()
    }

    pub fn short_side(&self) -> u32 {
        self.image_width.min(self.image_height)
    }
}
