//! Fixture builders shared by unit tests.

use crate::database::schema::{POST_COLUMNS, TAG_COLUMNS};
use crate::model::TagCategory;
use crate::table::Frame;

#[derive(Debug, Clone)]
pub(crate) struct PostRow {
    pub id: i64,
    pub tags: String,
    pub rating: String,
    pub width: u32,
    pub height: u32,
    pub ext: String,
    pub score: i64,
    pub fav_count: i64,
    pub deleted: bool,
    pub created_at: String,
    pub md5: String,
}

impl PostRow {
    pub fn new(id: i64, tags: &str) -> PostRow {
        PostRow {
            id,
            tags: tags.to_string(),
            rating: "s".to_string(),
            width: 1000,
            height: 1000,
            ext: "png".to_string(),
            score: 0,
            fav_count: 0,
            deleted: false,
            created_at: "2020-01-01 00:00:00.000000".to_string(),
            md5: format!("{id:032x}"),
        }
    }

    fn cell(&self, column: &str) -> String {
        let flag = |value: bool| if value { "t" } else { "f" }.to_string();
        match column {
            "id" | "change_seq" => self.id.to_string(),
            "md5" => self.md5.clone(),
            "rating" => self.rating.clone(),
            "image_width" => self.width.to_string(),
            "image_height" => self.height.to_string(),
            "tag_string" => self.tags.clone(),
            "file_ext" => self.ext.clone(),
            "score" => self.score.to_string(),
            "fav_count" => self.fav_count.to_string(),
            "is_deleted" => flag(self.deleted),
            "created_at" => self.created_at.clone(),
            "uploader_id" => "1".to_string(),
            "file_size" => "1024".to_string(),
            "comment_count" | "up_score" | "down_score" => "0".to_string(),
            "is_pending" | "is_flagged" | "is_rating_locked" | "is_status_locked"
            | "is_note_locked" => flag(false),
            _ => String::new(),
        }
    }

    pub fn cells(&self) -> Vec<String> {
        POST_COLUMNS.iter().map(|column| self.cell(column)).collect()
    }
}

pub(crate) fn post_columns() -> Vec<String> {
    POST_COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub(crate) fn tag_columns() -> Vec<String> {
    TAG_COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub(crate) fn frame_of(rows: &[PostRow]) -> Frame {
    Frame::from_rows(post_columns(), rows.iter().map(PostRow::cells)).expect("valid posts frame")
}

pub(crate) fn posts_frame(rows: &[(i64, &str, &str, u32, u32, &str)]) -> Frame {
    let rows: Vec<PostRow> = rows
        .iter()
        .map(|&(id, tags, rating, width, height, ext)| PostRow {
            rating: rating.to_string(),
            width,
            height,
            ext: ext.to_string(),
            ..PostRow::new(id, tags)
        })
        .collect();
    frame_of(&rows)
}

pub(crate) fn tag_cells(
    id: i64,
    name: &str,
    category: TagCategory,
    post_count: i64,
) -> Vec<String> {
    TAG_COLUMNS
        .iter()
        .map(|column| match *column {
            "id" => id.to_string(),
            "name" => name.to_string(),
            "category" => category.code().to_string(),
            "post_count" => post_count.to_string(),
            _ => String::new(),
        })
        .collect()
}

pub(crate) fn tags_frame(rows: &[(i64, &str, TagCategory, i64)]) -> Frame {
    Frame::from_rows(
        tag_columns(),
        rows.iter()
            .map(|&(id, name, category, count)| tag_cells(id, name, category, count)),
    )
    .expect("valid tags frame")
}

/// Renders rows as CSV with every cell quoted.
pub(crate) fn to_csv(columns: &[String], rows: &[Vec<String>]) -> String {
    let quote = |cell: &str| format!("\"{}\"", cell.replace('"', "\"\""));
    let mut out = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(",");
    out.push('\n');
    for row in rows {
        out.push_str(&row.iter().map(|c| quote(c)).collect::<Vec<_>>().join(","));
        out.push('\n');
    }
    out
}
