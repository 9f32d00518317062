//! Columns every dump must provide.

use crate::error::{Error, Result};

pub const POST_COLUMNS: [&str; 29] = [
    "approver_id",
    "change_seq",
    "comment_count",
    "created_at",
    "description",
    "down_score",
    "duration",
    "fav_count",
    "file_ext",
    "file_size",
    "id",
    "image_height",
    "image_width",
    "is_deleted",
    "is_flagged",
    "is_note_locked",
    "is_pending",
    "is_rating_locked",
    "is_status_locked",
    "locked_tags",
    "md5",
    "parent_id",
    "rating",
    "score",
    "source",
    "tag_string",
    "up_score",
    "updated_at",
    "uploader_id",
];

pub const TAG_COLUMNS: [&str; 4] = ["id", "name", "category", "post_count"];

/// Fails with every missing column, sorted, when `columns` lacks any of `required`.
pub fn check_columns(kind: &'static str, columns: &[String], required: &[&str]) -> Result<()> {
    let mut missing: Vec<String> = required
        .iter()
        .filter(|name| !columns.iter().any(|column| column == *name))
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    missing.sort();
    Err(Error::Schema { kind, missing })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_every_missing_column() {
        let columns = vec!["id".to_string(), "post_count".to_string()];
        match check_columns("Tags", &columns, &TAG_COLUMNS) {
            Err(Error::Schema { kind, missing }) => {
                assert_eq!(kind, "Tags");
                assert_eq!(missing, vec!["category", "name"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_columns_are_fine() {
        let mut columns: Vec<String> = POST_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.push("extra".to_string());
        assert!(check_columns("Posts", &columns, &POST_COLUMNS).is_ok());
    }
}
