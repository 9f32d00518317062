use std::collections::BTreeMap;
use std::ops::Range;

use tracing::info;

use crate::database::query::Query;
use crate::database::schema::{check_columns, POST_COLUMNS};
use crate::database::selector::{compile, not_deleted};
use crate::error::{Error, Result};
use crate::model::Post;
use crate::table::{Frame, Predicate, Source};

/// Adapter over a posts dump. Cheap to clone; every operation returns a new
/// adapter and leaves the receiver as it was.
#[derive(Debug, Clone)]
pub struct Posts {
    source: Source,
}

impl Posts {
    pub fn new(source: impl Into<Source>) -> Result<Posts> {
        let source = source.into();
        check_columns("Posts", source.column_names(), &POST_COLUMNS)?;
        Ok(Posts { source })
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn is_lazy(&self) -> bool {
        self.source.is_lazy()
    }

    /// Posts matching `query`; deleted posts are dropped unless asked for.
    /// With a non-zero `top_n` the highest scores are kept, ties going to the
    /// lower id.
    pub fn select(&self, query: &Query, include_deleted: bool) -> Result<Posts> {
        info!("Filtering posts by query: {}", query);
        let mut source = self.source.clone();
        if !include_deleted {
            source = source.filter(not_deleted())?;
        }
        source = source.filter(compile(query)?)?;
        if let Some(n) = query.top_n.filter(|&n| n > 0) {
            source = source.top_k(n, "score", "id")?;
        }
        Ok(Posts { source })
    }

    pub fn len(&self) -> Result<usize> {
        self.source.len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.source.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Post> {
        let frame = self.source.collect()?;
        let row = frame.row(index).ok_or(Error::IndexOutOfRange {
            index,
            len: frame.len(),
        })?;
        Post::from_row(&row)
    }

    pub fn slice(&self, range: Range<usize>) -> Result<Posts> {
        let len = range.end.saturating_sub(range.start);
        Ok(Posts {
            source: self.source.slice(range.start, len)?,
        })
    }

    pub fn reversed(&self) -> Result<Posts> {
        Ok(Posts {
            source: self.source.reverse()?,
        })
    }

    /// Decodes rows one by one as the iterator advances. Each call starts over.
    pub fn iter(&self) -> Result<PostIter> {
        Ok(PostIter::new(self.source.collect()?))
    }

    pub fn contains(&self, post: &Post) -> Result<bool> {
        self.source.collect()?.any_equals("id", &post.id.to_string())
    }

    /// Occurrences of every whitespace-separated tag across the posts, by name.
    pub fn tag_stats(&self) -> Result<BTreeMap<String, u64>> {
        let frame = self.source.collect()?;
        let mut stats = BTreeMap::new();
        for tag_string in frame.column("tag_string")? {
            for tag in tag_string.split_whitespace() {
                *stats.entry(tag.to_string()).or_insert(0) += 1;
            }
        }
        Ok(stats)
    }

    pub fn filter(&self, predicate: Predicate) -> Result<Posts> {
        Ok(Posts {
            source: self.source.filter(predicate)?,
        })
    }

    pub fn collect(&self) -> Result<Frame> {
        self.source.collect()
    }
}

/// Iterator decoding posts from a frame snapshot.
pub struct PostIter {
    frame: Frame,
    front: usize,
    back: usize,
}

impl PostIter {
    fn new(frame: Frame) -> Self {
        let back = frame.len();
        PostIter {
            frame,
            front: 0,
            back,
        }
    }

    fn decode(&self, index: usize) -> Option<Result<Post>> {
        self.frame.row(index).map(|row| Post::from_row(&row))
    }
}

impl Iterator for PostIter {
    type Item = Result<Post>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let post = self.decode(self.front);
        self.front += 1;
        post
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for PostIter {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.decode(self.back)
    }
}

impl ExactSizeIterator for PostIter {}
