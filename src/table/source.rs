use std::sync::Arc;

use crate::error::Result;
use crate::table::{Frame, LazyFrame, Predicate, Step};

/// Backing store of an adapter: resident rows or a deferred plan.
///
/// Transformations keep the variant of the receiver: an eager source runs
/// them at once, a lazy one only records them.
#[derive(Debug, Clone)]
pub enum Source {
    Eager(Frame),
    Lazy(LazyFrame),
}

impl Source {
    pub fn column_names(&self) -> &[String] {
        match self {
            Source::Eager(frame) => frame.column_names(),
            Source::Lazy(lazy) => lazy.column_names(),
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Source::Lazy(_))
    }

    /// Same rows, evaluated lazily from now on.
    pub fn lazy(&self) -> Source {
        match self {
            Source::Eager(frame) => Source::Lazy(LazyFrame::from_frame(frame.clone())),
            Source::Lazy(lazy) => Source::Lazy(lazy.clone()),
        }
    }

    /// Wraps `frame` in the same variant as `self`.
    pub fn like(&self, frame: Frame) -> Source {
        match self {
            Source::Eager(_) => Source::Eager(frame),
            Source::Lazy(_) => Source::Lazy(LazyFrame::from_frame(frame)),
        }
    }

    pub fn filter(&self, predicate: Predicate) -> Result<Source> {
        if predicate.is_match_all() {
            return Ok(self.clone());
        }
        self.apply(Step::Filter(Arc::new(predicate)))
    }

    pub fn slice(&self, offset: usize, len: usize) -> Result<Source> {
        self.apply(Step::Slice { offset, len })
    }

    pub fn reverse(&self) -> Result<Source> {
        self.apply(Step::Reverse)
    }

    pub fn top_k(&self, n: usize, by: &str, tie: &str) -> Result<Source> {
        self.apply(Step::TopK {
            n,
            by: by.to_string(),
            tie: tie.to_string(),
        })
    }

    /// Resident rows; runs the pending plan of a lazy source.
    pub fn collect(&self) -> Result<Frame> {
        match self {
            Source::Eager(frame) => Ok(frame.clone()),
            Source::Lazy(lazy) => lazy.collect(),
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.collect()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn apply(&self, step: Step) -> Result<Source> {
        Ok(match self {
            Source::Eager(frame) => Source::Eager(match step {
                Step::Filter(predicate) => frame.filter(&predicate)?,
                Step::Slice { offset, len } => frame.slice(offset, len),
                Step::Reverse => frame.reverse(),
                Step::TopK { n, by, tie } => frame.top_k(n, &by, &tie)?,
            }),
            Source::Lazy(lazy) => Source::Lazy(lazy.then(step)),
        })
    }
}

impl From<Frame> for Source {
    fn from(frame: Frame) -> Self {
        Source::Eager(frame)
    }
}

impl From<LazyFrame> for Source {
    fn from(lazy: LazyFrame) -> Self {
        Source::Lazy(lazy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::from_rows(
            vec!["id".into(), "score".into()],
            (1..=6).map(|i| vec![i.to_string(), i.to_string()]),
        )
        .expect("valid frame")
    }

    #[test]
    fn test_variant_is_preserved() -> Result<()> {
        let eager = Source::from(frame());
        let filtered = eager.filter(Predicate::at_least("score", 3))?;
        assert!(!filtered.is_lazy());
        assert_eq!(filtered.len()?, 4);

        let lazy = eager.lazy();
        let filtered = lazy.filter(Predicate::at_least("score", 3))?.reverse()?;
        assert!(filtered.is_lazy());
        assert_eq!(filtered.collect()?.row(0).expect("row").get("id")?, "6");
        assert_eq!(lazy.len()?, 6);
        Ok(())
    }

    #[test]
    fn test_match_all_filter_is_a_no_op() -> Result<()> {
        let lazy = Source::from(frame()).lazy();
        match lazy.filter(Predicate::all(Vec::new()))? {
            Source::Lazy(plan) => assert!(plan.steps().is_empty()),
            Source::Eager(_) => panic!("expected lazy source"),
        }
        Ok(())
    }
}
