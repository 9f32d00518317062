use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::Result;
use crate::table::{Frame, Predicate};

/// Deferred input of a [`LazyFrame`], typically a dump file on disk.
///
/// `columns` must be known without reading the rows so that schemas can be
/// checked when the adapter is built.
pub trait Scan: Send + Sync {
    fn columns(&self) -> &[String];
    fn load(&self) -> Result<Frame>;
    fn describe(&self) -> String;
}

/// One recorded transformation of a lazy plan.
#[derive(Debug, Clone)]
pub enum Step {
    Filter(Arc<Predicate>),
    Slice { offset: usize, len: usize },
    Reverse,
    TopK { n: usize, by: String, tie: String },
}

impl Step {
    fn apply(&self, frame: &Frame) -> Result<Frame> {
        match self {
            Step::Filter(predicate) => frame.filter(predicate),
            Step::Slice { offset, len } => Ok(frame.slice(*offset, *len)),
            Step::Reverse => Ok(frame.reverse()),
            Step::TopK { n, by, tie } => frame.top_k(*n, by, tie),
        }
    }
}

/// Scanned rows are loaded at most once, whichever derived plan asks first.
struct ScanInput {
    scan: Box<dyn Scan>,
    loaded: OnceLock<Frame>,
}

impl ScanInput {
    fn frame(&self) -> Result<Frame> {
        if let Some(frame) = self.loaded.get() {
            return Ok(frame.clone());
        }
        debug!("Loading {}", self.scan.describe());
        let frame = self.scan.load()?;
        Ok(self.loaded.get_or_init(|| frame).clone())
    }
}

#[derive(Clone)]
enum Input {
    Frame(Frame),
    Scan(Arc<ScanInput>),
}

/// An input plus the steps still to run on it.
///
/// Steps execute on the first terminal call ([`LazyFrame::collect`]); the
/// result is kept as a snapshot shared by clones of this plan.
#[derive(Clone)]
pub struct LazyFrame {
    input: Input,
    steps: Vec<Step>,
    snapshot: Arc<OnceLock<Frame>>,
}

impl LazyFrame {
    pub fn scan(scan: impl Scan + 'static) -> LazyFrame {
        LazyFrame::new(Input::Scan(Arc::new(ScanInput {
            scan: Box::new(scan),
            loaded: OnceLock::new(),
        })))
    }

    pub fn from_frame(frame: Frame) -> LazyFrame {
        LazyFrame::new(Input::Frame(frame))
    }

    fn new(input: Input) -> LazyFrame {
        LazyFrame {
            input,
            steps: Vec::new(),
            snapshot: Arc::new(OnceLock::new()),
        }
    }

    pub fn column_names(&self) -> &[String] {
        match &self.input {
            Input::Frame(frame) => frame.column_names(),
            Input::Scan(input) => input.scan.columns(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// New plan with one more step. The receiver is untouched.
    pub fn then(&self, step: Step) -> LazyFrame {
        let mut steps = self.steps.clone();
        steps.push(step);
        LazyFrame {
            input: self.input.clone(),
            steps,
            snapshot: Arc::new(OnceLock::new()),
        }
    }

    pub fn collect(&self) -> Result<Frame> {
        if let Some(frame) = self.snapshot.get() {
            return Ok(frame.clone());
        }
        let mut frame = match &self.input {
            Input::Frame(frame) => frame.clone(),
            Input::Scan(input) => input.frame()?,
        };
        for step in &self.steps {
            frame = step.apply(&frame)?;
        }
        debug!("Executed plan of {} steps, {} rows", self.steps.len(), frame.len());
        Ok(self.snapshot.get_or_init(|| frame).clone())
    }
}

impl fmt::Debug for LazyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let input = match &self.input {
            Input::Frame(frame) => format!("{frame:?}"),
            Input::Scan(input) => input.scan.describe(),
        };
        f.debug_struct("LazyFrame")
            .field("input", &input)
            .field("steps", &self.steps)
            .finish()
    }
}
