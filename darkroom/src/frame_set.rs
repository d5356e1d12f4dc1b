//! Ordered, queryable collections of shared frames.

use std::fmt;
use std::ops::Index;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameRef};
use crate::frame_type::FrameType;
use crate::header::HeaderValue;
use crate::keywords;
use crate::loader::{FrameLoader, FrameSource};

/// Anything that flattens into a sequence of frames: a single frame, a
/// vector of frames, or a whole set.
pub trait IntoFrames {
    fn into_frames(self) -> Vec<FrameRef>;
}

impl IntoFrames for Frame {
    fn into_frames(self) -> Vec<FrameRef> {
        vec![Arc::new(self)]
    }
}

impl IntoFrames for FrameRef {
    fn into_frames(self) -> Vec<FrameRef> {
        vec![self]
    }
}

impl IntoFrames for &FrameRef {
    fn into_frames(self) -> Vec<FrameRef> {
        vec![Arc::clone(self)]
    }
}

impl IntoFrames for Vec<Frame> {
    fn into_frames(self) -> Vec<FrameRef> {
        self.into_iter().map(Arc::new).collect()
    }
}

impl IntoFrames for Vec<FrameRef> {
    fn into_frames(self) -> Vec<FrameRef> {
        self
    }
}

impl IntoFrames for FrameSet {
    fn into_frames(self) -> Vec<FrameRef> {
        self.frames
    }
}

impl IntoFrames for &FrameSet {
    fn into_frames(self) -> Vec<FrameRef> {
        self.frames.clone()
    }
}

/// Builds a [`FrameSet`] from any mix of single frames and frame collections,
/// flattened one level in argument order.
///
/// ```rust,ignore
/// let set = frame_set![master_dark, lights, &flats];
/// ```
#[macro_export]
macro_rules! frame_set {
    () => {
        $crate::FrameSet::new()
    };
    ($($part:expr),+ $(,)?) => {{
        let mut frames: Vec<$crate::FrameRef> = Vec::new();
        $(frames.extend($crate::IntoFrames::into_frames($part));)+
        $crate::FrameSet::from(frames)
    }};
}

/// Ordered multiset of frames.
///
/// Membership is fixed at construction; every operation that filters or
/// transforms returns a new set. Frames themselves are shared, not copied.
#[derive(Debug, Clone, Default)]
pub struct FrameSet {
    frames: Vec<FrameRef>,
}

impl FrameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenates `parts`, each flattened one level.
    pub fn concat<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: IntoFrames,
    {
        Self {
            frames: parts.into_iter().flat_map(IntoFrames::into_frames).collect(),
        }
    }

    /// Loads every path through `loader`, keeping path order.
    pub fn load_paths<I, P>(loader: Arc<dyn FrameLoader>, paths: I, lazy: bool) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let frames = paths
            .into_iter()
            .map(|path| {
                let source = FrameSource::new(Arc::clone(&loader), path);
                Frame::load(source, lazy).map(Arc::new)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(frame_count = frames.len(), lazy, "Loaded frame set");
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&FrameRef> {
        self.frames.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameRef> {
        self.frames.iter()
    }

    pub fn frames(&self) -> &[FrameRef] {
        &self.frames
    }

    /// Frames whose header value equals the given value for every criterion.
    ///
    /// A frame lacking a criterion key never matches.
    pub fn query<I, K, V>(&self, criteria: I) -> FrameSet
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        let criteria = collect_criteria(criteria);
        self.select(&criteria)
    }

    /// Like [`query`](Self::query), but expects at most one match.
    ///
    /// Fails with [`Error::AmbiguousReference`] rather than picking one of
    /// several matches.
    pub fn query_one<I, K, V>(&self, criteria: I) -> Result<Option<FrameRef>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        let criteria = collect_criteria(criteria);
        let mut matches = self.select(&criteria).frames;
        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            count => Err(Error::AmbiguousReference {
                criteria: describe_criteria(&criteria),
                count,
            }),
        }
    }

    /// Frames whose `IMAGETYP` parses as `frame_type`.
    ///
    /// Unlike [`query`](Self::query) this goes through
    /// [`Frame::frame_type`], so `dark`, `DARK` and ` Dark ` all count.
    pub fn of_type(&self, frame_type: FrameType) -> FrameSet {
        self.frames
            .iter()
            .filter(|frame| frame.is_type(frame_type))
            .cloned()
            .collect()
    }

    /// The single frame of `frame_type`, if any.
    ///
    /// Fails with [`Error::AmbiguousReference`] when several frames qualify.
    pub fn one_of_type(&self, frame_type: FrameType) -> Result<Option<FrameRef>> {
        let mut matches = self.of_type(frame_type).frames;
        match matches.len() {
            0 | 1 => Ok(matches.pop()),
            count => Err(Error::AmbiguousReference {
                criteria: format!("{} = {}", keywords::IMAGETYP, frame_type.header_value()),
                count,
            }),
        }
    }

    /// True when both sets hold the very same frames in the same order.
    pub fn same_frames(&self, other: &FrameSet) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }

    fn select(&self, criteria: &[(String, HeaderValue)]) -> FrameSet {
        let frames = self
            .frames
            .iter()
            .filter(|frame| {
                criteria
                    .iter()
                    .all(|(key, expected)| frame.get(key) == Some(expected))
            })
            .cloned()
            .collect();
        FrameSet { frames }
    }
}

fn collect_criteria<I, K, V>(criteria: I) -> Vec<(String, HeaderValue)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<HeaderValue>,
{
    criteria
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

fn describe_criteria(criteria: &[(String, HeaderValue)]) -> String {
    criteria
        .iter()
        .map(|(key, value)| format!("{key} = {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<Vec<FrameRef>> for FrameSet {
    fn from(frames: Vec<FrameRef>) -> Self {
        Self { frames }
    }
}

impl FromIterator<FrameRef> for FrameSet {
    fn from_iter<T: IntoIterator<Item = FrameRef>>(iter: T) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Frame> for FrameSet {
    fn from_iter<T: IntoIterator<Item = Frame>>(iter: T) -> Self {
        Self {
            frames: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

impl Index<usize> for FrameSet {
    type Output = FrameRef;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.frames[idx]
    }
}

impl IntoIterator for FrameSet {
    type Item = FrameRef;
    type IntoIter = std::vec::IntoIter<FrameRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

impl<'a> IntoIterator for &'a FrameSet {
    type Item = &'a FrameRef;
    type IntoIter = std::slice::Iter<'a, FrameRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl fmt::Display for FrameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<FrameSet of size {}>", self.len())
    }
}
