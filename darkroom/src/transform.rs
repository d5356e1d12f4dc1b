//! Partition → aggregate → recombine engine behind every calibration step.
//!
//! A [`PartitionTransform`] takes a [`FrameSet`] and
//! 1. routes frames rejected by its filter straight to the output,
//! 2. groups the remaining frames into buckets by the values of its partition
//!    keys (first-seen order),
//! 3. calls its aggregate once per bucket,
//! 4. returns all aggregate outputs in bucket order followed by the excluded
//!    frames in their original order.
//!
//! `IMAGETYP` is grouped by its parsed [`FrameType`], so `dark` and `DARK`
//! land together; every other key groups by exact header value.
//!
//! Without partition keys every frame is its own bucket; the aggregate then
//! runs once per frame. To combine a whole set into one output, partition by a
//! key whose value is the same for every frame (e.g. `IMAGETYP` after
//! filtering on it).
//!
//! A failing aggregate fails the whole application; there are no partial
//! results.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::Result;
use crate::frame::{Frame, FrameRef};
use crate::frame_set::{FrameSet, IntoFrames};
use crate::frame_type::FrameType;
use crate::header::{HeaderValue, KeyAtom};
use crate::keywords;

/// Combines one bucket of frames into output frames.
pub trait Aggregate: Send + Sync {
    fn aggregate(&self, frames: &[FrameRef]) -> Result<Vec<FrameRef>>;
}

impl<F, R> Aggregate for F
where
    F: Fn(&[FrameRef]) -> Result<R> + Send + Sync,
    R: IntoFrames,
{
    fn aggregate(&self, frames: &[FrameRef]) -> Result<Vec<FrameRef>> {
        self(frames).map(IntoFrames::into_frames)
    }
}

/// Decides whether a frame enters the partitioning or passes through untouched.
pub trait FrameFilter: Send + Sync {
    fn accepts(&self, frame: &Frame) -> bool;
}

impl<F> FrameFilter for F
where
    F: Fn(&Frame) -> bool + Send + Sync,
{
    fn accepts(&self, frame: &Frame) -> bool {
        self(frame)
    }
}

/// Accepts frames whose `IMAGETYP` is one of the listed types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFilter {
    types: Vec<FrameType>,
}

impl TypeFilter {
    pub fn any_of(types: impl IntoIterator<Item = FrameType>) -> Self {
        Self {
            types: types.into_iter().collect(),
        }
    }
}

impl FrameFilter for TypeFilter {
    fn accepts(&self, frame: &Frame) -> bool {
        frame
            .frame_type()
            .is_some_and(|frame_type| self.types.contains(&frame_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PartitionKey {
    /// Header values of the partition keys; `None` for absent keys.
    Metadata(Vec<Option<KeyAtom>>),
    /// Address of the shared frame.
    Identity(usize),
}

/// Result of the partitioning step, before aggregation.
#[derive(Debug, Default)]
pub struct Partition {
    /// Accepted frames grouped by key, buckets in first-seen order.
    pub buckets: Vec<Vec<FrameRef>>,
    /// Frames rejected by the filter, in input order.
    pub excluded: Vec<FrameRef>,
}

/// Reusable, stateless partition-filter-aggregate plan.
#[derive(Clone)]
pub struct PartitionTransform {
    aggregate: Arc<dyn Aggregate>,
    filter: Option<Arc<dyn FrameFilter>>,
    partition_keys: Option<Vec<String>>,
}

impl PartitionTransform {
    /// Transform with no filter and no partition keys.
    pub fn new(aggregate: impl Aggregate + 'static) -> Self {
        Self {
            aggregate: Arc::new(aggregate),
            filter: None,
            partition_keys: None,
        }
    }

    /// Only frames accepted by `filter` are aggregated; others pass through.
    pub fn with_filter(mut self, filter: impl FrameFilter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Groups frames by the values of `keys`.
    pub fn partition_by<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.partition_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn partition_keys(&self) -> Option<&[String]> {
        self.partition_keys.as_deref()
    }

    /// Splits `set` into buckets and excluded frames.
    pub fn partition(&self, set: &FrameSet) -> Partition {
        let mut partition = Partition::default();
        let mut bucket_by_key: HashMap<PartitionKey, usize> = HashMap::new();

        for frame in set {
            if let Some(filter) = &self.filter {
                if !filter.accepts(frame) {
                    partition.excluded.push(Arc::clone(frame));
                    continue;
                }
            }

            let key = self.partition_key(frame);
            let idx = *bucket_by_key.entry(key).or_insert_with(|| {
                partition.buckets.push(Vec::new());
                partition.buckets.len() - 1
            });
            partition.buckets[idx].push(Arc::clone(frame));
        }

        partition
    }

    /// Applies the transform, aggregating buckets one after another.
    pub fn apply(&self, set: &FrameSet) -> Result<FrameSet> {
        let partition = self.partition(set);
        self.log_partition(set, &partition);

        let mut frames = Vec::with_capacity(set.len());
        for bucket in &partition.buckets {
            frames.extend(self.aggregate.aggregate(bucket)?);
        }
        frames.extend(partition.excluded);

        Ok(FrameSet::from(frames))
    }

    /// Same result as [`apply`](Self::apply), with buckets aggregated on the
    /// rayon pool. Output order does not depend on scheduling.
    pub fn apply_par(&self, set: &FrameSet) -> Result<FrameSet> {
        let partition = self.partition(set);
        self.log_partition(set, &partition);

        let outputs = common::parallel::try_par_map(&partition.buckets, |bucket| {
            self.aggregate.aggregate(bucket)
        })?;

        let mut frames = Vec::with_capacity(set.len());
        frames.extend(outputs.into_iter().flatten());
        frames.extend(partition.excluded);

        Ok(FrameSet::from(frames))
    }

    fn partition_key(&self, frame: &FrameRef) -> PartitionKey {
        match &self.partition_keys {
            Some(keys) => PartitionKey::Metadata(
                keys.iter().map(|key| key_atom(frame, key)).collect(),
            ),
            None => PartitionKey::Identity(Arc::as_ptr(frame) as usize),
        }
    }

    fn log_partition(&self, set: &FrameSet, partition: &Partition) {
        tracing::debug!(
            input_count = set.len(),
            bucket_count = partition.buckets.len(),
            excluded_count = partition.excluded.len(),
            partition_keys = ?self.partition_keys,
            "Applying partition transform"
        );
    }
}

/// `IMAGETYP` groups by the parsed [`FrameType`] when it has one, so spelling
/// variants of a tag share a bucket the same way they pass a [`TypeFilter`].
fn key_atom(frame: &Frame, key: &str) -> Option<KeyAtom> {
    if key == keywords::IMAGETYP {
        if let Some(frame_type) = frame.frame_type() {
            return Some(frame_type.header_value().partition_key());
        }
    }
    frame.get(key).map(HeaderValue::partition_key)
}

impl fmt::Debug for PartitionTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionTransform")
            .field("filtered", &self.filter.is_some())
            .field("partition_keys", &self.partition_keys)
            .finish_non_exhaustive()
    }
}
