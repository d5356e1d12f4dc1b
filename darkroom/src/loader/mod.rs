//! Loader contract for frames kept in external storage.
//!
//! Parsing of on-disk formats lives behind [`FrameLoader`]; the rest of the
//! crate only ever sees a [`Header`] and, possibly later, [`Pixels`].

#[cfg(feature = "fits")]
mod fits;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;

use crate::error::LoadError;
use crate::header::Header;
use crate::pixels::Pixels;

#[cfg(feature = "fits")]
pub use fits::FitsLoader;

/// Reads frames from storage.
///
/// Keeping header and pixel reads separate is what allows lazy frames:
/// [`Frame::load`](crate::Frame::load) with `lazy = true` only calls
/// [`read_header`](FrameLoader::read_header).
pub trait FrameLoader: Send + Sync {
    fn read_header(&self, path: &Path) -> Result<Header, LoadError>;

    fn read_pixels(&self, path: &Path) -> Result<Pixels, LoadError>;

    fn read(&self, path: &Path) -> Result<(Header, Pixels), LoadError> {
        Ok((self.read_header(path)?, self.read_pixels(path)?))
    }
}

/// Handle a frame keeps to load its pixels on demand.
#[derive(Clone)]
pub struct FrameSource {
    loader: Arc<dyn FrameLoader>,
    path: PathBuf,
}

impl FrameSource {
    pub fn new(loader: Arc<dyn FrameLoader>, path: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_header(&self) -> Result<Header, LoadError> {
        self.loader.read_header(&self.path)
    }

    pub fn read_pixels(&self) -> Result<Pixels, LoadError> {
        self.loader.read_pixels(&self.path)
    }

    pub fn read(&self) -> Result<(Header, Pixels), LoadError> {
        self.loader.read(&self.path)
    }
}

impl fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// In-memory loader keyed by path.
///
/// Counts pixel reads so callers can observe when lazy frames materialize.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    frames: HashMap<PathBuf, (Header, Option<Pixels>)>,
    pixel_reads: AtomicUsize,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(mut self, path: impl Into<PathBuf>, header: Header, pixels: Pixels) -> Self {
        self.frames.insert(path.into(), (header, Some(pixels)));
        self
    }

    /// Registers a frame whose header is readable but whose pixel data is not.
    pub fn with_header_only(mut self, path: impl Into<PathBuf>, header: Header) -> Self {
        self.frames.insert(path.into(), (header, None));
        self
    }

    pub fn pixel_reads(&self) -> usize {
        self.pixel_reads.load(Ordering::SeqCst)
    }

    pub fn into_shared(self) -> Arc<dyn FrameLoader> {
        Arc::new(self)
    }
}

impl FrameLoader for MemoryLoader {
    fn read_header(&self, path: &Path) -> Result<Header, LoadError> {
        self.frames
            .get(path)
            .map(|(header, _)| header.clone())
            .ok_or_else(|| LoadError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn read_pixels(&self, path: &Path) -> Result<Pixels, LoadError> {
        self.pixel_reads.fetch_add(1, Ordering::SeqCst);
        match self.frames.get(path) {
            Some((_, Some(pixels))) => Ok(pixels.clone()),
            Some((_, None)) => Err(LoadError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "pixel data unavailable",
                ),
            }),
            None => Err(LoadError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }
}
