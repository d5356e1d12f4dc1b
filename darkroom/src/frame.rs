//! A single frame: header plus (possibly not yet loaded) pixel data.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::{LoadError, Result};
use crate::frame_type::FrameType;
use crate::header::{Header, HeaderValue};
use crate::keywords;
use crate::loader::FrameSource;
use crate::pixels::Pixels;

/// Frames are shared between sets; transforms pass them around by reference count.
pub type FrameRef = Arc<Frame>;

/// An image frame with its header.
///
/// Pixel data is either supplied up front or loaded from [`FrameSource`] on
/// first access and cached for the lifetime of the frame. That cache is the
/// only interior mutability a frame has; the header can never change.
pub struct Frame {
    header: Header,
    pixels: OnceLock<Pixels>,
    /// Serializes first-access loads so the source is read at most once.
    load_lock: Mutex<()>,
    source: Option<FrameSource>,
}

impl Frame {
    /// In-memory frame with pixel data already present.
    pub fn new(header: Header, pixels: Pixels) -> Self {
        Self {
            header,
            pixels: OnceLock::from(pixels),
            load_lock: Mutex::new(()),
            source: None,
        }
    }

    /// Frame whose pixels will be read from `source` on first access.
    pub fn deferred(header: Header, source: FrameSource) -> Self {
        Self {
            header,
            pixels: OnceLock::new(),
            load_lock: Mutex::new(()),
            source: Some(source),
        }
    }

    /// Reads a frame from `source`.
    ///
    /// With `lazy` only the header is read now; pixels follow on the first
    /// [`pixels`](Self::pixels) call. Otherwise both are read immediately.
    pub fn load(source: FrameSource, lazy: bool) -> Result<Self> {
        if lazy {
            let header = source.read_header()?;
            return Ok(Self::deferred(header, source));
        }

        let (header, pixels) = source.read()?;
        Ok(Self {
            header,
            pixels: OnceLock::from(pixels),
            load_lock: Mutex::new(()),
            source: Some(source),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.header.get(key)
    }

    /// Header values for `keys` in order; `None` for absent keys.
    pub fn values<K: AsRef<str>>(&self, keys: &[K]) -> Vec<Option<&HeaderValue>> {
        self.header.values(keys)
    }

    /// Parsed `IMAGETYP`, if it names a known frame type.
    pub fn frame_type(&self) -> Option<FrameType> {
        self.get(keywords::IMAGETYP)
            .and_then(FrameType::from_header_value)
    }

    pub fn is_type(&self, frame_type: FrameType) -> bool {
        self.frame_type() == Some(frame_type)
    }

    pub fn source(&self) -> Option<&FrameSource> {
        self.source.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.source.as_ref().map(FrameSource::path)
    }

    pub fn is_loaded(&self) -> bool {
        self.pixels.get().is_some()
    }

    /// Pixel data, loading it from the source on first access.
    ///
    /// A failed load leaves the cache empty, so a later call retries.
    pub fn pixels(&self) -> Result<&Pixels> {
        if let Some(pixels) = self.pixels.get() {
            return Ok(pixels);
        }

        let _guard = self.load_lock.lock();
        if let Some(pixels) = self.pixels.get() {
            return Ok(pixels);
        }

        let source = self.source.as_ref().ok_or(LoadError::NoSource)?;
        tracing::debug!(path = %source.path().display(), "Loading pixel data");
        let pixels = source.read_pixels()?;
        Ok(self.pixels.get_or_init(|| pixels))
    }

    /// `(width, height)`; loads pixel data if needed.
    pub fn shape(&self) -> Result<(usize, usize)> {
        Ok(self.pixels()?.shape())
    }

    /// Identifiers of the raw frames this frame stems from.
    ///
    /// A frame that already lists its inputs in `SOURCES` reports those.
    /// Otherwise it reports its own path, then its `FILENAME` keyword.
    pub fn source_ids(&self) -> Vec<String> {
        if let Some(sources) = self.get(keywords::SOURCES).and_then(HeaderValue::as_str_list) {
            return sources.to_vec();
        }
        if let Some(path) = self.path() {
            return vec![path.display().to_string()];
        }
        self.get(keywords::FILENAME)
            .and_then(HeaderValue::as_str)
            .map(|name| vec![name.to_string()])
            .unwrap_or_default()
    }

    /// New in-memory frame whose header is this header with `overrides` applied.
    pub fn derive<I, K, V>(&self, overrides: I, pixels: Pixels) -> Frame
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<HeaderValue>,
    {
        Frame::new(self.header.derive(overrides), pixels)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("frame_type", &self.frame_type())
            .field("header_len", &self.header.len())
            .field("loaded", &self.is_loaded())
            .field("source", &self.source)
            .finish()
    }
}
