use std::path::Path;

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::FitsFile;

use super::FrameLoader;
use crate::error::LoadError;
use crate::header::{Header, HeaderValue};
use crate::keywords;
use crate::pixels::Pixels;

/// Keywords read by [`FitsLoader::default`].
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "IMAGETYP", "OBJECT", "FILTER", "EXPTIME", "DATE-OBS", "INSTRUME", "TELESCOP", "CCD-TEMP",
    "GAIN", "XBINNING", "YBINNING", "SOURCES", "NCOMBINE", "SUBSRCS", "SUBTRACT", "CRCLEAN",
    "CRCOUNT",
];

/// Reads the primary HDU of FITS files via cfitsio.
///
/// cfitsio cannot enumerate arbitrary keywords cheaply, so the loader reads a
/// fixed keyword list. Each value is fetched as its raw string and then typed.
#[derive(Debug, Clone)]
pub struct FitsLoader {
    keywords: Vec<String>,
}

impl Default for FitsLoader {
    fn default() -> Self {
        Self::with_keywords(DEFAULT_KEYWORDS.iter().copied())
    }
}

impl FitsLoader {
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    fn open(path: &Path) -> Result<(FitsFile, FitsHdu), LoadError> {
        let mut fptr = FitsFile::open(path).map_err(|e| fits_error(path, e))?;
        let hdu = fptr.primary_hdu().map_err(|e| fits_error(path, e))?;
        Ok((fptr, hdu))
    }
}

impl FrameLoader for FitsLoader {
    fn read_header(&self, path: &Path) -> Result<Header, LoadError> {
        let (mut fptr, hdu) = Self::open(path)?;
        let header = self
            .keywords
            .iter()
            .filter_map(|key| {
                hdu.read_key::<String>(&mut fptr, key)
                    .ok()
                    .map(|raw| (key.clone(), parse_keyword_value(key, &raw)))
            })
            .collect();
        Ok(header)
    }

    fn read_pixels(&self, path: &Path) -> Result<Pixels, LoadError> {
        let (mut fptr, hdu) = Self::open(path)?;

        // cfitsio reports the shape slowest axis first: [height, width]
        let (width, height) = match &hdu.info {
            HduInfo::ImageInfo { shape, .. } if shape.len() == 2 => (shape[1], shape[0]),
            HduInfo::ImageInfo { shape, .. } => {
                return Err(LoadError::Fits {
                    path: path.to_path_buf(),
                    reason: format!("expected a 2-D image, got {} axes", shape.len()),
                });
            }
            _ => {
                return Err(LoadError::Fits {
                    path: path.to_path_buf(),
                    reason: "primary HDU is not an image".to_string(),
                });
            }
        };

        let data: Vec<f32> = hdu
            .read_image(&mut fptr)
            .map_err(|e| fits_error(path, e))?;

        Pixels::new(width, height, data).map_err(|e| LoadError::Fits {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

fn fits_error(path: &Path, err: fitsio::errors::Error) -> LoadError {
    LoadError::Fits {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Keywords whose value is a comma-separated list of source ids.
const LIST_KEYWORDS: &[&str] = &[keywords::SOURCES, keywords::SUBSRCS];

/// Keywords written as FITS logicals (`T`/`F`).
const LOGICAL_KEYWORDS: &[&str] = &[keywords::SUBTRACT, keywords::CRCLEAN];

/// Types the raw string of keyword `key`.
///
/// Provenance lists and logicals are recognised by keyword. Anything else is
/// an integer or float when it parses as one and a string otherwise, so a
/// value such as `'M 31, field 2'` stays a single string.
fn parse_keyword_value(key: &str, raw: &str) -> HeaderValue {
    let trimmed = raw.trim();
    if LIST_KEYWORDS.contains(&key) {
        return HeaderValue::StrList(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        );
    }
    if LOGICAL_KEYWORDS.contains(&key) {
        match trimmed {
            "T" => return HeaderValue::Bool(true),
            "F" => return HeaderValue::Bool(false),
            _ => {}
        }
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return HeaderValue::Int(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        if v.is_finite() {
            return HeaderValue::Float(v);
        }
    }
    HeaderValue::Str(trimmed.to_string())
}
