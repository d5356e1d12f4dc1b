use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::header::HeaderValue;

/// Known `IMAGETYP` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FrameType {
    /// Science exposure
    Object,
    /// Flat field exposure
    Flat,
    /// Dark exposure
    Dark,
    /// Bias exposure
    Bias,
    /// Median-combined flats
    MasterFlat,
    /// Median-combined darks
    MasterDark,
}

impl FrameType {
    /// Parses a header value; anything that is not a known tag string yields `None`.
    pub fn from_header_value(value: &HeaderValue) -> Option<Self> {
        value
            .as_str()
            .and_then(|s| FrameType::from_str(s.trim()).ok())
    }

    pub fn header_value(self) -> HeaderValue {
        HeaderValue::Str(self.to_string())
    }
}
