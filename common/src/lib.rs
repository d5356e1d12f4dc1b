pub mod file_format;
pub mod log_setup;
pub mod parallel;
pub mod test_utils;

pub use file_format::{
    deserialize, deserialize_file, FileExtensionError, SerdeFormat, SerdeFormatError,
};

pub fn is_debug() -> bool {
    cfg!(debug_assertions)
}
