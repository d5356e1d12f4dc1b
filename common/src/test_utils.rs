//! Scratch files for tests, kept under `<workspace>/test_output/` so they can
//! be inspected after a run.

use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

/// Path of `name` under `<workspace>/test_output/`, creating the directory.
pub fn test_output_path(name: &str) -> PathBuf {
    let dir = workspace_root().join("test_output");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        panic!("Failed to create {}: {e}", dir.display());
    }
    dir.join(name)
}

/// Writes `contents` to `test_output_path(name)` and returns the path.
pub fn write_test_file(name: &str, contents: &str) -> PathBuf {
    let path = test_output_path(name);
    if let Err(e) = std::fs::write(&path, contents) {
        panic!("Failed to write {}: {e}", path.display());
    }
    path
}
