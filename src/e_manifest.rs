use std::fs;
use std::path::{Path, PathBuf};
use toml::Value;

use crate::e_error::{Error, Result};

/// The manifest file that marks the root of a Move package.
pub const MOVE_MANIFEST: &str = "Move.toml";

/// Search upward from `start` for a directory containing `Move.toml`.
/// A relative `start` is taken against the current directory.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut dir = std::path::absolute(start)?;
    loop {
        if dir.join(MOVE_MANIFEST).is_file() {
            log::debug!("found {} in {}", MOVE_MANIFEST, dir.display());
            return Ok(dir);
        }
        // Stop if we cannot go any higher.
        if !dir.pop() {
            break;
        }
    }
    Err(Error::ProjectNotFound {
        start: start.to_path_buf(),
    })
}

/// Reads `[package].name` from the package's `Move.toml`.
pub fn read_package_name(root: &Path) -> Option<String> {
    let content = fs::read_to_string(root.join(MOVE_MANIFEST)).ok()?;
    let value: Value = content.parse().ok()?;
    value
        .get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}
