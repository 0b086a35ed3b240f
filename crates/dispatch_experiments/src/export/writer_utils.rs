use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};

pub(crate) fn ensure_not_empty<T>(items: &[T]) -> Result<()> {
    if items.is_empty() {
        bail!("no results to export");
    }
    Ok(())
}

/// Create `path`, and its parent directories when missing.
pub(crate) fn create_output_file(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("failed to create {}", path.display()))
}
