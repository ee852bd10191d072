use anyhow::Context as _;
use std::path::Path;

pub fn exists(path: &Path) -> bool {
    std::fs::metadata(path).is_ok()
}

pub fn is_directory(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

pub fn mkdir_if_not_exist(path: &Path) -> anyhow::Result<()> {
    if is_directory(path) {
        return Ok(());
    }
    std::fs::create_dir_all(path).with_context(|| format!("failed to create {}", path.display()))
}
