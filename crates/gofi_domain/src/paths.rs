use std::path::{Component, Path, PathBuf};

pub const STORAGE_DIR_NAME: &str = "storage";
pub const LOG_DIR_NAME: &str = "log";

pub fn database_file_name(app_name: &str) -> String {
    format!("{app_name}.db")
}

pub fn sqlite_path(work_dir: &Path, app_name: &str) -> PathBuf {
    work_dir.join(database_file_name(app_name))
}

pub fn default_storage_root(work_dir: &Path) -> PathBuf {
    work_dir.join(STORAGE_DIR_NAME)
}

pub fn log_root(work_dir: &Path) -> PathBuf {
    work_dir.join(LOG_DIR_NAME)
}

/// Lexically normalises `path`: drops `.` and redundant separators and resolves `..`
/// against preceding components. Nothing is read from the filesystem.
///
/// An empty input stays empty so callers can tell "no path given" from `.`.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let mut out: Vec<Component<'_>> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return ".".to_owned();
    }
    out.iter()
        .collect::<PathBuf>()
        .to_string_lossy()
        .into_owned()
}
