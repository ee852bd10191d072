use crate::context::ProcessContext;
use crate::fs_util;
use gofi_domain::paths::clean_path;
use gofi_domain::{ConfigurationPatch, ConfigurationView, SettingsError};
use std::path::Path;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpdateMode {
    /// First-time setup; refused once the system is initialized.
    Setup,
    Update,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WorkflowOptions {
    /// Preview deployments freeze settings once initialized.
    pub preview: bool,
}

/// Validates the storage path carried by `body`, persists the merged configuration and
/// makes it the active snapshot.
///
/// `body` is the raw request payload; an empty slice means the caller sent no body.
/// Updates are serialized per context, so concurrent callers never interleave.
pub fn apply_settings(
    ctx: &ProcessContext,
    mode: UpdateMode,
    options: WorkflowOptions,
    body: &[u8],
) -> Result<ConfigurationView, SettingsError> {
    let _guard = ctx.lock_updates();
    let baseline = ctx.stored_configuration();

    if options.preview && baseline.initialized {
        return Err(SettingsError::OperationNotAllowed);
    }
    if mode == UpdateMode::Setup && baseline.initialized {
        return Err(SettingsError::AlreadyInitialized);
    }

    let patch = ConfigurationPatch::from_json(body)?;
    let merged = patch.merged_onto(&baseline)?;

    let default_dir = ctx.default_storage_dir();
    let default_path = clean_path(&default_dir.to_string_lossy());
    let path = resolve_storage_path(&merged.custom_storage_path, &default_path);
    let uses_default = path == default_path;
    tracing::debug!(work_dir = %ctx.work_dir().display(), path = %path, "resolved storage path");

    if !uses_default {
        ensure_directory(&path)?;
    }

    if let Err(err) = fs_util::mkdir_if_not_exist(default_dir) {
        tracing::warn!(error = %format!("{err:#}"), "failed to provision default storage dir");
    }

    if uses_default {
        ensure_directory(&path)?;
    }

    let mut update = baseline
        .update()
        .set_initialized(true)
        .set_custom_storage_path(path.clone());
    if merged.theme_style != baseline.theme_style {
        update = update.set_theme_style(merged.theme_style);
    }
    if merged.theme_color != baseline.theme_color {
        update = update.set_theme_color(merged.theme_color);
    }
    if merged.nav_mode != baseline.nav_mode {
        update = update.set_nav_mode(merged.nav_mode);
    }

    let committed = ctx.store().commit(update).map_err(|err| {
        tracing::error!(error = %err, "failed to persist configuration");
        SettingsError::Persistence(err)
    })?;

    ctx.activate(committed, path.clone());
    tracing::info!(path = %path, default = uses_default, "storage path applied");

    Ok(ctx.configuration())
}

/// Cleans `raw` and substitutes the default directory for an empty path.
pub fn resolve_storage_path(raw: &str, default_path: &str) -> String {
    let cleaned = clean_path(raw);
    if cleaned.is_empty() || cleaned == default_path {
        return default_path.to_owned();
    }
    cleaned
}

fn ensure_directory(path: &str) -> Result<(), SettingsError> {
    let dir = Path::new(path);
    if !fs_util::exists(dir) {
        return Err(SettingsError::DirNotFound(path.to_owned()));
    }
    if !fs_util::is_directory(dir) {
        return Err(SettingsError::NotADirectory(path.to_owned()));
    }
    Ok(())
}
