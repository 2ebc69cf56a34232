// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SitepipeError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitepipeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.tools))
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        ConfigFile::new_unchecked(raw.config, raw.tools)
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_layout(cfg)?;
    validate_tools(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(SitepipeError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg
        .config
        .script_entry
        .as_deref()
        .is_some_and(|entry| entry.trim().is_empty())
    {
        return Err(SitepipeError::ConfigError(
            "[config].script_entry must not be empty when set".to_string(),
        ));
    }

    if cfg.config.primary_stylesheet.trim().is_empty() {
        return Err(SitepipeError::ConfigError(
            "[config].primary_stylesheet must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// The output directory is deleted wholesale by `clear`, so it must be a
/// real subdirectory that does not overlap the sources.
fn validate_layout(cfg: &RawConfigFile) -> Result<()> {
    let (Some(src), Some(dist)) = (normalize(&cfg.config.src), normalize(&cfg.config.dist)) else {
        return Err(SitepipeError::ConfigError(format!(
            "[config].src ({:?}) and [config].dist ({:?}) must stay inside the project root",
            cfg.config.src, cfg.config.dist
        )));
    };

    if src.as_os_str().is_empty() {
        return Err(SitepipeError::ConfigError(
            "[config].src must name a directory below the project root".to_string(),
        ));
    }

    if dist.as_os_str().is_empty() {
        return Err(SitepipeError::ConfigError(format!(
            "[config].dist = {:?} would delete the project root on clear",
            cfg.config.dist
        )));
    }

    if Path::new(&cfg.config.dist).has_root() {
        return Err(SitepipeError::ConfigError(format!(
            "[config].dist = {:?} must be relative to the project root",
            cfg.config.dist
        )));
    }

    if src.starts_with(&dist) || dist.starts_with(&src) {
        return Err(SitepipeError::ConfigError(format!(
            "[config].src ({:?}) and [config].dist ({:?}) must not overlap",
            cfg.config.src, cfg.config.dist
        )));
    }

    Ok(())
}

fn validate_tools(cfg: &RawConfigFile) -> Result<()> {
    for (name, tool) in cfg.tools.iter() {
        if tool.cmd.trim().is_empty() {
            return Err(SitepipeError::ConfigError(format!(
                "[tools.{name}].cmd must not be empty"
            )));
        }
        if let Some(dev) = &tool.dev_cmd {
            if dev.trim().is_empty() {
                return Err(SitepipeError::ConfigError(format!(
                    "[tools.{name}].dev_cmd must not be empty when set"
                )));
            }
        }
    }
    Ok(())
}

/// Lexically normalise a relative path: drop `.` components and resolve `..`.
///
/// `None` when a `..` climbs above the starting directory.
fn normalize(path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(path.trim()).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(src: &str, dist: &str) -> RawConfigFile {
        let mut raw = RawConfigFile::default();
        raw.config.src = src.to_string();
        raw.config.dist = dist.to_string();
        raw
    }

    #[test]
    fn default_layout_is_valid() {
        assert!(ConfigFile::try_from(RawConfigFile::default()).is_ok());
    }

    #[test]
    fn rejects_dist_pointing_at_project_root() {
        for dist in ["", ".", "./", "build/.."] {
            let err = ConfigFile::try_from(raw("src", dist)).unwrap_err();
            assert!(
                matches!(err, SitepipeError::ConfigError(ref m) if m.contains("project root")),
                "dist {dist:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rejects_overlapping_src_and_dist() {
        assert!(ConfigFile::try_from(raw("src", "src/dist")).is_err());
        assert!(ConfigFile::try_from(raw("site/src", "site")).is_err());
        assert!(ConfigFile::try_from(raw("./src", "src")).is_err());
        assert!(ConfigFile::try_from(raw("src", "public")).is_ok());
    }

    #[test]
    fn rejects_paths_escaping_the_project_root() {
        for (src, dist) in [("src", "../out"), ("src", "build/../../out"), ("../src", "dist")] {
            let err = ConfigFile::try_from(raw(src, dist)).unwrap_err();
            assert!(
                err.to_string().contains("inside the project root"),
                "src {src:?} dist {dist:?} gave {err:?}"
            );
        }
        assert!(ConfigFile::try_from(raw("src", "build/../public")).is_ok());
    }

    #[test]
    fn rejects_empty_tool_command() {
        let mut cfg = RawConfigFile::default();
        cfg.tools.terser.cmd = "  ".to_string();
        let err = ConfigFile::try_from(cfg).unwrap_err();
        assert!(err.to_string().contains("tools.terser"));
    }
}
