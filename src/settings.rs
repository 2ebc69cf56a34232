// src/settings.rs

//! Immutable per-process build settings.
//!
//! `BuildSettings` is resolved once from the config, the project root and the
//! chosen [`Mode`], then shared (`Arc`) by every task in the graph.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config::{ConfigFile, ToolsSection};
use crate::errors::{Result, SitepipeError};
use crate::types::{Mode, StyleVariant};

/// Absolute directories the pipelines read from and write to.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Project root; watch globs are relative to it.
    pub root: PathBuf,
    pub src: PathBuf,
    pub dist: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, src: &str, dist: &str) -> Self {
        let root = root.into();
        Self {
            src: root.join(src.trim_start_matches("./")),
            dist: root.join(dist.trim_start_matches("./")),
            root,
        }
    }

    /// `src` relative to the root, with forward slashes (for watch globs).
    pub fn src_rel(&self) -> String {
        rel_slash(&self.root, &self.src)
    }
}

fn rel_slash(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let s = rel.to_string_lossy().replace('\\', "/");
    s.trim_start_matches("./").trim_end_matches('/').to_string()
}

#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub mode: Mode,
    pub style: StyleVariant,
    pub layout: Layout,
    pub tools: ToolsSection,
    pub primary_stylesheet: String,
    pub script_entry: Option<String>,
    pub queue_length: usize,
    host: String,
    port: u16,
}

impl BuildSettings {
    pub fn from_config(cfg: &ConfigFile, root: impl Into<PathBuf>, mode: Mode) -> Self {
        let section = cfg.config_section();
        Self {
            mode,
            style: section.style,
            layout: Layout::new(root, &section.src, &section.dist),
            tools: cfg.tools().clone(),
            primary_stylesheet: section.primary_stylesheet.clone(),
            script_entry: section.script_entry.clone(),
            queue_length: section.queue_length,
            host: section.host.clone(),
            port: section.port,
        }
    }

    pub fn is_development(&self) -> bool {
        self.mode.is_development()
    }

    /// Socket address for the dev server.
    pub fn server_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                SitepipeError::ConfigError(format!(
                    "invalid server address {}:{}: {e}",
                    self.host, self.port
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_joins_against_root() {
        let layout = Layout::new("/project", "./src", "dist");
        assert_eq!(layout.src, PathBuf::from("/project/src"));
        assert_eq!(layout.dist, PathBuf::from("/project/dist"));
        assert_eq!(layout.src_rel(), "src");
    }

    #[test]
    fn server_addr_rejects_hostnames() {
        let mut settings =
            BuildSettings::from_config(&ConfigFile::default(), "/p", Mode::Development);
        assert_eq!(settings.server_addr().unwrap().port(), 3000);
        settings.host = "localhost".to_string();
        assert!(settings.server_addr().is_err());
    }
}
