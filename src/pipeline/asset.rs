// src/pipeline/asset.rs

//! Source selection and the in-memory asset representation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

/// One file flowing through a transformer chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the destination directory.
    pub rel_path: PathBuf,
    /// Absolute path of the original source file.
    pub source: PathBuf,
    pub contents: Vec<u8>,
}

impl Asset {
    /// Extension of the current `rel_path`, lowercased.
    pub fn extension(&self) -> Option<String> {
        self.rel_path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    pub fn rel_str(&self) -> String {
        self.rel_path.to_string_lossy().replace('\\', "/")
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents)
            .with_context(|| format!("{} is not valid UTF-8", self.source.display()))
    }
}

/// A glob selection rooted at a base directory.
///
/// Paths are matched relative to `base` with `/` as a literal separator, so
/// `*.html` only matches top-level files while `**/*` matches everything.
#[derive(Debug, Clone)]
pub struct SourceSet {
    base: PathBuf,
    include: Vec<String>,
    ignore: Vec<String>,
}

impl SourceSet {
    pub fn new<I, S>(base: impl Into<PathBuf>, include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base: base.into(),
            include: include.into_iter().map(Into::into).collect(),
            ignore: Vec::new(),
        }
    }

    pub fn ignoring<I, S>(mut self, ignore: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(ignore.into_iter().map(Into::into));
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Matching files as `(absolute, relative-to-base)` pairs, sorted by path.
    ///
    /// A missing base directory selects nothing.
    pub fn select(&self) -> Result<Vec<(PathBuf, PathBuf)>> {
        if !self.base.is_dir() {
            return Ok(Vec::new());
        }

        let include = build_set(&self.include)?;
        let ignore = build_set(&self.ignore)?;

        let mut out = Vec::new();
        for entry in WalkDir::new(&self.base).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("walking {}", self.base.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.base) else {
                continue;
            };
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if include.is_match(&rel_str) && !ignore.is_match(&rel_str) {
                out.push((entry.path().to_path_buf(), rel.to_path_buf()));
            }
        }

        Ok(out)
    }
}

/// Compile a glob with `/` treated as a literal separator.
pub fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

pub fn build_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(compile_glob(pattern)?);
    }
    builder.build().context("building glob set")
}
