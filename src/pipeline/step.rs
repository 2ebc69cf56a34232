// src/pipeline/step.rs

//! The individual steps a transformer chains together.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::pipeline::asset::Asset;
use crate::pipeline::command::{ToolInput, ToolRun};
use crate::pipeline::native;
use crate::settings::BuildSettings;

/// Which assets a tool step touches; the rest pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    extensions: Vec<&'static str>,
    skip_suffix: Option<&'static str>,
}

impl AssetFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn extensions(extensions: &[&'static str]) -> Self {
        Self {
            extensions: extensions.to_vec(),
            skip_suffix: None,
        }
    }

    pub fn skipping_suffix(mut self, suffix: &'static str) -> Self {
        self.skip_suffix = Some(suffix);
        self
    }

    pub fn accepts(&self, asset: &Asset) -> bool {
        if let Some(suffix) = self.skip_suffix
            && asset.rel_str().ends_with(suffix)
        {
            return false;
        }
        if self.extensions.is_empty() {
            return true;
        }
        asset
            .extension()
            .is_some_and(|ext| self.extensions.contains(&ext.as_str()))
    }
}

/// An external tool applied to each accepted asset.
#[derive(Debug, Clone)]
pub struct ToolStep {
    pub tool: &'static str,
    pub template: String,
    pub filter: AssetFilter,
    /// Extension of the file the tool writes, when it differs from the input.
    pub output_ext: Option<&'static str>,
}

impl ToolStep {
    pub fn new(tool: &'static str, template: impl Into<String>) -> Self {
        Self {
            tool,
            template: template.into(),
            filter: AssetFilter::all(),
            output_ext: None,
        }
    }

    pub fn only(mut self, filter: AssetFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn producing(mut self, ext: &'static str) -> Self {
        self.output_ext = Some(ext);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    MinifyHtml,
    MinifyCss,
    InlineImports,
    Tool(ToolStep),
    /// Collapse every asset into one bundle.
    ///
    /// With an `entry` that is among the assets, the bundler starts from it.
    /// Otherwise a generated entry imports every asset in path order and the
    /// bundle is named `index.js`.
    Bundle {
        tool: &'static str,
        template: String,
        entry: Option<String>,
    },
    Rename {
        suffix: Option<&'static str>,
        extension: Option<&'static str>,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::MinifyHtml => f.write_str("minify-html"),
            Step::MinifyCss => f.write_str("minify-css"),
            Step::InlineImports => f.write_str("inline-imports"),
            Step::Tool(t) => f.write_str(t.tool),
            Step::Bundle { tool, .. } => f.write_str(tool),
            Step::Rename { .. } => f.write_str("rename"),
        }
    }
}

impl Step {
    /// Whether the step consumes the whole asset list at once.
    pub fn is_collective(&self) -> bool {
        matches!(self, Step::Bundle { .. })
    }

    /// Apply a per-asset step.
    pub async fn apply(&self, mut asset: Asset, settings: &BuildSettings) -> Result<Asset> {
        match self {
            Step::MinifyHtml => {
                asset.contents = native::minify_html(asset.text()?).into_bytes();
            }
            Step::MinifyCss => {
                asset.contents = native::minify_css(asset.text()?)?.into_bytes();
            }
            Step::InlineImports => {
                // Imports resolve against the file on disk, so this reads the
                // original source rather than the in-memory contents.
                let source = asset.source.clone();
                let bundled = tokio::task::spawn_blocking(move || native::inline_imports(&source))
                    .await
                    .context("css import inlining panicked")??;
                asset.contents = bundled.into_bytes();
            }
            Step::Rename { suffix, extension } => {
                asset.rel_path = native::rename(&asset.rel_path, *suffix, *extension);
            }
            Step::Tool(tool) => {
                if !tool.filter.accepts(&asset) {
                    return Ok(asset);
                }
                let ext = asset.extension();
                let mut run = tool_run(
                    tool.tool,
                    &tool.template,
                    ToolInput::Bytes(&asset.contents),
                    &asset,
                    settings,
                );
                run.input_ext = ext.as_deref();
                run.output_ext = tool.output_ext;
                let out = run.run().await?;
                asset.contents = out;
            }
            Step::Bundle { .. } => bail!("{self} consumes every asset at once"),
        }
        Ok(asset)
    }

    /// Apply a collective step.
    pub async fn apply_all(&self, assets: Vec<Asset>, settings: &BuildSettings) -> Result<Vec<Asset>> {
        let Step::Bundle {
            tool,
            template,
            entry,
        } = self
        else {
            bail!("{self} is applied per asset");
        };

        let configured = entry
            .as_deref()
            .and_then(|entry| assets.iter().find(|a| a.rel_str() == entry).cloned());
        if let (Some(entry), None) = (entry, &configured) {
            warn!(
                entry = %entry,
                scripts = assets.len(),
                "bundle entry not found; bundling every script"
            );
        }

        // Lay the already transpiled modules out so relative imports resolve.
        let staging = tempfile::tempdir().context("creating bundle staging directory")?;
        for asset in &assets {
            let path = staging.path().join(&asset.rel_path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            tokio::fs::write(&path, &asset.contents)
                .await
                .with_context(|| format!("staging {}", path.display()))?;
        }

        let (entry_path, entry_asset) = match configured {
            Some(asset) => (staging.path().join(&asset.rel_path), asset),
            None => {
                let path = staging.path().join(GENERATED_ENTRY);
                tokio::fs::write(&path, aggregate_entry(&assets))
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                let asset = Asset {
                    rel_path: PathBuf::from("index.js"),
                    source: path.clone(),
                    contents: Vec::new(),
                };
                (path, asset)
            }
        };

        let run = tool_run(
            tool,
            template,
            ToolInput::File(&entry_path),
            &entry_asset,
            settings,
        );
        let contents = run.run().await?;

        Ok(vec![Asset {
            contents,
            ..entry_asset
        }])
    }
}

/// File name of the generated entry inside the staging directory.
const GENERATED_ENTRY: &str = "__sitepipe_entry.js";

/// One side-effect import per asset, in path order.
fn aggregate_entry(assets: &[Asset]) -> String {
    let mut rels: Vec<String> = assets.iter().map(Asset::rel_str).collect();
    rels.sort();
    rels.iter()
        .map(|rel| format!("import {:?};\n", format!("./{rel}")))
        .collect()
}

fn tool_run<'a>(
    tool: &'a str,
    template: &'a str,
    input: ToolInput<'a>,
    asset: &Asset,
    settings: &BuildSettings,
) -> ToolRun<'a> {
    let dir = asset
        .source
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();
    ToolRun::new(tool, template, input)
        .var("source", &asset.source)
        .var("dir", dir)
        .var("base", &settings.layout.dist)
        .var("css", settings.layout.dist.join(&settings.primary_stylesheet))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(rel: &str) -> Asset {
        Asset {
            rel_path: PathBuf::from(rel),
            source: PathBuf::from("/src").join(rel),
            contents: Vec::new(),
        }
    }

    #[test]
    fn generated_entry_imports_every_script_in_order() {
        let assets = [asset("modules/timer.js"), asset("main.js"), asset("a b.js")];
        assert_eq!(
            aggregate_entry(&assets),
            "import \"./a b.js\";\nimport \"./main.js\";\nimport \"./modules/timer.js\";\n"
        );
    }

    #[test]
    fn filter_skips_minified_scripts() {
        let filter = AssetFilter::all().skipping_suffix(".min.js");
        assert!(filter.accepts(&asset("app.js")));
        assert!(!filter.accepts(&asset("vendor/jquery.min.js")));
    }

    #[test]
    fn filter_matches_extensions_case_insensitively() {
        let filter = AssetFilter::extensions(&["jpg", "jpeg"]);
        assert!(filter.accepts(&asset("photo.JPG")));
        assert!(!filter.accepts(&asset("logo.png")));
    }
}
