// src/config/model.rs

use serde::Deserialize;

use crate::types::StyleVariant;

/// Top-level configuration as read from `Sitepipe.toml`.
///
/// ```toml
/// [config]
/// src = "src"
/// dist = "dist"
/// style = "scss"
/// port = 3000
///
/// [tools.webp]
/// cmd = "cwebp -quiet -q 80 {input} -o {output}"
/// ```
///
/// All sections are optional and have reasonable defaults. This raw form is
/// what `toml` deserializes into; it becomes a [`ConfigFile`] only after
/// validation (see `config::validate`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Layout and server settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// External tool commands from `[tools.<name>]`.
    #[serde(default)]
    pub tools: ToolsSection,
}

/// Validated configuration.
///
/// Construct through `ConfigFile::try_from(raw)` or
/// `config::load_and_validate`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    tools: ToolsSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, tools: ToolsSection) -> Self {
        Self { config, tools }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn tools(&self) -> &ToolsSection {
        &self.tools
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigSection {
    /// Source directory, relative to the project root.
    pub src: String,

    /// Output directory, relative to the project root. Wiped by `build`.
    pub dist: String,

    /// `"scss"` (default) or `"css"`.
    pub style: StyleVariant,

    /// Address the dev server binds to.
    pub host: String,

    /// Dev server port; `0` picks an ephemeral port.
    pub port: u16,

    /// Stylesheet (relative to `dist`) handed to the critical-CSS tool.
    pub primary_stylesheet: String,

    /// Bundle entry point, relative to `src/script`. When unset (or missing
    /// on disk) every script is bundled into `index.js`.
    pub script_entry: Option<String>,

    /// Maximum number of queued re-runs remembered while tasks are running.
    pub queue_length: usize,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            src: "src".to_string(),
            dist: "dist".to_string(),
            style: StyleVariant::default(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            primary_stylesheet: "css/index.css".to_string(),
            script_entry: None,
            queue_length: 1,
        }
    }
}

/// One external tool invocation.
///
/// `cmd` is a shell command template; `dev_cmd`, when set, replaces it in
/// development mode. See `pipeline::command` for the placeholders.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    pub cmd: String,

    #[serde(default)]
    pub dev_cmd: Option<String>,
}

impl ToolConfig {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            dev_cmd: None,
        }
    }

    pub fn with_dev(mut self, dev_cmd: impl Into<String>) -> Self {
        self.dev_cmd = Some(dev_cmd.into());
        self
    }

    /// Command template to use for the given mode.
    pub fn template_for(&self, dev: bool) -> &str {
        match (&self.dev_cmd, dev) {
            (Some(dev_cmd), true) => dev_cmd,
            _ => &self.cmd,
        }
    }
}

/// `[tools]` section: every external program the pipelines call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub sass: ToolConfig,
    pub autoprefixer: ToolConfig,
    pub babel: ToolConfig,
    pub bundler: ToolConfig,
    pub terser: ToolConfig,
    pub png: ToolConfig,
    pub jpeg: ToolConfig,
    pub svg: ToolConfig,
    pub gif: ToolConfig,
    pub webp: ToolConfig,
    pub avif: ToolConfig,
    pub critical: ToolConfig,
}

impl ToolsSection {
    /// `(name, tool)` pairs, used for validation and `--dry-run` output.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ToolConfig)> {
        [
            ("sass", &self.sass),
            ("autoprefixer", &self.autoprefixer),
            ("babel", &self.babel),
            ("bundler", &self.bundler),
            ("terser", &self.terser),
            ("png", &self.png),
            ("jpeg", &self.jpeg),
            ("svg", &self.svg),
            ("gif", &self.gif),
            ("webp", &self.webp),
            ("avif", &self.avif),
            ("critical", &self.critical),
        ]
        .into_iter()
    }
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sass: ToolConfig::new("sass --no-source-map --load-path={dir} --stdin")
                .with_dev("sass --embed-source-map --load-path={dir} --stdin"),
            autoprefixer: ToolConfig::new("postcss --use autoprefixer --no-map"),
            babel: ToolConfig::new("babel --presets @babel/preset-env --filename {source}"),
            bundler: ToolConfig::new("esbuild {input} --bundle --format=iife")
                .with_dev("esbuild {input} --bundle --format=iife --sourcemap=inline"),
            terser: ToolConfig::new("terser --compress --mangle"),
            png: ToolConfig::new("optipng -quiet -o4 -strip all -out {output} {input}"),
            jpeg: ToolConfig::new("jpegoptim --strip-all --max=90 --stdout {input}"),
            svg: ToolConfig::new("svgo --input - --output -"),
            gif: ToolConfig::new("gifsicle --optimize"),
            webp: ToolConfig::new("cwebp -quiet -q 70 {input} -o {output}"),
            avif: ToolConfig::new("avifenc -q 70 {input} {output}"),
            critical: ToolConfig::new("critical {input} --base {base} --inline --css {css}"),
        }
    }
}
