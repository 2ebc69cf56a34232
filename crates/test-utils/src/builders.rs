#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitepipe::config::{ConfigFile, load_and_validate};
use sitepipe::dag::TaskSpec;
use sitepipe::settings::BuildSettings;
use sitepipe::types::Mode;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Shell stand-ins for the external tools, so pipelines run without node
/// or image codecs installed.
///
/// Development variants leave a visible source-map marker; the production
/// script "minifier" strips all whitespace. The bundler concatenates the
/// modules a generated entry imports.
pub const STAND_IN_TOOLS: &str = r#"
[tools.sass]
cmd = "cat"
dev_cmd = '''cat; printf '\n/*# sourceMappingURL=data:dev */\n' '''

[tools.autoprefixer]
cmd = "cat"

[tools.babel]
cmd = "cat"

[tools.bundler]
cmd = '''case {input} in *__sitepipe_entry.js) d=$(dirname {input}); sed -n 's|^import "\./\(.*\)";$|\1|p' {input} | while IFS= read -r f; do cat "$d/$f"; done;; *) cat {input};; esac'''
dev_cmd = '''case {input} in *__sitepipe_entry.js) d=$(dirname {input}); sed -n 's|^import "\./\(.*\)";$|\1|p' {input} | while IFS= read -r f; do cat "$d/$f"; done;; *) cat {input};; esac; printf '\n//# sourceMappingURL=data:dev\n' '''

[tools.terser]
cmd = '''tr -d ' \n' '''

[tools.png]
cmd = "cat"

[tools.jpeg]
cmd = "cat {input}"

[tools.svg]
cmd = "cat"

[tools.gif]
cmd = "cat"

[tools.webp]
cmd = "cp {input} {output}"

[tools.avif]
cmd = "cp {input} {output}"

[tools.critical]
cmd = '''printf '<style>critical</style>'; cat {input}'''
"#;

/// Builder for a throwaway project directory with a `Sitepipe.toml`.
pub struct SiteBuilder {
    files: Vec<(String, Vec<u8>)>,
    config: String,
    tools: String,
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            config: String::new(),
            tools: STAND_IN_TOOLS.to_string(),
        }
    }

    /// Add a file, path relative to the project root.
    pub fn file(mut self, rel: &str, contents: impl AsRef<[u8]>) -> Self {
        self.files.push((rel.to_string(), contents.as_ref().to_vec()));
        self
    }

    /// Extra `key = value` lines for the `[config]` table.
    pub fn config_line(mut self, line: &str) -> Self {
        self.config.push_str(line);
        self.config.push('\n');
        self
    }

    /// Replace one tool's production command (appended after the defaults,
    /// so it must not repeat a table header already present).
    pub fn tool(mut self, name: &str, cmd: &str) -> Self {
        let header = format!("[tools.{name}]");
        if let Some(start) = self.tools.find(&header) {
            let rest = &self.tools[start + header.len()..];
            let end = rest
                .find("\n[")
                .map(|i| start + header.len() + i + 1)
                .unwrap_or(self.tools.len());
            self.tools.replace_range(start..end, "");
        }
        self.tools
            .push_str(&format!("\n{header}\ncmd = '''{cmd}'''\n"));
        self
    }

    pub fn build(self) -> Site {
        let dir = tempfile::tempdir().expect("create temp project");
        for (rel, contents) in &self.files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().expect("file has a parent")).expect("mkdir");
            fs::write(&path, contents).expect("write project file");
        }

        let toml = format!("[config]\n{}\n{}", self.config, self.tools);
        let config_path = dir.path().join("Sitepipe.toml");
        fs::write(&config_path, toml).expect("write config");

        Site { dir, config_path }
    }
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A built project on disk.
pub struct Site {
    dir: TempDir,
    pub config_path: PathBuf,
}

impl Site {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn config(&self) -> ConfigFile {
        load_and_validate(&self.config_path).expect("valid test config")
    }

    pub fn settings(&self, mode: Mode) -> Arc<BuildSettings> {
        Arc::new(BuildSettings::from_config(&self.config(), self.root(), mode))
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap_or_else(|e| panic!("reading {rel}: {e}"))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    /// Every file under `rel`, as sorted `(relative path, contents)` pairs.
    pub fn tree(&self, rel: &str) -> Vec<(String, Vec<u8>)> {
        let base = self.path(rel);
        let mut out: Vec<_> = WalkDir::new(&base)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                let rel = entry
                    .path()
                    .strip_prefix(&base)
                    .expect("under base")
                    .to_string_lossy()
                    .replace('\\', "/");
                (rel, fs::read(entry.path()).expect("read output"))
            })
            .collect();
        out.sort();
        out
    }
}

/// Linear chain `names[0] -> names[1] -> ...`.
pub fn chain(names: &[&str]) -> Vec<TaskSpec> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let spec = TaskSpec::new(*name);
            if i == 0 {
                spec
            } else {
                spec.after([names[i - 1]])
            }
        })
        .collect()
}
