// src/pipeline/command.rs

//! External tool invocation.
//!
//! A tool is a shell command template. `{input}` and `{output}` are replaced
//! by temp file paths when present; otherwise the content is piped through
//! stdin and stdout. Every substituted value is shell-quoted.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// What a tool reads.
#[derive(Debug, Clone, Copy)]
pub enum ToolInput<'a> {
    /// In-memory content: written to a temp `{input}` file or piped to stdin.
    Bytes(&'a [u8]),
    /// An existing file, substituted for `{input}` as is.
    File(&'a Path),
}

/// One invocation of an external tool.
#[derive(Debug, Clone)]
pub struct ToolRun<'a> {
    /// Tool name, for diagnostics.
    pub tool: &'a str,
    pub template: &'a str,
    pub input: ToolInput<'a>,
    /// Extension for a temp `{input}` file.
    pub input_ext: Option<&'a str>,
    /// Extension for the temp `{output}` file.
    pub output_ext: Option<&'a str>,
    /// Extra placeholders (`source`, `dir`, `base`, `css`).
    pub vars: Vec<(&'static str, String)>,
}

impl<'a> ToolRun<'a> {
    pub fn new(tool: &'a str, template: &'a str, input: ToolInput<'a>) -> Self {
        Self {
            tool,
            template,
            input,
            input_ext: None,
            output_ext: None,
            vars: Vec::new(),
        }
    }

    pub fn var(mut self, key: &'static str, value: impl AsRef<Path>) -> Self {
        self.vars
            .push((key, value.as_ref().to_string_lossy().into_owned()));
        self
    }

    /// Run the tool and return what it produced.
    ///
    /// A non-zero exit status is an error carrying the tool's stderr.
    pub async fn run(self) -> Result<Vec<u8>> {
        let scratch = tempfile::tempdir().context("creating tool scratch directory")?;

        let uses_input = self.template.contains("{input}");
        let uses_output = self.template.contains("{output}");

        let mut stdin_bytes: Option<Vec<u8>> = None;
        let mut input_path: Option<PathBuf> = None;
        match (self.input, uses_input) {
            (ToolInput::File(path), true) => input_path = Some(path.to_path_buf()),
            (ToolInput::Bytes(bytes), true) => {
                let path = scratch.path().join(file_name("input", self.input_ext));
                tokio::fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("writing {} input file", self.tool))?;
                input_path = Some(path);
            }
            (ToolInput::File(path), false) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                stdin_bytes = Some(bytes);
            }
            (ToolInput::Bytes(bytes), false) => stdin_bytes = Some(bytes.to_vec()),
        }

        let output_path = uses_output.then(|| {
            scratch
                .path()
                .join(file_name("output", self.output_ext.or(self.input_ext)))
        });

        let mut vars = self.vars.clone();
        if let Some(path) = &input_path {
            vars.push(("input", path.to_string_lossy().into_owned()));
        }
        if let Some(path) = &output_path {
            vars.push(("output", path.to_string_lossy().into_owned()));
        }
        let command_line = render(self.template, &vars);
        debug!(tool = self.tool, cmd = %command_line, "running tool");

        let mut cmd = shell_command(&command_line);
        cmd.stdin(if stdin_bytes.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {} (`{command_line}`)", self.tool))?;

        // Feed stdin concurrently with draining stdout so large payloads
        // cannot deadlock on a full pipe.
        let writer = match (child.stdin.take(), stdin_bytes) {
            (Some(mut stdin), Some(bytes)) => Some(tokio::spawn(async move {
                let res = stdin.write_all(&bytes).await;
                drop(stdin);
                res
            })),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for {}", self.tool))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) => trace!(tool = self.tool, error = %e, "tool closed stdin early"),
                Ok(Ok(())) => {}
                Err(e) => bail!("{} stdin writer panicked: {e}", self.tool),
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.tool, output.status, stderr.trim());
        }

        match output_path {
            Some(path) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("{} did not write {}", self.tool, path.display())),
            None => Ok(output.stdout),
        }
    }
}

fn file_name(stem: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem.to_string(),
    }
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut c = Command::new("cmd");
    c.arg("/C").arg(line);
    c
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut c = Command::new("sh");
    c.arg("-c").arg(line);
    c
}

/// Substitute `{key}` placeholders with quoted values.
///
/// Unknown placeholders are left untouched.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), &quote(value));
    }
    out
}

#[cfg(not(windows))]
fn quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,@".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(windows)]
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn render_quotes_paths_with_spaces() {
        let line = render(
            "tool --in {input} --keep {unknown}",
            &[("input", "/tmp/my file.css".to_string())],
        );
        assert_eq!(line, "tool --in '/tmp/my file.css' --keep {unknown}");
    }

    #[test]
    fn render_escapes_single_quotes() {
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote("/plain/path.js"), "/plain/path.js");
    }

    #[tokio::test]
    async fn pipes_stdin_to_stdout() {
        let out = ToolRun::new("upper", "tr a-z A-Z", ToolInput::Bytes(b"body {}"))
            .run()
            .await
            .unwrap();
        assert_eq!(out, b"BODY {}");
    }

    #[tokio::test]
    async fn uses_temp_files_for_input_and_output_placeholders() {
        let mut run = ToolRun::new("copy", "cp {input} {output}", ToolInput::Bytes(b"png"));
        run.input_ext = Some("png");
        run.output_ext = Some("webp");
        assert_eq!(run.run().await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let err = ToolRun::new("broken", "echo boom >&2; exit 3", ToolInput::Bytes(b""))
            .run()
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("broken exited"), "{msg}");
        assert!(msg.contains("boom"), "{msg}");
    }

    #[tokio::test]
    async fn extra_vars_are_substituted() {
        let out = ToolRun::new("echo", "printf %s {css}", ToolInput::Bytes(b""))
            .var("css", "dist/css/index.css")
            .run()
            .await
            .unwrap();
        assert_eq!(out, b"dist/css/index.css");
    }
}
