// src/pipeline/native.rs

//! Text transforms done in-process: HTML and CSS minification, CSS
//! `@import` inlining and file renaming.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use lightningcss::bundler::{Bundler, FileProvider};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use regex::{Captures, Regex};

/// Blocks whose contents must survive minification byte for byte.
static PRESERVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
    )
    .expect("static regex")
});

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// A start or end tag; quoted attribute values may contain `>`.
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:"[^"]*"|'[^']*'|[^'">])*>"#).expect("static regex")
});

/// Inside a tag: quoted values (kept) or a whitespace run (collapsed).
static TAG_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'|\s+"#).expect("static regex"));

/// Whitespace around these tags never renders, so it can go entirely.
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s*(</?(?:!doctype|html|head|body|title|meta|link|base|div|p|ul|ol|li|dl|dt|dd|section|article|header|footer|nav|main|aside|figure|figcaption|table|thead|tbody|tfoot|tr|td|th|form|fieldset|h[1-6]|hr|br|noscript)\b[^>]*>)\s*",
    )
    .expect("static regex")
});

static SOURCE_MAP_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*#.*?\*/").expect("static regex"));

/// Strip comments and collapse whitespace.
///
/// Conditional comments and the contents of `pre`, `textarea`, `script` and
/// `style` elements are kept verbatim.
pub fn minify_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for m in PRESERVED.find_iter(html) {
        out.push_str(&collapse_html_text(&html[last..m.start()]));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&collapse_html_text(&html[last..]));
    out.trim().to_string()
}

fn collapse_html_text(text: &str) -> String {
    let without_comments = COMMENT.replace_all(text, |caps: &Captures| {
        let comment = &caps[0];
        if comment.starts_with("<!--[if") || comment.starts_with("<!--<![endif]") {
            comment.to_string()
        } else {
            String::new()
        }
    });

    let mut collapsed = String::with_capacity(without_comments.len());
    let mut last = 0;
    for tag in TAG.find_iter(&without_comments) {
        collapsed.push_str(&WHITESPACE.replace_all(&without_comments[last..tag.start()], " "));
        collapsed.push_str(&TAG_PART.replace_all(tag.as_str(), |caps: &Captures| {
            let part = &caps[0];
            if part.starts_with(['"', '\'']) {
                part.to_string()
            } else {
                " ".to_string()
            }
        }));
        last = tag.end();
    }
    collapsed.push_str(&WHITESPACE.replace_all(&without_comments[last..], " "));

    BLOCK_TAG.replace_all(&collapsed, "$1").into_owned()
}

/// Minify a stylesheet.
///
/// `/*# ... */` comments (source map references) survive and are moved to
/// the end of the output.
pub fn minify_css(css: &str) -> Result<String> {
    let source_maps: Vec<&str> = SOURCE_MAP_COMMENT.find_iter(css).map(|m| m.as_str()).collect();

    let mut sheet =
        StyleSheet::parse(css, ParserOptions::default()).map_err(|e| anyhow!("parsing css: {e}"))?;
    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| anyhow!("minifying css: {e}"))?;
    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("printing css: {e}"))?;

    let mut out = printed.code.trim().to_string();
    for comment in source_maps {
        out.push_str(comment);
    }
    Ok(out)
}

/// Bundle `entry` with every local stylesheet it `@import`s, recursively.
///
/// Imports resolve relative to the importing file.
pub fn inline_imports(entry: &Path) -> Result<String> {
    let fs = FileProvider::new();
    let mut bundler = Bundler::new(&fs, None, ParserOptions::default());
    let sheet = bundler
        .bundle(entry)
        .map_err(|e| anyhow!("bundling {}: {e}", entry.display()))?;
    let printed = sheet
        .to_css(PrinterOptions::default())
        .map_err(|e| anyhow!("printing {}: {e}", entry.display()))?;
    Ok(printed.code)
}

/// `a/b/index.js` + suffix `.min` -> `a/b/index.min.js`; an extension swaps
/// the final extension.
pub fn rename(rel: &Path, suffix: Option<&str>, extension: Option<&str>) -> PathBuf {
    let stem = rel
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = match extension {
        Some(ext) => Some(ext.to_string()),
        None => rel.extension().map(|e| e.to_string_lossy().into_owned()),
    };

    let mut name = stem;
    if let Some(suffix) = suffix {
        name.push_str(suffix);
    }
    if let Some(ext) = ext {
        name.push('.');
        name.push_str(&ext);
    }
    rel.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn html_comments_and_whitespace_are_removed() {
        let html = "<!DOCTYPE html>\n<html>\n  <head>\n    <!-- note -->\n    <title>Hi</title>\n  </head>\n  <body>\n    <p>Hello   <b>big</b>   world</p>\n  </body>\n</html>\n";
        assert_eq!(
            minify_html(html),
            "<!DOCTYPE html><html><head><title>Hi</title></head><body><p>Hello <b>big</b> world</p></body></html>"
        );
    }

    #[test]
    fn html_preserved_blocks_and_conditional_comments_survive() {
        let html = "<div>\n<pre>  a\n   b</pre>\n<script>\n  // <!-- keep -->\n  let x = 1;\n</script>\n<!--[if IE]><p>old</p><![endif]-->\n</div>";
        let min = minify_html(html);
        assert!(min.contains("<pre>  a\n   b</pre>"));
        assert!(min.contains("<script>\n  // <!-- keep -->\n  let x = 1;\n</script>"));
        assert!(min.contains("<!--[if IE]>"));
    }

    #[test]
    fn html_attribute_values_keep_their_whitespace() {
        let html = "<p\n   class=\"a  b\">\n  <img alt='two   spaces'   src=\"x.png\">  text   here</p>";
        assert_eq!(
            minify_html(html),
            "<p class=\"a  b\"><img alt='two   spaces' src=\"x.png\"> text here</p>"
        );
    }

    #[test]
    fn css_is_compacted() {
        let css = "/* header */\nbody {\n  color: red;\n  margin : 0 auto;\n}\n\na > b,\nc { content: \"a  ;  b\"; }\n";
        assert_eq!(
            minify_css(css).unwrap(),
            "body{color:red;margin:0 auto}a>b,c{content:\"a  ;  b\"}"
        );
    }

    #[test]
    fn css_keeps_source_map_comment_and_calc_spacing() {
        let css = ".a { width: calc(100% - 2px); }\n/*# sourceMappingURL=data:abc */\n";
        assert_eq!(
            minify_css(css).unwrap(),
            ".a{width:calc(100% - 2px)}/*# sourceMappingURL=data:abc */"
        );
    }

    #[test]
    fn imports_are_inlined_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("parts")).unwrap();
        fs::write(dir.path().join("parts/a.css"), "@import 'b.css';\n.a { padding: 0 }").unwrap();
        fs::write(dir.path().join("parts/b.css"), ".b { margin: 0 }").unwrap();
        let entry = dir.path().join("index.css");
        fs::write(&entry, "@import url(\"parts/a.css\");\n.root { color: red }").unwrap();

        let out = minify_css(&inline_imports(&entry).unwrap()).unwrap();
        assert_eq!(out, ".b{margin:0}.a{padding:0}.root{color:red}");
    }

    #[test]
    fn missing_import_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("index.css");
        fs::write(&entry, "@import 'nope.css';\n.x { color: red }").unwrap();

        let err = inline_imports(&entry).unwrap_err();
        assert!(format!("{err:#}").contains("index.css"));
    }

    #[test]
    fn rename_applies_suffix_and_extension() {
        assert_eq!(
            rename(Path::new("lib/index.js"), Some(".min"), None),
            PathBuf::from("lib/index.min.js")
        );
        assert_eq!(
            rename(Path::new("photos/cat.jpg"), None, Some("webp")),
            PathBuf::from("photos/cat.webp")
        );
        assert_eq!(
            rename(Path::new("main.scss"), None, Some("css")),
            PathBuf::from("main.css")
        );
    }
}
