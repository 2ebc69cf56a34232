// src/pipeline/catalog.rs

//! The concrete transformers, resolved against one `BuildSettings`.

use std::sync::Arc;

use crate::config::ToolConfig;
use crate::pipeline::{AssetFilter, ErrorPolicy, ReloadKind, SourceSet, Step, ToolStep, Transformer};
use crate::serve::reload::LiveReload;
use crate::settings::BuildSettings;
use crate::tasks::names;
use crate::types::StyleVariant;

/// Image formats the optimisers and the webp/avif encoders accept.
const RASTER_GLOB: &str = "**/*.{jpg,jpeg,png}";
const IMAGE_GLOB: &str = "**/*.{jpg,jpeg,png,svg,gif}";

/// Every transformer of the `base` group, in a stable order.
pub fn transformers(settings: &Arc<BuildSettings>, reload: &LiveReload) -> Vec<Transformer> {
    vec![
        html(settings, reload),
        style(settings, reload),
        script(settings, reload),
        image(settings, reload),
        webp(settings, reload),
        avif(settings, reload),
        fonts(settings, reload),
        favicon(settings, reload),
    ]
}

fn new(
    name: &'static str,
    sources: SourceSet,
    dest_sub: &str,
    settings: &Arc<BuildSettings>,
    reload: &LiveReload,
) -> Transformer {
    let dist = &settings.layout.dist;
    let dest = if dest_sub.is_empty() {
        dist.clone()
    } else {
        dist.join(dest_sub)
    };
    Transformer::new(name, sources, dest, Arc::clone(settings), reload.clone())
}

fn template(settings: &BuildSettings, tool: &ToolConfig) -> String {
    tool.template_for(settings.is_development()).to_string()
}

pub fn html(settings: &Arc<BuildSettings>, reload: &LiveReload) -> Transformer {
    let sources = SourceSet::new(&settings.layout.src, ["*.html"]);
    new(names::HTML, sources, "", settings, reload).step(Step::MinifyHtml)
}

pub fn style(settings: &Arc<BuildSettings>, reload: &LiveReload) -> Transformer {
    let src = &settings.layout.src;
    let tools = &settings.tools;
    let autoprefixer = Step::Tool(ToolStep::new("autoprefixer", template(settings, &tools.autoprefixer)));

    let t = match settings.style {
        StyleVariant::Scss => {
            let sources = SourceSet::new(src.join("scss"), ["**/*.scss"]).ignoring(["**/_*.scss"]);
            new(names::STYLE, sources, "css", settings, reload)
                .step(Step::Tool(ToolStep::new("sass", template(settings, &tools.sass))))
                .step(Step::Rename {
                    suffix: None,
                    extension: Some("css"),
                })
        }
        StyleVariant::Css => {
            let sources = SourceSet::new(src.join("css"), ["**/*.css"]);
            new(names::STYLE, sources, "css", settings, reload).step(Step::InlineImports)
        }
    };

    t.step(autoprefixer)
        .step(Step::MinifyCss)
        .policy(ErrorPolicy::ReportAndContinue)
        .reload_kind(ReloadKind::Stylesheet)
}

pub fn script(settings: &Arc<BuildSettings>, reload: &LiveReload) -> Transformer {
    let tools = &settings.tools;
    let sources = SourceSet::new(settings.layout.src.join("script"), ["**/*.js"]);

    let mut t = new(names::JS, sources, "script", settings, reload)
        .step(Step::Tool(
            ToolStep::new("babel", template(settings, &tools.babel))
                .only(AssetFilter::all().skipping_suffix(".min.js")),
        ))
        .step(Step::Bundle {
            tool: "bundler",
            template: template(settings, &tools.bundler),
            entry: settings.script_entry.clone(),
        });

    if !settings.is_development() {
        t = t.step(Step::Tool(ToolStep::new("terser", template(settings, &tools.terser))));
    }

    t.step(Step::Rename {
        suffix: Some(".min"),
        extension: None,
    })
}

pub fn image(settings: &Arc<BuildSettings>, reload: &LiveReload) -> Transformer {
    let tools = &settings.tools;
    let sources = SourceSet::new(settings.layout.src.join("image"), [IMAGE_GLOB]);
    let t = new(names::IMG, sources, "image", settings, reload);

    if settings.is_development() {
        return t;
    }

    let optimiser = |tool: &'static str, cfg: &ToolConfig, exts: &[&'static str]| {
        Step::Tool(ToolStep::new(tool, template(settings, cfg)).only(AssetFilter::extensions(exts)))
    };
    t.step(optimiser("png", &tools.png, &["png"]))
        .step(optimiser("jpeg", &tools.jpeg, &["jpg", "jpeg"]))
        .step(optimiser("svg", &tools.svg, &["svg"]))
        .step(optimiser("gif", &tools.gif, &["gif"]))
}

pub fn webp(settings: &Arc<BuildSettings>, reload: &LiveReload) -> Transformer {
    encoder(names::WEBP, "webp", &settings.tools.webp, settings, reload)
}

pub fn avif(settings: &Arc<BuildSettings>, reload: &LiveReload) -> Transformer {
    encoder(names::AVIF, "avif", &settings.tools.avif, settings, reload)
}

fn encoder(
    name: &'static str,
    ext: &'static str,
    tool: &ToolConfig,
    settings: &Arc<BuildSettings>,
    reload: &LiveReload,
) -> Transformer {
    let sources = SourceSet::new(settings.layout.src.join("image"), [RASTER_GLOB]);
    new(name, sources, "image", settings, reload)
        .step(Step::Tool(ToolStep::new(name, template(settings, tool)).producing(ext)))
        .step(Step::Rename {
            suffix: None,
            extension: Some(ext),
        })
}

pub fn fonts(settings: &Arc<BuildSettings>, reload: &LiveReload) -> Transformer {
    let sources = SourceSet::new(settings.layout.src.join("fonts"), ["**/*"]);
    new(names::COPY, sources, "fonts", settings, reload)
}

pub fn favicon(settings: &Arc<BuildSettings>, reload: &LiveReload) -> Transformer {
    let sources = SourceSet::new(settings.layout.src.join("favicon"), ["**/*"]);
    new(names::FAVICON, sources, "favicon", settings, reload)
}
