use std::fmt;

use serde::Deserialize;

/// Build mode, chosen once before the task graph is constructed.
///
/// Transformers never read a global flag; they receive the mode inside
/// [`crate::settings::BuildSettings`] when the graph is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Development,
    #[default]
    Production,
}

impl Mode {
    pub fn is_development(self) -> bool {
        matches!(self, Mode::Development)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => f.write_str("development"),
            Mode::Production => f.write_str("production"),
        }
    }
}

/// Which stylesheet source the `style` task compiles.
///
/// - `Scss`: `src/scss/**/*.scss` through the sass compiler.
/// - `Css`: `src/css/**/*.css` with `@import` inlining instead of compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleVariant {
    #[default]
    Scss,
    Css,
}

