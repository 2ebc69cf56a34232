// src/serve/mod.rs

//! Watch server: static HTTP over the output directory plus the live-reload
//! channel the transformers notify.

pub mod reload;
pub mod server;

pub use reload::{LiveReload, ReloadEvent};
pub use server::{ServerHandle, start};
