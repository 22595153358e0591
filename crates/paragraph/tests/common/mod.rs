#![allow(dead_code)]

use std::sync::Once;

use plate_core::dev_utils::{get_model_data, stringify};
use plate_core::{Editor, PlatePlugin, MAIN_ROOT};
use plate_paragraph::ParagraphPlugin;
use tracing_subscriber::EnvFilter;

static LOGGING: Once = Once::new();

/// Routes `tracing` output through the test harness; `RUST_LOG` picks the level.
pub fn init_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub fn editor() -> Editor {
    init_logging();
    Editor::with_plugins([Box::new(ParagraphPlugin::new()) as Box<dyn PlatePlugin>]).unwrap()
}

pub fn model(editor: &Editor) -> String {
    get_model_data(editor, MAIN_ROOT)
}

pub fn parse(editor: &Editor, html: &str, context: &str) -> String {
    stringify(&editor.parse(html, context))
}
