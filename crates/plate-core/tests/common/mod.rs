#![allow(dead_code)]

use plate_core::{
    Converter, DataOutput, Editor, EditorConfig, ElementToElement, NodeRule, PlatePlugin,
    PluginRegistry, Priority, Schema, SchemaError, BLOCK,
};

/// Minimal block kind so the core can be exercised without feature crates.
pub struct BlockPlugin;

impl PlatePlugin for BlockPlugin {
    fn id(&self) -> &'static str {
        "test.block"
    }

    fn register_schema(&self, schema: &mut Schema) -> Result<(), SchemaError> {
        schema.register("block", NodeRule::new().inherit_all_from(BLOCK))
    }

    fn converters(&self) -> Vec<(Priority, Converter)> {
        vec![(
            Priority::Normal,
            Converter::Element(Box::new(ElementToElement::new("p", "block"))),
        )]
    }

    fn data_outputs(&self) -> Vec<DataOutput> {
        vec![DataOutput::Element {
            model: "block".into(),
            view: "p".into(),
        }]
    }
}

pub fn editor() -> Editor {
    Editor::with_plugins([Box::new(BlockPlugin) as Box<dyn PlatePlugin>]).unwrap()
}

pub fn editor_with(config: EditorConfig) -> Editor {
    let registry = PluginRegistry::new([Box::new(BlockPlugin) as Box<dyn PlatePlugin>]).unwrap();
    Editor::new(registry, config).unwrap()
}

pub fn editor_with_data(html: &str) -> Editor {
    let mut editor = editor();
    editor.set_data(html).unwrap();
    editor
}
