//! The `paragraph` block: schema item, `<p>` conversion, autoparagraphing of
//! loose inline content, repair of empty roots and the `paragraph` command.

mod autoparagraph;
mod command;
mod root_fixer;

use plate_core::{
    ChangesDoneListener, CommandSpec, Converter, DataOutput, ElementToElement, NodeRule,
    PlatePlugin, Priority, Schema, SchemaError, BLOCK,
};
pub use plate_core::{ParagraphLikeElements, ParagraphLikeError};

pub use crate::autoparagraph::Autoparagraph;
pub use crate::command::{ParagraphCommand, ParagraphCommandOptions};
pub use crate::root_fixer::RootFixer;

pub const PARAGRAPH: &str = "paragraph";

/// Registers the standard paragraph-like elements unless configured with
/// another set. Other plugins add theirs through
/// [`PlatePlugin::paragraph_like_elements`].
#[derive(Debug, Clone)]
pub struct ParagraphPlugin {
    paragraph_like: ParagraphLikeElements,
}

impl Default for ParagraphPlugin {
    fn default() -> Self {
        Self::with_paragraph_like(ParagraphLikeElements::standard())
    }
}

impl ParagraphPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paragraph_like(paragraph_like: ParagraphLikeElements) -> Self {
        Self { paragraph_like }
    }

    pub fn paragraph_like(&self) -> &ParagraphLikeElements {
        &self.paragraph_like
    }

    /// Extend the set before the plugin is registered.
    pub fn paragraph_like_mut(&mut self) -> &mut ParagraphLikeElements {
        &mut self.paragraph_like
    }
}

impl PlatePlugin for ParagraphPlugin {
    fn id(&self) -> &'static str {
        "paragraph"
    }

    fn register_schema(&self, schema: &mut Schema) -> Result<(), SchemaError> {
        schema.register(PARAGRAPH, NodeRule::new().inherit_all_from(BLOCK))
    }

    fn converters(&self) -> Vec<(Priority, Converter)> {
        vec![
            (
                Priority::Normal,
                Converter::Element(Box::new(ElementToElement::new("p", PARAGRAPH))),
            ),
            (
                Priority::Lowest,
                Converter::Children(Box::new(Autoparagraph)),
            ),
        ]
    }

    fn paragraph_like_elements(&self, set: &mut ParagraphLikeElements) -> Result<(), ParagraphLikeError> {
        for name in self.paragraph_like.iter() {
            set.insert(name)?;
        }
        Ok(())
    }

    fn data_outputs(&self) -> Vec<DataOutput> {
        vec![DataOutput::Element {
            model: PARAGRAPH.to_string(),
            view: "p".to_string(),
        }]
    }

    fn listeners(&self) -> Vec<(Priority, Box<dyn ChangesDoneListener>)> {
        let fixer: Box<dyn ChangesDoneListener> = Box::new(RootFixer);
        vec![(Priority::Lowest, fixer)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![ParagraphCommand::spec()]
    }
}
