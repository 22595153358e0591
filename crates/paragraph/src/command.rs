use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use plate_core::{
    BatchHandle, BatchKind, CommandError, CommandSpec, CommandState, Editor, Position, Selection,
};

use crate::PARAGRAPH;

/// Arguments of the `paragraph` command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphCommandOptions {
    /// Batch to record the renames in; a new default batch when absent.
    pub batch: Option<BatchHandle>,
    /// Selection to act on instead of the document selection.
    pub selection: Option<Selection>,
}

pub struct ParagraphCommand;

impl ParagraphCommand {
    pub const ID: &'static str = "paragraph";

    pub fn spec() -> CommandSpec {
        CommandSpec::new(Self::ID, "Paragraph", |editor, args| {
            let options = match args {
                Some(args) => serde_json::from_value(args).map_err(|source| {
                    CommandError::InvalidArgs {
                        command: Self::ID.to_string(),
                        source,
                    }
                })?,
                None => ParagraphCommandOptions::default(),
            };
            Self::execute(editor, options)
        })
        .description("Turn the selected blocks into paragraphs")
        .keywords(["paragraph", "text", "normal"])
        .args_example(json!({ "selection": null, "batch": null }))
        .refresh(Self::state)
    }

    pub fn state(editor: &Editor) -> CommandState {
        let Some(block) = editor.first_selected_block() else {
            return CommandState {
                value: Value::Bool(false),
                is_enabled: false,
            };
        };
        let is_paragraph = editor.doc().node(&block).is_some_and(|n| n.is(PARAGRAPH));
        CommandState {
            value: Value::Bool(is_paragraph),
            is_enabled: can_be_paragraph(editor, &block),
        }
    }

    pub fn execute(editor: &mut Editor, options: ParagraphCommandOptions) -> Result<(), CommandError> {
        let selection = options
            .selection
            .unwrap_or_else(|| editor.selection().clone());
        let targets: Vec<Position> = editor
            .selected_blocks(&selection)
            .into_iter()
            .filter(|block| {
                let is_paragraph = editor.doc().node(block).is_some_and(|n| n.is(PARAGRAPH));
                !is_paragraph && can_be_paragraph(editor, block)
            })
            .collect();

        let batch = options
            .batch
            .unwrap_or_else(|| editor.create_batch(BatchKind::Default));
        tracing::debug!(blocks = targets.len(), batch = ?batch.id, "retyping blocks to paragraph");

        editor.change_in(&batch, |writer| {
            for block in &targets {
                writer.rename(block, PARAGRAPH)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

fn can_be_paragraph(editor: &Editor, block: &Position) -> bool {
    editor
        .doc()
        .parent_element(block)
        .is_some_and(|parent| editor.schema().check(PARAGRAPH, &parent.kind))
}
