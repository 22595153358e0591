use plate_core::{ChangesDone, ChangesDoneListener, Editor, Node, Op, Position};

use crate::PARAGRAPH;

/// Puts an empty paragraph into every root left without children.
///
/// A root emptied by a transparent batch is left alone, except on the
/// initial settle.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootFixer;

impl ChangesDoneListener for RootFixer {
    fn id(&self) -> &'static str {
        "paragraph.root_fixer"
    }

    fn changes_done(&self, editor: &Editor, event: &ChangesDone) -> Vec<Op> {
        let schema = editor.schema();
        let mut ops = Vec::new();

        for (name, root) in &editor.doc().roots {
            if !root.is_empty() || !schema.check(PARAGRAPH, &root.kind) {
                continue;
            }
            let emptied_by_user = event.initial
                || event
                    .last_batch_emptying(name)
                    .is_some_and(|batch| !batch.is_transparent());
            if !emptied_by_user {
                continue;
            }
            tracing::debug!(root = %name, "inserting paragraph into empty root");
            ops.push(Op::InsertNode {
                at: Position::new(name.clone(), vec![0]),
                node: Node::element(PARAGRAPH, Vec::new()),
            });
        }
        ops
    }
}
