mod common;

use plate_core::dev_utils::{get_model_data, parse_model};
use plate_core::{BatchKind, EditorConfig, Position, Selection, MAIN_ROOT};
use pretty_assertions::assert_eq;

use common::{editor_with, editor_with_data};

fn pos(path: &[usize]) -> Position {
    Position::new(MAIN_ROOT, path.to_vec())
}

#[test]
fn undo_redo_restores_tree_and_selection() {
    let mut editor = editor_with_data("<p>a</p>");
    assert!(!editor.can_undo());
    let selection_before = editor.selection().clone();
    assert_eq!(selection_before, Selection::collapsed(pos(&[0, 0])));

    editor
        .change(|writer| {
            for node in parse_model("<block>b</block>") {
                writer.insert(node, &pos(&[1]))?;
            }
            writer.set_selection(Selection::collapsed(pos(&[1, 0])));
            Ok(())
        })
        .unwrap();
    assert_eq!(
        get_model_data(&editor, MAIN_ROOT),
        "<block>a</block><block>b</block>"
    );
    let selection_after = editor.selection().clone();

    assert!(editor.undo().unwrap());
    assert_eq!(get_model_data(&editor, MAIN_ROOT), "<block>a</block>");
    assert_eq!(editor.selection(), &selection_before);

    assert!(editor.redo().unwrap());
    assert_eq!(
        get_model_data(&editor, MAIN_ROOT),
        "<block>a</block><block>b</block>"
    );
    assert_eq!(editor.selection(), &selection_after);
}

#[test]
fn undo_redo_handles_multi_op_batch_order() {
    let mut editor = editor_with_data("<p>xyz</p>");

    editor
        .change(|writer| {
            writer.rename(&pos(&[0]), "other")?;
            writer.set_attribute(&pos(&[0]), "level", serde_json::json!(2))?;
            writer.rename(&pos(&[0]), "block")?;
            writer.remove(&pos(&[0, 0]))?;
            Ok(())
        })
        .unwrap();
    assert_eq!(get_model_data(&editor, MAIN_ROOT), r#"<block level="2"></block>"#);

    assert!(editor.undo().unwrap());
    assert_eq!(get_model_data(&editor, MAIN_ROOT), "<block>xyz</block>");
    assert!(!editor.can_undo());

    assert!(editor.redo().unwrap());
    assert_eq!(get_model_data(&editor, MAIN_ROOT), r#"<block level="2"></block>"#);
}

#[test]
fn changes_in_one_batch_undo_together() {
    let mut editor = editor_with_data("<p>a</p>");
    let batch = editor.create_batch(BatchKind::Default);

    editor
        .change_in(&batch, |writer| writer.insert_element("block", &pos(&[1])))
        .unwrap();
    editor
        .change_in(&batch, |writer| writer.insert_element("block", &pos(&[2])))
        .unwrap();
    assert_eq!(editor.root(MAIN_ROOT).unwrap().children.len(), 3);

    assert!(editor.undo().unwrap());
    assert_eq!(get_model_data(&editor, MAIN_ROOT), "<block>a</block>");
    assert!(!editor.can_undo());
}

#[test]
fn transparent_batches_are_not_recorded() {
    let mut editor = editor_with_data("<p>a</p>");

    editor
        .enqueue_change(BatchKind::Transparent, |writer| {
            writer.insert_element("block", &pos(&[1]))
        })
        .unwrap();

    assert_eq!(editor.root(MAIN_ROOT).unwrap().children.len(), 2);
    assert!(!editor.can_undo());
    assert!(!editor.undo().unwrap());
}

#[test]
fn new_change_clears_redo() {
    let mut editor = editor_with_data("<p>a</p>");
    editor
        .change(|writer| writer.insert_element("block", &pos(&[1])))
        .unwrap();
    assert!(editor.undo().unwrap());
    assert!(editor.can_redo());

    editor
        .change(|writer| writer.insert_element("block", &pos(&[0])))
        .unwrap();
    assert!(!editor.can_redo());
    assert!(!editor.redo().unwrap());
}

#[test]
fn history_is_capped_by_config() {
    let mut editor = editor_with(EditorConfig {
        max_undo: 2,
        ..EditorConfig::default()
    });
    for ix in 0..3 {
        editor
            .change(|writer| writer.insert_element("block", &pos(&[ix])))
            .unwrap();
    }

    assert!(editor.undo().unwrap());
    assert!(editor.undo().unwrap());
    assert!(!editor.undo().unwrap());
    assert_eq!(editor.root(MAIN_ROOT).unwrap().children.len(), 1);
}

#[test]
fn removed_attribute_comes_back_on_undo() {
    let mut editor = editor_with_data("<p>a</p>");
    editor
        .change(|writer| writer.set_attribute(&pos(&[0]), "level", serde_json::json!(2)))
        .unwrap();
    editor
        .change(|writer| writer.remove_attribute(&pos(&[0]), "level"))
        .unwrap();
    assert_eq!(get_model_data(&editor, MAIN_ROOT), "<block>a</block>");

    assert!(editor.undo().unwrap());
    assert_eq!(get_model_data(&editor, MAIN_ROOT), r#"<block level="2">a</block>"#);
    assert!(editor.undo().unwrap());
    assert_eq!(get_model_data(&editor, MAIN_ROOT), "<block>a</block>");
}
