mod common;

use std::sync::{Arc, Mutex};

use plate_core::dev_utils::get_model_data;
use plate_core::{
    listener_fn, ApplyError, BatchKind, ChangesDone, ChangesDoneListener, Editor, Node, Op,
    PlatePlugin, Position, Priority, MAIN_ROOT,
};
use pretty_assertions::assert_eq;

use common::{editor, BlockPlugin};

fn pos(path: &[usize]) -> Position {
    Position::new(MAIN_ROOT, path.to_vec())
}

type Log = Arc<Mutex<Vec<String>>>;

fn recorder(id: &'static str, log: Log) -> impl ChangesDoneListener {
    listener_fn(id, move |_, event: &ChangesDone| {
        let sources: Vec<String> = event
            .batches
            .iter()
            .map(|b| b.source.clone().unwrap_or_else(|| "user".into()))
            .collect();
        log.lock()
            .unwrap()
            .push(format!("{id}:{}", sources.join(",")));
        Vec::new()
    })
}

#[test]
fn listeners_run_by_priority_then_registration() {
    let mut editor = editor();
    let log = Log::default();
    editor.on_changes_done(Priority::Low, recorder("low", log.clone()));
    editor.on_changes_done(Priority::High, recorder("high", log.clone()));
    editor.on_changes_done(Priority::Low, recorder("low2", log.clone()));

    editor
        .change(|writer| writer.insert_element("block", &pos(&[0])))
        .unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["high:user", "low:user", "low2:user"]
    );
}

#[test]
fn listener_changes_form_their_own_batch_and_settle() {
    let mut editor = editor();
    let log = Log::default();
    editor.on_changes_done(
        Priority::Normal,
        listener_fn("fill", |editor: &Editor, event: &ChangesDone| {
            let root = editor.root(MAIN_ROOT).unwrap();
            let user_change = event.batches.iter().any(|b| !b.is_transparent());
            if user_change && root.children.len() == 1 {
                vec![Op::InsertNode {
                    at: Position::new(MAIN_ROOT, vec![1]),
                    node: Node::element("block", vec![Node::text("filled")]),
                }]
            } else {
                Vec::new()
            }
        }),
    );
    editor.on_changes_done(Priority::Lowest, recorder("tail", log.clone()));

    editor
        .change(|writer| writer.insert_element("block", &pos(&[0])))
        .unwrap();

    assert_eq!(
        get_model_data(&editor, MAIN_ROOT),
        "<block></block><block>filled</block>"
    );
    // The nested settle reaches the tail listener before the outer one does.
    assert_eq!(
        *log.lock().unwrap(),
        vec!["tail:listener:fill", "tail:user"]
    );

    assert!(editor.undo().unwrap());
    assert_eq!(get_model_data(&editor, MAIN_ROOT), "<block></block>");
    assert!(editor.undo().unwrap());
    assert_eq!(get_model_data(&editor, MAIN_ROOT), "");
}

#[test]
fn enqueued_changes_share_one_settle_event() {
    let mut editor = editor();
    let log = Log::default();
    editor.on_changes_done(Priority::Normal, recorder("rec", log.clone()));

    editor
        .change(|writer| {
            writer.insert_element("block", &pos(&[0]))?;
            writer.enqueue_change(BatchKind::Transparent, |writer| {
                writer.insert_element("block", &Position::new(MAIN_ROOT, vec![1]))
            });
            Ok(())
        })
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["rec:user,user"]);
    assert_eq!(editor.root(MAIN_ROOT).unwrap().children.len(), 2);
}

#[test]
fn runaway_listener_is_cut_off() {
    let mut editor = editor();
    editor.on_changes_done(
        Priority::Normal,
        listener_fn("runaway", |_: &Editor, _: &ChangesDone| {
            vec![Op::InsertNode {
                at: Position::new(MAIN_ROOT, vec![0]),
                node: Node::element("block", Vec::new()),
            }]
        }),
    );

    let err = editor
        .change(|writer| writer.insert_element("block", &pos(&[0])))
        .unwrap_err();
    assert!(matches!(err, ApplyError::SettleDidNotConverge(_)));
}

#[test]
fn summaries_name_the_roots_a_batch_emptied() {
    let mut editor = editor();
    let seen: Arc<Mutex<Vec<(bool, bool)>>> = Arc::default();
    let log = Arc::clone(&seen);
    editor
        .change(|writer| writer.insert_element("block", &pos(&[0])))
        .unwrap();
    editor.on_changes_done(
        Priority::Normal,
        listener_fn("emptied", move |_: &Editor, event: &ChangesDone| {
            let mut log = log.lock().unwrap();
            log.extend(
                event
                    .batches
                    .iter()
                    .map(|b| (b.touches(MAIN_ROOT), b.empties(MAIN_ROOT))),
            );
            Vec::new()
        }),
    );

    editor
        .change(|writer| {
            writer.remove(&pos(&[0]))?;
            writer.insert_element("block", &pos(&[0]))?;
            writer.enqueue_change(BatchKind::Default, |writer| {
                writer.insert_element("block", &Position::new(MAIN_ROOT, vec![1]))
            });
            Ok(())
        })
        .unwrap();

    // Emptied midway counts even though the batch refilled the root.
    assert_eq!(*seen.lock().unwrap(), vec![(true, true), (true, false)]);
}

struct InitialProbe {
    seen: Arc<Mutex<Vec<bool>>>,
}

impl PlatePlugin for InitialProbe {
    fn id(&self) -> &'static str {
        "test.initial_probe"
    }

    fn listeners(&self) -> Vec<(Priority, Box<dyn ChangesDoneListener>)> {
        let seen = Arc::clone(&self.seen);
        let probe = listener_fn("probe", move |_: &Editor, event: &ChangesDone| {
            seen.lock().unwrap().push(event.initial);
            Vec::new()
        });
        vec![(Priority::Normal, Box::new(probe) as Box<dyn ChangesDoneListener>)]
    }
}

#[test]
fn editor_start_fires_the_initial_event() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let plugins: Vec<Box<dyn PlatePlugin>> = vec![
        Box::new(BlockPlugin),
        Box::new(InitialProbe {
            seen: Arc::clone(&seen),
        }),
    ];
    let mut editor = Editor::with_plugins(plugins).unwrap();
    editor
        .change(|writer| writer.insert_element("block", &pos(&[0])))
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
}
