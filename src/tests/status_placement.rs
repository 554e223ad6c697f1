use crate::app::status_anchor;
use crate::controller::{TurnEvent, TurnFold, append_turn, submit_user_input};
use crate::registry::SessionState;
use crate::types::messages::DisplayMessage;

#[test]
fn finished_tool_turn_anchors_status_on_the_new_reply() {
    let mut state = SessionState::new();
    submit_user_input(&mut state, "weather in Oslo?").unwrap();
    let mut fold = TurnFold::new(state.active_thread_id.clone());
    fold.apply(TurnEvent::Tool("weather".into()));
    fold.apply(TurnEvent::Content("It is 4°C.".into()));
    fold.apply(TurnEvent::Complete);

    let status = append_turn(&mut state, fold);

    assert!(status.is_some());
    assert_eq!(status_anchor(&state.history), Some(1));
    assert_eq!(state.history[1], DisplayMessage::assistant("It is 4°C."));
}

#[test]
fn anchor_follows_the_latest_reply_in_a_long_history() {
    let history = vec![
        DisplayMessage::user("a"),
        DisplayMessage::assistant("b"),
        DisplayMessage::user("c"),
        DisplayMessage::assistant("d"),
    ];
    assert_eq!(status_anchor(&history), Some(3));
}

#[test]
fn no_anchor_when_last_message_is_from_user() {
    let history = vec![DisplayMessage::assistant("b"), DisplayMessage::user("c")];
    assert_eq!(status_anchor(&history), None);
}

#[test]
fn no_anchor_for_empty_history() {
    assert_eq!(status_anchor(&[]), None);
}
