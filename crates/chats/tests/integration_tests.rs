//! Integration tests for the chats crate.
//!
//! These drive the store through realistic sequences of REST loads and
//! channel deliveries and check the ordering, unread and dedupe rules.

use chatsync_chats::{
    queries, Chat, ConversationStore, CreatedChat, Message, PresenceChange, PresenceUpdate,
    SyncError, UnreadClearedHint, User,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn u1() -> User {
    User::new("u1", "ada", "lovelace")
}

fn peer(id: &str) -> User {
    User::new(id, "peer", id)
}

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minute)
}

fn msg(id: &str, chat_id: &str, sender: &str, minute: i64) -> Message {
    Message::text(id, chat_id, sender, format!("text of {id}"), at(minute))
}

fn chat_ids(store: &ConversationStore) -> Vec<String> {
    store
        .current_state()
        .chats()
        .iter()
        .map(|chat| chat.id.clone())
        .collect()
}

/// U1 with chats to U2 (selected) and U3, both read.
fn scenario_store() -> ConversationStore {
    let mut store = ConversationStore::new(u1());
    store.apply_fetched_chats(vec![
        Chat::new("c-u2", u1(), peer("u2")).with_last_message(msg("m0", "c-u2", "u1", 5)),
        Chat::new("c-u3", u1(), peer("u3")).with_last_message(msg("m1", "c-u3", "u1", 1)),
    ]);
    store.select_chat("c-u2").expect("chat exists");
    store
        .apply_fetched_messages("c-u2", vec![msg("m0", "c-u2", "u1", 5)])
        .expect("selection matches");
    store
}

#[test]
fn end_to_end_inbound_then_select_then_confirm() {
    let mut store = scenario_store();

    let merge = store
        .apply_inbound_message(msg("m2", "c-u3", "u3", 10))
        .expect("message merges");
    assert!(!merge.appended);
    assert_eq!(merge.unread_count, 1);

    let state = store.current_state();
    assert_eq!(chat_ids(&store), ["c-u3", "c-u2"]);
    assert_eq!(state.chat("c-u3").unwrap().unread_message_count, 1);
    assert_eq!(state.messages("c-u2").len(), 1);
    assert!(state.messages("c-u3").is_empty());

    let outcome = store.select_chat("c-u3").expect("chat exists");
    assert!(outcome.needs_unread_clear);
    // Selection alone never clears; only the server confirmation does.
    assert_eq!(
        store.current_state().chat("c-u3").unwrap().unread_message_count,
        1
    );

    let clear = store.capture_unread_clear("c-u3").expect("chat exists");
    assert!(store.apply_unread_cleared(&clear).unwrap());
    let state = store.current_state();
    assert_eq!(state.chat("c-u3").unwrap().unread_message_count, 0);
    assert!(state.chat("c-u3").unwrap().last_message.as_ref().unwrap().read);

    assert!(!store.apply_unread_cleared(&clear).unwrap());
}

#[test]
fn duplicate_delivery_is_idempotent() {
    let mut once = scenario_store();
    once.apply_inbound_message(msg("m2", "c-u3", "u3", 10)).unwrap();

    let mut twice = scenario_store();
    twice.apply_inbound_message(msg("m2", "c-u3", "u3", 10)).unwrap();
    let error = twice
        .apply_inbound_message(msg("m2", "c-u3", "u3", 10))
        .unwrap_err();

    assert!(matches!(error, SyncError::DuplicateEvent { .. }));
    assert_eq!(*once.current_state(), *twice.current_state());
}

#[test]
fn duplicate_into_selected_chat_is_not_appended_twice() {
    let mut store = scenario_store();
    store.apply_inbound_message(msg("m3", "c-u2", "u2", 11)).unwrap();
    store.apply_inbound_message(msg("m3", "c-u2", "u2", 11)).unwrap_err();

    let state = store.current_state();
    let ids: Vec<&str> = state.messages("c-u2").iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m0", "m3"]);
    assert_eq!(state.chat("c-u2").unwrap().unread_message_count, 0);
}

#[test]
fn redelivery_after_reselect_is_still_deduped() {
    let mut store = scenario_store();
    store.apply_inbound_message(msg("m3", "c-u2", "u2", 11)).unwrap();
    store.apply_inbound_message(msg("m4", "c-u2", "u2", 12)).unwrap();
    store.select_chat("c-u3").unwrap();

    let error = store
        .apply_inbound_message(msg("m3", "c-u2", "u2", 11))
        .unwrap_err();
    assert!(matches!(error, SyncError::DuplicateEvent { .. }));
    assert_eq!(
        store.current_state().chat("c-u2").unwrap().unread_message_count,
        0
    );
}

#[test]
fn ordering_reflects_latest_move_to_front_per_chat() {
    let mut store = ConversationStore::new(u1());
    store.apply_fetched_chats(vec![
        Chat::new("a", u1(), peer("pa")).with_last_message(msg("ma", "a", "pa", 4)),
        Chat::new("b", u1(), peer("pb")).with_last_message(msg("mb", "b", "pb", 3)),
        Chat::new("c", u1(), peer("pc")).with_last_message(msg("mc", "c", "pc", 2)),
        Chat::new("d", u1(), peer("pd")).with_last_message(msg("md", "d", "pd", 1)),
    ]);
    assert_eq!(chat_ids(&store), ["a", "b", "c", "d"]);

    store.apply_inbound_message(msg("x1", "c", "pc", 10)).unwrap();
    store.apply_inbound_message(msg("x2", "b", "pb", 11)).unwrap();
    store.apply_inbound_message(msg("x3", "c", "pc", 12)).unwrap();

    assert_eq!(chat_ids(&store), ["c", "b", "a", "d"]);
}

#[test]
fn unread_counts_distinct_messages_while_unselected() {
    let mut store = scenario_store();
    for (index, id) in ["n1", "n2", "n3"].iter().enumerate() {
        store
            .apply_inbound_message(msg(id, "c-u3", "u3", 20 + index as i64))
            .unwrap();
    }
    let _ = store.apply_inbound_message(msg("n2", "c-u3", "u3", 21));

    assert_eq!(
        store.current_state().chat("c-u3").unwrap().unread_message_count,
        3
    );

    let clear = store.capture_unread_clear("c-u3").unwrap();
    store.apply_unread_cleared(&clear).unwrap();
    store.apply_inbound_message(msg("n4", "c-u3", "u3", 30)).unwrap();
    assert_eq!(
        store.current_state().chat("c-u3").unwrap().unread_message_count,
        1
    );
}

#[test]
fn late_clear_confirmation_keeps_messages_that_arrived_after_it() {
    let mut store = scenario_store();
    store.apply_inbound_message(msg("p1", "c-u3", "u3", 10)).unwrap();

    store.select_chat("c-u3").unwrap();
    let clear = store.capture_unread_clear("c-u3").unwrap();
    store.select_chat("c-u2").unwrap();
    store.apply_inbound_message(msg("p2", "c-u3", "u3", 11)).unwrap();
    assert_eq!(
        store.current_state().chat("c-u3").unwrap().unread_message_count,
        2
    );

    assert!(store.apply_unread_cleared(&clear).unwrap());
    let state = store.current_state();
    let chat = state.chat("c-u3").unwrap();
    assert_eq!(chat.unread_message_count, 1);
    let last = chat.last_message.as_ref().unwrap();
    assert_eq!(last.id, "p2");
    assert!(!last.read);

    assert!(!store.apply_unread_cleared(&clear).unwrap());
    assert_eq!(
        store.current_state().chat("c-u3").unwrap().unread_message_count,
        1
    );
}

#[test]
fn own_messages_never_count_as_unread() {
    let mut store = scenario_store();
    let merge = store
        .apply_inbound_message(msg("from-other-session", "c-u3", "u1", 12))
        .unwrap();
    assert!(merge.from_current_user);
    assert_eq!(merge.unread_count, 0);
    assert_eq!(chat_ids(&store), ["c-u3", "c-u2"]);

    store.apply_inbound_message(msg("reply", "c-u3", "u3", 13)).unwrap();
    let state = store.current_state();
    let chat = state.chat("c-u3").unwrap();
    assert_eq!(chat.unread_message_count, 1);
    assert_eq!(chat.last_message.as_ref().unwrap().id, "reply");
}

#[test]
fn stale_message_response_leaves_new_selection_untouched() {
    let mut store = scenario_store();
    store.select_chat("c-u3").unwrap();
    store
        .apply_fetched_messages("c-u3", vec![msg("m1", "c-u3", "u1", 1)])
        .unwrap();

    let error = store
        .apply_fetched_messages("c-u2", vec![msg("late", "c-u2", "u2", 9)])
        .unwrap_err();

    assert!(matches!(error, SyncError::StaleResponse { .. }));
    let state = store.current_state();
    let ids: Vec<&str> = state.messages("c-u3").iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m1"]);
    assert!(state.messages("c-u2").is_empty());
}

#[test]
fn fetched_history_keeps_messages_that_arrived_during_fetch() {
    let mut store = scenario_store();
    store.select_chat("c-u3").unwrap();
    store.apply_inbound_message(msg("live", "c-u3", "u3", 30)).unwrap();

    store
        .apply_fetched_messages(
            "c-u3",
            vec![msg("m1", "c-u3", "u1", 1), msg("old", "c-u3", "u3", 2)],
        )
        .unwrap();

    let state = store.current_state();
    let ids: Vec<&str> = state.messages("c-u3").iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m1", "old", "live"]);
    assert_eq!(
        state.chat("c-u3").unwrap().last_message.as_ref().unwrap().id,
        "live"
    );
}

#[test]
fn out_of_order_inbound_does_not_regress_last_message() {
    let mut store = scenario_store();
    store.apply_inbound_message(msg("new", "c-u3", "u3", 40)).unwrap();
    let merge = store.apply_inbound_message(msg("older", "c-u3", "u3", 35)).unwrap();

    assert!(!merge.became_last);
    let state = store.current_state();
    let chat = state.chat("c-u3").unwrap();
    assert_eq!(chat.last_message.as_ref().unwrap().id, "new");
    assert_eq!(chat.unread_message_count, 2);
}

#[test]
fn unknown_chat_is_ignored_until_refresh_introduces_it() {
    let mut store = scenario_store();
    let error = store
        .apply_inbound_message(msg("m9", "c-u4", "u4", 50))
        .unwrap_err();
    assert!(matches!(error, SyncError::UnknownChat { .. }));

    let mut chats: Vec<Chat> = store.current_state().chats().to_vec();
    chats.push(
        Chat::new("c-u4", u1(), peer("u4"))
            .with_last_message(msg("m9", "c-u4", "u4", 50))
            .with_unread(1),
    );
    store.apply_fetched_chats(chats);

    assert_eq!(chat_ids(&store)[0], "c-u4");
    // The server already counted m9; a late redelivery must not count it again.
    store
        .apply_inbound_message(msg("m9", "c-u4", "u4", 50))
        .unwrap_err();
    assert_eq!(
        store.current_state().chat("c-u4").unwrap().unread_message_count,
        1
    );
}

#[test]
fn refresh_drops_duplicate_member_pairs_and_keeps_newer_local_last_message() {
    let mut store = scenario_store();
    store.apply_inbound_message(msg("fresh", "c-u3", "u3", 60)).unwrap();

    let merge = store.apply_fetched_chats(vec![
        Chat::new("c-u2", u1(), peer("u2")).with_last_message(msg("m0", "c-u2", "u1", 5)),
        Chat::new("c-u3", u1(), peer("u3"))
            .with_last_message(msg("m1", "c-u3", "u1", 1))
            .with_unread(1),
        Chat::new("c-u3-again", peer("u3"), u1()),
    ]);

    assert_eq!(merge.kept, 2);
    assert_eq!(merge.dropped, 1);
    let state = store.current_state();
    assert_eq!(
        state.chat("c-u3").unwrap().last_message.as_ref().unwrap().id,
        "fresh"
    );
    assert_eq!(chat_ids(&store), ["c-u3", "c-u2"]);
}

#[test]
fn refresh_older_than_channel_keeps_local_unread_count() {
    let mut store = ConversationStore::new(u1());
    let response =
        vec![Chat::new("c1", u1(), peer("u2")).with_last_message(msg("m0", "c1", "u2", 1))];
    store.apply_fetched_chats(response.clone());

    store.apply_inbound_message(msg("m1", "c1", "u2", 2)).unwrap();
    store.apply_fetched_chats(response);

    let state = store.current_state();
    let chat = state.chat("c1").unwrap();
    assert_eq!(chat.last_message.as_ref().unwrap().id, "m1");
    assert_eq!(chat.unread_message_count, 1);

    // A response that has seen m1 is authoritative again.
    store.apply_fetched_chats(vec![Chat::new("c1", u1(), peer("u2"))
        .with_last_message(msg("m1", "c1", "u2", 2))
        .with_unread(3)]);
    assert_eq!(
        store.current_state().chat("c1").unwrap().unread_message_count,
        3
    );
}

#[test]
fn refresh_clears_selection_of_vanished_chat() {
    let mut store = scenario_store();
    let merge = store.apply_fetched_chats(vec![Chat::new("c-u3", u1(), peer("u3"))]);

    assert!(merge.selection_cleared);
    let state = store.current_state();
    assert!(state.selected_chat_id().is_none());
    assert!(state.messages_by_chat().is_empty());
}

#[test]
fn created_chat_is_selected_and_never_duplicated() {
    let mut store = scenario_store();

    let created = store
        .apply_created_chat(Chat::new("c-u5", u1(), peer("u5")))
        .unwrap();
    assert_eq!(created, CreatedChat::Inserted("c-u5".into()));
    assert_eq!(store.current_state().selected_chat_id(), Some("c-u5"));

    let again = store
        .apply_created_chat(Chat::new("c-u5-dup", peer("u5"), u1()))
        .unwrap();
    assert_eq!(again, CreatedChat::Existing("c-u5".into()));
    assert_eq!(store.current_state().chats().len(), 3);
    assert_eq!(chat_ids(&store).last().map(String::as_str), Some("c-u5"));
}

#[test]
fn read_receipt_marks_own_messages_only() {
    let mut store = scenario_store();
    store.apply_inbound_message(msg("theirs", "c-u2", "u2", 70)).unwrap();
    store.apply_inbound_message(msg("mine", "c-u2", "u1", 71)).unwrap();

    let marked = store.apply_read_receipt(&UnreadClearedHint {
        chat_id: "c-u2".into(),
        members: vec!["u1".into(), "u2".into()],
        cleared_by: Some("u2".into()),
    });

    assert_eq!(marked, 3);
    let state = store.current_state();
    for message in state.messages("c-u2") {
        assert_eq!(message.read, message.sender == "u1", "message {}", message.id);
    }
    assert_eq!(state.chat("c-u2").unwrap().unread_message_count, 0);
}

#[test]
fn own_unread_hint_never_changes_counts() {
    let mut store = scenario_store();
    store.apply_inbound_message(msg("n1", "c-u3", "u3", 80)).unwrap();

    let marked = store.apply_read_receipt(&UnreadClearedHint {
        chat_id: "c-u3".into(),
        members: vec!["u1".into(), "u3".into()],
        cleared_by: Some("u1".into()),
    });

    assert_eq!(marked, 0);
    assert_eq!(
        store.current_state().chat("c-u3").unwrap().unread_message_count,
        1
    );
}

#[test]
fn presence_feeds_online_query() {
    let mut store = scenario_store();
    store.apply_presence(PresenceChange::Incremental(PresenceUpdate::came_online(["u2"])));
    store.apply_presence(PresenceChange::Snapshot(vec!["u2".into(), "u3".into()]));
    store.apply_presence(PresenceChange::WentOffline("u2".into()));

    let state = store.current_state();
    assert!(!queries::is_online(&state, "u2"));
    assert!(queries::is_online(&state, "u3"));
}

#[test]
fn selecting_own_last_message_chat_needs_no_clear() {
    let mut store = scenario_store();
    let outcome = store.select_chat("c-u3").unwrap();
    assert!(!outcome.needs_unread_clear);
    assert!(outcome.changed);

    let again = store.select_chat("c-u3").unwrap();
    assert!(!again.changed);
}
