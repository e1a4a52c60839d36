mod common;

use std::time::Duration;

use ateneo::backend::chats;
use ateneo::client::chat_sync::AI_REPLIES;
use ateneo::common::models::{ChatKind, AI_ASSISTANT};

/// Poll the message collection until `want` messages exist (the
/// assistant reply is a delayed background write).
async fn wait_for_messages(
    portal: &ateneo::Portal,
    chat_id: &str,
    want: usize,
) -> Vec<ateneo::common::models::Message> {
    for _ in 0..200 {
        let msgs = chats::messages_for_chat(&portal.db, chat_id)
            .await
            .expect("messages");
        if msgs.len() >= want {
            return msgs;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("chat {} never reached {} messages", chat_id, want);
}

#[tokio::test]
async fn sending_appends_one_message_and_updates_the_preview() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;
    let bob = common::register_student(&portal, "b@student.ie.edu", "Bob").await;

    let chat = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), bob.id.clone()],
        ChatKind::Direct,
        None,
        None,
    )
    .await
    .expect("create chat");

    let sync = portal.chat_sync(alice.clone());
    let mut rx = sync.updates();
    common::wait_until(&mut rx, || sync.chats().len() == 1).await;

    sync.send_message(&chat.id, "hello there").await.expect("send");

    let msgs = chats::messages_for_chat(&portal.db, &chat.id)
        .await
        .expect("messages");
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].sender_id, alice.id);
    assert_eq!(msgs[0].text, "hello there");
    assert!(!msgs[0].read);

    let stored = chats::get_chat(&portal.db, &chat.id).await.expect("chat");
    let preview = stored.last_message.expect("preview");
    assert_eq!(preview.text, "hello there");
    assert_eq!(preview.sender_id, alice.id);
    assert_eq!(preview.timestamp, msgs[0].timestamp);

    // The live chat list picks the preview up too
    common::wait_until(&mut rx, || {
        sync.chats()
            .first()
            .and_then(|c| c.last_message.as_ref().map(|m| m.text.clone()))
            == Some("hello there".to_string())
    })
    .await;
}

#[tokio::test]
async fn empty_or_whitespace_text_is_a_silent_no_op() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;
    let bob = common::register_student(&portal, "b@student.ie.edu", "Bob").await;

    let chat = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), bob.id.clone()],
        ChatKind::Direct,
        None,
        None,
    )
    .await
    .expect("create chat");

    let sync = portal.chat_sync(alice);
    sync.send_message(&chat.id, "").await.expect("no-op");
    sync.send_message(&chat.id, "   \n\t").await.expect("no-op");

    let msgs = chats::messages_for_chat(&portal.db, &chat.id)
        .await
        .expect("messages");
    assert!(msgs.is_empty());
}

#[tokio::test]
async fn ai_chat_gets_exactly_one_delayed_assistant_reply() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;

    let chat = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), AI_ASSISTANT.to_string()],
        ChatKind::Ai,
        None,
        None,
    )
    .await
    .expect("create ai chat");

    let sync = portal.chat_sync(alice.clone());
    sync.send_message(&chat.id, "when is my exam?").await.expect("send");

    let msgs = wait_for_messages(&portal, &chat.id, 2).await;
    // Give a hypothetical second reply time to land, then check there
    // was exactly one
    tokio::time::sleep(Duration::from_millis(150)).await;
    let msgs_after = chats::messages_for_chat(&portal.db, &chat.id)
        .await
        .expect("messages");
    assert_eq!(msgs_after.len(), 2);

    // The sender is the viewer, so the human message was born read
    assert_eq!(msgs[0].sender_id, alice.id);
    assert!(msgs[0].read);
    let reply = &msgs[1];
    assert_eq!(reply.sender_id, AI_ASSISTANT);
    assert!(AI_REPLIES.contains(&reply.text.as_str()));
    assert!(!reply.read);

    let stored = chats::get_chat(&portal.db, &chat.id).await.expect("chat");
    let preview = stored.last_message.expect("preview");
    assert_eq!(preview.sender_id, AI_ASSISTANT);
    assert_eq!(preview.text, reply.text);
}

#[tokio::test]
async fn assistant_reply_still_lands_after_navigating_away() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;

    let chat = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), AI_ASSISTANT.to_string()],
        ChatKind::Ai,
        None,
        None,
    )
    .await
    .expect("create ai chat");

    let sync = portal.chat_sync(alice.clone());
    let mut rx = sync.updates();
    common::wait_until(&mut rx, || sync.chats().len() == 1).await;

    sync.set_active_chat(Some(chat.clone()));
    sync.send_message(&chat.id, "quick question").await.expect("send");
    // Navigate away before the delayed reply fires
    sync.set_active_chat(None);

    let msgs = wait_for_messages(&portal, &chat.id, 2).await;
    // Nobody is viewing the chat, so the reply stays unread for the
    // next visit
    assert_eq!(msgs[1].sender_id, AI_ASSISTANT);
    assert!(!msgs[1].read);

    // Coming back flips it
    sync.set_active_chat(Some(chat.clone()));
    common::wait_until(&mut rx, || {
        sync.messages_for(&chat.id).iter().all(|m| m.read)
            && sync.messages_for(&chat.id).len() == 2
    })
    .await;
    let msgs = chats::messages_for_chat(&portal.db, &chat.id)
        .await
        .expect("messages");
    assert!(msgs.iter().all(|m| m.read));
}

#[tokio::test]
async fn direct_chats_are_deduplicated_by_pair() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;
    let bob = common::register_student(&portal, "b@student.ie.edu", "Bob").await;

    let sync = portal.chat_sync(alice.clone());
    let mut rx = sync.updates();

    let first = sync
        .create_chat(vec![bob.id.clone()], ChatKind::Direct, None)
        .await
        .expect("create");
    // Wait for the standing subscription to deliver the new chat, then
    // ask again with the pair in the other order
    common::wait_until(&mut rx, || sync.chats().iter().any(|c| c.id == first)).await;
    let second = sync
        .create_chat(vec![bob.id.clone()], ChatKind::Direct, None)
        .await
        .expect("create again");
    assert_eq!(first, second);

    let all = chats::chats_for_user(&portal.db, &alice.id)
        .await
        .expect("chats");
    assert_eq!(all.len(), 1);
    // The caller was folded into the participant set
    assert!(all[0].is_direct_between(&alice.id, &bob.id));
}

#[tokio::test]
async fn viewing_marks_read_and_is_idempotent() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;
    let bob = common::register_student(&portal, "b@student.ie.edu", "Bob").await;

    let chat = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), bob.id.clone()],
        ChatKind::Direct,
        None,
        None,
    )
    .await
    .expect("create chat");

    // Two unread messages from the other side
    for text in ["ping", "ping again"] {
        chats::append_message(
            &portal.db,
            &portal.bus,
            &portal.config,
            &chat.id,
            &bob.id,
            text,
            false,
        )
        .await
        .expect("append");
    }
    assert_eq!(
        chats::unread_count(&portal.db, &chat.id, &alice.id)
            .await
            .expect("unread"),
        2
    );

    let sync = portal.chat_sync(alice.clone());
    let mut rx = sync.updates();
    sync.set_active_chat(Some(chat.clone()));

    // Viewing the chat flips both flags without any explicit call
    common::wait_until(&mut rx, || {
        let msgs = sync.messages_for(&chat.id);
        msgs.len() == 2 && msgs.iter().all(|m| m.read)
    })
    .await;
    assert_eq!(
        chats::unread_count(&portal.db, &chat.id, &alice.id)
            .await
            .expect("unread"),
        0
    );

    // Explicit re-marking performs no further writes
    assert_eq!(sync.mark_active_read().await.expect("mark"), 0);
    assert_eq!(sync.mark_active_read().await.expect("mark"), 0);
}

#[tokio::test]
async fn read_flip_is_monotonic_at_the_store() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;
    let bob = common::register_student(&portal, "b@student.ie.edu", "Bob").await;

    let chat = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), bob.id.clone()],
        ChatKind::Direct,
        None,
        None,
    )
    .await
    .expect("create chat");
    let msg = chats::append_message(
        &portal.db,
        &portal.bus,
        &portal.config,
        &chat.id,
        &bob.id,
        "unread",
        false,
    )
    .await
    .expect("append");

    assert!(chats::mark_message_read(&portal.db, &portal.bus, &msg.id)
        .await
        .expect("first flip"));
    assert!(!chats::mark_message_read(&portal.db, &portal.bus, &msg.id)
        .await
        .expect("second flip is a no-op"));
}

#[tokio::test]
async fn switching_active_chat_cancels_the_old_subscription() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;
    let bob = common::register_student(&portal, "b@student.ie.edu", "Bob").await;

    let chat_x = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), bob.id.clone()],
        ChatKind::Direct,
        None,
        None,
    )
    .await
    .expect("chat x");
    let chat_y = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), bob.id.clone()],
        ChatKind::Group,
        Some("study group"),
        None,
    )
    .await
    .expect("chat y");

    chats::append_message(
        &portal.db,
        &portal.bus,
        &portal.config,
        &chat_x.id,
        &bob.id,
        "first",
        false,
    )
    .await
    .expect("append");

    let sync = portal.chat_sync(alice.clone());
    let mut rx = sync.updates();

    sync.set_active_chat(Some(chat_x.clone()));
    common::wait_until(&mut rx, || sync.messages_for(&chat_x.id).len() == 1).await;

    sync.set_active_chat(Some(chat_y.clone()));
    common::wait_until(&mut rx, || sync.active_chat().map(|c| c.id) == Some(chat_y.id.clone())).await;

    // A write to the chat we switched away from must not reach local
    // state any more
    chats::append_message(
        &portal.db,
        &portal.bus,
        &portal.config,
        &chat_x.id,
        &bob.id,
        "second",
        false,
    )
    .await
    .expect("append");
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(sync.messages_for(&chat_x.id).len(), 1, "stale entry must not update");
    assert_eq!(
        chats::messages_for_chat(&portal.db, &chat_x.id)
            .await
            .expect("store")
            .len(),
        2
    );
}

#[tokio::test]
async fn chat_list_sorts_by_recency_with_quiet_chats_last() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;
    let bob = common::register_student(&portal, "b@student.ie.edu", "Bob").await;
    let carol = common::register_student(&portal, "c@student.ie.edu", "Carol").await;

    let old = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), bob.id.clone()],
        ChatKind::Direct,
        None,
        None,
    )
    .await
    .expect("old");
    let fresh = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), carol.id.clone()],
        ChatKind::Direct,
        None,
        None,
    )
    .await
    .expect("fresh");
    let quiet = chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), bob.id.clone()],
        ChatKind::Group,
        Some("quiet group"),
        None,
    )
    .await
    .expect("quiet");

    let sync = portal.chat_sync(alice.clone());
    let mut rx = sync.updates();
    common::wait_until(&mut rx, || sync.chats().len() == 3).await;

    sync.send_message(&old.id, "earlier").await.expect("send");
    tokio::time::sleep(Duration::from_millis(5)).await;
    sync.send_message(&fresh.id, "latest").await.expect("send");

    common::wait_until(&mut rx, || {
        let ids: Vec<String> = sync.chats().iter().map(|c| c.id.clone()).collect();
        ids == vec![fresh.id.clone(), old.id.clone(), quiet.id.clone()]
    })
    .await;
}

#[tokio::test]
async fn user_info_cache_covers_participants_assistant_and_dangling_ids() {
    let portal = common::portal().await;
    let alice = common::register_student(&portal, "a@student.ie.edu", "Alice").await;
    let bob = common::register_professor(&portal, "b@faculty.ie.edu", "Bob").await;

    chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), bob.id.clone()],
        ChatKind::Direct,
        None,
        None,
    )
    .await
    .expect("chat");
    // A participant id with no profile behind it is tolerated
    chats::create_chat(
        &portal.db,
        &portal.bus,
        &[alice.id.clone(), "ghost_user".to_string()],
        ChatKind::Direct,
        None,
        None,
    )
    .await
    .expect("chat with dangling id");

    let sync = portal.chat_sync(alice.clone());
    let mut rx = sync.updates();
    common::wait_until(&mut rx, || {
        sync.user_info(&bob.id).is_some() && sync.user_info("ghost_user").is_some()
    })
    .await;

    assert_eq!(sync.user_info(&bob.id).expect("bob").display_name, "Bob");
    assert_eq!(
        sync.user_info("ghost_user").expect("ghost").display_name,
        "Unknown User"
    );
    assert_eq!(
        sync.user_info(AI_ASSISTANT).expect("assistant").display_name,
        "Ed AI"
    );
    assert!(sync.is_online(AI_ASSISTANT));
}
