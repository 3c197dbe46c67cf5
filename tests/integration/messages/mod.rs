//! Message flow integration tests: two live sessions over one conversation

use uuid::Uuid;

use sidechat_common::Error;

use crate::common::{wait_until, Session, TestWorld};

async fn two_sessions(world: &TestWorld) -> (Uuid, Session, Session) {
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(world, conv, world.alice.id).await.unwrap();
    let bob = Session::open(world, conv, world.bob.id).await.unwrap();
    (conv, alice, bob)
}

#[tokio::test]
async fn test_sent_message_reaches_both_sessions() {
    let world = TestWorld::new();
    let (_, alice, bob) = two_sessions(&world).await;

    let sent = alice.send_text("hi bob").await.unwrap();

    for session in [&alice, &bob] {
        let probe = || async {
            let messages = session.messages().await;
            messages.len() == 1 && messages[0].id == sent.id
        };
        wait_until(probe).await;
    }
    assert_eq!(
        bob.messages().await[0].content.as_deref(),
        Some("hi bob")
    );
}

#[tokio::test]
async fn test_messages_arrive_in_timeline_order() {
    let world = TestWorld::new();
    let (_, alice, bob) = two_sessions(&world).await;

    let mut sent = Vec::new();
    for text in ["one", "two", "three"] {
        sent.push(alice.send_text(text).await.unwrap().id);
        // Reply interleaved from the other side
        sent.push(bob.send_text(&format!("re: {}", text)).await.unwrap().id);
    }

    wait_until(|| async { alice.messages().await.len() == sent.len() }).await;
    let ids: Vec<Uuid> = alice.messages().await.iter().map(|m| m.id).collect();
    assert_eq!(ids, sent);
}

#[tokio::test]
async fn test_empty_send_writes_nothing() {
    let world = TestWorld::new();
    let (_, alice, _bob) = two_sessions(&world).await;

    let result = {
        let store = alice.store.lock().await;
        store.send(world.alice.id, Some("   ".to_string()), None).await
    };
    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(world.backend.message_row_count(), 0);
}

#[tokio::test]
async fn test_mark_read_propagates_to_sender() {
    let world = TestWorld::new();
    let (_, alice, bob) = two_sessions(&world).await;

    alice.send_text("seen yet?").await.unwrap();
    wait_until(|| async { bob.messages().await.len() == 1 }).await;

    let affected = bob.mark_read().await.unwrap();
    assert_eq!(affected, 1);

    // Alice's copy picks up the read mark through her feed
    wait_until(|| async {
        alice
            .messages()
            .await
            .first()
            .map(|m| m.is_read())
            .unwrap_or(false)
    })
    .await;

    // Re-reading affects nothing and changes nothing
    assert_eq!(bob.mark_read().await.unwrap(), 0);
}

#[tokio::test]
async fn test_mark_read_skips_own_messages() {
    let world = TestWorld::new();
    let (_, alice, _bob) = two_sessions(&world).await;

    alice.send_text("talking to myself").await.unwrap();
    wait_until(|| async { alice.messages().await.len() == 1 }).await;

    assert_eq!(alice.mark_read().await.unwrap(), 0);
    assert!(!alice.messages().await[0].is_read());
}

#[tokio::test]
async fn test_delete_removes_message_from_both_sessions() {
    let world = TestWorld::new();
    let (conv, alice, bob) = two_sessions(&world).await;

    let m1 = alice.send_text("keep").await.unwrap();
    let m2 = alice.send_text("remove").await.unwrap();
    wait_until(|| async { bob.messages().await.len() == 2 }).await;

    alice.delete(m2.id).await.unwrap();

    for session in [&alice, &bob] {
        let probe = || async {
            let messages = session.messages().await;
            messages.len() == 1 && messages[0].id == m1.id
        };
        wait_until(probe).await;
    }

    // Pointer repaired to the surviving message
    let pointer = world
        .repos
        .conversations
        .find(conv)
        .await
        .unwrap()
        .unwrap()
        .last_message_id;
    assert_eq!(pointer, Some(m1.id));
}

#[tokio::test]
async fn test_delete_is_sender_only_and_idempotent() {
    let world = TestWorld::new();
    let (_, alice, bob) = two_sessions(&world).await;

    let msg = alice.send_text("mine").await.unwrap();
    wait_until(|| async { bob.messages().await.len() == 1 }).await;

    // Bob cannot delete Alice's message
    let result = bob.delete(msg.id).await;
    assert!(result.is_err());
    assert_eq!(bob.messages().await.len(), 1);

    alice.delete(msg.id).await.unwrap();
    alice.delete(msg.id).await.unwrap();

    wait_until(|| async { bob.messages().await.is_empty() }).await;
}

#[tokio::test]
async fn test_delete_unknown_message_is_not_found() {
    let world = TestWorld::new();
    let (_, alice, _bob) = two_sessions(&world).await;

    let result = {
        let store = alice.store.lock().await;
        store.soft_delete(Uuid::new_v4(), world.alice.id).await
    };
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_late_session_load_matches_live_session() {
    let world = TestWorld::new();
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(&world, conv, world.alice.id).await.unwrap();

    let m1 = alice.send_text("before bob arrives").await.unwrap();
    let m2 = alice.send_text("still before").await.unwrap();
    alice.delete(m1.id).await.unwrap();

    // Bob connects after the fact and sees only surviving history
    let bob = Session::open(&world, conv, world.bob.id).await.unwrap();
    let ids: Vec<Uuid> = bob.messages().await.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![m2.id]);
}
