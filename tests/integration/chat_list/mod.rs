//! Chat list aggregation integration tests

use crate::common::{wait_until, Session, Sidebar, TestWorld};

#[tokio::test]
async fn test_empty_conversation_row() {
    let world = TestWorld::new();
    let conv = world.resolve().await.unwrap();

    let sidebar = Sidebar::open(&world, world.bob.id).await.unwrap();
    let (preview, unread) = sidebar.row(conv).await.unwrap();
    assert_eq!(preview, "No messages yet");
    assert_eq!(unread, 0);
}

#[tokio::test]
async fn test_incoming_messages_update_preview_and_counter() {
    let world = TestWorld::new();
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(&world, conv, world.alice.id).await.unwrap();
    let sidebar = Sidebar::open(&world, world.bob.id).await.unwrap();

    alice.send_text("first").await.unwrap();
    alice.send_text("second").await.unwrap();

    wait_until(|| async {
        sidebar.row(conv).await == Some(("second".to_string(), 2))
    })
    .await;
}

#[tokio::test]
async fn test_own_messages_show_prefixed_and_unread_free() {
    let world = TestWorld::new();
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(&world, conv, world.alice.id).await.unwrap();
    let sidebar = Sidebar::open(&world, world.alice.id).await.unwrap();

    alice.send_text("hello").await.unwrap();

    wait_until(|| async {
        sidebar.row(conv).await == Some(("You: hello".to_string(), 0))
    })
    .await;
}

#[tokio::test]
async fn test_reading_resets_counter_via_event() {
    let world = TestWorld::new();
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(&world, conv, world.alice.id).await.unwrap();
    let bob = Session::open(&world, conv, world.bob.id).await.unwrap();
    let sidebar = Sidebar::open(&world, world.bob.id).await.unwrap();

    alice.send_text("unread").await.unwrap();
    wait_until(|| async { sidebar.row(conv).await == Some(("unread".to_string(), 1)) }).await;

    // Bob reads in his session; his sidebar hears the update event
    wait_until(|| async { bob.messages().await.len() == 1 }).await;
    bob.mark_read().await.unwrap();

    wait_until(|| async {
        sidebar
            .row(conv)
            .await
            .map(|(_, unread)| unread == 0)
            .unwrap_or(false)
    })
    .await;
}

#[tokio::test]
async fn test_delete_repairs_preview() {
    let world = TestWorld::new();
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(&world, conv, world.alice.id).await.unwrap();
    let sidebar = Sidebar::open(&world, world.bob.id).await.unwrap();

    alice.send_text("kept").await.unwrap();
    let latest = alice.send_text("latest").await.unwrap();
    wait_until(|| async { sidebar.row(conv).await == Some(("latest".to_string(), 2)) }).await;

    alice.delete(latest.id).await.unwrap();
    wait_until(|| async { sidebar.row(conv).await == Some(("kept".to_string(), 1)) }).await;
}

#[tokio::test]
async fn test_deleting_only_message_empties_row() {
    let world = TestWorld::new();
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(&world, conv, world.alice.id).await.unwrap();
    let sidebar = Sidebar::open(&world, world.bob.id).await.unwrap();

    let only = alice.send_text("only").await.unwrap();
    wait_until(|| async { sidebar.row(conv).await == Some(("only".to_string(), 1)) }).await;

    alice.delete(only.id).await.unwrap();
    wait_until(|| async {
        sidebar.row(conv).await == Some(("No messages yet".to_string(), 0))
    })
    .await;
}

#[tokio::test]
async fn test_first_contact_appears_without_reload() {
    let world = TestWorld::new();
    let sidebar = Sidebar::open(&world, world.bob.id).await.unwrap();
    assert!(sidebar.list.lock().await.items().is_empty());

    // Alice starts the conversation after Bob's sidebar is already live
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(&world, conv, world.alice.id).await.unwrap();
    alice.send_text("hey, new here").await.unwrap();

    wait_until(|| async {
        sidebar.row(conv).await == Some(("hey, new here".to_string(), 1))
    })
    .await;
}

#[tokio::test]
async fn test_opening_conversation_marks_it_read() {
    let world = TestWorld::new();
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(&world, conv, world.alice.id).await.unwrap();
    let sidebar = Sidebar::open(&world, world.bob.id).await.unwrap();

    alice.send_text("read me").await.unwrap();
    wait_until(|| async { sidebar.row(conv).await == Some(("read me".to_string(), 1)) }).await;

    // Selecting the conversation persists the read marks, not just the
    // local zero
    sidebar.list.lock().await.open(conv).await.unwrap();
    assert_eq!(sidebar.row(conv).await, Some(("read me".to_string(), 0)));
    assert_eq!(
        world
            .repos
            .messages
            .unread_count(conv, world.bob.id)
            .await
            .unwrap(),
        0
    );

    // Alice's copy picks up the read receipt
    wait_until(|| async {
        alice
            .messages()
            .await
            .first()
            .map(|m| m.is_read())
            .unwrap_or(false)
    })
    .await;
}

#[tokio::test]
async fn test_open_conversation_stays_read() {
    let world = TestWorld::new();
    let conv = world.resolve().await.unwrap();
    let alice = Session::open(&world, conv, world.alice.id).await.unwrap();
    let sidebar = Sidebar::open(&world, world.bob.id).await.unwrap();

    sidebar.list.lock().await.open(conv).await.unwrap();
    alice.send_text("while open").await.unwrap();

    // The insert event lands but the open conversation stays at zero
    wait_until(|| async {
        sidebar.row(conv).await == Some(("while open".to_string(), 0))
    })
    .await;
}

#[tokio::test]
async fn test_rows_ordered_by_recency() {
    let world = TestWorld::new();
    let carol = world.backend.seed_participant("carol");

    let ab = world.resolve().await.unwrap();
    let ac = world
        .resolver()
        .resolve(world.alice.id, carol.id)
        .await
        .unwrap();

    let to_bob = Session::open(&world, ab, world.alice.id).await.unwrap();
    let to_carol = Session::open(&world, ac, world.alice.id).await.unwrap();
    to_bob.send_text("older").await.unwrap();
    to_carol.send_text("newer").await.unwrap();

    let sidebar = Sidebar::open(&world, world.alice.id).await.unwrap();
    let order: Vec<String> = sidebar
        .list
        .lock()
        .await
        .items()
        .iter()
        .map(|item| item.other.username.clone())
        .collect();
    assert_eq!(order, vec!["carol".to_string(), "bob".to_string()]);
}
