//! Conversation resolution integration tests

use sidechat_backend::ChatBackend;
use sidechat_common::Error;

use crate::common::TestWorld;

#[tokio::test]
async fn test_first_resolve_creates_conversation_and_memberships() {
    let world = TestWorld::new();

    let id = world.resolve().await.unwrap();

    let conv = world.repos.conversations.find(id).await.unwrap();
    assert!(conv.is_some());

    let members = world
        .backend
        .memberships_for_conversation(id)
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_repeated_resolve_reuses_conversation() {
    let world = TestWorld::new();

    let first = world.resolve().await.unwrap();
    let second = world.resolve().await.unwrap();
    let reversed = world
        .resolver()
        .resolve(world.bob.id, world.alice.id)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first, reversed);
}

#[tokio::test]
async fn test_resolve_with_self_is_rejected() {
    let world = TestWorld::new();
    let result = world
        .resolver()
        .resolve(world.alice.id, world.alice.id)
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_distinct_pairs_get_distinct_conversations() {
    let world = TestWorld::new();
    let carol = world.backend.seed_participant("carol");

    let ab = world.resolve().await.unwrap();
    let ac = world
        .resolver()
        .resolve(world.alice.id, carol.id)
        .await
        .unwrap();
    let bc = world
        .resolver()
        .resolve(world.bob.id, carol.id)
        .await
        .unwrap();

    assert_ne!(ab, ac);
    assert_ne!(ab, bc);
    assert_ne!(ac, bc);

    // And each pair still resolves back to its own conversation
    assert_eq!(
        world
            .resolver()
            .resolve(carol.id, world.alice.id)
            .await
            .unwrap(),
        ac
    );
}

#[tokio::test]
async fn test_membership_failure_leaves_visible_partial_failure() {
    let world = TestWorld::new();

    world.backend.fail_next_membership_insert();
    let result = world
        .resolver()
        .resolve(world.alice.id, world.bob.id)
        .await;
    assert!(matches!(result, Err(Error::PartialFailure(_))));

    // The next attempt creates a healthy conversation
    let id = world.resolve().await.unwrap();
    let members = world
        .backend
        .memberships_for_conversation(id)
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
}
