use super::*;
use crate::item::Item;

fn reply(id: &str, conversation: &str) -> Item {
    Item::new(id, "bob", format!("reply {id}")).in_conversation(conversation)
}

#[tokio::test]
async fn test_extract_observed_item() {
    let feed = FeedExtractor::new();
    feed.observe(Item::new("1", "alice", "hello"));

    let item = feed.extract("1").await.expect("extract");
    assert_eq!(item.text, "hello");
}

#[tokio::test]
async fn test_extract_unknown_item_is_context_unavailable() {
    let feed = FeedExtractor::new();
    let err = feed.extract("missing").await.expect_err("should fail");
    assert!(matches!(err, RatingError::ContextUnavailable { .. }));
    assert!(err.is_terminal());
}

#[tokio::test]
async fn test_extract_empty_item_is_context_unavailable() {
    let feed = FeedExtractor::new();
    feed.observe(Item::new("1", "alice", "   "));
    assert!(feed.extract("1").await.is_err());
}

#[tokio::test]
async fn test_reply_is_handed_out_once_a_later_reply_exists() {
    let feed = FeedExtractor::new();
    feed.observe(Item::new("root", "alice", "root").in_conversation("root"));
    feed.observe(reply("r1", "root"));

    assert_eq!(feed.find_next_unprocessed_sibling("root").await, None);

    feed.observe(reply("r2", "root"));
    assert_eq!(
        feed.find_next_unprocessed_sibling("root").await.as_deref(),
        Some("r1")
    );
    assert_eq!(feed.find_next_unprocessed_sibling("root").await, None);

    feed.observe(reply("r3", "root"));
    assert_eq!(
        feed.find_next_unprocessed_sibling("root").await.as_deref(),
        Some("r2")
    );
}

#[tokio::test]
async fn test_reobserving_does_not_requeue() {
    let feed = FeedExtractor::new();
    feed.observe(reply("r1", "c"));
    feed.observe(reply("r2", "c"));
    assert_eq!(feed.find_next_unprocessed_sibling("c").await.as_deref(), Some("r1"));

    feed.observe(reply("r1", "c"));
    feed.observe(reply("r2", "c"));
    feed.observe(reply("r3", "c"));
    assert_eq!(feed.find_next_unprocessed_sibling("c").await.as_deref(), Some("r2"));
    assert_eq!(feed.find_next_unprocessed_sibling("c").await, None);
    assert_eq!(feed.len(), 3);
}

#[tokio::test]
async fn test_roots_and_standalone_items_are_not_queued() {
    let feed = FeedExtractor::new();
    feed.observe(Item::new("solo", "alice", "solo"));
    feed.observe(Item::new("root", "alice", "root").in_conversation("root"));
    feed.observe(Item::new("solo2", "alice", "solo2"));

    assert_eq!(feed.find_next_unprocessed_sibling("root").await, None);
    assert_eq!(feed.find_next_unprocessed_sibling("solo").await, None);
}
