use super::*;

#[test]
fn test_format_context_plain_text() {
    let item = Item::new("1", "alice", "hello world");
    assert_eq!(format_context(&item), "[POST 1]\n Author:@alice:\nhello world");
}

#[test]
fn test_format_context_with_media_and_quote() {
    let quoted = Item::new("0", "bob", "original take").with_media(["https://img/q.png"]);
    let item = Item::new("1", "alice", "agreed")
        .with_media(["https://img/a.png", "https://img/b.png"])
        .with_quoted(quoted);

    let rendered = format_context(&item);

    assert_eq!(
        rendered,
        "[POST 1]\n Author:@alice:\nagreed\n[MEDIA_URLS]:\nhttps://img/a.png, https://img/b.png\n\
         [QUOTED_POST]:\n Author:@bob:\noriginal take\n[MEDIA_URLS]:\nhttps://img/q.png"
    );
}

#[test]
fn test_with_ancestors() {
    assert_eq!(with_ancestors(None, "own"), "own");
    assert_eq!(with_ancestors(Some("  "), "own"), "own");
    assert_eq!(with_ancestors(Some("root"), "own"), "root\n[REPLY]\nown");
}

#[test]
fn test_is_thread_root() {
    let standalone = Item::new("1", "a", "x");
    assert!(standalone.is_thread_root());

    let root = Item::new("1", "a", "x").in_conversation("1");
    assert!(root.is_thread_root());

    let reply = Item::new("2", "a", "x").in_conversation("1");
    assert!(!reply.is_thread_root());
}

#[test]
fn test_is_empty_considers_media_and_quote() {
    assert!(Item::new("1", "a", "   ").is_empty());
    assert!(!Item::new("1", "a", "").with_media(["u"]).is_empty());
    assert!(
        !Item::new("1", "a", "")
            .with_quoted(Item::new("0", "b", "quoted"))
            .is_empty()
    );
}

#[test]
fn test_all_media_includes_quoted() {
    let item = Item::new("1", "a", "x")
        .with_media(["m1"])
        .with_quoted(Item::new("0", "b", "y").with_media(["m2"]));
    assert_eq!(item.all_media(), vec!["m1", "m2"]);
}

#[test]
fn test_item_deserializes_from_camel_case() {
    let json = r#"{"id":"9","text":"hi","authorHandle":"zed","mediaUrls":["u"],"conversationId":"9"}"#;
    let item: Item = serde_json::from_str(json).expect("valid item");
    assert_eq!(item.author_handle, "zed");
    assert_eq!(item.media_urls, vec!["u".to_string()]);
    assert!(item.is_thread_root());
    assert!(item.quoted_item.is_none());
}
