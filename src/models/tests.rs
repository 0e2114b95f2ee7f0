use super::*;

const FRONTEND_BODY: &str = r#"{
  "data": {
    "models": [
      {
        "slug": "google/gemini-2.5-flash",
        "input_modalities": ["text", "image", "file"],
        "endpoint": { "pricing": { "prompt": "0.0000003", "completion": "0.0000025", "image": "0.001238" } }
      },
      { "slug": "mistral/tiny", "input_modalities": ["text"] },
      { "name": "no identifier" }
    ]
  }
}"#;

#[test]
fn test_parse_frontend_shape() {
    let models = parse_models(FRONTEND_BODY).expect("parse");

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].id, "google/gemini-2.5-flash");
    assert!(models[0].supports_images());
    assert_eq!(
        models[0].pricing.as_ref().and_then(|p| p.prompt.as_deref()),
        Some("0.0000003")
    );
    assert!(!models[1].supports_images());
    assert_eq!(models[1].pricing, None);
}

#[test]
fn test_parse_flat_shape_with_ids() {
    let body = r#"{"data":[{"id":"a/vision","input_modalities":["image"],"pricing":{"prompt":"1"}}]}"#;
    let models = parse_models(body).expect("parse");

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].id, "a/vision");
    assert!(models[0].supports_images());
    assert!(models[0].pricing.is_some());
}

#[test]
fn test_parse_rejects_unrecognised_bodies() {
    assert!(matches!(parse_models("nope"), Err(ModelsError::Malformed(_))));
    assert!(matches!(parse_models("{}"), Err(ModelsError::Malformed(_))));
    assert!(matches!(
        parse_models(r#"{"data":{"models":3}}"#),
        Err(ModelsError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_seeded_catalog_answers_without_fetching() {
    let catalog = ModelCatalog::new("http://127.0.0.1:9/unreachable");
    catalog.seed(parse_models(FRONTEND_BODY).expect("parse"));

    assert!(catalog.supports_images("google/gemini-2.5-flash").await);
    assert!(!catalog.supports_images("mistral/tiny").await);
    assert!(!catalog.supports_images("unknown/model").await);
    assert_eq!(
        catalog.get("mistral/tiny").await.map(|m| m.id),
        Some("mistral/tiny".to_string())
    );
}

#[tokio::test]
async fn test_unreachable_catalog_does_not_support_images() {
    let catalog = ModelCatalog::new("http://127.0.0.1:9/unreachable");
    assert!(!catalog.supports_images("google/gemini-2.5-flash").await);
    assert!(catalog.models().await.is_err());
}
