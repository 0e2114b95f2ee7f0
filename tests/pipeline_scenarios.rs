//! End-to-end rating scenarios against a scripted transport.

mod common;

use std::time::Duration;

use common::fixtures::{PipelineBuilder, post, streaming_config, test_config};
use rater::{
    MockReply, MockTransport, ProcessingState, ScheduleOutcome, completion_body, sse_frame,
};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_score_found_on_third_attempt() {
    let transport = MockTransport::new();
    transport
        .push(MockReply::Body(completion_body("Vague and repetitive.")))
        .push(MockReply::Body(completion_body("I would rather not say.")))
        .push(MockReply::Body(completion_body(
            "Concise, specific and useful. SCORE_8",
        )));
    let pipeline = PipelineBuilder::new(transport).build();

    let outcome = pipeline
        .service
        .schedule(post("100", "alice", "Rust 2024 let chains are great"))
        .await;

    match outcome {
        ScheduleOutcome::Rated(result) => {
            assert_eq!(result.score, Some(8));
            assert!(!result.error);
            assert_eq!(result.attempts, 3);
        }
        other => panic!("expected rated outcome, got {other:?}"),
    }
    assert_eq!(pipeline.transport.dispatch_count(), 3);

    let entry = pipeline
        .service
        .cache()
        .lookup_final("100")
        .expect("finalized entry");
    assert_eq!(entry.score, 8);
    assert!(!entry.streaming);
    assert!(entry.timestamp.is_some());
    assert_eq!(pipeline.service.state_of("100"), ProcessingState::Rated);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_spacing_between_attempts() {
    let transport = MockTransport::always(MockReply::Body(completion_body("no token here")));
    let pipeline = PipelineBuilder::new(transport).build();

    pipeline
        .service
        .schedule(post("1", "alice", "hello"))
        .await;

    let dispatches = pipeline.transport.dispatches();
    assert_eq!(dispatches.len(), 3);
    for (n, pair) in dispatches.windows(2).enumerate() {
        let attempt = (n + 1) as u32;
        let expected = Duration::from_secs(u64::from(attempt * attempt));
        let gap = pair[1].at - pair[0].at;
        assert!(
            gap >= expected && gap < expected + Duration::from_millis(100),
            "attempt {attempt}: gap {gap:?}, expected {expected:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_stream_is_finalized_after_idle_timeout() {
    let transport = MockTransport::new();
    transport.push(MockReply::Stream {
        chunks: vec![sse_frame("Good "), sse_frame("tweet. "), sse_frame("SCORE_9")],
        hang: true,
    });
    let pipeline = PipelineBuilder::new(transport)
        .config(streaming_config())
        .build();
    let start = Instant::now();

    let outcome = pipeline
        .service
        .schedule(post("200", "bob", "Small PRs get reviewed faster"))
        .await;

    assert_eq!(outcome.score(), Some(9));
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert_eq!(pipeline.transport.dispatch_count(), 1);

    let entry = pipeline
        .service
        .cache()
        .lookup_final("200")
        .expect("finalized entry");
    assert_eq!(entry.score, 9);
    assert_eq!(entry.description, "Good tweet. SCORE_9");
    assert!(!entry.streaming);
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_end_in_error_state_and_can_retry() {
    let transport = MockTransport::always(MockReply::Status(500, "internal".to_string()));
    let pipeline = PipelineBuilder::new(transport).config(test_config()).build();

    let outcome = pipeline
        .service
        .schedule(post("300", "carol", "hot take"))
        .await;

    match &outcome {
        ScheduleOutcome::Failed(result) => {
            assert_eq!(result.score, Some(5));
            assert!(result.error);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(pipeline.service.state_of("300"), ProcessingState::Error);
    assert!(!pipeline.service.is_in_flight("300"));
    assert_eq!(pipeline.transport.dispatch_count(), 3);

    let last = pipeline.sink.last_for("300").expect("indicator");
    assert_eq!(last.score, Some(5));
    assert_eq!(last.status, ProcessingState::Error);

    let again = pipeline
        .service
        .schedule(post("300", "carol", "hot take"))
        .await;
    assert!(matches!(again, ScheduleOutcome::Failed(_)));
    assert_eq!(pipeline.transport.dispatch_count(), 6);
}
