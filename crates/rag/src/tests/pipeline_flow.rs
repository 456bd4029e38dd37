use super::support::HarnessBuilder;
use crate::error::{ErrorKind, PipelineError, Stage};
use crate::http::HttpRequest;
use crate::types::{Query, RetrievedDocument};
use grounded_core::config::{BoundarySettings, StatusCodePolicy};
use grounded_llm::ChatRole;
use std::time::Duration;

fn ask(query: &str) -> HttpRequest {
    HttpRequest::post(serde_json::json!({ "query": query }).to_string())
}

#[tokio::test(start_paused = true)]
async fn test_stages_run_in_order() {
    let harness = HarnessBuilder::default().build();

    let response = harness.pipeline.handle(&ask("What did you build?")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"{"response":"Grounded answer."}"#);
    assert_eq!(harness.calls(), vec!["embed", "retrieve", "generate"]);
}

#[tokio::test(start_paused = true)]
async fn test_one_embedding_call_with_query_text() {
    let harness = HarnessBuilder::default().build();

    harness.pipeline.handle(&ask("Tell me about Rust")).await;

    assert_eq!(
        *harness.embedder.texts.lock().unwrap(),
        vec!["Tell me about Rust".to_string()]
    );
    let requests = harness.store.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query_text, "Tell me about Rust");
    assert_eq!(requests[0].query_embedding.len(), 384);
    assert_eq!(requests[0].match_count, 5);
}

#[tokio::test(start_paused = true)]
async fn test_fourth_request_in_window_is_rejected() {
    let harness = HarnessBuilder::default().build();

    for _ in 0..3 {
        let response = harness.pipeline.handle(&ask("q")).await;
        assert_eq!(response.status, 200);
    }
    let calls_before = harness.calls().len();

    let response = harness.pipeline.handle(&ask("q")).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body, r#"{"error":"Rate Limit Exception"}"#);
    // No collaborator was contacted for the rejected request
    assert_eq!(harness.calls().len(), calls_before);
}

#[tokio::test(start_paused = true)]
async fn test_window_reopens() {
    let harness = HarnessBuilder::default().build();

    for _ in 0..3 {
        harness.pipeline.handle(&ask("q")).await;
    }
    assert!(!harness.pipeline.handle(&ask("q")).await.is_success());

    tokio::time::advance(Duration::from_secs(11)).await;

    assert!(harness.pipeline.handle(&ask("q")).await.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_context_is_joined_documents() {
    let harness = HarnessBuilder::default()
        .rows(vec![
            RetrievedDocument::new("Built a compiler"),
            RetrievedDocument::new("Led a team of four"),
        ])
        .build();

    harness.pipeline.handle(&ask("Experience?")).await;

    let requests = harness.chat.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::System);
    assert_eq!(messages[1].role, ChatRole::User);
    assert_eq!(
        messages[1].content,
        "Context: Built a compiler\n\nLed a team of four\n\nQuestion: Experience?\n\nAnswer:"
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_document_set_still_generates() {
    let harness = HarnessBuilder::default().rows(Vec::new()).build();

    let response = harness.pipeline.handle(&ask("Anything?")).await;

    assert_eq!(response.status, 200);
    let requests = harness.chat.requests.lock().unwrap();
    assert_eq!(
        requests[0].messages[1].content,
        "Context: \n\nQuestion: Anything?\n\nAnswer:"
    );
}

#[tokio::test(start_paused = true)]
async fn test_query_round_trips_into_prompt() {
    let harness = HarnessBuilder::default().rows(Vec::new()).build();
    let query = "Quotes \"and\" <tags> & {{braces}}\nnewline";

    harness.pipeline.handle(&ask(query)).await;

    let requests = harness.chat.requests.lock().unwrap();
    assert_eq!(
        requests[0].messages[1].content,
        format!("Context: \n\nQuestion: {}\n\nAnswer:", query)
    );
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_makes_no_calls() {
    let harness = HarnessBuilder::default().build();

    for body in [r#"{}"#, r#"{"query": ""}"#, r#"{"query": null}"#] {
        let response = harness.pipeline.handle(&HttpRequest::post(body)).await;
        assert_eq!(response.status, 500);
        assert_eq!(response.body, r#"{"error":"Query is required"}"#);
    }

    assert!(harness.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_query_does_not_consume_admission() {
    let harness = HarnessBuilder::default().build();

    for _ in 0..5 {
        harness.pipeline.handle(&HttpRequest::post("{}")).await;
    }

    assert!(harness.pipeline.handle(&ask("q")).await.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_missing_content_uses_fallback() {
    let harness = HarnessBuilder::default().content(None).build();

    let response = harness.pipeline.handle(&ask("q")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"{"response":"Error"}"#);
}

#[tokio::test(start_paused = true)]
async fn test_identical_requests_give_identical_envelopes() {
    let harness = HarnessBuilder::default().without_admission().build();

    let first = harness.pipeline.handle(&ask("Same question")).await;
    let second = harness.pipeline.handle(&ask("Same question")).await;

    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn test_embedding_failure_stops_pipeline() {
    let harness = HarnessBuilder::default().embed_fails().build();

    let response = harness.pipeline.handle(&ask("q")).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body, r#"{"error":"Incorrect API key provided"}"#);
    assert_eq!(harness.calls(), vec!["embed"]);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_dimensions_stop_pipeline() {
    let harness = HarnessBuilder::default().dimensions(1536).build();

    let err = harness
        .pipeline
        .answer(Query::new("q").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Upstream {
            stage: Stage::Embedding,
            ..
        }
    ));
    assert_eq!(harness.calls(), vec!["embed"]);
}

#[tokio::test(start_paused = true)]
async fn test_retrieval_failure_skips_generation() {
    let harness = HarnessBuilder::default().store_fails().build();

    let err = harness
        .pipeline
        .answer(Query::new("q").unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(
        err.to_string(),
        "Could not find the function public.hybrid_search"
    );
    assert_eq!(harness.calls(), vec!["embed", "retrieve"]);
}

#[tokio::test(start_paused = true)]
async fn test_admission_store_failure_makes_no_calls() {
    let harness = HarnessBuilder::default().limiter_fails().build();

    let response = harness.pipeline.handle(&ask("q")).await;

    assert_eq!(response.status, 500);
    assert_eq!(
        response.body,
        r#"{"error":"Failed to reach rate limit store: connection refused"}"#
    );
    assert!(harness.calls().is_empty());

    let err = harness
        .pipeline
        .answer(Query::new("q").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Upstream {
            stage: Stage::Admission,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_generation_failure_fails_request() {
    let harness = HarnessBuilder::default().chat_fails().build();

    let response = harness.pipeline.handle(&ask("q")).await;

    assert_eq!(response.status, 500);
    assert_eq!(
        response.body,
        r#"{"error":"That model is currently overloaded with other requests."}"#
    );
    assert_eq!(harness.calls(), vec!["embed", "retrieve", "generate"]);

    let err = harness
        .pipeline
        .answer(Query::new("q").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Upstream {
            stage: Stage::Generation,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_non_post_is_rejected() {
    let harness = HarnessBuilder::default().build();

    let response = harness.pipeline.handle(&HttpRequest::new("GET", "")).await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body, r#"{"error":"HTTP method GET is not allowed."}"#);
    assert!(harness.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_preflight_with_cors() {
    let harness = HarnessBuilder::default().build();

    let response = harness.pipeline.handle(&HttpRequest::new("OPTIONS", "")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");
    assert_eq!(response.header("Access-Control-Allow-Origin"), Some("*"));
    assert!(harness.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cors_disabled() {
    let harness = HarnessBuilder::default().build();
    let pipeline = harness.pipeline.clone().with_boundary(BoundarySettings {
        cors: false,
        status_codes: StatusCodePolicy::Uniform,
    });

    let response = pipeline.handle(&HttpRequest::new("OPTIONS", "")).await;
    assert_eq!(response.body, r#"{"error":"HTTP method OPTIONS is not allowed."}"#);

    let response = pipeline.handle(&ask("q")).await;
    assert!(response.is_success());
    assert!(response.header("Access-Control-Allow-Origin").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_status_codes_by_kind() {
    let harness = HarnessBuilder::default().build();
    let pipeline = harness.pipeline.clone().with_boundary(BoundarySettings {
        cors: true,
        status_codes: StatusCodePolicy::ByKind,
    });

    assert_eq!(pipeline.handle(&HttpRequest::post("{}")).await.status, 400);
    assert_eq!(pipeline.handle(&HttpRequest::new("PUT", "")).await.status, 405);

    for _ in 0..3 {
        assert_eq!(pipeline.handle(&ask("q")).await.status, 200);
    }
    let denied = pipeline.handle(&ask("q")).await;
    assert_eq!(denied.status, 429);
    assert_eq!(denied.header("Access-Control-Allow-Origin"), Some("*"));
}

#[tokio::test(start_paused = true)]
async fn test_upstream_status_by_kind() {
    let harness = HarnessBuilder::default().store_fails().build();
    let pipeline = harness.pipeline.clone().with_boundary(BoundarySettings {
        cors: true,
        status_codes: StatusCodePolicy::ByKind,
    });

    assert_eq!(pipeline.handle(&ask("q")).await.status, 502);
}
