//! Integration tests for pergamo-qs API endpoints
//!
//! Tests cover:
//! - Subject filtering over a synthetic question tree on disk
//! - Progressive batch pagination and composite feeds
//! - Year lookups, listings and reload
//! - Practice sessions and their background expiry
//! - Explanation streaming through a stub provider
//! - Question reports with deduplication and rate limiting
//! - JSON error bodies for malformed paths and queries

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use futures::StreamExt;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

use pergamo_qs::explain::{ExplainError, ExplanationProvider, TextStream};
use pergamo_qs::report::{MemoryReportStore, Notifier, QuestionReport, ReportError, ReportService};
use pergamo_qs::service::QuestionService;
use pergamo_qs::session::SessionRegistry;
use pergamo_qs::store::QuestionLoader;
use pergamo_qs::{build_router, spawn_maintenance, AppState};

// =============================================================================
// Test doubles
// =============================================================================

/// Explanation provider that replays fixed chunks
struct StubExplainer {
    chunks: Vec<&'static str>,
    fail_with_rate_limit: bool,
}

#[async_trait]
impl ExplanationProvider for StubExplainer {
    async fn explain(&self, prompt: String) -> Result<TextStream, ExplainError> {
        assert!(prompt.contains("ALTERNATIVA CORRETA"));
        if self.fail_with_rate_limit {
            return Err(ExplainError::RateLimited);
        }
        let chunks: Vec<String> = self.chunks.iter().map(|c| c.to_string()).collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Sets its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Explanation provider that sends one chunk and then never finishes
struct EndlessExplainer {
    released: Arc<AtomicBool>,
}

#[async_trait]
impl ExplanationProvider for EndlessExplainer {
    async fn explain(&self, _prompt: String) -> Result<TextStream, ExplainError> {
        let flag = DropFlag(self.released.clone());
        let chunks = futures::stream::iter(vec!["Primeiro trecho".to_string()])
            .chain(futures::stream::pending())
            .map(move |chunk| {
                let _held = &flag;
                chunk
            });
        Ok(Box::pin(chunks))
    }
}

#[derive(Default)]
struct CountingNotifier {
    calls: AtomicUsize,
}

#[async_trait]
impl Notifier for CountingNotifier {
    async fn notify(&self, _report: &QuestionReport) -> Result<(), ReportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn details(year: u16, index: u32, discipline: &str, language: Value) -> Value {
    json!({
        "title": format!("Questão {} - ENEM {}", index, year),
        "index": index,
        "year": year,
        "language": language,
        "discipline": discipline,
        "context": "Leia o texto.",
        "files": ["figura.png"],
        "correctAlternative": "C",
        "alternativesIntroduction": "Assinale a alternativa correta.",
        "alternatives": [
            {"letter": "A", "text": "primeira", "file": null, "isCorrect": false},
            {"letter": "B", "text": "segunda", "file": null, "isCorrect": false},
            {"letter": "C", "text": "terceira", "file": null, "isCorrect": true},
            {"letter": "D", "text": "quarta", "file": null, "isCorrect": false},
            {"letter": "E", "text": null, "file": "e.png", "isCorrect": false}
        ]
    })
}

fn write_question(root: &Path, rel: &str, value: &Value) {
    let dir = root.join(rel);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("details.json"), value.to_string()).unwrap();
}

/// Question tree used by most tests
fn question_tree() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    write_question(root, "2020/questions/1", &details(2020, 1, "biologia", Value::Null));
    write_question(root, "2019/questions/5", &details(2019, 5, "biologia", Value::Null));
    write_question(root, "2020/questions/2", &details(2020, 2, "fisica", Value::Null));
    write_question(root, "2021/questions/77-ingles", &details(2021, 77, "ingles", json!("ingles")));
    write_question(root, "2021/questions/78-espanhol", &details(2021, 78, "", json!("espanhol")));
    write_question(root, "2018/questions/10", &details(2018, 10, "linguagens", Value::Null));
    write_question(root, "2018/questions/11", &details(2018, 11, "artes", Value::Null));
    write_question(root, "2015/questions/30", &details(2015, 30, "ciencias-humanas", Value::Null));
    write_question(root, "2022/questions/40", &details(2022, 40, "historia", Value::Null));
    std::fs::create_dir_all(root.join("2022/questions/41")).unwrap();
    std::fs::write(root.join("2022/questions/41/details.json"), "{ broken").unwrap();
    tmp
}

struct TestApp {
    router: axum::Router,
    notifier: Arc<CountingNotifier>,
    _tree: TempDir,
}

struct TestState {
    state: AppState,
    notifier: Arc<CountingNotifier>,
    tree: TempDir,
}

async fn setup_state(explainer: Arc<dyn ExplanationProvider>, explain_rpm: u32) -> TestState {
    let tree = question_tree();
    let questions = QuestionService::load(QuestionLoader::new(tree.path()))
        .await
        .expect("Should load question tree");

    let notifier = Arc::new(CountingNotifier::default());
    let reports = ReportService::new(
        Arc::new(MemoryReportStore::new(Duration::from_secs(60))),
        notifier.clone(),
        2,
    );

    TestState {
        state: AppState::new(questions, explainer, explain_rpm, reports),
        notifier,
        tree,
    }
}

async fn setup_app_with(explainer: StubExplainer) -> TestApp {
    let test = setup_state(Arc::new(explainer), 10).await;
    TestApp {
        router: build_router(test.state),
        notifier: test.notifier,
        _tree: test.tree,
    }
}

async fn setup_app() -> TestApp {
    setup_app_with(StubExplainer {
        chunks: vec!["Sua resposta ", "está incorreta."],
        fail_with_rate_limit: false,
    })
    .await
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.expect("Should read body").to_bytes().to_vec()
}

async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

fn keys(questions: &Value) -> Vec<(u64, u64)> {
    questions
        .as_array()
        .unwrap()
        .iter()
        .map(|q| (q["year"].as_u64().unwrap(), q["index"].as_u64().unwrap()))
        .collect()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;
    let response = app.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "pergamo-qs");
    assert_eq!(body["questions"], 9);
}

// =============================================================================
// Subject filtering
// =============================================================================

#[tokio::test]
async fn test_subject_filter_orders_by_year_then_index() {
    let app = setup_app().await;
    let response = app.router.oneshot(get("/questions/biologia")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(keys(&body), vec![(2019, 5), (2020, 1)]);
    assert_eq!(body[0]["dirName"], "5");
    assert_eq!(body[0]["files"][0], "/2019/questions/5/figura.png");
}

#[tokio::test]
async fn test_foreign_language_matches_by_any_signal() {
    let app = setup_app().await;

    let response = app.router.clone().oneshot(get("/questions/ingles")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(keys(&body), vec![(2021, 77)]);

    // Empty discipline, matched by language tag and folder suffix
    let response = app.router.oneshot(get("/questions/espanhol")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(keys(&body), vec![(2021, 78)]);
}

#[tokio::test]
async fn test_literature_matches_untagged_linguagens() {
    let app = setup_app().await;
    let response = app.router.oneshot(get("/questions/literatura")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(keys(&body), vec![(2018, 10)]);
}

#[tokio::test]
async fn test_narrow_token_includes_area_only_records() {
    let app = setup_app().await;
    let response = app.router.oneshot(get("/questions/historia")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(keys(&body), vec![(2015, 30), (2022, 40)]);
}

#[tokio::test]
async fn test_unmatched_subject_is_404() {
    let app = setup_app().await;
    let response = app.router.oneshot(get("/questions/astrologia")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

// =============================================================================
// Year lookups
// =============================================================================

#[tokio::test]
async fn test_year_lookup() {
    let app = setup_app().await;

    let response = app
        .router
        .clone()
        .oneshot(get("/questions/biologia/2020"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(keys(&body), vec![(2020, 1)]);

    let response = app
        .router
        .clone()
        .oneshot(get("/questions/biologia/2020?random=true"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["index"], 1);

    let response = app
        .router
        .clone()
        .oneshot(get("/questions/biologia/abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .oneshot(get("/questions/biologia/1999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Batch pagination
// =============================================================================

#[tokio::test]
async fn test_batch_pages_and_totals() {
    let app = setup_app().await;
    let request = post_json(
        "/questions/batch",
        json!({"subjects": ["biologia", "astrologia"], "offset": 0, "limit": 1}),
    );
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["biologia"]["total"], 2);
    assert_eq!(keys(&body["biologia"]["questions"]), vec![(2019, 5)]);
    assert_eq!(body["astrologia"], json!({"questions": [], "total": 0}));
}

#[tokio::test]
async fn test_batch_offset_past_total_is_empty_page() {
    let app = setup_app().await;
    let request = post_json(
        "/questions/batch",
        json!({"subjects": ["biologia"], "offset": 100}),
    );
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["biologia"], json!({"questions": [], "total": 2}));
}

#[tokio::test]
async fn test_batch_pages_reconstruct_full_set() {
    let app = setup_app().await;
    let request = post_json("/questions/batch", json!({"subjects": ["historia"]}));
    let response = app.router.clone().oneshot(request).await.unwrap();
    let full = extract_json(response.into_body()).await["historia"]["questions"].clone();

    let mut rebuilt = Vec::new();
    for offset in 0..3 {
        let request = post_json(
            "/questions/batch",
            json!({"subjects": ["historia"], "offset": offset, "limit": 1}),
        );
        let response = app.router.clone().oneshot(request).await.unwrap();
        let body = extract_json(response.into_body()).await;
        rebuilt.extend(body["historia"]["questions"].as_array().unwrap().clone());
    }
    assert_eq!(Value::Array(rebuilt), full);
}

#[tokio::test]
async fn test_batch_rejects_bad_payloads() {
    let app = setup_app().await;

    let response = app
        .router
        .clone()
        .oneshot(post_json("/questions/batch", json!({"offset": 0})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/questions/batch",
            json!({"subjects": ["biologia"], "limit": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/questions/batch")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

// =============================================================================
// Composite feeds
// =============================================================================

#[tokio::test]
async fn test_composite_total_is_sum_of_constituents() {
    let app = setup_app().await;
    let request = post_json("/questions/feed", json!({"subject": "linguagens+ingles"}));
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    // ingles (1) + portugues (1) + literatura (1) + artes (1)
    assert_eq!(body["total"], 4);
    assert_eq!(
        keys(&body["questions"]),
        vec![(2021, 77), (2018, 10), (2018, 10), (2018, 11)]
    );
}

// =============================================================================
// Listings and reload
// =============================================================================

#[tokio::test]
async fn test_listings() {
    let app = setup_app().await;

    let response = app.router.clone().oneshot(get("/questions/years")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!([2015, 2018, 2019, 2020, 2021, 2022]));

    let response = app
        .router
        .oneshot(get("/questions/disciplines"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let disciplines: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_str().unwrap())
        .collect();
    assert!(disciplines.contains(&"biologia"));
    assert!(!disciplines.contains(&""));
    assert!(disciplines.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_reload_is_forbidden_by_default() {
    let app = setup_app().await;
    let response = app
        .router
        .oneshot(post_json("/questions/reload", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_reload_picks_up_new_files() {
    let explainer = StubExplainer {
        chunks: vec![],
        fail_with_rate_limit: false,
    };
    let test = setup_state(Arc::new(explainer), 10).await;
    let tree = test.tree;
    let router = build_router(test.state.with_reload(true));

    let response = router.clone().oneshot(get("/questions/fisica")).await.unwrap();
    assert_eq!(keys(&extract_json(response.into_body()).await).len(), 1);

    write_question(tree.path(), "2023/questions/3", &details(2023, 3, "fisica", Value::Null));

    let response = router
        .clone()
        .oneshot(post_json("/questions/reload", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await["loaded"], 10);

    let response = router.oneshot(get("/questions/fisica")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(keys(&body), vec![(2020, 2), (2023, 3)]);
}

// =============================================================================
// Practice sessions
// =============================================================================

#[tokio::test]
async fn test_session_flow() {
    let app = setup_app().await;

    let response = app
        .router
        .clone()
        .oneshot(post_json("/sessions", json!({"subjects": ["biologia", "fisica"]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let summary = extract_json(response.into_body()).await;
    assert_eq!(summary["total"], 3);
    let id = summary["id"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/sessions/{}/next?limit=2", id)))
        .await
        .unwrap();
    let page = extract_json(response.into_body()).await;
    assert_eq!(page["questions"].as_array().unwrap().len(), 2);
    let first = &page["questions"][0];
    let question_id = format!("{}-{}", first["year"], first["dirName"].as_str().unwrap());

    let answer = |letter: &str| {
        post_json(
            &format!("/sessions/{}/answer", id),
            json!({"questionId": question_id, "answer": letter}),
        )
    };

    let response = app.router.clone().oneshot(answer("C")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result = extract_json(response.into_body()).await;
    assert_eq!(result["correct"], true);
    assert_eq!(result["correctAlternative"], "C");

    let response = app.router.clone().oneshot(answer("A")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            &format!("/sessions/{}/answer", id),
            json!({"questionId": "1900-0", "answer": "A"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/sessions/{}", id)))
        .await
        .unwrap();
    let summary = extract_json(response.into_body()).await;
    assert_eq!(summary["correct"], 1);
    assert_eq!(summary["served"], 2);
    assert_eq!(summary["remaining"], 1);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/sessions/{}", id))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router
        .oneshot(get(&format!("/sessions/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_requires_subjects() {
    let app = setup_app().await;
    let response = app
        .router
        .oneshot(post_json("/sessions", json!({"subjects": []})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_session_path_and_query_are_json_errors() {
    let app = setup_app().await;

    let response = app
        .router
        .clone()
        .oneshot(get("/sessions/not-a-uuid/next?limit=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());

    let response = app
        .router
        .clone()
        .oneshot(post_json("/sessions", json!({"subjects": ["biologia"]})))
        .await
        .unwrap();
    let id = extract_json(response.into_body()).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .router
        .oneshot(get(&format!("/sessions/{}/next?limit=abc", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_non_utf8_subject_path_is_json_error() {
    let app = setup_app().await;
    let response = app
        .router
        .oneshot(get("/questions/%FF"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_idle_sessions_expire_in_background() {
    let test = setup_state(
        Arc::new(StubExplainer {
            chunks: vec![],
            fail_with_rate_limit: false,
        }),
        10,
    )
    .await;
    let state = test
        .state
        .with_sessions(SessionRegistry::with_limits(Duration::from_millis(30), 100));
    let maintenance = spawn_maintenance(&state, Duration::from_millis(10));
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(post_json("/sessions", json!({"subjects": ["biologia"]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = extract_json(response.into_body()).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    tokio::time::sleep(Duration::from_millis(150)).await;

    let response = router
        .oneshot(get(&format!("/sessions/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    maintenance.abort();
}

// =============================================================================
// Explanations
// =============================================================================

fn explain_body(answer: &str) -> Value {
    json!({
        "question": details(2020, 1, "biologia", Value::Null),
        "userAnswer": answer,
    })
}

#[tokio::test]
async fn test_explain_streams_sse_content() {
    let app = setup_app().await;
    let response = app
        .router
        .oneshot(post_json("/explain", explain_body("A")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    let text = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert!(text.contains(r#"data: {"content":"Sua resposta "}"#));
    assert!(text.contains(r#"data: {"content":"está incorreta."}"#));
}

#[tokio::test]
async fn test_explain_validation() {
    let app = setup_app().await;

    let response = app
        .router
        .clone()
        .oneshot(post_json("/explain", json!({"userAnswer": "A"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .oneshot(post_json("/explain", explain_body("Z")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_explain_upstream_rate_limit() {
    let app = setup_app_with(StubExplainer {
        chunks: vec![],
        fail_with_rate_limit: true,
    })
    .await;
    let response = app
        .router
        .oneshot(post_json("/explain", explain_body("A")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "RATE_LIMIT");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_invalid_explain_requests_do_not_consume_quota() {
    let explainer = StubExplainer {
        chunks: vec!["ok"],
        fail_with_rate_limit: false,
    };
    let router = build_router(setup_state(Arc::new(explainer), 1).await.state);

    let response = router
        .clone()
        .oneshot(post_json("/explain", explain_body("Z")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(post_json("/explain", explain_body("A")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(post_json("/explain", explain_body("A")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_dropping_explain_response_releases_upstream() {
    let released = Arc::new(AtomicBool::new(false));
    let explainer = EndlessExplainer {
        released: released.clone(),
    };
    let router = build_router(setup_state(Arc::new(explainer), 10).await.state);

    let response = router
        .oneshot(post_json("/explain", explain_body("A")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("First event should arrive")
        .expect("Body should not be finished")
        .expect("Frame should be readable");
    let data = frame.into_data().expect("Should be a data frame");
    assert!(String::from_utf8_lossy(&data).contains("Primeiro trecho"));
    assert!(!released.load(Ordering::SeqCst));

    // Client goes away mid-stream
    drop(body);
    assert!(released.load(Ordering::SeqCst));
}

// =============================================================================
// Reports
// =============================================================================

fn report_request(client: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/report-question")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(
            json!({
                "questionId": "2020-1",
                "subject": "biologia",
                "year": 2020,
                "index": 1,
                "reason": "Gabarito incorreto"
            })
            .to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_duplicate_report_is_not_renotified() {
    let app = setup_app().await;

    let response = app
        .router
        .clone()
        .oneshot(report_request("198.51.100.7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, json!({"success": true}));

    let response = app
        .router
        .oneshot(report_request("198.51.100.7"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        extract_json(response.into_body()).await,
        json!({"success": true, "alreadyReported": true})
    );
    assert_eq!(app.notifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_report_rate_limit_and_validation() {
    let app = setup_app().await;

    let invalid = Request::builder()
        .method("POST")
        .uri("/report-question")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.1")
        .body(Body::from(json!({"questionId": "2020-1"}).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(invalid).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The invalid request above consumed one of the two allowed per minute
    let response = app
        .router
        .clone()
        .oneshot(report_request("203.0.113.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .oneshot(report_request("203.0.113.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
