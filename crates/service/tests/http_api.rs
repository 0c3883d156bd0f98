use std::fs;
use std::io::Cursor;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use core_types::config::{AppConfig, EncoderBackend};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use image_embedding::EmbeddingProvider;
use serde_json::{Value, json};
use service::{AppState, build_router};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

struct Harness {
    dir: TempDir,
    app: Router,
}

impl Harness {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.paths.quests_dir = dir.path().join("quests");
        cfg.paths.leaderboard_file = dir.path().join("leaderboard.json");
        cfg.paths.legacy_asset_dirs = Vec::new();
        cfg.paths.relative_prefixes = vec![Default::default()];
        cfg.paths.fallback_dirs = Vec::new();
        cfg.model.backend = EncoderBackend::Histogram;
        cfg.server.compare_workers = 2;
        fs::create_dir_all(&cfg.paths.quests_dir).unwrap();

        let provider = EmbeddingProvider::from_config(&cfg.model).unwrap();
        let app = build_router(AppState::new(&cfg, Arc::new(provider)));
        Self { dir, app }
    }

    fn quest_dir(&self, name: &str) -> std::path::PathBuf {
        let path = self.dir.path().join("quests").join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }
}

fn png(img: RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn landmark() -> Vec<u8> {
    png(RgbImage::from_fn(32, 32, |x, y| {
        if y < 16 { Rgb([40, 90, 200]) } else if x < 16 { Rgb([30, 160, 40]) } else { Rgb([150, 150, 150]) }
    }))
}

fn unrelated() -> Vec<u8> {
    png(RgbImage::from_pixel(32, 32, Rgb([250, 210, 10])))
}

fn data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

fn similarity(body: &Value) -> f64 {
    body["similarity"].as_f64().expect("similarity field")
}

#[tokio::test]
async fn health_and_root_report_a_loaded_model() {
    let h = Harness::new();
    let (status, body) = h.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "healthy", "model_loaded": true, "processor_loaded": true})
    );

    let (status, body) = h.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["endpoints"]["compare"], "/compare (supports multiple answer images)");
}

#[tokio::test]
async fn identical_answer_photo_scores_one() {
    let h = Harness::new();
    let quest = h.quest_dir("Downtown");
    fs::write(quest.join("a.jpg"), landmark()).unwrap();
    fs::write(quest.join("b.jpg"), unrelated()).unwrap();

    let (status, body) = h
        .post(
            "/compare",
            json!({"playerImage": data_uri(&landmark()), "answerImage": ["b.jpg", "a.jpg"]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!((similarity(&body) - 1.0).abs() < 1e-4);

    let (_, only_b) = h
        .post(
            "/compare",
            json!({"playerImage": data_uri(&landmark()), "answerImage": "b.jpg"}),
        )
        .await;
    assert!(similarity(&only_b) < similarity(&body));
}

#[tokio::test]
async fn raw_and_prefixed_payloads_score_the_same() {
    let h = Harness::new();
    fs::write(h.quest_dir("Park").join("answer.jpg"), unrelated()).unwrap();
    let bytes = landmark();

    let (_, prefixed) = h
        .post(
            "/compare",
            json!({"playerImage": data_uri(&bytes), "answerImage": "answer.jpg"}),
        )
        .await;
    let (_, raw) = h
        .post(
            "/compare",
            json!({"playerImage": STANDARD.encode(&bytes), "answerImage": "answer.jpg"}),
        )
        .await;
    assert!((similarity(&prefixed) - similarity(&raw)).abs() < 1e-9);
}

#[tokio::test]
async fn legacy_pair_of_same_image_scores_one() {
    let h = Harness::new();
    let x = data_uri(&landmark());
    let (status, body) = h.post("/compare", json!({"img1": x, "img2": x})).await;
    assert_eq!(status, StatusCode::OK);
    assert!((similarity(&body) - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn missing_answer_is_a_bad_request() {
    let h = Harness::new();
    let (status, body) = h
        .post(
            "/compare",
            json!({"playerImage": data_uri(&landmark()), "answerImage": "missing.jpg"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not load any answer images");
}

#[tokio::test]
async fn malformed_compare_requests_are_rejected() {
    let h = Harness::new();
    let (status, body) = h.send(Method::POST, "/compare", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");

    let (status, _) = h.post("/compare", json!({"foo": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h
        .post("/compare", json!({"playerImage": "@@@", "answerImage": "a.jpg"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid base64 image data"));

    let not_an_image = STANDARD.encode(b"just some text");
    let (status, _) = h
        .post("/compare", json!({"img1": not_an_image, "img2": not_an_image}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let h = Harness::new();
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/compare")
        .header(header::ORIGIN, "https://cityquest.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            "content-type,ngrok-skip-browser-warning",
        )
        .body(Body::empty())
        .unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn leaderboard_add_then_get_sorted() {
    let h = Harness::new();
    for (team, waypoints, time) in [("slow", 4, 900), ("partial", 2, 100), ("fast", 4, 300)] {
        let (status, body) = h
            .post(
                "/leaderboard/7/add",
                json!({
                    "team_name": team,
                    "waypoints_completed": waypoints,
                    "completion_time": time,
                    "quest_date": "2025-06-01"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Leaderboard entry added successfully");
    }

    let (status, body) = h.post("/leaderboard/7/get", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quest_id"], "7");
    let teams: Vec<&str> = body["leaderboard"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["team_name"].as_str().unwrap())
        .collect();
    assert_eq!(teams, ["fast", "slow", "partial"]);

    let (_, alias) = h.get("/leaderboard/7").await;
    assert_eq!(alias, body);

    let (status, body) = h.post("/leaderboard/7", json!({"team_name": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required field: waypoints_completed");
}

#[tokio::test]
async fn submitted_quest_can_be_listed_fetched_rated_and_matched() {
    let h = Harness::new();
    let (status, receipt) = h
        .post(
            "/api/submit-quest",
            json!({
                "questData": {
                    "id": 4242,
                    "name": "River Walk",
                    "checkpoints": [{"name": "Bridge", "lat": 45.5, "lng": -122.6}]
                },
                "zipData": {"photos": {"0": {"0": {"data": data_uri(&landmark())}}}}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["success"], true);
    assert_eq!(receipt["waypointsCount"], 1);
    let photo = receipt["savedImages"][0].as_str().unwrap().to_string();

    let (status, list) = h.get("/api/quests").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["id_string"], "4242");
    assert_eq!(list[0]["name"], "River Walk");
    assert_eq!(list[0]["waypoints"], 1);

    let (status, doc) = h.get("/api/quests/4242").await;
    assert_eq!(status, StatusCode::OK);
    let content: Value = serde_json::from_str(doc["content"].as_str().unwrap()).unwrap();
    assert_eq!(content["checkpoints"][0]["answerImage"][0], photo.as_str());

    let (status, rated) = h.post("/quest/4242/rate", json!({"rating": 5})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rated["total_ratings"], 1);
    assert_eq!(rated["new_average_rating"], 5.0);

    let (status, matched) = h
        .post(
            "/compare",
            json!({"playerImage": data_uri(&landmark()), "answerImage": [photo]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!((similarity(&matched) - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn quest_lookup_and_rating_errors() {
    let h = Harness::new();
    let (status, body) = h.get("/api/quests/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Quest not found");

    let (status, _) = h.post("/quest/nope/rate", json!({"rating": 3})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = h.post("/quest/nope/rate", json!({"rating": 9})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Rating must be an integer between 1 and 5");

    let (status, body) = h
        .post(
            "/api/submit-quest",
            json!({"questData": {"name": "Q", "checkpoints": [{"lat": 1.0, "lng": 1.0}]}, "zipData": {}}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Waypoint 1 must have at least one photo");
}

#[tokio::test]
async fn legacy_js_quests_are_listed() {
    let h = Harness::new();
    fs::write(
        h.quest_dir("Aloha").join("aloha.js"),
        "export const q = {\n  id: 2,\n  name: 'Aloha',\n  description: 'Murals',\n  checkpoints: [\n    { id: 1, name: 'Blue' },\n    { id: 2, name: 'Yellow' },\n  ],\n};\n",
    )
    .unwrap();

    let (status, submitted) = h.get("/api/submitted-quests").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        submitted,
        json!([{"filename": "aloha.js", "name": "Aloha", "description": "Murals", "waypoints": 2}])
    );

    let (_, quests) = h.get("/api/quests").await;
    assert_eq!(quests[0]["id_string"], "2");
    assert_eq!(quests[0]["waypoints"], 2);

    let (status, doc) = h.get("/api/quests/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["filename"], "aloha.js");
}
