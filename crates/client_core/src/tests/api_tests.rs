use super::*;
use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, Default)]
struct ReceivedUpload {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
    authorization: Option<String>,
}

#[derive(Clone)]
struct ServerState {
    predict_status: StatusCode,
    predict_body: Value,
    uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
}

impl ServerState {
    fn responding(predict_status: StatusCode, predict_body: Value) -> Self {
        Self {
            predict_status,
            predict_body,
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

async fn issue_token(
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    match (form.get("username"), form.get("password")) {
        (Some(user), Some(pass)) if user == "admin" && pass == "secret" => Ok(Json(json!({
            "access_token": "tok123",
            "token_type": "bearer"
        }))),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn predict(
    State(state): State<ServerState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    while let Ok(Some(field)) = multipart.next_field().await {
        let upload = ReceivedUpload {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            bytes: field.bytes().await.map(|b| b.to_vec()).unwrap_or_default(),
            authorization: authorization.clone(),
        };
        state.uploads.lock().await.push(upload);
    }
    (state.predict_status, Json(state.predict_body.clone()))
}

async fn ping() -> Json<Value> {
    Json(json!({ "message": "Hello, I am alive!" }))
}

async fn spawn_server(state: ServerState) -> HttpPredictionClient {
    let app = Router::new()
        .route("/token", post(issue_token))
        .route("/predict", post(predict))
        .route("/ping", get(ping))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    HttpPredictionClient::new(Url::parse(&format!("http://{addr}")).expect("url"))
}

fn cat_png() -> ImageUpload {
    ImageUpload::new("cat.png", b"\x89PNG fake image".to_vec())
}

#[test]
fn endpoint_joins_below_base_path() {
    let client = HttpPredictionClient::new(Url::parse("http://127.0.0.1:8000/api").expect("url"));
    assert_eq!(
        client.endpoint(PREDICT_PATH).expect("endpoint").as_str(),
        "http://127.0.0.1:8000/api/predict"
    );

    let root = HttpPredictionClient::new(Url::parse("http://127.0.0.1:8000").expect("url"));
    assert_eq!(
        root.endpoint(TOKEN_PATH).expect("endpoint").as_str(),
        "http://127.0.0.1:8000/token"
    );
}

#[test]
fn image_upload_guesses_mime_type_from_name() {
    assert_eq!(cat_png().mime_type.as_deref(), Some("image/png"));
    assert!(cat_png().is_image());
    assert!(!ImageUpload::new("notes.txt", b"hello".to_vec()).is_image());
}

#[tokio::test]
async fn authenticate_returns_token_for_valid_credentials() {
    let client = spawn_server(ServerState::responding(StatusCode::OK, json!({}))).await;

    let token = client
        .authenticate("admin", "secret")
        .await
        .expect("token issued");
    assert_eq!(token.as_str(), "tok123");
}

#[tokio::test]
async fn authenticate_collapses_rejection_and_network_failure() {
    let client = spawn_server(ServerState::responding(StatusCode::OK, json!({}))).await;
    let rejected = client
        .authenticate("admin", "wrong")
        .await
        .expect_err("bad credentials");
    assert_eq!(rejected.cause, FailureCause::Status(401));

    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let unreachable =
        HttpPredictionClient::new(Url::parse(&format!("http://{addr}")).expect("url"));
    let offline = unreachable
        .authenticate("admin", "secret")
        .await
        .expect_err("no server");
    assert!(matches!(offline.cause, FailureCause::Transport(_)));

    assert_eq!(rejected.to_string(), offline.to_string());
}

#[tokio::test]
async fn predict_posts_multipart_file_with_bearer_token() {
    let state = ServerState::responding(
        StatusCode::OK,
        json!({ "class": "benign", "confidence": "0.9213" }),
    );
    let uploads = state.uploads.clone();
    let client = spawn_server(state).await;

    let prediction = client
        .predict(&cat_png(), Some(&AccessToken::new("tok123")))
        .await
        .expect("prediction");
    assert_eq!(prediction.label, "benign");
    assert_eq!(prediction.confidence_fraction, 0.9213);

    let uploads = uploads.lock().await;
    assert_eq!(uploads.len(), 1);
    let upload = &uploads[0];
    assert_eq!(upload.field, PREDICT_FILE_FIELD);
    assert_eq!(upload.file_name.as_deref(), Some("cat.png"));
    assert_eq!(upload.content_type.as_deref(), Some("image/png"));
    assert_eq!(upload.bytes, b"\x89PNG fake image".to_vec());
    assert_eq!(upload.authorization.as_deref(), Some("Bearer tok123"));
}

#[tokio::test]
async fn predict_sends_authorization_header_without_token() {
    let state = ServerState::responding(
        StatusCode::OK,
        json!({ "class": "malignant", "confidence": 0.61 }),
    );
    let uploads = state.uploads.clone();
    let client = spawn_server(state).await;

    client.predict(&cat_png(), None).await.expect("prediction");

    let uploads = uploads.lock().await;
    let authorization = uploads[0].authorization.as_deref().unwrap_or_default();
    assert!(authorization.starts_with("Bearer"));
}

#[tokio::test]
async fn predict_maps_error_status_and_bad_body() {
    let failing = spawn_server(ServerState::responding(
        StatusCode::UNAUTHORIZED,
        json!({ "detail": "Invalid token" }),
    ))
    .await;
    let err = failing
        .predict(&cat_png(), Some(&AccessToken::new("stale")))
        .await
        .expect_err("unauthorized");
    assert_eq!(err.cause, FailureCause::Status(401));

    let malformed = spawn_server(ServerState::responding(
        StatusCode::OK,
        json!({ "label": "benign" }),
    ))
    .await;
    let err = malformed
        .predict(&cat_png(), None)
        .await
        .expect_err("missing fields");
    assert!(matches!(err.cause, FailureCause::Malformed(_)));
}

#[tokio::test]
async fn ping_reports_service_message() {
    let client = spawn_server(ServerState::responding(StatusCode::OK, json!({}))).await;
    assert_eq!(client.ping().await.expect("ping"), "Hello, I am alive!");
}
