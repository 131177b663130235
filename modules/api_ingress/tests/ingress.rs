use api_ingress::{ApiIngress, ApiIngressConfig};
use apiary::prelude::*;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

fn pancake_app(documentation_enabled: bool) -> App {
    let mut options = AppOptions::new("PancakeApi");
    options.documentation_enabled = documentation_enabled;

    let mut builder = AppBuilder::new(options);
    builder.mount_at("/api");

    builder
        .describe("Fetch a pancake")
        .route_param_with("id", "Pancake ID", Matcher::integer(), Cast::to_int())
        .responds_with(200, "Found", json!({"id": 1}))
        .get("/pancake/:id", |ctx, args| {
            let body = json!({"id": args[0].clone()});
            Ok(ctx.json_response(&body))
        })
        .unwrap();

    builder
        .describe("Make a pancake")
        .required_param_with("diameter", "Diameter in cm", Matcher::integer(), Cast::to_int())
        .param("topping", "Topping", Matcher::string())
        .post("/pancakes", |ctx, _| {
            ctx.set_status(201);
            let params = Value::Object(ctx.params().clone());
            Ok(ctx.json_response(&params))
        })
        .unwrap();

    builder
        .get("/griddle", |_, _| Err(anyhow::anyhow!("griddle on fire").into()))
        .unwrap();

    builder.build().unwrap()
}

fn router(documentation_enabled: bool) -> Router {
    ApiIngress::new(pancake_app(documentation_enabled), ApiIngressConfig::default()).router()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn dispatches_under_the_mountpoint() {
    let response = router(true).oneshot(get("/api/pancake/7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_json(response).await, json!({"id": 7}));
}

#[tokio::test]
async fn json_body_is_cast_and_filtered() {
    let response = router(true)
        .oneshot(post_json(
            "/api/pancakes?topping=jam",
            json!({"diameter": "20", "evil": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await,
        json!({"diameter": 20, "topping": "jam"})
    );
}

#[tokio::test]
async fn form_body_is_accepted() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/pancakes")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("diameter=18&topping=maple+syrup"))
        .unwrap();
    let response = router(true).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await,
        json!({"diameter": 18, "topping": "maple syrup"})
    );
}

#[tokio::test]
async fn validation_failures_are_400() {
    let response = router(true)
        .oneshot(post_json("/api/pancakes", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Missing parameter :diameter"})
    );

    let response = router(true).oneshot(get("/api/pancake/abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Received String, expected Integer for :id"})
    );
}

#[tokio::test]
async fn malformed_json_is_400() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/pancakes")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{diameter"))
        .unwrap();
    let response = router(true).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({"error": "Malformed JSON body"})
    );
}

#[tokio::test]
async fn handler_failures_are_500() {
    let response = router(true).oneshot(get("/api/griddle")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn unmatched_and_out_of_mount_requests_are_404() {
    let response = router(true).oneshot(get("/api/waffles")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"error": "No matching action found for GET /waffles"})
    );

    let response = router(true).oneshot(get("/pancake/7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"error": "No matching action found for GET /pancake/7"})
    );
}

#[tokio::test]
async fn serves_documentation() {
    let response = router(true).oneshot(get("/docs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("<section class=\"apiary-method\">"));
    assert!(html.contains("Make a pancake"));

    let response = router(true).oneshot(get("/docs.md")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let markdown = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(markdown.starts_with("## PancakeApi"));
    assert!(markdown.contains("## GET /api/pancake/:id"));
}

#[tokio::test]
async fn serves_openapi() {
    let response = router(true).oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let contract = body_json(response).await;
    assert_eq!(contract["info"]["title"], "PancakeApi");
    assert!(contract["paths"]["/api/pancake/{id}"]["get"].is_object());

    let response = router(true).oneshot(get("/openapi.yaml")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let yaml = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(yaml.contains("openapi:"));
    assert!(yaml.contains("PancakeApi"));
}

#[tokio::test]
async fn disabled_documentation_is_not_served() {
    let response = router(false).oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = router(false).oneshot(get("/docs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // actions still work
    let response = router(false).oneshot(get("/api/pancake/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_check_responds() {
    let response = router(true).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn body_limit_is_enforced() {
    let config = ApiIngressConfig {
        body_limit_bytes: 8,
        ..ApiIngressConfig::default()
    };
    let router = ApiIngress::new(pancake_app(true), config).router();
    let response = router
        .oneshot(post_json("/api/pancakes", json!({"diameter": 20, "topping": "jam"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn cors_headers_when_enabled() {
    let request = || {
        Request::builder()
            .uri("/api/pancake/7")
            .header(header::ORIGIN, "https://pancakes.example")
            .body(Body::empty())
            .unwrap()
    };

    let config = ApiIngressConfig {
        cors_enabled: true,
        ..ApiIngressConfig::default()
    };
    let response = ApiIngress::new(pancake_app(true), config)
        .router()
        .oneshot(request())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );

    let response = router(true).oneshot(request()).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn slow_actions_time_out_with_408() {
    let mut builder = App::builder("Slow");
    builder
        .get("/slow", |_, _| {
            std::thread::sleep(std::time::Duration::from_millis(1500));
            Ok("done".into())
        })
        .unwrap();
    let config = ApiIngressConfig {
        timeout_sec: 1,
        ..ApiIngressConfig::default()
    };
    let response = ApiIngress::new(builder.build().unwrap(), config)
        .router()
        .oneshot(get("/slow"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}
