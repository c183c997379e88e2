use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_zones, Zone};
use serde_json::Value;
use tower::ServiceExt;

const TOKEN: &str = "Bearer test-token";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, TOKEN)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, TOKEN)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_return_403() {
    let resp = app()
        .oneshot(Request::builder().uri("/client/v4/zones").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0]["message"], "Authentication error");
}

#[tokio::test]
async fn verify_reports_legacy_scheme() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/client/v4/user/tokens/verify")
                .header("X-Auth-Key", "0123456789abcdef0123456789abcdef01234")
                .header("X-Auth-Email", "ops@example.com")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["result"]["scheme"], "legacy");
}

#[tokio::test]
async fn mixed_auth_schemes_are_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/client/v4/user/tokens/verify")
                .header(http::header::AUTHORIZATION, TOKEN)
                .header("X-Auth-Key", "k")
                .header("X-Auth-Email", "ops@example.com")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- list ---

#[tokio::test]
async fn list_zones_empty() {
    let resp = app().oneshot(get("/client/v4/zones")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["result"], serde_json::json!([]));
    assert_eq!(body["result_info"]["total_pages"], 1);
}

#[tokio::test]
async fn list_zones_paginates() {
    let names = ["a.com", "b.com", "c.com", "d.com", "e.com"];
    let app = app_with_zones(&names);

    let resp = app.clone().oneshot(get("/client/v4/zones?per_page=2")).await.unwrap();
    let first = body_json(resp).await;
    assert_eq!(first["result_info"]["total_pages"], 3);
    assert_eq!(first["result_info"]["total_count"], 5);
    assert_eq!(first["result_info"]["page"], 1);
    assert_eq!(first["result"][0]["name"], "a.com");

    let resp = app.oneshot(get("/client/v4/zones?per_page=2&page=3")).await.unwrap();
    let last = body_json(resp).await;
    assert_eq!(last["result_info"]["count"], 1);
    assert_eq!(last["result"][0]["name"], "e.com");
}

// --- create / get ---

#[tokio::test]
async fn duplicate_zone_returns_400() {
    let resp = app_with_zones(&["example.com"])
        .oneshot(json_request("POST", "/client/v4/zones", r#"{"name":"example.com"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["code"], 1061);
}

#[tokio::test]
async fn get_zone_not_found() {
    let resp = app().oneshot(get("/client/v4/zones/does-not-exist")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["errors"][0]["code"], 7003);
}

// --- settings ---

#[tokio::test]
async fn csrf_field_is_rejected() {
    let app = app_with_zones(&["example.com"]);
    let resp = app.clone().oneshot(get("/client/v4/zones")).await.unwrap();
    let id = body_json(resp).await["result"][0]["id"].as_str().unwrap().to_string();

    let resp = app
        .oneshot(json_request(
            "PATCH",
            &format!("/client/v4/zones/{id}/settings/ssl"),
            r#"{"value":"full","cfCSRFToken":"abc"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_setting_is_a_soft_failure() {
    let app = app_with_zones(&["example.com"]);
    let resp = app.clone().oneshot(get("/client/v4/zones")).await.unwrap();
    let id = body_json(resp).await["result"][0]["id"].as_str().unwrap().to_string();

    let resp = app
        .oneshot(json_request(
            "PATCH",
            &format!("/client/v4/zones/{id}/settings/not_a_setting"),
            r#"{"value":"on"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0]["code"], 1006);
}

// --- failure endpoints ---

#[tokio::test]
async fn maintenance_is_html_503() {
    let resp = app().oneshot(get("/client/v4/maintenance")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_bytes(resp).await;
    assert!(body.starts_with(b"<html>"));
}

// --- full lifecycle ---

#[tokio::test]
async fn zone_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/client/v4/zones", r#"{"name":"example.com"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created: Zone = serde_json::from_value(body_json(resp).await["result"].clone()).unwrap();
    assert_eq!(created.name, "example.com");
    let id = created.id;

    // get
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/client/v4/zones/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["result"]["name"], "example.com");

    // setting defaults to off
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/client/v4/zones/{id}/settings/development_mode")))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["result"]["value"], "off");

    // update setting
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PATCH",
            &format!("/client/v4/zones/{id}/settings/development_mode"),
            r#"{"value":"on"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // read it back
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/client/v4/zones/{id}/settings/development_mode")))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["value"], "on");
}
