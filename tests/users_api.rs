mod common;

use axum::http::{Method, StatusCode};
use common::{app, new_user, send, Caller};
use serde_json::json;

#[tokio::test]
async fn create_returns_envelope_without_password() {
    let app = app();
    let res = send(&app, Method::POST, "/users", Some(new_user(1)), None).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["status"], true);
    assert_eq!(res.body["statusCode"], 201);
    assert_eq!(res.body["message"], "Success");
    let data = &res.body["data"];
    assert_eq!(data["email"], "user1@example.com");
    assert_eq!(data["role"], "USER");
    assert_eq!(data["isActive"], true);
    assert!(data.get("passwordHash").is_none());
    assert!(data.get("password").is_none());
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let app = app();
    send(&app, Method::POST, "/users", Some(new_user(1)), None).await;
    let mut clash = new_user(2);
    clash["email"] = json!("user1@example.com");
    let res = send(&app, Method::POST, "/users", Some(clash), None).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["status"], false);
    assert_eq!(res.body["message"], "User with email already exists");
    assert_eq!(res.body["path"], "/users");
    assert_eq!(res.body["method"], "POST");
    assert!(res.body.get("errors").is_none());
}

#[tokio::test]
async fn validation_reports_every_field() {
    let app = app();
    let body = json!({
        "firstName": "Ada",
        "email": "not-an-email",
        "phoneNumber": "12",
        "password": "short",
        "isAdmin": true
    });
    let res = send(&app, Method::POST, "/users", Some(body), None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "Validation failed");
    let fields: Vec<&str> = res.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["lastName", "email", "phoneNumber", "password", "isAdmin"]);
    assert_eq!(res.body["errors"][4]["messages"][0], "property isAdmin should not exist");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = app();
    let req = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/users")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let res = common::send_raw(&app, req).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["status"], false);
    assert!(!res.body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn list_clamps_limit_and_reports_meta() {
    let app = app();
    for n in 0..3 {
        send(&app, Method::POST, "/users", Some(new_user(n)), None).await;
    }
    let res = send(&app, Method::GET, "/users?limit=500&page=abc", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    let meta = &res.body["data"]["meta"];
    assert_eq!(meta["limit"], 100);
    assert_eq!(meta["page"], 1);
    assert_eq!(meta["total"], 3);
    assert_eq!(meta["lastPage"], 1);

    let res = send(&app, Method::GET, "/users?sortBy=firstName&sortOrder=asc&limit=2&page=2", None, None).await;
    let items = res.body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["firstName"], "First2");
}

#[tokio::test]
async fn search_by_phone_number() {
    let app = app();
    let created = send(&app, Method::POST, "/users", Some(new_user(7)), None).await;
    let res = send(&app, Method::GET, "/users/search?phoneNumber=%2B14155550007", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["id"], created.body["data"]["id"]);

    let res = send(&app, Method::GET, "/users/search?phoneNumber=%2B19999999999", None, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_phone_in_raw_and_encoded_form() {
    let app = app();
    let created = send(&app, Method::POST, "/users", Some(new_user(7)), None).await;
    send(&app, Method::POST, "/users", Some(new_user(8)), None).await;
    for uri in [
        "/users?phoneNumber=+14155550007",
        "/users?phoneNumber=%2B14155550007",
        "/users?phoneNumber=%2B1%20(415)%20555-0007",
    ] {
        let res = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(res.status, StatusCode::OK, "{}", uri);
        assert_eq!(res.body["data"]["meta"]["total"], 1, "{}", uri);
        assert_eq!(res.body["data"]["items"][0]["id"], created.body["data"]["id"]);
    }
}

#[tokio::test]
async fn get_unknown_and_malformed_ids() {
    let app = app();
    let res = send(&app, Method::GET, &format!("/users/{}", uuid::Uuid::new_v4()), None, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = send(&app, Method::GET, "/users/123", None, None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_requires_admin_or_manager() {
    let app = app();
    let created = send(&app, Method::POST, "/users", Some(new_user(1)), None).await;
    let uri = format!("/users/{}", created.body["data"]["id"].as_str().unwrap());

    let res = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "No user found in request");

    let res = send(&app, Method::DELETE, &uri, None, Some(Caller::new("USER"))).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "You are not allowed to perform this action");

    let res = send(&app, Method::DELETE, &uri, None, Some(Caller::new("MANAGER"))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"], serde_json::Value::Null);
    assert_eq!(res.body["message"], "User deleted successfully");

    let res = send(&app, Method::DELETE, &uri, None, Some(Caller::new("ADMIN"))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
