mod common;

use axum::http::{Method, StatusCode};
use common::{app, send, Caller};
use serde_json::{json, Value};

fn post(title: &str, content: &str) -> Value {
    json!({ "title": title, "content": content })
}

#[tokio::test]
async fn create_requires_a_principal_and_sets_owner() {
    let app = app();
    let res = send(&app, Method::POST, "/posts", Some(post("Hello", "first post body")), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "No user found in request");

    let me = Caller::new("USER");
    let res = send(&app, Method::POST, "/posts", Some(post("  Hello  ", "first post body")), Some(me)).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["title"], "Hello");
    assert_eq!(res.body["data"]["ownerId"], me.id.to_string());
}

#[tokio::test]
async fn search_paginates_matches() {
    let app = app();
    let me = Caller::new("USER");
    for i in 0..25 {
        let body = if i % 2 == 0 {
            post(&format!("Technology note {}", i), "plain content here")
        } else {
            post(&format!("Note {}", i), "all about technology trends")
        };
        let res = send(&app, Method::POST, "/posts", Some(body), Some(me)).await;
        assert_eq!(res.status, StatusCode::CREATED);
    }
    for i in 0..5 {
        send(&app, Method::POST, "/posts", Some(post(&format!("Garden {}", i), "soil and seeds")), Some(me)).await;
    }

    let res = send(&app, Method::GET, "/posts?searchTerm=technology&page=1&limit=10", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["items"].as_array().unwrap().len(), 10);
    assert_eq!(res.body["data"]["meta"]["total"], 25);
    assert_eq!(res.body["data"]["meta"]["lastPage"], 3);

    let res = send(&app, Method::GET, "/posts?searchTerm=technology&page=3&limit=10", None, None).await;
    assert_eq!(res.body["data"]["items"].as_array().unwrap().len(), 5);

    let res = send(&app, Method::GET, "/posts?limit=500", None, None).await;
    assert_eq!(res.body["data"]["meta"]["limit"], 50);
    assert_eq!(res.body["data"]["meta"]["total"], 30);
}

#[tokio::test]
async fn filter_by_owner() {
    let app = app();
    let alice = Caller::new("USER");
    let bob = Caller::new("MANAGER");
    send(&app, Method::POST, "/posts", Some(post("Alice one", "alice writes here")), Some(alice)).await;
    send(&app, Method::POST, "/posts", Some(post("Bob one", "bob writes here too")), Some(bob)).await;

    let res = send(&app, Method::GET, &format!("/posts?ownerId={}", bob.id), None, None).await;
    let items = res.body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Bob one");
}

#[tokio::test]
async fn owner_filter_rejects_non_uuids() {
    let res = send(&app(), Method::GET, "/posts?ownerId=bob", None, None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["errors"][0]["field"], "ownerId");
    assert_eq!(res.body["errors"][0]["messages"][0], "ownerId must be a UUID");
}

#[tokio::test]
async fn only_the_owner_can_change_a_post() {
    let app = app();
    let owner = Caller::new("USER");
    let created = send(&app, Method::POST, "/posts", Some(post("Mine", "content of mine")), Some(owner)).await;
    let uri = format!("/posts/{}", created.body["data"]["id"].as_str().unwrap());

    let intruder = Caller::new("ADMIN");
    let res = send(&app, Method::PATCH, &uri, Some(json!({ "title": "Taken" })), Some(intruder)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = send(&app, Method::DELETE, &uri, None, Some(intruder)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = send(&app, Method::PATCH, &uri, Some(json!({ "title": "x", "bogus": 1 })), Some(intruder)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "You can only modify your own posts");

    let res = send(&app, Method::PATCH, &uri, Some(json!({ "title": "Renamed" })), Some(owner)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["title"], "Renamed");
    assert_eq!(res.body["data"]["content"], "content of mine");

    let res = send(&app, Method::DELETE, &uri, None, Some(owner)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Post deleted successfully");
    let res = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_sort_field_falls_back_to_default() {
    let app = app();
    let res = send(&app, Method::GET, "/posts?sortBy=password", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
}
