mod common;

use axum::http::{header, Method, StatusCode};
use common::{body_json, puzzle_body, request, TestApp};
use puzzle_service::models::PermissionCode;
use tower::util::ServiceExt;

#[tokio::test]
async fn create_puzzle_returns_location_and_version_one() {
    let app = TestApp::new();
    let (user, token) = app.editor("setter").await;

    let res = app
        .json(Method::POST, "/v1/puzzles", Some(&token), puzzle_body("Monday", true))
        .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let location = res
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_string();
    let body = body_json(res).await;
    let puzzle = &body["puzzle"];
    assert_eq!(location, format!("/v1/puzzles/{}", puzzle["id"]));
    assert_eq!(puzzle["version"], 1);
    assert_eq!(puzzle["title"], "Monday");
    assert_eq!(puzzle["author"]["id"], user.id);
    assert_eq!(puzzle["author"]["display_name"], "setter");
    assert_eq!(puzzle["content"]["across"]["1"]["answer"], "CAT");
}

#[tokio::test]
async fn create_puzzle_reports_every_invalid_field() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;

    let res = app
        .json(
            Method::POST,
            "/v1/puzzles",
            Some(&token),
            serde_json::json!({ "title": "", "width": 0, "height": -1 }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(res).await;
    assert_eq!(body["error"]["title"][0], "must be provided");
    assert_eq!(body["error"]["description"][0], "must be provided");
    assert_eq!(body["error"]["width"][0], "must be a positive integer");
    assert_eq!(body["error"]["height"][0], "must be a positive integer");
}

#[tokio::test]
async fn create_puzzle_requires_the_create_permission() {
    let app = TestApp::new();
    let reader = app
        .create_user("reader", true, &[PermissionCode::PuzzlesRead])
        .await;
    let token = app.token_for(&reader).await;

    let anonymous = app
        .json(Method::POST, "/v1/puzzles", None, puzzle_body("Monday", true))
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .json(Method::POST, "/v1/puzzles", Some(&token), puzzle_body("Monday", true))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = body_json(res).await;
    assert_eq!(
        body["error"],
        "your user account doesn't have the necessary permissions to access this resource"
    );
}

#[tokio::test]
async fn unpublished_puzzles_are_hidden_from_readers() {
    let app = TestApp::new();
    let (_, editor) = app.editor("setter").await;
    let draft = app.create_puzzle(&editor, "Draft", false).await;
    let uri = format!("/v1/puzzles/{}", draft["id"]);

    let anonymous = app.get(&uri, None).await;
    assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);

    let as_editor = app.get(&uri, Some(&editor)).await;
    assert_eq!(as_editor.status(), StatusCode::OK);
    assert_eq!(body_json(as_editor).await["puzzle"]["title"], "Draft");
}

#[tokio::test]
async fn show_puzzle_with_malformed_or_unknown_id_is_not_found() {
    let app = TestApp::new();

    for uri in ["/v1/puzzles/abc", "/v1/puzzles/0", "/v1/puzzles/999"] {
        let res = app.get(uri, None).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(
            body_json(res).await["error"],
            "the requested resource could not be found"
        );
    }
}

#[tokio::test]
async fn patch_updates_only_supplied_fields_and_bumps_version() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;
    let created = app.create_puzzle(&token, "Monday", false).await;
    let uri = format!("/v1/puzzles/{}", created["id"]);

    let res = app
        .json(
            Method::PATCH,
            &uri,
            Some(&token),
            serde_json::json!({ "published": true }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    let puzzle = body_json(res).await["puzzle"].clone();
    assert_eq!(puzzle["published"], true);
    assert_eq!(puzzle["title"], "Monday");
    assert_eq!(puzzle["version"], 2);
    assert_eq!(puzzle["created_at"], created["created_at"]);
    assert_ne!(puzzle["updated_at"], created["updated_at"]);
}

#[tokio::test]
async fn patch_with_invalid_result_leaves_puzzle_untouched() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;
    let created = app.create_puzzle(&token, "Monday", true).await;
    let uri = format!("/v1/puzzles/{}", created["id"]);

    let res = app
        .json(Method::PATCH, &uri, Some(&token), serde_json::json!({ "title": "" }))
        .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let stored = body_json(app.get(&uri, None).await).await["puzzle"].clone();
    assert_eq!(stored["title"], "Monday");
    assert_eq!(stored["version"], 1);
}

#[tokio::test]
async fn patch_with_stale_expected_version_conflicts() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;
    let created = app.create_puzzle(&token, "Monday", true).await;
    let uri = format!("/v1/puzzles/{}", created["id"]);

    let first = app
        .json(Method::PATCH, &uri, Some(&token), serde_json::json!({ "title": "Tuesday" }))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let mut req = request(
        Method::PATCH,
        &uri,
        Some(&token),
        Some(serde_json::json!({ "title": "Wednesday" }).to_string()),
    );
    req.headers_mut()
        .insert("x-expected-version", "1".parse().unwrap());
    let res = app.send(req).await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(res).await["error"],
        "unable to update the record due to an edit conflict, please try again"
    );

    let mut bad = request(
        Method::PATCH,
        &uri,
        Some(&token),
        Some(serde_json::json!({ "title": "Wednesday" }).to_string()),
    );
    bad.headers_mut()
        .insert("x-expected-version", "two".parse().unwrap());
    assert_eq!(app.send(bad).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_patches_never_lose_an_update() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;
    let created = app.create_puzzle(&token, "Monday", true).await;
    let uri = format!("/v1/puzzles/{}", created["id"]);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let req = request(
                Method::PATCH,
                &uri,
                Some(&token),
                Some(serde_json::json!({ "title": format!("Edit {}", i) }).to_string()),
            );
            tokio::spawn(app.router.clone().oneshot(req))
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap().unwrap().status());
    }

    let succeeded = statuses.iter().filter(|s| **s == StatusCode::OK).count() as i64;
    assert!(succeeded >= 1);
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::OK || *s == StatusCode::CONFLICT));

    let stored = body_json(app.get(&uri, None).await).await["puzzle"].clone();
    assert_eq!(stored["version"], 1 + succeeded);
}

#[tokio::test]
async fn delete_puzzle_then_not_found() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;
    let created = app.create_puzzle(&token, "Monday", true).await;
    let uri = format!("/v1/puzzles/{}", created["id"]);

    let res = app
        .send(request(Method::DELETE, &uri, Some(&token), None))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["message"], "puzzle successfully deleted");

    let again = app
        .send(request(Method::DELETE, &uri, Some(&token), None))
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get(&uri, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_paginates_with_metadata() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;
    for i in 0..25 {
        app.create_puzzle(&token, &format!("Puzzle {:02}", i), true).await;
    }

    let mut seen = Vec::new();
    for (page, expected) in [(1, 10), (2, 10), (3, 5)] {
        let res = app
            .get(&format!("/v1/puzzles?page={}&page_size=10&sort=id", page), None)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        let puzzles = body["puzzles"].as_array().unwrap();
        assert_eq!(puzzles.len(), expected);
        assert_eq!(body["metadata"]["current_page"], page);
        assert_eq!(body["metadata"]["page_size"], 10);
        assert_eq!(body["metadata"]["total_pages"], 3);
        assert_eq!(body["metadata"]["total_records"], 25);
        seen.extend(puzzles.iter().map(|p| p["id"].as_i64().unwrap()));
    }

    let mut sorted = seen.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted, seen, "ids ascend with no repeats across pages");
    assert_eq!(seen.len(), 25);
}

#[tokio::test]
async fn list_beyond_last_page_is_empty_but_counted() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;
    for i in 0..3 {
        app.create_puzzle(&token, &format!("Puzzle {}", i), true).await;
    }

    let body = body_json(app.get("/v1/puzzles?page=9&page_size=2", None).await).await;
    assert_eq!(body["puzzles"].as_array().unwrap().len(), 0);
    assert_eq!(body["metadata"]["total_records"], 3);
    assert_eq!(body["metadata"]["total_pages"], 2);
}

#[tokio::test]
async fn list_empty_store_has_zeroed_metadata() {
    let app = TestApp::new();

    let body = body_json(app.get("/v1/puzzles", None).await).await;
    assert_eq!(body["puzzles"], serde_json::json!([]));
    assert_eq!(body["metadata"]["total_records"], 0);
    assert_eq!(body["metadata"]["total_pages"], 0);
}

#[tokio::test]
async fn list_sorts_descending_by_title() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;
    for title in ["Bravo", "Alpha", "Charlie"] {
        app.create_puzzle(&token, title, true).await;
    }

    let body = body_json(app.get("/v1/puzzles?sort=-title", None).await).await;
    let titles: Vec<_> = body["puzzles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["Charlie", "Bravo", "Alpha"]);
}

#[tokio::test]
async fn list_rejects_bad_query_parameters() {
    let app = TestApp::new();

    let res = app
        .get("/v1/puzzles?page=0&page_size=1000&sort=author&published=maybe", None)
        .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(res).await;
    assert_eq!(body["error"]["page"][0], "must be greater than zero");
    assert_eq!(body["error"]["page_size"][0], "must be a maximum of 100");
    assert_eq!(body["error"]["sort"][0], "invalid sort value");
    assert_eq!(body["error"]["published"][0], "must be one of true, false or all");
}

#[tokio::test]
async fn published_filter_only_widens_for_editors() {
    let app = TestApp::new();
    let (_, editor) = app.editor("setter").await;
    app.create_puzzle(&editor, "Live", true).await;
    app.create_puzzle(&editor, "Draft", false).await;

    let anonymous = body_json(app.get("/v1/puzzles?published=all", None).await).await;
    assert_eq!(anonymous["metadata"]["total_records"], 1);

    let all = body_json(app.get("/v1/puzzles?published=all", Some(&editor)).await).await;
    assert_eq!(all["metadata"]["total_records"], 2);

    let drafts = body_json(app.get("/v1/puzzles?published=false", Some(&editor)).await).await;
    assert_eq!(drafts["metadata"]["total_records"], 1);
    assert_eq!(drafts["puzzles"][0]["title"], "Draft");
}

#[tokio::test]
async fn unsupported_method_is_405_json() {
    let app = TestApp::new();

    let res = app
        .send(request(Method::PUT, "/v1/puzzles", None, None))
        .await;

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body_json(res).await["error"],
        "the requested method is not supported for this resource"
    );
}

#[tokio::test]
async fn unknown_route_is_404_json() {
    let app = TestApp::new();

    let res = app.get("/v1/crosswords", None).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(res).await["error"],
        "the requested resource could not be found"
    );
}

#[tokio::test]
async fn malformed_bodies_are_400() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;

    let cases = [
        ("", "body must not be empty"),
        ("{\"title\": ", "body contains badly-formed JSON"),
        ("{\"title\": 7}", "body contains incorrect JSON"),
        ("{\"colour\": \"red\"}", "body contains incorrect JSON"),
        ("{} {}", "body must only contain a single JSON value"),
    ];

    for (raw, prefix) in cases {
        let res = app
            .send(request(
                Method::POST,
                "/v1/puzzles",
                Some(&token),
                Some(raw.to_string()),
            ))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{:?}", raw);
        let message = body_json(res).await["error"].as_str().unwrap().to_string();
        assert!(message.starts_with(prefix), "{:?} gave {:?}", raw, message);
    }
}
