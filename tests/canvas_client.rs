use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use canvas_complete::canvas::{CanvasClient, CanvasError, Gradebook, RetryPolicy};
use serde_json::json;

#[derive(Default)]
struct FakeCanvas {
    base:             String,
    auth_headers:     Mutex<Vec<String>>,
    queries:          Mutex<Vec<HashMap<String, String>>>,
    submission_calls: Mutex<HashMap<u64, u32>>,
    grades:           Mutex<Vec<(u64, u64, String)>>,
    page_two_calls:   Mutex<u32>,
}

async fn assignments(
    State(fake): State<Arc<FakeCanvas>>,
    Path(course): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    fake.auth_headers.lock().unwrap().push(auth);
    let page = query.get("page").cloned();
    fake.queries.lock().unwrap().push(query);

    // The "busy" course rate limits its second page once.
    if course == "busy" && page.as_deref() == Some("2") {
        let mut calls = fake.page_two_calls.lock().unwrap();
        *calls += 1;
        if *calls == 1 {
            return (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "0")], "slow down")
                .into_response();
        }
    }

    match page.as_deref() {
        Some("2") => {
            let first = format!("<{}/api/v1/courses/{course}/assignments?page=1>; rel=\"first\"", fake.base);
            ([(header::LINK, first)], Json(json!([{"id": 3, "name": "Third"}]))).into_response()
        }
        _ => {
            let next = format!(
                "<{}/api/v1/courses/{course}/assignments?page=2&per_page=100>; rel=\"next\", \
                 <{}/api/v1/courses/{course}/assignments?page=1>; rel=\"first\"",
                fake.base, fake.base
            );
            let body = json!([
                {
                    "id": 1,
                    "name": "First",
                    "due_at": "2024-02-02T06:59:00Z",
                    "grading_type": "complete_incomplete",
                    "submission_types": ["online_upload"]
                },
                {"id": 2, "name": "Second", "due_at": null, "grading_type": "points"}
            ]);
            ([(header::LINK, next)], Json(body)).into_response()
        }
    }
}

async fn submissions(
    State(fake): State<Arc<FakeCanvas>>,
    Path((_course, assignment)): Path<(String, u64)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let call = {
        let mut calls = fake.submission_calls.lock().unwrap();
        let count = calls.entry(assignment).or_default();
        *count += 1;
        *count
    };
    fake.queries.lock().unwrap().push(query);

    match assignment {
        // Rate limited once, then fine.
        1 if call == 1 => {
            (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "0")], "slow down").into_response()
        }
        // Permanently broken.
        2 => (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response(),
        // Unavailable once, then fine.
        3 if call == 1 => (StatusCode::BAD_GATEWAY, "hiccup").into_response(),
        // A bare object instead of an array.
        4 => Json(json!({"user_id": 4, "submitted_at": "2024-02-01T09:00:00Z"})).into_response(),
        _ => Json(json!([
            {"user_id": 10, "submitted_at": "2024-02-01T10:00:00Z", "grade": null,
             "user": {"id": 10, "name": "Grace Hopper"}},
            {"user_id": 11, "submitted_at": null, "grade": "incomplete"}
        ]))
        .into_response(),
    }
}

async fn put_grade(
    State(fake): State<Arc<FakeCanvas>>,
    Path((_course, assignment, user)): Path<(String, u64, u64)>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    if user == 404 {
        return (
            StatusCode::NOT_FOUND,
            r#"{"errors":[{"message":"The specified resource does not exist."}]}"#,
        )
            .into_response();
    }
    let posted = form
        .get("submission[posted_grade]")
        .cloned()
        .unwrap_or_default();
    fake.grades
        .lock()
        .unwrap()
        .push((assignment, user, posted.clone()));
    Json(json!({"user_id": user, "grade": posted})).into_response()
}

async fn spawn_fake() -> (Arc<FakeCanvas>, CanvasClient) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    let fake = Arc::new(FakeCanvas {
        base: base.clone(),
        ..FakeCanvas::default()
    });

    let app = Router::new()
        .route("/api/v1/courses/{course}/assignments", get(assignments))
        .route("/api/v1/courses/{course}/assignments/{assignment}/submissions", get(submissions))
        .route(
            "/api/v1/courses/{course}/assignments/{assignment}/submissions/{user}",
            put(put_grade),
        )
        .with_state(Arc::clone(&fake));
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });

    let client = CanvasClient::new(&format!("{base}/"), "test-token", Duration::from_secs(5))
        .expect("client")
        .with_retry(RetryPolicy {
            max_attempts: 3,
            max_delay:    Duration::from_millis(10),
        });
    (fake, client)
}

#[tokio::test]
async fn follows_next_links_with_bearer_token() {
    let (fake, client) = spawn_fake().await;

    let assignments = client.list_assignments("101").await.expect("assignments");
    let ids: Vec<u64> = assignments.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(assignments[1].due_at.is_none());

    let auth = fake.auth_headers.lock().unwrap().clone();
    assert_eq!(auth, vec!["Bearer test-token", "Bearer test-token"]);

    let queries = fake.queries.lock().unwrap().clone();
    assert_eq!(queries[0].get("per_page").map(String::as_str), Some("100"));
    assert_eq!(queries[1].get("page").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn waits_out_rate_limits() {
    let (fake, client) = spawn_fake().await;

    let submissions = client.list_submissions("101", 1).await.expect("submissions");
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].student(), "Grace Hopper");
    assert_eq!(fake.submission_calls.lock().unwrap()[&1], 2);

    let queries = fake.queries.lock().unwrap().clone();
    assert!(queries.iter().all(|q| q.get("include[]").map(String::as_str) == Some("user")));
}

#[tokio::test]
async fn retries_transient_server_errors() {
    let (fake, client) = spawn_fake().await;

    let submissions = client.list_submissions("101", 3).await.expect("submissions");
    assert_eq!(submissions.len(), 2);
    assert_eq!(fake.submission_calls.lock().unwrap()[&3], 2);
}

#[tokio::test]
async fn gives_up_after_the_attempt_budget() {
    let (fake, client) = spawn_fake().await;

    let err = client
        .list_submissions("101", 2)
        .await
        .expect_err("always unavailable");
    assert_eq!(err.status(), Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
    assert!(err.to_string().contains("maintenance"));
    assert_eq!(fake.submission_calls.lock().unwrap()[&2], 3);
}

#[tokio::test]
async fn puts_posted_grade_as_form_field() {
    let (fake, client) = spawn_fake().await;

    client
        .update_grade("101", 7, 10, "complete")
        .await
        .expect("update");
    client.update_grade("101", 8, 11, "2.5").await.expect("update");

    let grades = fake.grades.lock().unwrap().clone();
    assert_eq!(grades, vec![(7, 10, "complete".to_owned()), (8, 11, "2.5".to_owned())]);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (fake, client) = spawn_fake().await;

    let err = client
        .update_grade("101", 7, 404, "complete")
        .await
        .expect_err("unknown user");
    match err {
        CanvasError::Status { status, body, .. } => {
            assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
            assert!(body.contains("does not exist"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(fake.grades.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rate_limited_next_page_is_retried() {
    let (fake, client) = spawn_fake().await;

    let assignments = client.list_assignments("busy").await.expect("assignments");
    let ids: Vec<u64> = assignments.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(*fake.page_two_calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn single_object_page_is_one_item() {
    let (_fake, client) = spawn_fake().await;

    let submissions = client.list_submissions("101", 4).await.expect("submissions");
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].user_id, Some(4));
    assert!(submissions[0].submitted_at.is_some());
}
