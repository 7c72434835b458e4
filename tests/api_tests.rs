//! API integration tests
//!
//! Drive the full router in-process against the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use catalog_server::{
    api,
    clock::FixedClock,
    config::AppConfig,
    models::{
        author::AuthorInput,
        book::BookInput,
        book_instance::{BookInstanceInput, LoanStatus},
        user::{Capability, UserClaims},
    },
    repository::Repository,
    services::{access::ClaimsGate, loan_policy::LoanPolicy, Services},
    AppState,
};

const SECRET: &str = "test-secret";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

struct TestApp {
    router: Router,
    repo: Repository,
}

fn app() -> TestApp {
    let repo = Repository::in_memory();
    let mut config = AppConfig::default();
    config.auth.jwt_secret = SECRET.to_string();

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(Services::new(repo.clone(), LoanPolicy::default(), Arc::new(ClaimsGate))),
        clock: Arc::new(FixedClock(today())),
    };

    TestApp {
        router: api::router(state),
        repo,
    }
}

fn token(user_id: i32, capabilities: &[Capability]) -> String {
    UserClaims::new(user_id, format!("user{}", user_id), capabilities.iter().copied(), 1)
        .create_token(SECRET)
        .unwrap()
}

fn librarian() -> String {
    token(1, &[Capability::MarkReturned, Capability::ViewAllLoans])
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, axum::http::HeaderMap, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// One book with a copy lent to a fresh borrower, due on `due_back`
    async fn lent_copy(&self, due_back: NaiveDate) -> Uuid {
        let author = self
            .repo
            .authors
            .create(&AuthorInput {
                first_name: "Stanisław".into(),
                last_name: "Lem".into(),
                date_of_birth: None,
                date_of_death: None,
            })
            .await
            .unwrap();
        let book = self
            .repo
            .books
            .create(&BookInput {
                title: "Solaris".into(),
                author_id: author.id,
                summary: String::new(),
                isbn: "9780156027601".into(),
                genre_ids: vec![],
            })
            .await
            .unwrap();
        let reader = self.repo.borrowers.create("reader", "Kris", "Kelvin").await.unwrap();
        let copy = self
            .repo
            .instances
            .create(&BookInstanceInput {
                book_id: book.id,
                imprint: "Walker, 1970".into(),
                due_back: Some(due_back),
                status: LoanStatus::OnLoan,
                borrower_id: Some(reader.id),
                language_id: None,
            })
            .await
            .unwrap();
        copy.id
    }
}

#[tokio::test]
async fn health_check_answers() {
    let app = app();
    let (status, _, body) = app.get("/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn summary_is_public() {
    let app = app();
    app.lent_copy(today()).await;

    let (status, _, body) = app.get("/api/v1/catalog/summary?title_contains=sol", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["num_books"], 1);
    assert_eq!(body["num_instances"], 1);
    assert_eq!(body["num_instances_available"], 0);
    assert_eq!(body["num_books_matching"], 1);
}

#[tokio::test]
async fn renewal_redirects_to_all_loans() {
    let app = app();
    let id = app.lent_copy(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).await;

    let (status, headers, _) = app
        .post(
            &format!("/api/v1/book-instances/{}/renew", id),
            &librarian(),
            json!({ "renewal_date": "2024-01-20" }),
        )
        .await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers[header::LOCATION], "/api/v1/loans?scope=all");
    assert_eq!(
        app.repo.instances.get(id).await.unwrap().due_back,
        NaiveDate::from_ymd_opt(2024, 1, 20)
    );
}

#[tokio::test]
async fn renewal_form_proposes_default_date() {
    let app = app();
    let id = app.lent_copy(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).await;

    let (status, _, body) = app
        .get(&format!("/api/v1/book-instances/{}/renew", id), Some(&librarian()))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["proposed_renewal_date"], "2024-01-31");
    assert_eq!(body["instance"]["is_overdue"], true);
}

#[tokio::test]
async fn renewal_in_the_past_is_a_field_error() {
    let app = app();
    let due = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let id = app.lent_copy(due).await;

    let (status, _, body) = app
        .post(
            &format!("/api/v1/book-instances/{}/renew", id),
            &librarian(),
            json!({ "renewal_date": "2024-01-09" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "renewal_date");
    assert_eq!(body["message"], "Invalid date - renewal in past");
    assert_eq!(app.repo.instances.get(id).await.unwrap().due_back, Some(due));
}

#[tokio::test]
async fn malformed_renewal_date_is_a_field_error() {
    let app = app();
    let due = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let id = app.lent_copy(due).await;

    let (status, _, body) = app
        .post(
            &format!("/api/v1/book-instances/{}/renew", id),
            &librarian(),
            json!({ "renewal_date": "2024-13-40" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "renewal_date");
    assert_eq!(body["error"], "BadValue");
    assert_eq!(app.repo.instances.get(id).await.unwrap().due_back, Some(due));
}

#[tokio::test]
async fn renewal_needs_mark_returned() {
    let app = app();
    let id = app.lent_copy(today()).await;

    let (status, _, _) = app
        .post(
            &format!("/api/v1/book-instances/{}/renew", id),
            &token(5, &[Capability::ViewAllLoans]),
            json!({ "renewal_date": "2024-01-20" }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn all_loans_need_mark_returned() {
    let app = app();
    app.lent_copy(today()).await;

    let (status, _, _) = app.get("/api/v1/loans?scope=all", Some(&token(5, &[]))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app.get("/api/v1/loans?scope=all", Some(&librarian())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["borrower"]["last_name"], "Kelvin");
}

#[tokio::test]
async fn loans_need_a_token() {
    let app = app();

    let (status, _, body) = app.get("/api/v1/loans", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());

    let (status, _, _) = app.get("/api/v1/loans", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_viewers_do_not_see_borrowers() {
    let app = app();
    let id = app.lent_copy(today()).await;

    let (status, _, body) = app.get(&format!("/api/v1/book-instances/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["borrower"].is_null());
    assert_eq!(body["status"], "on_loan");

    let (_, _, body) = app
        .get(&format!("/api/v1/book-instances/{}", id), Some(&librarian()))
        .await;
    assert_eq!(body["borrower"]["login"], "reader");
}

#[tokio::test]
async fn unknown_copy_is_not_found() {
    let app = app();
    let (status, _, _) = app
        .get(&format!("/api/v1/book-instances/{}/renew", Uuid::new_v4()), Some(&librarian()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creating_an_author_needs_edit_catalog() {
    let app = app();
    let input = json!({ "first_name": "Ursula", "last_name": "Le Guin" });

    let (status, _, _) = app.post("/api/v1/authors", &librarian(), input.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app
        .post("/api/v1/authors", &token(9, &[Capability::EditCatalog]), input)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["last_name"], "Le Guin");

    let (_, _, list) = app.get("/api/v1/authors?name=guin", None).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["per_page"], 10);
}

#[tokio::test]
async fn page_past_the_end_is_empty() {
    let app = app();
    app.lent_copy(today()).await;

    for uri in [
        "/api/v1/books?page=9223372036854775807",
        "/api/v1/book-instances?page=9223372036854775807&per_page=100",
    ] {
        let (status, _, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["total"], 1);
        assert!(body["items"].as_array().unwrap().is_empty());
    }
}
