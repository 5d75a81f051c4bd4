//! End-to-end tests of the REST API through the axum router.

#![cfg(feature = "http-server")]

mod support;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use venue_map::auth::{AuthConfig, Authorizer, StaticTokenVerifier};
use venue_map::db::normalize_venue_document;
use venue_map::db::repositories::LocalRepository;
use venue_map::db::repository::{RepositoryResult, UpsertOutcome, VenueQuery, VenueRepository};
use venue_map::http::{create_router, AppState};
use venue_map::models::Venue;

const OWNER: &str = "Bearer owner-token";
const STRANGER: &str = "Bearer stranger-token";

/// Local repository that counts every call reaching it.
#[derive(Default)]
struct CountingRepository {
    inner: LocalRepository,
    calls: AtomicUsize,
}

impl CountingRepository {
    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl VenueRepository for CountingRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.touch();
        self.inner.health_check().await
    }

    async fn find(&self, query: &VenueQuery) -> RepositoryResult<Vec<Venue>> {
        self.touch();
        self.inner.find(query).await
    }

    async fn distinct_primary_types(
        &self,
        business_status_not_in: &BTreeSet<String>,
    ) -> RepositoryResult<Vec<String>> {
        self.touch();
        self.inner.distinct_primary_types(business_status_not_in).await
    }

    async fn get_venue(&self, id: &str) -> RepositoryResult<Venue> {
        self.touch();
        self.inner.get_venue(id).await
    }

    async fn upsert_venue(&self, venue: &Venue) -> RepositoryResult<UpsertOutcome> {
        self.touch();
        self.inner.upsert_venue(venue).await
    }
}

fn seeded_repository() -> Arc<CountingRepository> {
    let repo = CountingRepository::default();
    for document in support::abc_documents() {
        repo.inner
            .insert_venue(normalize_venue_document(document).unwrap());
    }
    Arc::new(repo)
}

fn app(repo: Arc<CountingRepository>) -> Router {
    let config = AuthConfig {
        audience: None,
        authorized_emails: vec!["owner@example.com".to_string()],
    };
    let verifier = StaticTokenVerifier::default()
        .with_token("owner-token", "owner@example.com")
        .with_token("stranger-token", "stranger@example.com");
    let state = AppState::new(repo, Authorizer::new(&config, Arc::new(verifier)));
    create_router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("authorization", OWNER)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn ids(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_missing_token_is_rejected_before_the_repository() {
    let repo = seeded_repository();
    let (status, body) = send(app(repo.clone()), get("/v1/venues", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let repo = seeded_repository();
    let (status, _) = send(app(repo.clone()), get("/v1/venues", Some("Bearer nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unlisted_email_is_forbidden() {
    let repo = seeded_repository();
    let (status, body) = send(app(repo.clone()), get("/v1/venues/types", Some(STRANGER))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let (status, body) = send(app(seeded_repository()), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_cafes_open_monday_noon() {
    let (status, body) = send(
        app(seeded_repository()),
        get("/v1/venues?type=cafe&openAt=2024-06-03T12:00:00", Some(OWNER)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["A"]);
    assert_eq!(body[0]["isOpenNow"], true);
    assert_eq!(body[0]["hasSchedule"], true);
    assert_eq!(body[0]["primaryType"]["text"], "cafe");
}

#[tokio::test]
async fn test_listing_without_time_filter_annotates_only() {
    let (status, body) = send(
        app(seeded_repository()),
        get("/v1/venues", Some(OWNER)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["A", "B"]);
    assert!(body[0]["isOpenNow"].is_boolean());
}

#[tokio::test]
async fn test_repeated_and_bracketed_type_keys() {
    let repo = seeded_repository();
    repo.inner.insert_venue(
        normalize_venue_document(support::monday_venue("D", "bakery", "OPERATIONAL", 6, 14))
            .unwrap(),
    );

    let (_, body) = send(
        app(repo.clone()),
        get("/v1/venues?type%5B%5D=bakery&type%5B%5D=cafe", Some(OWNER)),
    )
    .await;
    assert_eq!(ids(&body), vec!["A", "B", "D"]);

    let (_, body) = send(app(repo), get("/v1/venues?type=bakery", Some(OWNER))).await;
    assert_eq!(ids(&body), vec!["D"]);
}

#[tokio::test]
async fn test_malformed_open_at_is_ignored() {
    let (status, body) = send(
        app(seeded_repository()),
        get("/v1/venues?type=cafe&openAt=next-tuesday", Some(OWNER)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["A", "B"]);
}

#[tokio::test]
async fn test_unencoded_offset_keeps_time_filter() {
    let (status, body) = send(
        app(seeded_repository()),
        get("/v1/venues?type=cafe&openAt=2024-06-03T12:00:00+09:00", Some(OWNER)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["A"]);
}

#[tokio::test]
async fn test_types_exclude_closed_venues() {
    let (status, body) = send(
        app(seeded_repository()),
        get("/v1/venues/types", Some(OWNER)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["cafe"]));
}

#[tokio::test]
async fn test_get_single_venue() {
    let app = app(seeded_repository());

    let (status, body) = send(app.clone(), get("/v1/venues/A", Some(OWNER))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "A");
    assert_eq!(body["locationName"]["text"], "Venue A");

    let (status, body) = send(app, get("/v1/venues/missing", Some(OWNER))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_register_venue() {
    let repo = seeded_repository();
    let document = json!({
        "place_id": "E",
        "location_name": "Corner Bar",
        "primary_type": {"text": "bar", "languageCode": "en"},
        "business_status": "OPERATIONAL",
        "category": 2
    });

    let (status, body) = send(app(repo.clone()), post_json("/v1/venues", &document)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outcome"], "inserted");
    assert_eq!(body["venue"]["id"], "E");

    let (status, body) = send(app(repo.clone()), post_json("/v1/venues", &document)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "updated");
    assert_eq!(repo.inner.venue_count(), 4);
}

#[tokio::test]
async fn test_register_rejects_invalid_documents() {
    let repo = seeded_repository();

    let closed = support::monday_venue("F", "bar", "CLOSED_PERMANENTLY", 9, 17);
    let mut unknown_category = support::monday_venue("G", "bar", "OPERATIONAL", 9, 17);
    unknown_category["category"] = json!(9);

    for document in [closed, unknown_category, json!({"name": "no id"}), json!([1, 2])] {
        let (status, body) = send(app(repo.clone()), post_json("/v1/venues", &document)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "document: {}", document);
        assert_eq!(body["code"], "BAD_REQUEST");
    }
    assert_eq!(repo.inner.venue_count(), 3);
}

#[tokio::test]
async fn test_repository_failure_is_500() {
    let repo = seeded_repository();
    repo.inner.set_healthy(false);

    let (status, body) = send(app(repo.clone()), get("/v1/venues", Some(OWNER))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "REPOSITORY_ERROR");

    let (status, body) = send(app(repo), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "disconnected");
}
