//! Tests for LocalRepository.
//!
//! Cover concurrent access, query constraints, upsert semantics and the
//! unhealthy state of the in-memory repository.

mod support;

use std::collections::BTreeSet;
use std::sync::Arc;

use venue_map::db::normalize_venue_document;
use venue_map::db::repositories::LocalRepository;
use venue_map::db::repository::{RepositoryError, UpsertOutcome, VenueQuery, VenueRepository};
use venue_map::models::{LocalizedText, Venue, CLOSED_PERMANENTLY};

fn venue(id: &str, primary_type: &str, category: i32) -> Venue {
    let mut v = Venue::new(id);
    v.primary_type = Some(LocalizedText::new(primary_type));
    v.business_status = Some("OPERATIONAL".to_string());
    v.category = Some(category);
    v
}

fn seeded() -> LocalRepository {
    LocalRepository::with_venues(
        support::abc_documents()
            .into_iter()
            .map(|doc| normalize_venue_document(doc).unwrap()),
    )
}

// =========================================================
// Concurrent Access Tests
// =========================================================

#[tokio::test]
async fn test_concurrent_upserts_of_different_venues() {
    let repo = Arc::new(LocalRepository::new());

    let mut handles = vec![];
    for i in 0..10 {
        let repo_clone = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo_clone
                .upsert_venue(&venue(&format!("venue_{}", i), "cafe", 1))
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), UpsertOutcome::Inserted);
    }
    assert_eq!(repo.venue_count(), 10);
}

#[tokio::test]
async fn test_concurrent_upserts_of_the_same_venue() {
    let repo = Arc::new(LocalRepository::new());

    let mut handles = vec![];
    for _ in 0..8 {
        let repo_clone = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo_clone.upsert_venue(&venue("shared", "bar", 2)).await
        }));
    }

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() == UpsertOutcome::Inserted {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert_eq!(repo.venue_count(), 1);
}

#[tokio::test]
async fn test_cloned_repository_shares_state() {
    let repo1 = LocalRepository::new();
    let repo2 = repo1.clone();

    repo1.upsert_venue(&venue("a", "cafe", 1)).await.unwrap();
    assert_eq!(repo2.get_venue("a").await.unwrap().id, "a");

    repo2.set_healthy(false);
    assert!(!repo1.health_check().await.unwrap());
}

// =========================================================
// Query Tests
// =========================================================

#[tokio::test]
async fn test_find_preserves_insertion_order() {
    let repo = LocalRepository::new();
    for id in ["c", "a", "b"] {
        repo.insert_venue(venue(id, "cafe", 1));
    }
    let ids: Vec<String> = repo
        .find(&VenueQuery::default())
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[tokio::test]
async fn test_find_applies_every_constraint() {
    let repo = seeded();
    repo.insert_venue(venue("D", "cafe", 3));

    let query = VenueQuery {
        business_status_not_in: BTreeSet::from([CLOSED_PERMANENTLY.to_string()]),
        primary_type_in: Some(BTreeSet::from(["cafe".to_string(), "bar".to_string()])),
        category_in: Some(BTreeSet::from([3])),
    };
    let found = repo.find(&query).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "D");
}

#[tokio::test]
async fn test_constrained_dimension_skips_missing_fields() {
    let repo = LocalRepository::new();
    repo.insert_venue(Venue::new("bare"));

    let by_type = VenueQuery {
        primary_type_in: Some(BTreeSet::from(["cafe".to_string()])),
        ..Default::default()
    };
    assert!(repo.find(&by_type).await.unwrap().is_empty());

    // A venue without a status is never excluded by status.
    let by_status = VenueQuery {
        business_status_not_in: BTreeSet::from([CLOSED_PERMANENTLY.to_string()]),
        ..Default::default()
    };
    assert_eq!(repo.find(&by_status).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_distinct_primary_types_sorted_and_deduplicated() {
    let repo = seeded();
    repo.insert_venue(venue("D", "bakery", 1));
    repo.insert_venue(venue("E", "cafe", 2));

    let excluded = BTreeSet::from([CLOSED_PERMANENTLY.to_string()]);
    assert_eq!(
        repo.distinct_primary_types(&excluded).await.unwrap(),
        vec!["bakery", "cafe"]
    );
    assert_eq!(
        repo.distinct_primary_types(&BTreeSet::new()).await.unwrap(),
        vec!["bakery", "bar", "cafe"]
    );
}

// =========================================================
// Upsert Tests
// =========================================================

#[tokio::test]
async fn test_upsert_replaces_in_place() {
    let repo = seeded();
    let mut updated = repo.get_venue("B").await.unwrap();
    updated.alias = Some("night cafe".to_string());

    assert_eq!(
        repo.upsert_venue(&updated).await.unwrap(),
        UpsertOutcome::Updated
    );
    let venues = repo.find(&VenueQuery::default()).await.unwrap();
    assert_eq!(venues.len(), 3);
    assert_eq!(venues[1].alias.as_deref(), Some("night cafe"));
}

#[tokio::test]
async fn test_clear_removes_everything() {
    let repo = seeded();
    repo.clear();
    assert_eq!(repo.venue_count(), 0);
    assert!(matches!(
        repo.get_venue("A").await,
        Err(RepositoryError::NotFound { .. })
    ));
}

// =========================================================
// Health Tests
// =========================================================

#[tokio::test]
async fn test_unhealthy_repository_fails_every_operation() {
    let repo = seeded();
    repo.set_healthy(false);

    assert!(!repo.health_check().await.unwrap());
    assert!(repo.find(&VenueQuery::default()).await.is_err());
    assert!(repo.distinct_primary_types(&BTreeSet::new()).await.is_err());
    assert!(repo.get_venue("A").await.is_err());

    let err = repo.upsert_venue(&venue("x", "cafe", 1)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ConnectionError { .. }));
    assert_eq!(err.context().operation.as_deref(), Some("upsert_venue"));

    repo.set_healthy(true);
    assert_eq!(repo.find(&VenueQuery::default()).await.unwrap().len(), 3);
}
