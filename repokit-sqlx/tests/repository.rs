mod common;

use common::{setup, setup_with, Author, Book, Event, User};
use repokit_data::prelude::*;
use repokit_sqlx::{Classifying, Database, RequestContext, SqlxRepository};
use std::time::Duration;

async fn seed(db: &Database, n: usize) -> SqlxRepository<User> {
    let users = SqlxRepository::<User>::new(db.clone());
    let mut batch: Vec<User> = (1..=n)
        .map(|i| User::new(&format!("user{i:02}"), 20 + (i % 5) as i64))
        .collect();
    users
        .create_many(&RequestContext::new(), &mut batch)
        .await
        .unwrap();
    users
}

fn ids(page: &Page<User>) -> Vec<u64> {
    page.content.iter().map(|u| u.id).collect()
}

// ── Pagination ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_page_with_count() {
    let db = setup().await;
    let users = seed(&db, 25).await;

    let page = users
        .find_many(&RequestContext::new(), &Limit::page(2, 10).with_count(), &[])
        .await
        .unwrap();

    assert_eq!(ids(&page), (11..=20).collect::<Vec<u64>>());
    assert_eq!(page.total_elements, Some(25));
    assert_eq!(page.total_pages, Some(3));
    assert_eq!((page.page_num, page.page_size), (2, 10));
}

#[tokio::test]
async fn test_all_returns_every_match() {
    let db = setup().await;
    let users = seed(&db, 25).await;

    let page = users
        .find_many(&RequestContext::new(), &Limit::all(), &[Condition::gte("age", 20)])
        .await
        .unwrap();
    assert_eq!(page.content.len(), 25);
    assert_eq!(page.total_elements, None);
}

#[tokio::test]
async fn test_unset_limit_is_first_page_of_ten() {
    let db = setup().await;
    let users = seed(&db, 25).await;

    let page = users
        .find_many(&RequestContext::new(), &Limit::default(), &[])
        .await
        .unwrap();
    assert_eq!(ids(&page), (1..=10).collect::<Vec<u64>>());
    assert_eq!((page.page_num, page.page_size), (1, 10));
}

#[tokio::test]
async fn test_size_without_page_limits_only() {
    let db = setup().await;
    let users = seed(&db, 25).await;

    let page = users
        .find_many(&RequestContext::new(), &Limit::page(0, 4), &[Condition::desc("id")])
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![25, 24, 23, 22]);
}

#[tokio::test]
async fn test_count_is_unpaginated() {
    let db = setup().await;
    let users = seed(&db, 25).await;
    let ctx = RequestContext::new();

    let filter = [Condition::eq("age", 20)];
    let page = users
        .find_many(&ctx, &Limit::page(1, 2).with_count(), &filter)
        .await
        .unwrap();
    assert_eq!(page.content.len(), 2);
    assert_eq!(page.total(), 5);
    assert_eq!(users.count(&ctx, &filter).await.unwrap(), 5);
    assert_eq!(users.count(&ctx, &[]).await.unwrap(), 25);
}

#[tokio::test]
async fn test_no_match_is_empty_page() {
    let db = setup().await;
    let users = seed(&db, 3).await;

    let page = users
        .find_many(
            &RequestContext::new(),
            &Limit::default().with_count(),
            &[Condition::eq("name", "nobody")],
        )
        .await
        .unwrap();
    assert!(page.content.is_empty());
    assert_eq!(page.total_elements, Some(0));
}

#[tokio::test]
async fn test_huge_limits_are_clamped() {
    let db = setup().await;
    let users = seed(&db, 3).await;
    let ctx = RequestContext::new();

    let page = users
        .find_many(&ctx, &Limit::page(0, u64::MAX), &[])
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![1, 2, 3]);

    let page = users
        .find_many(&ctx, &Limit::page(u64::MAX, 5).with_count(), &[])
        .await
        .unwrap();
    assert!(page.content.is_empty());
    assert_eq!(page.total_pages, Some(1));
}

// ── Conditions ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_timestamp_conditions() {
    let db = setup().await;
    let events = SqlxRepository::<Event>::new(db);
    let ctx = RequestContext::new();

    let first = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let second = first + chrono::Duration::hours(1);
    let mut batch = vec![
        Event::new("login", Some(first)),
        Event::new("logout", Some(second)),
        Event::new("pending", None),
    ];
    events.create_many(&ctx, &mut batch).await.unwrap();

    let found = events
        .find_one_by(&ctx, &[Condition::eq("created_at", first)])
        .await
        .unwrap();
    assert_eq!(found.kind, "login");

    let page = events
        .find_many(
            &ctx,
            &Limit::all(),
            &[Condition::is_in("created_at", vec![Some(second), None])],
        )
        .await
        .unwrap();
    let kinds: Vec<&str> = page.content.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, vec!["logout"]);

    let unset = events
        .count(&ctx, &[Condition::eq("created_at", None::<chrono::DateTime<chrono::Utc>>)])
        .await
        .unwrap();
    assert_eq!(unset, 1);
    assert_eq!(events.count(&ctx, &[Condition::gt("created_at", first)]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_in_like_and_raw_conditions() {
    let db = setup().await;
    let users = seed(&db, 10).await;
    let ctx = RequestContext::new();
    let all = Limit::all();

    let page = users
        .find_many(&ctx, &all, &[Condition::is_in("id", [2u64, 4, 6]), Condition::asc("id")])
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![2, 4, 6]);

    let page = users
        .find_many(&ctx, &all, &[Condition::compare("id", vec![1u64, 3], "in")])
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![1, 3]);

    let empty: Vec<u64> = Vec::new();
    let page = users
        .find_many(&ctx, &all, &[Condition::is_in("id", empty)])
        .await
        .unwrap();
    assert!(page.content.is_empty());

    let page = users
        .find_many(&ctx, &all, &[Condition::like("name", "user0%")])
        .await
        .unwrap();
    assert_eq!(page.content.len(), 9);

    let page = users
        .find_many(&ctx, &all, &[Condition::ilike("name", "USER1%")])
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![10]);

    let page = users
        .find_many(
            &ctx,
            &all,
            &[Condition::raw_with("age + ? > ?", [1i64, 24]), Condition::lt("id", 8)],
        )
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![4]);
}

#[tokio::test]
async fn test_find_one_by_defaults_to_primary_key_order() {
    let db = setup().await;
    let users = seed(&db, 10).await;
    let ctx = RequestContext::new();

    // ages cycle through 21, 22, 23, 24, 20
    let first = users
        .find_one_by(&ctx, &[Condition::eq("age", 22)])
        .await
        .unwrap();
    assert_eq!(first.id, 2);

    let last = users
        .find_one_by(&ctx, &[Condition::eq("age", 22), Condition::desc("id")])
        .await
        .unwrap();
    assert_eq!(last.id, 7);
}

// ── CRUD ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_then_find_one() {
    let db = setup().await;
    let users = SqlxRepository::<User>::new(db.clone());
    let ctx = RequestContext::new();

    let mut alice = User::new("alice", 30);
    users.create(&ctx, &mut alice).await.unwrap();
    assert_ne!(alice.id, 0);

    let found = users.find_one(&ctx, alice.id).await.unwrap();
    assert_eq!(found, alice);
}

#[tokio::test]
async fn test_create_with_explicit_id() {
    let db = setup().await;
    let users = SqlxRepository::<User>::new(db.clone());
    let ctx = RequestContext::new();

    let mut bob = User::new("bob", 40);
    bob.id = 42;
    users.create(&ctx, &mut bob).await.unwrap();
    assert_eq!(users.find_one(&ctx, 42).await.unwrap().name, "bob");
}

#[tokio::test]
async fn test_create_many_backfills_ids() {
    let db = setup().await;
    let users = SqlxRepository::<User>::new(db.clone());
    let mut batch = vec![User::new("a", 1), User::new("b", 2), User::new("c", 3)];

    users
        .create_many(&RequestContext::new(), &mut batch)
        .await
        .unwrap();
    assert_eq!(batch.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_create_many_rejects_bad_input() {
    let db = setup().await;
    let users = SqlxRepository::<User>::new(db.clone());
    let ctx = RequestContext::new();

    let err = users.create_many(&ctx, &mut []).await.unwrap_err();
    assert!(err.is_invalid_argument());

    let mut mixed = vec![User::new("a", 1), User::new("b", 2)];
    mixed[1].id = 9;
    let err = users.create_many(&ctx, &mut mixed).await.unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(users.count(&ctx, &[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_row_is_not_found_with_either_translator() {
    let raw = setup().await;
    let err = SqlxRepository::<User>::new(raw)
        .find_one(&RequestContext::new(), 99)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Database(_)));
    assert!(err.is_not_found());

    let classified = setup_with(Classifying).await;
    let err = SqlxRepository::<User>::new(classified)
        .find_one_by(&RequestContext::new(), &[Condition::eq("name", "ghost")])
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_one_missing_is_ok() {
    let db = setup().await;
    let users = seed(&db, 2).await;
    let ctx = RequestContext::new();

    users.delete_one(&ctx, 1).await.unwrap();
    users.delete_one(&ctx, 1).await.unwrap();
    users.delete_one(&ctx, 1000).await.unwrap();
    assert_eq!(users.count(&ctx, &[]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_by() {
    let db = setup().await;
    let users = seed(&db, 10).await;
    let ctx = RequestContext::new();

    users
        .delete_by(&ctx, &[Condition::gt("id", 6)])
        .await
        .unwrap();
    assert_eq!(users.count(&ctx, &[]).await.unwrap(), 6);
}

#[tokio::test]
async fn test_bulk_operations_require_a_filter() {
    let db = setup().await;
    let users = seed(&db, 3).await;
    let ctx = RequestContext::new();
    let changes = Changes::new().set("age", 1);

    // A closed pool proves the guard fires before any statement is issued.
    db.close().await;
    assert!(db.is_closed());

    let err = users.delete_by(&ctx, &[]).await.unwrap_err();
    assert!(err.is_invalid_argument());
    let err = users.delete_by(&ctx, &[Condition::asc("id")]).await.unwrap_err();
    assert!(err.is_invalid_argument());
    let err = users.update_columns_by(&ctx, &[], &changes).await.unwrap_err();
    assert!(err.is_invalid_argument());
    let err = users
        .update_columns_by(&ctx, &[Condition::desc("age")], &changes)
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn test_update_columns() {
    let db = setup().await;
    let users = seed(&db, 5).await;
    let ctx = RequestContext::new();

    users
        .update_columns(&ctx, 1, &Changes::new().set("name", "renamed").set("age", 99))
        .await
        .unwrap();
    let one = users.find_one(&ctx, 1).await.unwrap();
    assert_eq!((one.name.as_str(), one.age), ("renamed", 99));

    users
        .update_columns_by(&ctx, &[Condition::is_in("id", [2u64, 3])], &Changes::new().set("age", 0))
        .await
        .unwrap();
    assert_eq!(users.count(&ctx, &[Condition::eq("age", 0)]).await.unwrap(), 2);

    let err = users.update_columns(&ctx, 1, &Changes::new()).await.unwrap_err();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn test_full_update() {
    let db = setup().await;
    let users = seed(&db, 2).await;
    let ctx = RequestContext::new();

    let mut user = users.find_one(&ctx, 2).await.unwrap();
    user.name = "changed".into();
    user.email = "changed@example.com".into();
    users.update(&ctx, 2, &user).await.unwrap();

    assert_eq!(users.find_one(&ctx, 2).await.unwrap(), user);
    assert_eq!(users.find_one(&ctx, 1).await.unwrap().name, "user01");
}

#[tokio::test]
async fn test_update_saves_related_records() {
    let db = setup().await;
    let authors = SqlxRepository::<Author>::new(db.clone());
    let ctx = RequestContext::new();

    let mut author = Author {
        name: "le guin".into(),
        ..Author::default()
    };
    authors.create(&ctx, &mut author).await.unwrap();

    author.books = vec![
        Book { id: 0, title: "a wizard of earthsea".into() },
        Book { id: 0, title: "the lathe of heaven".into() },
    ];
    authors.update(&ctx, author.id, &author).await.unwrap();
    // Assigned ids are not written back to the owner.
    assert!(author.books.iter().all(|book| book.id == 0));

    author.name = "ursula k. le guin".into();
    author.books = vec![Book { id: 1, title: "A Wizard of Earthsea".into() }];
    authors.update(&ctx, author.id, &author).await.unwrap();

    let titles: Vec<String> = sqlx::query_scalar("SELECT title FROM books ORDER BY id")
        .fetch_all(db.pool())
        .await
        .unwrap();
    assert_eq!(titles, vec!["A Wizard of Earthsea", "the lathe of heaven"]);

    let rows: Vec<(i64, i64)> = sqlx::query_as("SELECT id, author_id FROM books ORDER BY id")
        .fetch_all(db.pool())
        .await
        .unwrap();
    assert_eq!(rows, vec![(1, author.id as i64), (2, author.id as i64)]);
    assert_eq!(
        authors.find_one(&ctx, author.id).await.unwrap().name,
        "ursula k. le guin"
    );
}

#[tokio::test]
async fn test_unique_violation_is_constraint() {
    let db = setup_with(Classifying).await;
    let users = SqlxRepository::<User>::new(db);
    let ctx = RequestContext::new();

    users.create(&ctx, &mut User::new("dup", 1)).await.unwrap();
    let err = users.create(&ctx, &mut User::new("dup", 2)).await.unwrap_err();
    assert!(matches!(err, DataError::Constraint(_)), "{err}");
}

#[tokio::test]
async fn test_model_is_zero_valued() {
    let db = setup().await;
    let users = SqlxRepository::<User>::new(db);
    assert_eq!(users.model(), User::default());
    assert_eq!(users.database().table_name::<User>(), "users");
}

// ── Transactions ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_exec_tx_commits_on_ok() {
    let db = setup().await;
    let users = SqlxRepository::<User>::new(db.clone());
    let repo = &users;
    let ctx = RequestContext::new();

    let id = users
        .exec_tx(&ctx, |tx| async move {
            assert!(tx.in_transaction());
            let mut user = User::new("committed", 1);
            repo.create(&tx, &mut user).await?;
            repo.update_columns(&tx, user.id, &Changes::new().set("age", 2)).await?;
            Ok::<_, DataError>(user.id)
        })
        .await
        .unwrap();

    assert_eq!(users.find_one(&ctx, id).await.unwrap().age, 2);
}

#[tokio::test]
async fn test_exec_tx_rolls_back_on_err() {
    let db = setup().await;
    let users = seed(&db, 3).await;
    let repo = &users;
    let ctx = RequestContext::new();

    let err = users
        .exec_tx(&ctx, |tx| async move {
            repo.create(&tx, &mut User::new("ghost", 1)).await?;
            repo.delete_by(&tx, &[Condition::lte("id", 3)]).await?;
            Err::<(), _>(DataError::Other("abort".into()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Other(ref msg) if msg == "abort"));
    assert_eq!(users.count(&ctx, &[]).await.unwrap(), 3);
}

#[tokio::test]
async fn test_context_outliving_transaction_fails() {
    let db = setup().await;
    let users = seed(&db, 1).await;
    let ctx = RequestContext::new();

    let leaked = users
        .exec_tx(&ctx, |tx| async move { Ok::<_, DataError>(tx) })
        .await
        .unwrap();
    assert!(leaked.in_transaction());

    let err = users.count(&leaked, &[]).await.unwrap_err();
    assert!(err.to_string().contains("transaction already finished"), "{err}");
    assert_eq!(users.count(&ctx, &[]).await.unwrap(), 1);
}

// ── Cancellation and deadlines ──────────────────────────────────────────

#[tokio::test]
async fn test_cancelled_context() {
    let db = setup_with(Classifying).await;
    let users = seed(&db, 1).await;
    let ctx = RequestContext::new();
    ctx.cancel();

    let err = users.find_one(&ctx, 1).await.unwrap_err();
    assert!(matches!(err, DataError::Cancelled(_)), "{err}");
}

#[tokio::test]
async fn test_expired_deadline() {
    let db = setup_with(Classifying).await;
    let users = seed(&db, 1).await;
    let ctx = RequestContext::new().with_timeout(Duration::ZERO);

    let err = users.count(&ctx, &[]).await.unwrap_err();
    assert!(matches!(err, DataError::Timeout(_)), "{err}");

    let generous = RequestContext::new().with_timeout(Duration::from_secs(30));
    assert_eq!(users.count(&generous, &[]).await.unwrap(), 1);
}
