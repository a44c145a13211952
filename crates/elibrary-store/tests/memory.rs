//! Repository behaviour against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use elibrary_core::{BookQuery, BorrowStatus, LendingPolicy, NotificationKind, Pagination, Role};
use elibrary_store::{
    AuthorInput, AuthorRepository, BookInput, BookRepository, FollowRepository, LoanFilter,
    LoanRepository, MemoryStore, NewLoan, NewNotification, NewUser, NotificationRepository,
    ReviewInput, ReviewRepository, StoreError, UserRepository,
};
use elibrary_core::{AuthorId, BookId, UserId};

async fn user(store: &MemoryStore, name: &str) -> UserId {
    store
        .insert_user(&NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
            display_name: None,
            avatar_url: None,
            bio: None,
        })
        .await
        .unwrap()
        .id
}

async fn author(store: &MemoryStore, name: &str) -> AuthorId {
    store
        .insert_author(&AuthorInput {
            name: name.to_string(),
            bio: None,
            photo_url: None,
        })
        .await
        .unwrap()
        .id
}

async fn book(store: &MemoryStore, author_id: AuthorId, title: &str, copies: i32) -> BookId {
    store
        .insert_book(&BookInput {
            isbn: format!("isbn-{title}"),
            title: title.to_string(),
            author_id,
            genre: Some("Classic".to_string()),
            published_year: Some(1813),
            description: None,
            cover_url: None,
            total_copies: copies,
            available_copies: Some(copies),
        })
        .await
        .unwrap()
        .id
}

fn loan(user_id: UserId, book_id: BookId) -> NewLoan {
    let now = Utc::now();
    NewLoan {
        user_id,
        book_id,
        borrowed_at: now,
        due_at: now + Duration::days(14),
        notes: None,
    }
}

#[tokio::test]
async fn last_copy_cannot_be_borrowed_twice() {
    let store = MemoryStore::new();
    let policy = LendingPolicy::default();
    let a = user(&store, "a").await;
    let b = user(&store, "b").await;
    let austen = author(&store, "Jane Austen").await;
    let title = book(&store, austen, "Emma", 1).await;

    store.open_loan(&loan(a, title), &policy).await.unwrap();
    let err = store.open_loan(&loan(b, title), &policy).await.unwrap_err();
    assert!(matches!(err, StoreError::Domain(_)));

    let after = store.get_book(title).await.unwrap();
    assert_eq!(after.available_copies, 0);
}

#[tokio::test]
async fn book_update_without_count_keeps_loans_opened_after_read() {
    let store = MemoryStore::new();
    let policy = LendingPolicy::default();
    let reader = user(&store, "reader").await;
    let herbert = author(&store, "Frank Herbert").await;
    let title = book(&store, herbert, "Dune", 3).await;

    let stale = store.get_book(title).await.unwrap();
    assert_eq!(stale.available_copies, 3);
    store.open_loan(&loan(reader, title), &policy).await.unwrap();

    let input = BookInput {
        isbn: stale.isbn.clone(),
        title: "Dune Messiah".to_string(),
        author_id: herbert,
        genre: stale.genre.clone(),
        published_year: stale.published_year,
        description: None,
        cover_url: None,
        total_copies: 3,
        available_copies: None,
    };
    let updated = store.update_book(title, &input).await.unwrap();
    assert_eq!(updated.title, "Dune Messiah");
    assert_eq!(updated.available_copies, 2);

    // Shrinking the total clamps the live count.
    let shrunk = store
        .update_book(
            title,
            &BookInput {
                total_copies: 1,
                ..input.clone()
            },
        )
        .await
        .unwrap();
    assert_eq!(shrunk.available_copies, 1);

    let explicit = store
        .update_book(
            title,
            &BookInput {
                total_copies: 2,
                available_copies: Some(9),
                ..input
            },
        )
        .await
        .unwrap();
    assert_eq!(explicit.available_copies, 2);
}

#[tokio::test]
async fn concurrent_borrows_of_last_copy_yield_one_loan() {
    let store = Arc::new(MemoryStore::new());
    let policy = LendingPolicy::default();
    let austen = author(&store, "Jane Austen").await;
    let title = book(&store, austen, "Persuasion", 1).await;

    let mut members = Vec::new();
    for i in 0..8 {
        members.push(user(&store, &format!("member{i}")).await);
    }

    let mut handles = Vec::new();
    for member in members {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.open_loan(&loan(member, title), &policy).await.is_ok()
        }));
    }
    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.get_book(title).await.unwrap().available_copies, 0);
}

#[tokio::test]
async fn borrow_limit_then_return_frees_a_slot() {
    let store = MemoryStore::new();
    let policy = LendingPolicy::default();
    let reader = user(&store, "reader").await;
    let austen = author(&store, "Jane Austen").await;

    let mut loans = Vec::new();
    for i in 0..5 {
        let id = book(&store, austen, &format!("Volume {i}"), 2).await;
        loans.push(store.open_loan(&loan(reader, id), &policy).await.unwrap());
    }

    let sixth = book(&store, austen, "Volume 5", 2).await;
    let err = store.open_loan(&loan(reader, sixth), &policy).await.unwrap_err();
    match err {
        StoreError::Domain(e) => assert_eq!(e.code(), "BORROW_LIMIT_REACHED"),
        other => panic!("unexpected error: {other:?}"),
    }

    store
        .close_loan(loans[0].id, Some(reader), Utc::now())
        .await
        .unwrap();
    store.open_loan(&loan(reader, sixth), &policy).await.unwrap();
}

#[tokio::test]
async fn return_by_someone_else_is_not_found() {
    let store = MemoryStore::new();
    let policy = LendingPolicy::default();
    let owner = user(&store, "owner").await;
    let other = user(&store, "other").await;
    let austen = author(&store, "Jane Austen").await;
    let title = book(&store, austen, "Emma", 1).await;
    let borrow = store.open_loan(&loan(owner, title), &policy).await.unwrap();

    let err = store
        .close_loan(borrow.id, Some(other), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn late_return_is_overdue_and_restores_copy() {
    let store = MemoryStore::new();
    let policy = LendingPolicy::default();
    let reader = user(&store, "reader").await;
    let austen = author(&store, "Jane Austen").await;
    let title = book(&store, austen, "Emma", 1).await;
    let borrow = store.open_loan(&loan(reader, title), &policy).await.unwrap();

    let closed = store
        .close_loan(borrow.id, Some(reader), borrow.due_at + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(closed.status, BorrowStatus::Overdue);
    assert_eq!(store.get_book(title).await.unwrap().available_copies, 1);

    let again = store
        .close_loan(borrow.id, Some(reader), Utc::now())
        .await
        .unwrap_err();
    match again {
        StoreError::Domain(e) => assert_eq!(e.code(), "ALREADY_RETURNED"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.get_book(title).await.unwrap().available_copies, 1);
}

#[tokio::test]
async fn renewal_is_capped() {
    let store = MemoryStore::new();
    let policy = LendingPolicy::default();
    let reader = user(&store, "reader").await;
    let austen = author(&store, "Jane Austen").await;
    let title = book(&store, austen, "Emma", 1).await;
    let borrow = store.open_loan(&loan(reader, title), &policy).await.unwrap();

    let first = store.renew_loan(borrow.id, &policy, Utc::now()).await.unwrap();
    assert_eq!(first.renewal_count, 1);
    assert_eq!(first.due_at, borrow.due_at + Duration::days(14));
    store.renew_loan(borrow.id, &policy, Utc::now()).await.unwrap();

    let err = store
        .renew_loan(borrow.id, &policy, Utc::now())
        .await
        .unwrap_err();
    match err {
        StoreError::Domain(e) => assert_eq!(e.code(), "RENEWAL_LIMIT_REACHED"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn author_names_conflict_case_insensitively() {
    let store = MemoryStore::new();
    author(&store, "Jane Austen").await;
    let err = store
        .insert_author(&AuthorInput {
            name: "  jane AUSTEN ".to_string(),
            bio: None,
            photo_url: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn author_delete_restricted_by_books() {
    let store = MemoryStore::new();
    let austen = author(&store, "Jane Austen").await;
    let harari = author(&store, "Yuval Noah Harari").await;
    book(&store, austen, "Emma", 1).await;

    let err = store.delete_author(austen).await.unwrap_err();
    assert!(matches!(err, StoreError::Restricted(_)));

    store.delete_author(harari).await.unwrap();
    assert!(store.get_author(harari).await.is_err());
}

#[tokio::test]
async fn search_filters_sorts_and_pages() {
    let store = MemoryStore::new();
    let austen = author(&store, "Jane Austen").await;
    let harari = author(&store, "Yuval Noah Harari").await;
    book(&store, austen, "Pride and Prejudice", 3).await;
    book(&store, austen, "Emma", 0).await;
    book(&store, harari, "Sapiens", 2).await;

    let all = store.search_books(&BookQuery::default()).await.unwrap();
    assert_eq!(all.total, 3);
    let titles: Vec<_> = all.items.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Emma", "Pride and Prejudice", "Sapiens"]);

    let by_author = store
        .search_books(&BookQuery {
            author: Some("austen".to_string()),
            available_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_author.total, 1);
    assert_eq!(by_author.items[0].title, "Pride and Prejudice");
    assert_eq!(by_author.items[0].author_name, "Jane Austen");

    let second_page = store
        .search_books(&BookQuery {
            pagination: Pagination::new(Some(2), Some(2)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(second_page.total, 3);
    assert_eq!(second_page.items.len(), 1);
    assert_eq!(second_page.page, 2);
}

#[tokio::test]
async fn listings_sort_case_insensitively() {
    let store = MemoryStore::new();
    let reader = user(&store, "reader").await;
    let lower = author(&store, "bell hooks").await;
    let upper = author(&store, "Zadie Smith").await;
    let mid = author(&store, "Angela Carter").await;
    book(&store, lower, "all about love", 1).await;
    book(&store, upper, "White Teeth", 1).await;
    book(&store, mid, "Nights at the Circus", 1).await;
    book(&store, mid, "The Bloody Chamber", 1).await;

    let page = store.search_books(&BookQuery::default()).await.unwrap();
    let titles: Vec<_> = page.items.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(
        titles,
        ["all about love", "Nights at the Circus", "The Bloody Chamber", "White Teeth"]
    );

    let authors = store.list_authors(None, 10).await.unwrap();
    let names: Vec<_> = authors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Angela Carter", "bell hooks", "Zadie Smith"]);

    for id in [upper, lower, mid] {
        store.follow_author(reader, id).await.unwrap();
    }
    let follows = store.list_follows(reader).await.unwrap();
    let followed: Vec<_> = follows.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(followed, ["Angela Carter", "bell hooks", "Zadie Smith"]);
}

#[tokio::test]
async fn reviews_upsert_and_aggregate() {
    let store = MemoryStore::new();
    let austen = author(&store, "Jane Austen").await;
    let title = book(&store, austen, "Emma", 1).await;

    for (name, rating) in [("a", 5), ("b", 3), ("c", 4)] {
        let id = user(&store, name).await;
        store
            .upsert_review(&ReviewInput {
                user_id: id,
                book_id: title,
                rating,
                comment: None,
            })
            .await
            .unwrap();
    }
    let rated = store.get_book(title).await.unwrap();
    assert_eq!(rated.average_rating, 4.0);
    assert_eq!(rated.review_count, 3);

    let reviews = store.list_reviews_for_book(title).await.unwrap();
    let first = reviews.iter().find(|r| r.username == "b").unwrap();
    store
        .upsert_review(&ReviewInput {
            user_id: first.user_id,
            book_id: title,
            rating: 5,
            comment: Some("better on reread".to_string()),
        })
        .await
        .unwrap();
    let rated = store.get_book(title).await.unwrap();
    assert_eq!(rated.review_count, 3);
    assert_eq!(rated.average_rating, 4.67);
}

#[tokio::test]
async fn follows_are_idempotent_and_fan_out() {
    let store = MemoryStore::new();
    let austen = author(&store, "Jane Austen").await;
    let a = user(&store, "a").await;
    let b = user(&store, "b").await;

    assert!(store.follow_author(a, austen).await.unwrap());
    assert!(!store.follow_author(a, austen).await.unwrap());
    assert!(store.follow_author(b, austen).await.unwrap());
    assert_eq!(store.list_followers(austen).await.unwrap().len(), 2);

    assert!(store.unfollow_author(b, austen).await.unwrap());
    assert!(!store.unfollow_author(b, austen).await.unwrap());
    assert_eq!(store.list_follows(a).await.unwrap()[0].name, "Jane Austen");
}

#[tokio::test]
async fn notifications_read_flow() {
    let store = MemoryStore::new();
    let a = user(&store, "a").await;
    let b = user(&store, "b").await;
    let batch: Vec<_> = (0..3)
        .map(|i| NewNotification {
            user_id: a,
            kind: NotificationKind::AuthorNewBook,
            title: format!("New book {i}"),
            body: "A followed author has a new book".to_string(),
            book_id: None,
            author_id: None,
        })
        .collect();
    let created = store.insert_notifications(&batch).await.unwrap();
    assert_eq!(created.len(), 3);

    let err = store
        .mark_notification_read(b, created[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    store.mark_notification_read(a, created[0].id).await.unwrap();
    let unread = store.list_notifications(a, true, 50).await.unwrap();
    assert_eq!(unread.len(), 2);

    assert_eq!(store.mark_all_notifications_read(a).await.unwrap(), 2);
    assert!(store.list_notifications(a, true, 50).await.unwrap().is_empty());
    assert_eq!(store.list_notifications(a, false, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_user_restores_copies_and_removes_rows() {
    let store = MemoryStore::new();
    let policy = LendingPolicy::default();
    let reader = user(&store, "reader").await;
    let austen = author(&store, "Jane Austen").await;
    let title = book(&store, austen, "Emma", 2).await;
    store.open_loan(&loan(reader, title), &policy).await.unwrap();
    store.follow_author(reader, austen).await.unwrap();

    store.delete_user(reader).await.unwrap();

    assert_eq!(store.get_book(title).await.unwrap().available_copies, 2);
    assert!(store.list_followers(austen).await.unwrap().is_empty());
    assert!(
        store
            .list_loans(&LoanFilter::for_user(reader))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn book_with_active_loan_cannot_be_deleted() {
    let store = MemoryStore::new();
    let policy = LendingPolicy::default();
    let reader = user(&store, "reader").await;
    let austen = author(&store, "Jane Austen").await;
    let title = book(&store, austen, "Emma", 1).await;
    let borrow = store.open_loan(&loan(reader, title), &policy).await.unwrap();

    let err = store.delete_book(title).await.unwrap_err();
    assert!(matches!(err, StoreError::Restricted(_)));

    store
        .close_loan(borrow.id, None, Utc::now())
        .await
        .unwrap();
    store.delete_book(title).await.unwrap();
    assert!(store.get_book(title).await.is_err());
}

#[tokio::test]
async fn finished_loans_carry_genre() {
    let store = MemoryStore::new();
    let policy = LendingPolicy::default();
    let reader = user(&store, "reader").await;
    let austen = author(&store, "Jane Austen").await;
    let title = book(&store, austen, "Emma", 1).await;
    let borrow = store.open_loan(&loan(reader, title), &policy).await.unwrap();
    store
        .close_loan(borrow.id, Some(reader), Utc::now())
        .await
        .unwrap();

    let finished = store.finished_loans(reader).await.unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].genre.as_deref(), Some("Classic"));
}
