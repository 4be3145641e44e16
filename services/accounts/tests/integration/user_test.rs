use uuid::Uuid;

use keystone_accounts::domain::types::{EVENT_USER_CREATED, UserFilter};
use keystone_accounts::error::AccountsError;
use keystone_accounts::secret::{PasswordCheck, verify_password};
use keystone_accounts::usecase::user::{
    CountUsersUseCase, CreateUserUseCase, DeleteUserUseCase, GetUserUseCase, ListUsersUseCase,
    ReplaceUserUseCase, UpdateUserInput, UpdateUserUseCase, UpdateUsersUseCase,
};
use keystone_domain::pagination::Window;

use crate::helpers::{MockUserRepo, TEST_PASSWORD, test_profile, test_user};

// ── create ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_user_with_hashed_generated_password() {
    let repo = MockUserRepo::empty();
    let users = repo.users_handle();
    let events = repo.events_handle();

    let uc = CreateUserUseCase { repo };
    let created = uc
        .execute(test_profile("  Luis@Example.COM "))
        .await
        .unwrap();

    assert_eq!(created.email, "luis@example.com");
    assert!(created.password_hash.starts_with("$argon2id$"));

    let stored = users.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, created.id);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EVENT_USER_CREATED);
    assert!(
        events[0].payload.get("password").is_none(),
        "outbox payload must not carry the password"
    );
}

#[tokio::test]
async fn should_reject_duplicate_email_on_create() {
    let existing = test_user();
    let uc = CreateUserUseCase {
        repo: MockUserRepo::new(vec![existing.clone()]),
    };

    let result = uc.execute(test_profile("ANA@example.com")).await;
    assert!(
        matches!(result, Err(AccountsError::UserAlreadyExists)),
        "expected UserAlreadyExists, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_invalid_email_and_missing_names() {
    let uc = CreateUserUseCase {
        repo: MockUserRepo::empty(),
    };

    let result = uc.execute(test_profile("not-an-email")).await;
    assert!(matches!(result, Err(AccountsError::InvalidEmail)));

    let mut profile = test_profile("luis@example.com");
    profile.first_name = "   ".to_owned();
    let result = uc.execute(profile).await;
    assert!(matches!(result, Err(AccountsError::MissingData)));
}

#[tokio::test]
async fn concurrent_creates_with_same_email_yield_one_conflict() {
    // Both requests pass the free-email check before either one inserts.
    let repo = MockUserRepo::gated(2);
    let users = repo.users_handle();
    let uc = CreateUserUseCase { repo };

    let (a, b) = tokio::join!(
        uc.execute(test_profile("dup@example.com")),
        uc.execute(test_profile("DUP@example.com")),
    );

    let conflicts = [&a, &b]
        .into_iter()
        .filter(|r| matches!(r, Err(AccountsError::UserAlreadyExists)))
        .count();
    assert_eq!(conflicts, 1, "got {a:?} and {b:?}");
    assert!(a.is_ok() || b.is_ok());
    assert_eq!(users.lock().unwrap().len(), 1);
}

// ── read ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_returns_not_found_for_unknown_id() {
    let uc = GetUserUseCase {
        repo: MockUserRepo::new(vec![test_user()]),
    };
    let result = uc.execute(Uuid::new_v4()).await;
    assert!(matches!(result, Err(AccountsError::UserNotFound)));
}

#[tokio::test]
async fn list_and_count_apply_filter_and_window() {
    let role = Uuid::new_v4();
    let users: Vec<_> = (0..4)
        .map(|i| {
            let mut u = test_user();
            u.email = format!("user{i}@example.com");
            if i < 3 {
                u.role_id = role;
            }
            u
        })
        .collect();
    let repo = MockUserRepo::new(users);

    let filter = UserFilter {
        role_id: Some(role),
        ..Default::default()
    };

    let count = CountUsersUseCase { repo: repo.clone() }
        .execute(filter.clone())
        .await
        .unwrap();
    assert_eq!(count, 3);

    let page = ListUsersUseCase { repo: repo.clone() }
        .execute(filter, Window { limit: 2, skip: 1 })
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].email, "user1@example.com");

    let by_email = ListUsersUseCase { repo }
        .execute(UserFilter::by_email("USER3@example.com"), Window::default())
        .await
        .unwrap();
    assert_eq!(by_email.len(), 1);
}

// ── update ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_patch_only_given_fields() {
    let user = test_user();
    let repo = MockUserRepo::new(vec![user.clone()]);
    let handle = repo.users_handle();

    UpdateUserUseCase { repo }
        .execute(
            user.id,
            UpdateUserInput {
                phone: Some("+34 611 111 111".to_owned()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = handle.lock().unwrap()[0].clone();
    assert_eq!(stored.phone.as_deref(), Some("+34 611 111 111"));
    assert_eq!(stored.first_name, user.first_name);
    assert_eq!(stored.password_hash, user.password_hash);
}

#[tokio::test]
async fn patching_password_stores_new_hash() {
    let user = test_user();
    let repo = MockUserRepo::new(vec![user.clone()]);
    let handle = repo.users_handle();

    UpdateUserUseCase { repo }
        .execute(
            user.id,
            UpdateUserInput {
                password: Some("brand new secret".to_owned()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = handle.lock().unwrap()[0].password_hash.clone();
    assert_ne!(stored, "brand new secret");
    assert_eq!(verify_password("brand new secret", &stored), PasswordCheck::Match);
    assert_eq!(verify_password(TEST_PASSWORD, &stored), PasswordCheck::Mismatch);
}

#[tokio::test]
async fn update_rejects_empty_patch_and_unknown_user() {
    let user = test_user();
    let uc = UpdateUserUseCase {
        repo: MockUserRepo::new(vec![user.clone()]),
    };

    let empty = uc.execute(user.id, UpdateUserInput::default()).await;
    assert!(matches!(empty, Err(AccountsError::MissingData)));

    let unknown = uc
        .execute(
            Uuid::new_v4(),
            UpdateUserInput {
                phone: Some("1".to_owned()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(unknown, Err(AccountsError::UserNotFound)));
}

#[tokio::test]
async fn update_rejects_email_owned_by_another_user() {
    let a = test_user();
    let mut b = test_user();
    b.email = "bea@example.com".to_owned();
    let uc = UpdateUserUseCase {
        repo: MockUserRepo::new(vec![a.clone(), b.clone()]),
    };

    let result = uc
        .execute(
            b.id,
            UpdateUserInput {
                email: Some(a.email.clone()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AccountsError::UserAlreadyExists)));
}

#[tokio::test]
async fn bulk_update_returns_matched_count() {
    let role = Uuid::new_v4();
    let users: Vec<_> = (0..3)
        .map(|i| {
            let mut u = test_user();
            u.email = format!("user{i}@example.com");
            u.role_id = role;
            u
        })
        .collect();
    let repo = MockUserRepo::new(users);
    let handle = repo.users_handle();
    let filter = UserFilter {
        role_id: Some(role),
        ..Default::default()
    };
    let new_role = Uuid::new_v4();

    let uc = UpdateUsersUseCase { repo };
    let count = uc
        .execute(
            filter.clone(),
            UpdateUserInput {
                role_id: Some(new_role),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(count, 3);
    assert!(handle.lock().unwrap().iter().all(|u| u.role_id == new_role));

    let email_for_many = uc
        .execute(
            UserFilter {
                role_id: Some(new_role),
                ..Default::default()
            },
            UpdateUserInput {
                email: Some("shared@example.com".to_owned()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(email_for_many, Err(AccountsError::UserAlreadyExists)));
}

#[tokio::test]
async fn bulk_email_patch_matching_nobody_updates_nothing() {
    let uc = UpdateUsersUseCase {
        repo: MockUserRepo::new(vec![test_user()]),
    };

    let count = uc
        .execute(
            UserFilter {
                role_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
            UpdateUserInput {
                // Taken by the stored user, but no row is targeted.
                email: Some("ana@example.com".to_owned()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// ── replace / delete ─────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_overwrites_profile_but_keeps_password() {
    let user = test_user();
    let repo = MockUserRepo::new(vec![user.clone()]);
    let handle = repo.users_handle();

    ReplaceUserUseCase { repo }
        .execute(user.id, test_profile("luis@example.com"))
        .await
        .unwrap();

    let stored = handle.lock().unwrap()[0].clone();
    assert_eq!(stored.id, user.id);
    assert_eq!(stored.first_name, "Luis");
    assert_eq!(stored.middle_name, None);
    assert_eq!(stored.email, "luis@example.com");
    assert_eq!(stored.password_hash, user.password_hash);
}

#[tokio::test]
async fn replace_unknown_user_is_not_found() {
    let uc = ReplaceUserUseCase {
        repo: MockUserRepo::empty(),
    };
    let result = uc
        .execute(Uuid::new_v4(), test_profile("luis@example.com"))
        .await;
    assert!(matches!(result, Err(AccountsError::UserNotFound)));
}

#[tokio::test]
async fn delete_removes_user_once() {
    let user = test_user();
    let repo = MockUserRepo::new(vec![user.clone()]);
    let handle = repo.users_handle();
    let uc = DeleteUserUseCase { repo };

    uc.execute(user.id).await.unwrap();
    assert!(handle.lock().unwrap().is_empty());

    let again = uc.execute(user.id).await;
    assert!(matches!(again, Err(AccountsError::UserNotFound)));
}
