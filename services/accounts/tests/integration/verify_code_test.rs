use chrono::{Duration, Utc};
use uuid::Uuid;

use keystone_accounts::domain::types::CodeChallenge;
use keystone_accounts::error::AccountsError;
use keystone_accounts::usecase::auth::{VerifyCodeUseCase, parse_challenge_user_id, validate_code};
use keystone_auth_types::token::validate_access_token;

use crate::helpers::{
    GatedLoginRepo, MockLoginRepo, MockUserRepo, TEST_JWT_SECRET, login_for, test_issuer,
    test_user,
};

fn challenge(user_id: Uuid, code: &str) -> CodeChallenge {
    CodeChallenge {
        user_id,
        code: code.to_owned(),
    }
}

#[tokio::test]
async fn validate_code_finds_matching_record_without_consuming_it() {
    let user = test_user();
    let users = MockUserRepo::new(vec![user.clone()]);
    let logins = MockLoginRepo::new(vec![login_for(user.id, "Ab3xZ", Utc::now())]);
    let handle = logins.logins_handle();

    let found = validate_code(&users, &logins, &challenge(user.id, "Ab3xZ"), Utc::now())
        .await
        .unwrap();

    let (login, found_user) = found.expect("code should validate");
    assert_eq!(login.code, "Ab3xZ");
    assert_eq!(found_user.id, user.id);
    assert!(!handle.lock().unwrap()[0].code_consumed);
}

#[tokio::test]
async fn validate_code_is_case_sensitive() {
    let user = test_user();
    let users = MockUserRepo::new(vec![user.clone()]);
    let logins = MockLoginRepo::new(vec![login_for(user.id, "Ab3xZ", Utc::now())]);

    let found = validate_code(&users, &logins, &challenge(user.id, "ab3xz"), Utc::now())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn should_reject_wrong_code() {
    let user = test_user();
    let uc = VerifyCodeUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        logins: MockLoginRepo::new(vec![login_for(user.id, "Ab3xZ", Utc::now())]),
        tokens: test_issuer(),
    };

    let result = uc.execute(challenge(user.id, "zzzzz")).await;
    assert!(
        matches!(result, Err(AccountsError::InvalidCode)),
        "expected InvalidCode, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_code_belonging_to_another_user() {
    let user = test_user();
    let uc = VerifyCodeUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        logins: MockLoginRepo::new(vec![login_for(user.id, "Ab3xZ", Utc::now())]),
        tokens: test_issuer(),
    };

    let result = uc.execute(challenge(Uuid::new_v4(), "Ab3xZ")).await;
    assert!(matches!(result, Err(AccountsError::InvalidCode)));
}

#[tokio::test]
async fn should_issue_token_and_consume_code() {
    let user = test_user();
    let logins = MockLoginRepo::new(vec![login_for(user.id, "Ab3xZ", Utc::now())]);
    let handle = logins.logins_handle();
    let uc = VerifyCodeUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        logins,
        tokens: test_issuer(),
    };

    let output = uc.execute(challenge(user.id, "Ab3xZ")).await.unwrap();
    assert_eq!(output.user.id, user.id);

    let info = validate_access_token(&output.token.token, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.user_id, user.id);
    assert_eq!(info.email, user.email);
    assert_eq!(info.role_id, user.role_id);
    assert_eq!(info.name, "Ana Maria Lopez");
    assert_eq!(info.expires_at, output.token.expires_at);

    let logins = handle.lock().unwrap();
    assert!(logins[0].code_consumed);
    assert!(!logins[0].token_consumed);
    assert_eq!(logins[0].token, output.token.token);
    assert!(logins[0].consumed_at.is_some());
}

#[tokio::test]
async fn code_is_single_use() {
    let user = test_user();
    let uc = VerifyCodeUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        logins: MockLoginRepo::new(vec![login_for(user.id, "Ab3xZ", Utc::now())]),
        tokens: test_issuer(),
    };

    uc.execute(challenge(user.id, "Ab3xZ")).await.unwrap();
    let second = uc.execute(challenge(user.id, "Ab3xZ")).await;
    assert!(
        matches!(second, Err(AccountsError::InvalidCode)),
        "second redemption must fail, got {second:?}"
    );
}

async fn race_two_redemptions(guarded: bool) -> usize {
    let user = test_user();
    let logins = MockLoginRepo::new(vec![login_for(user.id, "Ab3xZ", Utc::now())]);
    let uc = VerifyCodeUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        logins: GatedLoginRepo::new(logins, 2, guarded),
        tokens: test_issuer(),
    };

    // Both calls clear the lookup before either one redeems.
    let (a, b) = tokio::join!(
        uc.execute(challenge(user.id, "Ab3xZ")),
        uc.execute(challenge(user.id, "Ab3xZ")),
    );
    for result in [&a, &b] {
        if let Err(e) = result {
            assert!(matches!(e, AccountsError::InvalidCode), "unexpected error {e:?}");
        }
    }
    [a.is_ok(), b.is_ok()].into_iter().filter(|ok| *ok).count()
}

#[tokio::test]
async fn concurrent_redemptions_succeed_exactly_once() {
    assert_eq!(race_two_redemptions(true).await, 1);
}

#[tokio::test]
async fn unguarded_redeem_lets_both_racers_through() {
    // Same interleaving without the code_consumed guard: the race is real.
    assert_eq!(race_two_redemptions(false).await, 2);
}

#[tokio::test]
async fn should_reject_code_of_deleted_user() {
    let user = test_user();
    let uc = VerifyCodeUseCase {
        users: MockUserRepo::empty(),
        logins: MockLoginRepo::new(vec![login_for(user.id, "Ab3xZ", Utc::now())]),
        tokens: test_issuer(),
    };

    let result = uc.execute(challenge(user.id, "Ab3xZ")).await;
    assert!(matches!(result, Err(AccountsError::InvalidCode)));
}

#[tokio::test]
async fn should_reject_expired_code() {
    let user = test_user();
    let issued = Utc::now() - Duration::seconds(600);
    let uc = VerifyCodeUseCase {
        users: MockUserRepo::new(vec![user.clone()]),
        logins: MockLoginRepo::new(vec![login_for(user.id, "Ab3xZ", issued)]),
        tokens: test_issuer(),
    };

    let result = uc.execute(challenge(user.id, "Ab3xZ")).await;
    assert!(matches!(result, Err(AccountsError::InvalidCode)));
}

#[test]
fn malformed_user_id_is_an_invalid_code() {
    assert!(matches!(
        parse_challenge_user_id("not-a-uuid"),
        Err(AccountsError::InvalidCode)
    ));
    let id = Uuid::new_v4();
    assert_eq!(parse_challenge_user_id(&id.to_string()).unwrap(), id);
}
