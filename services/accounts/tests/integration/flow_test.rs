use keystone_accounts::domain::repository::UserRepository;
use keystone_accounts::domain::types::{CodeChallenge, Credentials, UserPatch};
use keystone_accounts::error::AccountsError;
use keystone_accounts::secret::hash_password;
use keystone_accounts::usecase::auth::{IdentifyUseCase, VerifyCodeUseCase};
use keystone_accounts::usecase::user::CreateUserUseCase;
use keystone_auth_types::token::validate_access_token;

use crate::helpers::{
    MockLoginRepo, MockUserRepo, TEST_CODE_TTL_SECS, TEST_JWT_SECRET, test_issuer, test_profile,
};

/// Create an account, set a known password, then walk both login stages.
#[tokio::test]
async fn create_identify_and_redeem_code() {
    let users = MockUserRepo::empty();
    let logins = MockLoginRepo::empty();

    let created = CreateUserUseCase {
        repo: users.clone(),
    }
    .execute(test_profile("a@x.com"))
    .await
    .unwrap();

    // The generated password is never returned; install a known one.
    let patch = UserPatch {
        password_hash: Some(hash_password("known password").unwrap()),
        ..Default::default()
    };
    assert!(users.update_by_id(created.id, &patch).await.unwrap());

    let identified = IdentifyUseCase {
        users: users.clone(),
        logins: logins.clone(),
        code_ttl_secs: TEST_CODE_TTL_SECS,
    }
    .execute(Credentials {
        email: "a@x.com".to_owned(),
        password: "known password".to_owned(),
    })
    .await
    .unwrap();
    assert_eq!(identified.id, created.id);

    let code = logins.logins_handle().lock().unwrap()[0].code.clone();
    let verify = VerifyCodeUseCase {
        users: users.clone(),
        logins: logins.clone(),
        tokens: test_issuer(),
    };

    let wrong = verify
        .execute(CodeChallenge {
            user_id: created.id,
            code: format!("{code}x"),
        })
        .await;
    assert!(matches!(wrong, Err(AccountsError::InvalidCode)));

    let ok = verify
        .execute(CodeChallenge {
            user_id: created.id,
            code: code.clone(),
        })
        .await
        .unwrap();
    assert_eq!(ok.user.id, created.id);
    assert!(!ok.token.token.is_empty());
    let info = validate_access_token(&ok.token.token, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.email, "a@x.com");

    let repeat = verify
        .execute(CodeChallenge {
            user_id: created.id,
            code,
        })
        .await;
    assert!(matches!(repeat, Err(AccountsError::InvalidCode)));
}
