//! Integration tests for the signup → login → refresh → logout lifecycle.

mod helpers;

use std::time::Duration;

use authkeep_auth::session::{LogoutInput, RefreshInput, VerifyEmailInput};
use authkeep_auth::{AuthError, RefreshTokenStore, SessionCleanup, TokenSigner, UserStore};
use authkeep_core::config::SessionConfig;
use authkeep_core::context::RequestContext;
use authkeep_core::types::{ClientMeta, UserId};

use helpers::TestApp;

#[tokio::test]
async fn test_end_to_end_lifecycle() {
    let app = TestApp::new();
    let ctx = RequestContext::new();

    let signup = app.signup("a@example.com").await;
    assert!(!signup.verification_token.is_empty());

    let first = app.login("a@example.com").await;
    assert_eq!(first.access_token.split('.').count(), 3);
    assert_eq!(first.user_id, signup.user_id);

    let second = app
        .manager
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: first.refresh_token.clone(),
            },
        )
        .await
        .unwrap();
    assert_ne!(second.access_token, "");
    assert_ne!(second.refresh_token, first.refresh_token);

    let r1 = app
        .tokens
        .get_by_token(&ctx, &first.refresh_token)
        .await
        .unwrap()
        .unwrap();
    assert!(r1.revoked);

    app.manager
        .logout(
            &ctx,
            LogoutInput {
                refresh_token: second.refresh_token.clone(),
            },
        )
        .await
        .unwrap();
    let r2 = app
        .tokens
        .get_by_token(&ctx, &second.refresh_token)
        .await
        .unwrap()
        .unwrap();
    assert!(r2.revoked);

    let err = app
        .manager
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: second.refresh_token,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn test_issued_claims_round_trip() {
    let app = TestApp::new();
    let signup = app.signup("claims@example.com").await;
    let tokens = app.login("claims@example.com").await;

    let claims = app.manager.validate_access_token(&tokens.access_token).unwrap();

    assert_eq!(claims.user_id, signup.user_id);
    assert_eq!(claims.sub, signup.user_id.to_string());
    assert_eq!(claims.email, "claims@example.com");
    assert!(!claims.email_verified);
    assert_eq!(claims.exp - claims.iat, app.manager.signer().ttl_seconds());
    assert_eq!(
        tokens.expires_in,
        i64::try_from(SessionConfig::default().refresh_token_ttl_seconds).unwrap()
    );
}

#[tokio::test]
async fn test_access_token_from_other_key_is_rejected() {
    let app = TestApp::new();
    app.signup("keys@example.com").await;
    let tokens = app.login("keys@example.com").await;

    let other = TokenSigner::configure(
        "HS256",
        authkeep_auth::KeyMaterial::Secret(b"a-completely-different-secret-value".to_vec()),
        "authkeep-test",
        Duration::from_secs(900),
    )
    .unwrap();

    let err = other.validate(&tokens.access_token).unwrap_err();
    assert!(matches!(err, AuthError::InvalidSignature));
}

#[tokio::test]
async fn test_logout_all_invalidates_every_refresh_token() {
    let app = TestApp::new();
    let ctx = RequestContext::new();
    let signup = app.signup("many@example.com").await;
    let other = app.signup("other@example.com").await;

    let sessions = vec![
        app.login("many@example.com").await,
        app.login("many@example.com").await,
        app.login("many@example.com").await,
    ];
    let bystander = app.login("other@example.com").await;

    let revoked = app.manager.logout_all(&ctx, signup.user_id).await.unwrap();
    assert_eq!(revoked, 3);

    for session in sessions {
        let err = app
            .manager
            .refresh(
                &ctx,
                RefreshInput {
                    refresh_token: session.refresh_token,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    let still_active = app
        .manager
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: bystander.refresh_token,
            },
        )
        .await
        .unwrap();
    assert_eq!(still_active.user_id, other.user_id);
}

#[tokio::test]
async fn test_verify_email_is_idempotent() {
    let app = TestApp::new();
    let ctx = RequestContext::new();
    let signup = app.signup("verify@example.com").await;

    let input = VerifyEmailInput {
        email: "verify@example.com".to_string(),
        token: signup.verification_token.clone(),
    };
    app.manager.verify_email(&ctx, input.clone()).await.unwrap();
    let after_first = app
        .users
        .get_by_id(&ctx, signup.user_id)
        .await
        .unwrap()
        .unwrap();

    app.manager.verify_email(&ctx, input).await.unwrap();
    let after_second = app
        .users
        .get_by_id(&ctx, signup.user_id)
        .await
        .unwrap()
        .unwrap();

    assert!(after_first.email_verified);
    assert_eq!(after_first.updated_at, after_second.updated_at);
    assert!(after_second.email_verification_token.is_none());
}

#[tokio::test]
async fn test_expired_verification_token_is_rejected() {
    let app = TestApp::with_config(SessionConfig {
        verification_token_ttl_seconds: 0,
        ..SessionConfig::default()
    });
    let signup = app.signup("late@example.com").await;

    let err = app
        .manager
        .verify_email(
            &RequestContext::new(),
            VerifyEmailInput {
                email: "late@example.com".to_string(),
                token: signup.verification_token,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn test_refresh_records_client_metadata() {
    let app = TestApp::new();
    app.signup("meta@example.com").await;
    let first = app.login("meta@example.com").await;

    let ctx = RequestContext::new().with_client(ClientMeta::new(
        Some("mobile/2.3".to_string()),
        Some("192.0.2.10".parse().unwrap()),
    ));
    let second = app
        .manager
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: first.refresh_token.clone(),
            },
        )
        .await
        .unwrap();

    let issued = app
        .tokens
        .get_by_token(&ctx, &second.refresh_token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(issued.user_agent.as_deref(), Some("mobile/2.3"));
    assert_eq!(issued.ip_address, Some("192.0.2.10".parse().unwrap()));

    let retired = app
        .tokens
        .get_by_token(&ctx, &first.refresh_token)
        .await
        .unwrap()
        .unwrap();
    assert!(retired.last_used_at.is_some());
    assert_eq!(retired.replaced_by.as_deref(), Some(second.refresh_token.as_str()));
}

#[tokio::test]
async fn test_cleanup_keeps_recent_revocations() {
    let app = TestApp::new();
    let ctx = RequestContext::new();
    app.signup("sweep@example.com").await;
    let tokens = app.login("sweep@example.com").await;
    app.manager
        .logout(
            &ctx,
            LogoutInput {
                refresh_token: tokens.refresh_token.clone(),
            },
        )
        .await
        .unwrap();

    let cleanup = SessionCleanup::from_config(
        std::sync::Arc::new(app.tokens.clone()),
        &SessionConfig::default(),
    );
    assert_eq!(cleanup.run_cleanup(&ctx).await.unwrap(), 0);
    assert_eq!(app.tokens.len(), 1);
}

#[tokio::test]
async fn test_unknown_user_lookup() {
    let app = TestApp::new();
    let err = app
        .manager
        .get_user_by_id(&RequestContext::new(), UserId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));
}
