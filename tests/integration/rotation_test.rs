//! Integration tests for single-use refresh token rotation.

mod helpers;

use std::sync::Arc;

use authkeep_auth::session::RefreshInput;
use authkeep_auth::{AuthError, RefreshTokenStore};
use authkeep_core::context::RequestContext;
use authkeep_core::types::ClientMeta;
use authkeep_entity::session::{RefreshToken, TokenState};

use helpers::TestApp;

#[tokio::test]
async fn test_rotation_chain() {
    let app = TestApp::new();
    let ctx = RequestContext::new();
    app.signup("chain@example.com").await;
    let mut current = app.login("chain@example.com").await;
    let mut retired = Vec::new();

    for _ in 0..5 {
        let next = app
            .manager
            .refresh(
                &ctx,
                RefreshInput {
                    refresh_token: current.refresh_token.clone(),
                },
            )
            .await
            .unwrap();
        retired.push(current.refresh_token);
        current = next;
    }

    let now = chrono::Utc::now();
    for token in &retired {
        let record = app.tokens.get_by_token(&ctx, token).await.unwrap().unwrap();
        assert_eq!(record.state_at(now), TokenState::Rotated);
    }
    let active = app.manager.active_sessions(&ctx, current.user_id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].token, current.refresh_token);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_refresh_rotates_once() {
    let app = Arc::new(TestApp::new());
    let user_id = app.signup("race@example.com").await.user_id;
    let stolen = app.login("race@example.com").await.refresh_token;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let app = Arc::clone(&app);
        let token = stolen.clone();
        handles.push(tokio::spawn(async move {
            app.manager
                .refresh(
                    &RequestContext::new(),
                    RefreshInput {
                        refresh_token: token,
                    },
                )
                .await
        }));
    }

    let mut successes = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(_) => successes += 1,
            Err(AuthError::InvalidToken) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    let active = app
        .manager
        .active_sessions(&RequestContext::new(), user_id)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].token, stolen);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_logout_all_racing_refresh_leaves_no_live_session() {
    let app = Arc::new(TestApp::new());
    let ctx = RequestContext::new();

    for round in 0..50 {
        let user_id = app.signup(&format!("sweep{round}@example.com")).await.user_id;
        let mut sessions = Vec::new();
        for i in 0..8 {
            let token = RefreshToken::issue(
                format!("sweep-{round}-{i}-0123456789abcdef"),
                user_id,
                chrono::Duration::days(7),
                &ClientMeta::default(),
                chrono::Utc::now(),
            );
            app.tokens.create(&ctx, &token).await.unwrap();
            sessions.push(token.token);
        }

        let mut refreshes = Vec::new();
        for token in sessions {
            let app = Arc::clone(&app);
            refreshes.push(tokio::spawn(async move {
                app.manager
                    .refresh(
                        &RequestContext::new(),
                        RefreshInput {
                            refresh_token: token,
                        },
                    )
                    .await
            }));
        }
        let logout = {
            let app = Arc::clone(&app);
            tokio::spawn(async move { app.manager.logout_all(&RequestContext::new(), user_id).await })
        };

        logout.await.unwrap().unwrap();
        for result in futures::future::join_all(refreshes).await {
            match result.unwrap() {
                Ok(_) | Err(AuthError::InvalidToken) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        let active = app.manager.active_sessions(&ctx, user_id).await.unwrap();
        assert!(active.is_empty(), "round {round}: {} live sessions", active.len());
    }
}

#[tokio::test]
async fn test_revoked_and_rotated_fail_identically() {
    let app = TestApp::new();
    let ctx = RequestContext::new();
    app.signup("same@example.com").await;
    let a = app.login("same@example.com").await;
    let b = app.login("same@example.com").await;

    app.manager
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: a.refresh_token.clone(),
            },
        )
        .await
        .unwrap();
    app.tokens
        .revoke(&ctx, &b.refresh_token, chrono::Utc::now())
        .await
        .unwrap();

    let rotated = app
        .manager
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: a.refresh_token,
            },
        )
        .await
        .unwrap_err();
    let revoked = app
        .manager
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: b.refresh_token,
            },
        )
        .await
        .unwrap_err();
    let unknown = app
        .manager
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: "no-such-token".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(rotated.to_string(), revoked.to_string());
    assert_eq!(revoked.to_string(), unknown.to_string());
    assert_eq!(unknown.code(), "invalid_token");
}
