//! Integration tests for notification dispatch through the worker pool.

mod helpers;

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use authkeep_auth::Notification;
use authkeep_auth::session::{LoginInput, SignupInput};
use authkeep_core::config::{NotificationConfig, WorkerConfig};
use authkeep_core::context::RequestContext;
use authkeep_worker::{NotificationDispatcher, NotificationSender, TaskError};

use helpers::{PASSWORD, TestApp};

#[derive(Debug, Default)]
struct Outbox {
    delivered: Mutex<Vec<Notification>>,
    attempts: AtomicU32,
    fail_first: u32,
}

#[async_trait]
impl NotificationSender for Outbox {
    async fn send(&self, notification: &Notification) -> Result<(), TaskError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(TaskError::Transient("relay unavailable".to_string()));
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn worker_config() -> WorkerConfig {
    WorkerConfig {
        workers: 2,
        queue_size: 8,
        max_retries: 3,
        retry_delay_ms: 1,
        task_timeout_seconds: 5,
        shutdown_timeout_seconds: 5,
    }
}

#[tokio::test]
async fn test_signup_and_login_notifications_are_delivered() {
    let app = TestApp::new();
    let outbox = Arc::new(Outbox::default());
    let dispatcher = Arc::new(NotificationDispatcher::start(outbox.clone(), &worker_config()));
    let sessions = app.notifying(
        dispatcher.clone(),
        NotificationConfig {
            send_verification_emails: true,
            send_login_notifications: true,
        },
    );
    let ctx = RequestContext::new();

    let signup = sessions
        .signup(
            &ctx,
            SignupInput {
                email: "notify@example.com".to_string(),
                password: PASSWORD.to_string(),
            },
        )
        .await
        .unwrap();
    sessions
        .login(
            &ctx,
            LoginInput {
                email: "notify@example.com".to_string(),
                password: PASSWORD.to_string(),
            },
        )
        .await
        .unwrap();

    assert!(dispatcher.shutdown().await);

    let delivered = outbox.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 2);
    assert!(delivered.iter().any(|n| matches!(
        n,
        Notification::VerificationRequested { token, .. } if token == &signup.verification_token
    )));
    assert!(
        delivered
            .iter()
            .any(|n| matches!(n, Notification::LoginAlert { .. }))
    );
    assert_eq!(dispatcher.stats().processed, 2);
}

#[tokio::test]
async fn test_transient_delivery_failure_is_retried() {
    let app = TestApp::new();
    let outbox = Arc::new(Outbox {
        fail_first: 2,
        ..Default::default()
    });
    let dispatcher = Arc::new(NotificationDispatcher::start(outbox.clone(), &worker_config()));
    let sessions = app.notifying(dispatcher.clone(), NotificationConfig::default());

    sessions
        .signup(
            &RequestContext::new(),
            SignupInput {
                email: "retry@example.com".to_string(),
                password: PASSWORD.to_string(),
            },
        )
        .await
        .unwrap();

    assert!(dispatcher.shutdown().await);

    assert_eq!(outbox.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(outbox.delivered.lock().unwrap().len(), 1);
    let stats = dispatcher.stats();
    assert_eq!(stats.retried, 2);
    assert_eq!(stats.processed, 1);
}

#[tokio::test]
async fn test_closed_dispatcher_does_not_fail_signup() {
    let app = TestApp::new();
    let outbox = Arc::new(Outbox::default());
    let dispatcher = Arc::new(NotificationDispatcher::start(outbox.clone(), &worker_config()));
    dispatcher.shutdown().await;

    let sessions = app.notifying(dispatcher.clone(), NotificationConfig::default());
    let out = sessions
        .signup(
            &RequestContext::new(),
            SignupInput {
                email: "closed@example.com".to_string(),
                password: PASSWORD.to_string(),
            },
        )
        .await;

    assert!(out.is_ok());
    assert!(outbox.delivered.lock().unwrap().is_empty());
    assert_eq!(app.users.len(), 1);
}
