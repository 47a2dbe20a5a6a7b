//! Exercises a real wadoru server. Skipped unless `WADORU_LIVE_SERVER` is
//! set to the server's base URL, so the suite stays green offline.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use url::Url;

use wadoru::{Backend, HttpBackend, MemoryProfileStore, RecordingEffects, Session, SessionConfig};

fn live_server() -> Option<Url> {
    let raw = std::env::var("WADORU_LIVE_SERVER").ok()?;
    Url::parse(&raw).ok()
}

#[tokio::test]
async fn state_endpoint_answers_with_a_snapshot() {
    let Some(base) = live_server() else {
        return;
    };
    let backend = HttpBackend::new(reqwest::Client::new(), &base, None).unwrap();
    let snapshot = backend.fetch_state(None).await.unwrap();
    assert!(snapshot.max_rows >= snapshot.guess_count() as u32);
}

#[tokio::test]
async fn a_session_comes_up_and_applies_state() {
    let Some(base) = live_server() else {
        return;
    };
    let backend = HttpBackend::new(reqwest::Client::new(), &base, None).unwrap();
    let effects = RecordingEffects::new();
    let (mut session, handle) = Session::new(
        backend,
        effects.clone(),
        MemoryProfileStore::new(),
        SessionConfig::default(),
    );
    session.start().await;

    let driver = tokio::spawn(async move {
        session.run().await;
    });
    sleep(Duration::from_secs(1)).await;
    handle.shutdown();
    timeout(Duration::from_secs(5), driver).await.unwrap().unwrap();

    assert!(
        effects
            .calls()
            .iter()
            .any(|c| matches!(c, wadoru::EffectCall::Render { .. })),
        "expected at least one applied snapshot"
    );
}
