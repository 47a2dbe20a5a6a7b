use std::ops::RangeInclusive;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{sleep, Instant};

use wadoru::{MemoryProfileStore, NullEffects, Session, SessionConfig};

use super::{build_backend, ServerArgs};

const EMOJI_POOL: &[&str] = &["🦊", "🐙", "🦀", "🐸", "🦉", "🐼", "🦁", "🐧"];

// Opening-book words plus filler; the bot never tries to actually solve.
const WORDS: &[&str] = &[
    "crane", "slate", "audio", "roast", "pious", "liner", "about", "shine", "gravy", "point",
    "house", "brick", "sound", "flame", "tiger", "lemon", "quirk", "vouch",
];

pub(super) async fn run(
    server: ServerArgs,
    duration_secs: u64,
    think_ms: RangeInclusive<u64>,
    emoji: Option<String>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let backend = build_backend(&server)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let emoji = emoji.unwrap_or_else(|| pick(EMOJI_POOL, &mut rng));
    tracing::info!(%emoji, duration_secs, "bot joining");

    let (mut session, handle) = Session::new(
        backend,
        NullEffects,
        MemoryProfileStore::new(),
        SessionConfig::default(),
    );
    handle.set_identity(emoji);
    session.start().await;
    let driver = tokio::spawn(async move {
        session.run().await;
    });

    let deadline = Instant::now() + Duration::from_secs(duration_secs);
    while Instant::now() < deadline {
        let think = rng.random_range(think_ms.clone());
        sleep(Duration::from_millis(think)).await;
        handle.activity();
        let word = pick(WORDS, &mut rng);
        tracing::debug!(%word, "bot guessing");
        handle.submit_guess(word);
    }

    handle.shutdown();
    driver.await?;
    tracing::info!("bot done");
    Ok(())
}

fn pick(pool: &[&str], rng: &mut StdRng) -> String {
    pool[rng.random_range(0..pool.len())].to_string()
}
