use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use url::Url;

use wadoru::{FsProfileStore, GameEffects, HttpBackend, Session, SessionConfig, SessionHandle};
use wadoru_core::{ChatMessage, GuessReply, LetterResult, LobbyId, RevealedHint, StateSnapshot};

mod bot;

#[derive(Parser)]
#[command(name = "wadoru", version, about = "Terminal client for wadoru lobbies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ServerArgs {
    #[arg(long, env = "WADORU_SERVER_URL", default_value = "http://localhost:5000/")]
    server: String,
    /// Lobby code; omit for the main room.
    #[arg(long)]
    lobby: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a lobby interactively. Type a word to guess it; `/chat <msg>`,
    /// `/emoji <e>`, `/hint <col>`, `/reset`, `/quit`.
    Play {
        #[command(flatten)]
        server: ServerArgs,
        #[arg(long)]
        emoji: Option<String>,
    },
    /// Headless player that guesses on its own. Useful for load and
    /// liveness checks against a running server.
    Bot {
        #[command(flatten)]
        server: ServerArgs,
        #[arg(long, default_value_t = 60)]
        duration_secs: u64,
        #[arg(long, default_value_t = 2_000)]
        think_min_ms: u64,
        #[arg(long, default_value_t = 8_000)]
        think_max_ms: u64,
        #[arg(long)]
        emoji: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Play { server, emoji } => play(server, emoji).await,
        Commands::Bot {
            server,
            duration_secs,
            think_min_ms,
            think_max_ms,
            emoji,
            seed,
        } => bot::run(server, duration_secs, think_min_ms..=think_max_ms, emoji, seed).await,
    }
}

fn build_backend(server: &ServerArgs) -> anyhow::Result<HttpBackend> {
    let base = Url::parse(&server.server)?;
    let lobby = server.lobby.as_deref().map(LobbyId::parse).transpose()?;
    Ok(HttpBackend::new(reqwest::Client::new(), &base, lobby.as_ref())?)
}

async fn play(server: ServerArgs, emoji: Option<String>) -> anyhow::Result<()> {
    let backend = build_backend(&server)?;
    let profile = FsProfileStore::open()
        .ok_or_else(|| anyhow::anyhow!("no platform data directory available"))?;

    let (mut session, handle) =
        Session::new(backend, TerminalEffects, profile, SessionConfig::default());
    if let Some(emoji) = emoji {
        handle.set_identity(emoji);
    }
    spawn_input_loop(handle.clone());

    println!("joined {}; type a five-letter word to guess", server.server);
    session.start().await;
    session.run().await;
    Ok(())
}

fn spawn_input_loop(handle: SessionHandle) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            handle.activity();
            if let Some(text) = line.strip_prefix("/chat ") {
                handle.send_chat(text);
            } else if let Some(emoji) = line.strip_prefix("/emoji ") {
                handle.set_identity(emoji.trim());
            } else if let Some(col) = line.strip_prefix("/hint") {
                handle.claim_hint(col.trim().parse().unwrap_or(0));
            } else if line == "/reset" {
                handle.reset_round();
            } else if line == "/quit" {
                handle.shutdown();
                return;
            } else {
                handle.submit_guess(line.to_lowercase());
            }
        }
        handle.shutdown();
    });
}

/// Prints game events to stdout; logging stays on stderr.
struct TerminalEffects;

fn tiles(results: &[LetterResult]) -> String {
    results
        .iter()
        .map(|r| match r {
            LetterResult::Correct => '🟩',
            LetterResult::Present => '🟨',
            LetterResult::Absent => '⬛',
        })
        .collect()
}

impl GameEffects for TerminalEffects {
    fn guess_landed(&mut self, snapshot: &StateSnapshot, index: usize) {
        if let Some(row) = snapshot.guesses.get(index) {
            println!("{} {}  {}", row.emoji, row.guess, tiles(&row.result));
        }
    }

    fn chat_arrived(&mut self, message: &ChatMessage) {
        println!("{}: {}", message.emoji, message.text);
    }

    fn score_changed(&mut self, emoji: &str, delta: f64) {
        println!("{emoji} {}{delta:.1}", if delta >= 0.0 { "+" } else { "" });
    }

    fn daily_double_armed(&mut self, row: u32) {
        println!("daily double! claim a letter for row {row} with /hint <col>");
    }

    fn hint_revealed(&mut self, hint: &RevealedHint) {
        println!(
            "hint: position {} is '{}' (row {})",
            hint.col + 1,
            hint.letter,
            hint.row
        );
    }

    fn hint_cleared(&mut self) {
        println!("hint expired");
    }

    fn game_over(&mut self, snapshot: &StateSnapshot) {
        let word = snapshot.target_word.as_deref().unwrap_or("?");
        match &snapshot.winner_emoji {
            Some(winner) => println!("round over: {winner} got \"{word}\""),
            None => println!("round over: the word was \"{word}\""),
        }
        if let Some(definition) = &snapshot.definition {
            println!("  {definition}");
        }
    }

    fn round_started(&mut self) {
        println!("new round");
    }

    fn removed_from_game(&mut self) {
        println!("you were removed from the lobby; pick a new emoji to rejoin");
    }

    fn guess_result(&mut self, reply: &GuessReply) {
        if reply.won {
            println!("you got it! +{:.1}", reply.points_delta);
        }
        if let Some(close) = &reply.close_call {
            match &close.winner {
                Some(winner) => println!("so close: {winner} beat you by {}ms", close.delta_ms),
                None => println!("so close: beaten by {}ms", close.delta_ms),
            }
        }
    }

    fn request_rejected(&mut self, msg: &str) {
        println!("rejected: {msg}");
    }

    fn connection_lost(&mut self) {
        println!("connection lost, retrying...");
    }

    fn reconnected(&mut self) {
        println!("reconnected");
    }

    fn session_expired(&mut self) {
        println!("this lobby no longer exists");
    }

    fn server_notice(&mut self, message: &str) {
        println!("server: {message}");
    }

    fn redirect_home(&mut self) {
        println!("returning to the main room; restart without --lobby");
    }

    fn reload(&mut self) {
        println!("server restarted; reconnect to continue");
    }
}
