//! chessmux CLI - play chess against pluggable engine backends.
//!
//! Two modes:
//! - `selfplay`: the artificial opponent plays both sides through the
//!   provider layer, printing each move as it lands.
//! - `play`: interactive play from stdin against the artificial opponent,
//!   with undo/hint/new-game commands.
//!
//! The backend comes from `CHESSMUX_BACKEND` (with per-backend URL
//! overrides from `CHESSMUX_*_API_URL`), or the `--backend` flag.

use std::io::{BufRead, Write as _};

use anyhow::Context;
use chess::PieceColor;
use chess_client::{
    AiOpponent, BackendId, BackendSelector, CreateGameOptions, GameSession, Provider,
};
use clap::{Parser, Subcommand};
use engine::Tier;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chessmux", about = "Chess client with pluggable engine backends")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the engine play both sides.
    Selfplay {
        /// Strength tier for White.
        #[arg(long, default_value = "medium")]
        white: Tier,

        /// Strength tier for Black.
        #[arg(long, default_value = "medium")]
        black: Tier,

        /// Starting position as FEN (standard start if omitted).
        #[arg(long)]
        fen: Option<String>,

        /// Stop after this many half-moves.
        #[arg(long, default_value_t = 80)]
        max_plies: u32,

        /// Backend to run the game against.
        #[arg(long)]
        backend: Option<BackendId>,
    },

    /// Play against the engine from the terminal.
    Play {
        /// Strength tier of the artificial opponent.
        #[arg(long, default_value = "medium")]
        tier: Tier,

        /// Side the artificial opponent plays ("white" or "black").
        #[arg(long, default_value = "black")]
        ai_color: String,

        /// Backend to run the game against.
        #[arg(long)]
        backend: Option<BackendId>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Selfplay {
            white,
            black,
            fen,
            max_plies,
            backend,
        } => selfplay(white, black, fen, max_plies, backend).await,
        Commands::Play {
            tier,
            ai_color,
            backend,
        } => play(tier, &ai_color, backend).await,
    }
}

/// Build the selector from the environment, letting the CLI flag override
/// the default backend.
fn selector_for(backend: Option<BackendId>) -> anyhow::Result<BackendSelector> {
    let mut settings = BackendSelector::from_env()?.settings();
    if let Some(backend) = backend {
        settings.active = backend;
    }
    BackendSelector::from_settings(settings).context("failed to construct backend selector")
}

async fn selfplay(
    white: Tier,
    black: Tier,
    fen: Option<String>,
    max_plies: u32,
    backend: Option<BackendId>,
) -> anyhow::Result<()> {
    let selector = selector_for(backend)?;
    let provider = selector.provider();
    println!(
        "# selfplay on {} (white: {}, black: {})",
        selector.active().display_name(),
        white,
        black
    );

    let mut state = provider
        .create_game(CreateGameOptions {
            fen,
            ..Default::default()
        })
        .await?;
    let id = state.id.clone();
    info!(backend = %selector.active(), %id, "selfplay game created");

    for ply in 1..=max_plies {
        let tier = match state.turn {
            PieceColor::White => white,
            PieceColor::Black => black,
        };
        let outcome = provider.ai_move(&id, tier).await?;
        state = outcome.state;

        match &outcome.mv {
            Some(mv) => {
                let promo = mv
                    .promotion
                    .map(|p| format!("={}", p.to_char_upper()))
                    .unwrap_or_default();
                println!(
                    "{ply:>3}. {}{}{promo}  ({} ms, {})",
                    mv.from, mv.to, outcome.elapsed_ms, tier
                );
            }
            None => break,
        }
        if state.game_over {
            break;
        }
    }

    println!("# result: {}  fen: {}", state.result, state.fen);
    Ok(())
}

async fn play(tier: Tier, ai_color: &str, backend: Option<BackendId>) -> anyhow::Result<()> {
    let ai_color = PieceColor::from_str_loose(ai_color)
        .with_context(|| format!("invalid --ai-color: {ai_color}"))?;
    let selector = selector_for(backend)?;

    let mut session = GameSession::new(
        selector,
        Some(AiOpponent {
            color: ai_color,
            tier,
        }),
    )
    .await?;

    println!(
        "# playing {} on {}. moves like \"e2e4\" or \"e7e8q\"; commands: undo, hint, new, quit",
        tier,
        session.selector().active().display_name()
    );

    let stdin = std::io::stdin();
    loop {
        if session.snapshot().game_over {
            println!("# game over: {}", session.snapshot().result);
            break;
        }

        if session.is_ai_turn() {
            if let Some(snapshot) = session.take_ai_turn().await? {
                let last = snapshot.history.last();
                match last {
                    Some(mv) => println!("# engine plays {}{}", mv.from, mv.to),
                    None => println!("# engine moved"),
                }
            }
            continue;
        }

        print!("{}> ", session.snapshot().fen);
        std::io::stdout().flush()?;
        let Some(line) = stdin.lock().lines().next() else {
            break;
        };
        let input = line?.trim().to_lowercase();

        match input.as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "new" => {
                session.new_game(None).await?;
                println!("# new game");
            }
            "undo" => match session.undo().await {
                Ok(_) => println!("# undone"),
                Err(e) => println!("# cannot undo: {e}"),
            },
            "hint" => match session.hint().await? {
                Some(mv) => println!("# try {}{}", mv.from, mv.to),
                None => println!("# no move available"),
            },
            mv if (4..=5).contains(&mv.len()) => {
                let (from, rest) = mv.split_at(2);
                let (to, promo) = rest.split_at(2);
                let promotion = promo.chars().next();
                if let Err(e) = session.play_move(from, to, promotion).await {
                    println!("# rejected: {e}");
                }
            }
            other => println!("# unrecognized input: {other}"),
        }
    }

    Ok(())
}
