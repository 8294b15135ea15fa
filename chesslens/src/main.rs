//! chesslens - query a UCI engine from the command line.
//!
//! Each invocation spawns the engine, runs one request and shuts it down.
//! The engine path comes from `--engine`, then `CHESSLENS_ENGINE_PATH`, then
//! the usual install locations (see [`engine::config`]).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use engine::{parse_uci_move, EngineConfig, StockfishEngine, START_FEN};

mod report;

use report::AnalysisReport;

#[derive(Parser)]
#[command(name = "chesslens", about = "Chess position analysis backed by a UCI engine")]
struct Cli {
    /// Path to the engine executable (overrides `CHESSLENS_ENGINE_PATH`).
    #[arg(long, global = true)]
    engine: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the engine's ranked candidate lines for a position.
    Analyze {
        #[arg(long, default_value = START_FEN)]
        fen: String,

        /// Search time in milliseconds.
        #[arg(long)]
        movetime: Option<u64>,

        /// Number of ranked lines (1-5).
        #[arg(long)]
        multipv: Option<u8>,

        /// Engine strength (0-20).
        #[arg(long)]
        skill: Option<u8>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show what the side not to move would play if it were its turn.
    Threat {
        #[arg(long)]
        fen: String,

        #[arg(long)]
        movetime: Option<u64>,
    },
    /// Show the top-line evaluation from White's point of view.
    Eval {
        #[arg(long, default_value = START_FEN)]
        fen: String,

        #[arg(long)]
        movetime: Option<u64>,
    },
    /// Classify each move of a game by the evaluation it gave away.
    Review {
        #[arg(long, default_value = START_FEN)]
        fen: String,

        /// Moves in UCI notation, e.g. `e2e4 e7e5 g1f3`.
        #[arg(long, num_args = 1.., required = true)]
        moves: Vec<String>,

        /// Search time per position in milliseconds.
        #[arg(long)]
        movetime: Option<u64>,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = EngineConfig::from_env();
    if let Some(path) = cli.engine {
        config = config.with_path(path);
    }
    tracing::debug!("Using engine at {}", config.path.display());

    match cli.command {
        Commands::Analyze {
            fen,
            movetime,
            multipv,
            skill,
            json,
        } => {
            let side = report::side_to_move(&fen)?;
            if let Some(count) = multipv {
                config = config.with_multi_pv(count);
            }
            if let Some(level) = skill {
                config = config.with_skill_level(level);
            }
            let movetime = movetime.unwrap_or(config.movetime_ms);

            let engine = StockfishEngine::start(config).await;
            engine.set_position_from_fen(&fen).await;
            let result = engine.get_analysis(movetime).await;
            engine.quit_engine().await;

            let report = AnalysisReport::new(&result, side);
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.to_text());
            }
        }
        Commands::Threat { fen, movetime } => {
            report::side_to_move(&fen)?;
            let movetime = movetime.unwrap_or(config.threat_movetime_ms);

            let engine = StockfishEngine::start(config).await;
            let threat = engine.get_threat(&fen, movetime).await;
            engine.quit_engine().await;

            print!("{}", report::threat_text(threat));
        }
        Commands::Eval { fen, movetime } => {
            let side = report::side_to_move(&fen)?;
            let movetime = movetime.unwrap_or(config.movetime_ms);

            let engine = StockfishEngine::start(config).await;
            engine.set_position_from_fen(&fen).await;
            let evaluation = engine.get_evaluation(movetime).await;
            engine.quit_engine().await;

            print!("{}", report::evaluation_text(&evaluation, side));
        }
        Commands::Review {
            fen,
            moves,
            movetime,
        } => {
            report::side_to_move(&fen)?;
            let moves = moves
                .iter()
                .map(|token| parse_uci_move(token))
                .collect::<Result<Vec<_>, _>>()?;
            let movetime = movetime.unwrap_or(config.movetime_ms);

            let engine = StockfishEngine::start(config).await;
            let reviews = engine.review_game(&fen, &moves, movetime).await;
            engine.quit_engine().await;

            print!("{}", report::review_text(&reviews?));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli).await
}
