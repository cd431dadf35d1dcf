use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use replay_chess::config::Config;
use replay_chess::models::{Game, perft};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(version, about = "Legal move generation over a replayable game tree")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true, default_value = "replay-chess.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Count move paths to a given depth
    Perft {
        #[command(flatten)]
        start: Start,
        #[arg(short, long)]
        depth: u32,
        /// Print the count for every first move
        #[arg(long)]
        divide: bool,
    },
    /// List the legal moves of a position
    Moves {
        #[command(flatten)]
        start: Start,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

#[derive(Debug, ClapArgs)]
#[group(multiple = false)]
struct Start {
    /// Position as FEN
    #[arg(long)]
    fen: Option<String>,
    /// Position as piece tokens, side that moved last first
    #[arg(long)]
    pieces: Option<String>,
}

impl Start {
    fn game(&self) -> Result<Game> {
        let game = match (&self.fen, &self.pieces) {
            (Some(fen), _) => Game::from_fen(fen).with_context(|| format!("bad FEN {fen:?}"))?,
            (None, Some(pieces)) => {
                Game::from_notation(pieces).with_context(|| format!("bad pieces {pieces:?}"))?
            }
            (None, None) => Game::start()?,
        };
        Ok(game)
    }
}

fn main() -> Result<()> {
    install_tracing();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    match args.command {
        Command::Perft {
            start,
            depth,
            divide,
        } => {
            let mut game = start.game()?.with_replay_config(&config.replay);
            if divide || config.perft.divide {
                let divided = perft::divide(&mut game, depth, &config.perft)?;
                let mut total = perft::PerftStats::default();
                for (mv, stats) in divided {
                    println!("{mv}: {}", stats.nodes);
                    total += stats;
                }
                println!();
                println!("{total}");
            } else {
                let stats = perft::perft(&mut game, depth, &config.perft)?;
                println!("{stats}");
            }
        }
        Command::Moves { start } => {
            let game = start.game()?;
            println!("{}", game.position());
            info!(turn = %game.turn(), moves = game.moves().len(), "generated");
            for mv in game.moves() {
                println!("{mv}");
            }
            if game.is_checkmate() {
                println!("checkmate");
            } else if game.is_stalemate() {
                println!("stalemate");
            } else if game.in_check() {
                println!("check");
            }
        }
        Command::Schema => println!("{}", Config::schema()?),
    }

    Ok(())
}

fn install_tracing() {
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter_layer);

    tracing_subscriber::registry().with(fmt_layer).init();
}
