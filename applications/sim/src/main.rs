/// Reel Simulator - replay scroll scripts against the feed coordinator
use clap::{Parser, Subcommand, ValueEnum};
use reel_core::{ActiveCard, CardId};
use reel_playback::TriggerMode;
use reel_sim::{
    config::{self, Overrides},
    player::{PlayerLog, SimulatedFactory},
    scenario::{self, FeedLayout, ScrollScript},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "reel-sim")]
#[command(about = "Simulate visibility-driven playback in a video feed", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./reel.toml if present)
    #[arg(short, long, global = true, env = "REEL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scroll script through a live feed session
    Run {
        /// Number of cards in the feed
        #[arg(long, default_value_t = 5)]
        cards: u64,

        /// Height of every card
        #[arg(long, default_value_t = 500.0)]
        card_height: f64,

        /// Space between cards
        #[arg(long, default_value_t = 100.0)]
        gap: f64,

        /// Viewport height
        #[arg(long)]
        viewport: Option<f64>,

        /// Comma-separated scroll offsets
        #[arg(long, default_value = "0,650,1300,1900,2500")]
        scroll: String,

        /// Time spent at each offset, in milliseconds
        #[arg(long, default_value_t = 500)]
        step_ms: u64,

        /// What starts a decision cycle
        #[arg(long, value_enum)]
        trigger: Option<TriggerArg>,

        /// Start every player muted
        #[arg(long)]
        muted: bool,

        /// Make this card's player reject play
        #[arg(long)]
        fail_card: Option<u64>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Evaluate the activation policy once
    Decide {
        /// Visible fractions, e.g. 0=0.8,1=0.4
        #[arg(long)]
        fractions: String,

        /// Currently active card
        #[arg(long)]
        current: Option<u64>,

        /// Override the activation threshold
        #[arg(long)]
        min_fraction: Option<f64>,

        /// Override the hysteresis margin
        #[arg(long)]
        margin: Option<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TriggerArg {
    Polling,
    Viewability,
}

impl From<TriggerArg> for TriggerMode {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::Polling => TriggerMode::Polling,
            TriggerArg::Viewability => TriggerMode::Viewability,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reel_sim=info,reel_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let base = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            cards,
            card_height,
            gap,
            viewport,
            scroll,
            step_ms,
            trigger,
            muted,
            fail_card,
            json,
        } => {
            let overrides = Overrides {
                viewport_height: viewport,
                muted: muted.then_some(true),
                trigger: trigger.map(Into::into),
                ..Default::default()
            };
            let feed_config = overrides.apply(base)?;

            let layout = FeedLayout {
                cards,
                card_height,
                gap,
            };
            let script = ScrollScript {
                offsets: scenario::parse_offsets(&scroll)?,
                step: Duration::from_millis(step_ms),
            };

            let log = PlayerLog::new();
            let mut factory = SimulatedFactory::new(log.clone());
            if let Some(card) = fail_card {
                factory = factory.failing(CardId::new(card));
            }

            let report = scenario::run(feed_config, &layout, &script, factory, &log).await?;

            if json {
                for event in &report.events {
                    println!("{}", serde_json::to_string(event)?);
                }
            } else {
                println!("Active card changes:");
                for transition in &report.transitions {
                    println!(
                        "  {:>6} ms  {} -> {}",
                        transition.at_ms, transition.previous, transition.current
                    );
                }

                println!("\nPlayers:");
                for (card, stats) in &report.players {
                    println!(
                        "  {}: {} plays, {} pauses, {} rejected, released: {}",
                        card, stats.plays, stats.pauses, stats.rejected_plays, stats.released
                    );
                }
            }

            let summary = report.summary;
            println!(
                "\n{} cycles ({} coalesced), {} command failures, {} players released",
                summary.cycles,
                summary.coalesced_triggers,
                summary.command_failures,
                summary.released
            );
        }
        Commands::Decide {
            fractions,
            current,
            min_fraction,
            margin,
        } => {
            let overrides = Overrides {
                min_fraction,
                hysteresis_margin: margin,
                ..Default::default()
            };
            let policy = overrides.apply(base)?.policy();

            let fractions = scenario::parse_fractions(&fractions)?;
            let current = ActiveCard::from(current.map(CardId::new));
            let decided = policy.decide(&fractions, current);

            println!(
                "min_fraction {}, margin {}, current {}",
                policy.min_fraction, policy.hysteresis_margin, current
            );
            println!("Active: {}", decided);
        }
    }

    Ok(())
}
