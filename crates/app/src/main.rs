use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use gix_rhythm_core::{
    Action, AppConfig, Chart, Clock, Difficulty, Feedback, FrameBuffer, HighScoreTable, ManualClock,
    RecordingTone, RhythmEngine, RoundOutcome, RoundSummary, ScriptedInput, Session, SessionChoice,
    SongLibrary, Timeline,
};
use tracing_subscriber::EnvFilter;

fn main() -> gix_rhythm_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Simulate {
            song,
            offset_ms,
            skip_every,
            tick_ms,
            levels,
            retries,
            save_as,
            scores,
        } => run_simulate(
            &config,
            &song,
            &Autoplay {
                offset: offset_ms / 1000.0,
                skip_every,
                tick: (tick_ms / 1000.0).max(0.001),
            },
            &Campaign { levels, retries },
            save_as.as_deref(),
            &scores,
        ),
        Commands::Timeline { song } => run_timeline(&config, &song),
        Commands::Scores { scores } => run_scores(&scores),
    }
}

struct Autoplay {
    offset: f64,
    skip_every: Option<usize>,
    tick: f64,
}

struct Campaign {
    levels: usize,
    retries: usize,
}

fn run_simulate(
    config: &AppConfig,
    song: &SongArgs,
    autoplay: &Autoplay,
    campaign: &Campaign,
    save_as: Option<&str>,
    scores: &Path,
) -> gix_rhythm_core::Result<()> {
    let library = song.library()?;
    let difficulty = Difficulty::from(song.difficulty);
    let last_level = song.level + campaign.levels.max(1) - 1;
    let mut session = Session::new(song.level, last_level)?;
    let mut retries_left = campaign.retries;

    loop {
        let chart = library.level(session.level())?;
        let summary = play_round(config, chart, difficulty, autoplay);
        println!("{}", serde_json::to_string_pretty(&summary)?);
        let won = summary.outcome == RoundOutcome::Won;
        session.record(summary);

        // The bot moves on after a win and retries a lost level while it can.
        let choice = if session.can_advance() {
            SessionChoice::NextLevel
        } else if !won && retries_left > 0 {
            retries_left -= 1;
            SessionChoice::Retry
        } else {
            SessionChoice::SaveAndQuit
        };
        tracing::info!(
            level = session.level(),
            total = session.running_total(),
            choice = choice.label(),
            "result menu"
        );
        match choice {
            SessionChoice::Retry => {
                session.retry();
            }
            SessionChoice::NextLevel => {
                session.next_level()?;
            }
            SessionChoice::SaveAndQuit => break,
        }
    }

    let total = session.finish();
    println!("{}", serde_json::json!({ "session_total": total }));

    if let Some(name) = save_as {
        let mut table = HighScoreTable::load_or_default(scores)?;
        match table.add_score(name, total) {
            Some(rank) => {
                table.save(scores)?;
                tracing::info!(rank = rank + 1, ?scores, "score saved");
            }
            None => tracing::info!(score = total, "score did not make the board"),
        }
    }
    Ok(())
}

fn play_round(config: &AppConfig, chart: &Chart, difficulty: Difficulty, autoplay: &Autoplay) -> RoundSummary {
    tracing::info!(title = %chart.title, difficulty = difficulty.label(), "simulating round");

    let clock = ManualClock::new();
    let mut engine = RhythmEngine::from_config(chart, difficulty, config, &clock);
    let mut input = ScriptedInput::new(&clock, autoplay.presses(engine.timeline()));
    let mut tone = RecordingTone::new();
    let mut strip = FrameBuffer::new(28);

    engine.start();
    while !engine.is_finished() {
        for event in engine.update(&mut input, &mut tone, &mut strip) {
            log_feedback(event, clock.now());
        }
        clock.advance(autoplay.tick);
    }

    tracing::info!(cues = tone.cues_started(), frames = strip.frames(), "simulation finished");
    engine.summary()
}

fn run_timeline(config: &AppConfig, song: &SongArgs) -> gix_rhythm_core::Result<()> {
    let chart = song.load_chart()?;
    let profile = config.difficulties.profile(song.difficulty.into());
    let timeline = Timeline::build(&chart, &profile);
    println!("{}", serde_json::to_string_pretty(&timeline)?);
    Ok(())
}

fn run_scores(scores: &Path) -> gix_rhythm_core::Result<()> {
    let table = HighScoreTable::load_or_default(scores)?;
    for (rank, entry) in table.get_high_scores().iter().enumerate() {
        println!("{}. {}  {}", rank + 1, entry.name, entry.score);
    }
    Ok(())
}

impl Autoplay {
    /// Presses for every judged node, shifted by `offset`. Chord members are
    /// spread over consecutive ticks since the engine takes one action per tick.
    fn presses(&self, timeline: &Timeline) -> Vec<(f64, Action)> {
        let mut presses = Vec::new();
        let judged = timeline
            .nodes()
            .iter()
            .filter(|node| !node.is_background())
            .enumerate();
        for (nth, node) in judged {
            if self.skip_every.is_some_and(|every| every > 0 && (nth + 1) % every == 0) {
                continue;
            }
            for (member, action) in node.required_moves.iter().enumerate() {
                let at = node.target_time + self.offset + member as f64 * self.tick;
                presses.push((at, *action));
            }
        }
        presses
    }
}

fn log_feedback(event: &Feedback, now: f64) {
    match event {
        Feedback::Hit {
            node,
            judgment,
            combo,
            points,
        } => tracing::info!(at = now, node, combo, points, "{}", judgment.label()),
        Feedback::ChordProgress { node, remaining } => {
            tracing::debug!(at = now, node, remaining, "chord progress")
        }
        Feedback::Miss { node } => tracing::info!(at = now, node, "MISS"),
        Feedback::Won => tracing::info!(at = now, "CLEARED!"),
        Feedback::Failed => tracing::info!(at = now, "GAME OVER"),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "GIX Rhythm judgment engine", long_about = None)]
struct Cli {
    /// JSON configuration overriding the built-in tunables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play levels against a simulated clock with an autoplay bot.
    Simulate {
        #[command(flatten)]
        song: SongArgs,
        /// Timing offset applied to every autoplay press, in milliseconds.
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        offset_ms: f64,
        /// Leave every Nth judged note unplayed.
        #[arg(long)]
        skip_every: Option<usize>,
        /// Main loop period, in milliseconds.
        #[arg(long, default_value_t = 10.0)]
        tick_ms: f64,
        /// Levels in the session, starting from `--level`.
        #[arg(long, default_value_t = 1)]
        levels: usize,
        /// Times a lost level is retried before saving and quitting.
        #[arg(long, default_value_t = 0)]
        retries: usize,
        /// Record the session total under these initials.
        #[arg(long)]
        save_as: Option<String>,
        /// High-score table location.
        #[arg(long, default_value = "scores.json")]
        scores: PathBuf,
    },
    /// Print the preprocessed timeline of a level as JSON.
    Timeline {
        #[command(flatten)]
        song: SongArgs,
    },
    /// Show the high-score table.
    Scores {
        #[arg(long, default_value = "scores.json")]
        scores: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct SongArgs {
    /// 1-based level in the built-in library.
    #[arg(short, long, default_value_t = 1)]
    level: usize,
    /// Load the chart from a JSON file instead of the library.
    #[arg(long)]
    chart: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = DifficultyArg::Easy)]
    difficulty: DifficultyArg,
}

impl SongArgs {
    /// The built-in songs, or just the `--chart` file when one is given.
    fn library(&self) -> gix_rhythm_core::Result<SongLibrary> {
        match &self.chart {
            Some(path) => {
                let mut library = SongLibrary::new();
                library.register_file(path)?;
                Ok(library)
            }
            None => Ok(SongLibrary::builtin()),
        }
    }

    fn load_chart(&self) -> gix_rhythm_core::Result<Chart> {
        self.library()?.level(self.level).cloned()
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DifficultyArg {
    Easy,
    Normal,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Normal => Difficulty::Normal,
            DifficultyArg::Hard => Difficulty::Hard,
        }
    }
}
