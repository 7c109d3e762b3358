//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::csv_journal::CsvJournal;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::board::FILES;
use crate::domain::config::ConfigSummary;
use crate::domain::config_validation::{SessionConfig, load_session_config};
use crate::domain::engine::{BoardState, Engine};
use crate::domain::error::EngineError;
use crate::domain::replay::{ReplaySummary, run_replay};
use crate::domain::suggestion::Suggestion;
use crate::ports::journal_port::JournalPort;

#[derive(Parser, Debug)]
#[command(
    name = "chesstrader",
    about = "Chess-board portfolio scoring and rules engine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a configuration and print the capital plan
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the board for one day
    Board {
        #[arg(short, long)]
        config: PathBuf,
        /// Day index into the loaded series (default: last day)
        #[arg(long, conflicts_with = "date")]
        day: Option<usize>,
        /// First loaded day on or after this date
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Replay the loaded history, acting on the ranked suggestions
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        /// Trade journal CSV (overrides [replay] journal)
        #[arg(short, long)]
        journal: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Validate { config } => run_validate(&config),
        Command::Board { config, day, date } => run_board(&config, day, date),
        Command::Replay { config, journal } => run_replay_command(&config, journal.as_deref()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_session(path: &Path) -> Result<SessionConfig, EngineError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    load_session_config(&adapter)
}

/// Initializes the engine and loads the configured price files.
pub fn prepare_engine(session: &SessionConfig) -> Result<Engine, EngineError> {
    let mut engine = Engine::initialize(session.engine.clone())?;
    let mut source = CsvPriceAdapter::new(session.data.path.clone());
    if let Some(name) = &session.data.volatility_index {
        source = source.with_volatility_index(name.clone());
    }
    let days = engine.load_market_data(&source, session.data.start_date, session.data.end_date)?;
    eprintln!(
        "Loaded {} trading days for {} tickers",
        days,
        session.engine.tickers.len()
    );
    Ok(engine)
}

pub fn run_validate(config_path: &Path) -> Result<(), EngineError> {
    eprintln!("Loading config from {}", config_path.display());
    let session = load_session(config_path)?;
    let engine = Engine::initialize(session.engine.clone())?;
    print!("{}", render_summary(&engine.summary()));
    println!(
        "Data: {} ({} to {})",
        session.data.path.display(),
        session.data.start_date,
        session.data.end_date
    );
    eprintln!("Configuration is valid");
    Ok(())
}

pub fn run_board(
    config_path: &Path,
    day: Option<usize>,
    date: Option<NaiveDate>,
) -> Result<(), EngineError> {
    let session = load_session(config_path)?;
    let mut engine = prepare_engine(&session)?;

    let target = match (day, date) {
        (Some(d), _) => d,
        (None, Some(d)) => engine.day_for_date(d)?,
        (None, None) => engine.day_count().saturating_sub(1),
    };
    while engine.current_day() < target {
        engine.advance_day()?;
    }
    let state = engine.board_state(target)?;

    print!("{}", render_tiles(&state));
    println!();
    print!("{}", render_board(&state));
    println!();
    let suggestions = if engine.current_day() == target {
        engine.suggestions()
    } else {
        Vec::new()
    };
    print!("{}", render_suggestions(&suggestions));
    Ok(())
}

pub fn run_replay_command(config_path: &Path, journal: Option<&Path>) -> Result<(), EngineError> {
    let session = load_session(config_path)?;
    let mut engine = prepare_engine(&session)?;

    let journal_path = journal
        .map(Path::to_path_buf)
        .or_else(|| session.replay.journal.clone());
    let mut writer = match &journal_path {
        Some(path) => Some(CsvJournal::create(path)?),
        None => None,
    };

    let summary = run_replay(
        &mut engine,
        &session.replay.options,
        writer.as_mut().map(|w| w as &mut dyn JournalPort),
    )?;
    print!("{}", render_replay(&summary));
    if let (Some(path), Some(w)) = (&journal_path, &writer) {
        eprintln!("{} journal rows written to {}", w.rows(), path.display());
    }
    Ok(())
}

pub fn render_summary(summary: &ConfigSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Tickers:          {}\n", summary.tickers.join(", ")));
    out.push_str(&format!("Total capital:    {:.2}\n", summary.total_capital));
    out.push_str(&format!(
        "Momentum capital: {:.2} ({:.0}%)\n",
        summary.momentum_capital,
        summary.risk_allocation * 100.0
    ));
    out.push_str(&format!("Reserve cash:     {:.2}\n", summary.reserve_cash));
    out.push_str(&format!(
        "MA period:        {}   max positions: {}   reclaim window: {} days\n",
        summary.ma_period, summary.max_positions, summary.reclaim_window
    ));
    out.push('\n');
    out.push_str(&format!(
        "{:<8} {:>5} {:>8} {:>12} {:>12}\n",
        "Piece", "Count", "Assigned", "Unit value", "Total value"
    ));
    for row in &summary.inventory {
        out.push_str(&format!(
            "{:<8} {:>5} {:>8} {:>12.2} {:>12.2}\n",
            row.kind.name(),
            row.count,
            row.assigned,
            row.unit_value,
            row.total_value
        ));
    }
    out
}

pub fn render_tiles(state: &BoardState) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Day {} ({})  phase {}  volatility index {}\n",
        state.day,
        state.date,
        state.phase,
        state
            .volatility_index
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!(
        "{:<8} {:>10} {:>10} {:>6} {:>6} {:<6} {:<12}\n",
        "Ticker", "Price", "MA", "Score", "Square", "File", "Zone"
    ));
    for tile in &state.tiles {
        match tile.signal {
            Some(signal) => {
                out.push_str(&format!(
                    "{:<8} {:>10.2} {:>10.2} {:>6.3} {:>6} {:<6} {:<12}\n",
                    tile.ticker,
                    tile.price.unwrap_or_default(),
                    signal.moving_average,
                    signal.components.score,
                    signal.coordinate.to_string(),
                    if signal.coordinate.file.is_center() { "center" } else { "flank" },
                    signal.coordinate.zone.to_string()
                ));
            }
            None => {
                out.push_str(&format!("{:<8} {:>10} (score undefined)\n", tile.ticker, "-"));
            }
        }
    }
    if !state.positions.is_empty() {
        out.push('\n');
        out.push_str(&format!(
            "{:<8} {:<7} {:>7} {:>10} {:>8} {:<32}\n",
            "Position", "Piece", "Shares", "Entry", "Gain %", "State"
        ));
        for view in &state.positions {
            let p = &view.position;
            out.push_str(&format!(
                "{:<8} {:<7} {:>7} {:>10.2} {:>8} {:<32}\n",
                p.ticker,
                p.kind.name(),
                p.shares,
                p.entry_price,
                view.gain_pct
                    .map(|g| format!("{g:.2}"))
                    .unwrap_or_else(|| "-".to_string()),
                if view.retreat_required {
                    format!("{} RETREAT REQUIRED", p.state)
                } else {
                    p.state.to_string()
                }
            ));
        }
    }
    out.push_str(&format!(
        "Reserve cash {:.2}, available momentum capital {:.2}\n",
        state.reserve_cash, state.available_capital
    ));
    out
}

/// 8x8 board, rank 8 at the top. A square shows its ticker (cut to five
/// characters) followed by `+` for favorable or `-` for unfavorable; a square
/// holding several tickers shows how many.
pub fn render_board(state: &BoardState) -> String {
    let mut grid: [[Vec<String>; 8]; 8] = Default::default();
    for tile in &state.tiles {
        if let Some(signal) = tile.signal {
            let c = signal.coordinate;
            let mark = if c.zone.is_favorable() { '+' } else { '-' };
            let label: String = tile.ticker.chars().take(5).collect();
            grid[(c.rank - 1) as usize][c.file.index()].push(format!("{label}{mark}"));
        }
    }

    let mut out = String::new();
    let separator = format!("  +{}", "-------+".repeat(8));
    out.push_str(&format!("{separator}\n"));
    for rank in (1..=8u8).rev() {
        out.push_str(&format!("{rank} |"));
        for cell in &grid[(rank - 1) as usize] {
            let text = match cell.len() {
                0 => String::new(),
                1 => cell[0].clone(),
                n => format!("x{n}"),
            };
            out.push_str(&format!(" {text:<6}|"));
        }
        out.push('\n');
        out.push_str(&format!("{separator}\n"));
    }
    out.push_str("   ");
    for file in FILES {
        out.push_str(&format!("   {file}    "));
    }
    out.push('\n');
    out
}

pub fn render_suggestions(suggestions: &[Suggestion]) -> String {
    if suggestions.is_empty() {
        return "No suggestions\n".to_string();
    }
    let mut out = String::new();
    for (i, s) in suggestions.iter().enumerate() {
        out.push_str(&format!("{}. [{:>6.2}] {}\n", i + 1, s.priority, s.reason));
    }
    out
}

pub fn render_replay(summary: &ReplaySummary) -> String {
    let mut out = String::new();
    let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
    out.push_str(&format!(
        "Replayed {} days ({} to {})\n",
        summary.days_replayed,
        date(summary.start_date),
        date(summary.end_date)
    ));
    out.push_str(&format!(
        "Opened:        {} ({} tactical)\n",
        summary.opened, summary.tactical_opened
    ));
    out.push_str(&format!("Advanced:      {}\n", summary.advanced));
    out.push_str(&format!("Reclaimed:     {}\n", summary.reclaimed));
    out.push_str(&format!(
        "Closed:        {} (retreat {}, timeout {}, capture {})\n",
        summary.closes(),
        summary.retreats,
        summary.timeouts,
        summary.captures
    ));
    out.push_str(&format!("Rejected:      {}\n", summary.rejected));
    out.push_str(&format!("Realized P&L:  {:.2}\n", summary.realized_pnl));
    out.push_str(&format!(
        "Unrealized:    {:.2} across {} open positions\n",
        summary.unrealized_pnl,
        summary.open_positions.len()
    ));
    for view in &summary.open_positions {
        out.push_str(&format!(
            "  {:<8} {:<7} {:>6} shares @ {:.2}\n",
            view.position.ticker,
            view.position.kind.name(),
            view.position.shares,
            view.position.entry_price
        ));
    }
    out
}
