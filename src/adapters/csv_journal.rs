//! CSV trade journal.
//!
//! One row per ledger event:
//! `ticker,action,piece,shares,price,day,date,reason,tactical,pnl`.

use crate::domain::error::EngineError;
use crate::domain::event::LedgerEvent;
use crate::ports::journal_port::JournalPort;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 10] = [
    "ticker", "action", "piece", "shares", "price", "day", "date", "reason", "tactical", "pnl",
];

pub struct CsvJournal<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl CsvJournal<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Self::from_writer(file)
    }
}

impl<W: Write> CsvJournal<W> {
    pub fn from_writer(inner: W) -> Result<Self, EngineError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(HEADER).map_err(journal_error)?;
        Ok(CsvJournal { writer, rows: 0 })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> Result<W, EngineError> {
        self.writer.into_inner().map_err(|e| EngineError::Data {
            reason: format!("journal flush failed: {}", e.error()),
        })
    }
}

fn journal_error(e: csv::Error) -> EngineError {
    EngineError::Data {
        reason: format!("journal write failed: {e}"),
    }
}

fn row(event: &LedgerEvent) -> [String; 10] {
    let ticker = event.ticker().to_string();
    let action = event.action().to_string();
    match event {
        LedgerEvent::Opened {
            kind,
            shares,
            price,
            day,
            date,
            tactical,
            ..
        } => [
            ticker,
            action,
            kind.to_string(),
            shares.to_string(),
            format!("{price:.4}"),
            day.to_string(),
            date.to_string(),
            String::new(),
            tactical.to_string(),
            String::new(),
        ],
        LedgerEvent::Closed(closed) => [
            ticker,
            action,
            closed.kind.to_string(),
            closed.shares.to_string(),
            format!("{:.4}", closed.exit_price),
            closed.exit_day.to_string(),
            closed.exit_date.to_string(),
            closed.reason.to_string(),
            closed.was_tactical.to_string(),
            format!("{:.2}", closed.pnl),
        ],
        LedgerEvent::Advanced {
            from,
            to,
            shares,
            price,
            day,
            date,
            ..
        } => [
            ticker,
            action,
            to.to_string(),
            shares.to_string(),
            format!("{price:.4}"),
            day.to_string(),
            date.to_string(),
            format!("{from} -> {to}"),
            "false".to_string(),
            String::new(),
        ],
        LedgerEvent::Reclaimed {
            kind,
            price,
            day,
            date,
            ..
        } => [
            ticker,
            action,
            kind.to_string(),
            String::new(),
            price.map(|p| format!("{p:.4}")).unwrap_or_default(),
            day.to_string(),
            date.to_string(),
            "favorable square reclaimed".to_string(),
            "true".to_string(),
            String::new(),
        ],
    }
}

impl<W: Write> JournalPort for CsvJournal<W> {
    fn record(&mut self, event: &LedgerEvent) -> Result<(), EngineError> {
        self.writer.write_record(row(event)).map_err(journal_error)?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EngineError> {
        self.writer.flush()?;
        Ok(())
    }
}
