//! Trade journal port trait.

use crate::domain::error::EngineError;
use crate::domain::event::LedgerEvent;

/// Subscriber for ledger open/close/advance events.
pub trait JournalPort {
    fn record(&mut self, event: &LedgerEvent) -> Result<(), EngineError>;

    fn record_all(&mut self, events: &[LedgerEvent]) -> Result<(), EngineError> {
        for event in events {
            self.record(event)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}
