//! Ledger persistence port.

use crate::domain::error::LionError;
use crate::domain::ledger::PositionLedger;

pub trait LedgerPort {
    /// Load every persisted position. A ledger that does not exist yet loads
    /// as empty; a malformed one is an error.
    fn load(&self) -> Result<PositionLedger, LionError>;

    /// Replace the persisted ledger with `ledger`.
    fn save(&self, ledger: &PositionLedger) -> Result<(), LionError>;
}
