//! Balance ledger: the only writer of wallet and bank balances.

mod ledger;
mod locks;

pub use ledger::BalanceLedger;
pub use locks::KeyedLocks;
