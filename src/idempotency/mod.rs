pub mod clock;
pub mod key;
pub mod ledger;
pub mod metrics;
pub mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{EventSource, IdempotencyKey, KEY_SEPARATOR};
pub use ledger::{
    EntryAge, IdempotencyEntry, IdempotencyLedger, LedgerClaim, LedgerStats,
    DEFAULT_RETENTION_HOURS,
};
pub use metrics::{IdempotencyMetrics, MetricsSnapshot};
pub use sweep::IdempotencySweepJob;
