pub mod driver;
pub mod markup;
pub mod reconcile;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod timeparse;
pub mod traits;
pub mod translator;

pub use driver::{IngestStats, IngestionDriver};
pub use reconcile::{Outcome, ReconciliationEngine};
pub use traits::EventSource;
pub use translator::translate;
