mod clock;
mod orchestrator;
mod retention;

pub use clock::{Clock, FixedClock, SystemClock};
pub use orchestrator::{SeedOutcome, SentenceRepository};
pub use retention::RetentionPolicy;
