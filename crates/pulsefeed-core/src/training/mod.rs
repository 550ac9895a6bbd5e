//! Training flow: the per-user onboarding state machine that gates feed
//! access.

pub mod flow;

pub use flow::{TrainingFlow, TrainingInput, normalize_channel};
