//! Message publishing

pub mod router;

pub use router::{PublishOutcome, PublishReport, Publisher};
