mod executor;

pub use executor::{QueryExecutor, QueryOutcome};
