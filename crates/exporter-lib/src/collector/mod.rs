//! Collection pipeline
//!
//! A cycle connects to Hawkular, resolves the Kubernetes inventory into tag
//! filters, and fetches the latest sample of every tracked metric. The ten
//! fetches run concurrently; a failed fetch only empties its own metric.

mod cycle;
mod fetch;

#[cfg(test)]
mod tests;

pub use cycle::{Collector, CollectorSettings, CycleOutcome};
pub use fetch::{
    fetch_metric, volume_from_identifier, FetchWindow, FRESHNESS_WINDOW, SAMPLE_LIMIT,
};
