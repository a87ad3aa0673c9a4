// src/content/mod.rs
pub mod aggregator;
pub mod assets;
pub mod dates;
pub mod frontmatter;
pub mod images;
pub mod navigation;
pub mod providers;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use aggregator::Aggregator;
pub use types::{AggregatedEntry, Entry, Lookup, Source, SourceOutcome};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "content_entries_total",
            "Entries produced by each content source."
        );
        describe_counter!(
            "content_source_errors_total",
            "Content sources that failed and were substituted with an empty list."
        );
        describe_counter!(
            "content_records_rejected_total",
            "Markdown files excluded for unreadable or invalid front-matter."
        );
        describe_histogram!("content_parse_ms", "Source fetch+parse time in milliseconds.");
        describe_gauge!(
            "content_last_aggregation_ts",
            "Unix ts when the timeline was last aggregated."
        );
    });
}
