// Request listing: filter state, fetching, the list pipeline, detail and
// dashboard aggregation.

pub mod detail;
pub mod fetcher;
pub mod filter;
pub mod handlers;
pub mod pipeline;
pub mod summary;
