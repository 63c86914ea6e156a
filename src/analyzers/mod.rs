//! Normalization and aggregation of weekly case data.
//!
//! Primary documents in any of the published layouts are converted into
//! canonical weekly entries, aligned on a shared week index, folded into
//! per-country series with occupancy data merged in, and summarized as
//! `[max, last]` per series.

pub mod aggregate;
pub mod fields;
pub mod normalize;
pub mod pipeline;
pub mod summary;
pub mod types;
pub mod utility;
pub mod weeks;
