//! Library-size normalization

mod counts;
mod tmm;

pub use counts::{average_log_cpm, normalized_cpm};
pub use tmm::{tmm_factors, NormFactors, TmmParams};
