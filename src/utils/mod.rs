//! Helpers used by more than one tool.
//!
//! - The global rayon thread pool, sized by `ECOHELPER_NUM_THREADS`.
//! - Rounding and numeric helpers for normalised tables.
//! - Statistical functions for enrichment analysis (see [`stats`]).

use once_cell::sync::Lazy;
use rayon::{
    ThreadPool,
    ThreadPoolBuilder,
};

mod stats;
pub use stats::*;

use crate::settings::NUM_THREADS_ENV;

pub static THREAD_POOL: Lazy<ThreadPool> = Lazy::new(|| {
    let num_threads: Option<usize> = std::env::var(NUM_THREADS_ENV)
        .ok()
        .and_then(|str| str.parse::<usize>().ok());
    ThreadPoolBuilder::new()
        .num_threads(num_threads.unwrap_or(0))
        .build()
        .expect("Failed to create thread pool")
});

pub fn n_threads() -> usize {
    THREAD_POOL.current_num_threads()
}

/// Rounds half away from zero to `digits` decimal places.
pub fn round_to(
    value: f64,
    digits: u32,
) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Formats a float without trailing zeros, so `3.0` is written as `3`.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    }
    else {
        format!("{}", value)
    }
}
