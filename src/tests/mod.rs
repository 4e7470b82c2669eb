mod test_guard;
mod test_sweep;

/// Capture crate logs in test output; safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shared sweep fixture parameters. eps runs baseline-first so the first
/// adjacent pair compares "no noise" against "mild noise".
pub const SWEEP_SEED: u64 = 42;
pub const SWEEP_EPS: [f64; 4] = [0.0, 8.0, 2.0, 0.5];
pub const SEARCH_K: usize = 5;
