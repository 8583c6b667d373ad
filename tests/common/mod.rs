use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

// RUST_LOG=toolchest=trace shows lookups and forced access while testing
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
