use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the global `env_logger` backend once.
///
/// `RUST_LOG` takes precedence when set; otherwise dependencies are limited
/// to `warn` and this crate to `info`. Subsequent calls are ignored, so test
/// binaries may call it freely.
pub fn init() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Warn);
            builder.filter_module("tiamat_gpu", log::LevelFilter::Info);
        }

        builder.init();
    });
}
