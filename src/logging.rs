//! Stderr logging for the CLI, keeping stdout for command output. Set `DEBUG_LOGGING=1` for debug output from
//! this crate; `RUST_LOG` overrides both.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub fn init(verbose: bool) {
    let debug_logging = verbose || std::env::var("DEBUG_LOGGING").is_ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug_logging {
            "warn,municipal_portal=debug"
        } else {
            "warn,municipal_portal=info"
        })
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    // A subscriber may already be installed (tests); that is not an error here.
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(filter)
        .try_init();

    tracing::debug!(debug_logging, "logging initialized");
}
