//! Print the generated typed mailbox unit to stdout.
//!
//! Logs go to stderr so the output can be redirected to a file as is.

use std::io::Write;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let unit = postbox_codegen::emit(postbox_codegen::MAX_ARITY);
    tracing::info!(
        max_arity = postbox_codegen::MAX_ARITY,
        bytes = unit.len(),
        "writing typed mailbox unit"
    );

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(unit.as_bytes())?;
    stdout.flush()
}
