use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Installs a stderr subscriber. `0` stays silent, `1` shows per-page
/// progress, `2` and above also logs every replaced line.
pub fn init(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => return Ok(()),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}
