//! First-install detection.
//!
//! A `.installed` marker file in the data directory records that the
//! first-install event has already fired. The event fires once per
//! installation, not per channel: an absent marker at startup counts as the
//! install, after which the marker is written.

use std::path::Path;

const MARKER: &str = ".installed";

/// Whether this data directory has seen a first run yet.
pub async fn is_first_run(data_dir: &Path) -> bool {
    !tokio::fs::try_exists(data_dir.join(MARKER))
        .await
        .unwrap_or(false)
}

/// Record that the install event has been handled.
pub async fn record_install(data_dir: &Path) -> std::io::Result<()> {
    tokio::fs::write(data_dir.join(MARKER), b"").await
}
