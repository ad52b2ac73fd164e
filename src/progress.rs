//! Progress indicators for the vulnlab CLI.

use indicatif::{ProgressBar, ProgressStyle};

/// Bar shown while the stage plan is applied.
pub fn stage_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("  {bar:24.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}
