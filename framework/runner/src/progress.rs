use indicatif::{ProgressBar, ProgressStyle};

/// A progress bar over sampling rounds, or a hidden one when progress is not shown.
///
/// Hiding the bar is recommended for CI where nobody is watching and it only adds noise to logs.
pub(crate) fn sampling_progress(rounds: u32, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(u64::from(rounds));
    match ProgressStyle::with_template(
        "{spinner:.green} [{wide_bar:.cyan/blue}] round {pos}/{len} [{elapsed_precise}]",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::warn!("Failed to set progress style: {e}"),
    }

    pb
}
