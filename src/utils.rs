use indicatif::{ProgressBar, ProgressStyle};

pub fn progress_bar(len: u64, message: &'static str) -> ProgressBar {
    ProgressBar::new(len)
        .with_style(
            ProgressStyle::with_template("{msg} [{elapsed_precise}] {human_pos}/{human_len} ({per_sec})")
                .expect("hardcoded"),
        )
        .with_message(message)
}
