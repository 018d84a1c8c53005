//! Progress callbacks and their terminal renderers.

use indicatif::{ProgressBar, ProgressStyle};

/// Receives `(bytes_received, total_bytes)` after every downloaded chunk.
///
/// `total_bytes` is `None` when the server did not send a content length.
pub trait DownloadReporter: Send + Sync {
    fn on_chunk(&self, received: u64, total: Option<u64>);
}

impl<F> DownloadReporter for F
where
    F: Fn(u64, Option<u64>) + Send + Sync,
{
    fn on_chunk(&self, received: u64, total: Option<u64>) {
        self(received, total)
    }
}

/// Receives `(percentage, throughput)` after every archive entry.
pub trait ExtractReporter: Send + Sync {
    fn on_progress(&self, percentage: f64, throughput: &str);
}

impl<F> ExtractReporter for F
where
    F: Fn(f64, &str) + Send + Sync,
{
    fn on_progress(&self, percentage: f64, throughput: &str) {
        self(percentage, throughput)
    }
}

/// Download percentage, clamped to `[0, 100]`.
///
/// Servers occasionally under-report the content length, which would otherwise
/// push the figure past 100.
pub fn download_percentage(received: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(0) | None => None,
        Some(total) => Some((received as f64 / total as f64 * 100.0).clamp(0.0, 100.0)),
    }
}

fn new_bar(len: u64) -> ProgressBar {
    if atty::is(atty::Stream::Stderr) {
        ProgressBar::new(len)
    } else {
        ProgressBar::hidden()
    }
}

/// Byte-count progress bar for a single download.
#[derive(Clone)]
pub struct DownloadBar {
    bar: ProgressBar,
}

impl DownloadBar {
    pub fn new(name: &str) -> Self {
        let bar = new_bar(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg} | {elapsed_precise} elapsed")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░ "),
        );
        bar.set_message(format!("⬇️  {}", name));
        Self { bar }
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }

    pub fn abandon(&self, message: impl Into<String>) {
        self.bar.abandon_with_message(message.into());
    }
}

impl DownloadReporter for DownloadBar {
    fn on_chunk(&self, received: u64, total: Option<u64>) {
        match (total, download_percentage(received, total)) {
            (Some(total), Some(percentage)) => {
                if self.bar.length() != Some(total) {
                    self.bar.set_length(total);
                }
                let position = (percentage / 100.0 * total as f64).round() as u64;
                self.bar.set_position(position.min(total));
            }
            _ => self.bar.set_position(received),
        }
    }
}

/// Percentage bar for archive extraction; the message shows throughput.
#[derive(Clone)]
pub struct ExtractBar {
    bar: ProgressBar,
}

impl ExtractBar {
    pub fn new(name: &str) -> Self {
        let bar = new_bar(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}% {prefix} ({msg}) | {elapsed_precise} elapsed")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓▒░ "),
        );
        bar.set_prefix(format!("📂 {}", name));
        Self { bar }
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}

impl ExtractReporter for ExtractBar {
    fn on_progress(&self, percentage: f64, throughput: &str) {
        self.bar.set_position(percentage.clamp(0.0, 100.0).round() as u64);
        self.bar.set_message(throughput.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_clamped() {
        assert_eq!(download_percentage(50, Some(100)), Some(50.0));
        assert_eq!(download_percentage(150, Some(100)), Some(100.0));
        assert_eq!(download_percentage(10, None), None);
        assert_eq!(download_percentage(10, Some(0)), None);
    }

    #[test]
    fn closures_are_reporters() {
        let seen = std::sync::Mutex::new(Vec::new());
        let reporter = |received: u64, total: Option<u64>| {
            seen.lock().unwrap().push((received, total));
        };
        reporter.on_chunk(4, Some(8));
        reporter.on_chunk(8, Some(8));
        assert_eq!(*seen.lock().unwrap(), vec![(4, Some(8)), (8, Some(8))]);
    }

    #[test]
    fn download_bar_stays_within_reported_length() {
        let bar = DownloadBar::new("short.bin");
        bar.on_chunk(40, Some(100));
        assert_eq!(bar.bar.length(), Some(100));
        assert_eq!(bar.bar.position(), 40);

        bar.on_chunk(150, Some(100));
        assert_eq!(bar.bar.length(), Some(100));
        assert_eq!(bar.bar.position(), 100);

        bar.on_chunk(7, None);
        assert_eq!(bar.bar.position(), 7);
    }
}
