use crate::ui::progress_message::ProgressMessage;
use crate::ui::{theme, Icons};
use crate::FileStatus;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Per-file progress bar fed by a channel, so workers never touch the
/// terminal directly
pub struct ProgressManager {
    bar: ProgressBar,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressManager {
    pub fn new(total_files: usize) -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let bar = if console::Term::stderr().is_term() && !crate::output::is_quiet() {
            let bar = ProgressBar::new(total_files as u64).with_message("Processing files");
            if let Ok(style) =
                ProgressStyle::with_template("{spinner} {bar:30} {pos}/{len} {wide_msg}")
            {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let bar_clone = bar.clone();
        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ProgressMessage::Started { total } => {
                        bar_clone.set_length(total as u64);
                        bar_clone.enable_steady_tick(Duration::from_millis(100));
                    }
                    ProgressMessage::FileDone { path, status } => {
                        bar_clone.inc(1);
                        let verb = match status {
                            FileStatus::Changed => "Declared in",
                            FileStatus::Unchanged => "Checked",
                            FileStatus::Failed => "Failed",
                        };
                        bar_clone.set_message(format!("{}: {}", verb, path.display()));
                    }
                    ProgressMessage::Finished => {
                        bar_clone.finish_and_clear();
                        break;
                    }
                }
            }
        });

        (
            Self {
                bar,
                handle: Some(handle),
            },
            tx,
        )
    }

    /// Wait for the reporter thread to drain its channel
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }

    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }

    pub fn finish_with_summary(&mut self, duration: Duration, files: usize, changed: usize, declared: usize) {
        self.join();
        self.clear();
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success)
        );
        println!(
            "  {} {}  {} {}  {} {}",
            Icons::FILE.style(theme().info),
            files,
            Icons::MOD.style(theme().info),
            changed,
            Icons::WRENCH.style(theme().info),
            declared
        );
    }
}
