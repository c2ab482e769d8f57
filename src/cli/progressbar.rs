use indicatif::{ProgressBar, ProgressStyle};

// "█▉▊▋▌▍▎▏  ·"
const PROGRESS_CHARS: &str =
    "\u{2588}\u{2589}\u{258a}\u{258b}\u{258c}\u{258d}\u{258e}\u{258f}  \u{b7}";

/// Byte progress bar for the archive/upload pipeline. `None` when quiet
/// mode is set or the style fails to build, in which case every update
/// is a silent no-op.
#[derive(Default, Debug)]
pub struct Bar {
    pub progress: Option<ProgressBar>,
}

impl Bar {
    #[must_use]
    pub fn new(total_bytes: u64, quiet: bool) -> Self {
        if quiet {
            return Self::default();
        }

        let pb = ProgressBar::new(total_bytes);

        let style_result = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:50.green/blue} {bytes}/{total_bytes} ({bytes_per_sec} - {eta})");

        let style = match style_result {
            Ok(style) => style,
            Err(err) => {
                eprintln!("Error creating progress bar style: {err}");
                return Self { progress: None };
            }
        };

        pb.set_style(style.progress_chars(PROGRESS_CHARS));
        Self { progress: Some(pb) }
    }

    pub fn inc(&self, delta: u64) {
        if let Some(pb) = &self.progress {
            pb.inc(delta);
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
    }
}
