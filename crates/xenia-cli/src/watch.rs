use std::path::Path;
use std::time::Duration;

use tokio::time::{interval_at, Instant};
use tracing::{info, warn};
use xenia_badge::{inject_badge, BadgeOutcome};
use xenia_core::{ClassSelector, Fragment};

pub struct WatchOptions {
    pub interval: Duration,
    pub max_attempts: Option<u64>,
    pub target: ClassSelector,
    pub marker: ClassSelector,
    pub fragment: Fragment,
}

/// Poll a file on disk until the watermark container shows up in it, brand
/// it once, write it back, and stop. A missing or unreadable file counts as
/// "not ready yet", same as a missing container.
pub async fn run_watch(
    path: &Path,
    options: WatchOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        file = %path.display(),
        interval_ms = options.interval.as_millis() as u64,
        target = %options.target,
        "watching for watermark container"
    );

    let mut ticker = interval_at(Instant::now() + options.interval, options.interval);
    let mut attempts = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                attempts += 1;
                let html = match std::fs::read_to_string(path) {
                    Ok(html) => html,
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, attempts, "file not readable yet");
                        if gave_up(attempts, options.max_attempts) {
                            return Err(give_up_error(path, attempts));
                        }
                        continue;
                    }
                };
                match inject_badge(&html, &options.target, &options.marker, &options.fragment) {
                    BadgeOutcome::Injected(branded) => {
                        std::fs::write(path, branded)?;
                        info!(file = %path.display(), attempts, "badge injected");
                        println!(
                            "badge injected into {} after {} attempt(s)",
                            path.display(),
                            attempts
                        );
                        return Ok(());
                    }
                    BadgeOutcome::AlreadyMarked => {
                        println!("{}: marker already present, left unchanged", path.display());
                        return Ok(());
                    }
                    BadgeOutcome::TargetMissing => {
                        if gave_up(attempts, options.max_attempts) {
                            return Err(give_up_error(path, attempts));
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                println!("cancelled after {} attempt(s)", attempts);
                return Ok(());
            }
        }
    }
}

fn gave_up(attempts: u64, max_attempts: Option<u64>) -> bool {
    max_attempts.is_some_and(|max| attempts >= max)
}

fn give_up_error(path: &Path, attempts: u64) -> Box<dyn std::error::Error> {
    format!(
        "gave up on {} after {} attempt(s), no watermark container appeared",
        path.display(),
        attempts
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn options(max_attempts: Option<u64>) -> WatchOptions {
        WatchOptions {
            interval: Duration::from_millis(500),
            max_attempts,
            target: ClassSelector::watermark(),
            marker: ClassSelector::badge(),
            fragment: Fragment::badge(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn brands_a_file_that_already_has_the_container() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<body><div class=\"watermark\"></div></body>").unwrap();

        run_watch(file.path(), options(None)).await.unwrap();

        let branded = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            branded,
            "<body><div class=\"watermark\">\
             <span class=\"powered-by-xenia\">Powered by DMI</span></div></body>"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_when_the_container_never_appears() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<body><p>nothing here</p></body>").unwrap();

        let err = run_watch(file.path(), options(Some(3))).await.unwrap_err();
        assert!(err.to_string().contains("gave up"));
        assert!(err.to_string().contains("3 attempt(s)"));

        let untouched = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(untouched, "<body><p>nothing here</p></body>");
    }

    #[tokio::test(start_paused = true)]
    async fn already_branded_file_is_left_alone() {
        let original = "<div class=\"watermark\">\
                        <span class=\"powered-by-xenia\">hand-made</span></div>";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{original}").unwrap();

        run_watch(file.path(), options(None)).await.unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), original);
    }
}
