mod config;
mod demo;
mod watch;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use xenia_badge::{contains_class, find_class_element, inject_badge, BadgeOutcome};

use crate::config::XeniaConfig;
use crate::watch::WatchOptions;

#[derive(Parser)]
#[command(name = "xenia")]
#[command(about = "Inject the Xenia watermark badge into rendered documents")]
struct Cli {
    #[arg(
        short = 'f',
        long,
        global = true,
        help = "Path to config file (defaults apply when omitted)"
    )]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One-shot pass over an HTML file, writing in place unless -o is given
    Inject {
        #[arg(help = "HTML file to brand")]
        file: PathBuf,
        #[arg(short, long, help = "Write the result here instead of in place")]
        output: Option<PathBuf>,
    },
    /// Report whether a file has the container and whether it is branded
    Check {
        #[arg(help = "HTML file to inspect")]
        file: PathBuf,
    },
    /// Poll a file until the container appears, brand it once, then exit
    Watch {
        #[arg(help = "HTML file to poll")]
        file: PathBuf,
        #[arg(long, help = "Override the poll interval in milliseconds")]
        interval_ms: Option<u64>,
        #[arg(long, help = "Give up after this many attempts")]
        max_attempts: Option<u64>,
    },
    /// Run the injector against an in-memory document that mutates late
    Demo {
        #[arg(long, default_value = "1500", help = "When the container appears, in ms")]
        appear_after_ms: u64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xenia=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match XeniaConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Inject { file, output } => run_inject(&file, output.as_deref(), &config),
        Commands::Check { file } => run_check(&file, &config),
        Commands::Watch {
            file,
            interval_ms,
            max_attempts,
        } => {
            let options = match watch_options(&config, interval_ms, max_attempts) {
                Ok(options) => options,
                Err(e) => {
                    eprintln!("error: {}", e);
                    std::process::exit(1);
                }
            };
            watch::run_watch(&file, options).await
        }
        Commands::Demo { appear_after_ms } => match config.injector_config() {
            Ok(injector_config) => {
                demo::run_demo(Duration::from_millis(appear_after_ms), injector_config).await
            }
            Err(e) => Err(e.into()),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn watch_options(
    config: &XeniaConfig,
    interval_ms: Option<u64>,
    max_attempts: Option<u64>,
) -> Result<WatchOptions, Box<dyn std::error::Error>> {
    Ok(WatchOptions {
        interval: interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.interval()),
        max_attempts: max_attempts.or(config.poll.max_attempts),
        target: config.target()?,
        marker: config.marker()?,
        fragment: config.fragment(),
    })
}

fn run_inject(
    file: &Path,
    output: Option<&Path>,
    config: &XeniaConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let html = std::fs::read_to_string(file)?;
    let target = config.target()?;
    let marker = config.marker()?;

    match inject_badge(&html, &target, &marker, &config.fragment()) {
        BadgeOutcome::Injected(branded) => {
            let dest = output.unwrap_or(file);
            std::fs::write(dest, branded)?;
            println!("badge injected into {}", dest.display());
        }
        BadgeOutcome::AlreadyMarked => {
            println!("{}: marker already present, left unchanged", file.display());
        }
        BadgeOutcome::TargetMissing => {
            println!(
                "{}: no {} container found, left unchanged",
                file.display(),
                target
            );
        }
    }
    Ok(())
}

fn run_check(file: &Path, config: &XeniaConfig) -> Result<(), Box<dyn std::error::Error>> {
    let html = std::fs::read_to_string(file)?;
    let target = config.target()?;
    let marker = config.marker()?;

    match find_class_element(&html, &target) {
        Some(span) => {
            let branded = contains_class(&html[span.inner_start..span.inner_end], &marker);
            println!("container: present ({} element)", span.tag_name);
            println!("badge: {}", if branded { "present" } else { "absent" });
        }
        None => {
            println!("container: absent");
            println!("badge: absent");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn inject_writes_in_place() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<div class=\"watermark\"><em>old</em></div>").unwrap();

        run_inject(file.path(), None, &XeniaConfig::default()).unwrap();

        assert_eq!(
            std::fs::read_to_string(file.path()).unwrap(),
            "<div class=\"watermark\"><span class=\"powered-by-xenia\">Powered by DMI</span></div>"
        );
    }

    #[test]
    fn inject_to_output_leaves_source_untouched() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<div class=\"watermark\"></div>").unwrap();
        let out = tempfile::NamedTempFile::new().unwrap();

        run_inject(file.path(), Some(out.path()), &XeniaConfig::default()).unwrap();

        assert_eq!(
            std::fs::read_to_string(file.path()).unwrap(),
            "<div class=\"watermark\"></div>"
        );
        assert!(std::fs::read_to_string(out.path())
            .unwrap()
            .contains("powered-by-xenia"));
    }

    #[test]
    fn inject_without_container_changes_nothing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<p>plain page</p>").unwrap();

        run_inject(file.path(), None, &XeniaConfig::default()).unwrap();
        assert_eq!(
            std::fs::read_to_string(file.path()).unwrap(),
            "<p>plain page</p>"
        );
    }
}
