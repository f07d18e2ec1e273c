use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use simplelog::{Config, LevelFilter, WriteLogger};

use pagepool::pdf::{DocumentOpener, PageWindowService, PresentationSink};
use pagepool::settings::{self, Settings};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Replay a scroll script against a document and report the page window
#[derive(Parser, Debug)]
#[command(name = "pagepool", version, about)]
struct Args {
    /// Document to open
    file: PathBuf,

    /// Anchor pages to scroll to, in order
    #[arg(long, value_delimiter = ',', default_value = "0")]
    positions: Vec<usize>,

    /// Write the final window's bitmaps as PNG files into this directory
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Pages kept before the anchor
    #[arg(long)]
    before: Option<usize>,

    /// Pages kept after the anchor
    #[arg(long)]
    after: Option<usize>,

    /// Rendered bitmap width in pixels
    #[arg(long)]
    width: Option<u32>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long, default_value = "pagepool.log")]
    log_file: PathBuf,
}

/// Prints which pages the view would refresh
struct ConsoleSink;

impl PresentationSink for ConsoleSink {
    fn all_changed(&mut self) {
        println!("  refresh: all pages");
    }

    fn range_changed(&mut self, start: usize, count: usize) {
        println!("  refresh: pages {start}..{}", start + count);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(
        level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("cannot create log file {:?}", args.log_file))?,
    )?;
    pagepool::panic_handler::initialize_panic_handler();

    let mut settings = match &args.config {
        Some(path) => settings::load_settings_from_path(path),
        None => settings::load_settings(),
    };
    apply_overrides(&mut settings, &args);
    info!("Starting pagepool with {:?}", settings.window);

    let opener = document_opener(&args.file, settings.window.target_width_px)?;
    let mut service = PageWindowService::open(opener, settings.window.clone())
        .with_context(|| format!("cannot open {:?}", args.file))?;

    let mut sink = ConsoleSink;
    settle(&service, "initial window", SETTLE_TIMEOUT)?;
    println!("opened {} pages", service.page_count());
    service.dispatch_notifications(&mut sink);
    report(&service);

    for &position in &args.positions {
        println!("scroll to page {position}");
        service.on_viewport_changed(position);
        settle(&service, &format!("window at page {position}"), SETTLE_TIMEOUT)?;
        service.dispatch_notifications(&mut sink);
        report(&service);
    }

    if let Some(dir) = &args.dump_dir {
        dump_window(&service, dir)?;
    }

    service.shutdown();
    info!("Shutting down pagepool");
    Ok(())
}

fn settle(service: &PageWindowService, what: &str, timeout: Duration) -> Result<()> {
    anyhow::ensure!(
        service.wait_until_settled(timeout),
        "{what} did not settle within {timeout:?}"
    );
    Ok(())
}

fn apply_overrides(settings: &mut Settings, args: &Args) {
    let window = &mut settings.window;
    if let Some(ms) = args.debounce_ms {
        window.debounce_ms = ms;
    }
    if let Some(before) = args.before {
        window.pages_before = before;
    }
    if let Some(after) = args.after {
        window.pages_after = after;
    }
    if args.width.is_some() {
        window.target_width_px = args.width;
    }
}

#[cfg(feature = "pdf")]
fn document_opener(path: &Path, target_width: Option<u32>) -> Result<DocumentOpener> {
    use pagepool::pdf::{DocumentSource, MupdfDocument};

    anyhow::ensure!(path.exists(), "no such file: {path:?}");
    Ok(MupdfDocument::opener(
        DocumentSource::Path(path.to_path_buf()),
        target_width,
    ))
}

#[cfg(not(feature = "pdf"))]
fn document_opener(path: &Path, _target_width: Option<u32>) -> Result<DocumentOpener> {
    anyhow::bail!("cannot open {path:?}: built without the `pdf` feature")
}

fn report(service: &PageWindowService) {
    let loaded = service.loaded_pages();
    println!(
        "  window {}  loaded {} pages: {:?}",
        service.current_window(),
        loaded.len(),
        loaded.iter().collect::<Vec<_>>()
    );
}

fn dump_window(service: &PageWindowService, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {dir:?}"))?;
    for page in service.current_window().iter() {
        let display = service.display(page)?;
        if display.loading {
            continue;
        }
        let path = dir.join(format!("page-{page:04}.png"));
        display
            .bitmap
            .save(&path)
            .with_context(|| format!("cannot write {path:?}"))?;
        println!("  wrote {path:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepool::WindowConfig;
    use pagepool::test_utils::FakeDocument;

    fn service() -> PageWindowService {
        let config = WindowConfig {
            debounce_ms: 1,
            ..WindowConfig::default()
        };
        PageWindowService::open(FakeDocument::new(3).opener(), config).expect("open")
    }

    #[test]
    fn settle_passes_once_lane_is_idle() {
        assert!(settle(&service(), "initial window", Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn settle_fails_when_lane_is_gone() {
        let mut service = service();
        service.shutdown();

        let err = settle(&service, "initial window", Duration::from_millis(50)).unwrap_err();
        assert!(err.to_string().starts_with("initial window did not settle"));
    }
}
