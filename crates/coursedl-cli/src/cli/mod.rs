//! CLI for the coursedl course-content downloader.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use coursedl_core::cache::CacheStore;
use coursedl_core::config;
use coursedl_core::download::http::HttpDownloader;
use coursedl_core::filter::Selection;
use coursedl_core::provider::webdriver::WebDriverProvider;
use coursedl_core::provider::ProviderError;
use coursedl_core::reconciler::{DownloadReport, Reconciler};
use coursedl_core::walker::Walker;

/// Top-level CLI for the coursedl downloader.
#[derive(Debug, Parser)]
#[command(name = "coursedl")]
#[command(about = "coursedl: classroom course content downloader", long_about = None)]
pub struct Cli {
    /// Course codes to download (e.g. nd013 cs101).
    #[arg(required = true, value_name = "COURSE_CODE")]
    pub courses: Vec<String>,

    /// Destination directory for downloads. Defaults to the configured
    /// dest_dir, then the working directory.
    #[arg(short = 'd', long = "dest", value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Restrict the run to a section ("2") or a single lesson ("3.01").
    /// Repeatable; selections are unioned.
    #[arg(long = "only", value_name = "SELECTOR")]
    pub only: Vec<String>,

    /// Re-download resources even when the cache marks them done.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        Cli::parse().run()
    }

    pub fn run(&self) -> Result<()> {
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        // A bad selector is a usage error; reject before touching the browser.
        let selection = Selection::parse(self.only.iter().map(String::as_str))?;

        let dest_root = match (&self.dest, &cfg.dest_dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => dir.clone(),
            (None, None) => std::env::current_dir()?,
        };

        let store = CacheStore::open_current_dir()?;
        let mut provider = WebDriverProvider::connect(&cfg)?;
        let downloader = HttpDownloader::new();
        let stale_retry = cfg.stale_retry_policy();

        let mut total = DownloadReport::default();
        for code in &self.courses {
            let outcome = match Walker::new(&mut provider, &store)
                .with_stale_retry(stale_retry)
                .discover(code, &selection)
            {
                Ok(outcome) => outcome,
                // Credential problems abort the run; anything else is scoped
                // to this course and the rest still get their turn.
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    tracing::warn!(course = %code, "course skipped: {:#}", e);
                    continue;
                }
            };

            let mut cache = outcome.cache;
            let report = Reconciler::new(&downloader, &store).download(
                code,
                &outcome.display_name,
                &mut cache,
                &dest_root,
                &selection,
                self.force,
            )?;
            tracing::info!(
                course = %code,
                downloaded = report.downloaded,
                skipped = report.skipped,
                failed = report.failed,
                "course finished"
            );
            total.downloaded += report.downloaded;
            total.skipped += report.skipped;
            total.failed += report.failed;
        }

        println!(
            "Download complete. {} fetched, {} already present, {} failed.",
            total.downloaded, total.skipped, total.failed
        );
        Ok(())
    }
}

fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ProviderError>()
        .map(ProviderError::is_fatal)
        .unwrap_or(false)
}
