//! CLI entry point for stm_next.
//!
//! `next` shows the upcoming realtime arrivals at one stop together with
//! where each bus currently is. `stops` lists what a query resolves to.

use std::ffi::OsStr;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use stm_next::Error;
use stm_next::config::{
    API_KEY_ENV, DEFAULT_BASE_URL, FeedConfig, RankConfig, TIMEZONE_ENV, resolve_api_key,
    resolve_timezone,
};
use stm_next::fetch::FeedClient;
use stm_next::gtfs::ReferenceIndex;
use stm_next::output::{OutputFormat, render, write_stop_matches};
use stm_next::rank::Ranker;
use stm_next::resolve::{resolve_stop, resolve_stops};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Exit status for invalid command-line usage.
const EXIT_USAGE: u8 = 64;
/// Exit status for failures that are not one of the library's error kinds.
const EXIT_INTERNAL: u8 = 70;

#[derive(Parser)]
#[command(name = "stm_next")]
#[command(about = "Next STM bus arrivals at a stop, with live vehicle distance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the next realtime arrivals at a stop
    Next {
        /// Path to the GTFS static dataset (directory or zip archive)
        #[arg(long, value_name = "PATH")]
        gtfs: PathBuf,

        /// Stop id, stop code, or (part of) a stop name
        #[arg(long, value_name = "QUERY")]
        stop: String,

        /// Number of arrivals to show
        #[arg(short, long, default_value_t = 3)]
        max: usize,

        /// Emit JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,

        /// API key (defaults to the STM_API_KEY environment variable)
        #[arg(long)]
        api_key: Option<String>,

        /// Realtime API base URL
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 12)]
        timeout: u64,

        /// IANA time zone for clock times (defaults to TZ, else America/Toronto)
        #[arg(long, value_name = "ZONE")]
        tz: Option<String>,
    },
    /// List the stops a query resolves to, best match first
    Stops {
        /// Path to the GTFS static dataset (directory or zip archive)
        #[arg(long, value_name = "PATH")]
        gtfs: PathBuf,

        /// Stop id, stop code, or (part of) a stop name
        #[arg(long, value_name = "QUERY")]
        query: String,

        /// Emit JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _file_guard = init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = usage_exit_code(&e);
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = ?e, "Run failed");
            eprintln!("{e:#}");
            let code = e
                .downcast_ref::<Error>()
                .map(Error::exit_code)
                .unwrap_or(EXIT_INTERNAL);
            ExitCode::from(code)
        }
    }
}

/// `--help` and `--version` are successful runs; anything else clap rejects
/// is a usage error.
fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
        _ => EXIT_USAGE,
    }
}

/// Stderr logging, plus a JSON rolling log file when `LOG_FILE_PATH`
/// is set. The returned guard must live until exit so the file is flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "warn"));

    let (json_layer, guard) = match std::env::var("LOG_FILE_PATH") {
        Ok(log_file_path) => {
            let path = Path::new(&log_file_path);
            let log_dir = path.parent().unwrap_or(Path::new("logs"));
            let log_file_name = path.file_name().unwrap_or(OsStr::new("stm_next.log"));

            let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(non_blocking_file)
                .with_filter(env_filter("RUST_LOG_JSON", "debug"));
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

async fn run(cli: Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Next {
            gtfs,
            stop,
            max,
            json,
            api_key,
            base_url,
            timeout,
            tz,
        } => {
            let api_key = resolve_api_key(api_key, std::env::var(API_KEY_ENV).ok())?;
            let env_tz = std::env::var(TIMEZONE_ENV).ok();
            let tz = resolve_timezone(tz.as_deref(), env_tz.as_deref())?;

            let feed_config = FeedConfig::new(api_key)
                .with_base_url(base_url)
                .with_timeout(Duration::from_secs(timeout));
            let rank_config = RankConfig::default().with_limit(max);

            next(
                &mut out,
                &gtfs,
                &stop,
                &feed_config,
                rank_config,
                OutputFormat::from_json_flag(json),
                tz,
            )
            .await?;
        }
        Commands::Stops { gtfs, query, json } => {
            let index = ReferenceIndex::load(&gtfs)?;
            let matches = resolve_stops(&query, &index);
            if matches.is_empty() {
                return Err(Error::StopNotFound {
                    query: query.trim().to_string(),
                }
                .into());
            }
            write_stop_matches(
                &mut out,
                query.trim(),
                &matches,
                OutputFormat::from_json_flag(json),
            )?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Load, resolve, fetch, rank, render. Nothing is written to `out` unless
/// every step before rendering succeeds.
#[tracing::instrument(
    skip(out, gtfs, feed_config, rank_config, format, tz),
    fields(gtfs = %gtfs.display())
)]
async fn next<W: Write>(
    out: &mut W,
    gtfs: &Path,
    query: &str,
    feed_config: &FeedConfig,
    rank_config: RankConfig,
    format: OutputFormat,
    tz: Tz,
) -> Result<()> {
    let index = ReferenceIndex::load(gtfs)?;
    let stop = resolve_stop(query, &index)?;
    info!(stop_id = %stop.stop_id, stop_name = %stop.stop_name, "Stop resolved");

    let client = FeedClient::from_config(feed_config)?;
    let feeds = client.fetch_all().await?;

    let arrivals = Ranker::new(&index, rank_config).rank(stop, &feeds);
    info!(arrivals = arrivals.len(), "Arrivals ranked");

    render(out, stop, arrivals, format, &Utc::now().with_timezone(&tz))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("stm_next").chain(args.iter().copied()))
    }

    #[test]
    fn test_missing_argument_is_usage_error_distinct_from_credential() {
        let err = parse(&["next", "--gtfs", "gtfs"]).err().unwrap();
        assert_eq!(usage_exit_code(&err), EXIT_USAGE);

        let missing_key = Error::MissingCredential {
            env_var: API_KEY_ENV,
        };
        assert_ne!(usage_exit_code(&err), missing_key.exit_code());
    }

    #[test]
    fn test_unknown_subcommand_is_usage_error() {
        let err = parse(&["departures"]).err().unwrap();
        assert_eq!(usage_exit_code(&err), EXIT_USAGE);
    }

    #[test]
    fn test_help_exits_successfully() {
        let err = parse(&["--help"]).err().unwrap();
        assert_eq!(usage_exit_code(&err), 0);
    }

    #[test]
    fn test_default_stderr_filter_hides_debug_failure_event() {
        let filter = env_filter("STM_NEXT_TEST_UNSET_FILTER", "warn");
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::WARN)
        );
    }

    #[test]
    fn test_next_defaults() {
        let cli = parse(&["next", "--gtfs", "gtfs", "--stop", "52552"]).unwrap();
        match cli.command {
            Commands::Next {
                max,
                json,
                api_key,
                base_url,
                timeout,
                tz,
                ..
            } => {
                assert_eq!(max, 3);
                assert!(!json);
                assert_eq!(api_key, None);
                assert_eq!(base_url, DEFAULT_BASE_URL);
                assert_eq!(timeout, 12);
                assert_eq!(tz, None);
            }
            Commands::Stops { .. } => panic!("expected next"),
        }
    }
}
