use anyhow::{Context, Result};
use atcoder_samples::{
    atcoder::{self, problem_range, Family},
    dispatch::{SampleScraperBuilder, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR},
    source::HttpSource,
};
use clap::Parser;
use std::{ffi::OsString, ops::RangeInclusive, path::PathBuf, sync::Arc};

/// Long flags that are also accepted with a single dash, e.g. `-contest abc349`.
const SINGLE_DASH_FLAGS: &[&str] = &[
    "contest",
    "range",
    "concurrency",
    "family",
    "output",
    "base-url",
];

/// Download the sample cases of an AtCoder contest into one folder per problem.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Contest id such as abc349; the latest contest of --family is used when empty
    #[arg(long)]
    contest: Option<String>,

    /// Problem range; its first and last characters are the inclusive bounds
    #[arg(short, long, default_value = "a-g", value_parser = problem_range)]
    range: RangeInclusive<char>,

    /// Max number of problems fetched at the same time
    #[arg(short = 'j', long, default_value_t = DEFAULT_CONCURRENCY, value_parser = parse_concurrency)]
    concurrency: usize,

    /// Contest family looked up when --contest is not given
    #[arg(short, long, default_value_t = Family::Abc)]
    family: Family,

    /// Root folder of the written samples
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Site root the contest and task urls are built from
    #[arg(long, default_value = atcoder::DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse_from(double_dash_flags(std::env::args_os()));
    let source = Arc::new(HttpSource::new()?);

    let contest = match explicit_contest(args.contest) {
        Some(contest) => contest,
        None => {
            let family = args.family;
            tracing::info!(target: "resolve", "detecting the most recent {family} contest");
            let contest = atcoder::resolve_contest(source.as_ref(), &args.base_url, family)
                .await
                .with_context(|| format!("failed to detect the most recent {family} contest"))?;
            tracing::info!(target: "resolve", "using contest {contest}");
            contest
        }
    };

    let scraper = SampleScraperBuilder::default()
        .contest(contest)
        .problems(args.range)
        .concurrency(args.concurrency)
        .output_dir(args.output)
        .base_url(args.base_url)
        .build()?;
    tracing::debug!(target: "dispatch", "{scraper:?}");

    let summary = scraper.scrape(source).await;
    tracing::info!(
        target: "dispatch",
        "all test cases of {} fetched: {} saved, {} skipped",
        scraper.contest(),
        summary.saved.len(),
        summary.failed.len()
    );
    Ok(())
}

fn parse_concurrency(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("concurrency must be at least 1".to_owned()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn explicit_contest(contest: Option<String>) -> Option<String> {
    contest.filter(|c| !c.is_empty())
}

/// Rewrite `-contest`, `-range=a-d` and friends to their `--` spelling so the
/// single-dash form is never taken for a cluster of short flags.
fn double_dash_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut options_done = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if options_done {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                options_done = true;
                return arg;
            }
            let Some(flag) = text.strip_prefix('-').filter(|f| !f.starts_with('-')) else {
                return arg;
            };
            let name = flag.split_once('=').map_or(flag, |(name, _)| name);
            if SINGLE_DASH_FLAGS.contains(&name) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}
