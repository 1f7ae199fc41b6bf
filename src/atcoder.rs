use crate::{source::PageSource, Result, ScrapeError};
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use std::ops::RangeInclusive;
use strum::{Display, EnumString};

pub const DEFAULT_BASE_URL: &str = "https://atcoder.jp";

const CONTEST_PATH: &str = "/contests/";
const INPUT_HEADING: &str = "Sample Input";
const OUTPUT_HEADING: &str = "Sample Output";

/// Contest series; its lowercase name prefixes every contest id of the series.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Family {
    #[default]
    Abc,
    Arc,
    Agc,
    Ahc,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sample {
    pub input: String,
    pub output: String,
}

/// Find the most recent contest of `family` listed in the archive.
pub async fn resolve_contest<S>(source: &S, base_url: &str, family: Family) -> Result<String>
where
    S: PageSource + ?Sized,
{
    let url = archive_url(base_url);
    let page = source.get(&url).await?;
    if !page.status.is_success() {
        return Err(ScrapeError::Status {
            url,
            status: page.status,
        });
    }

    parse_latest_contest(&page.body, family)
}

/// Fetch the task page of `contest`/`problem` and extract its samples.
pub async fn fetch_samples<S>(
    source: &S,
    base_url: &str,
    contest: &str,
    problem: char,
) -> Result<Vec<Sample>>
where
    S: PageSource + ?Sized,
{
    let url = task_url(base_url, contest, problem);
    let page = source.get(&url).await?;
    match page.status {
        StatusCode::NOT_FOUND => Err(ScrapeError::NotFound(format!(
            "problem {contest}_{problem}"
        ))),
        status if !status.is_success() => Err(ScrapeError::Status { url, status }),
        _ => parse_samples(&page.body),
    }
}

pub fn task_url(base_url: &str, contest: &str, problem: char) -> String {
    format!(
        "{}{CONTEST_PATH}{contest}/tasks/{contest}_{problem}",
        base_url.trim_end_matches('/')
    )
}

pub fn archive_url(base_url: &str) -> String {
    format!("{}{CONTEST_PATH}archive", base_url.trim_end_matches('/'))
}

/// Parse a problem range such as `a-g`. Only the first and the last character
/// matter, so `a-g`, `ag` and `a..g` are the same range.
pub fn problem_range(s: &str) -> Result<RangeInclusive<char>, String> {
    let mut chars = s.chars();
    let start = chars
        .next()
        .ok_or_else(|| "problem range must not be empty".to_owned())?;
    let end = chars.next_back().unwrap_or(start);

    Ok(start..=end)
}

/// Pair up the `Sample Input` / `Sample Output` sections of a task page.
///
/// An output section completes whatever input was seen last, so an output
/// without a preceding input yields a sample with an empty input.
pub fn parse_samples(html: &str) -> Result<Vec<Sample>> {
    let document = Html::parse_document(html);
    let section = selector("section")?;
    let heading = selector("h3")?;
    let pre = selector("pre")?;

    let mut samples = vec![];
    let mut pending = Sample::default();
    for node in document.select(&section) {
        let title = text_of(node, &heading);
        if title.starts_with(INPUT_HEADING) {
            pending = Sample {
                input: text_of(node, &pre),
                output: String::new(),
            };
        } else if title.starts_with(OUTPUT_HEADING) {
            pending.output = text_of(node, &pre);
            samples.push(pending.clone());
        }
    }

    Ok(samples)
}

/// Contest id of the first archive row whose contest link belongs to `family`.
pub fn parse_latest_contest(html: &str, family: Family) -> Result<String> {
    let document = Html::parse_document(html);
    let row = selector("table tbody tr")?;
    let link = selector("a")?;
    let prefix = family.to_string();

    for node in document.select(&row) {
        // the first link of a row points at the start time, the second at the contest
        let href = node
            .select(&link)
            .nth(1)
            .and_then(|a| a.value().attr("href"))
            .unwrap_or_default();
        tracing::debug!(target: "resolve", "archive link {href:?}");

        if let Some(id) = href.strip_prefix(CONTEST_PATH) {
            if id.starts_with(&prefix) {
                return Ok(id.to_owned());
            }
        }
    }

    Err(ScrapeError::NotFound(format!("no {family} contest in the archive")))
}

fn text_of(node: ElementRef<'_>, selector: &Selector) -> String {
    node.select(selector).flat_map(|el| el.text()).collect()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Parse(format!("bad selector {css:?}: {e:?}")))
}
