use crate::{
    atcoder::{fetch_samples, Sample, DEFAULT_BASE_URL},
    source::PageSource,
    Result, ScrapeError,
};
use derive_builder::Builder;
use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, sync::Semaphore};

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_OUTPUT_DIR: &str = "testcases";

/// Downloads the samples of every problem in `problems` of one contest,
/// keeping at most `concurrency` problems in flight.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SampleScraper {
    #[builder(setter(into))]
    contest: String,
    #[builder(default = "'a'..='g'")]
    problems: RangeInclusive<char>,
    #[builder(default = "DEFAULT_CONCURRENCY")]
    concurrency: usize,
    #[builder(setter(into), default = "PathBuf::from(DEFAULT_OUTPUT_DIR)")]
    output_dir: PathBuf,
    #[builder(setter(into), default = "DEFAULT_BASE_URL.to_owned()")]
    base_url: String,
}

/// Outcome of a run, in problem order.
#[derive(Debug, Default)]
pub struct Summary {
    pub saved: Vec<(char, usize)>,
    pub failed: Vec<(char, String)>,
}

impl SampleScraperBuilder {
    fn validate(&self) -> Result<(), String> {
        if matches!(&self.contest, Some(contest) if contest.is_empty()) {
            return Err("contest must not be empty".into());
        }
        if self.concurrency == Some(0) {
            return Err("concurrency must be at least 1".into());
        }
        Ok(())
    }
}

impl SampleScraper {
    pub fn contest(&self) -> &str {
        &self.contest
    }

    /// Spawn one task per problem and wait for all of them. A failing problem
    /// is logged and recorded in the summary; it never stops the others.
    pub async fn scrape<S>(&self, source: Arc<S>) -> Summary
    where
        S: PageSource + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = vec![];
        for problem in self.problems.clone() {
            let source = Arc::clone(&source);
            let semaphore = Arc::clone(&semaphore);
            let contest = self.contest.clone();
            let base_url = self.base_url.clone();
            let dir = self.output_dir.join(problem.to_string());

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                tracing::info!(target: "fetch", "fetching problem {contest}_{problem}");

                let fetched = fetch_samples(source.as_ref(), &base_url, &contest, problem).await;
                let samples = match fetched {
                    Ok(samples) => samples,
                    Err(e) => {
                        tracing::warn!(target: "fetch", "skipping {problem}: {e}");
                        return Err(anyhow::Error::from(e));
                    }
                };

                if let Err(e) = save_samples(&samples, &dir).await {
                    tracing::error!(target: "save", "failed to save {problem}: {e}");
                    return Err(anyhow::Error::from(e));
                }
                tracing::info!(
                    target: "save",
                    "saved {} samples to {}",
                    samples.len(),
                    dir.display()
                );

                Ok::<_, anyhow::Error>(samples.len())
            });
            handles.push((problem, handle));
        }

        let mut summary = Summary::default();
        for (problem, handle) in handles {
            match handle.await {
                Ok(Ok(count)) => summary.saved.push((problem, count)),
                Ok(Err(e)) => summary.failed.push((problem, format!("{e:#}"))),
                Err(e) => {
                    tracing::error!(target: "dispatch", "task for {problem} died: {e}");
                    summary.failed.push((problem, e.to_string()));
                }
            }
        }

        summary
    }
}

/// Write `sample{i}.in.txt` and `sample{i}.out.txt` for every sample, numbered
/// from 1. A failure midway leaves the files written so far in place.
pub async fn save_samples(samples: &[Sample], dir: &Path) -> Result<()> {
    create_dir(dir).await?;

    for (i, sample) in samples.iter().enumerate() {
        let n = i + 1;
        write(dir.join(format!("sample{n}.in.txt")), &sample.input).await?;
        write(dir.join(format!("sample{n}.out.txt")), &sample.output).await?;
    }

    Ok(())
}

async fn create_dir(dir: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);

    builder
        .create(dir)
        .await
        .map_err(|source| ScrapeError::Filesystem {
            path: dir.to_owned(),
            source,
        })
}

async fn write(path: PathBuf, contents: &str) -> Result<()> {
    fs::write(&path, contents)
        .await
        .map_err(|source| ScrapeError::Filesystem { path, source })
}

#[cfg(test)]
mod tests {
    use std::{fs as stdfs, time::Duration};

    use super::*;
    use crate::{atcoder::task_url, source::testing::FakeSite};

    const BASE: &str = "http://atcoder.test";

    fn task_page(samples: &[(&str, &str)]) -> String {
        let sections: String = samples
            .iter()
            .enumerate()
            .map(|(i, (input, output))| {
                format!(
                    "<section><h3>Sample Input {n}</h3><pre>{input}</pre></section>\
                     <section><h3>Sample Output {n}</h3><pre>{output}</pre></section>",
                    n = i + 1
                )
            })
            .collect();
        format!("<html><body>{sections}</body></html>")
    }

    fn scraper(output_dir: &Path, problems: RangeInclusive<char>, concurrency: usize) -> SampleScraper {
        SampleScraperBuilder::default()
            .contest("abc349")
            .problems(problems)
            .concurrency(concurrency)
            .output_dir(output_dir)
            .base_url(BASE)
            .build()
            .unwrap()
    }

    fn busy_site(problems: RangeInclusive<char>, delay: Duration) -> FakeSite {
        problems.fold(FakeSite::new().with_delay(delay), |site, problem| {
            site.with_page(task_url(BASE, "abc349", problem), task_page(&[("1", "1")]))
        })
    }

    #[test]
    fn builder_should_apply_defaults() {
        let scraper = SampleScraperBuilder::default()
            .contest("abc349")
            .build()
            .unwrap();

        assert_eq!(scraper.contest(), "abc349");
        assert_eq!(scraper.problems, 'a'..='g');
        assert_eq!(scraper.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(scraper.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(scraper.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_should_reject_bad_config() {
        let zero = SampleScraperBuilder::default()
            .contest("abc349")
            .concurrency(0)
            .build();
        assert!(zero.is_err());

        let empty = SampleScraperBuilder::default().contest("").build();
        assert!(empty.is_err());

        assert!(SampleScraperBuilder::default().build().is_err());
    }

    #[tokio::test]
    async fn save_samples_should_write_two_files_per_sample() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("testcases").join("a");
        let samples = vec![
            Sample {
                input: "4\n1 -2 -1\n".into(),
                output: "2\n".into(),
            },
            Sample {
                input: "3\n0 0\n".into(),
                output: String::new(),
            },
        ];

        save_samples(&samples, &dir).await.unwrap();

        let mut names: Vec<_> = stdfs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(
            names,
            [
                "sample1.in.txt",
                "sample1.out.txt",
                "sample2.in.txt",
                "sample2.out.txt"
            ]
        );
        assert_eq!(
            stdfs::read_to_string(dir.join("sample1.in.txt")).unwrap(),
            "4\n1 -2 -1\n"
        );
        assert_eq!(
            stdfs::read_to_string(dir.join("sample1.out.txt")).unwrap(),
            "2\n"
        );
        assert_eq!(
            stdfs::read_to_string(dir.join("sample2.out.txt")).unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn save_samples_reports_filesystem_errors() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("a");
        stdfs::write(&blocker, "not a directory").unwrap();

        let err = save_samples(&[Sample::default()], &blocker)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Filesystem { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn scrape_should_isolate_failures() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("testcases");
        let site = FakeSite::new()
            .with_page(
                task_url(BASE, "abc349", 'a'),
                task_page(&[("1 2", "3"), ("5 7", "12")]),
            )
            .with_page(task_url(BASE, "abc349", 'c'), task_page(&[("x", "y")]));
        let site = Arc::new(site);

        let summary = scraper(&output, 'a'..='c', 2)
            .scrape(Arc::clone(&site))
            .await;

        assert_eq!(summary.saved, vec![('a', 2), ('c', 1)]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, 'b');

        let mut requests = site.requests();
        requests.sort();
        assert_eq!(
            requests,
            ['a', 'b', 'c']
                .into_iter()
                .map(|p| task_url(BASE, "abc349", p))
                .collect::<Vec<_>>()
        );

        assert_eq!(
            stdfs::read_to_string(output.join("a").join("sample2.out.txt")).unwrap(),
            "12"
        );
        assert!(output.join("c").join("sample1.in.txt").exists());
        assert!(!output.join("b").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn scrape_should_respect_concurrency() {
        let temp = tempfile::tempdir().unwrap();
        let site = Arc::new(busy_site('a'..='h', Duration::from_millis(20)));

        let summary = scraper(temp.path(), 'a'..='h', 2)
            .scrape(Arc::clone(&site))
            .await;

        assert_eq!(summary.saved.len(), 8);
        assert_eq!(site.requests().len(), 8);
        assert!(site.peak() <= 2, "peak {} exceeds limit", site.peak());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_slot_serializes_fetches() {
        let temp = tempfile::tempdir().unwrap();
        let site = Arc::new(busy_site('a'..='e', Duration::from_millis(10)));

        scraper(temp.path(), 'a'..='e', 1)
            .scrape(Arc::clone(&site))
            .await;

        let mut spans = site.spans();
        spans.sort();
        assert_eq!(spans.len(), 5);
        for pair in spans.windows(2) {
            assert!(pair[1].0 >= pair[0].1, "fetches overlap: {pair:?}");
        }
    }
}
