//! bible-review: command line entrypoint.
//!
//! ```text
//! bible-review [--corpus PATH] extract <file>   FreeText citations per line → JSON
//! bible-review [--corpus PATH] count <file>     mention report → JSON
//! bible-review [--corpus PATH] quiz [--user NAME] [--rounds N]
//! ```
//!
//! `<file>` is either plain text (one sentence per line) or a scraped
//! resources JSON map (`{url: {author, sentences}}`).

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bible_review::config::ReviewConfig;
use bible_review::corpus::Corpus;
use bible_review::eligibility::ScopeSettings;
use bible_review::mining::{self, AuthorMentions, MentionCounter, MentionCounts};
use bible_review::quiz::QuizEngine;
use bible_review::reference::{RangeWarning, ReferenceMatch, ReferenceParser};
use bible_review::review::{InMemoryReviewStore, Sm2Card, Sm2Scheduler};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bible_review=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(io::stderr))
        .init();
}

enum Command {
    Extract(PathBuf),
    Count(PathBuf),
    Quiz { user: String, rounds: usize },
}

struct Args {
    corpus: Option<PathBuf>,
    command: Command,
}

fn parse_args(mut it: impl Iterator<Item = String>) -> Result<Args> {
    let mut corpus = None;
    let mut positional = Vec::new();
    let mut user = "local".to_string();
    let mut rounds = 10usize;

    while let Some(a) = it.next() {
        match a.as_str() {
            "--corpus" => corpus = Some(PathBuf::from(it.next().context("--corpus needs a path")?)),
            "--user" => user = it.next().context("--user needs a name")?,
            "--rounds" => {
                rounds = it
                    .next()
                    .context("--rounds needs a number")?
                    .parse()
                    .context("--rounds must be a number")?
            }
            _ => positional.push(a),
        }
    }

    let mut pos = positional.into_iter();
    let command = match pos.next().as_deref() {
        Some("extract") => Command::Extract(pos.next().context("extract needs <file>")?.into()),
        Some("count") => Command::Count(pos.next().context("count needs <file>")?.into()),
        Some("quiz") => Command::Quiz { user, rounds },
        Some(other) => bail!("unknown command {other:?} (expected extract | count | quiz)"),
        None => bail!("usage: bible-review [--corpus PATH] <extract FILE | count FILE | quiz>"),
    };
    Ok(Args { corpus, command })
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = parse_args(std::env::args().skip(1))?;
    let cfg = ReviewConfig::load_default()?;

    let corpus_path = args
        .corpus
        .clone()
        .or_else(|| cfg.corpus.path.clone())
        .ok_or_else(|| anyhow!("no corpus: pass --corpus or set [corpus].path"))?;
    let corpus = Arc::new(Corpus::load(&corpus_path)?.with_base_weight_policy(cfg.corpus.base_weight));
    info!(
        path = %corpus_path.display(),
        books = corpus.books().len(),
        verses = corpus.total_verses(),
        "corpus ready"
    );

    match args.command {
        Command::Extract(file) => extract(&file, &corpus, &cfg),
        Command::Count(file) => count(&file, &corpus, &cfg),
        Command::Quiz { user, rounds } => quiz(&user, rounds, corpus, &cfg),
    }
}

fn read_sentences(path: &Path) -> Result<Vec<String>> {
    let is_json = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        let resources = mining::load_resources(path)?;
        return Ok(resources
            .into_values()
            .filter_map(|r| r.sentences)
            .flatten()
            .collect());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading sentences from {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

#[derive(Serialize)]
struct Extracted<'a> {
    sentence: &'a str,
    references: Vec<ReferenceMatch>,
    warnings: Vec<RangeWarning>,
}

fn extract(path: &Path, corpus: &Corpus, cfg: &ReviewConfig) -> Result<()> {
    let parser = ReferenceParser::new(cfg.book_resolver(corpus.book_names()));
    let sentences = read_sentences(path)?;
    let mut counter = MentionCounter::new(&parser, corpus, cfg.normalizer());

    let mut out = Vec::new();
    for s in &sentences {
        let parsed = counter.add_text(s);
        if parsed.matches.is_empty() && parsed.warnings.is_empty() {
            continue;
        }
        out.push(Extracted {
            sentence: s,
            references: parsed.matches,
            warnings: parsed.warnings,
        });
    }
    counter.finish();
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn count(path: &Path, corpus: &Corpus, cfg: &ReviewConfig) -> Result<()> {
    let parser = ReferenceParser::new(cfg.book_resolver(corpus.book_names()));
    let normalizer = cfg.normalizer();

    let is_resources = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let counts = if is_resources && !cfg.mining.allowed_authors.is_empty() {
        let resources = mining::load_resources(path)?;
        let mut am = AuthorMentions::new(cfg.mining.allowed_authors.iter().cloned());
        am.collect(&resources, &parser, corpus, &normalizer);
        am.merged()
    } else {
        let mut counter = MentionCounter::new(&parser, corpus, normalizer);
        for s in read_sentences(path)? {
            counter.add_text(&s);
        }
        counter.finish()
    };

    println!("{}", serde_json::to_string_pretty(&counts.report())?);
    Ok(())
}

fn quiz(user: &str, rounds: usize, corpus: Arc<Corpus>, cfg: &ReviewConfig) -> Result<()> {
    let mut engine = QuizEngine::from_config(Arc::clone(&corpus), cfg);
    if let Some(report) = &cfg.corpus.mentions_report {
        match MentionCounts::load_report(report, engine.parser(), &corpus) {
            Ok(counts) => engine = engine.with_source(Box::new(counts)),
            Err(e) => warn!(error = %e, "mention report not loaded"),
        }
    }

    let store = InMemoryReviewStore::<Sm2Card>::new();
    let settings = ScopeSettings::default();
    let mut rng = rand::rng();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut stdout = io::stdout();

    for round in 1..=rounds {
        let prompt = engine.next_prompt(user, &settings, &store, Utc::now(), &mut rng)?;
        writeln!(stdout, "\n[{round}/{rounds}]")?;
        if !prompt.previous.is_empty() {
            writeln!(stdout, "  … {}", prompt.previous)?;
        }
        writeln!(stdout, "  » {}", prompt.text)?;
        if !prompt.next.is_empty() {
            writeln!(stdout, "  … {}", prompt.next)?;
        }

        loop {
            write!(stdout, "reference> ")?;
            stdout.flush()?;
            let started = Instant::now();
            let Some(line) = lines.next().transpose()? else {
                return Ok(());
            };
            let elapsed = started.elapsed().as_secs_f64();
            match engine.submit(user, &line, &prompt.verse, elapsed, &store, &Sm2Scheduler, Utc::now()) {
                Ok(a) => {
                    writeln!(
                        stdout,
                        "  {}: distance {}, score {}, {:?}",
                        a.actual, a.result.distance, a.result.score, a.result.rating
                    )?;
                    break;
                }
                Err(e) => writeln!(stdout, "  {e}; try again")?,
            }
        }
    }
    Ok(())
}
