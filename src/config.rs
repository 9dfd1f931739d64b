//! TOML configuration for the quiz core.
//!
//! Lookup order:
//! 1) `$BIBLE_REVIEW_CONFIG_PATH` (must exist)
//! 2) `config/review.toml` (optional; defaults when absent)
//!
//! Env overrides applied after parsing: `BIBLE_REVIEW_RESOLVER`,
//! `BIBLE_REVIEW_CACHE_TTL_SECS`.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::books;
use crate::cache::{PoolCache, DEFAULT_CAPACITY, DEFAULT_TTL_SECS};
use crate::corpus::BaseWeightPolicy;
use crate::mining::{Normalizer, DEFAULT_REPLACEMENTS};
use crate::resolver::{BookResolver, StrategyKind, DEFAULT_FUZZY_THRESHOLD};
use crate::scoring::ScoringConfig;

pub const ENV_CONFIG_PATH: &str = "BIBLE_REVIEW_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/review.toml";
pub const ENV_RESOLVER: &str = "BIBLE_REVIEW_RESOLVER";
pub const ENV_CACHE_TTL_SECS: &str = "BIBLE_REVIEW_CACHE_TTL_SECS";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub corpus: CorpusSection,
    pub resolver: ResolverSection,
    pub scoring: ScoringConfig,
    pub cache: CacheSection,
    pub mining: MiningSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorpusSection {
    /// Translation file (`.json` or `.xml`).
    pub path: Option<PathBuf>,
    pub base_weight: BaseWeightPolicy,
    /// Saved `[{reference, count}]` report used as a secondary weight source.
    pub mentions_report: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    pub strategy: StrategyKind,
    pub fuzzy_threshold: f64,
    /// Accept TSK abbreviations (`1co`, `mr`) as book aliases.
    pub tsk_aliases: bool,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::ExactPrefix,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            tsk_aliases: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_secs: i64,
    pub capacity: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiningSection {
    pub allowed_authors: Vec<String>,
    pub default_replacements: bool,
    /// Extra `wrong = "right"` repairs, applied after the defaults.
    pub replacements: BTreeMap<String, String>,
}

impl Default for MiningSection {
    fn default() -> Self {
        Self {
            allowed_authors: Vec::new(),
            default_replacements: true,
            replacements: BTreeMap::new(),
        }
    }
}

impl ReviewConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ReviewConfig = toml::from_str(s).context("invalid review config TOML")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading review config from {}", path.display()))?;
        let cfg = Self::from_toml_str(&content)
            .with_context(|| format!("parsing review config {}", path.display()))?;
        debug!(path = %path.display(), "review config loaded");
        Ok(cfg)
    }

    /// Env path, then the default path, then built-in defaults; env
    /// overrides applied last.
    pub fn load_default() -> Result<Self> {
        let cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::load_from(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
            if pb.exists() {
                Self::load_from(&pb)?
            } else {
                debug!("no review config found, using defaults");
                Self::default()
            }
        };
        Ok(cfg.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var(ENV_RESOLVER) {
            match StrategyKind::parse(&v) {
                Some(kind) => self.resolver.strategy = kind,
                None => warn!(value = %v, "ignoring unknown {ENV_RESOLVER}"),
            }
        }
        if let Ok(v) = std::env::var(ENV_CACHE_TTL_SECS) {
            match v.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => self.cache.ttl_secs = secs,
                _ => warn!(value = %v, "ignoring invalid {ENV_CACHE_TTL_SECS}"),
            }
        }
        self
    }

    fn sanitized(mut self) -> Self {
        let t = self.resolver.fuzzy_threshold;
        self.resolver.fuzzy_threshold = if t.is_finite() {
            t.clamp(0.0, 1.0)
        } else {
            DEFAULT_FUZZY_THRESHOLD
        };
        self.scoring = self.scoring.sanitized();
        if self.cache.ttl_secs <= 0 {
            self.cache.ttl_secs = DEFAULT_TTL_SECS;
        }
        if self.cache.capacity == 0 {
            self.cache.capacity = DEFAULT_CAPACITY;
        }
        self
    }

    /// Resolver over `books` with the configured strategy and aliases.
    pub fn book_resolver<I, S>(&self, books: I) -> BookResolver
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut r = BookResolver::new(books)
            .with_strategy(self.resolver.strategy.build(self.resolver.fuzzy_threshold));
        if self.resolver.tsk_aliases {
            r = r.with_aliases(books::tsk_aliases());
        }
        r
    }

    pub fn normalizer(&self) -> Normalizer {
        let defaults = DEFAULT_REPLACEMENTS
            .iter()
            .filter(|_| self.mining.default_replacements)
            .map(|(a, b)| (a.to_string(), b.to_string()));
        let extra = self
            .mining
            .replacements
            .iter()
            .map(|(a, b)| (a.clone(), b.clone()));
        Normalizer::new(defaults.chain(extra))
    }

    pub fn pool_cache(&self) -> PoolCache {
        PoolCache::new(
            chrono::Duration::seconds(self.cache.ttl_secs),
            self.cache.capacity,
        )
    }
}
