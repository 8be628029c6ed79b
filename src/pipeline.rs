//! One assessment end to end: render, extract, score, refine, summarise.

use crate::browser::{BrowserPool, ChromeRenderer, ListingRenderer, RenderOptions};
use crate::config::Settings;
use crate::error::AssessError;
use crate::extract::{debug_artifacts, extract_listing};
use crate::heuristics::{self, MAX_TOP_FIXES};
use crate::matcher::{AmenityMatcher, Embedder, EmbeddingService, NullEmbedder, RemoteEmbedder};
use crate::models::{AssessmentResult, ListingContent};
use crate::refine::{ListingContext, LlmClient};
use crate::url::{build_cache_key, normalize_listing_url};
use anyhow::{Context, Result};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Per-request switches
#[derive(Debug, Clone, Default)]
pub struct AssessOptions {
    /// Skip the cache lookup; the fresh result is still stored
    pub force: bool,
    /// Ask the overview model for a host-facing narrative
    pub with_overview: bool,
    /// Attach raw capture artifacts to the returned listing
    pub capture_debug: bool,
}

impl AssessOptions {
    /// Cache variant; results with and without an overview are kept apart
    pub fn variant(&self) -> &'static str {
        if self.with_overview {
            "overview"
        } else {
            "standard"
        }
    }
}

/// What one call to [`Assessor::assess`] produced
#[derive(Debug, Clone)]
pub struct Assessment {
    pub url: String,
    pub result: AssessmentResult,
    /// The extracted listing; absent on cache hits
    pub listing: Option<ListingContent>,
    pub from_cache: bool,
}

pub struct Assessor {
    renderer: Arc<dyn ListingRenderer>,
    matcher: Arc<AmenityMatcher>,
    llm: Option<LlmClient>,
    overview: Option<LlmClient>,
    render_options: RenderOptions,
    cache: Cache<String, AssessmentResult>,
}

impl Assessor {
    pub fn new(renderer: Arc<dyn ListingRenderer>, matcher: Arc<AmenityMatcher>) -> Self {
        Self {
            renderer,
            matcher,
            llm: None,
            overview: None,
            render_options: RenderOptions::default(),
            cache: build_cache(128, Duration::from_secs(900)),
        }
    }

    /// Wire Chrome, the matcher and both LLM clients from `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let pool = Arc::new(BrowserPool::new(settings.browser.clone()));
        let renderer: Arc<dyn ListingRenderer> = Arc::new(ChromeRenderer::new(pool));

        let embedder: Arc<dyn Embedder> = match &settings.embedding {
            Some(config) => Arc::new(
                RemoteEmbedder::new(config.clone()).context("Failed to build embedding client")?,
            ),
            None => Arc::new(NullEmbedder),
        };
        let matcher = AmenityMatcher::new(
            EmbeddingService::new(embedder, settings.embedding_cache_size),
            settings.similarity_threshold,
        );

        let llm = settings
            .llm
            .clone()
            .map(LlmClient::new)
            .transpose()
            .context("Failed to build LLM client")?;
        let overview = settings
            .overview
            .clone()
            .map(LlmClient::new)
            .transpose()
            .context("Failed to build overview client")?;

        Ok(Self::new(renderer, Arc::new(matcher))
            .with_render_options(settings.render.clone())
            .with_cache(settings.cache_maxsize, settings.cache_ttl)
            .with_llm(llm)
            .with_overview(overview))
    }

    pub fn with_llm(mut self, client: Option<LlmClient>) -> Self {
        self.llm = client;
        self
    }

    pub fn with_overview(mut self, client: Option<LlmClient>) -> Self {
        self.overview = client;
        self
    }

    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    pub fn with_cache(mut self, max_capacity: u64, ttl: Duration) -> Self {
        self.cache = build_cache(max_capacity, ttl);
        self
    }

    /// Assess one listing. Only URL and render failures come back as errors.
    pub async fn assess(&self, url: &str, options: &AssessOptions) -> Result<Assessment, AssessError> {
        let url = normalize_listing_url(url)?;
        let key = build_cache_key(&url, options.variant())?;

        if !options.force {
            if let Some(result) = self.cache.get(&key) {
                info!(url = url.as_str(), key = key.as_str(), "assessment served from cache");
                return Ok(Assessment {
                    url,
                    result,
                    listing: None,
                    from_cache: true,
                });
            }
        }

        let started = Instant::now();
        let render_options = RenderOptions {
            capture_debug: options.capture_debug,
            ..self.render_options.clone()
        };
        info!(url = url.as_str(), renderer = self.renderer.renderer_name(), "assessing listing");
        let raw = self.renderer.render(&url, &render_options).await?;

        // The browser slot is already released; parsing and scoring are CPU-bound
        let matcher = Arc::clone(&self.matcher);
        let listing_url = url.clone();
        let capture_debug = options.capture_debug;
        let (listing, scored) = tokio::task::spawn_blocking(move || {
            let listing = ListingContent {
                debug: capture_debug.then(|| debug_artifacts(&raw)),
                ..extract_listing(&raw, &listing_url)
            };
            let scored = heuristics::score(&listing, &matcher);
            (listing, scored)
        })
        .await
        .map_err(|e| AssessError::Task(e.to_string()))?;

        let baseline = AssessmentResult::from(&scored);
        let context = ListingContext::from_listing(&listing);

        let refined = match &self.llm {
            Some(client) => client.refine(&baseline, &context).await,
            None => baseline,
        };

        let owner_overview = match (&self.overview, options.with_overview) {
            (Some(client), true) => client.generate_overview(&refined, &context).await,
            (None, true) => {
                warn!("overview requested but no overview client is configured");
                None
            }
            _ => None,
        };

        let mut top_fixes = refined.top_fixes.clone();
        top_fixes.truncate(MAX_TOP_FIXES);
        let result = AssessmentResult {
            bonus_summary: Some(compose_bonus_summary(&refined)),
            owner_overview,
            top_fixes,
            ..refined
        };

        self.cache.insert(key, result.clone());
        info!(
            url = url.as_str(),
            overall = result.overall,
            refined = result.refined,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "assessment complete"
        );

        Ok(Assessment {
            url,
            result,
            listing: Some(listing),
            from_cache: false,
        })
    }
}

fn build_cache(max_capacity: u64, ttl: Duration) -> Cache<String, AssessmentResult> {
    Cache::builder()
        .max_capacity(max_capacity)
        .time_to_live(ttl)
        .build()
}

const SECTION_LABELS: [&str; 4] = ["photo gallery", "listing description", "amenity clarity", "trust signals"];

/// One-paragraph read of the strongest and weakest sections plus the top fix
pub fn compose_bonus_summary(assessment: &AssessmentResult) -> String {
    let scores = SECTION_LABELS.into_iter().zip(assessment.section_scores.values());

    let (mut strongest, mut weakest) = (("", 0u8), ("", u8::MAX));
    for (label, score) in scores {
        if strongest.0.is_empty() || score > strongest.1 {
            strongest = (label, score);
        }
        if weakest.0.is_empty() || score < weakest.1 {
            weakest = (label, score);
        }
    }

    let fix_text = match assessment.top_fixes.first() {
        Some(fix) => format!(
            "Lead with {}: {}.",
            fix.reason.to_lowercase(),
            fix.how_to_fix.trim().trim_end_matches('.')
        ),
        None => "Lean into the weakest area to unlock quick wins.".to_string(),
    };

    format!(
        "{} is carrying the experience at {}%. Bring {} up from {}% to balance the stay. {}",
        title_case(strongest.0),
        strongest.1,
        weakest.0,
        weakest.1,
        fix_text
    )
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
