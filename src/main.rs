use clap::{Parser, Subcommand};
use rayon::prelude::*;
use rendition::cache::{InvalidationReport, RenditionCache};
use rendition::config::{self, RenditionConfig};
use rendition::imaging::RustBackend;
use rendition::media::{LibraryStore, SourceId};
use rendition::output::{self, WarmOutcome};
use rendition::render::{Renderer, SizeRequest};
use rendition::size::SizeSpec;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;
type LibraryRenderer = Renderer<RustBackend, LibraryStore>;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "rendition")]
#[command(about = "On-demand image renditions with a persistent cache")]
#[command(long_about = "\
On-demand image renditions with a persistent cache

Originals live in a library directory. Every supported image named
NNN-anything.ext (jpg, jpeg, png, gif, webp) is source NNN:

  uploads/
  ├── 64-harbour-at-dusk.jpg       # source 64
  ├── 2024/05/7.png                # source 7 (subdirectories are scanned)
  ├── logo.png                     # no number: not a source
  └── rendition-cache/             # generated renditions (skipped by the scan)
      ├── .htaccess
      ├── 64-150x150-center.jpg
      └── 64-4000x2250-center.jpg

Sizes:
  150 150            exact box; scale to fit, or crop with --crop
  300                width 300, height from the source aspect ratio
  16 9               both terms <= 21: largest 16:9 region of the source

Crop anchors: center, top, bottom, left, right, top-left, top-right,
bottom-left, bottom-right.

Set RUST_LOG=rendition=debug to trace cache hits and crop plans.
Run 'rendition gen-config' to generate a documented rendition.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Library directory (overrides library_dir)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Rendition cache directory (overrides cache_dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Public URL of the cache directory (overrides base_url)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one source at an explicit size
    Render {
        id: SourceId,
        /// Width in pixels ("150", "150px") or a ratio term
        width: String,
        /// Height in pixels, a ratio term, or "auto" (default)
        height: Option<String>,
        /// Crop to fill the box; optional anchor (default center)
        #[arg(long, num_args = 0..=1, default_missing_value = "crop")]
        crop: Option<String>,
    },
    /// Render one source at a configured preset
    Preset { id: SourceId, name: String },
    /// Pre-render presets for many sources in parallel
    Warm {
        /// Sources to render (default: the whole library)
        ids: Vec<SourceId>,
        /// Preset to render; repeat for several (default: all presets)
        #[arg(long = "preset")]
        presets: Vec<String>,
    },
    /// Delete every cached rendition of one source
    Invalidate { id: SourceId },
    /// Delete every cached rendition
    Clear,
    /// Show cache occupancy
    Stats,
    /// List the sources in the library
    Sources,
    /// Print a stock rendition.toml with all options documented
    GenConfig,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing();
    let load = || resolve_config(&cli);

    match &cli.command {
        Command::Render {
            id,
            width,
            height,
            crop,
        } => {
            let spec = SizeSpec::parse(width, height.as_deref(), crop.as_deref())?;
            let renderer = build_renderer(&load()?)?;
            let rendition = renderer.render(*id, &spec)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rendition)?);
            } else {
                output::print_rendition(*id, &spec.to_string(), &rendition);
            }
        }
        Command::Preset { id, name } => {
            let renderer = build_renderer(&load()?)?;
            let rendition = renderer.render_request(*id, &SizeRequest::Named(name.clone()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rendition)?);
            } else {
                output::print_rendition(*id, name, &rendition);
            }
        }
        Command::Warm { ids, presets } => {
            let config = load()?;
            let renderer = build_renderer(&config)?;
            init_thread_pool(&config);
            let outcomes = warm(&renderer, ids, presets);
            if cli.json {
                let entries: Vec<serde_json::Value> = outcomes.iter().map(warm_json).collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                output::print_warm_output(&outcomes);
            }
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            if failed > 0 {
                return Err(format!("{failed} renditions failed").into());
            }
        }
        Command::Invalidate { id } => {
            let report = cache_for(&load()?).invalidate(*id);
            print_report(&id.to_string(), &report, cli.json)?;
            if !report.is_complete() {
                return Err(format!("invalidation of {id} incomplete").into());
            }
        }
        Command::Clear => {
            let report = cache_for(&load()?).invalidate_all();
            print_report("cache", &report, cli.json)?;
            if !report.is_complete() {
                return Err("cache clear incomplete".into());
            }
        }
        Command::Stats => {
            let cache = cache_for(&load()?);
            let stats = cache.stats();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                output::print_stats(cache.dir(), &stats);
            }
        }
        Command::Sources => {
            let config = load()?;
            let store = scan_library(&config)?;
            if cli.json {
                let entries: Vec<_> = store.entries().collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                output::print_sources(store.entries(), &config.library_dir);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean for command output.
///
/// `RUST_LOG` controls the filter; the default shows warnings only.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the config file and apply command-line overrides on top.
fn resolve_config(cli: &Cli) -> CliResult<RenditionConfig> {
    let mut config = config::load_config(&cli.config)?;
    if let Some(library) = &cli.library {
        config.library_dir = library.clone();
    }
    if let Some(cache_dir) = &cli.cache_dir {
        config.cache_dir = cache_dir.clone();
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn cache_for(config: &RenditionConfig) -> RenditionCache {
    RenditionCache::new(&config.cache_dir, &config.base_url)
}

fn scan_library(config: &RenditionConfig) -> CliResult<LibraryStore> {
    Ok(LibraryStore::scan(
        &config.library_dir,
        std::slice::from_ref(&config.cache_dir),
    )?)
}

fn build_renderer(config: &RenditionConfig) -> CliResult<LibraryRenderer> {
    Ok(Renderer::new(
        RustBackend::new(),
        scan_library(config)?,
        cache_for(config),
        config.render_options()?,
    ))
}

/// Render every `(id, preset)` pair on the rayon pool.
///
/// Empty `ids` means every source in the library; empty `presets` means
/// every configured preset. Results come back in `(id, preset)` order.
fn warm(renderer: &LibraryRenderer, ids: &[SourceId], presets: &[String]) -> Vec<WarmOutcome> {
    let ids: Vec<SourceId> = if ids.is_empty() {
        renderer.store().ids().collect()
    } else {
        ids.to_vec()
    };
    let presets: Vec<String> = if presets.is_empty() {
        renderer.presets().keys().cloned().collect()
    } else {
        presets.to_vec()
    };

    let jobs: Vec<(SourceId, String)> = ids
        .iter()
        .flat_map(|id| presets.iter().map(move |p| (*id, p.clone())))
        .collect();

    jobs.into_par_iter()
        .map(|(id, preset)| {
            let result = renderer.render_request(id, &SizeRequest::Named(preset.clone()));
            WarmOutcome { id, preset, result }
        })
        .collect()
}

fn warm_json(outcome: &WarmOutcome) -> serde_json::Value {
    match &outcome.result {
        Ok(rendition) => serde_json::json!({
            "id": outcome.id,
            "preset": outcome.preset,
            "rendition": rendition,
        }),
        Err(e) => serde_json::json!({
            "id": outcome.id,
            "preset": outcome.preset,
            "error": e.to_string(),
        }),
    }
}

fn print_report(scope: &str, report: &InvalidationReport, json: bool) -> CliResult<()> {
    if json {
        let failed: Vec<_> = report.failed().map(|o| o.path.display().to_string()).collect();
        let value = serde_json::json!({ "deleted": report.deleted(), "failed": failed });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        output::print_invalidation(scope, report);
    }
    Ok(())
}

/// Initialize the rayon thread pool based on config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(config: &RenditionConfig) {
    let threads = config::effective_threads(config);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
