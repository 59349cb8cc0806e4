use clap::Parser;
use std::path::{Path, PathBuf};
use stylecache_core::cache::CACHE_DIR_NAME;
use stylecache_core::config::CONFIG_FILE_NAME;
use stylecache_core::{
    ArtifactCache, BuildPipeline, BuildReport, CacheStore, CliOverrides, CommandCompiler,
    ExtensionCompiler, Invalidator, PathResolver, ProjectConfig, ResolvedBuild,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable carrying the runtime mode. Outside `production`,
/// cache entries are kept between runs unless watch is set explicitly.
const RUNTIME_MODE_VAR: &str = "STYLECACHE_ENV";

/// stylecache - Stylesheet builds with an on-disk compile cache
#[derive(Parser, Debug, Clone)]
#[command(name = "stylecache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Stylesheet directories to build
    #[arg(value_name = "DIR")]
    paths: Vec<PathBuf>,

    /// Path to stylecache.json configuration file
    #[arg(short, long, value_name = "FILE")]
    project: Option<PathBuf>,

    /// Store cache entries in this directory instead of a digest-named one
    #[arg(long, value_name = "DIR")]
    build_path: Option<PathBuf>,

    /// Cache root directory (default: ./.build)
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<String>,

    /// Command that compiles .styl files; the source path is appended
    #[arg(long, value_name = "CMD")]
    preprocessor: Option<String>,

    /// Write the concatenated CSS to this file instead of stdout
    #[arg(long, value_name = "FILE")]
    out_file: Option<String>,

    /// Keep running, watching input directories and invalidating changed
    /// cache entries
    #[arg(short, long, conflicts_with = "no_watch")]
    watch: bool,

    /// Clear this build's cache entries first, even outside production
    #[arg(long)]
    no_watch: bool,

    /// Compile everything without reading or writing the cache
    #[arg(long)]
    no_cache: bool,

    /// Delete every cached entry before doing anything else
    #[arg(long)]
    clear: bool,

    /// Initialize a new stylecache project
    #[arg(long)]
    init: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    // Set RUST_LOG=debug for detailed logs, RUST_LOG=info for normal output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.init {
        init_project()?;
        return Ok(());
    }

    let project_root = std::env::current_dir()?;
    let config = load_config(&cli)?;
    let store = open_store(&project_root, &config)?;

    if cli.clear {
        ArtifactCache::new(store.clone()).clear()?;
        if config.paths.is_empty() {
            return Ok(());
        }
    }

    let options = config.resolved_options(default_watch());
    debug!("Watch mode: {}", options.watch);

    let resolver = PathResolver::with_cwd(&project_root);
    let build = resolver.resolve(config.paths.clone(), &options)?;

    info!(
        "Resolved {} folder(s) with {} source file(s)",
        build.path_set.len(),
        build.source_files.len()
    );

    let preprocessor = CommandCompiler::parse(&config.preprocessor)
        .ok_or_else(|| anyhow::anyhow!("The preprocessor command is empty"))?;
    let compiler = ExtensionCompiler::standard(preprocessor);

    let mut pipeline = BuildPipeline::new(store.clone());
    if cli.no_cache {
        pipeline = pipeline.without_cache();
    }

    let report = pipeline.run(&build, &compiler)?;
    write_output(&report, config.out_file.as_deref())?;
    print_failures(&report);

    if config.watcher_requested() {
        watch_mode(&build, &store)?;
    } else if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Write a default stylecache.json and an empty css/ folder
fn init_project() -> anyhow::Result<()> {
    println!("Initializing new stylecache project...");

    ProjectConfig::init_file(Path::new(CONFIG_FILE_NAME))?;
    println!("Created {}", CONFIG_FILE_NAME);

    std::fs::create_dir_all("css")?;
    println!("Created css/ directory");

    println!("\nProject initialized successfully!");
    println!("Run 'stylecache' to build the stylesheets in ./css.");

    Ok(())
}

/// Runtime-mode default for keeping cache entries: on unless running in
/// production
fn default_watch() -> bool {
    std::env::var(RUNTIME_MODE_VAR)
        .map(|mode| mode != "production")
        .unwrap_or(true)
}

/// Load configuration from file (if any) and apply command-line overrides
fn load_config(cli: &Cli) -> anyhow::Result<ProjectConfig> {
    let mut config = if let Some(ref project_path) = cli.project {
        ProjectConfig::from_file(project_path)
            .map_err(|e| anyhow::anyhow!("Failed to load config file: {}", e))?
    } else {
        let default_path = PathBuf::from(CONFIG_FILE_NAME);
        if default_path.exists() {
            ProjectConfig::from_file(&default_path)
                .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", CONFIG_FILE_NAME, e))?
        } else {
            // Without a config file the paths must come from the command line.
            ProjectConfig {
                paths: Vec::new(),
                ..ProjectConfig::default()
            }
        }
    };

    let mut overrides = CliOverrides::default();
    if !cli.paths.is_empty() {
        overrides.paths = Some(cli.paths.clone());
    }
    overrides.build_path = cli.build_path.clone();
    overrides.cache_dir = cli.cache_dir.clone();
    overrides.preprocessor = cli.preprocessor.clone();
    overrides.out_file = cli.out_file.clone();
    if cli.watch {
        overrides.watch = Some(true);
    } else if cli.no_watch {
        overrides.watch = Some(false);
    }

    config.merge(&overrides);
    Ok(config)
}

fn open_store(project_root: &Path, config: &ProjectConfig) -> anyhow::Result<CacheStore> {
    let root = match config.cache_dir {
        Some(ref dir) => project_root.join(dir),
        None => project_root.join(CACHE_DIR_NAME),
    };
    Ok(CacheStore::open(root)?)
}

fn write_output(report: &BuildReport, out_file: Option<&str>) -> anyhow::Result<()> {
    let css = report.css();
    match out_file {
        Some(path) => {
            let path = Path::new(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, css)?;
            info!("Generated: {:?}", path);
        }
        None => println!("{}", css),
    }
    info!(
        "Build finished: {} reused, {} compiled, {} failed",
        report.reused().count(),
        report.compiled().count(),
        report.failed.len()
    );
    Ok(())
}

fn print_failures(report: &BuildReport) {
    for (path, error) in &report.failed {
        eprintln!("\x1b[31merror\x1b[0m [{}]: {}", path.display(), error);
    }
}

/// Watch mode - invalidate cache entries of changed sources
fn watch_mode(build: &ResolvedBuild, store: &CacheStore) -> anyhow::Result<()> {
    use notify::{event::EventKind, Event, RecursiveMode, Watcher};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    let invalidator = Invalidator::for_build(build, store)?;

    // Create a channel to receive file system events
    let (tx, rx) = channel();

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    for dir in &build.path_set {
        watcher.watch(dir, RecursiveMode::Recursive)?;
    }

    eprintln!("Watching for changes... (Press Ctrl+C to stop)");

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                );
                if !relevant {
                    continue;
                }

                match invalidator.invalidate(&event.paths) {
                    Ok(invalidated) if !invalidated.is_empty() => {
                        eprintln!(
                            "Invalidated {} cached file(s); they will be recompiled on the next build",
                            invalidated.len()
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Failed to invalidate cache entries: {}", e),
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                return Err(anyhow::anyhow!("File watcher disconnected"));
            }
        }
    }
}
