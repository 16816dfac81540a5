mod cli;

use cachemux::{config, synthesis};

use anyhow::Result;
use cachemux_av::Mp4Box;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "cachemux=trace,cachemux_av=debug".to_string()
        } else {
            "cachemux=info,cachemux_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Run {
            cache,
            output,
            overwrite,
            no_subtitles,
            collect_unmerged,
            open,
        } => run_synthesis(
            cli.config.as_deref(),
            cache,
            output,
            overwrite,
            no_subtitles,
            collect_unmerged,
            open,
        ),
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("cachemux {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_synthesis(
    config_path: Option<&std::path::Path>,
    cache: Option<std::path::PathBuf>,
    output: Option<std::path::PathBuf>,
    overwrite: bool,
    no_subtitles: bool,
    collect_unmerged: bool,
    open: bool,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI overrides
    if cache.is_some() {
        config.cache.root = cache;
    }
    if output.is_some() {
        config.cache.output_dir = output;
    }
    if overwrite {
        config.output.overwrite = true;
    }
    if no_subtitles {
        config.subtitles.enabled = false;
    }
    if collect_unmerged {
        config.output.collect_unmerged = true;
    }
    if open {
        config.output.open_when_done = true;
    }

    let cache_root = config
        .cache
        .root
        .clone()
        .ok_or_else(|| anyhow::anyhow!("No cache root given; pass --cache or set [cache] root"))?;
    if !cache_root.is_dir() {
        anyhow::bail!("Cache root is not a directory: {:?}", cache_root);
    }

    // Startup-fatal when the muxer is absent
    let muxer = Mp4Box::locate(config.tools.mp4box.as_deref())?;
    tracing::info!("Using muxer: {:?}", muxer.executable());

    let engine = synthesis::Synthesizer::new(&config, cache_root, &muxer);
    let summary = engine.run()?;

    println!("\nSynthesis finished in {:.1}s", summary.elapsed.as_secs_f64());
    println!("  Produced:          {}", summary.produced.len());
    println!("  Duplicate-skipped: {}", summary.duplicate_skips);
    println!("  Incomplete:        {}", summary.skipped_incomplete.len());
    println!("  Failed:            {}", summary.failed.len());
    for path in &summary.produced {
        println!("    {}", path.display());
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = cachemux_av::check_tools();
    let mut any_muxer = false;

    for tool in &tools {
        let status = if tool.available {
            any_muxer = true;
            "✓"
        } else {
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if any_muxer {
        println!("MP4Box is available, synthesis can run.");
    } else {
        println!("MP4Box was not found. Install GPAC to enable synthesis.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Cache root: {:?}", config.cache.root);
            println!("  Output dir: {:?}", config.cache.output_dir);
            println!("  Overwrite: {}", config.output.overwrite);
            println!("  Name clash policy: {:?}", config.output.name_clash);
            println!("  Subtitles enabled: {}", config.subtitles.enabled);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Subtitles enabled: {}", config.subtitles.enabled);
            println!("  Name clash policy: {:?}", config.output.name_clash);
        }
    }

    Ok(())
}
