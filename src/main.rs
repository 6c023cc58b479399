use clap::{Parser, Subcommand};
use quire::imaging::RustBackend;
use quire::site::{self, BuildOptions};
use quire::{config, output};
use std::path::PathBuf;

/// Shared flags for commands that hash assets.
#[derive(clap::Args, Clone, Default)]
struct CacheArgs {
    /// Ignore the persisted hash cache and report every asset as new
    #[arg(long)]
    no_cache: bool,
}

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Static site generator for article-driven sites")]
#[command(long_about = "\
Static site generator for article-driven sites

Articles are markdown files with TOML front matter. Assets are copied with
content-hashed names, and images become AVIF variants at configured widths.

Project structure:

  site/
  ├── config.toml                  # Site config (optional, see gen-config)
  ├── favicon.ico                  # Copied to the output root
  ├── articles/
  │   ├── hola-mundo.md            # +++ title, date, author, image, link +++
  │   └── about.md                 # top_level = true → /about
  └── assets/
      ├── css/style.css            # → css/style.<hash>.css
      ├── js/script.js             # → js/script.<hash>.js
      └── img/cover.jpg            # → img/cover.<label>.<hash>.avif per variant

Run 'quire gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Project root (config.toml, articles/, assets/)
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Output directory (removed and recreated on build)
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site (the default when no command is given)
    Build(CacheArgs),
    /// Validate config, articles and asset references without writing output
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli
        .command
        .unwrap_or_else(|| Command::Build(CacheArgs::default()))
    {
        Command::Build(cache_args) => {
            let site_config = config::load_config(&cli.source)?;
            init_thread_pool(&site_config.processing);

            println!(
                "==> Building {} \u{2192} {}",
                cli.source.display(),
                cli.output.display()
            );
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_asset_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = site::build(
                &cli.source,
                &cli.output,
                &site_config,
                &RustBackend::new(),
                BuildOptions::new(!cache_args.no_cache),
                Some(tx),
            );
            printer.join().ok();
            let report = result?;

            println!("Cache: {}", report.stats);
            output::print_build_report(&report);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let site_config = config::load_config(&cli.source)?;
            let report = site::check(&cli.source, &site_config)?;
            output::print_check_report(&report);
            println!("==> Project is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Size the global rayon pool from `processing.max_processes`.
///
/// Capped at the number of available cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
