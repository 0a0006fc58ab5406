//! fontpatch CLI - apply font packages to the game's asset containers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use fontpatch::package::{apply_package, PackageSource};
use fontpatch::patch::FontPatcher;
use fontpatch::registry::{LogicalIndex, SessionConfig};
use fontpatch::schema::{ClassDatabase, TypeTreeSchemas};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("FONTPATCH_BUILD_DATE"),
    " ",
    env!("FONTPATCH_BUILD_TIME"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "fontpatch", version = VERSION)]
#[command(about = "Replace and extend TextMeshPro fonts in the game's asset containers")]
struct Cli {
    /// Debug output (-vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GameArgs {
    /// Game installation folder
    game_path: PathBuf,

    /// Data folder inside the installation
    #[arg(long, default_value = "Last Epoch_Data")]
    data_dir: String,

    /// Extra class layout catalog (JSON)
    #[arg(long, value_name = "JSON")]
    classdata: Option<PathBuf>,

    /// Session settings overriding the defaults (JSON)
    #[arg(long, value_name = "JSON")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a package folder or zip archive and save
    Apply {
        #[command(flatten)]
        game: GameArgs,
        /// Package folder or zip archive
        package: PathBuf,
    },
    /// List the fonts found in both containers
    Fonts {
        #[command(flatten)]
        game: GameArgs,
    },
    /// Print the global and per-font fallback chains
    Fallbacks {
        #[command(flatten)]
        game: GameArgs,
    },
    /// Print one record as a structured description
    Dump {
        #[command(flatten)]
        game: GameArgs,
        /// Logical index (negative for the leaf container)
        #[arg(allow_negative_numbers = true)]
        index: LogicalIndex,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("FONTPATCH_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();
}

fn open_patcher(game: &GameArgs) -> Result<FontPatcher> {
    let mut classes = ClassDatabase::builtin();
    if let Some(path) = &game.classdata {
        let extra = ClassDatabase::from_json_file(path)
            .with_context(|| format!("loading class catalog {}", path.display()))?;
        classes.merge(extra);
    }

    let config = match &game.config {
        Some(path) => {
            let text = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_slice::<SessionConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SessionConfig::default(),
    };

    let data_dir = game.game_path.join(&game.data_dir);
    info!("reading fonts from {}", data_dir.display());
    FontPatcher::open(&data_dir, config, Box::new(TypeTreeSchemas::new(classes)))
        .with_context(|| format!("opening containers in {}", data_dir.display()))
}

fn cmd_apply(game: &GameArgs, package: &Path) -> Result<()> {
    let mut source = PackageSource::open(package)
        .with_context(|| format!("opening package {}", package.display()))?;
    let mut patcher = open_patcher(game)?;

    let summary = apply_package(&mut patcher, &mut source)?;
    debug!("{summary:?}");
    for name in &summary.missing {
        println!("Warning: font not found: {name}");
    }

    info!("saving (may take minutes)");
    patcher.save().context("saving containers")?;
    println!(
        "Done: {} fonts replaced, {} fonts trimmed, {} records added",
        summary.replaced.len(),
        summary.trimmed_fonts,
        summary.source_fonts.len() + summary.atlases.len() + summary.materials.len()
    );
    Ok(())
}

fn cmd_fonts(game: &GameArgs) -> Result<()> {
    let patcher = open_patcher(game)?;
    for (index, font) in patcher.registry().fonts() {
        let name = font
            .get("m_Name")
            .and_then(|v| v.as_str())
            .unwrap_or("<unnamed>");
        let count = patcher.characters(*index).map(|c| c.len()).unwrap_or(0);
        println!(
            "{:>6}  {:<10} {:<40} {count} characters",
            index.to_string(),
            index.side().to_string(),
            name
        );
    }
    Ok(())
}

fn cmd_fallbacks(game: &GameArgs) -> Result<()> {
    let mut patcher = open_patcher(game)?;
    print!("{}", patcher.dump_fallback_graph()?);
    Ok(())
}

fn cmd_dump(game: &GameArgs, index: LogicalIndex) -> Result<()> {
    let patcher = open_patcher(game)?;
    let value = patcher.registry().decoded_field(index)?;
    println!("{}", serde_json::to_string_pretty(&value.to_json())?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Command::Apply { game, package } => cmd_apply(game, package),
        Command::Fonts { game } => cmd_fonts(game),
        Command::Fallbacks { game } => cmd_fallbacks(game),
        Command::Dump { game, index } => cmd_dump(game, *index),
    }
}
