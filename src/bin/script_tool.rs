//! Script Tool CLI
//!
//! Normalizes, diffs, compares and classifies script files from disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use botc_scripts::remote::released_or_empty;
use botc_scripts::{
    normalize, similarity, Classifier, EngineConfig, HttpReleasedRoles, InMemoryRegistry, NoReleasedRoles,
    ReleasedRoleLookup, ScriptId, StaticReleasedRoles, VersionContent, VersionDiff,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "script-tool")]
#[command(about = "Inspect Blood on the Clocktower script files")]
struct Cli {
    /// Extra config file layered over the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a script in canonical form
    Normalize {
        file: PathBuf,
    },

    /// Show what changed between two scripts
    Diff {
        old: PathBuf,
        new: PathBuf,
    },

    /// Score how much two rosters overlap (0-100)
    Similarity {
        a: PathBuf,
        b: PathBuf,
        /// The scripts are of different types (full vs teensyville)
        #[arg(long)]
        cross_type: bool,
    },

    /// Count characters and work out edition and homebrewiness
    Classify {
        file: PathBuf,
        /// Official roles file instead of the bundled roster
        #[arg(long)]
        roster: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match EngineConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn read_script(path: &Path) -> Result<VersionContent> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    normalize(&value).with_context(|| format!("normalizing {}", path.display()))
}

fn released_lookup(config: &EngineConfig) -> Box<dyn ReleasedRoleLookup> {
    if !config.remote.enabled {
        return Box::new(NoReleasedRoles);
    }
    match HttpReleasedRoles::new(config.remote.roles_url.clone(), config.remote.timeout()) {
        // Fetch once up front; the classifier may ask more than once
        Ok(lookup) => Box::new(StaticReleasedRoles::new(released_or_empty(&lookup))),
        Err(e) => {
            tracing::warn!(error = %e, "released role lookup disabled");
            Box::new(NoReleasedRoles)
        }
    }
}

fn run(command: Commands, config: &EngineConfig) -> Result<()> {
    match command {
        Commands::Normalize { file } => {
            let content = read_script(&file)?;
            println!("{}", serde_json::to_string_pretty(&content)?);
        }

        Commands::Diff { old, new } => {
            let diff = VersionDiff::between(&read_script(&old)?, &read_script(&new)?);
            if diff.is_empty() {
                println!("✅ No roster changes");
                return Ok(());
            }
            for added in &diff.additions {
                println!("  + {}", added.id);
            }
            for removed in &diff.deletions {
                println!("  - {}", removed.id);
            }
            for changed in &diff.changes {
                println!("  ~ {} (ability changed)", changed.id);
            }
        }

        Commands::Similarity { a, b, cross_type } => {
            let score = similarity(&read_script(&a)?, &read_script(&b)?, !cross_type);
            println!("{}", score);
        }

        Commands::Classify { file, roster } => {
            let content = read_script(&file)?;
            let roster = roster.or_else(|| config.registry.roster_path.clone());
            let registry = match roster {
                Some(path) => InMemoryRegistry::from_roster_file(&path)
                    .with_context(|| format!("loading roster {}", path.display()))?,
                None => InMemoryRegistry::bundled()?,
            };
            let lookup = released_lookup(config);
            let result = Classifier::new(&registry, lookup.as_ref()).classify(ScriptId(0), &content)?;

            if let Some(name) = content.name() {
                println!("📜 {}", name);
            }
            println!("  Homebrewiness: {:?}", result.homebrewiness);
            println!("  Edition:       {}", result.edition.label());
            let counts = &result.counts;
            println!(
                "  Townsfolk {} / Outsiders {} / Minions {} / Demons {}",
                counts.townsfolk, counts.outsiders, counts.minions, counts.demons
            );
            if counts.travellers + counts.fabled + counts.loric > 0 {
                println!(
                    "  Travellers {} / Fabled {} / Loric {}",
                    counts.travellers, counts.fabled, counts.loric
                );
            }
            for character in &result.homebrew {
                println!("  🍺 homebrew: {} ({})", character.name, character.character_type);
            }
            for reference in &result.unresolved {
                println!("  ❓ unknown: {}", reference.id);
            }
            for warning in counts.composition_warnings() {
                println!("  ⚠️  {}", warning);
            }
        }
    }
    Ok(())
}
