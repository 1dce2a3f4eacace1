//! Command line front end for building and checking warscroll rosters.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod app;

use std::{
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{prelude::*, EnvFilter};
use warscroll_core::{
    catalog::GrandAlliance,
    config::{self, AppConfig},
    CatalogLoader, FileStore, RosterBattalionId, RosterStore, RosterUnitId,
};

/// Warscroll - build army rosters and check them against the composition rules
#[derive(Parser, Debug)]
#[command(name = "warscroll")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Named slot to open instead of the default roster
    #[arg(long, global = true)]
    slot: Option<String>,

    /// Catalog file or directory (overrides the configured path)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Directory holding saved rosters (overrides the configured path)
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CatalogSection {
    /// Units with points and categories.
    Units,
    /// Battalions with their requirements.
    Battalions,
    /// Command traits and artifacts.
    Abilities,
    /// Allegiances and their army options.
    Allegiances,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// List catalog entries
    Catalog {
        #[arg(value_enum, default_value = "units")]
        section: CatalogSection,
    },

    /// Show the roster, its composition and battalion requirements
    Show {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a unit by catalog id
    AddUnit {
        unit: String,
        /// Number of unit-size blocks
        #[arg(short, long)]
        count: Option<u32>,
    },

    /// Change how many unit-size blocks a roster unit has
    SetCount { unit: RosterUnitId, count: u32 },

    /// Remove a roster unit
    RemoveUnit { unit: RosterUnitId },

    /// Add a battalion by catalog id
    AddBattalion { battalion: String },

    /// Remove a roster battalion
    RemoveBattalion { battalion: RosterBattalionId },

    /// Choose the general; omit the unit to clear it
    SetGeneral { unit: Option<RosterUnitId> },

    /// Pick a weapon option for one of a unit's option groups
    SetWeapon {
        unit: RosterUnitId,
        /// Zero-based option group
        slot: usize,
        option: String,
        /// Number of models carrying the option
        #[arg(long)]
        count: Option<u32>,
    },

    /// Give a command trait or artifact to a unit
    AddAbility {
        unit: RosterUnitId,
        ability: String,
        /// Skip the eligibility check
        #[arg(long)]
        force: bool,
    },

    /// Take an ability away from a unit
    RemoveAbility { unit: RosterUnitId, ability: String },

    /// Set the army option value for the current allegiance
    SetArmyOption { value: String },

    /// Switch allegiance by catalog id
    SetAllegiance { allegiance: String },

    /// Switch grand alliance (chaos, order, death, destruction)
    SetGrandAlliance { grand_alliance: GrandAlliance },

    /// Rename the roster
    Rename { name: String },

    /// List named slots
    Slots,

    /// Save the roster under a named slot
    SaveAs { name: String },

    /// Restore a named slot, or the default slot when omitted
    Load { name: Option<String> },

    /// Delete a named slot
    DeleteSlot { name: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    config::ensure_default_config()?;
    let mut config = AppConfig::load()?;
    if let Some(catalog) = args.catalog {
        config.catalog_path = catalog;
    }
    if let Some(data_root) = args.data_root {
        config.data_root = data_root;
    }

    init_logging(&config)?;

    let loader = CatalogLoader::new(&config.catalog_path);
    let catalog = loader.catalog()?;
    let mut store = RosterStore::open(Arc::clone(&catalog), FileStore::new(&config.data_root))
        .with_context(|| format!("failed to open rosters in {}", config.data_root.display()))?
        .with_battleline_tiers(config.battleline_tiers);

    if let Some(slot) = args.slot.as_deref() {
        if !store.load(Some(slot))? {
            anyhow::bail!("slot {slot:?} is empty; create it with save-as");
        }
    }

    app::execute(&mut store, args.command, &mut io::stdout().lock())
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = config.log_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("warscroll.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::from_default_env();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
