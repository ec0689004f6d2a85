//! Factory Planner
//!
//! Plans supply chains for factory-chain games: locations declare what they make and
//! need, link to the locations they draw from, and the planner tracks how much of every
//! output is being used downstream.

mod catalog;
mod db;
mod error;
mod import;
mod models;
mod plan;
mod propagate;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::catalog::Catalog;
use crate::models::{Location, Resource};
use crate::plan::Plan;

#[derive(Parser)]
#[command(name = "factory-planner")]
#[command(about = "Supply graph planner for factory-chain games")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "planner.db", global = true)]
    database: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Replace all locations with those in a JSON export
    Import {
        /// Export document or bare array of locations
        file: PathBuf,
    },

    /// Write all locations to a JSON export document
    Export { file: PathBuf },

    /// Load a resource catalog file or directory into the database
    Catalog { path: PathBuf },

    /// List catalog resources, optionally filtered
    Resources { term: Option<String> },

    /// List all locations
    List,

    /// Show details for a specific location
    Show { id: String },

    /// Create a new location
    Add { name: String },

    /// Give a location a new name
    Rename { id: String, name: String },

    /// Delete a location and every link to it
    Remove { id: String },

    /// Make CONSUMER draw from SOURCE
    Link { consumer: String, source: String },

    /// Remove every link from CONSUMER to SOURCE
    Unlink { consumer: String, source: String },

    /// Set how much of a resource a location needs (0 removes it)
    Consume {
        id: String,
        class_name: String,
        /// Units per minute
        amount: f64,
    },

    /// Set how much of a resource a location makes (0 removes it)
    Produce {
        id: String,
        class_name: String,
        /// Units per minute
        amount: f64,
    },

    /// Show produced, used and spare amounts for every location
    Summary,

    /// Load a small sample plan for testing
    LoadSample,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "factory_planner=debug"
    } else {
        "factory_planner=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Import { file } => {
            let json = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let locations = import::parse_locations(&json)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            let mut plan = Plan::new(db::load_locations(&conn)?);
            plan.replace_all(locations);
            db::save_locations(&conn, plan.locations())?;
            println!("Imported {} locations", plan.locations().len());
        }

        Commands::Export { file } => {
            let locations = db::load_locations(&conn)?;
            let json = import::export_json(&locations)?;
            fs::write(&file, json).with_context(|| format!("Failed to write {}", file.display()))?;
            println!("Exported {} locations to {}", locations.len(), file.display());
        }

        Commands::Catalog { path } => {
            let catalog = Catalog::load(&path)
                .with_context(|| format!("Failed to load catalog from {}", path.display()))?;
            db::save_catalog(&conn, &catalog)?;
            println!("Loaded {} resources", catalog.len());
        }

        Commands::Resources { term } => {
            let catalog = db::load_catalog(&conn)?;
            let resources = match &term {
                Some(term) => catalog.search(term),
                None => catalog.iter().collect(),
            };
            if resources.is_empty() {
                println!("No resources found. Run 'catalog' first.");
            } else {
                println!("{:<40} {}", "Class name", "Name");
                println!("{}", "-".repeat(70));
                for r in resources {
                    println!("{:<40} {}", r.class_name, r.display_name);
                }
            }
        }

        Commands::List => {
            let locations = db::load_locations(&conn)?;
            if locations.is_empty() {
                println!("No locations in database. Run 'import', 'add' or 'load-sample' first.");
            } else {
                println!("{:<12} {:<30} {:>8} {:>8} {:>8}", "ID", "Name", "Sources", "Needs", "Makes");
                println!("{}", "-".repeat(70));
                for l in locations {
                    println!(
                        "{:<12} {:<30} {:>8} {:>8} {:>8}",
                        l.id,
                        l.name,
                        l.resource_sources.len(),
                        l.consumption.len(),
                        l.production.len()
                    );
                }
            }
        }

        Commands::Show { id } => {
            let catalog = db::load_catalog(&conn)?;
            let plan = Plan::new(db::load_locations(&conn)?);
            if let Some(l) = plan.get(&id) {
                print_location(l, &plan, &catalog);
            } else {
                println!("Location '{}' not found", id);
            }
        }

        Commands::Add { name } => {
            let mut plan = Plan::new(db::load_locations(&conn)?);
            let id = plan.add_location(&name)?;
            db::save_locations(&conn, plan.locations())?;
            println!("Added location {}", id);
        }

        Commands::Rename { id, name } => {
            edit(&conn, |plan| plan.rename(&id, &name))?;
        }

        Commands::Remove { id } => {
            edit(&conn, |plan| plan.remove_location(&id).map(|_| ()))?;
        }

        Commands::Link { consumer, source } => {
            edit(&conn, |plan| plan.link(&consumer, &source))?;
        }

        Commands::Unlink { consumer, source } => {
            edit(&conn, |plan| plan.unlink(&consumer, &source))?;
        }

        Commands::Consume {
            id,
            class_name,
            amount,
        } => {
            let resource = db::load_catalog(&conn)?.resolve(&class_name);
            edit(&conn, |plan| plan.set_consumption(&id, resource, amount))?;
        }

        Commands::Produce {
            id,
            class_name,
            amount,
        } => {
            let resource = db::load_catalog(&conn)?.resolve(&class_name);
            edit(&conn, |plan| plan.set_production(&id, resource, amount))?;
        }

        Commands::Summary => {
            let plan = Plan::new(db::load_locations(&conn)?);
            let summary = plan.summary();
            println!("{}", summary);
            for (location, output) in summary.over_drawn() {
                println!(
                    "warning: {} draws {:.2} /min more {} than it makes",
                    location.name,
                    -output.surplus(),
                    output.class_name
                );
            }
        }

        Commands::LoadSample => {
            let plan = Plan::new(sample_locations());
            db::save_locations(&conn, plan.locations())?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

/// Load, apply one edit, save
fn edit<F>(conn: &Connection, apply: F) -> Result<()>
where
    F: FnOnce(&mut Plan) -> error::Result<()>,
{
    let mut plan = Plan::new(db::load_locations(conn)?);
    apply(&mut plan)?;
    db::save_locations(conn, plan.locations())?;
    info!(locations = plan.locations().len(), "plan updated");
    Ok(())
}

fn print_location(l: &Location, plan: &Plan, catalog: &Catalog) {
    println!("Location: {}", l.name);
    println!("  ID: {}", l.id);
    println!("  Position: ({}, {})", l.x, l.y);

    if !l.resource_sources.is_empty() {
        println!("  Draws from:");
        for source in &l.resource_sources {
            match plan.get(source) {
                Some(s) => println!("    {} ({})", s.name, s.id),
                None => println!("    {} (missing)", source),
            }
        }
    }

    if !l.consumption.is_empty() {
        println!("  Needs:");
        for c in &l.consumption {
            let suppliers: Vec<&str> = l
                .resource_sources
                .iter()
                .filter_map(|id| plan.get(id))
                .filter(|s| s.production_of(&c.resource.class_name).is_some())
                .map(|s| s.name.as_str())
                .collect();
            let supplied = if suppliers.is_empty() {
                "no linked supplier".to_string()
            } else {
                format!("from {}", suppliers.join(", "))
            };
            println!(
                "    {} @ {} /min ({})",
                catalog.display_name(&c.resource.class_name),
                c.amount,
                supplied
            );
        }
    }

    if !l.production.is_empty() {
        println!("  Makes:");
        for p in &l.production {
            println!(
                "    {} @ {} /min ({} used, {} spare)",
                catalog.display_name(&p.resource.class_name),
                p.amount,
                p.consumption,
                p.surplus()
            );
        }
    }
}

/// Iron chain with a coal/steel loop, for testing without an import file
fn sample_locations() -> Vec<Location> {
    let iron_ore = Resource::new("desc-ore-iron-c", "Iron Ore", "Raw iron ore.");
    let coal = Resource::new("desc-coal-c", "Coal", "Mined carbon.");
    let iron_ingot = Resource::new("desc-iron-ingot-c", "Iron Ingot", "Smelted iron.");
    let iron_plate = Resource::new("desc-iron-plate-c", "Iron Plate", "Pressed iron.");
    let steel_ingot = Resource::new("desc-steel-ingot-c", "Steel Ingot", "Iron and coal.");

    vec![
        Location::new("loc-1", "Iron Mine").produces(iron_ore.clone(), 240.0),
        Location::new("loc-2", "Coal Mine")
            .with_source("loc-5")
            .consumes(steel_ingot.clone(), 15.0)
            .produces(coal.clone(), 120.0),
        Location::new("loc-3", "Smelter Row")
            .with_source("loc-1")
            .consumes(iron_ore.clone(), 120.0)
            .produces(iron_ingot.clone(), 120.0),
        Location::new("loc-4", "Plate Press")
            .with_source("loc-3")
            .consumes(iron_ingot, 90.0)
            .produces(iron_plate, 60.0),
        Location::new("loc-5", "Foundry")
            .with_source("loc-1")
            .with_source("loc-2")
            .consumes(iron_ore, 90.0)
            .consumes(coal, 90.0)
            .produces(steel_ingot, 90.0),
    ]
}
