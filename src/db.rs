//! Database schema and operations

use rusqlite::Connection;
use tracing::info;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{ConsumptionRecord, Location, ProductionRecord, Resource};
use crate::propagate::recompute;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Resource catalog
        CREATE TABLE IF NOT EXISTS resources (
            class_name TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            description TEXT NOT NULL
        );

        -- Locations, in collection order
        CREATE TABLE IF NOT EXISTS locations (
            position INTEGER PRIMARY KEY,
            id TEXT NOT NULL,
            name TEXT NOT NULL,
            x REAL NOT NULL,
            y REAL NOT NULL
        );

        -- Upstream links; duplicates and dangling ids are kept as-is
        CREATE TABLE IF NOT EXISTS location_sources (
            location_position INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            source_id TEXT NOT NULL,
            PRIMARY KEY (location_position, seq)
        );

        -- What a location needs
        CREATE TABLE IF NOT EXISTS location_consumption (
            location_position INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            class_name TEXT NOT NULL,
            display_name TEXT NOT NULL,
            description TEXT NOT NULL,
            amount REAL NOT NULL,
            PRIMARY KEY (location_position, seq)
        );

        -- What a location makes; drawn amounts are recomputed on load
        CREATE TABLE IF NOT EXISTS location_production (
            location_position INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            class_name TEXT NOT NULL,
            display_name TEXT NOT NULL,
            description TEXT NOT NULL,
            amount REAL NOT NULL,
            PRIMARY KEY (location_position, seq)
        );
        "#,
    )?;
    Ok(())
}

/// Remove every stored location
pub fn clear_locations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM location_production;
        DELETE FROM location_consumption;
        DELETE FROM location_sources;
        DELETE FROM locations;
        "#,
    )?;
    Ok(())
}

/// Replace the stored collection with `locations`
pub fn save_locations(conn: &Connection, locations: &[Location]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    clear_locations(&tx)?;

    for (position, location) in locations.iter().enumerate() {
        let position = position as i64;
        tx.execute(
            "INSERT INTO locations (position, id, name, x, y) VALUES (?1, ?2, ?3, ?4, ?5)",
            (position, &location.id, &location.name, location.x, location.y),
        )?;

        for (seq, source_id) in location.resource_sources.iter().enumerate() {
            tx.execute(
                "INSERT INTO location_sources (location_position, seq, source_id) VALUES (?1, ?2, ?3)",
                (position, seq as i64, source_id),
            )?;
        }

        for (seq, record) in location.consumption.iter().enumerate() {
            tx.execute(
                "INSERT INTO location_consumption
                 (location_position, seq, class_name, display_name, description, amount)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    position,
                    seq as i64,
                    &record.resource.class_name,
                    &record.resource.display_name,
                    &record.resource.description,
                    record.amount,
                ),
            )?;
        }

        for (seq, record) in location.production.iter().enumerate() {
            tx.execute(
                "INSERT INTO location_production
                 (location_position, seq, class_name, display_name, description, amount)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    position,
                    seq as i64,
                    &record.resource.class_name,
                    &record.resource.display_name,
                    &record.resource.description,
                    record.amount,
                ),
            )?;
        }
    }

    tx.commit()?;
    info!(count = locations.len(), "saved locations");
    Ok(())
}

/// Load the stored collection, propagated
pub fn load_locations(conn: &Connection) -> Result<Vec<Location>> {
    let mut stmt = conn.prepare("SELECT position, id, name, x, y FROM locations ORDER BY position")?;

    let rows = stmt.query_map([], |row| {
        let position: i64 = row.get(0)?;
        let mut location = Location::new(&row.get::<_, String>(1)?, &row.get::<_, String>(2)?);
        location.x = row.get(3)?;
        location.y = row.get(4)?;
        Ok((position, location))
    })?;

    let mut locations = Vec::new();
    for row in rows {
        let (position, mut location) = row?;
        location.resource_sources = get_sources(conn, position)?;
        location.consumption = get_records(conn, "location_consumption", position)?
            .into_iter()
            .map(|(resource, amount)| ConsumptionRecord { resource, amount })
            .collect();
        location.production = get_records(conn, "location_production", position)?
            .into_iter()
            .map(|(resource, amount)| ProductionRecord {
                resource,
                amount,
                consumption: 0.0,
            })
            .collect();
        locations.push(location);
    }

    Ok(recompute(locations))
}

fn get_sources(conn: &Connection, position: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT source_id FROM location_sources WHERE location_position = ?1 ORDER BY seq",
    )?;

    let rows = stmt.query_map([position], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn get_records(conn: &Connection, table: &str, position: i64) -> Result<Vec<(Resource, f64)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT class_name, display_name, description, amount
         FROM {} WHERE location_position = ?1 ORDER BY seq",
        table
    ))?;

    let rows = stmt.query_map([position], |row| {
        Ok((
            Resource {
                class_name: row.get(0)?,
                display_name: row.get(1)?,
                description: row.get(2)?,
            },
            row.get::<_, f64>(3)?,
        ))
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Insert or replace every catalog entry
pub fn save_catalog(conn: &Connection, catalog: &Catalog) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for resource in catalog.iter() {
        tx.execute(
            "INSERT OR REPLACE INTO resources (class_name, display_name, description)
             VALUES (?1, ?2, ?3)",
            (
                &resource.class_name,
                &resource.display_name,
                &resource.description,
            ),
        )?;
    }
    tx.commit()?;
    info!(count = catalog.len(), "saved catalog");
    Ok(())
}

pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    let mut stmt = conn.prepare(
        "SELECT class_name, display_name, description FROM resources ORDER BY class_name",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(Resource {
            class_name: row.get(0)?,
            display_name: row.get(1)?,
            description: row.get(2)?,
        })
    })?;

    let mut catalog = Catalog::new();
    for row in rows {
        catalog.insert(row?);
    }
    Ok(catalog)
}
