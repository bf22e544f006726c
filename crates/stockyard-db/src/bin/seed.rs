//! # Seed Data Generator
//!
//! Populates the database with demo SKUs and orders for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockyard_dev.db with the default catalogue
//! cargo run -p stockyard-db --bin seed
//!
//! # Also create demo orders
//! cargo run -p stockyard-db --bin seed -- --orders 20
//!
//! # Specify database path
//! cargo run -p stockyard-db --bin seed -- --db ./data/stockyard.db
//! ```
//!
//! ## Generated Data
//! - One SKU per (family, size): `{FAMILY}-{SIZE}`, e.g. `BOLT-M8`
//! - Opening stock 0 - 500, written as inbound movements
//! - Optional pending orders of 1 - 3 lines, which reserve stock and emit
//!   pick tasks exactly like orders placed through the API

use std::env;

use stockyard_core::{LineRequest, NewInventoryItem};
use stockyard_db::{Database, DbConfig};

const SEED_ACTOR: &str = "seed";

/// Product families for realistic test data
const FAMILIES: &[(&str, &str)] = &[
    ("BOLT", "Hex bolt"),
    ("NUT", "Hex nut"),
    ("WASHER", "Flat washer"),
    ("SCREW", "Wood screw"),
    ("ANCHOR", "Wall anchor"),
    ("RIVET", "Blind rivet"),
    ("PIN", "Cotter pin"),
    ("CLAMP", "Hose clamp"),
];

const SIZES: &[&str] = &["M4", "M5", "M6", "M8", "M10", "M12"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut orders: usize = 0;
    let mut db_path = String::from("./stockyard_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    orders = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockyard Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --orders <N>   Number of demo orders to create (default: 0)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockyard_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockyard Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.inventory().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} SKUs", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Registering SKUs...");

    let stock = db.reservations();
    let mut skus = Vec::new();
    let start = std::time::Instant::now();

    for (family_idx, (family, name)) in FAMILIES.iter().enumerate() {
        for (size_idx, size) in SIZES.iter().enumerate() {
            let seed = family_idx * SIZES.len() + size_idx;
            let item = NewInventoryItem {
                sku: format!("{}-{}", family, size),
                product_name: format!("{} {}", name, size),
                on_hand: ((seed * 37) % 501) as i64,
            };

            match stock.register_item(SEED_ACTOR, item).await {
                Ok(created) => skus.push(created),
                Err(e) => eprintln!("Failed to register {}-{}: {}", family, size, e),
            }
        }
    }

    println!("✓ Registered {} SKUs in {:?}", skus.len(), start.elapsed());

    if orders > 0 {
        println!();
        println!("Creating demo orders...");

        let machine = db.order_machine();
        let mut created = 0;

        for n in 0..orders {
            let lines: Vec<LineRequest> = (0..(n % 3) + 1)
                .filter_map(|k| skus.get((n * 7 + k * 11) % skus.len().max(1)))
                .map(|item| LineRequest::new(item.sku.clone(), ((n + 1) % 9 + 1) as i64))
                .collect();

            match machine
                .create_order(SEED_ACTOR, &format!("SO-DEMO-{:04}", n + 1), &lines)
                .await
            {
                Ok(_) => created += 1,
                Err(e) => eprintln!("  Skipped order {}: {}", n + 1, e),
            }
        }

        println!("✓ Created {} of {} orders", created, orders);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
