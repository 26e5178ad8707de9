//! # Seed Data Generator
//!
//! Populates the transaction queue with test sales for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 queued transactions (default)
//! cargo run -p duka-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p duka-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p duka-db --bin seed -- --db ./data/duka.db
//! ```
//!
//! ## Generated Transactions
//! Each transaction mimics a till checkout at a Kenyan food kiosk:
//! - 1-3 line items from a fixed menu
//! - Quantities 1-4
//! - 16% VAT computed on the subtotal
//! - No discount
//!
//! Everything lands in `pending` state, ready for a sync worker to drain.

use duka_core::{LineItem, Money, TaxRate, TransactionRecord, STANDARD_VAT_BPS};
use duka_db::{Database, DbConfig};
use std::env;

/// Fixed menu for realistic test data: (SKU, name, unit price in cents).
const MENU: &[(&str, &str, i64)] = &[
    ("JOLLOF-RICE", "Jollof Rice", 18_000),
    ("PILAU", "Beef Pilau", 25_000),
    ("CHAPATI", "Chapati", 4_000),
    ("MANDAZI", "Mandazi", 5_000),
    ("SAMOSA", "Beef Samosa", 8_000),
    ("UGALI-BEEF", "Ugali & Beef Stew", 22_000),
    ("SUKUMA", "Sukuma Wiki", 6_000),
    ("CHAI", "Kenyan Chai", 7_000),
    ("TILAPIA", "Fried Tilapia", 35_000),
    ("NYAMA-CHOMA", "Nyama Choma 1/2kg", 45_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./duka_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
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
                println!("Duka POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of transactions to queue (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./duka_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Duka POS Seed Data Generator");
    println!("===============================");
    println!("Database:     {}", db_path);
    println!("Transactions: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing queue contents
    let existing = db.queue().count_pending().await?;
    if existing > 0 {
        println!("⚠ Queue already has {} pending transactions", existing);
        println!("  Skipping seed to avoid piling on.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Generate transactions
    println!();
    println!("Queueing transactions...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    for seed in 0..count {
        let record = generate_transaction(seed);

        if let Err(e) = db.queue().append(&record).await {
            eprintln!("Failed to queue {}: {}", record.id, e);
            continue;
        }

        generated += 1;

        if generated % 50 == 0 {
            println!("  Queued {} transactions...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Queued {} transactions in {:?}", generated, elapsed);
    println!(
        "  Rate: {:.0} transactions/second",
        generated as f64 / elapsed.as_secs_f64()
    );

    // Verify queue state
    println!();
    println!("Verifying queue...");
    let pending = db.queue().count_pending().await?;
    println!("  Pending: {}", pending);

    let recent = db.queue().list_recent(3).await?;
    for entry in recent {
        println!(
            "  {} → {} ({} items)",
            entry.record.id,
            entry.record.total(),
            entry.record.items.len()
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single queued sale with realistic amounts.
fn generate_transaction(seed: usize) -> TransactionRecord {
    let vat = TaxRate::from_bps(STANDARD_VAT_BPS);

    // 1-3 items per basket, quantities 1-4, walked deterministically
    // off the seed so repeated runs produce the same shapes.
    let item_count = 1 + (seed % 3);
    let mut items = Vec::with_capacity(item_count);

    for slot in 0..item_count {
        let (sku, name, price) = MENU[(seed * 7 + slot * 3) % MENU.len()];
        let quantity = 1 + ((seed + slot) % 4) as i64;
        items.push(LineItem::new(
            format!("prod-{}", (seed * 7 + slot * 3) % MENU.len()),
            sku,
            name,
            price,
            quantity,
        ));
    }

    let subtotal: i64 = items.iter().map(|i| i.line_total_cents).sum();
    let tax = Money::from_cents(subtotal).calculate_tax(vat);
    let total = subtotal + tax.cents();

    TransactionRecord::new(items, subtotal, tax.cents(), 0, total)
}
