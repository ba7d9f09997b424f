//! # Seed Data Generator
//!
//! Populates a development database with a small realistic store:
//! products with opening stock, customers with credit limits, and a
//! couple of demo sales run through the engine so the movement journal
//! and the daily summary have something to show.
//!
//! ## Usage
//! ```bash
//! cargo run -p caja-db --bin seed
//! cargo run -p caja-db --bin seed -- --db ./data/caja.db
//! ```

use std::env;

use caja_core::PaymentMethod;
use caja_db::engine::{NewSale, NewSaleItem};
use caja_db::repository::customer::NewCustomer;
use caja_db::repository::product::NewProduct;
use caja_db::{Database, DbConfig};
use chrono::Utc;
use tracing_subscriber::EnvFilter;

/// (name, barcode, price_cents, cost_cents, tax_rate_bps, stock)
///
/// Basic groceries carry 0 bps (exempt), everything else 16%.
const PRODUCTS: &[(&str, &str, i64, i64, u32, i64)] = &[
    ("Coca-Cola 600ml", "7501055300846", 1900, 1250, 1600, 48),
    ("Agua Ciel 1L", "7501055310005", 1200, 700, 1600, 60),
    ("Sabritas Original 45g", "7500478033812", 1800, 1150, 1600, 35),
    ("Pan Blanco Grande", "7501000111305", 4600, 3100, 0, 12),
    ("Leche Entera 1L", "7501020513080", 2650, 1950, 0, 24),
    ("Huevo Blanco 12pz", "7502208250019", 4200, 3300, 0, 18),
    ("Arroz 1kg", "7501008023624", 3400, 2400, 0, 20),
    ("Frijol Negro 580g", "7501025403026", 2900, 2000, 0, 22),
    ("Aceite Vegetal 850ml", "7501007325012", 4800, 3600, 1600, 15),
    ("Azúcar Estándar 1kg", "7501071300011", 3200, 2300, 0, 16),
    ("Jabón de Barra 200g", "7501026005008", 1700, 1000, 1600, 30),
    ("Papel Higiénico 4r", "7501019006405", 4500, 3000, 1600, 25),
    ("Atún en Agua 140g", "7501048190508", 2400, 1600, 0, 40),
    ("Café Soluble 200g", "7501059275508", 9800, 6900, 1600, 10),
    ("Galletas Marías", "7501000655014", 1600, 1000, 1600, 28),
    ("Cerveza Clara 355ml", "7501064191342", 2200, 1500, 1600, 72),
    ("Tequila Reposado 695ml", "7501035010109", 28900, 19500, 1600, 6),
    ("Detergente en Polvo 1kg", "7501025411001", 5400, 3800, 1600, 14),
];

/// (name, email, phone, credit_limit_cents)
const CUSTOMERS: &[(&str, &str, &str, i64)] = &[
    ("María López", "maria.lopez@example.com", "555-010-2233", 150_000),
    ("Juan Pérez", "juan.perez@example.com", "555-014-8790", 50_000),
    ("Ana Torres", "ana.torres@example.com", "555-019-4412", 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./caja_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Caja POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./caja_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Caja POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Products (opening stock journals itself)
    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    for (name, barcode, price_cents, cost_cents, tax_rate_bps, stock) in PRODUCTS {
        let product = db
            .products()
            .create(NewProduct {
                barcode: Some(barcode.to_string()),
                name: name.to_string(),
                description: None,
                price_cents: *price_cents,
                cost_cents: *cost_cents,
                tax_rate_bps: *tax_rate_bps,
                stock: *stock,
                min_stock: 5,
                max_stock: 100,
                operator_id: "seed".to_string(),
            })
            .await?;
        product_ids.push(product.id);
    }
    println!("✓ Created {} products", product_ids.len());

    // Customers
    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for (name, email, phone, credit_limit_cents) in CUSTOMERS {
        let customer = db
            .customers()
            .create(NewCustomer {
                name: name.to_string(),
                email: Some(email.to_string()),
                phone: Some(phone.to_string()),
                credit_limit_cents: *credit_limit_cents,
            })
            .await?;
        customer_ids.push(customer.id);
    }
    println!("✓ Created {} customers", customer_ids.len());

    // A cash sale with change and a credit sale, through the engine
    let cash = db
        .engine()
        .create_sale(NewSale {
            items: vec![
                NewSaleItem {
                    product_id: product_ids[0].clone(), // Coca-Cola
                    quantity: 2,
                    unit_price_cents: None,
                    tax_rate_bps: None,
                    discount_bps: 0,
                },
                NewSaleItem {
                    product_id: product_ids[2].clone(), // Sabritas
                    quantity: 1,
                    unit_price_cents: None,
                    tax_rate_bps: None,
                    discount_bps: 0,
                },
            ],
            customer_id: None,
            operator_id: "seed".to_string(),
            payment_method: PaymentMethod::Cash,
            order_discount_cents: 0,
            tendered_cents: Some(10000),
            payment_reference: None,
            notes: None,
        })
        .await?;
    println!(
        "✓ Cash sale {} for ${:.2}",
        cash.sale.ticket_number,
        cash.sale.total_cents as f64 / 100.0
    );

    let credit = db
        .engine()
        .create_sale(NewSale {
            items: vec![NewSaleItem {
                product_id: product_ids[4].clone(), // Leche
                quantity: 4,
                unit_price_cents: None,
                tax_rate_bps: None,
                discount_bps: 0,
            }],
            customer_id: Some(customer_ids[0].clone()),
            operator_id: "seed".to_string(),
            payment_method: PaymentMethod::Credit,
            order_discount_cents: 0,
            tendered_cents: None,
            payment_reference: None,
            notes: Some("Fiado semanal".to_string()),
        })
        .await?;
    println!(
        "✓ Credit sale {} for ${:.2}",
        credit.sale.ticket_number,
        credit.sale.total_cents as f64 / 100.0
    );

    // Everything should reconcile
    let audits = db.engine().verify_all_stock().await?;
    let broken = audits.iter().filter(|a| !a.is_consistent()).count();
    println!();
    println!(
        "Stock audit: {} products checked, {} inconsistent",
        audits.len(),
        broken
    );

    let summary = db.sales().daily_summary(Utc::now().date_naive()).await?;
    println!(
        "Today: {} sales, ${:.2} total (${:.2} cash, ${:.2} credit)",
        summary.sales_count,
        summary.total_cents as f64 / 100.0,
        summary.cash_cents as f64 / 100.0,
        summary.credit_cents as f64 / 100.0
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Initializes logging. `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caja=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
