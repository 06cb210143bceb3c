//! # Seed Data Generator
//!
//! Populates the database with fixture data for development.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults (60 cylinders)
//! cargo run -p cyltrack-db --bin seed
//!
//! # Custom fleet size
//! cargo run -p cyltrack-db --bin seed -- --cylinders 200
//!
//! # Specify database path
//! cargo run -p cyltrack-db --bin seed -- --db ./data/cyltrack.db
//! ```
//!
//! ## Generated Data
//! - One user per role (admin/manager/driver/technician/customer), all with
//!   the password `cyltrack-dev`
//! - A handful of customers with one site each, plus an operator depot
//! - A fleet of cylinders spread across gas types, parked at the depot

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use chrono::Utc;
use std::env;
use uuid::Uuid;

use cyltrack_core::{
    Customer, Cylinder, CylinderStatus, GasType, Location, Role, User,
};
use cyltrack_db::{Database, DbConfig};

/// One fixture account per role.
const USERS: &[(&str, &str, Role)] = &[
    ("admin@cyltrack.example", "Avery Admin", Role::Admin),
    ("manager@cyltrack.example", "Morgan Manager", Role::Manager),
    ("driver@cyltrack.example", "Dru Driver", Role::Driver),
    ("tech@cyltrack.example", "Terry Tech", Role::Technician),
    ("portal@cyltrack.example", "Casey Customer", Role::Customer),
];

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Acme Welding Supply", "ops@acme-welding.example", "welding"),
    ("Bayview Medical Center", "purchasing@bayview-med.example", "medical"),
    ("Gulf Coast Beverages", "orders@gulf-bev.example", "beverage"),
    ("Pinnacle Fabrication", "shop@pinnacle-fab.example", "fabrication"),
];

const GAS_TYPES: &[GasType] = &[
    GasType::Oxygen,
    GasType::Nitrogen,
    GasType::Argon,
    GasType::Co2,
    GasType::Acetylene,
    GasType::Helium,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let db_path = arg_value(&args, "--db").unwrap_or_else(|| "cyltrack.db".to_string());
    let fleet_size: usize = arg_value(&args, "--cylinders")
        .and_then(|v| v.parse().ok())
        .unwrap_or(60);

    println!("Seeding {db_path} with {fleet_size} cylinders");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let now = Utc::now();

    // Users - one per role, shared dev password
    let argon = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = argon
        .hash_password(b"cyltrack-dev", &salt)
        .map_err(|e| format!("hash failed: {e}"))?
        .to_string();

    for (email, name, role) in USERS {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: (*email).to_string(),
            password_hash: password_hash.clone(),
            full_name: (*name).to_string(),
            role: *role,
            is_active: true,
            phone: None,
            address: None,
            license_number: matches!(role, Role::Driver).then(|| "CDL-00042".to_string()),
            vehicle_id: matches!(role, Role::Driver).then(|| "TRK-7".to_string()),
            certification: matches!(role, Role::Technician).then(|| "DOT-2030".to_string()),
            created_at: now,
            last_login: None,
        };
        db.users().insert(&user).await?;
    }
    println!("  {} users", USERS.len());

    // Operator depot
    let depot = Location {
        id: Uuid::new_v4().to_string(),
        customer_id: None,
        name: "Central Depot".to_string(),
        address: Some("100 Fill Station Rd".to_string()),
        city: Some("Houston".to_string()),
        state: Some("TX".to_string()),
        zip_code: Some("77001".to_string()),
        country: Some("US".to_string()),
        is_primary: true,
        created_at: now,
    };
    db.customers().insert_location(&depot).await?;

    // Customers, one site each
    for (index, (name, email, business_type)) in CUSTOMERS.iter().enumerate() {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: (*name).to_string(),
            email: (*email).to_string(),
            phone: Some(format!("555-01{index:02}")),
            address: Some(format!("{} Commerce St", index + 1)),
            city: Some("Houston".to_string()),
            state: Some("TX".to_string()),
            zip_code: Some("77002".to_string()),
            country: Some("US".to_string()),
            business_type: Some((*business_type).to_string()),
            tax_id: Some(format!("74-00000{index:02}")),
            credit_limit_cents: Some(1_000_000),
            payment_terms: Some("net30".to_string()),
            external_id: None,
            barcode: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.customers().insert(&customer).await?;

        let site = Location {
            id: Uuid::new_v4().to_string(),
            customer_id: Some(customer.id.clone()),
            name: format!("{name} - Main Site"),
            address: customer.address.clone(),
            city: customer.city.clone(),
            state: customer.state.clone(),
            zip_code: customer.zip_code.clone(),
            country: customer.country.clone(),
            is_primary: true,
            created_at: now,
        };
        db.customers().insert_location(&site).await?;
    }
    println!("  {} customers", CUSTOMERS.len());

    // Fleet, parked at the depot
    for index in 0..fleet_size {
        let gas_type = GAS_TYPES[index % GAS_TYPES.len()];
        let serial = format!("CYL-{:06}", index + 1);
        let cylinder = Cylinder {
            id: Uuid::new_v4().to_string(),
            barcode: format!("GC{serial:0>8}"),
            serial_number: serial,
            gas_type,
            capacity_liters: 10.0 + (index % 5) as f64 * 10.0,
            pressure_rating_psi: 2000.0 + (index % 3) as f64 * 200.0,
            tare_weight_kg: 20.0 + (index % 5) as f64 * 10.0,
            status: CylinderStatus::Available,
            current_location_id: Some(depot.id.clone()),
            current_customer_id: None,
            last_inspection: None,
            next_inspection: None,
            created_at: now,
            updated_at: now,
        };
        db.cylinders().insert(&cylinder).await?;
    }
    println!("  {fleet_size} cylinders");

    println!("Seed complete");
    Ok(())
}

/// Returns the value following `flag` in argv, if present.
fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
