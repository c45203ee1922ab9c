use super::{eq, Store};
use crate::domain::models::{Service, User, UserRole};
use anyhow::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

struct CatalogEntry {
    name: &'static str,
    category: &'static str,
    base_cost: u32,
}

/// The cyber-café / government-services offerings the public site takes
/// requests against. Costs are the KES quote for a standard job.
static CATALOG: Lazy<Vec<CatalogEntry>> = Lazy::new(|| {
    vec![
        CatalogEntry { name: "KRA Services", category: "tax", base_cost: 500 },
        CatalogEntry { name: "eCitizen Services", category: "government", base_cost: 300 },
        CatalogEntry { name: "NTSA Services", category: "transport", base_cost: 1000 },
        CatalogEntry { name: "HELB/HEF Services", category: "education", base_cost: 500 },
        CatalogEntry { name: "TSC Services", category: "education", base_cost: 800 },
        CatalogEntry { name: "NSSF/SHA Services", category: "social", base_cost: 500 },
        CatalogEntry { name: "KUCCPS Services", category: "education", base_cost: 300 },
        CatalogEntry { name: "Business Registration", category: "business", base_cost: 3000 },
        CatalogEntry { name: "Police Clearance", category: "security", base_cost: 1200 },
        CatalogEntry { name: "Typing & Formatting", category: "office", base_cost: 200 },
        CatalogEntry { name: "Printing & Photocopying", category: "office", base_cost: 100 },
        CatalogEntry { name: "Scanning Services", category: "office", base_cost: 100 },
        CatalogEntry { name: "Document Binding", category: "office", base_cost: 150 },
        CatalogEntry { name: "Website Development", category: "software", base_cost: 15000 },
    ]
});

pub async fn seed_all(store: &Store) -> Result<()> {
    seed_admin(store).await?;
    seed_catalog(store).await?;
    Ok(())
}

/// Bootstrap back-office account from env. Skipped when the email already
/// exists so restarts do not duplicate it.
async fn seed_admin(store: &Store) -> Result<()> {
    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@imarisha.local".into());
    let name = std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".into());
    let code = std::env::var("ADMIN_CODE").unwrap_or_else(|_| "0000".into());

    let existing = store
        .users
        .query(&[eq("email", json!(email))], None, Some(1))
        .await?;
    if !existing.is_empty() {
        return Ok(());
    }

    let salt = SaltString::generate(rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(code.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash access code: {}", e))?
        .to_string();

    store
        .users
        .add(User {
            id: Uuid::new_v4(),
            email: email.clone(),
            name,
            hash,
            role: UserRole::Admin,
            is_active: true,
            created_at: Utc::now(),
        })
        .await?;

    tracing::info!("Seeded admin account {email}");
    Ok(())
}

async fn seed_catalog(store: &Store) -> Result<()> {
    if store.services.len().await > 0 {
        return Ok(());
    }

    for entry in CATALOG.iter() {
        store
            .services
            .add(Service {
                id: Uuid::new_v4(),
                name: entry.name.to_string(),
                category: entry.category.to_string(),
                description: None,
                base_cost: Decimal::from(entry.base_cost),
                active: true,
                request_count: 0,
                created_at: Utc::now(),
                created_by: None,
                updated_at: None,
            })
            .await?;
    }

    tracing::info!("Seeded {} catalog services", CATALOG.len());
    Ok(())
}
