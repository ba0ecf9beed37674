// src/db/settings.rs
use crate::errors::ServerError;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "app_name";
const BRANCH_NAME: &str = "branch_name";
const SLOGAN: &str = "slogan";
const LOGO_URL: &str = "logo_url";

/// Branding shown in the page header. Loaded per request and handed to the
/// layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandSettings {
    pub app_name: String,
    pub branch_name: String,
    pub slogan: String,
    pub logo_url: Option<String>,
}

impl Default for BrandSettings {
    fn default() -> Self {
        Self {
            app_name: "Tra cứu giá đất".to_string(),
            branch_name: String::new(),
            slogan: String::new(),
            logo_url: None,
        }
    }
}

/// Missing keys fall back to the defaults.
pub fn load_brand(conn: &Connection) -> Result<BrandSettings, ServerError> {
    let mut brand = BrandSettings::default();

    let mut stmt = conn.prepare("select key, value from brand_settings")?;
    let rows = stmt.query_map([], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?))
    })?;

    for row in rows {
        let (key, value) = row?;
        match key.as_str() {
            APP_NAME => {
                if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                    brand.app_name = v;
                }
            }
            BRANCH_NAME => brand.branch_name = value.unwrap_or_default(),
            SLOGAN => brand.slogan = value.unwrap_or_default(),
            LOGO_URL => brand.logo_url = value.filter(|v| !v.is_empty()),
            _ => {}
        }
    }
    Ok(brand)
}

pub fn save_brand(conn: &Connection, brand: &BrandSettings) -> Result<(), ServerError> {
    let now = Utc::now().naive_utc();
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            r#"
            insert into brand_settings (key, value, updated_at) values (?1, ?2, ?3)
            on conflict(key) do update set value = excluded.value, updated_at = excluded.updated_at
            "#,
        )?;
        stmt.execute(params![APP_NAME, brand.app_name, now])?;
        stmt.execute(params![BRANCH_NAME, brand.branch_name, now])?;
        stmt.execute(params![SLOGAN, brand.slogan, now])?;
        stmt.execute(params![LOGO_URL, brand.logo_url, now])?;
    }
    tx.commit()?;
    Ok(())
}
