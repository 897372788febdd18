//! The company settings singleton (row id 1). Unlike the entity
//! collections, settings have a fixed typed shape and are written through an
//! upsert rather than per-record inserts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Row;

use super::{Store, StoreError};
use crate::time::now_iso;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanySettings {
    pub company_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_rate: f64,
    pub currency: String,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            company_name: "My Company".to_string(),
            address: None,
            phone: None,
            email: None,
            tax_rate: 0.15,
            currency: "USD".to_string(),
        }
    }
}

impl CompanySettings {
    /// Overlay a partial JSON patch; unknown keys are ignored, missing keys
    /// keep their current value.
    pub fn merged_with(&self, patch: &Value) -> Result<Self, serde_json::Error> {
        let mut base = serde_json::to_value(self)?;
        if let (Some(base_map), Some(patch_map)) = (base.as_object_mut(), patch.as_object()) {
            for (key, value) in patch_map {
                base_map.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(base)
    }
}

impl Store {
    pub async fn company_settings(&self) -> Result<CompanySettings, StoreError> {
        let row = sqlx::query(
            "SELECT company_name, address, phone, email, tax_rate, currency\n             FROM company_settings WHERE id = 1",
        )
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(CompanySettings {
                company_name: row.try_get("company_name")?,
                address: row.try_get("address")?,
                phone: row.try_get("phone")?,
                email: row.try_get("email")?,
                tax_rate: row.try_get("tax_rate")?,
                currency: row.try_get("currency")?,
            }),
            None => Ok(CompanySettings::default()),
        }
    }

    /// Merge a partial patch onto the current settings and persist the
    /// result. A patch whose values do not fit the settings shape surfaces
    /// as `StoreError::InvalidSettings`.
    pub async fn update_company_settings(
        &self,
        patch: &Value,
    ) -> Result<CompanySettings, StoreError> {
        let current = self.company_settings().await?;
        let merged = current.merged_with(patch)?;
        self.replace_company_settings(&merged).await?;
        Ok(merged)
    }

    /// Write the full settings row, creating it if missing. Used by the
    /// restore path to reinstate a snapshot verbatim.
    pub async fn replace_company_settings(
        &self,
        settings: &CompanySettings,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO company_settings (id, company_name, address, phone, email, tax_rate, currency, updated_at)\n             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)\n             ON CONFLICT(id) DO UPDATE SET\n                 company_name = excluded.company_name,\n                 address = excluded.address,\n                 phone = excluded.phone,\n                 email = excluded.email,\n                 tax_rate = excluded.tax_rate,\n                 currency = excluded.currency,\n                 updated_at = excluded.updated_at",
        )
        .bind(&settings.company_name)
        .bind(&settings.address)
        .bind(&settings.phone)
        .bind(&settings.email)
        .bind(settings.tax_rate)
        .bind(&settings.currency)
        .bind(now_iso())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Drop the settings row; the getter falls back to defaults afterwards.
    pub async fn clear_company_settings(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM company_settings WHERE id = 1")
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
