//! Embedded sled implementation of [`Store`], one tree per table.
//!
//! Besides plain row storage it provides the three procedures the hosted
//! backend runs server-side, so the API can run without a network backend.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand_core::OsRng;
use serde_json::{json, Value};
use sled::Db;
use std::{collections::HashSet, sync::Arc};

use super::{scalar_text, Query, Row, Store, StoreError};
use crate::clock;

/// Parent table, child table, child column referencing the parent id.
const CASCADES: &[(&str, &str, &str)] = &[("bookings", "booking_services", "booking_id")];

#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Db>,
}

impl LocalStore {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn scan(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        let tree = self.db.open_tree(table)?;
        let mut rows = Vec::new();
        for entry in tree.iter() {
            let (_key, value) = entry?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn matching(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let mut rows: Vec<Row> = self
            .scan(&query.table)?
            .into_iter()
            .filter(|row| query.matches(row))
            .collect();
        rows.sort_by(|a, b| query.compare(a, b));
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn key_of(table: &str, row: &Row) -> Result<String, StoreError> {
        match row.get("id") {
            Some(id) if !id.is_null() => Ok(scalar_text(id)),
            _ => Err(StoreError::InvalidRow(format!("{table} row without id"))),
        }
    }

    fn remove_rows(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let tree = self.db.open_tree(&query.table)?;
        let doomed = self.matching(&Query {
            limit: None,
            ..query.clone()
        })?;
        for row in &doomed {
            tree.remove(Self::key_of(&query.table, row)?)?;
        }

        for (parent, child, column) in CASCADES.iter().filter(|(p, _, _)| *p == query.table) {
            let ids: Vec<Value> = doomed
                .iter()
                .filter_map(|row| row.get("id").cloned())
                .collect();
            if ids.is_empty() {
                continue;
            }
            let removed = self.remove_rows(&Query::table(child).is_in(column, ids))?;
            tracing::debug!(parent, child, count = removed.len(), "cascaded delete");
        }
        Ok(doomed)
    }

    fn authenticate_user(&self, args: &Value) -> Result<Value, StoreError> {
        let username = args["input_username"].as_str().unwrap_or_default();
        let password = args["input_password"].as_str().unwrap_or_default();

        let user = self.scan("users")?.into_iter().find(|u| {
            u.get("username").and_then(Value::as_str) == Some(username)
                && u.get("is_active").and_then(Value::as_bool) != Some(false)
        });

        let verified = user.filter(|u| {
            u.get("password_hash")
                .and_then(Value::as_str)
                .is_some_and(|hash| verify_password(password, hash))
        });

        Ok(match verified {
            Some(u) => json!([{
                "success": true,
                "message": "Login berhasil",
                "user_id": u.get("id").cloned().unwrap_or(Value::Null),
                "username": u.get("username").cloned().unwrap_or(Value::Null),
                "full_name": u.get("full_name").cloned().unwrap_or(Value::Null),
                "role": u.get("role").cloned().unwrap_or(Value::Null),
            }]),
            None => json!([{
                "success": false,
                "message": "Username atau password salah",
            }]),
        })
    }

    fn check_duplicate_booking(&self, args: &Value) -> Result<Value, StoreError> {
        let query = Query::table("bookings")
            .eq("patient_phone", args["p_phone"].clone())
            .eq("appointment_date", args["p_appointment_date"].clone());
        let duplicate = self
            .matching(&query)?
            .iter()
            .any(|b| b.get("status").and_then(Value::as_str) != Some("cancelled"));
        Ok(Value::Bool(duplicate))
    }

    fn daily_booking_stats(&self, args: &Value) -> Result<Value, StoreError> {
        let date = args["p_date"].as_str().unwrap_or_default();
        let bookings = self.scan("bookings")?;
        let status_of = |b: &Row| b.get("status").and_then(Value::as_str).map(str::to_string);

        let total = bookings.len();
        let pending = bookings
            .iter()
            .filter(|b| status_of(b).as_deref() == Some("pending"))
            .count();
        let today_count = bookings
            .iter()
            .filter(|b| b.get("appointment_date").and_then(Value::as_str) == Some(date))
            .count();

        let completed: HashSet<String> = bookings
            .iter()
            .filter(|b| status_of(b).as_deref() == Some("completed"))
            .filter_map(|b| b.get("id").map(scalar_text))
            .collect();
        let total_revenue: i64 = self
            .scan("booking_services")?
            .iter()
            .filter(|item| {
                item.get("booking_id")
                    .is_some_and(|id| completed.contains(&scalar_text(id)))
            })
            .map(|item| {
                let price = item.get("price_numeric").and_then(Value::as_i64).unwrap_or(0);
                let quantity = item.get("quantity").and_then(Value::as_i64).unwrap_or(1);
                price * quantity
            })
            .sum();

        Ok(json!([{
            "total": total,
            "pending": pending,
            "today_count": today_count,
            "total_revenue": total_revenue,
        }]))
    }
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.matching(query)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, StoreError> {
        let tree = self.db.open_tree(table)?;
        let mut batch = sled::Batch::default();
        let mut stored = Vec::with_capacity(rows.len());
        let mut keys = HashSet::new();

        for mut row in rows {
            if row.get("id").map_or(true, Value::is_null) {
                row.insert("id".into(), json!(self.db.generate_id()?));
            }
            row.entry("created_at").or_insert_with(|| json!(clock::now()));

            let key = Self::key_of(table, &row)?;
            if tree.contains_key(&key)? || !keys.insert(key.clone()) {
                return Err(StoreError::Duplicate {
                    table: table.to_string(),
                    id: key,
                });
            }
            batch.insert(key.as_bytes(), serde_json::to_vec(&row)?);
            stored.push(row);
        }

        tree.apply_batch(batch)?;
        self.db.flush_async().await?;
        Ok(stored)
    }

    async fn update(&self, query: &Query, mut patch: Row) -> Result<Vec<Row>, StoreError> {
        patch.remove("id");
        let tree = self.db.open_tree(&query.table)?;
        let mut updated = Vec::new();
        for mut row in self.matching(query)? {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            tree.insert(Self::key_of(&query.table, &row)?, serde_json::to_vec(&row)?)?;
            updated.push(row);
        }
        self.db.flush_async().await?;
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let removed = self.remove_rows(query)?;
        self.db.flush_async().await?;
        Ok(removed)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, StoreError> {
        match function {
            "authenticate_user" => self.authenticate_user(&args),
            "check_duplicate_booking" => self.check_duplicate_booking(&args),
            "get_daily_booking_stats" => self.daily_booking_stats(&args),
            other => Err(StoreError::UnknownProcedure(other.to_string())),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.open_tree("bookings")?;
        Ok(())
    }
}
