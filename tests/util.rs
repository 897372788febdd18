#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use serde_json::{json, Map, Value};
use shoplite_lib::{db, migrate, AppState};

/// In-memory database with the full schema applied, backed by `data_dir`
/// for backup files.
pub async fn temp_state(data_dir: &Path) -> AppState {
    let pool = db::open_memory_pool().await.expect("open in-memory pool");
    migrate::apply_migrations(&pool)
        .await
        .expect("apply migrations");
    AppState::new(pool, data_dir.to_path_buf())
}

pub fn obj(value: Value) -> Map<String, Value> {
    value.as_object().expect("json object").clone()
}

pub fn customer(name: &str) -> Value {
    json!({
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
    })
}

pub fn product(name: &str, price: f64) -> Value {
    json!({
        "name": name,
        "price": price,
        "stock": 5,
    })
}

pub fn sale(customer_id: Option<&str>) -> Value {
    json!({
        "customerId": customer_id,
        "items": [
            { "productId": "p-1", "productName": "Widget", "quantity": 2, "unitPrice": 5.0, "total": 10.0 }
        ],
        "subtotal": 10.0,
        "tax": 1.5,
        "discount": 0.0,
        "total": 11.5,
        "status": "completed",
        "paymentMethod": "cash",
    })
}

pub fn invoice(number: &str, customer_id: Option<&str>) -> Value {
    json!({
        "number": number,
        "customerId": customer_id,
        "items": [],
        "subtotal": 100.0,
        "tax": 15.0,
        "discount": 0.0,
        "total": 115.0,
        "status": "draft",
        "invoiceType": "invoice",
        "currency": "USD",
    })
}

pub fn order(number: &str) -> Value {
    json!({
        "orderNumber": number,
        "supplierName": "Acme Wholesale",
        "items": [],
        "subtotal": 40.0,
        "tax": 6.0,
        "discount": 0.0,
        "total": 46.0,
        "status": "pending",
        "paymentStatus": "unpaid",
    })
}

pub fn sale_return(number: &str, sale_id: Option<&str>, customer_id: Option<&str>) -> Value {
    json!({
        "returnNumber": number,
        "saleId": sale_id,
        "customerId": customer_id,
        "items": [],
        "subtotal": 10.0,
        "tax": 1.5,
        "total": 11.5,
        "refundAmount": 11.5,
        "refundMethod": "cash",
        "status": "pending",
    })
}
