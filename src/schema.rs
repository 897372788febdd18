//! Declarative per-entity schema: one table per entity describing the
//! API field name, the storage column, the value kind, and whether a value
//! must be supplied on create. Both the read and write paths of the store
//! are driven from these tables, as is the import pipeline (reference
//! repair, duplicate detection, apply/clear ordering).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Customers,
    Products,
    Sales,
    Invoices,
    Orders,
    Returns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Real,
    Integer,
    Bool,
    /// Stored as a JSON string column, exposed as a structured value.
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub api: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    /// Must be present on create (NOT NULL column without a storage default).
    pub required: bool,
}

pub struct EntitySchema {
    pub fields: &'static [FieldDef],
    /// API names of columns carrying an enforced foreign key. These are the
    /// fields nulled out when a dangling reference is repaired.
    pub references: &'static [&'static str],
    /// Natural unique field (beyond the primary key), e.g. an invoice number.
    pub natural_key: Option<&'static str>,
}

const fn field(api: &'static str, column: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef {
        api,
        column,
        kind,
        required: false,
    }
}

const fn required(api: &'static str, column: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef {
        api,
        column,
        kind,
        required: true,
    }
}

use FieldKind::{Bool, Integer, Json, Real, Text};

static CUSTOMER_FIELDS: &[FieldDef] = &[
    field("id", "id", Text),
    required("name", "name", Text),
    field("email", "email", Text),
    field("phone", "phone", Text),
    field("address", "address", Text),
    field("city", "city", Text),
    field("state", "state", Text),
    field("zip", "zip", Text),
    field("country", "country", Text),
    field("company", "company", Text),
    field("notes", "notes", Text),
    field("avatar", "avatar", Text),
    field("isActive", "is_active", Bool),
    field("storeCredit", "store_credit", Real),
    field("createdAt", "created_at", Text),
    field("updatedAt", "updated_at", Text),
];

static PRODUCT_FIELDS: &[FieldDef] = &[
    field("id", "id", Text),
    required("name", "name", Text),
    field("description", "description", Text),
    required("price", "price", Real),
    field("cost", "cost", Real),
    field("sku", "sku", Text),
    field("category", "category", Text),
    field("stock", "stock", Integer),
    field("minStock", "min_stock", Integer),
    field("image", "image", Text),
    field("isActive", "is_active", Bool),
    field("createdAt", "created_at", Text),
    field("updatedAt", "updated_at", Text),
];

static SALE_FIELDS: &[FieldDef] = &[
    field("id", "id", Text),
    field("customerId", "customer_id", Text),
    field("customerName", "customer_name", Text),
    required("items", "items", Json),
    required("subtotal", "subtotal", Real),
    required("tax", "tax", Real),
    required("discount", "discount", Real),
    required("total", "total", Real),
    required("status", "status", Text),
    required("paymentMethod", "payment_method", Text),
    field("notes", "notes", Text),
    field("invoiceId", "invoice_id", Text),
    field("invoiceNumber", "invoice_number", Text),
    field("createdAt", "created_at", Text),
    field("updatedAt", "updated_at", Text),
];

static INVOICE_FIELDS: &[FieldDef] = &[
    field("id", "id", Text),
    required("number", "number", Text),
    field("customerId", "customer_id", Text),
    field("customerName", "customer_name", Text),
    field("customerEmail", "customer_email", Text),
    field("customerAddress", "customer_address", Text),
    field("customerPhone", "customer_phone", Text),
    required("items", "items", Json),
    required("subtotal", "subtotal", Real),
    required("tax", "tax", Real),
    required("discount", "discount", Real),
    required("total", "total", Real),
    field("paidAmount", "paid_amount", Real),
    required("status", "status", Text),
    required("invoiceType", "invoice_type", Text),
    required("currency", "currency", Text),
    field("dueDate", "due_date", Text),
    field("notes", "notes", Text),
    field("terms", "terms", Text),
    field("bankDetails", "bank_details", Json),
    field("saleId", "sale_id", Text),
    field("createdAt", "created_at", Text),
    field("updatedAt", "updated_at", Text),
];

static ORDER_FIELDS: &[FieldDef] = &[
    field("id", "id", Text),
    required("orderNumber", "order_number", Text),
    field("supplierId", "supplier_id", Text),
    required("supplierName", "supplier_name", Text),
    required("items", "items", Json),
    required("subtotal", "subtotal", Real),
    required("tax", "tax", Real),
    required("discount", "discount", Real),
    required("total", "total", Real),
    required("status", "status", Text),
    required("paymentStatus", "payment_status", Text),
    field("paymentMethod", "payment_method", Text),
    field("expectedDeliveryDate", "expected_delivery_date", Text),
    field("actualDeliveryDate", "actual_delivery_date", Text),
    field("notes", "notes", Text),
    field("createdAt", "created_at", Text),
    field("updatedAt", "updated_at", Text),
];

static RETURN_FIELDS: &[FieldDef] = &[
    field("id", "id", Text),
    required("returnNumber", "return_number", Text),
    field("saleId", "sale_id", Text),
    field("customerId", "customer_id", Text),
    field("customerName", "customer_name", Text),
    required("items", "items", Json),
    required("subtotal", "subtotal", Real),
    required("tax", "tax", Real),
    required("total", "total", Real),
    required("refundAmount", "refund_amount", Real),
    required("refundMethod", "refund_method", Text),
    required("status", "status", Text),
    field("processedBy", "processed_by", Text),
    field("notes", "notes", Text),
    field("createdAt", "created_at", Text),
    field("updatedAt", "updated_at", Text),
];

static CUSTOMERS: EntitySchema = EntitySchema {
    fields: CUSTOMER_FIELDS,
    references: &[],
    natural_key: None,
};

static PRODUCTS: EntitySchema = EntitySchema {
    fields: PRODUCT_FIELDS,
    references: &[],
    natural_key: None,
};

static SALES: EntitySchema = EntitySchema {
    fields: SALE_FIELDS,
    references: &["customerId"],
    natural_key: None,
};

static INVOICES: EntitySchema = EntitySchema {
    fields: INVOICE_FIELDS,
    references: &["customerId"],
    natural_key: Some("number"),
};

static ORDERS: EntitySchema = EntitySchema {
    fields: ORDER_FIELDS,
    references: &[],
    natural_key: Some("orderNumber"),
};

static RETURNS: EntitySchema = EntitySchema {
    fields: RETURN_FIELDS,
    references: &["saleId", "customerId"],
    natural_key: Some("returnNumber"),
};

impl Entity {
    /// Parent collections before the collections that reference them;
    /// settings are handled separately, after all of these.
    pub const APPLY_ORDER: [Entity; 6] = [
        Entity::Customers,
        Entity::Products,
        Entity::Sales,
        Entity::Invoices,
        Entity::Orders,
        Entity::Returns,
    ];

    pub fn all() -> impl Iterator<Item = Entity> {
        Self::APPLY_ORDER.into_iter()
    }

    /// Referencing collections before the collections they point at, so a
    /// bulk clear never trips a foreign key.
    pub fn clear_order() -> impl Iterator<Item = Entity> {
        Self::APPLY_ORDER.into_iter().rev()
    }

    pub fn table(self) -> &'static str {
        match self {
            Entity::Customers => "customers",
            Entity::Products => "products",
            Entity::Sales => "sales",
            Entity::Invoices => "invoices",
            Entity::Orders => "orders",
            Entity::Returns => "returns",
        }
    }

    /// Field name used for this collection in snapshot files.
    pub fn collection(self) -> &'static str {
        self.table()
    }

    pub fn schema(self) -> &'static EntitySchema {
        match self {
            Entity::Customers => &CUSTOMERS,
            Entity::Products => &PRODUCTS,
            Entity::Sales => &SALES,
            Entity::Invoices => &INVOICES,
            Entity::Orders => &ORDERS,
            Entity::Returns => &RETURNS,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl EntitySchema {
    pub fn field(&self, api: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|def| def.api == api)
    }
}
