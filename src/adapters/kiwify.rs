//! Kiwify purchase notifications: wire format and normalization into
//! [`PurchaseEvent`]. All payload validation happens here, once.

pub mod webhook;

use {
    crate::domain::{
        error::PipelineError,
        id::{Email, OrderId},
        money::MoneyAmount,
        purchase::{Customer, OrderStatus, Product, PurchaseEvent},
    },
    axum::http::HeaderMap,
    chrono::{DateTime, NaiveDateTime, Utc},
    serde::Deserialize,
    serde_json::Value,
};

pub const TOKEN_HEADER: &str = "x-kiwify-token";

/// Token presented by the caller: `x-kiwify-token`, else a bearer token.
pub fn presented_token(headers: &HeaderMap) -> Option<&str> {
    super::auth::header_or_bearer(headers, TOKEN_HEADER)
}

#[derive(Debug, Deserialize)]
struct KiwifyPayload {
    order_id: Option<Value>,
    order_ref: Option<Value>,
    order_status: Option<String>,
    product_id: Option<Value>,
    product_name: Option<String>,
    #[serde(rename = "Product")]
    nested_product: Option<KiwifyProduct>,
    #[serde(alias = "Customer")]
    customer: Option<KiwifyCustomer>,
    sale_amount: Option<Value>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KiwifyProduct {
    product_id: Option<Value>,
    product_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KiwifyCustomer {
    email: Option<String>,
    #[serde(alias = "full_name")]
    name: Option<String>,
    #[serde(alias = "mobile")]
    phone: Option<String>,
}

/// Parse a raw webhook body into the canonical event.
pub fn normalize(body: &[u8]) -> Result<PurchaseEvent, PipelineError> {
    let raw_event: Value = serde_json::from_slice(body)
        .map_err(|e| PipelineError::malformed(format!("body is not JSON: {e}")))?;
    // Postgres TEXT and JSONB cannot hold U+0000.
    if contains_nul(&raw_event) {
        return Err(PipelineError::malformed("payload contains a NUL character"));
    }
    let payload: KiwifyPayload = serde_json::from_value(raw_event.clone())
        .map_err(|e| PipelineError::malformed(format!("unexpected payload shape: {e}")))?;

    let order_id = scalar_text(payload.order_id.as_ref())
        .ok_or_else(|| PipelineError::malformed("missing order_id"))
        .and_then(OrderId::new)?;

    let status = payload
        .order_status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PipelineError::malformed("missing order_status"))
        .and_then(OrderStatus::try_from)?;

    let customer = payload
        .customer
        .ok_or_else(|| PipelineError::malformed("missing customer"))?;
    let email = customer
        .email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| PipelineError::malformed("missing customer.email"))
        .and_then(Email::new)?;

    let nested = payload.nested_product.as_ref();
    let product = Product {
        id: scalar_text(payload.product_id.as_ref())
            .or_else(|| nested.and_then(|p| scalar_text(p.product_id.as_ref()))),
        name: non_blank(payload.product_name.as_deref())
            .or_else(|| nested.and_then(|p| non_blank(p.product_name.as_deref()))),
    };

    Ok(PurchaseEvent {
        order_id,
        order_ref: scalar_text(payload.order_ref.as_ref()),
        product,
        customer: Customer {
            email,
            name: non_blank(customer.name.as_deref()),
            phone: non_blank(customer.phone.as_deref()),
        },
        amount: parse_amount(payload.sale_amount.as_ref())?,
        status,
        provider_created_at: parse_timestamp("created_at", payload.created_at.as_deref())?,
        provider_updated_at: parse_timestamp("updated_at", payload.updated_at.as_deref())?,
        raw_event,
    })
}

/// Order id for the review log, when the body is at least JSON.
pub fn best_effort_order_id(body: &[u8]) -> Option<String> {
    let raw: Value = serde_json::from_slice(body).ok()?;
    scalar_text(raw.get("order_id")).filter(|id| !id.contains('\0'))
}

fn contains_nul(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains('\0'),
        Value::Array(items) => items.iter().any(contains_nul),
        Value::Object(map) => map.iter().any(|(k, v)| k.contains('\0') || contains_nul(v)),
        _ => false,
    }
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_blank(Some(s.as_str())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_amount(value: Option<&Value>) -> Result<Option<MoneyAmount>, PipelineError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => MoneyAmount::parse_decimal(s).map(Some),
        Some(Value::Number(n)) => MoneyAmount::parse_decimal(&n.to_string()).map(Some),
        Some(other) => Err(PipelineError::malformed(format!(
            "invalid sale_amount: {other}"
        ))),
    }
}

fn parse_timestamp(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, PipelineError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(Some(naive.and_utc()));
        }
    }

    Err(PipelineError::malformed(format!(
        "invalid {field}: {raw:?}"
    )))
}
