use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::models::OrderCreateRequest;

/// Field name -> message. `_form` is used for errors that belong to no field.
pub type FieldErrors = HashMap<String, String>;

pub const MAX_SYMBOL_LEN: usize = 20;

/// A create payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidOrder {
    pub symbol: String,
    pub schedule_time: DateTime<Utc>,
    pub price: f64,
}

fn symbol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // base/quote pairs like BTC-USDT or BTC/USDT are accepted too
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+([-_/][A-Za-z0-9]+)?$").expect("symbol regex"))
}

pub fn validate_create(req: &OrderCreateRequest) -> Result<ValidOrder, FieldErrors> {
    let mut errs: FieldErrors = HashMap::new();

    let symbol = req.symbol.trim();
    if symbol.is_empty() {
        errs.insert("symbol".into(), "Symbol is required.".into());
    } else if symbol.len() > MAX_SYMBOL_LEN {
        errs.insert(
            "symbol".into(),
            format!("Symbol must be at most {MAX_SYMBOL_LEN} characters."),
        );
    } else if !symbol_re().is_match(symbol) {
        errs.insert("symbol".into(), "Symbol contains invalid characters.".into());
    }

    if req.schedule_time.is_none() {
        errs.insert("scheduleTime".into(), "Schedule time is required.".into());
    }

    match req.price {
        None => {
            errs.insert("price".into(), "Price is required.".into());
        }
        Some(p) if !p.is_finite() || p <= 0.0 => {
            errs.insert("price".into(), "Price must be greater than zero.".into());
        }
        Some(_) => {}
    }

    match (req.schedule_time, req.price) {
        (Some(schedule_time), Some(price)) if errs.is_empty() => Ok(ValidOrder {
            symbol: symbol.to_uppercase(),
            schedule_time,
            price,
        }),
        _ => Err(errs),
    }
}
