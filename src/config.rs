use std::{env, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub order_store: StoreKind,
    pub rearm_on_startup: bool,
    pub request_timeout: Duration,
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "listingbot".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let order_store = match env::var("ORDER_STORE").ok().as_deref().map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("memory") => StoreKind::Memory,
        _ => StoreKind::Mongo,
    };

    let rearm_on_startup = env::var("REARM_ON_STARTUP")
        .ok()
        .and_then(|s| parse_bool(&s))
        .unwrap_or(true);

    let request_timeout = env::var("REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(100));

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        order_store,
        rearm_on_startup,
        request_timeout,
    }
}
