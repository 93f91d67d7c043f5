use std::env;
use std::path::PathBuf;

/// Hub configuration derived from environment variables.
///
/// Everything has a default so a bare `goldrate-hub` starts against the real
/// provider with auth disabled; production sets `GOLDRATE_KEY` at minimum.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bind: String,
    pub port: u16,
    /// Shared secret gating `/api/*`.  Empty ⇒ gate disabled.
    pub key: String,

    // ── Upstream provider ──────────────────────────────────────────
    pub source_url: String,
    pub fetch_timeout_s: u64,

    // ── Snapshot store ─────────────────────────────────────────────
    pub store: StoreBackend,
    pub db_path: PathBuf,

    // ── Staleness / schedule ───────────────────────────────────────
    pub stale_hours: u64,
    /// Local hours of day (0-23) at which the scheduler refreshes.
    /// Empty ⇒ scheduler disabled.
    pub update_hours: Vec<u32>,
    /// Fixed offset from UTC for "local" above (the board lives in UTC+5).
    pub utc_offset_hours: i32,

    // ── Digit board policy ─────────────────────────────────────────
    pub fold_nine: bool,
    pub track_removals: bool,

    // ── Board frontend ─────────────────────────────────────────────
    pub static_dir: PathBuf,
}

/// Which snapshot store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"))
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_str(name, default))
}

/// Parse a comma-separated list of hours, dropping anything outside 0-23.
/// Result is sorted and deduplicated so the scheduler walks it in day order.
fn parse_update_hours(raw: &str) -> Vec<u32> {
    let mut hours: Vec<u32> = raw
        .split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .filter(|h| *h < 24)
        .collect();
    hours.sort_unstable();
    hours.dedup();
    hours
}

/// An offset of a day or more cannot be a real wall clock; fall back to the
/// default instead of handing the scheduler an unrepresentable zone.
fn bounded_utc_offset(raw: i32, default: i32) -> i32 {
    if (-23..=23).contains(&raw) {
        raw
    } else {
        default
    }
}

fn parse_store_backend(raw: &str) -> StoreBackend {
    match raw.trim().to_lowercase().as_str() {
        "memory" | "mem" => StoreBackend::Memory,
        _ => StoreBackend::Sqlite, // "sqlite" | unknown
    }
}

impl HubConfig {
    pub fn from_env() -> Self {
        Self {
            bind: env_str("GOLDRATE_BIND", "127.0.0.1"),
            port: env_u16("GOLDRATE_PORT", 61480),
            key: env_str("GOLDRATE_KEY", ""),
            source_url: env_str(
                "GOLDRATE_SOURCE_URL",
                "https://m-lombard.kz/ru/api/admin/purities/?format=json",
            ),
            fetch_timeout_s: env_u64("GOLDRATE_FETCH_TIMEOUT_S", 10),
            store: parse_store_backend(&env_str("GOLDRATE_STORE", "sqlite")),
            db_path: env_path("GOLDRATE_DB_PATH", "goldrate.db"),
            stale_hours: env_u64("GOLDRATE_STALE_HOURS", 12),
            update_hours: parse_update_hours(&env::var("GOLDRATE_UPDATE_HOURS").unwrap_or_else(
                |_| "9,12,18".to_string(),
            )),
            utc_offset_hours: bounded_utc_offset(env_i32("GOLDRATE_UTC_OFFSET_HOURS", 5), 5),
            fold_nine: env_bool("GOLDRATE_FOLD_NINE", true),
            track_removals: env_bool("GOLDRATE_TRACK_REMOVALS", true),
            static_dir: env_path("GOLDRATE_STATIC_DIR", "board/dist"),
        }
    }
}
