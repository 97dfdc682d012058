use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How far ahead of the schedule time the buy leg fires.
pub const BUY_OFFSET_SECS: i64 = 30;
/// How far after the schedule time the sell leg fires.
pub const SELL_OFFSET_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    Buy,
    Sell,
}

impl Leg {
    pub fn as_str(self) -> &'static str {
        match self {
            Leg::Buy => "buy",
            Leg::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Leg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegStatus {
    Pending,
    Executed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Empty until the store assigns one.
    pub id: String,
    pub symbol: String,
    pub schedule_time: DateTime<Utc>,
    pub schedule_buy_time: DateTime<Utc>,
    pub schedule_sell_time: DateTime<Utc>,
    pub price: f64,
    pub timestamp: DateTime<Utc>,

    pub buy_status: LegStatus,
    pub sell_status: LegStatus,
    pub buy_executed_at: Option<DateTime<Utc>>,
    pub sell_executed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds an unsaved order with both leg times derived from `schedule_time`.
    pub fn new(symbol: &str, schedule_time: DateTime<Utc>, price: f64, now: DateTime<Utc>) -> Self {
        let (schedule_buy_time, schedule_sell_time) = leg_times(schedule_time);
        Order {
            id: String::new(),
            symbol: symbol.trim().to_uppercase(),
            schedule_time,
            schedule_buy_time,
            schedule_sell_time,
            price,
            timestamp: now,
            buy_status: LegStatus::Pending,
            sell_status: LegStatus::Pending,
            buy_executed_at: None,
            sell_executed_at: None,
        }
    }

    pub fn trigger_time(&self, leg: Leg) -> DateTime<Utc> {
        match leg {
            Leg::Buy => self.schedule_buy_time,
            Leg::Sell => self.schedule_sell_time,
        }
    }

    pub fn status(&self, leg: Leg) -> LegStatus {
        match leg {
            Leg::Buy => self.buy_status,
            Leg::Sell => self.sell_status,
        }
    }

    pub fn mark_executed(&mut self, leg: Leg, at: DateTime<Utc>) {
        match leg {
            Leg::Buy => {
                self.buy_status = LegStatus::Executed;
                self.buy_executed_at = Some(at);
            }
            Leg::Sell => {
                self.sell_status = LegStatus::Executed;
                self.sell_executed_at = Some(at);
            }
        }
    }

    pub fn pending_legs(&self) -> Vec<Leg> {
        [Leg::Buy, Leg::Sell]
            .into_iter()
            .filter(|leg| self.status(*leg) == LegStatus::Pending)
            .collect()
    }
}

/// Returns `(buy, sell)` trigger times for a schedule time.
///
/// NOTE: the offsets are -30s and +60s. Older notes describe one minute and
/// fifteen minutes; the literal values are kept until product confirms.
pub fn leg_times(schedule_time: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        schedule_time - Duration::seconds(BUY_OFFSET_SECS),
        schedule_time + Duration::seconds(SELL_OFFSET_SECS),
    )
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateRequest {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub schedule_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub price: Option<f64>,
}
