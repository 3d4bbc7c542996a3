//! Aggregate agent performance: weekly rates, bonuses and the stock-photo deadline.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::DaDeskConfig;
use crate::workflow::DeliveryOutcome;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRules {
    pub sla_bonus_naira: u32,
    pub weekly_rate_threshold_percent: f64,
    pub weekly_bonus_naira: u32,
    pub photo_audit_weekday: Weekday,
    pub photo_audit_hour: u32,
}

impl Default for PerformanceRules {
    fn default() -> Self {
        Self::from(&DaDeskConfig::default())
    }
}

impl From<&DaDeskConfig> for PerformanceRules {
    fn from(config: &DaDeskConfig) -> Self {
        Self {
            sla_bonus_naira: config.workflow.sla_bonus_naira,
            weekly_rate_threshold_percent: config.performance.weekly_rate_threshold_percent,
            weekly_bonus_naira: config.performance.weekly_bonus_naira,
            photo_audit_weekday: config.performance.photo_audit_weekday,
            photo_audit_hour: config.performance.photo_audit_hour,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub orders_assigned: u32,
    pub deliveries_completed: u32,
    pub deliveries_within_sla: u32,
    /// (delivered / assigned) x 100; None with nothing assigned
    pub delivery_rate_percent: Option<f64>,
    /// Share of deliveries inside the SLA window; None with nothing delivered
    pub sla_compliance_percent: Option<f64>,
    pub sla_bonus_naira: u32,
    pub rate_bonus_naira: u32,
    pub strike_count: u32,
}

impl WeeklyStats {
    pub fn total_bonus_naira(&self) -> u32 {
        self.sla_bonus_naira + self.rate_bonus_naira
    }
}

fn percent(part: u32, whole: u32) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64 * 100.0)
}

/// Summarise one week of workflow outcomes. Every outcome counts as an
/// assigned order, including blocked ones.
pub fn weekly_stats(outcomes: &[DeliveryOutcome], strike_count: u32, rules: &PerformanceRules) -> WeeklyStats {
    let orders_assigned = outcomes.len() as u32;
    let deliveries_completed = outcomes.iter().filter(|o| o.is_delivered()).count() as u32;
    let deliveries_within_sla = outcomes
        .iter()
        .filter(|o| o.is_delivered() && o.bonus_eligible())
        .count() as u32;

    let delivery_rate_percent = percent(deliveries_completed, orders_assigned);
    let rate_bonus_naira = match delivery_rate_percent {
        Some(rate) if rate >= rules.weekly_rate_threshold_percent => rules.weekly_bonus_naira,
        _ => 0,
    };

    WeeklyStats {
        orders_assigned,
        deliveries_completed,
        deliveries_within_sla,
        delivery_rate_percent,
        sla_compliance_percent: percent(deliveries_within_sla, deliveries_completed),
        sla_bonus_naira: deliveries_within_sla * rules.sla_bonus_naira,
        rate_bonus_naira,
        strike_count,
    }
}

/// The next stock-photo deadline strictly after `now` (local wall-clock time).
pub fn next_photo_deadline(now: NaiveDateTime, rules: &PerformanceRules) -> NaiveDateTime {
    let target = rules.photo_audit_weekday.num_days_from_monday() as i64;
    let today = now.weekday().num_days_from_monday() as i64;
    let days_ahead = (target - today).rem_euclid(7);

    let time = NaiveTime::from_hms_opt(rules.photo_audit_hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let candidate = (now.date() + Duration::days(days_ahead)).and_time(time);

    if candidate <= now {
        candidate + Duration::days(7)
    } else {
        candidate
    }
}

/// Time left until the next stock-photo deadline, shown as "Xh Ym".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoAuditCountdown(pub Duration);

impl std::fmt::Display for PhotoAuditCountdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hours = self.0.num_hours();
        let minutes = self.0.num_minutes() % 60;
        write!(f, "{hours}h {minutes}m")
    }
}

pub fn photo_audit_countdown(now: NaiveDateTime, rules: &PerformanceRules) -> PhotoAuditCountdown {
    PhotoAuditCountdown(next_photo_deadline(now, rules) - now)
}
