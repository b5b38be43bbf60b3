//! stats.rs
//!
//! Статистика ответов для дашборда события.
//!
//! Все вычисления чистые: на вход список ответов, период, текущий момент и
//! смещение локального времени. Границы дня и часа считаются в этом смещении.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::FormResponse;

pub const HOURS_PER_DAY: usize = 24;
/// Самое длинное окно `LastDays`, которое принимает запрос (около 100 лет).
pub const MAX_PERIOD_DAYS: u32 = 36_500;

/// Окно времени для фильтрации ответов.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Period {
    /// Только ответы за текущие локальные сутки.
    Today,
    /// Ответы за последние N дней от текущего момента.
    LastDays(u32),
    #[default]
    All,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid period '{0}': expected 'today', 'all' or a positive number of days")]
pub struct InvalidPeriod(String);

impl FromStr for Period {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Period::All),
            "today" => Ok(Period::Today),
            days => match days.parse::<u32>() {
                Ok(n) if (1..=MAX_PERIOD_DAYS).contains(&n) => Ok(Period::LastDays(n)),
                _ => Err(InvalidPeriod(s.to_string())),
            },
        }
    }
}

impl TryFrom<String> for Period {
    type Error = InvalidPeriod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Today => f.write_str("today"),
            Period::LastDays(n) => write!(f, "{}", n),
            Period::All => f.write_str("all"),
        }
    }
}

impl Period {
    /// Попадает ли момент отправки в окно относительно `now`.
    pub fn contains(
        &self,
        submitted_at: DateTime<Utc>,
        now: DateTime<Utc>,
        offset: &FixedOffset,
    ) -> bool {
        match self {
            Period::All => true,
            Period::Today => local_date(submitted_at, offset) == local_date(now, offset),
            // Окно за пределами диапазона дат chrono покрывает все ответы
            Period::LastDays(days) => Duration::try_days(i64::from(*days))
                .and_then(|window| now.checked_sub_signed(window))
                .map_or(true, |since| submitted_at >= since),
        }
    }
}

fn local_date(at: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    at.with_timezone(offset).date_naive()
}

fn local_hour(at: DateTime<Utc>, offset: &FixedOffset) -> usize {
    at.with_timezone(offset).hour() as usize
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyCount {
    pub hour: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckInStats {
    pub total: usize,
    pub completed: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Growing,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub period: String,
    pub total_responses: usize,
    pub daily_responses: Vec<DailyCount>,
    pub check_in: CheckInStats,
    pub responses_by_hour: Vec<HourlyCount>,
    pub today_responses: usize,
    pub peak_hour: Option<u32>,
    pub best_day: Option<DailyCount>,
    pub trend: Option<Trend>,
}

/// Ответы, попадающие в период, в исходном порядке.
pub fn filter_by_period<'a, I>(
    responses: I,
    period: Period,
    now: DateTime<Utc>,
    offset: &FixedOffset,
) -> Vec<&'a FormResponse>
where
    I: IntoIterator<Item = &'a FormResponse>,
{
    responses
        .into_iter()
        .filter(|r| period.contains(r.submitted_at, now, offset))
        .collect()
}

/// Доля выполненных check-in в процентах; 0 при пустом наборе.
pub fn check_in_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

pub fn compute_stats(
    responses: &[FormResponse],
    period: Period,
    now: DateTime<Utc>,
    offset: &FixedOffset,
) -> DashboardStats {
    let filtered = filter_by_period(responses, period, now, offset);
    let total = filtered.len();

    // Группировка по локальной дате, BTreeMap сразу дает порядок по возрастанию
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut by_hour = [0usize; HOURS_PER_DAY];
    let mut completed = 0;

    for response in &filtered {
        *by_day.entry(local_date(response.submitted_at, offset)).or_insert(0) += 1;
        by_hour[local_hour(response.submitted_at, offset)] += 1;
        if response.checked_in {
            completed += 1;
        }
    }

    let daily_responses: Vec<DailyCount> = by_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect();

    let today = local_date(now, offset);
    let today_responses = daily_responses
        .iter()
        .find(|d| d.date == today)
        .map(|d| d.count)
        .unwrap_or(0);

    // При равенстве побеждает более ранний час
    let peak_hour = by_hour
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .fold(None, |best: Option<(usize, usize)>, (hour, count)| match best {
            Some((_, best_count)) if best_count >= *count => best,
            _ => Some((hour, *count)),
        })
        .map(|(hour, _)| hour as u32);

    let best_day = daily_responses
        .iter()
        .fold(None, |best: Option<&DailyCount>, day| match best {
            Some(b) if b.count >= day.count => best,
            _ => Some(day),
        })
        .cloned();

    let trend = match daily_responses.as_slice() {
        [.., previous, last] if last.count > previous.count => Some(Trend::Growing),
        [.., _, _] => Some(Trend::Declining),
        _ => None,
    };

    DashboardStats {
        period: period.to_string(),
        total_responses: total,
        daily_responses,
        check_in: CheckInStats {
            total,
            completed,
            percentage: check_in_percentage(completed, total),
        },
        responses_by_hour: by_hour
            .iter()
            .enumerate()
            .map(|(hour, count)| HourlyCount {
                hour: hour as u32,
                count: *count,
            })
            .collect(),
        today_responses,
        peak_hour,
        best_day,
        trend,
    }
}
