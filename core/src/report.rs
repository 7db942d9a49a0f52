//! Statistics shapes for the admin console.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Number of monthly buckets reported.
pub const MONTHS_REPORTED: u32 = 12;

/// Identity counts per role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    /// `user` accounts
    pub user: u64,
    /// `organizer` accounts
    pub organizer: u64,
    /// `admin` accounts
    pub admin: u64,
}

/// Event counts per status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// `draft` events
    pub draft: u64,
    /// `published` events
    pub published: u64,
    /// `cancelled` events
    pub cancelled: u64,
}

/// Events in one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// Category label
    pub category: String,
    /// Number of events
    pub count: u64,
}

/// Registrations created in one calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    /// Calendar year
    pub year: i32,
    /// Month, 1..=12
    pub month: u32,
    /// Registrations created in that month
    pub count: u64,
}

/// Identity figures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatistics {
    /// All identities
    pub total: u64,
    /// Identities allowed to log in
    pub active: u64,
    /// Breakdown by role
    pub by_role: RoleCounts,
}

/// Event figures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStatistics {
    /// All events
    pub total: u64,
    /// Events starting after now
    pub upcoming: u64,
    /// Events that already started
    pub past: u64,
    /// Breakdown by status
    pub by_status: StatusCounts,
    /// Breakdown by category, largest first; uncategorised events are omitted
    pub by_category: Vec<CategoryCount>,
}

/// Registration figures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStatistics {
    /// All registration rows, including history
    pub total: u64,
    /// Rows currently holding a seat
    pub active: u64,
    /// Cancelled rows
    pub cancelled: u64,
    /// Rows created per month, oldest month first
    pub monthly: Vec<MonthlyCount>,
}

/// Everything shown on the statistics page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatistics {
    /// Identity figures
    pub users: UserStatistics,
    /// Event figures
    pub events: EventStatistics,
    /// Registration figures
    pub registrations: RegistrationStatistics,
}

/// The `(year, month)` pairs covered by the monthly report, oldest first,
/// ending with the month containing `now`.
#[must_use]
pub fn month_window(now: DateTime<Utc>) -> Vec<(i32, u32)> {
    let current = now.year() * 12 + i32::try_from(now.month0()).unwrap_or(0);
    let span = i32::try_from(MONTHS_REPORTED).unwrap_or(12);
    ((current - span + 1)..=current)
        .map(|index| (index.div_euclid(12), u32::try_from(index.rem_euclid(12)).unwrap_or(0) + 1))
        .collect()
}

/// Start of the first month in [`month_window`].
#[must_use]
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    month_window(now)
        .first()
        .and_then(|&(year, month)| {
            chrono::NaiveDate::from_ymd_opt(year, month, 1)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
        .unwrap_or(now)
}

/// Zero-filled monthly counts from sparse `(year, month, count)` rows.
#[must_use]
pub fn fill_months(now: DateTime<Utc>, rows: &[(i32, u32, u64)]) -> Vec<MonthlyCount> {
    month_window(now)
        .into_iter()
        .map(|(year, month)| MonthlyCount {
            year,
            month,
            count: rows
                .iter()
                .filter(|(y, m, _)| *y == year && *m == month)
                .map(|(_, _, count)| count)
                .sum(),
        })
        .collect()
}

/// Monthly counts tallied from individual timestamps.
#[must_use]
pub fn tally_months(
    now: DateTime<Utc>,
    timestamps: impl IntoIterator<Item = DateTime<Utc>>,
) -> Vec<MonthlyCount> {
    let rows: Vec<(i32, u32, u64)> = timestamps
        .into_iter()
        .map(|t| (t.year(), t.month(), 1))
        .collect();
    fill_months(now, &rows)
}
