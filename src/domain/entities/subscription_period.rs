use chrono::{DateTime, Duration, Months, Utc};
use tracing::warn;

/// Unit of an Apple introductory offer period, as reported by StoreKit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionPeriodUnit {
    Day = 0,
    Week = 1,
    Month = 2,
    Year = 3,
    NotAvailable = 4,
}

impl SubscriptionPeriodUnit {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Day,
            1 => Self::Week,
            2 => Self::Month,
            3 => Self::Year,
            _ => Self::NotAvailable,
        }
    }

    /// Length of `count` consecutive periods of this unit. Month and year
    /// lengths are those of the calendar period starting at `now`.
    pub fn span(self, count: i64, now: DateTime<Utc>) -> Duration {
        let one = match self {
            Self::Day => TimeSpanUnits::new(1, 0, 0),
            Self::Week => TimeSpanUnits::new(7, 0, 0),
            Self::Month => TimeSpanUnits::new(0, 1, 0),
            Self::Year => TimeSpanUnits::new(0, 0, 1),
            Self::NotAvailable => return Duration::zero(),
        };
        scale_duration(one.span_from(now), count)
    }
}

/// A subscription period expressed in calendar units. Only one field is
/// normally non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeSpanUnits {
    pub days: i64,
    pub months: u32,
    pub years: u32,
}

impl TimeSpanUnits {
    pub const fn new(days: i64, months: u32, years: u32) -> Self {
        Self {
            days,
            months,
            years,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.months == 0 && self.years == 0
    }

    /// Adds days, then months, then years. `None` on overflow.
    pub fn add_to(&self, date: DateTime<Utc>) -> Option<DateTime<Utc>> {
        date.checked_add_signed(Duration::try_days(self.days)?)?
            .checked_add_months(Months::new(self.months))?
            .checked_add_months(Months::new(self.years.checked_mul(12)?))
    }

    /// Exact length of this period when it starts at `now`.
    pub fn span_from(&self, now: DateTime<Utc>) -> Duration {
        self.add_to(now)
            .map(|end| end - now)
            .unwrap_or_else(Duration::zero)
    }
}

/// Parses an ISO 8601 duration ("P30D", "P1M", "PT36H", "P1W", ...).
///
/// Years count as 365 days and months as 30 days. A missing or empty string
/// is a zero duration. Anything else that does not parse is logged and also
/// treated as zero.
pub fn parse_duration(period: Option<&str>) -> Duration {
    let period = match period.map(str::trim) {
        None | Some("") => return Duration::zero(),
        Some(period) => period,
    };
    // Weekly billing is by far the most common week-based period.
    if period == "P1W" {
        return Duration::days(7);
    }
    parse_iso8601_duration(period).unwrap_or_else(|| {
        warn!(period, "Unparseable ISO 8601 duration; treating it as zero.");
        Duration::zero()
    })
}

/// Maps a Google Play period string onto calendar units. Known billing
/// periods map to months or years; anything else is taken as a day count.
pub fn parse_period_units(period: Option<&str>) -> TimeSpanUnits {
    match period {
        Some("P1W") => TimeSpanUnits::new(7, 0, 0),
        Some("P1M") => TimeSpanUnits::new(0, 1, 0),
        Some("P3M") => TimeSpanUnits::new(0, 3, 0),
        Some("P6M") => TimeSpanUnits::new(0, 6, 0),
        Some("P1Y") => TimeSpanUnits::new(0, 0, 1),
        other => TimeSpanUnits::new(parse_duration(other).num_days(), 0, 0),
    }
}

/// First billing date strictly after `now`, stepping from `begin` one period
/// at a time. Returns the Unix epoch for an empty period.
pub fn next_billing_date(
    begin: DateTime<Utc>,
    units: TimeSpanUnits,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if units.is_zero() {
        return DateTime::<Utc>::default();
    }
    let mut next = begin;
    // Day-only periods can skip the whole elapsed periods at once.
    if units.months == 0 && units.years == 0 && units.days > 0 && next < now {
        let skipped = (now - next).num_days() / units.days;
        if let Some(jumped) = Duration::try_days(skipped * units.days)
            .and_then(|span| next.checked_add_signed(span))
        {
            next = jumped;
        }
    }
    while next <= now {
        match units.add_to(next) {
            Some(stepped) if stepped > next => next = stepped,
            _ => break,
        }
    }
    next
}

/// Total length of `cycles` consecutive periods, each measured from `now`.
pub fn accumulate_duration(units: TimeSpanUnits, cycles: i64, now: DateTime<Utc>) -> Duration {
    scale_duration(units.span_from(now), cycles)
}

/// `span` repeated `count` times, saturating instead of overflowing.
pub(crate) fn scale_duration(span: Duration, count: i64) -> Duration {
    if count <= 0 {
        return Duration::zero();
    }
    span.num_milliseconds()
        .checked_mul(count)
        .and_then(Duration::try_milliseconds)
        .unwrap_or(Duration::MAX)
}

fn parse_iso8601_duration(text: &str) -> Option<Duration> {
    let rest = text.strip_prefix('P')?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((_, "")) => return None,
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };
    if date_part.is_empty() && time_part.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    let mut last = None;
    for (value, designator) in components(date_part)? {
        let (order, days_per_unit) = match designator {
            'Y' => (0, 365),
            'M' => (1, 30),
            'W' => (2, 7),
            'D' => (3, 1),
            _ => return None,
        };
        if last.is_some_and(|last| order <= last) {
            return None;
        }
        last = Some(order);
        let days = value.parse::<i64>().ok()?.checked_mul(days_per_unit)?;
        total = total.checked_add(&Duration::try_days(days)?)?;
    }

    let mut last = None;
    for (value, designator) in components(time_part)? {
        let order = match designator {
            'H' => 0,
            'M' => 1,
            'S' => 2,
            _ => return None,
        };
        if last.is_some_and(|last| order <= last) {
            return None;
        }
        last = Some(order);
        let part = if designator == 'S' {
            let seconds: f64 = value.parse().ok()?;
            if !seconds.is_finite() || seconds < 0.0 {
                return None;
            }
            Duration::try_milliseconds((seconds * 1000.0).round() as i64)?
        } else {
            let count = value.parse::<i64>().ok()?;
            if designator == 'H' {
                Duration::try_hours(count)?
            } else {
                Duration::try_minutes(count)?
            }
        };
        total = total.checked_add(&part)?;
    }
    Some(total)
}

/// Splits "1Y2M" into [("1", 'Y'), ("2", 'M')].
fn components(part: &str) -> Option<Vec<(&str, char)>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in part.char_indices() {
        if c.is_ascii_digit() || c == '.' {
            continue;
        }
        if i == start {
            return None;
        }
        out.push((&part[start..i], c));
        start = i + c.len_utf8();
    }
    if start != part.len() {
        return None;
    }
    Some(out)
}
