//! Seasonal factor computation and deseasonalization.
//!
//! Observations are bucketed into (period, position-within-period) cells by
//! calendar arithmetic: ISO week numbering with weekday positions for weekly
//! periods, calendar boundaries otherwise. Each position's multiplicative
//! factor is its cross-period average divided by the overall average, so a
//! factor of 1.2 means "this weekday runs 20% hot". Dividing values by their
//! position factor removes the seasonal component; multiplying restores it.
//!
//! Malformed timestamps never fail a pass: such rows simply fall outside
//! every cell and keep their value untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use spc_common::{Observation, SeasonalFactors};
use spc_math::{mean, round4};

/// Seasonal period designators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// ISO week, 7 weekday positions.
    Week,
    /// Calendar month, day-of-month positions.
    Month,
    /// Calendar quarter, 3 month positions.
    Quarter,
    /// Calendar year, 12 month positions.
    Year,
}

impl Period {
    /// Number of positions within one period.
    pub fn positions(self) -> usize {
        match self {
            Period::Week => 7,
            Period::Month => 31,
            Period::Quarter => 3,
            Period::Year => 12,
        }
    }

    /// Approximate period length in days, for span checks.
    fn approx_days(self) -> f64 {
        match self {
            Period::Week => 7.0,
            Period::Month => 31.0,
            Period::Quarter => 92.0,
            Period::Year => 366.0,
        }
    }

    /// Largest sampling gap (days) still considered finer than this period.
    ///
    /// Day-position periods need daily-or-finer data; month-position periods
    /// accept monthly data.
    fn max_sample_gap_days(self) -> f64 {
        match self {
            Period::Week | Period::Month => 1.5,
            Period::Quarter | Period::Year => 32.0,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Week => write!(f, "week"),
            Period::Month => write!(f, "month"),
            Period::Quarter => write!(f, "quarter"),
            Period::Year => write!(f, "year"),
        }
    }
}

/// A (period, position) bucket assignment for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PeriodCell {
    /// Period key: (ISO year, ISO week) for weeks, calendar derivations
    /// otherwise.
    pub period: (i32, u32),

    /// Zero-based position within the period.
    pub position: usize,
}

/// Caller-facing data-quality notes from a seasonal pass.
///
/// Warnings, never failures: the factors are still produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalWarning {
    /// The series spans less than one full period; factors will be
    /// near-uniform.
    SpanShorterThanPeriod,
    /// Periods hold unequal observation counts under grouping.
    UnevenPeriods,
}

/// Parse a timestamp leniently: RFC 3339, then common date-time layouts,
/// then a plain date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for layout in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn cell_for(dt: NaiveDateTime, period: Period) -> PeriodCell {
    match period {
        Period::Week => {
            let iso = dt.iso_week();
            PeriodCell {
                period: (iso.year(), iso.week()),
                position: dt.weekday().num_days_from_monday() as usize,
            }
        }
        Period::Month => PeriodCell {
            period: (dt.year(), dt.month()),
            position: (dt.day() - 1) as usize,
        },
        Period::Quarter => PeriodCell {
            period: (dt.year(), (dt.month() - 1) / 3),
            position: ((dt.month() - 1) % 3) as usize,
        },
        Period::Year => PeriodCell {
            period: (dt.year(), 0),
            position: (dt.month() - 1) as usize,
        },
    }
}

/// Bucket each observation into its (period, position) cell.
///
/// Aligned 1:1 with the input; unparsable timestamps yield `None`.
pub fn periodize(series: &[Observation], period: Period) -> Vec<Option<PeriodCell>> {
    series
        .iter()
        .map(|obs| parse_timestamp(&obs.timestamp).map(|dt| cell_for(dt, period)))
        .collect()
}

/// Compute multiplicative seasonal factors for a series.
///
/// Without grouping, each position's factor is the mean of its raw values
/// divided by the overall mean. With grouping, values sharing a (period,
/// position) cell are summed first and the cell sums take the raw values'
/// place. Factors round to 4 decimals; empty positions and a zero overall
/// mean fall back to the neutral 1.0.
pub fn compute_factors(series: &[Observation], period: Period, grouped: bool) -> SeasonalFactors {
    let cells = periodize(series, period);
    let positions = period.positions();

    // Either raw values per observation, or cell sums under grouping.
    let samples: Vec<(usize, f64)> = if grouped {
        let mut cell_sums: BTreeMap<PeriodCell, f64> = BTreeMap::new();
        for (obs, cell) in series.iter().zip(&cells) {
            if let Some(cell) = cell {
                *cell_sums.entry(*cell).or_insert(0.0) += obs.value;
            }
        }
        cell_sums
            .into_iter()
            .map(|(cell, sum)| (cell.position, sum))
            .collect()
    } else {
        series
            .iter()
            .zip(&cells)
            .filter_map(|(obs, cell)| cell.map(|c| (c.position, obs.value)))
            .collect()
    };

    let overall: Vec<f64> = samples.iter().map(|(_, v)| *v).collect();
    let overall_mean = mean(&overall);
    if overall_mean == 0.0 {
        debug!("seasonal factors neutral: zero overall mean");
        return SeasonalFactors {
            factors: vec![1.0; positions],
        };
    }

    let mut sums = vec![0.0; positions];
    let mut counts = vec![0usize; positions];
    for (position, value) in samples {
        if position < positions {
            sums[position] += value;
            counts[position] += 1;
        }
    }

    let factors = (0..positions)
        .map(|p| {
            if counts[p] == 0 {
                1.0
            } else {
                round4((sums[p] / counts[p] as f64) / overall_mean)
            }
        })
        .collect();

    SeasonalFactors { factors }
}

/// Divide each value by its position's factor.
///
/// Unparsable timestamps and zero factors leave the value untouched.
pub fn deseasonalize(
    series: &[Observation],
    factors: &SeasonalFactors,
    period: Period,
) -> Vec<Observation> {
    scale(series, factors, period, |value, factor| value / factor)
}

/// Multiply each value back by its position's factor (the inverse of
/// [`deseasonalize`]).
pub fn reseasonalize(
    series: &[Observation],
    factors: &SeasonalFactors,
    period: Period,
) -> Vec<Observation> {
    scale(series, factors, period, |value, factor| value * factor)
}

fn scale(
    series: &[Observation],
    factors: &SeasonalFactors,
    period: Period,
    apply: impl Fn(f64, f64) -> f64,
) -> Vec<Observation> {
    let cells = periodize(series, period);
    series
        .iter()
        .zip(&cells)
        .map(|(obs, cell)| {
            let factor = cell.map(|c| factors.get(c.position)).unwrap_or(1.0);
            let value = if factor == 0.0 {
                obs.value
            } else {
                apply(obs.value, factor)
            };
            Observation {
                timestamp: obs.timestamp.clone(),
                value,
                confidence: obs.confidence,
            }
        })
        .collect()
}

/// Data-quality warnings for a seasonal pass over this series.
pub fn season_warnings(series: &[Observation], period: Period, grouped: bool) -> Vec<SeasonalWarning> {
    let mut warnings = Vec::new();

    let stamps: Vec<NaiveDateTime> = series
        .iter()
        .filter_map(|o| parse_timestamp(&o.timestamp))
        .collect();
    if let (Some(first), Some(last)) = (stamps.first(), stamps.last()) {
        let span_days = (*last - *first).num_seconds() as f64 / 86_400.0;
        if span_days < period.approx_days() {
            warnings.push(SeasonalWarning::SpanShorterThanPeriod);
        }
    }

    if grouped {
        let mut per_period: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        for cell in periodize(series, period).into_iter().flatten() {
            *per_period.entry(cell.period).or_insert(0) += 1;
        }
        let counts: Vec<usize> = per_period.values().copied().collect();
        if let (Some(min), Some(max)) = (counts.iter().min(), counts.iter().max()) {
            if min != max {
                warnings.push(SeasonalWarning::UnevenPeriods);
            }
        }
    }

    warnings
}

/// Median gap between consecutive parseable timestamps, in days.
pub fn sampling_gap_days(series: &[Observation]) -> Option<f64> {
    let stamps: Vec<NaiveDateTime> = series
        .iter()
        .filter_map(|o| parse_timestamp(&o.timestamp))
        .collect();
    if stamps.len() < 2 {
        return None;
    }
    let gaps: Vec<f64> = stamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64 / 86_400.0)
        .collect();
    Some(spc_math::median(&gaps))
}

/// Periods legal for this series' sampling granularity.
///
/// A period is allowed only when the data is sampled finer than the
/// period's positions resolve: monthly data cannot be weekly-adjusted.
pub fn allowed_periods(series: &[Observation]) -> Vec<Period> {
    let Some(gap) = sampling_gap_days(series) else {
        return Vec::new();
    };
    [Period::Week, Period::Month, Period::Quarter, Period::Year]
        .into_iter()
        .filter(|p| gap <= p.max_sample_gap_days())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Daily series starting on a Monday (2026-01-05), `weeks` weeks long,
    /// with a per-weekday value profile.
    fn daily_series(weeks: usize, profile: &[f64; 7]) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        (0..weeks * 7)
            .map(|i| {
                let date = start + chrono::Days::new(i as u64);
                Observation::new(date.format("%Y-%m-%d").to_string(), profile[i % 7])
            })
            .collect()
    }

    #[test]
    fn parse_timestamp_accepts_common_layouts() {
        assert!(parse_timestamp("2026-01-05").is_some());
        assert!(parse_timestamp("2026-01-05T12:30:00").is_some());
        assert!(parse_timestamp("2026-01-05 12:30:00").is_some());
        assert!(parse_timestamp("2026-01-05T12:30:00+02:00").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn weekly_cells_use_iso_weeks_and_weekday_positions() {
        // 2026-01-05 is a Monday in ISO week 2.
        let cell = cell_for(
            parse_timestamp("2026-01-05").unwrap(),
            Period::Week,
        );
        assert_eq!(cell.period, (2026, 2));
        assert_eq!(cell.position, 0);

        let sunday = cell_for(parse_timestamp("2026-01-11").unwrap(), Period::Week);
        assert_eq!(sunday.period, (2026, 2));
        assert_eq!(sunday.position, 6);
    }

    #[test]
    fn quarter_and_year_cells() {
        let dt = parse_timestamp("2026-08-15").unwrap();
        let q = cell_for(dt, Period::Quarter);
        assert_eq!(q.period, (2026, 2)); // Q3, zero-based
        assert_eq!(q.position, 1); // August is the quarter's second month

        let y = cell_for(dt, Period::Year);
        assert_eq!(y.period, (2026, 0));
        assert_eq!(y.position, 7);
    }

    #[test]
    fn weekly_factors_reflect_the_weekday_profile() {
        // Mondays run double, Sundays half, the rest at 1.0 of a base of 10.
        let profile = [20.0, 10.0, 10.0, 10.0, 10.0, 10.0, 5.0];
        let series = daily_series(4, &profile);
        let factors = compute_factors(&series, Period::Week, false);

        let overall = mean(&profile);
        assert_eq!(factors.factors.len(), 7);
        assert_eq!(factors.factors[0], round4(20.0 / overall));
        assert_eq!(factors.factors[1], round4(10.0 / overall));
        assert_eq!(factors.factors[6], round4(5.0 / overall));
    }

    #[test]
    fn empty_positions_default_to_neutral() {
        // Only Mondays observed: every other weekday stays at 1.0.
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let series: Vec<Observation> = (0..4)
            .map(|w| {
                let date = start + chrono::Days::new(7 * w as u64);
                Observation::new(date.format("%Y-%m-%d").to_string(), 10.0)
            })
            .collect();
        let factors = compute_factors(&series, Period::Week, false);
        assert_eq!(factors.factors[0], 1.0); // Mondays == overall mean
        assert_eq!(factors.factors[1], 1.0); // empty position
        assert_eq!(factors.factors[6], 1.0);
    }

    #[test]
    fn zero_overall_mean_is_all_neutral() {
        let profile = [0.0; 7];
        let series = daily_series(2, &profile);
        let factors = compute_factors(&series, Period::Week, false);
        assert!(factors.factors.iter().all(|f| *f == 1.0));
    }

    #[test]
    fn deseasonalize_flattens_the_profile() {
        let profile = [20.0, 10.0, 10.0, 10.0, 10.0, 10.0, 5.0];
        let series = daily_series(4, &profile);
        let factors = compute_factors(&series, Period::Week, false);
        let adjusted = deseasonalize(&series, &factors, Period::Week);

        // Every adjusted value lands near the overall mean.
        let overall = mean(&profile);
        for obs in &adjusted {
            assert!(
                (obs.value - overall).abs() < 0.05,
                "{} not near {}",
                obs.value,
                overall
            );
        }
    }

    #[test]
    fn deseasonalize_then_reseasonalize_round_trips() {
        let profile = [20.0, 10.0, 12.0, 9.0, 11.0, 10.0, 5.0];
        let series = daily_series(3, &profile);
        let factors = compute_factors(&series, Period::Week, false);
        let adjusted = deseasonalize(&series, &factors, Period::Week);
        let restored = reseasonalize(&adjusted, &factors, Period::Week);
        for (orig, back) in series.iter().zip(&restored) {
            assert!((orig.value - back.value).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_factor_is_a_no_op() {
        // All Monday values are zero while the rest are not: Monday's factor
        // is 0 and deseasonalization must leave those values untouched.
        let profile = [0.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let series = daily_series(2, &profile);
        let factors = compute_factors(&series, Period::Week, false);
        assert_eq!(factors.factors[0], 0.0);
        let adjusted = deseasonalize(&series, &factors, Period::Week);
        assert_eq!(adjusted[0].value, 0.0);
    }

    #[test]
    fn unparsable_rows_pass_through() {
        let mut series = daily_series(2, &[10.0; 7]);
        series[3].timestamp = "garbage".into();
        let factors = compute_factors(&series, Period::Week, false);
        let adjusted = deseasonalize(&series, &factors, Period::Week);
        assert_eq!(adjusted[3].value, series[3].value);
    }

    #[test]
    fn short_span_warns() {
        let series = daily_series(4, &[10.0; 7]);
        assert!(season_warnings(&series, Period::Week, false).is_empty());
        assert_eq!(
            season_warnings(&series, Period::Year, false),
            vec![SeasonalWarning::SpanShorterThanPeriod]
        );
    }

    #[test]
    fn grouped_uneven_periods_warn() {
        let mut series = daily_series(2, &[10.0; 7]);
        series.truncate(10); // second week has only 3 observations
        let warnings = season_warnings(&series, Period::Week, true);
        assert!(warnings.contains(&SeasonalWarning::UnevenPeriods));
    }

    #[test]
    fn daily_data_allows_all_periods() {
        let series = daily_series(3, &[10.0; 7]);
        let allowed = allowed_periods(&series);
        assert_eq!(
            allowed,
            vec![Period::Week, Period::Month, Period::Quarter, Period::Year]
        );
    }

    #[test]
    fn monthly_data_disallows_day_position_periods() {
        let series: Vec<Observation> = (1..=12)
            .map(|m| Observation::new(format!("2026-{m:02}-01"), 10.0))
            .collect();
        let allowed = allowed_periods(&series);
        assert!(!allowed.contains(&Period::Week));
        assert!(!allowed.contains(&Period::Month));
        assert!(allowed.contains(&Period::Quarter));
        assert!(allowed.contains(&Period::Year));
    }

    #[test]
    fn grouped_factors_use_cell_sums() {
        // Two observations per Monday cell: grouping sums them first.
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let mut series = Vec::new();
        for w in 0..3 {
            let monday = start + chrono::Days::new(7 * w as u64);
            let tuesday = monday + chrono::Days::new(1);
            series.push(Observation::new(
                monday.format("%Y-%m-%dT06:00:00").to_string(),
                4.0,
            ));
            series.push(Observation::new(
                monday.format("%Y-%m-%dT18:00:00").to_string(),
                6.0,
            ));
            series.push(Observation::new(
                tuesday.format("%Y-%m-%d").to_string(),
                5.0,
            ));
        }
        let factors = compute_factors(&series, Period::Week, true);
        // Monday cells sum to 10, Tuesday cells to 5; overall cell mean 7.5.
        assert_eq!(factors.factors[0], round4(10.0 / 7.5));
        assert_eq!(factors.factors[1], round4(5.0 / 7.5));
    }
}
