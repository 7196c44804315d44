//! Linear and time scales with tick generation.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = 1.4142135623730951; // sqrt(2)

/// Maps a continuous numeric domain onto a range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Map a domain value. A zero-width domain maps everything to the middle
    /// of the range.
    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        let t = if span != 0.0 && span.is_finite() {
            (value - d0) / span
        } else {
            0.5
        };
        r0 + t * (r1 - r0)
    }

    /// Round-numbered ticks covering the domain, roughly `count` of them.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        ticks(self.domain.0, self.domain.1, count as f64)
    }

    /// Format a tick value with just enough precision for the tick step.
    pub fn tick_format(&self, count: usize, value: f64) -> String {
        let step = tick_step(self.domain.0, self.domain.1, count as f64).abs();
        let precision = if step > 0.0 && step.is_finite() {
            (-step.log10().floor()).max(0.0) as usize
        } else {
            0
        };
        group_thousands(&format!("{:.*}", precision, value))
    }
}

fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let inverse = 10f64.powf(-power) / factor;
        i1 = (start * inverse).round();
        i2 = (stop * inverse).round();
        if i1 / inverse < start {
            i1 += 1.0;
        }
        if i2 / inverse > stop {
            i2 -= 1.0;
        }
        inc = -inverse;
    } else {
        inc = 10f64.powf(power) * factor;
        i1 = (start / inc).round();
        i2 = (stop / inc).round();
        if i1 * inc < start {
            i1 += 1.0;
        }
        if i2 * inc > stop {
            i2 -= 1.0;
        }
    }

    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

/// Nice tick values in `[start, stop]`.
pub fn ticks(start: f64, stop: f64, count: f64) -> Vec<f64> {
    if !(count > 0.0) || !start.is_finite() || !stop.is_finite() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }

    let reverse = stop < start;
    let (lo, hi) = if reverse { (stop, start) } else { (start, stop) };
    let (i1, i2, inc) = tick_spec(lo, hi, count);
    if !(i2 >= i1) {
        return Vec::new();
    }

    let n = (i2 - i1 + 1.0) as usize;
    let mut out: Vec<f64> = (0..n)
        .map(|i| {
            let k = i1 + i as f64;
            if inc < 0.0 {
                k / -inc
            } else {
                k * inc
            }
        })
        .collect();
    if reverse {
        out.reverse();
    }
    out
}

/// Step between nice ticks in `[start, stop]`.
pub fn tick_step(start: f64, stop: f64, count: f64) -> f64 {
    let reverse = stop < start;
    let (lo, hi) = if reverse { (stop, start) } else { (start, stop) };
    let inc = tick_spec(lo, hi, count).2;
    let step = if inc < 0.0 { 1.0 / -inc } else { inc };
    if reverse {
        -step
    } else {
        step
    }
}

fn group_thousands(formatted: &str) -> String {
    let (sign, rest) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match rest.find('.') {
        Some(dot) => rest.split_at(dot),
        None => (rest, ""),
    };

    let digits = int_part.as_bytes();
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit as char);
    }

    // "-0" reads as noise on an axis
    let is_zero = grouped.bytes().all(|b| b == b'0')
        && frac_part.bytes().all(|b| b == b'.' || b == b'0');
    let sign = if is_zero { "" } else { sign };
    format!("{}{}{}", sign, grouped, frac_part)
}

/// Calendar-aware tick interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeInterval {
    /// Fixed number of milliseconds, aligned to the Unix epoch.
    Millis(i64),
    /// Fixed number of seconds, aligned to the Unix epoch.
    Seconds(i64),
    /// Whole weeks starting on Sunday.
    Weeks(i64),
    Months(u32),
    Years(i32),
}

impl TimeInterval {
    const SUBSECOND: [TimeInterval; 9] = [
        TimeInterval::Millis(1),
        TimeInterval::Millis(2),
        TimeInterval::Millis(5),
        TimeInterval::Millis(10),
        TimeInterval::Millis(20),
        TimeInterval::Millis(50),
        TimeInterval::Millis(100),
        TimeInterval::Millis(200),
        TimeInterval::Millis(500),
    ];

    const STANDARD: [TimeInterval; 16] = [
        TimeInterval::Seconds(1),
        TimeInterval::Seconds(5),
        TimeInterval::Seconds(15),
        TimeInterval::Seconds(30),
        TimeInterval::Seconds(60),
        TimeInterval::Seconds(5 * 60),
        TimeInterval::Seconds(15 * 60),
        TimeInterval::Seconds(30 * 60),
        TimeInterval::Seconds(3600),
        TimeInterval::Seconds(3 * 3600),
        TimeInterval::Seconds(6 * 3600),
        TimeInterval::Seconds(12 * 3600),
        TimeInterval::Seconds(86_400),
        TimeInterval::Seconds(2 * 86_400),
        TimeInterval::Weeks(1),
        TimeInterval::Months(1),
    ];

    /// Approximate length in seconds, for estimating tick counts.
    fn approx_seconds(&self) -> f64 {
        match *self {
            TimeInterval::Millis(ms) => ms as f64 / 1000.0,
            TimeInterval::Seconds(s) => s as f64,
            TimeInterval::Weeks(w) => (w * 7 * 86_400) as f64,
            TimeInterval::Months(m) => m as f64 * 30.0 * 86_400.0,
            TimeInterval::Years(y) => y as f64 * 365.0 * 86_400.0,
        }
    }

    fn range(&self, start: DateTime<Utc>, stop: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        match *self {
            TimeInterval::Millis(step) => fixed_range(start, stop, step, 0),
            TimeInterval::Seconds(step) => fixed_range(start, stop, step * 1000, 0),
            // 1970-01-01 was a Thursday; Sundays fall 3 days later.
            TimeInterval::Weeks(w) => {
                fixed_range(start, stop, w * 7 * 86_400_000, 3 * 86_400_000)
            }
            TimeInterval::Months(step) => {
                let mut out = Vec::new();
                let mut index = start.year() * 12 + start.month0() as i32;
                index -= index.rem_euclid(step as i32);
                loop {
                    let Some(t) = month_start(index) else { break };
                    if t > stop {
                        break;
                    }
                    if t >= start {
                        out.push(t);
                    }
                    index += step as i32;
                }
                out
            }
            TimeInterval::Years(step) => {
                let mut out = Vec::new();
                let mut year = start.year() - start.year().rem_euclid(step);
                loop {
                    let Some(t) = month_start(year * 12) else { break };
                    if t > stop {
                        break;
                    }
                    if t >= start {
                        out.push(t);
                    }
                    year += step;
                }
                out
            }
        }
    }
}

fn fixed_range(
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    step: i64,
    offset: i64,
) -> Vec<DateTime<Utc>> {
    let first = (start.timestamp_millis() - offset).div_euclid(step) * step + offset;
    let first = if first < start.timestamp_millis() {
        first + step
    } else {
        first
    };

    let mut out = Vec::new();
    let mut t = first;
    while t <= stop.timestamp_millis() {
        if let Some(dt) = Utc.timestamp_millis_opt(t).single() {
            out.push(dt);
        }
        t += step;
    }
    out
}

fn month_start(index: i32) -> Option<DateTime<Utc>> {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

/// Maps a time domain onto a numeric range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    linear: LinearScale,
}

impl TimeScale {
    pub fn new(domain: (DateTime<Utc>, DateTime<Utc>), range: (f64, f64)) -> Self {
        let linear = LinearScale::new(
            (
                domain.0.timestamp_millis() as f64,
                domain.1.timestamp_millis() as f64,
            ),
            range,
        );
        Self {
            start: domain.0,
            stop: domain.1,
            linear,
        }
    }

    pub fn apply(&self, t: DateTime<Utc>) -> f64 {
        self.linear.apply(t.timestamp_millis() as f64)
    }

    /// Ticks on the finest standard interval that yields at most `max` ticks.
    pub fn ticks(&self, max: usize) -> Vec<DateTime<Utc>> {
        let (start, stop) = if self.stop < self.start {
            (self.stop, self.start)
        } else {
            (self.start, self.stop)
        };
        if max == 0 {
            return Vec::new();
        }

        let span = (stop - start).num_milliseconds() as f64 / 1000.0;
        let candidates = TimeInterval::SUBSECOND
            .into_iter()
            .chain(TimeInterval::STANDARD)
            .chain([TimeInterval::Months(3)])
            .chain(year_steps());

        for interval in candidates {
            // Skip intervals that would obviously produce too many ticks.
            if span / interval.approx_seconds() > (max + 1) as f64 {
                continue;
            }
            let ticks = interval.range(start, stop);
            if ticks.len() <= max {
                return ticks;
            }
        }
        Vec::new()
    }
}

fn year_steps() -> impl Iterator<Item = TimeInterval> {
    [1, 2, 5]
        .into_iter()
        .cycle()
        .zip((0..6).flat_map(|p| std::iter::repeat(10i32.pow(p)).take(3)))
        .map(|(base, scale)| TimeInterval::Years(base * scale))
}

/// Label a time tick with the coarsest unit it is aligned to.
pub fn format_time_tick(t: DateTime<Utc>) -> String {
    let fmt = if t.timestamp_subsec_millis() != 0 {
        ".%3f"
    } else if t.second() != 0 {
        ":%S"
    } else if t.minute() != 0 {
        "%I:%M"
    } else if t.hour() != 0 {
        "%I %p"
    } else if t.day() != 1 {
        if t.weekday() == Weekday::Sun {
            "%a %d"
        } else {
            "%b %d"
        }
    } else if t.month() != 1 {
        "%B"
    } else {
        "%Y"
    };
    t.format(fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_linear_apply_inverts_range() {
        let y = LinearScale::new((0.0, 50.0), (240.0, 0.0));
        assert_relative_eq!(y.apply(0.0), 240.0);
        assert_relative_eq!(y.apply(50.0), 0.0);
        assert_relative_eq!(y.apply(25.0), 120.0);
        assert_relative_eq!(y.apply(100.0), -240.0);
    }

    #[test]
    fn test_linear_degenerate_domain_maps_to_middle() {
        let x = LinearScale::new((5.0, 5.0), (0.0, 720.0));
        assert_relative_eq!(x.apply(5.0), 360.0);
        assert_relative_eq!(x.apply(99.0), 360.0);
    }

    #[test]
    fn test_nice_ticks() {
        assert_eq!(
            ticks(0.0, 50.0, 10.0),
            vec![0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0]
        );
        assert_eq!(
            ticks(0.0, 110.0, 10.0),
            vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0]
        );
        assert_eq!(ticks(0.0, 1.0, 5.0), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(ticks(3.0, 3.0, 10.0), vec![3.0]);
        assert!(ticks(0.0, f64::NAN, 10.0).is_empty());
        assert!(ticks(0.0, 10.0, 0.0).is_empty());
    }

    #[test]
    fn test_tick_format() {
        let y = LinearScale::new((0.0, 50.0), (240.0, 0.0));
        assert_eq!(y.tick_format(10, 45.0), "45");

        let fine = LinearScale::new((0.0, 1.0), (1.0, 0.0));
        assert_eq!(fine.tick_format(5, 0.4), "0.4");

        let wide = LinearScale::new((0.0, 5500.0), (1.0, 0.0));
        assert_eq!(wide.tick_format(10, 5000.0), "5,000");
    }

    #[test]
    fn test_time_ticks_are_bounded_and_aligned() {
        let x = TimeScale::new((at(12, 0, 0), at(12, 10, 0)), (0.0, 720.0));
        let ticks = x.ticks(5);
        assert_eq!(
            ticks,
            vec![at(12, 0, 0), at(12, 5, 0), at(12, 10, 0)]
        );

        let x = TimeScale::new((at(12, 0, 7), at(12, 0, 52)), (0.0, 720.0));
        let ticks = x.ticks(5);
        assert_eq!(ticks, vec![at(12, 0, 15), at(12, 0, 30), at(12, 0, 45)]);
    }

    #[test]
    fn test_time_ticks_below_one_second() {
        let start = at(12, 0, 0);
        let stop = start + chrono::Duration::milliseconds(800);
        let ticks = TimeScale::new((start, stop), (0.0, 720.0)).ticks(5);

        let offsets: Vec<i64> = ticks.iter().map(|t| (*t - start).num_milliseconds()).collect();
        assert_eq!(offsets, vec![0, 200, 400, 600, 800]);
        assert_eq!(format_time_tick(ticks[1]), ".200");
        assert_eq!(format_time_tick(ticks[4]), ".800");
    }

    #[test]
    fn test_time_ticks_span_months_and_years() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let stop = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
        let ticks = TimeScale::new((start, stop), (0.0, 1.0)).ticks(5);
        assert_eq!(ticks.len(), 4);
        assert_eq!(ticks[0], Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());

        let start = Utc.with_ymd_and_hms(2001, 6, 1, 0, 0, 0).unwrap();
        let stop = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let ticks = TimeScale::new((start, stop), (0.0, 1.0)).ticks(5);
        assert!(!ticks.is_empty() && ticks.len() <= 5);
        assert!(ticks.iter().all(|t| t.month() == 1 && t.day() == 1));
    }

    #[test]
    fn test_time_scale_midpoint_for_single_instant() {
        let x = TimeScale::new((at(12, 0, 0), at(12, 0, 0)), (0.0, 720.0));
        assert_relative_eq!(x.apply(at(12, 0, 0)), 360.0);
        assert_eq!(x.ticks(5), vec![at(12, 0, 0)]);
    }

    #[test]
    fn test_format_time_tick() {
        assert_eq!(format_time_tick(at(12, 0, 15)), ":15");
        assert_eq!(format_time_tick(at(12, 5, 0)), "12:05");
        assert_eq!(format_time_tick(at(15, 0, 0)), "03 PM");
        // 2024-05-01 is a Wednesday and the first of the month
        assert_eq!(format_time_tick(at(0, 0, 0)), "May");
        assert_eq!(
            format_time_tick(Utc.with_ymd_and_hms(2024, 5, 5, 0, 0, 0).unwrap()),
            "Sun 05"
        );
        assert_eq!(
            format_time_tick(Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap()),
            "May 06"
        );
        assert_eq!(
            format_time_tick(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            "2024"
        );
    }
}
