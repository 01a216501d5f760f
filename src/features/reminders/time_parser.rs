//! # Time Expression Parser
//!
//! Turns free-text "when" phrases into trigger instants. Phrases are matched
//! against an ordered grammar, each case with a single failure path:
//!
//! 1. `every ...` switches to a recurring schedule
//! 2. `in 10m` / `every 10m` fixed durations (m, h, d)
//! 3. `8pm`, `at 3:30pm`, `20:00` time of day (rolls to tomorrow once passed)
//! 4. `today|tomorrow|[next] monday [at] <time>` day plus optional time
//! 5. `every day at 8am`, `every monday at 9:30am` daily/weekly time of day
//!
//! Wall-clock times are resolved in one configured civil time zone, so the
//! same wording always yields the same local instant.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

use super::error::ParseError;
use super::model::{localize, IntervalUnit, RecurrenceRule};

static DURATION_RE: OnceLock<Regex> = OnceLock::new();
static CLOCK_RE: OnceLock<Regex> = OnceLock::new();

fn duration_re() -> &'static Regex {
    DURATION_RE.get_or_init(|| {
        Regex::new(r"^(?P<qty>\S*?)\s*(?P<unit>[a-z]+)$").expect("duration pattern is valid")
    })
}

fn clock_re() -> &'static Regex {
    CLOCK_RE.get_or_init(|| {
        Regex::new(r"^(?P<hour>\d+)(?::(?P<minute>\d*))?\s*(?P<meridiem>am|pm)?$")
            .expect("clock pattern is valid")
    })
}

/// Result of parsing a "when" phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSchedule {
    /// Deliver once at an absolute instant
    Once { at: DateTime<Utc> },
    /// Deliver at `first_at`, then repeat per `rule`
    Recurring {
        first_at: DateTime<Utc>,
        rule: RecurrenceRule,
    },
}

impl ParsedSchedule {
    pub fn trigger_at(&self) -> DateTime<Utc> {
        match self {
            ParsedSchedule::Once { at } => *at,
            ParsedSchedule::Recurring { first_at, .. } => *first_at,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, ParsedSchedule::Recurring { .. })
    }

    pub fn rule(&self) -> Option<&RecurrenceRule> {
        match self {
            ParsedSchedule::Once { .. } => None,
            ParsedSchedule::Recurring { rule, .. } => Some(rule),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DaySpec {
    Today,
    Tomorrow,
    Weekday(Weekday),
}

/// Parser bound to a reference time zone
#[derive(Debug, Clone, Copy)]
pub struct TimeParser {
    tz: Tz,
}

impl TimeParser {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse `when` relative to `now`
    pub fn parse(&self, when: &str, now: DateTime<Utc>) -> Result<ParsedSchedule, ParseError> {
        let input = when
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if input.is_empty() {
            return Err(ParseError::Empty);
        }
        let now = now.with_nanosecond(0).unwrap_or(now);

        if let Some(rest) = input.strip_prefix("every ") {
            return self.parse_recurring(rest, &input, now);
        }

        if let Some(rest) = input.strip_prefix("in ") {
            let (every, unit) = parse_duration(rest, &input)?;
            let at = offset(now, every, unit)?;
            return Ok(ParsedSchedule::Once { at });
        }

        let (day_text, time_text) = split_day_time(&input);
        let day = match day_text {
            Some(text) => Some(parse_day(text, time_text, &input)?),
            None => None,
        };
        let clock = match time_text {
            Some(text) => Some(parse_clock(text, &input)?),
            None => None,
        };
        let at = self.resolve(day, clock, now, &input)?;
        Ok(ParsedSchedule::Once { at })
    }

    fn parse_recurring(
        &self,
        rest: &str,
        input: &str,
        now: DateTime<Utc>,
    ) -> Result<ParsedSchedule, ParseError> {
        if rest.starts_with(|c: char| c.is_ascii_digit()) && !looks_like_clock(rest) {
            let (every, unit) = parse_duration(rest, input)?;
            let first_at = offset(now, every, unit)?;
            return Ok(ParsedSchedule::Recurring {
                first_at,
                rule: RecurrenceRule::Interval { every, unit },
            });
        }

        let (day_text, time_text) = split_day_time(rest);
        let weekday = match day_text {
            None | Some("day") => None,
            Some(text) => match parse_day(text, time_text, input)? {
                DaySpec::Weekday(day) if !text.starts_with("next ") => Some(day),
                _ => {
                    return Err(ParseError::Unrecognized {
                        input: input.to_string(),
                    })
                }
            },
        };
        let (hour, minute) = match time_text {
            Some(text) => parse_clock(text, input)?,
            None => {
                let local = now.with_timezone(&self.tz);
                (local.hour(), local.minute())
            }
        };

        let (day, rule) = match weekday {
            Some(weekday) => (
                Some(DaySpec::Weekday(weekday)),
                RecurrenceRule::Weekly {
                    weekday,
                    hour,
                    minute,
                },
            ),
            None => (None, RecurrenceRule::Daily { hour, minute }),
        };
        let first_at = self.resolve(day, Some((hour, minute)), now, input)?;
        Ok(ParsedSchedule::Recurring { first_at, rule })
    }

    /// Combine a day step and a time-of-day step into an instant
    fn resolve(
        &self,
        day: Option<DaySpec>,
        clock: Option<(u32, u32)>,
        now: DateTime<Utc>,
        input: &str,
    ) -> Result<DateTime<Utc>, ParseError> {
        let local_now = now.with_timezone(&self.tz);
        let today = local_now.date_naive();
        let (hour, minute) = clock.unwrap_or((local_now.hour(), local_now.minute()));
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();

        match day {
            None => {
                let at = localize(self.tz, today.and_time(time));
                if at > now {
                    Ok(at)
                } else {
                    Ok(localize(self.tz, (today + Duration::days(1)).and_time(time)))
                }
            }
            Some(DaySpec::Today) => {
                let at = localize(self.tz, today.and_time(time));
                if at > now {
                    Ok(at)
                } else {
                    Err(ParseError::AlreadyPassed {
                        input: input.to_string(),
                    })
                }
            }
            Some(DaySpec::Tomorrow) => {
                Ok(localize(self.tz, (today + Duration::days(1)).and_time(time)))
            }
            Some(DaySpec::Weekday(target)) => {
                let ahead = days_until(today.weekday(), target);
                Ok(localize(self.tz, (today + Duration::days(ahead)).and_time(time)))
            }
        }
    }
}

/// Days until the next `target`, always 1..=7
fn days_until(from: Weekday, target: Weekday) -> i64 {
    let diff = (7 + target.num_days_from_monday() - from.num_days_from_monday()) % 7;
    if diff == 0 {
        7
    } else {
        i64::from(diff)
    }
}

fn offset(now: DateTime<Utc>, every: u32, unit: IntervalUnit) -> Result<DateTime<Utc>, ParseError> {
    now.checked_add_signed(unit.duration(every))
        .ok_or_else(|| ParseError::InvalidQuantity {
            quantity: every.to_string(),
        })
}

fn looks_like_clock(text: &str) -> bool {
    text.contains(':') || text.ends_with("am") || text.ends_with("pm") || text.contains(" at ")
}

/// Split `<day> [at] <time>` into its parts
fn split_day_time(text: &str) -> (Option<&str>, Option<&str>) {
    if let Some(time) = text.strip_prefix("at ") {
        return (None, Some(time));
    }
    if let Some((day, time)) = text.split_once(" at ") {
        return (Some(day), Some(time));
    }
    if text.starts_with(|c: char| c.is_ascii_digit()) {
        return (None, Some(text));
    }

    let day_len = match text.strip_prefix("next ") {
        Some(after) => 5 + after.find(' ').unwrap_or(after.len()),
        None => text.find(' ').unwrap_or(text.len()),
    };
    let (day, rest) = text.split_at(day_len);
    let rest = rest.trim();
    (Some(day), if rest.is_empty() { None } else { Some(rest) })
}

fn parse_day(text: &str, time_text: Option<&str>, input: &str) -> Result<DaySpec, ParseError> {
    let (is_next, name) = match text.strip_prefix("next ") {
        Some(name) => (true, name),
        None => (false, text),
    };

    let day = match name {
        "today" if !is_next => Some(DaySpec::Today),
        "tomorrow" if !is_next => Some(DaySpec::Tomorrow),
        _ => parse_weekday(name).map(DaySpec::Weekday),
    };
    if let Some(day) = day {
        return Ok(day);
    }

    // Only blame the day name when the rest of the phrase has the right shape
    let time_follows = time_text.is_some_and(|t| t.starts_with(|c: char| c.is_ascii_digit()));
    if is_next || time_follows {
        Err(ParseError::UnknownWeekday {
            day: name.to_string(),
        })
    } else {
        Err(ParseError::Unrecognized {
            input: input.to_string(),
        })
    }
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "weds" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parse `<N><unit>` into a count and unit
fn parse_duration(text: &str, input: &str) -> Result<(u32, IntervalUnit), ParseError> {
    let caps = duration_re()
        .captures(text.trim())
        .ok_or_else(|| ParseError::Unrecognized {
            input: input.to_string(),
        })?;
    let qty = &caps["qty"];
    let unit = &caps["unit"];

    let count: u32 = match qty.parse() {
        Ok(n) if n > 0 => n,
        _ => {
            return Err(ParseError::InvalidQuantity {
                quantity: if qty.is_empty() { text.to_string() } else { qty.to_string() },
            })
        }
    };

    let unit = match unit {
        "m" | "min" | "mins" | "minute" | "minutes" => IntervalUnit::Minutes,
        "h" | "hr" | "hrs" | "hour" | "hours" => IntervalUnit::Hours,
        "d" | "day" | "days" => IntervalUnit::Days,
        other => {
            return Err(ParseError::UnknownUnit {
                unit: other.to_string(),
                input: input.to_string(),
            })
        }
    };
    Ok((count, unit))
}

/// Parse `8pm`, `3:30 pm` or `20:00` into a 24-hour (hour, minute)
fn parse_clock(text: &str, input: &str) -> Result<(u32, u32), ParseError> {
    if !text.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ParseError::Unrecognized {
            input: input.to_string(),
        });
    }
    let malformed = || ParseError::MalformedTime {
        time: text.to_string(),
    };
    let caps = clock_re().captures(text).ok_or_else(malformed)?;

    let hour_text = &caps["hour"];
    let minute_text = caps.name("minute").map(|m| m.as_str());
    let meridiem = caps.name("meridiem").map(|m| m.as_str());

    // 24-hour times need the colon, `20` on its own is ambiguous
    if minute_text.is_none() && meridiem.is_none() {
        return Err(malformed());
    }
    let minute = match minute_text {
        Some(m) if m.len() == 2 => m.parse::<u32>().map_err(|_| malformed())?,
        Some(_) => return Err(malformed()),
        None => 0,
    };
    if minute > 59 {
        return Err(ParseError::MinuteOutOfRange {
            minute: minute_text.unwrap_or_default().to_string(),
            time: text.to_string(),
        });
    }

    let hour_out_of_range = || ParseError::HourOutOfRange {
        hour: hour_text.to_string(),
        time: text.to_string(),
    };
    let hour: u32 = hour_text.parse().map_err(|_| hour_out_of_range())?;
    let hour = match meridiem {
        Some(m) => {
            if !(1..=12).contains(&hour) {
                return Err(hour_out_of_range());
            }
            match (m, hour) {
                ("am", 12) => 0,
                ("am", h) => h,
                ("pm", 12) => 12,
                (_, h) => h + 12,
            }
        }
        None => {
            if hour > 23 {
                return Err(hour_out_of_range());
            }
            hour
        }
    };
    Ok((hour, minute))
}
