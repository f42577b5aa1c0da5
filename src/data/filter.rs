use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, Timelike};

use super::model::Selection;

/// Hours treated as night: 21:00 through 08:59.
pub const NIGHT_HOURS: [u32; 12] = [21, 22, 23, 0, 1, 2, 3, 4, 5, 6, 7, 8];

// ---------------------------------------------------------------------------
// Flag – one predicate kind of the query language
// ---------------------------------------------------------------------------

/// Flags understood by the filter query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    /// `-t`: upper tau bound (float list, the smallest wins).
    Tau,
    /// `-yr`
    Year,
    /// `-mn`
    Month,
    /// `-dy`
    Day,
    /// `-hr`
    Hour,
    /// `-mt`
    Minute,
    /// `-ng`: bare night flag.
    Night,
}

impl Flag {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "t" => Some(Flag::Tau),
            "yr" => Some(Flag::Year),
            "mn" => Some(Flag::Month),
            "dy" => Some(Flag::Day),
            "hr" => Some(Flag::Hour),
            "mt" => Some(Flag::Minute),
            "ng" => Some(Flag::Night),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Flag::Tau => "t",
            Flag::Year => "yr",
            Flag::Month => "mn",
            Flag::Day => "dy",
            Flag::Hour => "hr",
            Flag::Minute => "mt",
            Flag::Night => "ng",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Flag::Tau => "tau",
            Flag::Year => "year",
            Flag::Month => "month",
            Flag::Day => "day",
            Flag::Hour => "hour",
            Flag::Minute => "minute",
            Flag::Night => "night",
        }
    }

    /// Accepted integer values; `None` for flags that are not integer lists.
    fn int_range(self) -> Option<(i64, i64)> {
        match self {
            Flag::Year => Some((0, i32::MAX as i64)),
            Flag::Month => Some((1, 12)),
            Flag::Day => Some((1, 31)),
            Flag::Hour => Some((0, 23)),
            Flag::Minute => Some((0, 59)),
            Flag::Tau | Flag::Night => None,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.code())
    }
}

/// A value dropped during validation because it was out of range.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub flag: Flag,
    pub value: String,
}

// ---------------------------------------------------------------------------
// PredicateSet – typed form of a query string
// ---------------------------------------------------------------------------

/// Parsed filter predicates. An empty set means "no constraint of that kind".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateSet {
    /// Keep samples with `tau < tau_max`.
    pub tau_max: Option<f64>,
    pub years: BTreeSet<i32>,
    pub months: BTreeSet<u32>,
    pub days: BTreeSet<u32>,
    pub hours: BTreeSet<u32>,
    pub minutes: BTreeSet<u32>,
    /// Replaces `hours` with [`NIGHT_HOURS`].
    pub night: bool,
}

impl PredicateSet {
    /// Parse a query such as `-yr 2018 -mn 12 -dy 25 -hr 7,8,9`.
    pub fn parse(query: &str) -> Self {
        Self::parse_with_report(query).0
    }

    /// Like [`PredicateSet::parse`], also returning the out-of-range values
    /// that were dropped (each one is logged as a warning).
    ///
    /// Tokens that do not parse as numbers are dropped silently.
    pub fn parse_with_report(query: &str) -> (Self, Vec<Rejected>) {
        let mut set = PredicateSet::default();
        let mut tokens: BTreeMap<Flag, Vec<&str>> = BTreeMap::new();
        let mut current: Option<Flag> = None;

        for word in query.split_whitespace() {
            if let Some(code) = word.strip_prefix('-') {
                current = Flag::from_code(code);
                match current {
                    Some(Flag::Night) => set.night = true,
                    Some(_) => {}
                    None => log::warn!("unknown filter flag '-{code}' ignored"),
                }
                continue;
            }
            match current {
                Some(Flag::Night) | None => {
                    log::debug!("stray filter value '{word}' ignored");
                }
                Some(flag) => tokens
                    .entry(flag)
                    .or_default()
                    .extend(word.split(',').filter(|t| !t.is_empty())),
            }
        }

        let mut rejected = Vec::new();
        for (flag, list) in tokens {
            if flag == Flag::Tau {
                let values = parse_tokens::<f64>(flag, &list);
                let kept = keep_valid(flag, values, |v| v >= 0.0, &mut rejected);
                set.tau_max = kept.into_iter().reduce(f64::min);
                continue;
            }

            let Some((lo, hi)) = flag.int_range() else {
                continue;
            };
            let values = parse_tokens::<i64>(flag, &list);
            let kept = keep_valid(flag, values, |v| (lo..=hi).contains(&v), &mut rejected);
            match flag {
                Flag::Year => set.years = kept.into_iter().map(|v| v as i32).collect(),
                Flag::Month => set.months = to_u32(kept),
                Flag::Day => set.days = to_u32(kept),
                Flag::Hour => set.hours = to_u32(kept),
                Flag::Minute => set.minutes = to_u32(kept),
                Flag::Tau | Flag::Night => {}
            }
        }

        (set, rejected)
    }

    /// True when no predicate kind is present.
    pub fn is_empty(&self) -> bool {
        self.tau_max.is_none()
            && self.years.is_empty()
            && self.months.is_empty()
            && self.days.is_empty()
            && self.hours.is_empty()
            && self.minutes.is_empty()
            && !self.night
    }

    /// The hour mask actually applied. Night wins over an explicit list.
    pub fn effective_hours(&self) -> Option<BTreeSet<u32>> {
        if self.night {
            Some(NIGHT_HOURS.into_iter().collect())
        } else if self.hours.is_empty() {
            None
        } else {
            Some(self.hours.clone())
        }
    }

    /// Narrow `selection` to the samples satisfying every predicate kind.
    pub fn apply<'a>(&self, selection: &Selection<'a>) -> Selection<'a> {
        if self.is_empty() {
            return selection.clone();
        }

        let mut narrowed = selection.clone();
        if let Some(tau_max) = self.tau_max {
            narrowed = narrowed.narrow(|s| s.tau < tau_max);
        }
        if !self.years.is_empty() {
            narrowed = narrowed.narrow(|s| self.years.contains(&s.timestamp.year()));
        }
        if !self.months.is_empty() {
            narrowed = narrowed.narrow(|s| self.months.contains(&s.timestamp.month()));
        }
        if !self.days.is_empty() {
            narrowed = narrowed.narrow(|s| self.days.contains(&s.timestamp.day()));
        }
        if let Some(hours) = self.effective_hours() {
            narrowed = narrowed.narrow(|s| hours.contains(&s.timestamp.hour()));
        }
        if !self.minutes.is_empty() {
            narrowed = narrowed.narrow(|s| self.minutes.contains(&s.timestamp.minute()));
        }

        narrowed.log_summary();
        narrowed
    }
}

/// Narrow `selection` with already-parsed predicates.
pub fn apply<'a>(selection: &Selection<'a>, predicates: &PredicateSet) -> Selection<'a> {
    predicates.apply(selection)
}

/// Parse `query` and narrow `selection` with it.
pub fn filter<'a>(selection: &Selection<'a>, query: &str) -> Selection<'a> {
    PredicateSet::parse(query).apply(selection)
}

fn parse_tokens<T: std::str::FromStr>(flag: Flag, tokens: &[&str]) -> Vec<T> {
    tokens
        .iter()
        .filter_map(|tok| {
            let parsed = tok.parse::<T>().ok();
            if parsed.is_none() {
                log::trace!("{flag}: token '{tok}' dropped");
            }
            parsed
        })
        .collect()
}

fn keep_valid<T, F>(flag: Flag, values: Vec<T>, valid: F, rejected: &mut Vec<Rejected>) -> Vec<T>
where
    T: Copy + fmt::Display,
    F: Fn(T) -> bool,
{
    let (kept, dropped): (Vec<T>, Vec<T>) = values.into_iter().partition(|&v| valid(v));
    for value in dropped {
        log::warn!("{} value {value} not valid, it will be ignored", flag.label());
        rejected.push(Rejected {
            flag,
            value: value.to_string(),
        });
    }
    kept
}

fn to_u32(values: Vec<i64>) -> BTreeSet<u32> {
    values.into_iter().map(|v| v as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Sample, TimeSeries};
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    /// Samples every 30 minutes from 2019-11-01 through 2020-02-29.
    fn two_winters() -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2019, 11, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut samples = Vec::new();
        let mut t = start;
        let mut i = 0;
        while t < end {
            samples.push(Sample::new(t, (i % 40) as f64 * 0.01));
            t += Duration::minutes(30);
            i += 1;
        }
        TimeSeries::from_samples(samples).unwrap()
    }

    #[test]
    fn parses_every_flag() {
        let set = PredicateSet::parse("-t 0.3 -yr 2018 -mn 12 -dy 25 -hr 7,8,9 -mt 0,30");
        assert_eq!(set.tau_max, Some(0.3));
        assert_eq!(set.years, BTreeSet::from([2018]));
        assert_eq!(set.months, BTreeSet::from([12]));
        assert_eq!(set.days, BTreeSet::from([25]));
        assert_eq!(set.hours, BTreeSet::from([7, 8, 9]));
        assert_eq!(set.minutes, BTreeSet::from([0, 30]));
        assert!(!set.night);
    }

    #[test]
    fn unparseable_tokens_are_dropped_silently() {
        let (set, rejected) = PredicateSet::parse_with_report("-yr 2018,abc,2019");
        assert_eq!(set.years, BTreeSet::from([2018, 2019]));
        assert!(rejected.is_empty());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let (set, rejected) = PredicateSet::parse_with_report("-mn 0,13,6");
        assert_eq!(set.months, BTreeSet::from([6]));
        let values: Vec<_> = rejected.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["0", "13"]);
        assert!(rejected.iter().all(|r| r.flag == Flag::Month));
    }

    #[test]
    fn negative_tau_bound_is_rejected() {
        let (set, rejected) = PredicateSet::parse_with_report("-t 0.4,abc");
        assert_eq!(set.tau_max, Some(0.4));
        assert!(rejected.is_empty());

        let set = PredicateSet::parse("-hr 25,-1");
        assert!(set.hours.is_empty());
    }

    #[test]
    fn smallest_tau_bound_wins() {
        let set = PredicateSet::parse("-t 0.3,0.2,0.5");
        assert_eq!(set.tau_max, Some(0.2));
    }

    #[test]
    fn values_split_on_commas_and_spaces() {
        let set = PredicateSet::parse("-hr 7, 8 ,9 -yr 2019 -yr 2020");
        assert_eq!(set.hours, BTreeSet::from([7, 8, 9]));
        assert_eq!(set.years, BTreeSet::from([2019, 2020]));
    }

    #[test]
    fn unknown_flags_are_ignored() {
        let set = PredicateSet::parse("-zz 4 -dy 3");
        assert_eq!(set.days, BTreeSet::from([3]));
        assert!(set.hours.is_empty());
    }

    #[test]
    fn night_overrides_hours() {
        let set = PredicateSet {
            hours: BTreeSet::from([5]),
            night: true,
            ..Default::default()
        };
        let expected: BTreeSet<u32> = NIGHT_HOURS.into_iter().collect();
        assert_eq!(set.effective_hours(), Some(expected.clone()));

        let parsed = PredicateSet::parse("-hr 5 -ng");
        assert!(parsed.night);
        assert_eq!(parsed.effective_hours(), Some(expected));
    }

    #[test]
    fn empty_query_returns_selection_untouched() {
        let series = two_winters();
        let all = series.all();
        let same = filter(&all, "");
        assert_eq!(same.indices(), all.indices());
    }

    #[test]
    fn filters_by_calendar_fields() {
        let series = two_winters();
        let sel = filter(&series.all(), "-yr 2020 -mn 2 -dy 29 -hr 7,8 -mt 30");
        assert_eq!(sel.len(), 2);
        for s in sel.samples() {
            assert_eq!(s.timestamp.day(), 29);
            assert_eq!(s.timestamp.minute(), 30);
        }
    }

    #[test]
    fn tau_bound_is_strict() {
        let series = two_winters();
        let sel = filter(&series.all(), "-t 0.05");
        assert!(sel.len() > 0);
        assert!(sel.samples().all(|s| s.tau < 0.05));
    }

    #[test]
    fn night_filter_keeps_night_hours_only() {
        let series = two_winters();
        let sel = filter(&series.all(), "-ng -hr 12");
        assert!(sel.samples().all(|s| NIGHT_HOURS.contains(&s.timestamp.hour())));
        // 12 night hours of 24, half the samples.
        assert_eq!(sel.len() * 2, series.len());
    }

    proptest! {
        #[test]
        fn prop_filters_compose_conjunctively(year in 2019i32..=2020, month in 1u32..=12) {
            let series = two_winters();
            let by_year = PredicateSet { years: BTreeSet::from([year]), ..Default::default() };
            let by_month = PredicateSet { months: BTreeSet::from([month]), ..Default::default() };
            let both = PredicateSet {
                years: BTreeSet::from([year]),
                months: BTreeSet::from([month]),
                ..Default::default()
            };

            let all = series.all();
            let stepwise = apply(&apply(&all, &by_year), &by_month);
            let at_once = apply(&all, &both);
            prop_assert_eq!(stepwise.indices(), at_once.indices());
        }
    }
}
