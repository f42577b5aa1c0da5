use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// StatRecord – descriptive summary of one bucket
// ---------------------------------------------------------------------------

/// Count plus the seven-number summary of a set of tau values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatRecord {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl StatRecord {
    /// Summarize `values`. `None` when there is nothing to summarize.
    ///
    /// Quartiles use linear interpolation between closest ranks.
    pub fn describe(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_unstable_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(Self {
            count,
            mean,
            std: var.sqrt(),
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

/// `p`-th quantile of non-empty, ascending data.
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();
    match sorted.get(j + 1) {
        Some(&next) => (sorted[j] + g * (next - sorted[j])).min(next),
        None => sorted[j],
    }
}

// ---------------------------------------------------------------------------
// Bucket / StatsTable – what the plotting side consumes
// ---------------------------------------------------------------------------

/// Statistics of one calendar window, labelled by the window's nominal start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub start: NaiveDateTime,
    #[serde(flatten)]
    pub stat: StatRecord,
}

/// Populated buckets in chronological order of `start`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatsTable {
    buckets: Vec<Bucket>,
}

impl StatsTable {
    pub(crate) fn push(&mut self, bucket: Bucket) {
        self.buckets.push(bucket);
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bucket> {
        self.buckets.iter()
    }
}

impl<'a> IntoIterator for &'a StatsTable {
    type Item = &'a Bucket;
    type IntoIter = std::slice::Iter<'a, Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn empty_input_has_no_record() {
        assert!(StatRecord::describe(&[]).is_none());
    }

    #[test]
    fn single_value_collapses() {
        let r = StatRecord::describe(&[0.2]).unwrap();
        assert_eq!(r.count, 1);
        assert_eq!(r.std, 0.0);
        assert!(close(r.min, 0.2) && close(r.q1, 0.2) && close(r.median, 0.2));
        assert!(close(r.q3, 0.2) && close(r.max, 0.2));
    }

    #[test]
    fn interpolates_quartiles() {
        let r = StatRecord::describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(r.count, 4);
        assert!(close(r.mean, 2.5));
        assert!(close(r.q1, 1.75));
        assert!(close(r.median, 2.5));
        assert!(close(r.q3, 3.25));
        assert!(close(r.min, 1.0) && close(r.max, 4.0));
        assert!(close(r.std, 1.25f64.sqrt()));
    }

    #[test]
    fn serializes_flat_rows() {
        let start = chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut table = StatsTable::default();
        table.push(Bucket {
            start,
            stat: StatRecord::describe(&[0.1, 0.3]).unwrap(),
        });
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json[0]["start"], "2020-01-01T00:00:00");
        assert_eq!(json[0]["count"], 2);
        assert!(json[0].get("median").is_some());
    }

    proptest! {
        #[test]
        fn prop_summary_is_ordered(values in proptest::collection::vec(0.0f64..5.0, 1..200)) {
            let r = StatRecord::describe(&values).unwrap();
            prop_assert!(r.min <= r.q1);
            prop_assert!(r.q1 <= r.median);
            prop_assert!(r.median <= r.q3);
            prop_assert!(r.q3 <= r.max);
            prop_assert_eq!(r.count, values.len());
        }
    }
}
