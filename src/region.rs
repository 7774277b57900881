//! Region normalization and zero-filled per-region aggregation.

use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::util::stable_sum;

const REGION_PREFIX: &str = "Region ";

/// Philippine administrative regions in dashboard display order.
pub static KNOWN_REGIONS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "NCR", "CAR", "I", "II", "III", "IV-A", "IV-B", "V", "VI", "VII", "VIII", "IX", "X", "XI",
        "XII", "XIII", "BARMM",
    ]
    .iter()
    .map(|r| r.to_string())
    .collect()
});

/// Trim a region label and strip a leading literal `"Region "`.
///
/// Applied to input labels and enumeration entries alike, so `"Region I"`
/// and `"I"` name the same region.
pub fn normalize_region(label: &str) -> &str {
    let label = label.trim();
    label.strip_prefix(REGION_PREFIX).map(str::trim).unwrap_or(label)
}

/// A named numeric reading taken from each input record.
pub struct Metric<'a, T> {
    pub name: String,
    accessor: Box<dyn Fn(&T) -> f64 + 'a>,
}

impl<'a, T> Metric<'a, T> {
    pub fn new(name: impl Into<String>, accessor: impl Fn(&T) -> f64 + 'a) -> Self {
        Metric {
            name: name.into(),
            accessor: Box::new(accessor),
        }
    }

    fn read(&self, record: &T) -> f64 {
        let v = (self.accessor)(record);
        // A reading that is not a number contributes nothing.
        if v.is_finite() {
            v
        } else {
            0.0
        }
    }
}

/// One output row: the region as written in the enumeration plus one total
/// per metric, in metric order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRow {
    pub region: String,
    pub totals: Vec<(String, f64)>,
}

impl RegionRow {
    /// Total for `metric`, or `0.0` if no such metric was aggregated.
    pub fn get(&self, metric: &str) -> f64 {
        self.totals
            .iter()
            .find(|(name, _)| name == metric)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub rows: Vec<RegionRow>,
    /// Input records whose region matched nothing in the enumeration.
    pub unmatched: usize,
}

/// Sum `metrics` per region.
///
/// Produces exactly one row per entry of `regions`, in that order, with
/// zeros for regions that no record matched. Records with an unknown region
/// are dropped and counted in [`Aggregation::unmatched`]. Totals do not
/// depend on the order of `records`.
pub fn aggregate_by_region<T, F>(
    records: &[T],
    region_of: F,
    regions: &[String],
    metrics: &[Metric<'_, T>],
) -> Aggregation
where
    F: Fn(&T) -> &str,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, region) in regions.iter().enumerate() {
        // A duplicated enumeration entry keeps its row but receives nothing.
        index.entry(normalize_region(region)).or_insert(i);
    }

    let mut values: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); metrics.len()]; regions.len()];
    let mut unmatched = 0usize;
    for record in records {
        let label = region_of(record);
        let Some(&slot) = index.get(normalize_region(label)) else {
            debug!("dropping record with unknown region {:?}", label);
            unmatched += 1;
            continue;
        };
        for (m, metric) in metrics.iter().enumerate() {
            values[slot][m].push(metric.read(record));
        }
    }

    let rows = regions
        .iter()
        .zip(values)
        .map(|(region, per_metric)| RegionRow {
            region: region.clone(),
            totals: metrics
                .iter()
                .zip(per_metric)
                .map(|(metric, v)| (metric.name.clone(), stable_sum(v)))
                .collect(),
        })
        .collect();

    Aggregation { rows, unmatched }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        region: &'static str,
        bettors: f64,
        bets: f64,
    }

    fn regions(list: &[&str]) -> Vec<String> {
        list.iter().map(|r| r.to_string()).collect()
    }

    fn metrics<'a>() -> Vec<Metric<'a, Row>> {
        vec![
            Metric::new("total", |r: &Row| r.bettors),
            Metric::new("bets", |r: &Row| r.bets),
        ]
    }

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region("Region I"), "I");
        assert_eq!(normalize_region("  NCR "), "NCR");
        assert_eq!(normalize_region("Region IV-A"), "IV-A");
        assert_eq!(normalize_region("region I"), "region I");
        assert_eq!(normalize_region("Regional"), "Regional");
    }

    #[test]
    fn test_end_to_end_example() {
        let input = vec![
            Row {
                region: "Region I",
                bettors: 5.0,
                bets: 0.0,
            },
            Row {
                region: "NCR",
                bettors: 3.0,
                bets: 0.0,
            },
        ];
        let metrics = vec![Metric::new("total", |r: &Row| r.bettors)];
        let list = regions(&["I", "NCR", "CAR"]);
        let agg = aggregate_by_region(&input, |r| r.region, &list, &metrics);
        let got: Vec<(&str, f64)> = agg
            .rows
            .iter()
            .map(|r| (r.region.as_str(), r.get("total")))
            .collect();
        assert_eq!(got, vec![("I", 5.0), ("NCR", 3.0), ("CAR", 0.0)]);
        assert_eq!(agg.unmatched, 0);
    }

    #[test]
    fn test_empty_input_zero_fills_every_region() {
        let agg = aggregate_by_region(&[], |r: &Row| r.region, &KNOWN_REGIONS, &metrics());
        assert_eq!(agg.rows.len(), KNOWN_REGIONS.len());
        for (row, expected) in agg.rows.iter().zip(KNOWN_REGIONS.iter()) {
            assert_eq!(&row.region, expected);
            assert_eq!(row.get("total"), 0.0);
            assert_eq!(row.get("bets"), 0.0);
        }
    }

    #[test]
    fn test_unknown_regions_are_dropped() {
        let input = vec![
            Row {
                region: "Atlantis",
                bettors: 9.0,
                bets: 9.0,
            },
            Row {
                region: "",
                bettors: 1.0,
                bets: 1.0,
            },
            Row {
                region: "Region CAR",
                bettors: 2.0,
                bets: 4.0,
            },
        ];
        let list = regions(&["NCR", "CAR"]);
        let agg = aggregate_by_region(&input, |r| r.region, &list, &metrics());
        assert_eq!(agg.rows.len(), 2);
        assert_eq!(agg.rows[0].get("total"), 0.0);
        assert_eq!(agg.rows[1].get("total"), 2.0);
        assert_eq!(agg.rows[1].get("bets"), 4.0);
        assert_eq!(agg.unmatched, 2);
    }

    #[test]
    fn test_permutation_invariant() {
        let input = vec![
            Row {
                region: "NCR",
                bettors: 0.1,
                bets: 1e16,
            },
            Row {
                region: "Region NCR",
                bettors: 0.2,
                bets: 1.0,
            },
            Row {
                region: "NCR",
                bettors: 0.3,
                bets: -1e16,
            },
            Row {
                region: "I",
                bettors: 7.0,
                bets: 2.5,
            },
        ];
        let list = regions(&["NCR", "I"]);
        let forward = aggregate_by_region(&input, |r| r.region, &list, &metrics());
        let reversed: Vec<Row> = input
            .iter()
            .rev()
            .map(|r| Row {
                region: r.region,
                bettors: r.bettors,
                bets: r.bets,
            })
            .collect();
        let backward = aggregate_by_region(&reversed, |r| r.region, &list, &metrics());
        for (a, b) in forward.rows.iter().zip(backward.rows.iter()) {
            assert_eq!(a.region, b.region);
            for ((_, x), (_, y)) in a.totals.iter().zip(b.totals.iter()) {
                assert_eq!(x.to_bits(), y.to_bits());
            }
        }
    }

    #[test]
    fn test_enumeration_with_prefix_keeps_its_label() {
        let input = vec![Row {
            region: "I",
            bettors: 1.0,
            bets: 0.0,
        }];
        let agg = aggregate_by_region(&input, |r| r.region, &regions(&["Region I"]), &metrics());
        assert_eq!(agg.rows[0].region, "Region I");
        assert_eq!(agg.rows[0].get("total"), 1.0);
    }

    #[test]
    fn test_non_finite_readings_count_as_zero() {
        let input = vec![
            Row {
                region: "NCR",
                bettors: f64::NAN,
                bets: 1.0,
            },
            Row {
                region: "NCR",
                bettors: 2.0,
                bets: f64::INFINITY,
            },
        ];
        let agg = aggregate_by_region(&input, |r| r.region, &regions(&["NCR"]), &metrics());
        assert_eq!(agg.rows[0].get("total"), 2.0);
        assert_eq!(agg.rows[0].get("bets"), 1.0);
        assert_eq!(agg.rows[0].get("missing"), 0.0);
    }
}
