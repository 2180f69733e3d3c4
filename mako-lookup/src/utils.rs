use std::collections::BTreeMap;

use config::{
    clamped_error_bar, mean, round_to, sample_std, PLOT_TITLE, PLOT_Y_RANGE, RATIO_DIGITS,
    X_LABEL, Y_LABEL,
};
use hashbrown::HashMap;
use mako_pack::ReadRecord;
use serde::Serialize;

/// a read paired with its thresholded modification call
#[derive(Debug, Clone, Copy)]
pub struct Binarized<'a> {
    pub read: &'a ReadRecord,
    pub modified: bool,
}

impl Binarized<'_> {
    pub fn value(&self) -> u8 {
        self.modified as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub sample_name: String,
    pub group_name: String,
    pub successes: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStats {
    pub label: String,
    pub n: usize,
    #[serde(rename = "T")]
    pub t: usize,
    #[serde(rename = "F")]
    pub f: usize,
    pub ratio: f64,
    pub mean: f64,
    pub sd: f64, // NaN (null in JSON) when n = 1
    pub lower: f64,
    pub upper: f64,
}

impl LabelStats {
    /// "{label}\n(n=.., T=.., F=.., T/n=..)"
    pub fn axis_label(&self) -> String {
        format!(
            "{}\n(n={}, T={}, F={}, T/n={})",
            self.label,
            self.n,
            self.t,
            self.f,
            fmt_ratio(self.ratio)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionPoint {
    pub label: usize,
    pub value: u8,
}

/// everything a chart needs to draw the per-label binarised distributions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub label_order: Vec<String>,
    pub axis_labels: Vec<String>,
    pub points: Vec<DistributionPoint>,
    pub stats: Vec<LabelStats>,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub title: &'static str,
    pub y_range: (f64, f64),
}

impl Distribution {
    pub fn is_empty(&self) -> bool {
        self.label_order.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Summary {
    NoData,
    Data {
        counts: Vec<GroupCount>,
        distribution: Distribution,
    },
}

impl Summary {
    pub fn has_data(&self) -> bool {
        matches!(self, Summary::Data { .. })
    }
}

/// `probability_modified >= threshold` is a success; NaN never is
pub fn binarize(reads: &[ReadRecord], threshold: f64) -> Vec<Binarized<'_>> {
    reads
        .iter()
        .map(|read| Binarized {
            read,
            modified: read.probability_modified >= threshold,
        })
        .collect()
}

/// successes/failures per (sample, group), sorted by group then sample
pub fn counts_by_group(reads: &[Binarized]) -> Vec<GroupCount> {
    let mut acc: BTreeMap<(&str, &str), (usize, usize)> = BTreeMap::new();

    for b in reads {
        let key = (b.read.group_name.as_str(), b.read.sample_name.as_str());
        let entry = acc.entry(key).or_default();
        if b.modified {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    acc.into_iter()
        .map(|((group, sample), (successes, failures))| GroupCount {
            sample_name: sample.to_string(),
            group_name: group.to_string(),
            successes,
            failures,
        })
        .collect()
}

/// Per-label binarised values and descriptive statistics.
///
/// Rows are ordered by (group, sample) and labels appear in first-seen order
/// after that sort, which is not the same as sorting the label strings.
pub fn labeled_distribution(reads: &[Binarized]) -> Distribution {
    let mut sorted = reads.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| {
        (a.read.group_name.as_str(), a.read.sample_name.as_str())
            .cmp(&(b.read.group_name.as_str(), b.read.sample_name.as_str()))
    });

    let mut label_order: Vec<String> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut values: Vec<Vec<u8>> = Vec::new();
    let mut points = Vec::with_capacity(sorted.len());

    for b in sorted {
        let label = b.read.label();
        let idx = match slots.get(&label) {
            Some(&idx) => idx,
            None => {
                let idx = label_order.len();
                slots.insert(label.clone(), idx);
                label_order.push(label);
                values.push(Vec::new());
                idx
            }
        };

        values[idx].push(b.value());
        points.push(DistributionPoint {
            label: idx,
            value: b.value(),
        });
    }

    let stats = label_order
        .iter()
        .zip(values.iter())
        .map(|(label, vals)| label_stats(label, vals))
        .collect::<Vec<_>>();
    let axis_labels = stats.iter().map(LabelStats::axis_label).collect();

    Distribution {
        label_order,
        axis_labels,
        points,
        stats,
        x_label: X_LABEL,
        y_label: Y_LABEL,
        title: PLOT_TITLE,
        y_range: PLOT_Y_RANGE,
    }
}

fn label_stats(label: &str, values: &[u8]) -> LabelStats {
    let n = values.len();
    let t = values.iter().filter(|&&v| v == 1).count();
    let mu = mean(values);
    let sd = sample_std(values);
    let (lower, upper) = clamped_error_bar(mu, sd, 0.0, 1.0);

    LabelStats {
        label: label.to_string(),
        n,
        t,
        f: n - t,
        ratio: round_to(t as f64 / n as f64, RATIO_DIGITS),
        mean: mu,
        sd,
        lower,
        upper,
    }
}

/// Both aggregate views of a cached read set.
///
/// An absent or empty cache is "nothing to show yet", not an error.
pub fn summarize(reads: Option<&[ReadRecord]>, threshold: f64) -> Summary {
    let reads = match reads {
        Some(reads) if !reads.is_empty() => reads,
        _ => return Summary::NoData,
    };

    let binarized = binarize(reads, threshold);
    Summary::Data {
        counts: counts_by_group(&binarized),
        distribution: labeled_distribution(&binarized),
    }
}

// whole ratios keep one decimal: 1.0, 0.0
fn fmt_ratio(ratio: f64) -> String {
    if ratio.fract() == 0.0 {
        format!("{:.1}", ratio)
    } else {
        format!("{}", ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::BINARIZE_THRESHOLD;
    use serde_json::Map;

    fn read(rname: &str, sample: &str, group: &str, p: f64) -> ReadRecord {
        ReadRecord {
            rname: rname.to_string(),
            transcript_position: 10,
            sample_name: sample.to_string(),
            group_name: group.to_string(),
            probability_modified: p,
            ignored: false,
            columns: Map::new(),
        }
    }

    fn reads() -> Vec<ReadRecord> {
        vec![
            read("r1", "S2", "treated", 0.9),
            read("r2", "S1", "treated", 0.1),
            read("r3", "S1", "treated", 0.6),
            read("r4", "S3", "control", 0.5),
            read("r5", "S3", "control", 0.49),
            read("r6", "S2", "treated", 0.2),
        ]
    }

    #[test]
    fn test_threshold_boundary_counts_as_success() {
        let rs = vec![read("r1", "S1", "G1", 0.5), read("r2", "S1", "G1", 0.4999)];
        let b = binarize(&rs, BINARIZE_THRESHOLD);

        assert!(b[0].modified);
        assert!(!b[1].modified);
    }

    #[test]
    fn test_nan_probability_is_a_failure() {
        let rs = vec![read("r1", "S1", "G1", f64::NAN)];
        let counts = counts_by_group(&binarize(&rs, BINARIZE_THRESHOLD));

        assert_eq!(counts[0].successes, 0);
        assert_eq!(counts[0].failures, 1);
    }

    #[test]
    fn test_counts_sorted_by_group_then_sample() {
        let rs = reads();
        let counts = counts_by_group(&binarize(&rs, BINARIZE_THRESHOLD));

        let keys = counts
            .iter()
            .map(|c| (c.group_name.as_str(), c.sample_name.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![("control", "S3"), ("treated", "S1"), ("treated", "S2")]
        );

        assert_eq!((counts[0].successes, counts[0].failures), (1, 1));
        assert_eq!((counts[1].successes, counts[1].failures), (1, 1));
        assert_eq!((counts[2].successes, counts[2].failures), (1, 1));
    }

    #[test]
    fn test_counts_cover_every_row() {
        let rs = reads();
        let counts = counts_by_group(&binarize(&rs, BINARIZE_THRESHOLD));
        let total: usize = counts.iter().map(|c| c.successes + c.failures).sum();

        assert_eq!(total, rs.len());
    }

    #[test]
    fn test_label_order_follows_group_then_sample() {
        let rs = reads();
        let dist = labeled_distribution(&binarize(&rs, BINARIZE_THRESHOLD));

        // alphabetical on labels would put "S1 (treated)" first
        assert_eq!(
            dist.label_order,
            vec!["S3 (control)", "S1 (treated)", "S2 (treated)"]
        );
        assert_eq!(dist.points.len(), rs.len());
        assert!(dist.points.windows(2).all(|w| w[0].label <= w[1].label));
    }

    #[test]
    fn test_label_order_ignores_input_order() {
        let rs = reads();
        let mut reversed = rs.clone();
        reversed.reverse();

        let a = labeled_distribution(&binarize(&rs, BINARIZE_THRESHOLD));
        let b = labeled_distribution(&binarize(&reversed, BINARIZE_THRESHOLD));

        assert_eq!(a.label_order, b.label_order);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn test_label_stats_and_axis_text() {
        let rs = vec![
            read("r1", "S1", "G1", 0.9),
            read("r2", "S1", "G1", 0.8),
            read("r3", "S1", "G1", 0.1),
            read("r4", "S2", "G1", 0.7),
        ];
        let dist = labeled_distribution(&binarize(&rs, BINARIZE_THRESHOLD));

        let s1 = &dist.stats[0];
        assert_eq!((s1.n, s1.t, s1.f), (3, 2, 1));
        assert_eq!(s1.ratio, 0.667);
        assert!((s1.sd - 0.5773502691896258).abs() < 1e-12);
        assert_eq!(s1.upper, 1.0);
        assert_eq!(dist.axis_labels[0], "S1 (G1)\n(n=3, T=2, F=1, T/n=0.667)");

        // a single read has no spread: the bar collapses onto the mean
        let s2 = &dist.stats[1];
        assert!(s2.sd.is_nan());
        assert_eq!((s2.lower, s2.upper), (1.0, 1.0));
        assert_eq!(dist.axis_labels[1], "S2 (G1)\n(n=1, T=1, F=0, T/n=1.0)");
    }

    #[test]
    fn test_ratio_ties_round_to_even() {
        let mut rs = vec![read("r0", "S1", "G1", 0.9)];
        rs.extend((1..16).map(|i| read(&format!("r{i}"), "S1", "G1", 0.1)));
        let dist = labeled_distribution(&binarize(&rs, BINARIZE_THRESHOLD));

        let s = &dist.stats[0];
        assert_eq!((s.n, s.t, s.f), (16, 1, 15));
        assert_eq!(s.ratio, 0.062);
        assert_eq!(dist.axis_labels[0], "S1 (G1)\n(n=16, T=1, F=15, T/n=0.062)");
    }

    #[test]
    fn test_error_bar_is_clamped_to_unit_interval() {
        let rs = vec![
            read("r1", "S1", "G1", 0.1),
            read("r2", "S1", "G1", 0.1),
            read("r3", "S1", "G1", 0.1),
            read("r4", "S1", "G1", 0.9),
        ];
        let dist = labeled_distribution(&binarize(&rs, BINARIZE_THRESHOLD));
        let s = &dist.stats[0];

        assert_eq!(s.mean, 0.25);
        assert_eq!(s.lower, 0.0);
        assert!(s.upper > s.mean && s.upper <= 1.0);
    }

    #[test]
    fn test_summarize_without_reads_is_no_data() {
        assert_eq!(summarize(None, BINARIZE_THRESHOLD), Summary::NoData);
        let empty: Vec<ReadRecord> = Vec::new();
        assert_eq!(
            summarize(Some(empty.as_slice()), BINARIZE_THRESHOLD),
            Summary::NoData
        );

        let rs = reads();
        assert!(summarize(Some(rs.as_slice()), BINARIZE_THRESHOLD).has_data());
    }

    #[test]
    fn test_distribution_serializes_nan_sd_as_null() {
        let rs = vec![read("r1", "S1", "G1", 0.9)];
        let dist = labeled_distribution(&binarize(&rs, BINARIZE_THRESHOLD));
        let json = serde_json::to_value(&dist).unwrap();

        assert_eq!(json["stats"][0]["sd"], serde_json::Value::Null);
        assert_eq!(json["stats"][0]["T"], serde_json::json!(1));
        assert_eq!(json["x_label"], serde_json::json!("Sample (Group)"));
    }
}
