use num_traits::{Num, NumCast};

// quality of life improvement fns
#[inline(always)]
fn to_f64<N>(value: N) -> f64
where
    N: Num + NumCast + Copy,
{
    <f64 as NumCast>::from(value).unwrap_or(f64::NAN)
}

/// arithmetic mean; NaN for an empty slice
pub fn mean<N>(values: &[N]) -> f64
where
    N: Num + NumCast + Copy,
{
    if values.is_empty() {
        return f64::NAN;
    }

    let sum: f64 = values.iter().map(|x| to_f64(*x)).sum();
    sum / values.len() as f64
}

/// sample standard deviation (N - 1 denominator); NaN below two values
pub fn sample_std<N>(values: &[N]) -> f64
where
    N: Num + NumCast + Copy,
{
    if values.len() < 2 {
        return f64::NAN;
    }

    let mu = mean(values);
    let ss: f64 = values
        .iter()
        .map(|x| {
            let d = to_f64(*x) - mu;
            d * d
        })
        .sum();

    (ss / (values.len() - 1) as f64).sqrt()
}

/// round to `digits` decimals, ties to even
#[inline(always)]
pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round_ties_even() / scale
}

/// mean +/- sd clamped to [floor, ceil]; a NaN sd collapses the bar onto the mean
pub fn clamped_error_bar(mean: f64, sd: f64, floor: f64, ceil: f64) -> (f64, f64) {
    if sd.is_nan() {
        return (mean, mean);
    }

    ((mean - sd).max(floor), (mean + sd).min(ceil))
}
