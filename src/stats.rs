//! Descriptive statistics used by the plots: medians for imputation,
//! Pearson correlation, Gaussian kernel density estimates and histograms.

use std::f64::consts::PI;

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the finite values; the mean of the middle pair for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Sample standard deviation (n − 1 denominator).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pearson correlation over the rows where both values are present.
/// `NaN` when fewer than two such rows exist or either side is constant.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Square matrix of pairwise correlations, row-major in column order.
pub fn correlation_matrix(columns: &[&[Option<f64>]]) -> Vec<Vec<f64>> {
    let n = columns.len();
    let mut matrix = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(columns[i], columns[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

// ---------------------------------------------------------------------------
// Kernel density
// ---------------------------------------------------------------------------

/// Gaussian kernel density estimate with Scott's bandwidth.
#[derive(Debug, Clone)]
pub struct Kde {
    samples: Vec<f64>,
    bandwidth: f64,
}

impl Kde {
    /// `None` when there are fewer than two samples or they have no spread.
    pub fn fit(samples: &[f64]) -> Option<Self> {
        let std = sample_std(samples)?;
        if !(std > 0.0) {
            return None;
        }
        let bandwidth = std * (samples.len() as f64).powf(-0.2);
        Some(Self {
            samples: samples.to_vec(),
            bandwidth,
        })
    }

    /// Probability density at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let norm = 1.0 / ((2.0 * PI).sqrt() * h * self.samples.len() as f64);
        self.samples
            .iter()
            .map(|s| {
                let z = (x - s) / h;
                (-0.5 * z * z).exp()
            })
            .sum::<f64>()
            * norm
    }

    /// `points` evenly spaced `(x, density)` pairs over `[lo, hi]`.
    pub fn grid(&self, lo: f64, hi: f64, points: usize) -> Vec<(f64, f64)> {
        let steps = points.max(2) - 1;
        (0..=steps)
            .map(|i| {
                let x = lo + (hi - lo) * i as f64 / steps as f64;
                (x, self.evaluate(x))
            })
            .collect()
    }

    /// Data range widened by `cut` bandwidths on each side.
    pub fn support(&self, cut: f64) -> (f64, f64) {
        let (lo, hi) = min_max(&self.samples).unwrap_or((0.0, 0.0));
        (lo - cut * self.bandwidth, hi + cut * self.bandwidth)
    }
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Equal-width bins spanning the data. The last bin is closed on the
    /// right so the maximum lands in it.
    pub fn build(values: &[f64], bins: usize) -> Option<Self> {
        let (lo, hi) = min_max(values)?;
        let bins = bins.max(1);
        let (start, bin_width) = if hi > lo {
            (lo, (hi - lo) / bins as f64)
        } else {
            (lo - 0.5, 1.0 / bins as f64)
        };

        let mut counts = vec![0; bins];
        for &v in values {
            let idx = ((v - start) / bin_width).floor() as usize;
            counts[idx.min(bins - 1)] += 1;
        }
        Some(Self {
            start,
            bin_width,
            counts,
        })
    }

    /// `(left, right, count)` for each bin.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.counts.iter().enumerate().map(|(i, &c)| {
            let left = self.start + i as f64 * self.bin_width;
            (left, left + self.bin_width, c)
        })
    }

    pub fn end(&self) -> f64 {
        self.start + self.bin_width * self.counts.len() as f64
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().copied().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn median_odd_even_and_empty() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((std - 2.138_089_935).abs() < 1e-6);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let x = some(&[1.0, 2.0, 3.0, 4.0]);
        let y = some(&[2.0, 4.0, 6.0, 8.0]);
        let z = some(&[4.0, 3.0, 2.0, 1.0]);
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &z) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_skips_incomplete_pairs() {
        let x = vec![Some(1.0), None, Some(2.0), Some(3.0)];
        let y = vec![Some(1.0), Some(100.0), Some(2.0), Some(3.0)];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_constant_is_nan() {
        let x = some(&[1.0, 1.0, 1.0]);
        let y = some(&[1.0, 2.0, 3.0]);
        assert!(pearson(&x, &y).is_nan());
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let a = some(&[1.0, 2.0, 3.0, 5.0]);
        let b = some(&[0.5, 0.1, 0.9, 0.3]);
        let m = correlation_matrix(&[a.as_slice(), b.as_slice()]);
        assert!((m[0][0] - 1.0).abs() < 1e-12);
        assert!((m[1][1] - 1.0).abs() < 1e-12);
        assert_eq!(m[0][1], m[1][0]);
    }

    #[test]
    fn kde_integrates_to_about_one() {
        let kde = Kde::fit(&[1.0, 2.0, 2.5, 3.0, 7.0]).unwrap();
        let (lo, hi) = kde.support(5.0);
        let grid = kde.grid(lo, hi, 2001);
        let dx = grid[1].0 - grid[0].0;
        let area: f64 = grid.iter().map(|p| p.1 * dx).sum();
        assert!((area - 1.0).abs() < 0.01, "area = {area}");
    }

    #[test]
    fn kde_rejects_degenerate_samples() {
        assert!(Kde::fit(&[]).is_none());
        assert!(Kde::fit(&[4.0]).is_none());
        assert!(Kde::fit(&[4.0, 4.0, 4.0]).is_none());
    }

    #[test]
    fn histogram_covers_every_value() {
        let values = [0.0, 1.0, 2.0, 3.0, 10.0];
        let hist = Histogram::build(&values, 5).unwrap();
        assert_eq!(hist.counts.iter().sum::<usize>(), values.len());
        assert_eq!(hist.counts[4], 1);
        assert!((hist.end() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn histogram_of_constant_values() {
        let hist = Histogram::build(&[5.0, 5.0], 30).unwrap();
        assert_eq!(hist.counts.iter().sum::<usize>(), 2);
        assert!(Histogram::build(&[], 30).is_none());
    }
}
