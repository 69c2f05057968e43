// Statistics of Monte Carlo samples

pub fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

pub fn variance(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let xbar = mean(data);
    let sumsq: f64 = data.iter().map(|x| (x - xbar).powi(2)).sum();
    sumsq / (n - 1.0)
}

pub fn std_dev(data: &[f64]) -> f64 {
    variance(data).sqrt()
}

pub fn sorted(data: &[f64]) -> Vec<f64> {
    let mut samples = data.to_vec();
    samples.sort_by(|a, b| a.total_cmp(b));
    samples
}

/// Interval trimming (1-conf)/2 from each tail. Data must be sorted.
pub fn symmetric_interval(sorted: &[f64], conf: f64) -> (f64, f64) {
    let n = sorted.len();
    let lo = ((n as f64 * (1.0 - conf) / 2.0).floor() as usize).min((n - 1) / 2);
    (sorted[lo], sorted[n - 1 - lo])
}

/// Narrowest interval containing round(conf*N) samples. Data must be sorted.
pub fn shortest_interval(sorted: &[f64], conf: f64) -> (f64, f64) {
    let n = sorted.len();
    let w = ((conf * n as f64).round() as usize).clamp(1, n);
    let mut best = 0;
    let mut best_width = f64::INFINITY;
    for i in 0..=(n - w) {
        let width = sorted[i + w - 1] - sorted[i];
        if width < best_width {
            best_width = width;
            best = i;
        }
    }
    (sorted[best], sorted[best + w - 1])
}
