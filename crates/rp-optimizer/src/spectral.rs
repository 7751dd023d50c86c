//! Periodograms and band-power profiles.

use std::f64::consts::PI;

/// Raw periodogram of the demeaned series at Fourier frequencies
/// `k / n` for `k = 1..=n/2`.
pub fn periodogram(series: &[f64]) -> Vec<f64> {
    let n = series.len();
    if n < 2 {
        return Vec::new();
    }
    let mean = series.iter().sum::<f64>() / n as f64;

    (1..=n / 2)
        .map(|k| {
            let omega = 2.0 * PI * k as f64 / n as f64;
            let (re, im) = series
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(re, im), (t, x)| {
                    let angle = omega * t as f64;
                    let centered = x - mean;
                    (re + centered * angle.cos(), im - centered * angle.sin())
                });
            (re * re + im * im) / n as f64
        })
        .collect()
}

/// Boundaries splitting `n_freqs` frequency indices into `bands` contiguous,
/// near-equal bands. Returns `bands + 1` edges starting at 0 and ending at
/// `n_freqs`.
pub fn band_edges(n_freqs: usize, bands: usize) -> Vec<usize> {
    (0..=bands).map(|j| j * n_freqs / bands.max(1)).collect()
}

/// Share of total power falling in each band. A series with no power gets a
/// flat profile.
pub fn band_shares(power: &[f64], edges: &[usize]) -> Vec<f64> {
    let bands = edges.len().saturating_sub(1);
    let total: f64 = power.iter().sum();
    if total <= 0.0 {
        return vec![1.0 / bands.max(1) as f64; bands];
    }
    edges
        .windows(2)
        .map(|w| power[w[0]..w[1]].iter().sum::<f64>() / total)
        .collect()
}
