//! Trailing-window indicators over aligned close series.
//!
//! SMA(n)[i]    = mean(C[i-n+1..=i])
//! RET[i]       = C[i] / C[i-1] - 1, with RET[0] = 0 and 0 across gaps
//! STDDEV(n)[i] = sample standard deviation of RET[i-n+1..=i]
//!
//! A window is usable only when all `n` closes in it are present.

/// The trailing window ending at `end`, or `None` when it is incomplete.
pub fn trailing_window(closes: &[Option<f64>], end: usize, period: usize) -> Option<Vec<f64>> {
    if period == 0 || end >= closes.len() || end + 1 < period {
        return None;
    }
    closes[end + 1 - period..=end].iter().copied().collect()
}

pub fn simple_moving_average(closes: &[Option<f64>], end: usize, period: usize) -> Option<f64> {
    let window = trailing_window(closes, end, period)?;
    Some(window.iter().sum::<f64>() / period as f64)
}

pub fn daily_returns(closes: &[Option<f64>]) -> Vec<f64> {
    let mut returns = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        let r = match (i.checked_sub(1).and_then(|p| closes[p]), closes[i]) {
            (Some(prev), Some(cur)) if prev != 0.0 => cur / prev - 1.0,
            _ => 0.0,
        };
        returns.push(r);
    }
    returns
}

/// Sample (n - 1) standard deviation; zero for fewer than two values.
pub fn sample_stddev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1) as f64;
    variance.sqrt()
}

/// Volatility of returns over the trailing window ending at `end`.
pub fn return_volatility(returns: &[f64], end: usize, period: usize) -> Option<f64> {
    if period == 0 || end >= returns.len() || end + 1 < period {
        return None;
    }
    Some(sample_stddev(&returns[end + 1 - period..=end]))
}
