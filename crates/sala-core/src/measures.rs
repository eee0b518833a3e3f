//! Normalisation constants and summaries for integration measures.

/// Hillier-Hanson D-value for a graph of `k` nodes (Kruger 1989 form).
pub fn dvalue(k: f64) -> f64 {
    2.0 * (k * (((k + 2.0) / 3.0).log2() - 1.0) + 1.0) / ((k - 1.0) * (k - 2.0))
}

/// Hillier-Hanson P-value for a graph of `k` nodes.
pub fn pvalue(k: f64) -> f64 {
    2.0 * (k - k.log2() - 1.0) / ((k - 1.0) * (k - 2.0))
}

/// Teklenburg integration.
pub fn teklinteg(node_count: f64, total_depth: f64) -> f64 {
    (0.5 * (node_count - 2.0)).ln() / (total_depth - node_count + 1.0).ln()
}

/// Depth-based measures of one search from an origin.
///
/// `node_count` includes the origin. Each optional measure is `None`
/// where it is undefined for the graph size or depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthSummary {
    /// Mean depth, excluding the origin.
    pub mean_depth: f64,
    /// Integration normalised by the D-value.
    pub integration_hh: Option<f64>,
    /// Integration normalised by the P-value.
    pub integration_pv: Option<f64>,
    /// Teklenburg integration.
    pub integration_tk: Option<f64>,
}

impl DepthSummary {
    /// Summarise a search. Returns `None` when only the origin was reached.
    pub fn new(total_depth: f64, node_count: f64) -> Option<Self> {
        if node_count <= 1.0 {
            return None;
        }
        let mean_depth = total_depth / (node_count - 1.0);
        let mut summary = Self {
            mean_depth,
            integration_hh: None,
            integration_pv: None,
            integration_tk: None,
        };
        if node_count > 2.0 && mean_depth > 1.0 {
            let ra = 2.0 * (mean_depth - 1.0) / (node_count - 2.0);
            summary.integration_hh = Some(dvalue(node_count) / ra);
            summary.integration_pv = Some(pvalue(node_count) / ra);
            if total_depth - node_count + 1.0 > 1.0 {
                summary.integration_tk = Some(teklinteg(node_count, total_depth));
            }
        }
        Some(summary)
    }
}

/// Entropy of a depth histogram, and the entropy relative to a Poisson
/// distribution with the same mean depth.
///
/// `counts[d]` is the number of nodes at depth `d`; depth 0 (the origin)
/// is skipped. `node_count` includes the origin.
pub fn depth_entropy(counts: &[usize], node_count: usize, mean_depth: f64) -> (f64, f64) {
    let others = node_count.saturating_sub(1).max(1) as f64;
    let mut entropy = 0.0;
    let mut rel_entropy = 0.0;
    let mut factorial = 1.0;
    for (k, &c) in counts.iter().enumerate().skip(1) {
        if c == 0 {
            continue;
        }
        let prob = c as f64 / others;
        entropy -= prob * prob.log2();
        factorial *= (k + 1) as f64;
        let q = (mean_depth.powi(k as i32) / factorial) * (-mean_depth).exp();
        rel_entropy += prob * (prob / q).log2();
    }
    (entropy, rel_entropy)
}
