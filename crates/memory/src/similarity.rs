use std::collections::BTreeSet;

/// Jaccard index `|a ∩ b| / |a ∪ b|`, defined as 0 when either set is empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (small, large) = if a.len() <= b.len() {
        (a, b)
    } else {
        (b, a)
    };
    let intersection = small.iter().filter(|t| large.contains(*t)).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}
