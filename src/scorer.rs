//! Gender imbalance metrics shared by placement and swap decisions.

/// How lopsided a (male, female) split is. 1.0 is a perfect split, 0.0 an empty group.
/// A one-sided group scores its own size so that it never looks balanced.
pub fn imbalance(male: usize, female: usize) -> f64 {
    match (male, female) {
        (0, 0) => 0.0,
        (0, n) | (n, 0) => n as f64,
        (a, b) => a.max(b) as f64 / a.min(b) as f64,
    }
}

/// Signed distance from an even split: positive when male-heavy, negative when
/// female-heavy, zero when even or empty.
pub fn skew(male: usize, female: usize) -> f64 {
    let score = imbalance(male, female);
    let magnitude = if male == 0 || female == 0 {
        score
    } else {
        score - 1.0
    };
    if female > male {
        -magnitude
    } else {
        magnitude
    }
}

/// Distance between a group's split and the pool-wide target split.
pub fn deviation(male: usize, female: usize, target: (usize, usize)) -> f64 {
    (skew(male, female) - skew(target.0, target.1)).abs()
}
