//! Seed quorum sizing.
//!
//! Both formulas are tuned heuristics: they keep the quorum small enough that
//! a small deployment can always reach it.

/// Default datacenter seed quorum.
pub const DEFAULT_SEED_QUORUM: usize = 2;

/// Upper bound on the default fabric seed quorum.
pub const DEFAULT_FABRIC_MAX_QUORUM: usize = 5;

fn explicit(override_size: Option<usize>) -> Option<usize> {
    override_size.filter(|&q| q > 0)
}

/// `override` if positive, else `min(max(initial_size, 1), 2)`.
pub fn datacenter_quorum_size(initial_size: usize, override_size: Option<usize>) -> usize {
    explicit(override_size).unwrap_or_else(|| initial_size.max(1).min(DEFAULT_SEED_QUORUM))
}

/// `override` if positive, else the summed initial sizes scaled down and
/// clamped to `[1, 5]`.
pub fn fabric_quorum_size(
    initial_sizes: impl IntoIterator<Item = usize>,
    override_size: Option<usize>,
) -> usize {
    if let Some(q) = explicit(override_size) {
        return q;
    }
    let total: usize = initial_sizes.into_iter().sum();
    let scaled = if total > 5 {
        total / 2
    } else if total > 3 {
        total - 2
    } else if total > 2 {
        total - 1
    } else {
        total
    };
    scaled.clamp(1, DEFAULT_FABRIC_MAX_QUORUM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datacenter_default_quorum() {
        assert_eq!(datacenter_quorum_size(0, None), 1);
        assert_eq!(datacenter_quorum_size(1, None), 1);
        assert_eq!(datacenter_quorum_size(5, None), 2);
        assert_eq!(datacenter_quorum_size(5, Some(0)), 2);
        assert_eq!(datacenter_quorum_size(5, Some(3)), 3);
    }

    #[test]
    fn test_fabric_quorum_formula() {
        assert_eq!(fabric_quorum_size([3, 3], None), 3);
        assert_eq!(fabric_quorum_size([2, 2], None), 2);
        assert_eq!(fabric_quorum_size([3], None), 2);
        assert_eq!(fabric_quorum_size([1, 1], None), 2);
        assert_eq!(fabric_quorum_size([1], None), 1);
        assert_eq!(fabric_quorum_size(std::iter::empty(), None), 1);
        assert_eq!(fabric_quorum_size([10, 10], None), 5);
        assert_eq!(fabric_quorum_size([10, 10], Some(7)), 7);
    }
}
