//! Ephemeral port search.
//!
//! Ports for "any port" binds are drawn from the configured ephemeral range
//! by a strided scan: pick a random starting offset and a random stride,
//! then walk `start + i * stride (mod n)` over `n` candidates. Three such
//! randomized passes are tried, followed by one linear pass from the start
//! of the range, which finds a free port whenever one exists.

use std::ops::RangeInclusive;

use rand::Rng;

/// Randomized passes before the linear sweep.
pub(crate) const RANDOM_PASSES: u32 = 3;

/// Find a port in `range` for which `is_free` returns `true`.
///
/// `is_free` is called at most `4 * range.len()` times.
pub(crate) fn find_ephemeral_port<R, F>(
    rng: &mut R,
    range: &RangeInclusive<u16>,
    mut is_free: F,
) -> Option<u16>
where
    R: Rng,
    F: FnMut(u16) -> bool,
{
    if range.is_empty() {
        return None;
    }
    let first = u32::from(*range.start());
    let n = u32::from(*range.end()) - first + 1;

    for pass in 0..=RANDOM_PASSES {
        let (offset, stride) = if pass < RANDOM_PASSES {
            (rng.random_range(0..n), random_stride(rng, n))
        } else {
            (0, 1)
        };
        for i in 0..n {
            let step = (u64::from(offset) + u64::from(i) * u64::from(stride)) % u64::from(n);
            let candidate = (first + step as u32) as u16;
            if is_free(candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

fn random_stride<R: Rng>(rng: &mut R, n: u32) -> u32 {
    if n <= 2 {
        return 1;
    }
    // Odd strides cover every port of a power-of-two sized range.
    rng.random_range(0..n / 2) * 2 + 1
}
