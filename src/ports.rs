//! Gateway port allocation.
//!
//! Each gateway gets `base + index` in declaration order. Collisions with the
//! listener or local tool port are not an error; `find_collisions` exists so
//! the launcher can warn about them.

use crate::error::SwitchyardError;

/// Port for the gateway at `index`: `base + index`.
pub fn allocate(base: u16, index: usize) -> crate::Result<u16> {
    u16::try_from(index)
        .ok()
        .and_then(|i| base.checked_add(i))
        .ok_or(SwitchyardError::PortOverflow(base, index))
}

/// Ports for `count` gateways, in order.
pub fn allocate_all(base: u16, count: usize) -> crate::Result<Vec<u16>> {
    (0..count).map(|i| allocate(base, i)).collect()
}

/// Return every allocated port that is also in `reserved`.
pub fn find_collisions(allocated: &[u16], reserved: &[u16]) -> Vec<u16> {
    allocated
        .iter()
        .copied()
        .filter(|p| reserved.contains(p))
        .collect()
}
