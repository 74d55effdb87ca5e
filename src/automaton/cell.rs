use bitflags::bitflags;
use serde::Serialize;

bitflags! {
    /// Usage flags of an automaton cell.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CellFlags: u8 {
        /// Consumed by an accepted candidate.
        const TAKEN      = 1 << 0;
        /// Shares hits with an accepted candidate.
        const MASKED     = 1 << 1;
        /// Malformed or otherwise unusable input.
        const BACKGROUND = 1 << 2;
        /// Left over by the topological sort; only set while reporting a cycle.
        const CYCLE      = 1 << 3;
    }
}

/// Lifecycle of the object owning the cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum CellStatus {
    #[default]
    Unused,
    Assigned,
    Final,
}

/// Per-object mutable automaton state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AutomatonCell {
    weight: f64,
    flags: CellFlags,
    status: CellStatus,
}

impl AutomatonCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background() -> Self {
        Self {
            flags: CellFlags::BACKGROUND,
            ..Self::default()
        }
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[inline]
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    #[inline]
    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    #[inline]
    pub fn status(&self) -> CellStatus {
        self.status
    }

    /// Neither taken, masked nor background.
    #[inline]
    pub fn is_usable(&self) -> bool {
        !self
            .flags
            .intersects(CellFlags::TAKEN | CellFlags::MASKED | CellFlags::BACKGROUND)
    }

    #[inline]
    pub fn is_taken(&self) -> bool {
        self.flags.contains(CellFlags::TAKEN)
    }

    #[inline]
    pub fn is_masked(&self) -> bool {
        self.flags.contains(CellFlags::MASKED)
    }

    #[inline]
    pub fn is_background(&self) -> bool {
        self.flags.contains(CellFlags::BACKGROUND)
    }

    pub fn set_background(&mut self) {
        self.flags.insert(CellFlags::BACKGROUND);
    }

    pub fn set_masked(&mut self) {
        self.flags.insert(CellFlags::MASKED);
    }

    pub fn set_cycle(&mut self, on: bool) {
        self.flags.set(CellFlags::CYCLE, on);
    }

    /// Marks the cell as consumed by a candidate.
    pub fn take(&mut self) {
        self.flags.insert(CellFlags::TAKEN);
        self.status = CellStatus::Assigned;
    }

    pub fn finalize(&mut self) {
        self.flags.insert(CellFlags::TAKEN);
        self.status = CellStatus::Final;
    }

    /// Returns the cell to the pool of usable objects.
    pub fn release(&mut self) {
        self.flags.remove(CellFlags::TAKEN | CellFlags::MASKED);
        self.status = CellStatus::Unused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        let mut cell = AutomatonCell::new();
        assert!(cell.is_usable());
        cell.take();
        assert!(cell.is_taken());
        assert_eq!(cell.status(), CellStatus::Assigned);
        assert!(!cell.is_usable());
        cell.release();
        assert!(cell.is_usable());
        assert_eq!(cell.status(), CellStatus::Unused);
        cell.finalize();
        assert_eq!(cell.status(), CellStatus::Final);
    }

    #[test]
    fn background_survives_release() {
        let mut cell = AutomatonCell::background();
        cell.release();
        assert!(cell.is_background());
        assert!(!cell.is_usable());
    }

    #[test]
    fn masked_cells_are_not_usable() {
        let mut cell = AutomatonCell::new();
        cell.set_masked();
        assert!(cell.is_masked());
        assert!(!cell.is_usable());
        assert!(!cell.is_taken());
    }
}
