use serde::{Deserialize, Serialize};

use crate::board::Point;
use crate::level::LoadError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crate {
    pub position: Point,
    /// True iff `position` is one of the destinations. Recomputed on every relocation.
    pub on_target: bool,
}

/// Crates and destinations of one level. Both sequences are sized once at load;
/// a crate's identity is its index, which never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntityRegistry {
    crates: Box<[Crate]>,
    destinations: Box<[Point]>,
}

impl EntityRegistry {
    /// Crate positions in load order and every destination (including those
    /// already holding a crate). Counts must match.
    pub fn new(crate_positions: Vec<Point>, destinations: Vec<Point>) -> Result<Self, LoadError> {
        if crate_positions.len() != destinations.len() {
            return Err(LoadError::CrateDestinationCountMismatch {
                crates: crate_positions.len(),
                destinations: destinations.len(),
            });
        }
        let crates = crate_positions
            .into_iter()
            .map(|position| Crate { position, on_target: destinations.contains(&position) })
            .collect();
        Ok(Self { crates, destinations: destinations.into_boxed_slice() })
    }

    pub fn crates(&self) -> &[Crate] {
        &self.crates
    }

    pub fn destinations(&self) -> &[Point] {
        &self.destinations
    }

    pub fn is_destination(&self, p: Point) -> bool {
        self.destinations.contains(&p)
    }

    /// Index of the crate standing on `p`, if any.
    pub fn crate_at(&self, p: Point) -> Option<usize> {
        self.crates.iter().position(|c| c.position == p)
    }

    /// Only the move resolver relocates crates.
    pub(crate) fn relocate_crate(&mut self, index: usize, to: Point) {
        let on_target = self.is_destination(to);
        let c = &mut self.crates[index];
        c.position = to;
        c.on_target = on_target;
    }

    pub fn all_on_target(&self) -> bool {
        self.crates.iter().all(|c| c.on_target)
    }

    pub fn crates_on_target(&self) -> usize {
        self.crates.iter().filter(|c| c.on_target).count()
    }
}
