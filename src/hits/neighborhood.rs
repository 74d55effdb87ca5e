//! Neighbour lists between hits of one superlayer.

use super::wirehit::{HitId, WireHit};
use std::collections::BTreeMap;

/// Ordering key of hits inside a superlayer: layer first, then hit id.
#[inline]
pub fn hit_key(hit: &WireHit) -> (u16, HitId) {
    (hit.layer(), hit.id())
}

/// Adjacency between hits in the same superlayer, at most one layer apart
/// and within `max_distance` of each other. Lists are sorted by `hit_key`.
#[derive(Clone, Debug, Default)]
pub struct HitNeighborhood {
    neighbors: BTreeMap<HitId, Vec<HitId>>,
}

impl HitNeighborhood {
    pub fn build(hits: &[WireHit], ids: &[HitId], max_distance: f64) -> Self {
        let mut by_layer: BTreeMap<(u8, u16), Vec<HitId>> = BTreeMap::new();
        for &id in ids {
            let hit = &hits[id];
            by_layer
                .entry((hit.superlayer(), hit.layer()))
                .or_default()
                .push(id);
        }

        let max_sq = max_distance * max_distance;
        let mut neighbors = BTreeMap::new();
        for &id in ids {
            let hit = &hits[id];
            let layer = hit.layer();
            let mut list = Vec::new();
            for other_layer in layer.saturating_sub(1)..=layer.saturating_add(1) {
                let Some(candidates) = by_layer.get(&(hit.superlayer(), other_layer)) else {
                    continue;
                };
                for &other in candidates {
                    if other == id {
                        continue;
                    }
                    let gap = hits[other].reference_position() - hit.reference_position();
                    if gap.norm_squared() <= max_sq {
                        list.push(other);
                    }
                }
            }
            list.sort_by_key(|&other| hit_key(&hits[other]));
            neighbors.insert(id, list);
        }
        Self { neighbors }
    }

    pub fn neighbors(&self, id: HitId) -> &[HitId] {
        self.neighbors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Hits in ascending `hit_key` order.
    pub fn hits_in_order(&self, hits: &[WireHit]) -> Vec<HitId> {
        let mut ids: Vec<HitId> = self.neighbors.keys().copied().collect();
        ids.sort_by_key(|&id| hit_key(&hits[id]));
        ids
    }
}
