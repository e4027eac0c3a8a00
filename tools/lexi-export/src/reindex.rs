//! Vertex deduplication
//!
//! Two vertices are the same vertex when every attribute array holds
//! byte-identical elements for them. Vertices are ordered lexicographically,
//! array by array and byte by byte, which lets an ordered map find the first
//! occurrence of each distinct tuple in `O(log n)`.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::intermediate::Triangle;
use crate::mesh_array::MeshArray;

/// Result of a reindex pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexTable {
    /// Old vertex index → new vertex index
    pub remap: Vec<u32>,
    /// New vertex index → representative old index
    pub picks: Vec<u32>,
}

impl ReindexTable {
    pub fn old_vertex_count(&self) -> usize {
        self.remap.len()
    }

    pub fn new_vertex_count(&self) -> usize {
        self.picks.len()
    }

    /// True when nothing was merged
    pub fn is_identity(&self) -> bool {
        self.picks.iter().enumerate().all(|(i, &p)| p as usize == i)
    }

    /// Compact an array that is still in the old index space
    pub fn apply(&self, array: &mut MeshArray) {
        array.select(&self.picks);
    }
}

struct VertexKey<'a> {
    arrays: &'a [&'a MeshArray],
    index: usize,
}

impl Ord for VertexKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        for array in self.arrays {
            let ord = array
                .element_bytes(self.index)
                .cmp(array.element_bytes(other.index));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for VertexKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VertexKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VertexKey<'_> {}

/// Compute the dedup table for a set of equally sized arrays
///
/// Returns `None` when there is nothing to compare: no arrays, an empty first
/// array, or arrays whose lengths disagree.
pub fn build_reindex_table(arrays: &[&MeshArray]) -> Option<ReindexTable> {
    let first = arrays.first()?;
    let count = first.len();
    if count == 0 {
        return None;
    }
    if arrays.iter().any(|a| a.len() != count) {
        tracing::warn!("Reindex skipped: attribute arrays have different lengths");
        return None;
    }

    let mut seen: BTreeMap<VertexKey<'_>, u32> = BTreeMap::new();
    let mut remap = Vec::with_capacity(count);
    let mut picks = Vec::new();

    for index in 0..count {
        let next = picks.len() as u32;
        let new_index = *seen.entry(VertexKey { arrays, index }).or_insert(next);
        if new_index == next {
            picks.push(index as u32);
        }
        remap.push(new_index);
    }

    Some(ReindexTable { remap, picks })
}

/// Deduplicate `arrays` in place and remap `triangles` onto the compact set
pub fn reindex(arrays: &mut [MeshArray], triangles: &mut [Triangle]) -> Option<ReindexTable> {
    let table = {
        let refs: Vec<&MeshArray> = arrays.iter().collect();
        build_reindex_table(&refs)?
    };

    for array in arrays.iter_mut() {
        table.apply(array);
    }
    for triangle in triangles.iter_mut() {
        for index in &mut triangle.indices {
            *index = table.remap[*index as usize];
        }
    }
    Some(table)
}
