/*!

Bounded-radius subgraph extraction and seed deletion.

Extraction restricts the store in place: after the call, the store
holds exactly the induced subgraph of the vertices within the hop
radius of the seeds. Deletion is the complement operation, removing
exactly the seeds. The two differ deliberately in how a missing seed
name is handled: extraction skips it, deletion aborts.

*/

use std::collections::VecDeque;

use bstr::ByteSlice;
use fnv::FnvHashSet;

#[allow(unused_imports)]
use log::{debug, info};

use crate::error::GraphError;
use crate::graph::ArcGraph;
use crate::handle::{SegmentId, Vertex};

/// Keep only the segments within `radius` hops of the seed set,
/// searched over both strands, and the arcs with both endpoints
/// inside the collected set. Radius 0 keeps exactly the seeds; a
/// negative radius clamps to 0. Seed names that are not in the graph
/// are skipped. Returns the number of segments kept.
pub fn extract_subgraph<N: AsRef<[u8]>>(
    g: &mut ArcGraph,
    seeds: &[N],
    radius: i64,
) -> usize {
    let radius = radius.max(0);
    let mut keep: FnvHashSet<SegmentId> = FnvHashSet::default();
    let mut visited: FnvHashSet<Vertex> = FnvHashSet::default();
    let mut queue: VecDeque<(Vertex, i64)> = VecDeque::new();

    for name in seeds {
        match g.name_to_id(name.as_ref()) {
            Ok(id) => {
                if g.segment(id).del {
                    continue;
                }
                keep.insert(id);
                for &rev in &[false, true] {
                    let v = Vertex::pack(id, rev);
                    if visited.insert(v) {
                        queue.push_back((v, 0));
                    }
                }
            }
            Err(_) => {
                debug!(
                    "subgraph seed not found, skipped: {}",
                    name.as_ref().as_bstr()
                );
            }
        }
    }

    while let Some((u, hops)) = queue.pop_front() {
        if hops == radius {
            continue;
        }
        for ix in g.arc_index_range(u) {
            let a = g.arc(ix);
            if a.del {
                continue;
            }
            keep.insert(a.w.id());
            for &x in &[a.w, a.w.flip()] {
                if visited.insert(x) {
                    queue.push_back((x, hops + 1));
                }
            }
        }
    }

    let doomed: Vec<SegmentId> = g
        .segments()
        .map(|(id, _)| id)
        .filter(|id| !keep.contains(id))
        .collect();
    for id in doomed {
        g.delete_segment(id);
    }
    g.cleanup();
    info!("subgraph extraction kept {} segments", keep.len());
    keep.len()
}

/// Delete exactly the named segments and every arc touching them.
/// Every name is resolved before any mutation, so a missing name
/// aborts with `SegmentNotFound` and leaves the store untouched.
pub fn delete_segments_by_name<N: AsRef<[u8]>>(
    g: &mut ArcGraph,
    names: &[N],
) -> Result<usize, GraphError> {
    let ids = names
        .iter()
        .map(|n| g.name_to_id(n.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    for &id in &ids {
        g.delete_segment(id);
    }
    g.cleanup();
    info!("deleted {} seed segments", ids.len());
    Ok(ids.len())
}
