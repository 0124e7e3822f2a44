/*!

Unitig compaction: condense every maximal non-branching path into a
single synthetic segment, producing a new store that replaces the
original.

A path is non-branching when every interior vertex has in-degree and
out-degree exactly one on the walked strand. The merged sequence is
the overlap-trimmed concatenation of the constituents' oriented
sequences; stable-coordinate anchoring survives only when every
constituent shares one unambiguous rank-0 backbone attribution.

*/

use fnv::{FnvHashMap, FnvHashSet};

#[allow(unused_imports)]
use log::{debug, info};

use crate::graph::{ArcGraph, SegmentRecord, StableAnchor};
use crate::handle::{SegmentId, Vertex};

/// Walk backwards from `v` to the first vertex of its non-branching
/// path.
fn walk_back(g: &ArcGraph, v: Vertex, used: &[bool]) -> Vertex {
    let mut guard: FnvHashSet<SegmentId> = FnvHashSet::default();
    guard.insert(v.id());
    let mut cur = v;
    loop {
        if g.in_degree(cur) != 1 {
            return cur;
        }
        let mut pred = None;
        for ix in g.arc_index_range(cur.flip()) {
            let a = g.arc(ix);
            if !a.del {
                pred = Some(a.w.flip());
            }
        }
        let p = pred.unwrap();
        if used[usize::from(p.id())]
            || g.degree(p) != 1
            || !guard.insert(p.id())
        {
            return cur;
        }
        cur = p;
    }
}

/// Walk forwards from `start`, consuming segments into one maximal
/// non-branching path.
fn walk_forward(
    g: &ArcGraph,
    start: Vertex,
    used: &mut [bool],
) -> Vec<Vertex> {
    let mut path = vec![start];
    used[usize::from(start.id())] = true;
    let mut cur = start;
    loop {
        if g.degree(cur) != 1 {
            return path;
        }
        let mut next = None;
        for ix in g.arc_index_range(cur) {
            let a = g.arc(ix);
            if !a.del {
                next = Some(a.w);
            }
        }
        let w = next.unwrap();
        if used[usize::from(w.id())] || g.in_degree(w) != 1 {
            return path;
        }
        used[usize::from(w.id())] = true;
        path.push(w);
        cur = w;
    }
}

struct UnitigParts {
    name: Vec<u8>,
    seq: Option<Vec<u8>>,
    len: i64,
    rank: i32,
    stable: Option<StableAnchor>,
}

fn compose(g: &ArcGraph, path: &[Vertex], ordinal: usize) -> UnitigParts {
    let first = path[0];
    let first_seg = g.segment(first.id());
    let mut len = first_seg.len;
    let mut seq = g.oriented_seq(first);
    let mut rank = first_seg.rank;

    let mut anchor = first_seg.stable;
    let mut anchored =
        !first.is_reverse() && first_seg.rank == 0 && anchor.is_some();
    let mut prev_end = anchor.map(|a| a.soff + first_seg.len).unwrap_or(0);

    for win in path.windows(2) {
        let (u, w) = (win[0], win[1]);
        let a = g
            .find_arc(u, w)
            .expect("non-branching path without a connecting arc");
        let sw = g.segment(w.id());
        len += sw.len - a.ov;
        if sw.rank > rank {
            rank = sw.rank;
        }
        seq = match (seq, g.oriented_seq(w)) {
            (Some(mut s), Some(ws)) => {
                let skip = (a.ov.max(0) as usize).min(ws.len());
                s.extend_from_slice(&ws[skip..]);
                Some(s)
            }
            _ => None,
        };
        if anchored {
            let ok = !w.is_reverse()
                && sw.rank == 0
                && match (anchor, sw.stable) {
                    (Some(af), Some(aw)) => {
                        aw.snid == af.snid && aw.soff == prev_end - a.ov
                    }
                    _ => false,
                };
            if ok {
                prev_end = sw.stable.unwrap().soff + sw.len;
            } else {
                anchored = false;
            }
        }
    }

    if !anchored {
        anchor = None;
    }
    UnitigParts {
        name: format!("utg{:06}", ordinal + 1).into_bytes(),
        seq,
        len,
        rank,
        stable: anchor,
    }
}

/// Generate the unitig graph. The returned store replaces the input;
/// constituent segments are not carried over.
pub fn generate_unitigs(g: &ArcGraph) -> ArcGraph {
    let mut used = vec![false; g.seg_slots()];
    for i in 0..g.seg_slots() {
        if g.segment(SegmentId(i as u32)).del {
            used[i] = true;
        }
    }

    let mut paths: Vec<Vec<Vertex>> = Vec::new();
    for i in 0..g.seg_slots() {
        if used[i] {
            continue;
        }
        let start =
            walk_back(g, Vertex::pack(SegmentId(i as u32), false), &used);
        paths.push(walk_forward(g, start, &mut used));
    }

    let mut out = ArcGraph::new();
    let mut new_ids: Vec<SegmentId> = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let parts = compose(g, path, i);
        let stable = parts
            .stable
            .map(|a| (g.stable_seq(a.snid).name.as_slice(), a.soff));
        let id = out.add_segment(SegmentRecord {
            name: &parts.name,
            seq: parts.seq.as_deref(),
            len: parts.len,
            rank: parts.rank,
            stable,
        });
        new_ids.push(id);
    }

    // boundary vertex maps: where arcs leave a unitig and where they
    // arrive at one
    let mut exit_of: FnvHashMap<Vertex, Vertex> = FnvHashMap::default();
    let mut entry_of: FnvHashMap<Vertex, Vertex> = FnvHashMap::default();
    for (path, &nid) in paths.iter().zip(&new_ids) {
        let first = *path.first().unwrap();
        let last = *path.last().unwrap();
        let nf = Vertex::pack(nid, false);
        exit_of.insert(last, nf);
        exit_of.insert(first.flip(), nf.flip());
        entry_of.insert(first, nf);
        entry_of.insert(last.flip(), nf.flip());
    }

    for (old_v, &new_v) in exit_of.iter() {
        for ix in g.arc_index_range(*old_v) {
            let a = g.arc(ix);
            // one half per physical link; the complement is re-created
            // by add_link on the other side
            if a.del || ix > a.comp {
                continue;
            }
            if let Some(&nw) = entry_of.get(&a.w) {
                out.add_link(new_v, nw, a.ov, a.ow);
            }
        }
    }

    out.build_index();
    info!(
        "generated {} unitigs from {} segments",
        paths.len(),
        used.iter().filter(|&&u| u).count()
    );
    out
}
