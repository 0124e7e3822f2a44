/*!

Backbone-relative bubble/region detection.

From every backbone (rank-0, stable-anchored) vertex with out-degree
above one, a reconvergence search runs forward over the bidirected
graph. A vertex joins the expansion frontier only once every one of
its incoming arcs has been seen from inside the search, so the
expansion order is a topological order of the region and path-length
extremes fall out of a single forward pass. The region closes when
exactly one frontier vertex remains with nothing pending; branches
that dead-end, loop back to the source, or pick up support from
outside the region abandon the candidate silently.

Results are recomputed fresh per query and invalidated by any
mutation; [`ArcGraph::sort_ref_arcs`] must have run beforehand.

*/

use bstr::BString;
use fnv::{FnvHashMap, FnvHashSet};

#[allow(unused_imports)]
use log::{debug, info, trace};

use crate::error::GraphError;
use crate::graph::ArcGraph;
use crate::handle::{SegmentId, Vertex};

const NO_VERTEX: Vertex = Vertex::from_integer(u64::MAX);

/// A structure where the graph diverges from and reconverges to the
/// backbone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    /// Stable sequence the region is anchored on.
    pub snid: u32,
    /// Stable coordinate of the source segment's end.
    pub ss: i64,
    /// Stable coordinate of the sink segment's start.
    pub se: i64,
    /// Member vertices in expansion order; source first, sink last.
    pub vs: Vec<Vertex>,
    /// Distinct source→sink paths, saturating.
    pub n_paths: i64,
    /// Some path crosses a strand flip, mostly an inversion.
    pub is_bidir: bool,
    /// Shortest interior path length, in bases.
    pub len_min: i64,
    /// Longest interior path length, in bases.
    pub len_max: i64,
    /// Representative interior sequence of the shortest path; empty
    /// when the length is zero or a member sequence is absent.
    pub seq_min: Vec<u8>,
    /// Representative interior sequence of the longest path.
    pub seq_max: Vec<u8>,
}

struct SearchState {
    d_min: i64,
    d_max: i64,
    n_paths: i64,
    seen: usize,
    p_min: Vertex,
    p_max: Vertex,
}

struct Closure {
    sink: Vertex,
    order: Vec<Vertex>,
    state: FnvHashMap<Vertex, SearchState>,
}

/// Reconvergence search from `v0`. Returns `None` when the region
/// never closes; such branches are abandoned, not reported.
fn search_from(g: &ArcGraph, v0: Vertex) -> Option<Closure> {
    let mut state: FnvHashMap<Vertex, SearchState> = FnvHashMap::default();
    let mut stack = vec![v0];
    let mut order: Vec<Vertex> = Vec::new();
    let mut pending = 0usize;

    state.insert(
        v0,
        SearchState {
            d_min: 0,
            d_max: 0,
            n_paths: 1,
            seen: 0,
            p_min: NO_VERTEX,
            p_max: NO_VERTEX,
        },
    );

    loop {
        let u = stack.pop()?;
        if stack.is_empty() && pending == 0 && u != v0 {
            if order.len() < 2 {
                return None;
            }
            order.push(u);
            return Some(Closure {
                sink: u,
                order,
                state,
            });
        }

        let (du_min, du_max, du_paths) = {
            let s = &state[&u];
            (s.d_min, s.d_max, s.n_paths)
        };
        let mut expanded = false;
        for ix in g.arc_index_range(u) {
            let a = *g.arc(ix);
            if a.del {
                continue;
            }
            expanded = true;
            let w = a.w;
            if w.id() == v0.id() {
                // looped back onto the source segment
                return None;
            }
            let step = g.seg_len(w) - a.ov;
            let in_deg = g.in_degree(w);
            let st = state.entry(w).or_insert_with(|| {
                pending += 1;
                SearchState {
                    d_min: i64::MAX,
                    d_max: i64::MIN,
                    n_paths: 0,
                    seen: 0,
                    p_min: NO_VERTEX,
                    p_max: NO_VERTEX,
                }
            });
            let cand_min = du_min + step;
            let cand_max = du_max + step;
            if cand_min < st.d_min
                || (cand_min == st.d_min && u.0 < st.p_min.0)
            {
                st.d_min = cand_min;
                st.p_min = u;
            }
            if cand_max > st.d_max
                || (cand_max == st.d_max && u.0 < st.p_max.0)
            {
                st.d_max = cand_max;
                st.p_max = u;
            }
            st.n_paths = st.n_paths.saturating_add(du_paths);
            st.seen += 1;
            if st.seen > in_deg {
                // parallel arcs; the store was not normalized
                return None;
            }
            if st.seen == in_deg {
                pending -= 1;
                stack.push(w);
            }
        }
        if !expanded {
            // dead end inside the region
            return None;
        }
        order.push(u);
    }
}

/// Walk a parent chain from the sink back to the source; returns the
/// full path, source first.
fn parent_path(
    state: &FnvHashMap<Vertex, SearchState>,
    v0: Vertex,
    sink: Vertex,
    min_side: bool,
) -> Vec<Vertex> {
    let mut path = vec![sink];
    let mut cur = sink;
    while cur != v0 {
        let s = &state[&cur];
        cur = if min_side { s.p_min } else { s.p_max };
        path.push(cur);
    }
    path.reverse();
    path
}

/// Overlap-trimmed concatenation of the interior sequences of a
/// source→sink path. Empty when any interior sequence is absent.
fn path_interior_seq(g: &ArcGraph, path: &[Vertex]) -> Vec<u8> {
    let mut seq: Vec<u8> = Vec::new();
    for win in path.windows(2) {
        let (u, w) = (win[0], win[1]);
        let a = match g.find_arc(u, w) {
            Some(a) => a,
            None => return Vec::new(),
        };
        if w == *path.last().unwrap() {
            // bases shared with the sink lie past the region end
            let keep = seq.len().saturating_sub(a.ov.max(0) as usize);
            seq.truncate(keep);
        } else {
            match g.oriented_seq(w) {
                Some(s) => {
                    let skip = (a.ov.max(0) as usize).min(s.len());
                    seq.extend_from_slice(&s[skip..]);
                }
                None => return Vec::new(),
            }
        }
    }
    seq
}

fn close_bubble(g: &ArcGraph, v0: Vertex, cl: Closure) -> Option<Bubble> {
    let src = g.segment(v0.id());
    let snk = g.segment(cl.sink.id());
    let src_anchor = src.stable?;
    let snk_anchor = snk.stable?;
    if snk.rank != 0 || src_anchor.snid != snk_anchor.snid {
        return None;
    }

    let sink_state = &cl.state[&cl.sink];
    let n_paths = sink_state.n_paths;
    let len_min = (sink_state.d_min - snk.len).max(0);
    let len_max = (sink_state.d_max - snk.len).max(0);
    let (seq_min, seq_max) = if len_min == 0 && len_max == 0 {
        (Vec::new(), Vec::new())
    } else {
        let p_min = parent_path(&cl.state, v0, cl.sink, true);
        let p_max = parent_path(&cl.state, v0, cl.sink, false);
        (
            path_interior_seq(g, &p_min),
            path_interior_seq(g, &p_max),
        )
    };

    // the walk follows the backbone forward, so any member visited
    // on the reverse strand crossed a strand flip
    let is_bidir = cl.order.iter().any(|v| v.is_reverse());

    Some(Bubble {
        snid: src_anchor.snid,
        ss: src_anchor.soff + src.len,
        se: snk_anchor.soff,
        n_paths,
        is_bidir,
        len_min,
        len_max,
        seq_min,
        seq_max,
        vs: cl.order,
    })
}

/// Find all backbone-divergent regions. Deterministic: two calls
/// with no intervening mutation yield an identical ordered result
/// set.
pub fn find_bubbles(g: &ArcGraph) -> Vec<Bubble> {
    let mut backbone: Vec<(u32, i64, SegmentId)> = g
        .segments()
        .filter_map(|(id, s)| {
            let anchor = s.stable?;
            if s.rank == 0 {
                Some((anchor.snid, anchor.soff, id))
            } else {
                None
            }
        })
        .collect();
    backbone.sort_unstable();

    let mut out = Vec::new();
    for (_, _, id) in backbone {
        let v = Vertex::pack(id, false);
        if g.degree(v) < 2 {
            continue;
        }
        if let Some(cl) = search_from(g, v) {
            if let Some(b) = close_bubble(g, v, cl) {
                out.push(b);
            }
        }
    }
    debug!("found {} bubble regions", out.len());
    out
}

/// Parse a `name:start-end` region selector, a 1-based closed
/// interval, into `(snid, start, end)` as a 0-based half-open one.
pub fn parse_region(
    g: &ArcGraph,
    region: &str,
) -> Result<(u32, i64, i64), GraphError> {
    let bad = || GraphError::InvalidRegion(region.to_string());
    let colon = region.rfind(':').ok_or_else(bad)?;
    let (name, rest) = region.split_at(colon);
    let mut coords = rest[1..].splitn(2, '-');
    let start: i64 = coords
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(bad)?;
    let end: i64 = coords
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(bad)?;
    if start < 1 || end < start {
        return Err(bad());
    }
    let snid = g.stable_id(name.as_bytes())?;
    Ok((snid, start - 1, end))
}

/// Names of all segments that are members of a bubble whose stable
/// span intersects the selector interval. Deduplicated, first-seen
/// order; backs reference-coordinate-driven subsetting.
pub fn bubbles_in_region(
    g: &ArcGraph,
    bubbles: &[Bubble],
    region: &str,
) -> Result<Vec<BString>, GraphError> {
    let (snid, start, end) = parse_region(g, region)?;
    let mut seen: FnvHashSet<SegmentId> = FnvHashSet::default();
    let mut names: Vec<BString> = Vec::new();
    for b in bubbles {
        if b.snid != snid {
            continue;
        }
        let hit = if b.se > b.ss {
            b.ss < end && b.se > start
        } else {
            // zero-width region; treat as a point
            b.ss >= start && b.ss < end
        };
        if !hit {
            continue;
        }
        for v in &b.vs {
            if seen.insert(v.id()) {
                names.push(BString::from(g.segment(v.id()).name.clone()));
            }
        }
    }
    Ok(names)
}
