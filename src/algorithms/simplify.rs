/*!

Destructive graph-simplification passes.

Every pass is an independent call taking already-resolved numeric
parameters. All of them mutate the store in place and observe the
already-mutated state left by whatever ran before; the caller picks
the order and may repeat passes. Out-of-domain parameters (negative
radius, negative ratio) clamp to zero and make the pass a no-op for
the affected search rather than undefined behavior.

Each structural edit is all-or-nothing: deletions are collected per
structure before any half of it is touched, and arc deletion always
covers both complement halves.

*/

use fnv::{FnvHashMap, FnvHashSet};

#[allow(unused_imports)]
use log::{debug, info, trace};

use crate::graph::{Arc, ArcGraph};
use crate::handle::{SegmentId, Vertex};

const NO_VERTEX: Vertex = Vertex::from_integer(u64::MAX);

/// Transitive reduction: remove an arc when a two-hop alternate path
/// carries the same information within `fuzz` bases. Returns the
/// number of arcs reduced (complement pairs).
pub fn drop_transitive(g: &mut ArcGraph, fuzz: i64) -> usize {
    let fuzz = fuzz.max(0);
    let n_vtx = g.vertex_slots();
    let mut mark = vec![0u8; n_vtx];
    let mut n_reduced = 0usize;

    for vi in 0..n_vtx {
        let v = Vertex(vi as u64);
        if g.segment(v.id()).del {
            continue;
        }
        let mut av: Vec<(Vertex, i64, usize)> = g
            .arc_index_range(v)
            .filter_map(|ix| {
                let a = g.arc(ix);
                if a.del {
                    None
                } else {
                    Some((a.w, g.arc_len(a), ix))
                }
            })
            .collect();
        if av.len() < 2 {
            continue;
        }
        av.sort_unstable_by_key(|&(w, l, _)| (l, w.0));
        for &(w, _, _) in &av {
            mark[w.0 as usize] = 1;
        }
        let max_l = av.last().unwrap().1 + fuzz;

        for &(w, lw, _) in &av {
            let mut aw: Vec<(Vertex, i64)> = g
                .arc_index_range(w)
                .filter_map(|ix| {
                    let a = g.arc(ix);
                    if a.del {
                        None
                    } else {
                        Some((a.w, g.arc_len(a)))
                    }
                })
                .collect();
            aw.sort_unstable_by_key(|&(x, l)| (l, x.0));
            for (x, lx) in aw {
                if lw + lx > max_l {
                    break;
                }
                if mark[x.0 as usize] == 1 {
                    mark[x.0 as usize] = 2;
                }
            }
        }

        for &(w, _, ix) in &av {
            if mark[w.0 as usize] == 2 && !g.arc(ix).del {
                g.delete_arc_pair(ix);
                n_reduced += 1;
            }
            mark[w.0 as usize] = 0;
        }
    }

    if n_reduced > 0 {
        g.cleanup();
    }
    info!("transitively reduced {} arcs", n_reduced);
    n_reduced
}

/// The maximal unary dead-end chain hanging from `start` (a vertex
/// with in-degree 0), when it qualifies as a droppable tip. Backbone
/// (rank-0) segments are never part of a tip; a free-floating linear
/// path attached to nothing is left alone.
fn tip_chain(
    g: &ArcGraph,
    start: Vertex,
    max_ext: usize,
    max_len: i64,
) -> Option<Vec<SegmentId>> {
    let mut chain: Vec<SegmentId> = Vec::new();
    let mut blen: i64 = 0;
    let mut cur = start;
    loop {
        if g.segment(cur.id()).rank == 0 {
            // the chain merges back into the backbone here
            return if chain.is_empty() { None } else { Some(chain) };
        }
        if !chain.is_empty() && g.in_degree(cur) > 1 {
            return Some(chain);
        }
        if chain.contains(&cur.id()) {
            return None;
        }
        chain.push(cur.id());
        blen += g.seg_len(cur);
        if chain.len() > max_ext || blen > max_len {
            return None;
        }
        let mut next = None;
        let mut n_out = 0;
        for ix in g.arc_index_range(cur) {
            let a = g.arc(ix);
            if !a.del {
                n_out += 1;
                next = Some(a.w);
            }
        }
        match n_out {
            0 => return None,
            1 => cur = next.unwrap(),
            _ => return None,
        }
    }
}

/// Tip dropping: repeatedly remove dead-end paths within both
/// thresholds. Removal may expose new tips, so the pass iterates to
/// a fixed point. Returns the number of tips dropped.
pub fn drop_tips(g: &mut ArcGraph, max_ext: i64, max_len: i64) -> usize {
    let max_ext = max_ext.max(0) as usize;
    let max_len = max_len.max(0);
    let mut total = 0usize;
    if max_ext == 0 || max_len == 0 {
        return 0;
    }
    loop {
        let mut cut = 0usize;
        for vi in 0..g.vertex_slots() {
            let v = Vertex(vi as u64);
            if g.segment(v.id()).del || g.in_degree(v) != 0 {
                continue;
            }
            if let Some(chain) = tip_chain(g, v, max_ext, max_len) {
                for id in chain {
                    g.delete_segment(id);
                }
                cut += 1;
            }
        }
        total += cut;
        if cut == 0 {
            break;
        }
        g.cleanup();
    }
    info!("dropped {} tips", total);
    total
}

struct PopState {
    d: i64,
    seen: usize,
    p: Vertex,
}

/// Bounded-radius bubble search from `v0`; returns the segments of
/// the losing paths when a simple bubble closes within `max_dist`
/// bases. The kept path is the longest, ties broken by lower parent
/// vertex id.
fn pop_one(
    g: &ArcGraph,
    v0: Vertex,
    max_dist: i64,
    protect_tips: bool,
) -> Option<Vec<SegmentId>> {
    let mut state: FnvHashMap<Vertex, PopState> = FnvHashMap::default();
    let mut stack = vec![v0];
    let mut order: Vec<Vertex> = Vec::new();
    let mut pending = 0usize;
    state.insert(
        v0,
        PopState {
            d: 0,
            seen: 0,
            p: NO_VERTEX,
        },
    );

    let sink;
    loop {
        let u = stack.pop()?;
        if stack.is_empty() && pending == 0 && u != v0 {
            // a sink must actually merge branches; a lone surviving
            // branch is not a poppable bubble
            if state[&u].seen < 2 {
                return None;
            }
            order.push(u);
            sink = u;
            break;
        }
        let du = state[&u].d;
        let mut expanded = false;
        for ix in g.arc_index_range(u) {
            let a = *g.arc(ix);
            if a.del {
                continue;
            }
            expanded = true;
            let w = a.w;
            if w.id() == v0.id() {
                return None;
            }
            let d = du + g.seg_len(w) - a.ov;
            if d > max_dist {
                return None;
            }
            let in_deg = g.in_degree(w);
            let st = state.entry(w).or_insert_with(|| {
                pending += 1;
                PopState {
                    d: i64::MIN,
                    seen: 0,
                    p: NO_VERTEX,
                }
            });
            if d > st.d || (d == st.d && u.0 < st.p.0) {
                st.d = d;
                st.p = u;
            }
            st.seen += 1;
            if st.seen > in_deg {
                return None;
            }
            if st.seen == in_deg {
                pending -= 1;
                stack.push(w);
            }
        }
        if !expanded {
            if u == v0 || protect_tips {
                return None;
            }
            // a tip-terminated branch; it competes and loses
        }
        order.push(u);
    }

    let mut keep: FnvHashSet<SegmentId> = FnvHashSet::default();
    keep.insert(sink.id());
    let mut cur = sink;
    while cur != v0 {
        cur = state[&cur].p;
        keep.insert(cur.id());
    }
    let doomed: Vec<SegmentId> = order
        .iter()
        .filter(|v| !keep.contains(&v.id()))
        .map(|v| v.id())
        .collect();
    if doomed.is_empty() {
        None
    } else {
        Some(doomed)
    }
}

/// Bubble popping: find simple bubbles within `max_dist` bases of a
/// divergence vertex, keep the best-scoring path and delete the
/// rest. At most `max_del` bubbles are popped per invocation. With
/// `protect_tips`, a candidate containing a dead-end branch is left
/// alone; without it, tip branches are eligible competing paths.
pub fn pop_bubbles(
    g: &mut ArcGraph,
    max_dist: i64,
    max_del: i64,
    protect_tips: bool,
) -> usize {
    if max_dist <= 0 || max_del <= 0 {
        return 0;
    }
    let mut n_pop = 0usize;
    for vi in 0..g.vertex_slots() {
        if n_pop as i64 >= max_del {
            break;
        }
        let v = Vertex(vi as u64);
        if g.segment(v.id()).del || g.degree(v) < 2 {
            continue;
        }
        if let Some(doomed) = pop_one(g, v, max_dist, protect_tips) {
            for id in doomed {
                g.delete_segment(id);
            }
            n_pop += 1;
        }
    }
    if n_pop > 0 {
        g.cleanup();
    }
    info!("popped {} bubbles", n_pop);
    n_pop
}

/// Short overlap cutting: per vertex, remove outgoing arcs whose
/// overlap falls below the larger of `ratio` times the longest
/// overlap at that vertex and the `min_ovlp` floor. The longest arc
/// always survives.
pub fn cut_short_overlaps(
    g: &mut ArcGraph,
    min_ovlp: i64,
    ratio: f64,
) -> usize {
    let ratio = if ratio < 0.0 { 0.0 } else { ratio };
    let min_ovlp = min_ovlp.max(0);
    let mut n_cut = 0usize;
    for vi in 0..g.vertex_slots() {
        let v = Vertex(vi as u64);
        if g.segment(v.id()).del {
            continue;
        }
        let live: Vec<(usize, i64)> = g
            .arc_index_range(v)
            .filter_map(|ix| {
                let a = g.arc(ix);
                if a.del {
                    None
                } else {
                    Some((ix, a.ov))
                }
            })
            .collect();
        if live.len() < 2 {
            continue;
        }
        let max_ov = live.iter().map(|&(_, ov)| ov).max().unwrap();
        let thres = ((max_ov as f64 * ratio + 0.499) as i64).max(min_ovlp);
        for &(ix, ov) in &live {
            if ov < thres && !g.arc(ix).del {
                g.delete_arc_pair(ix);
                n_cut += 1;
            }
        }
    }
    if n_cut > 0 {
        g.cleanup();
    }
    info!("cut {} short overlaps", n_cut);
    n_cut
}

/// Whether the branch starting at `cur` is a disposable dead end:
/// a unary chain within both tip thresholds with no further support.
fn is_short_tip(
    g: &ArcGraph,
    mut cur: Vertex,
    max_ext: usize,
    max_len: i64,
) -> bool {
    let start_id = cur.id();
    let mut n = 0usize;
    let mut blen: i64 = 0;
    loop {
        n += 1;
        blen += g.seg_len(cur);
        if n > max_ext || blen > max_len {
            return false;
        }
        let mut next = None;
        let mut n_out = 0;
        for ix in g.arc_index_range(cur) {
            let a = g.arc(ix);
            if !a.del {
                n_out += 1;
                next = Some(a.w);
            }
        }
        match n_out {
            0 => return true,
            1 => {
                let w = next.unwrap();
                if g.in_degree(w) != 1 || w.id() == start_id {
                    return false;
                }
                cur = w;
            }
            _ => return false,
        }
    }
}

/// Topology-aware overlap cutting: as [`cut_short_overlaps`], but an
/// under-threshold arc is only cut when its target keeps another
/// incoming arc, or the branch hanging off the target is a short
/// disposable dead end. Legitimate branch points survive.
pub fn cut_short_overlaps_topo(
    g: &mut ArcGraph,
    ratio: f64,
    tip_ext: i64,
    tip_len: i64,
) -> usize {
    let ratio = if ratio < 0.0 { 0.0 } else { ratio };
    let tip_ext = tip_ext.max(0) as usize;
    let tip_len = tip_len.max(0);
    let mut n_cut = 0usize;
    for vi in 0..g.vertex_slots() {
        let v = Vertex(vi as u64);
        if g.segment(v.id()).del {
            continue;
        }
        let live: Vec<(usize, i64, Vertex)> = g
            .arc_index_range(v)
            .filter_map(|ix| {
                let a = g.arc(ix);
                if a.del {
                    None
                } else {
                    Some((ix, a.ov, a.w))
                }
            })
            .collect();
        if live.len() < 2 {
            continue;
        }
        let max_ov = live.iter().map(|&(_, ov, _)| ov).max().unwrap();
        let thres = (max_ov as f64 * ratio + 0.499) as i64;
        for &(ix, ov, w) in &live {
            if ov >= thres || g.arc(ix).del {
                continue;
            }
            if g.degree(v) < 2 {
                break;
            }
            if g.in_degree(w) > 1 || is_short_tip(g, w, tip_ext, tip_len) {
                g.delete_arc_pair(ix);
                n_cut += 1;
            }
        }
    }
    if n_cut > 0 {
        g.cleanup();
    }
    info!("cut {} short overlaps (topology aware)", n_cut);
    n_cut
}

/// Total advance length of a unary detour from `first`'s target to
/// `target`, when one exists within `max_dist` bases.
fn detour_len(
    g: &ArcGraph,
    first: &Arc,
    target: Vertex,
    max_dist: i64,
) -> Option<i64> {
    let mut visited: FnvHashSet<Vertex> = FnvHashSet::default();
    let mut d = g.arc_len(first);
    let mut cur = first.w;
    while d < max_dist {
        if cur == target {
            return Some(d);
        }
        if !visited.insert(cur) {
            return None;
        }
        let mut next: Option<Arc> = None;
        let mut n_out = 0;
        for ix in g.arc_index_range(cur) {
            let a = g.arc(ix);
            if !a.del {
                n_out += 1;
                next = Some(*a);
            }
        }
        if n_out != 1 {
            return None;
        }
        let a = next.unwrap();
        d += g.arc_len(&a);
        cur = a.w;
    }
    None
}

/// Z-structure cutting: when a short direct arc and a longer unary
/// detour connect the same endpoints, and the detour length falls in
/// `[min_dist, max_dist)`, the direct arc is removed.
pub fn cut_z(g: &mut ArcGraph, min_dist: i64, max_dist: i64) -> usize {
    let min_dist = min_dist.max(0);
    if max_dist <= min_dist {
        return 0;
    }
    let mut n_cut = 0usize;
    for vi in 0..g.vertex_slots() {
        let v = Vertex(vi as u64);
        if g.segment(v.id()).del {
            continue;
        }
        let live: Vec<usize> = g
            .arc_index_range(v)
            .filter(|&ix| !g.arc(ix).del)
            .collect();
        if live.len() < 2 {
            continue;
        }
        for &ix in &live {
            if g.arc(ix).del {
                continue;
            }
            let direct = *g.arc(ix);
            let z = live.iter().any(|&jx| {
                jx != ix
                    && !g.arc(jx).del
                    && detour_len(g, g.arc(jx), direct.w, max_dist)
                        .map_or(false, |l| l >= min_dist)
            });
            if z {
                g.delete_arc_pair(ix);
                n_cut += 1;
            }
        }
    }
    if n_cut > 0 {
        g.cleanup();
    }
    info!("cut {} Z-structure arcs", n_cut);
    n_cut
}

/// Strongly-connected-component marking over vertices. Diagnostic
/// only, non-destructive: returns one component id per vertex slot,
/// `u32::MAX` for vertices of deleted segments.
pub fn mark_scc(g: &ArcGraph) -> Vec<u32> {
    const UNVISITED: u32 = u32::MAX;
    let n = g.vertex_slots();
    let mut comp = vec![UNVISITED; n];
    let mut disc = vec![UNVISITED; n];
    let mut low = vec![0u32; n];
    let mut on_stack = vec![false; n];
    let mut scc_stack: Vec<usize> = Vec::new();
    let mut next_disc = 0u32;
    let mut n_comp = 0u32;

    for root in 0..n {
        if disc[root] != UNVISITED
            || g.segment(Vertex(root as u64).id()).del
        {
            continue;
        }
        disc[root] = next_disc;
        low[root] = next_disc;
        next_disc += 1;
        scc_stack.push(root);
        on_stack[root] = true;
        let mut dfs: Vec<(usize, std::ops::Range<usize>)> =
            vec![(root, g.arc_index_range(Vertex(root as u64)))];

        while !dfs.is_empty() {
            let (u, child) = {
                let top = dfs.last_mut().unwrap();
                let u = top.0;
                let mut child = None;
                while let Some(ix) = top.1.next() {
                    let a = g.arc(ix);
                    if a.del {
                        continue;
                    }
                    let w = a.w.0 as usize;
                    if disc[w] == UNVISITED {
                        child = Some(a.w);
                        break;
                    } else if on_stack[w] && disc[w] < low[u] {
                        low[u] = disc[w];
                    }
                }
                (u, child)
            };
            match child {
                Some(w) => {
                    let wi = w.0 as usize;
                    disc[wi] = next_disc;
                    low[wi] = next_disc;
                    next_disc += 1;
                    scc_stack.push(wi);
                    on_stack[wi] = true;
                    dfs.push((wi, g.arc_index_range(w)));
                }
                None => {
                    dfs.pop();
                    if let Some(&(p, _)) = dfs.last() {
                        if low[u] < low[p] {
                            low[p] = low[u];
                        }
                    }
                    if low[u] == disc[u] {
                        loop {
                            let w = scc_stack.pop().unwrap();
                            on_stack[w] = false;
                            comp[w] = n_comp;
                            if w == u {
                                break;
                            }
                        }
                        n_comp += 1;
                    }
                }
            }
        }
    }
    debug!("marked {} strongly connected components", n_comp);
    comp
}
