/*!

Stable-fragment decomposition: collapse runs of offset-adjacent,
same-rank segments anchored on one stable sequence into maximal
fragments, the unit the tabular and sequence exporters are driven
by.

Emitting with sequences transfers each contributing payload out of
the store as it is consumed, bounding peak memory on large graphs.

*/

#[allow(unused_imports)]
use log::{debug, info};

use crate::graph::ArcGraph;
use crate::handle::{SegmentId, Vertex};

/// A maximal run of adjacent segments on one stable sequence.
#[derive(Debug, Clone)]
pub struct StableFragment {
    pub snid: u32,
    pub soff: i64,
    pub len: i64,
    pub rank: i32,
    /// Flanking attachment vertices, upstream then downstream, when
    /// the fragment hangs off the rest of the graph.
    pub ends: [Option<Vertex>; 2],
    /// Merged sequence; present only when requested and every
    /// contributing segment carried one.
    pub seq: Option<Vec<u8>>,
}

/// Decompose the live graph into stable fragments, ordered by
/// `(snid, soff)`. With `with_seq`, sequence payloads are taken out
/// of the store as they are emitted.
pub fn stable_fragments(
    g: &mut ArcGraph,
    with_seq: bool,
) -> Vec<StableFragment> {
    let mut anchored: Vec<(u32, i64, i32, SegmentId)> = g
        .segments()
        .filter_map(|(id, s)| {
            s.stable.map(|a| (a.snid, a.soff, s.rank, id))
        })
        .collect();
    anchored.sort_unstable();

    let mut out = Vec::new();
    let mut i = 0;
    while i < anchored.len() {
        let (snid, soff, rank, id) = anchored[i];
        let mut run = vec![id];
        let mut end = soff + g.segment(id).len;
        let mut j = i + 1;
        while j < anchored.len() {
            let (snid2, soff2, rank2, id2) = anchored[j];
            let linked = g
                .find_arc(
                    Vertex::pack(*run.last().unwrap(), false),
                    Vertex::pack(id2, false),
                )
                .is_some();
            if snid2 != snid || rank2 != rank || soff2 != end || !linked {
                break;
            }
            end = soff2 + g.segment(id2).len;
            run.push(id2);
            j += 1;
        }

        let first_v = Vertex::pack(run[0], false);
        let last_v = Vertex::pack(*run.last().unwrap(), false);
        let upstream = g
            .arc_range(first_v.flip())
            .iter()
            .find(|a| !a.del && !run.contains(&a.w.id()))
            .map(|a| a.w.flip());
        let downstream = g
            .arc_range(last_v)
            .iter()
            .find(|a| !a.del && !run.contains(&a.w.id()))
            .map(|a| a.w);

        let seq = if with_seq {
            let mut acc: Option<Vec<u8>> = Some(Vec::new());
            for &rid in &run {
                let part = g.segment_mut(rid).seq.take();
                acc = match (acc, part) {
                    (Some(mut s), Some(p)) => {
                        s.extend_from_slice(&p);
                        Some(s)
                    }
                    _ => None,
                };
            }
            acc
        } else {
            None
        };

        out.push(StableFragment {
            snid,
            soff,
            len: end - soff,
            rank,
            ends: [upstream, downstream],
            seq,
        });
        i = j;
    }
    debug!("decomposed into {} stable fragments", out.len());
    out
}
