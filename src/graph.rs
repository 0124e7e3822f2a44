/*!

The concrete graph store: segments, a flat arc arena with
complement-pairing by index, stable-sequence records, and the mutation
primitives the traversal and simplification passes are built on.

The store is built once by an external parser through
[`ArcGraph::add_segment`] and [`ArcGraph::add_link`], indexed with
[`ArcGraph::build_index`], and from then on owned exclusively by the
caller's sequence of operator invocations.

*/

use bstr::BString;
use fnv::FnvHashMap;

use crate::error::GraphError;
use crate::handle::{SegmentId, Vertex};
use crate::util::dna;

/// Anchoring of a segment on an external stable coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableAnchor {
    /// Index into [`ArcGraph::stable_seqs`].
    pub snid: u32,
    /// 0-based offset of the segment start on the stable sequence.
    pub soff: i64,
}

/// A named sequence entity, strand-independent. The sequence payload
/// may be absent; the length is always known.
#[derive(Debug, Clone)]
pub struct Segment {
    pub name: Vec<u8>,
    pub seq: Option<Vec<u8>>,
    pub len: i64,
    /// Provenance rank; 0 is the backbone/reference.
    pub rank: i32,
    pub stable: Option<StableAnchor>,
    pub del: bool,
}

/// A directed overlap edge between two vertices, stored in a flat
/// arena. `comp` is the arena index of the reverse-complement half of
/// the same physical link; the two halves are deleted together,
/// never independently.
#[derive(Debug, Clone, Copy)]
pub struct Arc {
    pub v: Vertex,
    pub w: Vertex,
    /// Overlap length on the source side.
    pub ov: i64,
    /// Overlap length on the target side.
    pub ow: i64,
    /// Rank of the source segment at link creation.
    pub rank: i32,
    /// Physical-link id shared by the two complement halves.
    pub link: u32,
    /// Arena index of the complement arc.
    pub comp: usize,
    pub del: bool,
}

/// A stable (chromosome-like) coordinate system segments may be
/// anchored to.
#[derive(Debug, Clone)]
pub struct StableSeq {
    pub name: Vec<u8>,
    /// Maximum observed coordinate extent.
    pub max: i64,
}

/// Input record for [`ArcGraph::add_segment`]; the contract an
/// external parser builds the store through.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRecord<'a> {
    pub name: &'a [u8],
    pub seq: Option<&'a [u8]>,
    /// Required when `seq` is absent; ignored otherwise.
    pub len: i64,
    pub rank: i32,
    /// Stable-sequence name and offset, when anchored.
    pub stable: Option<(&'a [u8], i64)>,
}

/// Summary counts over the live (non-deleted) part of the store.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GraphStats {
    pub n_segments: usize,
    /// Physical links; each one is two complement arcs.
    pub n_links: usize,
    pub n_arcs: usize,
    pub total_len: i64,
    /// Sum of rank-0 segment lengths, the length attributed to the
    /// backbone stable-sequence set.
    pub rank0_len: i64,
    pub max_rank: i32,
    pub avg_len: f64,
    pub max_degree: usize,
    /// Mean live out-degree over all vertex slots; 0 before the
    /// index is built.
    pub avg_degree: f64,
}

/// The in-memory assembly graph.
#[derive(Debug, Default, Clone)]
pub struct ArcGraph {
    segs: Vec<Segment>,
    arcs: Vec<Arc>,
    name_to_id: FnvHashMap<Vec<u8>, SegmentId>,
    stables: Vec<StableSeq>,
    stable_ids: FnvHashMap<Vec<u8>, u32>,
    /// Per-vertex `(start, count)` into the sorted arc arena.
    idx: Vec<(usize, usize)>,
    indexed: bool,
    next_link: u32,
    max_rank: i32,
}

impl ArcGraph {
    pub fn new() -> ArcGraph {
        Default::default()
    }

    /// Add a segment, or return the id of an existing segment with
    /// the same name. A previously unsequenced segment picks up the
    /// sequence from a later record; the name→id mapping stays a
    /// bijection.
    pub fn add_segment(&mut self, rec: SegmentRecord) -> SegmentId {
        if let Some(&id) = self.name_to_id.get(rec.name) {
            let seg = &mut self.segs[usize::from(id)];
            if seg.seq.is_none() {
                if let Some(seq) = rec.seq {
                    seg.seq = Some(seq.to_vec());
                    seg.len = seq.len() as i64;
                }
            }
            return id;
        }
        let id = SegmentId(self.segs.len() as u32);
        let len = rec.seq.map(|s| s.len() as i64).unwrap_or(rec.len);
        let stable = rec.stable.map(|(sname, soff)| {
            let snid = self.stable_id_or_insert(sname);
            let span = soff + len;
            if span > self.stables[snid as usize].max {
                self.stables[snid as usize].max = span;
            }
            StableAnchor { snid, soff }
        });
        if rec.rank > self.max_rank {
            self.max_rank = rec.rank;
        }
        self.segs.push(Segment {
            name: rec.name.to_vec(),
            seq: rec.seq.map(|s| s.to_vec()),
            len,
            rank: rec.rank,
            stable,
            del: false,
        });
        self.name_to_id.insert(rec.name.to_vec(), id);
        id
    }

    fn stable_id_or_insert(&mut self, name: &[u8]) -> u32 {
        if let Some(&snid) = self.stable_ids.get(name) {
            return snid;
        }
        let snid = self.stables.len() as u32;
        self.stables.push(StableSeq {
            name: name.to_vec(),
            max: 0,
        });
        self.stable_ids.insert(name.to_vec(), snid);
        snid
    }

    /// Insert a physical link as two complement arcs. Panics if
    /// either endpoint segment does not exist. The index must be
    /// rebuilt before traversal.
    pub fn add_link(&mut self, v: Vertex, w: Vertex, ov: i64, ow: i64) {
        let vi = usize::from(v.id());
        let wi = usize::from(w.id());
        assert!(
            vi < self.segs.len() && wi < self.segs.len(),
            "link endpoint refers to an unknown segment"
        );
        let link = self.next_link;
        self.next_link += 1;
        let n = self.arcs.len();
        self.arcs.push(Arc {
            v,
            w,
            ov,
            ow,
            rank: self.segs[vi].rank,
            link,
            comp: n + 1,
            del: false,
        });
        self.arcs.push(Arc {
            v: w.flip(),
            w: v.flip(),
            ov: ow,
            ow: ov,
            rank: self.segs[wi].rank,
            link,
            comp: n,
            del: false,
        });
        self.indexed = false;
    }

    /// Look up a segment id by name. A miss is non-fatal; caller
    /// policy decides whether to skip or abort.
    pub fn name_to_id(&self, name: &[u8]) -> Result<SegmentId, GraphError> {
        self.name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::SegmentNotFound(BString::from(name)))
    }

    pub fn stable_id(&self, name: &[u8]) -> Result<u32, GraphError> {
        self.stable_ids
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::StableNotFound(BString::from(name)))
    }

    #[inline]
    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segs[usize::from(id)]
    }

    #[inline]
    pub fn segment_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segs[usize::from(id)]
    }

    #[inline]
    pub fn stable_seq(&self, snid: u32) -> &StableSeq {
        &self.stables[snid as usize]
    }

    #[inline]
    pub fn stable_seqs(&self) -> &[StableSeq] {
        &self.stables
    }

    /// Number of segment slots, deleted included. Vertex ids range
    /// over `0..2 * seg_slots()`.
    #[inline]
    pub fn seg_slots(&self) -> usize {
        self.segs.len()
    }

    #[inline]
    pub fn vertex_slots(&self) -> usize {
        self.segs.len() * 2
    }

    #[inline]
    pub fn max_rank(&self) -> i32 {
        self.max_rank
    }

    /// Live segments, in id order.
    pub fn segments(&self) -> impl Iterator<Item = (SegmentId, &Segment)> {
        self.segs
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.del)
            .map(|(i, s)| (SegmentId(i as u32), s))
    }

    /// Live arcs, both complement halves.
    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.arcs.iter().filter(|a| !a.del)
    }

    /// Live physical links: one representative arc per complement
    /// pair, the half with the lower arena index.
    pub fn links(&self) -> impl Iterator<Item = &Arc> {
        self.arcs
            .iter()
            .enumerate()
            .filter(|(i, a)| !a.del && *i < a.comp)
            .map(|(_, a)| a)
    }

    #[inline]
    pub fn arc(&self, ix: usize) -> &Arc {
        &self.arcs[ix]
    }

    /// Range of arena indices holding the outgoing arcs of `v`.
    /// Valid only after [`ArcGraph::build_index`].
    #[inline]
    pub fn arc_index_range(&self, v: Vertex) -> std::ops::Range<usize> {
        debug_assert!(self.indexed, "arc index not built");
        let vi = v.0 as usize;
        if vi >= self.idx.len() {
            return 0..0;
        }
        let (start, count) = self.idx[vi];
        start..start + count
    }

    /// Contiguous outgoing arcs of `v`, deleted halves included;
    /// traversals skip those with `del` set.
    #[inline]
    pub fn arc_range(&self, v: Vertex) -> &[Arc] {
        &self.arcs[self.arc_index_range(v)]
    }

    /// Non-deleted out-degree of `v`.
    pub fn degree(&self, v: Vertex) -> usize {
        self.arc_range(v).iter().filter(|a| !a.del).count()
    }

    /// Non-deleted in-degree of `v`; incoming arcs are the
    /// complements of the reverse vertex's outgoing arcs.
    #[inline]
    pub fn in_degree(&self, v: Vertex) -> usize {
        self.degree(v.flip())
    }

    /// First live arc from `v` to `w`, if any.
    pub fn find_arc(&self, v: Vertex, w: Vertex) -> Option<&Arc> {
        self.arc_range(v).iter().find(|a| !a.del && a.w == w)
    }

    #[inline]
    pub fn seg_len(&self, v: Vertex) -> i64 {
        self.segs[usize::from(v.id())].len
    }

    /// Length an arc advances along its source vertex: segment
    /// length minus the overlap consumed.
    #[inline]
    pub fn arc_len(&self, a: &Arc) -> i64 {
        self.seg_len(a.v) - a.ov
    }

    /// The strand-correct sequence of `v`, when the segment carries
    /// one.
    pub fn oriented_seq(&self, v: Vertex) -> Option<Vec<u8>> {
        let seq = self.segs[usize::from(v.id())].seq.as_ref()?;
        if v.is_reverse() {
            Some(dna::rev_comp(seq))
        } else {
            Some(seq.clone())
        }
    }

    /// Delete both halves of the physical link the arc at `ix`
    /// belongs to. Atomic by construction.
    pub fn delete_arc_pair(&mut self, ix: usize) {
        let comp = self.arcs[ix].comp;
        self.arcs[ix].del = true;
        self.arcs[comp].del = true;
    }

    /// Soft-delete a segment: mark it and every arc touching either
    /// of its vertices, complements included.
    pub fn delete_segment(&mut self, id: SegmentId) {
        self.segs[usize::from(id)].del = true;
        for side in &[Vertex::pack(id, false), Vertex::pack(id, true)] {
            let range = self.arc_index_range(*side);
            for ix in range {
                if !self.arcs[ix].del {
                    self.delete_arc_pair(ix);
                }
            }
        }
    }

    /// Delete a segment found by name; a miss here aborts rather
    /// than skips.
    pub fn delete_segment_by_name(
        &mut self,
        name: &[u8],
    ) -> Result<(), GraphError> {
        let id = self.name_to_id(name)?;
        self.delete_segment(id);
        Ok(())
    }

    /// Sort the arc arena by source vertex, group adjacency ranges
    /// for O(1) lookup, and re-pair complements through their shared
    /// link ids.
    pub fn build_index(&mut self) {
        let segs = &self.segs;
        self.arcs.sort_by_key(|a| {
            let lv = segs[usize::from(a.v.id())].len - a.ov;
            (a.v.0, lv, a.w.0, a.ov)
        });
        self.idx = vec![(0, 0); self.segs.len() * 2];
        let mut i = 0;
        while i < self.arcs.len() {
            let v = self.arcs[i].v;
            let start = i;
            while i < self.arcs.len() && self.arcs[i].v == v {
                i += 1;
            }
            self.idx[v.0 as usize] = (start, i - start);
        }
        self.indexed = true;
        self.rebuild_comps();
    }

    fn rebuild_comps(&mut self) {
        let mut first: FnvHashMap<u32, usize> =
            FnvHashMap::with_capacity_and_hasher(
                self.arcs.len() / 2,
                Default::default(),
            );
        for i in 0..self.arcs.len() {
            match first.get(&self.arcs[i].link) {
                None => {
                    first.insert(self.arcs[i].link, i);
                }
                Some(&j) => {
                    self.arcs[i].comp = j;
                    self.arcs[j].comp = i;
                }
            }
        }
    }

    /// Physically drop deleted arcs and arcs whose endpoints were
    /// soft-deleted, then rebuild the index. Deleted segments keep
    /// their id slots so vertex ids stay stable.
    pub fn cleanup(&mut self) {
        let segs = &self.segs;
        self.arcs.retain(|a| {
            !a.del
                && !segs[usize::from(a.v.id())].del
                && !segs[usize::from(a.w.id())].del
        });
        self.build_index();
    }

    /// Reference ranking: within every vertex's arc range, rank-0
    /// destinations sort first, ties broken by destination vertex
    /// id. Idempotent; required before bubble finding or the region
    /// query, and after any mutation.
    pub fn sort_ref_arcs(&mut self) {
        assert!(self.indexed, "arc index not built");
        for vi in 0..self.idx.len() {
            let (start, count) = self.idx[vi];
            let segs = &self.segs;
            self.arcs[start..start + count].sort_by_key(|a| {
                let dest_rank = segs[usize::from(a.w.id())].rank;
                (dest_rank != 0, a.w.0, a.ov)
            });
        }
        self.rebuild_comps();
    }

    /// Multi-edge normalization: collapse parallel arcs between the
    /// same vertex pair, keeping the one with maximal overlap, ties
    /// to the lower rank. Run once at load, before any operator.
    /// Returns the number of links collapsed.
    pub fn fix_multi(&mut self) -> usize {
        assert!(self.indexed, "arc index not built");
        let mut dropped = 0;
        for vi in 0..self.idx.len() {
            let (start, count) = self.idx[vi];
            let mut best: FnvHashMap<u64, usize> = FnvHashMap::default();
            for ix in start..start + count {
                let a = self.arcs[ix];
                if a.del {
                    continue;
                }
                match best.get(&a.w.0).copied() {
                    None => {
                        best.insert(a.w.0, ix);
                    }
                    Some(bix) => {
                        let b = self.arcs[bix];
                        let keep_new = a.ov > b.ov
                            || (a.ov == b.ov && a.rank < b.rank);
                        if keep_new {
                            self.delete_arc_pair(bix);
                            best.insert(a.w.0, ix);
                        } else {
                            self.delete_arc_pair(ix);
                        }
                        dropped += 1;
                    }
                }
            }
        }
        if dropped > 0 {
            log::debug!("collapsed {} multi-edges", dropped);
            self.cleanup();
        }
        dropped
    }

    /// Summary counts over the live store.
    pub fn stats(&self) -> GraphStats {
        let mut st = GraphStats {
            max_rank: self.max_rank,
            ..Default::default()
        };
        for (_, seg) in self.segments() {
            st.n_segments += 1;
            st.total_len += seg.len;
            if seg.rank == 0 {
                st.rank0_len += seg.len;
            }
        }
        st.n_arcs = self.arcs().count();
        st.n_links = self.links().count();
        if st.n_segments > 0 {
            st.avg_len = st.total_len as f64 / st.n_segments as f64;
        }
        if self.indexed && self.vertex_slots() > 0 {
            let mut tot_deg = 0usize;
            for vi in 0..self.vertex_slots() {
                let d = self.degree(Vertex(vi as u64));
                tot_deg += d;
                if d > st.max_degree {
                    st.max_degree = d;
                }
            }
            st.avg_degree = tot_deg as f64 / self.vertex_slots() as f64;
        }
        st
    }

    /// Verify the complement invariant: every live arc's recorded
    /// complement exists, points back, and shares its deletion
    /// state. Used by tests and debug assertions.
    pub fn check_complements(&self) -> bool {
        self.arcs.iter().enumerate().all(|(i, a)| {
            let c = &self.arcs[a.comp];
            c.comp == i
                && c.del == a.del
                && c.link == a.link
                && c.v == a.w.flip()
                && c.w == a.v.flip()
                && c.ov == a.ow
                && c.ow == a.ov
        })
    }
}

impl std::fmt::Display for ArcGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.stats();
        write!(
            f,
            "ArcGraph({} segments, {} links, {} stable sequences)",
            st.n_segments,
            st.n_links,
            self.stables.len()
        )
    }
}
