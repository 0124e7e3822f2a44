use asmgraph::algorithms::fragments::stable_fragments;
use asmgraph::algorithms::subgraph::{
    delete_segments_by_name, extract_subgraph,
};
use asmgraph::algorithms::unitig::generate_unitigs;
use asmgraph::{ArcGraph, SegmentId, SegmentRecord, Vertex};

fn seg(g: &mut ArcGraph, name: &[u8], seq: &[u8], rank: i32) -> SegmentId {
    g.add_segment(SegmentRecord {
        name,
        seq: Some(seq),
        len: 0,
        rank,
        stable: None,
    })
}

fn ref_seg(
    g: &mut ArcGraph,
    name: &[u8],
    seq: &[u8],
    chrom: &[u8],
    soff: i64,
) -> SegmentId {
    g.add_segment(SegmentRecord {
        name,
        seq: Some(seq),
        len: 0,
        rank: 0,
        stable: Some((chrom, soff)),
    })
}

fn fwd(id: SegmentId) -> Vertex {
    Vertex::pack(id, false)
}

#[test]
fn linear_chain_collapses_to_one_unitig() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", b"ACGTA", 1);
    let b = seg(&mut g, b"b", b"TACCG", 1);
    let c = seg(&mut g, b"c", b"GGT", 1);
    g.add_link(fwd(a), fwd(b), 2, 2);
    g.add_link(fwd(b), fwd(c), 1, 1);
    g.build_index();

    let out = generate_unitigs(&g);
    let segs: Vec<_> = out.segments().collect();
    assert_eq!(segs.len(), 1);
    let (_, s) = segs[0];
    assert_eq!(s.name, b"utg000001");
    assert_eq!(s.len, 10);
    assert_eq!(s.seq.as_deref(), Some(b"ACGTACCGGT".as_ref()));
    assert_eq!(out.stats().n_links, 0);
}

#[test]
fn branch_points_bound_unitigs() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", b"ACGT", 1);
    let b = seg(&mut g, b"b", b"CGTA", 1);
    let c = seg(&mut g, b"c", b"GTAC", 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.add_link(fwd(a), fwd(c), 0, 0);
    g.build_index();

    let out = generate_unitigs(&g);
    assert_eq!(out.segments().count(), 3);
    assert_eq!(out.stats().n_links, 2);
    assert!(out.check_complements());
}

#[test]
fn unitig_anchoring_needs_an_unbroken_backbone() {
    let mut g = ArcGraph::new();
    let a = ref_seg(&mut g, b"a", b"ACGT", b"chr1", 0);
    let b = ref_seg(&mut g, b"b", b"TTGG", b"chr1", 4);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.build_index();

    let out = generate_unitigs(&g);
    let (_, s) = out.segments().next().unwrap();
    assert_eq!(s.rank, 0);
    let anchor = s.stable.expect("contiguous rank-0 run stays anchored");
    assert_eq!(anchor.soff, 0);
    assert_eq!(out.stable_seq(anchor.snid).name, b"chr1");
    assert_eq!(out.stable_seq(anchor.snid).max, 8);

    // a rank-1 constituent breaks the attribution
    let mut g = ArcGraph::new();
    let a = ref_seg(&mut g, b"a", b"ACGT", b"chr1", 0);
    let b = seg(&mut g, b"b", b"TTGG", 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.build_index();

    let out = generate_unitigs(&g);
    let (_, s) = out.segments().next().unwrap();
    assert_eq!(s.rank, 1);
    assert!(s.stable.is_none());
}

#[test]
fn extraction_keeps_the_hop_ball() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", b"AC", 1);
    let b = seg(&mut g, b"b", b"CG", 1);
    let c = seg(&mut g, b"c", b"GT", 1);
    let d = seg(&mut g, b"d", b"TA", 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.add_link(fwd(b), fwd(c), 0, 0);
    g.add_link(fwd(c), fwd(d), 0, 0);
    g.build_index();

    let kept = extract_subgraph(&mut g, &[b"b".as_ref(), b"missing"], 1);
    assert_eq!(kept, 3);
    assert!(!g.segment(a).del);
    assert!(!g.segment(b).del);
    assert!(!g.segment(c).del);
    assert!(g.segment(d).del);
    assert!(g.find_arc(fwd(a), fwd(b)).is_some());
    assert!(g.find_arc(fwd(c), fwd(d)).is_none());
}

#[test]
fn zero_radius_keeps_bare_seeds() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", b"AC", 1);
    let b = seg(&mut g, b"b", b"CG", 1);
    let c = seg(&mut g, b"c", b"GT", 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.add_link(fwd(b), fwd(c), 0, 0);
    g.build_index();

    assert_eq!(extract_subgraph(&mut g, &[b"b"], 0), 1);
    assert!(g.segment(a).del);
    assert!(!g.segment(b).del);
    assert_eq!(g.degree(fwd(b)), 0);
    assert_eq!(g.arcs().count(), 0);
}

#[test]
fn seed_deletion_is_all_or_nothing() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", b"AC", 1);
    let b = seg(&mut g, b"b", b"CG", 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.build_index();

    assert!(delete_segments_by_name(&mut g, &[b"b".as_ref(), b"nope"]).is_err());
    assert!(!g.segment(b).del);

    assert_eq!(delete_segments_by_name(&mut g, &[b"b"]).unwrap(), 1);
    assert!(g.segment(b).del);
    assert_eq!(g.degree(fwd(a)), 0);
    assert!(!g.segment(a).del);
}

#[test]
fn adjacent_anchored_runs_merge() {
    let mut g = ArcGraph::new();
    let a = ref_seg(&mut g, b"a", b"AAAA", b"chr1", 0);
    let b = ref_seg(&mut g, b"b", b"CCCC", b"chr1", 4);
    let c = ref_seg(&mut g, b"c", b"TT", b"chr1", 10);
    let x = seg(&mut g, b"x", b"GG", 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.add_link(fwd(b), fwd(x), 0, 0);
    g.build_index();

    let frags = stable_fragments(&mut g, true);
    assert_eq!(frags.len(), 2);

    let f = &frags[0];
    assert_eq!(f.soff, 0);
    assert_eq!(f.len, 8);
    assert_eq!(f.rank, 0);
    assert_eq!(f.seq.as_deref(), Some(b"AAAACCCC".as_ref()));
    assert_eq!(f.ends, [None, Some(fwd(x))]);

    // the offset gap before c splits the run
    let f = &frags[1];
    assert_eq!(f.soff, 10);
    assert_eq!(f.len, 2);

    // payloads were taken out of the store
    assert!(g.segment(a).seq.is_none());
    assert!(g.segment(b).seq.is_none());
    assert!(g.segment(c).seq.is_none());
    assert!(g.segment(x).seq.is_some());
}

#[test]
fn fragments_without_sequence_leave_the_store_alone() {
    let mut g = ArcGraph::new();
    let a = ref_seg(&mut g, b"a", b"AAAA", b"chr1", 0);
    g.build_index();

    let frags = stable_fragments(&mut g, false);
    assert_eq!(frags.len(), 1);
    assert!(frags[0].seq.is_none());
    assert!(g.segment(a).seq.is_some());
}
