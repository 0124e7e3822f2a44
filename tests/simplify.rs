use asmgraph::algorithms::simplify::{
    cut_short_overlaps, cut_short_overlaps_topo, cut_z, drop_tips,
    drop_transitive, mark_scc, pop_bubbles,
};
use asmgraph::{ArcGraph, SegmentId, SegmentRecord, Vertex};

fn seg(g: &mut ArcGraph, name: &[u8], len: i64, rank: i32) -> SegmentId {
    g.add_segment(SegmentRecord {
        name,
        seq: None,
        len,
        rank,
        stable: None,
    })
}

fn ref_seg(
    g: &mut ArcGraph,
    name: &[u8],
    len: i64,
    chrom: &[u8],
    soff: i64,
) -> SegmentId {
    g.add_segment(SegmentRecord {
        name,
        seq: None,
        len,
        rank: 0,
        stable: Some((chrom, soff)),
    })
}

fn fwd(id: SegmentId) -> Vertex {
    Vertex::pack(id, false)
}

#[test]
fn transitive_triangle_loses_the_shortcut() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 10, 1);
    let b = seg(&mut g, b"b", 10, 1);
    let c = seg(&mut g, b"c", 10, 1);
    g.add_link(fwd(a), fwd(b), 5, 5);
    g.add_link(fwd(b), fwd(c), 5, 5);
    g.add_link(fwd(a), fwd(c), 0, 0);
    g.build_index();

    assert_eq!(drop_transitive(&mut g, 0), 1);
    assert!(g.find_arc(fwd(a), fwd(c)).is_none());
    assert!(g.find_arc(fwd(a), fwd(b)).is_some());
    assert!(g.find_arc(fwd(b), fwd(c)).is_some());
    assert_eq!(g.arcs().count(), 4);
    assert!(g.check_complements());
}

#[test]
fn short_tip_off_the_backbone_is_dropped() {
    let mut g = ArcGraph::new();
    let a = ref_seg(&mut g, b"a", 100, b"chr1", 0);
    let b = seg(&mut g, b"b", 50, 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.build_index();

    assert_eq!(drop_tips(&mut g, 1, 1000), 1);
    assert!(g.segment(b).del);
    assert!(!g.segment(a).del);
    assert_eq!(g.degree(fwd(a)), 0);
}

#[test]
fn long_tip_survives() {
    let mut g = ArcGraph::new();
    let a = ref_seg(&mut g, b"a", 100, b"chr1", 0);
    let b = seg(&mut g, b"b", 50, 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.build_index();

    assert_eq!(drop_tips(&mut g, 1, 10), 0);
    assert!(!g.segment(b).del);
}

#[test]
fn pop_keeps_the_longest_path() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 4, 1);
    let b = seg(&mut g, b"b", 10, 1);
    let c = seg(&mut g, b"c", 5, 1);
    let d = seg(&mut g, b"d", 8, 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.add_link(fwd(a), fwd(c), 0, 0);
    g.add_link(fwd(b), fwd(d), 0, 0);
    g.add_link(fwd(c), fwd(d), 0, 0);
    g.build_index();

    assert_eq!(pop_bubbles(&mut g, 100, 10, true), 1);
    assert!(g.segment(c).del);
    assert!(!g.segment(b).del);
    assert!(!g.segment(d).del);
}

#[test]
fn pop_respects_the_radius() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 4, 1);
    let b = seg(&mut g, b"b", 10, 1);
    let c = seg(&mut g, b"c", 5, 1);
    let d = seg(&mut g, b"d", 8, 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.add_link(fwd(a), fwd(c), 0, 0);
    g.add_link(fwd(b), fwd(d), 0, 0);
    g.add_link(fwd(c), fwd(d), 0, 0);
    g.build_index();

    assert_eq!(pop_bubbles(&mut g, 5, 10, true), 0);
    assert_eq!(g.stats().n_segments, 4);
}

#[test]
fn tip_protection_controls_popping() {
    fn build() -> (ArcGraph, SegmentId, SegmentId) {
        let mut g = ArcGraph::new();
        let a = seg(&mut g, b"a", 4, 1);
        let b = seg(&mut g, b"b", 10, 1);
        let c = seg(&mut g, b"c", 5, 1);
        let d = seg(&mut g, b"d", 8, 1);
        let t = seg(&mut g, b"t", 3, 1);
        g.add_link(fwd(a), fwd(b), 0, 0);
        g.add_link(fwd(a), fwd(c), 0, 0);
        g.add_link(fwd(a), fwd(t), 0, 0);
        g.add_link(fwd(b), fwd(d), 0, 0);
        g.add_link(fwd(c), fwd(d), 0, 0);
        g.build_index();
        (g, c, t)
    }

    let (mut g, c, t) = build();
    assert_eq!(pop_bubbles(&mut g, 100, 10, true), 0);
    assert!(!g.segment(c).del && !g.segment(t).del);

    let (mut g, c, t) = build();
    assert_eq!(pop_bubbles(&mut g, 100, 10, false), 1);
    assert!(g.segment(c).del);
    assert!(g.segment(t).del);
}

#[test]
fn weak_overlaps_are_cut() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 200, 1);
    let b = seg(&mut g, b"b", 200, 1);
    let c = seg(&mut g, b"c", 200, 1);
    g.add_link(fwd(a), fwd(b), 100, 100);
    g.add_link(fwd(a), fwd(c), 40, 40);
    g.build_index();

    assert_eq!(cut_short_overlaps(&mut g, 0, 0.5), 1);
    assert!(g.find_arc(fwd(a), fwd(c)).is_none());
    assert!(g.find_arc(fwd(a), fwd(b)).is_some());

    // 60 clears a 0.5 ratio against 100
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 200, 1);
    let b = seg(&mut g, b"b", 200, 1);
    let c = seg(&mut g, b"c", 200, 1);
    g.add_link(fwd(a), fwd(b), 100, 100);
    g.add_link(fwd(a), fwd(c), 60, 60);
    g.build_index();

    assert_eq!(cut_short_overlaps(&mut g, 0, 0.5), 0);
    assert_eq!(cut_short_overlaps(&mut g, 70, 0.5), 1);
    assert!(g.find_arc(fwd(a), fwd(c)).is_none());
}

#[test]
fn topo_cut_spares_real_branches() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 200, 1);
    let b = seg(&mut g, b"b", 200, 1);
    let c = seg(&mut g, b"c", 30, 1);
    g.add_link(fwd(a), fwd(b), 100, 100);
    g.add_link(fwd(a), fwd(c), 10, 10);
    g.build_index();

    // c is a short disposable dead end
    assert_eq!(cut_short_overlaps_topo(&mut g, 0.5, 5, 1000), 1);
    assert!(g.find_arc(fwd(a), fwd(c)).is_none());

    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 200, 1);
    let b = seg(&mut g, b"b", 200, 1);
    let c = seg(&mut g, b"c", 50, 1);
    g.add_link(fwd(a), fwd(b), 100, 100);
    g.add_link(fwd(a), fwd(c), 10, 10);
    g.build_index();

    // same weak overlap, but the branch is too long to discard
    assert_eq!(cut_short_overlaps_topo(&mut g, 0.5, 1, 10), 0);
    assert!(g.find_arc(fwd(a), fwd(c)).is_some());
}

#[test]
fn z_structure_loses_the_direct_arc() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 10, 1);
    let b = seg(&mut g, b"b", 6, 1);
    let x = seg(&mut g, b"x", 5, 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.add_link(fwd(a), fwd(x), 0, 0);
    g.add_link(fwd(x), fwd(b), 0, 0);
    g.build_index();

    // detour a->x->b advances 15 bases, inside [10, 20)
    assert_eq!(cut_z(&mut g, 10, 20), 1);
    assert!(g.find_arc(fwd(a), fwd(b)).is_none());
    assert!(g.find_arc(fwd(a), fwd(x)).is_some());
    assert!(g.find_arc(fwd(x), fwd(b)).is_some());
    assert!(g.check_complements());
}

#[test]
fn z_cut_window_is_half_open() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 10, 1);
    let b = seg(&mut g, b"b", 6, 1);
    let x = seg(&mut g, b"x", 5, 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.add_link(fwd(a), fwd(x), 0, 0);
    g.add_link(fwd(x), fwd(b), 0, 0);
    g.build_index();

    // forward detour advances 15, the reverse one 11
    assert_eq!(cut_z(&mut g, 16, 30), 0);
    assert_eq!(cut_z(&mut g, 12, 15), 0);
    assert!(g.find_arc(fwd(a), fwd(b)).is_some());
    assert_eq!(cut_z(&mut g, 12, 16), 1);
    assert!(g.find_arc(fwd(a), fwd(b)).is_none());
}

#[test]
fn scc_marks_cycles_and_skips_deleted() {
    let mut g = ArcGraph::new();
    let a = seg(&mut g, b"a", 10, 1);
    let b = seg(&mut g, b"b", 10, 1);
    let c = seg(&mut g, b"c", 10, 1);
    let d = seg(&mut g, b"d", 10, 1);
    g.add_link(fwd(a), fwd(b), 0, 0);
    g.add_link(fwd(b), fwd(a), 0, 0);
    g.add_link(fwd(a), fwd(c), 0, 0);
    g.build_index();
    g.delete_segment(d);
    g.cleanup();

    let comp = mark_scc(&g);
    let at = |v: Vertex| comp[v.as_integer() as usize];
    assert_eq!(at(fwd(a)), at(fwd(b)));
    assert_ne!(at(fwd(a)), at(fwd(c)));
    assert_ne!(at(fwd(a)), u32::MAX);
    assert_eq!(at(fwd(d)), u32::MAX);
}
