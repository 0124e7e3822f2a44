/*!

Traversal and mutation passes over the [`ArcGraph`](crate::graph::ArcGraph).

The simplification passes in [`simplify`] are destructive and
order-sensitive: each observes the already-mutated state left by the
previous one, and the caller chooses the order. [`bubbles`] and
[`unitig`] read the store and report or derive from it; [`subgraph`]
restricts it in place.

*/

pub mod bubbles;
pub mod fragments;
pub mod simplify;
pub mod subgraph;
pub mod unitig;

pub use self::bubbles::{find_bubbles, bubbles_in_region, Bubble};
pub use self::fragments::{stable_fragments, StableFragment};
pub use self::simplify::{
    cut_short_overlaps, cut_short_overlaps_topo, cut_z, drop_tips,
    drop_transitive, mark_scc, pop_bubbles,
};
pub use self::subgraph::{delete_segments_by_name, extract_subgraph};
pub use self::unitig::generate_unitigs;
