/*!
An in-memory engine for sequence-assembly graphs: the bidirected
segment/arc data model used to represent genome assemblies and their
reference-relative variation, together with the traversal and
destructive simplification passes that operate on it.

# Overview

The store is built once by an external parser, then owned exclusively
by the caller's sequence of operations:

* [`graph::ArcGraph`] holds segments, a flat arc arena with
  complement pairing by index, and stable-coordinate records, and
  provides the lookup and mutation primitives.
* [`graph::ArcGraph::sort_ref_arcs`] is the reference ranker; it must
  run before any backbone-relative traversal.
* [`algorithms::bubbles`] finds backbone-divergent regions and
  answers the `name:start-end` region-intersection query.
* [`algorithms::simplify`] holds the destructive, order-sensitive
  simplification passes: transitive reduction, tip dropping, bubble
  popping, overlap cutting, Z-structure cutting and SCC marking.
* [`algorithms::subgraph`] extracts bounded-radius neighborhoods or
  deletes seed segments.
* [`algorithms::unitig`] compacts non-branching paths into unitigs.
* [`algorithms::fragments`] decomposes the graph into maximal
  stable-coordinate fragments for the exporters.

# `Vertex` and `SegmentId`

The core types, used all over the crate, are defined in [`handle`]:

* [`SegmentId`](handle::SegmentId) is a newtype used as a segment
  identifier
* [`Vertex`](handle::Vertex) represents a specific strand of a
  segment; every segment has exactly two

*/

pub mod handle;

pub mod error;
pub mod graph;

pub mod algorithms;
pub mod util;

pub use crate::error::GraphError;
pub use crate::graph::{Arc, ArcGraph, GraphStats, Segment, SegmentRecord};
pub use crate::handle::{SegmentId, Vertex};
