use std::ops::Add;

/// Newtype that represents a segment in the graph, no matter the
/// strand.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SegmentId(pub u32);

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SegmentId {
    #[inline]
    fn from(num: u32) -> Self {
        SegmentId(num)
    }
}

impl From<usize> for SegmentId {
    #[inline]
    fn from(num: usize) -> Self {
        SegmentId(num as u32)
    }
}

impl From<SegmentId> for u32 {
    #[inline]
    fn from(id: SegmentId) -> Self {
        id.0
    }
}

impl From<SegmentId> for usize {
    #[inline]
    fn from(id: SegmentId) -> Self {
        id.0 as usize
    }
}

impl Add<u32> for SegmentId {
    type Output = Self;

    #[inline]
    fn add(self, other: u32) -> Self {
        SegmentId(self.0 + other)
    }
}

/// A `Vertex` is a segment ID with a strand, packed as a single u64.
/// Every segment yields exactly two vertices, forward and reverse.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Hash, Eq, Ord)]
#[repr(transparent)]
pub struct Vertex(pub u64);

/// Returns the forward-strand `Vertex` for a `SegmentId`
impl From<SegmentId> for Vertex {
    #[inline]
    fn from(id: SegmentId) -> Vertex {
        Vertex((id.0 as u64) << 1)
    }
}

/// Unpacks the `SegmentId` from a `Vertex`
impl From<Vertex> for SegmentId {
    #[inline]
    fn from(v: Vertex) -> SegmentId {
        v.id()
    }
}

impl Vertex {
    #[inline]
    pub fn as_integer(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn from_integer(i: u64) -> Self {
        Vertex(i)
    }

    #[inline]
    pub fn unpack_number(self) -> u64 {
        self.as_integer() >> 1
    }

    #[inline]
    pub fn unpack_bit(self) -> bool {
        self.as_integer() & 1 != 0
    }

    #[inline]
    pub fn pack<T: Into<SegmentId>>(id: T, is_reverse: bool) -> Vertex {
        let id: SegmentId = id.into();
        Vertex(((id.0 as u64) << 1) | is_reverse as u64)
    }

    #[inline]
    pub fn id(self) -> SegmentId {
        SegmentId(self.unpack_number() as u32)
    }

    #[inline]
    pub fn is_reverse(&self) -> bool {
        self.unpack_bit()
    }

    #[inline]
    pub fn flip(self) -> Self {
        Vertex(self.as_integer() ^ 1)
    }

    #[inline]
    pub fn forward(self) -> Self {
        if self.is_reverse() {
            self.flip()
        } else {
            self
        }
    }
}

impl std::fmt::Display for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strand = if self.is_reverse() { '-' } else { '+' };
        write!(f, "{}{}", self.id(), strand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quickcheck::QuickCheck;

    // Vertex::pack is an isomorphism; Vertex <=> (u32, bool)
    #[test]
    fn vertex_is_isomorphism() {
        fn prop(id: u32, rev: bool) -> bool {
            let v = Vertex::pack(SegmentId(id), rev);
            v.unpack_number() == id as u64 && v.unpack_bit() == rev
        }
        QuickCheck::new()
            .tests(1000)
            .quickcheck(prop as fn(u32, bool) -> bool);
    }

    #[test]
    fn vertex_flip() {
        let v1 = Vertex::pack(SegmentId(597283), true);
        let v2 = v1.flip();

        assert_eq!(v1.unpack_number(), v2.unpack_number());
        assert_eq!(v1.unpack_bit(), true);
        assert_eq!(v2.unpack_bit(), false);
        assert_eq!(v1.forward(), v2);
        assert_eq!(v2.flip(), v1);
    }
}
