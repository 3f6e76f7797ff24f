use core::num::NonZero;

#[cfg(test)]
type RawId = u16;
#[cfg(not(test))]
type RawId = u32;

/// Stable index of a node slot in the tree's arena.
///
/// Stored off-by-one in a `NonZero` so that `Option<NodeId>` (every child and
/// parent link) costs no more than the id itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub(crate) struct NodeId(NonZero<RawId>);

impl NodeId {
    pub(crate) const MAX_SLOT: usize = (RawId::MAX - 1) as usize;

    #[inline]
    pub(crate) const fn from_slot(slot: usize) -> Self {
        assert!(slot <= Self::MAX_SLOT, "`NodeId::from_slot()` - `slot` > `NodeId::MAX_SLOT`!");
        // `slot + 1` is non-zero and fits after the check above.
        #[allow(clippy::cast_possible_truncation)]
        Self(NonZero::new((slot + 1) as RawId).unwrap())
    }

    #[inline]
    pub(crate) const fn slot(self) -> usize {
        (self.0.get() - 1) as usize
    }
}
