/// Lifecycle of a [`OnceSlot`](super::OnceSlot).
///
/// Transitions are `Uninit -> Computing -> Computed`, or `Computing -> Uninit`
/// when a computation fails. `Computed` is terminal.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SlotState {
    /// No value and no computation in flight.
    Uninit = 0,
    /// A thread holds the slot lock and is running the compute function.
    Computing = 1,
    /// The value is published and immutable.
    Computed = 2,
}

impl SlotState {
    #[inline]
    pub(super) const fn from_u8(raw: u8) -> Self {
        match raw {
            2 => Self::Computed,
            1 => Self::Computing,
            _ => Self::Uninit,
        }
    }
}
