//! Host abstraction
//!
//! The host owns the rendered handles. It creates and destroys them outside
//! our control, so the engine never holds on to one across passes: it asks
//! for the live set each time it needs to apply something.

use aerie_common::RecordStatus;

/// Environment that renders records as transient handles
pub trait HandleHost: Send {
    /// Opaque reference to one rendered record
    type Handle;

    /// Handles currently alive, in any order
    fn live_handles(&self) -> Vec<Self::Handle>;

    /// Record id behind a handle
    ///
    /// May be computed lazily and memoized by the host. `None` when the handle
    /// does not (yet) expose an id; it is looked at again on the next pass.
    fn record_id(&mut self, handle: &Self::Handle) -> Option<String>;

    /// Status last applied to this handle, if any
    fn applied_status(&self, handle: &Self::Handle) -> Option<RecordStatus>;

    /// Show the handle in the given state
    fn apply_status(&mut self, handle: &Self::Handle, status: RecordStatus);
}
