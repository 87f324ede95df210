//! Build-time limits.

/// Capacity of the process-wide finalizer table behind `__cxa_atexit`.
///
/// Every guarded static with a non-trivial destructor consumes one slot for
/// the life of the image (slots are not reused after they run), so size this
/// for the total number of such statics, not the number alive at once.
pub const MAX_FINALIZERS: usize = 128;
