/// What a ring does when `try_push` finds it full.
///
/// `Block` is a valid value of this type but the bus and scheduler refuse
/// to configure it on the real-time path — constructing a ring configured
/// with `Block` for those callers is rejected with `InvalidArgument`, since
/// blocking a hot-path producer defeats the point of a lock-free queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    DropNewest,
    DropOldest,
    Block,
}

impl Default for DropPolicy {
    fn default() -> Self {
        DropPolicy::DropNewest
    }
}
