/// Correlates a fetch command with its completion event.
pub type RequestId = u64;
