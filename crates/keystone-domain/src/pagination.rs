//! Result window for list endpoints.

/// Largest page a caller may request.
pub const MAX_LIMIT: u64 = 100;

/// `limit`/`skip` window applied to list queries.
///
/// - `limit`: 1–100, default 25
/// - `skip`: rows to skip from the start, default 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub skip: u64,
}

pub const DEFAULT_LIMIT: u64 = 25;

impl Default for Window {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            skip: 0,
        }
    }
}

impl Window {
    /// Clamp `limit` to 1–100.
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, MAX_LIMIT),
            skip: self.skip,
        }
    }
}
