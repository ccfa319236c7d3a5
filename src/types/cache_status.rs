use std::fmt;

/// How the result cache participated in an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Served from the cache without calling the provider.
    Hit,
    /// Not cached (or not cacheable); the provider was called.
    Miss,
    /// Caching is turned off.
    Disabled,
}

impl CacheStatus {
    /// Wire form used in the `X-Cache-Status` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
