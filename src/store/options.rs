use std::time::Duration;

/// Lifetime assigned to a session by [`SessionStore::set`](crate::SessionStore::set).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const DEFAULT_KEY_PREFIX: &str = "user.profile";

/// Configuration options for a [`SessionStore`](crate::SessionStore).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use sesh::StoreOptions;
///
/// let store_options = StoreOptions::build()
///         .key_prefix("user.profile")
///         .max_age(Duration::from_secs(24 * 60 * 60))
///         .timeout(Duration::from_secs(2));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreOptions {
    pub key_prefix: String,
    pub max_age: Duration,
    /// Deadline applied to each store operation as a whole, covering every
    /// cache round-trip it makes.
    pub timeout: Option<Duration>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_age: DEFAULT_MAX_AGE,
            timeout: None,
        }
    }
}

impl StoreOptions {
    /// Creates a new `StoreOptions` with default values.
    pub fn build() -> Self {
        Self::default()
    }

    /// Sets the prefix prepended to every logical session key.
    pub fn key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
