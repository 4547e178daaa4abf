/// Maps logical session keys onto the physical keys stored in the cache.
///
/// The physical key is `"{prefix}.{logical}"`. The logical key is used
/// verbatim, so a logical key containing `.` can share a physical key with a
/// different prefix: `("a", "b.c")` and `("a.b", "c")` both map to `"a.b.c"`.
/// Stores sharing a cache must use prefixes that are not dotted extensions of
/// each other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCodec {
    prefix: String,
}

impl KeyCodec {
    pub const SEPARATOR: char = '.';

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn physical_key(&self, logical_key: &str) -> String {
        let mut key = String::with_capacity(self.prefix.len() + 1 + logical_key.len());
        key.push_str(&self.prefix);
        key.push(Self::SEPARATOR);
        key.push_str(logical_key);
        key
    }
}
