use std::fmt;

use uuid::Uuid;

/// Per-tab capability token handed to overlay UI fragments at connection time.
#[derive(Clone, PartialEq, Eq)]
pub struct PortKey(String);

impl PortKey {
    /// Mints a fresh random key. Keys are never reused across handshakes.
    pub fn mint() -> Self {
        PortKey(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, presented: Option<&str>) -> bool {
        presented.is_some_and(|key| key == self.0)
    }
}

// Keys stay out of logs
impl fmt::Debug for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortKey(..)")
    }
}
