use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no API keys available: every configured key has exhausted its quota")]
pub struct NoKeysAvailable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Active,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    value: String,
    state: KeyState,
}

impl ApiKey {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn state(&self) -> KeyState {
        self.state
    }
}

/// Ordered API keys for one run. Keys only ever move from active to exhausted.
#[derive(Debug, Clone, Default)]
pub struct KeyRotator {
    keys: Vec<ApiKey>,
}

impl KeyRotator {
    /// Blank entries are dropped, and duplicates keep their first position.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<ApiKey> = Vec::new();
        for key in keys {
            let value = key.into().trim().to_string();
            if value.is_empty() || out.iter().any(|k| k.value == value) {
                continue;
            }
            out.push(ApiKey {
                value,
                state: KeyState::Active,
            });
        }
        Self { keys: out }
    }

    /// First active key in configured order.
    pub fn next(&self) -> Result<ApiKey, NoKeysAvailable> {
        self.keys
            .iter()
            .find(|k| k.state == KeyState::Active)
            .cloned()
            .ok_or(NoKeysAvailable)
    }

    pub fn mark_exhausted(&mut self, key: &str) {
        if let Some(entry) = self.keys.iter_mut().find(|k| k.value == key) {
            entry.state = KeyState::Exhausted;
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.keys
            .iter()
            .filter(|k| k.state == KeyState::Active)
            .count()
    }
}
