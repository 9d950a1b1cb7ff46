use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::MarkerPayload;

/// Set of payload keys that count as mission tasks.
///
/// An open vocabulary accepts every payload; a closed one only the listed keys.
/// Keys are compared after fiducial namespacing, so `"ArUco_0"` admits
/// fiducial id 0.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    keys: Option<BTreeSet<String>>,
}

impl Vocabulary {
    /// Vocabulary that recognizes every payload.
    pub fn open() -> Self {
        Self { keys: None }
    }

    pub fn closed<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: Some(keys.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.keys.is_none()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.as_ref().is_none_or(|keys| keys.contains(key))
    }

    /// Queue key for `payload`, if it is a task in this vocabulary.
    pub fn recognize(&self, payload: &MarkerPayload) -> Option<String> {
        let key = payload.key();
        if key.is_empty() {
            return None;
        }
        self.contains(&key).then_some(key)
    }

    /// Listed keys, `None` for an open vocabulary.
    pub fn keys(&self) -> Option<impl Iterator<Item = &str>> {
        self.keys.as_ref().map(|k| k.iter().map(String::as_str))
    }
}
