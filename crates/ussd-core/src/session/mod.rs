//! Per-call session view
//!
//! A [`Session`] is the private, mutable copy of one conversation's data for
//! the duration of a single dispatch call. The engine loads it from the
//! store before the handlers run and writes it back (or deletes it) after.

pub mod value;

use std::collections::HashMap;

pub use value::Value;

/// Session key/value data as it is persisted.
pub type SessionData = HashMap<String, Value>;

/// One conversation's state during a call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    id: String,
    data: SessionData,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: SessionData::new(),
        }
    }

    pub fn with_data(id: impl Into<String>, data: SessionData) -> Self {
        Self { id: id.into(), data }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// String value for `key`, or `""` if absent or not a string.
    pub fn get_str(&self, key: &str) -> &str {
        self.data.get(key).map(Value::as_str).unwrap_or("")
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.data.get(key).map(Value::as_int).unwrap_or(0)
    }

    pub fn get_float(&self, key: &str) -> f64 {
        self.data.get(key).map(Value::as_float).unwrap_or(0.0)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.data.get(key).map(Value::as_bool).unwrap_or(false)
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn into_data(self) -> SessionData {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters_default_when_absent() {
        let mut s = Session::new("s-1");
        assert_eq!(s.get_str("missing"), "");
        assert_eq!(s.get_int("missing"), 0);
        assert!(!s.get_bool("missing"));

        s.set("amount", 200);
        s.set("confirmed", true);
        assert_eq!(s.get_int("amount"), 200);
        assert_eq!(s.get_str("amount"), "");
        assert!(s.get_bool("confirmed"));

        assert_eq!(s.remove("amount"), Some(Value::Int(200)));
        assert!(!s.contains("amount"));
    }
}
