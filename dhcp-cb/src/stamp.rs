//! Attributes shared by every stored configuration entity.

use std::cmp::Ordering;

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::selector::ServerSelector;

/// Current time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Modification time, owning server scope and user context of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    modification_time: DateTime<Utc>,
    server_selector: ServerSelector,
    user_context: Option<Value>,
}

impl Stamp {
    /// Stamp an entity with the current time, owned by all servers.
    pub fn new() -> Self {
        Self {
            modification_time: now(),
            server_selector: ServerSelector::AllServers,
            user_context: None,
        }
    }

    pub fn modification_time(&self) -> DateTime<Utc> {
        self.modification_time
    }

    /// Set the modification time, truncated to microseconds.
    pub fn set_modification_time(&mut self, time: DateTime<Utc>) {
        self.modification_time = time.trunc_subsecs(6);
    }

    /// Server scope the entity was stored under.
    pub fn server_selector(&self) -> &ServerSelector {
        &self.server_selector
    }

    pub fn user_context(&self) -> Option<&Value> {
        self.user_context.as_ref()
    }

    pub fn set_user_context(&mut self, context: Option<Value>) {
        self.user_context = context;
    }

    /// Rebuild a stamp from stored columns.
    pub(crate) fn from_row(
        modification_ts: i64,
        server_tag: &str,
        user_context: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            modification_time: from_micros(modification_ts)?,
            server_selector: ServerSelector::from_tag(server_tag),
            user_context: user_context
                .map(|s| serde_json::from_str(&s))
                .transpose()?,
        })
    }

    /// User context serialized for storage.
    pub(crate) fn user_context_json(&self) -> Result<Option<String>> {
        Ok(self
            .user_context
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?)
    }
}

impl Default for Stamp {
    fn default() -> Self {
        Self::new()
    }
}

/// Implemented by every entity carrying a [`Stamp`].
pub trait Stamped {
    fn stamp(&self) -> &Stamp;

    fn stamp_mut(&mut self) -> &mut Stamp;

    fn modification_time(&self) -> DateTime<Utc> {
        self.stamp().modification_time()
    }

    fn set_modification_time(&mut self, time: DateTime<Utc>) {
        self.stamp_mut().set_modification_time(time);
    }

    fn user_context(&self) -> Option<&Value> {
        self.stamp().user_context()
    }

    fn set_user_context(&mut self, context: Value) {
        self.stamp_mut().set_user_context(Some(context));
    }
}

/// Order entities oldest first.
pub fn by_modification_time<T: Stamped>(a: &T, b: &T) -> Ordering {
    a.modification_time().cmp(&b.modification_time())
}

pub(crate) fn to_micros(time: &DateTime<Utc>) -> i64 {
    time.timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| Error::invalid("modification_ts", micros))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_stamp_truncates_to_micros() {
        let mut stamp = Stamp::new();
        let time = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        stamp.set_modification_time(time);
        assert_eq!(stamp.modification_time().timestamp_subsec_nanos(), 123_456_000);

        let restored = from_micros(to_micros(&stamp.modification_time())).unwrap();
        assert_eq!(restored, stamp.modification_time());
    }

    #[test]
    fn test_stamp_from_row() {
        let stamp = Stamp::from_row(1_000_000, "server1", Some(r#"{"foo":"bar"}"#.into())).unwrap();
        assert_eq!(stamp.server_selector(), &ServerSelector::one("server1"));
        assert_eq!(stamp.user_context(), Some(&serde_json::json!({"foo": "bar"})));
        assert_eq!(stamp.modification_time().timestamp(), 1);
    }

    #[test]
    fn test_order_by_modification_time() {
        struct Entity(Stamp);
        impl Stamped for Entity {
            fn stamp(&self) -> &Stamp {
                &self.0
            }
            fn stamp_mut(&mut self) -> &mut Stamp {
                &mut self.0
            }
        }

        let mut older = Entity(Stamp::new());
        older.set_modification_time(now() - Duration::hours(1));
        let newer = Entity(Stamp::new());

        let mut entities = [newer, older];
        entities.sort_by(by_modification_time);
        assert!(entities[0].modification_time() < entities[1].modification_time());
    }
}
