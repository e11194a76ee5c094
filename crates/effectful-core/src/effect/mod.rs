//! Effect descriptions and effect results
//!
//! An [`Effect`] is inert data describing one requested operation. It belongs
//! to exactly one capability family, carries only the parameters the
//! operation needs, and can be logged, compared and replayed. The matching
//! [`EffectResult`] is what an interpreter hands back on success.
//!
//! Every operation is its own struct implementing [`Request`], which ties the
//! request to the typed response a program receives when it is resumed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Implements `From<Op> for Effect` and [`Request`] for one operation struct.
///
/// `request!(Op, FamilyEffect::Variant, Family, FamilyResult::Variant => Response)`
macro_rules! request {
    (
        $request:ident,
        $effect:ident :: $op:ident,
        $family:ident,
        $result:ident :: $out:ident => $response:ty $(,)?
    ) => {
        impl From<$request> for $effect {
            fn from(request: $request) -> Self {
                $effect::$op(request)
            }
        }

        impl From<$request> for $crate::effect::Effect {
            fn from(request: $request) -> Self {
                $crate::effect::Effect::$family($effect::$op(request))
            }
        }

        impl $crate::effect::Request for $request {
            type Response = $response;

            fn accept(
                result: $crate::effect::EffectResult,
            ) -> Result<Self::Response, $crate::effect::EffectResult> {
                match result {
                    $crate::effect::EffectResult::$family($result::$out(response)) => Ok(response),
                    other => Err(other),
                }
            }
        }
    };
}

pub mod cache;
pub mod messaging;
pub mod object;
pub mod storage;
pub mod transport;

pub use cache::{CacheAck, CacheDelete, CacheEffect, CacheGet, CacheLookup, CacheResult, CacheSet};
pub use messaging::{
    AckStatus, Acknowledge, Delivery, Inbox, MessageId, MessagingEffect, MessagingResult, Publish,
    Receive, ReceivedMessage,
};
pub use object::{
    DeleteObject, GetObject, ListObjects, ObjectEffect, ObjectFetch, ObjectHandle, ObjectResult,
    PutObject, StoredObject,
};
pub use storage::{
    DeleteRecord, Document, Entry, GetRecord, Lookup, PutRecord, QueryRecords, StorageEffect,
    StorageResult, Write,
};
pub use transport::{
    CloseConnection, CloseStatus, ConnectionId, Frame, Incoming, ReceiveFrame, SendFrame,
    SendStatus, TransportEffect, TransportResult,
};

//-----------------------------------------------------------------------------
// Families
//-----------------------------------------------------------------------------

/// The capability family an effect belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectFamily {
    /// Record database
    Storage,
    /// Blob/object storage
    Object,
    /// Key/value cache
    Cache,
    /// Message broker
    Messaging,
    /// Websocket-style session transport
    Transport,
}

impl fmt::Display for EffectFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectFamily::Storage => write!(f, "storage"),
            EffectFamily::Object => write!(f, "object"),
            EffectFamily::Cache => write!(f, "cache"),
            EffectFamily::Messaging => write!(f, "messaging"),
            EffectFamily::Transport => write!(f, "transport"),
        }
    }
}

//-----------------------------------------------------------------------------
// Effect union
//-----------------------------------------------------------------------------

/// Any effect description, across every capability family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", content = "request", rename_all = "snake_case")]
pub enum Effect {
    Storage(StorageEffect),
    Object(ObjectEffect),
    Cache(CacheEffect),
    Messaging(MessagingEffect),
    Transport(TransportEffect),
}

impl Effect {
    /// The capability family this effect belongs to
    pub fn family(&self) -> EffectFamily {
        match self {
            Effect::Storage(_) => EffectFamily::Storage,
            Effect::Object(_) => EffectFamily::Object,
            Effect::Cache(_) => EffectFamily::Cache,
            Effect::Messaging(_) => EffectFamily::Messaging,
            Effect::Transport(_) => EffectFamily::Transport,
        }
    }

    /// Name of the operation within its family
    pub fn operation(&self) -> &'static str {
        match self {
            Effect::Storage(effect) => effect.operation(),
            Effect::Object(effect) => effect.operation(),
            Effect::Cache(effect) => effect.operation(),
            Effect::Messaging(effect) => effect.operation(),
            Effect::Transport(effect) => effect.operation(),
        }
    }
}

// Payload-free rendering for logs: `family.operation`
impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.family(), self.operation())
    }
}

impl From<StorageEffect> for Effect {
    fn from(effect: StorageEffect) -> Self {
        Effect::Storage(effect)
    }
}

impl From<ObjectEffect> for Effect {
    fn from(effect: ObjectEffect) -> Self {
        Effect::Object(effect)
    }
}

impl From<CacheEffect> for Effect {
    fn from(effect: CacheEffect) -> Self {
        Effect::Cache(effect)
    }
}

impl From<MessagingEffect> for Effect {
    fn from(effect: MessagingEffect) -> Self {
        Effect::Messaging(effect)
    }
}

impl From<TransportEffect> for Effect {
    fn from(effect: TransportEffect) -> Self {
        Effect::Transport(effect)
    }
}

//-----------------------------------------------------------------------------
// Result union
//-----------------------------------------------------------------------------

/// The successful resolution of any effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", content = "result", rename_all = "snake_case")]
pub enum EffectResult {
    Storage(StorageResult),
    Object(ObjectResult),
    Cache(CacheResult),
    Messaging(MessagingResult),
    Transport(TransportResult),
}

impl EffectResult {
    /// The capability family that produced this result
    pub fn family(&self) -> EffectFamily {
        match self {
            EffectResult::Storage(_) => EffectFamily::Storage,
            EffectResult::Object(_) => EffectFamily::Object,
            EffectResult::Cache(_) => EffectFamily::Cache,
            EffectResult::Messaging(_) => EffectFamily::Messaging,
            EffectResult::Transport(_) => EffectFamily::Transport,
        }
    }
}

impl From<StorageResult> for EffectResult {
    fn from(result: StorageResult) -> Self {
        EffectResult::Storage(result)
    }
}

impl From<ObjectResult> for EffectResult {
    fn from(result: ObjectResult) -> Self {
        EffectResult::Object(result)
    }
}

impl From<CacheResult> for EffectResult {
    fn from(result: CacheResult) -> Self {
        EffectResult::Cache(result)
    }
}

impl From<MessagingResult> for EffectResult {
    fn from(result: MessagingResult) -> Self {
        EffectResult::Messaging(result)
    }
}

impl From<TransportResult> for EffectResult {
    fn from(result: TransportResult) -> Self {
        EffectResult::Transport(result)
    }
}

//-----------------------------------------------------------------------------
// Typed requests
//-----------------------------------------------------------------------------

/// One concrete operation with a statically known response type.
pub trait Request: Into<Effect> + Send + 'static {
    /// What the operation resolves to on success, domain outcomes included
    type Response: Send + 'static;

    /// Extracts this request's response from a generic result, handing the
    /// result back untouched when it has the wrong shape.
    fn accept(result: EffectResult) -> Result<Self::Response, EffectResult>;
}

/// Domain outcome of a removal: whether there was anything to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Removal {
    Removed,
    Absent,
}

impl Removal {
    /// Builds a removal outcome from an "existed" flag
    pub fn from_existed(existed: bool) -> Self {
        if existed {
            Removal::Removed
        } else {
            Removal::Absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_identical_parameters_compare_equal() {
        let a: Effect = GetRecord::new("users", "alice").into();
        let b: Effect = GetRecord::new("users", "alice").into();
        let c: Effect = GetRecord::new("users", "bob").into();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.family(), b.family());
        assert_eq!(a.operation(), b.operation());
    }

    #[test]
    fn test_display_omits_payload() {
        let effect: Effect = Publish::new("orders", Bytes::from_static(b"secret")).into();
        assert_eq!(effect.to_string(), "messaging.publish");

        let effect: Effect = CacheGet::new("session:42").into();
        assert_eq!(effect.to_string(), "cache.get");
    }

    #[test]
    fn test_every_family_reports_itself() {
        let effects: Vec<Effect> = vec![
            GetRecord::new("t", "k").into(),
            GetObject::new("b", "k").into(),
            CacheGet::new("k").into(),
            Receive::new("s").into(),
            ReceiveFrame::new(ConnectionId::new("c")).into(),
        ];
        let families: Vec<EffectFamily> = effects.iter().map(Effect::family).collect();
        assert_eq!(
            families,
            vec![
                EffectFamily::Storage,
                EffectFamily::Object,
                EffectFamily::Cache,
                EffectFamily::Messaging,
                EffectFamily::Transport,
            ]
        );
    }

    #[test]
    fn test_accept_matches_only_own_shape() {
        let found = EffectResult::Storage(StorageResult::Lookup(Lookup::NotFound));
        assert_eq!(GetRecord::accept(found), Ok(Lookup::NotFound));

        let miss = EffectResult::Cache(CacheResult::Lookup(CacheLookup::Miss));
        let rejected = GetRecord::accept(miss.clone());
        assert_eq!(rejected, Err(miss));
    }

    #[test]
    fn test_effects_serialize_for_replay() {
        let record = serde_json::json!({"name": "A"});
        let effect: Effect = PutRecord::new("users", "alice", record).into();
        let json = serde_json::to_string(&effect).unwrap();
        let back: Effect = serde_json::from_str(&json).unwrap();
        assert_eq!(back, effect);
    }
}
