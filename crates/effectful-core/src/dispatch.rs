// Effect dispatch
//
// The dispatcher is the total routing function from any effect to the one
// interpreter for its family. It holds no state of its own beyond the
// interpreter handles, so one dispatcher can serve any number of concurrent
// drivers.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::effect::{Effect, EffectResult};
use crate::interpreter::{
    CacheInterpreter, MessagingInterpreter, ObjectInterpreter, StorageInterpreter,
    TransportInterpreter, Unconfigured,
};
use crate::outcome::Outcome;

/// Anything that can interpret an arbitrary effect
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn interpret(&self, effect: Effect) -> Outcome<EffectResult>;
}

#[async_trait]
impl<D: Dispatch + ?Sized> Dispatch for Arc<D> {
    async fn interpret(&self, effect: Effect) -> Outcome<EffectResult> {
        (**self).interpret(effect).await
    }
}

/// Routes each effect to its family's interpreter
#[derive(Clone)]
pub struct Dispatcher {
    storage: Arc<dyn StorageInterpreter>,
    object: Arc<dyn ObjectInterpreter>,
    cache: Arc<dyn CacheInterpreter>,
    messaging: Arc<dyn MessagingInterpreter>,
    transport: Arc<dyn TransportInterpreter>,
}

impl Dispatcher {
    /// A dispatcher with an interpreter for every family
    pub fn new(
        storage: Arc<dyn StorageInterpreter>,
        object: Arc<dyn ObjectInterpreter>,
        cache: Arc<dyn CacheInterpreter>,
        messaging: Arc<dyn MessagingInterpreter>,
        transport: Arc<dyn TransportInterpreter>,
    ) -> Self {
        Self {
            storage,
            object,
            cache,
            messaging,
            transport,
        }
    }

    /// Start from a dispatcher where every family is unconfigured
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }
}

#[async_trait]
impl Dispatch for Dispatcher {
    async fn interpret(&self, effect: Effect) -> Outcome<EffectResult> {
        // One arm per family. Adding a family to `Effect` must add an arm here.
        match effect {
            Effect::Storage(effect) => self.storage.handle(effect).await.map(EffectResult::Storage),
            Effect::Object(effect) => self.object.handle(effect).await.map(EffectResult::Object),
            Effect::Cache(effect) => self.cache.handle(effect).await.map(EffectResult::Cache),
            Effect::Messaging(effect) => self
                .messaging
                .handle(effect)
                .await
                .map(EffectResult::Messaging),
            Effect::Transport(effect) => self
                .transport
                .handle(effect)
                .await
                .map(EffectResult::Transport),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

/// Builder for a [`Dispatcher`] that only needs some families.
///
/// Families left unset are answered by [`Unconfigured`].
#[derive(Default)]
pub struct DispatcherBuilder {
    storage: Option<Arc<dyn StorageInterpreter>>,
    object: Option<Arc<dyn ObjectInterpreter>>,
    cache: Option<Arc<dyn CacheInterpreter>>,
    messaging: Option<Arc<dyn MessagingInterpreter>>,
    transport: Option<Arc<dyn TransportInterpreter>>,
}

impl DispatcherBuilder {
    pub fn storage(mut self, interpreter: Arc<dyn StorageInterpreter>) -> Self {
        self.storage = Some(interpreter);
        self
    }

    pub fn object(mut self, interpreter: Arc<dyn ObjectInterpreter>) -> Self {
        self.object = Some(interpreter);
        self
    }

    pub fn cache(mut self, interpreter: Arc<dyn CacheInterpreter>) -> Self {
        self.cache = Some(interpreter);
        self
    }

    pub fn messaging(mut self, interpreter: Arc<dyn MessagingInterpreter>) -> Self {
        self.messaging = Some(interpreter);
        self
    }

    pub fn transport(mut self, interpreter: Arc<dyn TransportInterpreter>) -> Self {
        self.transport = Some(interpreter);
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            storage: self.storage.unwrap_or_else(|| Arc::new(Unconfigured)),
            object: self.object.unwrap_or_else(|| Arc::new(Unconfigured)),
            cache: self.cache.unwrap_or_else(|| Arc::new(Unconfigured)),
            messaging: self.messaging.unwrap_or_else(|| Arc::new(Unconfigured)),
            transport: self.transport.unwrap_or_else(|| Arc::new(Unconfigured)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{
        Acknowledge, CacheDelete, CacheEffect, CacheGet, CacheLookup, CacheResult, CacheSet,
        CloseConnection, ConnectionId, DeleteObject, DeleteRecord, EffectFamily, Frame, GetObject,
        GetRecord, ListObjects, Lookup, MessageId, MessagingEffect, MessagingResult, ObjectEffect,
        ObjectResult, Publish, PutObject, PutRecord, QueryRecords, Receive, ReceiveFrame,
        SendFrame, StorageEffect, StorageResult, TransportEffect, TransportResult,
    };
    use crate::outcome::InterpreterError;
    use effectful_error::ErrorKind;

    struct EmptyStorage;

    #[async_trait]
    impl StorageInterpreter for EmptyStorage {
        async fn handle(&self, _effect: StorageEffect) -> Outcome<StorageResult> {
            Ok(StorageResult::Lookup(Lookup::NotFound))
        }
    }

    struct ColdCache;

    #[async_trait]
    impl CacheInterpreter for ColdCache {
        async fn handle(&self, _effect: CacheEffect) -> Outcome<CacheResult> {
            Ok(CacheResult::Lookup(CacheLookup::Miss))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .storage(Arc::new(EmptyStorage))
            .cache(Arc::new(ColdCache))
            .build()
    }

    #[tokio::test]
    async fn test_routes_to_family_interpreter() {
        let dispatcher = dispatcher();
        assert_eq!(
            dispatcher.interpret(GetRecord::new("users", "alice").into()).await,
            Ok(EffectResult::Storage(StorageResult::Lookup(Lookup::NotFound)))
        );
        assert_eq!(
            dispatcher.interpret(CacheGet::new("k").into()).await,
            Ok(EffectResult::Cache(CacheResult::Lookup(CacheLookup::Miss)))
        );
    }

    #[tokio::test]
    async fn test_unset_families_are_unsupported() {
        let dispatcher = dispatcher();
        let unset: Vec<Effect> = vec![
            GetObject::new("bucket", "k").into(),
            Receive::new("orders-sub").into(),
            ReceiveFrame::new(ConnectionId::new("c1")).into(),
        ];
        for effect in unset {
            let err = dispatcher.interpret(effect.clone()).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Unsupported);
            assert_eq!(err.effect, effect);
            assert!(!err.retryable);
        }
    }

    /// Answers every family, recording which contract each effect arrived on
    #[derive(Default)]
    struct Tally {
        seen: parking_lot::Mutex<Vec<(EffectFamily, Effect)>>,
    }

    impl Tally {
        fn record(&self, family: EffectFamily, effect: Effect) -> InterpreterError {
            self.seen.lock().push((family, effect.clone()));
            InterpreterError::unsupported(effect)
        }
    }

    #[async_trait]
    impl StorageInterpreter for Tally {
        async fn handle(&self, effect: StorageEffect) -> Outcome<StorageResult> {
            Err(self.record(EffectFamily::Storage, effect.into()))
        }
    }

    #[async_trait]
    impl ObjectInterpreter for Tally {
        async fn handle(&self, effect: ObjectEffect) -> Outcome<ObjectResult> {
            Err(self.record(EffectFamily::Object, effect.into()))
        }
    }

    #[async_trait]
    impl CacheInterpreter for Tally {
        async fn handle(&self, effect: CacheEffect) -> Outcome<CacheResult> {
            Err(self.record(EffectFamily::Cache, effect.into()))
        }
    }

    #[async_trait]
    impl MessagingInterpreter for Tally {
        async fn handle(&self, effect: MessagingEffect) -> Outcome<MessagingResult> {
            Err(self.record(EffectFamily::Messaging, effect.into()))
        }
    }

    #[async_trait]
    impl TransportInterpreter for Tally {
        async fn handle(&self, effect: TransportEffect) -> Outcome<TransportResult> {
            Err(self.record(EffectFamily::Transport, effect.into()))
        }
    }

    /// Where each operation belongs. Every variant is named and there is no
    /// wildcard, so a new operation does not compile here until it is listed.
    fn owning_family(effect: &Effect) -> EffectFamily {
        match effect {
            Effect::Storage(
                StorageEffect::Get(_)
                | StorageEffect::Put(_)
                | StorageEffect::Delete(_)
                | StorageEffect::Query(_),
            ) => EffectFamily::Storage,
            Effect::Object(
                ObjectEffect::Put(_)
                | ObjectEffect::Get(_)
                | ObjectEffect::Delete(_)
                | ObjectEffect::List(_),
            ) => EffectFamily::Object,
            Effect::Cache(CacheEffect::Get(_) | CacheEffect::Set(_) | CacheEffect::Delete(_)) => {
                EffectFamily::Cache
            }
            Effect::Messaging(
                MessagingEffect::Publish(_)
                | MessagingEffect::Receive(_)
                | MessagingEffect::Acknowledge(_),
            ) => EffectFamily::Messaging,
            Effect::Transport(
                TransportEffect::Send(_) | TransportEffect::Receive(_) | TransportEffect::Close(_),
            ) => EffectFamily::Transport,
        }
    }

    fn every_operation() -> Vec<Effect> {
        let connection = ConnectionId::new("c1");
        vec![
            GetRecord::new("t", "k").into(),
            PutRecord::new("t", "k", serde_json::json!(1)).into(),
            DeleteRecord::new("t", "k").into(),
            QueryRecords::new("t", "k").into(),
            PutObject::new("b", "k", &b"x"[..]).into(),
            GetObject::new("b", "k").into(),
            DeleteObject::new("b", "k").into(),
            ListObjects::new("b").into(),
            CacheGet::new("k").into(),
            CacheSet::new("k", "v").into(),
            CacheDelete::new("k").into(),
            Publish::new("topic", "p").into(),
            Receive::new("sub").into(),
            Acknowledge::new("sub", MessageId::new("m1")).into(),
            SendFrame::new(connection.clone(), Frame::text("x")).into(),
            ReceiveFrame::new(connection.clone()).into(),
            CloseConnection::normal(connection).into(),
        ]
    }

    #[tokio::test]
    async fn test_every_operation_reaches_its_family() {
        let tally = Arc::new(Tally::default());
        let dispatcher = Dispatcher::new(
            tally.clone(),
            tally.clone(),
            tally.clone(),
            tally.clone(),
            tally.clone(),
        );

        let effects = every_operation();
        for effect in &effects {
            let err = dispatcher.interpret(effect.clone()).await.unwrap_err();
            assert_eq!(&err.effect, effect);
        }

        let seen = tally.seen.lock().clone();
        assert_eq!(seen.len(), effects.len());
        for ((family, routed), sent) in seen.iter().zip(&effects) {
            assert_eq!(routed, sent);
            assert_eq!(*family, owning_family(sent), "{sent} routed to {family}");
        }

        let operations: std::collections::HashSet<(EffectFamily, &str)> = effects
            .iter()
            .map(|effect| (effect.family(), effect.operation()))
            .collect();
        assert_eq!(operations.len(), effects.len());
    }

    #[tokio::test]
    async fn test_shared_through_arc() {
        let shared: Arc<dyn Dispatch> = Arc::new(dispatcher());
        let result = shared.interpret(GetRecord::new("users", "bob").into()).await;
        assert!(result.is_ok());
    }
}
