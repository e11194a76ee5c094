// Reusable hand-written programs

use std::time::Duration;

use tracing::debug;

use super::{accept, protocol_violation, Program, Step};
use crate::effect::{
    CacheGet, CacheLookup, CacheSet, Document, Effect, EffectResult, GetRecord, Lookup,
};

/// Read-through cache over the record store.
///
/// Looks the record up in the cache first. On a miss it reads the record
/// from storage and, if one exists, writes it back to the cache before
/// finishing. A cached value that does not decode as JSON is treated as a
/// miss. Finishes with `None` when the record does not exist.
#[derive(Debug, Clone)]
pub struct ReadThrough {
    cache_key: String,
    table: String,
    key: String,
    ttl: Option<Duration>,
    state: State,
}

#[derive(Debug, Clone)]
enum State {
    Ready,
    CheckingCache(Effect),
    ReadingRecord(Effect),
    FillingCache { pending: Effect, value: Document },
    Finished,
}

impl ReadThrough {
    /// Cache under `table:key`
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        let table = table.into();
        let key = key.into();
        Self {
            cache_key: format!("{table}:{key}"),
            table,
            key,
            ttl: None,
            state: State::Ready,
        }
    }

    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = cache_key.into();
        self
    }

    /// Expiry for the cache fill; unset defers to the cache interpreter
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn suspend(&mut self, effect: Effect, next: fn(Effect) -> State) -> Step<Option<Document>> {
        self.state = next(effect.clone());
        Step::Suspended(effect)
    }

    fn finish(&mut self, outcome: crate::Outcome<Option<Document>>) -> Step<Option<Document>> {
        self.state = State::Finished;
        Step::Done(outcome)
    }

    fn read_record(&mut self) -> Step<Option<Document>> {
        let effect = GetRecord::new(&self.table, &self.key).into();
        self.suspend(effect, State::ReadingRecord)
    }
}

impl Program for ReadThrough {
    type Output = Option<Document>;

    fn start(&mut self) -> Step<Self::Output> {
        if !matches!(self.state, State::Ready) {
            protocol_violation("start called on a program that was already started");
        }
        let effect = CacheGet::new(&self.cache_key).into();
        self.suspend(effect, State::CheckingCache)
    }

    fn resume(&mut self, result: EffectResult) -> Step<Self::Output> {
        match std::mem::replace(&mut self.state, State::Finished) {
            State::CheckingCache(pending) => match accept::<CacheGet>(&pending, result) {
                Err(error) => self.finish(Err(error)),
                Ok(CacheLookup::Hit(bytes)) => match serde_json::from_slice(&bytes) {
                    Ok(value) => self.finish(Ok(Some(value))),
                    Err(error) => {
                        debug!(
                            cache_key = %self.cache_key,
                            %error,
                            "discarding undecodable cache entry"
                        );
                        self.read_record()
                    }
                },
                Ok(CacheLookup::Miss) => self.read_record(),
            },
            State::ReadingRecord(pending) => match accept::<GetRecord>(&pending, result) {
                Err(error) => self.finish(Err(error)),
                Ok(Lookup::NotFound) => self.finish(Ok(None)),
                Ok(Lookup::Found(value)) => match serde_json::to_vec(&value) {
                    Ok(encoded) => {
                        let mut fill = CacheSet::new(&self.cache_key, encoded);
                        fill.ttl = self.ttl;
                        let effect: Effect = fill.into();
                        self.state = State::FillingCache {
                            pending: effect.clone(),
                            value,
                        };
                        Step::Suspended(effect)
                    }
                    Err(_) => self.finish(Ok(Some(value))),
                },
            },
            State::FillingCache { pending, value } => match accept::<CacheSet>(&pending, result) {
                Err(error) => self.finish(Err(error)),
                Ok(_) => self.finish(Ok(Some(value))),
            },
            State::Ready => protocol_violation("resume called before the program was started"),
            State::Finished => {
                protocol_violation("resume called on a program that has already completed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{CacheAck, CacheResult, StorageResult};
    use bytes::Bytes;
    use serde_json::json;

    fn hit(bytes: &'static [u8]) -> EffectResult {
        CacheResult::Lookup(CacheLookup::Hit(Bytes::from_static(bytes))).into()
    }

    fn miss() -> EffectResult {
        CacheResult::Lookup(CacheLookup::Miss).into()
    }

    #[test]
    fn test_cache_hit_skips_storage() {
        let mut program = ReadThrough::new("users", "alice");
        assert_eq!(
            program.start(),
            Step::Suspended(CacheGet::new("users:alice").into())
        );
        assert_eq!(
            program.resume(hit(br#"{"name":"A"}"#)),
            Step::Done(Ok(Some(json!({"name": "A"}))))
        );
    }

    #[test]
    fn test_miss_reads_and_fills_cache() {
        let mut program = ReadThrough::new("users", "alice").with_ttl(Duration::from_secs(30));
        program.start();

        let step = program.resume(miss());
        assert_eq!(step, Step::Suspended(GetRecord::new("users", "alice").into()));

        let record = StorageResult::Lookup(Lookup::Found(json!({"name": "A"})));
        let step = program.resume(record.into());
        let expected: Effect = CacheSet::new("users:alice", r#"{"name":"A"}"#)
            .with_ttl(Duration::from_secs(30))
            .into();
        assert_eq!(step, Step::Suspended(expected));

        let step = program.resume(
            CacheResult::Stored(CacheAck {
                ttl: Some(Duration::from_secs(30)),
            })
            .into(),
        );
        assert_eq!(step, Step::Done(Ok(Some(json!({"name": "A"})))));
    }

    #[test]
    fn test_missing_record_finishes_without_fill() {
        let mut program = ReadThrough::new("users", "ghost").with_cache_key("u/ghost");
        assert_eq!(program.start(), Step::Suspended(CacheGet::new("u/ghost").into()));
        program.resume(miss());
        assert_eq!(
            program.resume(StorageResult::Lookup(Lookup::NotFound).into()),
            Step::Done(Ok(None))
        );
    }

    #[test]
    fn test_undecodable_cache_entry_is_a_miss() {
        let mut program = ReadThrough::new("users", "alice");
        program.start();
        let step = program.resume(hit(b"\xff not json"));
        assert_eq!(step, Step::Suspended(GetRecord::new("users", "alice").into()));
    }

    #[test]
    #[should_panic(expected = "already completed")]
    fn test_resume_after_finish_panics() {
        let mut program = ReadThrough::new("users", "alice");
        program.start();
        program.resume(hit(b"1"));
        program.resume(hit(b"1"));
    }
}
