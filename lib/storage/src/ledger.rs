//! Curator decision ledger
//!
//! One [`MatchDecision`] per relation, stored in a [`KeyStore`] under the
//! relation id `"low,high"`, so a decision recorded for `(42, 20)` is the one
//! returned for `(20, 42)`. Recording again overwrites the previous decision.

use crate::codec::{from_record, to_record};
use crate::keystore::{KeyStore, StoreOptions};
use ebiodiv_core::{
    MatchDecision, MatchingInput, MatchingOutcome, OccurrenceBatch, OccurrenceKey, RelationId,
    Result,
};
use std::path::Path;
use tracing::{debug, info};

/// Decisions of curators, keyed by relation
pub struct DecisionLedger {
    store: KeyStore,
}

impl DecisionLedger {
    pub fn new(store: KeyStore) -> Self {
        Self { store }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(KeyStore::open(path, StoreOptions::default())?))
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    pub fn into_inner(self) -> KeyStore {
        self.store
    }

    /// Decision for a relation, [`MatchDecision::undecided`] if none was recorded
    pub fn decision(&self, a: OccurrenceKey, b: OccurrenceKey) -> Result<MatchDecision> {
        let id = RelationId::new(a, b).to_string();
        match self.store.get(&id)? {
            Some(record) => from_record(record),
            None => Ok(MatchDecision::undecided()),
        }
    }

    /// Record a decision stamped with the current time
    pub fn record(
        &self,
        a: OccurrenceKey,
        b: OccurrenceKey,
        matched: Option<bool>,
        comment: Option<String>,
    ) -> Result<MatchDecision> {
        let decision = MatchDecision::new(matched, comment, now());
        self.record_decision(RelationId::new(a, b), &decision)?;
        Ok(decision)
    }

    pub fn record_decision(&self, relation: RelationId, decision: &MatchDecision) -> Result<()> {
        debug!(relation = %relation, matched = ?decision.matched, "Recording decision");
        self.store.set(&relation.to_string(), &to_record(decision)?)
    }

    /// Record a list of curator actions atomically, all with one timestamp
    ///
    /// Nothing is written if any key fails to parse. The outcomes echo the
    /// inputs in order.
    pub fn record_all(&self, inputs: &[MatchingInput]) -> Result<Vec<MatchingOutcome>> {
        let timestamp = now();
        let mut txn = self.store.write()?;
        let mut outcomes = Vec::with_capacity(inputs.len());

        for input in inputs {
            let relation = RelationId::from_raw(&input.occurrence_key1, &input.occurrence_key2)?;
            let decision = MatchDecision::new(Some(input.matched), input.comment.clone(), timestamp);
            txn.set(&relation.to_string(), &to_record(&decision)?)?;
            outcomes.push(MatchingOutcome {
                occurrence_key1: input.occurrence_key1.clone(),
                occurrence_key2: input.occurrence_key2.clone(),
                decision,
            });
        }

        txn.commit()?;
        info!(count = outcomes.len(), timestamp, "Recorded decisions");
        Ok(outcomes)
    }

    /// Attach the recorded decision to every relation of a batch
    ///
    /// All lookups read the same snapshot.
    pub fn annotate(&self, batch: &mut OccurrenceBatch) -> Result<()> {
        let txn = self.store.read()?;
        for relation in &mut batch.occurrence_relations {
            let decision = match txn.get(&relation.relation_id().to_string())? {
                Some(record) => from_record(record)?,
                None => MatchDecision::undecided(),
            };
            relation.matching = Some(decision);
        }
        Ok(())
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
