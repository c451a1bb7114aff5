//! Shared test utilities for scribe-db unit tests.

#[cfg(test)]
pub(crate) mod memory {
    use scribe_core::entities::{
        EntityHandle, EntityRef, StagedEntity, TRANSACTION_LOG_TYPE, TrackedField, TransactionLog,
    };
    use scribe_core::enums::MutationKind;
    use scribe_core::{FieldMap, FieldValue};

    use crate::error::StoreError;
    use crate::store::TransactionalStore;

    /// In-memory store with failure injection.
    ///
    /// Inserts get keys from 100 upwards on commit. Audit rows staged with
    /// `add_rows` are reported back by `enumerate_tracked_entities` as
    /// `TransactionLog` entities until committed.
    #[derive(Debug, Default)]
    pub struct MemoryStore {
        pub staged: Vec<StagedEntity>,
        pub committed_logs: Vec<TransactionLog>,
        pending_logs: Vec<TransactionLog>,
        keys: Vec<(EntityHandle, FieldMap)>,
        next_id: i64,
        /// Fail the nth commit call (1-based).
        pub fail_commit_on: Option<usize>,
        pub fail_enumerate: bool,
        pub fail_key_resolution: bool,
        /// Keep reporting staged entities as pending after commit.
        pub sticky: bool,
        pub commit_calls: usize,
        pub enumerate_calls: usize,
        pub add_rows_calls: usize,
    }

    impl MemoryStore {
        pub fn new(staged: Vec<StagedEntity>) -> Self {
            Self {
                staged,
                next_id: 100,
                ..Self::default()
            }
        }
    }

    impl TransactionalStore for MemoryStore {
        async fn enumerate_tracked_entities(&mut self) -> Result<Vec<StagedEntity>, StoreError> {
            self.enumerate_calls += 1;
            if self.fail_enumerate {
                return Err(StoreError::Other("injected enumerate failure".into()));
            }
            let logs = self.pending_logs.iter().enumerate().map(|(i, log)| {
                let fields = log
                    .to_field_map()
                    .into_iter()
                    .map(|(name, value)| TrackedField::new(name, FieldValue::Null, value))
                    .collect();
                StagedEntity::new(
                    MutationKind::Insert,
                    EntityRef::new(EntityHandle(10_000 + i as u64), TRANSACTION_LOG_TYPE),
                    fields,
                )
            });
            Ok(self.staged.iter().cloned().chain(logs).collect())
        }

        async fn commit(&mut self) -> Result<(), StoreError> {
            self.commit_calls += 1;
            if self.fail_commit_on == Some(self.commit_calls) {
                self.pending_logs.clear();
                return Err(StoreError::Other("injected commit failure".into()));
            }
            for staged in &self.staged {
                if staged.kind != MutationKind::Insert
                    || self.keys.iter().any(|(h, _)| *h == staged.entity.handle)
                {
                    continue;
                }
                let key: FieldMap = staged
                    .fields
                    .iter()
                    .filter(|f| f.is_primary_key)
                    .map(|f| {
                        let value = if f.current.is_null() {
                            self.next_id += 1;
                            FieldValue::Integer(self.next_id - 1)
                        } else {
                            f.current.clone()
                        };
                        (f.name.clone(), value)
                    })
                    .collect();
                self.keys.push((staged.entity.handle, key));
            }
            if !self.sticky {
                for staged in &mut self.staged {
                    staged.kind = MutationKind::Unchanged;
                }
            }
            self.committed_logs.append(&mut self.pending_logs);
            Ok(())
        }

        async fn resolve_primary_key(&mut self, entity: EntityHandle) -> Result<FieldMap, StoreError> {
            if self.fail_key_resolution {
                return Err(StoreError::UnresolvedKey(entity));
            }
            self.keys
                .iter()
                .find(|(h, _)| *h == entity)
                .map(|(_, k)| k.clone())
                .ok_or(StoreError::UnknownEntity(entity))
        }

        fn add_rows(&mut self, _table: &str, rows: Vec<TransactionLog>) -> Result<(), StoreError> {
            self.add_rows_calls += 1;
            self.pending_logs.extend(rows);
            Ok(())
        }
    }

    /// Employee insert with a store-generated `id` placeholder last.
    pub fn employee_insert(handle: u64, first: &str, last: &str) -> StagedEntity {
        StagedEntity::new(
            MutationKind::Insert,
            EntityRef::new(EntityHandle(handle), "Employee"),
            vec![
                TrackedField::new("first_name", FieldValue::Null, first.into()),
                TrackedField::new("last_name", FieldValue::Null, last.into()),
                TrackedField::new("id", FieldValue::Null, FieldValue::Null).primary_key(),
            ],
        )
    }

    /// Persisted employee `id` followed by the given fields.
    pub fn employee_row(kind: MutationKind, id: i64, fields: Vec<TrackedField>) -> StagedEntity {
        let mut all = vec![TrackedField::new("id", id.into(), id.into()).primary_key()];
        all.extend(fields);
        StagedEntity::new(kind, EntityRef::new(EntityHandle(id as u64), "Employee"), all)
    }
}

#[cfg(test)]
pub(crate) mod helpers {
    use std::sync::Arc;

    use scribe_core::identity::FixedActor;

    use crate::ScribeDb;
    use crate::service::ScribeService;

    /// In-memory service with no resolvable actor.
    pub async fn test_service() -> ScribeService {
        let db = ScribeDb::open_local(":memory:").await.unwrap();
        ScribeService::from_db(db, Arc::new(FixedActor::anonymous()))
    }

    /// In-memory service recording `user` on audit rows.
    pub async fn test_service_as(user: &str) -> ScribeService {
        let db = ScribeDb::open_local(":memory:").await.unwrap();
        ScribeService::from_db(db, Arc::new(FixedActor::named(user)))
    }
}
