//! One attempt of an in-memory transaction.

use async_trait::async_trait;
use mea::{mutex::Mutex, rwlock::RwLock};
use std::{collections::HashMap, fmt, mem, sync::Arc};

use multifire_core::{
    backend::TransactionBackend,
    document::{DocumentPath, DocumentSnapshot},
    error::{FirebaseError, FirebaseResult},
    write::Write,
};

use crate::firestore::{AccessRules, StoreState, validate_path};

#[derive(Default)]
struct Attempt {
    reads: HashMap<DocumentPath, u64>,
    writes: Vec<Write>,
}

/// Records the version of every document read and buffers writes until commit.
pub struct MemoryTransaction {
    state: Arc<RwLock<StoreState>>,
    rules: AccessRules,
    attempt: Mutex<Attempt>,
}

impl MemoryTransaction {
    pub(crate) fn new(state: Arc<RwLock<StoreState>>, rules: AccessRules) -> Self {
        Self {
            state,
            rules,
            attempt: Mutex::new(Attempt::default()),
        }
    }

    /// Hands out the recorded reads and buffered writes, leaving the attempt empty.
    pub(crate) async fn finish(&self) -> (HashMap<DocumentPath, u64>, Vec<Write>) {
        let mut attempt = self.attempt.lock().await;
        (mem::take(&mut attempt.reads), mem::take(&mut attempt.writes))
    }
}

impl fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl TransactionBackend for MemoryTransaction {
    async fn get(&self, path: &DocumentPath) -> FirebaseResult<DocumentSnapshot> {
        validate_path(path)?;
        self.rules.check(path.collection()).await?;

        let mut attempt = self.attempt.lock().await;
        if !attempt.writes.is_empty() {
            return Err(FirebaseError::InvalidArgument(
                "transaction reads must happen before any write".into(),
            ));
        }

        let state = self.state.read().await;
        attempt.reads.entry(path.clone()).or_insert_with(|| state.version(path));

        Ok(state.snapshot(path))
    }

    async fn write(&self, write: Write) -> FirebaseResult<()> {
        validate_path(write.path())?;

        self.attempt.lock().await.writes.push(write);
        Ok(())
    }
}
