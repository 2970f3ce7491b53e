//! In-memory document store.
//!
//! Documents live in a map of collections guarded by an async read-write lock. Every commit is
//! applied to a staged copy of the store and swapped in only when every write succeeded, which
//! gives batches and transactions their all-or-nothing behavior. Each committed document carries
//! a version taken from a store-wide sequence so transactions can detect contention.

use async_trait::async_trait;
use bson::{Bson, DateTime, Document};
use mea::{mutex::Mutex, rwlock::RwLock};
use std::{
    any::Any,
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, warn};

use multifire_core::{
    backend::{FirestoreBackend, TransactionFn},
    config::FirestoreSettings,
    document::{DocumentPath, DocumentSnapshot, QueryDocument},
    error::{FirebaseError, FirebaseResult},
    listener::{ListenerRegistration, Observer},
    query::{Query, Source},
    write::Write,
};

use crate::{evaluator::QueryEvaluator, transaction::MemoryTransaction};

/// Attempts a transaction gets before it fails with `Aborted`.
pub const MAX_TRANSACTION_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Document,
    version: u64,
}

type CollectionMap = BTreeMap<String, StoredDocument>;

/// Committed documents plus the sequence their versions are drawn from.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    collections: HashMap<String, CollectionMap>,
    sequence: u64,
}

impl StoreState {
    pub(crate) fn snapshot(&self, path: &DocumentPath) -> DocumentSnapshot {
        match self.stored(path) {
            Some(stored) => DocumentSnapshot::found(path.id(), stored.data.clone()),
            None => DocumentSnapshot::missing(path.id()),
        }
    }

    /// Version of the document, `0` when it does not exist.
    pub(crate) fn version(&self, path: &DocumentPath) -> u64 {
        self.stored(path).map_or(0, |stored| stored.version)
    }

    fn stored(&self, path: &DocumentPath) -> Option<&StoredDocument> {
        self.collections
            .get(path.collection())?
            .get(path.id())
    }

    fn query(&self, query: &Query) -> FirebaseResult<Vec<QueryDocument>> {
        QueryEvaluator::new(query).execute(
            self.collections
                .get(&query.collection)
                .into_iter()
                .flat_map(|documents| documents.iter())
                .map(|(id, stored)| (id, &stored.data)),
        )
    }

    /// Applies `writes` in order. On error the state is left partially written, so callers
    /// apply to a staged copy.
    pub(crate) fn apply(&mut self, writes: Vec<Write>, now: DateTime) -> FirebaseResult<()> {
        self.sequence += 1;
        let version = self.sequence;

        for write in writes {
            match write {
                Write::Set { path, data, merge } => {
                    let fields = data.resolve(now);
                    let collection = self
                        .collections
                        .entry(path.collection().to_string())
                        .or_default();

                    if merge && let Some(existing) = collection.get_mut(path.id()) {
                        merge_fields(&mut existing.data, fields);
                        existing.version = version;
                        continue;
                    }

                    collection.insert(
                        path.id().to_string(),
                        StoredDocument { data: fields, version },
                    );
                }
                Write::Update { path, data } => {
                    let existing = self
                        .collections
                        .get_mut(path.collection())
                        .and_then(|collection| collection.get_mut(path.id()))
                        .ok_or_else(|| {
                            FirebaseError::NotFound(format!("no document to update: {path}"))
                        })?;

                    for (field, value) in data.resolve(now) {
                        set_field(&mut existing.data, &field, value);
                    }
                    existing.version = version;
                }
                Write::Delete { path } => {
                    if let Some(collection) = self.collections.get_mut(path.collection()) {
                        collection.remove(path.id());
                    }
                }
            }
        }

        Ok(())
    }
}

/// Deep-merges `source` into `target`: nested maps merge, every other value replaces.
fn merge_fields(target: &mut Document, source: Document) {
    for (key, value) in source {
        match value {
            Bson::Document(incoming) => match target.get_mut(&key) {
                Some(Bson::Document(existing)) => merge_fields(existing, incoming),
                _ => {
                    target.insert(key, incoming);
                }
            },
            value => {
                target.insert(key, value);
            }
        }
    }
}

/// Writes `value` at a dotted field path, creating intermediate maps as needed.
fn set_field(document: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(document.get(head), Some(Bson::Document(_))) {
                document.insert(head, Document::new());
            }
            if let Some(Bson::Document(child)) = document.get_mut(head) {
                set_field(child, rest, value);
            }
        }
    }
}

fn validate_segment(kind: &str, segment: &str) -> FirebaseResult<()> {
    let reserved = segment.len() >= 4 && segment.starts_with("__") && segment.ends_with("__");

    if segment.is_empty() || segment.contains('/') || segment == "." || segment == ".." || reserved
    {
        return Err(FirebaseError::InvalidArgument(format!(
            "invalid {kind} '{segment}'"
        )));
    }

    Ok(())
}

pub(crate) fn validate_path(path: &DocumentPath) -> FirebaseResult<()> {
    validate_segment("collection name", path.collection())?;
    validate_segment("document id", path.id())
}

fn validate_write(write: &Write) -> FirebaseResult<()> {
    validate_path(write.path())?;

    if let Write::Update { data, .. } = write {
        for field in data.fields().keys() {
            if field.split('.').any(str::is_empty) {
                return Err(FirebaseError::InvalidArgument(format!(
                    "invalid field path '{field}'"
                )));
            }
        }
    }

    Ok(())
}

fn now() -> DateTime {
    DateTime::from_chrono(chrono::Utc::now())
}

/// Shared handle to the collections a client may not touch.
#[derive(Debug, Clone, Default)]
pub(crate) struct AccessRules {
    denied: Arc<RwLock<HashSet<String>>>,
}

impl AccessRules {
    pub(crate) async fn check(&self, collection: &str) -> FirebaseResult<()> {
        if self.denied.read().await.contains(collection) {
            return Err(FirebaseError::PermissionDenied(format!(
                "missing or insufficient permissions for '{collection}'"
            )));
        }

        Ok(())
    }
}

struct DocumentListener {
    path: DocumentPath,
    registration: ListenerRegistration,
    observer: Observer<DocumentSnapshot>,
    last: Option<DocumentSnapshot>,
}

struct QueryListener {
    query: Query,
    registration: ListenerRegistration,
    observer: Observer<Vec<QueryDocument>>,
    last: Option<Vec<QueryDocument>>,
}

#[derive(Default)]
struct Listeners {
    documents: Vec<DocumentListener>,
    queries: Vec<QueryListener>,
}

impl Listeners {
    fn prune(&mut self) {
        self.documents.retain(|listener| listener.registration.is_active());
        self.queries.retain(|listener| listener.registration.is_active());
    }
}

/// Document store of one in-memory app.
///
/// Reads with [`Source::Server`] fail with `Unavailable` while the network is disabled;
/// [`Source::Default`] and [`Source::Cache`] always read local state.
pub struct InMemoryFirestore {
    state: Arc<RwLock<StoreState>>,
    rules: AccessRules,
    listeners: Mutex<Listeners>,
    settings: RwLock<Option<FirestoreSettings>>,
    offline: AtomicBool,
}

impl Default for InMemoryFirestore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryFirestore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryFirestore")
            .field("offline", &self.offline.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl InMemoryFirestore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            rules: AccessRules::default(),
            listeners: Mutex::new(Listeners::default()),
            settings: RwLock::new(None),
            offline: AtomicBool::new(false),
        }
    }

    /// Settings applied by the last `configure` call, if any.
    pub async fn settings(&self) -> Option<FirestoreSettings> {
        *self.settings.read().await
    }

    /// Rejects every further read, write and listener on `collection` with `PermissionDenied`.
    ///
    /// Active listeners on the collection receive the error and stop.
    pub async fn deny_collection(&self, collection: impl Into<String>) {
        let collection = collection.into();
        self.rules.denied.write().await.insert(collection.clone());

        let error = FirebaseError::PermissionDenied(format!(
            "missing or insufficient permissions for '{collection}'"
        ));
        let mut listeners = self.listeners.lock().await;

        for listener in listeners.documents.iter_mut() {
            if listener.path.collection() == collection && listener.registration.is_active() {
                listener.observer.error(error.clone());
                listener.registration.remove();
            }
        }
        for listener in listeners.queries.iter_mut() {
            if listener.query.collection == collection && listener.registration.is_active() {
                listener.observer.error(error.clone());
                listener.registration.remove();
            }
        }

        listeners.prune();
    }

    pub async fn allow_collection(&self, collection: &str) {
        self.rules.denied.write().await.remove(collection);
    }

    pub fn enable_network(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub fn disable_network(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }

    /// Stops every active listener.
    pub async fn terminate(&self) {
        let mut listeners = self.listeners.lock().await;

        for listener in listeners.documents.iter() {
            listener.registration.remove();
        }
        for listener in listeners.queries.iter() {
            listener.registration.remove();
        }

        listeners.prune();
    }

    pub async fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock().await;
        listeners.prune();
        listeners.documents.len() + listeners.queries.len()
    }

    fn check_source(&self, source: Source) -> FirebaseResult<()> {
        if source == Source::Server && !self.is_online() {
            return Err(FirebaseError::Unavailable(
                "the client is offline and the read requires the server".into(),
            ));
        }

        Ok(())
    }

    async fn validate_writes(&self, writes: &[Write]) -> FirebaseResult<()> {
        for write in writes {
            validate_write(write)?;
            self.rules.check(write.path().collection()).await?;
        }

        Ok(())
    }

    /// Commits `writes` if every document in `reads` still has the recorded version.
    ///
    /// Returns `Ok(false)` when another commit got there first.
    async fn commit_if_unchanged(
        &self,
        reads: &HashMap<DocumentPath, u64>,
        writes: Vec<Write>,
    ) -> FirebaseResult<bool> {
        self.validate_writes(&writes).await?;

        {
            let mut state = self.state.write().await;

            if reads
                .iter()
                .any(|(path, version)| state.version(path) != *version)
            {
                return Ok(false);
            }

            if writes.is_empty() {
                return Ok(true);
            }

            let mut staged = state.clone();
            staged.apply(writes, now())?;
            *state = staged;
        }

        self.notify().await;
        Ok(true)
    }

    /// Delivers the current state to every listener whose view changed.
    async fn notify(&self) {
        let mut listeners = self.listeners.lock().await;
        listeners.prune();

        let state = self.state.read().await;

        for listener in listeners.documents.iter_mut() {
            let snapshot = state.snapshot(&listener.path);

            if listener.last.as_ref() != Some(&snapshot) {
                listener.last = Some(snapshot.clone());
                listener.observer.next(snapshot);
            }
        }

        for listener in listeners.queries.iter_mut() {
            match state.query(&listener.query) {
                Ok(rows) => {
                    if listener.last.as_ref() != Some(&rows) {
                        listener.last = Some(rows.clone());
                        listener.observer.next(rows);
                    }
                }
                Err(error) => {
                    listener.observer.error(error);
                    listener.registration.remove();
                }
            }
        }
    }
}

#[async_trait]
impl FirestoreBackend for InMemoryFirestore {
    async fn configure(&self, settings: &FirestoreSettings) -> FirebaseResult<()> {
        debug!(
            persistence = settings.persistence,
            cache_size = ?settings.cache_size,
            "configuring document store"
        );

        *self.settings.write().await = Some(*settings);
        Ok(())
    }

    async fn get_document(
        &self,
        path: &DocumentPath,
        source: Source,
    ) -> FirebaseResult<DocumentSnapshot> {
        validate_path(path)?;
        self.check_source(source)?;
        self.rules.check(path.collection()).await?;

        Ok(self.state.read().await.snapshot(path))
    }

    async fn run_query(&self, query: &Query, source: Source) -> FirebaseResult<Vec<QueryDocument>> {
        validate_segment("collection name", &query.collection)?;
        self.check_source(source)?;
        self.rules.check(&query.collection).await?;

        self.state.read().await.query(query)
    }

    async fn commit(&self, writes: Vec<Write>) -> FirebaseResult<()> {
        self.commit_if_unchanged(&HashMap::new(), writes)
            .await
            .map(|_| ())
    }

    async fn run_transaction<'a>(&self, mut update: TransactionFn<'a>) -> FirebaseResult<()> {
        if !self.is_online() {
            return Err(FirebaseError::Unavailable(
                "transactions require a connection to the server".into(),
            ));
        }

        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let transaction = Arc::new(MemoryTransaction::new(
                self.state.clone(),
                self.rules.clone(),
            ));

            update(transaction.clone()).await?;

            let (reads, writes) = transaction.finish().await;
            if self.commit_if_unchanged(&reads, writes).await? {
                debug!(attempt, "transaction committed");
                return Ok(());
            }

            debug!(attempt, "transaction contended, retrying");
        }

        warn!(attempts = MAX_TRANSACTION_ATTEMPTS, "transaction aborted");
        Err(FirebaseError::Aborted(format!(
            "transaction failed after {MAX_TRANSACTION_ATTEMPTS} attempts"
        )))
    }

    async fn listen_document(
        &self,
        path: DocumentPath,
        mut observer: Observer<DocumentSnapshot>,
    ) -> FirebaseResult<ListenerRegistration> {
        validate_path(&path)?;
        let registration = ListenerRegistration::new();

        if let Err(error) = self.rules.check(path.collection()).await {
            observer.error(error);
            registration.remove();
            return Ok(registration);
        }

        let mut listeners = self.listeners.lock().await;
        let snapshot = self.state.read().await.snapshot(&path);
        observer.next(snapshot.clone());

        listeners.documents.push(DocumentListener {
            path,
            registration: registration.clone(),
            observer,
            last: Some(snapshot),
        });

        Ok(registration)
    }

    async fn listen_query(
        &self,
        query: Query,
        mut observer: Observer<Vec<QueryDocument>>,
    ) -> FirebaseResult<ListenerRegistration> {
        validate_segment("collection name", &query.collection)?;
        QueryEvaluator::new(&query).validate()?;
        let registration = ListenerRegistration::new();

        if let Err(error) = self.rules.check(&query.collection).await {
            observer.error(error);
            registration.remove();
            return Ok(registration);
        }

        let mut listeners = self.listeners.lock().await;
        let rows = self.state.read().await.query(&query)?;
        observer.next(rows.clone());

        listeners.queries.push(QueryListener {
            query,
            registration: registration.clone(),
            observer,
            last: Some(rows),
        });

        Ok(registration)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
