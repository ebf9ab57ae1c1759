//! The application context: one object owning the wired subsystems.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use tracing::info;

use diarium_index::{Facet, IndexError, IndexService, IndexWorker, SearchQuery, SearchResult, WorkerHandle};
use diarium_store::{Command, Output, PrevalentStore, StateView, StoreResult};

use crate::config;
use crate::error::OpenError;
use crate::sync::{self, ExternalSource};

const STORE_SUBDIR: &str = "store";
const INDEX_SUBDIR: &str = "index";
const DEFAULT_SEARCH_LIMIT: usize = 100;

/// How to open a [`Diarium`].
pub struct DiariumOptions {
    data_dir: PathBuf,
    config_dir: PathBuf,
    source: Option<Arc<dyn ExternalSource>>,
    search_limit: usize,
}

impl DiariumOptions {
    pub fn new(data_dir: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            config_dir: config_dir.into(),
            source: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Connector used to synchronize each register from its external
    /// system. Without one, no sync threads are started.
    pub fn with_source(mut self, source: Arc<dyn ExternalSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }
}

/// A search answer: scored hits plus the facets grouping them.
#[derive(Debug)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub facets: Vec<Facet>,
}

/// The running application: store, index, index worker, and register sync.
///
/// An explicit context object, passed where it is needed; there is no
/// process-global instance. `open` either wires everything or fails, and
/// [`close`](Self::close) tears the context down in reverse order.
pub struct Diarium {
    store: Arc<PrevalentStore>,
    index: Arc<IndexService>,
    worker: Option<WorkerHandle>,
    sync_threads: Vec<thread::JoinHandle<()>>,
    search_limit: usize,
}

impl Diarium {
    /// Open the context.
    ///
    /// Wiring order matters: the index subscription is registered before
    /// bootstrap and reconstruction, so every mutation from this point on
    /// either lands in the rebuilt index or queues for the worker. Both
    /// paths are idempotent upserts, so overlap is harmless.
    pub fn open(options: DiariumOptions) -> Result<Self, OpenError> {
        std::fs::create_dir_all(&options.data_dir).map_err(|source| {
            OpenError::DirectoryCreation {
                dir: options.data_dir.clone(),
                source,
            }
        })?;

        let store = Arc::new(PrevalentStore::open(options.data_dir.join(STORE_SUBDIR))?);
        let subscription = store.subscribe();

        let index_dir = options.data_dir.join(INDEX_SUBDIR);
        let rebuild = !IndexService::exists(&index_dir);
        let index = Arc::new(IndexService::open(&index_dir)?);

        Self::bootstrap(&store, &options.config_dir)?;

        if rebuild {
            index.reconstruct(&store.current_state())?;
        }

        let worker = IndexWorker::spawn(Arc::clone(&store), Arc::clone(&index), subscription);

        let sync_threads = match &options.source {
            Some(source) => sync::spawn_register_sync(&store, source),
            None => Vec::new(),
        };

        info!(data_dir = %options.data_dir.display(), "diarium opened");
        Ok(Self {
            store,
            index,
            worker: Some(worker),
            sync_threads,
            search_limit: options.search_limit,
        })
    }

    /// Seed registers from the bootstrap descriptors, but only into an
    /// empty store: reopening never duplicates registers, and a populated
    /// store does not require descriptor files at all.
    fn bootstrap(store: &PrevalentStore, config_dir: &Path) -> Result<(), OpenError> {
        if store.current_state().has_registers() {
            return Ok(());
        }
        let descriptors = config::load_descriptors(config_dir)?;
        for descriptor in descriptors {
            let identity = store.execute(Command::AllocateIdentity)?.identity();
            store.execute(Command::CreateRegister {
                identity,
                name: descriptor.name,
                source_url: descriptor.source_url,
            })?;
        }
        Ok(())
    }

    /// Execute one command against the store.
    pub fn execute(&self, command: Command) -> StoreResult<Output> {
        self.store.execute(command)
    }

    /// Read-only view of the live record graph.
    pub fn current_state(&self) -> StateView<'_> {
        self.store.current_state()
    }

    /// Run a query and group the hits under every facet.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, IndexError> {
        let results = self.index.search(query, self.search_limit)?;
        let facets = self.index.facets(&results, &self.store.current_state());
        Ok(SearchOutcome { results, facets })
    }

    /// Write a store snapshot so the next open replays less journal.
    pub fn snapshot(&self) -> StoreResult<u64> {
        self.store.snapshot()
    }

    /// Tear the context down: wait out register sync, stop the index
    /// worker, then flush and close both subsystems.
    pub fn close(mut self) -> Result<(), OpenError> {
        for handle in self.sync_threads.drain(..) {
            let _ = handle.join();
        }
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        self.index.close()?;
        self.store.close()?;
        info!("diarium closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ActionRecord, CaseRecord, DocumentRecord, RegisterHandle, SourceBatch};
    use diarium_domain::EntityKind;
    use tempfile::tempdir;

    fn write_descriptors(dir: &Path) {
        std::fs::write(
            dir.join("registers.json"),
            r#"[{"namn": "R1", "jdbcURL": "jdbc:x"}]"#,
        )
        .unwrap();
    }

    fn options(root: &Path) -> DiariumOptions {
        DiariumOptions::new(root.join("data"), root.join("config"))
    }

    fn prepare(root: &Path) {
        diarium_observability::init();
        std::fs::create_dir_all(root.join("config")).unwrap();
        write_descriptors(&root.join("config"));
    }

    #[test]
    fn bootstrap_is_idempotent_across_reopens() {
        let dir = tempdir().unwrap();
        prepare(dir.path());

        let diarium = Diarium::open(options(dir.path())).unwrap();
        assert_eq!(diarium.current_state().registers().count(), 1);
        diarium.close().unwrap();

        let diarium = Diarium::open(options(dir.path())).unwrap();
        let state = diarium.current_state();
        let registers: Vec<_> = state.registers().collect();
        assert_eq!(registers.len(), 1);
        assert_eq!(registers[0].name(), "R1");
        drop(state);
        diarium.close().unwrap();
    }

    #[test]
    fn open_without_descriptors_fails_only_when_seeding_is_needed() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();

        let err = Diarium::open(options(dir.path())).err();
        assert!(matches!(err, Some(OpenError::MissingBootstrapResource { .. })));

        // Seed once with descriptors, then reopen without them.
        write_descriptors(&dir.path().join("config"));
        Diarium::open(options(dir.path())).unwrap().close().unwrap();
        std::fs::remove_file(dir.path().join("config").join("registers.json")).unwrap();

        let diarium = Diarium::open(options(dir.path())).unwrap();
        assert_eq!(diarium.current_state().registers().count(), 1);
        diarium.close().unwrap();
    }

    #[test]
    fn a_fresh_open_reconstructs_a_searchable_index() {
        let dir = tempdir().unwrap();
        prepare(dir.path());

        let diarium = Diarium::open(options(dir.path())).unwrap();
        let outcome = diarium.search(&SearchQuery::text("R1")).unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].kind, EntityKind::Register);
        diarium.close().unwrap();
    }

    struct OneCaseSource;

    impl ExternalSource for OneCaseSource {
        fn fetch(&self, _register: &RegisterHandle) -> Result<SourceBatch, crate::error::SyncError> {
            Ok(SourceBatch {
                units: Vec::new(),
                users: Vec::new(),
                cases: vec![CaseRecord {
                    number: "2024/1".into(),
                    title: Some("Importerat".into()),
                    unit: None,
                    owner: None,
                    actions: vec![ActionRecord {
                        note: None,
                        unit: None,
                        documents: vec![DocumentRecord {
                            title: "bilaga.pdf".into(),
                        }],
                    }],
                }],
            })
        }
    }

    #[test]
    fn register_sync_runs_on_open_and_survives_a_reopen() {
        let dir = tempdir().unwrap();
        prepare(dir.path());

        let diarium =
            Diarium::open(options(dir.path()).with_source(Arc::new(OneCaseSource))).unwrap();
        // close() joins the sync threads, so the import is fully committed.
        diarium.close().unwrap();

        let diarium = Diarium::open(options(dir.path())).unwrap();
        let state = diarium.current_state();
        let case = state
            .entities()
            .find_map(|entity| match entity {
                diarium_domain::EntityRef::Case(case) => Some(case),
                _ => None,
            })
            .unwrap();
        assert_eq!(case.number(), "2024/1");
        assert_eq!(case.actions().len(), 1);
        drop(state);
        diarium.close().unwrap();
    }
}
