//! The index service: incremental upserts, full reconstruction, search.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tantivy::collector::TopDocs;
use tantivy::query::{Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument, Term};
use tracing::{debug, info};

use diarium_core::Identity;
use diarium_domain::{EntityKind, EntityRef, EntityVisitor, Root};

use crate::error::{IndexError, IndexResult};
use crate::facet::{Facet, FacetDefinition, UnitsFacet};
use crate::schema::{FIELD_FACET_UNIT, FIELD_KIND, SchemaFields};
use crate::search::{SearchQuery, SearchResult};

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Searchable view over the record graph, backed by an on-disk inverted
/// index.
///
/// The index is derived state: [`reconstruct`](Self::reconstruct) rebuilds
/// it in full from the root, and [`update`](Self::update) applies one
/// entity's change as an atomic delete-then-add. Writes are serialized
/// through a single writer; reads go through a reader that is reloaded on
/// every commit, so searches always see the latest committed state.
pub struct IndexService {
    index: Index,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    fields: SchemaFields,
    facets: Vec<Box<dyn FacetDefinition>>,
    closed: AtomicBool,
}

impl IndexService {
    /// Open the index at `dir`, creating it if the directory holds none.
    pub fn open(dir: &Path) -> IndexResult<Self> {
        let fields = SchemaFields::new();
        let index = if Self::exists(dir) {
            Index::open_in_dir(dir)?
        } else {
            std::fs::create_dir_all(dir)?;
            Index::create_in_dir(dir, fields.schema.clone())?
        };
        let writer = index.writer(WRITER_HEAP_BYTES)?;
        let reader = index.reader()?;
        info!(dir = %dir.display(), "index opened");
        Ok(Self {
            index,
            writer: Mutex::new(writer),
            reader,
            fields,
            facets: vec![Box::new(UnitsFacet::new())],
            closed: AtomicBool::new(false),
        })
    }

    /// Whether `dir` already holds an index. Missing or empty directories
    /// trigger a full reconstruction in the application layer.
    pub fn exists(dir: &Path) -> bool {
        dir.join("meta.json").is_file()
    }

    /// The facet definitions this index computes.
    pub fn facet_definitions(&self) -> &[Box<dyn FacetDefinition>] {
        &self.facets
    }

    /// Upsert one entity, or remove its index entry if it is no longer in
    /// the graph. Commits before returning, so the change is durable and
    /// visible to the next search.
    pub fn update(&self, root: &Root, kind: EntityKind, identity: Identity) -> IndexResult<()> {
        self.apply(self.entry_for(root, kind, identity))
    }

    /// Compute one entity's index entry from the graph. Pure read: callers
    /// holding a lock on the graph can release it before [`apply`]
    /// commits the entry, so graph writers never wait on index I/O.
    ///
    /// [`apply`]: Self::apply
    pub fn entry_for(&self, root: &Root, kind: EntityKind, identity: Identity) -> IndexEntry {
        IndexEntry {
            kind,
            identity,
            document: root
                .entity(kind, identity)
                .map(|entity| self.document_for(entity, root)),
        }
    }

    /// Commit a prepared entry as an atomic delete-then-add. An entry with
    /// no document removes the entity from the index.
    pub fn apply(&self, entry: IndexEntry) -> IndexResult<()> {
        self.check_open()?;
        let mut writer = self.lock_writer()?;
        writer.delete_term(Term::from_field_u64(
            self.fields.identity,
            entry.identity.value(),
        ));
        if let Some(document) = entry.document {
            writer.add_document(document)?;
        }
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        debug!(kind = %entry.kind, identity = %entry.identity, "index entry updated");
        Ok(())
    }

    /// Remove one entity's index entry, if any. Entities are never
    /// hard-deleted from the graph today; this covers the stale entries a
    /// reconstruction would otherwise be needed for.
    pub fn remove(&self, identity: Identity) -> IndexResult<()> {
        self.check_open()?;
        let mut writer = self.lock_writer()?;
        writer.delete_term(Term::from_field_u64(self.fields.identity, identity.value()));
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        debug!(%identity, "index entry removed");
        Ok(())
    }

    /// Rebuild the whole index from the current root.
    ///
    /// Clears every existing entry first, so the result is identical
    /// whether the previous index was empty, stale, or corrupt.
    pub fn reconstruct(&self, root: &Root) -> IndexResult<()> {
        self.check_open()?;
        let mut writer = self.lock_writer()?;
        writer.delete_all_documents()?;
        let mut indexed = 0usize;
        for entity in root.entities() {
            writer.add_document(self.document_for(entity, root))?;
            indexed += 1;
        }
        writer.commit()?;
        drop(writer);
        self.reader.reload()?;
        info!(entities = indexed, "index reconstructed");
        Ok(())
    }

    /// Run a query and return up to `limit` hits, best first.
    pub fn search(&self, query: &SearchQuery, limit: usize) -> IndexResult<Vec<SearchResult>> {
        self.check_open()?;
        let parsed = self.build_query(query)?;
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&*parsed, &TopDocs::with_limit(limit.max(1)))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let identity = doc
                .get_first(self.fields.identity)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| IndexError::internal("hit without stored identity"))?;
            let kind = doc
                .get_first(self.fields.kind)
                .and_then(|v| v.as_str())
                .ok_or_else(|| IndexError::internal("hit without stored kind"))?;
            let kind: EntityKind = kind
                .parse()
                .map_err(|_| IndexError::internal(format!("unknown stored kind: {kind}")))?;
            results.push(SearchResult {
                identity: Identity::new(identity),
                kind,
                score,
            });
        }
        Ok(results)
    }

    /// Group a result set under every facet, re-derived from the live
    /// graph. Facets with no values in the result set are omitted.
    pub fn facets(&self, results: &[SearchResult], root: &Root) -> Vec<Facet> {
        self.facets
            .iter()
            .map(|definition| definition.facet(results, root))
            .filter(|facet| !facet.values.is_empty())
            .collect()
    }

    /// Flush pending writes and refuse further operations.
    pub fn close(&self) -> IndexResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut writer = self.lock_writer()?;
        writer.commit()?;
        info!("index closed");
        Ok(())
    }

    fn check_open(&self) -> IndexResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(IndexError::IndexClosed);
        }
        Ok(())
    }

    fn lock_writer(&self) -> IndexResult<std::sync::MutexGuard<'_, IndexWriter>> {
        self.writer
            .lock()
            .map_err(|_| IndexError::internal("index writer lock poisoned"))
    }

    fn build_query(&self, query: &SearchQuery) -> IndexResult<Box<dyn Query>> {
        match query {
            SearchQuery::Text { value } => {
                let parser = QueryParser::for_index(&self.index, vec![self.fields.text]);
                parser
                    .parse_query(value)
                    .map_err(|e| IndexError::query(e.to_string()))
            }
            SearchQuery::Term { field, value } => {
                let field = match field.as_str() {
                    FIELD_KIND => self.fields.kind,
                    FIELD_FACET_UNIT => self.fields.facet_unit,
                    other => {
                        return Err(IndexError::query(format!("unknown term field: {other}")));
                    }
                };
                Ok(Box::new(TermQuery::new(
                    Term::from_field_text(field, value),
                    IndexRecordOption::Basic,
                )))
            }
        }
    }

    fn document_for(&self, entity: EntityRef<'_>, root: &Root) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_u64(self.fields.identity, entity.identity().value());
        doc.add_text(self.fields.kind, entity.kind().as_str());

        let mut fields = TextFields {
            root,
            text: Vec::new(),
        };
        entity.accept(&mut fields);
        if !fields.text.is_empty() {
            doc.add_text(self.fields.text, fields.text.join(" "));
        }

        for definition in &self.facets {
            let field = match definition.field() {
                FIELD_FACET_UNIT => self.fields.facet_unit,
                _ => continue,
            };
            for term in definition.index_terms(entity, root) {
                doc.add_text(field, term);
            }
        }
        doc
    }
}

/// A prepared index mutation: the tantivy document for one entity, or its
/// removal when the entity is gone from the graph.
#[derive(Debug)]
pub struct IndexEntry {
    kind: EntityKind,
    identity: Identity,
    document: Option<TantivyDocument>,
}

/// Collects the free-text terms an entity contributes to the `text` field.
struct TextFields<'a> {
    root: &'a Root,
    text: Vec<String>,
}

impl TextFields<'_> {
    fn push(&mut self, value: &str) {
        if !value.is_empty() {
            self.text.push(value.to_owned());
        }
    }

    fn push_opt(&mut self, value: Option<&str>) {
        if let Some(value) = value {
            self.push(value);
        }
    }

    fn push_unit(&mut self, unit: Option<Identity>) {
        if let Some(unit) = unit.and_then(|unit| self.root.unit(unit)) {
            self.push(unit.display_value());
        }
    }
}

impl EntityVisitor for TextFields<'_> {
    type Output = ();

    fn fallback(&mut self, _entity: EntityRef<'_>) {}

    fn visit_register(&mut self, register: &diarium_domain::Register) {
        self.push(register.name());
    }

    fn visit_case(&mut self, case: &diarium_domain::Case) {
        self.push(case.number());
        self.push_opt(case.title());
        self.push_unit(case.unit());
    }

    fn visit_action(&mut self, action: &diarium_domain::Action) {
        self.push_opt(action.note());
        self.push_unit(action.unit());
    }

    fn visit_document(&mut self, document: &diarium_domain::Document) {
        self.push(document.title());
    }

    fn visit_unit(&mut self, unit: &diarium_domain::Unit) {
        self.push(unit.code());
        self.push_opt(unit.name());
    }

    fn visit_user(&mut self, user: &diarium_domain::User) {
        self.push(user.signature());
        self.push_opt(user.name());
        self.push_opt(user.email());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diarium_domain::{Action, Case, CasePatch, Register, Unit};
    use tempfile::tempdir;

    fn seeded_root() -> Root {
        let mut root = Root::new();
        let register = root.allocate_identity();
        root.insert_register(Register::new(register, "Huvuddiariet", "jdbc:x"))
            .unwrap();

        let unit = root.allocate_identity();
        root.insert_unit(Unit::new(unit, "KSF", Some("Kansli".into())))
            .unwrap();

        let case = root.allocate_identity();
        root.insert_case(Case::new(case, register, "2024/17")).unwrap();
        root.update_case(
            case,
            &CasePatch {
                title: Some("Bygglov garage".into()),
                unit: Some(Some(unit)),
                ..CasePatch::default()
            },
        )
        .unwrap();

        let action = root.allocate_identity();
        root.insert_action(Action::new(action, case).with_details(
            Some("Remiss skickad".into()),
            None,
            None,
            None,
        ))
        .unwrap();
        root
    }

    #[test]
    fn text_search_finds_entities_by_their_visited_fields() {
        let dir = tempdir().unwrap();
        let service = IndexService::open(dir.path()).unwrap();
        let root = seeded_root();
        service.reconstruct(&root).unwrap();

        let hits = service.search(&SearchQuery::text("bygglov"), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, EntityKind::Case);

        let hits = service.search(&SearchQuery::text("remiss"), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, EntityKind::Action);
    }

    #[test]
    fn term_search_filters_by_kind_and_facet_field() {
        let dir = tempdir().unwrap();
        let service = IndexService::open(dir.path()).unwrap();
        let root = seeded_root();
        service.reconstruct(&root).unwrap();

        let hits = service
            .search(&SearchQuery::term(FIELD_KIND, "case"), 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, EntityKind::Case);

        // The action inherits its case's unit, so both are indexed under
        // the facet value.
        let hits = service
            .search(&SearchQuery::term(FIELD_FACET_UNIT, "Kansli"), 10)
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn unknown_term_field_is_a_query_error() {
        let dir = tempdir().unwrap();
        let service = IndexService::open(dir.path()).unwrap();
        let err = service
            .search(&SearchQuery::term("nope", "x"), 10)
            .unwrap_err();
        assert!(matches!(err, IndexError::Query(_)));
    }

    #[test]
    fn update_reflects_a_mutated_entity() {
        let dir = tempdir().unwrap();
        let service = IndexService::open(dir.path()).unwrap();
        let mut root = seeded_root();
        service.reconstruct(&root).unwrap();

        let case = service
            .search(&SearchQuery::term(FIELD_KIND, "case"), 10)
            .unwrap()[0]
            .identity;
        root.update_case(
            case,
            &CasePatch {
                title: Some("Rivningslov".into()),
                ..CasePatch::default()
            },
        )
        .unwrap();
        service.update(&root, EntityKind::Case, case).unwrap();

        assert!(
            service
                .search(&SearchQuery::text("bygglov"), 10)
                .unwrap()
                .is_empty()
        );
        let hits = service.search(&SearchQuery::text("rivningslov"), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identity, case);
    }

    #[test]
    fn prepared_entries_commit_after_the_graph_is_released() {
        let dir = tempdir().unwrap();
        let service = IndexService::open(dir.path()).unwrap();
        let mut root = seeded_root();
        service.reconstruct(&root).unwrap();

        let case = service
            .search(&SearchQuery::term(FIELD_KIND, "case"), 10)
            .unwrap()[0]
            .identity;
        root.update_case(
            case,
            &CasePatch {
                title: Some("Marklov".into()),
                ..CasePatch::default()
            },
        )
        .unwrap();

        // The entry is a pure read of the graph; committing it needs no
        // access to the root at all.
        let entry = service.entry_for(&root, EntityKind::Case, case);
        drop(root);
        service.apply(entry).unwrap();

        let hits = service.search(&SearchQuery::text("marklov"), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identity, case);
    }

    #[test]
    fn reconstruction_is_idempotent_over_a_stale_index() {
        let dir = tempdir().unwrap();
        let service = IndexService::open(dir.path()).unwrap();
        let root = seeded_root();
        service.reconstruct(&root).unwrap();
        service.reconstruct(&root).unwrap();

        // No duplicates: each seeded entity appears exactly once.
        let hits = service
            .search(&SearchQuery::term(FIELD_KIND, "case"), 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn index_survives_a_reopen() {
        let dir = tempdir().unwrap();
        let root = seeded_root();
        {
            let service = IndexService::open(dir.path()).unwrap();
            service.reconstruct(&root).unwrap();
            service.close().unwrap();
        }
        assert!(IndexService::exists(dir.path()));

        let service = IndexService::open(dir.path()).unwrap();
        let hits = service.search(&SearchQuery::text("bygglov"), 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn operations_after_close_fail() {
        let dir = tempdir().unwrap();
        let service = IndexService::open(dir.path()).unwrap();
        service.close().unwrap();
        let err = service.search(&SearchQuery::text("x"), 10).unwrap_err();
        assert!(matches!(err, IndexError::IndexClosed));
        let err = service.reconstruct(&Root::new()).unwrap_err();
        assert!(matches!(err, IndexError::IndexClosed));
    }

    #[test]
    fn facets_group_results_and_skip_empty_dimensions() {
        let dir = tempdir().unwrap();
        let service = IndexService::open(dir.path()).unwrap();
        let root = seeded_root();
        service.reconstruct(&root).unwrap();

        let hits = service
            .search(&SearchQuery::term(FIELD_KIND, "case"), 10)
            .unwrap();
        let facets = service.facets(&hits, &root);
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].title, "Units");
        assert_eq!(facets[0].values.len(), 1);
        assert_eq!(facets[0].values[0].value, "Kansli");

        // A register resolves to no unit: no facet values, facet omitted.
        let hits = service
            .search(&SearchQuery::term(FIELD_KIND, "register"), 10)
            .unwrap();
        assert!(service.facets(&hits, &root).is_empty());
    }
}
