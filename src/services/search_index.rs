//! Full-text index over link names and urls.
//!
//! The index is a denormalized projection of the bookmark tree and is never
//! authoritative: every document can be rebuilt from storage. Writes are not
//! part of any storage transaction; callers issue them after their commit.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, INDEXED, STORED, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, Term};

use crate::types::bookmark::SearchDocument;
use crate::types::errors::BookmarkError;

/// Document store operations the engines rely on.
pub trait SearchIndexTrait {
    /// Inserts or replaces the document with the same id.
    fn upsert_one(&self, doc: &SearchDocument) -> Result<(), BookmarkError> {
        self.upsert_batch(std::slice::from_ref(doc))
    }
    fn upsert_batch(&self, docs: &[SearchDocument]) -> Result<(), BookmarkError>;
    /// Removes the documents with the given ids. An empty set is a no-op.
    fn delete_batch(&self, ids: &HashSet<i64>) -> Result<(), BookmarkError>;
    /// Removes every document owned by the user.
    fn delete_by_user(&self, user_id: i64) -> Result<(), BookmarkError>;
    /// Matches `query` against name and url, restricted to the user's
    /// documents, returning at most `limit` hits by relevance.
    fn search(
        &self,
        user_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchDocument>, BookmarkError>;
}

/// Budget for throwaway in-memory indexes.
const IN_MEMORY_WRITER_HEAP: usize = 15_000_000;

/// Tokens longer than this are dropped by tantivy's default analyzer.
const MAX_TOKEN_LEN: usize = 40;

/// tantivy-backed search index.
pub struct SearchIndex {
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    id: Field,
    user_id: Field,
    name: Field,
    url: Field,
}

impl SearchIndex {
    /// Opens (or creates) an index stored in the directory at `path`.
    pub fn open(path: impl AsRef<Path>, writer_heap: usize) -> Result<Self, BookmarkError> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| {
            BookmarkError::IndexError(format!("Failed to create {}: {}", path.display(), e))
        })?;
        let dir = MmapDirectory::open(path)
            .map_err(|e| BookmarkError::IndexError(e.to_string()))?;
        let (schema, fields) = Self::schema();
        let index = Index::open_or_create(dir, schema)?;
        Self::from_index(index, fields, writer_heap)
    }

    /// Creates an empty index held entirely in memory.
    pub fn in_memory() -> Result<Self, BookmarkError> {
        let (schema, fields) = Self::schema();
        Self::from_index(Index::create_in_ram(schema), fields, IN_MEMORY_WRITER_HEAP)
    }

    /// Fields are numbered in declaration order, so the handles returned
    /// here also address an existing index created from the same schema.
    fn schema() -> (Schema, [Field; 4]) {
        let mut builder = Schema::builder();
        let id = builder.add_i64_field("id", INDEXED | STORED);
        let user_id = builder.add_i64_field("user_id", INDEXED | STORED);
        let name = builder.add_text_field("name", TEXT | STORED);
        let url = builder.add_text_field("url", TEXT | STORED);
        (builder.build(), [id, user_id, name, url])
    }

    fn from_index(
        index: Index,
        fields: [Field; 4],
        writer_heap: usize,
    ) -> Result<Self, BookmarkError> {
        let [id, user_id, name, url] = fields;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer_with_num_threads(1, writer_heap)?;
        Ok(Self {
            reader,
            writer: Mutex::new(writer),
            id,
            user_id,
            name,
            url,
        })
    }

    /// Runs `stage` against the writer, then commits and makes the result
    /// visible to the next search. A failed stage discards its changes.
    fn write<F>(&self, stage: F) -> Result<(), BookmarkError>
    where
        F: FnOnce(&mut IndexWriter, &Self) -> Result<(), BookmarkError>,
    {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| BookmarkError::IndexError(e.to_string()))?;
        if let Err(err) = stage(&mut *writer, self) {
            writer.rollback()?;
            return Err(err);
        }
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    fn to_search_document(&self, retrieved: &tantivy::Document) -> Option<SearchDocument> {
        Some(SearchDocument {
            id: retrieved.get_first(self.id)?.as_i64()?,
            user_id: retrieved.get_first(self.user_id)?.as_i64()?,
            name: retrieved.get_first(self.name)?.as_text()?.to_string(),
            url: retrieved.get_first(self.url)?.as_text()?.to_string(),
        })
    }
}

/// Splits query text the way the default analyzer splits indexed text:
/// on non-alphanumeric characters, lowercased, over-long tokens dropped.
pub fn query_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && t.len() < MAX_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

impl SearchIndexTrait for SearchIndex {
    fn upsert_batch(&self, docs: &[SearchDocument]) -> Result<(), BookmarkError> {
        if docs.is_empty() {
            return Ok(());
        }
        self.write(|writer, fields| {
            for doc in docs {
                writer.delete_term(Term::from_field_i64(fields.id, doc.id));
                writer.add_document(doc!(
                    fields.id => doc.id,
                    fields.user_id => doc.user_id,
                    fields.name => doc.name.as_str(),
                    fields.url => doc.url.as_str()
                ))?;
            }
            Ok(())
        })
    }

    fn delete_batch(&self, ids: &HashSet<i64>) -> Result<(), BookmarkError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.write(|writer, fields| {
            for id in ids {
                writer.delete_term(Term::from_field_i64(fields.id, *id));
            }
            Ok(())
        })
    }

    fn delete_by_user(&self, user_id: i64) -> Result<(), BookmarkError> {
        self.write(|writer, fields| {
            writer.delete_term(Term::from_field_i64(fields.user_id, user_id));
            Ok(())
        })
    }

    fn search(
        &self,
        user_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchDocument>, BookmarkError> {
        let terms = query_terms(query);
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut text_clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for term in &terms {
            for field in [self.name, self.url] {
                let clause: Box<dyn Query> = Box::new(TermQuery::new(
                    Term::from_field_text(field, term),
                    IndexRecordOption::WithFreqs,
                ));
                text_clauses.push((Occur::Should, clause));
            }
        }
        let owner: Box<dyn Query> = Box::new(TermQuery::new(
            Term::from_field_i64(self.user_id, user_id),
            IndexRecordOption::Basic,
        ));
        let text: Box<dyn Query> = Box::new(BooleanQuery::new(text_clauses));
        let query = BooleanQuery::new(vec![(Occur::Must, owner), (Occur::Must, text)]);

        let searcher = self.reader.searcher();
        let hits = searcher.search(&query, &TopDocs::with_limit(limit))?;
        let mut results = Vec::with_capacity(hits.len());
        for (_score, address) in hits {
            let retrieved = searcher.doc(address)?;
            if let Some(doc) = self.to_search_document(&retrieved) {
                results.push(doc);
            }
        }
        Ok(results)
    }
}
