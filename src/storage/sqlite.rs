//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    join_forms, split_forms, LemmaRecord, LemmaUpsert, PageRecord, Posting, SiteRecord,
};
use crate::LemmaSearchError;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::path::Path;

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";
const LEMMA_COLUMNS: &str = "id, site_id, lemma, frequency, forms";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(LemmaSearchError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, LemmaSearchError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, LemmaSearchError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn site_from_row(row: &Row) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SiteStatus::Failed),
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

fn lemma_from_row(row: &Row) -> rusqlite::Result<LemmaRecord> {
    Ok(LemmaRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        lemma: row.get(2)?,
        frequency: row.get(3)?,
        forms: split_forms(&row.get::<_, String>(4)?),
    })
}

/// Maps constraint failures to a storage error carrying `context`
fn constraint_error(error: rusqlite::Error, context: impl FnOnce() -> String) -> StorageError {
    match &error {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation(context())
        }
        _ => StorageError::Sqlite(error),
    }
}

impl Storage for SqliteStorage {
    // ===== Sites =====

    fn create_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO sites (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
                params![url, name, status.to_db_string(), now],
            )
            .map_err(|e| constraint_error(e, || format!("Site {} already exists", url)))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE id = ?1", SITE_COLUMNS),
                params![site_id],
                site_from_row,
            )
            .optional()?
            .ok_or(StorageError::SiteNotFound(site_id))
    }

    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE url = ?1", SITE_COLUMNS),
                params![url],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE sites SET status = ?1, last_error = ?2, status_time = ?3 WHERE id = ?4",
            params![status.to_db_string(), last_error, now, site_id],
        )?;
        if updated == 0 {
            return Err(StorageError::SiteNotFound(site_id));
        }
        Ok(())
    }

    fn touch_site(&mut self, site_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sites SET status_time = ?1 WHERE id = ?2",
            params![now, site_id],
        )?;
        Ok(())
    }

    fn delete_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM sites WHERE id = ?1", params![site_id])?;
        Ok(())
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM sites ORDER BY id", SITE_COLUMNS))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    // ===== Pages =====

    fn insert_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> StorageResult<i64> {
        self.conn
            .execute(
                "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
                params![site_id, path, code, content],
            )
            .map_err(|e| {
                constraint_error(e, || {
                    format!("Cannot store page {} for site {}", path, site_id)
                })
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![page_id],
                page_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::PageNotFound(format!("Page ID {}", page_id)))
    }

    fn get_page_by_path(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM pages WHERE site_id = ?1 AND path = ?2",
                    PAGE_COLUMNS
                ),
                params![site_id, path],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn delete_page(&mut self, page_id: i64) -> StorageResult<()> {
        let site_id: i64 = self
            .conn
            .query_row(
                "SELECT site_id FROM pages WHERE id = ?1",
                params![page_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::PageNotFound(format!("Page ID {}", page_id)))?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE lemmas SET frequency = frequency - 1
             WHERE id IN (SELECT lemma_id FROM index_entries WHERE page_id = ?1)",
            params![page_id],
        )?;
        tx.execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;
        tx.execute(
            "DELETE FROM lemmas WHERE site_id = ?1 AND frequency <= 0",
            params![site_id],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Lemmas =====

    fn get_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
                    LEMMA_COLUMNS
                ),
                params![site_id, lemma],
                lemma_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn get_lemmas_by_text(&self, lemma: &str) -> StorageResult<Vec<LemmaRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM lemmas WHERE lemma = ?1 ORDER BY site_id",
            LEMMA_COLUMNS
        ))?;
        let lemmas = stmt
            .query_map(params![lemma], lemma_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lemmas)
    }

    fn get_lemmas_by_site(&self, site_id: i64) -> StorageResult<Vec<LemmaRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM lemmas WHERE site_id = ?1 ORDER BY lemma",
            LEMMA_COLUMNS
        ))?;
        let lemmas = stmt
            .query_map(params![site_id], lemma_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lemmas)
    }

    fn get_surface_forms(&self, lemma_id: i64) -> StorageResult<Vec<String>> {
        let forms: String = self
            .conn
            .query_row(
                "SELECT forms FROM lemmas WHERE id = ?1",
                params![lemma_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StorageError::LemmaNotFound(lemma_id))?;
        Ok(split_forms(&forms))
    }

    fn count_lemmas_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemmas WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_lemmas(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM lemmas", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn index_page_lemmas(
        &mut self,
        site_id: i64,
        page_id: i64,
        lemmas: &[LemmaUpsert],
    ) -> StorageResult<Vec<LemmaRecord>> {
        let tx = self.conn.transaction()?;
        let mut records = Vec::with_capacity(lemmas.len());

        for upsert in lemmas {
            let existing: Option<(i64, u32, String)> = tx
                .query_row(
                    "SELECT id, frequency, forms FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
                    params![site_id, upsert.lemma],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let mut forms: BTreeSet<String> = upsert.forms.iter().cloned().collect();

            let (id, frequency) = match existing {
                None => {
                    tx.execute(
                        "INSERT INTO lemmas (site_id, lemma, frequency, forms) VALUES (?1, ?2, 1, ?3)",
                        params![site_id, upsert.lemma, join_forms(&forms)],
                    )?;
                    (tx.last_insert_rowid(), 1)
                }
                Some((id, frequency, stored)) => {
                    let contributed: bool = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM index_entries WHERE page_id = ?1 AND lemma_id = ?2)",
                        params![page_id, id],
                        |row| row.get(0),
                    )?;
                    let frequency = if contributed { frequency } else { frequency + 1 };

                    forms.extend(split_forms(&stored));
                    tx.execute(
                        "UPDATE lemmas SET frequency = ?1, forms = ?2 WHERE id = ?3",
                        params![frequency, join_forms(&forms), id],
                    )?;
                    (id, frequency)
                }
            };

            tx.execute(
                "INSERT INTO index_entries (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)
                 ON CONFLICT(page_id, lemma_id) DO UPDATE SET rank = excluded.rank",
                params![page_id, id, upsert.rank],
            )
            .map_err(|e| {
                constraint_error(e, || {
                    format!("Cannot index lemma {} on page {}", upsert.lemma, page_id)
                })
            })?;

            records.push(LemmaRecord {
                id,
                site_id,
                lemma: upsert.lemma.clone(),
                frequency,
                forms: forms.into_iter().collect(),
            });
        }

        tx.commit()?;
        Ok(records)
    }

    // ===== Index entries =====

    fn get_postings(&self, lemma_id: i64) -> StorageResult<Vec<Posting>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_id, rank FROM index_entries WHERE lemma_id = ?1 ORDER BY page_id",
        )?;
        let postings = stmt
            .query_map(params![lemma_id], |row| {
                Ok(Posting {
                    page_id: row.get(0)?,
                    rank: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(postings)
    }

    fn get_rank(&self, page_id: i64, lemma_id: i64) -> StorageResult<Option<u32>> {
        let rank = self
            .conn
            .query_row(
                "SELECT rank FROM index_entries WHERE page_id = ?1 AND lemma_id = ?2",
                params![page_id, lemma_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(lemma: &str, forms: &[&str], rank: u32) -> LemmaUpsert {
        LemmaUpsert {
            lemma: lemma.to_string(),
            forms: forms.iter().map(|f| f.to_string()).collect(),
            rank,
        }
    }

    fn index_page(
        storage: &mut SqliteStorage,
        site_id: i64,
        path: &str,
        lemmas: &[(&str, &[&str], u32)],
    ) -> i64 {
        let page_id = storage.insert_page(site_id, path, 200, "<html></html>").unwrap();
        let upserts: Vec<_> = lemmas.iter().map(|(l, f, r)| upsert(l, f, *r)).collect();
        storage.index_page_lemmas(site_id, page_id, &upserts).unwrap();
        page_id
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.db");
        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage
                .create_site("https://example.com/", "Example", SiteStatus::Indexing)
                .unwrap();
        }
        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.list_sites().unwrap().len(), 1);
    }

    #[test]
    fn test_site_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .create_site("https://example.com/", "Example", SiteStatus::Indexing)
            .unwrap();

        let site = storage.get_site(id).unwrap();
        assert_eq!(site.status, SiteStatus::Indexing);
        assert_eq!(site.last_error, None);

        storage
            .update_site_status(id, SiteStatus::Failed, Some("boom"))
            .unwrap();
        let site = storage
            .get_site_by_url("https://example.com/")
            .unwrap()
            .unwrap();
        assert_eq!(site.status, SiteStatus::Failed);
        assert_eq!(site.last_error.as_deref(), Some("boom"));

        assert!(storage.get_site_by_url("https://other.com/").unwrap().is_none());
        assert!(matches!(
            storage.get_site(id + 1),
            Err(StorageError::SiteNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_site_is_constraint_violation() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .create_site("https://example.com/", "Example", SiteStatus::Indexing)
            .unwrap();
        let result = storage.create_site("https://example.com/", "Again", SiteStatus::Indexing);
        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
    }

    #[test]
    fn test_page_path_unique_per_site() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage
            .create_site("https://a.com/", "A", SiteStatus::Indexing)
            .unwrap();
        let b = storage
            .create_site("https://b.com/", "B", SiteStatus::Indexing)
            .unwrap();

        storage.insert_page(a, "/", 200, "x").unwrap();
        storage.insert_page(b, "/", 200, "y").unwrap();
        assert!(matches!(
            storage.insert_page(a, "/", 200, "z"),
            Err(StorageError::ConstraintViolation(_))
        ));

        let page = storage.get_page_by_path(b, "/").unwrap().unwrap();
        assert_eq!(page.content, "y");
        assert_eq!(storage.count_pages_by_site(a).unwrap(), 1);
        assert_eq!(storage.count_pages().unwrap(), 2);
    }

    #[test]
    fn test_frequency_counts_pages_once() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let site = storage
            .create_site("https://example.com/", "Example", SiteStatus::Indexing)
            .unwrap();

        let page = index_page(&mut storage, site, "/a", &[("run", &["runs"], 2)]);

        // Same page contributing again must not increment
        storage
            .index_page_lemmas(site, page, &[upsert("run", &["running"], 2)])
            .unwrap();
        let lemma = storage.get_lemma(site, "run").unwrap().unwrap();
        assert_eq!(lemma.frequency, 1);

        index_page(&mut storage, site, "/b", &[("run", &["run"], 1)]);
        let lemma = storage.get_lemma(site, "run").unwrap().unwrap();
        assert_eq!(lemma.frequency, 2);
        assert_eq!(lemma.forms, vec!["run", "running", "runs"]);
    }

    #[test]
    fn test_postings_and_rank() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let site = storage
            .create_site("https://example.com/", "Example", SiteStatus::Indexing)
            .unwrap();
        let p1 = index_page(&mut storage, site, "/1", &[("run", &["run"], 3)]);
        let p2 = index_page(&mut storage, site, "/2", &[("run", &["run"], 1)]);

        let lemma = storage.get_lemma(site, "run").unwrap().unwrap();
        let postings = storage.get_postings(lemma.id).unwrap();
        assert_eq!(
            postings,
            vec![
                Posting { page_id: p1, rank: 3 },
                Posting { page_id: p2, rank: 1 },
            ]
        );
        assert_eq!(storage.get_rank(p1, lemma.id).unwrap(), Some(3));
        assert_eq!(storage.get_rank(p1, lemma.id + 100).unwrap(), None);
        assert_eq!(storage.get_surface_forms(lemma.id).unwrap(), vec!["run"]);
    }

    #[test]
    fn test_delete_page_keeps_frequency_consistent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let site = storage
            .create_site("https://example.com/", "Example", SiteStatus::Indexing)
            .unwrap();
        let p1 = index_page(
            &mut storage,
            site,
            "/1",
            &[("run", &["run"], 1), ("walk", &["walk"], 1)],
        );
        index_page(&mut storage, site, "/2", &[("run", &["run"], 2)]);

        storage.delete_page(p1).unwrap();

        let run = storage.get_lemma(site, "run").unwrap().unwrap();
        assert_eq!(run.frequency, 1);
        assert_eq!(storage.get_postings(run.id).unwrap().len(), 1);
        assert!(storage.get_lemma(site, "walk").unwrap().is_none());
        assert!(matches!(
            storage.delete_page(p1),
            Err(StorageError::PageNotFound(_))
        ));
    }

    #[test]
    fn test_delete_site_cascades() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let a = storage
            .create_site("https://a.com/", "A", SiteStatus::Indexing)
            .unwrap();
        let b = storage
            .create_site("https://b.com/", "B", SiteStatus::Indexing)
            .unwrap();
        index_page(&mut storage, a, "/", &[("run", &["run"], 1)]);
        index_page(&mut storage, b, "/", &[("run", &["run"], 1)]);

        storage.delete_site(a).unwrap();

        assert_eq!(storage.list_sites().unwrap().len(), 1);
        assert_eq!(storage.count_pages().unwrap(), 1);
        assert_eq!(storage.count_lemmas().unwrap(), 1);
        assert_eq!(storage.count_lemmas_by_site(a).unwrap(), 0);

        let rows = storage.get_lemmas_by_text("run").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].site_id, b);
        assert_eq!(storage.get_postings(rows[0].id).unwrap().len(), 1);
    }

    #[test]
    fn test_index_entry_rank_is_replaced() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let site = storage
            .create_site("https://example.com/", "Example", SiteStatus::Indexing)
            .unwrap();
        let page = index_page(&mut storage, site, "/", &[("run", &["run"], 1)]);
        let lemma = storage.get_lemma(site, "run").unwrap().unwrap();

        storage
            .index_page_lemmas(site, page, &[upsert("run", &["run"], 4)])
            .unwrap();

        assert_eq!(storage.get_rank(page, lemma.id).unwrap(), Some(4));
        assert_eq!(storage.get_postings(lemma.id).unwrap().len(), 1);
        assert_eq!(storage.get_lemma(site, "run").unwrap().unwrap().frequency, 1);
    }

    #[test]
    fn test_failed_index_write_rolls_back_lemmas() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let site = storage
            .create_site("https://example.com/", "Example", SiteStatus::Indexing)
            .unwrap();
        index_page(&mut storage, site, "/", &[("run", &["run"], 1)]);

        // No page with this ID exists, so the index entry insert fails
        let missing_page = 9_999;
        let result = storage.index_page_lemmas(
            site,
            missing_page,
            &[upsert("run", &["runs"], 2), upsert("walk", &["walk"], 1)],
        );
        assert!(result.is_err());

        let run = storage.get_lemma(site, "run").unwrap().unwrap();
        assert_eq!(run.frequency, 1);
        assert_eq!(run.forms, vec!["run"]);
        assert!(storage.get_lemma(site, "walk").unwrap().is_none());
        assert_eq!(storage.get_postings(run.id).unwrap().len(), 1);
    }

    #[test]
    fn test_lemmas_by_site_sorted() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let site = storage
            .create_site("https://example.com/", "Example", SiteStatus::Indexing)
            .unwrap();
        index_page(
            &mut storage,
            site,
            "/",
            &[("walk", &["walk"], 1), ("dog", &["dogs"], 1)],
        );

        let lemmas: Vec<String> = storage
            .get_lemmas_by_site(site)
            .unwrap()
            .into_iter()
            .map(|l| l.lemma)
            .collect();
        assert_eq!(lemmas, vec!["dog", "walk"]);
    }
}
