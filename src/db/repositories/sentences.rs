use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{format_date, format_datetime, parse_date, parse_datetime},
        models::{day_bounds, SentenceRecord},
        store::{SentenceStore, PACK_SIZE},
    },
    errors::StoreResult,
};

const SENTENCE_COLUMNS: &str = "id, hanzi, pinyin, english, pack_date, index_in_pack, \
     audio_reference, learned, favorite, created_at, batch_id";

fn row_to_sentence(row: &Row) -> Result<SentenceRecord> {
    let pack_date: String = row.get("pack_date")?;
    let created_at: String = row.get("created_at")?;

    Ok(SentenceRecord {
        id: row.get("id")?,
        hanzi: row.get("hanzi")?,
        pinyin: row.get("pinyin")?,
        english: row.get("english")?,
        pack_date: parse_date(&pack_date, "pack_date")?,
        index_in_pack: row.get("index_in_pack")?,
        audio_reference: row.get("audio_reference")?,
        learned: row.get("learned")?,
        favorite: row.get("favorite")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        batch_id: row.get("batch_id")?,
    })
}

fn query_sentences(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<SentenceRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut sentences = Vec::new();
    while let Some(row) = rows.next()? {
        sentences.push(row_to_sentence(row)?);
    }
    Ok(sentences)
}

fn upsert_row(conn: &Connection, record: &SentenceRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO sentences (id, hanzi, pinyin, english, pack_date, index_in_pack,
                                audio_reference, learned, favorite, created_at, batch_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
             hanzi = excluded.hanzi,
             pinyin = excluded.pinyin,
             english = excluded.english,
             pack_date = excluded.pack_date,
             index_in_pack = excluded.index_in_pack,
             audio_reference = excluded.audio_reference,
             learned = excluded.learned,
             favorite = excluded.favorite,
             batch_id = excluded.batch_id",
        params![
            record.id,
            record.hanzi,
            record.pinyin,
            record.english,
            format_date(record.pack_date),
            record.index_in_pack,
            record.audio_reference,
            record.learned,
            record.favorite,
            format_datetime(&record.created_at),
            record.batch_id,
        ],
    )
    .with_context(|| format!("failed to upsert sentence {}", record.id))?;
    Ok(())
}

impl Database {
    pub async fn get_pack(&self, date: NaiveDate, limit: usize) -> StoreResult<Vec<SentenceRecord>> {
        let (start, end) = day_bounds(date);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {SENTENCE_COLUMNS} FROM sentences
                 WHERE pack_date >= ?1 AND pack_date < ?2
                 ORDER BY created_at DESC, index_in_pack ASC
                 LIMIT ?3"
            );
            query_sentences(
                conn,
                &sql,
                params![format_date(start), format_date(end), limit],
            )
        })
        .await
    }

    pub async fn get_sentences_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<SentenceRecord>> {
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {SENTENCE_COLUMNS} FROM sentences
                 WHERE pack_date >= ?1 AND pack_date < ?2
                 ORDER BY created_at DESC, index_in_pack ASC"
            );
            query_sentences(conn, &sql, params![format_date(start), format_date(end)])
        })
        .await
    }

    pub async fn get_sentence(&self, id: &str) -> StoreResult<Option<SentenceRecord>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let sql = format!("SELECT {SENTENCE_COLUMNS} FROM sentences WHERE id = ?1");
            Ok(query_sentences(conn, &sql, params![id])?.into_iter().next())
        })
        .await
    }

    pub async fn get_favorites(&self) -> StoreResult<Vec<SentenceRecord>> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT {SENTENCE_COLUMNS} FROM sentences
                 WHERE favorite = 1
                 ORDER BY created_at DESC, index_in_pack ASC"
            );
            query_sentences(conn, &sql, params![])
        })
        .await
    }

    pub async fn count_sentences(&self) -> StoreResult<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM sentences", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }

    pub async fn upsert_sentence(&self, record: &SentenceRecord) -> StoreResult<()> {
        let record = record.clone();
        self.execute(move |conn| upsert_row(conn, &record)).await
    }

    pub async fn upsert_sentences(&self, records: &[SentenceRecord]) -> StoreResult<()> {
        let records = records.to_vec();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open sentence batch transaction")?;
            for record in &records {
                upsert_row(&tx, record)?;
            }
            tx.commit().context("failed to commit sentence batch")?;
            Ok(())
        })
        .await
    }

    /// Flips a boolean column in place. `column` is never user input.
    async fn flip_flag(&self, id: &str, column: &'static str) -> StoreResult<Option<bool>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let sql = format!(
                "UPDATE sentences SET {column} = 1 - {column} WHERE id = ?1 RETURNING {column}"
            );
            let value = conn
                .query_row(&sql, params![id], |row| row.get::<_, bool>(0))
                .optional()
                .with_context(|| format!("failed to toggle {column}"))?;
            Ok(value)
        })
        .await
    }

    pub async fn delete_sentence(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let removed = conn.execute("DELETE FROM sentences WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
    }

    pub async fn delete_sentences_created_before(
        &self,
        cutoff: DateTime<Utc>,
        keep_favorites: bool,
    ) -> StoreResult<usize> {
        self.execute(move |conn| {
            let removed = conn.execute(
                "DELETE FROM sentences
                 WHERE created_at < ?1 AND (?2 = 0 OR favorite = 0)",
                params![format_datetime(&cutoff), keep_favorites],
            )?;
            Ok(removed)
        })
        .await
    }
}

#[async_trait]
impl SentenceStore for Database {
    async fn fetch_pack(&self, date: NaiveDate) -> StoreResult<Vec<SentenceRecord>> {
        self.get_pack(date, PACK_SIZE).await
    }

    async fn fetch_all(&self, date: NaiveDate) -> StoreResult<Vec<SentenceRecord>> {
        let (start, end) = day_bounds(date);
        self.get_sentences_between(start, end).await
    }

    async fn fetch_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<SentenceRecord>> {
        self.get_sentences_between(start, end).await
    }

    async fn fetch(&self, id: &str) -> StoreResult<Option<SentenceRecord>> {
        self.get_sentence(id).await
    }

    async fn fetch_favorites(&self) -> StoreResult<Vec<SentenceRecord>> {
        self.get_favorites().await
    }

    async fn count_all(&self) -> StoreResult<u64> {
        self.count_sentences().await
    }

    async fn upsert(&self, record: &SentenceRecord) -> StoreResult<()> {
        self.upsert_sentence(record).await
    }

    async fn upsert_batch(&self, records: &[SentenceRecord]) -> StoreResult<()> {
        self.upsert_sentences(records).await
    }

    async fn toggle_learned(&self, id: &str) -> StoreResult<Option<bool>> {
        self.flip_flag(id, "learned").await
    }

    async fn toggle_favorite(&self, id: &str) -> StoreResult<Option<bool>> {
        self.flip_flag(id, "favorite").await
    }

    async fn delete(&self, record: &SentenceRecord) -> StoreResult<bool> {
        self.delete_sentence(&record.id).await
    }

    async fn prune_created_before(
        &self,
        cutoff: DateTime<Utc>,
        keep_favorites: bool,
    ) -> StoreResult<usize> {
        self.delete_sentences_created_before(cutoff, keep_favorites)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::{tempdir, TempDir};

    fn open() -> (TempDir, Database) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("sentences.sqlite3")).unwrap();
        (dir, db)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, minute, 0).unwrap()
    }

    fn batch(tag: &str, date: NaiveDate, created_at: DateTime<Utc>, size: i64) -> Vec<SentenceRecord> {
        (0..size)
            .map(|i| {
                SentenceRecord::new(
                    format!("{tag}-{i}"),
                    format!("句子{i}"),
                    format!("jù zi {i}"),
                    format!("sentence {i}"),
                    date,
                    i,
                    created_at,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn fetch_pack_caps_at_five_newest_first() {
        let (_dir, db) = open();
        db.upsert_batch(&batch("old", day(), at(0), 5)).await.unwrap();
        db.upsert_batch(&batch("new", day(), at(5), 3)).await.unwrap();

        let pack = db.fetch_pack(day()).await.unwrap();
        let ids: Vec<&str> = pack.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new-0", "new-1", "new-2", "old-0", "old-1"]);

        let all = db.fetch_all(day()).await.unwrap();
        assert_eq!(all.len(), 8);
    }

    #[tokio::test]
    async fn day_queries_exclude_neighbouring_days() {
        let (_dir, db) = open();
        let next = day() + Duration::days(1);
        db.upsert_batch(&batch("today", day(), at(0), 2)).await.unwrap();
        db.upsert_batch(&batch("tomorrow", next, at(1), 2)).await.unwrap();

        assert_eq!(db.fetch_all(day()).await.unwrap().len(), 2);
        assert_eq!(db.fetch_range(day(), next + Duration::days(1)).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_and_keeps_created_at() {
        let (_dir, db) = open();
        let original = batch("x", day(), at(0), 1).remove(0);
        db.upsert(&original).await.unwrap();

        let mut changed = original.clone();
        changed.english = "changed".into();
        changed.created_at = at(30);
        db.upsert(&changed).await.unwrap();

        let all = db.fetch_all(day()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].english, "changed");
        assert_eq!(all[0].created_at, original.created_at);
    }

    #[tokio::test]
    async fn toggles_are_involutions_and_ignore_unknown_ids() {
        let (_dir, db) = open();
        let record = batch("t", day(), at(0), 1).remove(0);
        db.upsert(&record).await.unwrap();

        assert_eq!(db.toggle_learned("t-0").await.unwrap(), Some(true));
        assert_eq!(db.toggle_learned("t-0").await.unwrap(), Some(false));
        assert_eq!(db.toggle_favorite("t-0").await.unwrap(), Some(true));
        assert_eq!(db.toggle_learned("missing").await.unwrap(), None);
        assert_eq!(db.toggle_favorite("missing").await.unwrap(), None);

        let stored = db.get_sentence("t-0").await.unwrap().unwrap();
        assert!(!stored.learned);
        assert!(stored.favorite);
        assert_eq!(db.fetch_favorites().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_is_a_noop_for_absent_records() {
        let (_dir, db) = open();
        let record = batch("d", day(), at(0), 1).remove(0);
        assert!(!db.delete(&record).await.unwrap());

        db.upsert(&record).await.unwrap();
        assert!(db.delete(&record).await.unwrap());
        assert_eq!(db.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_batch_leaves_store_untouched() {
        let (_dir, db) = open();
        db.execute(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON sentences
                 WHEN NEW.id = 'bad-2'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let err = db.upsert_batch(&batch("bad", day(), at(0), 4)).await;
        assert!(err.is_err());
        assert_eq!(db.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn prune_can_spare_favorites() {
        let (_dir, db) = open();
        db.upsert_batch(&batch("old", day(), at(0), 3)).await.unwrap();
        db.upsert_batch(&batch("new", day(), at(10), 2)).await.unwrap();
        db.toggle_favorite("old-1").await.unwrap();

        let removed = db.prune_created_before(at(5), true).await.unwrap();
        assert_eq!(removed, 2);

        let ids: Vec<String> = db
            .fetch_all(day())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["new-0", "new-1", "old-1"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_and_batches_lose_no_updates() {
        let (_dir, db) = open();
        db.upsert_batch(&batch("kept", day(), at(0), 3)).await.unwrap();

        let toggles: Vec<_> = (0..25)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { db.toggle_learned("kept-1").await.unwrap() })
            })
            .collect();
        let writes: Vec<_> = (0..4u32)
            .map(|n| {
                let db = db.clone();
                let records = batch(&format!("added{n}"), day(), at(n + 1), 5);
                tokio::spawn(async move { db.upsert_batch(&records).await.unwrap() })
            })
            .collect();

        let mut flips = Vec::new();
        for handle in toggles {
            flips.push(handle.await.unwrap());
        }
        for handle in writes {
            handle.await.unwrap();
        }

        assert!(flips.iter().all(Option::is_some));
        assert_eq!(flips.iter().filter(|f| **f == Some(true)).count(), 13);
        let stored = db.fetch_all(day()).await.unwrap();
        assert_eq!(stored.len(), 3 + 4 * 5);
        let toggled = stored.iter().find(|r| r.id == "kept-1").unwrap();
        assert!(toggled.learned);
    }
}
