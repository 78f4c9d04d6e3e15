use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};

use super::analytics::{
    AffiliateClick, AffiliateStats, DailyCount, PageView, PageViewStats, ReportWindows,
    AFFILIATE_PAGES_LIMIT, TOP_PAGES_LIMIT,
};
use super::domain::{
    generate_unsubscribe_token, non_empty, normalize_email, parse_db_timestamp, to_db_timestamp,
    DripStats, DueLead, LabelCount, Lead, LeadCapture, LeadId, LeadPage, LeadQuery, LeadStats,
    UpsertOutcome, DEFAULT_SOURCE, UNSUBSCRIBE_TOKEN_LEN,
};
use super::export::leads_to_csv;
use super::store::{AnalyticsStore, LeadStore, StoreError};
use crate::drip::DelaySchedule;

const SCHEMA_VERSION: i64 = 2;

const LEAD_COLUMNS: &str = "id, email, name, income_range, source, subscribed, \
     unsubscribe_token, last_email_sent, created_at, updated_at";

/// SQLite-backed store for leads, drip progress, and site analytics.
///
/// One connection guarded by a mutex; every call runs to completion before the
/// next begins.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }
}

pub(crate) fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    debug_assert!(version >= SCHEMA_VERSION);
    Ok(())
}

fn apply_migration_1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            income_range TEXT,
            source TEXT NOT NULL DEFAULT 'calculator',
            subscribed INTEGER NOT NULL DEFAULT 1,
            unsubscribe_token TEXT NOT NULL UNIQUE,
            last_email_sent INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_leads_created ON leads(created_at);

        CREATE TABLE IF NOT EXISTS drip_sends (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lead_id INTEGER NOT NULL REFERENCES leads(id) ON DELETE CASCADE,
            step INTEGER NOT NULL,
            sent_at TEXT NOT NULL,
            UNIQUE(lead_id, step)
        );
        CREATE INDEX IF NOT EXISTS idx_drip_sends_lead ON drip_sends(lead_id);
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS page_views (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL,
            referrer TEXT,
            user_agent TEXT,
            ip TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_page_views_path ON page_views(path);
        CREATE INDEX IF NOT EXISTS idx_page_views_created ON page_views(created_at);

        CREATE TABLE IF NOT EXISTS affiliate_clicks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            affiliate TEXT NOT NULL,
            page TEXT,
            ip TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_affiliate_clicks_affiliate ON affiliate_clicks(affiliate);
        CREATE INDEX IF NOT EXISTS idx_affiliate_clicks_created ON affiliate_clicks(created_at);
        ",
    )
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_db_timestamp(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn optional_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    let value: Option<String> = row.get(idx)?;
    Ok(value.filter(|text| !text.is_empty()))
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: LeadId(row.get(0)?),
        email: row.get(1)?,
        name: optional_text(row, 2)?,
        income_range: optional_text(row, 3)?,
        source: row.get(4)?,
        subscribed: row.get(5)?,
        unsubscribe_token: row.get(6)?,
        last_email_sent: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}

fn label_count_from_row(row: &Row<'_>) -> rusqlite::Result<LabelCount> {
    Ok(LabelCount {
        label: row.get(0)?,
        count: to_count(row.get(1)?),
    })
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn count(conn: &Connection, sql: &str, since: Option<&str>) -> rusqlite::Result<u64> {
    let value: i64 = match since {
        Some(since) => conn.query_row(sql, params![since], |row| row.get(0))?,
        None => conn.query_row(sql, [], |row| row.get(0))?,
    };
    Ok(to_count(value))
}

fn label_counts(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<LabelCount>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, label_count_from_row)?;
    rows.collect()
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl LeadStore for SqliteStore {
    fn upsert_lead(
        &self,
        capture: &LeadCapture,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let email = normalize_email(&capture.email)?;
        let name = non_empty(&capture.name);
        let income_range = non_empty(&capture.income_range);
        let source = non_empty(&capture.source);
        let stamp = to_db_timestamp(now);

        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM leads WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE leads SET
                        name = COALESCE(?1, name),
                        income_range = COALESCE(?2, income_range),
                        source = COALESCE(?3, source),
                        updated_at = ?4
                     WHERE id = ?5",
                    params![name, income_range, source, stamp, id],
                )?;
                UpsertOutcome {
                    id: LeadId(id),
                    is_new: false,
                }
            }
            None => {
                tx.execute(
                    "INSERT INTO leads
                        (email, name, income_range, source, subscribed, unsubscribe_token,
                         last_email_sent, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, 1, ?5, 0, ?6, ?6)",
                    params![
                        email,
                        name,
                        income_range,
                        source.unwrap_or(DEFAULT_SOURCE),
                        generate_unsubscribe_token(),
                        stamp
                    ],
                )?;
                UpsertOutcome {
                    id: LeadId(tx.last_insert_rowid()),
                    is_new: true,
                }
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    fn find_due_leads(
        &self,
        schedule: &DelaySchedule,
        batch_limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<DueLead>, StoreError> {
        if batch_limit == 0 {
            return Ok(Vec::new());
        }

        // One (previous_step, cutoff) pair per step: a lead sitting at
        // `previous_step` is due once it signed up at or before `cutoff`.
        let mut values = Vec::new();
        for (step, days) in schedule.steps() {
            values.push(Value::Integer(i64::from(step) - 1));
            values.push(Value::Text(to_db_timestamp(
                now - Duration::days(i64::from(days)),
            )));
        }
        values.push(Value::Integer(i64::try_from(batch_limit).unwrap_or(i64::MAX)));

        let pairs = vec!["(?, ?)"; schedule.len()].join(", ");
        let sql = format!(
            "WITH schedule(previous_step, cutoff) AS (VALUES {pairs})
             SELECT l.id, l.email, l.name, l.unsubscribe_token, l.last_email_sent, l.created_at
             FROM leads l
             JOIN schedule s ON s.previous_step = l.last_email_sent
             WHERE l.subscribed = 1 AND l.created_at <= s.cutoff
             ORDER BY l.created_at ASC, l.id ASC
             LIMIT ?"
        );

        let conn = self.connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            let last_sent: u8 = row.get(4)?;
            Ok(DueLead {
                id: LeadId(row.get(0)?),
                email: row.get(1)?,
                name: optional_text(row, 2)?,
                unsubscribe_token: row.get(3)?,
                next_step: last_sent + 1,
                signed_up_at: timestamp_column(row, 5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn record_drip_send(
        &self,
        lead_id: LeadId,
        step: u8,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        if step == 0 {
            return Err(StoreError::InvalidStep(step));
        }
        let stamp = to_db_timestamp(now);

        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated = tx.execute(
            "UPDATE leads SET last_email_sent = MAX(last_email_sent, ?1), updated_at = ?2
             WHERE id = ?3",
            params![step, stamp, lead_id.0],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO drip_sends (lead_id, step, sent_at) VALUES (?1, ?2, ?3)",
            params![lead_id.0, step, stamp],
        )?;
        tx.commit()?;
        Ok(inserted == 1)
    }

    fn unsubscribe(&self, token: &str, now: DateTime<Utc>) -> Result<String, StoreError> {
        if token.len() != UNSUBSCRIBE_TOKEN_LEN {
            return Err(StoreError::InvalidToken);
        }
        let conn = self.connection()?;
        let (id, email, subscribed): (i64, String, bool) = conn
            .query_row(
                "SELECT id, email, subscribed FROM leads WHERE unsubscribe_token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .ok_or(StoreError::NotFound)?;

        if subscribed {
            conn.execute(
                "UPDATE leads SET subscribed = 0, updated_at = ?1 WHERE id = ?2",
                params![to_db_timestamp(now), id],
            )?;
        }
        Ok(email)
    }

    fn fetch_lead(&self, id: LeadId) -> Result<Option<Lead>, StoreError> {
        let conn = self.connection()?;
        let lead = conn
            .query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                params![id.0],
                lead_from_row,
            )
            .optional()?;
        Ok(lead)
    }

    fn list_leads(&self, query: &LeadQuery) -> Result<LeadPage, StoreError> {
        let query = query.normalized();
        let pattern = query.search.as_deref().map(like_pattern);
        let filter = "(?1 IS NULL OR email LIKE ?1 ESCAPE '\\' OR name LIKE ?1 ESCAPE '\\')";

        let conn = self.connection()?;
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM leads WHERE {filter}"),
            params![pattern],
            |row| row.get(0),
        )?;
        let total = to_count(total);

        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE {filter}
             ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let leads = stmt
            .query_map(
                params![pattern, query.limit, query.offset()],
                lead_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(LeadPage {
            leads,
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total.div_ceil(u64::from(query.limit)),
        })
    }

    fn recent_leads(&self, limit: u32) -> Result<Vec<Lead>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))?;
        let leads = stmt
            .query_map(params![limit], lead_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(leads)
    }

    fn lead_stats(&self, now: DateTime<Utc>) -> Result<LeadStats, StoreError> {
        let windows = ReportWindows::at(now);
        let since = "SELECT COUNT(*) FROM leads WHERE created_at >= ?1";

        let conn = self.connection()?;
        let total = count(&conn, "SELECT COUNT(*) FROM leads", None)?;
        let subscribed = count(&conn, "SELECT COUNT(*) FROM leads WHERE subscribed = 1", None)?;
        let by_source = label_counts(
            &conn,
            "SELECT source, COUNT(*) AS c FROM leads GROUP BY source ORDER BY c DESC, source ASC",
            [],
        )?;
        let by_income = label_counts(
            &conn,
            "SELECT income_range, COUNT(*) AS c FROM leads
             WHERE income_range IS NOT NULL AND income_range != ''
             GROUP BY income_range ORDER BY c DESC, income_range ASC",
            [],
        )?;

        Ok(LeadStats {
            total,
            subscribed,
            unsubscribed: total.saturating_sub(subscribed),
            today: count(&conn, since, Some(to_db_timestamp(windows.today).as_str()))?,
            this_week: count(&conn, since, Some(to_db_timestamp(windows.week).as_str()))?,
            this_month: count(&conn, since, Some(to_db_timestamp(windows.month).as_str()))?,
            by_source,
            by_income,
        })
    }

    fn toggle_subscription(&self, id: LeadId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let subscribed: bool = tx
            .query_row(
                "SELECT subscribed FROM leads WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound)?;
        let toggled = !subscribed;
        tx.execute(
            "UPDATE leads SET subscribed = ?1, updated_at = ?2 WHERE id = ?3",
            params![toggled, to_db_timestamp(now), id.0],
        )?;
        tx.commit()?;
        Ok(toggled)
    }

    fn delete_lead(&self, id: LeadId) -> Result<(), StoreError> {
        let conn = self.connection()?;
        match conn.execute("DELETE FROM leads WHERE id = ?1", params![id.0])? {
            0 => Err(StoreError::NotFound),
            _ => Ok(()),
        }
    }

    fn export_csv(&self) -> Result<String, StoreError> {
        let leads = {
            let conn = self.connection()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEAD_COLUMNS} FROM leads ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map([], lead_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(leads_to_csv(&leads)?)
    }

    fn drip_stats(&self, final_step: u8) -> Result<DripStats, StoreError> {
        let conn = self.connection()?;
        let sent_at_step = |step: u8| -> rusqlite::Result<u64> {
            conn.query_row(
                "SELECT COUNT(*) FROM drip_sends WHERE step = ?1",
                params![step],
                |row| row.get::<_, i64>(0),
            )
            .map(to_count)
        };
        let pending: i64 = conn.query_row(
            "SELECT COUNT(*) FROM leads WHERE subscribed = 1 AND last_email_sent < ?1",
            params![final_step],
            |row| row.get(0),
        )?;

        Ok(DripStats {
            total_sent: count(&conn, "SELECT COUNT(*) FROM drip_sends", None)?,
            step1_sent: sent_at_step(1)?,
            step8_sent: sent_at_step(final_step)?,
            pending: to_count(pending),
        })
    }
}

impl AnalyticsStore for SqliteStore {
    fn track_page_view(&self, view: &PageView, now: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO page_views (path, referrer, user_agent, ip, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                view.path,
                non_empty(&view.referrer),
                non_empty(&view.user_agent),
                non_empty(&view.ip_address),
                to_db_timestamp(now)
            ],
        )?;
        Ok(())
    }

    fn track_affiliate_click(
        &self,
        click: &AffiliateClick,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO affiliate_clicks (affiliate, page, ip, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                click.affiliate,
                non_empty(&click.page),
                non_empty(&click.ip_address),
                to_db_timestamp(now)
            ],
        )?;
        Ok(())
    }

    fn page_view_stats(&self, now: DateTime<Utc>) -> Result<PageViewStats, StoreError> {
        let windows = ReportWindows::at(now);
        let since = "SELECT COUNT(*) FROM page_views WHERE created_at >= ?1";
        let month = to_db_timestamp(windows.month);

        let conn = self.connection()?;
        let top_pages = label_counts(
            &conn,
            "SELECT path, COUNT(*) AS c FROM page_views WHERE created_at >= ?1
             GROUP BY path ORDER BY c DESC, path ASC LIMIT ?2",
            params![month, TOP_PAGES_LIMIT],
        )?;

        let mut stmt = conn.prepare(
            "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM page_views
             WHERE created_at >= ?1 GROUP BY day ORDER BY day ASC",
        )?;
        let daily = stmt
            .query_map(params![to_db_timestamp(windows.daily)], |row| {
                Ok(DailyCount {
                    date: row.get(0)?,
                    count: to_count(row.get(1)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(PageViewStats {
            total: count(&conn, "SELECT COUNT(*) FROM page_views", None)?,
            today: count(&conn, since, Some(to_db_timestamp(windows.today).as_str()))?,
            this_week: count(&conn, since, Some(to_db_timestamp(windows.week).as_str()))?,
            this_month: count(&conn, since, Some(month.as_str()))?,
            top_pages,
            daily,
        })
    }

    fn affiliate_stats(&self, now: DateTime<Utc>) -> Result<AffiliateStats, StoreError> {
        let windows = ReportWindows::at(now);
        let since = "SELECT COUNT(*) FROM affiliate_clicks WHERE created_at >= ?1";

        let conn = self.connection()?;
        Ok(AffiliateStats {
            total: count(&conn, "SELECT COUNT(*) FROM affiliate_clicks", None)?,
            today: count(&conn, since, Some(to_db_timestamp(windows.today).as_str()))?,
            this_week: count(&conn, since, Some(to_db_timestamp(windows.week).as_str()))?,
            by_affiliate: label_counts(
                &conn,
                "SELECT affiliate, COUNT(*) AS c FROM affiliate_clicks
                 GROUP BY affiliate ORDER BY c DESC, affiliate ASC",
                [],
            )?,
            by_page: label_counts(
                &conn,
                "SELECT page, COUNT(*) AS c FROM affiliate_clicks
                 WHERE page IS NOT NULL AND page != ''
                 GROUP BY page ORDER BY c DESC, page ASC LIMIT ?1",
                params![AFFILIATE_PAGES_LIMIT],
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("store opens")
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn capture(email: &str) -> LeadCapture {
        LeadCapture {
            email: email.to_string(),
            ..LeadCapture::default()
        }
    }

    fn token_of(store: &SqliteStore, id: LeadId) -> String {
        store
            .fetch_lead(id)
            .expect("fetch")
            .expect("lead exists")
            .unsubscribe_token
    }

    #[test]
    fn migrations_set_user_version() {
        let store = store();
        let conn = store.connection().expect("connection");
        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("pragma");
        assert_eq!(version, SCHEMA_VERSION);
        initialize_schema(&conn).expect("re-running migrations is a no-op");
    }

    #[test]
    fn upsert_inserts_with_defaults() {
        let store = store();
        let outcome = store
            .upsert_lead(&capture("  Jane@Example.COM"), at(1, 9))
            .expect("insert");
        assert!(outcome.is_new);

        let lead = store.fetch_lead(outcome.id).expect("fetch").expect("exists");
        assert_eq!(lead.email, "jane@example.com");
        assert_eq!(lead.source, "calculator");
        assert!(lead.subscribed);
        assert_eq!(lead.last_email_sent, 0);
        assert_eq!(lead.unsubscribe_token.len(), 64);
        assert_eq!(lead.name, None);
        assert_eq!(lead.created_at, at(1, 9));
    }

    #[test]
    fn upsert_merges_only_non_empty_fields() {
        let store = store();
        let first = store
            .upsert_lead(
                &LeadCapture {
                    email: "jane@example.com".to_string(),
                    name: "Jane".to_string(),
                    income_range: "50-75k".to_string(),
                    source: "budget".to_string(),
                },
                at(1, 9),
            )
            .expect("insert");
        let token = token_of(&store, first.id);

        let second = store
            .upsert_lead(
                &LeadCapture {
                    email: "JANE@example.com".to_string(),
                    name: String::new(),
                    income_range: "75-100k".to_string(),
                    source: String::new(),
                },
                at(2, 9),
            )
            .expect("update");
        assert_eq!(second.id, first.id);
        assert!(!second.is_new);

        let lead = store.fetch_lead(first.id).expect("fetch").expect("exists");
        assert_eq!(lead.name.as_deref(), Some("Jane"));
        assert_eq!(lead.income_range.as_deref(), Some("75-100k"));
        assert_eq!(lead.source, "budget");
        assert_eq!(lead.unsubscribe_token, token);
        assert_eq!(lead.created_at, at(1, 9));
        assert_eq!(lead.updated_at, at(2, 9));
    }

    #[test]
    fn upsert_rejects_invalid_email() {
        assert!(matches!(
            store().upsert_lead(&capture("jane.example.com"), at(1, 9)),
            Err(StoreError::InvalidEmail)
        ));
    }

    #[test]
    fn due_leads_follow_schedule_and_signup_order() {
        let store = store();
        let schedule = DelaySchedule::standard();
        let older = store.upsert_lead(&capture("old@example.com"), at(1, 9)).expect("lead");
        let newer = store.upsert_lead(&capture("new@example.com"), at(2, 9)).expect("lead");

        let due = store.find_due_leads(&schedule, 50, at(2, 9)).expect("scan");
        let ids: Vec<LeadId> = due.iter().map(|lead| lead.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);
        assert!(due.iter().all(|lead| lead.next_step == 1));

        let limited = store.find_due_leads(&schedule, 1, at(2, 9)).expect("scan");
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, older.id);

        store.record_drip_send(older.id, 1, at(2, 9)).expect("record");
        store.record_drip_send(newer.id, 1, at(2, 9)).expect("record");
        assert!(store.find_due_leads(&schedule, 50, at(3, 9)).expect("scan").is_empty());

        // Step 2 is due three days after signup.
        let due = store.find_due_leads(&schedule, 50, at(4, 9)).expect("scan");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, older.id);
        assert_eq!(due[0].next_step, 2);
    }

    #[test]
    fn record_drip_send_is_idempotent_and_monotonic() {
        let store = store();
        let lead = store.upsert_lead(&capture("jane@example.com"), at(1, 9)).expect("lead");

        assert!(store.record_drip_send(lead.id, 1, at(1, 9)).expect("first"));
        assert!(!store.record_drip_send(lead.id, 1, at(1, 10)).expect("repeat"));
        assert!(store.record_drip_send(lead.id, 3, at(8, 9)).expect("jump"));
        assert!(store.record_drip_send(lead.id, 2, at(8, 10)).expect("late"));

        let stored = store.fetch_lead(lead.id).expect("fetch").expect("exists");
        assert_eq!(stored.last_email_sent, 3);
        assert_eq!(store.drip_stats(8).expect("stats").total_sent, 3);

        assert!(matches!(
            store.record_drip_send(LeadId(999), 1, at(1, 9)),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.record_drip_send(lead.id, 0, at(1, 9)),
            Err(StoreError::InvalidStep(0))
        ));
    }

    #[test]
    fn finished_and_unsubscribed_leads_are_never_due() {
        let store = store();
        let schedule = DelaySchedule::standard();
        let done = store.upsert_lead(&capture("done@example.com"), at(1, 9)).expect("lead");
        let gone = store.upsert_lead(&capture("gone@example.com"), at(1, 9)).expect("lead");

        store.record_drip_send(done.id, 8, at(1, 9)).expect("record");
        store
            .unsubscribe(&token_of(&store, gone.id), at(1, 10))
            .expect("unsubscribe");

        let far_future = at(1, 9) + Duration::days(400);
        assert!(store.find_due_leads(&schedule, 50, far_future).expect("scan").is_empty());

        let stats = store.drip_stats(schedule.final_step()).expect("stats");
        assert_eq!(stats.step8_sent, 1);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn unsubscribe_validates_token_and_is_repeatable() {
        let store = store();
        let lead = store.upsert_lead(&capture("jane@example.com"), at(1, 9)).expect("lead");
        let token = token_of(&store, lead.id);

        assert!(matches!(
            store.unsubscribe("abc", at(1, 9)),
            Err(StoreError::InvalidToken)
        ));
        assert!(matches!(
            store.unsubscribe(&"0".repeat(64), at(1, 9)),
            Err(StoreError::NotFound)
        ));

        assert_eq!(store.unsubscribe(&token, at(1, 10)).expect("first"), "jane@example.com");
        assert_eq!(store.unsubscribe(&token, at(1, 11)).expect("again"), "jane@example.com");
        let stored = store.fetch_lead(lead.id).expect("fetch").expect("exists");
        assert!(!stored.subscribed);
        assert_eq!(stored.updated_at, at(1, 10));
    }

    #[test]
    fn lists_leads_newest_first_with_search_and_paging() {
        let store = store();
        for (idx, email) in ["a@example.com", "b@example.com", "c@sample.org"]
            .into_iter()
            .enumerate()
        {
            store
                .upsert_lead(&capture(email), at(1 + idx as u32, 9))
                .expect("lead");
        }

        let page = store
            .list_leads(&LeadQuery {
                page: 1,
                limit: 2,
                search: None,
            })
            .expect("list");
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        let emails: Vec<&str> = page.leads.iter().map(|lead| lead.email.as_str()).collect();
        assert_eq!(emails, vec!["c@sample.org", "b@example.com"]);

        let second = store
            .list_leads(&LeadQuery {
                page: 2,
                limit: 2,
                search: None,
            })
            .expect("list");
        assert_eq!(second.leads.len(), 1);

        let searched = store
            .list_leads(&LeadQuery {
                search: Some("example".to_string()),
                ..LeadQuery::default()
            })
            .expect("list");
        assert_eq!(searched.total, 2);

        let literal = store
            .list_leads(&LeadQuery {
                search: Some("%".to_string()),
                ..LeadQuery::default()
            })
            .expect("list");
        assert_eq!(literal.total, 0);

        let recent = store.recent_leads(1).expect("recent");
        assert_eq!(recent[0].email, "c@sample.org");
    }

    #[test]
    fn lead_stats_group_by_window_source_and_income() {
        let store = store();
        let now = at(20, 12);
        store
            .upsert_lead(
                &LeadCapture {
                    email: "a@example.com".to_string(),
                    income_range: "50-75k".to_string(),
                    source: "budget".to_string(),
                    ..LeadCapture::default()
                },
                at(20, 8),
            )
            .expect("lead");
        store.upsert_lead(&capture("b@example.com"), at(15, 8)).expect("lead");
        let old = store.upsert_lead(&capture("c@example.com"), at(1, 8)).expect("lead");
        store.toggle_subscription(old.id, now).expect("toggle");

        let stats = store.lead_stats(now).expect("stats");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.subscribed, 2);
        assert_eq!(stats.unsubscribed, 1);
        assert_eq!(stats.today, 1);
        assert_eq!(stats.this_week, 2);
        assert_eq!(stats.this_month, 3);
        assert_eq!(
            stats.by_source,
            vec![
                LabelCount {
                    label: "calculator".to_string(),
                    count: 2
                },
                LabelCount {
                    label: "budget".to_string(),
                    count: 1
                },
            ]
        );
        assert_eq!(stats.by_income.len(), 1);
    }

    #[test]
    fn toggle_and_delete_report_missing_leads() {
        let store = store();
        let lead = store.upsert_lead(&capture("jane@example.com"), at(1, 9)).expect("lead");
        store.record_drip_send(lead.id, 1, at(1, 9)).expect("record");

        assert!(!store.toggle_subscription(lead.id, at(1, 10)).expect("off"));
        assert!(store.toggle_subscription(lead.id, at(1, 11)).expect("on"));

        store.delete_lead(lead.id).expect("delete");
        assert!(store.fetch_lead(lead.id).expect("fetch").is_none());
        assert_eq!(store.drip_stats(8).expect("stats").total_sent, 0);
        assert!(matches!(store.delete_lead(lead.id), Err(StoreError::NotFound)));
        assert!(matches!(
            store.toggle_subscription(lead.id, at(1, 12)),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn analytics_counts_windows_and_top_pages() {
        let store = store();
        let now = at(20, 12);
        let view = |path: &str| PageView {
            path: path.to_string(),
            ..PageView::default()
        };
        store.track_page_view(&view("/calculator"), at(20, 9)).expect("view");
        store.track_page_view(&view("/calculator"), at(19, 9)).expect("view");
        store.track_page_view(&view("/taxes"), at(10, 9)).expect("view");
        store
            .track_page_view(&view("/old"), at(20, 9) - Duration::days(60))
            .expect("view");

        let stats = store.page_view_stats(now).expect("stats");
        assert_eq!(stats.total, 4);
        assert_eq!(stats.today, 1);
        assert_eq!(stats.this_week, 2);
        assert_eq!(stats.this_month, 3);
        assert_eq!(stats.top_pages[0].label, "/calculator");
        assert_eq!(stats.top_pages[0].count, 2);
        assert_eq!(
            stats.daily.iter().map(|day| day.date.as_str()).collect::<Vec<_>>(),
            vec!["2024-03-10", "2024-03-19", "2024-03-20"]
        );

        let click = |affiliate: &str, page: &str| AffiliateClick {
            affiliate: affiliate.to_string(),
            page: page.to_string(),
            ..AffiliateClick::default()
        };
        store.track_affiliate_click(&click("acme", "/auto"), at(20, 9)).expect("click");
        store.track_affiliate_click(&click("acme", ""), at(18, 9)).expect("click");
        store.track_affiliate_click(&click("zenith", "/auto"), at(2, 9)).expect("click");

        let clicks = store.affiliate_stats(now).expect("stats");
        assert_eq!(clicks.total, 3);
        assert_eq!(clicks.today, 1);
        assert_eq!(clicks.this_week, 2);
        assert_eq!(clicks.by_affiliate[0].label, "acme");
        assert_eq!(clicks.by_affiliate[0].count, 2);
        assert_eq!(clicks.by_page.len(), 1);
        assert_eq!(clicks.by_page[0].count, 2);
    }

    #[test]
    fn file_backed_store_persists_between_opens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("leads.db");
        {
            let store = SqliteStore::open(&path).expect("open");
            store.upsert_lead(&capture("jane@example.com"), at(1, 9)).expect("lead");
        }
        let reopened = SqliteStore::open(&path).expect("reopen");
        let csv = reopened.export_csv().expect("csv");
        assert!(csv.contains("jane@example.com,,,calculator,yes,2024-03-01 09:00:00"));
    }
}
