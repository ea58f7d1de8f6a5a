pub mod schema;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::types::OrderSubmission;

/// Backend-agnostic lookup error. The engine never propagates these; a
/// failed lookup degrades the affected rule to "no matches".
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Identity predicate for history lookups. Set fields combine with OR:
/// an order matches if any of its identity fields equals the
/// corresponding filter field. An all-empty filter matches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter<'a> {
    pub mobile_number: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub device_fingerprint: Option<&'a str>,
}

impl<'a> OrderFilter<'a> {
    pub fn by_mobile(mobile: &'a str) -> Self {
        Self {
            mobile_number: Some(mobile),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mobile_number.is_none()
            && self.ip_address.is_none()
            && self.device_fingerprint.is_none()
    }
}

/// Read-only view of order history that the fraud rules query. The engine
/// itself never writes; recording orders and verdicts is the caller's job.
pub trait OrderStore {
    /// Count orders created at or after `since` matching the filter.
    fn count_orders(
        &self,
        filter: &OrderFilter<'_>,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Full address strings of all orders created at or after `since`.
    fn addresses_since(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    /// Distinct mobile numbers seen with the given device fingerprint at
    /// or after `since`.
    fn distinct_phones_for_device(
        &self,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

/// Thread-safe sqlite-backed order history.
#[derive(Clone)]
pub struct SqliteOrderStore {
    inner: Arc<Mutex<Connection>>,
}

impl SqliteOrderStore {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::migrate(&conn)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(conn)),
        })
    }

    /// Record a captured order. Called by the order-creation handler after
    /// the verdict is in, so later submissions see it as history.
    pub fn insert_order(
        &self,
        order: &OrderSubmission,
        created_at: DateTime<Utc>,
    ) -> Result<(), rusqlite::Error> {
        let conn = self.inner.lock().unwrap();
        conn.execute(
            "INSERT INTO orders (full_name, mobile_number, full_address, product_id, quantity, ip_address, device_fingerprint, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                order.full_name,
                order.mobile_number,
                order.full_address,
                order.product_id,
                order.quantity,
                order.ip_address,
                order.device_fingerprint,
                fmt_ts(created_at),
            ],
        )?;
        Ok(())
    }

    pub fn order_count(&self) -> Result<u64, rusqlite::Error> {
        let conn = self.inner.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM orders", [], |row| {
            row.get::<_, i64>(0).map(|c| c as u64)
        })
    }
}

impl OrderStore for SqliteOrderStore {
    fn count_orders(
        &self,
        filter: &OrderFilter<'_>,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        if filter.is_empty() {
            return Ok(0);
        }
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<String> = vec![fmt_ts(since)];
        if let Some(mobile) = filter.mobile_number {
            clauses.push(format!("mobile_number = ?{}", params.len() + 1));
            params.push(mobile.to_string());
        }
        if let Some(ip) = filter.ip_address {
            clauses.push(format!("ip_address = ?{}", params.len() + 1));
            params.push(ip.to_string());
        }
        if let Some(fp) = filter.device_fingerprint {
            clauses.push(format!("device_fingerprint = ?{}", params.len() + 1));
            params.push(fp.to_string());
        }
        let sql = format!(
            "SELECT COUNT(*) FROM orders WHERE created_at >= ?1 AND ({})",
            clauses.join(" OR ")
        );
        let conn = self.inner.lock().unwrap();
        let count: i64 = conn.query_row(
            &sql,
            rusqlite::params_from_iter(params.iter()),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn addresses_since(&self, since: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let conn = self.inner.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT full_address FROM orders WHERE created_at >= ?1")?;
        let rows = stmt.query_map(rusqlite::params![fmt_ts(since)], |row| row.get(0))?;
        let mut addresses = Vec::new();
        for address in rows {
            addresses.push(address?);
        }
        Ok(addresses)
    }

    fn distinct_phones_for_device(
        &self,
        fingerprint: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let conn = self.inner.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT mobile_number) FROM orders
             WHERE device_fingerprint = ?1 AND created_at >= ?2",
            rusqlite::params![fingerprint, fmt_ts(since)],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// sqlite stores timestamps as sortable text.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn open_test_db() -> SqliteOrderStore {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "ordersentry_test_{}_{}.db",
            std::process::id(),
            id
        ));
        // Remove if leftover from previous run
        let _ = std::fs::remove_file(&path);
        SqliteOrderStore::open(&path).unwrap()
    }

    fn make_order(mobile: &str, ip: Option<&str>, fp: Option<&str>) -> OrderSubmission {
        OrderSubmission {
            full_name: "রহিম উদ্দিন".to_string(),
            mobile_number: mobile.to_string(),
            full_address: "বাড়ি ১২, রোড ৫, ধানমন্ডি, ঢাকা".to_string(),
            product_id: "prod-1".to_string(),
            quantity: 1,
            ip_address: ip.map(str::to_string),
            user_agent: None,
            device_fingerprint: fp.map(str::to_string),
        }
    }

    #[test]
    fn count_by_mobile() {
        let db = open_test_db();
        let now = Utc::now();
        db.insert_order(&make_order("01712345678", None, None), now).unwrap();
        db.insert_order(&make_order("01712345678", None, None), now).unwrap();
        db.insert_order(&make_order("01898765432", None, None), now).unwrap();

        let count = db
            .count_orders(&OrderFilter::by_mobile("01712345678"), now - Duration::hours(1))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn count_or_semantics_across_identity_fields() {
        let db = open_test_db();
        let now = Utc::now();
        // Same phone, different IP
        db.insert_order(&make_order("01712345678", Some("1.2.3.4"), None), now).unwrap();
        // Same IP, different phone
        db.insert_order(&make_order("01898765432", Some("5.6.7.8"), None), now).unwrap();
        // Neither
        db.insert_order(&make_order("01512223344", Some("9.9.9.9"), None), now).unwrap();

        let filter = OrderFilter {
            mobile_number: Some("01712345678"),
            ip_address: Some("5.6.7.8"),
            device_fingerprint: None,
        };
        let count = db.count_orders(&filter, now - Duration::hours(1)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn count_empty_filter_matches_nothing() {
        let db = open_test_db();
        let now = Utc::now();
        db.insert_order(&make_order("01712345678", None, None), now).unwrap();
        let count = db
            .count_orders(&OrderFilter::default(), now - Duration::hours(1))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn count_respects_window() {
        let db = open_test_db();
        let now = Utc::now();
        db.insert_order(&make_order("01712345678", None, None), now - Duration::hours(3)).unwrap();
        db.insert_order(&make_order("01712345678", None, None), now - Duration::minutes(10)).unwrap();

        let count = db
            .count_orders(&OrderFilter::by_mobile("01712345678"), now - Duration::hours(1))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn addresses_within_window() {
        let db = open_test_db();
        let now = Utc::now();
        let mut old = make_order("01712345678", None, None);
        old.full_address = "পুরাতন ঠিকানা".to_string();
        db.insert_order(&old, now - Duration::hours(5)).unwrap();
        db.insert_order(&make_order("01898765432", None, None), now).unwrap();

        let addresses = db.addresses_since(now - Duration::hours(1)).unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0], "বাড়ি ১২, রোড ৫, ধানমন্ডি, ঢাকা");
    }

    #[test]
    fn distinct_phones_per_device() {
        let db = open_test_db();
        let now = Utc::now();
        for mobile in ["01712345678", "01712345678", "01898765432", "01512223344"] {
            db.insert_order(&make_order(mobile, None, Some("fp-abc")), now).unwrap();
        }
        db.insert_order(&make_order("01619998877", None, Some("fp-other")), now).unwrap();

        let distinct = db
            .distinct_phones_for_device("fp-abc", now - Duration::hours(24))
            .unwrap();
        assert_eq!(distinct, 3);
    }

    #[test]
    fn order_count_empty() {
        let db = open_test_db();
        assert_eq!(db.order_count().unwrap(), 0);
    }
}
