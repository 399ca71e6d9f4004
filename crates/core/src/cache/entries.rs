//! Store and entry operations on the SQLite backend.
//!
//! A store is a row in `stores`; its entries cascade away when the store row is
//! deleted, which is what makes version rollover a single statement.

use super::connection::CacheDb;
use crate::Error;
use crate::http::{CacheRequest, HttpResponse};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

struct EntryRow {
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn into_response(self) -> Result<HttpResponse, Error> {
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        Ok(HttpResponse { status: self.status, headers, body: self.body })
    }
}

impl CacheDb {
    /// Create a store if it does not exist yet.
    pub async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of all stores, oldest first.
    pub async fn list_stores(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop a store and every entry in it.
    ///
    /// Returns false if the store did not exist.
    pub async fn drop_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the entry for `request` in `store`.
    ///
    /// Opens the store implicitly. Last write wins.
    pub async fn upsert_entry(&self, store: &str, request: &CacheRequest, response: &HttpResponse) -> Result<(), Error> {
        let store = store.to_string();
        let key_hash = request.key();
        let method = request.method.clone();
        let url = request.url.clone();
        let status = response.status;
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![&store, &now],
                )?;
                conn.execute(
                    "INSERT INTO entries (store, key_hash, method, url, status, headers_json, body, written_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(store, key_hash) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        written_at = excluded.written_at",
                    params![store, key_hash, method, url, status, headers_json, body, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the stored response for `request`.
    ///
    /// Returns None if the store or the entry doesn't exist.
    pub async fn get_entry(&self, store: &str, request: &CacheRequest) -> Result<Option<HttpResponse>, Error> {
        let store = store.to_string();
        let key_hash = request.key();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt =
                    conn.prepare("SELECT status, headers_json, body FROM entries WHERE store = ?1 AND key_hash = ?2")?;

                let result = stmt.query_row(params![store, key_hash], |row| {
                    Ok(EntryRow { status: row.get(0)?, headers_json: row.get(1)?, body: row.get(2)? })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_response).transpose()
    }

    /// Requests stored in `store`, in write order.
    pub async fn entry_keys(&self, store: &str) -> Result<Vec<CacheRequest>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheRequest>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url FROM entries WHERE store = ?1 ORDER BY written_at ASC, rowid ASC",
                )?;
                let keys = stmt
                    .query_map(params![store], |row| {
                        Ok(CacheRequest { method: row.get(0)?, url: row.get(1)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it was not present.
    pub async fn delete_entry(&self, store: &str, request: &CacheRequest) -> Result<bool, Error> {
        let store = store.to_string();
        let key_hash = request.key();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE store = ?1 AND key_hash = ?2", params![store, key_hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in `store`.
    pub async fn entry_count(&self, store: &str) -> Result<usize, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}
