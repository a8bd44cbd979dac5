//! Redis script store: registration, digest cache, atomic execution.
//!
//! Scripts are process-lifetime singletons keyed by a stable name. The
//! store keeps each script's source next to its digest so it can
//! rehydrate the store's script cache after an eviction (`SCRIPT
//! FLUSH`, failover to a cold replica) without a restart: on a
//! `NOSCRIPT` reply the source is reloaded once and the call retried
//! exactly once.

use crate::error::StoreError;
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::Value;
use std::collections::HashMap;

struct ScriptEntry {
    source: &'static str,
    digest: String,
}

/// Connection to the shared Redis store plus the script digest cache.
///
/// Safe for concurrent callers: the multiplexed connection manager is
/// cloned per call, and the digest cache is read-mostly with the write
/// lock held only while a reloaded digest is swapped in.
pub struct ScriptStore {
    conn: ConnectionManager,
    scripts: RwLock<HashMap<&'static str, ScriptEntry>>,
}

impl ScriptStore {
    /// Open a connection to the store at `url`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            scripts: RwLock::new(HashMap::new()),
        })
    }

    /// Register a script under `name`, caching its source and digest.
    ///
    /// Compilation errors from the store surface here, before any
    /// decision traffic runs.
    pub async fn load_script(
        &self,
        name: &'static str,
        source: &'static str,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let digest: String = redis::cmd("SCRIPT")
            .arg("LOAD")
            .arg(source)
            .query_async(&mut conn)
            .await?;
        tracing::debug!(script = name, digest = %digest, "Script registered");
        self.scripts
            .write()
            .insert(name, ScriptEntry { source, digest });
        Ok(())
    }

    /// Execute the named script indivisibly at the store.
    ///
    /// Invoked by digest so the source is not resent per decision. If
    /// the store no longer knows the digest, the cached source is
    /// loaded again and the call retried once; a second failure is
    /// surfaced to the caller.
    pub async fn eval(
        &self,
        name: &str,
        script_keys: &[&str],
        args: &[i64],
    ) -> Result<Value, StoreError> {
        let digest = {
            let scripts = self.scripts.read();
            scripts
                .get(name)
                .map(|e| e.digest.clone())
                .ok_or_else(|| StoreError::UnknownScript(name.to_string()))?
        };

        let mut conn = self.conn.clone();
        match eval_sha(&mut conn, &digest, script_keys, args).await {
            Err(err) if err.kind() == redis::ErrorKind::NoScriptError => {
                let source = {
                    let scripts = self.scripts.read();
                    scripts
                        .get(name)
                        .map(|e| e.source)
                        .ok_or_else(|| StoreError::UnknownScript(name.to_string()))?
                };
                let digest: String = redis::cmd("SCRIPT")
                    .arg("LOAD")
                    .arg(source)
                    .query_async(&mut conn)
                    .await?;
                {
                    let mut scripts = self.scripts.write();
                    if let Some(entry) = scripts.get_mut(name) {
                        entry.digest = digest.clone();
                    }
                }
                tracing::warn!(script = name, "Store script cache was cold; reloaded");
                Ok(eval_sha(&mut conn, &digest, script_keys, args).await?)
            }
            other => Ok(other?),
        }
    }

    /// Round-trip liveness check against the store.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

async fn eval_sha(
    conn: &mut ConnectionManager,
    digest: &str,
    script_keys: &[&str],
    args: &[i64],
) -> redis::RedisResult<Value> {
    let mut cmd = redis::cmd("EVALSHA");
    cmd.arg(digest).arg(script_keys.len());
    for key in script_keys {
        cmd.arg(*key);
    }
    for arg in args {
        cmd.arg(*arg);
    }
    cmd.query_async(&mut *conn).await
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_noscript_error_kind_is_distinguishable() {
        let err = redis::RedisError::from((
            redis::ErrorKind::NoScriptError,
            "NOSCRIPT",
            "No matching script".to_string(),
        ));
        assert_eq!(err.kind(), redis::ErrorKind::NoScriptError);
    }
}
