use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};

pub(super) enum WriteCommand {
    Put { key: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// Start the write-behind task. It runs until every sender is dropped.
pub(super) fn spawn(pool: SqlitePool) -> mpsc::UnboundedSender<WriteCommand> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                WriteCommand::Put { key, value } => {
                    if let Err(err) = upsert(&pool, &key, &value).await {
                        tracing::warn!(%key, error = %err, "failed to persist key-value entry");
                    }
                }
                WriteCommand::Flush(done) => {
                    // The waiter may have been dropped; nothing to report then.
                    let _ = done.send(());
                }
            }
        }
        tracing::debug!("key-value writer stopped");
    });
    tx
}

async fn upsert(pool: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
        INSERT INTO kv_entries (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        ",
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}
