use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use rusqlite::{Connection, ErrorCode};
use tokio::sync::oneshot;

use super::migrations::run_migrations;

const SIDECAR_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Request {
    Run(Job),
    Close,
}

/// The thread that owns the history connection.
struct Worker {
    requests: mpsc::Sender<Request>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        if self.requests.send(Request::Close).is_err() {
            warn!("History database thread already gone at shutdown");
        }
        if let Err(join_err) = handle.join() {
            error!("Failed to join history database thread: {join_err:?}");
        }
    }
}

/// Handle to the history database. One dedicated thread owns the SQLite
/// connection and runs every read and write in submission order, so the
/// capture path and the list UI never interleave inside a job.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

impl Database {
    /// Open (creating and migrating if needed) the database at `db_path`.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let thread_path = db_path.clone();

        let thread = thread::Builder::new()
            .name("signcam-db".into())
            .spawn(move || {
                let mut conn = match open_connection(&thread_path) {
                    Ok(conn) => {
                        if ready_tx.send(Ok(())).is_err() {
                            return;
                        }
                        conn
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                while let Ok(request) = request_rx.recv() {
                    match request {
                        Request::Run(job) => job(&mut conn),
                        Request::Close => break,
                    }
                }

                info!("History database thread closed");
            })
            .context("failed to spawn history database thread")?;

        ready_rx
            .recv()
            .context("history database thread exited before opening")??;

        info!("History database open at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                requests: request_tx,
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    /// Open the database; if SQLite reports the file is not a database or is
    /// corrupt, move it (and its WAL/SHM sidecars) aside and start empty.
    ///
    /// Any other failure, such as a schema newer than this build or a locked
    /// file, is returned untouched.
    pub fn open_or_recover(db_path: PathBuf) -> Result<Self> {
        match Self::new(db_path.clone()) {
            Ok(db) => Ok(db),
            Err(err) if is_unreadable_file(&err) => {
                let moved_to = quarantine(&db_path)?;
                warn!(
                    "History database at {} unreadable ({err:#}); moved to {}, starting empty",
                    db_path.display(),
                    moved_to.display()
                );
                Self::new(db_path)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let job: Job = Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                warn!("History database caller went away before its reply");
            }
        });

        self.worker
            .requests
            .send(Request::Run(job))
            .map_err(|err| anyhow!("history database thread not running: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("history database thread stopped mid-request"))?
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;

    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("Failed to enable WAL mode: {err}");
    }

    run_migrations(&mut conn).context("failed to run database migrations")?;
    Ok(conn)
}

fn is_unreadable_file(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<rusqlite::Error>())
        .filter_map(rusqlite::Error::sqlite_error_code)
        .any(|code| matches!(code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt))
}

/// Rename the database file and any sidecars to `<name>.corrupt-<stamp>`.
/// Returns the new path of the main file.
fn quarantine(db_path: &Path) -> Result<PathBuf> {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let file_name = db_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("database path {} has no file name", db_path.display()))?;

    let moved_to = db_path.with_file_name(format!("{file_name}.corrupt-{stamp}"));
    std::fs::rename(db_path, &moved_to)
        .with_context(|| format!("failed to move database to {}", moved_to.display()))?;

    for suffix in SIDECAR_SUFFIXES {
        let sidecar = db_path.with_file_name(format!("{file_name}{suffix}"));
        if !sidecar.exists() {
            continue;
        }
        let sidecar_to = db_path.with_file_name(format!("{file_name}{suffix}.corrupt-{stamp}"));
        std::fs::rename(&sidecar, &sidecar_to)
            .with_context(|| format!("failed to move {} aside", sidecar.display()))?;
    }

    Ok(moved_to)
}
