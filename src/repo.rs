use async_trait::async_trait;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait ComplaintRepo: Send + Sync {
    /// Assigns id, creation timestamp and Open status, persists, returns the
    /// stored record. Empty required fields fail with `Validation`.
    async fn insert(&self, new: NewComplaint) -> RepoResult<Complaint>;
    /// Every record, newest first. No pagination.
    async fn list_all(&self) -> RepoResult<Vec<Complaint>>;
    /// Overwrites `status` only. Any enum member is accepted, including a
    /// Resolved -> Open reversal.
    async fn update_status(&self, id: Id, status: ComplaintStatus) -> RepoResult<Complaint>;
}

// Required-field check shared by both backends. `state` is already a closed
// enum by the time a NewComplaint exists; only the free-text fields can be
// blank.
fn validate(new: &NewComplaint) -> RepoResult<()> {
    if new.product_id.trim().is_empty() || new.complaint_details.trim().is_empty() {
        return Err(RepoError::Validation(
            "State, product ID, and complaint details are required".into(),
        ));
    }
    Ok(())
}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock};
    use uuid::Uuid;

    const SNAPSHOT_PATH: &str = "data/state.json";

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        complaints: HashMap<Id, Complaint>,
    }

    /// Development/test backend: a HashMap behind a lock, snapshotted to JSON
    /// after every write so restarts keep the data.
    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Arc<PathBuf>,
    }

    impl InMemRepo {
        fn snapshot_path() -> PathBuf {
            match std::env::var("CIB_DATA_DIR") {
                Ok(dir) => {
                    let mut p = PathBuf::from(dir);
                    p.push("state.json");
                    p
                }
                Err(_) => PathBuf::from(SNAPSHOT_PATH),
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        log::info!("loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        log::warn!(
                            "failed to parse snapshot '{}': {e}; starting empty",
                            path.display()
                        );
                        State::default()
                    }
                },
                Err(_) => State::default(),
            }
        }

        fn persist(&self) {
            let path = self.snapshot_path.clone();
            if let Ok(s) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(&*path, s) {
                    log::error!("failed to write snapshot '{}': {e}", path.display());
                }
            }
        }

        pub fn new() -> Self {
            let snapshot_path = Self::snapshot_path();
            let state = Self::load_state_from(&snapshot_path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Arc::new(snapshot_path),
            }
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ComplaintRepo for InMemRepo {
        async fn insert(&self, new: NewComplaint) -> RepoResult<Complaint> {
            validate(&new)?;
            let complaint = Complaint {
                id: Uuid::new_v4(),
                customer_name: new.customer_name,
                customer_email: new.customer_email,
                state: new.state,
                product_id: new.product_id,
                complaint_details: new.complaint_details,
                complaint_type: new.complaint_type,
                submitter_role: new.submitter_role,
                photo_id: new.photo_id,
                status: ComplaintStatus::Open,
                created_at: Utc::now(),
            };
            let mut s = self.state.write().unwrap();
            s.complaints.insert(complaint.id, complaint.clone());
            drop(s); // release lock before persisting
            self.persist();
            Ok(complaint)
        }

        async fn list_all(&self) -> RepoResult<Vec<Complaint>> {
            let s = self.state.read().unwrap();
            let mut v: Vec<_> = s.complaints.values().cloned().collect();
            v.sort_by(|a, b| b.created_at.cmp(&a.created_at)); // newest first
            Ok(v)
        }

        async fn update_status(&self, id: Id, status: ComplaintStatus) -> RepoResult<Complaint> {
            let mut s = self.state.write().unwrap();
            let complaint = s.complaints.get_mut(&id).ok_or(RepoError::NotFound)?;
            complaint.status = status;
            let updated = complaint.clone();
            drop(s);
            self.persist();
            Ok(updated)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use chrono::Utc;
    use sqlx::{Pool, Postgres};
    use uuid::Uuid;

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }
    }

    const COLUMNS: &str = "id, customer_name, customer_email, state, product_id, \
                           complaint_details, complaint_type, submitter_role, \
                           photo_id, status, created_at";

    #[async_trait]
    impl ComplaintRepo for PgRepo {
        async fn insert(&self, new: NewComplaint) -> RepoResult<Complaint> {
            validate(&new)?;
            // Id and timestamp are assigned here rather than by the database
            // so both backends behave identically.
            let rec = sqlx::query_as::<_, Complaint>(
                "INSERT INTO complaints \
                 (id, customer_name, customer_email, state, product_id, \
                  complaint_details, complaint_type, submitter_role, photo_id, \
                  status, created_at) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11) \
                 RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(&new.customer_name)
            .bind(&new.customer_email)
            .bind(new.state)
            .bind(&new.product_id)
            .bind(&new.complaint_details)
            .bind(new.complaint_type)
            .bind(new.submitter_role)
            .bind(new.photo_id)
            .bind(ComplaintStatus::Open)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Internal(e.to_string()))?;
            Ok(rec)
        }

        async fn list_all(&self) -> RepoResult<Vec<Complaint>> {
            let recs = sqlx::query_as::<_, Complaint>(&format!(
                "SELECT {COLUMNS} FROM complaints ORDER BY created_at DESC"
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Internal(e.to_string()))?;
            Ok(recs)
        }

        async fn update_status(&self, id: Id, status: ComplaintStatus) -> RepoResult<Complaint> {
            let rec = sqlx::query_as::<_, Complaint>(
                "UPDATE complaints SET status = $2 WHERE id = $1 RETURNING *",
            )
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Internal(e.to_string()))?;
            rec.ok_or(RepoError::NotFound)
        }
    }
}
