//! Postgres driver. Schema lives in `migrations/`; every multi-row write runs
//! in one transaction so a record is never left half-written.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{
    DraftFilter, JobFilter, PackageCommit, RegisterOutcome, SendOutcome, StatusUpdate, Store,
    StoreError,
};
use crate::models::job::{CriterionScore, Fingerprint, JobPosting, JobStatus, ScoreBreakdown};
use crate::models::outreach::{DraftStatus, OutreachDraft, Recipient};
use crate::models::package::{ApplicationPackage, AtsReport, TailoredResume};

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT_SECS: u64 = 5;

const JOB_SELECT: &str = r#"
    SELECT j.fingerprint, j.url, j.title, j.company, j.location, j.salary_min, j.salary_max,
           j.description, j.source, j.posted_date, j.status, j.passes_threshold,
           j.discovered_at, j.updated_at, s.overall, s.criteria, s.scored_at
    FROM jobs j
    LEFT JOIN score_breakdowns s ON s.job_fingerprint = j.fingerprint
"#;

const PACKAGE_SELECT: &str = r#"
    SELECT job_fingerprint, version, superseded, tailored_resume, cover_letter, ats_report,
           tailoring_notes, source_model, generated_at
    FROM application_packages
"#;

const DRAFT_SELECT: &str = r#"
    SELECT id, job_fingerprint, recipient_name, recipient_title, recipient_category,
           recipient_linkedin_url, message_type, message_text, status, created_at, sent_at
    FROM outreach_drafts
"#;

#[derive(Debug, FromRow)]
struct JobRow {
    fingerprint: Uuid,
    url: String,
    title: String,
    company: String,
    location: Option<String>,
    salary_min: Option<i64>,
    salary_max: Option<i64>,
    description: String,
    source: String,
    posted_date: Option<NaiveDate>,
    status: String,
    passes_threshold: bool,
    discovered_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    overall: Option<f64>,
    criteria: Option<Json<BTreeMap<String, CriterionScore>>>,
    scored_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for JobPosting {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<JobStatus>().map_err(StoreError::Corrupt)?;
        let score_breakdown = ScoreBreakdown {
            overall: row.overall.unwrap_or(0.0),
            criteria: row.criteria.map(|c| c.0).unwrap_or_default(),
            scored_at: row.scored_at.unwrap_or(row.discovered_at),
        };
        Ok(JobPosting {
            fingerprint: Fingerprint::from_uuid(row.fingerprint),
            url: row.url,
            title: row.title,
            company: row.company,
            location: row.location,
            salary_min: row.salary_min,
            salary_max: row.salary_max,
            description: row.description,
            source: row.source,
            posted_date: row.posted_date,
            discovered_at: row.discovered_at,
            updated_at: row.updated_at,
            status,
            score_breakdown,
            passes_threshold: row.passes_threshold,
        })
    }
}

#[derive(Debug, FromRow)]
struct PackageRow {
    job_fingerprint: Uuid,
    version: i64,
    superseded: bool,
    tailored_resume: Json<TailoredResume>,
    cover_letter: String,
    ats_report: Json<AtsReport>,
    tailoring_notes: Option<String>,
    source_model: String,
    generated_at: DateTime<Utc>,
}

impl TryFrom<PackageRow> for ApplicationPackage {
    type Error = StoreError;

    fn try_from(row: PackageRow) -> Result<Self, Self::Error> {
        let version = u64::try_from(row.version)
            .map_err(|_| StoreError::Corrupt(format!("negative package version {}", row.version)))?;
        Ok(ApplicationPackage {
            job: Fingerprint::from_uuid(row.job_fingerprint),
            version,
            superseded: row.superseded,
            resume: row.tailored_resume.0,
            cover_letter: row.cover_letter,
            ats: row.ats_report.0,
            tailoring_notes: row.tailoring_notes,
            generated_at: row.generated_at,
            source_model: row.source_model,
        })
    }
}

#[derive(Debug, FromRow)]
struct DraftRow {
    id: Uuid,
    job_fingerprint: Option<Uuid>,
    recipient_name: String,
    recipient_title: String,
    recipient_category: String,
    recipient_linkedin_url: Option<String>,
    message_type: String,
    message_text: String,
    status: String,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<DraftRow> for OutreachDraft {
    type Error = StoreError;

    fn try_from(row: DraftRow) -> Result<Self, Self::Error> {
        Ok(OutreachDraft {
            id: row.id,
            job: row.job_fingerprint.map(Fingerprint::from_uuid),
            recipient: Recipient {
                name: row.recipient_name,
                title: row.recipient_title,
                category: row.recipient_category.parse().map_err(StoreError::Corrupt)?,
                linkedin_url: row.recipient_linkedin_url,
            },
            message_type: row.message_type.parse().map_err(StoreError::Corrupt)?,
            message_text: row.message_text,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            sent_at: row.sent_at,
        })
    }
}

fn to_db_version(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Corrupt(format!("version {version} overflows")))
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_job_if_absent(&self, job: JobPosting) -> Result<RegisterOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO jobs
                (fingerprint, url, title, company, location, salary_min, salary_max,
                 description, source, posted_date, status, passes_threshold,
                 discovered_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (fingerprint) DO NOTHING
            RETURNING fingerprint
            "#,
        )
        .bind(job.fingerprint.as_uuid())
        .bind(&job.url)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(job.salary_min)
        .bind(job.salary_max)
        .bind(&job.description)
        .bind(&job.source)
        .bind(job.posted_date)
        .bind(job.status.as_str())
        .bind(job.passes_threshold)
        .bind(job.discovered_at)
        .bind(job.updated_at)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            tx.rollback().await?;
            return Ok(RegisterOutcome::Duplicate(job.fingerprint));
        }

        sqlx::query(
            r#"
            INSERT INTO score_breakdowns (job_fingerprint, overall, criteria, scored_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(job.fingerprint.as_uuid())
        .bind(job.score_breakdown.overall)
        .bind(Json(&job.score_breakdown.criteria))
        .bind(job.score_breakdown.scored_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RegisterOutcome::Registered(job))
    }

    async fn job_exists(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        Ok(
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM jobs WHERE fingerprint = $1)")
                .bind(fingerprint.as_uuid())
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn get_job(&self, fingerprint: &Fingerprint) -> Result<Option<JobPosting>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(&format!("{JOB_SELECT} WHERE j.fingerprint = $1"))
            .bind(fingerprint.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(JobPosting::try_from).transpose()
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError> {
        let limit = filter.limit.map(|l| l as i64);
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"{JOB_SELECT}
            WHERE ($1::TEXT IS NULL OR j.status = $1)
              AND ($2 OR j.passes_threshold)
            ORDER BY s.overall DESC NULLS LAST, j.discovered_at DESC
            LIMIT $3"#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.include_below_threshold)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(JobPosting::try_from).collect()
    }

    async fn compare_and_set_status(
        &self,
        fingerprint: &Fingerprint,
        allowed_from: &[JobStatus],
        to: JobStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StoreError> {
        let allowed: Vec<&str> = allowed_from.iter().map(JobStatus::as_str).collect();

        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE jobs SET status = $1, updated_at = $2
            WHERE fingerprint = $3 AND status = ANY($4)
            RETURNING fingerprint
            "#,
        )
        .bind(to.as_str())
        .bind(at)
        .bind(fingerprint.as_uuid())
        .bind(&allowed)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            return match self.get_job(fingerprint).await? {
                Some(job) => Ok(StatusUpdate::Applied(job)),
                None => Ok(StatusUpdate::NotFound),
            };
        }

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM jobs WHERE fingerprint = $1")
                .bind(fingerprint.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        match current {
            None => Ok(StatusUpdate::NotFound),
            Some(status) => Ok(StatusUpdate::Refused {
                current: status.parse().map_err(StoreError::Corrupt)?,
            }),
        }
    }

    async fn replace_score(
        &self,
        fingerprint: &Fingerprint,
        breakdown: ScoreBreakdown,
        passes_threshold: bool,
    ) -> Result<Option<JobPosting>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query(
            "UPDATE jobs SET passes_threshold = $1, updated_at = $2 WHERE fingerprint = $3",
        )
        .bind(passes_threshold)
        .bind(breakdown.scored_at)
        .bind(fingerprint.as_uuid())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if touched == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO score_breakdowns (job_fingerprint, overall, criteria, scored_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (job_fingerprint)
            DO UPDATE SET overall = EXCLUDED.overall,
                          criteria = EXCLUDED.criteria,
                          scored_at = EXCLUDED.scored_at
            "#,
        )
        .bind(fingerprint.as_uuid())
        .bind(breakdown.overall)
        .bind(Json(&breakdown.criteria))
        .bind(breakdown.scored_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_job(fingerprint).await
    }

    async fn begin_generation(&self, fingerprint: &Fingerprint) -> Result<Option<u64>, StoreError> {
        let generation: Option<i64> = sqlx::query_scalar(
            "UPDATE jobs SET generation = generation + 1 WHERE fingerprint = $1 RETURNING generation",
        )
        .bind(fingerprint.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        generation
            .map(|g| {
                u64::try_from(g).map_err(|_| StoreError::Corrupt(format!("negative generation {g}")))
            })
            .transpose()
    }

    async fn commit_package(
        &self,
        package: ApplicationPackage,
    ) -> Result<PackageCommit, StoreError> {
        let version = to_db_version(package.version)?;
        let mut tx = self.pool.begin().await?;

        // Row lock on the job serializes concurrent commits for the same job.
        sqlx::query("SELECT fingerprint FROM jobs WHERE fingerprint = $1 FOR UPDATE")
            .bind(package.job.as_uuid())
            .fetch_one(&mut *tx)
            .await?;

        let current_version: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(version) FROM application_packages WHERE job_fingerprint = $1 AND NOT superseded",
        )
        .bind(package.job.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        let becomes_current = current_version.map_or(true, |v| version > v);

        if becomes_current {
            sqlx::query(
                "UPDATE application_packages SET superseded = TRUE WHERE job_fingerprint = $1 AND NOT superseded",
            )
            .bind(package.job.as_uuid())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO application_packages
                (job_fingerprint, version, superseded, tailored_resume, cover_letter,
                 ats_report, tailoring_notes, source_model, generated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(package.job.as_uuid())
        .bind(version)
        .bind(!becomes_current)
        .bind(Json(&package.resume))
        .bind(&package.cover_letter)
        .bind(Json(&package.ats))
        .bind(&package.tailoring_notes)
        .bind(&package.source_model)
        .bind(package.generated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PackageCommit {
            version: package.version,
            current: becomes_current,
        })
    }

    async fn current_package(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ApplicationPackage>, StoreError> {
        let row = sqlx::query_as::<_, PackageRow>(&format!(
            "{PACKAGE_SELECT} WHERE job_fingerprint = $1 AND NOT superseded ORDER BY version DESC LIMIT 1"
        ))
        .bind(fingerprint.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ApplicationPackage::try_from).transpose()
    }

    async fn package_history(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<ApplicationPackage>, StoreError> {
        let rows = sqlx::query_as::<_, PackageRow>(&format!(
            "{PACKAGE_SELECT} WHERE job_fingerprint = $1 ORDER BY version DESC"
        ))
        .bind(fingerprint.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ApplicationPackage::try_from).collect()
    }

    async fn insert_draft(&self, draft: OutreachDraft) -> Result<OutreachDraft, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO outreach_drafts
                (id, job_fingerprint, recipient_name, recipient_title, recipient_category,
                 recipient_linkedin_url, message_type, message_text, status, created_at, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(draft.id)
        .bind(draft.job.map(|fp| fp.as_uuid()))
        .bind(&draft.recipient.name)
        .bind(&draft.recipient.title)
        .bind(draft.recipient.category.as_str())
        .bind(&draft.recipient.linkedin_url)
        .bind(draft.message_type.as_str())
        .bind(&draft.message_text)
        .bind(draft.status.as_str())
        .bind(draft.created_at)
        .bind(draft.sent_at)
        .execute(&self.pool)
        .await?;
        Ok(draft)
    }

    async fn get_draft(&self, id: Uuid) -> Result<Option<OutreachDraft>, StoreError> {
        let row = sqlx::query_as::<_, DraftRow>(&format!("{DRAFT_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(OutreachDraft::try_from).transpose()
    }

    async fn list_drafts(&self, filter: &DraftFilter) -> Result<Vec<OutreachDraft>, StoreError> {
        let rows = sqlx::query_as::<_, DraftRow>(&format!(
            r#"{DRAFT_SELECT}
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR job_fingerprint = $2)
            ORDER BY created_at DESC"#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.job.map(|fp| fp.as_uuid()))
        .fetch_all(&self.pool)
        .await?;

        let mut drafts = Vec::with_capacity(rows.len());
        for row in rows {
            let draft = OutreachDraft::try_from(row)?;
            if filter.matches(&draft) {
                drafts.push(draft);
            }
        }
        Ok(drafts)
    }

    async fn mark_draft_sent(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SendOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, DraftRow>(&format!("{DRAFT_SELECT} WHERE id = $1 FOR UPDATE"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(mut draft) = row.map(OutreachDraft::try_from).transpose()? else {
            tx.rollback().await?;
            return Ok(SendOutcome::NotFound);
        };

        if draft.status == DraftStatus::Sent {
            tx.rollback().await?;
            return Ok(SendOutcome::AlreadySent(draft));
        }
        if !draft.presentable() {
            tx.rollback().await?;
            return Ok(SendOutcome::NotPresentable(draft));
        }

        sqlx::query("UPDATE outreach_drafts SET status = $1, sent_at = $2 WHERE id = $3")
            .bind(DraftStatus::Sent.as_str())
            .bind(at)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        draft.status = DraftStatus::Sent;
        draft.sent_at = Some(at);
        Ok(SendOutcome::Sent(draft))
    }
}
