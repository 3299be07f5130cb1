use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::auth::{session_user, Session};
use crate::config::SimulatedLatency;
use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::generate;
use crate::models::{
    CoverLetter, CvDocument, CvStatus, FileType, FixType, InterviewPrep, TransactionKind,
};
use crate::points;
use crate::repo::{generate_id, Collection};

pub const COVER_LETTER_COST: i64 = 1;
pub const INTERVIEW_PREP_COST: i64 = 1;

#[derive(Debug, Clone)]
pub struct CvSubmission {
    pub name: Option<String>,
    pub original_content: String,
    pub job_description: Option<String>,
    pub fix_type: FixType,
    pub file_type: FileType,
}

#[derive(Debug, Clone)]
pub struct JobBrief {
    pub job_title: String,
    pub company: String,
    pub job_description: String,
}

fn require(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(())
}

// --- CV fixes ---

/// Stores a pending CV. Nothing is charged until it is processed.
pub fn create_cv(db: &Database, session: &Session, submission: CvSubmission) -> ServiceResult<CvDocument> {
    db.add_item(CvDocument {
        id: generate_id(),
        user_id: session.user_id.clone(),
        name: submission
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Untitled CV".to_string()),
        original_content: submission.original_content,
        fixed_content: None,
        job_description: submission.job_description,
        fix_type: Some(submission.fix_type),
        match_score: None,
        improvements: None,
        created_at: Utc::now(),
        status: CvStatus::Pending,
        file_type: submission.file_type,
    })
}

/// Runs the simulated optimizer over a pending CV at the tier chosen at
/// upload. The tier cost is debited in the same unit that marks the CV
/// completed, so an interrupted run leaves it pending and unpaid.
pub async fn process_fix(
    db: &Database,
    session: &Session,
    latency: &SimulatedLatency,
    cv_id: &str,
) -> ServiceResult<CvDocument> {
    let cv: CvDocument = db.owned_item(session, cv_id)?;
    if cv.status == CvStatus::Completed {
        return Err(ServiceError::AlreadyProcessed(cv.id));
    }
    let fix_type = cv.fix_type.unwrap_or(FixType::Basic);
    points::ensure_balance(db, &session.user_id, fix_type.cost())?;

    tokio::time::sleep(latency.cv_fix).await;

    let score = generate::match_score();
    let patch = json!({
        "fixedContent": generate::fixed_cv(&cv.original_content, fix_type),
        "matchScore": score,
        "improvements": generate::improvements(fix_type),
        "fixType": fix_type,
        "status": CvStatus::Completed,
    });
    let completed = db.atomic(|| {
        // Another run may have finished while this one slept
        let current: CvDocument = db.owned_item(session, cv_id)?;
        if current.status == CvStatus::Completed {
            return Err(ServiceError::AlreadyProcessed(current.id));
        }
        points::deduct_points(
            db,
            &session.user_id,
            fix_type.cost(),
            TransactionKind::Usage,
            &format!("{} - CV Fix", fix_type.name()),
        )?;
        db.update_item::<CvDocument>(cv_id, patch)?
            .ok_or_else(|| ServiceError::not_found(Collection::Cvs, cv_id))
    })?;
    info!(cv_id, fix_type = fix_type.as_str(), score, "cv fix completed");
    Ok(completed)
}

/// Upload and process in one call. Nothing is stored when the balance
/// cannot cover the tier.
pub async fn fix_cv(
    db: &Database,
    session: &Session,
    latency: &SimulatedLatency,
    submission: CvSubmission,
) -> ServiceResult<CvDocument> {
    points::ensure_balance(db, &session.user_id, submission.fix_type.cost())?;
    let cv = create_cv(db, session, submission)?;
    process_fix(db, session, latency, &cv.id).await
}

pub fn list_cvs(db: &Database, session: &Session) -> ServiceResult<Vec<CvDocument>> {
    let mut cvs: Vec<CvDocument> = db.user_items(Some(session))?;
    cvs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(cvs)
}

pub fn get_cv(db: &Database, session: &Session, id: &str) -> ServiceResult<CvDocument> {
    db.owned_item(session, id)
}

// --- Cover letters ---

/// Generates a letter, then charges and stores it together.
pub async fn generate_cover_letter(
    db: &Database,
    session: &Session,
    latency: &SimulatedLatency,
    brief: JobBrief,
) -> ServiceResult<CoverLetter> {
    require("Job title", &brief.job_title)?;
    require("Company", &brief.company)?;
    require("Job description", &brief.job_description)?;
    points::ensure_balance(db, &session.user_id, COVER_LETTER_COST)?;

    tokio::time::sleep(latency.generation).await;

    let user = session_user(db, session)?;
    let content = generate::cover_letter(
        &brief.job_title,
        &brief.company,
        &brief.job_description,
        &user.name,
    );

    let letter = db.atomic(|| {
        points::deduct_points(
            db,
            &session.user_id,
            COVER_LETTER_COST,
            TransactionKind::Usage,
            "Cover Letter Generation",
        )?;
        db.add_item(CoverLetter {
            id: generate_id(),
            user_id: session.user_id.clone(),
            job_title: brief.job_title,
            company: brief.company,
            job_description: brief.job_description,
            content,
            created_at: Utc::now(),
        })
    })?;
    info!(letter_id = %letter.id, "cover letter generated");
    Ok(letter)
}

pub fn list_cover_letters(db: &Database, session: &Session) -> ServiceResult<Vec<CoverLetter>> {
    let mut letters: Vec<CoverLetter> = db.user_items(Some(session))?;
    letters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(letters)
}

pub fn get_cover_letter(db: &Database, session: &Session, id: &str) -> ServiceResult<CoverLetter> {
    db.owned_item(session, id)
}

// --- Interview prep ---

pub async fn generate_interview_prep(
    db: &Database,
    session: &Session,
    latency: &SimulatedLatency,
    job_title: String,
    job_description: String,
) -> ServiceResult<InterviewPrep> {
    require("Job title", &job_title)?;
    points::ensure_balance(db, &session.user_id, INTERVIEW_PREP_COST)?;

    tokio::time::sleep(latency.generation).await;

    let questions = generate::interview_questions(&job_title);
    let tips = generate::interview_tips();

    let prep = db.atomic(|| {
        points::deduct_points(
            db,
            &session.user_id,
            INTERVIEW_PREP_COST,
            TransactionKind::Usage,
            "Interview Preparation",
        )?;
        db.add_item(InterviewPrep {
            id: generate_id(),
            user_id: session.user_id.clone(),
            job_title,
            job_description,
            questions,
            tips,
            created_at: Utc::now(),
        })
    })?;
    info!(prep_id = %prep.id, "interview prep generated");
    Ok(prep)
}

pub fn list_interview_preps(db: &Database, session: &Session) -> ServiceResult<Vec<InterviewPrep>> {
    let mut preps: Vec<InterviewPrep> = db.user_items(Some(session))?;
    preps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(preps)
}

pub fn get_interview_prep(db: &Database, session: &Session, id: &str) -> ServiceResult<InterviewPrep> {
    db.owned_item(session, id)
}
