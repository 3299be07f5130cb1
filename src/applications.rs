use chrono::Utc;

use crate::auth::Session;
use crate::db::Database;
use crate::error::ServiceResult;
use crate::models::{ApplicationStatus, CoverLetter, CvDocument, JobApplication, NotificationKind};
use crate::notifications::{self, NewNotification};
use crate::repo::generate_id;

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub cv_id: String,
    pub cover_letter_id: Option<String>,
    pub job_title: String,
    pub company: String,
    pub job_description: String,
    pub notes: Option<String>,
}

pub fn create(db: &Database, session: &Session, new: NewApplication) -> ServiceResult<JobApplication> {
    db.owned_item::<CvDocument>(session, &new.cv_id)?;
    if let Some(letter_id) = new.cover_letter_id.as_deref() {
        db.owned_item::<CoverLetter>(session, letter_id)?;
    }

    db.atomic(|| {
        let application = db.add_item(JobApplication {
            id: generate_id(),
            user_id: session.user_id.clone(),
            cv_id: new.cv_id,
            cover_letter_id: new.cover_letter_id,
            job_title: new.job_title,
            company: new.company,
            job_description: new.job_description,
            applied_at: Utc::now(),
            status: ApplicationStatus::Applied,
            notes: new.notes,
        })?;
        notifications::create(
            db,
            &session.user_id,
            NewNotification {
                kind: NotificationKind::Success,
                title: "Application Submitted! 🎯".to_string(),
                message: format!(
                    "Your application for {} at {} has been tracked.",
                    application.job_title, application.company
                ),
                action_url: None,
            },
        )?;
        Ok(application)
    })
}

/// Sets any status; there is no transition table. Existing notes are kept
/// when `notes` is `None`.
pub fn update_status(
    db: &Database,
    session: &Session,
    id: &str,
    status: ApplicationStatus,
    notes: Option<String>,
) -> ServiceResult<JobApplication> {
    let mut application = get(db, session, id)?;
    application.status = status;
    if notes.is_some() {
        application.notes = notes;
    }
    db.put_item(&application)?;
    Ok(application)
}

/// Applications newest first.
pub fn list(db: &Database, session: &Session) -> ServiceResult<Vec<JobApplication>> {
    let mut items: Vec<JobApplication> = db.user_items(Some(session))?;
    items.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
    Ok(items)
}

pub fn get(db: &Database, session: &Session, id: &str) -> ServiceResult<JobApplication> {
    db.owned_item(session, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{create_cv, CvSubmission};
    use crate::error::ServiceError;
    use crate::models::{FileType, FixType, Notification};

    fn setup() -> (Database, Session, String) {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        let session = Session { user_id: "u1".to_string() };
        let cv = create_cv(
            &db,
            &session,
            CvSubmission {
                name: Some("cv".to_string()),
                original_content: "content".to_string(),
                job_description: None,
                fix_type: FixType::Basic,
                file_type: FileType::Text,
            },
        )
        .unwrap();
        (db, session, cv.id)
    }

    fn new_application(cv_id: &str) -> NewApplication {
        NewApplication {
            cv_id: cv_id.to_string(),
            cover_letter_id: None,
            job_title: "Marketing Specialist".to_string(),
            company: "Brand Masters".to_string(),
            job_description: "Campaigns".to_string(),
            notes: Some("referred by Tolu".to_string()),
        }
    }

    #[test]
    fn test_create_starts_applied_and_notifies() {
        let (db, session, cv_id) = setup();
        let app = create(&db, &session, new_application(&cv_id)).unwrap();
        assert_eq!(app.status, ApplicationStatus::Applied);

        let inbox: Vec<Notification> = db.items_owned_by("u1").unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(
            inbox[0].message,
            "Your application for Marketing Specialist at Brand Masters has been tracked."
        );
    }

    #[test]
    fn test_create_requires_owned_cv() {
        let (db, session, cv_id) = setup();
        let stranger = Session { user_id: "u2".to_string() };
        assert!(matches!(
            create(&db, &stranger, new_application(&cv_id)),
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            create(
                &db,
                &session,
                NewApplication {
                    cover_letter_id: Some("nope".to_string()),
                    ..new_application(&cv_id)
                }
            ),
            Err(ServiceError::NotFound { .. })
        ));
        assert_eq!(db.count_items::<JobApplication>().unwrap(), 0);
    }

    #[test]
    fn test_any_status_can_follow_any_status() {
        let (db, session, cv_id) = setup();
        let app = create(&db, &session, new_application(&cv_id)).unwrap();

        let rejected = update_status(&db, &session, &app.id, ApplicationStatus::Rejected, None).unwrap();
        assert_eq!(rejected.notes.as_deref(), Some("referred by Tolu"));

        let back = update_status(
            &db,
            &session,
            &app.id,
            ApplicationStatus::Interview,
            Some("second round".to_string()),
        )
        .unwrap();
        assert_eq!(back.status, ApplicationStatus::Interview);
        assert_eq!(get(&db, &session, &app.id).unwrap().notes.as_deref(), Some("second round"));
    }

    #[test]
    fn test_list_is_newest_first() {
        let (db, session, cv_id) = setup();
        let first = create(&db, &session, new_application(&cv_id)).unwrap();
        let second = create(&db, &session, new_application(&cv_id)).unwrap();
        let ids: Vec<String> = list(&db, &session).unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
