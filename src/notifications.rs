use chrono::Utc;
use serde_json::json;

use crate::auth::Session;
use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{Notification, NotificationKind};
use crate::repo::{generate_id, Collection};

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
}

pub fn create(db: &Database, user_id: &str, new: NewNotification) -> ServiceResult<Notification> {
    db.add_item(Notification {
        id: generate_id(),
        user_id: user_id.to_string(),
        kind: new.kind,
        title: new.title,
        message: new.message,
        read: false,
        created_at: Utc::now(),
        action_url: new.action_url,
    })
}

pub fn list(db: &Database, session: &Session) -> ServiceResult<Vec<Notification>> {
    let mut items: Vec<Notification> = db.user_items(Some(session))?;
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(items)
}

pub fn mark_as_read(db: &Database, session: &Session, id: &str) -> ServiceResult<Notification> {
    db.owned_item::<Notification>(session, id)?;
    db.update_item(id, json!({ "read": true }))?
        .ok_or_else(|| ServiceError::not_found(Collection::Notifications, id))
}

/// Returns how many notifications were flipped to read.
pub fn mark_all_as_read(db: &Database, session: &Session) -> ServiceResult<usize> {
    db.atomic(|| {
        let mut flipped = 0;
        for mut n in db.user_items::<Notification>(Some(session))? {
            if !n.read {
                n.read = true;
                db.put_item(&n)?;
                flipped += 1;
            }
        }
        Ok(flipped)
    })
}

pub fn unread_count(db: &Database, session: &Session) -> ServiceResult<usize> {
    Ok(db
        .user_items::<Notification>(Some(session))?
        .iter()
        .filter(|n| !n.read)
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn note(title: &str) -> NewNotification {
        NewNotification {
            kind: NotificationKind::Info,
            title: title.to_string(),
            message: "body".to_string(),
            action_url: None,
        }
    }

    #[test]
    fn test_unread_count_and_mark_all() {
        let db = db();
        let me = Session { user_id: "u1".to_string() };
        let other = Session { user_id: "u2".to_string() };
        create(&db, "u1", note("a")).unwrap();
        create(&db, "u1", note("b")).unwrap();
        create(&db, "u2", note("c")).unwrap();

        assert_eq!(unread_count(&db, &me).unwrap(), 2);
        assert_eq!(mark_all_as_read(&db, &me).unwrap(), 2);
        assert_eq!(mark_all_as_read(&db, &me).unwrap(), 0);
        assert_eq!(unread_count(&db, &me).unwrap(), 0);
        assert_eq!(unread_count(&db, &other).unwrap(), 1);
    }

    #[test]
    fn test_mark_as_read_scoped_to_owner() {
        let db = db();
        let me = Session { user_id: "u1".to_string() };
        let other = Session { user_id: "u2".to_string() };
        let n = create(&db, "u1", note("a")).unwrap();

        assert!(matches!(
            mark_as_read(&db, &other, &n.id),
            Err(ServiceError::NotFound { .. })
        ));
        assert!(mark_as_read(&db, &me, &n.id).unwrap().read);
        assert!(matches!(
            mark_as_read(&db, &me, "missing"),
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_newest_first() {
        let db = db();
        let me = Session { user_id: "u1".to_string() };
        create(&db, "u1", note("first")).unwrap();
        create(&db, "u1", note("second")).unwrap();
        let titles: Vec<String> = list(&db, &me).unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["second", "first"]);
    }
}
