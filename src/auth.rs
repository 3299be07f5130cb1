use std::sync::LazyLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Local, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    Credential, NotificationKind, Referral, ReferralStatus, TransactionKind, User,
};
use crate::notifications::{self, NewNotification};
use crate::points;
use crate::repo::{generate_id, random_base36, Collection};

pub const WELCOME_BONUS: i64 = 1;
pub const REFERRAL_REWARD: i64 = 2;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// The signed-in user a service call acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub referral_code: Option<&'a str>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            ServiceError::Password(e.to_string())
        })
}

pub fn verify_password(plain: &str, hash: &str) -> ServiceResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        ServiceError::Password(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

fn referral_code_candidate(name: &str) -> String {
    let prefix: String = name.chars().filter(|c| !c.is_whitespace()).take(3).collect();
    format!("{prefix}{}", random_base36(5)).to_uppercase()
}

fn unique_referral_code(db: &Database, name: &str) -> ServiceResult<String> {
    loop {
        let code = referral_code_candidate(name);
        if db.find_item_by::<User>("referralCode", &code)?.is_none() {
            return Ok(code);
        }
    }
}

/// Streak after a sign-in at `now`. `None` means the user was already
/// active today and nothing changes.
pub fn next_streak(streak: u32, last_active: DateTime<Utc>, now: DateTime<Utc>) -> Option<u32> {
    let today = now.with_timezone(&Local).date_naive();
    let last = last_active.with_timezone(&Local).date_naive();
    if last == today {
        None
    } else if today.pred_opt() == Some(last) {
        Some(streak + 1)
    } else {
        Some(1)
    }
}

pub fn signup(db: &Database, account: NewAccount<'_>) -> ServiceResult<(User, Session)> {
    let name = account.name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("Name is required".to_string()));
    }
    if !is_valid_email(account.email) {
        return Err(ServiceError::Validation(format!(
            "'{}' is not a valid email address",
            account.email
        )));
    }
    if db.find_item_by::<User>("email", account.email)?.is_some() {
        return Err(ServiceError::DuplicateEmail);
    }
    let password_hash = hash_password(account.password)?;

    let user = db.atomic(|| {
        let now = Utc::now();
        let user = db.add_item(User {
            id: generate_id(),
            name: name.to_string(),
            email: account.email.to_string(),
            phone: None,
            points: 0,
            created_at: now,
            referral_code: unique_referral_code(db, name)?,
            referred_by: account.referral_code.map(str::to_string),
            first_free_used: false,
            streak: 0,
            last_active_date: now,
        })?;
        db.add_item(Credential {
            id: generate_id(),
            user_id: user.id.clone(),
            password_hash,
        })?;

        points::add_points(
            db,
            &user.id,
            WELCOME_BONUS,
            TransactionKind::Welcome,
            "Welcome bonus - 1 free point!",
        )?;

        if let Some(code) = account.referral_code {
            attribute_referral(db, code, &user.email)?;
        }

        notifications::create(
            db,
            &user.id,
            NewNotification {
                kind: NotificationKind::Success,
                title: "Welcome to FlowJobAi! 🎉".to_string(),
                message: "You have 1 free point to try our CV fix service. Upload your CV to get started!"
                    .to_string(),
                action_url: None,
            },
        )?;

        let user = require_user(db, &user.id)?;
        db.set_current_user(&user)?;
        Ok(user)
    })?;

    info!(user_id = %user.id, referred = user.referred_by.is_some(), "user signed up");
    let session = Session::for_user(&user);
    Ok((user, session))
}

/// Credits the owner of `code` for bringing in `referred_email`. Unknown
/// codes are ignored.
fn attribute_referral(db: &Database, code: &str, referred_email: &str) -> ServiceResult<()> {
    let Some(referrer) = db.find_item_by::<User>("referralCode", code)? else {
        warn!(code, "unknown referral code ignored");
        return Ok(());
    };

    db.add_item(Referral {
        id: generate_id(),
        referrer_id: referrer.id.clone(),
        referred_email: referred_email.to_string(),
        status: ReferralStatus::Completed,
        points_earned: REFERRAL_REWARD,
        created_at: Utc::now(),
    })?;
    points::add_points(
        db,
        &referrer.id,
        REFERRAL_REWARD,
        TransactionKind::Referral,
        &format!("Referral bonus - {referred_email} joined!"),
    )?;
    info!(referrer_id = %referrer.id, "referral attributed");
    Ok(())
}

/// Signs a user in. With `verify_passwords` off only the email is checked,
/// as the demo backend did.
pub fn login(
    db: &Database,
    email: &str,
    password: &str,
    verify_passwords: bool,
) -> ServiceResult<(User, Session)> {
    let Some(mut user) = db.find_item_by::<User>("email", email)? else {
        return Err(ServiceError::InvalidCredentials);
    };

    if verify_passwords {
        let credential = db
            .items_owned_by::<Credential>(&user.id)?
            .into_iter()
            .next()
            .ok_or(ServiceError::InvalidCredentials)?;
        if !verify_password(password, &credential.password_hash)? {
            warn!(user_id = %user.id, "password mismatch");
            return Err(ServiceError::InvalidCredentials);
        }
    }

    let now = Utc::now();
    if let Some(streak) = next_streak(user.streak, user.last_active_date, now) {
        user.streak = streak;
        user.last_active_date = now;
        db.put_item(&user)?;
    }
    db.set_current_user(&user)?;

    info!(user_id = %user.id, streak = user.streak, "user logged in");
    let session = Session::for_user(&user);
    Ok((user, session))
}

pub fn logout(db: &Database) -> ServiceResult<()> {
    db.clear_current_user()
}

/// Session derived from the cached current user, if any.
pub fn current_session(db: &Database) -> ServiceResult<Option<Session>> {
    Ok(db.current_user()?.map(|u| Session::for_user(&u)))
}

pub fn require_session(db: &Database) -> ServiceResult<Session> {
    current_session(db)?.ok_or(ServiceError::NoSession)
}

pub fn require_user(db: &Database, user_id: &str) -> ServiceResult<User> {
    db.get_item::<User>(user_id)?
        .ok_or_else(|| ServiceError::not_found(Collection::Users, user_id))
}

/// Fresh copy of the session user from the users collection.
pub fn session_user(db: &Database, session: &Session) -> ServiceResult<User> {
    require_user(db, &session.user_id)
}

pub fn update_user(db: &Database, user_id: &str, update: ProfileUpdate) -> ServiceResult<User> {
    if let Some(email) = update.email.as_deref() {
        if !is_valid_email(email) {
            return Err(ServiceError::Validation(format!(
                "'{email}' is not a valid email address"
            )));
        }
        if let Some(owner) = db.find_item_by::<User>("email", email)? {
            if owner.id != user_id {
                return Err(ServiceError::DuplicateEmail);
            }
        }
    }

    let patch = serde_json::to_value(&update)?;
    let user = db
        .update_item::<User>(user_id, patch)?
        .ok_or_else(|| ServiceError::not_found(Collection::Users, user_id))?;
    db.refresh_current_user(&user)?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::models::{Notification, PointsTransaction};

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    fn account<'a>(name: &'a str, email: &'a str) -> NewAccount<'a> {
        NewAccount {
            name,
            email,
            password: "hunter22",
            referral_code: None,
        }
    }

    #[test]
    fn test_signup_grants_welcome_point_and_session() {
        let db = db();
        let (user, session) = signup(&db, account("Ada Obi", "ada@example.com")).unwrap();

        assert_eq!(user.points, 1);
        assert_eq!(user.streak, 0);
        assert!(!user.first_free_used);
        assert!(user.referral_code.starts_with("ADA"));
        assert_eq!(user.referral_code.len(), 8);
        assert_eq!(session.user_id, user.id);
        assert_eq!(db.current_user().unwrap().unwrap(), user);

        let txs: Vec<PointsTransaction> = db.items_owned_by(&user.id).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, TransactionKind::Welcome);
        assert_eq!(txs[0].balance, 1);

        let inbox: Vec<Notification> = db.items_owned_by(&user.id).unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(!inbox[0].read);
    }

    #[test]
    fn test_signup_duplicate_email_writes_nothing() {
        let db = db();
        signup(&db, account("Ada", "ada@example.com")).unwrap();
        let err = signup(&db, account("Other", "ada@example.com")).unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateEmail));
        assert_eq!(db.count_items::<User>().unwrap(), 1);
        assert_eq!(db.count_items::<PointsTransaction>().unwrap(), 1);
    }

    #[test]
    fn test_signup_email_match_is_case_sensitive() {
        let db = db();
        signup(&db, account("Ada", "ada@example.com")).unwrap();
        assert!(signup(&db, account("Ada", "ADA@example.com")).is_ok());
    }

    #[test]
    fn test_signup_rejects_bad_input() {
        let db = db();
        assert!(matches!(
            signup(&db, account("  ", "ada@example.com")),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            signup(&db, account("Ada", "not-an-email")),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_referral_attribution_rewards_referrer() {
        let db = db();
        let (referrer, _) = signup(&db, account("Bola", "bola@example.com")).unwrap();

        let (newcomer, _) = signup(
            &db,
            NewAccount {
                referral_code: Some(&referrer.referral_code),
                ..account("Chi", "chi@example.com")
            },
        )
        .unwrap();

        let referrals: Vec<Referral> = db.items_owned_by(&referrer.id).unwrap();
        assert_eq!(referrals.len(), 1);
        assert_eq!(referrals[0].status, ReferralStatus::Completed);
        assert_eq!(referrals[0].points_earned, 2);
        assert_eq!(referrals[0].referred_email, "chi@example.com");

        let referrer = require_user(&db, &referrer.id).unwrap();
        assert_eq!(referrer.points, 1 + 2);
        assert_eq!(newcomer.points, 1);
        assert_eq!(newcomer.referred_by.as_deref(), Some(referrer.referral_code.as_str()));
    }

    #[test]
    fn test_unknown_referral_code_is_ignored() {
        let db = db();
        let (user, _) = signup(
            &db,
            NewAccount {
                referral_code: Some("NOPE1234"),
                ..account("Dayo", "dayo@example.com")
            },
        )
        .unwrap();
        assert_eq!(user.points, 1);
        assert_eq!(db.count_items::<Referral>().unwrap(), 0);
    }

    #[test]
    fn test_login_checks_password_when_enabled() {
        let db = db();
        signup(&db, account("Ada", "ada@example.com")).unwrap();
        logout(&db).unwrap();

        assert!(matches!(
            login(&db, "ada@example.com", "wrong", true),
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(current_session(&db).unwrap().is_none());

        assert!(login(&db, "ada@example.com", "wrong", false).is_ok());
        assert!(login(&db, "ada@example.com", "hunter22", true).is_ok());
    }

    #[test]
    fn test_login_unknown_email() {
        let db = db();
        assert!(matches!(
            login(&db, "ghost@example.com", "x", false),
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_login_after_yesterday_increments_streak() {
        let db = db();
        let (mut user, _) = signup(&db, account("Ada", "ada@example.com")).unwrap();
        user.streak = 4;
        user.last_active_date = Utc::now() - Duration::days(1);
        db.put_item(&user).unwrap();

        let (user, session) = login(&db, "ada@example.com", "hunter22", true).unwrap();
        assert_eq!(user.streak, 5);
        assert_eq!(require_user(&db, &session.user_id).unwrap().streak, 5);
    }

    #[test]
    fn test_next_streak_rules() {
        let now = Utc::now();
        assert_eq!(next_streak(3, now, now), None);
        assert_eq!(next_streak(3, now - Duration::days(1), now), Some(4));
        assert_eq!(next_streak(3, now - Duration::days(2), now), Some(1));
        assert_eq!(next_streak(0, now - Duration::days(30), now), Some(1));
    }

    #[test]
    fn test_update_user_refreshes_session_and_guards_email() {
        let db = db();
        signup(&db, account("Bola", "bola@example.com")).unwrap();
        let (ada, _) = signup(&db, account("Ada", "ada@example.com")).unwrap();

        let updated = update_user(
            &db,
            &ada.id,
            ProfileUpdate {
                phone: Some("+2348000000000".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+2348000000000"));
        assert_eq!(updated.name, "Ada");
        assert_eq!(db.current_user().unwrap().unwrap().phone, updated.phone);

        let err = update_user(
            &db,
            &ada.id,
            ProfileUpdate {
                email: Some("bola@example.com".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateEmail));
    }

    #[test]
    fn test_update_unknown_user() {
        let db = db();
        let err = update_user(&db, "ghost", ProfileUpdate::default()).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(verify_password("correct-horse", &hash).unwrap());
        assert!(!verify_password("battery-staple", &hash).unwrap());
        assert!(verify_password("x", "not-a-hash").is_err());
    }
}
