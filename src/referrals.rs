use crate::db::Database;
use crate::error::ServiceResult;
use crate::models::{Referral, ReferralStatus};

/// Referrals credited to `user_id`, newest first.
pub fn list(db: &Database, user_id: &str) -> ServiceResult<Vec<Referral>> {
    let mut referrals: Vec<Referral> = db.items_owned_by(user_id)?;
    referrals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(referrals)
}

pub fn total_earned(db: &Database, user_id: &str) -> ServiceResult<i64> {
    Ok(list(db, user_id)?
        .iter()
        .filter(|r| r.status == ReferralStatus::Completed)
        .map(|r| r.points_earned)
        .sum())
}
