use chrono::Utc;
use tracing::{info, warn};

use crate::auth::require_user;
use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{NotificationKind, PointsTransaction, TransactionKind, User};
use crate::notifications::{self, NewNotification};
use crate::repo::generate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPackage {
    pub id: &'static str,
    /// Price in naira.
    pub price: u64,
    /// Points granted, bonus included.
    pub points: i64,
    pub bonus: i64,
    pub popular: bool,
}

pub const PACKAGES: [PricingPackage; 4] = [
    PricingPackage { id: "1", price: 1_000, points: 10, bonus: 0, popular: false },
    PricingPackage { id: "2", price: 2_000, points: 21, bonus: 1, popular: true },
    PricingPackage { id: "3", price: 5_000, points: 55, bonus: 5, popular: false },
    PricingPackage { id: "4", price: 10_000, points: 120, bonus: 20, popular: false },
];

pub fn find_package(id: &str) -> Option<&'static PricingPackage> {
    PACKAGES.iter().find(|p| p.id == id)
}

/// `1234567` -> `1,234,567`
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn apply(
    db: &Database,
    mut user: User,
    amount: i64,
    kind: TransactionKind,
    description: &str,
) -> ServiceResult<i64> {
    user.points = user
        .points
        .checked_add(amount)
        .ok_or(ServiceError::InvalidAmount(amount))?;
    if kind == TransactionKind::Usage {
        user.first_free_used = true;
    }
    db.put_item(&user)?;
    db.add_item(PointsTransaction {
        id: generate_id(),
        user_id: user.id.clone(),
        amount,
        kind,
        description: description.to_string(),
        created_at: Utc::now(),
        balance: user.points,
    })?;
    db.refresh_current_user(&user)?;
    Ok(user.points)
}

/// Credits `amount` and records it. Returns the new balance.
pub fn add_points(
    db: &Database,
    user_id: &str,
    amount: i64,
    kind: TransactionKind,
    description: &str,
) -> ServiceResult<i64> {
    if amount <= 0 {
        return Err(ServiceError::InvalidAmount(amount));
    }
    db.atomic(|| {
        let user = require_user(db, user_id)?;
        apply(db, user, amount, kind, description)
    })
}

/// Debits `amount`, refusing to take the balance below zero.
pub fn deduct_points(
    db: &Database,
    user_id: &str,
    amount: i64,
    kind: TransactionKind,
    description: &str,
) -> ServiceResult<i64> {
    if amount <= 0 {
        return Err(ServiceError::InvalidAmount(amount));
    }
    db.atomic(|| {
        let user = require_user(db, user_id)?;
        if user.points < amount {
            warn!(user_id, required = amount, available = user.points, "insufficient points");
            return Err(ServiceError::InsufficientPoints {
                required: amount,
                available: user.points,
            });
        }
        apply(db, user, -amount, kind, description)
    })
}

/// Fails fast with `InsufficientPoints` when `user_id` cannot cover `cost`.
pub fn ensure_balance(db: &Database, user_id: &str, cost: i64) -> ServiceResult<()> {
    let user = require_user(db, user_id)?;
    if user.points < cost {
        return Err(ServiceError::InsufficientPoints {
            required: cost,
            available: user.points,
        });
    }
    Ok(())
}

/// Records a purchase. Payment is assumed to have succeeded.
pub fn purchase_points(
    db: &Database,
    user_id: &str,
    price_paid: u64,
    points_granted: i64,
) -> ServiceResult<i64> {
    let balance = db.atomic(|| {
        let balance = add_points(
            db,
            user_id,
            points_granted,
            TransactionKind::Purchase,
            &format!(
                "Purchased {points_granted} points for ₦{}",
                format_thousands(price_paid)
            ),
        )?;
        notifications::create(
            db,
            user_id,
            NewNotification {
                kind: NotificationKind::Success,
                title: "Points Added! 💰".to_string(),
                message: format!("{points_granted} points have been added to your wallet."),
                action_url: None,
            },
        )?;
        Ok(balance)
    })?;
    info!(user_id, points = points_granted, price = price_paid, "points purchased");
    Ok(balance)
}

pub fn purchase_package(db: &Database, user_id: &str, package_id: &str) -> ServiceResult<i64> {
    let package = find_package(package_id).ok_or_else(|| {
        ServiceError::Validation(format!("Unknown pricing package '{package_id}'"))
    })?;
    purchase_points(db, user_id, package.price, package.points)
}

/// Ledger entries for a user, newest first.
pub fn transactions(db: &Database, user_id: &str) -> ServiceResult<Vec<PointsTransaction>> {
    let mut txs: Vec<PointsTransaction> = db.items_owned_by(user_id)?;
    txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(txs)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub balance: i64,
    pub ledger_sum: i64,
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.balance == self.ledger_sum
    }
}

pub fn reconcile(db: &Database, user_id: &str) -> ServiceResult<Reconciliation> {
    let user = require_user(db, user_id)?;
    let ledger_sum = db
        .items_owned_by::<PointsTransaction>(user_id)?
        .iter()
        .map(|t| t.amount)
        .sum();
    Ok(Reconciliation {
        balance: user.points,
        ledger_sum,
    })
}
