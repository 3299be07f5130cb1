use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repo::{Collection, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub points: i64,
    pub created_at: DateTime<Utc>,
    pub referral_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,
    pub first_free_used: bool,
    pub streak: u32,
    pub last_active_date: DateTime<Utc>,
}

/// Argon2 hash for a user, kept out of the user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: String,
    pub user_id: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Welcome,
    Purchase,
    Referral,
    Usage,
    Bonus,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Welcome => "welcome",
            TransactionKind::Purchase => "purchase",
            TransactionKind::Referral => "referral",
            TransactionKind::Usage => "usage",
            TransactionKind::Bonus => "bonus",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsTransaction {
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Balance after this entry was applied.
    pub balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FixType {
    Basic,
    Smart,
    Full,
}

impl FixType {
    pub const ALL: [FixType; 3] = [FixType::Basic, FixType::Smart, FixType::Full];

    pub fn cost(&self) -> i64 {
        match self {
            FixType::Basic => 1,
            FixType::Smart => 3,
            FixType::Full => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FixType::Basic => "Basic Refix",
            FixType::Smart => "Smart Rebuild",
            FixType::Full => "Full New CV",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FixType::Basic => "Quick grammar and formatting fixes",
            FixType::Smart => "AI-powered CV optimization",
            FixType::Full => "Complete professional makeover",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FixType::Basic => "basic",
            FixType::Smart => "smart",
            FixType::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CvStatus {
    Pending,
    Processing,
    Completed,
}

impl CvStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CvStatus::Pending => "pending",
            CvStatus::Processing => "processing",
            CvStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Text,
}

impl FileType {
    pub fn from_path(path: &std::path::Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => FileType::Pdf,
            Some("docx") | Some("doc") => FileType::Docx,
            _ => FileType::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvDocument {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub original_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_type: Option<FixType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvements: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub status: CvStatus,
    pub file_type: FileType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetter {
    pub id: String,
    pub user_id: String,
    pub job_title: String,
    pub company: String,
    pub job_description: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestion {
    pub question: String,
    pub suggested_answer: String,
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewPrep {
    pub id: String,
    pub user_id: String,
    pub job_title: String,
    pub job_description: String,
    pub questions: Vec<InterviewQuestion>,
    pub tips: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Reviewing,
    Interview,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: String,
    pub user_id: String,
    pub cv_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter_id: Option<String>,
    pub job_title: String,
    pub company: String,
    pub job_description: String,
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Completed,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: String,
    pub referrer_id: String,
    pub referred_email: String,
    pub status: ReferralStatus,
    pub points_earned: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Promo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

/// Demo posting shown on the jobs screen. Lives in the `sampleJobs` kv entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleJob {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "type")]
    pub employment_type: String,
    pub salary: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub posted: String,
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Credential {
    const COLLECTION: Collection = Collection::Credentials;
    fn id(&self) -> &str {
        &self.id
    }
    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl Record for PointsTransaction {
    const COLLECTION: Collection = Collection::Transactions;
    fn id(&self) -> &str {
        &self.id
    }
    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl Record for CvDocument {
    const COLLECTION: Collection = Collection::Cvs;
    fn id(&self) -> &str {
        &self.id
    }
    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl Record for CoverLetter {
    const COLLECTION: Collection = Collection::CoverLetters;
    fn id(&self) -> &str {
        &self.id
    }
    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl Record for InterviewPrep {
    const COLLECTION: Collection = Collection::InterviewPreps;
    fn id(&self) -> &str {
        &self.id
    }
    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl Record for JobApplication {
    const COLLECTION: Collection = Collection::JobApplications;
    fn id(&self) -> &str {
        &self.id
    }
    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl Record for Referral {
    const COLLECTION: Collection = Collection::Referrals;
    fn id(&self) -> &str {
        &self.id
    }
    fn owner_id(&self) -> Option<&str> {
        Some(&self.referrer_id)
    }
}

impl Record for Notification {
    const COLLECTION: Collection = Collection::Notifications;
    fn id(&self) -> &str {
        &self.id
    }
    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_fix_type_costs_ascend() {
        let costs: Vec<i64> = FixType::ALL.iter().map(|f| f.cost()).collect();
        assert_eq!(costs, vec![1, 3, 5]);
    }

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_path(Path::new("cv.PDF")), FileType::Pdf);
        assert_eq!(FileType::from_path(Path::new("cv.docx")), FileType::Docx);
        assert_eq!(FileType::from_path(Path::new("cv.md")), FileType::Text);
        assert_eq!(FileType::from_path(Path::new("cv")), FileType::Text);
    }

    #[test]
    fn test_transaction_serializes_with_source_field_names() {
        let tx = PointsTransaction {
            id: "abc".to_string(),
            user_id: "u1".to_string(),
            amount: -3,
            kind: TransactionKind::Usage,
            description: "Smart Rebuild - CV Fix".to_string(),
            created_at: Utc::now(),
            balance: 2,
        };
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["type"], "usage");
        assert_eq!(value["balance"], 2);
    }

    #[test]
    fn test_user_optional_fields_omitted() {
        let user = User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            points: 1,
            created_at: Utc::now(),
            referral_code: "ADAX1Y2Z".to_string(),
            referred_by: None,
            first_free_used: false,
            streak: 0,
            last_active_date: Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("phone").is_none());
        assert!(value.get("referredBy").is_none());
        assert_eq!(value["referralCode"], "ADAX1Y2Z");
        let back: User = serde_json::from_value(value).unwrap();
        assert_eq!(back, user);
    }
}
