use crate::db::{Database, SAMPLE_DATA_INITIALIZED_KEY, SAMPLE_JOBS_KEY};
use crate::error::ServiceResult;
use crate::models::SampleJob;
use crate::repo::generate_id;

fn job(
    title: &str,
    company: &str,
    location: &str,
    salary: &str,
    description: &str,
    requirements: [&str; 4],
    posted: &str,
) -> SampleJob {
    SampleJob {
        id: generate_id(),
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        employment_type: "Full-time".to_string(),
        salary: salary.to_string(),
        description: description.to_string(),
        requirements: requirements.iter().map(|r| r.to_string()).collect(),
        posted: posted.to_string(),
    }
}

/// Writes the demo postings once per store. Returns true if it seeded.
pub fn seed_sample_data(db: &Database) -> ServiceResult<bool> {
    if db.get::<bool>(SAMPLE_DATA_INITIALIZED_KEY)?.unwrap_or(false) {
        return Ok(false);
    }

    let jobs = vec![
        job(
            "Senior Software Engineer",
            "TechCorp Nigeria",
            "Lagos, Nigeria",
            "₦800,000 - ₦1,200,000/month",
            "We are looking for a senior software engineer with 5+ years of experience in React, Node.js, and cloud technologies.",
            ["5+ years experience", "React & Node.js", "Team leadership", "Excellent communication"],
            "2 days ago",
        ),
        job(
            "Product Manager",
            "FinTech Solutions",
            "Abuja, Nigeria",
            "₦600,000 - ₦900,000/month",
            "Join our team as a Product Manager to drive innovation in financial technology solutions.",
            ["3+ years PM experience", "Agile methodology", "Stakeholder management", "Data-driven"],
            "1 week ago",
        ),
        job(
            "Marketing Specialist",
            "Brand Masters",
            "Port Harcourt, Nigeria",
            "₦350,000 - ₦500,000/month",
            "Creative marketing specialist needed to develop and execute marketing campaigns.",
            ["2+ years experience", "Digital marketing", "Content creation", "Analytics"],
            "3 days ago",
        ),
    ];

    db.atomic(|| {
        db.set(SAMPLE_JOBS_KEY, &jobs)?;
        db.set(SAMPLE_DATA_INITIALIZED_KEY, &true)
    })?;
    Ok(true)
}

pub fn sample_jobs(db: &Database) -> ServiceResult<Vec<SampleJob>> {
    Ok(db.get(SAMPLE_JOBS_KEY)?.unwrap_or_default())
}

fn relevance(query: &str, job: &SampleJob) -> f64 {
    let query = query.to_lowercase();
    let title = job.title.to_lowercase();
    let company = job.company.to_lowercase();

    let mut score = strsim::jaro_winkler(&query, &title).max(strsim::jaro_winkler(&query, &company));
    // Substring hits outrank plain similarity
    if title.contains(&query) || company.contains(&query) {
        score += 1.0;
    } else if job.description.to_lowercase().contains(&query) {
        score += 0.5;
    }
    score
}

/// Sample jobs ranked against `query`, best first. Weak matches are dropped.
pub fn search(db: &Database, query: &str) -> ServiceResult<Vec<(SampleJob, f64)>> {
    let mut scored: Vec<(SampleJob, f64)> = sample_jobs(db)?
        .into_iter()
        .map(|job| {
            let score = relevance(query, &job);
            (job, score)
        })
        .filter(|(_, score)| *score >= 0.7)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    #[test]
    fn test_seed_runs_once() {
        let db = db();
        assert!(seed_sample_data(&db).unwrap());
        let first = sample_jobs(&db).unwrap();
        assert_eq!(first.len(), 3);

        assert!(!seed_sample_data(&db).unwrap());
        assert_eq!(sample_jobs(&db).unwrap(), first);
    }

    #[test]
    fn test_sample_jobs_empty_before_seed() {
        let db = db();
        assert!(sample_jobs(&db).unwrap().is_empty());
    }

    #[test]
    fn test_search_ranks_title_match_first() {
        let db = db();
        seed_sample_data(&db).unwrap();

        let results = search(&db, "product manager").unwrap();
        assert_eq!(results[0].0.title, "Product Manager");

        let results = search(&db, "Brand").unwrap();
        assert_eq!(results[0].0.company, "Brand Masters");
    }

    #[test]
    fn test_search_tolerates_typos() {
        let db = db();
        seed_sample_data(&db).unwrap();
        let results = search(&db, "Marketing Specalist").unwrap();
        assert_eq!(results[0].0.title, "Marketing Specialist");
    }
}
