//! Template-based stand-ins for the content generators. Nothing here calls a
//! model; output depends only on the inputs (plus a random match score).

use rand::Rng;

use crate::models::{FixType, InterviewQuestion};

const BASIC_IMPROVEMENTS: [&str; 4] = [
    "Fixed grammar and spelling errors",
    "Improved formatting and layout",
    "Standardized font and spacing",
    "Added proper section headings",
];

const SMART_IMPROVEMENTS: [&str; 5] = [
    "Optimized keywords for ATS (Applicant Tracking Systems)",
    "Quantified achievements with metrics",
    "Reordered sections for better impact",
    "Enhanced professional summary",
    "Aligned experience with job requirements",
];

const FULL_IMPROVEMENTS: [&str; 6] = [
    "Completely restructured CV layout",
    "Added industry-specific keywords",
    "Created compelling achievement statements",
    "Optimized for Nigerian job market",
    "Added skills section tailored to job description",
    "Improved visual hierarchy and readability",
];

/// Improvement list for a tier. Each tier extends the one below it.
pub fn improvements(fix_type: FixType) -> Vec<String> {
    let mut list: Vec<&str> = BASIC_IMPROVEMENTS.to_vec();
    if fix_type >= FixType::Smart {
        list.extend(SMART_IMPROVEMENTS);
    }
    if fix_type >= FixType::Full {
        list.extend(FULL_IMPROVEMENTS);
    }
    list.into_iter().map(str::to_string).collect()
}

/// Simulated match score in `[85, 100)`.
pub fn match_score() -> u32 {
    rand::thread_rng().gen_range(85..100)
}

pub fn fixed_cv(original: &str, fix_type: FixType) -> String {
    format!(
        "PROFESSIONAL CURRICULUM VITAE\n\n{original}\n\n[This CV has been optimized using {} fix type with ATS-friendly formatting and keyword optimization for Nigerian job market]",
        fix_type.as_str()
    )
}

/// First `max` characters of `text`, on a char boundary.
fn prefix_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn cover_letter(job_title: &str, company: &str, job_description: &str, signer: &str) -> String {
    let excerpt = prefix_chars(job_description, 200);
    format!(
        "Dear Hiring Manager,

I am writing to express my strong interest in the {job_title} position at {company}. With my background and skills aligned with the requirements outlined in your job description, I am confident in my ability to contribute effectively to your team.

{excerpt}...

Throughout my career, I have demonstrated excellence in delivering results and working collaboratively with diverse teams. I am particularly excited about the opportunity to bring my expertise to {company} and contribute to your continued success.

I am eager to discuss how my qualifications align with your needs. Thank you for considering my application.

Sincerely,
{signer}"
    )
}

fn question(question: String, answer: String, tips: [&str; 3]) -> InterviewQuestion {
    InterviewQuestion {
        question,
        suggested_answer: answer,
        tips: tips.iter().map(|t| t.to_string()).collect(),
    }
}

/// The fixed five-question set. Only the job title is interpolated.
pub fn interview_questions(job_title: &str) -> Vec<InterviewQuestion> {
    vec![
        question(
            format!("Tell me about yourself and why you're interested in this {job_title} role."),
            format!(
                "I'm a passionate professional with experience in {}. I'm excited about this opportunity because it aligns with my career goals and allows me to contribute my skills in a meaningful way.",
                job_title.to_lowercase()
            ),
            [
                "Keep your answer to 2-3 minutes",
                "Focus on relevant experiences",
                "Connect your background to the role",
            ],
        ),
        question(
            "What are your greatest strengths?".to_string(),
            "My greatest strengths include problem-solving, adaptability, and strong communication skills. I consistently deliver results under pressure and work well in team environments.".to_string(),
            [
                "Choose 2-3 relevant strengths",
                "Provide specific examples",
                "Relate strengths to job requirements",
            ],
        ),
        question(
            "Describe a challenging situation you faced and how you handled it.".to_string(),
            "In my previous role, I faced a tight deadline on a critical project. I organized the team, prioritized tasks, and we successfully delivered on time with high quality results.".to_string(),
            [
                "Use the STAR method (Situation, Task, Action, Result)",
                "Choose a relevant example",
                "Highlight your problem-solving skills",
            ],
        ),
        question(
            "What do you know about our company?".to_string(),
            "I've researched your company and I'm impressed by your commitment to innovation and excellence. Your recent achievements in the industry demonstrate strong leadership and vision.".to_string(),
            [
                "Research the company beforehand",
                "Mention specific achievements or values",
                "Show genuine enthusiasm",
            ],
        ),
        question(
            "Why should we hire you for this position?".to_string(),
            "I bring a unique combination of skills, experience, and enthusiasm that makes me an ideal fit. My track record of success and ability to learn quickly will allow me to make immediate contributions to your team.".to_string(),
            [
                "Highlight your unique value proposition",
                "Reference key job requirements",
                "Show confidence without arrogance",
            ],
        ),
    ]
}

pub fn interview_tips() -> Vec<String> {
    [
        "💼 Research the company thoroughly before the interview",
        "👔 Dress professionally and arrive 10-15 minutes early",
        "📱 Bring multiple copies of your CV and a notepad",
        "🎯 Prepare specific examples of your achievements",
        "🤝 Practice your handshake and maintain good eye contact",
        "💬 Prepare thoughtful questions to ask the interviewer",
        "😊 Show enthusiasm and positive body language",
        "📧 Send a thank-you email within 24 hours after the interview",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_improvement_tiers_are_strict_supersets() {
        let basic: HashSet<String> = improvements(FixType::Basic).into_iter().collect();
        let smart: HashSet<String> = improvements(FixType::Smart).into_iter().collect();
        let full: HashSet<String> = improvements(FixType::Full).into_iter().collect();

        assert_eq!(basic.len(), 4);
        assert!(basic.is_subset(&smart) && basic.len() < smart.len());
        assert!(smart.is_subset(&full) && smart.len() < full.len());
    }

    #[test]
    fn test_match_score_range() {
        for _ in 0..200 {
            let score = match_score();
            assert!((85..100).contains(&score));
        }
    }

    #[test]
    fn test_fixed_cv_wraps_original() {
        let fixed = fixed_cv("Jane Doe\nEngineer", FixType::Smart);
        assert!(fixed.starts_with("PROFESSIONAL CURRICULUM VITAE\n\nJane Doe\nEngineer"));
        assert!(fixed.contains("using smart fix type"));
    }

    #[test]
    fn test_cover_letter_truncates_description() {
        let description = "x".repeat(500);
        let letter = cover_letter("Product Manager", "FinTech Solutions", &description, "Ada");
        assert!(letter.contains("the Product Manager position at FinTech Solutions"));
        assert!(letter.contains(&format!("{}...", "x".repeat(200))));
        assert!(!letter.contains(&"x".repeat(201)));
        assert!(letter.ends_with("Sincerely,\nAda"));
    }

    #[test]
    fn test_prefix_chars_respects_multibyte() {
        assert_eq!(prefix_chars("₦₦₦", 2), "₦₦");
        assert_eq!(prefix_chars("short", 200), "short");
    }

    #[test]
    fn test_interview_questions_ignore_everything_but_title() {
        let a = interview_questions("Data Analyst");
        let b = interview_questions("Data Analyst");
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert!(a[0].question.contains("Data Analyst"));
        assert!(a[0].suggested_answer.contains("data analyst"));
        assert!(a.iter().all(|q| q.tips.len() == 3));
        assert_eq!(interview_tips().len(), 8);
    }
}
