mod applications;
mod auth;
mod config;
mod content;
mod db;
mod error;
mod generate;
mod jobs;
mod models;
mod notifications;
mod points;
mod referrals;
mod repo;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use content::{CvSubmission, JobBrief};
use db::Database;
use models::{ApplicationStatus, CvDocument, FileType, FixType};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowjob")]
#[command(about = "Job search assistant - CV fixes, cover letters, interview prep and application tracking")]
struct Cli {
    /// Database file (defaults to FLOWJOB_DB or the platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and seed the sample jobs
    Init,

    /// Create an account and sign in
    Signup {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Referral code of the friend who invited you
        #[arg(short, long)]
        referral_code: Option<String>,
    },

    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Edit profile fields
    Profile {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },

    /// Points wallet
    Points {
        #[command(subcommand)]
        command: PointsCommands,
    },

    /// CV fixes
    Cv {
        #[command(subcommand)]
        command: CvCommands,
    },

    /// Cover letters
    Letter {
        #[command(subcommand)]
        command: LetterCommands,
    },

    /// Interview preparation
    Prep {
        #[command(subcommand)]
        command: PrepCommands,
    },

    /// Track job applications
    Apply {
        #[command(subcommand)]
        command: ApplyCommands,
    },

    /// Show people you referred
    Referrals,

    /// Inbox
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },

    /// Browse sample job postings
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Dump the stored state as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum PointsCommands {
    /// Current balance
    Balance,

    /// Ledger entries, newest first
    History,

    /// List point packages
    Packages,

    /// Buy a point package
    Buy {
        /// Package ID (see `points packages`)
        package: String,
    },

    /// Compare the balance with the ledger
    Audit,
}

#[derive(Subcommand)]
enum CvCommands {
    /// Pay for and run a CV fix
    Fix {
        /// Path to CV file
        file: PathBuf,

        #[arg(short = 't', long = "type", value_enum, default_value = "basic")]
        fix_type: FixType,

        /// Job description to optimize against
        #[arg(short, long)]
        job_description: Option<String>,
    },

    /// Store a CV to fix later (no charge until `cv process`)
    Create {
        file: PathBuf,

        #[arg(short = 't', long = "type", value_enum, default_value = "basic")]
        fix_type: FixType,

        #[arg(short, long)]
        job_description: Option<String>,
    },

    /// Pay for and run the fix chosen at upload
    Process { id: String },

    /// List fix tiers and their cost
    Tiers,

    /// List your CVs
    List,

    /// Show a CV
    Show { id: String },
}

#[derive(Subcommand)]
enum LetterCommands {
    /// Generate a cover letter (1 point)
    Generate {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        description: String,
    },

    List,

    Show { id: String },
}

#[derive(Subcommand)]
enum PrepCommands {
    /// Generate interview questions (1 point)
    Generate {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    List,

    Show { id: String },
}

#[derive(Subcommand)]
enum ApplyCommands {
    /// Record a new application
    Add {
        /// CV ID used for the application
        #[arg(long)]
        cv: String,

        #[arg(long)]
        cover_letter: Option<String>,

        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        company: String,

        #[arg(short, long, default_value = "")]
        description: String,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Change an application's status
    Status {
        id: String,

        #[arg(value_enum)]
        status: ApplicationStatus,

        #[arg(short, long)]
        notes: Option<String>,
    },

    List,

    Show { id: String },
}

#[derive(Subcommand)]
enum NotificationCommands {
    List,

    /// Mark one notification as read
    Read { id: String },

    /// Mark everything as read
    ReadAll,

    /// Number of unread notifications
    Unread,
}

#[derive(Subcommand)]
enum JobCommands {
    List,

    /// Fuzzy search by title or company
    Search { query: String },
}

fn read_cv_file(path: &Path) -> Result<(String, String, FileType)> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read CV file: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "My CV".to_string());
    Ok((
        name,
        String::from_utf8_lossy(&bytes).into_owned(),
        FileType::from_path(path),
    ))
}

fn print_cv(cv: &CvDocument) {
    println!("CV {} ({})", cv.id, cv.name);
    println!("Status: {}", cv.status.as_str());
    if let Some(fix_type) = cv.fix_type {
        println!("Fix type: {} ({} points)", fix_type.name(), fix_type.cost());
    }
    if let Some(score) = cv.match_score {
        println!("Match score: {}%", score);
    }
    println!("Created: {}", cv.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(improvements) = &cv.improvements {
        println!("\nImprovements:");
        for item in improvements {
            println!("  - {}", item);
        }
    }
    match &cv.fixed_content {
        Some(fixed) => println!("\n--- Fixed CV ---\n{}", fixed),
        None => println!("\n--- Original ---\n{}", cv.original_content),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(path) = cli.db {
        config.db_path = path;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("flowjob=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let db = Database::open(&config.db_path)?;

    if !matches!(cli.command, Commands::Init) {
        db.ensure_initialized()?;
    }

    match cli.command {
        Commands::Init => {
            db.init()?;
            let seeded = jobs::seed_sample_data(&db)?;
            if let Some(path) = db.path() {
                println!("Database initialized at {}", path.display());
            }
            if seeded {
                println!("Sample jobs added.");
            }
        }

        Commands::Signup {
            name,
            email,
            password,
            referral_code,
        } => {
            let (user, _) = auth::signup(
                &db,
                auth::NewAccount {
                    name: &name,
                    email: &email,
                    password: &password,
                    referral_code: referral_code.as_deref(),
                },
            )?;
            println!("Welcome, {}! You have {} point(s).", user.name, user.points);
            println!("Your referral code: {}", user.referral_code);
        }

        Commands::Login { email, password } => {
            let (user, _) = auth::login(&db, &email, &password, config.verify_passwords)?;
            println!("Signed in as {} ({} day streak).", user.name, user.streak);
        }

        Commands::Logout => {
            auth::logout(&db)?;
            println!("Signed out.");
        }

        Commands::Whoami => match auth::current_session(&db)? {
            Some(session) => {
                let user = auth::session_user(&db, &session)?;
                println!("{} <{}>", user.name, user.email);
                if let Some(phone) = &user.phone {
                    println!("Phone: {}", phone);
                }
                println!("Points: {}", user.points);
                println!("Streak: {} day(s)", user.streak);
                println!("Referral code: {}", user.referral_code);
                if !user.first_free_used {
                    println!("Your free point is still unused.");
                }
                let unread = notifications::unread_count(&db, &session)?;
                if unread > 0 {
                    println!("Unread notifications: {}", unread);
                }
            }
            None => println!("Not signed in."),
        },

        Commands::Profile { name, email, phone } => {
            let session = auth::require_session(&db)?;
            let user = auth::update_user(
                &db,
                &session.user_id,
                auth::ProfileUpdate { name, email, phone },
            )?;
            println!("Profile updated: {} <{}>", user.name, user.email);
        }

        Commands::Points { command } => {
            let session = auth::require_session(&db)?;
            match command {
                PointsCommands::Balance => {
                    let user = auth::session_user(&db, &session)?;
                    println!("{} point(s)", user.points);
                }

                PointsCommands::History => {
                    let txs = points::transactions(&db, &session.user_id)?;
                    if txs.is_empty() {
                        println!("No transactions yet.");
                    } else {
                        println!("{:<17} {:<9} {:>7} {:>8}  {}", "DATE", "TYPE", "AMOUNT", "BALANCE", "DESCRIPTION");
                        println!("{}", "-".repeat(80));
                        for tx in txs {
                            println!(
                                "{:<17} {:<9} {:>+7} {:>8}  {}",
                                tx.created_at.format("%Y-%m-%d %H:%M"),
                                tx.kind.as_str(),
                                tx.amount,
                                tx.balance,
                                truncate(&tx.description, 34)
                            );
                        }
                    }
                }

                PointsCommands::Packages => {
                    println!("{:<4} {:>10} {:>7} {:>6}", "ID", "PRICE", "POINTS", "BONUS");
                    println!("{}", "-".repeat(30));
                    for pkg in points::PACKAGES {
                        println!(
                            "{:<4} {:>10} {:>7} {:>6}{}",
                            pkg.id,
                            format!("₦{}", points::format_thousands(pkg.price)),
                            pkg.points,
                            pkg.bonus,
                            if pkg.popular { "  (popular)" } else { "" }
                        );
                    }
                }

                PointsCommands::Buy { package } => {
                    let balance = points::purchase_package(&db, &session.user_id, &package)?;
                    println!("Purchase complete. Balance: {} point(s).", balance);
                }

                PointsCommands::Audit => {
                    let rec = points::reconcile(&db, &session.user_id)?;
                    println!("Balance:    {}", rec.balance);
                    println!("Ledger sum: {}", rec.ledger_sum);
                    if rec.is_balanced() {
                        println!("Ledger reconciles.");
                    } else {
                        println!("MISMATCH: ledger is off by {}", rec.balance - rec.ledger_sum);
                    }
                }
            }
        }

        Commands::Cv { command } => {
            let session = auth::require_session(&db)?;
            match command {
                CvCommands::Fix {
                    file,
                    fix_type,
                    job_description,
                } => {
                    let (name, original_content, file_type) = read_cv_file(&file)?;
                    println!("Optimizing {} ({})...", name, fix_type.name());
                    let cv = content::fix_cv(
                        &db,
                        &session,
                        &config.latency,
                        CvSubmission {
                            name: Some(name),
                            original_content,
                            job_description,
                            fix_type,
                            file_type,
                        },
                    )
                    .await?;
                    print_cv(&cv);
                }

                CvCommands::Create {
                    file,
                    fix_type,
                    job_description,
                } => {
                    let (name, original_content, file_type) = read_cv_file(&file)?;
                    let cv = content::create_cv(
                        &db,
                        &session,
                        CvSubmission {
                            name: Some(name),
                            original_content,
                            job_description,
                            fix_type,
                            file_type,
                        },
                    )?;
                    println!("Stored CV {} (pending).", cv.id);
                }

                CvCommands::Process { id } => {
                    let cv = content::process_fix(&db, &session, &config.latency, &id).await?;
                    print_cv(&cv);
                }

                CvCommands::Tiers => {
                    for tier in FixType::ALL {
                        println!(
                            "{:<6} {:<14} {} point(s)  {}",
                            tier.as_str(),
                            tier.name(),
                            tier.cost(),
                            tier.description()
                        );
                    }
                }

                CvCommands::List => {
                    let cvs = content::list_cvs(&db, &session)?;
                    if cvs.is_empty() {
                        println!("No CVs found.");
                    } else {
                        println!("{:<10} {:<11} {:<7} {:>6} {:<24}", "ID", "STATUS", "TIER", "SCORE", "NAME");
                        println!("{}", "-".repeat(62));
                        for cv in cvs {
                            println!(
                                "{:<10} {:<11} {:<7} {:>6} {:<24}",
                                cv.id,
                                cv.status.as_str(),
                                cv.fix_type.map(|f| f.as_str()).unwrap_or("-"),
                                cv.match_score.map(|s| format!("{}%", s)).unwrap_or_else(|| "-".to_string()),
                                truncate(&cv.name, 22)
                            );
                        }
                    }
                }

                CvCommands::Show { id } => {
                    let cv = content::get_cv(&db, &session, &id)?;
                    print_cv(&cv);
                }
            }
        }

        Commands::Letter { command } => {
            let session = auth::require_session(&db)?;
            match command {
                LetterCommands::Generate {
                    title,
                    company,
                    description,
                } => {
                    println!("Writing cover letter...");
                    let letter = content::generate_cover_letter(
                        &db,
                        &session,
                        &config.latency,
                        JobBrief {
                            job_title: title,
                            company,
                            job_description: description,
                        },
                    )
                    .await?;
                    println!("Cover letter {}\n", letter.id);
                    println!("{}", textwrap::fill(&letter.content, 80));
                }

                LetterCommands::List => {
                    let letters = content::list_cover_letters(&db, &session)?;
                    if letters.is_empty() {
                        println!("No cover letters found.");
                    } else {
                        println!("{:<10} {:<28} {:<20} {:<16}", "ID", "JOB TITLE", "COMPANY", "CREATED");
                        println!("{}", "-".repeat(76));
                        for letter in letters {
                            println!(
                                "{:<10} {:<28} {:<20} {:<16}",
                                letter.id,
                                truncate(&letter.job_title, 26),
                                truncate(&letter.company, 18),
                                letter.created_at.format("%Y-%m-%d %H:%M")
                            );
                        }
                    }
                }

                LetterCommands::Show { id } => {
                    let letter = content::get_cover_letter(&db, &session, &id)?;
                    println!("{} at {}\n", letter.job_title, letter.company);
                    println!("{}", textwrap::fill(&letter.content, 80));
                }
            }
        }

        Commands::Prep { command } => {
            let session = auth::require_session(&db)?;
            match command {
                PrepCommands::Generate { title, description } => {
                    println!("Preparing interview questions...");
                    let prep = content::generate_interview_prep(
                        &db,
                        &session,
                        &config.latency,
                        title,
                        description,
                    )
                    .await?;
                    print_prep(&prep);
                }

                PrepCommands::List => {
                    let preps = content::list_interview_preps(&db, &session)?;
                    if preps.is_empty() {
                        println!("No interview preps found.");
                    } else {
                        println!("{:<10} {:<36} {:<16}", "ID", "JOB TITLE", "CREATED");
                        println!("{}", "-".repeat(64));
                        for prep in preps {
                            println!(
                                "{:<10} {:<36} {:<16}",
                                prep.id,
                                truncate(&prep.job_title, 34),
                                prep.created_at.format("%Y-%m-%d %H:%M")
                            );
                        }
                    }
                }

                PrepCommands::Show { id } => {
                    let prep = content::get_interview_prep(&db, &session, &id)?;
                    print_prep(&prep);
                }
            }
        }

        Commands::Apply { command } => {
            let session = auth::require_session(&db)?;
            match command {
                ApplyCommands::Add {
                    cv,
                    cover_letter,
                    title,
                    company,
                    description,
                    notes,
                } => {
                    let app = applications::create(
                        &db,
                        &session,
                        applications::NewApplication {
                            cv_id: cv,
                            cover_letter_id: cover_letter,
                            job_title: title,
                            company,
                            job_description: description,
                            notes,
                        },
                    )?;
                    println!("Tracking application {} ({} at {}).", app.id, app.job_title, app.company);
                }

                ApplyCommands::Status { id, status, notes } => {
                    let app = applications::update_status(&db, &session, &id, status, notes)?;
                    println!("Application {} is now {}.", app.id, app.status.as_str());
                }

                ApplyCommands::List => {
                    let apps = applications::list(&db, &session)?;
                    if apps.is_empty() {
                        println!("No applications tracked.");
                    } else {
                        println!("{:<10} {:<10} {:<26} {:<20} {:<10}", "ID", "STATUS", "JOB TITLE", "COMPANY", "APPLIED");
                        println!("{}", "-".repeat(80));
                        for app in apps {
                            println!(
                                "{:<10} {:<10} {:<26} {:<20} {:<10}",
                                app.id,
                                app.status.as_str(),
                                truncate(&app.job_title, 24),
                                truncate(&app.company, 18),
                                app.applied_at.format("%Y-%m-%d")
                            );
                        }
                    }
                }

                ApplyCommands::Show { id } => {
                    let app = applications::get(&db, &session, &id)?;
                    println!("Application {}", app.id);
                    println!("Job: {} at {}", app.job_title, app.company);
                    println!("Status: {}", app.status.as_str());
                    println!("Applied: {}", app.applied_at.format("%Y-%m-%d %H:%M"));
                    println!("CV: {}", app.cv_id);
                    if let Some(letter) = &app.cover_letter_id {
                        println!("Cover letter: {}", letter);
                    }
                    if let Some(notes) = &app.notes {
                        println!("Notes: {}", notes);
                    }
                    if !app.job_description.is_empty() {
                        println!("\n--- Job Description ---\n{}", app.job_description);
                    }
                }
            }
        }

        Commands::Referrals => {
            let session = auth::require_session(&db)?;
            let user = auth::session_user(&db, &session)?;
            let list = referrals::list(&db, &session.user_id)?;
            println!("Your referral code: {}", user.referral_code);
            if list.is_empty() {
                println!("No referrals yet. Each friend who joins earns you {} points.", auth::REFERRAL_REWARD);
            } else {
                println!("{:<30} {:<10} {:>6} {:<10}", "EMAIL", "STATUS", "POINTS", "DATE");
                println!("{}", "-".repeat(60));
                for r in &list {
                    println!(
                        "{:<30} {:<10} {:>6} {:<10}",
                        truncate(&r.referred_email, 28),
                        r.status.as_str(),
                        r.points_earned,
                        r.created_at.format("%Y-%m-%d")
                    );
                }
                println!("\nTotal earned: {} points", referrals::total_earned(&db, &session.user_id)?);
            }
        }

        Commands::Notifications { command } => {
            let session = auth::require_session(&db)?;
            match command {
                NotificationCommands::List => {
                    let inbox = notifications::list(&db, &session)?;
                    if inbox.is_empty() {
                        println!("No notifications.");
                    }
                    for n in inbox {
                        let marker = if n.read { " " } else { "*" };
                        println!("{} {} {} - {}", marker, n.id, n.created_at.format("%Y-%m-%d %H:%M"), n.title);
                        println!("    {}", n.message);
                    }
                }

                NotificationCommands::Read { id } => {
                    notifications::mark_as_read(&db, &session, &id)?;
                    println!("Marked {} as read.", id);
                }

                NotificationCommands::ReadAll => {
                    let flipped = notifications::mark_all_as_read(&db, &session)?;
                    println!("Marked {} notification(s) as read.", flipped);
                }

                NotificationCommands::Unread => {
                    println!("{}", notifications::unread_count(&db, &session)?);
                }
            }
        }

        Commands::Jobs { command } => match command {
            JobCommands::List => {
                let postings = jobs::sample_jobs(&db)?;
                if postings.is_empty() {
                    println!("No sample jobs. Run 'flowjob init' to seed them.");
                }
                for job in postings {
                    println!("{} - {} ({})", job.title, job.company, job.location);
                    println!("    {} | {} | posted {}", job.employment_type, job.salary, job.posted);
                    println!("    {}", job.requirements.join(", "));
                }
            }

            JobCommands::Search { query } => {
                let results = jobs::search(&db, &query)?;
                if results.is_empty() {
                    println!("No jobs match '{}'.", query);
                } else {
                    println!("{:>6} {:<28} {:<20} {:<24}", "SCORE", "TITLE", "COMPANY", "LOCATION");
                    println!("{}", "-".repeat(80));
                    for (job, score) in results {
                        println!(
                            "{:>6.2} {:<28} {:<20} {:<24}",
                            score,
                            truncate(&job.title, 26),
                            truncate(&job.company, 18),
                            truncate(&job.location, 22)
                        );
                    }
                }
            }
        },

        Commands::Export { output } => {
            let snapshot = serde_json::to_string_pretty(&db.snapshot()?)?;
            if let Some(out_path) = output {
                std::fs::write(&out_path, &snapshot)
                    .with_context(|| format!("Failed to write to {}", out_path.display()))?;
                println!("State exported to: {}", out_path.display());
            } else {
                println!("{}", snapshot);
            }
        }
    }

    Ok(())
}

fn print_prep(prep: &models::InterviewPrep) {
    println!("Interview prep {} - {}\n", prep.id, prep.job_title);
    for (i, q) in prep.questions.iter().enumerate() {
        println!("{}. {}", i + 1, q.question);
        println!("{}", textwrap::indent(&textwrap::fill(&q.suggested_answer, 76), "   "));
        for tip in &q.tips {
            println!("   * {}", tip);
        }
        println!();
    }
    println!("General tips:");
    for tip in &prep.tips {
        println!("  {}", tip);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
