use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    assigned_engine, review_engine, reviewee_engine, reviewer_engine, AdminDashboard,
    CvSubmission, DurableCredentialStore, QueueSurface, ReviewColumn, ReviewWorkflow,
    RevieweeColumn, ReviewerColumn, SessionGate, SortState,
};
use shared::domain::{Reviewee, RevieweeId, REVIEW_CRITERIA};

#[derive(Parser, Debug)]
#[command(name = "cvdesk", version, about = "CV review desk CLI")]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "http://127.0.0.1:8080",
        help = "Review service base URL"
    )]
    server_url: String,
    #[arg(long, global = true, help = "Override the per-user data directory")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and persist the session
    Login {
        name: String,
        #[arg(long)]
        password: String,
    },
    /// Drop the persisted session
    Logout,
    /// Show the active session
    Status,
    /// List your assigned CVs and quota
    Assigned {
        #[arg(long, value_enum)]
        sort: Option<RevieweeSortKey>,
        #[arg(long, default_value_t = false)]
        desc: bool,
    },
    /// Pull the next CV from the shared queue, without reviewing it
    Next,
    /// Pull the next CV and submit free-form comments for it
    ReviewNext {
        #[arg(long = "comment", required = true, help = "Repeat once per comment line")]
        comments: Vec<String>,
    },
    /// Print the six review prompts in submission order
    Criteria,
    /// Submit the six-field review for an assigned CV
    Review {
        reviewee_id: i64,
        #[arg(
            short = 'r',
            long = "rating",
            required = true,
            help = "Repeat six times, one per prompt, in order"
        )]
        ratings: Vec<String>,
    },
    /// Submit a CV as an applicant
    SubmitCv {
        #[arg(long)]
        name: String,
        #[arg(long)]
        roll_no: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        cv_link: String,
        #[arg(long)]
        profile: String,
    },
    /// Admin listings and the allocation trigger
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand, Debug)]
enum AdminCommands {
    /// List every submitted CV
    Reviewees {
        #[arg(long, value_enum)]
        sort: Option<RevieweeSortKey>,
        #[arg(long, default_value_t = false)]
        desc: bool,
    },
    /// List every reviewer and their workload
    Reviewers {
        #[arg(long, value_enum)]
        sort: Option<ReviewerSortKey>,
        #[arg(long, default_value_t = false)]
        desc: bool,
    },
    /// List every completed review
    Reviews {
        #[arg(long, value_enum)]
        sort: Option<ReviewSortKey>,
        #[arg(long, default_value_t = false)]
        desc: bool,
    },
    /// Assign unallocated CVs to reviewers
    Allocate,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RevieweeSortKey {
    Id,
    Name,
    Roll,
    Profile,
    Assigned,
    Status,
}

impl RevieweeSortKey {
    fn column(self) -> RevieweeColumn {
        match self {
            Self::Id => RevieweeColumn::Id,
            Self::Name => RevieweeColumn::Name,
            Self::Roll => RevieweeColumn::RollNo,
            Self::Profile => RevieweeColumn::Profile,
            Self::Assigned => RevieweeColumn::AssignedTo,
            Self::Status => RevieweeColumn::Status,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReviewerSortKey {
    Id,
    Name,
    Profiles,
    Reviewed,
    Assigned,
}

impl ReviewerSortKey {
    fn column(self) -> ReviewerColumn {
        match self {
            Self::Id => ReviewerColumn::Id,
            Self::Name => ReviewerColumn::Name,
            Self::Profiles => ReviewerColumn::Profiles,
            Self::Reviewed => ReviewerColumn::ReviewedCount,
            Self::Assigned => ReviewerColumn::AssignedCvs,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReviewSortKey {
    Id,
    Reviewee,
    Reviewer,
    Time,
}

impl ReviewSortKey {
    fn column(self) -> ReviewColumn {
        match self {
            Self::Id => ReviewColumn::Id,
            Self::Reviewee => ReviewColumn::Reviewee,
            Self::Reviewer => ReviewColumn::Reviewer,
            Self::Time => ReviewColumn::SubmissionTime,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Login { name, password } => {
            let gate = open_gate(&cli).await?;
            let credential = gate.acquire(name, password).await?;
            println!("Logged in as {}.", credential.principal.name);
        }
        Commands::Logout => {
            let gate = open_gate(&cli).await?;
            gate.clear().await?;
            println!("Session cleared.");
        }
        Commands::Status => {
            let gate = open_gate(&cli).await?;
            match gate.principal().await {
                Some(principal) => {
                    println!("Logged in as {} (role: {:?}).", principal.name, principal.role);
                    if !principal.profiles.is_empty() {
                        println!("Profiles: {}", principal.profiles.join(", "));
                    }
                }
                None => println!("Not logged in."),
            }
        }
        Commands::Assigned { sort, desc } => {
            let gate = open_gate(&cli).await?;
            let workflow = ReviewWorkflow::new(gate);
            workflow.load_assigned().await?;
            let snapshot = workflow.snapshot().await;
            let state = sort_state(sort.map(RevieweeSortKey::column), *desc);
            let rows = assigned_engine().order(&snapshot.assigned, state);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                let headers = vec![
                    header("ID", RevieweeColumn::Id, state),
                    header("Name", RevieweeColumn::Name, state),
                    header("Roll No", RevieweeColumn::RollNo, state),
                    header("Profile", RevieweeColumn::Profile, state),
                    header("Status", RevieweeColumn::Status, state),
                ];
                let cells = rows
                    .iter()
                    .map(|cv| {
                        vec![
                            cv.reviewee.id.0.to_string(),
                            cv.reviewee.name.clone(),
                            cv.reviewee.roll_no.clone(),
                            cv.reviewee.profile.clone(),
                            status_label(cv.reviewee.status).to_string(),
                        ]
                    })
                    .collect::<Vec<_>>();
                render_table(&headers, &cells);
                if let Some(reviewer) = snapshot.reviewer {
                    println!();
                    println!(
                        "Reviewed {} of {}.",
                        reviewer.reviewed_count, reviewer.reviews_number
                    );
                }
            }
        }
        Commands::Next => {
            let gate = open_gate(&cli).await?;
            let workflow = ReviewWorkflow::new(gate);
            workflow.load_assigned().await?;
            workflow.fetch_next().await?;
            if let QueueSurface::Loaded { reviewee } = workflow.queue().await {
                print_reviewee(&reviewee);
            } else {
                println!("The queue is empty.");
            }
        }
        Commands::ReviewNext { comments } => {
            let gate = open_gate(&cli).await?;
            let workflow = ReviewWorkflow::new(gate);
            workflow.load_assigned().await?;
            workflow.fetch_next().await?;
            let QueueSurface::Loaded { reviewee } = workflow.queue().await else {
                println!("The queue is empty; nothing to review.");
                return Ok(());
            };
            print_reviewee(&reviewee);
            workflow.set_queue_draft(comments.join("\n")).await;
            workflow.submit_queue_review().await?;
            println!("Review submitted for {}.", reviewee.name);
            if let Some(reviewer) = workflow.reviewer().await {
                println!(
                    "Reviewed {} of {}.",
                    reviewer.reviewed_count, reviewer.reviews_number
                );
            }
        }
        Commands::Criteria => {
            for (index, prompt) in REVIEW_CRITERIA.iter().enumerate() {
                println!("{}. {prompt}", index + 1);
            }
        }
        Commands::Review {
            reviewee_id,
            ratings,
        } => {
            if ratings.len() != REVIEW_CRITERIA.len() {
                return Err(anyhow!(
                    "expected {} ratings, one per prompt, in order: {}",
                    REVIEW_CRITERIA.len(),
                    REVIEW_CRITERIA.join(", ")
                ));
            }
            let gate = open_gate(&cli).await?;
            let workflow = ReviewWorkflow::new(gate);
            workflow.load_assigned().await?;
            workflow.open_assigned(RevieweeId(*reviewee_id)).await?;
            for (index, rating) in ratings.iter().enumerate() {
                workflow.set_rating(index, rating.clone()).await?;
            }
            workflow.submit_assigned_review().await?;
            println!("Review submitted for reviewee {reviewee_id}.");
        }
        Commands::SubmitCv {
            name,
            roll_no,
            email,
            cv_link,
            profile,
        } => {
            let gate = open_gate(&cli).await?;
            let submission = CvSubmission {
                name: name.clone(),
                roll_no: roll_no.clone(),
                email: email.clone(),
                cv_link: cv_link.clone(),
                profile: profile.clone(),
            };
            submission.submit(&gate).await?;
            println!("CV submitted for {}.", submission.name);
        }
        Commands::Admin { command } => {
            let gate = open_gate(&cli).await?;
            let dashboard = AdminDashboard::new(gate);
            run_admin(&cli, &dashboard, command).await?;
        }
    }

    Ok(())
}

async fn run_admin(cli: &Cli, dashboard: &AdminDashboard, command: &AdminCommands) -> Result<()> {
    match command {
        AdminCommands::Reviewees { sort, desc } => {
            dashboard.load_all().await?;
            let state = sort_state(sort.map(RevieweeSortKey::column), *desc);
            let rows = reviewee_engine().order(&dashboard.reviewees().await, state);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            let headers = vec![
                header("ID", RevieweeColumn::Id, state),
                header("Name", RevieweeColumn::Name, state),
                header("Roll No", RevieweeColumn::RollNo, state),
                header("Profile", RevieweeColumn::Profile, state),
                header("Assigned To", RevieweeColumn::AssignedTo, state),
                header("Status", RevieweeColumn::Status, state),
            ];
            let cells = rows
                .iter()
                .map(|reviewee| {
                    vec![
                        reviewee.id.0.to_string(),
                        reviewee.name.clone(),
                        reviewee.roll_no.clone(),
                        reviewee.profile.clone(),
                        reviewee
                            .assigned_to_id
                            .map(|id| id.0.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        status_label(reviewee.status).to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            render_table(&headers, &cells);
        }
        AdminCommands::Reviewers { sort, desc } => {
            dashboard.load_all().await?;
            let state = sort_state(sort.map(ReviewerSortKey::column), *desc);
            let rows = reviewer_engine().order(&dashboard.reviewers().await, state);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            let headers = vec![
                header("ID", ReviewerColumn::Id, state),
                header("Name", ReviewerColumn::Name, state),
                header("Profiles", ReviewerColumn::Profiles, state),
                header("Reviewed", ReviewerColumn::ReviewedCount, state),
                header("Assigned CVs", ReviewerColumn::AssignedCvs, state),
            ];
            let cells = rows
                .iter()
                .map(|reviewer| {
                    vec![
                        reviewer.id.0.to_string(),
                        reviewer.name.clone(),
                        reviewer.profiles.join(", "),
                        format!("{}/{}", reviewer.reviewed_count, reviewer.reviews_number),
                        reviewer.assigned_cvs.len().to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            render_table(&headers, &cells);
        }
        AdminCommands::Reviews { sort, desc } => {
            dashboard.load_all().await?;
            let state = sort_state(sort.map(ReviewSortKey::column), *desc);
            let rows = review_engine().order(&dashboard.reviews().await, state);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            let headers = vec![
                header("ID", ReviewColumn::Id, state),
                header("Reviewee", ReviewColumn::Reviewee, state),
                header("Reviewer", ReviewColumn::Reviewer, state),
                header("Submitted", ReviewColumn::SubmissionTime, state),
                "Comments".to_string(),
            ];
            let cells = rows
                .iter()
                .map(|review| {
                    vec![
                        review.id.0.to_string(),
                        review.reviewee.name.clone(),
                        review.reviewer.name.clone(),
                        review.submission_time.format("%Y-%m-%d %H:%M").to_string(),
                        review.comments.join("; "),
                    ]
                })
                .collect::<Vec<_>>();
            render_table(&headers, &cells);
        }
        AdminCommands::Allocate => {
            dashboard.allocate().await?;
            let reviewees = dashboard.reviewees().await;
            let assigned = reviewees
                .iter()
                .filter(|reviewee| reviewee.assigned_to_id.is_some())
                .count();
            println!(
                "Allocation complete: {assigned} of {} CVs assigned.",
                reviewees.len()
            );
        }
    }
    Ok(())
}

async fn open_gate(cli: &Cli) -> Result<Arc<SessionGate>> {
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => default_data_dir()?,
    };
    let store = DurableCredentialStore::open_in_dir(&data_dir).await?;
    let gate = Arc::new(SessionGate::new(&cli.server_url, Arc::new(store))?);
    gate.restore().await;
    Ok(gate)
}

fn default_data_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home).join(".cvdesk"));
        }
    }
    #[cfg(target_os = "windows")]
    {
        if let Ok(profile) = std::env::var("USERPROFILE") {
            if !profile.trim().is_empty() {
                return Ok(PathBuf::from(profile).join(".cvdesk"));
            }
        }
    }
    Err(anyhow!(
        "no usable per-user directory found; pass --data-dir"
    ))
}

/// Builds the state a header click sequence would have produced: one click
/// for ascending, two for descending.
fn sort_state<C: Copy + PartialEq>(column: Option<C>, descending: bool) -> SortState<C> {
    let mut state = SortState::default();
    if let Some(column) = column {
        state.cycle(column);
        if descending {
            state.cycle(column);
        }
    }
    state
}

fn header<C: Copy + PartialEq>(label: &str, column: C, state: SortState<C>) -> String {
    format!("{label} {}", state.indicator(column))
}

fn status_label(reviewed: bool) -> &'static str {
    if reviewed {
        "reviewed"
    } else {
        "pending"
    }
}

fn print_reviewee(reviewee: &Reviewee) {
    println!("Next CV: {} ({})", reviewee.name, reviewee.roll_no);
    println!("Profile: {}", reviewee.profile);
    println!("CV link: {}", reviewee.cv_link);
}

fn render_table(headers: &[String], rows: &[Vec<String>]) {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, head)| {
            rows.iter()
                .map(|row| row[index].chars().count())
                .chain([head.chars().count()])
                .max()
                .unwrap_or(0)
        })
        .collect();
    print_row(headers, &widths);
    for row in rows {
        print_row(row, &widths);
    }
}

fn print_row(cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", line.trim_end());
}
