//! Fuelbank operator CLI
//!
//! Drives the same ledger operations the HTTP layer consumes, against the
//! configured storage backend. Output is JSON on stdout.
//!
//! ## Usage
//!
//! ```bash
//! # Overview counts
//! fuelbank stats
//!
//! # Credit a group and distribute across its members
//! fuelbank adjust-group 3 --points 9 --action add --apply-to-members --actor 1
//!
//! # Review a request
//! fuelbank approve 17 --actor 1
//!
//! # Export data for the report renderer
//! fuelbank export-group 3
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use fuelbank::db::requests::{Committee, RequestStatus};
use fuelbank::ledger::PointAction;
use fuelbank::{report, Config, Ledger, LedgerDb, LogSink, StorageBackend};

#[derive(Parser, Debug)]
#[command(name = "fuelbank")]
#[command(about = "Points ledger for gamified student committee work")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory for the ledger database
    #[arg(long, env = "FUELBANK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Use an in-memory database (state is lost on exit)
    #[arg(long)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Overview statistics
    Stats,
    /// A student's current total and fuel tanks
    Student { id: i64 },
    /// A group's current total with the members/direct split
    Group { id: i64 },
    /// List groups with totals
    ListGroups,
    /// List students with totals
    ListStudents,
    /// Create a group
    CreateGroup { name: String },
    /// Rename a group
    RenameGroup { id: i64, name: String },
    /// Delete a group, detaching its members
    DeleteGroup { id: i64 },
    /// Create a student with a generated login code
    CreateStudent {
        name: String,
        #[arg(long)]
        group: Option<i64>,
    },
    /// Update a student's name and group
    UpdateStudent {
        id: i64,
        name: String,
        #[arg(long)]
        group: Option<i64>,
    },
    /// Delete a student
    DeleteStudent { id: i64 },
    /// Hide or show a student's own points
    SetPointsHidden {
        id: i64,
        #[arg(long)]
        hidden: bool,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Add or subtract points for a student
    AdjustStudent {
        id: i64,
        #[arg(long)]
        points: i64,
        #[arg(long, value_parser = PointAction::from_str)]
        action: PointAction,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        actor: Option<i64>,
    },
    /// Add or subtract points for a group
    AdjustGroup {
        id: i64,
        #[arg(long)]
        points: i64,
        #[arg(long, value_parser = PointAction::from_str)]
        action: PointAction,
        #[arg(long)]
        apply_to_members: bool,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        actor: Option<i64>,
    },
    /// Apply a percentage change against a group's direct bucket
    AdjustGroupPercentage {
        id: i64,
        #[arg(long)]
        percentage: u32,
        #[arg(long, value_parser = PointAction::from_str)]
        action: PointAction,
        #[arg(long)]
        apply_to_members: bool,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        actor: Option<i64>,
    },
    /// File a task request for a student
    SubmitRequest {
        student: i64,
        #[arg(long, value_parser = Committee::from_str)]
        committee: Committee,
        #[arg(long)]
        points: i64,
        #[arg(long)]
        description: String,
    },
    /// List requests, optionally filtered by status
    Requests {
        #[arg(long, value_parser = RequestStatus::from_str)]
        status: Option<RequestStatus>,
    },
    /// Approve a pending request
    Approve {
        request: i64,
        #[arg(long)]
        actor: i64,
    },
    /// Reject a pending request
    Reject {
        request: i64,
        #[arg(long)]
        actor: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Recent operation log entries
    Log {
        #[arg(long, default_value_t = 200)]
        limit: u32,
    },
    /// A user's in-app notifications
    Notifications { user: i64 },
    /// Read one setting
    SettingGet { key: String },
    /// Write one setting
    SettingSet { key: String, value: Option<String> },
    /// List all settings
    Settings,
    /// Request activity for a week (current week by default)
    WeeklyReport {
        #[arg(long)]
        week: Option<u32>,
    },
    /// Export card for one student
    ExportStudent { id: i64 },
    /// Export sheet for one group
    ExportGroup { id: i64 },
    /// Export sheet for the whole roster
    ExportAll,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fuelbank=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if args.memory {
        config.backend = StorageBackend::Memory;
    }

    let db = Arc::new(LedgerDb::open_backend(&config)?);
    let ledger = Ledger::new(db, Arc::new(LogSink), config.weekly_request_limit);

    match args.command {
        Command::Stats => print_json(&ledger.overview_stats().await?)?,
        Command::Student { id } => print_json(&ledger.student_total(id).await?)?,
        Command::Group { id } => print_json(&ledger.group_total(id).await?)?,
        Command::ListGroups => print_json(&ledger.list_groups().await?)?,
        Command::ListStudents => print_json(&ledger.list_students().await?)?,
        Command::CreateGroup { name } => print_json(&ledger.create_group(&name).await?)?,
        Command::RenameGroup { id, name } => {
            ledger.rename_group(id, &name).await?;
            print_json(&ledger.group_total(id).await?)?;
        }
        Command::DeleteGroup { id } => {
            ledger.delete_group(id).await?;
            println!("deleted group {id}");
        }
        Command::CreateStudent { name, group } => {
            print_json(&ledger.create_student(&name, group).await?)?
        }
        Command::UpdateStudent { id, name, group } => {
            print_json(&ledger.update_student(id, &name, group).await?)?
        }
        Command::DeleteStudent { id } => {
            ledger.delete_student(id).await?;
            println!("deleted student {id}");
        }
        Command::SetPointsHidden { id, hidden, reason } => {
            ledger.set_points_hidden(id, hidden, reason.as_deref()).await?;
            print_json(&ledger.student_total(id).await?)?;
        }
        Command::AdjustStudent {
            id,
            points,
            action,
            reason,
            actor,
        } => print_json(
            &ledger
                .adjust_student_points(id, points, action, reason.as_deref(), actor)
                .await?,
        )?,
        Command::AdjustGroup {
            id,
            points,
            action,
            apply_to_members,
            reason,
            actor,
        } => print_json(
            &ledger
                .adjust_group_points(id, points, action, apply_to_members, reason.as_deref(), actor)
                .await?,
        )?,
        Command::AdjustGroupPercentage {
            id,
            percentage,
            action,
            apply_to_members,
            reason,
            actor,
        } => print_json(
            &ledger
                .adjust_group_percentage(
                    id,
                    percentage,
                    action,
                    apply_to_members,
                    reason.as_deref(),
                    actor,
                )
                .await?,
        )?,
        Command::SubmitRequest {
            student,
            committee,
            points,
            description,
        } => print_json(
            &ledger
                .submit_request(student, committee, &description, points)
                .await?,
        )?,
        Command::Requests { status } => print_json(&ledger.requests_by_status(status).await?)?,
        Command::Approve { request, actor } => {
            print_json(&ledger.approve_request(request, actor).await?)?
        }
        Command::Reject {
            request,
            actor,
            reason,
        } => print_json(&ledger.reject_request(request, actor, reason.as_deref()).await?)?,
        Command::Log { limit } => print_json(&ledger.points_log(limit).await?)?,
        Command::Notifications { user } => print_json(&ledger.notifications_for(user).await?)?,
        Command::SettingGet { key } => print_json(&ledger.setting(&key).await?)?,
        Command::SettingSet { key, value } => {
            ledger.set_setting(&key, value.as_deref()).await?;
            print_json(&ledger.settings().await?)?;
        }
        Command::Settings => print_json(&ledger.settings().await?)?,
        Command::WeeklyReport { week } => print_json(&report::weekly_report(&ledger, week)?)?,
        Command::ExportStudent { id } => print_json(&report::student_report(&ledger, id)?)?,
        Command::ExportGroup { id } => print_json(&report::group_report(&ledger, id)?)?,
        Command::ExportAll => print_json(&report::all_students_report(&ledger)?)?,
    }

    Ok(())
}
