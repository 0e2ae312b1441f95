//! Ledger service
//!
//! The operation surface callers (HTTP layer, CLI, exporters) go through.
//! Reads recompute totals from source rows on every call. Mutating group
//! operations are serialized by a per-group write lock so the multiple
//! statements of one logical operation never interleave with another
//! writer's for the same group.
//!
//! Every mutating operation is local-first: validation happens before any
//! write, and once the primary ledger write has succeeded, best-effort
//! writes (operation log, in-app notifications, propagation, push dispatch)
//! are logged and swallowed rather than failing the operation.

pub mod allocation;
pub mod propagation;
pub mod totals;

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};
use tracing::warn;

use crate::db::oplog::OplogEntry;
use crate::db::requests::{Committee, RequestRow, RequestStatus};
use crate::db::{
    adjustments, groups, notifications, oplog, requests, settings, students, DbStats, GroupRow,
    LedgerDb, NotificationRow, OplogRow, StudentRow,
};
use crate::error::LedgerError;
use crate::fuel::{FuelGrade, FuelTanks};
use crate::notify::{self, PushKind, PushMessage, PushSink};
use crate::week;

pub use allocation::{BulkOutcome, PercentageOutcome, PointAction};
pub use totals::{GroupBreakdown, MemberTotal};

/// A student's current standing
#[derive(Debug, Clone, Serialize)]
pub struct StudentTotal {
    pub student_id: i64,
    pub name: String,
    pub total_points: i64,
    pub fuel: FuelTanks,
    pub total_liters: u64,
    pub points_hidden: bool,
    pub weekly_requests_used: u32,
    pub weekly_requests_limit: u32,
}

/// A group's current standing with the members/direct split
#[derive(Debug, Clone, Serialize)]
pub struct GroupTotal {
    pub group_id: i64,
    pub name: String,
    pub members_points: i64,
    pub direct_points: i64,
    pub total_points: i64,
    pub fuel: FuelTanks,
    pub total_liters: u64,
    pub members: Vec<MemberTotal>,
}

/// Group listing entry
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: i64,
    pub name: String,
    pub student_count: u32,
    pub members_points: i64,
    pub direct_points: i64,
    pub total_points: i64,
}

/// Student listing entry
#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    #[serde(flatten)]
    pub student: StudentRow,
    pub total_points: i64,
}

/// Result of a bulk group adjustment
#[derive(Debug, Clone, Serialize)]
pub struct GroupAdjustResult {
    pub message: String,
    pub outcome: BulkOutcome,
    pub group: GroupTotal,
}

/// Result of a percentage group adjustment
#[derive(Debug, Clone, Serialize)]
pub struct GroupPercentageResult {
    pub message: String,
    pub outcome: PercentageOutcome,
    pub group: GroupTotal,
}

/// The points ledger service
pub struct Ledger {
    db: Arc<LedgerDb>,
    push: Arc<dyn PushSink>,
    group_locks: DashMap<i64, Arc<TokioMutex<()>>>,
    weekly_request_limit: u32,
}

impl Ledger {
    pub fn new(db: Arc<LedgerDb>, push: Arc<dyn PushSink>, weekly_request_limit: u32) -> Self {
        Self {
            db,
            push,
            group_locks: DashMap::new(),
            weekly_request_limit,
        }
    }

    /// Ledger with the logging push sink and default quota
    pub fn with_db(db: Arc<LedgerDb>) -> Self {
        Self::new(db, Arc::new(notify::LogSink), 20)
    }

    pub fn db(&self) -> &Arc<LedgerDb> {
        &self.db
    }

    /// Acquire the single-writer lock for a group
    async fn lock_group(&self, group_id: i64) -> OwnedMutexGuard<()> {
        let lock = self
            .group_locks
            .entry(group_id)
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    // ==================== Reads ====================

    pub async fn student_total(&self, student_id: i64) -> Result<StudentTotal, LedgerError> {
        let limit = self.weekly_request_limit;
        self.db.with_conn(|conn| {
            let student = students::get(conn, student_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("student {student_id}")))?;
            let total = totals::student_total(conn, student_id)?;
            let fuel = FuelTanks::quantize(total);
            let week = week::current_week_number();
            Ok(StudentTotal {
                student_id,
                name: student.name,
                total_points: total,
                fuel,
                total_liters: fuel.total_liters(),
                points_hidden: student.points_hidden,
                weekly_requests_used: requests::weekly_count(conn, student_id, week)?,
                weekly_requests_limit: limit,
            })
        })
    }

    pub async fn group_total(&self, group_id: i64) -> Result<GroupTotal, LedgerError> {
        self.db.with_conn(|conn| group_total_inner(conn, group_id))
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupSummary>, LedgerError> {
        self.db.with_conn(|conn| {
            let mut out = Vec::new();
            for group in groups::list(conn)? {
                let breakdown = totals::group_breakdown(conn, group.id)?;
                out.push(GroupSummary {
                    id: group.id,
                    name: group.name,
                    student_count: group.student_count,
                    members_points: breakdown.members_points,
                    direct_points: breakdown.direct_points,
                    total_points: breakdown.total(),
                });
            }
            Ok(out)
        })
    }

    pub async fn list_students(&self) -> Result<Vec<StudentSummary>, LedgerError> {
        self.db.with_conn(|conn| {
            let mut out = Vec::new();
            for student in students::list(conn)? {
                let total_points = totals::student_total(conn, student.id)?;
                out.push(StudentSummary {
                    student,
                    total_points,
                });
            }
            Ok(out)
        })
    }

    /// Login-code lookup for the authentication collaborator
    pub async fn student_by_code(&self, code: &str) -> Result<Option<StudentRow>, LedgerError> {
        self.db.with_conn(|conn| students::get_by_code(conn, code))
    }

    pub async fn overview_stats(&self) -> Result<DbStats, LedgerError> {
        self.db.stats()
    }

    pub async fn points_log(&self, limit: u32) -> Result<Vec<OplogRow>, LedgerError> {
        self.db.with_conn(|conn| oplog::recent(conn, limit))
    }

    // ==================== Student point adjustments ====================

    /// Add or subtract points for one student.
    ///
    /// Subtraction must not exceed the student's current total. Depending on
    /// the propagation settings the same delta may also be mirrored into the
    /// student's group direct bucket.
    pub async fn adjust_student_points(
        &self,
        student_id: i64,
        points: i64,
        action: PointAction,
        reason: Option<&str>,
        actor: Option<i64>,
    ) -> Result<StudentTotal, LedgerError> {
        if points < 1 {
            return Err(LedgerError::InvalidArgument(
                "points must be at least 1".to_string(),
            ));
        }

        let student = self
            .db
            .with_conn(|conn| students::get(conn, student_id))?
            .ok_or_else(|| LedgerError::NotFound(format!("student {student_id}")))?;

        // Serialize against group bulk operations touching the same member
        let _guard = match student.group_id {
            Some(group_id) => Some(self.lock_group(group_id).await),
            None => None,
        };

        let default_reason = match action {
            PointAction::Add => "manual point addition",
            PointAction::Subtract => "manual point deduction",
        };
        let reason = reason.unwrap_or(default_reason).to_string();
        let signed = action.signed(points);

        let new_total = self.db.with_conn(|conn| {
            let current = totals::student_total(conn, student_id)?;
            if action == PointAction::Subtract && points > current {
                return Err(LedgerError::InsufficientBalance {
                    requested: points,
                    available: current,
                });
            }

            adjustments::insert_student_adjustment(conn, student_id, signed, &reason, actor)?;

            // Everything past the primary write is best-effort
            match propagation::PourSettings::load(conn) {
                Ok(pour) => {
                    if let Some(group_id) = student.group_id {
                        if pour.pours_manual(action) {
                            if let Err(e) = propagation::pour_manual_adjustment(
                                conn, group_id, signed, &reason, actor,
                            ) {
                                warn!("propagation failed for student {student_id}: {e}");
                            }
                        }
                    }
                }
                Err(e) => warn!("could not load propagation settings: {e}"),
            }

            if let Err(e) = oplog::append(
                conn,
                &OplogEntry {
                    operation_type: action.as_str(),
                    target_type: "student",
                    target_id: student_id,
                    group_id: student.group_id,
                    points: Some(points),
                    percentage: None,
                    reason: &reason,
                    performed_by: actor,
                },
            ) {
                warn!("operation log append failed: {e}");
            }

            let new_total = current + signed;
            let (title, body) = student_points_message(action, points, new_total);
            if let Err(e) = notifications::insert(conn, student_id, &title, &body) {
                warn!("in-app notification failed for student {student_id}: {e}");
            }

            Ok(new_total)
        })?;

        let kind = match action {
            PointAction::Add => PushKind::PointsAdded,
            PointAction::Subtract => PushKind::PointsSubtracted,
        };
        let (title, body) = student_points_message(action, points, new_total);
        notify::dispatch(&self.push, PushMessage::to_user(student_id, kind, &title, &body));

        self.student_total(student_id).await
    }

    // ==================== Group point adjustments ====================

    /// Bulk add/subtract against a group, optionally distributed to members
    pub async fn adjust_group_points(
        &self,
        group_id: i64,
        points: i64,
        action: PointAction,
        apply_to_members: bool,
        reason: Option<&str>,
        actor: Option<i64>,
    ) -> Result<GroupAdjustResult, LedgerError> {
        let _guard = self.lock_group(group_id).await;

        let default_reason = match action {
            PointAction::Add => "group points added",
            PointAction::Subtract => "group points deducted",
        };
        let reason = reason.unwrap_or(default_reason).to_string();

        let (outcome, member_ids) = self.db.with_conn(|conn| {
            let outcome = allocation::bulk_adjust(
                conn,
                group_id,
                points,
                action,
                apply_to_members,
                &reason,
                actor,
            )?;

            if let Err(e) = oplog::append(
                conn,
                &OplogEntry {
                    operation_type: action.as_str(),
                    target_type: "group",
                    target_id: group_id,
                    group_id: Some(group_id),
                    points: Some(points),
                    percentage: None,
                    reason: &reason,
                    performed_by: actor,
                },
            ) {
                warn!("operation log append failed: {e}");
            }

            let member_ids = groups::member_ids(conn, group_id)?;
            let (title, body) =
                group_points_message(&outcome.group_name, action, points, apply_to_members);
            for &member_id in &member_ids {
                if let Err(e) = notifications::insert(conn, member_id, &title, &body) {
                    warn!("in-app notification failed for student {member_id}: {e}");
                }
            }

            Ok((outcome, member_ids))
        })?;

        let (title, body) =
            group_points_message(&outcome.group_name, action, points, apply_to_members);
        notify::dispatch(
            &self.push,
            PushMessage::to_users(member_ids, PushKind::GroupPoints, &title, &body),
        );

        let group = self.group_total(group_id).await?;
        let message = format!(
            "{} {} points {}",
            match action {
                PointAction::Add => "added",
                PointAction::Subtract => "subtracted",
            },
            points,
            if apply_to_members {
                "(distributed to members)"
            } else {
                "(to the group directly)"
            }
        );

        Ok(GroupAdjustResult {
            message,
            outcome,
            group,
        })
    }

    /// Percentage add/subtract against a group's direct bucket
    pub async fn adjust_group_percentage(
        &self,
        group_id: i64,
        percentage: u32,
        action: PointAction,
        apply_to_members: bool,
        reason: Option<&str>,
        actor: Option<i64>,
    ) -> Result<GroupPercentageResult, LedgerError> {
        let _guard = self.lock_group(group_id).await;

        let default_reason = match action {
            PointAction::Add => format!("{percentage}% increase"),
            PointAction::Subtract => format!("{percentage}% decrease"),
        };
        let reason = reason.map(str::to_string).unwrap_or(default_reason);

        let outcome = self.db.with_conn(|conn| {
            let outcome = allocation::percentage_adjust(
                conn,
                group_id,
                percentage,
                action,
                apply_to_members,
                &reason,
                actor,
            )?;

            let operation_type = match action {
                PointAction::Add => "percentage_add",
                PointAction::Subtract => "percentage_subtract",
            };
            if let Err(e) = oplog::append(
                conn,
                &OplogEntry {
                    operation_type,
                    target_type: "group",
                    target_id: group_id,
                    group_id: Some(group_id),
                    points: None,
                    percentage: Some(percentage),
                    reason: &reason,
                    performed_by: actor,
                },
            ) {
                warn!("operation log append failed: {e}");
            }

            Ok(outcome)
        })?;

        let group = self.group_total(group_id).await?;
        let message = match action {
            PointAction::Add => format!("applied a {percentage}% increase"),
            PointAction::Subtract => format!("applied a {percentage}% decrease"),
        };

        Ok(GroupPercentageResult {
            message,
            outcome,
            group,
        })
    }

    // ==================== Requests ====================

    /// File a pending task request, subject to the weekly quota
    pub async fn submit_request(
        &self,
        student_id: i64,
        committee: Committee,
        description: &str,
        points: i64,
    ) -> Result<RequestRow, LedgerError> {
        if !(1..=5).contains(&points) {
            return Err(LedgerError::InvalidArgument(format!(
                "request points must be within 1..=5, got {points}"
            )));
        }
        if description.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "request description must not be empty".to_string(),
            ));
        }

        let limit = self.weekly_request_limit;
        let (request_id, student_name, limit_reached) = self.db.with_conn(|conn| {
            let student = students::get(conn, student_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("student {student_id}")))?;

            let week_number = week::current_week_number();
            let used = requests::weekly_count(conn, student_id, week_number)?;
            if used >= limit {
                return Err(LedgerError::InvalidArgument(format!(
                    "weekly request limit reached ({limit} requests per week)"
                )));
            }

            let request_id = requests::insert(
                conn,
                student_id,
                committee,
                description.trim(),
                points,
                week_number,
            )?;

            let limit_reached = used + 1 >= limit;
            if limit_reached {
                let body = format!(
                    "You have reached the weekly request limit ({limit} requests). \
                     Wait for next week!"
                );
                if let Err(e) =
                    notifications::insert(conn, student_id, "Weekly limit reached", &body)
                {
                    warn!("in-app notification failed for student {student_id}: {e}");
                }
            }

            Ok((request_id, student.name, limit_reached))
        })?;

        notify::dispatch(
            &self.push,
            PushMessage::broadcast(
                PushKind::NewRequest,
                "New request",
                &format!("{student_name} filed a new fuel request"),
            ),
        );
        if limit_reached {
            notify::dispatch(
                &self.push,
                PushMessage::to_user(
                    student_id,
                    PushKind::WeeklyLimitReached,
                    "Weekly limit reached",
                    &format!(
                        "You have reached the weekly request limit ({limit} requests). \
                         Wait for next week!"
                    ),
                ),
            );
        }

        self.request(request_id).await
    }

    pub async fn request(&self, request_id: i64) -> Result<RequestRow, LedgerError> {
        self.db.with_conn(|conn| {
            requests::get(conn, request_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("request {request_id}")))
        })
    }

    pub async fn requests_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<RequestRow>, LedgerError> {
        self.db
            .with_conn(|conn| requests::list_for_student(conn, student_id))
    }

    pub async fn requests_by_status(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<RequestRow>, LedgerError> {
        self.db.with_conn(|conn| requests::list_by_status(conn, status))
    }

    /// Approve a pending request. The transition is terminal; the student's
    /// total immediately reflects the request's points, and the group direct
    /// bucket follows when the propagation setting asks for it.
    pub async fn approve_request(
        &self,
        request_id: i64,
        actor: i64,
    ) -> Result<RequestRow, LedgerError> {
        let request = self.request(request_id).await?;
        if request.status != RequestStatus::Pending {
            return Err(LedgerError::InvalidArgument(format!(
                "request {request_id} was already reviewed"
            )));
        }

        let student = self
            .db
            .with_conn(|conn| students::get(conn, request.student_id))?
            .ok_or_else(|| LedgerError::NotFound(format!("student {}", request.student_id)))?;

        let _guard = match student.group_id {
            Some(group_id) => Some(self.lock_group(group_id).await),
            None => None,
        };

        let grade = FuelGrade::from_points(request.points);
        self.db.with_conn(|conn| {
            let transitioned = requests::mark_approved(conn, request_id, actor)?;
            if !transitioned {
                return Err(LedgerError::InvalidArgument(format!(
                    "request {request_id} was already reviewed"
                )));
            }

            match propagation::PourSettings::load(conn) {
                Ok(pour) => {
                    if pour.approved_requests {
                        if let Some(group_id) = student.group_id {
                            if let Err(e) = propagation::pour_approved_request(
                                conn,
                                group_id,
                                request.points,
                                Some(actor),
                            ) {
                                warn!("propagation failed for request {request_id}: {e}");
                            }
                        }
                    }
                }
                Err(e) => warn!("could not load propagation settings: {e}"),
            }

            if let Err(e) = oplog::append(
                conn,
                &OplogEntry {
                    operation_type: "request_approved",
                    target_type: "student",
                    target_id: request.student_id,
                    group_id: student.group_id,
                    points: Some(request.points),
                    percentage: None,
                    reason: &request.description,
                    performed_by: Some(actor),
                },
            ) {
                warn!("operation log append failed: {e}");
            }

            let body = approval_body(grade);
            if let Err(e) =
                notifications::insert(conn, request.student_id, "Request approved", &body)
            {
                warn!(
                    "in-app notification failed for student {}: {e}",
                    request.student_id
                );
            }

            Ok(())
        })?;

        notify::dispatch(
            &self.push,
            PushMessage::to_user(
                request.student_id,
                PushKind::RequestApproved,
                "Request approved",
                &approval_body(grade),
            ),
        );

        self.request(request_id).await
    }

    /// Reject a pending request. Terminal, no point effect.
    pub async fn reject_request(
        &self,
        request_id: i64,
        actor: i64,
        rejection_reason: Option<&str>,
    ) -> Result<RequestRow, LedgerError> {
        let request = self.request(request_id).await?;
        if request.status != RequestStatus::Pending {
            return Err(LedgerError::InvalidArgument(format!(
                "request {request_id} was already reviewed"
            )));
        }

        let body = match rejection_reason {
            Some(reason) => format!("Reason: {reason}"),
            None => "No reason was given".to_string(),
        };

        self.db.with_conn(|conn| {
            let transitioned = requests::mark_rejected(conn, request_id, actor, rejection_reason)?;
            if !transitioned {
                return Err(LedgerError::InvalidArgument(format!(
                    "request {request_id} was already reviewed"
                )));
            }

            if let Err(e) =
                notifications::insert(conn, request.student_id, "Request rejected", &body)
            {
                warn!(
                    "in-app notification failed for student {}: {e}",
                    request.student_id
                );
            }

            Ok(())
        })?;

        notify::dispatch(
            &self.push,
            PushMessage::to_user(
                request.student_id,
                PushKind::RequestRejected,
                "Request rejected",
                &body,
            ),
        );

        self.request(request_id).await
    }

    // ==================== Groups and students ====================

    pub async fn create_group(&self, name: &str) -> Result<GroupRow, LedgerError> {
        self.db.with_conn(|conn| {
            let id = groups::create(conn, name)?;
            groups::get(conn, id)?.ok_or_else(|| LedgerError::NotFound(format!("group {id}")))
        })
    }

    pub async fn rename_group(&self, group_id: i64, name: &str) -> Result<(), LedgerError> {
        let _guard = self.lock_group(group_id).await;
        self.db.with_conn(|conn| groups::rename(conn, group_id, name))
    }

    pub async fn delete_group(&self, group_id: i64) -> Result<(), LedgerError> {
        let _guard = self.lock_group(group_id).await;
        self.db.with_conn(|conn| groups::delete(conn, group_id))
    }

    pub async fn create_student(
        &self,
        name: &str,
        group_id: Option<i64>,
    ) -> Result<StudentRow, LedgerError> {
        let student = self.db.with_conn(|conn| {
            if let Some(group_id) = group_id {
                groups::get(conn, group_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("group {group_id}")))?;
            }

            let (id, code) = students::create(conn, name, group_id)?;

            let body = format!("Hi {}! Your login code is: {code}", name.trim());
            if let Err(e) = notifications::insert(conn, id, "Welcome to Fuelbank", &body) {
                warn!("in-app notification failed for student {id}: {e}");
            }

            students::get(conn, id)?.ok_or_else(|| LedgerError::NotFound(format!("student {id}")))
        })?;

        if let Some(code) = &student.code {
            notify::dispatch(
                &self.push,
                PushMessage::to_user(
                    student.id,
                    PushKind::NewStudent,
                    "Welcome to Fuelbank",
                    &format!("Hi {}! Your login code is: {code}", student.name),
                ),
            );
        }
        notify::dispatch(
            &self.push,
            PushMessage::broadcast(
                PushKind::NewStudent,
                "New student",
                &match &student.group_name {
                    Some(group) => {
                        format!("Student '{}' was added to group '{group}'", student.name)
                    }
                    None => format!("Student '{}' was added", student.name),
                },
            ),
        );

        Ok(student)
    }

    pub async fn update_student(
        &self,
        student_id: i64,
        name: &str,
        group_id: Option<i64>,
    ) -> Result<StudentRow, LedgerError> {
        let (student, group_change) = self.db.with_conn(|conn| {
            let current = students::get(conn, student_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("student {student_id}")))?;

            if let Some(group_id) = group_id {
                groups::get(conn, group_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("group {group_id}")))?;
            }

            students::update(conn, student_id, name, group_id)?;

            let mut group_change = None;
            if current.group_id != group_id {
                let updated = students::get(conn, student_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("student {student_id}")))?;
                if let Some(new_group) = updated.group_name.clone() {
                    let body = match &current.group_name {
                        Some(old_group) => format!(
                            "You moved from group '{old_group}' to group '{new_group}'"
                        ),
                        None => format!("You were added to group '{new_group}'"),
                    };
                    if let Err(e) =
                        notifications::insert(conn, student_id, "Group changed", &body)
                    {
                        warn!("in-app notification failed for student {student_id}: {e}");
                    }
                    group_change = Some(body);
                }
                return Ok((updated, group_change));
            }

            let updated = students::get(conn, student_id)?
                .ok_or_else(|| LedgerError::NotFound(format!("student {student_id}")))?;
            Ok((updated, group_change))
        })?;

        if let Some(body) = group_change {
            notify::dispatch(
                &self.push,
                PushMessage::to_user(student_id, PushKind::GroupChanged, "Group changed", &body),
            );
        }

        Ok(student)
    }

    pub async fn delete_student(&self, student_id: i64) -> Result<(), LedgerError> {
        self.db.with_conn(|conn| students::delete(conn, student_id))
    }

    /// Toggle whether a student may see their own points
    pub async fn set_points_hidden(
        &self,
        student_id: i64,
        hidden: bool,
        reason: Option<&str>,
    ) -> Result<(), LedgerError> {
        let (title, body) = if hidden {
            (
                "Points hidden",
                match reason {
                    Some(reason) => {
                        format!("You cannot see your points for now. Reason: {reason}")
                    }
                    None => "You cannot see your points for now".to_string(),
                },
            )
        } else {
            (
                "Points visible",
                "You can see your points again".to_string(),
            )
        };

        self.db.with_conn(|conn| {
            students::set_points_hidden(conn, student_id, hidden)?;
            if let Err(e) = notifications::insert(conn, student_id, title, &body) {
                warn!("in-app notification failed for student {student_id}: {e}");
            }
            Ok(())
        })?;

        notify::dispatch(
            &self.push,
            PushMessage::to_user(student_id, PushKind::PointsVisibilityChanged, title, &body),
        );

        Ok(())
    }

    // ==================== Notifications and settings ====================

    pub async fn notifications_for(
        &self,
        user_id: i64,
    ) -> Result<Vec<NotificationRow>, LedgerError> {
        self.db.with_conn(|conn| notifications::list_for(conn, user_id))
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<u32, LedgerError> {
        self.db
            .with_conn(|conn| notifications::unread_count(conn, user_id))
    }

    pub async fn mark_notifications_read(&self, user_id: i64) -> Result<(), LedgerError> {
        self.db
            .with_conn(|conn| notifications::mark_all_read(conn, user_id))
    }

    pub async fn setting(&self, key: &str) -> Result<Option<String>, LedgerError> {
        self.db.with_conn(|conn| settings::get(conn, key))
    }

    pub async fn set_setting(&self, key: &str, value: Option<&str>) -> Result<(), LedgerError> {
        if key.trim().is_empty() {
            return Err(LedgerError::InvalidArgument(
                "setting key must not be empty".to_string(),
            ));
        }
        self.db.with_conn(|conn| settings::set(conn, key.trim(), value))
    }

    pub async fn settings(&self) -> Result<Vec<(String, String)>, LedgerError> {
        self.db.with_conn(settings::all)
    }
}

/// Full group standing; shared by reads and post-adjustment recomputes
fn group_total_inner(
    conn: &rusqlite::Connection,
    group_id: i64,
) -> Result<GroupTotal, LedgerError> {
    let group = groups::get(conn, group_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("group {group_id}")))?;
    let breakdown = totals::group_breakdown(conn, group_id)?;
    let members = totals::member_totals(conn, group_id)?;
    let total = breakdown.total();
    let fuel = FuelTanks::quantize(total);
    Ok(GroupTotal {
        group_id,
        name: group.name,
        members_points: breakdown.members_points,
        direct_points: breakdown.direct_points,
        total_points: total,
        fuel,
        total_liters: fuel.total_liters(),
        members,
    })
}

fn student_points_message(action: PointAction, points: i64, new_total: i64) -> (String, String) {
    let tank = match FuelGrade::from_points(new_total.clamp(0, 5)) {
        Some(grade) => format!("your tank now reads {}", grade.label()),
        None => "your tank is empty".to_string(),
    };
    match action {
        PointAction::Add => (
            "Points added".to_string(),
            format!("You earned {points} points ({new_total} total); {tank}"),
        ),
        PointAction::Subtract => (
            "Points deducted".to_string(),
            format!("{points} points were deducted ({new_total} total); {tank}"),
        ),
    }
}

fn group_points_message(
    group_name: &str,
    action: PointAction,
    points: i64,
    apply_to_members: bool,
) -> (String, String) {
    match action {
        PointAction::Add => (
            "Group points added".to_string(),
            format!(
                "Your group '{group_name}' received {points} points{}",
                if apply_to_members {
                    " (distributed to members)"
                } else {
                    ""
                }
            ),
        ),
        PointAction::Subtract => (
            "Group points deducted".to_string(),
            format!(
                "{points} points were deducted from your group '{group_name}'{}",
                if apply_to_members { " (from members)" } else { "" }
            ),
        ),
    }
}

fn approval_body(grade: Option<FuelGrade>) -> String {
    match grade {
        Some(grade) => format!("You earned 1 liter of {}", grade.label()),
        None => "Your request was approved".to_string(),
    }
}
