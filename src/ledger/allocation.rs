//! Bulk and percentage point allocation
//!
//! The write side of the ledger. A bulk change targeted at a group lands in
//! the direct bucket in full; when the caller also asks for a per-member
//! distribution, the same amount is split fairly across members with
//! floor/remainder shares. Subtraction distributions are capacity-limited
//! per member, with one redistribution sweep over the remaining capacity.
//!
//! Percentage changes are computed against the direct bucket only, never the
//! member-derived total; member deltas use each member's own total as the
//! base. The percentage subtract path performs no redistribution sweep.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::adjustments::{self, GroupAdjustment};
use crate::db::groups;
use crate::error::LedgerError;
use crate::ledger::totals::{self, MemberTotal};

/// Direction of a point change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointAction {
    Add,
    Subtract,
}

impl PointAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointAction::Add => "add",
            PointAction::Subtract => "subtract",
        }
    }

    /// Apply the direction to an unsigned magnitude
    pub fn signed(&self, points: i64) -> i64 {
        match self {
            PointAction::Add => points,
            PointAction::Subtract => -points,
        }
    }
}

impl FromStr for PointAction {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(PointAction::Add),
            "subtract" => Ok(PointAction::Subtract),
            other => Err(LedgerError::InvalidArgument(format!(
                "unknown action '{other}' (expected add or subtract)"
            ))),
        }
    }
}

impl fmt::Display for PointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a bulk adjustment wrote
#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub group_id: i64,
    pub group_name: String,
    /// Signed delta appended to the direct bucket
    pub direct_delta: i64,
    /// Signed delta per member, id order, zero-delta members omitted
    pub member_deltas: Vec<(i64, i64)>,
    /// Intended member deduction that no member had capacity for
    pub shortfall_remaining: i64,
}

/// What a percentage adjustment wrote
#[derive(Debug, Clone, Serialize)]
pub struct PercentageOutcome {
    pub group_id: i64,
    pub group_name: String,
    pub percentage: u32,
    pub direct_delta: i64,
    pub member_deltas: Vec<(i64, i64)>,
}

/// Fair share split: members at index < remainder get one extra point
fn fair_shares(points: i64, members: &[MemberTotal]) -> Vec<i64> {
    let n = members.len() as i64;
    let share = points / n;
    let remainder = points % n;
    (0..members.len() as i64)
        .map(|i| share + i64::from(i < remainder))
        .collect()
}

/// Bulk add/subtract against a group, optionally distributed to members.
///
/// Validation happens before any write; the caller holds the group's write
/// lock for the duration.
pub fn bulk_adjust(
    conn: &Connection,
    group_id: i64,
    points: i64,
    action: PointAction,
    apply_to_members: bool,
    reason: &str,
    actor: Option<i64>,
) -> Result<BulkOutcome, LedgerError> {
    if points < 1 {
        return Err(LedgerError::InvalidArgument(
            "points must be at least 1".to_string(),
        ));
    }

    let group = groups::get(conn, group_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("group {group_id}")))?;

    if !apply_to_members {
        if action == PointAction::Subtract {
            let direct = adjustments::direct_sum_for_group(conn, group_id)?;
            if points > direct {
                return Err(LedgerError::InsufficientBalance {
                    requested: points,
                    available: direct,
                });
            }
        }

        adjustments::insert_group_adjustment(
            conn,
            &GroupAdjustment {
                group_id,
                points: action.signed(points),
                percentage: None,
                apply_to_members: false,
                reason,
                adjusted_by: actor,
            },
        )?;

        return Ok(BulkOutcome {
            group_id,
            group_name: group.name,
            direct_delta: action.signed(points),
            member_deltas: Vec::new(),
            shortfall_remaining: 0,
        });
    }

    let members = totals::member_totals(conn, group_id)?;
    if members.is_empty() {
        return Err(LedgerError::NoMembers(group.name));
    }

    match action {
        PointAction::Add => {
            bulk_add_to_members(conn, group_id, points, &members, reason, actor).map(
                |member_deltas| BulkOutcome {
                    group_id,
                    group_name: group.name,
                    direct_delta: points,
                    member_deltas,
                    shortfall_remaining: 0,
                },
            )
        }
        PointAction::Subtract => {
            let direct = adjustments::direct_sum_for_group(conn, group_id)?;
            if points > direct {
                return Err(LedgerError::InsufficientBalance {
                    requested: points,
                    available: direct,
                });
            }

            bulk_subtract_from_members(conn, group_id, points, &members, reason, actor).map(
                |(member_deltas, shortfall_remaining)| BulkOutcome {
                    group_id,
                    group_name: group.name,
                    direct_delta: -points,
                    member_deltas,
                    shortfall_remaining,
                },
            )
        }
    }
}

/// The direct bucket receives the full amount; members split it fairly.
fn bulk_add_to_members(
    conn: &Connection,
    group_id: i64,
    points: i64,
    members: &[MemberTotal],
    reason: &str,
    actor: Option<i64>,
) -> Result<Vec<(i64, i64)>, LedgerError> {
    adjustments::insert_group_adjustment(
        conn,
        &GroupAdjustment {
            group_id,
            points,
            percentage: None,
            apply_to_members: true,
            reason,
            adjusted_by: actor,
        },
    )?;

    let shares = fair_shares(points, members);
    let mut member_deltas = Vec::new();
    for (member, grant) in members.iter().zip(shares) {
        if grant >= 1 {
            adjustments::insert_student_adjustment(conn, member.id, grant, reason, actor)?;
            member_deltas.push((member.id, grant));
        }
    }

    Ok(member_deltas)
}

/// The direct bucket is debited in full; member deductions are capacity
/// limited, then one sweep redistributes the shortfall over members that
/// still have balance. The sweep runs once; if total member capacity is
/// below the intended deduction the remainder stays unapplied.
fn bulk_subtract_from_members(
    conn: &Connection,
    group_id: i64,
    points: i64,
    members: &[MemberTotal],
    reason: &str,
    actor: Option<i64>,
) -> Result<(Vec<(i64, i64)>, i64), LedgerError> {
    adjustments::insert_group_adjustment(
        conn,
        &GroupAdjustment {
            group_id,
            points: -points,
            percentage: None,
            apply_to_members: true,
            reason,
            adjusted_by: actor,
        },
    )?;

    let intended = fair_shares(points, members);
    let mut deducted: Vec<i64> = vec![0; members.len()];

    // Pass 1: intended shares, capped at each member's balance
    let mut shortfall = 0i64;
    for (i, member) in members.iter().enumerate() {
        let capacity = member.total_points.max(0);
        let deduct = intended[i].min(capacity);
        if deduct >= 1 {
            adjustments::insert_student_adjustment(conn, member.id, -deduct, reason, actor)?;
            deducted[i] = deduct;
        }
        shortfall += intended[i] - deduct;
    }

    // Pass 2: one sweep of the shortfall over remaining capacity
    if shortfall > 0 {
        for (i, member) in members.iter().enumerate() {
            if shortfall == 0 {
                break;
            }
            let capacity = member.total_points.max(0);
            let remaining_capacity = (capacity - deducted[i]).max(0);
            let extra = remaining_capacity.min(shortfall);
            if extra >= 1 {
                adjustments::insert_student_adjustment(conn, member.id, -extra, reason, actor)?;
                deducted[i] += extra;
                shortfall -= extra;
            }
        }
    }

    let member_deltas = members
        .iter()
        .zip(&deducted)
        .filter(|(_, &d)| d > 0)
        .map(|(m, &d)| (m.id, -d))
        .collect();

    Ok((member_deltas, shortfall))
}

/// Percentage add/subtract against a group.
///
/// The group delta is `floor(direct * pct / 100)` of the direct bucket only.
/// Member deltas, when requested, are the same percentage of each member's
/// own total, clamped to that total on subtraction.
pub fn percentage_adjust(
    conn: &Connection,
    group_id: i64,
    percentage: u32,
    action: PointAction,
    apply_to_members: bool,
    reason: &str,
    actor: Option<i64>,
) -> Result<PercentageOutcome, LedgerError> {
    if !(1..=100).contains(&percentage) {
        return Err(LedgerError::InvalidArgument(format!(
            "percentage must be within 1..=100, got {percentage}"
        )));
    }

    let group = groups::get(conn, group_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("group {group_id}")))?;

    let direct_total = adjustments::direct_sum_for_group(conn, group_id)?;
    let direct_delta = direct_total.max(0) * percentage as i64 / 100;

    let mut outcome = PercentageOutcome {
        group_id,
        group_name: group.name,
        percentage,
        direct_delta: 0,
        member_deltas: Vec::new(),
    };

    match action {
        PointAction::Add => {
            if direct_delta >= 1 {
                adjustments::insert_group_adjustment(
                    conn,
                    &GroupAdjustment {
                        group_id,
                        points: direct_delta,
                        percentage: Some(percentage),
                        apply_to_members,
                        reason,
                        adjusted_by: actor,
                    },
                )?;
                outcome.direct_delta = direct_delta;
            }
        }
        PointAction::Subtract => {
            let deduct = direct_delta.min(direct_total).max(0);
            if deduct >= 1 {
                adjustments::insert_group_adjustment(
                    conn,
                    &GroupAdjustment {
                        group_id,
                        points: -deduct,
                        percentage: Some(percentage),
                        apply_to_members,
                        reason,
                        adjusted_by: actor,
                    },
                )?;
                outcome.direct_delta = -deduct;
            }
        }
    }

    if apply_to_members {
        // No redistribution sweep here; members that cannot cover their own
        // percentage are simply left at their clamped deduction.
        for member in totals::member_totals(conn, group_id)? {
            let base = member.total_points.max(0);
            let delta = base * percentage as i64 / 100;
            match action {
                PointAction::Add => {
                    if delta >= 1 {
                        adjustments::insert_student_adjustment(
                            conn, member.id, delta, reason, actor,
                        )?;
                        outcome.member_deltas.push((member.id, delta));
                    }
                }
                PointAction::Subtract => {
                    let deduct = delta.min(member.total_points).max(0);
                    if deduct >= 1 {
                        adjustments::insert_student_adjustment(
                            conn, member.id, -deduct, reason, actor,
                        )?;
                        outcome.member_deltas.push((member.id, -deduct));
                    }
                }
            }
        }
    }

    Ok(outcome)
}
