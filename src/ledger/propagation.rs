//! Settings-driven propagation of individual events into the direct bucket
//!
//! Operators can choose to have individual-level point events mirrored into
//! the student's group direct bucket. The group total already re-sums member
//! totals, so the mirror writes only the direct bucket; the two sources stay
//! disjoint and nothing is counted twice.

use rusqlite::Connection;

use crate::db::adjustments::{self, GroupAdjustment};
use crate::db::settings;
use crate::error::LedgerError;
use crate::ledger::allocation::PointAction;

/// Mirror every manual adjustment (either direction)
pub const SETTING_POUR_MANUAL: &str = "pour_manual_adjustments_to_group";
/// Mirror only add-direction manual adjustments
pub const SETTING_POUR_ADD_ONLY: &str = "auto_pour_add_points_to_group";
/// Mirror approved request points
pub const SETTING_POUR_APPROVED: &str = "pour_approved_requests_to_group";

/// The three propagation switches, read once per operation
#[derive(Debug, Clone, Copy, Default)]
pub struct PourSettings {
    pub manual_adjustments: bool,
    pub add_only_on_auto_sync: bool,
    pub approved_requests: bool,
}

impl PourSettings {
    pub fn load(conn: &Connection) -> Result<Self, LedgerError> {
        Ok(Self {
            manual_adjustments: settings::get_bool(conn, SETTING_POUR_MANUAL, false)?,
            add_only_on_auto_sync: settings::get_bool(conn, SETTING_POUR_ADD_ONLY, false)?,
            approved_requests: settings::get_bool(conn, SETTING_POUR_APPROVED, false)?,
        })
    }

    /// Whether a manual adjustment in the given direction propagates.
    ///
    /// `manual_adjustments` wins over `add_only_on_auto_sync`, so the two
    /// switches never apply the same event twice.
    pub fn pours_manual(&self, action: PointAction) -> bool {
        if self.manual_adjustments {
            true
        } else {
            self.add_only_on_auto_sync && action == PointAction::Add
        }
    }
}

/// Mirror a manual adjustment into the group's direct bucket
pub fn pour_manual_adjustment(
    conn: &Connection,
    group_id: i64,
    signed_points: i64,
    reason: &str,
    actor: Option<i64>,
) -> Result<(), LedgerError> {
    let reason = format!("{reason} (auto-poured to group)");
    adjustments::insert_group_adjustment(
        conn,
        &GroupAdjustment {
            group_id,
            points: signed_points,
            percentage: None,
            apply_to_members: false,
            reason: &reason,
            adjusted_by: actor,
        },
    )?;
    Ok(())
}

/// Mirror an approved request's points into the group's direct bucket
pub fn pour_approved_request(
    conn: &Connection,
    group_id: i64,
    points: i64,
    actor: Option<i64>,
) -> Result<(), LedgerError> {
    adjustments::insert_group_adjustment(
        conn,
        &GroupAdjustment {
            group_id,
            points,
            percentage: None,
            apply_to_members: false,
            reason: "approved request (auto-poured)",
            adjusted_by: actor,
        },
    )?;
    Ok(())
}
