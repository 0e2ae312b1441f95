//! Ledger integration tests
//!
//! Exercises the full operation surface against in-memory stores:
//! - aggregation invariant (group total == member sum + direct bucket)
//! - bulk distribution fairness and shortfall handling
//! - percentage changes against the direct bucket
//! - settings-driven propagation of individual events
//! - request lifecycle with the weekly quota
//! - export report assembly

use std::sync::Arc;

use fuelbank::db::requests::{Committee, RequestStatus};
use fuelbank::{report, FuelTanks, Ledger, LedgerDb, LedgerError, LogSink, PointAction};

fn ledger() -> Ledger {
    let db = Arc::new(LedgerDb::open_in_memory().unwrap());
    Ledger::with_db(db)
}

/// Group with three members holding the given totals (seeded via additions)
async fn seed_group(ledger: &Ledger, totals: &[i64]) -> (i64, Vec<i64>) {
    let group = ledger.create_group("falcons").await.unwrap();
    let mut member_ids = Vec::new();
    for (i, &total) in totals.iter().enumerate() {
        let student = ledger
            .create_student(&format!("student-{i}"), Some(group.id))
            .await
            .unwrap();
        if total > 0 {
            ledger
                .adjust_student_points(student.id, total, PointAction::Add, None, None)
                .await
                .unwrap();
        }
        member_ids.push(student.id);
    }
    (group.id, member_ids)
}

async fn assert_group_invariant(ledger: &Ledger, group_id: i64) {
    let group = ledger.group_total(group_id).await.unwrap();
    let member_sum: i64 = group.members.iter().map(|m| m.total_points).sum();
    assert_eq!(group.members_points, member_sum);
    assert_eq!(
        group.total_points,
        group.members_points + group.direct_points
    );
}

async fn member_total(ledger: &Ledger, student_id: i64) -> i64 {
    ledger.student_total(student_id).await.unwrap().total_points
}

// =============================================================================
// Student adjustments
// =============================================================================

#[tokio::test]
async fn add_then_subtract_restores_student_total() {
    let ledger = ledger();
    let student = ledger.create_student("sara", None).await.unwrap();

    ledger
        .adjust_student_points(student.id, 5, PointAction::Add, None, Some(1))
        .await
        .unwrap();
    let after = ledger
        .adjust_student_points(student.id, 5, PointAction::Subtract, None, Some(1))
        .await
        .unwrap();

    assert_eq!(after.total_points, 0);

    // Both rows exist; the ledger is append-only
    let rows: i64 = ledger
        .db()
        .with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM point_adjustments WHERE student_id = ?",
                [student.id],
                |row| row.get(0),
            )?)
        })
        .unwrap();
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn student_subtract_beyond_balance_is_rejected() {
    let ledger = ledger();
    let student = ledger.create_student("omar", None).await.unwrap();
    ledger
        .adjust_student_points(student.id, 3, PointAction::Add, None, None)
        .await
        .unwrap();

    let err = ledger
        .adjust_student_points(student.id, 7, PointAction::Subtract, None, None)
        .await
        .unwrap_err();

    match err {
        LedgerError::InsufficientBalance {
            requested,
            available,
        } => {
            assert_eq!(requested, 7);
            assert_eq!(available, 3);
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }
    assert_eq!(member_total(&ledger, student.id).await, 3);
}

#[tokio::test]
async fn zero_point_adjustment_is_invalid() {
    let ledger = ledger();
    let student = ledger.create_student("zero", None).await.unwrap();
    let err = ledger
        .adjust_student_points(student.id, 0, PointAction::Add, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}

#[tokio::test]
async fn student_total_reflects_fuel_quantization() {
    let ledger = ledger();
    let student = ledger.create_student("noura", None).await.unwrap();
    ledger
        .adjust_student_points(student.id, 9, PointAction::Add, None, None)
        .await
        .unwrap();

    let total = ledger.student_total(student.id).await.unwrap();
    assert_eq!(total.total_points, 9);
    assert_eq!(total.fuel.ethanol, 1);
    assert_eq!(total.fuel.fuel98, 1);
    assert_eq!(total.total_liters, 2);
    assert_eq!(total.fuel, FuelTanks::quantize(9));
}

// =============================================================================
// Bulk group adjustments
// =============================================================================

#[tokio::test]
async fn direct_add_then_subtract_restores_direct_bucket() {
    let ledger = ledger();
    let (group_id, _) = seed_group(&ledger, &[2]).await;

    ledger
        .adjust_group_points(group_id, 8, PointAction::Add, false, None, None)
        .await
        .unwrap();
    let result = ledger
        .adjust_group_points(group_id, 8, PointAction::Subtract, false, None, None)
        .await
        .unwrap();

    assert_eq!(result.group.direct_points, 0);
    assert_eq!(result.group.members_points, 2);
    assert_group_invariant(&ledger, group_id).await;
}

#[tokio::test]
async fn direct_subtract_needs_direct_balance() {
    let ledger = ledger();
    let (group_id, _) = seed_group(&ledger, &[50]).await;

    // Members hold 50 but the direct bucket is empty
    let err = ledger
        .adjust_group_points(group_id, 1, PointAction::Subtract, false, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
}

#[tokio::test]
async fn distributed_add_is_fair_and_credits_direct_in_full() {
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[0, 0, 0]).await;

    let result = ledger
        .adjust_group_points(group_id, 10, PointAction::Add, true, None, Some(1))
        .await
        .unwrap();

    // The direct bucket always receives the full amount
    assert_eq!(result.group.direct_points, 10);

    // Members split the same amount fairly: {4, 3, 3}
    let grants: Vec<i64> = result.outcome.member_deltas.iter().map(|(_, d)| *d).collect();
    assert_eq!(grants.iter().sum::<i64>(), 10);
    let max = grants.iter().max().unwrap();
    let min = grants.iter().min().unwrap();
    assert!(max - min <= 1);

    // Earlier members get the remainder
    assert_eq!(member_total(&ledger, members[0]).await, 4);
    assert_eq!(member_total(&ledger, members[1]).await, 3);
    assert_eq!(member_total(&ledger, members[2]).await, 3);

    assert_group_invariant(&ledger, group_id).await;
}

#[tokio::test]
async fn distributed_add_skips_zero_grants() {
    let ledger = ledger();
    let (group_id, _) = seed_group(&ledger, &[0, 0, 0]).await;

    // 2 points over 3 members: share 0, remainder 2, third member gets nothing
    let result = ledger
        .adjust_group_points(group_id, 2, PointAction::Add, true, None, None)
        .await
        .unwrap();
    assert_eq!(result.outcome.member_deltas.len(), 2);
    assert_group_invariant(&ledger, group_id).await;
}

#[tokio::test]
async fn distribution_on_empty_group_is_rejected() {
    let ledger = ledger();
    let group = ledger.create_group("empty").await.unwrap();

    let err = ledger
        .adjust_group_points(group.id, 5, PointAction::Add, true, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NoMembers(_)));
}

#[tokio::test]
async fn scenario_insufficient_direct_blocks_member_deduction() {
    // Group direct = 0, members {10, 3, 0}: subtracting 9 with member
    // distribution must fail before any row is written.
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[10, 3, 0]).await;

    let err = ledger
        .adjust_group_points(group_id, 9, PointAction::Subtract, true, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

    let group = ledger.group_total(group_id).await.unwrap();
    assert_eq!(group.direct_points, 0);
    assert_eq!(member_total(&ledger, members[0]).await, 10);
    assert_eq!(member_total(&ledger, members[1]).await, 3);
    assert_eq!(member_total(&ledger, members[2]).await, 0);
}

#[tokio::test]
async fn scenario_shortfall_is_redistributed_to_members_with_capacity() {
    // Group direct = 20, members {10, 3, 0}: subtracting 9 distributed.
    // Intended shares are {3, 3, 3}; the third member has no capacity, so
    // the shortfall of 3 lands on the first member in the sweep.
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[10, 3, 0]).await;
    ledger
        .adjust_group_points(group_id, 20, PointAction::Add, false, None, None)
        .await
        .unwrap();

    let result = ledger
        .adjust_group_points(group_id, 9, PointAction::Subtract, true, None, None)
        .await
        .unwrap();

    assert_eq!(result.group.direct_points, 11);
    assert_eq!(result.outcome.shortfall_remaining, 0);

    let deducted: i64 = result.outcome.member_deltas.iter().map(|(_, d)| -d).sum();
    assert_eq!(deducted, 9);

    assert_eq!(member_total(&ledger, members[0]).await, 4); // 10 - 3 - 3 extra
    assert_eq!(member_total(&ledger, members[1]).await, 0); // 3 - 3
    assert_eq!(member_total(&ledger, members[2]).await, 0); // untouched

    assert_group_invariant(&ledger, group_id).await;
}

#[tokio::test]
async fn shortfall_single_sweep_stops_after_one_pass() {
    // Total member capacity (1) is below the intended deduction (10): the
    // sweep deducts what it can and leaves the rest unapplied, without
    // erroring.
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[1, 0]).await;
    ledger
        .adjust_group_points(group_id, 10, PointAction::Add, false, None, None)
        .await
        .unwrap();

    let result = ledger
        .adjust_group_points(group_id, 10, PointAction::Subtract, true, None, None)
        .await
        .unwrap();

    assert_eq!(result.group.direct_points, 0);
    assert_eq!(result.outcome.shortfall_remaining, 9);
    let deducted: i64 = result.outcome.member_deltas.iter().map(|(_, d)| -d).sum();
    assert_eq!(deducted, 1);
    assert_eq!(member_total(&ledger, members[0]).await, 0);
    assert_eq!(member_total(&ledger, members[1]).await, 0);
}

#[tokio::test]
async fn shortfall_deductions_never_exceed_requested_points() {
    let ledger = ledger();
    let (group_id, _) = seed_group(&ledger, &[7, 5, 2, 0]).await;
    ledger
        .adjust_group_points(group_id, 30, PointAction::Add, false, None, None)
        .await
        .unwrap();

    let result = ledger
        .adjust_group_points(group_id, 12, PointAction::Subtract, true, None, None)
        .await
        .unwrap();

    let deducted: i64 = result.outcome.member_deltas.iter().map(|(_, d)| -d).sum();
    // Member capacity (14) covers the request, so the deduction is exact
    assert_eq!(deducted, 12);
    assert_group_invariant(&ledger, group_id).await;
}

// =============================================================================
// Percentage adjustments
// =============================================================================

#[tokio::test]
async fn scenario_percentage_add_uses_direct_bucket_only() {
    // Direct = 10: a 50% increase without member application lands 5 in the
    // direct bucket and leaves member totals untouched.
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[8]).await;
    ledger
        .adjust_group_points(group_id, 10, PointAction::Add, false, None, None)
        .await
        .unwrap();

    let result = ledger
        .adjust_group_percentage(group_id, 50, PointAction::Add, false, None, None)
        .await
        .unwrap();

    assert_eq!(result.group.direct_points, 15);
    assert_eq!(member_total(&ledger, members[0]).await, 8);
    assert_group_invariant(&ledger, group_id).await;
}

#[tokio::test]
async fn percentage_add_to_members_uses_each_members_own_total() {
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[10, 3]).await;
    ledger
        .adjust_group_points(group_id, 10, PointAction::Add, false, None, None)
        .await
        .unwrap();

    let result = ledger
        .adjust_group_percentage(group_id, 50, PointAction::Add, true, None, None)
        .await
        .unwrap();

    assert_eq!(result.outcome.direct_delta, 5);
    assert_eq!(member_total(&ledger, members[0]).await, 15); // +floor(10 * 50%)
    assert_eq!(member_total(&ledger, members[1]).await, 4); // +floor(3 * 50%)
    assert_group_invariant(&ledger, group_id).await;
}

#[tokio::test]
async fn percentage_subtract_clamps_to_direct_total() {
    let ledger = ledger();
    let (group_id, _) = seed_group(&ledger, &[0]).await;
    ledger
        .adjust_group_points(group_id, 3, PointAction::Add, false, None, None)
        .await
        .unwrap();

    let result = ledger
        .adjust_group_percentage(group_id, 100, PointAction::Subtract, false, None, None)
        .await
        .unwrap();

    assert_eq!(result.group.direct_points, 0);
    assert_eq!(result.outcome.direct_delta, -3);
}

#[tokio::test]
async fn percentage_subtract_has_no_shortfall_pass() {
    // Unlike the bulk path, a member without capacity is simply skipped and
    // no other member covers the difference.
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[10, 0]).await;
    ledger
        .adjust_group_points(group_id, 10, PointAction::Add, false, None, None)
        .await
        .unwrap();

    let result = ledger
        .adjust_group_percentage(group_id, 50, PointAction::Subtract, true, None, None)
        .await
        .unwrap();

    assert_eq!(result.outcome.direct_delta, -5);
    assert_eq!(result.outcome.member_deltas, vec![(members[0], -5)]);
    assert_eq!(member_total(&ledger, members[0]).await, 5);
    assert_eq!(member_total(&ledger, members[1]).await, 0);
    assert_group_invariant(&ledger, group_id).await;
}

#[tokio::test]
async fn percentage_rounding_below_one_point_writes_nothing() {
    let ledger = ledger();
    let (group_id, _) = seed_group(&ledger, &[0]).await;
    ledger
        .adjust_group_points(group_id, 3, PointAction::Add, false, None, None)
        .await
        .unwrap();

    // floor(3 * 10%) = 0: no row is appended
    let result = ledger
        .adjust_group_percentage(group_id, 10, PointAction::Add, false, None, None)
        .await
        .unwrap();
    assert_eq!(result.outcome.direct_delta, 0);
    assert_eq!(result.group.direct_points, 3);
}

#[tokio::test]
async fn percentage_out_of_range_is_rejected() {
    let ledger = ledger();
    let (group_id, _) = seed_group(&ledger, &[1]).await;

    for pct in [0, 101, 500] {
        let err = ledger
            .adjust_group_percentage(group_id, pct, PointAction::Add, false, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)), "pct {pct}");
    }
}

#[tokio::test]
async fn group_operations_on_unknown_group_are_not_found() {
    let ledger = ledger();
    let err = ledger
        .adjust_group_points(404, 5, PointAction::Add, false, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));

    let err = ledger
        .adjust_group_percentage(404, 10, PointAction::Add, false, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

// =============================================================================
// Propagation policy
// =============================================================================

#[tokio::test]
async fn manual_adjustments_pour_in_both_directions_when_enabled() {
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[0]).await;
    ledger
        .set_setting("pour_manual_adjustments_to_group", Some("1"))
        .await
        .unwrap();

    ledger
        .adjust_student_points(members[0], 5, PointAction::Add, None, None)
        .await
        .unwrap();
    ledger
        .adjust_student_points(members[0], 2, PointAction::Subtract, None, None)
        .await
        .unwrap();

    let group = ledger.group_total(group_id).await.unwrap();
    assert_eq!(group.members_points, 3);
    assert_eq!(group.direct_points, 3);
    assert_group_invariant(&ledger, group_id).await;
}

#[tokio::test]
async fn add_only_pour_ignores_subtractions() {
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[0]).await;
    ledger
        .set_setting("auto_pour_add_points_to_group", Some("1"))
        .await
        .unwrap();

    ledger
        .adjust_student_points(members[0], 5, PointAction::Add, None, None)
        .await
        .unwrap();
    ledger
        .adjust_student_points(members[0], 2, PointAction::Subtract, None, None)
        .await
        .unwrap();

    let group = ledger.group_total(group_id).await.unwrap();
    assert_eq!(group.members_points, 3);
    assert_eq!(group.direct_points, 5);
}

#[tokio::test]
async fn pour_settings_off_leave_direct_bucket_alone() {
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[0]).await;

    ledger
        .adjust_student_points(members[0], 5, PointAction::Add, None, None)
        .await
        .unwrap();

    let group = ledger.group_total(group_id).await.unwrap();
    assert_eq!(group.direct_points, 0);
}

#[tokio::test]
async fn approved_requests_pour_when_enabled() {
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[0]).await;
    ledger
        .set_setting("pour_approved_requests_to_group", Some("1"))
        .await
        .unwrap();

    let request = ledger
        .submit_request(members[0], Committee::Science, "weekly lab prep", 4)
        .await
        .unwrap();
    ledger.approve_request(request.id, 1).await.unwrap();

    let group = ledger.group_total(group_id).await.unwrap();
    assert_eq!(group.members_points, 4);
    assert_eq!(group.direct_points, 4);
    assert_group_invariant(&ledger, group_id).await;
}

// =============================================================================
// Request lifecycle
// =============================================================================

#[tokio::test]
async fn approval_is_terminal_and_feeds_the_total() {
    let ledger = ledger();
    let student = ledger.create_student("huda", None).await.unwrap();

    let request = ledger
        .submit_request(student.id, Committee::Media, "poster design", 3)
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(member_total(&ledger, student.id).await, 0);

    let approved = ledger.approve_request(request.id, 7).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(7));
    assert_eq!(member_total(&ledger, student.id).await, 3);

    let err = ledger.approve_request(request.id, 7).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
    let err = ledger.reject_request(request.id, 7, None).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));

    let history = ledger.requests_for_student(student.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, RequestStatus::Approved);

    let pending = ledger
        .requests_by_status(Some(RequestStatus::Pending))
        .await
        .unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn rejection_is_terminal_and_has_no_point_effect() {
    let ledger = ledger();
    let student = ledger.create_student("faisal", None).await.unwrap();

    let request = ledger
        .submit_request(student.id, Committee::Sports, "match refereeing", 5)
        .await
        .unwrap();
    let rejected = ledger
        .reject_request(request.id, 7, Some("no evidence attached"))
        .await
        .unwrap();

    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("no evidence attached")
    );
    assert_eq!(member_total(&ledger, student.id).await, 0);

    let err = ledger.approve_request(request.id, 7).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}

#[tokio::test]
async fn weekly_quota_limits_submissions() {
    let db = Arc::new(LedgerDb::open_in_memory().unwrap());
    let ledger = Ledger::new(db, Arc::new(LogSink), 3);
    let student = ledger.create_student("busy", None).await.unwrap();

    for i in 0..3 {
        ledger
            .submit_request(student.id, Committee::General, &format!("task {i}"), 1)
            .await
            .unwrap();
    }

    let err = ledger
        .submit_request(student.id, Committee::General, "one too many", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}

#[tokio::test]
async fn request_points_outside_range_are_rejected() {
    let ledger = ledger();
    let student = ledger.create_student("range", None).await.unwrap();

    for points in [0, 6, -1] {
        let err = ledger
            .submit_request(student.id, Committee::Cultural, "reading circle", points)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)), "{points}");
    }
}

// =============================================================================
// Membership
// =============================================================================

#[tokio::test]
async fn created_students_get_unique_four_digit_codes() {
    let ledger = ledger();
    let a = ledger.create_student("a", None).await.unwrap();
    let b = ledger.create_student("b", None).await.unwrap();

    let code_a = a.code.unwrap();
    let code_b = b.code.unwrap();
    assert_eq!(code_a.len(), 4);
    assert_ne!(code_a, code_b);

    let found = ledger.student_by_code(&code_a).await.unwrap().unwrap();
    assert_eq!(found.id, a.id);
}

#[tokio::test]
async fn duplicate_group_names_are_rejected() {
    let ledger = ledger();
    ledger.create_group("eagles").await.unwrap();
    let err = ledger.create_group("eagles").await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidArgument(_)));
}

#[tokio::test]
async fn deleting_a_group_detaches_its_members() {
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[5]).await;

    ledger.delete_group(group_id).await.unwrap();

    let student = ledger.student_total(members[0]).await.unwrap();
    assert_eq!(student.total_points, 5);

    let err = ledger.group_total(group_id).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotFound(_)));
}

#[tokio::test]
async fn points_visibility_can_be_toggled() {
    let ledger = ledger();
    let student = ledger.create_student("shy", None).await.unwrap();
    assert!(!student.points_hidden);

    ledger
        .set_points_hidden(student.id, true, Some("pending review"))
        .await
        .unwrap();
    assert!(ledger.student_total(student.id).await.unwrap().points_hidden);

    ledger.set_points_hidden(student.id, false, None).await.unwrap();
    assert!(!ledger.student_total(student.id).await.unwrap().points_hidden);
}

// =============================================================================
// Notifications, settings, operation log
// =============================================================================

#[tokio::test]
async fn adjustments_leave_in_app_notifications() {
    let ledger = ledger();
    let student = ledger.create_student("lina", None).await.unwrap();

    ledger
        .adjust_student_points(student.id, 4, PointAction::Add, Some("cleanup shift"), None)
        .await
        .unwrap();

    let unread = ledger.unread_count(student.id).await.unwrap();
    assert!(unread >= 1);

    let feed = ledger.notifications_for(student.id).await.unwrap();
    assert!(feed.iter().any(|n| n.title == "Points added"));

    ledger.mark_notifications_read(student.id).await.unwrap();
    assert_eq!(ledger.unread_count(student.id).await.unwrap(), 0);
}

#[tokio::test]
async fn settings_round_trip() {
    let ledger = ledger();
    assert_eq!(ledger.setting("missing").await.unwrap(), None);

    ledger.set_setting("theme", Some("dark")).await.unwrap();
    assert_eq!(ledger.setting("theme").await.unwrap().as_deref(), Some("dark"));

    ledger.set_setting("theme", Some("light")).await.unwrap();
    assert_eq!(
        ledger.setting("theme").await.unwrap().as_deref(),
        Some("light")
    );

    let all = ledger.settings().await.unwrap();
    assert!(all.contains(&("theme".to_string(), "light".to_string())));
}

#[tokio::test]
async fn operation_log_records_mutations_newest_first() {
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[0]).await;

    ledger
        .adjust_student_points(members[0], 5, PointAction::Add, None, Some(1))
        .await
        .unwrap();
    ledger
        .adjust_group_points(group_id, 6, PointAction::Add, false, None, Some(1))
        .await
        .unwrap();
    ledger
        .adjust_group_percentage(group_id, 50, PointAction::Add, false, None, Some(1))
        .await
        .unwrap();

    let log = ledger.points_log(100).await.unwrap();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].operation_type, "percentage_add");
    assert_eq!(log[0].percentage, Some(50));
    assert_eq!(log[1].operation_type, "add");
    assert_eq!(log[1].target_type, "group");
    assert_eq!(log[2].target_type, "student");
}

#[tokio::test]
async fn overview_stats_count_requests_by_status() {
    let ledger = ledger();
    let student = ledger.create_student("counts", None).await.unwrap();

    let a = ledger
        .submit_request(student.id, Committee::Social, "visit drive", 2)
        .await
        .unwrap();
    ledger
        .submit_request(student.id, Committee::Social, "food drive", 2)
        .await
        .unwrap();
    ledger.approve_request(a.id, 1).await.unwrap();

    let stats = ledger.overview_stats().await.unwrap();
    assert_eq!(stats.total_students, 1);
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.pending_requests, 1);
    assert_eq!(stats.approved_requests, 1);
    assert_eq!(stats.rejected_requests, 0);
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn student_report_histograms_approved_requests() {
    let ledger = ledger();
    let student = ledger.create_student("grades", None).await.unwrap();

    for points in [5, 3, 3] {
        let request = ledger
            .submit_request(student.id, Committee::Science, "lab work", points)
            .await
            .unwrap();
        ledger.approve_request(request.id, 1).await.unwrap();
    }
    // A pending request contributes nothing
    ledger
        .submit_request(student.id, Committee::Science, "unreviewed", 5)
        .await
        .unwrap();
    // Adjustments do not show up in the grade histogram
    ledger
        .adjust_student_points(student.id, 10, PointAction::Add, None, None)
        .await
        .unwrap();

    let card = report::student_report(&ledger, student.id).unwrap();
    assert_eq!(card.tanks.ethanol, 1);
    assert_eq!(card.tanks.fuel95, 2);
    assert_eq!(card.total_liters, 3);
}

#[tokio::test]
async fn group_and_roster_reports_roll_up_members() {
    let ledger = ledger();
    let (group_id, members) = seed_group(&ledger, &[0, 0]).await;
    let loner = ledger.create_student("loner", None).await.unwrap();

    for (student_id, points) in [(members[0], 5), (members[1], 2), (loner.id, 1)] {
        let request = ledger
            .submit_request(student_id, Committee::FollowUp, "weekly check", points)
            .await
            .unwrap();
        ledger.approve_request(request.id, 1).await.unwrap();
    }

    let group = report::group_report(&ledger, group_id).unwrap();
    assert_eq!(group.student_count, 2);
    assert_eq!(group.tanks.ethanol, 1);
    assert_eq!(group.tanks.fuel91, 1);
    assert_eq!(group.total_liters, 2);

    let roster = report::all_students_report(&ledger).unwrap();
    assert_eq!(roster.student_count, 3);
    assert_eq!(roster.group_count, 1);
    assert_eq!(roster.total_liters, 3);
    assert_eq!(roster.tanks.diesel, 1);
}

#[tokio::test]
async fn weekly_report_lists_current_week_activity() {
    let ledger = ledger();
    let (_, members) = seed_group(&ledger, &[0]).await;
    ledger
        .submit_request(members[0], Committee::Cultural, "book fair booth", 2)
        .await
        .unwrap();

    let weekly = report::weekly_report(&ledger, None).unwrap();
    assert_eq!(weekly.rows.len(), 1);
    assert_eq!(weekly.rows[0].committee, "cultural");
    assert_eq!(weekly.rows[0].points, 2);
    assert_eq!(weekly.rows[0].group_name.as_deref(), Some("falcons"));

    // A week with no activity is empty
    let other = report::weekly_report(&ledger, Some(weekly.week_number + 10)).unwrap();
    assert!(other.rows.is_empty());
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn file_backed_store_persists_across_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("fuelbank.db");

    {
        let db = Arc::new(LedgerDb::open(&db_path).unwrap());
        let ledger = Ledger::with_db(db);
        let group = ledger.create_group("persistent").await.unwrap();
        ledger
            .adjust_group_points(group.id, 5, PointAction::Add, false, None, None)
            .await
            .unwrap();
    }

    let db = Arc::new(LedgerDb::open(&db_path).unwrap());
    let ledger = Ledger::with_db(db);
    let groups = ledger.list_groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "persistent");
    assert_eq!(groups[0].direct_points, 5);
}
