//! Report lifecycle:
//!
//! ```text
//! REPORT_REQUEST ──accept──▶ REPORT_PROCESSING ──save──▶ REPORT_READY ──send──▶ REPORT_SENT
//!       │                          │
//!       └──────────reject──────────┴──▶ REPORT_REJECTED
//! ```
//!
//! `PENDING_REPORT_ASSIGNMENT` rows are unassigned requests any teacher may
//! accept. `SESSION_LOG` rows carrying scores are published reports written
//! before `REPORT_SENT` existed.

use crate::error::{AppError, AppResult};
use crate::ledger::{completed_in_period, is_attendance_event};
use crate::model::{
    new_record_id, session_label, AttendanceRecord, PublicReport, RecordStatus, DEFAULT_SESSION_SCORE,
    MAX_PERIODE, PASS_THRESHOLD, SELF_STUDY_TEACHER_ID, SESSIONS_PER_PERIOD,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Round-half-up mean of the six session scores.
pub fn average_score(scores: &[i64]) -> i64 {
    let sum: i64 = scores.iter().sum();
    ((sum as f64) / (SESSIONS_PER_PERIOD as f64) + 0.5).floor() as i64
}

pub fn is_pass(average: i64) -> bool {
    average >= PASS_THRESHOLD
}

pub fn session_labels(periode: i64) -> Vec<i64> {
    (1..=SESSIONS_PER_PERIOD)
        .map(|i| session_label(periode, i))
        .collect()
}

pub fn is_published(rec: &AttendanceRecord) -> bool {
    match rec.status {
        RecordStatus::ReportSent => true,
        RecordStatus::SessionLog => rec.has_report_content(),
        _ => false,
    }
}

/// Whether `rec` is the official report for `package_id`.
pub fn is_official_for(rec: &AttendanceRecord, package_id: &str) -> bool {
    rec.package_id == package_id
        && matches!(
            rec.status,
            RecordStatus::SessionLog | RecordStatus::ReportReady | RecordStatus::ReportSent
        )
        && rec.session_number == SESSIONS_PER_PERIOD
        && !rec.is_self_study()
        && rec.has_report_content()
}

/// Any report row for the package other than a rejected one.
pub fn is_active_report(rec: &AttendanceRecord) -> bool {
    match rec.status {
        RecordStatus::ReportRejected => false,
        RecordStatus::SessionLog => rec.has_report_content(),
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportForm {
    pub topics: Vec<String>,
    pub scores: Vec<i64>,
    pub narrative: String,
    pub periode: i64,
}

impl ReportForm {
    pub fn blank(periode: i64) -> Self {
        ReportForm {
            topics: vec![String::new(); SESSIONS_PER_PERIOD as usize],
            scores: vec![DEFAULT_SESSION_SCORE; SESSIONS_PER_PERIOD as usize],
            narrative: String::new(),
            periode,
        }
    }

    pub fn from_record(rec: &AttendanceRecord) -> Self {
        let mut form = ReportForm::blank(rec.periode);
        if let Some(topics) = rec.topics() {
            for (slot, t) in form.topics.iter_mut().zip(topics) {
                *slot = t.clone();
            }
        }
        if let Some(scores) = rec.scores() {
            for (slot, s) in form.scores.iter_mut().zip(scores) {
                *slot = *s;
            }
        }
        if let Some(n) = rec.narrative() {
            form.narrative = n.clone();
        }
        form
    }
}

/// Fails without touching anything when a topic or the narrative is blank.
pub fn validate_form(form: &ReportForm) -> AppResult<()> {
    let mut fields = Vec::new();
    let expected = SESSIONS_PER_PERIOD as usize;

    if form.topics.len() != expected {
        fields.push("topics".to_string());
    } else {
        for (i, t) in form.topics.iter().enumerate() {
            if t.trim().is_empty() {
                fields.push(format!("topics[{i}]"));
            }
        }
    }
    if form.scores.len() != expected {
        fields.push("scores".to_string());
    } else {
        for (i, s) in form.scores.iter().enumerate() {
            if !(0..=100).contains(s) {
                fields.push(format!("scores[{i}]"));
            }
        }
    }
    if form.narrative.trim().is_empty() {
        fields.push("narrative".to_string());
    }
    if !(1..=MAX_PERIODE).contains(&form.periode) {
        fields.push("periode".to_string());
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(
            "all session materials and the narrative must be filled in",
            fields,
        ))
    }
}

/// Authoring workspace opened by accept or edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoringDraft {
    pub report_id: String,
    pub student_name: String,
    pub session_labels: Vec<i64>,
    pub form: ReportForm,
    pub editing: bool,
    pub error: bool,
    pub invalid_fields: Vec<String>,
}

impl AuthoringDraft {
    pub fn seed(rec: &AttendanceRecord) -> Self {
        let editing = rec.has_report_content();
        let form = if editing {
            ReportForm::from_record(rec)
        } else {
            ReportForm::blank(rec.periode)
        };
        AuthoringDraft {
            report_id: rec.id.clone(),
            student_name: rec.student_name().to_string(),
            session_labels: session_labels(form.periode),
            form,
            editing,
            error: false,
            invalid_fields: Vec::new(),
        }
    }
}

fn ensure_teacher(rec: &AttendanceRecord, teacher_id: &str) -> AppResult<()> {
    if rec.status == RecordStatus::PendingReportAssignment {
        return Ok(());
    }
    if rec.teacher_id != teacher_id {
        return Err(AppError::NotPermitted(
            "report is assigned to another teacher".to_string(),
        ));
    }
    Ok(())
}

fn transition_error(rec: &AttendanceRecord, action: &str) -> AppError {
    AppError::InvalidTransition(format!(
        "cannot {} a report in status {}",
        action,
        rec.status.as_str()
    ))
}

pub struct SubmitRequest<'a> {
    pub package_id: &'a str,
    pub student_name: &'a str,
    pub teacher_id: &'a str,
    pub teacher_name: &'a str,
    pub periode: i64,
    pub date: &'a str,
}

#[derive(Debug)]
pub struct SubmissionPlan {
    pub delete_ids: Vec<String>,
    pub request: AttendanceRecord,
}

/// Lowest period with six logged sessions and no active report.
pub fn next_reportable_periode(rows: &[AttendanceRecord], package_id: &str) -> Option<i64> {
    (1..=MAX_PERIODE).find(|&p| {
        completed_in_period(rows, p) == SESSIONS_PER_PERIOD as usize
            && !rows
                .iter()
                .any(|r| r.package_id == package_id && r.periode == p && is_active_report(r))
    })
}

/// `rows` must hold every attendance row of the package for this student.
pub fn plan_submission(
    rows: &[AttendanceRecord],
    req: &SubmitRequest<'_>,
) -> AppResult<SubmissionPlan> {
    if req.teacher_id.trim().is_empty() || req.teacher_id == SELF_STUDY_TEACHER_ID {
        return Err(AppError::BadParams(
            "a report request needs a teacher".to_string(),
        ));
    }
    if !(1..=MAX_PERIODE).contains(&req.periode) {
        return Err(AppError::BadParams(format!(
            "periode must be between 1 and {}",
            MAX_PERIODE
        )));
    }
    let done = completed_in_period(rows, req.periode);
    if done < SESSIONS_PER_PERIOD as usize {
        return Err(AppError::InvalidTransition(format!(
            "only {} of {} sessions logged for periode {}",
            done, SESSIONS_PER_PERIOD, req.periode
        )));
    }

    let same_lineage: Vec<&AttendanceRecord> = rows
        .iter()
        .filter(|r| {
            r.package_id == req.package_id && r.periode == req.periode && !is_attendance_event(r)
        })
        .collect();
    if let Some(active) = same_lineage.iter().find(|r| is_active_report(r)) {
        return Err(AppError::Conflict(format!(
            "a report for this package and periode already exists ({})",
            active.status.as_str()
        )));
    }

    let delete_ids = same_lineage
        .iter()
        .filter(|r| r.status == RecordStatus::ReportRejected)
        .map(|r| r.id.clone())
        .collect();

    let request = AttendanceRecord {
        id: new_record_id(),
        status: RecordStatus::ReportRequest,
        teacher_id: req.teacher_id.to_string(),
        teacher_name: req.teacher_name.to_string(),
        package_id: req.package_id.to_string(),
        session_number: SESSIONS_PER_PERIOD,
        students_attended: vec![req.student_name.trim().to_string()],
        student_topics: BTreeMap::new(),
        student_scores: BTreeMap::new(),
        student_narratives: BTreeMap::new(),
        periode: req.periode,
        date: req.date.to_string(),
    };
    Ok(SubmissionPlan {
        delete_ids,
        request,
    })
}

pub fn accept(
    rec: &AttendanceRecord,
    teacher_id: &str,
    teacher_name: &str,
) -> AppResult<AttendanceRecord> {
    if !rec.status.is_open_request() {
        return Err(transition_error(rec, "accept"));
    }
    ensure_teacher(rec, teacher_id)?;
    let mut next = rec.clone();
    next.status = RecordStatus::ReportProcessing;
    next.teacher_id = teacher_id.to_string();
    if !teacher_name.trim().is_empty() {
        next.teacher_name = teacher_name.to_string();
    }
    Ok(next)
}

pub fn reject(rec: &AttendanceRecord, teacher_id: &str) -> AppResult<AttendanceRecord> {
    if !(rec.status.is_open_request() || rec.status == RecordStatus::ReportProcessing) {
        return Err(transition_error(rec, "reject"));
    }
    ensure_teacher(rec, teacher_id)?;
    let mut next = rec.clone();
    next.status = RecordStatus::ReportRejected;
    Ok(next)
}

/// Writes the form into the row. A published report stays published so the
/// correction is visible in place.
pub fn apply_save(
    rec: &AttendanceRecord,
    teacher_id: &str,
    form: &ReportForm,
    today: &str,
) -> AppResult<AttendanceRecord> {
    let editable = matches!(
        rec.status,
        RecordStatus::ReportProcessing | RecordStatus::ReportReady | RecordStatus::ReportSent
    ) || is_published(rec);
    if !editable {
        return Err(transition_error(rec, "save"));
    }
    ensure_teacher(rec, teacher_id)?;
    validate_form(form)?;

    let editing = rec.has_report_content();
    let student = rec.student_name().to_string();
    let mut next = rec.clone();
    next.student_topics = BTreeMap::from([(
        student.clone(),
        form.topics.iter().map(|t| t.trim().to_string()).collect(),
    )]);
    next.student_scores = BTreeMap::from([(student.clone(), form.scores.clone())]);
    next.student_narratives = BTreeMap::from([(student, form.narrative.trim().to_string())]);
    next.periode = form.periode;
    next.session_number = SESSIONS_PER_PERIOD;
    if !is_published(rec) {
        next.status = RecordStatus::ReportReady;
    }
    if !editing {
        next.date = today.to_string();
    }
    Ok(next)
}

/// A save may move a report to another periode only when that periode is
/// fully logged and has no active report of its own.
pub fn check_periode_move(
    rows: &[AttendanceRecord],
    rec: &AttendanceRecord,
    periode: i64,
) -> AppResult<()> {
    if periode == rec.periode {
        return Ok(());
    }
    if let Some(other) = rows.iter().find(|r| {
        r.id != rec.id
            && r.package_id == rec.package_id
            && r.periode == periode
            && !is_attendance_event(r)
            && is_active_report(r)
    }) {
        return Err(AppError::Conflict(format!(
            "periode {} already has a report ({})",
            periode,
            other.status.as_str()
        )));
    }
    let done = completed_in_period(rows, periode);
    if done < SESSIONS_PER_PERIOD as usize {
        return Err(AppError::InvalidTransition(format!(
            "only {} of {} sessions logged for periode {}",
            done, SESSIONS_PER_PERIOD, periode
        )));
    }
    Ok(())
}

pub fn send(
    rec: &AttendanceRecord,
    teacher_id: &str,
    stamp: Option<&str>,
) -> AppResult<AttendanceRecord> {
    if rec.status != RecordStatus::ReportReady {
        return Err(transition_error(rec, "send"));
    }
    ensure_teacher(rec, teacher_id)?;
    let mut next = rec.clone();
    next.status = RecordStatus::ReportSent;
    if let Some(date) = stamp {
        next.date = date.to_string();
    }
    Ok(next)
}

/// Reopens authoring on a ready or published report without changing status.
pub fn open_edit(rec: &AttendanceRecord, teacher_id: &str) -> AppResult<AuthoringDraft> {
    let reopenable = rec.status == RecordStatus::ReportReady || is_published(rec);
    if !reopenable {
        return Err(transition_error(rec, "edit"));
    }
    ensure_teacher(rec, teacher_id)?;
    Ok(AuthoringDraft::seed(rec))
}

/// Newest first, ties by larger id; `last_actioned` is pinned to the front.
pub fn history_order(
    a: &AttendanceRecord,
    b: &AttendanceRecord,
    last_actioned: Option<&str>,
) -> Ordering {
    if let Some(pinned) = last_actioned {
        match (a.id == pinned, b.id == pinned) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
    }
    b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id))
}

pub fn sort_history(rows: &mut [AttendanceRecord], last_actioned: Option<&str>) {
    rows.sort_by(|a, b| history_order(a, b, last_actioned));
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub student_name: String,
    pub average: Option<i64>,
    pub is_pass: Option<bool>,
    pub published: bool,
    pub session_labels: Vec<i64>,
}

impl ReportSummary {
    pub fn from_record(rec: &AttendanceRecord) -> Self {
        let average = rec
            .scores()
            .filter(|s| !s.is_empty())
            .map(|s| average_score(s));
        ReportSummary {
            student_name: rec.student_name().to_string(),
            average,
            is_pass: average.map(is_pass),
            published: is_published(rec),
            session_labels: session_labels(rec.periode),
            record: rec.clone(),
        }
    }
}

/// Public verification row for a published report.
pub fn public_report(rec: &AttendanceRecord, class_name: &str) -> PublicReport {
    let average = rec.scores().map(|s| average_score(s)).unwrap_or(0);
    PublicReport {
        id: rec.id.clone(),
        studentname: rec.student_name().to_string(),
        classname: class_name.to_string(),
        teachername: rec.teacher_name.clone(),
        periode: rec.periode,
        average,
        ispass: is_pass(average),
        date: rec.date.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{new_session_record, SessionClaim};

    fn sessions(package: &str, student: &str, range: std::ops::RangeInclusive<i64>) -> Vec<AttendanceRecord> {
        range
            .map(|n| {
                new_session_record(&SessionClaim {
                    package_id: package,
                    student_name: student,
                    session_number: n,
                    teacher: None,
                    date: "2025-01-01",
                })
            })
            .collect()
    }

    fn submit(rows: &[AttendanceRecord], periode: i64) -> AppResult<SubmissionPlan> {
        plan_submission(
            rows,
            &SubmitRequest {
                package_id: "pkg",
                student_name: "Budi",
                teacher_id: "t1",
                teacher_name: "Bu Ani",
                periode,
                date: "2025-01-10",
            },
        )
    }

    fn filled_form() -> ReportForm {
        ReportForm {
            topics: (1..=6).map(|i| format!("Topic {i}")).collect(),
            scores: vec![100; 6],
            narrative: "Great progress".to_string(),
            periode: 1,
        }
    }

    fn with_id(mut rec: AttendanceRecord, id: &str, date: &str) -> AttendanceRecord {
        rec.id = id.to_string();
        rec.date = date.to_string();
        rec
    }

    #[test]
    fn average_and_pass_threshold() {
        assert_eq!(average_score(&[100; 6]), 100);
        assert!(is_pass(average_score(&[100; 6])));
        assert_eq!(average_score(&[70; 6]), 70);
        assert!(!is_pass(average_score(&[70; 6])));
        // 479 / 6 = 79.83 rounds up to a pass
        assert_eq!(average_score(&[80, 80, 80, 80, 80, 79]), 80);
        // 477 / 6 = 79.5 rounds half up
        assert_eq!(average_score(&[80, 80, 80, 79, 79, 79]), 80);
    }

    #[test]
    fn submit_requires_six_logged_sessions() {
        let rows = sessions("pkg", "Budi", 1..=5);
        let err = submit(&rows, 1).expect_err("not enough sessions");
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn resubmission_replaces_rejected_request() {
        let mut rows = sessions("pkg", "Budi", 1..=6);
        let first = submit(&rows, 1).expect("first submit");
        let rejected = reject(&first.request, "t1").expect("reject");
        rows.push(rejected.clone());

        let plan = submit(&rows, 1).expect("resubmit");
        assert_eq!(plan.delete_ids, vec![rejected.id.clone()]);
        assert_eq!(plan.request.status, RecordStatus::ReportRequest);
        assert_eq!(plan.request.session_number, 6);
    }

    #[test]
    fn submit_refuses_while_a_request_is_active() {
        let mut rows = sessions("pkg", "Budi", 1..=6);
        rows.push(submit(&rows, 1).expect("first").request);
        let err = submit(&rows, 1).expect_err("duplicate");
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn next_reportable_periode_skips_reported_periods() {
        let mut rows = sessions("pkg", "Budi", 1..=12);
        assert_eq!(next_reportable_periode(&rows, "pkg"), Some(1));
        rows.push(submit(&rows, 1).expect("first").request);
        assert_eq!(next_reportable_periode(&rows, "pkg"), Some(2));
    }

    #[test]
    fn full_lifecycle_reaches_official_report() {
        let rows = sessions("pkg", "Budi", 1..=6);
        let request = submit(&rows, 1).expect("submit").request;
        let processing = accept(&request, "t1", "Bu Ani").expect("accept");
        assert_eq!(processing.status, RecordStatus::ReportProcessing);

        let draft = AuthoringDraft::seed(&processing);
        assert!(!draft.editing);
        assert_eq!(draft.form.scores, vec![DEFAULT_SESSION_SCORE; 6]);
        assert!(draft.form.topics.iter().all(|t| t.is_empty()));

        let ready = apply_save(&processing, "t1", &filled_form(), "2025-02-01").expect("save");
        assert_eq!(ready.status, RecordStatus::ReportReady);
        assert_eq!(ready.date, "2025-02-01");
        assert!(is_official_for(&ready, "pkg"));
        assert!(!is_published(&ready));

        let sent = send(&ready, "t1", Some("2025-02-03")).expect("send");
        assert_eq!(sent.status, RecordStatus::ReportSent);
        assert_eq!(sent.date, "2025-02-03");
        assert!(is_published(&sent));
        assert!(is_official_for(&sent, "pkg"));
    }

    #[test]
    fn save_with_blank_fields_is_rejected_without_changes() {
        let rows = sessions("pkg", "Budi", 1..=6);
        let request = submit(&rows, 1).expect("submit").request;
        let processing = accept(&request, "t1", "").expect("accept");

        let mut form = filled_form();
        form.topics[3] = "   ".to_string();
        form.narrative = " ".to_string();
        let err = apply_save(&processing, "t1", &form, "2025-02-01").expect_err("blank");
        assert_eq!(err.code(), "validation_failed");
        let fields = err.details().expect("details")["fields"].clone();
        assert_eq!(fields, serde_json::json!(["topics[3]", "narrative"]));
    }

    #[test]
    fn editing_keeps_status_and_date_of_published_report() {
        let rows = sessions("pkg", "Budi", 1..=6);
        let request = submit(&rows, 1).expect("submit").request;
        let processing = accept(&request, "t1", "").expect("accept");
        let ready = apply_save(&processing, "t1", &filled_form(), "2025-02-01").expect("save");
        let sent = send(&ready, "t1", None).expect("send");

        let draft = open_edit(&sent, "t1").expect("edit");
        assert!(draft.editing);
        assert_eq!(draft.form.topics[0], "Topic 1");

        let mut form = draft.form.clone();
        form.narrative = "Corrected".to_string();
        let corrected = apply_save(&sent, "t1", &form, "2025-03-01").expect("correct");
        assert_eq!(corrected.status, RecordStatus::ReportSent);
        assert_eq!(corrected.date, "2025-02-01");
        assert_eq!(corrected.narrative().map(|s| s.as_str()), Some("Corrected"));
    }

    #[test]
    fn only_assigned_teacher_may_act() {
        let rows = sessions("pkg", "Budi", 1..=6);
        let request = submit(&rows, 1).expect("submit").request;
        assert_eq!(
            accept(&request, "t2", "").expect_err("other teacher").code(),
            "not_permitted"
        );
        let mut unassigned = request.clone();
        unassigned.status = RecordStatus::PendingReportAssignment;
        let claimed = accept(&unassigned, "t2", "Pak Joko").expect("claim unassigned");
        assert_eq!(claimed.teacher_id, "t2");
        assert_eq!(claimed.teacher_name, "Pak Joko");
    }

    #[test]
    fn ready_reports_cannot_be_rejected() {
        let rows = sessions("pkg", "Budi", 1..=6);
        let request = submit(&rows, 1).expect("submit").request;
        let processing = accept(&request, "t1", "").expect("accept");
        let ready = apply_save(&processing, "t1", &filled_form(), "2025-02-01").expect("save");
        assert_eq!(
            reject(&ready, "t1").expect_err("too late").code(),
            "invalid_transition"
        );
    }

    #[test]
    fn history_is_newest_first_with_id_tiebreak_and_pin() {
        let base = sessions("pkg", "Budi", 6..=6).remove(0);
        let jan = with_id(base.clone(), "0001", "2025-01-10");
        let feb = with_id(base.clone(), "0002", "2025-02-01");
        let feb_b = with_id(base, "0003", "2025-02-01");

        let mut rows = vec![jan.clone(), feb.clone(), feb_b.clone()];
        sort_history(&mut rows, None);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["0003", "0002", "0001"]);

        sort_history(&mut rows, Some("0001"));
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["0001", "0003", "0002"]);
    }

    #[test]
    fn self_study_rows_are_never_official() {
        let mut rec = sessions("pkg", "Budi", 6..=6).remove(0);
        rec.student_scores.insert("Budi".to_string(), vec![90; 6]);
        assert!(!is_official_for(&rec, "pkg"));
        rec.teacher_id = "t1".to_string();
        assert!(is_official_for(&rec, "pkg"));
        assert!(!is_official_for(&rec, "other"));
    }

    #[test]
    fn public_row_mirrors_sent_report() {
        let rows = sessions("pkg", "Budi", 1..=6);
        let request = submit(&rows, 1).expect("submit").request;
        let processing = accept(&request, "t1", "Bu Ani").expect("accept");
        let mut form = filled_form();
        form.scores = vec![70; 6];
        let ready = apply_save(&processing, "t1", &form, "2025-02-01").expect("save");
        let sent = send(&ready, "t1", None).expect("send");

        let row = public_report(&sent, "Math | SD 5");
        assert_eq!(row.id, sent.id);
        assert_eq!(row.studentname, "Budi");
        assert_eq!(row.teachername, "Bu Ani");
        assert_eq!(row.average, 70);
        assert!(!row.ispass);
        assert_eq!(row.date, "2025-02-01");
    }

    #[test]
    fn save_cannot_move_into_a_taken_periode() {
        let mut rows = sessions("pkg", "Budi", 1..=12);
        let first = submit(&rows, 1).expect("periode 1").request;
        rows.push(first);
        let second = submit(&rows, 2).expect("periode 2").request;
        rows.push(second.clone());
        let processing = accept(&second, "t1", "").expect("accept");

        let err = check_periode_move(&rows, &processing, 1).expect_err("taken");
        assert_eq!(err.code(), "conflict");
        check_periode_move(&rows, &processing, 2).expect("same periode");
        assert_eq!(
            check_periode_move(&rows, &processing, 3).expect_err("not logged").code(),
            "invalid_transition"
        );

        let mut rejected_p1 = rows[12].clone();
        rejected_p1.status = RecordStatus::ReportRejected;
        rows[12] = rejected_p1;
        check_periode_move(&rows, &processing, 1).expect("rejected row does not block");
    }

    #[test]
    fn second_period_labels_start_at_seven() {
        assert_eq!(session_labels(2), vec![7, 8, 9, 10, 11, 12]);
        assert_eq!(session_labels(1).last(), Some(&6));
    }
}
