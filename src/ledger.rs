use crate::error::{AppError, AppResult};
use crate::model::{
    new_record_id, period_range, AttendanceRecord, RecordStatus, StudentKey, MAX_SESSION_NUMBER,
    SELF_STUDY_TEACHER_ID, SELF_STUDY_TEACHER_NAME,
};
use std::collections::{BTreeMap, HashMap};

/// A row that counts as a completed session (not a report artifact).
pub fn is_attendance_event(rec: &AttendanceRecord) -> bool {
    rec.status == RecordStatus::SessionLog && !rec.has_report_content()
}

/// Attendance events grouped by `(package, student)`.
#[derive(Debug, Default)]
pub struct LedgerIndex {
    by_key: HashMap<(String, StudentKey), Vec<AttendanceRecord>>,
}

impl LedgerIndex {
    pub fn build(rows: &[AttendanceRecord]) -> Self {
        let mut by_key: HashMap<(String, StudentKey), Vec<AttendanceRecord>> = HashMap::new();
        for row in rows.iter().filter(|r| is_attendance_event(r)) {
            by_key
                .entry((row.package_id.clone(), row.student_key()))
                .or_default()
                .push(row.clone());
        }
        for events in by_key.values_mut() {
            events.sort_by(|a, b| {
                a.session_number
                    .cmp(&b.session_number)
                    .then_with(|| a.date.cmp(&b.date))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        LedgerIndex { by_key }
    }

    pub fn sessions(&self, package_id: &str, student: &StudentKey) -> &[AttendanceRecord] {
        self.by_key
            .get(&(package_id.to_string(), student.clone()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

pub fn current_max(events: &[AttendanceRecord]) -> i64 {
    events
        .iter()
        .filter(|r| is_attendance_event(r))
        .map(|r| r.session_number)
        .max()
        .unwrap_or(0)
}

/// Distinct logged sessions inside the period's range.
pub fn completed_in_period(events: &[AttendanceRecord], periode: i64) -> usize {
    let range = period_range(periode);
    let mut seen: Vec<i64> = events
        .iter()
        .filter(|r| is_attendance_event(r) && range.contains(&r.session_number))
        .map(|r| r.session_number)
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// Only the slot right after the current maximum may be claimed.
pub fn check_claim(events: &[AttendanceRecord], requested: i64) -> AppResult<i64> {
    let next = current_max(events) + 1;
    if next > MAX_SESSION_NUMBER {
        return Err(AppError::InvalidTransition(format!(
            "all {} sessions are already logged",
            MAX_SESSION_NUMBER
        )));
    }
    if requested != next {
        return Err(AppError::InvalidTransition(format!(
            "session {} cannot be claimed; next claimable session is {}",
            requested, next
        )));
    }
    Ok(next)
}

pub struct SessionClaim<'a> {
    pub package_id: &'a str,
    pub student_name: &'a str,
    pub session_number: i64,
    pub teacher: Option<(&'a str, &'a str)>,
    pub date: &'a str,
}

pub fn new_session_record(claim: &SessionClaim<'_>) -> AttendanceRecord {
    let (teacher_id, teacher_name) = claim
        .teacher
        .unwrap_or((SELF_STUDY_TEACHER_ID, SELF_STUDY_TEACHER_NAME));
    AttendanceRecord {
        id: new_record_id(),
        status: RecordStatus::SessionLog,
        teacher_id: teacher_id.to_string(),
        teacher_name: teacher_name.to_string(),
        package_id: claim.package_id.to_string(),
        session_number: claim.session_number,
        students_attended: vec![claim.student_name.trim().to_string()],
        student_topics: BTreeMap::new(),
        student_scores: BTreeMap::new(),
        student_narratives: BTreeMap::new(),
        periode: crate::model::periode_of_session(claim.session_number),
        date: claim.date.to_string(),
    }
}
