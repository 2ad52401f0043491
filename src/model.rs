use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const SESSIONS_PER_PERIOD: i64 = 6;
pub const MAX_PERIODE: i64 = 10;
pub const MAX_SESSION_NUMBER: i64 = SESSIONS_PER_PERIOD * MAX_PERIODE;
pub const PASS_THRESHOLD: i64 = 80;
pub const DEFAULT_SESSION_SCORE: i64 = 90;

pub const SELF_STUDY_TEACHER_ID: &str = "SELF_STUDY";
pub const SELF_STUDY_TEACHER_NAME: &str = "Self Study";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    SessionLog,
    ReportRequest,
    PendingReportAssignment,
    ReportProcessing,
    ReportReady,
    ReportSent,
    ReportRejected,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::SessionLog => "SESSION_LOG",
            RecordStatus::ReportRequest => "REPORT_REQUEST",
            RecordStatus::PendingReportAssignment => "PENDING_REPORT_ASSIGNMENT",
            RecordStatus::ReportProcessing => "REPORT_PROCESSING",
            RecordStatus::ReportReady => "REPORT_READY",
            RecordStatus::ReportSent => "REPORT_SENT",
            RecordStatus::ReportRejected => "REPORT_REJECTED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "SESSION_LOG" => Some(RecordStatus::SessionLog),
            "REPORT_REQUEST" => Some(RecordStatus::ReportRequest),
            "PENDING_REPORT_ASSIGNMENT" => Some(RecordStatus::PendingReportAssignment),
            "REPORT_PROCESSING" => Some(RecordStatus::ReportProcessing),
            "REPORT_READY" => Some(RecordStatus::ReportReady),
            "REPORT_SENT" => Some(RecordStatus::ReportSent),
            "REPORT_REJECTED" => Some(RecordStatus::ReportRejected),
            _ => None,
        }
    }

    /// Waiting for a teacher to claim it.
    pub fn is_open_request(self) -> bool {
        matches!(
            self,
            RecordStatus::ReportRequest | RecordStatus::PendingReportAssignment
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Verified,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Verified => "VERIFIED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "PENDING" => Some(PaymentStatus::Pending),
            "VERIFIED" => Some(PaymentStatus::Verified),
            _ => None,
        }
    }
}

/// Normalised student identity used for every join. Names stay display-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentKey(String);

impl StudentKey {
    pub fn from_name(name: &str) -> Self {
        let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
        StudentKey(collapsed.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub status: RecordStatus,
    pub teacher_id: String,
    pub teacher_name: String,
    pub package_id: String,
    pub session_number: i64,
    pub students_attended: Vec<String>,
    #[serde(default)]
    pub student_topics: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub student_scores: BTreeMap<String, Vec<i64>>,
    #[serde(default)]
    pub student_narratives: BTreeMap<String, String>,
    pub periode: i64,
    pub date: String,
}

impl AttendanceRecord {
    pub fn student_name(&self) -> &str {
        self.students_attended
            .first()
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn student_key(&self) -> StudentKey {
        StudentKey::from_name(self.student_name())
    }

    pub fn is_self_study(&self) -> bool {
        self.teacher_id == SELF_STUDY_TEACHER_ID
    }

    pub fn scores(&self) -> Option<&Vec<i64>> {
        lookup_by_student(&self.student_scores, self.student_name())
    }

    pub fn topics(&self) -> Option<&Vec<String>> {
        lookup_by_student(&self.student_topics, self.student_name())
    }

    pub fn narrative(&self) -> Option<&String> {
        lookup_by_student(&self.student_narratives, self.student_name())
    }

    pub fn has_report_content(&self) -> bool {
        self.scores().map(|s| !s.is_empty()).unwrap_or(false)
    }
}

// Maps are keyed by the display name as written; fall back to key equality.
fn lookup_by_student<'a, T>(map: &'a BTreeMap<String, T>, name: &str) -> Option<&'a T> {
    if let Some(v) = map.get(name) {
        return Some(v);
    }
    let key = StudentKey::from_name(name);
    map.iter()
        .find(|(k, _)| StudentKey::from_name(k) == key)
        .map(|(_, v)| v)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub student_name: String,
    pub class_name: String,
    pub amount: i64,
    pub date: String,
    pub status: PaymentStatus,
    pub receipt_data: String,
}

impl PaymentRecord {
    pub fn student_key(&self) -> StudentKey {
        StudentKey::from_name(&self.student_name)
    }
}

/// Row of the public verification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicReport {
    pub id: String,
    pub studentname: String,
    pub classname: String,
    pub teachername: String,
    pub periode: i64,
    pub average: i64,
    pub ispass: bool,
    pub date: String,
}

pub fn new_record_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{:013}-{}", millis, &suffix[..8])
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub fn is_valid_date(raw: &str) -> bool {
    raw.len() == 10 && NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

pub fn is_valid_periode(periode: i64) -> bool {
    (1..=MAX_PERIODE).contains(&periode)
}

/// Out-of-range periods are clamped into `1..=MAX_PERIODE`.
pub fn period_range(periode: i64) -> RangeInclusive<i64> {
    let p = periode.clamp(1, MAX_PERIODE);
    ((p - 1) * SESSIONS_PER_PERIOD + 1)..=(p * SESSIONS_PER_PERIOD)
}

pub fn periode_of_session(session_number: i64) -> i64 {
    (session_number.max(1) - 1) / SESSIONS_PER_PERIOD + 1
}

/// Absolute session number shown for a 1..6 slot inside a period.
pub fn session_label(periode: i64, local_index: i64) -> i64 {
    (periode.clamp(1, MAX_PERIODE) - 1) * SESSIONS_PER_PERIOD + local_index
}
