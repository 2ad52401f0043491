use crate::ledger::is_attendance_event;
use crate::model::{
    session_label, AttendanceRecord, StudentKey, MAX_PERIODE, SESSIONS_PER_PERIOD,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneSlot {
    pub slot: i64,
    pub session_number: i64,
    pub done: bool,
    pub date: Option<String>,
    pub teacher_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum MilestoneView {
    /// The ledger has not been fetched yet.
    Loading,
    #[serde(rename_all = "camelCase")]
    Ready {
        package_id: String,
        periode: i64,
        completed: usize,
        slots: Vec<MilestoneSlot>,
    },
}

impl MilestoneView {
    pub fn slots(&self) -> &[MilestoneSlot] {
        match self {
            MilestoneView::Loading => &[],
            MilestoneView::Ready { slots, .. } => slots,
        }
    }
}

/// Six-slot completion grid for one package, student and period.
///
/// When several rows log the same session, the earliest one (by date, then id)
/// fills the slot, so the result does not depend on ledger order.
pub fn derive_grid(
    ledger: Option<&[AttendanceRecord]>,
    package_id: &str,
    student: &StudentKey,
    periode: i64,
) -> MilestoneView {
    let Some(rows) = ledger else {
        return MilestoneView::Loading;
    };
    let periode = periode.clamp(1, MAX_PERIODE);

    let slots: Vec<MilestoneSlot> = (1..=SESSIONS_PER_PERIOD)
        .map(|slot| {
            let session_number = session_label(periode, slot);
            let hit = rows
                .iter()
                .filter(|r| {
                    is_attendance_event(r)
                        && r.package_id == package_id
                        && r.session_number == session_number
                        && &r.student_key() == student
                })
                .min_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
            MilestoneSlot {
                slot,
                session_number,
                done: hit.is_some(),
                date: hit.map(|r| r.date.clone()),
                teacher_name: hit.map(|r| r.teacher_name.clone()),
            }
        })
        .collect();

    MilestoneView::Ready {
        package_id: package_id.to_string(),
        periode,
        completed: slots.iter().filter(|s| s.done).count(),
        slots,
    }
}
