use crate::error::{AppError, AppResult};
use crate::model::{is_valid_periode, MAX_PERIODE};
use crate::workflow::{session_labels, AuthoringDraft};
use serde::Serialize;
use std::collections::HashMap;

/// What a teacher's inbox is currently doing. One value per teacher replaces
/// the separate modal/loading/selection flags.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum InboxState {
    #[default]
    Idle,
    #[serde(rename_all = "camelCase")]
    Viewing { report_id: String },
    #[serde(rename_all = "camelCase")]
    Authoring {
        report_id: String,
        draft: AuthoringDraft,
    },
    #[serde(rename_all = "camelCase")]
    ConfirmingReject { report_id: String },
    #[serde(rename_all = "camelCase")]
    Downloading { report_id: String, progress: u8 },
}

#[derive(Debug, Clone, Default)]
pub struct DraftPatch {
    pub topics: Option<Vec<String>>,
    pub scores: Option<Vec<i64>>,
    pub narrative: Option<String>,
    pub periode: Option<i64>,
}

impl InboxState {
    pub fn report_id(&self) -> Option<&str> {
        match self {
            InboxState::Idle => None,
            InboxState::Viewing { report_id }
            | InboxState::Authoring { report_id, .. }
            | InboxState::ConfirmingReject { report_id }
            | InboxState::Downloading { report_id, .. } => Some(report_id),
        }
    }

    /// Id of the action still running for this workflow, if any.
    pub fn in_flight_id(&self) -> Option<&str> {
        match self {
            InboxState::Downloading { report_id, .. } => Some(report_id),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&AuthoringDraft> {
        match self {
            InboxState::Authoring { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn ensure_not_busy(&self) -> AppResult<()> {
        if let Some(id) = self.in_flight_id() {
            return Err(AppError::Conflict(format!(
                "report {} is still being processed",
                id
            )));
        }
        Ok(())
    }

    pub fn view(&mut self, report_id: &str) -> AppResult<()> {
        self.ensure_not_busy()?;
        *self = InboxState::Viewing {
            report_id: report_id.to_string(),
        };
        Ok(())
    }

    pub fn begin_authoring(&mut self, draft: AuthoringDraft) -> AppResult<()> {
        self.ensure_not_busy()?;
        *self = InboxState::Authoring {
            report_id: draft.report_id.clone(),
            draft,
        };
        Ok(())
    }

    pub fn confirm_reject(&mut self, report_id: &str) -> AppResult<()> {
        self.ensure_not_busy()?;
        *self = InboxState::ConfirmingReject {
            report_id: report_id.to_string(),
        };
        Ok(())
    }

    pub fn update_draft(&mut self, patch: DraftPatch) -> AppResult<&AuthoringDraft> {
        let InboxState::Authoring { draft, .. } = self else {
            return Err(AppError::InvalidTransition(
                "no report is open for authoring".to_string(),
            ));
        };
        if let Some(periode) = patch.periode.filter(|p| !is_valid_periode(*p)) {
            return Err(AppError::BadParams(format!(
                "periode {periode} is outside 1..={MAX_PERIODE}"
            )));
        }
        if let Some(topics) = patch.topics {
            draft.form.topics = topics;
        }
        if let Some(scores) = patch.scores {
            draft.form.scores = scores;
        }
        if let Some(narrative) = patch.narrative {
            draft.form.narrative = narrative;
        }
        if let Some(periode) = patch.periode {
            draft.form.periode = periode;
            draft.session_labels = session_labels(periode);
        }
        Ok(&*draft)
    }

    /// Keeps the workspace open and flags the fields that blocked the save.
    pub fn mark_invalid(&mut self, fields: Vec<String>) {
        if let InboxState::Authoring { draft, .. } = self {
            draft.error = true;
            draft.invalid_fields = fields;
        }
    }

    /// Returns the state to restore with `finish_download`. Refused while a
    /// draft is open.
    pub fn begin_download(&mut self, report_id: &str) -> AppResult<InboxState> {
        self.ensure_not_busy()?;
        if let InboxState::Authoring { report_id: open, .. } = self {
            return Err(AppError::Conflict(format!(
                "report {} has an unsaved draft",
                open
            )));
        }
        Ok(std::mem::replace(
            self,
            InboxState::Downloading {
                report_id: report_id.to_string(),
                progress: 0,
            },
        ))
    }

    pub fn finish_download(&mut self, prior: InboxState) {
        *self = prior;
    }

    pub fn set_progress(&mut self, value: u8) {
        if let InboxState::Downloading { progress, .. } = self {
            *progress = value;
        }
    }

    pub fn close(&mut self) {
        *self = InboxState::Idle;
    }
}

#[derive(Debug, Default)]
pub struct Inboxes {
    by_teacher: HashMap<String, InboxState>,
}

impl Inboxes {
    pub fn get(&self, teacher_id: &str) -> InboxState {
        self.by_teacher.get(teacher_id).cloned().unwrap_or_default()
    }

    pub fn entry(&mut self, teacher_id: &str) -> &mut InboxState {
        self.by_teacher.entry(teacher_id.to_string()).or_default()
    }
}
