//! Page templates built from stored records. A template is a flat list of
//! blocks that a rasterizer lays out top to bottom.

use crate::config::AppConfig;
use crate::milestones::MilestoneView;
use crate::model::{AttendanceRecord, PaymentRecord};
use crate::workflow::{average_score, is_pass, session_labels};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading(String),
    Line(String),
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Spacer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub id: String,
    pub blocks: Vec<Block>,
}

pub fn certificate_id(report_id: &str) -> String {
    format!("certificate-{report_id}")
}

pub fn transcript_id(report_id: &str) -> String {
    format!("transcript-{report_id}")
}

pub fn milestone_id(report_id: &str) -> String {
    format!("milestone-{report_id}")
}

pub fn receipt_id(payment_id: &str) -> String {
    format!("receipt-{payment_id}")
}

/// `450000` -> `Rp 450.000`
pub fn format_amount(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if amount < 0 {
        format!("Rp -{out}")
    } else {
        format!("Rp {out}")
    }
}

pub struct ReportContext<'a> {
    pub report: &'a AttendanceRecord,
    pub class_name: &'a str,
    pub milestones: &'a MilestoneView,
    pub config: &'a AppConfig,
}

fn result_label(average: i64) -> &'static str {
    if is_pass(average) {
        "PASSED"
    } else {
        "NOT YET PASSED"
    }
}

fn certificate(ctx: &ReportContext<'_>, average: i64) -> Template {
    let rec = ctx.report;
    let mut blocks = vec![
        Block::Title("CERTIFICATE OF COMPLETION".to_string()),
        Block::Line(ctx.config.school.name.clone()),
        Block::Spacer,
        Block::Line("This certifies that".to_string()),
        Block::Heading(rec.student_name().to_string()),
        Block::Line(format!(
            "has completed periode {} of {}",
            rec.periode, ctx.class_name
        )),
        Block::Line(format!("Final score {} ({})", average, result_label(average))),
        Block::Spacer,
        Block::Line(format!("Teacher: {}", rec.teacher_name)),
    ];
    let place = if ctx.config.school.city.is_empty() {
        rec.date.clone()
    } else {
        format!("{}, {}", ctx.config.school.city, rec.date)
    };
    blocks.push(Block::Line(place));
    blocks.push(Block::Line(format!("Certificate no. {}", rec.id)));
    if let Some(link) = ctx.config.verify.link_for(&rec.id) {
        blocks.push(Block::Line(format!("Verify at {link}")));
    }
    Template {
        id: certificate_id(&rec.id),
        blocks,
    }
}

fn transcript(ctx: &ReportContext<'_>, scores: &[i64], average: i64) -> Template {
    let rec = ctx.report;
    let topics = rec.topics().cloned().unwrap_or_default();
    let rows = session_labels(rec.periode)
        .into_iter()
        .enumerate()
        .map(|(i, label)| {
            vec![
                format!("Session {label}"),
                topics.get(i).cloned().unwrap_or_default(),
                scores.get(i).map(|s| s.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    Template {
        id: transcript_id(&rec.id),
        blocks: vec![
            Block::Title("LEARNING REPORT".to_string()),
            Block::Line(format!("Student: {}", rec.student_name())),
            Block::Line(format!("Class: {}", ctx.class_name)),
            Block::Line(format!("Periode: {}", rec.periode)),
            Block::Spacer,
            Block::Table {
                headers: vec!["Session".into(), "Material".into(), "Score".into()],
                rows,
            },
            Block::Line(format!("Average: {} ({})", average, result_label(average))),
            Block::Spacer,
            Block::Heading("Teacher's notes".to_string()),
            Block::Line(rec.narrative().cloned().unwrap_or_default()),
        ],
    }
}

fn milestone(ctx: &ReportContext<'_>) -> Option<Template> {
    let MilestoneView::Ready {
        periode, completed, ..
    } = ctx.milestones
    else {
        return None;
    };
    let slots = ctx.milestones.slots();
    let rows = slots
        .iter()
        .map(|s| {
            vec![
                format!("Session {}", s.session_number),
                if s.done { "done" } else { "-" }.to_string(),
                s.date.clone().unwrap_or_default(),
                s.teacher_name.clone().unwrap_or_default(),
            ]
        })
        .collect();
    Some(Template {
        id: milestone_id(&ctx.report.id),
        blocks: vec![
            Block::Title("LEARNING MILESTONES".to_string()),
            Block::Line(format!("Student: {}", ctx.report.student_name())),
            Block::Line(format!("Periode {}: {} of {} sessions", periode, completed, slots.len())),
            Block::Spacer,
            Block::Table {
                headers: vec!["Session".into(), "Status".into(), "Date".into(), "Teacher".into()],
                rows,
            },
        ],
    })
}

/// Templates for one report keyed by id. The milestone page is absent while
/// the ledger is still loading.
pub fn report_templates(ctx: &ReportContext<'_>) -> HashMap<String, Template> {
    let scores = ctx.report.scores().cloned().unwrap_or_default();
    let average = average_score(&scores);
    let mut out = HashMap::new();
    for t in [Some(certificate(ctx, average)), Some(transcript(ctx, &scores, average)), milestone(ctx)]
        .into_iter()
        .flatten()
    {
        out.insert(t.id.clone(), t);
    }
    out
}

pub fn receipt_template(payment: &PaymentRecord, config: &AppConfig) -> Template {
    Template {
        id: receipt_id(&payment.id),
        blocks: vec![
            Block::Title("PAYMENT RECEIPT".to_string()),
            Block::Line(config.school.name.clone()),
            Block::Spacer,
            Block::Table {
                headers: vec!["Item".into(), "Detail".into()],
                rows: vec![
                    vec!["Receipt no.".into(), payment.id.clone()],
                    vec!["Student".into(), payment.student_name.clone()],
                    vec!["Class".into(), payment.class_name.clone()],
                    vec!["Date".into(), payment.date.clone()],
                    vec!["Amount".into(), format_amount(payment.amount)],
                    vec!["Status".into(), payment.status.as_str().to_string()],
                ],
            },
        ],
    }
}
