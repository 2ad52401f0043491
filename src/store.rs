//! Record store gateway: typed row access for `attendance`, `student_payments`
//! and the public `reports` table. Updates overwrite the whole row; the last
//! writer wins.

use crate::error::{AppError, AppResult};
use crate::model::{
    AttendanceRecord, PaymentRecord, PaymentStatus, PublicReport, RecordStatus, StudentKey,
};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

const ATTENDANCE_COLUMNS: &str = "id, status, teacher_id, teacher_name, package_id, session_number,
     students_attended, student_topics, student_scores, student_narratives,
     COALESCE(periode, 1), date";

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub package_id: Option<String>,
    pub student_key: Option<StudentKey>,
    pub teacher_id: Option<String>,
}

impl AttendanceFilter {
    pub fn for_package(package_id: &str, student: &StudentKey) -> Self {
        AttendanceFilter {
            package_id: Some(package_id.to_string()),
            student_key: Some(student.clone()),
            ..Default::default()
        }
    }
}

fn json_column<T: serde::de::DeserializeOwned + Default>(raw: Option<String>) -> T {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn attendance_from_row(r: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    let status_raw: String = r.get(1)?;
    let status = RecordStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown attendance status {status_raw}").into(),
        )
    })?;
    let students: String = r.get(6)?;
    Ok(AttendanceRecord {
        id: r.get(0)?,
        status,
        teacher_id: r.get(2)?,
        teacher_name: r.get(3)?,
        package_id: r.get(4)?,
        session_number: r.get(5)?,
        students_attended: json_column(Some(students)),
        student_topics: json_column(r.get(7)?),
        student_scores: json_column(r.get(8)?),
        student_narratives: json_column(r.get(9)?),
        periode: r.get(10)?,
        date: r.get(11)?,
    })
}

fn attendance_values(rec: &AttendanceRecord) -> AppResult<Vec<Value>> {
    Ok(vec![
        Value::Text(rec.status.as_str().to_string()),
        Value::Text(rec.teacher_id.clone()),
        Value::Text(rec.teacher_name.clone()),
        Value::Text(rec.package_id.clone()),
        Value::Integer(rec.session_number),
        Value::Text(serde_json::to_string(&rec.students_attended)?),
        Value::Text(rec.student_key().as_str().to_string()),
        Value::Text(serde_json::to_string(&rec.student_topics)?),
        Value::Text(serde_json::to_string(&rec.student_scores)?),
        Value::Text(serde_json::to_string(&rec.student_narratives)?),
        Value::Integer(rec.periode),
        Value::Text(rec.date.clone()),
        Value::Text(rec.id.clone()),
    ])
}

pub fn attendance_insert(conn: &Connection, rec: &AttendanceRecord) -> AppResult<()> {
    conn.execute(
        "INSERT INTO attendance(
            status, teacher_id, teacher_name, package_id, session_number,
            students_attended, student_key, student_topics, student_scores, student_narratives,
            periode, date, id)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params_from_iter(attendance_values(rec)?),
    )?;
    Ok(())
}

pub fn attendance_update(conn: &Connection, rec: &AttendanceRecord) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE attendance SET
            status = ?, teacher_id = ?, teacher_name = ?, package_id = ?, session_number = ?,
            students_attended = ?, student_key = ?, student_topics = ?, student_scores = ?,
            student_narratives = ?, periode = ?, date = ?
         WHERE id = ?",
        params_from_iter(attendance_values(rec)?),
    )?;
    if changed == 0 {
        return Err(AppError::NotFound("record"));
    }
    Ok(())
}

pub fn attendance_delete(conn: &Connection, id: &str) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM attendance WHERE id = ?", [id])?;
    Ok(changed > 0)
}

pub fn attendance_get(conn: &Connection, id: &str) -> AppResult<Option<AttendanceRecord>> {
    let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?");
    Ok(conn
        .query_row(&sql, [id], attendance_from_row)
        .optional()?)
}

pub fn attendance_require(conn: &Connection, id: &str) -> AppResult<AttendanceRecord> {
    attendance_get(conn, id)?.ok_or(AppError::NotFound("record"))
}

pub fn attendance_select(
    conn: &Connection,
    filter: &AttendanceFilter,
) -> AppResult<Vec<AttendanceRecord>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();
    if let Some(package_id) = &filter.package_id {
        clauses.push("package_id = ?");
        binds.push(Value::Text(package_id.clone()));
    }
    if let Some(key) = &filter.student_key {
        clauses.push("student_key = ?");
        binds.push(Value::Text(key.as_str().to_string()));
    }
    if let Some(teacher_id) = &filter.teacher_id {
        clauses.push("teacher_id = ?");
        binds.push(Value::Text(teacher_id.clone()));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance{where_sql} ORDER BY session_number, date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds), attendance_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Report rows that are still waiting for any teacher to claim them.
pub fn attendance_select_unassigned(conn: &Connection) -> AppResult<Vec<AttendanceRecord>> {
    let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE status = ? ORDER BY date, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            [RecordStatus::PendingReportAssignment.as_str()],
            attendance_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

const PAYMENT_COLUMNS: &str = "id, student_name, class_name, amount, date, status, receipt_data";

fn payment_from_row(r: &Row<'_>) -> rusqlite::Result<PaymentRecord> {
    let status_raw: String = r.get(5)?;
    let status = PaymentStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown payment status {status_raw}").into(),
        )
    })?;
    Ok(PaymentRecord {
        id: r.get(0)?,
        student_name: r.get(1)?,
        class_name: r.get(2)?,
        amount: r.get(3)?,
        date: r.get(4)?,
        status,
        receipt_data: r.get(6)?,
    })
}

pub fn payments_insert(conn: &Connection, p: &PaymentRecord) -> AppResult<()> {
    conn.execute(
        "INSERT INTO student_payments(id, student_name, student_key, class_name, amount, date, status, receipt_data)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &p.id,
            &p.student_name,
            p.student_key().as_str(),
            &p.class_name,
            p.amount,
            &p.date,
            p.status.as_str(),
            &p.receipt_data,
        ),
    )?;
    Ok(())
}

pub fn payments_update(conn: &Connection, p: &PaymentRecord) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE student_payments SET
            student_name = ?, student_key = ?, class_name = ?, amount = ?, date = ?, status = ?, receipt_data = ?
         WHERE id = ?",
        (
            &p.student_name,
            p.student_key().as_str(),
            &p.class_name,
            p.amount,
            &p.date,
            p.status.as_str(),
            &p.receipt_data,
            &p.id,
        ),
    )?;
    if changed == 0 {
        return Err(AppError::NotFound("payment"));
    }
    Ok(())
}

pub fn payments_delete(conn: &Connection, id: &str) -> AppResult<bool> {
    let changed = conn.execute("DELETE FROM student_payments WHERE id = ?", [id])?;
    Ok(changed > 0)
}

pub fn payments_get(conn: &Connection, id: &str) -> AppResult<Option<PaymentRecord>> {
    let sql = format!("SELECT {PAYMENT_COLUMNS} FROM student_payments WHERE id = ?");
    Ok(conn.query_row(&sql, [id], payment_from_row).optional()?)
}

pub fn payments_require(conn: &Connection, id: &str) -> AppResult<PaymentRecord> {
    payments_get(conn, id)?.ok_or(AppError::NotFound("payment"))
}

pub fn payments_select(
    conn: &Connection,
    student: Option<&StudentKey>,
) -> AppResult<Vec<PaymentRecord>> {
    let (sql, binds) = match student {
        Some(key) => (
            format!(
                "SELECT {PAYMENT_COLUMNS} FROM student_payments WHERE student_key = ? ORDER BY date DESC, id DESC"
            ),
            vec![Value::Text(key.as_str().to_string())],
        ),
        None => (
            format!("SELECT {PAYMENT_COLUMNS} FROM student_payments ORDER BY date DESC, id DESC"),
            Vec::new(),
        ),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(binds), payment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn public_report_upsert(conn: &Connection, r: &PublicReport) -> AppResult<()> {
    conn.execute(
        "INSERT INTO reports(id, studentname, classname, teachername, periode, average, ispass, date)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           studentname = excluded.studentname,
           classname = excluded.classname,
           teachername = excluded.teachername,
           periode = excluded.periode,
           average = excluded.average,
           ispass = excluded.ispass,
           date = excluded.date",
        (
            &r.id,
            &r.studentname,
            &r.classname,
            &r.teachername,
            r.periode,
            r.average,
            r.ispass as i64,
            &r.date,
        ),
    )?;
    Ok(())
}

pub fn public_report_get(conn: &Connection, id: &str) -> AppResult<Option<PublicReport>> {
    Ok(conn
        .query_row(
            "SELECT id, studentname, classname, teachername, periode, average, ispass, date
             FROM reports WHERE id = ?",
            [id],
            |r| {
                Ok(PublicReport {
                    id: r.get(0)?,
                    studentname: r.get(1)?,
                    classname: r.get(2)?,
                    teachername: r.get(3)?,
                    periode: r.get(4)?,
                    average: r.get(5)?,
                    ispass: r.get::<_, i64>(6)? != 0,
                    date: r.get(7)?,
                })
            },
        )
        .optional()?)
}
