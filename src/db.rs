use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "rapot.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;

    // One physical row serves both as an attendance event and as a report artifact.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            teacher_id TEXT NOT NULL,
            teacher_name TEXT NOT NULL,
            package_id TEXT NOT NULL,
            session_number INTEGER NOT NULL,
            students_attended TEXT NOT NULL,
            student_topics TEXT,
            student_scores TEXT,
            student_narratives TEXT,
            periode INTEGER,
            date TEXT NOT NULL
        )",
        [],
    )?;
    ensure_attendance_student_key(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_package_student ON attendance(package_id, student_key)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_teacher ON attendance(teacher_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_payments(
            id TEXT PRIMARY KEY,
            student_name TEXT NOT NULL,
            student_key TEXT NOT NULL,
            class_name TEXT NOT NULL,
            amount INTEGER NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            receipt_data TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_payments_student ON student_payments(student_key)",
        [],
    )?;

    // Public verification table; field names stay lowercase.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reports(
            id TEXT PRIMARY KEY,
            studentname TEXT NOT NULL,
            classname TEXT NOT NULL,
            teachername TEXT NOT NULL,
            periode INTEGER NOT NULL,
            average INTEGER NOT NULL,
            ispass INTEGER NOT NULL,
            date TEXT NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

fn ensure_attendance_student_key(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "attendance", "student_key")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE attendance ADD COLUMN student_key TEXT NOT NULL DEFAULT ''",
        [],
    )?;

    // Backfill from the first attended student of each row.
    let mut stmt = conn.prepare("SELECT id, students_attended FROM attendance")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (id, students_json) in rows {
        let students: Vec<String> = serde_json::from_str(&students_json).unwrap_or_default();
        let key = crate::model::StudentKey::from_name(
            students.first().map(|s| s.as_str()).unwrap_or(""),
        );
        conn.execute(
            "UPDATE attendance SET student_key = ? WHERE id = ?",
            (key.as_str(), &id),
        )?;
    }
    Ok(())
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
