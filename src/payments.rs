use crate::error::{AppError, AppResult};
use crate::model::{is_valid_date, new_record_id, PaymentRecord, PaymentStatus, StudentKey};

const RECEIPT_PREFIX: &str = "data:image/";

/// `subject | level | room`, skipping blanks.
pub fn compose_class_name(subject: &str, level: &str, room: &str) -> String {
    [subject, level, room]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFields {
    pub student_name: String,
    pub class_name: String,
    pub amount: i64,
    pub date: String,
    pub receipt_data: String,
}

pub fn validate_fields(fields: &PaymentFields, max_receipt_bytes: usize) -> AppResult<()> {
    let mut bad = Vec::new();
    if fields.student_name.trim().is_empty() {
        bad.push("studentName".to_string());
    }
    if fields.class_name.trim().is_empty() {
        bad.push("className".to_string());
    }
    if fields.amount <= 0 {
        bad.push("amount".to_string());
    }
    if !is_valid_date(&fields.date) {
        bad.push("date".to_string());
    }
    if !fields.receipt_data.starts_with(RECEIPT_PREFIX)
        || !fields.receipt_data.contains(";base64,")
        || fields.receipt_data.len() > max_receipt_bytes
    {
        bad.push("receiptData".to_string());
    }
    if bad.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation("payment form is incomplete", bad))
    }
}

pub fn new_payment(fields: PaymentFields) -> PaymentRecord {
    PaymentRecord {
        id: new_record_id(),
        student_name: fields.student_name.trim().to_string(),
        class_name: fields.class_name.trim().to_string(),
        amount: fields.amount,
        date: fields.date,
        status: PaymentStatus::Pending,
        receipt_data: fields.receipt_data,
    }
}

/// Students may only touch their own payments, and only while pending.
pub fn ensure_mutable(p: &PaymentRecord, actor: &StudentKey) -> AppResult<()> {
    if &p.student_key() != actor {
        return Err(AppError::NotPermitted(
            "payment belongs to another student".to_string(),
        ));
    }
    if p.status == PaymentStatus::Verified {
        return Err(AppError::NotPermitted(
            "verified payments can no longer be changed".to_string(),
        ));
    }
    Ok(())
}

pub fn verify(p: &PaymentRecord) -> AppResult<PaymentRecord> {
    if p.status == PaymentStatus::Verified {
        return Err(AppError::InvalidTransition(
            "payment is already verified".to_string(),
        ));
    }
    let mut next = p.clone();
    next.status = PaymentStatus::Verified;
    Ok(next)
}

/// A verified payment is a package the student may log sessions against.
pub fn ensure_package_for(p: &PaymentRecord, student: &StudentKey) -> AppResult<()> {
    if &p.student_key() != student {
        return Err(AppError::NotPermitted(
            "package belongs to another student".to_string(),
        ));
    }
    if p.status != PaymentStatus::Verified {
        return Err(AppError::InvalidTransition(
            "package payment is not verified yet".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> PaymentFields {
        PaymentFields {
            student_name: "Budi".to_string(),
            class_name: compose_class_name("Math", "SD 5", "Room A"),
            amount: 450_000,
            date: "2025-01-05".to_string(),
            receipt_data: "data:image/jpeg;base64,AAAA".to_string(),
        }
    }

    #[test]
    fn class_name_is_composite() {
        assert_eq!(compose_class_name("Math", " SD 5 ", "Room A"), "Math | SD 5 | Room A");
        assert_eq!(compose_class_name("Math", "", "Room A"), "Math | Room A");
    }

    #[test]
    fn validation_lists_every_bad_field() {
        let mut f = fields();
        f.amount = 0;
        f.receipt_data = "not-an-image".to_string();
        let err = validate_fields(&f, 1024).expect_err("invalid");
        assert_eq!(
            err.details().expect("details")["fields"],
            serde_json::json!(["amount", "receiptData"])
        );
        assert!(validate_fields(&fields(), 1024).is_ok());
        assert!(validate_fields(&fields(), 8).is_err());
    }

    #[test]
    fn pending_is_mutable_verified_is_locked() {
        let owner = StudentKey::from_name("budi");
        let pending = new_payment(fields());
        assert!(ensure_mutable(&pending, &owner).is_ok());
        assert_eq!(
            ensure_mutable(&pending, &StudentKey::from_name("Sari"))
                .expect_err("other student")
                .code(),
            "not_permitted"
        );

        let verified = verify(&pending).expect("verify");
        assert_eq!(verified.status, PaymentStatus::Verified);
        assert_eq!(
            ensure_mutable(&verified, &owner).expect_err("locked").code(),
            "not_permitted"
        );
        assert!(verify(&verified).is_err());
    }

    #[test]
    fn only_verified_payments_are_packages() {
        let owner = StudentKey::from_name("Budi");
        let pending = new_payment(fields());
        assert!(ensure_package_for(&pending, &owner).is_err());
        let verified = verify(&pending).expect("verify");
        assert!(ensure_package_for(&verified, &owner).is_ok());
    }
}
