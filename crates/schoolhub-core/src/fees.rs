//! # Fees
//!
//! Fee structures per class and academic year, payments with receipts,
//! per-student balances and collection reports.
//!
//! Every payment has exactly one receipt, created in the same transaction
//! and numbered `REC<yyyymmdd><payment id:06>`. A payment's date never
//! changes after it is recorded.

use crate::academic::{AcademicYear, SchoolClass, active_year};
use crate::error::{CoreError, Result};
use crate::form::{self, optional_date};
use crate::money::Money;
use crate::storage::{Reader, Tx};
use crate::students::Student;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Shown in a fee status when no academic year is active.
pub const NO_ACTIVE_YEAR_NOTE: &str =
    "No active academic year configured. Please set an active academic year in Configuration.";

// =============================================================================
// FEE STRUCTURE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStructure {
    pub id: u64,
    pub class_id: u64,
    pub academic_year_id: u64,
    pub tuition_fee: Option<Money>,
    pub admission_fee: Option<Money>,
    pub exam_fee: Option<Money>,
    pub transport_fee: Option<Money>,
    pub library_fee: Option<Money>,
    pub lab_fee: Option<Money>,
    pub sports_fee: Option<Money>,
    pub other_fee: Option<Money>,
    pub total_fee: Money,
    pub installment_type: Option<String>,
    pub description: Option<String>,
}

crate::record!(FeeStructure, "fee_structures", "Fee Structure");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStructureInput {
    pub class_id: u64,
    /// Defaults to the active academic year.
    #[serde(default)]
    pub academic_year_id: Option<u64>,
    #[serde(default)]
    pub tuition_fee: Option<Money>,
    #[serde(default)]
    pub admission_fee: Option<Money>,
    #[serde(default)]
    pub exam_fee: Option<Money>,
    #[serde(default)]
    pub transport_fee: Option<Money>,
    #[serde(default)]
    pub library_fee: Option<Money>,
    #[serde(default)]
    pub lab_fee: Option<Money>,
    #[serde(default)]
    pub sports_fee: Option<Money>,
    #[serde(default)]
    pub other_fee: Option<Money>,
    /// Defaults to the sum of the components.
    #[serde(default)]
    pub total_fee: Option<Money>,
    #[serde(default)]
    pub installment_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FeeStructureInput {
    fn components(&self) -> [Option<Money>; 8] {
        [
            self.tuition_fee,
            self.admission_fee,
            self.exam_fee,
            self.transport_fee,
            self.library_fee,
            self.lab_fee,
            self.sports_fee,
            self.other_fee,
        ]
    }

    fn validate(&self, r: &impl Reader) -> Result<u64> {
        r.ensure::<SchoolClass>(self.class_id)?;
        let components = self.components();
        let all = components.iter().flatten().chain(self.total_fee.iter());
        if all.copied().any(|m| m < Money::ZERO) {
            return Err(CoreError::validation("Fee amounts cannot be negative"));
        }
        match self.academic_year_id {
            Some(id) => {
                r.ensure::<AcademicYear>(id)?;
                Ok(id)
            }
            None => active_year(r)?.map(|y| y.id).ok_or_else(|| {
                CoreError::validation("No active academic year; academicYearId is required")
            }),
        }
    }

    fn into_structure(self, id: u64, academic_year_id: u64) -> FeeStructure {
        let total_fee = self
            .total_fee
            .unwrap_or_else(|| self.components().iter().flatten().sum());
        FeeStructure {
            id,
            class_id: self.class_id,
            academic_year_id,
            tuition_fee: self.tuition_fee,
            admission_fee: self.admission_fee,
            exam_fee: self.exam_fee,
            transport_fee: self.transport_fee,
            library_fee: self.library_fee,
            lab_fee: self.lab_fee,
            sports_fee: self.sports_fee,
            other_fee: self.other_fee,
            total_fee,
            installment_type: form::clean(self.installment_type),
            description: form::clean(self.description),
        }
    }
}

fn ensure_structure_free(r: &impl Reader, class_id: u64, year_id: u64, except: u64) -> Result<()> {
    let clash = r.find::<FeeStructure>(|f| {
        f.id != except && f.class_id == class_id && f.academic_year_id == year_id
    })?;
    if clash.is_some() {
        return Err(CoreError::conflict(
            "A fee structure already exists for this class and academic year",
        ));
    }
    Ok(())
}

pub fn create_structure(tx: &mut Tx, input: FeeStructureInput) -> Result<FeeStructure> {
    let year = input.validate(tx)?;
    ensure_structure_free(tx, input.class_id, year, 0)?;
    tx.insert(input.into_structure(0, year))
}

pub fn update_structure(tx: &mut Tx, id: u64, input: FeeStructureInput) -> Result<FeeStructure> {
    tx.ensure::<FeeStructure>(id)?;
    let year = input.validate(tx)?;
    ensure_structure_free(tx, input.class_id, year, id)?;
    let structure = input.into_structure(id, year);
    tx.put(&structure)?;
    Ok(structure)
}

pub fn delete_structure(tx: &mut Tx, id: u64) -> Result<()> {
    tx.remove::<FeeStructure>(id)?;
    Ok(())
}

pub fn structure_for(
    r: &impl Reader,
    class_id: u64,
    academic_year_id: u64,
) -> Result<Option<FeeStructure>> {
    r.find::<FeeStructure>(|f| f.class_id == class_id && f.academic_year_id == academic_year_id)
}

// =============================================================================
// PAYMENTS AND RECEIPTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePayment {
    pub id: u64,
    pub student_id: u64,
    pub academic_year_id: u64,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub payment_mode: Option<String>,
    pub transaction_id: Option<String>,
    pub cheque_no: Option<String>,
    pub bank_name: Option<String>,
    pub remarks: Option<String>,
    pub collected_by: Option<String>,
}

crate::record!(FeePayment, "fee_payments", "Fee Payment");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeReceipt {
    pub id: u64,
    pub payment_id: u64,
    pub receipt_no: String,
    pub receipt_url: Option<String>,
}

crate::record!(FeeReceipt, "fee_receipts", "Fee Receipt");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    pub student_id: u64,
    /// Defaults to the active academic year.
    #[serde(default)]
    pub academic_year_id: Option<u64>,
    pub amount: Money,
    /// Defaults to today.
    #[serde(default, deserialize_with = "optional_date")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_mode: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub cheque_no: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    /// Defaults to the caller.
    #[serde(default)]
    pub collected_by: Option<String>,
}

/// Editable payment fields. The payment date is not among them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub amount: Money,
    #[serde(default)]
    pub payment_mode: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentWithReceipt {
    pub payment: FeePayment,
    pub receipt: FeeReceipt,
}

fn receipt_number(date: NaiveDate, payment_id: u64) -> String {
    format!("REC{}{:06}", date.format("%Y%m%d"), payment_id)
}

fn ensure_positive(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(CoreError::validation("Amount must be greater than zero"));
    }
    Ok(())
}

pub fn payments_for_student(r: &impl Reader, student_id: u64) -> Result<Vec<FeePayment>> {
    r.ensure::<Student>(student_id)?;
    r.filter::<FeePayment>(|p| p.student_id == student_id)
}

/// Record a payment and its receipt.
pub fn record_payment(
    tx: &mut Tx,
    input: PaymentInput,
    actor: &str,
    today: NaiveDate,
) -> Result<PaymentWithReceipt> {
    tx.ensure::<Student>(input.student_id)?;
    ensure_positive(input.amount)?;
    let academic_year_id = match input.academic_year_id {
        Some(id) => {
            tx.ensure::<AcademicYear>(id)?;
            id
        }
        None => active_year(tx)?.map(|y| y.id).ok_or_else(|| {
            CoreError::validation("No active academic year; academicYearId is required")
        })?,
    };
    let payment = tx.insert(FeePayment {
        id: 0,
        student_id: input.student_id,
        academic_year_id,
        amount: input.amount,
        payment_date: input.payment_date.unwrap_or(today),
        payment_mode: form::clean(input.payment_mode),
        transaction_id: form::clean(input.transaction_id),
        cheque_no: form::clean(input.cheque_no),
        bank_name: form::clean(input.bank_name),
        remarks: form::clean(input.remarks),
        collected_by: form::clean(input.collected_by).or_else(|| Some(actor.to_string())),
    })?;
    let receipt = tx.insert(FeeReceipt {
        id: 0,
        payment_id: payment.id,
        receipt_no: receipt_number(payment.payment_date, payment.id),
        receipt_url: None,
    })?;
    Ok(PaymentWithReceipt { payment, receipt })
}

pub fn update_payment(tx: &mut Tx, id: u64, input: PaymentUpdate) -> Result<FeePayment> {
    let mut payment = tx.fetch::<FeePayment>(id)?;
    ensure_positive(input.amount)?;
    payment.amount = input.amount;
    payment.payment_mode = form::clean(input.payment_mode);
    payment.transaction_id = form::clean(input.transaction_id);
    payment.remarks = form::clean(input.remarks);
    tx.put(&payment)?;
    Ok(payment)
}

/// Delete a payment together with its receipt.
pub fn delete_payment(tx: &mut Tx, id: u64) -> Result<()> {
    tx.ensure::<FeePayment>(id)?;
    for receipt in tx.filter::<FeeReceipt>(|r| r.payment_id == id)? {
        tx.remove::<FeeReceipt>(receipt.id)?;
    }
    tx.remove::<FeePayment>(id)?;
    Ok(())
}

/// Look up a receipt and its payment by receipt number.
pub fn receipt_by_number(r: &impl Reader, receipt_no: &str) -> Result<PaymentWithReceipt> {
    let receipt_no = receipt_no.trim();
    let receipt = r
        .find::<FeeReceipt>(|rec| rec.receipt_no == receipt_no)?
        .ok_or_else(|| CoreError::not_found("Fee Receipt", "receiptNo", receipt_no))?;
    let payment = r.fetch::<FeePayment>(receipt.payment_id)?;
    Ok(PaymentWithReceipt { payment, receipt })
}

// =============================================================================
// BALANCES AND REPORTS
// =============================================================================

/// What a student owes for the active academic year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStatus {
    pub total_fee: Money,
    pub paid_amount: Money,
    pub pending_amount: Money,
    pub fee_structure: Option<FeeStructure>,
    pub payments: Vec<FeePayment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

pub fn fee_status(r: &impl Reader, student_id: u64) -> Result<FeeStatus> {
    let student = r.fetch::<Student>(student_id)?;
    let Some(year) = active_year(r)? else {
        return Ok(FeeStatus {
            total_fee: Money::ZERO,
            paid_amount: Money::ZERO,
            pending_amount: Money::ZERO,
            fee_structure: None,
            payments: Vec::new(),
            note: Some(NO_ACTIVE_YEAR_NOTE.to_string()),
        });
    };
    let fee_structure = match student.class_id {
        Some(class_id) => structure_for(r, class_id, year.id)?,
        None => None,
    };
    let total_fee = fee_structure.as_ref().map(|f| f.total_fee).unwrap_or(Money::ZERO);
    let payments =
        r.filter::<FeePayment>(|p| p.student_id == student_id && p.academic_year_id == year.id)?;
    let paid_amount: Money = payments.iter().map(|p| p.amount).sum();
    Ok(FeeStatus {
        total_fee,
        paid_amount,
        pending_amount: total_fee.saturating_sub(paid_amount),
        fee_structure,
        payments,
        note: None,
    })
}

/// Payments collected in an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub payments: Vec<FeePayment>,
    pub total_collection: Money,
    pub payment_count: usize,
}

pub fn collection_between(r: &impl Reader, start: NaiveDate, end: NaiveDate) -> Result<Collection> {
    if end < start {
        return Err(CoreError::validation("End date must not be before start date"));
    }
    let mut payments =
        r.filter::<FeePayment>(|p| p.payment_date >= start && p.payment_date <= end)?;
    payments.sort_by_key(|p| (p.payment_date, p.id));
    Ok(Collection {
        total_collection: payments.iter().map(|p| p.amount).sum(),
        payment_count: payments.len(),
        payments,
    })
}

// =============================================================================
// TESTS
// =============================================================================
