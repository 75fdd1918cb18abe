// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text-backed enum: `as_str`, `FromStr`, `Display` and SQLite conversions.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(LedgerError::validation(format!(
                        "Unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: LedgerError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Stocks,
    MutualFunds,
    FixedDeposit,
    RecurringDeposit,
    Bonds,
    Gold,
    RealEstate,
    ProvidentFund,
    Pension,
    Crypto,
    Loan,
    Cash,
    BankAccount,
    Insurance,
    DailyBillChecklist,
    FamilyDocument,
}

text_enum!(Category {
    Stocks => "stocks",
    MutualFunds => "mutual-funds",
    FixedDeposit => "fixed-deposit",
    RecurringDeposit => "recurring-deposit",
    Bonds => "bonds",
    Gold => "gold",
    RealEstate => "real-estate",
    ProvidentFund => "provident-fund",
    Pension => "pension",
    Crypto => "crypto",
    Loan => "loan",
    Cash => "cash",
    BankAccount => "bank-account",
    Insurance => "insurance",
    DailyBillChecklist => "daily-bill-checklist",
    FamilyDocument => "family-document",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Monthly,
    Quarterly,
    Yearly,
    OneTime,
}

text_enum!(Frequency {
    Monthly => "monthly",
    Quarterly => "quarterly",
    Yearly => "yearly",
    OneTime => "one-time",
});

impl Frequency {
    /// Length of one period in months, `None` for one-time.
    pub fn months(&self) -> Option<u32> {
        match self {
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::Yearly => Some(12),
            Frequency::OneTime => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    #[default]
    Active,
    Paid,
    Cancelled,
}

text_enum!(RecordStatus {
    Active => "active",
    Paid => "paid",
    Cancelled => "cancelled",
});

/// Fifty years of monthly installments.
pub const MAX_TENURE_MONTHS: u32 = 600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDetails {
    pub principal: Decimal,
    /// Annual percentage rate, e.g. `8.5`.
    pub annual_rate: Decimal,
    pub tenure_months: u32,
    #[serde(default)]
    pub lender: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositDetails {
    pub interest_rate: Decimal,
    #[serde(default)]
    pub compounding: Option<Frequency>,
    #[serde(default)]
    pub auto_renew: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceDetails {
    pub policy_number: String,
    #[serde(default)]
    pub sum_assured: Option<Decimal>,
    #[serde(default)]
    pub premium: Option<Decimal>,
    #[serde(default)]
    pub nominee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDetails {
    pub biller: String,
    #[serde(default)]
    pub consumer_number: Option<String>,
    #[serde(default)]
    pub due_day: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingDetails {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub folio: Option<String>,
    #[serde(default)]
    pub broker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDetails {
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub ifsc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDetails {
    pub document_number: String,
    #[serde(default)]
    pub issued_by: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Category-specific fields, one variant per family of categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RecordDetails {
    #[default]
    None,
    Loan(LoanDetails),
    Deposit(DepositDetails),
    Insurance(InsuranceDetails),
    Bill(BillDetails),
    Holding(HoldingDetails),
    Account(AccountDetails),
    Document(DocumentDetails),
}

impl RecordDetails {
    pub fn kind(&self) -> &'static str {
        match self {
            RecordDetails::None => "none",
            RecordDetails::Loan(_) => "loan",
            RecordDetails::Deposit(_) => "deposit",
            RecordDetails::Insurance(_) => "insurance",
            RecordDetails::Bill(_) => "bill",
            RecordDetails::Holding(_) => "holding",
            RecordDetails::Account(_) => "account",
            RecordDetails::Document(_) => "document",
        }
    }

    /// Parse user-supplied JSON, rejecting unknown kinds and malformed fields.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(raw)
            .map_err(|e| LedgerError::validation(format!("Invalid details JSON: {}", e)))
    }

    pub fn validate_for(&self, category: Category) -> Result<(), LedgerError> {
        use Category::*;
        let allowed = match self {
            RecordDetails::None => true,
            RecordDetails::Loan(_) => category == Loan,
            RecordDetails::Deposit(_) => matches!(
                category,
                FixedDeposit | RecurringDeposit | Bonds | ProvidentFund | Pension
            ),
            RecordDetails::Insurance(_) => category == Insurance,
            RecordDetails::Bill(_) => category == DailyBillChecklist,
            RecordDetails::Holding(_) => {
                matches!(category, Stocks | MutualFunds | Gold | Crypto | RealEstate)
            }
            RecordDetails::Account(_) => matches!(category, BankAccount | Cash),
            RecordDetails::Document(_) => category == FamilyDocument,
        };
        if !allowed {
            return Err(LedgerError::validation(format!(
                "Details of kind '{}' do not apply to category '{}'",
                self.kind(),
                category
            )));
        }
        match self {
            RecordDetails::Loan(l) => {
                if l.principal <= Decimal::ZERO {
                    return Err(LedgerError::validation("Loan principal must be positive"));
                }
                if l.annual_rate < Decimal::ZERO {
                    return Err(LedgerError::validation("Loan rate cannot be negative"));
                }
                if l.annual_rate > Decimal::ONE_HUNDRED {
                    return Err(LedgerError::validation("Loan rate cannot exceed 100%"));
                }
                if !(1..=MAX_TENURE_MONTHS).contains(&l.tenure_months) {
                    return Err(LedgerError::validation(format!(
                        "Loan tenure must be between 1 and {} months",
                        MAX_TENURE_MONTHS
                    )));
                }
            }
            RecordDetails::Bill(b) => {
                if let Some(day) = b.due_day {
                    if !(1..=31).contains(&day) {
                        return Err(LedgerError::validation(format!(
                            "Bill due day {} is outside 1-31",
                            day
                        )));
                    }
                }
            }
            RecordDetails::Insurance(i) if i.policy_number.trim().is_empty() => {
                return Err(LedgerError::validation("Policy number is required"));
            }
            RecordDetails::Document(d) if d.document_number.trim().is_empty() => {
                return Err(LedgerError::validation("Document number is required"));
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: i64,
    pub user_id: String,
    pub category: Category,
    pub r#type: Option<String>,
    pub name: String,
    pub provider: Option<String>,
    pub quantity: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub current_value: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub payable_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub storage_type: Option<String>,
    pub returns: Option<Decimal>,
    pub returns_percentage: Option<Decimal>,
    pub status: RecordStatus,
    pub details: RecordDetails,
    pub version: i64,
}

impl FinancialRecord {
    pub fn new(user_id: &str, category: Category, name: &str) -> Self {
        FinancialRecord {
            id: 0,
            user_id: user_id.to_string(),
            category,
            r#type: None,
            name: name.to_string(),
            provider: None,
            quantity: None,
            purchase_price: None,
            current_value: None,
            amount: None,
            start_date: None,
            maturity_date: None,
            payable_date: None,
            frequency: None,
            storage_type: None,
            returns: None,
            returns_percentage: None,
            status: RecordStatus::Active,
            details: RecordDetails::None,
            version: 0,
        }
    }

    /// `payable_date ?? maturity_date ?? start_date`.
    pub fn target_date(&self) -> Option<NaiveDate> {
        self.payable_date.or(self.maturity_date).or(self.start_date)
    }

    pub fn is_recurring(&self) -> bool {
        self.frequency.and_then(|f| f.months()).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionType {
    Purchase,
    Sell,
}

text_enum!(TransactionType {
    Purchase => "purchase",
    Sell => "sell",
});

/// The five per-trade charge fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Charges {
    pub brokerage: Option<Decimal>,
    pub exchange_charges: Option<Decimal>,
    pub gst: Option<Decimal>,
    pub stt: Option<Decimal>,
    pub stamp_duty: Option<Decimal>,
}

impl Charges {
    pub fn total(&self) -> Decimal {
        [
            self.brokerage,
            self.exchange_charges,
            self.gst,
            self.stt,
            self.stamp_duty,
        ]
        .iter()
        .flatten()
        .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingDetails {
    pub id: i64,
    pub user_id: String,
    pub type_of_transaction: TransactionType,
    pub name_of_script: String,
    pub name_of_investor: String,
    pub trading_id: String,
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub price: Decimal,
    pub charges: Charges,
    pub valuation: Option<Decimal>,
    pub actual_price: Option<Decimal>,
    pub actual_valuation: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitLoss {
    pub id: i64,
    pub user_id: String,
    pub purchase_id: i64,
    pub sale_id: i64,
    pub name_of_script: String,
    pub name_of_investor: String,
    pub trading_id: String,
    pub quantity: Decimal,
    pub date_of_purchase: NaiveDate,
    pub date_of_sales: NaiveDate,
    pub actual_price_of_purchase: Decimal,
    pub actual_purchase_valuation: Decimal,
    pub actual_price_of_sales: Decimal,
    pub actual_sales_valuation: Decimal,
    pub profit_loss_value: Option<Decimal>,
    pub profit_loss_percentage: Option<Decimal>,
    pub holding_days: Option<i64>,
    pub annualised_profit_loss_percentage: Option<Decimal>,
}

/// What a dependent record points back at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceType {
    Record,
    Calendar,
    Reminder,
    Bill,
}

text_enum!(ReferenceType {
    Record => "record",
    Calendar => "calendar",
    Reminder => "reminder",
    Bill => "bill",
});

/// Reference types a sync already passed through, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginChain(Vec<ReferenceType>);

impl OriginChain {
    pub fn root(origin: ReferenceType) -> Self {
        OriginChain(vec![origin])
    }

    pub fn contains(&self, t: ReferenceType) -> bool {
        self.0.contains(&t)
    }

    /// A copy of this chain with `t` appended, unless it is already the tail.
    pub fn extended(&self, t: ReferenceType) -> Self {
        let mut hops = self.0.clone();
        if hops.last() != Some(&t) {
            hops.push(t);
        }
        OriginChain(hops)
    }
}

impl fmt::Display for OriginChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(|t| t.as_str()).collect();
        f.write_str(&parts.join(">"))
    }
}

impl FromStr for OriginChain {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hops = s
            .split('>')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(ReferenceType::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OriginChain(hops))
    }
}

impl ToSql for OriginChain {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for OriginChain {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: LedgerError| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DependentStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Cancelled,
}

text_enum!(DependentStatus {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub status: DependentStatus,
    pub repeat: bool,
    pub frequency: Option<Frequency>,
    pub reference_id: Option<i64>,
    pub reference_type: Option<ReferenceType>,
    pub origin_chain: OriginChain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub message: Option<String>,
    pub date_time: NaiveDateTime,
    pub status: DependentStatus,
    pub repeat: bool,
    pub frequency: Option<Frequency>,
    pub reference_id: Option<i64>,
    pub reference_type: Option<ReferenceType>,
    pub origin_chain: OriginChain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub payment_number: u32,
    pub due_date: NaiveDate,
    pub beginning_balance: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
    pub payment: Decimal,
    pub extra_payment: Decimal,
    pub ending_balance: Decimal,
    pub is_paid: bool,
    pub paid_date: Option<NaiveDate>,
    pub paid_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BillCategory {
    Electricity,
    Water,
    Gas,
    Internet,
    Mobile,
    Rent,
    Insurance,
    School,
    Maintenance,
    Other,
}

text_enum!(BillCategory {
    Electricity => "electricity",
    Water => "water",
    Gas => "gas",
    Internet => "internet",
    Mobile => "mobile",
    Rent => "rent",
    Insurance => "insurance",
    School => "school",
    Maintenance => "maintenance",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BillStatus {
    #[default]
    Pending,
    Partial,
    Paid,
}

text_enum!(BillStatus {
    Pending => "pending",
    Partial => "partial",
    Paid => "paid",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillPayment {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub mode: Option<String>,
    pub merchant: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub category: BillCategory,
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub status: BillStatus,
    pub total_paid: Decimal,
    pub auto_created: bool,
    pub source_record_id: Option<i64>,
    pub version: i64,
    pub payments: Vec<BillPayment>,
}

/// A bank-statement line handed to reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseTransaction {
    pub merchant: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub mode_of_transaction: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_text() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), *c);
        }
        assert_eq!(Category::ALL.len(), 16);
        assert!(" Daily-Bill-Checklist ".parse::<Category>().is_ok());
        assert!("shares".parse::<Category>().is_err());
    }

    #[test]
    fn details_reject_mismatched_category() {
        let d = RecordDetails::parse(
            r#"{"kind":"loan","principal":"100000","annual_rate":9,"tenure_months":12}"#,
        )
        .unwrap();
        assert!(d.validate_for(Category::Loan).is_ok());
        let err = d.validate_for(Category::Gold).unwrap_err();
        assert!(err.to_string().contains("do not apply to category 'gold'"));
    }

    #[test]
    fn details_validate_fields() {
        let d = RecordDetails::parse(r#"{"kind":"bill","biller":"City Power","due_day":40}"#)
            .unwrap();
        assert!(d.validate_for(Category::DailyBillChecklist).is_err());
        assert!(RecordDetails::parse(r#"{"kind":"vehicle"}"#).is_err());
        assert!(RecordDetails::None.validate_for(Category::Cash).is_ok());
    }

    #[test]
    fn origin_chain_parses_and_extends() {
        let chain: OriginChain = "record>calendar".parse().unwrap();
        assert!(chain.contains(ReferenceType::Record));
        assert!(!chain.contains(ReferenceType::Reminder));
        let next = chain.extended(ReferenceType::Reminder);
        assert_eq!(next.to_string(), "record>calendar>reminder");
        assert_eq!(next.extended(ReferenceType::Reminder), next);
        assert_eq!("".parse::<OriginChain>().unwrap(), OriginChain::default());
    }

    #[test]
    fn charges_total_skips_missing() {
        let c = Charges {
            brokerage: Some(Decimal::new(20, 0)),
            gst: Some(Decimal::new(36, 1)),
            ..Default::default()
        };
        assert_eq!(c.total(), Decimal::new(236, 1));
    }
}
