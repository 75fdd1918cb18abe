// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Equated monthly installment schedules.
//!
//! Money is rounded to paise at every step so a stored schedule reproduces
//! exactly when recalculated.

use crate::errors::LedgerError;
use crate::models::PaymentEntry;
use crate::utils::add_months;
use chrono::NaiveDate;
use rust_decimal::Decimal;

const MONEY_DP: u32 = 2;
const MONTHS_PER_YEAR: i64 = 12;

/// `annual_rate` is a percentage, e.g. `8.5`.
pub fn monthly_rate(annual_rate: Decimal) -> Decimal {
    annual_rate / Decimal::ONE_HUNDRED / Decimal::from(MONTHS_PER_YEAR)
}

fn too_large() -> LedgerError {
    LedgerError::validation("Loan terms are too large to schedule")
}

/// `P * r * (1+r)^n / ((1+r)^n - 1)`, or `P / n` for interest-free loans.
///
/// The growth ratio is taken before scaling by the principal so large
/// loans stay in range; anything still out of range is a validation error.
pub fn emi(principal: Decimal, monthly_rate: Decimal, months: u32) -> Result<Decimal, LedgerError> {
    if months == 0 {
        return Ok(principal);
    }
    if monthly_rate.is_zero() {
        return Ok((principal / Decimal::from(months)).round_dp(MONEY_DP));
    }
    let growth = Decimal::ONE + monthly_rate;
    let mut factor = Decimal::ONE;
    for _ in 0..months {
        factor = factor.checked_mul(growth).ok_or_else(too_large)?;
    }
    let ratio = factor
        .checked_div(factor - Decimal::ONE)
        .ok_or_else(too_large)?;
    principal
        .checked_mul(monthly_rate)
        .and_then(|v| v.checked_mul(ratio))
        .map(|v| v.round_dp(MONEY_DP))
        .ok_or_else(too_large)
}

/// Fresh schedule for a loan disbursed in full; installment `k` is due
/// `k - 1` months after `first_due`. The last installment absorbs rounding
/// so the balance closes at exactly zero.
pub fn generate_schedule(
    principal: Decimal,
    annual_rate: Decimal,
    tenure_months: u32,
    first_due: NaiveDate,
) -> Result<Vec<PaymentEntry>, LedgerError> {
    let rate = monthly_rate(annual_rate);
    let installment = emi(principal, rate, tenure_months)?;
    let mut balance = principal;
    let mut out = Vec::with_capacity(tenure_months as usize);

    for n in 1..=tenure_months {
        let due_date = add_months(first_due, n - 1).unwrap_or(first_due);
        let interest = balance
            .checked_mul(rate)
            .ok_or_else(too_large)?
            .round_dp(MONEY_DP);
        let mut principal_part = installment - interest;
        if n == tenure_months || principal_part > balance {
            principal_part = balance;
        }
        let principal_part = principal_part.max(Decimal::ZERO);
        let ending = balance - principal_part;
        let payment = principal_part.checked_add(interest).ok_or_else(too_large)?;
        out.push(PaymentEntry {
            payment_number: n,
            due_date,
            beginning_balance: balance,
            interest,
            principal: principal_part,
            payment,
            extra_payment: Decimal::ZERO,
            ending_balance: ending,
            is_paid: false,
            paid_date: None,
            paid_amount: None,
        });
        balance = ending;
    }
    Ok(out)
}

/// Recompute balances from `from` to the end after an extra payment.
///
/// Entry `from` keeps its beginning balance; every later entry starts from
/// its predecessor's ending balance. Principal is capped at the balance so
/// nothing goes negative, and once the loan is cleared the remaining
/// installments carry nothing.
pub fn recalculate(schedule: &mut [PaymentEntry], from: usize, monthly_rate: Decimal) {
    for i in from..schedule.len() {
        let beginning = if i == from {
            schedule[i].beginning_balance
        } else {
            schedule[i - 1].ending_balance
        };
        let entry = &mut schedule[i];
        entry.beginning_balance = beginning;
        if beginning <= Decimal::ZERO {
            entry.beginning_balance = Decimal::ZERO;
            entry.interest = Decimal::ZERO;
            entry.principal = Decimal::ZERO;
            entry.payment = Decimal::ZERO;
            entry.ending_balance = Decimal::ZERO;
            continue;
        }
        entry.interest = (beginning * monthly_rate).round_dp(MONEY_DP);
        let principal = (entry.payment - entry.interest + entry.extra_payment).max(Decimal::ZERO);
        if principal > beginning {
            // Final installment: only what is left is due.
            entry.principal = beginning;
            entry.payment = (beginning + entry.interest - entry.extra_payment).max(Decimal::ZERO);
        } else {
            entry.principal = principal;
        }
        entry.ending_balance = (beginning - entry.principal).max(Decimal::ZERO);
    }
}

/// Index of the installment still owed, skipping entries already cleared
/// by an earlier prepayment.
pub fn next_unpaid(schedule: &[PaymentEntry]) -> Option<usize> {
    schedule
        .iter()
        .position(|e| !e.is_paid && e.beginning_balance > Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn first_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
    }

    #[test]
    fn emi_matches_the_closed_form() {
        assert_eq!(emi(d("100000"), monthly_rate(d("12")), 12).unwrap(), d("8884.88"));
        assert_eq!(emi(d("1200"), Decimal::ZERO, 12).unwrap(), d("100"));
    }

    #[test]
    fn schedule_closes_at_zero() {
        let s = generate_schedule(d("100000"), d("12"), 12, first_due()).unwrap();
        assert_eq!(s.len(), 12);
        assert_eq!(s[0].interest, d("1000"));
        assert_eq!(s[0].principal, d("7884.88"));
        assert_eq!(s[0].ending_balance, d("92115.12"));
        assert_eq!(s[11].ending_balance, Decimal::ZERO);
        assert_eq!(s[1].due_date, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(s[2].due_date, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
        let repaid: Decimal = s.iter().map(|e| e.principal).sum();
        assert_eq!(repaid, d("100000"));
        for pair in s.windows(2) {
            assert_eq!(pair[0].ending_balance, pair[1].beginning_balance);
        }
    }

    #[test]
    fn extra_payment_shortens_the_tail() {
        let mut s = generate_schedule(d("100000"), d("12"), 12, first_due()).unwrap();
        s[0].extra_payment = d("10000");
        recalculate(&mut s, 0, monthly_rate(d("12")));
        assert_eq!(s[0].principal, d("17884.88"));
        assert_eq!(s[0].ending_balance, d("82115.12"));
        assert_eq!(s[1].beginning_balance, d("82115.12"));
        assert_eq!(s[1].interest, d("821.15"));
        assert_eq!(s[11].ending_balance, Decimal::ZERO);
        assert_eq!(s[11].payment, Decimal::ZERO);
    }

    #[test]
    fn balances_never_go_negative() {
        let rate = monthly_rate(d("9.5"));
        let mut s = generate_schedule(d("250000"), d("9.5"), 24, first_due()).unwrap();
        s[3].extra_payment = d("400000");
        recalculate(&mut s, 3, rate);
        for e in &s {
            assert!(e.beginning_balance >= Decimal::ZERO);
            assert!(e.ending_balance >= Decimal::ZERO);
            assert!(e.principal >= Decimal::ZERO);
            assert!(e.interest >= Decimal::ZERO);
        }
        assert_eq!(s[3].ending_balance, Decimal::ZERO);
        assert_eq!(next_unpaid(&s), Some(0));
        for e in s.iter_mut().take(4) {
            e.is_paid = true;
        }
        assert_eq!(next_unpaid(&s), None);
    }
}
