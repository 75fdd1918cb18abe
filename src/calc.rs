// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Save-time derived fields.
//!
//! Every function here is best effort: a missing input leaves the derived
//! field as `None` rather than failing the save.

use crate::models::{FinancialRecord, ProfitLoss, TradingDetails, TransactionType};
use rust_decimal::Decimal;

/// Percentages are stored at this precision; money is kept exact.
pub const PERCENT_DP: u32 = 4;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const DAYS_PER_YEAR: i64 = 365;

/// Recompute derived fields in place. Runs before every insert and update.
pub trait Derive {
    fn derive(&mut self);
}

/// Which side of a trade a leg is; charges raise the cost of an acquisition
/// and lower the proceeds of a disposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Acquisition,
    Disposal,
}

impl From<TransactionType> for Leg {
    fn from(t: TransactionType) -> Self {
        match t {
            TransactionType::Purchase => Leg::Acquisition,
            TransactionType::Sell => Leg::Disposal,
        }
    }
}

pub fn valuation(quantity: Option<Decimal>, price: Option<Decimal>) -> Option<Decimal> {
    Some(quantity? * price?)
}

/// Unit price adjusted by the per-unit share of `total_charges`.
pub fn actual_price(
    price: Option<Decimal>,
    total_charges: Decimal,
    quantity: Option<Decimal>,
    leg: Leg,
) -> Option<Decimal> {
    let price = price?;
    let quantity = quantity?;
    if quantity.is_zero() {
        return None;
    }
    let per_unit = total_charges / quantity;
    Some(match leg {
        Leg::Acquisition => price + per_unit,
        Leg::Disposal => price - per_unit,
    })
}

/// `returns / cost * 100`, defined as 0 when cost is 0.
pub fn percentage(returns: Option<Decimal>, cost: Option<Decimal>) -> Option<Decimal> {
    let returns = returns?;
    let cost = cost?;
    if cost.is_zero() {
        return Some(Decimal::ZERO);
    }
    Some((returns / cost * HUNDRED).round_dp(PERCENT_DP))
}

impl Derive for FinancialRecord {
    fn derive(&mut self) {
        if let Some(amount) = valuation(self.quantity, self.purchase_price) {
            self.amount = Some(amount);
        }
        self.returns = match (self.current_value, self.amount) {
            (Some(current), Some(cost)) => Some(match self.quantity {
                Some(q) => q * current - cost,
                None => current - cost,
            }),
            _ => None,
        };
        self.returns_percentage = percentage(self.returns, self.amount);
    }
}

impl Derive for TradingDetails {
    fn derive(&mut self) {
        let quantity = Some(self.quantity);
        self.valuation = valuation(quantity, Some(self.price));
        self.actual_price = actual_price(
            Some(self.price),
            self.charges.total(),
            quantity,
            self.type_of_transaction.into(),
        );
        self.actual_valuation = valuation(quantity, self.actual_price);
    }
}

impl Derive for ProfitLoss {
    fn derive(&mut self) {
        let value = self.actual_sales_valuation - self.actual_purchase_valuation;
        self.profit_loss_value = Some(value);

        let pct = if self.actual_purchase_valuation.is_zero() {
            Decimal::ZERO
        } else {
            value / self.actual_purchase_valuation * HUNDRED
        };
        self.profit_loss_percentage = Some(pct.round_dp(PERCENT_DP));

        // Whole calendar days, so the ceiling is the plain difference.
        let days = (self.date_of_sales - self.date_of_purchase).num_days();
        self.holding_days = Some(days);
        let annualised = if days > 0 {
            pct * Decimal::from(DAYS_PER_YEAR) / Decimal::from(days)
        } else {
            pct
        };
        self.annualised_profit_loss_percentage = Some(annualised.round_dp(PERCENT_DP));
    }
}
