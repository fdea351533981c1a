//! Type-safe monetary value with embedded currency.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::DomainError;

/// Currencies supported by the transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    INR,
}

impl Currency {
    /// Returns the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::USD | Currency::EUR | Currency::GBP | Currency::INR => 2,
        }
    }

    /// Returns the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::INR => "₹",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Type-safe money representation with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (cents, paise, etc.)
/// to avoid floating-point precision issues. A `Money` value may be negative:
/// it doubles as a signed delta. Balances never go negative, but that is the
/// `Account` aggregate's invariant, not this type's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value.
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Creates a zero-value Money for the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Returns the amount in smallest currency unit.
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Returns true for amounts that can move in a transfer (strictly positive).
    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        Ok(())
    }

    /// Checked addition - fails if currencies don't match or the sum overflows.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.require_same_currency(&other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(DomainError::AmountOverflow)?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// Checked subtraction - fails if currencies don't match or the result
    /// overflows. The result MAY be negative: `Money` is a pure arithmetic
    /// type and non-negativity of balances is enforced by `Account`.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        self.require_same_currency(&other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(DomainError::AmountOverflow)?;
        Ok(Money {
            amount,
            currency: self.currency,
        })
    }

    /// Compares two amounts of the same currency.
    pub fn compare(&self, other: &Money) -> Result<Ordering, DomainError> {
        self.require_same_currency(other)?;
        Ok(self.amount.cmp(&other.amount))
    }

    /// Returns true if this Money is greater than or equal to the other.
    pub fn gte(&self, other: &Money) -> Result<bool, DomainError> {
        Ok(self.compare(other)? != Ordering::Less)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let major = (self.amount / 100).abs();
        let minor = (self.amount % 100).abs();
        write!(f, "{}{}{}.{:02}", sign, self.currency.symbol(), major, minor)
    }
}
