//! Account identity value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Clearing code of the bank holding an account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankCode {
    Northern,
    Pacific,
    Union,
}

impl BankCode {
    /// Returns the numeric wire code for this bank.
    pub fn code(&self) -> &'static str {
        match self {
            BankCode::Northern => "0001",
            BankCode::Pacific => "0002",
            BankCode::Union => "0003",
        }
    }

    /// Looks up a bank by its numeric wire code. Total: unknown codes are
    /// a typed failure, never a panic.
    pub fn from_code(code: &str) -> Result<Self, DomainError> {
        match code {
            "0001" => Ok(BankCode::Northern),
            "0002" => Ok(BankCode::Pacific),
            "0003" => Ok(BankCode::Union),
            other => Err(DomainError::UnknownBankCode(other.to_string())),
        }
    }
}

impl fmt::Display for BankCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Identity of a bank account: bank code plus a 7-digit account number.
///
/// Validated at construction; equality and hashing by value. The derived
/// total order (bank code, then number) is what the coordinator uses for
/// deterministic account acquisition.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AccountNumber {
    bank_code: BankCode,
    number: String,
}

impl AccountNumber {
    /// Creates a validated account number. The number part must be exactly
    /// seven ASCII digits.
    pub fn new(bank_code: BankCode, number: impl Into<String>) -> Result<Self, DomainError> {
        let number = number.into();
        if number.len() != 7 || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidAccountNumber(number));
        }
        Ok(Self { bank_code, number })
    }

    pub fn bank_code(&self) -> BankCode {
        self.bank_code
    }

    pub fn number(&self) -> &str {
        &self.number
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.bank_code, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_account_number() {
        let id = AccountNumber::new(BankCode::Northern, "1234567").unwrap();
        assert_eq!(id.bank_code(), BankCode::Northern);
        assert_eq!(id.number(), "1234567");
        assert_eq!(id.to_string(), "0001-1234567");
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(matches!(
            AccountNumber::new(BankCode::Pacific, "123456"),
            Err(DomainError::InvalidAccountNumber(_))
        ));
        assert!(matches!(
            AccountNumber::new(BankCode::Pacific, "12345678"),
            Err(DomainError::InvalidAccountNumber(_))
        ));
    }

    #[test]
    fn test_non_digits_rejected() {
        assert!(matches!(
            AccountNumber::new(BankCode::Union, "12a4567"),
            Err(DomainError::InvalidAccountNumber(_))
        ));
    }

    #[test]
    fn test_bank_code_lookup_is_total() {
        assert_eq!(BankCode::from_code("0002").unwrap(), BankCode::Pacific);
        assert!(matches!(
            BankCode::from_code("9999"),
            Err(DomainError::UnknownBankCode(_))
        ));
    }

    #[test]
    fn test_ordering_is_role_independent() {
        let a = AccountNumber::new(BankCode::Northern, "0000001").unwrap();
        let b = AccountNumber::new(BankCode::Northern, "0000002").unwrap();
        let c = AccountNumber::new(BankCode::Pacific, "0000001").unwrap();
        assert!(a < b);
        assert!(b < c);
    }
}
