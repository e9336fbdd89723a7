use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Gbp, Currency::Eur, Currency::Usd];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }

    /// Character that represents the currency e.g. £, €, $.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Gbp => "£",
            Currency::Eur => "€",
            Currency::Usd => "$",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn is_valid_code(code: &str) -> bool {
        Self::from_code(code).is_some()
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
            .ok_or_else(|| ValidationError::new("currency", format!("'{}' is not valid", s)))
    }
}

/// A currency tagged amount in minor units (pennies, cents).
///
/// Arithmetic always keeps the currency of the left operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Price {
    #[serde(rename = "currencyCode")]
    pub currency: Currency,
    #[serde(rename = "amountInCents")]
    pub amount: i64,
}

impl Price {
    pub fn new(currency: Currency, amount: i64) -> Self {
        Self { currency, amount }
    }

    /// Numerical value in major units e.g. pounds, euros.
    pub fn number(&self) -> f64 {
        self.amount as f64 / 100.0
    }

    pub fn add(&self, other: Price) -> Price {
        Price::new(self.currency, self.amount + other.amount)
    }

    pub fn subtract(&self, other: Price) -> Price {
        Price::new(self.currency, self.amount - other.amount)
    }

    pub fn multiply(&self, num: i64) -> Price {
        Price::new(self.currency, self.amount * num)
    }

    /// Divides the amount, rounding to the nearest minor unit.
    ///
    /// Dividing by zero leaves the price unchanged.
    pub fn divide(&self, num: u32) -> Price {
        if num == 0 {
            return *self;
        }
        let amount = (self.amount as f64 / num as f64).round() as i64;
        Price::new(self.currency, amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), self.number())
    }
}
