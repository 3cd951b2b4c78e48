use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentGateway {
    Stripe,
    Paddle,
}

impl Display for PaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gateway = match self {
            PaymentGateway::Stripe => "stripe",
            PaymentGateway::Paddle => "paddle",
        };
        write!(f, "{}", gateway)
    }
}

impl PaymentGateway {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "stripe" => Some(PaymentGateway::Stripe),
            "paddle" => Some(PaymentGateway::Paddle),
            _ => None,
        }
    }
}
