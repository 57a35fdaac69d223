use crate::model::codec;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bank account, either as returned by `GET accounts/{id}` or as the snapshot embedded in a
/// transaction. The optional fields are only present in the full form.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub name: String,
    /// Unlike transaction amounts, a balance may be negative.
    #[serde(with = "codec::decimal")]
    pub balance: Decimal,
    pub currency: String,
    #[serde(
        default,
        with = "codec::timestamp_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "codec::timestamp_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Creates the brief form of an account used inside transactions.
    pub fn brief(
        id: i64,
        name: impl Into<String>,
        balance: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id,
            user_id: None,
            name: name.into(),
            balance,
            currency: currency.into(),
            created_at: None,
            updated_at: None,
        }
    }

    /// A neutral stand-in used when the real account snapshot is not known locally.
    pub fn placeholder(id: i64, currency: impl Into<String>) -> Self {
        Self::brief(id, "", Decimal::ZERO, currency)
    }

    /// Drops the fields that are not part of the snapshot embedded in a transaction.
    pub fn into_brief(self) -> Self {
        Self::brief(self.id, self.name, self.balance, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_full_account_decodes() {
        let json = r#"{
            "id": 1,
            "userId": 7,
            "name": "Main",
            "balance": "-1000.00",
            "currency": "RUB",
            "incomeStats": [],
            "createdAt": "2025-06-11T16:12:34.000Z",
            "updatedAt": "2025-06-11T16:12:34Z"
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.user_id, Some(7));
        assert_eq!(account.balance, Decimal::from_str("-1000.00").unwrap());
        assert!(account.updated_at.is_some());

        let brief = account.into_brief();
        let out = serde_json::to_value(&brief).unwrap();
        assert_eq!(out["balance"], "-1000.00");
        assert!(out.get("userId").is_none());
        assert!(out.get("createdAt").is_none());
    }

    #[test]
    fn test_numeric_balance_rejected() {
        let json = r#"{"id": 1, "name": "Main", "balance": 10, "currency": "RUB"}"#;
        assert!(serde_json::from_str::<Account>(json).is_err());
    }
}
