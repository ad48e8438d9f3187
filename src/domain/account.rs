//! Account and account holder records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Balance;

/// Sequential account identifier (`accounts.id`)
pub type AccountId = i64;

/// Sequential user identifier (`users.id`)
pub type UserId = i64;

/// A balance-holding account.
///
/// The account does not know who owns it; the link lives on the user side
/// (`users.account_id`), so an account is a link target and never an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(rename = "amount_of_money")]
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, balance: Balance, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            balance,
            created_at,
        }
    }
}

/// Caller role as stored on the user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record as far as this service needs it.
///
/// Users are registered by the upstream authentication service; this crate
/// only reads them and maintains the `account_id` link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub account_id: Option<AccountId>,
}

impl User {
    /// Exact match on both names, used as the "confirm who you're paying" check
    pub fn has_name(&self, first_name: &str, last_name: &str) -> bool {
        self.first_name == first_name && self.last_name == last_name
    }
}

/// User data needed to seed a store (tests, demos, load tools)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl NewUser {
    pub fn new(username: &str, first_name: &str, last_name: &str) -> Self {
        Self {
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            role: Role::User,
        }
    }

    pub fn admin(mut self) -> Self {
        self.role = Role::Admin;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_string() {
        assert_eq!(Role::from("admin".to_string()), Role::Admin);
        assert_eq!(Role::from("user".to_string()), Role::User);
        // Unknown roles never grant privileges
        assert_eq!(Role::from("root".to_string()), Role::User);
    }

    #[test]
    fn test_name_match_is_exact() {
        let user = User {
            id: 1,
            username: "goldenrec".to_string(),
            first_name: "Golden".to_string(),
            last_name: "Receiver".to_string(),
            role: Role::User,
            account_id: Some(7),
        };

        assert!(user.has_name("Golden", "Receiver"));
        assert!(!user.has_name("golden", "Receiver"));
        assert!(!user.has_name("Golden", "Receiver "));
    }

    #[test]
    fn test_account_serializes_balance_as_amount_of_money() {
        let account = Account::new(3, Balance::zero(), Utc::now());
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["amount_of_money"], "0.00");
        assert_eq!(json["id"], 3);
    }
}
