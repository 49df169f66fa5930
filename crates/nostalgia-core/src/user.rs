//! Caller identity as handed over by the authentication layer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  Member,
  Administrator,
}

impl FromStr for Role {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "member" => Ok(Self::Member),
      "administrator" | "admin" => Ok(Self::Administrator),
      other => Err(Error::UnknownRole(other.to_owned())),
    }
  }
}

/// An authenticated user. The core never creates these; it only checks them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub user_id:  Uuid,
  pub username: String,
  pub role:     Role,
}

impl Actor {
  pub fn is_admin(&self) -> bool { self.role == Role::Administrator }
}
