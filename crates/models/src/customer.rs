use serde::{Deserialize, Serialize};

use crate::entity::{EntityKeys, TableEntity};
use crate::errors::{require, ModelError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Customer {
    #[serde(flatten)]
    pub keys: EntityKeys,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub shipping_address: String,
}

impl Customer {
    pub fn new(name: &str, surname: &str, username: &str) -> Self {
        Self {
            name: name.to_string(),
            surname: surname.to_string(),
            username: username.to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require("Name", &self.name)?;
        require("Surname", &self.surname)?;
        require("Username", &self.username)?;
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(ModelError::Validation("Email must contain '@'".into()));
        }
        Ok(())
    }
}

impl TableEntity for Customer {
    const TABLE: &'static str = "Customer";

    fn keys(&self) -> &EntityKeys { &self.keys }
    fn keys_mut(&mut self) -> &mut EntityKeys { &mut self.keys }
}
