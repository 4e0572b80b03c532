//! User and address-book records consumed by the pipeline.

use common::{AddressId, UserId};
use serde::{Deserialize, Serialize};

/// A shipping address inside a user's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub recipient: String,
    pub line: String,
    pub city: String,
    pub postal_code: String,
}

impl Address {
    pub fn new(
        recipient: impl Into<String>,
        line: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            id: AddressId::new(),
            recipient: recipient.into(),
            line: line.into(),
            city: city.into(),
            postal_code: postal_code.into(),
        }
    }
}

/// A registered user with their address book.
///
/// The pipeline only needs the phone (the gateway contact handle) and
/// the addresses; everything else about users is out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub phone: String,
    pub addresses: Vec<Address>,
}

impl User {
    pub fn new(phone: impl Into<String>, addresses: Vec<Address>) -> Self {
        Self {
            id: UserId::new(),
            phone: phone.into(),
            addresses,
        }
    }

    /// Returns the address with the given id, if the user has it.
    pub fn address(&self, id: AddressId) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id == id)
    }
}
