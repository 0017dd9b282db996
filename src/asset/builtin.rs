//! Asset types shipped with the binary.

use std::any::Any;

use uuid::Uuid;

use super::{meta_required, Asset, AssetError, AssetRegistry, AssetType};
use crate::document::{field_value, Document, ToValueTree};
use crate::player::PlayerRecord;

/// A cosmetic item the player has unlocked, optionally equipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Cosmetic {
    owner: Uuid,
    pub item: String,
    pub equipped: bool,
}

impl Cosmetic {
    pub fn new(owner: Uuid, item: &str) -> Self {
        Self {
            owner,
            item: item.to_string(),
            equipped: false,
        }
    }
}

impl Asset for Cosmetic {
    fn descriptor(&self) -> &str {
        Self::DESCRIPTOR
    }

    fn owner(&self) -> Uuid {
        self.owner
    }

    fn meta(&self) -> Document {
        let mut meta = Document::new();
        meta.insert("item".into(), self.item.to_value_tree());
        meta.insert("equipped".into(), self.equipped.to_value_tree());
        meta
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl AssetType for Cosmetic {
    const DESCRIPTOR: &'static str = "cosmetic";

    fn load(owner: &PlayerRecord, meta: &Document) -> Result<Self, AssetError> {
        Ok(Self {
            owner: owner.unique_id(),
            item: meta_required(meta, "item")?,
            equipped: field_value(meta, "equipped", false),
        })
    }
}

/// A balance of some named in-game currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Wallet {
    owner: Uuid,
    pub balance: i64,
    pub currency: String,
}

impl Wallet {
    pub fn new(owner: Uuid, balance: i64, currency: &str) -> Self {
        Self {
            owner,
            balance,
            currency: currency.to_string(),
        }
    }

    /// Apply a signed change. Returns `None` and leaves the balance alone if it
    /// would go negative or overflow.
    pub fn adjust(&mut self, delta: i64) -> Option<i64> {
        let next = self.balance.checked_add(delta).filter(|n| *n >= 0)?;
        self.balance = next;
        Some(next)
    }
}

impl Asset for Wallet {
    fn descriptor(&self) -> &str {
        Self::DESCRIPTOR
    }

    fn owner(&self) -> Uuid {
        self.owner
    }

    fn meta(&self) -> Document {
        let mut meta = Document::new();
        meta.insert("balance".into(), self.balance.to_value_tree());
        meta.insert("currency".into(), self.currency.to_value_tree());
        meta
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl AssetType for Wallet {
    const DESCRIPTOR: &'static str = "wallet";

    fn load(owner: &PlayerRecord, meta: &Document) -> Result<Self, AssetError> {
        let balance: i64 = meta_required(meta, "balance")?;
        if balance < 0 {
            return Err(AssetError::InvalidMeta {
                field: "balance".into(),
                expected: "non-negative integer",
            });
        }
        Ok(Self {
            owner: owner.unique_id(),
            balance,
            currency: meta_required(meta, "currency")?,
        })
    }
}

/// Register the built-in asset types, leaving out any descriptor in `disabled`.
pub fn register_builtin(registry: &mut AssetRegistry, disabled: &[String]) {
    let enabled = |descriptor: &str| !disabled.iter().any(|d| d == descriptor);
    if enabled(Cosmetic::DESCRIPTOR) {
        registry.register_type::<Cosmetic>();
    }
    if enabled(Wallet::DESCRIPTOR) {
        registry.register_type::<Wallet>();
    }
}
