use crate::{Cas, Expiry};

/// Replication/persistence requirement of a mutation. Passed through to the
/// store untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    #[default]
    None,
    Majority,
    MajorityAndPersistToActive,
    PersistToMajority,
}

impl Durability {
    pub fn is_synchronous(&self) -> bool {
        !matches!(self, Durability::None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Also fetch the expiry, in the same read as the content and cas
    pub with_expiry: bool,
}

impl GetOptions {
    pub fn with_expiry(mut self, with_expiry: bool) -> Self {
        self.with_expiry = with_expiry;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    pub expiry: Expiry,
    pub durability: Durability,
}

impl InsertOptions {
    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpsertOptions {
    pub expiry: Expiry,
    pub preserve_expiry: bool,
    pub durability: Durability,
}

impl UpsertOptions {
    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn preserve_expiry(mut self, preserve_expiry: bool) -> Self {
        self.preserve_expiry = preserve_expiry;
        self
    }

    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplaceOptions {
    /// Only replace if the stored cas still matches. An empty cas replaces unconditionally.
    pub cas: Cas,
    pub expiry: Expiry,
    /// Keep the stored expiry, `expiry` is ignored
    pub preserve_expiry: bool,
    pub durability: Durability,
}

impl ReplaceOptions {
    pub fn cas(mut self, cas: Cas) -> Self {
        self.cas = cas;
        self
    }

    pub fn expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn preserve_expiry(mut self, preserve_expiry: bool) -> Self {
        self.preserve_expiry = preserve_expiry;
        self
    }

    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    pub cas: Cas,
    pub durability: Durability,
}

impl RemoveOptions {
    pub fn cas(mut self, cas: Cas) -> Self {
        self.cas = cas;
        self
    }

    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }
}
