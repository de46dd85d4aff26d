use std::collections::HashMap;
use std::fmt;

/// Partition key attribute name.
pub const PK: &str = "pk";
/// Sort key attribute name.
pub const SK: &str = "sk";

/// A single stored attribute value.
///
/// Numbers are kept as their decimal string form, the way the store
/// transports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    S(String),
    N(String),
}

impl Attribute {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Attribute::S(s) => Some(s),
            Attribute::N(_) => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            Attribute::N(n) => Some(n),
            Attribute::S(_) => None,
        }
    }
}

/// A stored item: attribute name to value.
pub type Item = HashMap<String, Attribute>;

/// Composite key addressing a single item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub pk: String,
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Reads the key attributes out of an item.
    pub fn of(item: &Item) -> Option<Self> {
        let pk = item.get(PK)?.as_s()?;
        let sk = item.get(SK)?.as_s()?;
        Some(Self::new(pk, sk))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}

/// Predicate over the existing item that must hold for a put to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutCondition {
    AttributeNotExists(String),
    AttributeExists(String),
}

impl PutCondition {
    /// The key must not already be taken.
    pub fn key_not_exists() -> Self {
        PutCondition::AttributeNotExists(PK.to_string())
    }

    /// Renders the condition in the store's expression syntax.
    pub fn expression(&self) -> String {
        match self {
            PutCondition::AttributeNotExists(attr) => format!("attribute_not_exists({attr})"),
            PutCondition::AttributeExists(attr) => format!("attribute_exists({attr})"),
        }
    }

    /// Evaluates the condition against the item currently stored at the key.
    pub fn holds(&self, existing: Option<&Item>) -> bool {
        let present = |attr: &str| existing.is_some_and(|item| item.contains_key(attr));
        match self {
            PutCondition::AttributeNotExists(attr) => !present(attr),
            PutCondition::AttributeExists(attr) => present(attr),
        }
    }
}

/// An item to write together with its write condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalPut {
    pub item: Item,
    pub condition: Option<PutCondition>,
}

impl ConditionalPut {
    /// A put that overwrites unconditionally.
    pub fn new(item: Item) -> Self {
        Self {
            item,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: PutCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// A put that only applies when no item exists at its key.
    pub fn if_not_exists(item: Item) -> Self {
        Self::new(item).with_condition(PutCondition::key_not_exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pk: &str) -> Item {
        HashMap::from([
            (PK.to_string(), Attribute::S(pk.to_string())),
            (SK.to_string(), Attribute::S(pk.to_string())),
        ])
    }

    #[test]
    fn test_condition_expressions() {
        assert_eq!(
            PutCondition::key_not_exists().expression(),
            "attribute_not_exists(pk)"
        );
        assert_eq!(
            PutCondition::AttributeExists("sk".into()).expression(),
            "attribute_exists(sk)"
        );
    }

    #[test]
    fn test_not_exists_condition() {
        let condition = PutCondition::key_not_exists();
        assert!(condition.holds(None));
        assert!(!condition.holds(Some(&item("USERNAME#u1"))));
    }

    #[test]
    fn test_exists_condition() {
        let condition = PutCondition::AttributeExists(PK.to_string());
        assert!(!condition.holds(None));
        assert!(condition.holds(Some(&item("USERNAME#u1"))));
    }

    #[test]
    fn test_item_key_of() {
        let key = ItemKey::of(&item("USEREMAIL#a@b.com")).unwrap();
        assert_eq!(key, ItemKey::new("USEREMAIL#a@b.com", "USEREMAIL#a@b.com"));
        assert!(ItemKey::of(&Item::new()).is_none());
    }
}
