use hashbrown::HashMap;
use std::convert::TryFrom;

/// Stores a mapping from property name `String`s to `KeyId`s.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct KeyStore {
    key_strings: Vec<String>,
    key_string_to_id: HashMap<String, KeyId>,
}

impl KeyStore {
    pub fn get_key_id_or_insert(&mut self, key_string: &str) -> KeyId {
        if let Some(&id) = self.key_string_to_id.get(key_string) {
            id
        } else {
            self.key_strings.push(key_string.to_owned());
            let id = KeyIdType::try_from(self.key_strings.len() - 1).expect("Ran out of key ids");
            let key_id = KeyId(id);
            self.key_string_to_id.insert(key_string.to_owned(), key_id);
            key_id
        }
    }

    pub fn get_key_id(&self, key_string: &str) -> Option<KeyId> {
        self.key_string_to_id.get(key_string).copied()
    }

    pub fn key_string(&self, key: KeyId) -> &String {
        // Guaranteed to exist because no one outside the module can construct `KeyId`s.
        &self.key_strings[usize::from(key.0)]
    }

    pub fn len(&self) -> usize {
        self.key_strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_strings.is_empty()
    }
}

#[derive(
    Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct KeyId(KeyIdType);
pub type KeyIdType = u16;

impl KeyId {
    pub fn to_usize(self) -> usize {
        usize::from(self.0)
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::key_store::KeyStore;

    #[test]
    fn insert_and_lookup() {
        let mut key_store = KeyStore::default();
        let value = key_store.get_key_id_or_insert("value");
        let weight = key_store.get_key_id_or_insert("weight");
        assert_ne!(value, weight);
        assert_eq!(key_store.get_key_id_or_insert("value"), value);
        assert_eq!(key_store.get_key_id("weight"), Some(weight));
        assert_eq!(key_store.get_key_id("missing"), None);
        assert_eq!(key_store.key_string(weight), "weight");
        assert_eq!(key_store.len(), 2);
        assert!(!key_store.is_empty());
    }
}
