use crate::graph::key_store::KeyId;
use crate::graph::properties::property_value::PropertyValue;

pub mod property_value;
pub mod property_value_type;

pub type PropertyKeyId = KeyId;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Properties {
    entries: Vec<(PropertyKeyId, PropertyValue)>,
}

impl Properties {
    pub fn add_new_property(
        &mut self,
        property_key_id: PropertyKeyId,
        property_value: PropertyValue,
    ) {
        self.entries.push((property_key_id, property_value));
    }

    pub fn get_property(&self, property_key_id: PropertyKeyId) -> Option<&PropertyValue> {
        for (key_id, property) in &self.entries {
            if *key_id == property_key_id {
                return Some(property);
            }
        }
        None
    }

    pub fn key_ids(&self) -> impl Iterator<Item = PropertyKeyId> + '_ {
        self.entries.iter().map(|(key_id, _)| *key_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
