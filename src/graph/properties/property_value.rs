use crate::graph::properties::property_value_type::PropertyValueType;

#[derive(Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum PropertyValue {
    Isize(isize),
    Float(f64),
    String(String),
    Bool(bool),
}

impl PropertyValue {
    pub fn value_type(&self) -> PropertyValueType {
        match self {
            PropertyValue::Isize(_) => PropertyValueType::Isize,
            PropertyValue::Float(_) => PropertyValueType::Float,
            PropertyValue::String(_) => PropertyValueType::String,
            PropertyValue::Bool(_) => PropertyValueType::Bool,
        }
    }

    pub fn as_isize(&self) -> Option<isize> {
        if let PropertyValue::Isize(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Integers are widened, so `int` columns can feed float parameters.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(value) => Some(*value),
            PropertyValue::Isize(value) => Some(*value as f64),
            PropertyValue::String(_) | PropertyValue::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let PropertyValue::String(value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let PropertyValue::Bool(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Parses an untyped option string, trying integer, float and bool before falling back to
    /// a plain string.
    pub fn parse(value: &str) -> Self {
        if let Ok(value) = value.parse() {
            PropertyValue::Isize(value)
        } else if let Ok(value) = value.parse() {
            PropertyValue::Float(value)
        } else if let Ok(value) = value.parse() {
            PropertyValue::Bool(value)
        } else {
            PropertyValue::String(value.to_owned())
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            PropertyValue::Isize(value) => write!(f, "{}", value),
            PropertyValue::Float(value) => write!(f, "{}", value),
            PropertyValue::String(value) => write!(f, "'{}'", value),
            PropertyValue::Bool(value) => write!(f, "{:?}", value),
        }
    }
}
