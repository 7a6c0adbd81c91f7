#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PropertyValueType {
    Isize,
    Float,
    String,
    Bool,
}

impl std::fmt::Display for PropertyValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                PropertyValueType::Isize => "ISize",
                PropertyValueType::Float => "Float",
                PropertyValueType::String => "String",
                PropertyValueType::Bool => "Bool",
            }
        )
    }
}
