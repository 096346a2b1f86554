use super::{DataType, DbError, Result, Value};
use serde::{Deserialize, Serialize};

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub auto_increment: bool,
    /// Upper bound on text length, in characters.
    pub max_length: Option<u32>,
    /// Closed value set for enum columns.
    pub allowed: Option<Vec<String>>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            auto_increment: false,
            max_length: None,
            allowed: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn max_length(mut self, length: u32) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn allowed(mut self, options: Vec<String>) -> Self {
        self.allowed = Some(options);
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if matches!(value, Value::Null) {
            if !self.nullable {
                return Err(DbError::ConstraintViolation(format!(
                    "Column '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(DbError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        if let (Some(limit), Value::Text(text)) = (self.max_length, value)
            && text.chars().count() > limit as usize
        {
            return Err(DbError::ConstraintViolation(format!(
                "Value for column '{}' exceeds {} characters",
                self.name, limit
            )));
        }

        if let (Some(options), Value::Text(text)) = (&self.allowed, value)
            && !options.iter().any(|option| option == text)
        {
            return Err(DbError::ConstraintViolation(format!(
                "Value '{}' is not a member of enum column '{}'",
                text, self.name
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.find_column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|col| col.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_validation() {
        let column = Column::new("strScreen", DataType::Text).not_null().max_length(4);
        assert!(column.validate(&Value::Text("Hall".into())).is_ok());
        assert!(column.validate(&Value::Null).is_err());
        assert!(column.validate(&Value::Text("Hallway".into())).is_err());
        assert!(column.validate(&Value::Integer(1)).is_err());
    }

    #[test]
    fn test_enum_column_validation() {
        let column = Column::new("enumDirection", DataType::Text)
            .allowed(vec!["left".to_string(), "right".to_string()]);
        assert!(column.validate(&Value::Text("left".into())).is_ok());
        assert!(column.validate(&Value::Null).is_ok());
        let err = column.validate(&Value::Text("up".into())).unwrap_err();
        assert!(err.to_string().contains("not a member"));
    }
}
