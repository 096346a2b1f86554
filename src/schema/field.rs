use crate::core::{Column, DataType, Value, parse_timestamp};
use crate::storage::quote_ident;

/// Storage kind of a declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Boolean,
    Varchar,
    Text,
    Timestamp,
    /// Closed set of text options.
    Enum(Vec<String>),
}

impl FieldKind {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Integer => DataType::Integer,
            Self::Float => DataType::Float,
            Self::Boolean => DataType::Boolean,
            Self::Varchar | Self::Text | Self::Enum(_) => DataType::Text,
            Self::Timestamp => DataType::Timestamp,
        }
    }

    /// Converts text into this kind when it parses; anything else is
    /// returned as given.
    pub fn coerce(&self, value: Value) -> Value {
        let Value::Text(text) = &value else {
            return value;
        };
        let text = text.trim();
        let parsed = match self {
            Self::Integer => text.parse().ok().map(Value::Integer),
            Self::Float => text.parse().ok().map(Value::Float),
            Self::Boolean => match text {
                "1" | "true" => Some(Value::Boolean(true)),
                "0" | "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            Self::Timestamp => parse_timestamp(text).map(Value::Timestamp),
            Self::Varchar | Self::Text | Self::Enum(_) => None,
        };
        parsed.unwrap_or(value)
    }
}

/// Column declaration for one field of an entity.
///
/// Fields are NOT NULL unless marked [`nullable`](Self::nullable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub length: Option<u32>,
    pub nullable: bool,
    pub unique: bool,
}

impl FieldSpec {
    fn of(kind: FieldKind) -> Self {
        Self {
            name: "",
            kind,
            length: None,
            nullable: false,
            unique: false,
        }
    }

    pub fn integer() -> Self {
        Self::of(FieldKind::Integer)
    }

    pub fn float() -> Self {
        Self::of(FieldKind::Float)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn varchar(length: u32) -> Self {
        Self::of(FieldKind::Varchar).length(length)
    }

    pub fn text() -> Self {
        Self::of(FieldKind::Text)
    }

    pub fn timestamp() -> Self {
        Self::of(FieldKind::Timestamp)
    }

    pub fn enumeration(options: &[&str]) -> Self {
        Self::of(FieldKind::Enum(
            options.iter().map(|option| option.to_string()).collect(),
        ))
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds the field to the entity's composite unique key.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn data_type(&self) -> DataType {
        self.kind.data_type()
    }

    pub fn enum_options(&self) -> Option<&[String]> {
        match &self.kind {
            FieldKind::Enum(options) => Some(options),
            _ => None,
        }
    }

    /// MySQL column type.
    pub fn sql_type(&self) -> String {
        match (&self.kind, self.length) {
            (FieldKind::Integer, Some(length)) => format!("int({})", length),
            (FieldKind::Integer, None) => "int".to_string(),
            (FieldKind::Float, _) => "float".to_string(),
            (FieldKind::Boolean, _) => "tinyint(1)".to_string(),
            (FieldKind::Varchar, length) => format!("varchar({})", length.unwrap_or(255)),
            (FieldKind::Text, _) => "text".to_string(),
            (FieldKind::Timestamp, _) => "datetime".to_string(),
            (FieldKind::Enum(options), _) => {
                let quoted: Vec<String> = options
                    .iter()
                    .map(|option| format!("'{}'", option.replace('\'', "''")))
                    .collect();
                format!("enum({})", quoted.join(","))
            }
        }
    }

    /// Column definition as it appears inside CREATE TABLE.
    pub fn column_sql(&self) -> String {
        format!(
            "{} {} {}",
            quote_ident(self.name),
            self.sql_type(),
            if self.nullable { "NULL" } else { "NOT NULL" }
        )
    }

    /// Checks a value against type, nullability, length and enum options.
    pub fn accepts(&self, value: &Value) -> Result<(), String> {
        self.to_column()
            .validate(value)
            .map_err(|err| err.to_string())
    }

    pub fn to_column(&self) -> Column {
        let mut column = Column::new(self.name, self.data_type());
        if !self.nullable {
            column = column.not_null();
        }
        if matches!(self.kind, FieldKind::Varchar | FieldKind::Text)
            && let Some(length) = self.length
        {
            column = column.max_length(length);
        }
        if let Some(options) = self.enum_options() {
            column = column.allowed(options.to_vec());
        }
        column
    }
}
