use crate::storage::error::{StorageError, StorageResult};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Fixed number of bytes reserved for the contents of a varchar field.
pub const STRING_LEN: usize = 128;

/// Data types supported by the database. Every type has a fixed on-page width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Varchar,
}

impl DataType {
    /// Bytes this type occupies inside a tuple record.
    pub fn width(&self) -> usize {
        match self {
            DataType::Boolean => 1,
            DataType::Int32 => 4,
            // u32 length prefix followed by zero-padded contents
            DataType::Varchar => 4 + STRING_LEN,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Some(DataType::Boolean),
            "int" | "int32" | "integer" => Some(DataType::Int32),
            "varchar" | "string" | "text" => Some(DataType::Varchar),
            _ => None,
        }
    }
}

/// Values that can be stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    String(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Int32(_) => DataType::Int32,
            Value::String(_) => DataType::Varchar,
        }
    }

    /// Parses a textual literal as a value of the given type.
    pub fn parse_as(text: &str, data_type: DataType) -> StorageResult<Self> {
        match data_type {
            DataType::Boolean => text
                .parse::<bool>()
                .map(Value::Boolean)
                .map_err(|_| StorageError::SchemaMismatch(format!("'{}' is not a boolean", text))),
            DataType::Int32 => text
                .parse::<i32>()
                .map(Value::Int32)
                .map_err(|_| StorageError::SchemaMismatch(format!("'{}' is not an int32", text))),
            DataType::Varchar => Ok(Value::String(text.to_string())),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int32(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered column list of a table. Determines the width of every tuple record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Builds a schema with generated column names `c0`, `c1`, ...
    pub fn from_types(types: &[DataType]) -> Self {
        let columns = types
            .iter()
            .enumerate()
            .map(|(i, data_type)| Column::new(format!("c{}", i), *data_type))
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn tuple_width(&self) -> usize {
        self.columns.iter().map(|c| c.data_type.width()).sum()
    }

    pub fn validate(&self, values: &[Value]) -> StorageResult<()> {
        if values.len() != self.columns.len() {
            return Err(StorageError::SchemaMismatch(format!(
                "value count {} doesn't match schema length {}",
                values.len(),
                self.columns.len()
            )));
        }

        for (value, column) in values.iter().zip(&self.columns) {
            if value.data_type() != column.data_type {
                return Err(StorageError::SchemaMismatch(format!(
                    "value {:?} is not compatible with column '{}' of type {:?}",
                    value, column.name, column.data_type
                )));
            }
            if let Value::String(s) = value {
                if s.len() > STRING_LEN {
                    return Err(StorageError::SchemaMismatch(format!(
                        "string of {} bytes exceeds limit of {}",
                        s.len(),
                        STRING_LEN
                    )));
                }
            }
        }

        Ok(())
    }

    /// Writes `values` into `out`, which must be exactly `tuple_width()` bytes.
    pub fn encode(&self, values: &[Value], out: &mut [u8]) -> StorageResult<()> {
        self.validate(values)?;
        if out.len() != self.tuple_width() {
            return Err(StorageError::Internal(format!(
                "record buffer is {} bytes, tuple width is {}",
                out.len(),
                self.tuple_width()
            )));
        }

        let mut cursor = out;
        for value in values {
            match value {
                Value::Boolean(b) => cursor.write_u8(u8::from(*b))?,
                Value::Int32(i) => cursor.write_i32::<LittleEndian>(*i)?,
                Value::String(s) => {
                    let bytes = s.as_bytes();
                    cursor.write_u32::<LittleEndian>(bytes.len() as u32)?;
                    cursor.write_all(bytes)?;
                    cursor.write_all(&[0u8; STRING_LEN][..STRING_LEN - bytes.len()])?;
                }
            }
        }

        Ok(())
    }

    /// Decodes one tuple record of exactly `tuple_width()` bytes.
    pub fn decode(&self, data: &[u8]) -> StorageResult<Vec<Value>> {
        if data.len() != self.tuple_width() {
            return Err(StorageError::Corrupted(format!(
                "record is {} bytes, tuple width is {}",
                data.len(),
                self.tuple_width()
            )));
        }

        let mut cursor = data;
        let mut values = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = match column.data_type {
                DataType::Boolean => Value::Boolean(cursor.read_u8()? != 0),
                DataType::Int32 => Value::Int32(cursor.read_i32::<LittleEndian>()?),
                DataType::Varchar => {
                    let len = cursor.read_u32::<LittleEndian>()? as usize;
                    if len > STRING_LEN {
                        return Err(StorageError::Corrupted(format!(
                            "varchar length {} exceeds {}",
                            len, STRING_LEN
                        )));
                    }
                    let mut buf = [0u8; STRING_LEN];
                    cursor.read_exact(&mut buf)?;
                    let s = std::str::from_utf8(&buf[..len])
                        .map_err(|e| StorageError::Corrupted(format!("invalid utf-8: {}", e)))?;
                    Value::String(s.to_string())
                }
            };
            values.push(value);
        }

        Ok(values)
    }
}
