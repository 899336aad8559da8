use std::collections::HashMap;
use std::sync::Arc;

use crate::value::{ColumnType, Value};

/// Name and type of a column in a result set.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub column_type: ColumnType,
}

#[derive(Clone, Debug)]
pub struct Row {
    index: Arc<HashMap<String, usize>>,
    fields: Arc<Vec<Field>>,
    values: Vec<Value>,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Illegal Kind: field={0}, kind={1}")]
    KindMismatch(String, String),
    #[error("Unexpected NULL: field={0}")]
    UnexpectedNull(String),
    #[error("No column found: name={0}")]
    NoColumnFound(String),
    #[error("invalid column index: index={0}, length={1}")]
    InvalidColumnIndex(usize, usize),
}

impl Row {
    pub fn new(index: Arc<HashMap<String, usize>>, fields: Arc<Vec<Field>>, values: Vec<Value>) -> Row {
        Row { index, fields, values }
    }

    pub fn column<T>(&self, column_index: usize) -> Result<T, Error>
    where
        T: TryFromValue,
    {
        let field = self
            .fields
            .get(column_index)
            .ok_or(Error::InvalidColumnIndex(column_index, self.fields.len()))?;
        let value = self
            .values
            .get(column_index)
            .ok_or(Error::InvalidColumnIndex(column_index, self.values.len()))?;
        T::try_from(value, field)
    }

    pub fn column_by_name<T>(&self, column_name: &str) -> Result<T, Error>
    where
        T: TryFromValue,
    {
        self.column(index(&self.index, column_name)?)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

fn index(index: &HashMap<String, usize>, column_name: &str) -> Result<usize, Error> {
    match index.get(column_name) {
        Some(column_index) => Ok(*column_index),
        None => Err(Error::NoColumnFound(column_name.to_string())),
    }
}

/// Builds the shared column metadata for every row of one result set.
pub(crate) fn metadata(fields: Vec<Field>) -> (Arc<HashMap<String, usize>>, Arc<Vec<Field>>) {
    let index = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.to_string(), i))
        .collect::<HashMap<_, _>>();
    (Arc::new(index), Arc::new(fields))
}

//don't use TryFrom trait to avoid the conflict
//https://github.com/rust-lang/rust/issues/50133
pub trait TryFromValue: Sized {
    fn try_from(value: &Value, field: &Field) -> Result<Self, Error>;
}

fn kind_to_error<T>(v: &Value, field: &Field) -> Result<T, Error> {
    match v {
        Value::Null => Err(Error::UnexpectedNull(field.name.to_string())),
        v => Err(Error::KindMismatch(field.name.to_string(), format!("{:?}", v))),
    }
}

impl TryFromValue for i64 {
    fn try_from(item: &Value, field: &Field) -> Result<Self, Error> {
        match item {
            Value::Int64(v) => Ok(*v),
            v => kind_to_error(v, field),
        }
    }
}

impl TryFromValue for f64 {
    fn try_from(item: &Value, field: &Field) -> Result<Self, Error> {
        match item {
            Value::Float64(v) => Ok(*v),
            v => kind_to_error(v, field),
        }
    }
}

impl TryFromValue for bool {
    fn try_from(item: &Value, field: &Field) -> Result<Self, Error> {
        match item {
            Value::Bool(v) => Ok(*v),
            v => kind_to_error(v, field),
        }
    }
}

impl TryFromValue for String {
    fn try_from(item: &Value, field: &Field) -> Result<Self, Error> {
        match item {
            Value::String(v) => Ok(v.clone()),
            v => kind_to_error(v, field),
        }
    }
}

impl TryFromValue for Vec<u8> {
    fn try_from(item: &Value, field: &Field) -> Result<Self, Error> {
        match item {
            Value::Bytes(v) => Ok(v.clone()),
            v => kind_to_error(v, field),
        }
    }
}

impl TryFromValue for Value {
    fn try_from(item: &Value, _field: &Field) -> Result<Self, Error> {
        Ok(item.clone())
    }
}

impl<T> TryFromValue for Option<T>
where
    T: TryFromValue,
{
    fn try_from(item: &Value, field: &Field) -> Result<Self, Error> {
        match item {
            Value::Null => Ok(None),
            _ => Ok(Some(T::try_from(item, field)?)),
        }
    }
}
