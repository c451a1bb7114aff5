use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::value::{FieldMap, FieldValue};

/// A persisted employee record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

impl Employee {
    /// Read an employee back from tracked column values.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidValue` if a required column is missing or
    /// has the wrong type.
    pub fn from_field_map(values: &FieldMap) -> Result<Self, CoreError> {
        let text = |name: &str| {
            values
                .get(name)
                .and_then(FieldValue::as_text)
                .map(str::to_string)
                .ok_or_else(|| CoreError::InvalidValue(format!("employee.{name} is not text")))
        };
        let id = values
            .get("id")
            .and_then(FieldValue::as_integer)
            .ok_or_else(|| CoreError::InvalidValue("employee.id is not an integer".into()))?;
        Ok(Self {
            id,
            first_name: text("first_name")?,
            last_name: text("last_name")?,
            phone_number: values
                .get("phone_number")
                .and_then(FieldValue::as_text)
                .map(str::to_string),
        })
    }
}

/// Values for a new employee. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

impl NewEmployee {
    #[must_use]
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone_number: None,
        }
    }

    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    /// Columns to insert. An unset phone number is left out entirely.
    #[must_use]
    pub fn to_field_map(&self) -> FieldMap {
        let mut map = FieldMap::new()
            .with("first_name", self.first_name.as_str())
            .with("last_name", self.last_name.as_str());
        if let Some(ref phone) = self.phone_number {
            map.insert("phone_number", phone.as_str());
        }
        map
    }
}

/// Partial update. `phone_number: Some(None)` clears the number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<Option<String>>,
}

impl EmployeeUpdate {
    /// Columns to set, in declaration order.
    #[must_use]
    pub fn to_field_map(&self) -> FieldMap {
        let mut map = FieldMap::new();
        if let Some(ref first) = self.first_name {
            map.insert("first_name", first.as_str());
        }
        if let Some(ref last) = self.last_name {
            map.insert("last_name", last.as_str());
        }
        if let Some(ref phone) = self.phone_number {
            map.insert("phone_number", FieldValue::from(phone.clone()));
        }
        map
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone_number.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_employee_omits_unset_phone() {
        let keys: Vec<String> = NewEmployee::new("John", "Don")
            .to_field_map()
            .keys()
            .map(str::to_string)
            .collect();
        assert_eq!(keys, vec!["first_name", "last_name"]);
    }

    #[test]
    fn update_can_clear_phone() {
        let update = EmployeeUpdate {
            phone_number: Some(None),
            ..EmployeeUpdate::default()
        };
        assert_eq!(
            update.to_field_map(),
            FieldMap::new().with("phone_number", FieldValue::Null)
        );
        assert!(EmployeeUpdate::default().is_empty());
    }

    #[test]
    fn from_field_map_reads_columns() {
        let values = FieldMap::new()
            .with("id", 3_i64)
            .with("first_name", "Ann")
            .with("last_name", "Lee")
            .with("phone_number", FieldValue::Null);
        let employee = Employee::from_field_map(&values).unwrap();
        assert_eq!(
            employee,
            Employee {
                id: 3,
                first_name: "Ann".into(),
                last_name: "Lee".into(),
                phone_number: None,
            }
        );
    }

    #[test]
    fn from_field_map_requires_id() {
        let values = FieldMap::new().with("first_name", "Ann").with("last_name", "Lee");
        assert!(Employee::from_field_map(&values).is_err());
    }
}
