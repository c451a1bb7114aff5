//! Employee repository.
//!
//! Mutations go through a unit of work and `save_with_audit`, so every
//! change lands in `transaction_log`. Reads query the table directly.

use scribe_core::FieldMap;
use scribe_core::entities::{Employee, EmployeeUpdate, EntityHandle, NewEmployee};
use scribe_schema::entity::EMPLOYEE_TYPE;

use crate::error::{DatabaseError, ServiceError, StoreError};
use crate::helpers::get_opt_string;
use crate::orchestrator::SaveReport;
use crate::service::ScribeService;
use crate::unit_of_work::UnitOfWork;

const EMPLOYEE_COLUMNS: &str = "id, first_name, last_name, phone_number";

fn employee_key(id: i64) -> FieldMap {
    FieldMap::new().with("id", id)
}

fn tracked_employee(uow: &UnitOfWork, handle: EntityHandle) -> Result<Employee, ServiceError> {
    let values = uow.values(handle).ok_or(StoreError::UnknownEntity(handle))?;
    Ok(Employee::from_field_map(&values)?)
}

fn row_to_employee(row: &libsql::Row) -> Result<Employee, DatabaseError> {
    Ok(Employee {
        id: row.get::<i64>(0)?,
        first_name: row.get::<String>(1)?,
        last_name: row.get::<String>(2)?,
        phone_number: get_opt_string(row, 3)?,
    })
}

impl ScribeService {
    /// Insert an employee and audit it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Save` if the save fails; see
    /// [`crate::error::SaveError::data_committed`] for whether the row exists.
    pub async fn add_employee(
        &self,
        employee: &NewEmployee,
    ) -> Result<(Employee, SaveReport), ServiceError> {
        let mut uow = self.unit_of_work();
        let handle = uow.insert(EMPLOYEE_TYPE, employee.to_field_map())?;
        let report = self.save_with_audit(&mut uow).await?;
        Ok((tracked_employee(&uow, handle)?, report))
    }

    /// Apply a partial update. Returns `None` if no employee has this id.
    ///
    /// Setting a field to its current value is not audited.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if loading or saving fails.
    pub async fn update_employee(
        &self,
        id: i64,
        update: &EmployeeUpdate,
    ) -> Result<Option<(Employee, SaveReport)>, ServiceError> {
        let mut uow = self.unit_of_work();
        let Some(handle) = uow.load(EMPLOYEE_TYPE, &employee_key(id)).await? else {
            return Ok(None);
        };
        uow.set_fields(handle, &update.to_field_map())?;
        let report = self.save_with_audit(&mut uow).await?;
        Ok(Some((tracked_employee(&uow, handle)?, report)))
    }

    /// Delete an employee. Returns the deleted record, or `None` if no
    /// employee has this id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError` if loading or saving fails.
    pub async fn delete_employee(
        &self,
        id: i64,
    ) -> Result<Option<(Employee, SaveReport)>, ServiceError> {
        let mut uow = self.unit_of_work();
        let Some(handle) = uow.load(EMPLOYEE_TYPE, &employee_key(id)).await? else {
            return Ok(None);
        };
        let employee = tracked_employee(&uow, handle)?;
        uow.delete(handle)?;
        let report = self.save_with_audit(&mut uow).await?;
        Ok(Some((employee, report)))
    }

    /// Get an employee by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_employee(&self, id: i64) -> Result<Option<Employee>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?1"),
                [id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_employee(&row)?)),
            None => Ok(None),
        }
    }

    /// List employees by id, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_employees(&self, limit: u32) -> Result<Vec<Employee>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id LIMIT ?1"),
                [i64::from(limit)],
            )
            .await?;
        let mut employees = Vec::new();
        while let Some(row) = rows.next().await? {
            employees.push(row_to_employee(&row)?);
        }
        Ok(employees)
    }
}

#[cfg(test)]
mod tests {
    use crate::repos::TransactionLogFilter;
    use crate::test_support::helpers::{test_service, test_service_as};
    use pretty_assertions::assert_eq;
    use scribe_core::entities::{EmployeeUpdate, NewEmployee};
    use scribe_core::enums::AuditAction;

    #[tokio::test]
    async fn add_returns_generated_id() {
        let svc = test_service().await;
        let (first, report) = svc
            .add_employee(&NewEmployee::new("John", "Don"))
            .await
            .unwrap();
        let (second, _) = svc
            .add_employee(&NewEmployee::new("Jane", "Roe").with_phone("555-0101"))
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.phone_number.as_deref(), Some("555-0101"));
        assert_eq!(report.audited, 1);
        assert_eq!(svc.get_employee(1).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn update_records_only_changed_columns() {
        let svc = test_service_as("alice").await;
        let (john, _) = svc
            .add_employee(&NewEmployee::new("John", "Don"))
            .await
            .unwrap();

        let update = EmployeeUpdate {
            last_name: Some("Doe".into()),
            first_name: Some("John".into()),
            ..EmployeeUpdate::default()
        };
        let (updated, report) = svc.update_employee(john.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.last_name, "Doe");
        assert_eq!(report.audited, 1);

        let logs = svc
            .query_transaction_logs(&TransactionLogFilter {
                action: Some(AuditAction::Update),
                ..TransactionLogFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].old_values.as_deref(), Some(r#"{"last_name":"Don"}"#));
        assert_eq!(logs[0].new_values.as_deref(), Some(r#"{"last_name":"Doe"}"#));
        assert_eq!(logs[0].table_pk.as_deref(), Some("1"));
        assert_eq!(logs[0].user_name, "alice");
    }

    #[tokio::test]
    async fn unchanged_update_is_not_audited() {
        let svc = test_service().await;
        let (john, _) = svc
            .add_employee(&NewEmployee::new("John", "Don"))
            .await
            .unwrap();
        let update = EmployeeUpdate {
            first_name: Some("John".into()),
            ..EmployeeUpdate::default()
        };
        let (_, report) = svc.update_employee(john.id, &update).await.unwrap().unwrap();
        assert_eq!(report.captured, 0);
        assert_eq!(report.audited, 0);
    }

    #[tokio::test]
    async fn clearing_phone_is_audited_as_null() {
        let svc = test_service().await;
        let (jane, _) = svc
            .add_employee(&NewEmployee::new("Jane", "Roe").with_phone("555-0101"))
            .await
            .unwrap();
        let update = EmployeeUpdate {
            phone_number: Some(None),
            ..EmployeeUpdate::default()
        };
        let (updated, _) = svc.update_employee(jane.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.phone_number, None);

        let logs = svc
            .query_transaction_logs(&TransactionLogFilter {
                action: Some(AuditAction::Update),
                ..TransactionLogFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(logs[0].new_values.as_deref(), Some(r#"{"phone_number":null}"#));
    }

    #[tokio::test]
    async fn delete_returns_removed_record() {
        let svc = test_service().await;
        let (john, _) = svc
            .add_employee(&NewEmployee::new("John", "Don"))
            .await
            .unwrap();
        let (deleted, report) = svc.delete_employee(john.id).await.unwrap().unwrap();
        assert_eq!(deleted, john);
        assert_eq!(report.audited, 1);
        assert_eq!(svc.get_employee(john.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_employee_is_none() {
        let svc = test_service().await;
        assert!(svc
            .update_employee(42, &EmployeeUpdate::default())
            .await
            .unwrap()
            .is_none());
        assert!(svc.delete_employee(42).await.unwrap().is_none());
        assert!(svc.get_employee(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_ordered_and_limited() {
        let svc = test_service().await;
        for (first, last) in [("A", "One"), ("B", "Two"), ("C", "Three")] {
            svc.add_employee(&NewEmployee::new(first, last)).await.unwrap();
        }
        let listed = svc.list_employees(2).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|e| e.first_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
