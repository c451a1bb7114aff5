//! Audit trail repository.
//!
//! Read side of `transaction_log`. Rows are only ever written by the save
//! pipeline; this module filters and reads them back, newest first.

use scribe_core::entities::TransactionLog;
use scribe_core::enums::AuditAction;

use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_text};
use crate::service::ScribeService;

const DEFAULT_LIMIT: u32 = 100;

/// Filter criteria for audit trail queries.
#[derive(Debug, Default, Clone)]
pub struct TransactionLogFilter {
    pub table_name: Option<String>,
    pub action: Option<AuditAction>,
    pub table_pk: Option<String>,
    pub user_name: Option<String>,
    pub limit: Option<u32>,
}

impl ScribeService {
    /// Query audit rows with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a stored row is malformed.
    pub async fn query_transaction_logs(
        &self,
        filter: &TransactionLogFilter,
    ) -> Result<Vec<TransactionLog>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref table) = filter.table_name {
            params.push(libsql::Value::Text(table.clone()));
            conditions.push(format!("table_name = ?{}", params.len()));
        }
        if let Some(action) = filter.action {
            params.push(libsql::Value::Text(action.as_str().to_string()));
            conditions.push(format!("action = ?{}", params.len()));
        }
        if let Some(ref pk) = filter.table_pk {
            params.push(libsql::Value::Text(pk.clone()));
            conditions.push(format!("table_pk = ?{}", params.len()));
        }
        if let Some(ref user) = filter.user_name {
            params.push(libsql::Value::Text(user.clone()));
            conditions.push(format!("user_name = ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT);
        let sql = format!(
            "SELECT id, action, action_datetime, table_name, table_pk, old_values, new_values, user_name
             FROM transaction_log {where_clause}
             ORDER BY id DESC LIMIT {limit}"
        );

        let mut rows = self
            .db()
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut logs = Vec::new();

        while let Some(row) = rows.next().await? {
            logs.push(TransactionLog {
                id: Some(row.get::<i64>(0)?),
                action: parse_text(&row.get::<String>(1)?)?,
                action_datetime: parse_datetime(&row.get::<String>(2)?)?,
                table_name: row.get::<String>(3)?,
                table_pk: get_opt_string(&row, 4)?,
                old_values: row.get::<Option<String>>(5)?,
                new_values: row.get::<Option<String>>(6)?,
                user_name: row.get::<String>(7)?,
            });
        }

        Ok(logs)
    }
}
