//! SQL Server repository implementation.
//!
//! Every operation executes exactly one stored procedure from
//! `backend/sql/procedures.sql` through a pooled tiberius connection.
//! Procedures signal failures with `THROW`:
//!
//! | number | meaning                          | maps to                 |
//! |--------|----------------------------------|-------------------------|
//! | 50404  | target row does not exist        | `NotFound`              |
//! | 50409  | business-rule conflict           | `Conflict`              |
//! | 50000+ | other rule violations            | `ValidationError`       |
//! | 2627   | unique constraint (fallback)     | `Conflict`              |

mod entities;
mod rows;

use bb8::Pool;
use bb8_tiberius::ConnectionManager;
use log::{debug, info};
use tiberius::{Query, Row};

use crate::db::config::SqlServerConfig;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::paging::{resolve_column, GroupedResult, PagedQuery, PagedResult, Pageable};

/// Column order used when a paged query names no (or an unknown) sort column.
const DEFAULT_SORT_COLUMN: &str = "id";

/// Repository backed by SQL Server stored procedures.
#[derive(Clone)]
pub struct SqlServerRepository {
    pool: Pool<ConnectionManager>,
}

/// `EXEC dbo.<procedure> @Name1 = @P1, @Name2 = @P2, ...`
fn exec_sql(procedure: &str, params: &[&str]) -> String {
    if params.is_empty() {
        return format!("EXEC dbo.{}", procedure);
    }
    let args: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(i, name)| format!("@{} = @P{}", name, i + 1))
        .collect();
    format!("EXEC dbo.{} {}", procedure, args.join(", "))
}

/// Narrow a listing parameter to the `INT` the procedures declare.
fn sql_int(name: &str, value: i64) -> RepositoryResult<i32> {
    i32::try_from(value).map_err(|_| {
        RepositoryError::validation(format!("{} {} is out of range", name, value))
    })
}

impl SqlServerRepository {
    /// Build the connection pool and verify the server is reachable.
    pub async fn connect(config: &SqlServerConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::new(config.to_tiberius_config());
        let pool = Pool::builder()
            .max_size(config.max_pool_size.max(1))
            .min_idle(Some(config.min_pool_size.min(config.max_pool_size)))
            .connection_timeout(config.connection_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .build(manager)
            .await
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    format!("Failed to create SQL Server connection pool: {}", e),
                    ErrorContext::new("connect")
                        .with_details(format!(
                            "{}:{}/{}",
                            config.server, config.port, config.database
                        ))
                        .retryable(),
                )
            })?;

        info!(
            "SQL Server pool ready ({}:{}/{}, max {} connections)",
            config.server, config.port, config.database, config.max_pool_size
        );
        Ok(Self { pool })
    }

    /// Run a procedure call and collect every result set.
    async fn result_sets(
        &self,
        query: Query<'_>,
        operation: &str,
    ) -> RepositoryResult<Vec<Vec<Row>>> {
        debug!("sqlserver: {}", operation);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| RepositoryError::from(e).with_operation(operation))?;
        let stream = query
            .query(&mut *conn)
            .await
            .map_err(|e| RepositoryError::from(e).with_operation(operation))?;
        stream
            .into_results()
            .await
            .map_err(|e| RepositoryError::from(e).with_operation(operation))
    }

    /// Rows of the first result set (empty when the procedure returned none).
    async fn rows(&self, query: Query<'_>, operation: &str) -> RepositoryResult<Vec<Row>> {
        let sets = self.result_sets(query, operation).await?;
        Ok(sets.into_iter().next().unwrap_or_default())
    }

    async fn optional_row(
        &self,
        query: Query<'_>,
        operation: &str,
    ) -> RepositoryResult<Option<Row>> {
        Ok(self.rows(query, operation).await?.into_iter().next())
    }

    /// First row of the first result set; procedures that write return the
    /// affected record.
    async fn single_row(&self, query: Query<'_>, operation: &str) -> RepositoryResult<Row> {
        self.optional_row(query, operation).await?.ok_or_else(|| {
            RepositoryError::internal_with_context(
                "Stored procedure returned no row",
                ErrorContext::new(operation),
            )
        })
    }

    /// Execute a procedure that returns no rows.
    async fn execute(&self, query: Query<'_>, operation: &str) -> RepositoryResult<()> {
        debug!("sqlserver: {}", operation);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| RepositoryError::from(e).with_operation(operation))?;
        query
            .execute(&mut *conn)
            .await
            .map_err(|e| RepositoryError::from(e).with_operation(operation))?;
        Ok(())
    }

    async fn decode_all<T>(
        &self,
        query: Query<'_>,
        operation: &str,
        decode: fn(&Row) -> RepositoryResult<T>,
    ) -> RepositoryResult<Vec<T>> {
        self.rows(query, operation)
            .await?
            .iter()
            .map(decode)
            .collect()
    }

    /// Call a `*_GetPaged` procedure.
    ///
    /// Parameters are `@Page, @PageSize, @Search, @SortColumn, @SortDirection,
    /// @IncludeInactive`; the procedure returns the page rows followed by a
    /// one-row `TotalCount` result set.
    async fn paged<T: Pageable>(
        &self,
        procedure: &str,
        query: &PagedQuery,
        decode: fn(&Row) -> RepositoryResult<T>,
    ) -> RepositoryResult<PagedResult<T>> {
        let query = query.normalized();
        let sort_column = query
            .sort_column
            .as_deref()
            .and_then(|c| resolve_column(T::SORT_COLUMNS, c))
            .unwrap_or(DEFAULT_SORT_COLUMN);

        let mut call = Query::new(exec_sql(
            procedure,
            &[
                "Page",
                "PageSize",
                "Search",
                "SortColumn",
                "SortDirection",
                "IncludeInactive",
            ],
        ));
        call.bind(sql_int("Page", query.page)?);
        call.bind(sql_int("PageSize", query.page_size)?);
        call.bind(query.search.clone());
        call.bind(sort_column);
        call.bind(query.sort_direction.as_str());
        call.bind(query.include_inactive);

        let mut sets = self.result_sets(call, procedure).await?;
        let total = match sets.last().and_then(|set| set.first()) {
            Some(row) if sets.len() >= 2 => rows::total_count(row)?,
            _ => 0,
        };
        let page_rows = if sets.len() >= 2 {
            sets.swap_remove(0)
        } else {
            Vec::new()
        };
        let items = page_rows.iter().map(decode).collect::<RepositoryResult<Vec<T>>>()?;

        Ok(PagedResult::new(items, total, query.page, query.page_size))
    }

    /// Group the rows of a `*_GetAll` procedure in memory.
    async fn grouped<T: Pageable>(
        &self,
        procedure: &str,
        query: &PagedQuery,
        decode: fn(&Row) -> RepositoryResult<T>,
    ) -> RepositoryResult<GroupedResult<T>> {
        let rows = self.get_all(procedure, true, decode).await?;
        crate::paging::group(rows, query).map_err(RepositoryError::validation)
    }

    /// Call a `*_GetAll` procedure (`@IncludeInactive`).
    async fn get_all<T>(
        &self,
        procedure: &str,
        include_inactive: bool,
        decode: fn(&Row) -> RepositoryResult<T>,
    ) -> RepositoryResult<Vec<T>> {
        let mut call = Query::new(exec_sql(procedure, &["IncludeInactive"]));
        call.bind(include_inactive);
        self.decode_all(call, procedure, decode).await
    }

    /// Call a `*_GetById` procedure; a missing row surfaces as THROW 50404.
    async fn get_by_id<T>(
        &self,
        procedure: &str,
        id: i64,
        decode: fn(&Row) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let mut call = Query::new(exec_sql(procedure, &["Id"]));
        call.bind(id);
        let row = self.single_row(call, procedure).await?;
        decode(&row)
    }

    /// Call a `*_Delete` (soft delete) procedure.
    async fn soft_delete(&self, procedure: &str, id: i64) -> RepositoryResult<()> {
        let mut call = Query::new(exec_sql(procedure, &["Id"]));
        call.bind(id);
        self.execute(call, procedure).await
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.execute(Query::new("SELECT 1"), "health_check").await
    }
}
