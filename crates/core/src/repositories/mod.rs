//! SQL access for each entity.
//!
//! Every function takes `&mut SqliteConnection` so that services can run several of them in one
//! transaction (`&mut tx`) or on a plain pooled connection. Business rules live in
//! [`crate::services`]; repositories only translate between rows and models.

pub mod appointments;
pub mod audit;
pub mod consultations;
pub mod employees;
pub mod exam_types;
pub mod exams;
pub mod patients;
pub mod prescriptions;
pub mod reports;
pub mod roles;
pub mod specialties;

use crate::models::{Page, PageRequest};
use crate::ClinicResult;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

/// Run a filtered `SELECT` twice: once for the total count and once for the requested page.
///
/// `push_filter` appends the `WHERE` clause to both queries; `order_by` is appended to the page
/// query only.
pub(crate) async fn fetch_page<T, F>(
    conn: &mut SqliteConnection,
    select: &str,
    from: &str,
    push_filter: F,
    order_by: &str,
    page: PageRequest,
) -> ClinicResult<Page<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    F: Fn(&mut QueryBuilder<'_, Sqlite>),
{
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) ");
    count.push(from);
    push_filter(&mut count);
    let (total,): (i64,) = count.build_query_as().fetch_one(&mut *conn).await?;

    let mut query = QueryBuilder::<Sqlite>::new(select);
    query.push(" ");
    query.push(from);
    push_filter(&mut query);
    query.push(" ORDER BY ");
    query.push(order_by);
    query.push(" LIMIT ");
    query.push_bind(page.limit());
    query.push(" OFFSET ");
    query.push_bind(page.offset());
    let items = query.build_query_as::<T>().fetch_all(&mut *conn).await?;

    Ok(Page::new(items, total, page))
}
