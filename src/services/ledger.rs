//! Append-only remark ledger.
//!
//! Remarks are only ever inserted; the only way one disappears is the
//! cascade when an administrator deletes the whole report.

use crate::{
    error::AppResult,
    models::{remark, Remark, RemarkModel},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;

pub async fn append<C: ConnectionTrait>(
    conn: &C,
    report_id: i32,
    author: &str,
    text: &str,
    at: chrono::NaiveDateTime,
) -> AppResult<RemarkModel> {
    let entry = remark::ActiveModel {
        report_id: Set(report_id),
        author: Set(author.to_string()),
        text: Set(text.to_string()),
        created_at: Set(at),
        ..Default::default()
    };
    Ok(entry.insert(conn).await?)
}

/// Remarks of one report in append order.
pub async fn for_report<C: ConnectionTrait>(conn: &C, report_id: i32) -> AppResult<Vec<RemarkModel>> {
    let remarks = Remark::find()
        .filter(remark::Column::ReportId.eq(report_id))
        .order_by_asc(remark::Column::Id)
        .all(conn)
        .await?;
    Ok(remarks)
}

/// Remarks for a page of reports, grouped by report id, each in append order.
pub async fn for_reports<C: ConnectionTrait>(
    conn: &C,
    report_ids: &[i32],
) -> AppResult<HashMap<i32, Vec<RemarkModel>>> {
    let mut grouped: HashMap<i32, Vec<RemarkModel>> = HashMap::new();
    if report_ids.is_empty() {
        return Ok(grouped);
    }

    let remarks = Remark::find()
        .filter(remark::Column::ReportId.is_in(report_ids.iter().copied()))
        .order_by_asc(remark::Column::Id)
        .all(conn)
        .await?;

    for entry in remarks {
        grouped.entry(entry.report_id).or_default().push(entry);
    }
    Ok(grouped)
}
