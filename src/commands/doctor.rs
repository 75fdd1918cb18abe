// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::calc::Derive;
use crate::models::RecordDetails;
use crate::records;
use crate::trading;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

fn distinct_users(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM records UNION SELECT user_id FROM trading_details ORDER BY 1",
    )?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Every integrity problem found, as `(issue, detail)` pairs.
pub fn find_issues(conn: &Connection) -> Result<Vec<(String, String)>> {
    let mut issues = Vec::new();

    // 1) Dependents whose source is gone
    for (table, label) in [("calendar_events", "orphan_calendar"), ("reminders", "orphan_reminder")] {
        let sql = format!(
            "SELECT d.id, d.reference_type, d.reference_id FROM {} d
             WHERE (d.reference_type='record' AND NOT EXISTS (SELECT 1 FROM records r WHERE r.id=d.reference_id AND r.user_id=d.user_id))
                OR (d.reference_type='calendar' AND NOT EXISTS (SELECT 1 FROM calendar_events c WHERE c.id=d.reference_id AND c.user_id=d.user_id))
                OR (d.reference_type='reminder' AND NOT EXISTS (SELECT 1 FROM reminders m WHERE m.id=d.reference_id AND m.user_id=d.user_id))
             ORDER BY d.id",
            table
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut cur = stmt.query([])?;
        while let Some(r) = cur.next()? {
            let id: i64 = r.get(0)?;
            let t: String = r.get(1)?;
            let rid: i64 = r.get(2)?;
            issues.push((label.to_string(), format!("{} -> {} {}", id, t, rid)));
        }
    }

    // 2) Same bill twice in one month
    let mut stmt = conn.prepare(
        "SELECT user_id, lower(name), due_month, COUNT(*) FROM bills
         GROUP BY user_id, lower(name), due_month HAVING COUNT(*) > 1",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let user: String = r.get(0)?;
        let name: String = r.get(1)?;
        let month: String = r.get(2)?;
        let n: i64 = r.get(3)?;
        issues.push((
            "duplicate_bill".into(),
            format!("{}: '{}' {} x{}", user, name, month, n),
        ));
    }

    // 3) Stored derived fields that no longer match their inputs
    for user in distinct_users(conn)? {
        for rec in records::list_records(conn, &user, None)? {
            let mut fresh = rec.clone();
            fresh.derive();
            if fresh.amount != rec.amount
                || fresh.returns != rec.returns
                || fresh.returns_percentage != rec.returns_percentage
            {
                issues.push(("record_drift".into(), format!("{} '{}'", rec.id, rec.name)));
            }
            if matches!(rec.details, RecordDetails::Loan(_)) {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM loan_schedule WHERE record_id=?1",
                    [rec.id],
                    |r| r.get(0),
                )?;
                if n == 0 {
                    issues.push(("loan_without_schedule".into(), format!("{} '{}'", rec.id, rec.name)));
                }
            }
        }
        for t in trading::list_trades(conn, &user)? {
            let mut fresh = t.clone();
            fresh.derive();
            if fresh.valuation != t.valuation
                || fresh.actual_price != t.actual_price
                || fresh.actual_valuation != t.actual_valuation
            {
                issues.push(("trade_drift".into(), format!("{} {}", t.id, t.name_of_script)));
            }
        }
    }
    Ok(issues)
}

pub fn handle(conn: &Connection) -> Result<()> {
    let issues = find_issues(conn)?;
    if issues.is_empty() {
        println!("doctor: no issues found");
    } else {
        let rows = issues.into_iter().map(|(a, b)| vec![a, b]).collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
