// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Session, print_sync};
use crate::models::{CalendarEvent, Frequency};
use crate::schedule;
use crate::utils::{
    maybe_print_json, opt_arg, opt_date_arg, parse_date, parse_id, pretty_table, req_arg,
};
use anyhow::Result;
use rusqlite::Connection;

fn apply_frequency(event: &mut CalendarEvent, raw: Option<String>) -> Result<()> {
    if let Some(v) = raw {
        let f: Frequency = v.parse()?;
        event.repeat = f.months().is_some();
        event.frequency = Some(f);
    }
    Ok(())
}

pub fn handle(conn: &Connection, s: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let date = parse_date(&req_arg(sub, "date"))?;
            let mut event = schedule::new_calendar_event(&s.user, &req_arg(sub, "title"), date);
            event.description = opt_arg(sub, "description");
            event.category = opt_arg(sub, "category");
            apply_frequency(&mut event, opt_arg(sub, "frequency"))?;
            let (event, report) = schedule::create_calendar_event(conn, event, s.today)?;
            println!("Added event {} '{}' on {}", event.id, event.title, event.date);
            print_sync(&report);
        }
        Some(("list", sub)) => {
            let rows = schedule::list_calendar(
                conn,
                &s.user,
                opt_date_arg(sub, "from")?,
                opt_date_arg(sub, "to")?,
            )?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                return Ok(());
            }
            let data = rows
                .iter()
                .map(|e| {
                    vec![
                        e.id.to_string(),
                        e.date.to_string(),
                        e.title.clone(),
                        e.status.to_string(),
                        e.frequency.map(|f| f.to_string()).unwrap_or_default(),
                        match (e.reference_type, e.reference_id) {
                            (Some(t), Some(id)) => format!("{} {}", t, id),
                            _ => String::new(),
                        },
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["ID", "Date", "Title", "Status", "Repeats", "Source"], data)
            );
        }
        Some(("update", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let mut event = schedule::get_calendar(conn, &s.user, id)?;
            if let Some(v) = opt_arg(sub, "title") {
                event.title = v;
            }
            if let Some(v) = opt_date_arg(sub, "date")? {
                event.date = v;
            }
            if let Some(v) = opt_arg(sub, "description") {
                event.description = Some(v);
            }
            if let Some(v) = opt_arg(sub, "category") {
                event.category = Some(v);
            }
            if let Some(v) = opt_arg(sub, "status") {
                event.status = v.parse()?;
            }
            apply_frequency(&mut event, opt_arg(sub, "frequency"))?;
            let (event, report) = schedule::update_calendar_event(conn, event, s.today)?;
            println!("Updated event {} '{}'", event.id, event.title);
            print_sync(&report);
        }
        Some(("rm", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let report = schedule::delete_calendar_event(conn, &s.user, id)?;
            println!("Removed event {}", id);
            print_sync(&report);
        }
        _ => {}
    }
    Ok(())
}
