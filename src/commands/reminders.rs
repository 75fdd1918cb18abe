// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Session, print_sync};
use crate::models::{Frequency, Reminder};
use crate::schedule;
use crate::utils::{maybe_print_json, opt_arg, parse_datetime, parse_id, pretty_table, req_arg};
use anyhow::Result;
use rusqlite::Connection;

fn apply_frequency(reminder: &mut Reminder, raw: Option<String>) -> Result<()> {
    if let Some(v) = raw {
        let f: Frequency = v.parse()?;
        reminder.repeat = f.months().is_some();
        reminder.frequency = Some(f);
    }
    Ok(())
}

pub fn handle(conn: &Connection, s: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let at = parse_datetime(&req_arg(sub, "at"))?;
            let mut reminder = schedule::new_reminder(&s.user, &req_arg(sub, "title"), at);
            reminder.message = opt_arg(sub, "message");
            apply_frequency(&mut reminder, opt_arg(sub, "frequency"))?;
            let (reminder, report) = schedule::create_reminder(conn, reminder, s.today)?;
            println!(
                "Added reminder {} '{}' at {}",
                reminder.id,
                reminder.title,
                reminder.date_time.format("%Y-%m-%d %H:%M")
            );
            print_sync(&report);
        }
        Some(("list", sub)) => {
            let rows = schedule::list_reminders(conn, &s.user, sub.get_flag("active"))?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                return Ok(());
            }
            let data = rows
                .iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        r.date_time.format("%Y-%m-%d %H:%M").to_string(),
                        r.title.clone(),
                        r.status.to_string(),
                        r.frequency.map(|f| f.to_string()).unwrap_or_default(),
                        r.message.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["ID", "When", "Title", "Status", "Repeats", "Message"], data)
            );
        }
        Some(("update", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let mut reminder = schedule::get_reminder(conn, &s.user, id)?;
            if let Some(v) = opt_arg(sub, "title") {
                reminder.title = v;
            }
            if let Some(v) = opt_arg(sub, "at") {
                reminder.date_time = parse_datetime(&v)?;
            }
            if let Some(v) = opt_arg(sub, "message") {
                reminder.message = Some(v);
            }
            if let Some(v) = opt_arg(sub, "status") {
                reminder.status = v.parse()?;
            }
            apply_frequency(&mut reminder, opt_arg(sub, "frequency"))?;
            let (reminder, report) = schedule::update_reminder_entry(conn, reminder, s.today)?;
            println!("Updated reminder {} '{}'", reminder.id, reminder.title);
            print_sync(&report);
        }
        Some(("rm", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let report = schedule::delete_reminder(conn, &s.user, id)?;
            println!("Removed reminder {}", id);
            print_sync(&report);
        }
        _ => {}
    }
    Ok(())
}
