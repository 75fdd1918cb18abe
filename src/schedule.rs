// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Calendar events and reminders: row mapping, CRUD, and the user-facing
//! operations that hand off to the sync router.

use crate::errors::LedgerError;
use crate::models::{CalendarEvent, OriginChain, ReferenceType, Reminder};
use crate::recurrence::project;
use crate::sync::{self, ReferenceKey, SyncReport};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

const CALENDAR_COLUMNS: &str = "id, user_id, title, description, date, category, status, repeat, frequency, reference_id, reference_type, origin_chain";
const REMINDER_COLUMNS: &str = "id, user_id, title, message, date_time, status, repeat, frequency, reference_id, reference_type, origin_chain";

fn calendar_from_row(r: &Row<'_>) -> rusqlite::Result<CalendarEvent> {
    Ok(CalendarEvent {
        id: r.get(0)?,
        user_id: r.get(1)?,
        title: r.get(2)?,
        description: r.get(3)?,
        date: r.get(4)?,
        category: r.get(5)?,
        status: r.get(6)?,
        repeat: r.get(7)?,
        frequency: r.get(8)?,
        reference_id: r.get(9)?,
        reference_type: r.get(10)?,
        origin_chain: r.get(11)?,
    })
}

fn reminder_from_row(r: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: r.get(0)?,
        user_id: r.get(1)?,
        title: r.get(2)?,
        message: r.get(3)?,
        date_time: r.get(4)?,
        status: r.get(5)?,
        repeat: r.get(6)?,
        frequency: r.get(7)?,
        reference_id: r.get(8)?,
        reference_type: r.get(9)?,
        origin_chain: r.get(10)?,
    })
}

pub fn insert_calendar(conn: &Connection, e: &CalendarEvent) -> Result<i64> {
    conn.execute(
        "INSERT INTO calendar_events(user_id, title, description, date, category, status, repeat, frequency, reference_id, reference_type, origin_chain)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            e.user_id,
            e.title,
            e.description,
            e.date,
            e.category,
            e.status,
            e.repeat,
            e.frequency,
            e.reference_id,
            e.reference_type,
            e.origin_chain
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_calendar(conn: &Connection, e: &CalendarEvent) -> Result<()> {
    let n = conn.execute(
        "UPDATE calendar_events SET title=?1, description=?2, date=?3, category=?4, status=?5, repeat=?6, frequency=?7, origin_chain=?8, updated_at=datetime('now')
         WHERE id=?9 AND user_id=?10",
        params![
            e.title,
            e.description,
            e.date,
            e.category,
            e.status,
            e.repeat,
            e.frequency,
            e.origin_chain,
            e.id,
            e.user_id
        ],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found("calendar event", e.id).into());
    }
    Ok(())
}

pub fn get_calendar(conn: &Connection, user_id: &str, id: i64) -> Result<CalendarEvent> {
    let sql = format!(
        "SELECT {} FROM calendar_events WHERE id=?1 AND user_id=?2",
        CALENDAR_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], calendar_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("calendar event", id).into())
}

pub fn find_calendar_by_reference(
    conn: &Connection,
    user_id: &str,
    key: ReferenceKey,
) -> Result<Option<CalendarEvent>> {
    let sql = format!(
        "SELECT {} FROM calendar_events WHERE user_id=?1 AND reference_id=?2 AND reference_type=?3",
        CALENDAR_COLUMNS
    );
    let e = conn
        .query_row(
            &sql,
            params![user_id, key.reference_id, key.reference_type],
            calendar_from_row,
        )
        .optional()?;
    Ok(e)
}

pub fn list_calendar(
    conn: &Connection,
    user_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<CalendarEvent>> {
    let sql = format!(
        "SELECT {} FROM calendar_events WHERE user_id=?1
         AND (?2 IS NULL OR date>=?2) AND (?3 IS NULL OR date<=?3)
         ORDER BY date, id",
        CALENDAR_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, from, to], calendar_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn delete_calendar_by_reference(
    conn: &Connection,
    user_id: &str,
    key: ReferenceKey,
) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM calendar_events WHERE user_id=?1 AND reference_id=?2 AND reference_type=?3",
        params![user_id, key.reference_id, key.reference_type],
    )?;
    Ok(n)
}

pub fn insert_reminder(conn: &Connection, r: &Reminder) -> Result<i64> {
    conn.execute(
        "INSERT INTO reminders(user_id, title, message, date_time, status, repeat, frequency, reference_id, reference_type, origin_chain)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            r.user_id,
            r.title,
            r.message,
            r.date_time,
            r.status,
            r.repeat,
            r.frequency,
            r.reference_id,
            r.reference_type,
            r.origin_chain
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_reminder(conn: &Connection, r: &Reminder) -> Result<()> {
    let n = conn.execute(
        "UPDATE reminders SET title=?1, message=?2, date_time=?3, status=?4, repeat=?5, frequency=?6, origin_chain=?7, updated_at=datetime('now')
         WHERE id=?8 AND user_id=?9",
        params![
            r.title,
            r.message,
            r.date_time,
            r.status,
            r.repeat,
            r.frequency,
            r.origin_chain,
            r.id,
            r.user_id
        ],
    )?;
    if n == 0 {
        return Err(LedgerError::not_found("reminder", r.id).into());
    }
    Ok(())
}

pub fn get_reminder(conn: &Connection, user_id: &str, id: i64) -> Result<Reminder> {
    let sql = format!(
        "SELECT {} FROM reminders WHERE id=?1 AND user_id=?2",
        REMINDER_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], reminder_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("reminder", id).into())
}

pub fn find_reminder_by_reference(
    conn: &Connection,
    user_id: &str,
    key: ReferenceKey,
) -> Result<Option<Reminder>> {
    let sql = format!(
        "SELECT {} FROM reminders WHERE user_id=?1 AND reference_id=?2 AND reference_type=?3",
        REMINDER_COLUMNS
    );
    let r = conn
        .query_row(
            &sql,
            params![user_id, key.reference_id, key.reference_type],
            reminder_from_row,
        )
        .optional()?;
    Ok(r)
}

pub fn list_reminders(
    conn: &Connection,
    user_id: &str,
    active_only: bool,
) -> Result<Vec<Reminder>> {
    let sql = format!(
        "SELECT {} FROM reminders WHERE user_id=?1 AND (?2 = 0 OR status='active')
         ORDER BY date_time, id",
        REMINDER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, active_only], reminder_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn delete_reminders_by_reference(
    conn: &Connection,
    user_id: &str,
    key: ReferenceKey,
) -> Result<usize> {
    let n = conn.execute(
        "DELETE FROM reminders WHERE user_id=?1 AND reference_id=?2 AND reference_type=?3",
        params![user_id, key.reference_id, key.reference_type],
    )?;
    Ok(n)
}

fn check_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(LedgerError::validation("Title is required").into());
    }
    Ok(())
}

/// Create a user-authored calendar event and mirror it into a reminder.
pub fn create_calendar_event(
    conn: &Connection,
    mut event: CalendarEvent,
    today: NaiveDate,
) -> Result<(CalendarEvent, SyncReport)> {
    check_title(&event.title)?;
    if event.repeat {
        event.date = project(event.date, event.frequency, today);
    }
    event.id = insert_calendar(conn, &event).context("Insert calendar event")?;
    debug!(id = event.id, user = %event.user_id, "calendar event created");
    let report = sync::propagate_calendar(conn, &event, today);
    Ok((event, report))
}

pub fn update_calendar_event(
    conn: &Connection,
    mut event: CalendarEvent,
    today: NaiveDate,
) -> Result<(CalendarEvent, SyncReport)> {
    check_title(&event.title)?;
    if event.repeat {
        event.date = project(event.date, event.frequency, today);
    }
    update_calendar(conn, &event)?;
    let report = sync::propagate_calendar(conn, &event, today);
    Ok((event, report))
}

/// Delete an event and the reminders created from it.
pub fn delete_calendar_event(conn: &Connection, user_id: &str, id: i64) -> Result<SyncReport> {
    get_calendar(conn, user_id, id)?;
    conn.execute(
        "DELETE FROM calendar_events WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    Ok(sync::cascade_delete(
        conn,
        user_id,
        ReferenceKey::new(id, ReferenceType::Calendar),
    ))
}

/// Create a user-authored reminder and mirror it into a calendar event.
pub fn create_reminder(
    conn: &Connection,
    mut reminder: Reminder,
    today: NaiveDate,
) -> Result<(Reminder, SyncReport)> {
    check_title(&reminder.title)?;
    if reminder.repeat {
        let date = project(reminder.date_time.date(), reminder.frequency, today);
        reminder.date_time = date.and_time(reminder.date_time.time());
    }
    reminder.id = insert_reminder(conn, &reminder).context("Insert reminder")?;
    debug!(id = reminder.id, user = %reminder.user_id, "reminder created");
    let report = sync::propagate_reminder(conn, &reminder, today);
    Ok((reminder, report))
}

pub fn update_reminder_entry(
    conn: &Connection,
    mut reminder: Reminder,
    today: NaiveDate,
) -> Result<(Reminder, SyncReport)> {
    check_title(&reminder.title)?;
    if reminder.repeat {
        let date = project(reminder.date_time.date(), reminder.frequency, today);
        reminder.date_time = date.and_time(reminder.date_time.time());
    }
    update_reminder(conn, &reminder)?;
    let report = sync::propagate_reminder(conn, &reminder, today);
    Ok((reminder, report))
}

pub fn delete_reminder(conn: &Connection, user_id: &str, id: i64) -> Result<SyncReport> {
    get_reminder(conn, user_id, id)?;
    conn.execute(
        "DELETE FROM reminders WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    Ok(sync::cascade_delete(
        conn,
        user_id,
        ReferenceKey::new(id, ReferenceType::Reminder),
    ))
}

/// A blank standalone event for `user_id`; callers fill in the rest.
pub fn new_calendar_event(user_id: &str, title: &str, date: NaiveDate) -> CalendarEvent {
    CalendarEvent {
        id: 0,
        user_id: user_id.to_string(),
        title: title.to_string(),
        description: None,
        date,
        category: None,
        status: Default::default(),
        repeat: false,
        frequency: None,
        reference_id: None,
        reference_type: None,
        origin_chain: OriginChain::default(),
    }
}

pub fn new_reminder(user_id: &str, title: &str, date_time: chrono::NaiveDateTime) -> Reminder {
    Reminder {
        id: 0,
        user_id: user_id.to_string(),
        title: title.to_string(),
        message: None,
        date_time,
        status: Default::default(),
        repeat: false,
        frequency: None,
        reference_id: None,
        reference_type: None,
        origin_chain: OriginChain::default(),
    }
}
