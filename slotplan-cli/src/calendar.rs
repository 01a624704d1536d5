use chrono::{DateTime, Utc};
use slotplan_core::time::to_utc;
use slotplan_core::Schedule;

pub struct CalendarEvent {
    pub uid: String,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub summary: String,
    pub description: String,
}

/// One event per placed segment, in chronological order.
pub fn schedule_to_events(schedule: &Schedule, prefix: &str) -> Vec<CalendarEvent> {
    let mut events = Vec::new();

    for t in &schedule.tasks {
        let parts = t.segments.len();
        for (k, seg) in t.segments.iter().enumerate() {
            let summary = if parts > 1 {
                format!("{}{} ({}/{})", prefix, t.title, k + 1, parts)
            } else {
                format!("{}{}", prefix, t.title)
            };
            events.push(CalendarEvent {
                uid: format!("{}-{}@slotplan", t.id, k),
                start_utc: to_utc(seg.start),
                end_utc: to_utc(seg.end),
                summary,
                description: format!(
                    "TaskId: {}\nPriority: {:?}\nMinutes: {} of {}\nPartial: {}\n",
                    t.id, t.priority, seg.duration, t.duration, t.is_partial
                ),
            });
        }
    }

    events.sort_by_key(|e| e.start_utc);
    events
}

/// Emit a minimal ICS calendar containing VEVENT blocks.
///
/// DTSTART/DTEND are UTC. UIDs are stable per task and segment index.
pub fn events_to_ics(events: &[CalendarEvent]) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VCALENDAR\nVERSION:2.0\nPRODID:-//Slotplan//EN\n");

    for e in events {
        let dtstart = e.start_utc.format("%Y%m%dT%H%M%SZ");
        let dtend = e.end_utc.format("%Y%m%dT%H%M%SZ");

        s.push_str("BEGIN:VEVENT\n");
        s.push_str(&format!("UID:{}\n", escape_ics(&e.uid)));
        s.push_str(&format!("DTSTART:{}\n", dtstart));
        s.push_str(&format!("DTEND:{}\n", dtend));
        s.push_str(&format!("SUMMARY:{}\n", escape_ics(&e.summary)));
        s.push_str(&format!("DESCRIPTION:{}\n", escape_ics(&e.description)));
        s.push_str("END:VEVENT\n");
    }

    s.push_str("END:VCALENDAR\n");
    s
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}
