//! Output formatting for the terminal session.

use tandem_shared::time::format_local_datetime;

use crate::{
    domain::{Notice, SegmentLogRecord, Severity, TimerMode},
    usecase::{Phase, SessionSnapshot},
};

const RULE: &str = "============================================================";

/// Formatter for everything the session prints
pub struct StatusFormatter;

impl StatusFormatter {
    /// `MM:SS`; minutes are not wrapped at an hour
    pub fn format_clock(seconds: u32) -> String {
        format!("{:02}:{:02}", seconds / 60, seconds % 60)
    }

    /// Format the current session state
    ///
    /// # Arguments
    ///
    /// * `snapshot` - Observable controller state
    ///
    /// # Returns
    ///
    /// A multi-line block with identity, pairing and timer
    pub fn format_status(snapshot: &SessionSnapshot) -> String {
        let name = |id: Option<&str>| id.unwrap_or("(not set)").to_string();
        let timer = &snapshot.timer;

        let mut output = String::new();
        output.push_str(&format!("\n{}\n", RULE));
        output.push_str(&format!(
            "You: {}   Partner: {}\n",
            name(snapshot.self_id.as_ref().map(|id| id.as_str())),
            name(snapshot.partner_id.as_ref().map(|id| id.as_str()))
        ));
        match &snapshot.pairing_key {
            Some(key) => output.push_str(&format!("Session: {}\n", key)),
            None => output.push_str("Session: (not connected)\n"),
        }
        output.push_str(&format!(
            "{}  {}  [{}]\n",
            timer.active_mode.label(),
            Self::format_clock(timer.remaining_seconds),
            Self::phase_label(snapshot.phase)
        ));
        output.push_str(&format!(
            "Durations: focus {} min / break {} min\n",
            timer.durations.focus_minutes(),
            timer.durations.break_minutes()
        ));
        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Format a notice as a single line
    pub fn format_notice(notice: &Notice) -> String {
        let marker = match notice.severity {
            Severity::Informational => "*",
            Severity::Destructive => "!",
        };
        format!("\n{} {}: {}\n", marker, notice.title, notice.description)
    }

    /// Format the focus journal, newest first
    pub fn format_log(records: &[SegmentLogRecord]) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\nOur focus journal:\n", RULE));

        if records.is_empty() {
            output.push_str("(No sessions yet)\n");
        } else {
            for record in records {
                let kind = match record.segment_kind {
                    TimerMode::Focus => "Focus",
                    TimerMode::Break => "Break",
                };
                output.push_str(&format!(
                    "{} - {} {} min\n",
                    format_local_datetime(record.recorded_at),
                    kind,
                    record.duration_minutes
                ));
            }
        }

        output.push_str(&format!("{}\n", RULE));
        output
    }

    pub fn format_help() -> &'static str {
        "\nCommands:\n\
         \x20 id <your-id>              set your ID\n\
         \x20 partner <partner-id>      link with your partner\n\
         \x20 disconnect                forget your partner\n\
         \x20 logout                    clear both IDs\n\
         \x20 start | pause | stop      control the shared timer\n\
         \x20 mode focus|break          switch mode (resets the timer)\n\
         \x20 settings <focus> <break>  set durations in minutes\n\
         \x20 status                    show the timer\n\
         \x20 log                       show our focus journal\n\
         \x20 quit                      exit\n"
    }

    fn phase_label(phase: Phase) -> &'static str {
        match phase {
            Phase::Unpaired => "unpaired",
            Phase::Stopped => "stopped",
            Phase::Running => "running",
            Phase::Paused => "paused",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PairingKey, ParticipantId, TimerState};

    #[test]
    fn test_format_clock() {
        // テスト項目: 秒数が MM:SS 形式になる
        // given (前提条件):
        let values = [1500, 59, 0, 3600];

        // when (操作):
        let formatted: Vec<String> = values
            .iter()
            .map(|s| StatusFormatter::format_clock(*s))
            .collect();

        // then (期待する結果):
        assert_eq!(formatted, vec!["25:00", "00:59", "00:00", "60:00"]);
    }

    #[test]
    fn test_format_status_paired() {
        // テスト項目: ペアリング中の状態表示に ID・キー・残り時間が含まれる
        // given (前提条件):
        let alice = ParticipantId::new("alice").unwrap();
        let bob = ParticipantId::new("bob").unwrap();
        let snapshot = SessionSnapshot {
            pairing_key: Some(PairingKey::derive(&alice, &bob).unwrap()),
            self_id: Some(alice),
            partner_id: Some(bob),
            timer: TimerState::default(),
            phase: Phase::Stopped,
            log_entries: Vec::new(),
        };

        // when (操作):
        let result = StatusFormatter::format_status(&snapshot);

        // then (期待する結果):
        assert!(result.contains("You: ALICE   Partner: BOB"));
        assert!(result.contains("Session: ALICE_BOB"));
        assert!(result.contains("Focus Time  25:00  [stopped]"));
    }

    #[test]
    fn test_format_log_empty() {
        // テスト項目: 記録が無い場合はその旨が表示される
        // given (前提条件):
        let records: Vec<SegmentLogRecord> = Vec::new();

        // when (操作):
        let result = StatusFormatter::format_log(&records);

        // then (期待する結果):
        assert!(result.contains("(No sessions yet)"));
    }

    #[test]
    fn test_format_log_entry() {
        // テスト項目: 記録の種別と分数が表示される
        // given (前提条件):
        let records = vec![SegmentLogRecord {
            id: "r1".to_string(),
            pairing_key: "ALICE_BOB".to_string(),
            recorded_at: 1688169600000,
            segment_kind: TimerMode::Focus,
            duration_minutes: 25,
        }];

        // when (操作):
        let result = StatusFormatter::format_log(&records);

        // then (期待する結果):
        assert!(result.contains("2023"));
        assert!(result.contains("Focus 25 min"));
    }

    #[test]
    fn test_format_destructive_notice() {
        // テスト項目: 破壊的な通知には ! が付く
        // given (前提条件):
        let notice = Notice::destructive("Not Connected", "Pair first.");

        // when (操作):
        let result = StatusFormatter::format_notice(&notice);

        // then (期待する結果):
        assert_eq!(result, "\n! Not Connected: Pair first.\n");
    }
}
