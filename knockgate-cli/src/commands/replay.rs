//! Replay command orchestration.
//!
//! Feeds recorded frames through a classifier whose clock follows the
//! capture timestamps, so window decisions are reproducible.

use std::io::{BufRead, Write};
use std::net::Ipv4Addr;

use knockgate_clock::ManualClock;
use knockgate_core::{AuthStore, Classifier, Decision, Logger, StatsSnapshot};
use knockgate_schema::{FrameRecord, VerdictRecord};

use crate::cli::ReplayArgs;

use super::{CommandError, CommandResult};

/// Result of replay command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayResult {
    /// Classification counters at the end of the run.
    pub stats: StatsSnapshot,
    /// Authorization entries still held when the input ended.
    pub remaining_entries: usize,
}

/// Execute the replay command.
///
/// Reads one `FrameRecord` per line from `input` and writes one
/// `VerdictRecord` per frame to `output`. Blank lines are skipped; any
/// other unreadable line aborts the run.
pub fn execute_replay<R, W, L>(
    args: &ReplayArgs,
    input: R,
    output: &mut W,
    logger: L,
) -> CommandResult<ReplayResult>
where
    R: BufRead,
    W: Write,
    L: Logger,
{
    args.validate()?;

    let clock = ManualClock::default();
    let classifier = Classifier::from_config(args.gate.to_gate_config(), &clock, logger)?;

    let mut frames: u64 = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = index + 1;

        let record = FrameRecord::from_json(line).map_err(|source| CommandError::Replay {
            line: line_no,
            source,
        })?;
        let frame = record.frame_bytes().map_err(|source| CommandError::Replay {
            line: line_no,
            source,
        })?;

        clock.set(record.ts_ns);
        let decision = classifier.classify(&frame);
        writeln!(output, "{}", verdict_record(record.ts_ns, &decision).to_json())?;

        frames += 1;
        if let Some(every) = args.sweep_every {
            if frames % every == 0 {
                classifier.sweep();
            }
        }
    }
    output.flush()?;

    Ok(ReplayResult {
        stats: classifier.stats(),
        remaining_entries: classifier.store().len(),
    })
}

fn verdict_record(ts_ns: u64, decision: &Decision) -> VerdictRecord {
    VerdictRecord::new(
        ts_ns,
        decision.verdict.as_str(),
        decision.reason.as_str(),
        decision.source.map(|ip| Ipv4Addr::from(ip).to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{parse_from, Command};
    use knockgate_clock::NANOS_PER_SEC;
    use knockgate_core::{FrameBuilder, MockLogger, NullLogger, Verbosity};
    use knockgate_schema::SchemaError;
    use std::io::Cursor;

    const CLIENT: u32 = 0xC000_0207; // 192.0.2.7

    fn replay_args(extra: &[&str]) -> ReplayArgs {
        let mut argv = vec!["knockgate", "replay", "--in", "frames.jsonl"];
        argv.extend_from_slice(extra);
        match parse_from(argv).expect("parse").command {
            Command::Replay(args) => args,
            other => panic!("expected Replay, got {:?}", other),
        }
    }

    fn jsonl(records: &[(u64, Vec<u8>)]) -> String {
        records
            .iter()
            .map(|(ts, frame)| FrameRecord::new(*ts, frame).to_json() + "\n")
            .collect()
    }

    fn run(args: &ReplayArgs, input: &str) -> (CommandResult<ReplayResult>, Vec<VerdictRecord>) {
        let mut out = Vec::new();
        let result = execute_replay(args, Cursor::new(input.as_bytes()), &mut out, NullLogger);
        let verdicts = String::from_utf8(out)
            .expect("utf8")
            .lines()
            .map(|l| VerdictRecord::from_json(l).expect("verdict"))
            .collect();
        (result, verdicts)
    }

    // ===========================================
    // Happy path
    // ===========================================

    #[test]
    fn test_replay_knock_then_connect() {
        let input = jsonl(&[
            (0, FrameBuilder::tcp_syn(CLIENT, 22).build()),
            (NANOS_PER_SEC, FrameBuilder::tcp_syn(CLIENT, 0).build()),
            (30 * NANOS_PER_SEC, FrameBuilder::tcp_syn(CLIENT, 22).build()),
            (62 * NANOS_PER_SEC, FrameBuilder::tcp_syn(CLIENT, 22).build()),
        ]);
        let (result, verdicts) = run(&replay_args(&[]), &input);
        let result = result.expect("replay");

        let summary: Vec<_> = verdicts
            .iter()
            .map(|v| (v.verdict.as_str(), v.reason.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("DROP", "no_entry"),
                ("ACCEPT", "knock_recorded"),
                ("ACCEPT", "authorized"),
                ("DROP", "expired"),
            ]
        );
        assert_eq!(verdicts[0].source.as_deref(), Some("192.0.2.7"));
        assert_eq!(verdicts[2].ts_ns, 30 * NANOS_PER_SEC);

        assert_eq!(result.stats.frames, 4);
        assert_eq!(result.stats.dropped, 2);
        assert_eq!(result.remaining_entries, 0);
    }

    #[test]
    fn test_replay_magic_mode() {
        let input = jsonl(&[
            (0, FrameBuilder::udp(CLIENT, 0, &[1, 2, 3, 4]).build()),
            (1, FrameBuilder::tcp_syn(CLIENT, 22).build()),
            (2, FrameBuilder::udp(CLIENT, 0, &0xdeadbeef_u32.to_be_bytes()).build()),
            (3, FrameBuilder::tcp_syn(CLIENT, 22).build()),
        ]);
        let (result, verdicts) = run(&replay_args(&["--magic", "0xdeadbeef"]), &input);
        result.expect("replay");

        let reasons: Vec<_> = verdicts.iter().map(|v| v.reason.as_str()).collect();
        assert_eq!(reasons, vec!["not_gated", "no_entry", "knock_recorded", "authorized"]);
    }

    #[test]
    fn test_replay_malformed_frame_has_no_source() {
        let input = jsonl(&[(5, vec![0u8; 10])]);
        let (result, verdicts) = run(&replay_args(&[]), &input);
        assert_eq!(result.expect("replay").stats.malformed, 1);
        assert_eq!(verdicts[0].verdict, "DROP");
        assert_eq!(verdicts[0].reason, "malformed_header");
        assert_eq!(verdicts[0].source, None);
    }

    #[test]
    fn test_replay_skips_blank_lines() {
        let mut input = String::from("\n   \n");
        input.push_str(&jsonl(&[(0, FrameBuilder::tcp_syn(CLIENT, 80).build())]));
        input.push('\n');
        let (result, verdicts) = run(&replay_args(&[]), &input);
        assert_eq!(result.expect("replay").stats.frames, 1);
        assert_eq!(verdicts.len(), 1);
    }

    #[test]
    fn test_replay_empty_input() {
        let (result, verdicts) = run(&replay_args(&[]), "");
        assert_eq!(result.expect("replay").stats, StatsSnapshot::default());
        assert!(verdicts.is_empty());
    }

    // ===========================================
    // Sweep
    // ===========================================

    #[test]
    fn test_replay_sweep_every_removes_expired() {
        let other = CLIENT + 1;
        let input = jsonl(&[
            (0, FrameBuilder::tcp_syn(CLIENT, 0).build()),
            (100 * NANOS_PER_SEC, FrameBuilder::tcp_syn(other, 0).build()),
        ]);

        let (without, _) = run(&replay_args(&[]), &input);
        assert_eq!(without.expect("replay").remaining_entries, 2);

        let (with, _) = run(&replay_args(&["--sweep-every", "2"]), &input);
        let with = with.expect("replay");
        assert_eq!(with.remaining_entries, 1);
        assert_eq!(with.stats.swept, 1);
    }

    #[test]
    fn test_replay_rejects_zero_sweep_interval() {
        let (result, _) = run(&replay_args(&["--sweep-every", "0"]), "");
        assert!(matches!(result, Err(CommandError::InvalidArgument(_))));
    }

    // ===========================================
    // Errors
    // ===========================================

    #[test]
    fn test_replay_reports_bad_json_line() {
        let mut input = jsonl(&[(0, FrameBuilder::tcp_syn(CLIENT, 80).build())]);
        input.push_str("not json\n");
        let (result, verdicts) = run(&replay_args(&[]), &input);

        match result {
            Err(CommandError::Replay { line, source }) => {
                assert_eq!(line, 2);
                assert!(matches!(source, SchemaError::Json(_)));
            }
            other => panic!("expected replay error, got {:?}", other),
        }
        assert_eq!(verdicts.len(), 1);
    }

    #[test]
    fn test_replay_reports_bad_hex() {
        let input = "\n{\"version\":1,\"ts_ns\":0,\"frame\":\"xyz\"}\n";
        let (result, _) = run(&replay_args(&[]), input);
        assert!(matches!(
            result,
            Err(CommandError::Replay {
                line: 2,
                source: SchemaError::Hex(_)
            })
        ));
    }

    #[test]
    fn test_replay_reports_version_mismatch() {
        let input = "{\"version\":2,\"ts_ns\":0,\"frame\":\"\"}\n";
        let (result, _) = run(&replay_args(&[]), input);
        assert!(matches!(
            result,
            Err(CommandError::Replay {
                line: 1,
                source: SchemaError::VersionMismatch { .. }
            })
        ));
    }

    #[test]
    fn test_replay_rejects_invalid_gate() {
        let (result, _) = run(&replay_args(&["--expire-sec", "0"]), "");
        assert!(matches!(result, Err(CommandError::Config(_))));
    }

    // ===========================================
    // Tracing
    // ===========================================

    #[test]
    fn test_replay_traces_knock() {
        let logger = MockLogger::default();
        let input = jsonl(&[(0, FrameBuilder::tcp_syn(CLIENT, 0).build())]);
        let mut out = Vec::new();
        execute_replay(
            &replay_args(&[]),
            Cursor::new(input.into_bytes()),
            &mut out,
            logger.clone(),
        )
        .expect("replay");

        let knocks: Vec<_> = logger
            .entries()
            .into_iter()
            .filter(|e| e.level == Verbosity::Verbose)
            .collect();
        assert_eq!(knocks.len(), 1);
        assert!(knocks[0].message.contains("192.0.2.7"));
    }
}
