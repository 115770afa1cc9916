use crate::common::{options, running_session, wait_until, Machine};
use rdbctl::debugger::{NavigationMove, SessionState};
use serial_test::serial;
use std::thread;
use std::time::Duration;

const PC: u32 = 0x1000;
const WAIT: Duration = Duration::from_secs(2);

#[test]
#[serial]
fn test_pause_stops_once() {
    let (mut session, control, info) = running_session(Machine::new(PC), options());

    session.request_pause_or_resume().unwrap();
    assert_eq!(control.take_sent(), vec!["break".to_string()]);

    assert!(wait_until(WAIT, || info.stop_count() == 1));
    assert!(wait_until(WAIT, || !session.shared_target().watcher_active()));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(info.stop_count(), 1);
    assert!(session.is_stopped());
    assert_eq!(session.state(), SessionState::Stopped);

    session.request_refresh(NavigationMove::NONE).unwrap();
    assert_eq!(session.target().first, Some(PC));
}

#[test]
#[serial]
fn test_legacy_stop_marker() {
    let mut machine = Machine::new(PC);
    machine.stop_on_break = false;
    let (mut session, control, info) = running_session(machine, options());

    session.request_pause_or_resume().unwrap();
    assert_eq!(session.state(), SessionState::AwaitingReply);
    thread::sleep(Duration::from_millis(30));
    assert!(!session.is_stopped());

    control.push(&["#break"]);
    assert!(wait_until(WAIT, || info.stop_count() == 1));
    assert!(session.is_stopped());
}

#[test]
#[serial]
fn test_stop_marker_inside_block_ignored() {
    let mut machine = Machine::new(PC);
    machine.stop_on_break = false;
    let (mut session, control, info) = running_session(machine, options());

    session.request_pause_or_resume().unwrap();
    control.push(&["#trace on", "!break", "##"]);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(info.stop_count(), 0);
    assert!(session.shared_target().watcher_active());

    control.push(&["!break"]);
    assert!(wait_until(WAIT, || info.stop_count() == 1));
}

#[test]
#[serial]
fn test_stop_observed_by_concurrent_request() {
    let mut machine = Machine::new(PC);
    machine.stop_on_break = false;
    let (mut session, control, info) = running_session(machine, options());

    session.request_pause_or_resume().unwrap();
    assert!(session.shared_target().watcher_active());

    // stop notification arrives inside the reply of a synchronous request
    control.push(&["!break"]);
    let reply = session.request_raw_command("info cpu").unwrap();
    assert!(reply.contains(&"unknown command: info cpu".to_string()));

    assert!(wait_until(WAIT, || !session.shared_target().watcher_active()));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(info.stop_count(), 1);
    assert!(session.is_stopped());
}

#[test]
#[serial]
fn test_resume_and_pause_again() {
    let (mut session, control, info) = running_session(Machine::new(PC), options());

    session.request_pause_or_resume().unwrap();
    assert!(wait_until(WAIT, || info.stop_count() == 1));
    assert!(wait_until(WAIT, || !session.shared_target().watcher_active()));

    session.request_pause_or_resume().unwrap();
    assert!(!session.is_stopped());
    assert_eq!(session.state(), SessionState::Running);

    session.request_pause_or_resume().unwrap();
    assert!(wait_until(WAIT, || info.stop_count() == 2));

    let sent = control.take_sent();
    assert_eq!(
        sent,
        vec![
            "break".to_string(),
            "continue".to_string(),
            "break".to_string()
        ]
    );
}

#[test]
#[serial]
fn test_watcher_reports_closed_channel() {
    let mut machine = Machine::new(PC);
    machine.stop_on_break = false;
    let (mut session, control, info) = running_session(machine, options());

    session.request_pause_or_resume().unwrap();
    control.close();

    assert!(wait_until(WAIT, || !info.errors().is_empty()));
    assert!(info.errors()[0].contains("closed"));
    assert!(wait_until(WAIT, || !session.shared_target().watcher_active()));
    assert_eq!(info.stop_count(), 0);
    assert!(!session.is_stopped());
}
