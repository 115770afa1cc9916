use crate::common::{options, running_session, stopped_session, ChannelControl, Machine};
use rdbctl::debugger::decode::DecodedView;
use rdbctl::debugger::register::Register;
use rdbctl::debugger::{Error, Magnitude, NavigationMove, SessionState, ViewKind};
use std::collections::BTreeSet;
use std::path::Path;

const PC: u32 = 0xFC0030;

fn memory_start(decoded: Option<&Result<DecodedView, rdbctl::debugger::DecodeError>>) -> u32 {
    match decoded {
        Some(Ok(DecodedView::Memory(buf))) => buf.start,
        other => panic!("unexpected memory view: {other:?}"),
    }
}

#[test]
fn test_refresh_request_order() {
    let (mut session, control, _) = stopped_session(Machine::new(PC));
    session.set_focus(ViewKind::Memory);

    session.request_refresh(NavigationMove::NONE).unwrap();

    let sent = control.take_sent();
    assert_eq!(sent.len(), 5);
    assert_eq!(sent[0], "status");
    assert!(sent[1].starts_with("echo sync-"));
    assert_eq!(sent[2], "registers");
    assert_eq!(sent[3], "memory $fc0030 $0000c0");
    assert!(sent[4].starts_with("echo sync-"));
    assert_ne!(sent[1], sent[4]);

    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(memory_start(session.get_last_decoded(ViewKind::Memory)), PC);
    assert!(matches!(
        session.get_last_decoded(ViewKind::Registers),
        Some(Ok(DecodedView::Registers(_)))
    ));
}

#[test]
fn test_refresh_with_noisy_reply() {
    let mut machine = Machine::new(PC);
    machine.noisy = true;
    let (mut session, _, _) = stopped_session(machine);
    session.set_active_views([ViewKind::Memory, ViewKind::Disassembly]);

    session.request_refresh(NavigationMove::NONE).unwrap();

    assert_eq!(memory_start(session.get_last_decoded(ViewKind::Memory)), PC);
    let Some(Ok(DecodedView::Disassembly(disasm))) =
        session.get_last_decoded(ViewKind::Disassembly)
    else {
        panic!("disassembly not decoded");
    };
    assert_eq!(disasm.address, PC);
    assert_eq!(disasm.lines.len(), 12);
    assert!(session.get_last_decoded(ViewKind::Registers).is_some());
}

#[test]
fn test_refresh_follows_pc() {
    let (mut session, _, _) = stopped_session(Machine::new(PC));
    assert_eq!(session.target().first, None);
    assert_eq!(session.address_entry(), None);

    session.request_refresh(NavigationMove::NONE).unwrap();
    assert_eq!(session.target().first, Some(PC));
    assert_eq!(session.address_entry().as_deref(), Some("FC0030"));
}

#[test]
fn test_missing_sync_keeps_state() {
    struct TestCase {
        break_channel: fn(&ChannelControl),
    }
    let test_cases = [
        TestCase {
            break_channel: |control| control.mute_sync(true),
        },
        TestCase {
            break_channel: |control| control.close_on_sync(),
        },
    ];

    for tc in test_cases {
        let (mut session, control, _) = stopped_session(Machine::new(PC));
        session.set_focus(ViewKind::Memory);
        session.request_refresh(NavigationMove::NONE).unwrap();
        let target = session.target();
        let window = session.get_current_window();

        (tc.break_channel)(&control);
        let err = session
            .request_refresh(NavigationMove::forward(Magnitude::Med))
            .unwrap_err();

        assert!(matches!(err, Error::ProtocolTimeout { .. }), "{err}");
        assert_eq!(session.target(), target);
        assert_eq!(session.get_current_window(), window);
        assert_eq!(memory_start(session.get_last_decoded(ViewKind::Memory)), PC);
        assert_eq!(session.state(), SessionState::Stopped);
    }
}

#[test]
fn test_refresh_requires_stopped_target() {
    let (mut session, control, _) = running_session(Machine::new(PC), options());

    let err = session.request_refresh(NavigationMove::NONE).unwrap_err();
    assert!(matches!(err, Error::NotStopped));
    assert!(control.take_sent().is_empty());
}

#[test]
fn test_step_ignored_while_running() {
    let (mut session, control, _) = running_session(Machine::new(PC), options());

    session.request_step(true).unwrap();
    session.request_step(false).unwrap();
    assert!(control.take_sent().is_empty());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_step_marks_changed_registers() {
    let (mut session, control, _) = stopped_session(Machine::new(PC));

    session.request_refresh(NavigationMove::NONE).unwrap();
    let Some(Ok(DecodedView::Registers(regs))) = session.get_last_decoded(ViewKind::Registers)
    else {
        panic!("registers not decoded");
    };
    assert!(regs.changed.is_empty());
    control.take_sent();

    session.request_step(true).unwrap();
    assert_eq!(control.take_sent()[0], "step");
    let Some(Ok(DecodedView::Registers(regs))) = session.get_last_decoded(ViewKind::Registers)
    else {
        panic!("registers not decoded");
    };
    assert_eq!(regs.changed, BTreeSet::from([Register::D0, Register::Pc]));
    assert_eq!(regs.registers.value(Register::Pc), Some(PC + 2));
    assert_eq!(session.target().first, Some(PC + 2));

    session.request_step(false).unwrap();
    assert_eq!(control.take_sent()[0], "next");
    assert_eq!(session.target().first, Some(PC + 4));
}

#[test]
fn test_disassembly_continuation() {
    let (mut session, control, _) = stopped_session(Machine::new(PC));
    session.set_focus(ViewKind::Disassembly);

    session.request_refresh(NavigationMove::NONE).unwrap();
    let target = session.target();
    assert_eq!(target.first, Some(PC));
    assert_eq!(target.second, Some(PC + 2));
    assert_eq!(target.last, Some(PC + 22));
    control.take_sent();

    session
        .request_refresh(NavigationMove::forward(Magnitude::Med))
        .unwrap();
    assert!(control
        .take_sent()
        .contains(&format!("disasm ${:06x} $000048", PC + 2)));

    session
        .request_refresh(NavigationMove::forward(Magnitude::Max))
        .unwrap();
    assert!(control
        .take_sent()
        .contains(&format!("disasm ${:06x} $000048", PC + 24)));
    assert_eq!(session.target().first, Some(PC + 24));
}

#[test]
fn test_move_applies_to_focused_view() {
    let (mut session, control, _) = stopped_session(Machine::new(PC));
    session.set_active_views([ViewKind::Memory, ViewKind::Disassembly]);
    session.set_focus(ViewKind::Memory);
    session.request_refresh(NavigationMove::NONE).unwrap();
    control.take_sent();

    session
        .request_refresh(NavigationMove::forward(Magnitude::Min))
        .unwrap();

    let sent = control.take_sent();
    assert!(sent.contains(&format!("memory ${:06x} $0000c0", PC + 2)));
    assert!(sent.contains(&format!("disasm ${PC:06x} $000048")));
    assert_eq!(session.target().first, Some(PC + 2));

    session
        .request_refresh(NavigationMove::backward(Magnitude::Min))
        .unwrap();
    assert_eq!(session.target().first, Some(PC));
}

#[test]
fn test_focus_change_forgets_continuation() {
    let (mut session, _, _) = stopped_session(Machine::new(PC));
    session.set_focus(ViewKind::Disassembly);
    session.request_refresh(NavigationMove::NONE).unwrap();
    assert!(session.target().last.is_some());

    session.set_focus(ViewKind::Memory);
    let target = session.target();
    assert_eq!(target.first, Some(PC));
    assert_eq!(target.second, None);
    assert_eq!(target.last, None);
    assert!(session.active_views().contains(&ViewKind::Disassembly));
}

#[test]
fn test_goto() {
    let (mut session, control, _) = stopped_session(Machine::new(PC));
    session.set_focus(ViewKind::Memory);

    session.request_goto(0x1000).unwrap();

    assert!(control
        .take_sent()
        .contains(&"memory $001000 $0000c0".to_string()));
    assert_eq!(memory_start(session.get_last_decoded(ViewKind::Memory)), 0x1000);
    assert_eq!(session.address_entry().as_deref(), Some("001000"));
    let window = session.get_current_window().unwrap();
    assert_eq!(window.first(), 0x1000);
    assert_eq!(window.last(), 0x10C0);
}

#[test]
fn test_goto_out_of_address_space() {
    let (mut session, control, _) = stopped_session(Machine::new(PC));
    session.request_refresh(NavigationMove::NONE).unwrap();
    control.take_sent();

    let err = session.request_goto(0x1234_5678).unwrap_err();
    assert!(matches!(err, Error::AddressOutOfRange(0x1234_5678)));
    assert!(!err.is_fatal());
    assert!(control.take_sent().is_empty());
    assert_eq!(session.target().first, Some(PC));
    assert_eq!(session.address_entry().as_deref(), Some("FC0030"));

    session.request_goto(0xFF_FFFF).unwrap();
    assert_eq!(session.target().first, Some(0xFF_FFFF));
}

#[test]
fn test_unanswered_step_keeps_target() {
    let mut machine = Machine::new(PC);
    machine.scripted.insert("step", vec![]);
    let (mut session, _, _) = stopped_session(machine);
    session.set_focus(ViewKind::Memory);
    session.request_refresh(NavigationMove::NONE).unwrap();
    let target = session.target();
    let window = session.get_current_window();
    assert!(window.is_some());

    let err = session.request_step(true).unwrap_err();
    assert!(matches!(err, Error::ProtocolTimeout { .. }));

    assert_eq!(session.target(), target);
    assert_eq!(session.get_current_window(), window);
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(session.is_stopped());
}

#[test]
fn test_malformed_block_does_not_hide_others() {
    let mut machine = Machine::new(PC);
    machine.scripted.insert(
        "registers",
        vec!["#registers D0:zz".to_string(), "##".to_string()],
    );
    let (mut session, _, _) = stopped_session(machine);
    session.set_active_views([ViewKind::Registers, ViewKind::Memory]);

    session.request_refresh(NavigationMove::NONE).unwrap();

    assert!(matches!(
        session.get_last_decoded(ViewKind::Registers),
        Some(Err(_))
    ));
    assert_eq!(memory_start(session.get_last_decoded(ViewKind::Memory)), PC);
    assert_eq!(session.target().first, Some(PC));
}

#[test]
fn test_resume_clears_target() {
    struct TestCase {
        follow_pc: bool,
        expected_first: Option<u32>,
    }
    let test_cases = [
        TestCase {
            follow_pc: true,
            expected_first: None,
        },
        TestCase {
            follow_pc: false,
            expected_first: Some(PC),
        },
    ];

    for tc in test_cases {
        let (mut session, control, _) = stopped_session(Machine::new(PC));
        session.set_follow_pc(tc.follow_pc);
        session.set_focus(ViewKind::Disassembly);
        session.request_refresh(NavigationMove::NONE).unwrap();
        control.take_sent();

        session.request_pause_or_resume().unwrap();

        assert_eq!(control.take_sent(), vec!["continue".to_string()]);
        assert!(!session.is_stopped());
        assert_eq!(session.state(), SessionState::Running);
        let target = session.target();
        assert_eq!(target.first, tc.expected_first);
        assert_eq!(target.second, None);
        assert_eq!(target.last, None);
        assert_eq!(session.get_current_window(), None);
    }
}

#[test]
fn test_raw_and_memory_file_commands() {
    let (mut session, control, _) = stopped_session(Machine::new(PC));

    let reply = session.request_raw_command("info video").unwrap();
    assert_eq!(reply, vec!["unknown command: info video".to_string()]);

    let reply = session
        .request_load_memory(Path::new("/tmp/patch.bin"), 0x10000)
        .unwrap();
    assert_eq!(reply, vec!["load: OK".to_string()]);

    let reply = session
        .request_save_memory(Path::new("/tmp/dump.bin"), 0x10000, 0x400)
        .unwrap();
    assert_eq!(reply, vec!["save: OK".to_string()]);

    let sent = control
        .take_sent()
        .into_iter()
        .filter(|line| !line.starts_with("echo "))
        .collect::<Vec<_>>();
    assert_eq!(
        sent,
        vec![
            "info video".to_string(),
            "load /tmp/patch.bin $010000".to_string(),
            "save /tmp/dump.bin $010000 $000400".to_string(),
        ]
    );
}

#[test]
fn test_lines_option() {
    let (mut session, control, _) = stopped_session(Machine::new(PC));
    session.set_focus(ViewKind::Memory);
    session.set_lines(5);

    session.request_refresh(NavigationMove::NONE).unwrap();
    assert!(control
        .take_sent()
        .contains(&format!("memory ${PC:06x} $000050")));
}
