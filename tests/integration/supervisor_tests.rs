//! Execution supervisor integration tests: boot delay, autostart, fault
//! recovery with tiered backoff, fallback program and register control.

use devsmgr::app::events::ManagerEvent;
use devsmgr::app::ports::{ClientEvent, ProgramFault};
use devsmgr::config::ms;
use devsmgr::status::Status;
use devsmgr::supervisor::PANIC_REBOOT;

use crate::mock_device::{Device, valid_image};

fn running_device() -> Device {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(128), 64).unwrap();
    dev.advance(10);
    assert!(dev.mgr.is_running());
    dev.sink.clear();
    dev
}

#[test]
fn first_start_waits_for_boot_delay() {
    let mut dev = Device::new();
    dev.run_for(1490);
    assert!(!dev.mgr.is_running());
    dev.advance(10);
    assert!(dev.mgr.is_running());
}

#[test]
fn empty_flash_runs_fallback_program() {
    let mut dev = Device::new();
    dev.run_for(1500);
    assert_eq!(dev.mgr.status(), Status::Ready);
    assert_eq!(dev.mgr.supervisor().hooks().restarts, 0);
    assert_eq!(dev.sink.statuses(), vec![Status::Ready]);
}

#[test]
fn stored_program_runs_after_boot() {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(128), 64).unwrap();
    let mut dev = dev.reboot();
    dev.run_for(1500);
    assert!(dev.mgr.is_running());
    assert_eq!(dev.mgr.supervisor().hooks().restarts, 1);
    assert_eq!(dev.mgr.context().map(|c| c.image_len()), Some(128));
}

#[test]
fn interrupted_deploy_boots_into_fallback() {
    let mut dev = Device::new();
    let img = valid_image(256);
    dev.mgr.deploy_start(256, &mut dev.sink).unwrap();
    dev.mgr
        .deploy_chunk(&img[..128], dev.now, &mut dev.pipes, &mut dev.sink)
        .unwrap();

    // Power lost mid-upload: only the partial header reached flash.
    let mut dev = dev.reboot();
    assert!(dev.mgr.header().is_none());
    dev.run_for(1500);

    assert!(dev.mgr.is_running());
    assert_eq!(dev.mgr.status(), Status::Ready);
    assert_eq!(dev.mgr.supervisor().hooks().restarts, 0);
    assert_ne!(dev.mgr.context().map(|c| c.image_len()), Some(256));
}

#[test]
fn unverifiable_image_falls_back() {
    let mut dev = Device::new();
    // Committed, but without the bytecode magic.
    dev.stream_deploy(&[0u8; 64], 32).unwrap();
    dev.advance(10);
    assert_eq!(dev.mgr.status(), Status::Ready);
    assert_eq!(dev.mgr.supervisor().hooks().restarts, 0);
    assert_ne!(dev.mgr.context().map(|c| c.image_len()), Some(64));
}

#[test]
fn deploy_triggers_immediate_start() {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(64), 32).unwrap();
    assert!(!dev.mgr.is_running());
    dev.poll();
    assert!(dev.mgr.is_running(), "no 1.5 s wait after a deploy");
}

#[test]
fn panic_restarts_after_long_delay() {
    let mut dev = running_device();
    dev.mgr.context_mut().unwrap().inject_fault(13, 0x42);
    dev.advance(10);

    assert_eq!(dev.sink.panics(), vec![(13, 0x42)]);
    assert!(!dev.mgr.is_running());
    assert_eq!(dev.mgr.status(), Status::Sleeping);
    assert_eq!(dev.mgr.supervisor().hooks().panics, vec![13]);

    dev.run_for(4990);
    assert!(!dev.mgr.is_running());
    dev.advance(10);
    assert!(dev.mgr.is_running());
}

#[test]
fn reboot_request_restarts_quickly_with_code_zero() {
    let mut dev = running_device();
    dev.mgr.context_mut().unwrap().inject_fault(PANIC_REBOOT, 0x10);
    dev.advance(10);

    assert_eq!(dev.sink.panics(), vec![(0, 0x10)]);
    assert_eq!(dev.mgr.supervisor().hooks().panics, vec![PANIC_REBOOT]);

    dev.run_for(990);
    assert!(!dev.mgr.is_running());
    dev.advance(10);
    assert!(dev.mgr.is_running());
}

#[test]
fn panic_event_precedes_status_change() {
    let mut dev = running_device();
    dev.mgr.context_mut().unwrap().inject_fault(7, 1);
    dev.advance(10);
    assert_eq!(
        dev.sink.events,
        vec![
            ManagerEvent::ProgramPanic {
                panic_code: 7,
                program_counter: 1
            },
            ManagerEvent::StatusChanged(Status::Sleeping),
        ]
    );
}

#[test]
fn crashing_program_is_retried_every_five_seconds() {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(64), 32).unwrap();
    dev.mgr
        .supervisor_mut()
        .engine_mut()
        .fault_on_start(Some(ProgramFault { code: 99, pc: 0 }));

    dev.poll();
    assert_eq!(dev.sink.panics().len(), 1);
    dev.run_for(5000);
    assert_eq!(dev.sink.panics().len(), 2);
    dev.run_for(5000);
    assert_eq!(dev.sink.panics().len(), 3);
}

#[test]
fn autostart_off_leaves_program_stopped() {
    let mut dev = running_device();
    dev.mgr.supervisor_mut().set_autostart(false, dev.now);
    dev.mgr.context_mut().unwrap().inject_fault(13, 0);
    dev.run_for(20_000);
    assert!(!dev.mgr.is_running());

    dev.mgr.supervisor_mut().set_autostart(true, dev.now);
    dev.poll();
    assert!(dev.mgr.is_running(), "enabling autostart retries at once");
}

#[test]
fn running_register_starts_and_stops() {
    let mut dev = Device::new();
    dev.mgr.set_running(true, &mut dev.sink);
    assert_eq!(dev.mgr.status(), Status::Ready);
    dev.mgr.set_running(true, &mut dev.sink);
    assert_eq!(dev.mgr.supervisor().engine().contexts_created(), 1, "no-op when running");

    dev.mgr.set_running(false, &mut dev.sink);
    assert_eq!(dev.mgr.status(), Status::WaitingForInput);
    assert_eq!(
        dev.sink.statuses(),
        vec![Status::Ready, Status::WaitingForInput]
    );
}

#[test]
fn restart_request_uses_short_delay() {
    let mut dev = running_device();
    dev.mgr.restart(dev.now, &mut dev.sink);
    assert!(!dev.mgr.is_running());
    dev.run_for(40);
    assert!(!dev.mgr.is_running());
    dev.run_for(10);
    assert!(dev.mgr.is_running());
}

#[test]
fn logging_flag_follows_register() {
    let mut dev = Device::new();
    dev.mgr.supervisor_mut().set_logging(false);
    dev.run_for(1500);
    assert_eq!(dev.mgr.context().map(|c| c.logging()), Some(false));
    dev.mgr.supervisor_mut().set_logging(true);
    assert_eq!(dev.mgr.context().map(|c| c.logging()), Some(true));
}

#[test]
fn client_events_are_forwarded() {
    let mut dev = running_device();
    let mut payload = heapless::Vec::new();
    payload.extend_from_slice(&[1, 2, 3]).unwrap();
    dev.mgr.client_event(&ClientEvent { kind: 2, payload });
    assert_eq!(dev.mgr.context().unwrap().client_events()[0].kind, 2);
}

#[test]
fn schedule_survives_clock_wraparound() {
    let mut dev = Device::starting_at(u32::MAX - ms(1000));
    dev.run_for(1490);
    assert!(!dev.mgr.is_running());
    dev.advance(10);
    assert!(dev.mgr.is_running());
}
