//! Deploy protocol integration tests: streamed upload through the manager,
//! flash layout, session aborts and persistence across reboots.

use devsmgr::adapters::sim_flash::SimFlash;
use devsmgr::app::events::ManagerEvent;
use devsmgr::app::ports::FlashPort;
use devsmgr::error::{DeployError, FlashError};
use devsmgr::program::{HEADER_SIZE, MAGIC0, MAGIC1, fnv1a32, sha256};
use devsmgr::status::Status;

use crate::mock_device::{Device, PAGE, REGION, valid_image};

#[test]
fn streamed_deploy_commits_header_and_image() {
    let mut dev = Device::new();
    let img = valid_image(512);

    let hash = dev.stream_deploy(&img, 128).expect("deploy should commit");

    assert_eq!(hash, fnv1a32(&img));
    let hd = dev.mgr.header().unwrap();
    assert_eq!(hd.size, 512);
    assert_eq!(hd.hash, hash);
    assert_eq!(dev.mgr.store().image().unwrap(), &img[..]);
    assert_eq!(dev.mgr.store().sha256(), sha256(&img));
    assert_eq!(dev.mgr.status(), Status::Sleeping);
}

#[test]
fn header_bytes_are_laid_out_little_endian() {
    let mut dev = Device::new();
    let img = valid_image(64);
    let hash = dev.stream_deploy(&img, 32).unwrap();

    let raw = &dev.mgr.store().flash().contents()[..HEADER_SIZE];
    assert_eq!(&raw[0..4], &MAGIC0.to_le_bytes());
    assert_eq!(&raw[4..8], &64u32.to_le_bytes());
    assert_eq!(&raw[8..12], &MAGIC1.to_le_bytes());
    assert_eq!(&raw[12..16], &hash.to_le_bytes());
    assert!(raw[16..].iter().all(|&b| b == 0), "reserved words are zeroed");
}

#[test]
fn deploy_emits_change_and_status_events() {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(96), 32).unwrap();
    assert_eq!(
        dev.sink.events,
        vec![
            ManagerEvent::StatusChanged(Status::WaitingForInput),
            ManagerEvent::ProgramChanged,
            ManagerEvent::StatusChanged(Status::Sleeping),
        ]
    );
}

#[test]
fn misaligned_chunk_forces_fresh_start() {
    let mut dev = Device::new();
    let img = valid_image(256);
    dev.mgr
        .start_deploy(256, &mut dev.pipes, &mut dev.sink)
        .unwrap();

    let r = dev.mgr.deploy_chunk(&img[..48], dev.now, &mut dev.pipes, &mut dev.sink);
    assert_eq!(r, Err(DeployError::Misaligned));
    assert_eq!(dev.pipes.inbound_closes(), 1, "device closes the pipe");
    assert!(!dev.mgr.is_deploying());

    // Later chunks are refused until a new deploy starts.
    let r = dev.mgr.deploy_chunk(&img[..32], dev.now, &mut dev.pipes, &mut dev.sink);
    assert_eq!(r, Err(DeployError::NoSession));
    assert!(dev.mgr.header().is_none());
    assert_eq!(dev.sink.changes(), 0);

    assert!(dev.stream_deploy(&img, 64).is_some());
}

#[test]
fn early_close_leaves_no_program() {
    let mut dev = Device::new();
    let img = valid_image(256);
    dev.mgr
        .start_deploy(256, &mut dev.pipes, &mut dev.sink)
        .unwrap();
    dev.mgr
        .deploy_chunk(&img[..128], dev.now, &mut dev.pipes, &mut dev.sink)
        .unwrap();

    dev.pipes.peer_closes_inbound();
    assert_eq!(
        dev.mgr.deploy_closed(dev.now, &mut dev.sink),
        Err(DeployError::Incomplete { missing: 128 })
    );
    assert!(dev.mgr.header().is_none());
    assert_eq!(dev.sink.changes(), 0);
    assert_eq!(dev.mgr.status(), Status::WaitingForInput);
}

#[test]
fn invalid_size_is_ignored() {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(64), 32).unwrap();

    assert!(dev.mgr.start_deploy(33, &mut dev.pipes, &mut dev.sink).is_none());
    assert!(
        dev.mgr
            .start_deploy(REGION - HEADER_SIZE as u32, &mut dev.pipes, &mut dev.sink)
            .is_none()
    );
    assert!(dev.pipes.inbound_port().is_none());
    assert_eq!(dev.mgr.header().map(|h| h.size), Some(64), "old program untouched");
}

#[test]
fn zero_size_clears_program() {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(64), 32).unwrap();

    let port = dev.mgr.start_deploy(0, &mut dev.pipes, &mut dev.sink);
    assert!(port.is_some(), "the pipe still opens for a clear");
    assert!(dev.mgr.header().is_none());
    assert_eq!(dev.mgr.status(), Status::WaitingForInput);

    dev.pipes.peer_closes_inbound();
    assert_eq!(
        dev.mgr.deploy_closed(dev.now, &mut dev.sink),
        Err(DeployError::NoSession)
    );
}

#[test]
fn image_spanning_several_pages() {
    let mut dev = Device::new();
    let img = valid_image(3 * 1024);
    dev.stream_deploy(&img, 224).unwrap();
    assert_eq!(dev.mgr.store().image().unwrap(), &img[..]);
}

#[test]
fn program_survives_reboot() {
    let mut dev = Device::new();
    let img = valid_image(128);
    let hash = dev.stream_deploy(&img, 64).unwrap();

    let dev = dev.reboot();
    assert_eq!(dev.mgr.header().map(|h| h.hash), Some(hash));
    assert_eq!(dev.mgr.status(), Status::Sleeping);
}

#[test]
fn interrupted_deploy_does_not_survive_reboot() {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(128), 64).unwrap();

    let img = valid_image(256);
    dev.mgr
        .start_deploy(256, &mut dev.pipes, &mut dev.sink)
        .unwrap();
    dev.mgr
        .deploy_chunk(&img[..64], dev.now, &mut dev.pipes, &mut dev.sink)
        .unwrap();

    let dev = dev.reboot();
    assert!(dev.mgr.header().is_none(), "neither old nor partial program");
    assert!(!dev.mgr.is_deploying());
}

#[test]
fn new_deploy_replaces_open_pipe() {
    let mut dev = Device::new();
    let a = dev.mgr.start_deploy(64, &mut dev.pipes, &mut dev.sink).unwrap();
    let b = dev.mgr.start_deploy(64, &mut dev.pipes, &mut dev.sink).unwrap();
    assert_ne!(a, b);
    assert_eq!(dev.pipes.inbound_closes(), 1);
    assert_eq!(dev.pipes.inbound_port(), Some(b));
}

#[test]
fn flash_failure_surfaces_as_deploy_error() {
    let mut flash = SimFlash::new(REGION, PAGE);
    flash.fail_writes(true);
    let mut dev = Device::with_flash(flash, 0);

    assert_eq!(
        dev.mgr.deploy_start(64, &mut dev.sink),
        Err(DeployError::Flash(FlashError::EraseFailed))
    );
    assert!(dev.mgr.start_deploy(64, &mut dev.pipes, &mut dev.sink).is_none());
    assert!(!dev.mgr.is_deploying());
    assert!(dev.pipes.inbound_port().is_none());
}
