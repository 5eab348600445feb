//! Readback integration tests: the stored image streamed back out over the
//! outbound pipe, one payload per poll.

use devsmgr::app::ports::PipeTarget;
use devsmgr::error::PipeError;
use devsmgr::rpc::packet::MAX_PAYLOAD;

use crate::mock_device::{Device, valid_image};

const PEER: PipeTarget = PipeTarget {
    device_id: 0xdead_beef_0000_0001,
    port: 3,
};

fn drain(dev: &mut Device) {
    for _ in 0..1000 {
        if !dev.mgr.is_reading() {
            return;
        }
        dev.advance(1);
    }
    panic!("readback never finished");
}

#[test]
fn readback_returns_deployed_image() {
    let mut dev = Device::new();
    let img = valid_image(1024);
    dev.stream_deploy(&img, 128).unwrap();

    dev.mgr.read_program(PEER, &mut dev.pipes);
    assert_eq!(dev.pipes.outbound_target(), Some(PEER));
    drain(&mut dev);

    assert_eq!(dev.pipes.received(), img);
    assert!(dev.pipes.sent().iter().all(|p| p.len() <= MAX_PAYLOAD));
    assert_eq!(dev.pipes.outbound_closes(), 1);
}

#[test]
fn readback_with_no_program_sends_nothing() {
    let mut dev = Device::new();
    dev.mgr.read_program(PEER, &mut dev.pipes);
    dev.poll();
    assert!(!dev.mgr.is_reading());
    assert!(dev.pipes.sent().is_empty());
    assert_eq!(dev.pipes.outbound_closes(), 1);
}

#[test]
fn backpressure_delays_but_loses_nothing() {
    let mut dev = Device::new();
    let img = valid_image(512);
    dev.stream_deploy(&img, 128).unwrap();

    dev.pipes.push_back(5);
    dev.mgr.read_program(PEER, &mut dev.pipes);
    drain(&mut dev);
    assert_eq!(dev.pipes.received(), img);
}

#[test]
fn broken_pipe_ends_session() {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(512), 128).unwrap();

    dev.mgr.read_program(PEER, &mut dev.pipes);
    dev.poll();
    dev.pipes.fail_writes(Some(PipeError::Closed));
    dev.poll();
    assert!(!dev.mgr.is_reading());
    assert_eq!(dev.pipes.sent().len(), 1);
}

#[test]
fn redeploy_during_readback_cuts_it_short() {
    let mut dev = Device::new();
    dev.stream_deploy(&valid_image(1024), 128).unwrap();

    dev.mgr.read_program(PEER, &mut dev.pipes);
    dev.poll();
    dev.mgr
        .start_deploy(64, &mut dev.pipes, &mut dev.sink)
        .unwrap();
    dev.poll();
    assert!(!dev.mgr.is_reading(), "no valid header, nothing left to read");
}

#[test]
fn second_request_restarts_from_zero() {
    let mut dev = Device::new();
    let img = valid_image(1024);
    dev.stream_deploy(&img, 128).unwrap();

    dev.mgr.read_program(PEER, &mut dev.pipes);
    dev.poll();
    dev.poll();
    dev.mgr.read_program(PEER, &mut dev.pipes);
    assert_eq!(dev.pipes.outbound_closes(), 1, "previous pipe closed first");
    drain(&mut dev);

    let sent = dev.pipes.received();
    assert_eq!(&sent[sent.len() - img.len()..], &img[..]);
}
