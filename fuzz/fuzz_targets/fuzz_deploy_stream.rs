//! Fuzz target: the program store's deploy protocol
//!
//! Interprets the input as a script of start / write / finalize steps with
//! arbitrary sizes.  Whatever the sequence, the store must not panic, and
//! a committed header must always describe an image whose hash matches.
//!
//! cargo fuzz run fuzz_deploy_stream

#![no_main]

use devsmgr::adapters::sim_flash::SimFlash;
use devsmgr::program::fnv1a32;
use devsmgr::program::store::ProgramStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut store = ProgramStore::new(SimFlash::new(4096, 512));
    let mut ops = data.chunks(3);

    while let Some(op) = ops.next() {
        let [kind, a, b] = match *op {
            [k, a, b] => [k, a, b],
            _ => break,
        };
        let arg = u16::from_le_bytes([a, b]) as usize;
        match kind % 3 {
            0 => {
                let _ = store.deploy_start(arg as u32);
            }
            1 => {
                let fill = vec![kind; arg % 600];
                let _ = store.deploy_write(&fill);
            }
            _ => {
                let _ = store.deploy_finalize();
            }
        }

        if let Some(hd) = store.header() {
            let image = store.image().expect("committed header has an image");
            assert_eq!(hd.hash, fnv1a32(image));
            assert!(!store.is_deploying());
        }
    }
});
