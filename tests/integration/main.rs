//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one subsystem of the
//! manager against the in-memory adapters.  Everything runs on the host.

mod deploy_tests;
mod mock_device;
mod readback_tests;
mod supervisor_tests;
