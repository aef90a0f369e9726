use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use minorfi_core::common::{ThreadId, Tick};
use minorfi_core::core::pipeline::traits::CpuContext;
use mockall::mock;

mock! {
    pub Cpu {}
    impl CpuContext for Cpu {
        fn cur_tick(&self) -> Tick;
        fn num_threads(&self) -> ThreadId;
        fn signal_drain_done(&mut self);
        fn inject_fault_reg(&mut self);
    }
}

/// Mock whose `cur_tick` follows `clock` and whose hooks accept any calls.
///
/// `signal_drain_done` is left without expectations; set one per test.
pub fn clocked_cpu(clock: &Arc<AtomicU64>, threads: ThreadId) -> MockCpu {
    let mut cpu = MockCpu::new();
    let clock = Arc::clone(clock);
    cpu.expect_cur_tick()
        .returning(move || clock.load(Ordering::SeqCst));
    cpu.expect_num_threads().return_const(threads);
    cpu.expect_inject_fault_reg().return_const(());
    cpu
}
