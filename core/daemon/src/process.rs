//! Process inspection helpers.

use sysinfo::{Pid, ProcessRefreshKind, System};

pub fn is_alive(pid: u32) -> bool {
    let mut sys = System::new();
    let sys_pid = Pid::from(pid as usize);
    sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new())
        && sys.process(sys_pid).is_some()
}
