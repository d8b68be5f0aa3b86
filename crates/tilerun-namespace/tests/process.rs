//! Spawning and reaping real children
//!
//! Every test runs its group inside a forked child so stray members can
//! never outlive the test process.

use nix::sys::signal::Signal;
use std::sync::Mutex;
use std::time::Duration;
use tilerun_namespace::{Isolation, ProcessNamespace, Termination};

static PROCESS_TEST_LOCK: Mutex<()> = Mutex::new(());

/// Run `body` in a forked child and return its exit code.
fn in_child(body: fn() -> i32) -> i32 {
    unsafe {
        let pid = libc::fork();
        assert!(pid >= 0, "fork failed: {}", std::io::Error::last_os_error());
        if pid == 0 {
            libc::_exit(body());
        }
        let mut status = 0;
        assert_eq!(libc::waitpid(pid, &mut status, 0), pid);
        assert!(libc::WIFEXITED(status), "status=0x{:x}", status);
        libc::WEXITSTATUS(status)
    }
}

#[test]
fn wait_any_reports_exit_code_and_ordinal() {
    let _lock = PROCESS_TEST_LOCK.lock();
    let code = in_child(|| {
        let mut ns = ProcessNamespace::new(Isolation::ProcessGroup);
        let sleeper = ns.spawn("sleeper", || {
            std::thread::sleep(Duration::from_secs(30));
            0
        });
        let quitter = ns.spawn("quitter", || unsafe { libc::_exit(37) });
        let (Ok(_), Ok(quitter)) = (sleeper, quitter) else {
            return 90;
        };

        let Ok((pid, termination)) = ns.wait_any() else {
            return 91;
        };
        ns.kill_all(Signal::SIGKILL);

        match ns.find(pid) {
            Some((1, child)) if pid == quitter && child.name == "quitter" => {
                termination.group_exit_code()
            }
            _ => 92,
        }
    });
    assert_eq!(code, 37);
}

#[test]
fn kill_all_terminates_process_group_members() {
    let _lock = PROCESS_TEST_LOCK.lock();
    let code = in_child(|| {
        let mut ns = ProcessNamespace::new(Isolation::ProcessGroup);
        let Ok(pid) = ns.spawn("sleeper", || {
            std::thread::sleep(Duration::from_secs(30));
            0
        }) else {
            return 90;
        };

        ns.kill_all(Signal::SIGKILL);
        match ns.wait_for(pid) {
            Ok(Termination::Signaled(9)) => 0,
            _ => 1,
        }
    });
    assert_eq!(code, 0);
}

#[test]
fn returning_entry_becomes_exit_status() {
    let _lock = PROCESS_TEST_LOCK.lock();
    let code = in_child(|| {
        let mut ns = ProcessNamespace::new(Isolation::ProcessGroup);
        let Ok(pid) = ns.spawn("returner", || 5) else {
            return 90;
        };
        match ns.wait_for(pid) {
            Ok(Termination::Exited(5)) => 0,
            _ => 1,
        }
    });
    assert_eq!(code, 0);
}

/// Needs CAP_SYS_ADMIN: run with `sudo cargo test -- --ignored`
#[test]
#[ignore]
fn pid_namespace_child_is_init() {
    let _lock = PROCESS_TEST_LOCK.lock();
    let code = in_child(|| {
        let mut ns = ProcessNamespace::new(Isolation::PidNamespace);
        let Ok(pid) = ns.spawn("init", || if std::process::id() == 1 { 0 } else { 3 }) else {
            return 90;
        };
        match ns.wait_for(pid) {
            Ok(Termination::Exited(0)) => 0,
            _ => 1,
        }
    });
    assert_eq!(code, 0);
}
