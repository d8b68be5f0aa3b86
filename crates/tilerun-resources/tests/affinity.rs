//! Affinity changes observed from a forked child

use tilerun_resources::affinity::{self, AffinityTable};

/// Pinning to a single CPU and restoring the saved mask round-trips the
/// calling thread's affinity.
#[test]
fn pin_then_restore_floating_mask() {
    unsafe {
        let pid = libc::fork();
        assert!(pid >= 0, "fork failed");

        if pid == 0 {
            let Ok(floating) = affinity::current() else {
                libc::_exit(99);
            };
            let cpus = affinity::cpus_in(&floating);
            let Some(&first) = cpus.first() else {
                libc::_exit(98);
            };

            let table = AffinityTable::parse(&first.to_string()).unwrap_or_default();
            let Ok(mask) = table.mask_for(0, &floating) else {
                libc::_exit(1);
            };
            if affinity::apply(&mask).is_err() {
                libc::_exit(2);
            }
            match affinity::current() {
                Ok(now) if affinity::cpus_in(&now) == vec![first] => {}
                _ => libc::_exit(3),
            }

            if affinity::apply(&floating).is_err() {
                libc::_exit(4);
            }
            match affinity::current() {
                Ok(now) if affinity::cpus_in(&now) == cpus => libc::_exit(0),
                _ => libc::_exit(5),
            }
        } else {
            let mut status: i32 = 0;
            libc::waitpid(pid, &mut status, 0);
            assert!(libc::WIFEXITED(status));
            assert_eq!(libc::WEXITSTATUS(status), 0);
        }
    }
}
