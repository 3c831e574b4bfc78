/// The kill-then-truncate action run once when the watched file shows activity.
///
/// Both steps are best effort. A process that refuses to die or a file that
/// stays locked never surfaces as an error; the responder always returns after
/// attempting the kill step and then the truncate step, in that order.
use std::ffi::OsStr;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::config::Policy;
use crate::target::{ProcessSelector, WatchTarget};

/// Windows `ERROR_SHARING_VIOLATION`.
const ERROR_SHARING_VIOLATION: i32 = 32;
/// Windows `ERROR_LOCK_VIOLATION`.
const ERROR_LOCK_VIOLATION: i32 = 33;

// ── Process table ─────────────────────────────────────────────────────────────

/// Enumeration and forceful termination of running processes.
pub trait ProcessTable {
    /// PIDs of every running process whose name equals `name` exactly.
    fn find(&mut self, name: &str) -> Vec<u32>;
    /// Kills `pid` immediately. Returns `false` if the process could not be killed.
    fn kill(&mut self, pid: u32) -> bool;
}

/// The OS process table, read through `sysinfo`.
pub struct SysinfoTable {
    sys: System,
}

impl SysinfoTable {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SysinfoTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SysinfoTable {
    fn find(&mut self, name: &str) -> Vec<u32> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);
        let target = OsStr::new(name);
        let mut pids: Vec<u32> = self
            .sys
            .processes()
            .iter()
            .filter(|(_, p)| p.name() == target)
            .map(|(pid, _)| pid.as_u32())
            .collect();
        pids.sort_unstable();
        pids
    }

    fn kill(&mut self, pid: u32) -> bool {
        self.sys
            .process(Pid::from_u32(pid))
            .map(|p| p.kill())
            .unwrap_or(false)
    }
}

/// Kills every process named `selector`. Returns how many kills succeeded.
///
/// A failed kill does not stop the remaining ones.
pub fn kill_matching(table: &mut impl ProcessTable, selector: &ProcessSelector) -> usize {
    let mut killed = 0;
    for pid in table.find(selector.name()) {
        if table.kill(pid) {
            println!("[kill] Terminated {} (PID: {pid})", selector.name());
            killed += 1;
        }
    }
    killed
}

// ── Truncation ────────────────────────────────────────────────────────────────

/// Discards a file's content.
pub trait Truncate {
    fn truncate(&mut self, path: &Path) -> io::Result<()>;
}

/// Truncates on the real file system, keeping the file in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsTruncate;

impl Truncate for FsTruncate {
    fn truncate(&mut self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(0)
    }
}

/// How the truncate step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateOutcome {
    Truncated { attempts: u32 },
    GaveUp { attempts: u32 },
}

/// True for errors meaning "someone else still holds the file".
fn is_locked(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    cfg!(windows)
        && matches!(
            err.raw_os_error(),
            Some(ERROR_SHARING_VIOLATION | ERROR_LOCK_VIOLATION)
        )
}

/// Truncates `path`, retrying while it is locked.
///
/// At most `policy.truncate_attempts` attempts, `policy.truncate_retry_delay`
/// apart. Any other error ends the loop at once. Never returns an error.
pub fn truncate_with_retry(
    truncator: &mut impl Truncate,
    path: &Path,
    policy: &Policy,
) -> TruncateOutcome {
    let mut attempts = 0;
    while attempts < policy.truncate_attempts {
        attempts += 1;
        match truncator.truncate(path) {
            Ok(()) => {
                println!("[truncate] The file is corrupted: {}.", path.display());
                return TruncateOutcome::Truncated { attempts };
            }
            Err(e) if is_locked(&e) => {
                if attempts < policy.truncate_attempts {
                    std::thread::sleep(policy.truncate_retry_delay);
                }
            }
            Err(_) => break,
        }
    }
    TruncateOutcome::GaveUp { attempts }
}

// ── Responder ─────────────────────────────────────────────────────────────────

/// What one responder run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub killed: usize,
    pub truncate: TruncateOutcome,
}

/// Bundles the two OS collaborators with the retry policy.
pub struct Responder<P, T> {
    table: P,
    truncator: T,
    policy: Policy,
}

impl Responder<SysinfoTable, FsTruncate> {
    /// Responder wired to the real process table and file system.
    pub fn system(policy: Policy) -> Self {
        Self::new(SysinfoTable::new(), FsTruncate, policy)
    }
}

impl<P: ProcessTable, T: Truncate> Responder<P, T> {
    pub fn new(table: P, truncator: T, policy: Policy) -> Self {
        Self { table, truncator, policy }
    }

    /// Kills every process matching `selector`, then truncates the target file.
    pub fn respond(&mut self, selector: &ProcessSelector, target: &WatchTarget) -> Report {
        let killed = kill_matching(&mut self.table, selector);
        let truncate = truncate_with_retry(&mut self.truncator, &target.path(), &self.policy);
        Report { killed, truncate }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    pub(crate) type Log = Rc<RefCell<Vec<String>>>;

    /// Process table with a fixed set of processes; records every call.
    pub(crate) struct FakeTable {
        pub processes: Vec<(u32, &'static str)>,
        pub unkillable: HashSet<u32>,
        pub log: Log,
    }

    impl FakeTable {
        pub fn new(processes: Vec<(u32, &'static str)>, log: Log) -> Self {
            Self { processes, unkillable: HashSet::new(), log }
        }
    }

    impl ProcessTable for FakeTable {
        fn find(&mut self, name: &str) -> Vec<u32> {
            self.log.borrow_mut().push(format!("find {name}"));
            self.processes
                .iter()
                .filter(|(_, n)| *n == name)
                .map(|(pid, _)| *pid)
                .collect()
        }

        fn kill(&mut self, pid: u32) -> bool {
            self.log.borrow_mut().push(format!("kill {pid}"));
            !self.unkillable.contains(&pid)
        }
    }

    /// Truncator that reports "locked" for its first `locked_for` calls.
    pub(crate) struct FlakyTruncate {
        pub locked_for: u32,
        pub calls: u32,
        pub log: Log,
    }

    impl FlakyTruncate {
        pub fn new(locked_for: u32, log: Log) -> Self {
            Self { locked_for, calls: 0, log }
        }
    }

    impl Truncate for FlakyTruncate {
        fn truncate(&mut self, path: &Path) -> io::Result<()> {
            self.calls += 1;
            self.log.borrow_mut().push(format!("truncate {}", path.display()));
            if self.calls <= self.locked_for {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            } else {
                Ok(())
            }
        }
    }

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn target() -> WatchTarget {
        WatchTarget::from_path(Path::new("/data/info.dat")).unwrap()
    }

    // ── kill_matching ─────────────────────────────────────────────────────────

    #[test]
    fn kill_with_no_match_issues_no_kills() {
        let log = log();
        let mut table = FakeTable::new(vec![(10, "bash"), (11, "sshd")], log.clone());
        let killed = kill_matching(&mut table, &ProcessSelector::new("writer"));
        assert_eq!(killed, 0);
        assert_eq!(*log.borrow(), vec!["find writer"]);
    }

    #[test]
    fn kill_hits_every_match_once() {
        let log = log();
        let mut table = FakeTable::new(
            vec![(10, "writer"), (11, "bash"), (12, "writer"), (13, "writer")],
            log.clone(),
        );
        let killed = kill_matching(&mut table, &ProcessSelector::new("writer"));
        assert_eq!(killed, 3);
        assert_eq!(*log.borrow(), vec!["find writer", "kill 10", "kill 12", "kill 13"]);
    }

    #[test]
    fn failed_kill_does_not_stop_the_rest() {
        let log = log();
        let mut table = FakeTable::new(vec![(1, "w"), (2, "w"), (3, "w")], log.clone());
        table.unkillable.insert(1);
        let killed = kill_matching(&mut table, &ProcessSelector::new("w"));
        assert_eq!(killed, 2);
        assert_eq!(*log.borrow(), vec!["find w", "kill 1", "kill 2", "kill 3"]);
    }

    #[test]
    fn name_match_is_exact() {
        let log = log();
        let mut table = FakeTable::new(vec![(1, "writer.exe"), (2, "Writer")], log.clone());
        assert_eq!(kill_matching(&mut table, &ProcessSelector::new("writer")), 0);
    }

    // ── truncate_with_retry ───────────────────────────────────────────────────

    #[test]
    fn truncate_succeeds_on_fifth_attempt() {
        let mut t = FlakyTruncate::new(4, log());
        let outcome = truncate_with_retry(&mut t, Path::new("/x"), &Policy::fast());
        assert_eq!(outcome, TruncateOutcome::Truncated { attempts: 5 });
        assert_eq!(t.calls, 5);
    }

    #[test]
    fn truncate_gives_up_after_five_locked_attempts() {
        let mut t = FlakyTruncate::new(u32::MAX, log());
        let outcome = truncate_with_retry(&mut t, Path::new("/x"), &Policy::fast());
        assert_eq!(outcome, TruncateOutcome::GaveUp { attempts: 5 });
        assert_eq!(t.calls, 5);
    }

    #[test]
    fn non_lock_error_is_not_retried() {
        struct Missing(u32);
        impl Truncate for Missing {
            fn truncate(&mut self, _: &Path) -> io::Result<()> {
                self.0 += 1;
                Err(io::Error::from(io::ErrorKind::NotFound))
            }
        }
        let mut t = Missing(0);
        let outcome = truncate_with_retry(&mut t, Path::new("/x"), &Policy::fast());
        assert_eq!(outcome, TruncateOutcome::GaveUp { attempts: 1 });
        assert_eq!(t.0, 1);
    }

    #[test]
    fn permission_denied_counts_as_locked() {
        assert!(is_locked(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!is_locked(&io::Error::from(io::ErrorKind::NotFound)));
    }

    #[test]
    #[cfg(windows)]
    fn sharing_and_lock_violations_count_as_locked() {
        assert!(is_locked(&io::Error::from_raw_os_error(ERROR_SHARING_VIOLATION)));
        assert!(is_locked(&io::Error::from_raw_os_error(ERROR_LOCK_VIOLATION)));
    }

    #[test]
    fn fs_truncate_empties_file_but_keeps_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info.dat");
        std::fs::write(&path, b"important history").unwrap();

        let outcome = truncate_with_retry(&mut FsTruncate, &path, &Policy::fast());

        assert_eq!(outcome, TruncateOutcome::Truncated { attempts: 1 });
        assert!(path.exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    // ── Responder ─────────────────────────────────────────────────────────────

    #[test]
    fn respond_kills_before_truncating() {
        let log = log();
        let table = FakeTable::new(vec![(7, "writer"), (8, "writer")], log.clone());
        let truncator = FlakyTruncate::new(0, log.clone());
        let mut responder = Responder::new(table, truncator, Policy::fast());

        let report = responder.respond(&ProcessSelector::new("writer"), &target());

        assert_eq!(report.killed, 2);
        assert_eq!(report.truncate, TruncateOutcome::Truncated { attempts: 1 });
        assert_eq!(
            *log.borrow(),
            vec!["find writer", "kill 7", "kill 8", "truncate /data/info.dat"]
        );
    }

    #[test]
    fn respond_truncates_even_when_every_kill_fails() {
        let log = log();
        let mut table = FakeTable::new(vec![(7, "writer")], log.clone());
        table.unkillable.insert(7);
        let truncator = FlakyTruncate::new(0, log.clone());
        let mut responder = Responder::new(table, truncator, Policy::fast());

        let report = responder.respond(&ProcessSelector::new("writer"), &target());

        assert_eq!(report.killed, 0);
        assert_eq!(log.borrow().last().unwrap(), "truncate /data/info.dat");
    }

    #[test]
    fn sysinfo_table_finds_nothing_for_unknown_name() {
        let mut table = SysinfoTable::new();
        assert!(table.find("no-such-process-name-xyz").is_empty());
    }
}
