use anyhow::{anyhow, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

const LOCK_FILE_NAME: &str = "renbatch.lock";
const STALE_LOCK_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Exclusive claim on a work directory for the duration of one rename
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    pid: u32,
    timestamp: u64,
}

/// Contents of an existing lock file ("pid:timestamp")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LockOwner {
    pid: u32,
    timestamp: u64,
}

impl LockOwner {
    fn parse(content: &str) -> Option<Self> {
        let (pid, timestamp) = content.trim().split_once(':')?;
        Some(Self {
            pid: pid.parse().ok()?,
            timestamp: timestamp.parse().ok()?,
        })
    }

    fn is_live(self, now: u64) -> bool {
        now.saturating_sub(self.timestamp) <= STALE_LOCK_TIMEOUT_SECS && is_process_running(self.pid)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn read_owner(lock_path: &Path) -> Result<Option<LockOwner>> {
    let content = fs::read_to_string(lock_path).context("Failed to read lock file")?;
    Ok(LockOwner::parse(&content))
}

/// Whether a live process currently holds the lock in `work_dir`
pub fn is_locked(work_dir: &Path) -> bool {
    let lock_path = work_dir.join(LOCK_FILE_NAME);
    match read_owner(&lock_path) {
        Ok(Some(owner)) => owner.is_live(now_secs()),
        _ => false,
    }
}

impl LockFile {
    /// Acquire the lock, clearing it first if its owner is gone or it is stale
    pub fn acquire(work_dir: &Path) -> Result<Self> {
        let lock_path = work_dir.join(LOCK_FILE_NAME);

        if lock_path.exists() {
            match read_owner(&lock_path)? {
                Some(owner) if owner.is_live(now_secs()) => {
                    return Err(anyhow!(
                        "Another renbatch process is already running (PID: {}). \
                        If this is incorrect, remove the lock file at: {}",
                        owner.pid,
                        lock_path.display()
                    ));
                },
                Some(owner) => {
                    tracing::debug!("Removing stale lock held by PID {}", owner.pid);
                    fs::remove_file(&lock_path).context("Failed to remove stale lock file")?;
                },
                None => {
                    tracing::warn!("Removing malformed lock file {}", lock_path.display());
                    fs::remove_file(&lock_path).context("Failed to remove malformed lock file")?;
                },
            }
        }

        let pid = process::id();
        let timestamp = now_secs();

        fs::create_dir_all(work_dir).context("Failed to create .renbatch directory")?;

        // create_new fails if another process won the race since the check above
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .context("Failed to create lock file")?;

        file.write_all(format!("{}:{}", pid, timestamp).as_bytes())
            .context("Failed to write lock file")?;

        Ok(Self {
            path: lock_path,
            pid,
            timestamp,
        })
    }

    /// Release the lock if it is still ours
    pub fn release(mut self) -> Result<()> {
        let result = self.remove_if_owned();
        // Nothing left for Drop to do
        self.path = PathBuf::new();
        result
    }

    fn remove_if_owned(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let ours = read_owner(&self.path)?
            == Some(LockOwner {
                pid: self.pid,
                timestamp: self.timestamp,
            });
        if ours {
            fs::remove_file(&self.path).context("Failed to remove lock file")?;
        }
        Ok(())
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if !self.path.as_os_str().is_empty() {
            let _ = self.remove_if_owned();
        }
    }
}

#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    // Signal 0 only checks that the process exists
    #[allow(clippy::cast_possible_wrap)]
    unsafe {
        libc::kill(pid as libc::pid_t, 0) == 0
    }
}

#[cfg(windows)]
fn is_process_running(pid: u32) -> bool {
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::processthreadsapi::OpenProcess;
    use winapi::um::winnt::PROCESS_QUERY_INFORMATION;

    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_INFORMATION, 0, pid);
        if handle.is_null() {
            false
        } else {
            CloseHandle(handle);
            true
        }
    }
}

#[cfg(not(any(unix, windows)))]
fn is_process_running(_pid: u32) -> bool {
    false
}
