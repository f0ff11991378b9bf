//! A [`FileSystem`] that records every call and fails on demand.
//!
//! Wraps the real filesystem, so recorded runs still produce real files.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use policy_fs::{FileKind, FileSystem, OsFileSystem, SourceFile, TargetFile};

/// One filesystem call, recorded before it runs (and before any injected failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    CreateDir(PathBuf),
    Stat(PathBuf),
    OpenSource(PathBuf),
    CreateTarget(PathBuf),
    Sync(PathBuf),
    CloseTarget(PathBuf),
    CloseSource(PathBuf),
    Remove(PathBuf),
}

impl FsEvent {
    /// Whether the call changes the filesystem.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateDir(_) | Self::CreateTarget(_) | Self::Sync(_) | Self::Remove(_)
        )
    }
}

/// A call that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    CreateDir,
    Stat,
    OpenSource,
    CreateTarget,
    /// Writes to a target handle.
    Write,
    Sync,
    CloseTarget,
    CloseSource,
    Remove,
}

type EventLog = Rc<RefCell<Vec<FsEvent>>>;

/// Recording, fault-injecting [`FileSystem`].
///
/// # Example
///
/// ```rust,no_run
/// use policy_test_utils::{Fault, FsEvent, RecordingFs};
///
/// let fs = RecordingFs::new().failing_on(Fault::Sync, "fw_network");
/// // ... run an install through `&fs` ...
/// assert!(fs.events().iter().any(|e| matches!(e, FsEvent::Sync(_))));
/// ```
#[derive(Debug, Default)]
pub struct RecordingFs {
    inner: OsFileSystem,
    events: EventLog,
    faults: Vec<(Fault, Option<OsString>)>,
}

impl RecordingFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call of this kind.
    pub fn failing(mut self, fault: Fault) -> Self {
        self.faults.push((fault, None));
        self
    }

    /// Fail calls of this kind whose path ends in `file_name`.
    pub fn failing_on(mut self, fault: Fault, file_name: &str) -> Self {
        self.faults.push((fault, Some(file_name.into())));
        self
    }

    /// Every call so far, in order.
    pub fn events(&self) -> Vec<FsEvent> {
        self.events.borrow().clone()
    }

    /// Only the calls that change the filesystem.
    pub fn mutations(&self) -> Vec<FsEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    fn record(&self, event: FsEvent) {
        self.events.borrow_mut().push(event);
    }

    fn fails(&self, fault: Fault, path: &Path) -> bool {
        self.faults.iter().any(|(f, name)| {
            *f == fault
                && name
                    .as_deref()
                    .is_none_or(|name| path.file_name() == Some(name))
        })
    }

    fn check(&self, fault: Fault, path: &Path) -> io::Result<()> {
        if self.fails(fault, path) {
            Err(injected(fault, path))
        } else {
            Ok(())
        }
    }
}

fn injected(fault: Fault, path: &Path) -> io::Error {
    io::Error::other(format!("injected {fault:?} failure at {}", path.display()))
}

impl FileSystem for RecordingFs {
    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.record(FsEvent::CreateDir(path.to_path_buf()));
        self.check(Fault::CreateDir, path)?;
        self.inner.create_dir_all(path, mode)
    }

    fn file_kind(&self, path: &Path) -> io::Result<FileKind> {
        self.record(FsEvent::Stat(path.to_path_buf()));
        self.check(Fault::Stat, path)?;
        self.inner.file_kind(path)
    }

    fn open_source(&self, path: &Path) -> io::Result<Box<dyn SourceFile>> {
        self.record(FsEvent::OpenSource(path.to_path_buf()));
        self.check(Fault::OpenSource, path)?;
        Ok(Box::new(RecordingSource {
            path: path.to_path_buf(),
            inner: self.inner.open_source(path)?,
            events: Rc::clone(&self.events),
            fail_close: self.fails(Fault::CloseSource, path),
        }))
    }

    fn create_target(&self, path: &Path) -> io::Result<Box<dyn TargetFile>> {
        self.record(FsEvent::CreateTarget(path.to_path_buf()));
        self.check(Fault::CreateTarget, path)?;
        Ok(Box::new(RecordingTarget {
            path: path.to_path_buf(),
            inner: self.inner.create_target(path)?,
            events: Rc::clone(&self.events),
            fail_write: self.fails(Fault::Write, path),
            fail_sync: self.fails(Fault::Sync, path),
            fail_close: self.fails(Fault::CloseTarget, path),
        }))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.record(FsEvent::Remove(path.to_path_buf()));
        self.check(Fault::Remove, path)?;
        self.inner.remove_file(path)
    }
}

struct RecordingSource {
    path: PathBuf,
    inner: Box<dyn SourceFile>,
    events: EventLog,
    fail_close: bool,
}

impl Read for RecordingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl SourceFile for RecordingSource {
    fn close(self: Box<Self>) -> io::Result<()> {
        let this = *self;
        this.events
            .borrow_mut()
            .push(FsEvent::CloseSource(this.path.clone()));
        this.inner.close()?;
        if this.fail_close {
            return Err(injected(Fault::CloseSource, &this.path));
        }
        Ok(())
    }
}

struct RecordingTarget {
    path: PathBuf,
    inner: Box<dyn TargetFile>,
    events: EventLog,
    fail_write: bool,
    fail_sync: bool,
    fail_close: bool,
}

impl Write for RecordingTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_write {
            return Err(injected(Fault::Write, &self.path));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl TargetFile for RecordingTarget {
    fn sync(&mut self) -> io::Result<()> {
        self.events
            .borrow_mut()
            .push(FsEvent::Sync(self.path.clone()));
        if self.fail_sync {
            return Err(injected(Fault::Sync, &self.path));
        }
        self.inner.sync()
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let this = *self;
        this.events
            .borrow_mut()
            .push(FsEvent::CloseTarget(this.path.clone()));
        this.inner.close()?;
        if this.fail_close {
            return Err(injected(Fault::CloseTarget, &this.path));
        }
        Ok(())
    }
}
