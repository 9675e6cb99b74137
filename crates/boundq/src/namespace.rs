//! Namespaces — directories of named queues.
//!
//! Each queue is one backing file, `<root>/<name>.bq`. The file outlives
//! every process that maps it and is removed only by [`Namespace::delete`].
//!
//! For production: /dev/shm/boundq (see `boundq_core::config::default_root`)
//! For testing: a per-test directory under the system temp dir

use std::fs::{self, File};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use boundq_core::config::NamespaceConfig;
use boundq_core::layout::Layout;
use boundq_core::{ErrorKind, QueueError, QueueName};

use crate::handle::{Handle, Mode};
use crate::lock::FileLock;
use crate::region::Region;

const DEFAULT_FILE_MODE: u32 = 0o644;

/// How to open a queue. Modelled on `std::fs::OpenOptions`.
///
/// ```no_run
/// # use boundq::{Namespace, OpenOptions};
/// # fn main() -> Result<(), boundq::QueueError> {
/// let ns = Namespace::new("/dev/shm/boundq")?;
/// let tx = ns.open(
///     "/jobs",
///     OpenOptions::new().write(true).create(true).capacity(10).max_message_size(128),
/// )?;
/// tx.send(b"build:42", 1)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    read: bool,
    write: bool,
    create: bool,
    create_new: bool,
    capacity: Option<usize>,
    max_message_size: Option<usize>,
    file_mode: Option<u32>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&mut self, read: bool) -> &mut Self {
        self.read = read;
        self
    }

    pub fn write(&mut self, write: bool) -> &mut Self {
        self.write = write;
        self
    }

    /// Create the queue if it does not exist. Requires `capacity` and
    /// `max_message_size`; both are ignored when the queue already exists.
    pub fn create(&mut self, create: bool) -> &mut Self {
        self.create = create;
        self
    }

    /// Create the queue, failing with `AlreadyExists` if it exists.
    pub fn create_new(&mut self, create_new: bool) -> &mut Self {
        self.create_new = create_new;
        self
    }

    pub fn capacity(&mut self, capacity: usize) -> &mut Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn max_message_size(&mut self, max_message_size: usize) -> &mut Self {
        self.max_message_size = Some(max_message_size);
        self
    }

    /// Permission bits for a newly created queue. Defaults to the
    /// namespace's mode.
    pub fn file_mode(&mut self, mode: u32) -> &mut Self {
        self.file_mode = Some(mode);
        self
    }

    fn access_mode(&self) -> Result<Mode, QueueError> {
        match (self.read, self.write) {
            (true, true) => Ok(Mode::ReadWrite),
            (true, false) => Ok(Mode::ReadOnly),
            (false, true) => Ok(Mode::WriteOnly),
            (false, false) => Err(QueueError::InvalidConfig(
                "handle must be opened for reading, writing, or both".into(),
            )),
        }
    }

    fn creating(&self) -> bool {
        self.create || self.create_new
    }

    /// Layout for a queue this open is about to create. Only consulted when
    /// the store is new, so attributes are ignored for existing queues.
    fn creation_layout(&self) -> Result<Layout, QueueError> {
        let capacity = self.capacity.ok_or_else(|| {
            QueueError::InvalidConfig("capacity is required to create a queue".into())
        })?;
        let max_message_size = self.max_message_size.ok_or_else(|| {
            QueueError::InvalidConfig("max message size is required to create a queue".into())
        })?;
        Layout::new(capacity, max_message_size)
    }
}

/// A directory of queues.
#[derive(Debug, Clone)]
pub struct Namespace {
    root: PathBuf,
    file_mode: u32,
}

impl Namespace {
    /// Use `root` as a namespace, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            QueueError::from_io("create namespace", &root.display().to_string(), &root, e)
        })?;
        Ok(Self {
            root,
            file_mode: DEFAULT_FILE_MODE,
        })
    }

    pub fn from_config(config: &NamespaceConfig) -> Result<Self, QueueError> {
        let mut ns = Self::new(&config.root)?;
        ns.file_mode = config.file_mode;
        Ok(ns)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Backing file of `name` in this namespace.
    pub fn path_of(&self, name: &QueueName) -> PathBuf {
        self.root.join(name.file_name())
    }

    /// Open (and optionally create) the queue `name`.
    pub fn open(&self, name: &str, options: &OpenOptions) -> Result<Handle, QueueError> {
        let name = QueueName::parse(name)?;
        let mode = options.access_mode()?;
        let path = self.path_of(&name);
        let subject = name.to_string();

        loop {
            let mut fs_options = fs::OpenOptions::new();
            fs_options
                .read(true)
                .write(true)
                .mode(options.file_mode.unwrap_or(self.file_mode));
            if options.create_new {
                fs_options.create_new(true);
            } else if options.create {
                fs_options.create(true);
            }
            let file = fs_options
                .open(&path)
                .map_err(|e| QueueError::from_io("open", &subject, &path, e))?;

            let lock = FileLock::exclusive(&file)
                .map_err(|e| QueueError::from_io("lock", &subject, &path, e))?;
            let Some(meta) = linked_metadata(&file, &path)
                .map_err(|e| QueueError::from_io("stat", &subject, &path, e))?
            else {
                // Unlinked or replaced between our open and our lock.
                drop(lock);
                continue;
            };

            let region = if meta.len() == 0 {
                // Fresh file, or one whose creator failed before sizing it.
                if !options.creating() {
                    return Err(QueueError::NotFound(subject));
                }
                let layout = match options.creation_layout() {
                    Ok(layout) => layout,
                    Err(e) => {
                        discard(&name, &path);
                        return Err(e);
                    }
                };
                let region = match Region::initialize(&file, layout) {
                    Ok(region) => region,
                    Err(e) => {
                        discard(&name, &path);
                        return Err(QueueError::from_io("initialize", &subject, &path, e));
                    }
                };
                tracing::debug!(
                    queue = %name,
                    capacity = layout.capacity(),
                    max_message_size = layout.max_message_size(),
                    "queue created"
                );
                region
            } else {
                let region = Region::attach(&file, &name, &path)?;
                if region.is_deleted() {
                    // Deleted between our open and our lock.
                    drop(lock);
                    if options.creating() {
                        continue;
                    }
                    return Err(QueueError::NotFound(subject));
                }
                region
            };

            drop(lock);
            return Ok(Handle::new(name, path, mode, file, region));
        }
    }

    /// Delete the queue `name`.
    ///
    /// Takes effect immediately: open handles fail with `NotFound` on their
    /// next operation and blocked callers wake up and fail the same way.
    pub fn delete(&self, name: &str) -> Result<(), QueueError> {
        let name = QueueName::parse(name)?;
        let path = self.path_of(&name);
        let subject = name.to_string();

        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| QueueError::from_io("open", &subject, &path, e))?;
        let _lock = FileLock::exclusive(&file)
            .map_err(|e| QueueError::from_io("lock", &subject, &path, e))?;
        let meta = linked_metadata(&file, &path)
            .map_err(|e| QueueError::from_io("stat", &subject, &path, e))?;

        // A zero-length file belongs to an opener that has not created the
        // queue yet; it is not a queue and is left for that opener.
        match meta {
            Some(meta) if meta.len() > 0 => {}
            _ => return Err(QueueError::NotFound(subject)),
        }

        match Region::attach(&file, &name, &path) {
            Ok(mut region) => {
                if region.is_deleted() {
                    return Err(QueueError::NotFound(subject));
                }
                region.mark_deleted();
                region.wake_word().bump_and_wake();
            }
            Err(e) if e.kind() == ErrorKind::Corrupted => {
                tracing::warn!(queue = %name, error = %e, "deleting corrupted queue store");
            }
            Err(e) => return Err(e),
        }

        fs::remove_file(&path).map_err(|e| QueueError::from_io("remove", &subject, &path, e))?;
        tracing::debug!(queue = %name, "queue deleted");
        Ok(())
    }

    /// Whether a created queue named `name` exists.
    pub fn exists(&self, name: &str) -> Result<bool, QueueError> {
        let name = QueueName::parse(name)?;
        let path = self.path_of(&name);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.len() > 0),
            Err(e) => match QueueError::from_io("stat", &name.to_string(), &path, e) {
                QueueError::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    /// Names of every queue in this namespace, sorted.
    pub fn list(&self) -> Result<Vec<QueueName>, QueueError> {
        let subject = self.root.display().to_string();
        let entries = fs::read_dir(&self.root)
            .map_err(|e| QueueError::from_io("list", &subject, &self.root, e))?;
        let mut names: Vec<QueueName> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().and_then(QueueName::from_file_name))
            .collect();
        names.sort();
        Ok(names)
    }
}

/// Metadata of `file` if `path` still names it, `None` once it has been
/// unlinked or replaced. Only meaningful while holding the store lock.
fn linked_metadata(file: &File, path: &Path) -> io::Result<Option<fs::Metadata>> {
    let opened = file.metadata()?;
    match fs::metadata(path) {
        Ok(current) if current.dev() == opened.dev() && current.ino() == opened.ino() => {
            Ok(Some(opened))
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Remove a store this open failed to create. Waiting openers notice the
/// unlink and start over.
fn discard(name: &QueueName, path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(queue = %name, error = %e, "failed to remove unfinished queue store");
    }
}
