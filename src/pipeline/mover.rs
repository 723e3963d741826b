use super::{Issue, MoveRequest, PipelineState};
use crossbeam_channel::{Receiver, Sender};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::Path;
use tracing::{debug, error, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The source already sits at its destination.
    AlreadyInPlace,
}

/// One mover worker. Relocates files and prunes the directories they leave
/// empty, never touching `source_root` itself.
pub struct Mover<'a> {
    pub source_root: &'a Path,
    pub state: &'a PipelineState,
    pub issues: Sender<Issue>,
}

impl Mover<'_> {
    /// Pulls requests until the queue is closed and drained.
    pub fn run(self, worker_id: usize, requests: Receiver<MoveRequest>) {
        debug!("Mover {} started", worker_id);

        for request in requests {
            self.relocate(&request);
        }

        debug!("Mover {} stopped", worker_id);
    }

    pub fn relocate(&self, request: &MoveRequest) {
        match move_into(&request.source, &request.destination) {
            Ok(outcome) => {
                trace!(
                    "{:?}: {} -> {}",
                    outcome,
                    request.source.display(),
                    request.destination.display()
                );
                self.state.counters.record_moved();
            }
            Err(e) => self.report(Issue::MoveFailed {
                path: request.source.clone(),
                source: e,
            }),
        }

        if let Some(parent) = request.source.parent() {
            self.prune_empty_ancestors(parent);
        }
    }

    /// Removes `start` and its ancestors while they are empty, stopping at
    /// the first non-empty one or at the source root.
    pub fn prune_empty_ancestors(&self, start: &Path) {
        let mut dir = start;
        while dir != self.source_root && dir.starts_with(self.source_root) {
            match is_empty_dir(dir) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(e) => {
                    self.report(Issue::PruneFailed {
                        dir: dir.to_path_buf(),
                        source: e,
                    });
                    break;
                }
            }

            if let Err(e) = fs::remove_dir(dir) {
                // Another mover refilled or removed it first.
                let lost_race =
                    e.kind() == ErrorKind::NotFound || !is_empty_dir(dir).unwrap_or(true);
                if !lost_race {
                    self.report(Issue::PruneFailed {
                        dir: dir.to_path_buf(),
                        source: e,
                    });
                }
                break;
            }
            trace!("Removed empty directory {}", dir.display());

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
    }

    fn report(&self, issue: Issue) {
        if let Err(e) = self.issues.send(issue) {
            error!("Error sink closed, dropping: {}", e.into_inner());
        }
    }
}

/// Moves `source` into `destination`, keeping its file name. Never replaces
/// an existing file.
pub fn move_into(source: &Path, destination: &Path) -> io::Result<MoveOutcome> {
    let file_name = source.file_name().ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("'{}' has no file name", source.display()),
        )
    })?;
    let target = destination.join(file_name);

    fs::create_dir_all(destination)?;
    if same_file(source, &target) {
        return Ok(MoveOutcome::AlreadyInPlace);
    }

    place(source, destination, &target)?;
    Ok(MoveOutcome::Moved)
}

/// Claims `target` and releases `source`. A destination pruned by another
/// mover after it was created is re-created once.
fn place(source: &Path, destination: &Path, target: &Path) -> io::Result<()> {
    match claim(source, target) {
        Err(e) if e.kind() == ErrorKind::NotFound && !destination.exists() => {
            fs::create_dir_all(destination)?;
            claim(source, target)
        }
        result => result,
    }
}

/// The hard link fails with `AlreadyExists` when the name is taken, so
/// concurrent movers can never replace each other's files.
fn claim(source: &Path, target: &Path) -> io::Result<()> {
    match fs::hard_link(source, target) {
        Ok(()) => release_source(source, target),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(already_exists(target)),
        Err(e) if matches!(e.kind(), ErrorKind::CrossesDevices | ErrorKind::Unsupported) => {
            copy_then_remove(source, target)
        }
        Err(e) => Err(e),
    }
}

/// Fallback for targets on another filesystem, or one without hard links.
fn copy_then_remove(source: &Path, target: &Path) -> io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(writer) => writer,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(already_exists(target)),
        Err(e) => return Err(e),
    };

    let copied = io::copy(&mut reader, &mut writer)
        .and_then(|_| writer.sync_all())
        .and_then(|()| reader.metadata())
        .and_then(|meta| fs::set_permissions(target, meta.permissions()));
    drop(writer);
    if let Err(e) = copied {
        discard(target);
        return Err(e);
    }

    release_source(source, target)
}

/// Removes `source` once `target` holds its content; on failure the target
/// is removed again so the file exists exactly once.
fn release_source(source: &Path, target: &Path) -> io::Result<()> {
    if let Err(e) = fs::remove_file(source) {
        discard(target);
        return Err(e);
    }
    Ok(())
}

fn discard(target: &Path) {
    if let Err(e) = fs::remove_file(target) {
        error!("Could not roll back {}: {}", target.display(), e);
    }
}

fn already_exists(target: &Path) -> io::Error {
    io::Error::new(
        ErrorKind::AlreadyExists,
        format!("Destination path '{}' already exists", target.display()),
    )
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}
