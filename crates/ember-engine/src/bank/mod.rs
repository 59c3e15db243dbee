//! Program bank: persistence, switching, clipboard.
//!
//! All operations here run on the control thread. Disk access never happens
//! while the render lock is held; applying a program to the live parameter
//! array is the only step that takes it, and only for the final copy-in.

pub mod paths;
pub mod program;

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, warn};

use crate::params::{self, ParamStore, PARAM_COUNT, PROGRAM_COUNT};

use self::paths::PresetPaths;
use self::program::Program;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("io error while accessing program file: {0}")]
    Io(#[from] io::Error),
}

/// User-facing messages emitted by bank operations. The UI drains these on
/// its poll timer and presents them however it likes.
#[derive(Debug, Clone)]
pub enum BankNotification {
    LoadFailed { path: PathBuf },
    SaveFailed { path: PathBuf },
}

pub struct PresetBank {
    store: Arc<ParamStore>,
    paths: PresetPaths,
    programs: Vec<Program>,
    current: usize,
    clipboard: Option<Program>,
    notify_tx: Sender<BankNotification>,
    notify_rx: Receiver<BankNotification>,
}

impl PresetBank {
    /// Builds the bank, loading every slot from disk where a file exists and
    /// falling back to the built-in default program otherwise, then applies
    /// slot 0 to the live parameter array.
    pub fn new(store: Arc<ParamStore>, paths: PresetPaths) -> Self {
        let (notify_tx, notify_rx) = unbounded();
        let mut bank = Self {
            store,
            paths,
            programs: (0..PROGRAM_COUNT).map(Program::default_for).collect(),
            current: 0,
            clipboard: None,
            notify_tx,
            notify_rx,
        };
        for index in 0..PROGRAM_COUNT {
            bank.load_program(index);
        }
        bank.programs[bank.current].apply_to(&bank.store);
        bank.store.reset_dirty(true);
        bank
    }

    /// Receiver for user-facing I/O notifications.
    pub fn notifications(&self) -> Receiver<BankNotification> {
        self.notify_rx.clone()
    }

    pub fn current_program(&self) -> usize {
        self.current
    }

    pub fn program_name(&self, index: usize) -> &str {
        self.programs[index].name()
    }

    pub fn set_program_name(&mut self, index: usize, name: impl Into<String>) {
        self.programs[index].set_name(name);
    }

    /// Loads one slot from disk. Search order: legacy flat file, then the
    /// user bank folder, then the factory bank folder. Returns `false` when
    /// no file exists — not an error, the slot keeps its current contents.
    pub fn load_program(&mut self, index: usize) -> bool {
        debug_assert!(index < PROGRAM_COUNT, "program index {index} out of range");
        if index >= PROGRAM_COUNT {
            return false;
        }

        let legacy = self.paths.legacy_program(index);
        let (path, migrate) = if legacy.is_file() {
            (legacy, true)
        } else {
            let user = self.paths.user_program(index);
            if user.is_file() {
                (user, false)
            } else {
                let factory = self.paths.factory_program(index);
                if factory.is_file() {
                    (factory, false)
                } else {
                    return false;
                }
            }
        };

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed opening program file");
                let _ = self.notify_tx.send(BankNotification::LoadFailed { path });
                return false;
            }
        };

        debug!(path = %path.display(), "loading program");
        let mut program = Program::default_for(index);
        let mut lines = BufReader::new(file).lines();

        if let Some(Ok(name)) = lines.next() {
            program.set_name(name.trim_end().to_string());
        }
        for line in lines {
            let Ok(line) = line else { break };
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            // Unknown keys and malformed values are skipped, never an error:
            // newer files must load on older builds and vice versa.
            let Some((key, value)) = line.split_once(';') else {
                continue;
            };
            let Some(slot) = params::param_index(key) else {
                continue;
            };
            let Ok(value) = value.trim().parse::<f32>() else {
                continue;
            };
            program.set(slot, value);
        }
        self.programs[index] = program;

        if migrate {
            self.migrate_legacy(index, &path);
        }
        true
    }

    /// Best-effort move of a legacy flat-layout file into the bank layout:
    /// save in the new location first, then delete the old file. Failure is
    /// logged and retried on the next load.
    fn migrate_legacy(&mut self, index: usize, legacy_path: &Path) {
        match self.write_program_file(index) {
            Ok(()) => {
                if let Err(err) = fs::remove_file(legacy_path) {
                    warn!(path = %legacy_path.display(), %err, "could not remove legacy program file");
                } else {
                    debug!(path = %legacy_path.display(), "migrated legacy program file");
                }
            }
            Err(err) => {
                warn!(path = %legacy_path.display(), %err, "legacy program migration postponed");
            }
        }
    }

    /// Writes one slot to its user-folder location. Returns `false` on I/O
    /// failure, after emitting a notification; the in-memory program and any
    /// previously saved file are left untouched.
    pub fn save_program(&mut self, index: usize) -> bool {
        debug_assert!(index < PROGRAM_COUNT, "program index {index} out of range");
        if index >= PROGRAM_COUNT {
            return false;
        }
        match self.write_program_file(index) {
            Ok(()) => true,
            Err(err) => {
                let path = self.paths.user_program(index);
                warn!(path = %path.display(), %err, "failed writing program file");
                let _ = self.notify_tx.send(BankNotification::SaveFailed { path });
                false
            }
        }
    }

    fn write_program_file(&self, index: usize) -> Result<(), BankError> {
        let path = self.paths.user_program(index);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write a sibling first and rename over the target, so an aborted
        // save never leaves a truncated program behind.
        let tmp = path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        let program = &self.programs[index];
        write!(file, "{}\r\n", program.name())?;
        for slot in 0..PARAM_COUNT {
            write!(file, "{};{}\r\n", params::param_name(slot), program.get(slot))?;
        }
        file.flush()?;
        drop(file);
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "saved program");
        Ok(())
    }

    /// Captures the live parameters into the current slot and persists it.
    pub fn save_current(&mut self) -> bool {
        self.programs[self.current].capture_from(&self.store);
        self.save_program(self.current)
    }

    /// Switches the current program. The live parameters are written back to
    /// the vacated slot first, so unsaved edits survive switching away and
    /// back.
    pub fn switch_program(&mut self, index: usize) {
        if index == self.current || index >= PROGRAM_COUNT {
            return;
        }
        self.programs[self.current].capture_from(&self.store);
        self.current = index;
        self.programs[index].apply_to(&self.store);
        self.store.reset_dirty(true);
    }

    /// Executes a program change staged by the MIDI scheduler, if one is
    /// pending. Called from the control thread's poll cycle.
    pub fn poll_requested_program(&mut self) {
        if let Some(requested) = self.store.take_requested_program() {
            self.switch_program(requested);
        }
    }

    /// Snapshots the current slot's name and the live parameter values.
    pub fn copy(&mut self) {
        let mut snapshot = Program::named(self.programs[self.current].name());
        snapshot.capture_from(&self.store);
        self.clipboard = Some(snapshot);
    }

    /// Overwrites the current slot from the clipboard and persists it; a
    /// paste is durable, unlike ordinary edits. No-op without a prior copy.
    pub fn paste(&mut self) {
        let Some(clip) = self.clipboard.clone() else {
            return;
        };
        self.programs[self.current] = clip;
        self.programs[self.current].apply_to(&self.store);
        self.save_program(self.current);
        self.store.reset_dirty(true);
    }

    /// Discards in-memory edits of the current slot by reloading it from
    /// disk and reapplying it.
    pub fn restore(&mut self) {
        self.load_program(self.current);
        self.programs[self.current].apply_to(&self.store);
        self.store.reset_dirty(true);
    }
}
