use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{images::TranscodeOptions, store::Store};

/// Shared state handed to every request handler.
#[derive(Debug)]
pub struct Context {
    pub site_name: String,
    pub store: Store,
    pub transcode: TranscodeOptions,
    pub max_upload_bytes: usize,

    // one mutation at a time within this process
    write_lock: Mutex<()>,
}

impl Context {
    pub fn new(
        site_name: String,
        content_dir: PathBuf,
        public_dir: PathBuf,
        transcode: TranscodeOptions,
        max_upload_bytes: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            site_name,
            store: Store::new(content_dir, public_dir),
            transcode,
            max_upload_bytes,
            write_lock: Mutex::new(()),
        })
    }

    pub fn write_guard(&self) -> MutexGuard<'_, ()> {
        // the lock guards no data, so poisoning is harmless
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
