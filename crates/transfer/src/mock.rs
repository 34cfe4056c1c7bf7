//! Test doubles for the link and storage seams.

use std::collections::{HashMap, VecDeque};
use std::future::ready;
use std::io;
use std::sync::{Arc, Mutex};

use crate::link::{Link, LinkFuture};
use crate::storage::{Sink, Storage, StorageFuture};

/// Link that replays scripted bursts, the way a UART hands over whatever
/// arrived before its timeout.
///
/// `read_chunk` never crosses a burst boundary; an empty burst is one empty
/// read. `read_line` joins bursts until it sees `\n`.
#[derive(Debug, Default)]
pub(crate) struct BurstLink {
    bursts: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    chunk_reads: usize,
}

impl BurstLink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn burst(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.bursts.push_back(bytes.as_ref().to_vec());
        self
    }

    /// Everything the receiver wrote, as text.
    pub(crate) fn written(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    pub(crate) fn chunk_reads(&self) -> usize {
        self.chunk_reads
    }

    /// Bytes the receiver never consumed.
    pub(crate) fn unread(&self) -> Vec<u8> {
        self.bursts.iter().flatten().copied().collect()
    }
}

impl Link for BurstLink {
    fn read_line(&mut self) -> LinkFuture<'_, Option<Vec<u8>>> {
        let mut line = Vec::new();
        while let Some(front) = self.bursts.front_mut() {
            if let Some(pos) = front.iter().position(|&b| b == b'\n') {
                line.extend(front.drain(..=pos));
                if front.is_empty() {
                    self.bursts.pop_front();
                }
                return Box::pin(ready(Ok(Some(line))));
            }
            line.append(front);
            self.bursts.pop_front();
        }
        let line = if line.is_empty() { None } else { Some(line) };
        Box::pin(ready(Ok(line)))
    }

    fn read_chunk(&mut self, max: usize) -> LinkFuture<'_, Vec<u8>> {
        self.chunk_reads += 1;
        let chunk = match self.bursts.front_mut() {
            Some(front) => {
                let take = front.len().min(max);
                let chunk: Vec<u8> = front.drain(..take).collect();
                if front.is_empty() {
                    self.bursts.pop_front();
                }
                chunk
            }
            None => Vec::new(),
        };
        Box::pin(ready(Ok(chunk)))
    }

    fn write<'a>(&'a mut self, bytes: &'a [u8]) -> LinkFuture<'a, ()> {
        self.written.extend_from_slice(bytes);
        Box::pin(ready(Ok(())))
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: HashMap<String, Vec<u8>>,
    /// Every byte ever appended per name, kept after deletion.
    appended: HashMap<String, Vec<u8>>,
    deleted: Vec<String>,
    closed: Vec<String>,
    /// Bytes accepted across all sinks before appends start failing.
    append_budget: Option<usize>,
    fail_close: bool,
}

/// In-memory storage that remembers what happened to each object.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends fail once `bytes` have been accepted.
    pub(crate) fn fail_appends_after(self, bytes: usize) -> Self {
        self.state.lock().unwrap().append_budget = Some(bytes);
        self
    }

    /// Every `close` reports an error.
    pub(crate) fn fail_close(self) -> Self {
        self.state.lock().unwrap().fail_close = true;
        self
    }

    /// Current contents of a live object.
    pub(crate) fn object(&self, name: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().objects.get(name).cloned()
    }

    /// Everything appended to `name`, even if it was deleted later.
    pub(crate) fn appended(&self, name: &str) -> Vec<u8> {
        self.state
            .lock()
            .unwrap()
            .appended
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub(crate) fn closed(&self) -> Vec<String> {
        self.state.lock().unwrap().closed.clone()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().unwrap().objects.keys().cloned().collect();
        names.sort();
        names
    }
}

pub(crate) struct MemorySink {
    name: String,
    state: Arc<Mutex<MemoryState>>,
}

impl Sink for MemorySink {
    fn append<'a>(&'a mut self, bytes: &'a [u8]) -> StorageFuture<'a, ()> {
        let mut state = self.state.lock().unwrap();
        if let Some(budget) = state.append_budget {
            if bytes.len() > budget {
                return Box::pin(ready(Err(io::Error::other("storage full"))));
            }
            state.append_budget = Some(budget - bytes.len());
        }
        let result = match state.objects.get_mut(&self.name) {
            Some(object) => {
                object.extend_from_slice(bytes);
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::NotFound, "sink deleted")),
        };
        if result.is_ok() {
            state
                .appended
                .entry(self.name.clone())
                .or_default()
                .extend_from_slice(bytes);
        }
        Box::pin(ready(result))
    }

    fn close(&mut self) -> StorageFuture<'_, ()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_close {
            return Box::pin(ready(Err(io::Error::other("sync failed"))));
        }
        state.closed.push(self.name.clone());
        Box::pin(ready(Ok(())))
    }
}

impl Storage for MemoryStorage {
    type Sink = MemorySink;

    fn create_sink<'a>(&'a self, name: &'a str) -> StorageFuture<'a, MemorySink> {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(name.to_owned(), Vec::new());
        Box::pin(ready(Ok(MemorySink {
            name: name.to_owned(),
            state: Arc::clone(&self.state),
        })))
    }

    fn delete<'a>(&'a self, name: &'a str) -> StorageFuture<'a, ()> {
        let mut state = self.state.lock().unwrap();
        state.objects.remove(name);
        state.deleted.push(name.to_owned());
        Box::pin(ready(Ok(())))
    }
}
