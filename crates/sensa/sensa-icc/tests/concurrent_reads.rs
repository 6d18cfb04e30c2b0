//! Writer vs. reader threads on one region.
//!
//! The payload is a block of identical words; any mix of two writes shows up
//! as a block whose words differ, so a torn read that slipped past the
//! seqlock would be caught here.

use sensa_events::{ConsumerType, Pod};
use sensa_icc::{Reader, SharedRegion};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const WORDS: usize = 32;
const WRITES: u64 = 200_000;
const READERS: usize = 4;

#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct Block {
    words: [u64; WORDS],
}

unsafe impl Pod for Block {}

impl Block {
    fn filled(v: u64) -> Self {
        Self { words: [v; WORDS] }
    }

    fn is_consistent(&self) -> bool {
        self.words.iter().all(|w| *w == self.words[0])
    }
}

fn block_region(dir: &tempfile::TempDir) -> Arc<SharedRegion> {
    SharedRegion::create::<Block>(dir.path().join("block"), ConsumerType::Motion).unwrap()
}

#[test]
fn readers_never_accept_torn_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let region = block_region(&dir);
    let mut writer = region.writer::<Block>().unwrap();
    let done = Arc::new(AtomicBool::new(false));
    let accepted = Arc::new(AtomicU64::new(0));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let mut reader = Reader::<Block>::attach(&region.handle()).unwrap();
            let done = Arc::clone(&done);
            let accepted = Arc::clone(&accepted);
            thread::spawn(move || {
                let mut last_seen = 0u64;
                while !done.load(Ordering::Acquire) {
                    if let Some(block) = reader.latest() {
                        assert!(block.is_consistent(), "torn read accepted: {block:?}");
                        // A single writer publishes increasing values.
                        assert!(block.words[0] >= last_seen);
                        last_seen = block.words[0];
                        accepted.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for i in 1..=WRITES {
        writer.write(Block::filled(i));
    }
    done.store(true, Ordering::Release);

    for r in readers {
        r.join().unwrap();
    }
    assert!(accepted.load(Ordering::Relaxed) > 0);

    let mut reader = Reader::<Block>::attach(&region.handle()).unwrap();
    let last = reader.latest().unwrap();
    assert!(last.is_consistent());
    assert_eq!(last.words[0], WRITES);
}

#[test]
fn writer_progress_does_not_depend_on_readers() {
    let dir = tempfile::tempdir().unwrap();
    let region = block_region(&dir);
    let mut writer = region.writer::<Block>().unwrap();
    let done = Arc::new(AtomicBool::new(false));

    // Readers that hammer the region as fast as they can.
    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let mut reader = Reader::<Block>::attach(&region.handle()).unwrap();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    std::hint::black_box(reader.latest());
                }
            })
        })
        .collect();

    let start = Instant::now();
    for i in 1..=WRITES {
        writer.write(Block::filled(i));
    }
    let elapsed = start.elapsed();
    done.store(true, Ordering::Release);
    for r in readers {
        r.join().unwrap();
    }

    // Generous bound: the write path never waits on readers, so this is
    // only a wall-clock sanity check.
    assert!(elapsed < Duration::from_secs(10), "writer took {elapsed:?}");
    assert_eq!(writer.version(), WRITES * 2);
}

#[test]
fn reads_return_promptly_under_a_busy_writer() {
    let dir = tempfile::tempdir().unwrap();
    let region = block_region(&dir);
    let mut writer = region.writer::<Block>().unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let writer_thread = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut i = 0u64;
            while !done.load(Ordering::Acquire) {
                i += 1;
                writer.write(Block::filled(i));
            }
        })
    };

    let mut reader = Reader::<Block>::attach(&region.handle()).unwrap();
    let calls = 50_000u64;
    let mut hits = 0u64;
    for _ in 0..calls {
        if let Some(block) = reader.latest() {
            assert!(block.is_consistent());
            hits += 1;
        }
    }
    done.store(true, Ordering::Release);
    writer_thread.join().unwrap();

    // Every call either produced a clean copy or gave up after its bound.
    assert_eq!(hits + reader.contention_misses(), calls);
}
