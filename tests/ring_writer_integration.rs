//! Ring writer integration tests.
//!
//! End-to-end coverage of the write-behind pipeline: slot placement,
//! multi-file wraparound, rotation on demand, shutdown flushing, and the
//! instance counter lifecycle. Every test drives the public `RingWriter`
//! API against a temporary directory and inspects the files it leaves
//! behind.

use daq_ringstore::{CompletionRecord, RingWriter, RingWriterConfig, COMPLETION_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// =============================================================================
// Helpers
// =============================================================================

fn config(
    root: &Path,
    sample_size: usize,
    samples_per_file: usize,
    num_files: usize,
) -> RingWriterConfig {
    RingWriterConfig::builder()
        .root_dir(root)
        .sample_size(sample_size)
        .samples_per_file(samples_per_file)
        .num_files(num_files)
        .build()
}

/// Ring instance directories under `root`, ordered by instance counter.
fn ring_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<(u64, PathBuf)> = fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.is_dir())
        .map(|path| {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            let (_, counter) = name.rsplit_once("_ring").unwrap();
            (counter.parse::<u64>().unwrap(), path)
        })
        .collect();
    dirs.sort_by_key(|(counter, _)| *counter);
    dirs.into_iter().map(|(_, path)| path).collect()
}

fn ring_counter(dir: &Path) -> u64 {
    let name = dir.file_name().unwrap().to_string_lossy().into_owned();
    name.rsplit_once("_ring").unwrap().1.parse().unwrap()
}

fn read_manifest(dir: &Path) -> CompletionRecord {
    let data = fs::read(dir.join(COMPLETION_FILE)).unwrap();
    serde_json::from_slice(&data).unwrap()
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    done()
}

// =============================================================================
// Slot placement and wraparound
// =============================================================================

#[test]
fn samples_land_in_computed_slots() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();
    writer.initialize(config(temp_dir.path(), 4, 2, 2));

    writer.add_sample(&[0x01; 4], false);
    writer.add_sample(&[0x02; 4], false);
    writer.add_sample(&[0x03; 4], false);
    writer.terminate();

    let dirs = ring_dirs(temp_dir.path());
    assert_eq!(dirs.len(), 1);

    let mut expected0 = vec![0x01u8; 4];
    expected0.extend_from_slice(&[0x02; 4]);
    assert_eq!(fs::read(dirs[0].join("buffer0.dat")).unwrap(), expected0);
    assert_eq!(fs::read(dirs[0].join("buffer1.dat")).unwrap(), vec![0x03; 4]);

    let record = read_manifest(&dirs[0]);
    assert_eq!(record.bytes_per_sample, 4);
    assert_eq!(record.bytes_per_file, 8);
    assert_eq!(record.files_per_ringbuffer, 2);
    assert_eq!(record.writing_point.file_index, 1);
    assert_eq!(record.writing_point.byte_offset, 4);
}

#[test]
fn wraparound_overwrites_first_slot_of_file_zero() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();
    writer.initialize(config(temp_dir.path(), 4, 2, 2));

    // Capacity is 4 samples; the 5th wraps around to file 0, slot 0.
    for byte in 1..=5u8 {
        writer.add_sample(&[byte; 4], false);
    }
    writer.terminate();

    let dirs = ring_dirs(temp_dir.path());
    assert_eq!(dirs.len(), 1);

    let mut expected0 = vec![5u8; 4];
    expected0.extend_from_slice(&[2u8; 4]);
    assert_eq!(fs::read(dirs[0].join("buffer0.dat")).unwrap(), expected0);

    let mut expected1 = vec![3u8; 4];
    expected1.extend_from_slice(&[4u8; 4]);
    assert_eq!(fs::read(dirs[0].join("buffer1.dat")).unwrap(), expected1);

    let record = read_manifest(&dirs[0]);
    assert_eq!(record.writing_point.file_index, 0);
    assert_eq!(record.writing_point.byte_offset, 4);
}

#[test]
fn degenerate_configuration_is_clamped_not_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();
    writer.initialize(config(temp_dir.path(), 0, 0, 0));

    writer.add_sample(&[0x42], false);
    writer.terminate();

    let dirs = ring_dirs(temp_dir.path());
    assert_eq!(dirs.len(), 1);
    assert_eq!(fs::read(dirs[0].join("buffer0.dat")).unwrap(), vec![0x42]);

    let record = read_manifest(&dirs[0]);
    assert_eq!(record.bytes_per_sample, 1);
    assert_eq!(record.bytes_per_file, 1);
    assert_eq!(record.files_per_ringbuffer, 1);
}

#[test]
fn short_and_long_inputs_keep_slots_fixed_size() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();
    writer.initialize(config(temp_dir.path(), 4, 4, 1));

    writer.add_sample(&[0xAA], false); // zero-padded
    writer.add_sample(&[0xBB; 8], false); // truncated
    writer.terminate();

    let dirs = ring_dirs(temp_dir.path());
    let contents = fs::read(dirs[0].join("buffer0.dat")).unwrap();
    assert_eq!(contents, vec![0xAA, 0, 0, 0, 0xBB, 0xBB, 0xBB, 0xBB]);
}

// =============================================================================
// Rotation
// =============================================================================

#[test]
fn rotation_sample_is_first_in_new_directory() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();
    writer.initialize(config(temp_dir.path(), 4, 2, 2));

    writer.add_sample(&[0x01; 4], false);
    writer.add_sample(&[0x02; 4], false);
    writer.add_sample(&[0x03; 4], true);
    writer.add_sample(&[0x04; 4], false);
    writer.terminate();

    let dirs = ring_dirs(temp_dir.path());
    assert_eq!(dirs.len(), 2);
    assert!(ring_counter(&dirs[0]) < ring_counter(&dirs[1]));

    // First instance holds exactly the two samples before the rotation
    // request; its descriptor records the cursor after those writes.
    let mut expected = vec![0x01u8; 4];
    expected.extend_from_slice(&[0x02; 4]);
    assert_eq!(fs::read(dirs[0].join("buffer0.dat")).unwrap(), expected);
    let first = read_manifest(&dirs[0]);
    assert_eq!(first.writing_point.file_index, 1);
    assert_eq!(first.writing_point.byte_offset, 0);

    // The rotation-carrying sample opens the second instance.
    let mut expected = vec![0x03u8; 4];
    expected.extend_from_slice(&[0x04; 4]);
    assert_eq!(fs::read(dirs[1].join("buffer0.dat")).unwrap(), expected);
}

#[test]
fn rotation_on_very_first_sample_closes_empty_instance() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();
    writer.initialize(config(temp_dir.path(), 4, 2, 2));

    // The lazy open creates an instance before the flag is seen, so the
    // flagged sample lands in a second, fresh instance.
    writer.add_sample(&[0x01; 4], true);
    writer.terminate();

    let dirs = ring_dirs(temp_dir.path());
    assert_eq!(dirs.len(), 2);

    let empty = read_manifest(&dirs[0]);
    assert_eq!(empty.writing_point.file_index, 0);
    assert_eq!(empty.writing_point.byte_offset, 0);
    assert_eq!(fs::metadata(dirs[0].join("buffer0.dat")).unwrap().len(), 0);

    assert_eq!(fs::read(dirs[1].join("buffer0.dat")).unwrap(), vec![0x01; 4]);
}

// =============================================================================
// Concurrency and shutdown
// =============================================================================

#[test]
fn concurrent_producer_loses_and_duplicates_nothing() {
    const SAMPLES: usize = 1000;

    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();
    // Capacity comfortably above SAMPLES so nothing wraps.
    writer.initialize(config(temp_dir.path(), 8, 2048, 2));

    // The producer runs here while the writer thread drains behind it.
    for i in 0..SAMPLES as u64 {
        writer.add_sample(&i.to_le_bytes(), false);
    }
    writer.terminate();

    let dirs = ring_dirs(temp_dir.path());
    assert_eq!(dirs.len(), 1);

    // All samples fit in file 0; exactly N slots, in enqueue order.
    let contents = fs::read(dirs[0].join("buffer0.dat")).unwrap();
    assert_eq!(contents.len(), SAMPLES * 8);
    for (i, slot) in contents.chunks_exact(8).enumerate() {
        assert_eq!(u64::from_le_bytes(slot.try_into().unwrap()), i as u64);
    }
    assert_eq!(fs::metadata(dirs[0].join("buffer1.dat")).unwrap().len(), 0);

    let record = read_manifest(&dirs[0]);
    assert_eq!(record.writing_point.file_index, 0);
    assert_eq!(record.writing_point.byte_offset, (SAMPLES * 8) as u64);
}

#[test]
fn terminate_flushes_everything_still_queued() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();
    writer.initialize(config(temp_dir.path(), 4, 100, 1));

    // Enqueue a burst and terminate immediately; the shutdown path must
    // drain whatever the worker had not reached yet.
    for byte in 0..50u8 {
        writer.add_sample(&[byte; 4], false);
    }
    writer.terminate();
    assert_eq!(writer.pending_samples(), 0);

    let dirs = ring_dirs(temp_dir.path());
    let contents = fs::read(dirs[0].join("buffer0.dat")).unwrap();
    assert_eq!(contents.len(), 50 * 4);
    for (i, slot) in contents.chunks_exact(4).enumerate() {
        assert_eq!(slot, &[i as u8; 4]);
    }
}

#[test]
fn is_open_tracks_instance_lifecycle() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();
    writer.initialize(config(temp_dir.path(), 4, 2, 2));

    // Lazy open: nothing on disk until the first sample arrives.
    assert!(!writer.is_open());
    assert!(ring_dirs(temp_dir.path()).is_empty());

    writer.add_sample(&[0x01; 4], false);
    assert!(wait_until(Duration::from_secs(2), || writer.is_open()));

    writer.terminate();
    assert!(!writer.is_open());
}

// =============================================================================
// Instance counter lifecycle
// =============================================================================

#[test]
fn counter_continues_across_reinitialize() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut writer = RingWriter::new();

    writer.initialize(config(temp_dir.path(), 4, 2, 2));
    writer.add_sample(&[0x01; 4], false);
    writer.terminate();

    // A session without samples opens no instance and burns no counter.
    writer.initialize(config(temp_dir.path(), 4, 2, 2));
    writer.terminate();

    writer.initialize(config(temp_dir.path(), 4, 2, 2));
    writer.add_sample(&[0x02; 4], false);
    writer.terminate();

    let dirs = ring_dirs(temp_dir.path());
    assert_eq!(dirs.len(), 2);
    let counters: Vec<u64> = dirs.iter().map(|d| ring_counter(d)).collect();
    assert_eq!(counters, vec![1, 2]);
}

#[test]
fn drop_terminates_and_flushes() {
    let temp_dir = tempfile::tempdir().unwrap();

    {
        let mut writer = RingWriter::new();
        writer.initialize(config(temp_dir.path(), 4, 8, 1));
        writer.add_sample(&[0x5A; 4], false);
    }

    let dirs = ring_dirs(temp_dir.path());
    assert_eq!(dirs.len(), 1);
    assert_eq!(fs::read(dirs[0].join("buffer0.dat")).unwrap(), vec![0x5A; 4]);
    assert!(dirs[0].join(COMPLETION_FILE).is_file());
}
