//! Sequential disk throughput check, run after the session so it never
//! perturbs the thermal measurement.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::constants::{DISK_BENCH_BLOCK_KB, DISK_BENCH_FILE};

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("benchmark size must be at least one block")]
    TooSmall,
    #[error("disk benchmark I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Sequential write (with fsync) and read throughput.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiskBenchResult {
    pub size_bytes: u64,
    pub write_mb_s: f64,
    pub read_mb_s: f64,
}

/// Removes the scratch file however the benchmark ends.
struct ScratchFile<'a>(&'a Path);

impl Drop for ScratchFile<'_> {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("could not remove {}: {}", self.0.display(), e);
            }
        }
    }
}

/// Benchmark block filled with non-repeating bytes so compressing
/// controllers cannot shortcut the write.
fn fill_block(len: usize) -> Vec<u8> {
    let mut x = 0x2545_F491_4F6C_DD1D_u64;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            (x >> 24) as u8
        })
        .collect()
}

fn mb_per_sec(bytes: u64, secs: f64) -> f64 {
    let mb = bytes as f64 / MIB as f64;
    (mb / secs.max(1e-6) * 10.0).round() / 10.0
}

/// Write then read `size_mb` MiB in `DISK_BENCH_BLOCK_KB` blocks inside `dir`.
pub fn run_disk_benchmark(dir: &Path, size_mb: u64) -> Result<DiskBenchResult, BenchmarkError> {
    let block_len = DISK_BENCH_BLOCK_KB * 1024;
    let total = size_mb * MIB;
    let blocks = total / block_len as u64;
    if blocks == 0 {
        return Err(BenchmarkError::TooSmall);
    }

    let path = dir.join(DISK_BENCH_FILE);
    let io_err = |source| BenchmarkError::Io {
        path: path.clone(),
        source,
    };
    let _scratch = ScratchFile(&path);
    let block = fill_block(block_len);

    log::info!("disk benchmark: {} MiB in {}", size_mb, dir.display());

    let started = Instant::now();
    {
        let mut f = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(io_err)?;
        for _ in 0..blocks {
            f.write_all(&block).map_err(io_err)?;
        }
        f.sync_all().map_err(io_err)?;
    }
    let write_secs = started.elapsed().as_secs_f64();

    let started = Instant::now();
    let mut read_total = 0u64;
    {
        let mut f = File::open(&path).map_err(io_err)?;
        let mut buf = vec![0u8; block_len];
        loop {
            let n = f.read(&mut buf).map_err(io_err)?;
            if n == 0 {
                break;
            }
            read_total += n as u64;
        }
    }
    let read_secs = started.elapsed().as_secs_f64();

    let written = blocks * block_len as u64;
    let result = DiskBenchResult {
        size_bytes: written,
        write_mb_s: mb_per_sec(written, write_secs),
        read_mb_s: mb_per_sec(read_total, read_secs),
    };
    log::info!(
        "disk benchmark: write {:.1} MB/s, read {:.1} MB/s",
        result.write_mb_s,
        result.read_mb_s
    );
    Ok(result)
}
