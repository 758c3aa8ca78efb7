//! Year-range partitioning across parallel workers

use std::ops::RangeInclusive;

/// Split `[first, last]` into `workers` contiguous, non-overlapping sub-ranges.
///
/// The first `total % workers` ranges get one extra element. When there are
/// more workers than elements the trailing ranges are empty (`start > end`).
/// `first > last` yields all-empty ranges.
pub fn partition(first: i64, last: i64, workers: usize) -> Vec<RangeInclusive<i64>> {
    let workers = workers.max(1);
    let total = (last - first + 1).max(0);
    let base = total / workers as i64;
    let remainder = total % workers as i64;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = first;
    for i in 0..workers as i64 {
        let len = if i < remainder { base + 1 } else { base };
        let end = start + len - 1;
        ranges.push(start..=end);
        start = end + 1;
    }
    ranges
}

/// Run `f(start, end)` once per sub-range of `[first, last]`.
///
/// One worker calls `f` inline on the calling thread. Otherwise a fresh
/// rayon pool with one thread per sub-range runs them concurrently and this
/// call blocks until every worker returns. Empty sub-ranges are skipped.
/// Workers report results through shared state captured by `f`.
pub fn run_partitioned<F>(workers: usize, first: i64, last: i64, f: F) -> anyhow::Result<()>
where
    F: Fn(i64, i64) + Sync,
{
    if workers <= 1 {
        if first <= last {
            f(first, last);
        }
        return Ok(());
    }

    let ranges: Vec<_> = partition(first, last, workers)
        .into_iter()
        .filter(|r| !r.is_empty())
        .collect();
    if ranges.is_empty() {
        return Ok(());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ranges.len())
        .thread_name(|i| format!("worker-{i}"))
        .build()?;

    let f = &f;
    pool.scope(|s| {
        for range in &ranges {
            let (start, end) = (*range.start(), *range.end());
            s.spawn(move |_| {
                log::debug!("worker {start}..={end} started");
                f(start, end);
                log::debug!("worker {start}..={end} finished");
            });
        }
    });
    Ok(())
}
