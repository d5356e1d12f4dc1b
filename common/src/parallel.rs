//! Order-preserving parallel helpers on top of rayon.

use rayon::prelude::*;

/// Multiplier for number of chunks relative to CPU threads.
/// Using 2x threads provides good load balancing when some chunks finish faster.
const CHUNKS_PER_THREAD: usize = 2;

/// Fills `data[i] = f(i)` in parallel.
pub fn parallel_chunked<T, F>(data: &mut [T], f: F)
where
    T: Send + Sync,
    F: Fn(usize) -> T + Sync + Send,
{
    if data.is_empty() {
        return;
    }

    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    let chunk_size = (data.len() / num_chunks).max(1);

    data.par_chunks_mut(chunk_size)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let start_idx = chunk_idx * chunk_size;
            for (i, val) in chunk.iter_mut().enumerate() {
                *val = f(start_idx + i);
            }
        });
}

/// Maps `f` over `items` on the rayon pool and returns results in input order.
///
/// Fails with one of the errors produced if any call fails; which one is
/// unspecified when several calls fail.
pub fn try_par_map<T, R, E, F>(items: &[T], f: F) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync + Send,
{
    items.par_iter().map(f).collect()
}
