use histeq_image::{partition_rows, Image};

use super::{derive_map, ensure_not_empty, EqualizeError, EqualizeOutput, Equalizer};
use crate::comm::{run_world, CommError, Communicator, Message};
use crate::histogram::{compute_histogram, Histogram};

/// The rank that owns the input image and assembles the result.
pub const COORDINATOR: usize = 0;

/// How the coordinator obtains the histogram of the equalized image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PostHistogram {
    /// Scan the reassembled image after the gather.
    #[default]
    Scan,
    /// Sum per-rank histograms of the mapped blocks, like the pre histogram.
    Reduce,
}

/// Equalizes with a world of ranks that only exchange messages.
///
/// Each call spawns a fresh world of `num_ranks` ranks. The image is moved into the coordinator,
/// which scatters row blocks, reduces the per-rank histograms, broadcasts the lookup table and
/// gathers the mapped blocks back.
#[derive(Clone, Copy, Debug)]
pub struct DistributedEqualizer {
    num_ranks: usize,
    post_histogram: PostHistogram,
}

impl DistributedEqualizer {
    /// Create an equalizer that runs on `num_ranks` ranks.
    pub fn new(num_ranks: usize) -> Self {
        Self {
            num_ranks,
            post_histogram: PostHistogram::default(),
        }
    }

    /// Select how the post histogram is computed.
    pub fn with_post_histogram(mut self, post_histogram: PostHistogram) -> Self {
        self.post_histogram = post_histogram;
        self
    }

    /// Number of ranks, coordinator included.
    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }
}

impl Equalizer for DistributedEqualizer {
    fn equalize(&self, image: Image<u8, 1>) -> Result<EqualizeOutput, EqualizeError> {
        if self.num_ranks == 0 {
            return Err(CommError::InvalidWorldSize(self.num_ranks).into());
        }

        let mut inputs = Vec::with_capacity(self.num_ranks);
        inputs.push(Some(image));
        inputs.extend((1..self.num_ranks).map(|_| None));

        let post = self.post_histogram;
        let results = run_world(inputs, |comm, image| equalize_rank(&comm, image, post))?;
        coordinator_output(results)
    }
}

/// Pick the coordinator's output out of the per-rank results.
///
/// The coordinator's own error wins, since the other ranks only report that it aborted. When the
/// coordinator was itself aborted by a worker, the error of that worker is returned instead.
pub fn coordinator_output(
    results: Vec<Result<Option<EqualizeOutput>, EqualizeError>>,
) -> Result<EqualizeOutput, EqualizeError> {
    let aborted_by = match results.first() {
        Some(Err(EqualizeError::Comm(CommError::Aborted(source)))) => Some(*source),
        _ => None,
    };
    if let Some(source) = aborted_by {
        if let Some(Err(cause)) = results.into_iter().nth(source) {
            return Err(cause);
        }
        return Err(CommError::Aborted(source).into());
    }

    let mut results = results.into_iter();
    let coordinator = results
        .next()
        .ok_or(CommError::InvalidWorldSize(0))??;
    for res in results {
        res?;
    }
    coordinator.ok_or_else(|| CommError::MissingRootValue(COORDINATOR).into())
}

/// The program every rank runs.
///
/// The coordinator passes the image and returns `Some` output; the other ranks pass `None` and
/// return `None`. A rank that fails aborts the world so no peer stays blocked in a collective.
///
/// # Errors
///
/// Returns an error if the coordinator has no image or an empty one, if any collective fails,
/// or if a peer aborted.
pub fn equalize_rank<C: Communicator>(
    comm: &C,
    image: Option<Image<u8, 1>>,
    post: PostHistogram,
) -> Result<Option<EqualizeOutput>, EqualizeError> {
    let res = rank_program(comm, image, post);
    if let Err(e) = &res {
        if !matches!(
            e,
            EqualizeError::Comm(CommError::Aborted(_) | CommError::Disconnected(_))
        ) {
            log::warn!("rank {} failed: {e}", comm.rank());
            comm.abort();
        }
    }
    res
}

fn rank_program<C: Communicator>(
    comm: &C,
    image: Option<Image<u8, 1>>,
    post: PostHistogram,
) -> Result<Option<EqualizeOutput>, EqualizeError> {
    let rank = comm.rank();
    let is_coordinator = rank == COORDINATOR;

    // geometry is all every rank needs to lay out the partitions
    let image = if is_coordinator {
        let image = image.ok_or(CommError::MissingRootValue(COORDINATOR))?;
        ensure_not_empty(&image)?;
        Some(image)
    } else {
        None
    };
    let geometry = image.as_ref().map(|img| Message::Geometry(img.size()));
    let size = comm
        .broadcast(COORDINATOR, geometry)?
        .into_geometry(COORDINATOR)?;

    let parts = partition_rows(size.height, comm.size())?;
    let own = parts.get(rank).copied().ok_or(CommError::InvalidRank {
        rank,
        size: comm.size(),
    })?;
    log::debug!("rank {rank}: rows [{}, {})", own.offset, own.end());

    let chunks = match &image {
        Some(image) => Some(
            image
                .row_blocks(&parts)?
                .into_iter()
                .map(|block| Message::Rows(block.to_vec()))
                .collect(),
        ),
        None => None,
    };
    drop(image);

    let mut block = comm.scatter(COORDINATOR, chunks)?.into_rows(COORDINATOR)?;
    if block.len() != own.count * size.width {
        return Err(EqualizeError::BlockSizeMismatch {
            rank,
            expected: own.count * size.width,
            got: block.len(),
        });
    }

    let hist_before = comm.reduce_sum(COORDINATOR, Histogram::from_pixels(&block))?;

    let lut = match &hist_before {
        Some(hist) => Some(Message::Lut(derive_map(hist, size.num_pixels())?.lut)),
        None => None,
    };
    let lut = comm.broadcast(COORDINATOR, lut)?.into_lut(COORDINATOR)?;
    lut.apply(&mut block);

    let reduced_after = match post {
        PostHistogram::Reduce => comm.reduce_sum(COORDINATOR, Histogram::from_pixels(&block))?,
        PostHistogram::Scan => None,
    };

    let Some(blocks) = comm.gather(COORDINATOR, Message::Rows(block))? else {
        return Ok(None);
    };

    let mut data = Vec::with_capacity(size.num_pixels());
    for (source, (msg, part)) in blocks.into_iter().zip(&parts).enumerate() {
        let rows = msg.into_rows(source)?;
        if rows.len() != part.count * size.width {
            return Err(EqualizeError::BlockSizeMismatch {
                rank: source,
                expected: part.count * size.width,
                got: rows.len(),
            });
        }
        data.extend_from_slice(&rows);
    }
    let image = Image::new(size, data)?;

    let hist_after = match reduced_after {
        Some(hist) => hist,
        None => compute_histogram(&image),
    };
    let hist_before = hist_before.ok_or(CommError::MissingRootValue(COORDINATOR))?;

    Ok(Some(EqualizeOutput {
        image,
        hist_before,
        hist_after,
    }))
}
