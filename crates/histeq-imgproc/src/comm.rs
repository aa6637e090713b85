use std::sync::mpsc::{channel, Receiver, Sender};

use histeq_image::ImageSize;

use crate::histogram::Histogram;
use crate::lut::Lut;

/// Errors raised by point-to-point messaging and the collectives.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CommError {
    /// A world needs at least one rank.
    #[error("world size must be > 0, got {0}")]
    InvalidWorldSize(usize),

    /// The rank does not exist in this world.
    #[error("rank {rank} is out of range for a world of size {size}")]
    InvalidRank {
        /// the offending rank.
        rank: usize,
        /// number of ranks in the world.
        size: usize,
    },

    /// A peer gave up and asked every rank to stop.
    #[error("rank {0} aborted the computation")]
    Aborted(usize),

    /// A peer went away without aborting, e.g. because it panicked.
    #[error("rank {0} disconnected")]
    Disconnected(usize),

    /// A peer sent a message that does not belong to the running collective.
    #[error("expected {expected} from rank {rank}, got {got}")]
    UnexpectedMessage {
        /// the message kind the collective waits for.
        expected: &'static str,
        /// the message kind that arrived.
        got: &'static str,
        /// the sender.
        rank: usize,
    },

    /// The root of a collective was called without the value to distribute.
    #[error("rank {0} is the root and must provide the value to distribute")]
    MissingRootValue(usize),

    /// A scatter received a number of chunks different from the world size.
    #[error("scatter needs {expected} chunks, got {got}")]
    ChunkCountMismatch {
        /// world size.
        expected: usize,
        /// number of chunks given.
        got: usize,
    },

    /// A rank thread panicked.
    #[error("rank {0} panicked")]
    RankPanicked(usize),
}

/// The payloads exchanged between ranks.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Image geometry announced by the coordinator.
    Geometry(ImageSize),
    /// A contiguous block of rows.
    Rows(Vec<u8>),
    /// A partial or global histogram.
    Histogram(Histogram),
    /// The lookup table to apply.
    Lut(Lut),
    /// Stop the computation.
    Abort,
}

impl Message {
    /// Short name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Geometry(_) => "geometry",
            Message::Rows(_) => "rows",
            Message::Histogram(_) => "histogram",
            Message::Lut(_) => "lut",
            Message::Abort => "abort",
        }
    }

    fn unexpected(self, expected: &'static str, rank: usize) -> CommError {
        CommError::UnexpectedMessage {
            expected,
            got: self.kind(),
            rank,
        }
    }

    /// Unwrap a [`Message::Geometry`] received from `rank`.
    pub fn into_geometry(self, rank: usize) -> Result<ImageSize, CommError> {
        match self {
            Message::Geometry(size) => Ok(size),
            other => Err(other.unexpected("geometry", rank)),
        }
    }

    /// Unwrap a [`Message::Rows`] received from `rank`.
    pub fn into_rows(self, rank: usize) -> Result<Vec<u8>, CommError> {
        match self {
            Message::Rows(rows) => Ok(rows),
            other => Err(other.unexpected("rows", rank)),
        }
    }

    /// Unwrap a [`Message::Histogram`] received from `rank`.
    pub fn into_histogram(self, rank: usize) -> Result<Histogram, CommError> {
        match self {
            Message::Histogram(hist) => Ok(hist),
            other => Err(other.unexpected("histogram", rank)),
        }
    }

    /// Unwrap a [`Message::Lut`] received from `rank`.
    pub fn into_lut(self, rank: usize) -> Result<Lut, CommError> {
        match self {
            Message::Lut(lut) => Ok(lut),
            other => Err(other.unexpected("lut", rank)),
        }
    }
}

/// One endpoint of a world of ranks that share nothing but messages.
///
/// Implementors provide point-to-point delivery; the collectives are built on top of it and are
/// synchronous: a rank does not return from a collective before it has received what it needs
/// from its peers. Every rank of a world must call the same collectives in the same order.
pub trait Communicator {
    /// Index of this endpoint in the world.
    fn rank(&self) -> usize;

    /// Number of ranks in the world.
    fn size(&self) -> usize;

    /// Deliver `msg` to `dest`.
    fn send(&self, dest: usize, msg: Message) -> Result<(), CommError>;

    /// Block until the next message from `source` arrives, abort messages included.
    fn recv_any(&self, source: usize) -> Result<Message, CommError>;

    /// Ask every other rank to stop. Delivery failures are ignored since the peer is gone.
    fn abort(&self) {
        log::warn!("rank {} aborting the world", self.rank());
        for dest in (0..self.size()).filter(|&r| r != self.rank()) {
            let _ = self.send(dest, Message::Abort);
        }
    }

    /// Block until the next message from `source`, turning an abort into an error.
    fn recv(&self, source: usize) -> Result<Message, CommError> {
        match self.recv_any(source)? {
            Message::Abort => Err(CommError::Aborted(source)),
            msg => Ok(msg),
        }
    }

    /// Send `value` from `root` to every rank; every rank returns the same value.
    fn broadcast(&self, root: usize, value: Option<Message>) -> Result<Message, CommError> {
        check_rank(root, self.size())?;
        if self.rank() != root {
            return self.recv(root);
        }

        let value = value.ok_or(CommError::MissingRootValue(root))?;
        for dest in (0..self.size()).filter(|&r| r != root) {
            self.send(dest, value.clone())?;
        }
        log::debug!("rank {root} broadcast {}", value.kind());
        Ok(value)
    }

    /// Send `chunks[i]` from `root` to rank `i`; every rank returns its own chunk.
    fn scatter(&self, root: usize, chunks: Option<Vec<Message>>) -> Result<Message, CommError> {
        check_rank(root, self.size())?;
        if self.rank() != root {
            return self.recv(root);
        }

        let chunks = chunks.ok_or(CommError::MissingRootValue(root))?;
        if chunks.len() != self.size() {
            return Err(CommError::ChunkCountMismatch {
                expected: self.size(),
                got: chunks.len(),
            });
        }

        let mut own = None;
        for (dest, chunk) in chunks.into_iter().enumerate() {
            if dest == root {
                own = Some(chunk);
            } else {
                self.send(dest, chunk)?;
            }
        }
        log::debug!("rank {root} scattered {} chunks", self.size());
        own.ok_or(CommError::MissingRootValue(root))
    }

    /// Collect one value per rank at `root`, ordered by rank.
    ///
    /// Returns `Some` on the root and `None` everywhere else.
    fn gather(&self, root: usize, value: Message) -> Result<Option<Vec<Message>>, CommError> {
        check_rank(root, self.size())?;
        if self.rank() != root {
            self.send(root, value)?;
            return Ok(None);
        }

        let mut values = Vec::with_capacity(self.size());
        let mut own = Some(value);
        for source in 0..self.size() {
            if source == root {
                values.extend(own.take());
            } else {
                values.push(self.recv(source)?);
            }
        }
        log::debug!("rank {root} gathered {} values", values.len());
        Ok(Some(values))
    }

    /// Sum the histograms of every rank bin by bin at `root`.
    ///
    /// Returns `Some` on the root and `None` everywhere else.
    fn reduce_sum(&self, root: usize, local: Histogram) -> Result<Option<Histogram>, CommError> {
        let Some(values) = self.gather(root, Message::Histogram(local))? else {
            return Ok(None);
        };

        let mut total = Histogram::new();
        for (source, value) in values.into_iter().enumerate() {
            total.merge(&value.into_histogram(source)?);
        }
        Ok(Some(total))
    }
}

fn check_rank(rank: usize, size: usize) -> Result<(), CommError> {
    if rank >= size {
        return Err(CommError::InvalidRank { rank, size });
    }
    Ok(())
}

/// A [`Communicator`] backed by one in-memory channel per ordered pair of ranks.
///
/// Messages are moved through the channels, so ranks never observe each other's buffers.
#[derive(Debug)]
pub struct ChannelComm {
    rank: usize,
    senders: Vec<Sender<Message>>,
    receivers: Vec<Receiver<Message>>,
}

impl Communicator for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn send(&self, dest: usize, msg: Message) -> Result<(), CommError> {
        let sender = self.senders.get(dest).ok_or(CommError::InvalidRank {
            rank: dest,
            size: self.size(),
        })?;
        sender.send(msg).map_err(|_| CommError::Disconnected(dest))
    }

    fn recv_any(&self, source: usize) -> Result<Message, CommError> {
        let receiver = self.receivers.get(source).ok_or(CommError::InvalidRank {
            rank: source,
            size: self.size(),
        })?;
        receiver.recv().map_err(|_| CommError::Disconnected(source))
    }
}

/// Create the endpoints of a world of `size` ranks, ordered by rank.
///
/// # Errors
///
/// Returns an error if `size` is zero.
pub fn channel_world(size: usize) -> Result<Vec<ChannelComm>, CommError> {
    if size == 0 {
        return Err(CommError::InvalidWorldSize(size));
    }

    let mut senders: Vec<Vec<Sender<Message>>> = (0..size).map(|_| Vec::new()).collect();
    let mut receivers: Vec<Vec<Receiver<Message>>> = (0..size).map(|_| Vec::new()).collect();
    for src in 0..size {
        for dst in 0..size {
            let (tx, rx) = channel();
            senders[src].push(tx);
            receivers[dst].push(rx);
        }
    }

    Ok(senders
        .into_iter()
        .zip(receivers)
        .enumerate()
        .map(|(rank, (senders, receivers))| ChannelComm {
            rank,
            senders,
            receivers,
        })
        .collect())
}

/// Run `f` once per rank, each on its own thread with its own endpoint and input.
///
/// `inputs[i]` is moved into rank `i`; the world size is `inputs.len()`. Returns the per-rank
/// results ordered by rank once every rank has returned.
///
/// # Errors
///
/// Returns an error if `inputs` is empty or a rank panicked.
///
/// # Example
///
/// ```
/// use histeq_imgproc::comm::{run_world, Communicator};
/// use histeq_imgproc::histogram::Histogram;
///
/// let results = run_world(vec![vec![1u8], vec![2, 2], vec![3]], |comm, pixels| {
///     comm.reduce_sum(0, Histogram::from_pixels(&pixels))
/// })
/// .unwrap();
///
/// let total = results[0].as_ref().unwrap().unwrap();
/// assert_eq!(total.total(), 4);
/// assert_eq!(total[2], 2);
/// assert!(results[1].as_ref().unwrap().is_none());
/// ```
pub fn run_world<I, R, F>(inputs: Vec<I>, f: F) -> Result<Vec<R>, CommError>
where
    I: Send,
    R: Send,
    F: Fn(ChannelComm, I) -> R + Sync,
{
    let comms = channel_world(inputs.len())?;
    let f = &f;

    std::thread::scope(|s| {
        let handles = comms
            .into_iter()
            .zip(inputs)
            .map(|(comm, input)| s.spawn(move || f(comm, input)))
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .enumerate()
            .map(|(rank, handle)| handle.join().map_err(|_| CommError::RankPanicked(rank)))
            .collect()
    })
}
