//! Append-only flat L2 vector index with a checksummed binary snapshot.
//!
//! Snapshot layout, all integers little-endian:
//!
//! | bytes | field |
//! | --- | --- |
//! | 4 | magic `SCVI` |
//! | 2 | format version |
//! | 4 | dimension |
//! | 4 | vector count |
//! | count * dimension * 4 | `f32` slab in slot order |
//! | 32 | BLAKE3 digest of every preceding byte |

use std::{
	cmp::Ordering,
	collections::BinaryHeap,
	fs::{self, File},
	io::{self, Write},
	path::{Path, PathBuf},
};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"SCVI";
pub const SNAPSHOT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 4 + 4;
const DIGEST_LEN: usize = blake3::OUT_LEN;

/// Position of a vector inside the index. Assigned on append and never reused.
pub type Slot = u32;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
	#[error("Vector dimension mismatch: expected {expected}, got {actual}.")]
	DimensionMismatch { expected: u32, actual: usize },
	#[error("Vector index is empty.")]
	EmptyIndex,
	#[error("Vector index cannot hold more than {max} vectors.")]
	Capacity { max: u64 },
	#[error(transparent)]
	Load(#[from] LoadFailure),
	#[error("Failed to persist vector index snapshot to {path:?}.")]
	Persist { path: PathBuf, source: io::Error },
}

/// Why a snapshot could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadFailure {
	#[error("Vector index snapshot {path:?} does not exist.")]
	Missing { path: PathBuf },
	#[error("Failed to read vector index snapshot {path:?}.")]
	Unreadable { path: PathBuf, source: io::Error },
	#[error("Vector index snapshot {path:?} is corrupt: {reason}.")]
	Corrupt { path: PathBuf, reason: String },
	#[error("Vector index snapshot {path:?} has dimension {actual}, expected {expected}.")]
	DimensionMismatch { path: PathBuf, expected: u32, actual: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexHit {
	pub slot: Slot,
	/// Squared Euclidean distance to the query.
	pub distance: f32,
}
impl IndexHit {
	/// Maps distance into `(0, 1]`, strictly decreasing as the distance grows.
	pub fn score(&self) -> f32 {
		similarity(self.distance)
	}
}

/// Maps a squared distance into `[0, 1]`. A NaN distance scores zero.
pub fn similarity(distance: f32) -> f32 {
	if distance.is_nan() {
		return 0.0;
	}

	1.0 / (1.0 + distance.max(0.0))
}

#[derive(Clone, Debug, PartialEq)]
pub struct VectorIndex {
	dim: u32,
	count: usize,
	data: Vec<f32>,
}
impl VectorIndex {
	pub fn new(dim: u32) -> Self {
		Self { dim, count: 0, data: Vec::new() }
	}

	pub fn dim(&self) -> u32 {
		self.dim
	}

	pub fn len(&self) -> usize {
		self.count
	}

	pub fn is_empty(&self) -> bool {
		self.count == 0
	}

	/// Slot the next appended vector will receive.
	pub fn next_slot(&self) -> Slot {
		self.count as Slot
	}

	/// Appends `vectors` in order. Nothing is appended unless every vector has the index dimension.
	pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<Vec<Slot>, IndexError> {
		for vector in vectors {
			if vector.len() != self.dim as usize {
				return Err(IndexError::DimensionMismatch {
					expected: self.dim,
					actual: vector.len(),
				});
			}
		}

		let total = self.count + vectors.len();

		if total > Slot::MAX as usize {
			return Err(IndexError::Capacity { max: Slot::MAX as u64 });
		}

		let first = self.count as Slot;

		self.data.reserve(vectors.len() * self.dim as usize);

		for vector in vectors {
			self.data.extend_from_slice(vector);
		}

		self.count = total;

		Ok((first..first + vectors.len() as Slot).collect())
	}

	/// Exact k-nearest search. Hits are ordered by ascending distance, ties by ascending slot.
	pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, IndexError> {
		if query.len() != self.dim as usize {
			return Err(IndexError::DimensionMismatch { expected: self.dim, actual: query.len() });
		}
		if self.is_empty() {
			return Err(IndexError::EmptyIndex);
		}
		if k == 0 {
			return Ok(Vec::new());
		}

		let k = k.min(self.count);
		let mut heap = BinaryHeap::with_capacity(k + 1);

		for (slot, vector) in self.data.chunks_exact(self.dim as usize).enumerate() {
			heap.push(Candidate { distance: squared_l2(vector, query), slot: slot as Slot });

			if heap.len() > k {
				heap.pop();
			}
		}

		Ok(heap
			.into_sorted_vec()
			.into_iter()
			.map(|candidate| IndexHit { slot: candidate.slot, distance: candidate.distance })
			.collect())
	}

	pub fn vector(&self, slot: Slot) -> Option<&[f32]> {
		let slot = slot as usize;

		if slot >= self.count {
			return None;
		}

		let dim = self.dim as usize;

		Some(&self.data[slot * dim..(slot + 1) * dim])
	}

	/// Encodes the current contents. The result can be written after the index lock is released.
	pub fn snapshot(&self) -> Snapshot {
		Snapshot { bytes: self.encode(), vectors: self.count }
	}

	pub fn persist(&self, path: &Path) -> Result<(), IndexError> {
		self.snapshot().write(path)
	}

	pub fn load(path: &Path, expected_dim: u32) -> Result<Self, LoadFailure> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == io::ErrorKind::NotFound =>
				return Err(LoadFailure::Missing { path: path.to_path_buf() }),
			Err(err) =>
				return Err(LoadFailure::Unreadable { path: path.to_path_buf(), source: err }),
		};
		let index = Self::decode(&bytes)
			.map_err(|reason| LoadFailure::Corrupt { path: path.to_path_buf(), reason })?;

		if index.dim != expected_dim {
			return Err(LoadFailure::DimensionMismatch {
				path: path.to_path_buf(),
				expected: expected_dim,
				actual: index.dim,
			});
		}

		Ok(index)
	}

	/// Loads the snapshot, starting from an empty index when it is missing or corrupt.
	///
	/// A readable snapshot of another dimension is an error: the configured embedding model
	/// changed and every stored slot would be meaningless.
	pub fn load_or_new(path: &Path, dim: u32) -> Result<Self, IndexError> {
		match Self::load(path, dim) {
			Ok(index) => {
				tracing::info!(path = %path.display(), vectors = index.len(), "Vector index loaded.");

				Ok(index)
			},
			Err(LoadFailure::Missing { .. }) => {
				tracing::info!(
					path = %path.display(),
					"No vector index snapshot found. Starting empty."
				);

				Ok(Self::new(dim))
			},
			Err(err @ LoadFailure::Corrupt { .. }) => {
				tracing::warn!(
					error = %err,
					"Discarding unusable vector index snapshot. Starting empty."
				);

				Ok(Self::new(dim))
			},
			Err(err) => Err(err.into()),
		}
	}

	fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::with_capacity(HEADER_LEN + self.data.len() * 4 + DIGEST_LEN);

		buf.extend_from_slice(&SNAPSHOT_MAGIC);
		buf.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
		buf.extend_from_slice(&self.dim.to_le_bytes());
		buf.extend_from_slice(&(self.count as u32).to_le_bytes());

		for value in &self.data {
			buf.extend_from_slice(&value.to_le_bytes());
		}

		let digest = blake3::hash(&buf);

		buf.extend_from_slice(digest.as_bytes());

		buf
	}

	fn decode(bytes: &[u8]) -> Result<Self, String> {
		if bytes.len() < HEADER_LEN + DIGEST_LEN {
			return Err(format!("snapshot is truncated at {} bytes", bytes.len()));
		}

		let (body, digest) = bytes.split_at(bytes.len() - DIGEST_LEN);

		if blake3::hash(body).as_bytes() != digest {
			return Err("checksum mismatch".to_string());
		}
		if body[0..4] != SNAPSHOT_MAGIC {
			return Err("bad magic".to_string());
		}

		let version = u16::from_le_bytes([body[4], body[5]]);

		if version != SNAPSHOT_VERSION {
			return Err(format!("unsupported version {version}"));
		}

		let dim = u32::from_le_bytes([body[6], body[7], body[8], body[9]]);
		let count = u32::from_le_bytes([body[10], body[11], body[12], body[13]]) as usize;
		let slab = &body[HEADER_LEN..];
		let expected_len = (dim as usize)
			.checked_mul(count)
			.and_then(|values| values.checked_mul(4))
			.ok_or_else(|| "vector slab size overflows".to_string())?;

		if slab.len() != expected_len {
			return Err(format!("vector slab is {} bytes, expected {expected_len}", slab.len()));
		}
		if dim == 0 && count > 0 {
			return Err("zero dimension with non-zero count".to_string());
		}

		let data = slab
			.chunks_exact(4)
			.map(|raw| f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
			.collect();

		Ok(Self { dim, count, data })
	}
}

/// Encoded snapshot bytes, detached from the index they were taken from.
#[derive(Clone, Debug)]
pub struct Snapshot {
	bytes: Vec<u8>,
	vectors: usize,
}
impl Snapshot {
	pub fn vectors(&self) -> usize {
		self.vectors
	}

	/// Writes to a sibling temp file, syncs it, then renames it over `path`. Blocking.
	pub fn write(&self, path: &Path) -> Result<(), IndexError> {
		let persist_err = |source| IndexError::Persist { path: path.to_path_buf(), source };
		let parent = path
			.parent()
			.filter(|parent| !parent.as_os_str().is_empty())
			.unwrap_or_else(|| Path::new("."));

		fs::create_dir_all(parent).map_err(persist_err)?;

		let temp_path = temp_path_for(path);
		let mut file = File::create(&temp_path).map_err(persist_err)?;

		file.write_all(&self.bytes).map_err(persist_err)?;
		file.sync_all().map_err(persist_err)?;

		drop(file);

		if let Err(err) = fs::rename(&temp_path, path) {
			let _ = fs::remove_file(&temp_path);

			return Err(persist_err(err));
		}

		sync_dir(parent).map_err(persist_err)?;

		tracing::debug!(
			path = %path.display(),
			vectors = self.vectors,
			"Vector index snapshot persisted."
		);

		Ok(())
	}
}

#[derive(Debug)]
struct Candidate {
	distance: f32,
	slot: Slot,
}
impl PartialEq for Candidate {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for Candidate {
	fn cmp(&self, other: &Self) -> Ordering {
		self.distance.total_cmp(&other.distance).then_with(|| self.slot.cmp(&other.slot))
	}
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn temp_path_for(path: &Path) -> PathBuf {
	let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();

	name.push(".tmp");

	path.with_file_name(name)
}

fn sync_dir(path: &Path) -> io::Result<()> {
	File::open(path)?.sync_all()
}
