//! Block resolution, decompression and caching.
//!
//! A [`TileStore`] resolves a (tile x, tile y, sample) triple to a byte range
//! in the source file, runs the block through the image's codec, and — when
//! caching is enabled — memoizes decoded blocks by their addressing index.
//!
//! # Addressing
//!
//! With `per_row = ceil(width / tile_width)` and
//! `per_col = ceil(height / tile_height)`:
//!
//! - chunky: `index = y * per_row + x`
//! - planar: `index = sample * per_row * per_col + y * per_row + x`
//!
//! The index keys both the cache and the `block_offsets`/`block_byte_counts`
//! arrays.
//!
//! # Concurrency
//!
//! The async path may be driven by many tasks at once, and in chunky layout
//! several samples share one block. Concurrent requests for the same index
//! coalesce through a per-index pending cell so the underlying decompression
//! runs at most once per index while caching is enabled. With caching
//! disabled nothing is retained and every request re-decodes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::trace;

use crate::codec::BlockCodec;
use crate::descriptor::{ImageDescriptor, PlanarConfiguration};
use crate::error::{DecodeError, RasterError};

/// Decoded-block cache shared between the sync and async paths.
///
/// `blocks` holds completed blocks; `pending` carries one cell per index
/// currently being decoded so concurrent async callers join the same decode.
/// Entries are never evicted within the lifetime of an open image.
struct BlockCache {
    blocks: Mutex<HashMap<usize, Bytes>>,
    pending: tokio::sync::Mutex<HashMap<usize, Arc<OnceCell<Bytes>>>>,
}

impl BlockCache {
    fn new() -> Self {
        Self {
            blocks: Mutex::new(HashMap::new()),
            pending: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, index: usize) -> Option<Bytes> {
        self.blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index)
            .cloned()
    }

    fn insert(&self, index: usize, block: Bytes) {
        self.blocks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index, block);
    }
}

/// Resolves, decodes and memoizes the strips or tiles of one open image.
pub struct TileStore {
    descriptor: Arc<ImageDescriptor>,
    planar: PlanarConfiguration,
    source: Bytes,
    codec: Arc<dyn BlockCodec>,
    cache: Option<BlockCache>,
}

impl TileStore {
    /// Create a store over `source` for the blocks described by `descriptor`.
    ///
    /// When `cache` is false, every access re-decodes and nothing is retained.
    pub fn new(
        descriptor: Arc<ImageDescriptor>,
        planar: PlanarConfiguration,
        source: Bytes,
        codec: Arc<dyn BlockCodec>,
        cache: bool,
    ) -> Self {
        Self {
            descriptor,
            planar,
            source,
            codec,
            cache: cache.then(BlockCache::new),
        }
    }

    /// Addressing index for a (tile x, tile y, sample) triple.
    pub fn block_index(&self, x: u32, y: u32, sample: usize) -> usize {
        let per_row = self.descriptor.tiles_per_row() as usize;
        let per_col = self.descriptor.tiles_per_col() as usize;
        let row_major = y as usize * per_row + x as usize;
        match self.planar {
            PlanarConfiguration::Chunky => row_major,
            PlanarConfiguration::Planar => sample * per_row * per_col + row_major,
        }
    }

    /// Fetch and decode the block for a triple, synchronously.
    pub fn get_block(&self, x: u32, y: u32, sample: usize) -> Result<Bytes, RasterError> {
        let index = self.block_index(x, y, sample);

        if let Some(cache) = &self.cache {
            if let Some(block) = cache.get(index) {
                trace!(index, "block cache hit");
                return Ok(block);
            }
        }

        let block = self.decode_at(index)?;
        if let Some(cache) = &self.cache {
            cache.insert(index, block.clone());
        }
        Ok(block)
    }

    /// Fetch and decode the block for a triple, asynchronously.
    ///
    /// Concurrent calls for the same index share one decode while caching is
    /// enabled.
    pub async fn get_block_async(
        &self,
        x: u32,
        y: u32,
        sample: usize,
    ) -> Result<Bytes, RasterError> {
        let index = self.block_index(x, y, sample);

        let Some(cache) = &self.cache else {
            return self.decode_at_async(index).await;
        };

        if let Some(block) = cache.get(index) {
            trace!(index, "block cache hit");
            return Ok(block);
        }

        let cell = {
            let mut pending = cache.pending.lock().await;
            pending.entry(index).or_default().clone()
        };

        let block = cell
            .get_or_try_init(|| async {
                let block = self.decode_at_async(index).await?;
                cache.insert(index, block.clone());
                Ok::<_, RasterError>(block)
            })
            .await?
            .clone();
        Ok(block)
    }

    /// Slice the compressed byte range for an addressing index.
    fn slice_block(&self, index: usize) -> Result<Bytes, DecodeError> {
        let count = self
            .descriptor
            .block_offsets
            .len()
            .min(self.descriptor.block_byte_counts.len());
        let (offset, len) = self
            .descriptor
            .block_offsets
            .get(index)
            .zip(self.descriptor.block_byte_counts.get(index))
            .ok_or(DecodeError::MissingBlock { index, count })?;

        let end = offset
            .checked_add(*len)
            .filter(|&end| end <= self.source.len() as u64)
            .ok_or(DecodeError::BlockOutOfBounds {
                index,
                offset: *offset,
                len: *len,
                size: self.source.len(),
            })?;

        Ok(self.source.slice(*offset as usize..end as usize))
    }

    fn decode_at(&self, index: usize) -> Result<Bytes, RasterError> {
        trace!(index, "decoding block");
        Ok(self.codec.decode_block(&self.slice_block(index)?)?)
    }

    async fn decode_at_async(&self, index: usize) -> Result<Bytes, RasterError> {
        trace!(index, "decoding block");
        let compressed = self.slice_block(index)?;
        Ok(self.codec.decode_block_async(compressed).await?)
    }
}

// =============================================================================
// Tests
// =============================================================================
