//! Test utilities for integration tests.
//!
//! This module builds synthetic images: a deterministic per-pixel sample
//! pattern is packed into tile blocks (MSB-first, so byte-aligned widths come
//! out big-endian), optionally run through a compressor, and concatenated
//! into one source buffer with recorded offsets. Images built here always use
//! big-endian byte order.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use geotiff_rasters::{BlockCodec, ByteOrder, DecodeError, ImageDescriptor, RasterImage};

/// Byte order used by every built image.
pub const ORDER: ByteOrder = ByteOrder::BigEndian;

/// Deterministic sample pattern, reduced to the image's bit width at pack
/// time. Distinct across x, y and sample index.
pub fn pattern(x: u32, y: u32, sample: usize) -> u32 {
    x.wrapping_mul(7)
        .wrapping_add(y.wrapping_mul(131))
        .wrapping_add(sample as u32 * 31)
}

// =============================================================================
// Image Builder
// =============================================================================

/// Builds an image descriptor plus matching source bytes.
pub struct ImageBuilder {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub samples: usize,
    pub bits: u8,
    pub sample_format: Option<Vec<u16>>,
    pub planar: Option<u16>,
    pub compression: Option<u16>,
    pub predictor: Option<u16>,
    /// Difference across whole image rows instead of per tile scanline
    pub full_row_differencing: bool,
    pub photometric: Option<u16>,
    pub color_map: Option<Vec<u16>>,
}

/// Install a subscriber once so `RUST_LOG` surfaces engine events in tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl ImageBuilder {
    pub fn new(width: u32, height: u32, samples: usize, bits: u8) -> Self {
        Self {
            width,
            height,
            tile_width: width,
            tile_height: height,
            samples,
            bits,
            sample_format: None,
            planar: None,
            compression: None,
            predictor: None,
            full_row_differencing: false,
            photometric: None,
            color_map: None,
        }
    }

    pub fn tiled(mut self, tile_width: u32, tile_height: u32) -> Self {
        self.tile_width = tile_width;
        self.tile_height = tile_height;
        self
    }

    pub fn planar(mut self) -> Self {
        self.planar = Some(2);
        self
    }

    pub fn compression(mut self, tag: u16) -> Self {
        self.compression = Some(tag);
        self
    }

    pub fn horizontal_predictor(mut self) -> Self {
        self.predictor = Some(2);
        self
    }

    /// Horizontal predictor with the difference running across the whole
    /// image row rather than restarting per tile. Byte-aligned widths only.
    pub fn full_row_predictor(mut self) -> Self {
        self.predictor = Some(2);
        self.full_row_differencing = true;
        self
    }

    pub fn photometric(mut self, tag: u16) -> Self {
        self.photometric = Some(tag);
        self
    }

    pub fn color_map(mut self, map: Vec<u16>) -> Self {
        self.color_map = Some(map);
        self
    }

    pub fn sample_format(mut self, formats: Vec<u16>) -> Self {
        self.sample_format = Some(formats);
        self
    }

    fn tiles_per_row(&self) -> u32 {
        self.width.div_ceil(self.tile_width)
    }

    fn tiles_per_col(&self) -> u32 {
        self.height.div_ceil(self.tile_height)
    }

    /// The pattern value for a pixel, masked to the bit width. Pixels beyond
    /// the image edge inside a boundary tile pack as zero.
    pub fn value(&self, x: u32, y: u32, sample: usize) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        let mask = if self.bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bits) - 1
        };
        pattern(x, y, sample) & mask
    }

    /// The value actually packed for a pixel. With full-row differencing the
    /// stored value is the wrapped difference from the pixel to its left in
    /// the image row; the first column of a row stays absolute.
    fn stored_value(&self, x: u32, y: u32, sample: usize) -> u32 {
        let value = self.value(x, y, sample);
        if !self.full_row_differencing || x == 0 || x >= self.width || y >= self.height {
            return value;
        }
        let mask = if self.bits >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bits) - 1
        };
        value.wrapping_sub(self.value(x - 1, y, sample)) & mask
    }

    /// Pack one raw (uncompressed, undifferenced) tile block.
    fn pack_block(&self, tile_x: u32, tile_y: u32, samples: &[usize]) -> Vec<u8> {
        let bits_per_pixel = self.bits as usize * samples.len();
        let bits_per_line = (self.tile_width as usize * bits_per_pixel + 7) & !7;
        let mut block = vec![0u8; bits_per_line / 8 * self.tile_height as usize];

        for y in 0..self.tile_height {
            for x in 0..self.tile_width {
                for (slot, &sample) in samples.iter().enumerate() {
                    let value = self.stored_value(
                        tile_x * self.tile_width + x,
                        tile_y * self.tile_height + y,
                        sample,
                    );
                    let offset = y as usize * bits_per_line
                        + x as usize * bits_per_pixel
                        + slot * self.bits as usize;
                    write_bits(&mut block, offset, value, self.bits);
                }
            }
        }
        block
    }

    /// Apply tile-local horizontal differencing, per scanline. Only valid for
    /// byte-aligned widths.
    fn difference_block(&self, block: &mut [u8], samples: usize) {
        assert_eq!(self.bits % 8, 0, "differencing needs byte-aligned samples");
        let cell = self.bits as usize / 8;
        let stride = samples * cell;
        let line_bytes = self.tile_width as usize * stride;

        for line in block.chunks_exact_mut(line_bytes) {
            // Walk right to left so each cell differences against the
            // original value to its left.
            for x in (1..self.tile_width as usize).rev() {
                for s in 0..samples {
                    let here = x * stride + s * cell;
                    let left = here - stride;
                    let value = read_cell(line, here, cell);
                    let prev = read_cell(line, left, cell);
                    write_cell(line, here, value.wrapping_sub(prev), cell);
                }
            }
        }
    }

    /// Produce the descriptor and source buffer.
    pub fn build(&self) -> (ImageDescriptor, Bytes) {
        let mut blocks = Vec::new();
        match self.planar {
            Some(2) => {
                for sample in 0..self.samples {
                    for tile_y in 0..self.tiles_per_col() {
                        for tile_x in 0..self.tiles_per_row() {
                            blocks.push(self.pack_block(tile_x, tile_y, &[sample]));
                        }
                    }
                }
            }
            _ => {
                let samples: Vec<usize> = (0..self.samples).collect();
                for tile_y in 0..self.tiles_per_col() {
                    for tile_x in 0..self.tiles_per_row() {
                        blocks.push(self.pack_block(tile_x, tile_y, &samples));
                    }
                }
            }
        }

        if self.predictor == Some(2) && !self.full_row_differencing {
            let samples = if self.planar == Some(2) {
                1
            } else {
                self.samples
            };
            for block in &mut blocks {
                self.difference_block(block, samples);
            }
        }

        let compress = compressor(self.compression);
        // Leading pad keeps offsets away from zero.
        let mut source = vec![0u8; 8];
        let mut offsets = Vec::with_capacity(blocks.len());
        let mut byte_counts = Vec::with_capacity(blocks.len());
        for block in blocks {
            let compressed = compress(&block);
            offsets.push(source.len() as u64);
            byte_counts.push(compressed.len() as u64);
            source.extend_from_slice(&compressed);
        }

        let descriptor = ImageDescriptor {
            width: self.width,
            height: self.height,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            samples_per_pixel: self.samples,
            bits_per_sample: vec![self.bits; self.samples],
            sample_format: self.sample_format.clone(),
            planar_configuration: self.planar,
            compression: self.compression,
            predictor: self.predictor,
            photometric_interpretation: self.photometric,
            color_map: self.color_map.clone(),
            block_offsets: offsets,
            block_byte_counts: byte_counts,
        };
        (descriptor, Bytes::from(source))
    }

    /// Build and open, with caching enabled.
    pub fn open(&self) -> RasterImage {
        init_tracing();
        let (descriptor, source) = self.build();
        RasterImage::new(descriptor, source, ORDER, true).unwrap()
    }

    /// Build and open with an explicit codec, with caching enabled.
    pub fn open_with_codec(&self, codec: Arc<dyn BlockCodec>) -> RasterImage {
        init_tracing();
        let (descriptor, source) = self.build();
        RasterImage::with_codec(descriptor, source, ORDER, codec, true).unwrap()
    }
}

/// Write `bits` of `value` at `offset`, most-significant-bit first.
fn write_bits(block: &mut [u8], offset: usize, value: u32, bits: u8) {
    for bit in 0..bits {
        if value & (1 << (bits - 1 - bit)) != 0 {
            let pos = offset + bit as usize;
            block[pos >> 3] |= 0x80 >> (pos & 7);
        }
    }
}

fn read_cell(line: &[u8], at: usize, cell: usize) -> u32 {
    let mut value = 0u32;
    for i in 0..cell {
        value = (value << 8) | line[at + i] as u32;
    }
    value
}

fn write_cell(line: &mut [u8], at: usize, value: u32, cell: usize) {
    for i in 0..cell {
        line[at + i] = (value >> ((cell - 1 - i) * 8)) as u8;
    }
}

// =============================================================================
// Compressors
// =============================================================================

fn compressor(compression: Option<u16>) -> fn(&[u8]) -> Vec<u8> {
    match compression {
        None | Some(1) => |block: &[u8]| block.to_vec(),
        Some(5) => lzw_compress,
        Some(8) => zlib_compress,
        Some(32773) => packbits_compress,
        Some(other) => panic!("no test compressor for tag {other}"),
    }
}

fn lzw_compress(block: &[u8]) -> Vec<u8> {
    weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        .encode(block)
        .unwrap()
}

fn zlib_compress(block: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(block).unwrap();
    encoder.finish().unwrap()
}

/// Literal-runs-only PackBits encoding: valid, if not compact.
fn packbits_compress(block: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(block.len() + block.len() / 128 + 1);
    for chunk in block.chunks(128) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
    out
}

// =============================================================================
// Tracking Codecs
// =============================================================================

/// Pass-through codec that counts decode invocations and can present itself
/// as asynchronous.
pub struct TrackingCodec {
    decodes: AtomicUsize,
    asynchronous: bool,
}

impl TrackingCodec {
    pub fn sync() -> Arc<Self> {
        Arc::new(Self {
            decodes: AtomicUsize::new(0),
            asynchronous: false,
        })
    }

    pub fn asynchronous() -> Arc<Self> {
        Arc::new(Self {
            decodes: AtomicUsize::new(0),
            asynchronous: true,
        })
    }

    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockCodec for TrackingCodec {
    fn is_async(&self) -> bool {
        self.asynchronous
    }

    fn decode_block(&self, block: &[u8]) -> Result<Bytes, DecodeError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::copy_from_slice(block))
    }
}

/// Asynchronous codec whose every decode fails.
pub struct FailingCodec;

#[async_trait]
impl BlockCodec for FailingCodec {
    fn is_async(&self) -> bool {
        true
    }

    fn decode_block(&self, _block: &[u8]) -> Result<Bytes, DecodeError> {
        Err(DecodeError::PackBitsTruncated)
    }
}
