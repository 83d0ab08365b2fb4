//! Windowed raster reading.
//!
//! [`RasterImage`] is the public surface of the engine. It validates the
//! directory fields once at construction, then serves window-bounded raster
//! reads by walking the tiles or strips overlapping the window, extracting
//! samples bit by bit where needed, reversing horizontal differencing, and
//! writing into interleaved or per-band output buffers.
//!
//! # Execution modes
//!
//! The image's codec declares once whether it decodes asynchronously. For
//! synchronous codecs [`RasterImage::read_rasters`] runs everything on the
//! calling thread. For asynchronous codecs the synchronous entry points
//! refuse with [`RasterError::AsyncCodecRequiresAsyncRead`] and
//! [`RasterImage::read_rasters_async`] dispatches one decode task per
//! (tile, sample) pair before awaiting any of them; every task reports in
//! before the read completes, the first recorded failure wins, and partial
//! results are never exposed. Samples are blitted into the output in a
//! deterministic (tile row, tile column, sample) order after the barrier, so
//! both modes produce byte-identical buffers.
//!
//! There is no cancellation or timeout: a hung codec task blocks the read
//! indefinitely.

use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::debug;

use crate::buffer::RasterBuffer;
use crate::codec::{codec_for, BlockCodec};
use crate::descriptor::{
    ByteOrder, ImageDescriptor, PhotometricInterpretation, PlanarConfiguration, Predictor,
    SampleFormat,
};
use crate::error::{ConfigError, DecodeError, FormatError, RasterError};
use crate::rgb;
use crate::sample::SampleReader;
use crate::tile::TileStore;

// =============================================================================
// Window
// =============================================================================

/// Half-open pixel rectangle `[x0, y0, x1, y1)` in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Window {
    /// Create a window; bounds are validated against the image at read time.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width in pixels. Meaningful once validated as non-inverted.
    #[inline]
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    /// Height in pixels. Meaningful once validated as non-inverted.
    #[inline]
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Number of pixels covered.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

// =============================================================================
// Read Options and Results
// =============================================================================

/// Options for [`RasterImage::read_rasters`].
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Pixel window to read; defaults to the full image
    pub window: Option<Window>,
    /// Sample indices to read; defaults to all samples
    pub samples: Option<Vec<usize>>,
    /// Whether to assemble one interleaved buffer instead of one per band
    pub interleave: bool,
}

impl ReadOptions {
    /// Options reading the full image, all samples, one buffer per band.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the read to a pixel window.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    /// Restrict the read to a subset of samples.
    pub fn with_samples(mut self, samples: Vec<usize>) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Assemble one interleaved buffer.
    pub fn interleaved(mut self) -> Self {
        self.interleave = true;
        self
    }
}

/// Options for [`RasterImage::read_rgb`].
#[derive(Debug, Clone, Default)]
pub struct RgbOptions {
    /// Pixel window to read; defaults to the full image
    pub window: Option<Window>,
}

impl RgbOptions {
    /// Options reading the full image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the read to a pixel window.
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }
}

/// Assembled output of a raster read.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterData {
    /// One buffer with samples interleaved per pixel
    Interleaved(RasterBuffer),
    /// One buffer per selected sample
    PerBand(Vec<RasterBuffer>),
}

impl RasterData {
    /// Unwrap an interleaved result.
    pub fn into_interleaved(self) -> Option<RasterBuffer> {
        match self {
            RasterData::Interleaved(buffer) => Some(buffer),
            RasterData::PerBand(_) => None,
        }
    }

    /// Unwrap a per-band result.
    pub fn into_bands(self) -> Option<Vec<RasterBuffer>> {
        match self {
            RasterData::Interleaved(_) => None,
            RasterData::PerBand(bands) => Some(bands),
        }
    }
}

// =============================================================================
// Read Plan
// =============================================================================

/// Everything derived from the options before any tile I/O starts.
struct ReadPlan {
    window: Window,
    samples: Vec<usize>,
    readers: Vec<SampleReader>,
    /// Bit offset of each selected sample within a chunky pixel (0 in planar)
    src_offsets: Vec<usize>,
    min_x_tile: u32,
    max_x_tile: u32,
    min_y_tile: u32,
    max_y_tile: u32,
}

// =============================================================================
// Raster Image
// =============================================================================

/// One open image: validated directory fields, a selected codec and a tile
/// store over the source bytes.
pub struct RasterImage {
    descriptor: Arc<ImageDescriptor>,
    byte_order: ByteOrder,
    planar: PlanarConfiguration,
    predictor: Predictor,
    codec: Arc<dyn BlockCodec>,
    store: Arc<TileStore>,
}

impl RasterImage {
    /// Open an image over `source` with already-parsed directory fields.
    ///
    /// Validates the planar configuration, selects the codec from the
    /// compression tag, and rejects mixed per-sample bit widths. When
    /// `cache` is true, decoded blocks are memoized for the lifetime of the
    /// image; when false, every read re-decodes.
    pub fn new(
        descriptor: ImageDescriptor,
        source: Bytes,
        byte_order: ByteOrder,
        cache: bool,
    ) -> Result<Self, RasterError> {
        let codec = codec_for(descriptor.compression)?;
        Self::with_codec(descriptor, source, byte_order, codec, cache)
    }

    /// Open an image with an explicit codec instead of selecting one from the
    /// compression tag. This is the entry point for asynchronous codecs.
    pub fn with_codec(
        descriptor: ImageDescriptor,
        source: Bytes,
        byte_order: ByteOrder,
        codec: Arc<dyn BlockCodec>,
        cache: bool,
    ) -> Result<Self, RasterError> {
        if descriptor.samples_per_pixel == 0 || descriptor.bits_per_sample.is_empty() {
            return Err(ConfigError::NoSamples.into());
        }
        if descriptor.bits_per_sample.len() != descriptor.samples_per_pixel {
            return Err(ConfigError::SampleCountMismatch {
                samples_per_pixel: descriptor.samples_per_pixel,
                bits_listed: descriptor.bits_per_sample.len(),
            }
            .into());
        }
        let first = descriptor.bits_per_sample[0];
        if let Some(&other) = descriptor.bits_per_sample.iter().find(|&&b| b != first) {
            return Err(ConfigError::MixedBitWidths { first, other }.into());
        }

        let planar = PlanarConfiguration::from_tag(descriptor.planar_configuration)?;
        let predictor = Predictor::from_tag(descriptor.predictor);

        let descriptor = Arc::new(descriptor);
        let store = Arc::new(TileStore::new(
            descriptor.clone(),
            planar,
            source,
            codec.clone(),
            cache,
        ));

        Ok(Self {
            descriptor,
            byte_order,
            planar,
            predictor,
            codec,
            store,
        })
    }

    /// Pixel width of the image.
    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    /// Pixel height of the image.
    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    /// Width of one decoding unit.
    pub fn tile_width(&self) -> u32 {
        self.descriptor.tile_width
    }

    /// Height of one decoding unit.
    pub fn tile_height(&self) -> u32 {
        self.descriptor.tile_height
    }

    /// Number of bands.
    pub fn samples_per_pixel(&self) -> usize {
        self.descriptor.samples_per_pixel
    }

    /// Storage bits of one chunky pixel across all samples.
    pub fn bits_per_pixel(&self) -> usize {
        self.descriptor.bits_per_pixel()
    }

    /// Storage bytes of one chunky pixel; errors when samples are bit-packed.
    pub fn bytes_per_pixel(&self) -> Result<usize, RasterError> {
        let bits = self.descriptor.bits_per_sample[0];
        if bits % 8 != 0 {
            return Err(FormatError::NotByteAligned { bits }.into());
        }
        Ok(self.bits_per_pixel() / 8)
    }

    /// Byte order of the source file.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Whether this image's codec decodes asynchronously.
    pub fn is_async(&self) -> bool {
        self.codec.is_async()
    }

    /// The validated directory fields.
    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    // -------------------------------------------------------------------------
    // readRasters
    // -------------------------------------------------------------------------

    /// Read selected samples within a window, synchronously.
    ///
    /// Fails with [`RasterError::AsyncCodecRequiresAsyncRead`] when the
    /// image's codec decodes asynchronously; use
    /// [`read_rasters_async`](Self::read_rasters_async) for those images.
    pub fn read_rasters(&self, options: &ReadOptions) -> Result<RasterData, RasterError> {
        if self.codec.is_async() {
            return Err(RasterError::AsyncCodecRequiresAsyncRead);
        }
        let (plan, mut data) = self.prepare(options)?;
        self.read_blocks_sync(&plan, &mut data)?;
        Ok(data)
    }

    /// Read selected samples within a window, decoding blocks concurrently
    /// when the codec is asynchronous.
    ///
    /// Synchronous codecs take the same single-threaded path as
    /// [`read_rasters`](Self::read_rasters); the two paths are never mixed
    /// within one read.
    pub async fn read_rasters_async(
        &self,
        options: &ReadOptions,
    ) -> Result<RasterData, RasterError> {
        let (plan, mut data) = self.prepare(options)?;
        if self.codec.is_async() {
            self.read_blocks_concurrent(&plan, &mut data).await?;
        } else {
            self.read_blocks_sync(&plan, &mut data)?;
        }
        Ok(data)
    }

    /// Synchronous nested loop over (tile row, tile column, sample).
    fn read_blocks_sync(&self, plan: &ReadPlan, data: &mut RasterData) -> Result<(), RasterError> {
        for tile_y in plan.min_y_tile..plan.max_y_tile {
            for tile_x in plan.min_x_tile..plan.max_x_tile {
                for slot in 0..plan.samples.len() {
                    let block = self.store.get_block(tile_x, tile_y, plan.samples[slot])?;
                    self.blit_block(plan, data, &block, tile_x, tile_y, slot)?;
                }
            }
        }
        Ok(())
    }

    /// Dispatch every (tile, sample) decode before awaiting any; join them
    /// all, then blit in deterministic order. The first recorded failure is
    /// reported once every task has reported in.
    async fn read_blocks_concurrent(
        &self,
        plan: &ReadPlan,
        data: &mut RasterData,
    ) -> Result<(), RasterError> {
        let tiles_x = (plan.max_x_tile - plan.min_x_tile) as usize;
        let tiles_y = (plan.max_y_tile - plan.min_y_tile) as usize;
        let slots = plan.samples.len();
        let mut blocks: Vec<Option<Bytes>> = vec![None; tiles_x * tiles_y * slots];

        let mut tasks = JoinSet::new();
        for tile_y in plan.min_y_tile..plan.max_y_tile {
            for tile_x in plan.min_x_tile..plan.max_x_tile {
                for slot in 0..slots {
                    let store = self.store.clone();
                    let sample = plan.samples[slot];
                    let position = ((tile_y - plan.min_y_tile) as usize * tiles_x
                        + (tile_x - plan.min_x_tile) as usize)
                        * slots
                        + slot;
                    tasks.spawn(async move {
                        let block = store.get_block_async(tile_x, tile_y, sample).await?;
                        Ok::<_, RasterError>((position, block))
                    });
                }
            }
        }

        let mut first_error: Option<RasterError> = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|err| RasterError::from(DecodeError::TaskFailed(err.to_string())))
                .and_then(|inner| inner);
            match result {
                Ok((position, block)) => blocks[position] = Some(block),
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        for tile_y in plan.min_y_tile..plan.max_y_tile {
            for tile_x in plan.min_x_tile..plan.max_x_tile {
                for slot in 0..slots {
                    let position = ((tile_y - plan.min_y_tile) as usize * tiles_x
                        + (tile_x - plan.min_x_tile) as usize)
                        * slots
                        + slot;
                    let block = blocks[position].take().ok_or_else(|| {
                        DecodeError::TaskFailed("decode task vanished".to_string())
                    })?;
                    self.blit_block(plan, data, &block, tile_x, tile_y, slot)?;
                }
            }
        }
        Ok(())
    }

    /// Validate options and size the output buffers before any tile I/O.
    fn prepare(&self, options: &ReadOptions) -> Result<(ReadPlan, RasterData), RasterError> {
        let window = options
            .window
            .unwrap_or_else(|| Window::new(0, 0, self.width(), self.height()));

        if window.x0 > window.x1 || window.y0 > window.y1 {
            return Err(RasterError::InvalidWindow {
                x0: window.x0,
                y0: window.y0,
                x1: window.x1,
                y1: window.y1,
            });
        }
        if window.x1 > self.width() || window.y1 > self.height() {
            return Err(RasterError::WindowOutOfBounds {
                x0: window.x0,
                y0: window.y0,
                x1: window.x1,
                y1: window.y1,
                width: self.width(),
                height: self.height(),
            });
        }

        let samples = match &options.samples {
            None => (0..self.samples_per_pixel()).collect::<Vec<_>>(),
            Some(samples) => {
                for &sample in samples {
                    if sample >= self.samples_per_pixel() {
                        return Err(RasterError::SampleIndexOutOfRange {
                            index: sample,
                            samples_per_pixel: self.samples_per_pixel(),
                        });
                    }
                }
                samples.clone()
            }
        };

        let mut readers = Vec::with_capacity(samples.len());
        let mut src_offsets = Vec::with_capacity(samples.len());
        for &sample in &samples {
            let format = SampleFormat::from_tag(self.descriptor.sample_format_tag(sample))?;
            let bits = self.descriptor.bits_per_sample[sample];
            readers.push(SampleReader::new(format, bits)?);
            src_offsets.push(match self.planar {
                PlanarConfiguration::Chunky => self.descriptor.bits_per_sample[..sample]
                    .iter()
                    .map(|&b| b as usize)
                    .sum(),
                PlanarConfiguration::Planar => 0,
            });
        }

        let num_pixels = window.num_pixels();
        let data = if options.interleave {
            let mut format = SampleFormat::Unsigned;
            let mut bits = 0u8;
            for &sample in &samples {
                format = format.max(SampleFormat::from_tag(
                    self.descriptor.sample_format_tag(sample),
                )?);
                bits = bits.max(self.descriptor.bits_per_sample[sample]);
            }
            RasterData::Interleaved(RasterBuffer::for_sample(
                format,
                bits,
                num_pixels * samples.len(),
            )?)
        } else {
            let mut bands = Vec::with_capacity(samples.len());
            for &sample in &samples {
                let format = SampleFormat::from_tag(self.descriptor.sample_format_tag(sample))?;
                bands.push(RasterBuffer::for_sample(
                    format,
                    self.descriptor.bits_per_sample[sample],
                    num_pixels,
                )?);
            }
            RasterData::PerBand(bands)
        };

        let plan = ReadPlan {
            window,
            min_x_tile: window.x0 / self.tile_width(),
            max_x_tile: window.x1.div_ceil(self.tile_width()),
            min_y_tile: window.y0 / self.tile_height(),
            max_y_tile: window.y1.div_ceil(self.tile_height()),
            samples,
            readers,
            src_offsets,
        };

        debug!(
            window = ?plan.window,
            samples = ?plan.samples,
            interleave = options.interleave,
            tiles_x = plan.max_x_tile - plan.min_x_tile,
            tiles_y = plan.max_y_tile - plan.min_y_tile,
            "raster read"
        );

        Ok((plan, data))
    }

    /// Copy one decoded block's contribution into the output.
    ///
    /// Scanlines inside a block always start on byte boundaries even when
    /// pixel data does not end on one, so bits-per-line rounds up to the next
    /// full byte. Horizontal differencing is reversed against the previous
    /// window column: the first pixel of a window row stays as decoded, which
    /// for windows not starting at image column 0 leaves the raw differenced
    /// value in that column (the running sum is not reconstructible from the
    /// window alone).
    fn blit_block(
        &self,
        plan: &ReadPlan,
        data: &mut RasterData,
        block: &[u8],
        tile_x: u32,
        tile_y: u32,
        slot: usize,
    ) -> Result<(), RasterError> {
        let tile_width = self.tile_width() as usize;
        let tile_height = self.tile_height() as usize;
        let sample = plan.samples[slot];
        let reader = plan.readers[slot];
        let src_offset = plan.src_offsets[slot];

        let first_line = tile_y as usize * tile_height;
        let first_col = tile_x as usize * tile_width;
        let last_line = first_line + tile_height;
        let last_col = first_col + tile_width;

        let win = &plan.window;
        let window_width = win.width() as usize;
        let sample_count = plan.samples.len();

        let bits_per_pixel = match self.planar {
            PlanarConfiguration::Chunky => self.descriptor.bits_per_pixel(),
            PlanarConfiguration::Planar => self.descriptor.bits_per_sample[sample] as usize,
        };
        let bits_per_line = (tile_width * bits_per_pixel + 7) & !7;

        // Tile-local row/column span overlapping the window.
        let y_start = (win.y0 as usize).saturating_sub(first_line);
        let y_end = tile_height.saturating_sub(last_line.saturating_sub(win.y1 as usize));
        let x_start = (win.x0 as usize).saturating_sub(first_col);
        let x_end = tile_width.saturating_sub(last_col.saturating_sub(win.x1 as usize));

        if y_start >= y_end || x_start >= x_end {
            return Ok(());
        }

        // Bound the decoded block against the deepest bit this blit reads.
        let last_bit = (y_end - 1) * bits_per_line
            + (x_end - 1) * bits_per_pixel
            + src_offset
            + reader.bit_width() as usize;
        let needed = last_bit.div_ceil(8);
        if block.len() < needed {
            return Err(DecodeError::ShortBlock {
                index: self.store.block_index(tile_x, tile_y, sample),
                needed,
                actual: block.len(),
            }
            .into());
        }

        let reverse_predictor = self.predictor == Predictor::HorizontalDifferencing;

        for y in y_start..y_end {
            let line_offset = bits_per_line * y;
            let window_y = y + first_line - win.y0 as usize;

            for x in x_start..x_end {
                let value = reader.read(
                    block,
                    line_offset + x * bits_per_pixel + src_offset,
                    self.byte_order,
                );
                let window_x = x + first_col - win.x0 as usize;

                match data {
                    RasterData::Interleaved(buffer) => {
                        let index = (window_y * window_width + window_x) * sample_count + slot;
                        buffer.set(index, value);
                        if reverse_predictor && window_x > 0 {
                            buffer.accumulate_prev(index, index - sample_count);
                        }
                    }
                    RasterData::PerBand(bands) => {
                        let index = window_y * window_width + window_x;
                        let band = &mut bands[slot];
                        band.set(index, value);
                        if reverse_predictor && window_x > 0 {
                            band.accumulate_prev(index, index - 1);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // readRGB
    // -------------------------------------------------------------------------

    /// Read a window as one interleaved RGB buffer, synchronously.
    ///
    /// Color spaces other than RGB are converted; palette indices are
    /// expanded through the color map. Fails with an unsupported-format
    /// error for photometric interpretations with no conversion, and with
    /// [`RasterError::AsyncCodecRequiresAsyncRead`] when the codec decodes
    /// asynchronously.
    pub fn read_rgb(&self, options: &RgbOptions) -> Result<RasterBuffer, RasterError> {
        if self.codec.is_async() {
            return Err(RasterError::AsyncCodecRequiresAsyncRead);
        }
        let (photometric, read_options) = self.prepare_rgb(options)?;
        let raster = self.read_rasters(&read_options)?;
        self.convert_rgb(photometric, read_options, raster)
    }

    /// Read a window as one interleaved RGB buffer, decoding concurrently
    /// when the codec is asynchronous.
    pub async fn read_rgb_async(&self, options: &RgbOptions) -> Result<RasterBuffer, RasterError> {
        let (photometric, read_options) = self.prepare_rgb(options)?;
        let raster = self.read_rasters_async(&read_options).await?;
        self.convert_rgb(photometric, read_options, raster)
    }

    /// Resolve the photometric interpretation and the sample subset it needs.
    fn prepare_rgb(
        &self,
        options: &RgbOptions,
    ) -> Result<(PhotometricInterpretation, ReadOptions), RasterError> {
        let tag = self
            .descriptor
            .photometric_interpretation
            .ok_or(FormatError::MissingPhotometric)?;
        let photometric = PhotometricInterpretation::from_tag(tag)?;

        let samples = match photometric {
            // Already RGB: read every sample as stored.
            PhotometricInterpretation::Rgb => None,
            PhotometricInterpretation::WhiteIsZero
            | PhotometricInterpretation::BlackIsZero
            | PhotometricInterpretation::Palette => Some(vec![0]),
            PhotometricInterpretation::YCbCr | PhotometricInterpretation::CieLab => {
                Some(vec![0, 1, 2])
            }
            PhotometricInterpretation::Cmyk => Some(vec![0, 1, 2, 3]),
            PhotometricInterpretation::TransparencyMask => {
                return Err(FormatError::UnsupportedPhotometric(tag).into());
            }
        };

        let read_options = ReadOptions {
            window: options.window,
            samples,
            interleave: true,
        };
        Ok((photometric, read_options))
    }

    /// Convert an interleaved raster of the conversion's sample subset into
    /// one interleaved RGB buffer.
    fn convert_rgb(
        &self,
        photometric: PhotometricInterpretation,
        read_options: ReadOptions,
        raster: RasterData,
    ) -> Result<RasterBuffer, RasterError> {
        let raster = match raster {
            RasterData::Interleaved(buffer) => buffer,
            RasterData::PerBand(_) => unreachable!("rgb reads are always interleaved"),
        };
        let num_pixels = read_options
            .window
            .unwrap_or_else(|| Window::new(0, 0, self.width(), self.height()))
            .num_pixels();

        let bits = self.descriptor.bits_per_sample[0];
        let max_value = ((1u64 << bits) - 1) as f64;

        let rgb = match photometric {
            PhotometricInterpretation::Rgb => return Ok(raster),
            PhotometricInterpretation::WhiteIsZero => {
                rgb::from_white_is_zero(&raster, max_value, num_pixels)
            }
            PhotometricInterpretation::BlackIsZero => {
                rgb::from_black_is_zero(&raster, max_value, num_pixels)
            }
            PhotometricInterpretation::Palette => {
                let color_map = self
                    .descriptor
                    .color_map
                    .as_deref()
                    .ok_or(FormatError::MissingColorMap)?;
                rgb::from_palette(&raster, color_map, num_pixels)
            }
            PhotometricInterpretation::Cmyk => rgb::from_cmyk(&raster, num_pixels),
            PhotometricInterpretation::YCbCr => rgb::from_ycbcr(&raster, num_pixels),
            PhotometricInterpretation::CieLab => rgb::from_cielab(&raster, num_pixels),
            PhotometricInterpretation::TransparencyMask => {
                unreachable!("rejected while preparing the read")
            }
        };
        Ok(RasterBuffer::U8(rgb))
    }
}
