use crate::error::HarnessError;

/// Quality sentinel: the capture device or caller did not compute a score.
pub const QUALITY_NOT_COMPUTED: u8 = 255;

/// The eye label for an iris sample (left, right, or unspecified).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EyeLabel {
    /// Undefined, unspecified, or unknown.
    Unspecified,
    /// The subject's right iris.
    Right,
    /// The subject's left iris.
    Left,
}

/// The layout of the raster buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per pixel.
    Grayscale,
    /// 24 bits per pixel, interleaved RGBRGB..., no padding.
    Rgb,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Grayscale => 1,
            PixelFormat::Rgb => 3,
        }
    }
}

/// Approximate location of the iris in the image. Zero in any field means
/// the estimate was not provided.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IrisAnnulus {
    /// Approximate horizontal center of the limbus in pixels.
    pub limbus_center_x: u16,
    /// Approximate vertical center of the limbus in pixels.
    pub limbus_center_y: u16,
    /// Approximation of the pupil radius in pixels.
    pub pupil_radius: u16,
    /// Approximation of the limbus radius in pixels.
    pub limbus_radius: u16,
}

/// One iris capture: raster data plus acquisition metadata.
///
/// Immutable once constructed and passed by value into engine calls; the
/// engine may read it but must not assume it outlives the call. The raster
/// invariant `data.len() == width * height * bytes_per_pixel` is checked by
/// the harness before any engine sees the sample.
#[derive(Clone, Debug, PartialEq)]
pub struct IrisImage {
    /// Image width in pixels.
    pub width: u16,
    /// Image height in pixels.
    pub height: u16,
    /// Row-major raster data.
    pub data: Vec<u8>,
    pub pixel_format: PixelFormat,
    pub label: EyeLabel,
    /// Wavelength in nanometers at which the image was acquired,
    /// 0 = unspecified (assume a standard near-infrared iris camera).
    pub wavelength: u16,
    /// ISO/IEC 29794-6 quality score in 0..=100, higher is better;
    /// 255 = not computed.
    pub quality: u8,
    pub location: IrisAnnulus,
}

impl IrisImage {
    /// A sample with the given raster and defaulted metadata (unspecified
    /// label, wavelength, annulus; quality not computed).
    pub fn new(width: u16, height: u16, pixel_format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            pixel_format,
            label: EyeLabel::Unspecified,
            wavelength: 0,
            quality: QUALITY_NOT_COMPUTED,
            location: IrisAnnulus::default(),
        }
    }

    /// The default capture geometry: 640×480 grayscale with a zeroed raster.
    pub fn default_geometry() -> Self {
        Self::new(640, 480, PixelFormat::Grayscale, vec![0u8; 640 * 480])
    }

    pub fn with_label(mut self, label: EyeLabel) -> Self {
        self.label = label;
        self
    }

    /// Byte length the raster buffer must have for the declared geometry.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.bytes_per_pixel()
    }

    /// Checks the raster invariant and the quality-score range.
    pub fn validate_raster(&self) -> Result<(), HarnessError> {
        let expected = self.expected_len();
        if expected == 0 || self.data.len() != expected {
            return Err(HarnessError::RasterLength { expected, actual: self.data.len() });
        }
        if self.quality > 100 && self.quality != QUALITY_NOT_COMPUTED {
            return Err(HarnessError::QualityOutOfRange { quality: self.quality });
        }
        Ok(())
    }
}

/// Validates one subject's sample set against the caller contract.
///
/// Every raster must match its geometry, and a set of more than one sample
/// must label every image Left or Right; Unspecified is only legal for
/// single-sample sets. Violations are harness errors raised before the
/// engine is invoked, never engine-reported statuses.
pub fn validate_sample_set(irides: &[IrisImage]) -> Result<(), HarnessError> {
    if irides.is_empty() {
        return Err(HarnessError::EmptySampleSet);
    }
    for iris in irides {
        iris.validate_raster()?;
    }
    if irides.len() > 1 && irides.iter().any(|iris| iris.label == EyeLabel::Unspecified) {
        return Err(HarnessError::UnlabeledSamples { count: irides.len() });
    }
    Ok(())
}
