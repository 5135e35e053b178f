//! Minimal PGM/PPM reader.
//!
//! Supports exactly the raster subset the conformance images use: binary P5
//! (grayscale) and P6 (RGB) with 8-bit samples and no header comments. This
//! is deliberately not a general image decoder.

use std::fs;
use std::path::Path;

use nom::branch::alt;
use nom::bytes::complete::{tag, take};
use nom::character::complete::{digit1, multispace1};
use nom::combinator::map_res;
use nom::IResult;
use nom::Parser;

use crate::error::HarnessError;
use crate::iris::{IrisImage, PixelFormat};

struct RasterHeader {
    format: PixelFormat,
    width: u16,
    height: u16,
    maxval: u16,
}

fn number(input: &[u8]) -> IResult<&[u8], u16> {
    map_res(digit1, |digits: &[u8]| {
        std::str::from_utf8(digits)
            .map_err(|_| ())
            .and_then(|s| s.parse::<u16>().map_err(|_| ()))
    })
    .parse(input)
}

fn header(input: &[u8]) -> IResult<&[u8], RasterHeader> {
    let (input, magic) = alt((tag(&b"P5"[..]), tag(&b"P6"[..]))).parse(input)?;
    let format = if magic == b"P5".as_slice() { PixelFormat::Grayscale } else { PixelFormat::Rgb };
    let (input, _) = multispace1(input)?;
    let (input, width) = number(input)?;
    let (input, _) = multispace1(input)?;
    let (input, height) = number(input)?;
    let (input, _) = multispace1(input)?;
    let (input, maxval) = number(input)?;
    // Exactly one whitespace byte separates the header from the raster.
    let (input, _) = take(1usize).parse(input)?;
    Ok((input, RasterHeader { format, width, height, maxval }))
}

/// Parses an in-memory P5/P6 byte stream into a sample with unspecified
/// metadata.
pub fn parse_raster(bytes: &[u8]) -> Result<IrisImage, String> {
    let (raster, header) =
        header(bytes).map_err(|_| "unsupported or malformed raster header".to_string())?;

    if header.maxval == 0 || header.maxval > 255 {
        return Err(format!("unsupported maxval {}", header.maxval));
    }
    if header.width == 0 || header.height == 0 {
        return Err(format!("zero raster dimension {}x{}", header.width, header.height));
    }

    let expected = header.width as usize
        * header.height as usize
        * header.format.bytes_per_pixel();
    if raster.len() < expected {
        return Err(format!("raster holds {} of {} bytes", raster.len(), expected));
    }

    Ok(IrisImage::new(header.width, header.height, header.format, raster[..expected].to_vec()))
}

/// Reads a P5/P6 file into an [`IrisImage`].
pub fn read_raster(path: &Path) -> Result<IrisImage, HarnessError> {
    let bytes = fs::read(path)
        .map_err(|source| HarnessError::Io { path: path.to_path_buf(), source })?;
    parse_raster(&bytes)
        .map_err(|message| HarnessError::RasterParse { path: path.to_path_buf(), message })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pgm(width: usize, height: usize) -> Vec<u8> {
        let mut bytes = format!("P5\n{width} {height}\n255\n").into_bytes();
        bytes.extend(std::iter::repeat(0x40).take(width * height));
        bytes
    }

    #[test]
    fn parses_binary_pgm() {
        let iris = parse_raster(&pgm(4, 3)).unwrap();
        assert_eq!(iris.width, 4);
        assert_eq!(iris.height, 3);
        assert_eq!(iris.pixel_format, PixelFormat::Grayscale);
        assert_eq!(iris.data.len(), 12);
        assert!(iris.validate_raster().is_ok());
    }

    #[test]
    fn parses_binary_ppm() {
        let mut bytes = b"P6\n2 2\n255\n".to_vec();
        bytes.extend_from_slice(&[10u8; 12]);
        let iris = parse_raster(&bytes).unwrap();
        assert_eq!(iris.pixel_format, PixelFormat::Rgb);
        assert_eq!(iris.data.len(), 12);
    }

    #[test]
    fn rejects_unknown_magic() {
        assert!(parse_raster(b"P2\n2 2\n255\n....").is_err());
    }

    #[test]
    fn rejects_short_raster() {
        let mut bytes = pgm(4, 4);
        bytes.truncate(bytes.len() - 1);
        assert!(parse_raster(&bytes).is_err());
    }

    #[test]
    fn rejects_wide_maxval() {
        let bytes = b"P5\n1 1\n65535\n\0\0".to_vec();
        assert!(parse_raster(&bytes).is_err());
    }

    #[test]
    fn tolerates_trailing_bytes() {
        let mut bytes = pgm(2, 2);
        bytes.extend_from_slice(b"extra");
        assert!(parse_raster(&bytes).is_ok());
    }
}
