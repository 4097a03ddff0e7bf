use std::io::Cursor;
use std::path::Path;

use image::io::Reader;
use image::RgbaImage;

use crate::ProgressError;

/// Decodes a cover file into RGBA. The format is sniffed from the content
/// since device thumbnails carry no usable extension.
pub fn open_cover<P: AsRef<Path>>(path: P) -> Result<RgbaImage, ProgressError> {
    let path = path.as_ref();
    let io_error = |source| ProgressError::Io { path: path.to_path_buf(), source };
    let reader = Reader::open(path).map_err(io_error)?.with_guessed_format().map_err(io_error)?;
    Ok(reader.decode()?.into_rgba8())
}

pub fn decode_cover(bytes: &[u8]) -> Result<RgbaImage, ProgressError> {
    let reader = Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|source| ProgressError::Io { path: Default::default(), source })?;
    Ok(reader.decode()?.into_rgba8())
}
