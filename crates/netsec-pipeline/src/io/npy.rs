//! Minimal NPY (v1.0) reader and writer for 2-D little-endian `f64` arrays.
//!
//! Files written here load in numpy with `np.load`, and `np.save` output of a
//! C-ordered float64 matrix reads back.
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array2;
use thiserror::Error;

use crate::error::{PipelineError, Result};
use crate::io::ensure_parent_dir;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

#[derive(Debug, Error)]
pub enum NpyError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not an NPY file")]
    BadMagic,
    #[error("unsupported NPY version {0}.{1}")]
    UnsupportedVersion(u8, u8),
    #[error("malformed header: {0}")]
    Header(String),
    #[error("unsupported dtype '{0}', only '<f8' is supported")]
    Dtype(String),
    #[error("fortran-ordered arrays are not supported")]
    FortranOrder,
    #[error("expected a 2-D array, got shape {0:?}")]
    Shape(Vec<usize>),
}

fn header_text(rows: usize, cols: usize) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': ({}, {}), }}",
        rows, cols
    );
    // magic(6) + version(2) + header length(2) + dict + padding + '\n'
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    let mut header = dict.into_bytes();
    header.extend(std::iter::repeat(b' ').take(padding));
    header.push(b'\n');
    header
}

pub fn write_npy<W: Write>(writer: &mut W, array: &Array2<f64>) -> std::result::Result<(), NpyError> {
    let header = header_text(array.nrows(), array.ncols());
    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_u16::<LittleEndian>(header.len() as u16)?;
    writer.write_all(&header)?;
    // iter() walks in logical (row-major) order regardless of memory layout
    for &v in array.iter() {
        writer.write_f64::<LittleEndian>(v)?;
    }
    Ok(())
}

pub fn read_npy<R: Read>(reader: &mut R) -> std::result::Result<Array2<f64>, NpyError> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(NpyError::BadMagic);
    }
    let major = reader.read_u8()?;
    let minor = reader.read_u8()?;
    let header_len = match major {
        1 => reader.read_u16::<LittleEndian>()? as usize,
        2 | 3 => reader.read_u32::<LittleEndian>()? as usize,
        _ => return Err(NpyError::UnsupportedVersion(major, minor)),
    };
    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8(header).map_err(|e| NpyError::Header(e.to_string()))?;

    let descr = dict_value(&header, "descr")?;
    let descr = descr.trim_matches(|c: char| c == '\'' || c == '"');
    if descr != "<f8" {
        return Err(NpyError::Dtype(descr.to_string()));
    }
    if dict_value(&header, "fortran_order")? != "False" {
        return Err(NpyError::FortranOrder);
    }
    let shape = parse_shape(dict_value(&header, "shape")?)?;
    let (rows, cols) = match shape.as_slice() {
        [r, c] => (*r, *c),
        _ => return Err(NpyError::Shape(shape)),
    };

    let mut data = vec![0f64; rows * cols];
    reader.read_f64_into::<LittleEndian>(&mut data)?;
    Array2::from_shape_vec((rows, cols), data).map_err(|e| NpyError::Header(e.to_string()))
}

/// Raw text of the value stored under `key` in the header dict.
fn dict_value<'a>(header: &'a str, key: &str) -> std::result::Result<&'a str, NpyError> {
    let quoted = format!("'{key}'");
    let start = header
        .find(&quoted)
        .ok_or_else(|| NpyError::Header(format!("missing key {key}")))?;
    let rest = header[start + quoted.len()..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| NpyError::Header(format!("no value for {key}")))?
        .trim_start();
    let end = if rest.starts_with('(') {
        rest.find(')').map(|i| i + 1)
    } else {
        rest.find(|c: char| c == ',' || c == '}')
    }
    .ok_or_else(|| NpyError::Header(format!("unterminated value for {key}")))?;
    Ok(rest[..end].trim())
}

fn parse_shape(text: &str) -> std::result::Result<Vec<usize>, NpyError> {
    text.trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| NpyError::Header(format!("bad shape entry '{s}'")))
        })
        .collect()
}

/// Save a matrix as `.npy`, creating parent directories.
pub fn save_array<P: AsRef<Path>>(array: &Array2<f64>, path: P) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| PipelineError::persistence(format!("Failed to create {}", path.display()), e))?;
    let mut writer = BufWriter::new(file);
    write_npy(&mut writer, array)
        .and_then(|_| writer.flush().map_err(NpyError::from))
        .map_err(|e| PipelineError::persistence(format!("Failed to write {}", path.display()), e))?;
    log::debug!(
        "Saved {}x{} array to {}",
        array.nrows(),
        array.ncols(),
        path.display()
    );
    Ok(())
}

pub fn load_array<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| PipelineError::persistence(format!("Failed to open {}", path.display()), e))?;
    read_npy(&mut BufReader::new(file))
        .map_err(|e| PipelineError::persistence(format!("Failed to read {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn header_is_aligned() {
        let mut buf = Vec::new();
        write_npy(&mut buf, &Array2::<f64>::zeros((3, 6))).unwrap();
        let header_len = u16::from_le_bytes([buf[8], buf[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        assert_eq!(buf[10 + header_len - 1], b'\n');
        assert_eq!(buf.len(), 10 + header_len + 3 * 6 * 8);
    }

    #[test]
    fn reads_numpy_written_header() {
        // header layout produced by np.save for a (2, 2) float64 array
        let dict = "{'descr': '<f8', 'fortran_order': False, 'shape': (2, 2), }";
        let mut header = dict.as_bytes().to_vec();
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(b' ');
        }
        header.push(b'\n');
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&[1, 0]);
        buf.extend_from_slice(&(header.len() as u16).to_le_bytes());
        buf.extend_from_slice(&header);
        for v in [1.0f64, 2.0, 3.0, 4.0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        let array = read_npy(&mut buf.as_slice()).unwrap();
        assert_eq!(array, array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn transposed_view_is_written_in_logical_order() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let t = a.t().to_owned();
        let mut buf = Vec::new();
        write_npy(&mut buf, &t).unwrap();
        let back = read_npy(&mut buf.as_slice()).unwrap();
        assert_eq!(back, array![[1.0, 3.0], [2.0, 4.0]]);
    }

    #[test]
    fn rejects_other_dtypes() {
        let mut buf = Vec::new();
        write_npy(&mut buf, &Array2::<f64>::zeros((1, 1))).unwrap();
        let pos = buf.windows(3).position(|w| w == b"<f8").unwrap();
        buf[pos + 1] = b'i';
        assert!(matches!(read_npy(&mut buf.as_slice()), Err(NpyError::Dtype(_))));
    }

    #[test]
    fn file_helpers_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("train.npy");
        let m = array![[0.5, f64::NAN, 1.0]];
        save_array(&m, &path).unwrap();
        let back = load_array(&path).unwrap();
        assert_eq!(back[(0, 0)], 0.5);
        assert!(back[(0, 1)].is_nan());
    }
}
