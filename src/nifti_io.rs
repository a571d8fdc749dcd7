//! NIfTI file I/O for WASM
//!
//! Loads and saves NIfTI files from/to byte arrays, suitable for use in
//! WebAssembly where filesystem access is not available. Both 3D images and
//! 4D time-series are supported; gzip compression is auto-detected on load.

use std::io::Cursor;
use nifti::{NiftiObject, InMemNiftiObject, NiftiHeader};
use nifti::volume::ndarray::IntoNdArray;
use flate2::read::GzDecoder;
use ndarray::Array;

use crate::volume::{scaled_identity_affine, Volume};

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Get header info for diagnostics
fn get_header_info(bytes: &[u8]) -> String {
    if bytes.len() < 348 {
        return format!("File too small ({} bytes, need at least 348)", bytes.len());
    }

    // NIfTI-1 header size should be at offset 0, stored as i32
    let sizeof_hdr = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

    // Magic bytes at offset 344 for NIfTI-1
    let magic = String::from_utf8_lossy(&bytes[344..348]).to_string();

    // Data type at offset 70
    let datatype = i16::from_le_bytes([bytes[70], bytes[71]]);

    format!("sizeof_hdr={}, magic='{}', datatype={}", sizeof_hdr, magic, datatype)
}

/// Load a NIfTI file from bytes
///
/// Supports both .nii and .nii.gz (gzip is auto-detected). 3D images come
/// back with a single frame; 4D time-series keep all frames. Data scaling
/// (scl_slope / scl_inter) is applied during element conversion.
pub fn load_nifti(bytes: &[u8]) -> Result<Volume, String> {
    let obj: InMemNiftiObject = if is_gzip(bytes) {
        let cursor = Cursor::new(bytes);
        let decoder = GzDecoder::new(cursor);
        InMemNiftiObject::from_reader(decoder)
            .map_err(|e| format!("Failed to read gzipped NIfTI: {}", e))?
    } else {
        let info = get_header_info(bytes);
        let cursor = Cursor::new(bytes);
        InMemNiftiObject::from_reader(cursor)
            .map_err(|e| format!("Failed to read NIfTI: {} ({})", e, info))?
    };

    let header = obj.header();
    let ndim = header.dim[0] as usize;
    if ndim < 3 {
        return Err(format!("Expected at least 3D volume, got {}D", ndim));
    }

    let pixdim = header.pixdim;
    let voxel_size = (pixdim[1] as f64, pixdim[2] as f64, pixdim[3] as f64);

    let affine = get_affine(header);

    // Element conversion applies scl_slope/scl_inter from the header
    // (scl_slope == 0 means no scaling, per the NIfTI convention)
    let volume = obj.into_volume();
    let array: Array<f64, _> = volume.into_ndarray()
        .map_err(|e| format!("Failed to convert to ndarray: {}", e))?;

    let shape = array.shape();
    if shape.len() < 3 {
        return Err(format!("Expected at least 3D array, got {}D", shape.len()));
    }

    // Use the actual array shape (nifti-rs may squeeze trailing dims)
    let (nx, ny, nz) = (shape[0], shape[1], shape[2]);
    let nt = if shape.len() >= 4 { shape[3] } else { 1 };

    // Extract data in Fortran order (x varies fastest) to match the NIfTI
    // convention: index = x + y*nx + z*nx*ny + t*nx*ny*nz
    let mut data = Vec::with_capacity(nx * ny * nz * nt);
    if shape.len() == 3 {
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    data.push(array[[i, j, k]]);
                }
            }
        }
    } else {
        for t in 0..nt {
            for k in 0..nz {
                for j in 0..ny {
                    for i in 0..nx {
                        data.push(array[[i, j, k, t]]);
                    }
                }
            }
        }
    }

    Volume::new(data, (nx, ny, nz, nt), voxel_size, affine)
}

/// Get affine transformation matrix from header
fn get_affine(header: &NiftiHeader) -> [f64; 16] {
    // Prefer sform if available (sform_code > 0)
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else {
        // Fall back to identity with voxel scaling
        scaled_identity_affine(
            header.pixdim[1] as f64,
            header.pixdim[2] as f64,
            header.pixdim[3] as f64,
        )
    }
}

/// Save a volume as NIfTI bytes
///
/// Writes an uncompressed .nii file with float32 data. Volumes with more
/// than one frame are written as 4D.
pub fn save_nifti(volume: &Volume) -> Result<Vec<u8>, String> {
    use std::io::Write;

    let (nx, ny, nz, nt) = volume.dims;
    let (vsx, vsy, vsz) = volume.voxel_size;
    let affine = &volume.affine;

    // Create NIfTI-1 header (348 bytes)
    let mut header = [0u8; 348];

    // sizeof_hdr = 348
    header[0..4].copy_from_slice(&348i32.to_le_bytes());

    // dim[0..7]
    let ndim: i16 = if nt > 1 { 4 } else { 3 };
    let dim: [i16; 8] = [ndim, nx as i16, ny as i16, nz as i16, nt as i16, 1, 1, 1];
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    // datatype = 16 (FLOAT32)
    header[70..72].copy_from_slice(&16i16.to_le_bytes());

    // bitpix = 32
    header[72..74].copy_from_slice(&32i16.to_le_bytes());

    // pixdim[0..7]
    let pixdim: [f32; 8] = [1.0, vsx as f32, vsy as f32, vsz as f32, 1.0, 1.0, 1.0, 1.0];
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }

    // vox_offset = 352 (header + 4 bytes extension)
    header[108..112].copy_from_slice(&352.0f32.to_le_bytes());

    // scl_slope = 1.0
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes());

    // scl_inter = 0.0
    header[116..120].copy_from_slice(&0.0f32.to_le_bytes());

    // sform_code = 1 (scanner anat)
    header[254..256].copy_from_slice(&1i16.to_le_bytes());

    // srow_x, srow_y, srow_z
    for row in 0..3 {
        for i in 0..4 {
            let offset = 280 + row * 16 + i * 4;
            header[offset..offset + 4]
                .copy_from_slice(&(affine[row * 4 + i] as f32).to_le_bytes());
        }
    }

    // magic = "n+1\0" for NIfTI-1 single file
    header[344..348].copy_from_slice(b"n+1\0");

    // Build output buffer
    let mut buffer = Vec::with_capacity(352 + volume.data.len() * 4);

    buffer.write_all(&header).map_err(|e| format!("Write header failed: {}", e))?;

    // Extension flag (4 bytes, all zeros = no extension)
    buffer.write_all(&[0u8; 4]).map_err(|e| format!("Write extension failed: {}", e))?;

    // Data as float32
    for &val in &volume.data {
        buffer.write_all(&(val as f32).to_le_bytes())
            .map_err(|e| format!("Write data failed: {}", e))?;
    }

    Ok(buffer)
}

/// Save a volume as gzipped NIfTI bytes (.nii.gz)
pub fn save_nifti_gz(volume: &Volume) -> Result<Vec<u8>, String> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let uncompressed = save_nifti(volume)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&uncompressed)
        .map_err(|e| format!("Gzip compression failed: {}", e))?;

    encoder.finish()
        .map_err(|e| format!("Gzip finish failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_identity() {
        let mut header = NiftiHeader::default();
        header.pixdim[1] = 1.0;
        header.pixdim[2] = 2.0;
        header.pixdim[3] = 3.0;
        header.sform_code = 0;

        let affine = get_affine(&header);
        assert_eq!(affine[0], 1.0);
        assert_eq!(affine[5], 2.0);
        assert_eq!(affine[10], 3.0);
    }

    #[test]
    fn test_gzip_detection() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x00]));
        assert!(!is_gzip(&[0x00, 0x00, 0x00]));
        assert!(!is_gzip(&[0x1f])); // Too short
    }

    #[test]
    fn test_save_nifti_header_3d() {
        let volume = Volume::new(
            vec![0.0; 8],
            (2, 2, 2, 1),
            (1.0, 1.0, 1.0),
            scaled_identity_affine(1.0, 1.0, 1.0),
        ).unwrap();

        let bytes = save_nifti(&volume).unwrap();

        // 348 header + 4 ext + 8 floats
        assert_eq!(bytes.len(), 352 + 8 * 4);
        assert_eq!(&bytes[344..348], b"n+1\0");

        let sizeof_hdr = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(sizeof_hdr, 348);

        // dim[0] = 3 for a single frame
        let dim0 = i16::from_le_bytes([bytes[40], bytes[41]]);
        assert_eq!(dim0, 3);
    }

    #[test]
    fn test_save_nifti_header_4d() {
        let volume = Volume::new(
            vec![0.0; 24],
            (2, 2, 2, 3),
            (1.0, 1.0, 1.0),
            scaled_identity_affine(1.0, 1.0, 1.0),
        ).unwrap();

        let bytes = save_nifti(&volume).unwrap();
        assert_eq!(bytes.len(), 352 + 24 * 4);

        let dim0 = i16::from_le_bytes([bytes[40], bytes[41]]);
        let dim4 = i16::from_le_bytes([bytes[48], bytes[49]]);
        assert_eq!(dim0, 4);
        assert_eq!(dim4, 3);
    }

    #[test]
    fn test_load_applies_scaling() {
        let data: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let volume = Volume::new(
            data,
            (2, 2, 2, 1),
            (1.0, 1.0, 1.0),
            scaled_identity_affine(1.0, 1.0, 1.0),
        ).unwrap();

        let mut bytes = save_nifti(&volume).unwrap();

        // Patch scl_slope (offset 112) and scl_inter (offset 116)
        bytes[112..116].copy_from_slice(&2.0f32.to_le_bytes());
        bytes[116..120].copy_from_slice(&1.0f32.to_le_bytes());

        let loaded = load_nifti(&bytes).unwrap();
        for (i, v) in loaded.data.iter().enumerate() {
            let expected = i as f64 * 2.0 + 1.0;
            assert!((v - expected).abs() < 1e-6,
                    "voxel {}: expected {}, got {}", i, expected, v);
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let data: Vec<f64> = (0..24).map(|i| i as f64 * 0.5).collect();
        let volume = Volume::new(
            data.clone(),
            (2, 2, 2, 3),
            (2.0, 2.0, 2.0),
            scaled_identity_affine(2.0, 2.0, 2.0),
        ).unwrap();

        let bytes = save_nifti(&volume).unwrap();
        let loaded = load_nifti(&bytes).unwrap();

        assert_eq!(loaded.dims, (2, 2, 2, 3));
        for (a, b) in loaded.data.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1e-6, "expected {}, got {}", b, a);
        }
    }
}
