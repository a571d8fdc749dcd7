//! Image volume handles
//!
//! A `Volume` is the in-memory form of a NIfTI image: a flat f64 buffer in
//! Fortran order (x varies fastest) plus geometry. Time-series data uses the
//! fourth dimension; 3D images have `nt == 1`.

/// An image volume with geometry
///
/// Layout: index = x + y*nx + z*nx*ny + t*nx*ny*nz
#[derive(Clone, Debug)]
pub struct Volume {
    /// Voxel data, one frame after another
    pub data: Vec<f64>,
    /// Dimensions (nx, ny, nz, nt)
    pub dims: (usize, usize, usize, usize),
    /// Voxel sizes in mm
    pub voxel_size: (f64, f64, f64),
    /// Affine transformation matrix (4x4, row-major)
    pub affine: [f64; 16],
}

impl Volume {
    /// Create a volume, checking that the buffer matches the dimensions
    pub fn new(
        data: Vec<f64>,
        dims: (usize, usize, usize, usize),
        voxel_size: (f64, f64, f64),
        affine: [f64; 16],
    ) -> Result<Self, String> {
        let (nx, ny, nz, nt) = dims;
        if nx == 0 || ny == 0 || nz == 0 || nt == 0 {
            return Err(format!("invalid dimensions {}x{}x{}x{}", nx, ny, nz, nt));
        }
        let expected = nx * ny * nz * nt;
        if data.len() != expected {
            return Err(format!(
                "volume buffer has {} values, expected {} ({}x{}x{}x{})",
                data.len(), expected, nx, ny, nz, nt
            ));
        }
        Ok(Volume { data, dims, voxel_size, affine })
    }

    /// Number of voxels in one frame (nx * ny * nz)
    pub fn frame_len(&self) -> usize {
        self.dims.0 * self.dims.1 * self.dims.2
    }

    /// Number of frames (time points)
    pub fn num_frames(&self) -> usize {
        self.dims.3
    }

    /// Binarize the first frame into an indicator mask
    ///
    /// Any non-zero voxel becomes 1. Used for mask inputs, which may arrive
    /// as objectmaps or probability images rather than strict 0/1 volumes.
    pub fn to_mask(&self) -> Vec<u8> {
        self.data[..self.frame_len()]
            .iter()
            .map(|&v| if v != 0.0 { 1 } else { 0 })
            .collect()
    }
}

/// Identity affine with voxel scaling on the diagonal
pub fn scaled_identity_affine(vsx: f64, vsy: f64, vsz: f64) -> [f64; 16] {
    [
        vsx, 0.0, 0.0, 0.0,
        0.0, vsy, 0.0, 0.0,
        0.0, 0.0, vsz, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ]
}
