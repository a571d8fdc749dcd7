//! Regressor matrix type and plain-text parsing
//!
//! The regressor (design matrix) has one row per time point and one column
//! per task/regressor. Files use the framework's plain-text matrix format:
//! one row per line, fields separated by whitespace or commas, `#` lines
//! ignored.

/// Dense row-major matrix
#[derive(Clone, Debug)]
pub struct Matrix {
    pub data: Vec<f64>,
    pub rows: usize,
    pub cols: usize,
}

impl Matrix {
    /// Create a matrix, checking that the buffer matches the shape
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self, String> {
        if rows == 0 || cols == 0 {
            return Err(format!("invalid matrix shape {}x{}", rows, cols));
        }
        if data.len() != rows * cols {
            return Err(format!(
                "matrix buffer has {} values, expected {} ({}x{})",
                data.len(), rows * cols, rows, cols
            ));
        }
        Ok(Matrix { data, rows, cols })
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }
}

/// Parse a plain-text matrix
///
/// Rows must be rectangular and every field must be a finite number.
pub fn parse_matrix(text: &str) -> Result<Matrix, String> {
    let mut data = Vec::new();
    let mut cols = 0usize;
    let mut rows = 0usize;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();

        if rows == 0 {
            cols = fields.len();
        } else if fields.len() != cols {
            return Err(format!(
                "line {}: expected {} fields, got {}",
                lineno + 1, cols, fields.len()
            ));
        }

        for f in fields {
            let v: f64 = f.parse()
                .map_err(|_| format!("line {}: invalid number '{}'", lineno + 1, f))?;
            if !v.is_finite() {
                return Err(format!("line {}: non-finite value '{}'", lineno + 1, f));
            }
            data.push(v);
        }
        rows += 1;
    }

    if rows == 0 {
        return Err("matrix file has no rows".to_string());
    }

    Matrix::new(data, rows, cols)
}
