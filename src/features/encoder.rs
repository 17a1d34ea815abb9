//! One-hot encoding of flight records against a fixed, trained column order.

use serde_json::Value;
use std::collections::HashMap;

use crate::error::{DelayError, Result};
use crate::types::{FlightField, FlightRecord, FLIGHT_TYPES, MONTHS};

/// Top-10 columns selected by the reference training run, in coefficient order.
pub const DEFAULT_FEATURE_COLUMNS: [&str; 10] = [
    "OPERA_Latin American Wings",
    "MES_7",
    "MES_10",
    "OPERA_Grupo LATAM",
    "MES_12",
    "TIPOVUELO_I",
    "MES_4",
    "MES_11",
    "OPERA_Sky Airline",
    "OPERA_Copa Air",
];

/// Row-major matrix of encoded features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    width: usize,
    values: Vec<f32>,
}

impl FeatureMatrix {
    pub fn new(width: usize, values: Vec<f32>) -> Result<Self> {
        if width == 0 && !values.is_empty() {
            return Err(DelayError::ShapeMismatch {
                expected: 0,
                actual: values.len(),
            });
        }
        if width > 0 && values.len() % width != 0 {
            return Err(DelayError::ShapeMismatch {
                expected: width,
                actual: values.len() % width,
            });
        }
        Ok(Self { width, values })
    }

    /// Build from explicit rows; every row must have the same length.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut values = Vec::with_capacity(width * rows.len());
        for row in rows {
            if row.len() != width {
                return Err(DelayError::ShapeMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Ok(Self { width, values })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn n_rows(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.values.len() / self.width
        }
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.width)?;
        self.values.get(start..start + self.width)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        // chunks_exact panics on 0
        self.values.chunks_exact(self.width.max(1))
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Maps `(field, category)` pairs to column positions. Built once per
/// column set; encoding is then a handful of hash lookups per record.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    columns: Vec<String>,
    opera: HashMap<String, usize>,
    tipo_vuelo: HashMap<String, usize>,
    mes: HashMap<i64, usize>,
}

impl FeatureEncoder {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Result<Self> {
        if columns.is_empty() {
            return Err(DelayError::InvalidColumn("empty column set".to_string()));
        }

        let mut enc = Self {
            columns: Vec::with_capacity(columns.len()),
            opera: HashMap::new(),
            tipo_vuelo: HashMap::new(),
            mes: HashMap::new(),
        };

        for (idx, col) in columns.iter().enumerate() {
            let col = col.as_ref();
            let (prefix, category) = col
                .split_once('_')
                .ok_or_else(|| DelayError::InvalidColumn(col.to_string()))?;
            let field = FlightField::from_prefix(prefix)
                .ok_or_else(|| DelayError::InvalidColumn(col.to_string()))?;

            let fresh = match field {
                FlightField::Opera => enc.opera.insert(category.to_string(), idx).is_none(),
                FlightField::TipoVuelo => {
                    if !FLIGHT_TYPES.contains(&category) {
                        return Err(DelayError::InvalidColumn(col.to_string()));
                    }
                    enc.tipo_vuelo.insert(category.to_string(), idx).is_none()
                }
                FlightField::Mes => {
                    let month: i64 = category
                        .parse()
                        .ok()
                        .filter(|m| MONTHS.contains(m))
                        .ok_or_else(|| DelayError::InvalidColumn(col.to_string()))?;
                    enc.mes.insert(month, idx).is_none()
                }
                _ => unreachable!("from_prefix only yields encoded fields"),
            };
            if !fresh {
                return Err(DelayError::InvalidColumn(format!("duplicate column {}", col)));
            }
            enc.columns.push(col.to_string());
        }

        Ok(enc)
    }

    /// Encoder over [`DEFAULT_FEATURE_COLUMNS`].
    pub fn with_default_columns() -> Self {
        Self::new(&DEFAULT_FEATURE_COLUMNS).expect("default columns are well formed")
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Encode validated records. Categories without a column contribute zeros.
    pub fn encode(&self, records: &[FlightRecord]) -> Result<FeatureMatrix> {
        let width = self.width();
        let mut values = vec![0.0f32; width * records.len()];

        for (i, record) in records.iter().enumerate() {
            record.validate(i)?;
            let row = &mut values[i * width..(i + 1) * width];
            if let Some(&c) = self.opera.get(&record.opera) {
                row[c] = 1.0;
            }
            if let Some(&c) = self.tipo_vuelo.get(&record.tipo_vuelo) {
                row[c] = 1.0;
            }
            if let Some(&c) = self.mes.get(&record.mes) {
                row[c] = 1.0;
            }
        }

        let nonzero = values.iter().filter(|x| **x != 0.0).count();
        tracing::debug!(rows = records.len(), width, nonzero, "encoded flight batch");

        Ok(FeatureMatrix { width, values })
    }

    /// Validate untyped JSON records, then encode them.
    pub fn encode_json(&self, records: &[Value]) -> Result<FeatureMatrix> {
        let parsed = crate::types::parse_flights(records)?;
        self.encode(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn col(enc: &FeatureEncoder, name: &str) -> usize {
        enc.columns().iter().position(|c| c == name).unwrap()
    }

    #[test]
    fn test_known_categories_set_their_columns() {
        let enc = FeatureEncoder::with_default_columns();
        let m = enc
            .encode(&[FlightRecord::new("Grupo LATAM", "I", 7)])
            .unwrap();

        assert_eq!(m.width(), 10);
        assert_eq!(m.n_rows(), 1);
        let row = m.row(0).unwrap();
        assert_eq!(row[col(&enc, "OPERA_Grupo LATAM")], 1.0);
        assert_eq!(row[col(&enc, "TIPOVUELO_I")], 1.0);
        assert_eq!(row[col(&enc, "MES_7")], 1.0);
        assert_eq!(row.iter().sum::<f32>(), 3.0);
    }

    #[test]
    fn test_unknown_categories_are_zero() {
        let enc = FeatureEncoder::with_default_columns();
        // none of these have a column in the top-10 set
        let m = enc
            .encode(&[FlightRecord::new("Some New Airline", "N", 3)])
            .unwrap();
        assert_eq!(m.width(), 10);
        assert!(m.row(0).unwrap().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_width_is_constant() {
        let enc = FeatureEncoder::with_default_columns();
        let records = vec![
            FlightRecord::new("Aerolineas Argentinas", "N", 3),
            FlightRecord::new("Copa Air", "I", 12),
            FlightRecord::new("Unknown", "N", 1),
        ];
        let m = enc.encode(&records).unwrap();
        assert_eq!(m.n_rows(), 3);
        for row in m.rows() {
            assert_eq!(row.len(), enc.width());
        }
    }

    #[test]
    fn test_deterministic() {
        let enc = FeatureEncoder::with_default_columns();
        let records = vec![
            FlightRecord::new("Sky Airline", "I", 10),
            FlightRecord::new("Latin American Wings", "N", 4),
        ];
        let a = enc.encode(&records).unwrap();
        let b = enc.encode(&records).unwrap();
        let bits_a: Vec<u32> = a.values().iter().map(|x| x.to_bits()).collect();
        let bits_b: Vec<u32> = b.values().iter().map(|x| x.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_column_order_follows_known_columns() {
        let enc = FeatureEncoder::new(&["MES_3", "OPERA_Copa Air", "TIPOVUELO_N"]).unwrap();
        let m = enc.encode(&[FlightRecord::new("Copa Air", "N", 3)]).unwrap();
        assert_eq!(m.row(0).unwrap(), &[1.0, 1.0, 1.0]);

        let m = enc.encode(&[FlightRecord::new("Copa Air", "I", 5)]).unwrap();
        assert_eq!(m.row(0).unwrap(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        let enc = FeatureEncoder::with_default_columns();
        let err = enc
            .encode(&[
                FlightRecord::new("Grupo LATAM", "N", 3),
                FlightRecord::new("Grupo LATAM", "N", 13),
            ])
            .unwrap_err();
        assert_eq!(err.index(), Some(1));
        assert_eq!(err.field(), Some(FlightField::Mes));
    }

    #[test]
    fn test_invalid_flight_type_is_rejected() {
        let enc = FeatureEncoder::with_default_columns();
        let err = enc
            .encode(&[FlightRecord::new("Grupo LATAM", "O", 3)])
            .unwrap_err();
        assert_eq!(err.field(), Some(FlightField::TipoVuelo));
    }

    #[test]
    fn test_encode_json_missing_field() {
        let enc = FeatureEncoder::with_default_columns();
        let err = enc
            .encode_json(&[json!({"TIPOVUELO": "N", "MES": 3})])
            .unwrap_err();
        assert_eq!(err.field(), Some(FlightField::Opera));
        assert_eq!(err.index(), Some(0));
    }

    #[test]
    fn test_empty_batch() {
        let enc = FeatureEncoder::with_default_columns();
        let m = enc.encode(&[]).unwrap();
        assert_eq!(m.n_rows(), 0);
        assert_eq!(m.width(), 10);
    }

    #[test]
    fn test_bad_columns() {
        assert!(FeatureEncoder::new::<&str>(&[]).is_err());
        assert!(FeatureEncoder::new(&["AIRPORT_SCL"]).is_err());
        assert!(FeatureEncoder::new(&["MES"]).is_err());
        assert!(FeatureEncoder::new(&["MES_13"]).is_err());
        assert!(FeatureEncoder::new(&["MES_x"]).is_err());
        assert!(FeatureEncoder::new(&["TIPOVUELO_O"]).is_err());
        assert!(FeatureEncoder::new(&["MES_4", "MES_4"]).is_err());
    }

    #[test]
    fn test_matrix_from_rows() {
        let m = FeatureMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(m.width(), 2);
        assert_eq!(m.n_rows(), 2);
        assert!(FeatureMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0]]).is_err());
        assert!(FeatureMatrix::new(3, vec![0.0; 4]).is_err());
    }
}
