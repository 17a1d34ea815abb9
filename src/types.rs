use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{DelayError, Result};

/// Flight types accepted in `TIPOVUELO`: Nacional, Internacional.
pub const FLIGHT_TYPES: [&str; 2] = ["N", "I"];

/// Valid range for `MES`.
pub const MONTHS: std::ops::RangeInclusive<i64> = 1..=12;

/// Operators seen in the historical dataset. Encoding does not reject
/// airlines outside this list; it is kept for logging unknown operators.
pub const KNOWN_AIRLINES: [&str; 23] = [
    "American Airlines",
    "Air Canada",
    "Air France",
    "Aeromexico",
    "Aerolineas Argentinas",
    "Austral",
    "Avianca",
    "Alitalia",
    "British Airways",
    "Copa Air",
    "Delta Air",
    "Gol Trans",
    "Iberia",
    "K.L.M.",
    "Qantas Airways",
    "United Airlines",
    "Grupo LATAM",
    "Sky Airline",
    "Latin American Wings",
    "Plus Ultra Lineas Aereas",
    "JetSmart SPA",
    "Oceanair Linhas Aereas",
    "Lacsa",
];

/// Raw input fields a validation error can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightField {
    #[serde(rename = "OPERA")]
    Opera,
    #[serde(rename = "TIPOVUELO")]
    TipoVuelo,
    #[serde(rename = "MES")]
    Mes,
    #[serde(rename = "Fecha-I")]
    FechaI,
    #[serde(rename = "Fecha-O")]
    FechaO,
    /// The record itself is not a JSON object.
    #[serde(rename = "record")]
    Record,
}

impl FlightField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightField::Opera => "OPERA",
            FlightField::TipoVuelo => "TIPOVUELO",
            FlightField::Mes => "MES",
            FlightField::FechaI => "Fecha-I",
            FlightField::FechaO => "Fecha-O",
            FlightField::Record => "record",
        }
    }

    /// Column prefix used by the one-hot encoding, for the encoded fields only.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "OPERA" => Some(FlightField::Opera),
            "TIPOVUELO" => Some(FlightField::TipoVuelo),
            "MES" => Some(FlightField::Mes),
            _ => None,
        }
    }
}

impl fmt::Display for FlightField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flight as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    #[serde(rename = "OPERA")]
    pub opera: String,
    #[serde(rename = "TIPOVUELO")]
    pub tipo_vuelo: String,
    #[serde(rename = "MES")]
    pub mes: i64,
}

impl FlightRecord {
    pub fn new(opera: impl Into<String>, tipo_vuelo: impl Into<String>, mes: i64) -> Self {
        Self {
            opera: opera.into(),
            tipo_vuelo: tipo_vuelo.into(),
            mes,
        }
    }

    /// Build a record from an untyped JSON object, reporting the first
    /// absent or mistyped field. Values are never coerced.
    pub fn from_value(index: usize, value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| DelayError::validation(index, FlightField::Record, "expected an object"))?;

        let opera = match obj.get("OPERA") {
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(DelayError::validation(index, FlightField::Opera, "expected a string")),
            None => return Err(DelayError::validation(index, FlightField::Opera, "missing field")),
        };
        let tipo_vuelo = match obj.get("TIPOVUELO") {
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(DelayError::validation(index, FlightField::TipoVuelo, "expected a string"))
            }
            None => return Err(DelayError::validation(index, FlightField::TipoVuelo, "missing field")),
        };
        let mes = match obj.get("MES") {
            Some(v) => v
                .as_i64()
                .ok_or_else(|| DelayError::validation(index, FlightField::Mes, format!("expected an integer, got {}", v)))?,
            None => return Err(DelayError::validation(index, FlightField::Mes, "missing field")),
        };

        let record = Self {
            opera,
            tipo_vuelo,
            mes,
        };
        record.validate(index)?;
        Ok(record)
    }

    /// Check value domains. `index` is the record's position in its batch.
    pub fn validate(&self, index: usize) -> Result<()> {
        if !FLIGHT_TYPES.contains(&self.tipo_vuelo.as_str()) {
            return Err(DelayError::validation(
                index,
                FlightField::TipoVuelo,
                format!("unknown flight type {:?}, expected one of {:?}", self.tipo_vuelo, FLIGHT_TYPES),
            ));
        }
        if !MONTHS.contains(&self.mes) {
            return Err(DelayError::validation(
                index,
                FlightField::Mes,
                format!("month {} outside 1..=12", self.mes),
            ));
        }
        Ok(())
    }

    pub fn is_known_airline(&self) -> bool {
        KNOWN_AIRLINES.contains(&self.opera.as_str())
    }
}

/// Parse and validate a whole batch, failing on the first bad record.
pub fn parse_flights(values: &[Value]) -> Result<Vec<FlightRecord>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| FlightRecord::from_value(i, v))
        .collect()
}

// ---------- HTTP wire types ----------

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    // kept untyped so validation can name the offending record and field
    pub flights: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictResponse {
    pub predict: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
