//! # Dataset Access
//!
//! The extractor only needs three capabilities from a gridded dataset: read a
//! 1-D coordinate, read a text attribute, and read a 4-D field. [`GridSource`]
//! captures exactly that, with a NetCDF-backed implementation for real files
//! and an in-memory one for tests and library callers that already hold arrays.

use crate::error::{Nc2GifError, Result};
use log::debug;
use ndarray::{Array4, IxDyn};
use std::collections::HashMap;
use std::path::Path;

/// Read access to the variables the extractor consumes.
pub trait GridSource {
    /// Reads a 1-D variable as `f64`.
    fn read_coordinate(&self, name: &str) -> Result<Vec<f64>>;

    /// Reads a string attribute attached to a variable.
    fn read_text_attribute(&self, variable: &str, attribute: &str) -> Result<String>;

    /// Reads a 4-D variable as `f32`, shaped (time, depth, lat, lon).
    fn read_field(&self, name: &str) -> Result<Array4<f32>>;
}

/// A NetCDF file opened for reading.
pub struct NetCdfSource {
    file: netcdf::File,
}

impl NetCdfSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening NetCDF file: {}", path.display());
        let file = netcdf::open(path)?;
        Ok(Self { file })
    }

    pub fn file(&self) -> &netcdf::File {
        &self.file
    }

    pub fn close(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| Nc2GifError::MissingVariable(name.to_string()))
    }
}

impl GridSource for NetCdfSource {
    fn read_coordinate(&self, name: &str) -> Result<Vec<f64>> {
        let var = self.variable(name)?;
        let values = var.get_values::<f64, _>(..)?;
        debug!("Read {} values from '{}'", values.len(), name);
        Ok(values)
    }

    fn read_text_attribute(&self, variable: &str, attribute: &str) -> Result<String> {
        let var = self.variable(variable)?;
        let missing = || Nc2GifError::MissingAttribute {
            variable: variable.to_string(),
            attribute: attribute.to_string(),
        };
        let attr = var.attribute(attribute).ok_or_else(missing)?;
        match attr.value()? {
            netcdf::AttributeValue::Str(s) => Ok(s),
            netcdf::AttributeValue::Strs(mut strs) if !strs.is_empty() => Ok(strs.remove(0)),
            _ => Err(missing()),
        }
    }

    fn read_field(&self, name: &str) -> Result<Array4<f32>> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if shape.len() != 4 {
            return Err(Nc2GifError::ShapeMismatch(format!(
                "variable '{}' has {} dimensions, expected 4 (time, depth, lat, lon)",
                name,
                shape.len()
            )));
        }
        let values = var.get_values::<f32, _>(..)?;
        let field = Array4::from_shape_vec((shape[0], shape[1], shape[2], shape[3]), values)?;
        debug!("Read field '{}' with shape {:?}", name, field.shape());
        Ok(field)
    }
}

/// In-memory dataset.
///
/// ```rust
/// use nc2gif::dataset::{GridSource, MemorySource};
///
/// let source = MemorySource::new()
///     .with_coordinate("lat", vec![-45.0, 45.0])
///     .with_attribute("time", "units", "days since 1800-1-1");
/// assert_eq!(source.read_coordinate("lat")?.len(), 2);
/// assert!(source.read_coordinate("lon").is_err());
/// # Ok::<(), nc2gif::error::Nc2GifError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    coordinates: HashMap<String, Vec<f64>>,
    attributes: HashMap<(String, String), String>,
    fields: HashMap<String, ndarray::ArrayD<f32>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coordinate(mut self, name: &str, values: Vec<f64>) -> Self {
        self.coordinates.insert(name.to_string(), values);
        self
    }

    pub fn with_attribute(mut self, variable: &str, attribute: &str, value: &str) -> Self {
        self.attributes.insert(
            (variable.to_string(), attribute.to_string()),
            value.to_string(),
        );
        self
    }

    pub fn with_field(mut self, name: &str, field: Array4<f32>) -> Self {
        self.fields.insert(name.to_string(), field.into_dyn());
        self
    }

    /// Stores a field of arbitrary rank, for exercising shape checks.
    pub fn with_raw_field(mut self, name: &str, shape: &[usize], values: Vec<f32>) -> Result<Self> {
        let field = ndarray::ArrayD::from_shape_vec(IxDyn(shape), values)?;
        self.fields.insert(name.to_string(), field);
        Ok(self)
    }

    fn has_variable(&self, name: &str) -> bool {
        self.coordinates.contains_key(name) || self.fields.contains_key(name)
    }
}

impl GridSource for MemorySource {
    fn read_coordinate(&self, name: &str) -> Result<Vec<f64>> {
        self.coordinates
            .get(name)
            .cloned()
            .ok_or_else(|| Nc2GifError::MissingVariable(name.to_string()))
    }

    fn read_text_attribute(&self, variable: &str, attribute: &str) -> Result<String> {
        if !self.has_variable(variable) {
            return Err(Nc2GifError::MissingVariable(variable.to_string()));
        }
        self.attributes
            .get(&(variable.to_string(), attribute.to_string()))
            .cloned()
            .ok_or_else(|| Nc2GifError::MissingAttribute {
                variable: variable.to_string(),
                attribute: attribute.to_string(),
            })
    }

    fn read_field(&self, name: &str) -> Result<Array4<f32>> {
        let field = self
            .fields
            .get(name)
            .ok_or_else(|| Nc2GifError::MissingVariable(name.to_string()))?;
        if field.ndim() != 4 {
            return Err(Nc2GifError::ShapeMismatch(format!(
                "variable '{}' has {} dimensions, expected 4 (time, depth, lat, lon)",
                name,
                field.ndim()
            )));
        }
        Ok(field.clone().into_dimensionality::<ndarray::Ix4>()?)
    }
}
