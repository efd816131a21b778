//! Label-keyed telemetry registry
//!
//! Every decoded field is stored as a [`DataPoint`]: the vendor label, a
//! typed [`Value`] and the time it was decoded. A label always maps to the
//! same [`ValueKind`]; the container rejects values of the wrong kind.
//!
//! Updates replace whole data points. [`DataPointContainer::update_from`]
//! never merges inside a value and keeps no history, so a late update with an
//! older timestamp simply wins.

use core::fmt;

use heapless::{LinearMap, String, Vec};

/// Maximum length of string values
pub const MAX_TEXT_LEN: usize = 32;

/// Maximum number of cells in a cell table
pub const MAX_CELLS: usize = 32;

/// Bounded string value
pub type Text = String<MAX_TEXT_LEN>;

/// Ordered (cell index, value) pairs
pub type CellTable = Vec<(u8, u16), MAX_CELLS>;

/// Value domain of a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValueKind {
    U8,
    U16,
    U32,
    I16,
    I32,
    Bool,
    Text,
    Cells,
}

/// A decoded telemetry value
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    I16(i16),
    I32(i32),
    Bool(bool),
    Text(Text),
    Cells(CellTable),
}

impl Value {
    /// The domain this value belongs to
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::U8(_) => ValueKind::U8,
            Value::U16(_) => ValueKind::U16,
            Value::U32(_) => ValueKind::U32,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::Bool(_) => ValueKind::Bool,
            Value::Text(_) => ValueKind::Text,
            Value::Cells(_) => ValueKind::Cells,
        }
    }

    /// Numeric value as `f32`, `None` for booleans, strings and tables
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::U8(v) => Some(v as f32),
            Value::U16(v) => Some(v as f32),
            Value::U32(v) => Some(v as f32),
            Value::I16(v) => Some(v as f32),
            Value::I32(v) => Some(v as f32),
            _ => None,
        }
    }

    /// Build a text value, truncating to [`MAX_TEXT_LEN`] bytes
    pub fn text(s: &str) -> Self {
        let mut text = Text::new();
        for c in s.chars() {
            if text.push(c).is_err() {
                break;
            }
        }
        Value::Text(text)
    }
}

/// Vendor-defined field identifier
///
/// Each vendor provides its own label enum. The metadata drives both
/// validation (`kind`) and presentation (`name`, `unit`, `scale`,
/// `precision`).
pub trait Label: Copy + Eq + fmt::Debug {
    /// The fixed value domain of this label
    fn kind(self) -> ValueKind;

    /// Stable field name for reporting
    fn name(self) -> &'static str;

    /// Physical unit after scaling
    fn unit(self) -> &'static str {
        ""
    }

    /// Factor converting the raw value into `unit`
    fn scale(self) -> f32 {
        1.0
    }

    /// Number of decimals worth displaying
    fn precision(self) -> u8 {
        0
    }
}

/// Errors from registry operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataPointError {
    /// Value kind does not match the label's domain
    KindMismatch,
    /// Container capacity exhausted
    Full,
}

impl fmt::Display for DataPointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataPointError::KindMismatch => write!(f, "value kind does not match label"),
            DataPointError::Full => write!(f, "data point container full"),
        }
    }
}

/// One decoded field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoint<L> {
    label: L,
    value: Value,
    timestamp_ms: u32,
}

impl<L: Label> DataPoint<L> {
    /// Create a data point, checking the value against the label's domain
    pub fn new(label: L, value: Value, timestamp_ms: u32) -> Result<Self, DataPointError> {
        if value.kind() != label.kind() {
            return Err(DataPointError::KindMismatch);
        }
        Ok(Self {
            label,
            value,
            timestamp_ms,
        })
    }

    pub fn label(&self) -> L {
        self.label
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Time of decoding (ms since boot)
    pub fn timestamp_ms(&self) -> u32 {
        self.timestamp_ms
    }

    /// Milliseconds since this data point was decoded
    pub fn age_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.timestamp_ms)
    }

    /// Numeric value converted into the label's unit
    pub fn scaled(&self) -> Option<f32> {
        self.value.as_f32().map(|v| v * self.label.scale())
    }
}

/// Conversion from a stored [`Value`] into a concrete type
///
/// Conversions are strict: a `U16` value does not convert to `u32`.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_value {
    ($ty:ty, $variant:ident) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_from_value!(u8, U8);
impl_from_value!(u16, U16);
impl_from_value!(u32, U32);
impl_from_value!(i16, I16);
impl_from_value!(i32, I32);
impl_from_value!(bool, Bool);
impl_from_value!(Text, Text);
impl_from_value!(CellTable, Cells);

/// Registry of data points, at most one per label
pub struct DataPointContainer<L, const N: usize> {
    points: LinearMap<L, DataPoint<L>, N>,
}

impl<L: Label, const N: usize> Clone for DataPointContainer<L, N> {
    fn clone(&self) -> Self {
        Self {
            points: self.points.clone(),
        }
    }
}

impl<L: Label, const N: usize> PartialEq for DataPointContainer<L, N> {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

impl<L: Label, const N: usize> fmt::Debug for DataPointContainer<L, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<L: Label, const N: usize> Default for DataPointContainer<L, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Label, const N: usize> DataPointContainer<L, N> {
    /// Create an empty container
    pub fn new() -> Self {
        Self {
            points: LinearMap::new(),
        }
    }

    /// Insert or replace the data point for `label`
    pub fn add(&mut self, label: L, value: Value, timestamp_ms: u32) -> Result<(), DataPointError> {
        let point = DataPoint::new(label, value, timestamp_ms)?;
        self.insert(point)
    }

    fn insert(&mut self, point: DataPoint<L>) -> Result<(), DataPointError> {
        self.points
            .insert(point.label, point)
            .map(|_| ())
            .map_err(|_| DataPointError::Full)
    }

    /// Current value for `label`, if present
    pub fn get(&self, label: L) -> Option<&Value> {
        self.points.get(&label).map(|p| &p.value)
    }

    /// Current value for `label` converted to `T`
    pub fn get_as<T: FromValue>(&self, label: L) -> Option<T> {
        self.get(label).and_then(T::from_value)
    }

    /// Current value and its timestamp
    pub fn get_with_timestamp(&self, label: L) -> Option<(&Value, u32)> {
        self.points
            .get(&label)
            .map(|p| (&p.value, p.timestamp_ms))
    }

    /// The whole data point for `label`
    pub fn data_point(&self, label: L) -> Option<&DataPoint<L>> {
        self.points.get(&label)
    }

    /// Numeric value for `label` converted into its unit
    pub fn get_scaled(&self, label: L) -> Option<f32> {
        self.points.get(&label).and_then(DataPoint::scaled)
    }

    /// Check whether `label` is present
    pub fn contains(&self, label: L) -> bool {
        self.points.contains_key(&label)
    }

    /// Replace-or-insert every data point present in `other`
    ///
    /// Labels absent from `other` are left untouched.
    pub fn update_from<const M: usize>(
        &mut self,
        other: &DataPointContainer<L, M>,
    ) -> Result<(), DataPointError> {
        for point in other.iter() {
            self.insert(point.clone())?;
        }
        Ok(())
    }

    /// Iterate over all data points
    pub fn iter(&self) -> impl Iterator<Item = &DataPoint<L>> {
        self.points.values()
    }

    /// Age of the most recently decoded data point
    pub fn newest_age_ms(&self, now_ms: u32) -> Option<u32> {
        self.iter().map(|p| p.age_ms(now_ms)).min()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Remove all data points
    pub fn clear(&mut self) {
        self.points.clear();
    }
}
