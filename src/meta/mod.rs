// src/meta/mod.rs
//
// Persisted "meta object" model for scalar and mask volumes.
//
// A persisted object is a closed sum type; converters decode it explicitly and
// report a type mismatch instead of casting. Pixel element types form a closed
// set resolved at compile time through the `Pixel` trait.
//
// Data order is row-major with axis 0 fastest, the same as `Grid`.

pub mod image_converter;

pub use image_converter::{ImageConverter, VolumeExport, VolumeIdentity, LOCAL_DATA_FILE};

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Element type tag of a persisted pixel payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelTypeTag {
    UChar,
    Char,
    UShort,
    Short,
    UInt,
    Int,
    Float,
    Double,
}

impl PixelTypeTag {
    /// Name used in MetaIO headers.
    pub fn met_name(&self) -> &'static str {
        match self {
            Self::UChar => "MET_UCHAR",
            Self::Char => "MET_CHAR",
            Self::UShort => "MET_USHORT",
            Self::Short => "MET_SHORT",
            Self::UInt => "MET_UINT",
            Self::Int => "MET_INT",
            Self::Float => "MET_FLOAT",
            Self::Double => "MET_DOUBLE",
        }
    }

    /// Bytes per element.
    pub fn size_of(&self) -> usize {
        match self {
            Self::UChar | Self::Char => 1,
            Self::UShort | Self::Short => 2,
            Self::UInt | Self::Int | Self::Float => 4,
            Self::Double => 8,
        }
    }
}

/// Typed linear pixel payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values")]
pub enum PixelBuffer {
    UChar(Vec<u8>),
    Char(Vec<i8>),
    UShort(Vec<u16>),
    Short(Vec<i16>),
    UInt(Vec<u32>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl PixelBuffer {
    pub fn tag(&self) -> PixelTypeTag {
        match self {
            Self::UChar(_) => PixelTypeTag::UChar,
            Self::Char(_) => PixelTypeTag::Char,
            Self::UShort(_) => PixelTypeTag::UShort,
            Self::Short(_) => PixelTypeTag::Short,
            Self::UInt(_) => PixelTypeTag::UInt,
            Self::Int(_) => PixelTypeTag::Int,
            Self::Float(_) => PixelTypeTag::Float,
            Self::Double(_) => PixelTypeTag::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::UChar(v) => v.len(),
            Self::Char(v) => v.len(),
            Self::UShort(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` widened to f64 (exact for every supported type).
    pub fn get_f64(&self, i: usize) -> f64 {
        match self {
            Self::UChar(v) => v[i] as f64,
            Self::Char(v) => v[i] as f64,
            Self::UShort(v) => v[i] as f64,
            Self::Short(v) => v[i] as f64,
            Self::UInt(v) => v[i] as f64,
            Self::Int(v) => v[i] as f64,
            Self::Float(v) => v[i] as f64,
            Self::Double(v) => v[i],
        }
    }
}

/// Pixel element types a volume can carry.
pub trait Pixel: Copy + Default + Send + Sync + 'static {
    const TAG: PixelTypeTag;

    fn into_buffer(values: Vec<Self>) -> PixelBuffer;

    /// Narrowing conversion from a widened element (`as` semantics).
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_pixel {
    ($t:ty, $variant:ident) => {
        impl Pixel for $t {
            const TAG: PixelTypeTag = PixelTypeTag::$variant;

            fn into_buffer(values: Vec<Self>) -> PixelBuffer {
                PixelBuffer::$variant(values)
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}

impl_pixel!(u8, UChar);
impl_pixel!(i8, Char);
impl_pixel!(u16, UShort);
impl_pixel!(i16, Short);
impl_pixel!(u32, UInt);
impl_pixel!(i32, Int);
impl_pixel!(f32, Float);
impl_pixel!(f64, Double);

/// Which kind of image a persisted volume holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeSubType {
    Image,
    ImageMask,
}

impl VolumeSubType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::ImageMask => "ImageMask",
        }
    }
}

/// Persisted scalar/mask volume record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedVolume {
    pub sub_type: VolumeSubType,
    pub n_dims: usize,
    pub dim_size: Vec<usize>,
    pub element_spacing: Vec<f64>,
    pub element_data: PixelBuffer,
    pub id: i32,
    pub parent_id: Option<i32>,
    pub name: String,
    /// Payload is binary rather than ASCII.
    pub binary_data: bool,
    /// `LOCAL_DATA_FILE` when embedded, otherwise the external raw file name.
    pub element_data_file: String,
}

impl PersistedVolume {
    pub fn element_type(&self) -> PixelTypeTag {
        self.element_data.tag()
    }

    /// True when the payload is stored in this record rather than a separate file.
    pub fn is_local(&self) -> bool {
        self.element_data_file == LOCAL_DATA_FILE
    }
}

/// A group node: identity only, no pixel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupObject {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub name: String,
}

/// Any persisted object a converter may be handed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object")]
pub enum PersistedObject {
    Volume(PersistedVolume),
    Group(GroupObject),
}

impl PersistedObject {
    /// Human-readable kind, used in type-mismatch reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Volume(v) => v.sub_type.as_str(),
            Self::Group(_) => "Group",
        }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Write as pretty JSON.
    pub fn save_json(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut w = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> std::io::Result<Self> {
        let r = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(r)?)
    }
}
