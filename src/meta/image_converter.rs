// src/meta/image_converter.rs
//
// Scalar field <-> persisted volume conversion.
//
// - Values are copied cell-for-cell in row-major order both ways.
// - Zero spacing on any axis becomes 1 (the `Grid` convention).
// - Embedded payloads are marked with the "LOCAL" file sentinel; separate-file
//   storage names the payload "<name>.raw" and needs a non-empty name.

use log::warn;

use super::{Pixel, PersistedObject, PersistedVolume, VolumeSubType};
use crate::error::{BridgeError, BridgeWarning};
use crate::grid::Grid;
use crate::scalar_field::ScalarField;

/// File sentinel meaning "payload embedded in the record".
pub const LOCAL_DATA_FILE: &str = "LOCAL";
/// Extension appended to the name of a separately stored payload.
pub const RAW_EXTENSION: &str = ".raw";

/// Identity metadata carried next to a field at the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeIdentity {
    pub id: i32,
    pub parent_id: Option<i32>,
    pub name: String,
}

/// Result of exporting a field: the record plus any non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeExport {
    pub volume: PersistedVolume,
    pub warning: Option<BridgeWarning>,
}

/// Converter bound to one expected volume sub type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageConverter {
    sub_type: VolumeSubType,
    write_images_in_separate_file: bool,
}

impl Default for ImageConverter {
    fn default() -> Self {
        Self::image()
    }
}

impl ImageConverter {
    /// Converter for plain scalar images.
    pub fn image() -> Self {
        Self {
            sub_type: VolumeSubType::Image,
            write_images_in_separate_file: false,
        }
    }

    /// Converter for image masks.
    pub fn mask() -> Self {
        Self {
            sub_type: VolumeSubType::ImageMask,
            write_images_in_separate_file: false,
        }
    }

    pub fn with_separate_file(mut self, on: bool) -> Self {
        self.write_images_in_separate_file = on;
        self
    }

    pub fn sub_type(&self) -> VolumeSubType {
        self.sub_type
    }

    pub fn write_images_in_separate_file(&self) -> bool {
        self.write_images_in_separate_file
    }

    /// Map a field and its identity into a persisted volume.
    pub fn to_volume<P: Pixel>(
        &self,
        field: &ScalarField<P>,
        id: i32,
        parent_id: Option<i32>,
        name: &str,
    ) -> VolumeExport {
        let grid = &field.grid;

        let mut element_data_file = LOCAL_DATA_FILE.to_string();
        let mut warning = None;
        if self.write_images_in_separate_file {
            if name.is_empty() {
                warn!("{}", BridgeWarning::MissingName);
                warning = Some(BridgeWarning::MissingName);
            } else {
                element_data_file = format!("{}{}", name, RAW_EXTENSION);
            }
        }

        let volume = PersistedVolume {
            sub_type: self.sub_type,
            n_dims: grid.ndim(),
            dim_size: grid.size().to_vec(),
            element_spacing: grid.spacing().to_vec(),
            element_data: P::into_buffer(field.data.clone()),
            id,
            parent_id,
            name: name.to_string(),
            binary_data: true,
            element_data_file,
        };

        VolumeExport { volume, warning }
    }

    /// Same as `to_volume`, wrapped as a generic persisted object.
    pub fn to_object<P: Pixel>(
        &self,
        field: &ScalarField<P>,
        identity: &VolumeIdentity,
    ) -> (PersistedObject, Option<BridgeWarning>) {
        let export = self.to_volume(field, identity.id, identity.parent_id, &identity.name);
        (PersistedObject::Volume(export.volume), export.warning)
    }

    /// Rebuild a field of pixel type `P` plus identity from a persisted volume.
    ///
    /// Elements are converted through f64, so a payload of another pixel type
    /// is accepted and narrowed with `as` semantics.
    pub fn from_volume<P: Pixel>(
        &self,
        volume: &PersistedVolume,
    ) -> Result<(ScalarField<P>, VolumeIdentity), BridgeError> {
        if volume.sub_type != self.sub_type {
            return Err(BridgeError::TypeMismatch {
                expected: self.sub_type.as_str().to_string(),
                found: volume.sub_type.as_str().to_string(),
            });
        }
        if volume.dim_size.len() != volume.n_dims {
            return Err(BridgeError::DimensionMismatch {
                expected: volume.n_dims,
                found: volume.dim_size.len(),
            });
        }
        if volume.element_spacing.len() != volume.n_dims {
            return Err(BridgeError::DimensionMismatch {
                expected: volume.n_dims,
                found: volume.element_spacing.len(),
            });
        }

        let n = volume
            .dim_size
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| BridgeError::ExtentOverflow {
                dim_size: volume.dim_size.clone(),
            })?;
        if volume.element_data.len() != n {
            return Err(BridgeError::PayloadLength {
                expected: n,
                found: volume.element_data.len(),
            });
        }

        let grid = Grid::new(&volume.dim_size, &volume.element_spacing);
        let data: Vec<P> = (0..n)
            .map(|i| P::from_f64(volume.element_data.get_f64(i)))
            .collect();

        let identity = VolumeIdentity {
            id: volume.id,
            parent_id: volume.parent_id,
            name: volume.name.clone(),
        };
        Ok((ScalarField::from_vec(grid, data), identity))
    }

    /// Decode any persisted object; only a volume of the expected sub type is accepted.
    pub fn from_object<P: Pixel>(
        &self,
        object: &PersistedObject,
    ) -> Result<(ScalarField<P>, VolumeIdentity), BridgeError> {
        match object {
            PersistedObject::Volume(v) => self.from_volume(v),
            other => Err(BridgeError::TypeMismatch {
                expected: self.sub_type.as_str().to_string(),
                found: other.kind_name().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{GroupObject, PixelBuffer, PixelTypeTag};

    fn small_field() -> ScalarField<f32> {
        ScalarField::from_fn(Grid::new(&[3, 2], &[0.5, 0.0]), |ix| {
            ix[0] as f32 - 2.0 * ix[1] as f32
        })
    }

    #[test]
    fn export_fills_header_and_local_sentinel() {
        let out = ImageConverter::image().to_volume(&small_field(), 7, Some(1), "phi");
        let v = out.volume;
        assert!(out.warning.is_none());
        assert_eq!(v.n_dims, 2);
        assert_eq!(v.dim_size, vec![3, 2]);
        assert_eq!(v.element_spacing, vec![0.5, 1.0]);
        assert_eq!(v.element_type(), PixelTypeTag::Float);
        assert!(v.binary_data);
        assert!(v.is_local());
        assert_eq!(v.sub_type, VolumeSubType::Image);
        assert_eq!(v.element_data.get_f64(4), -1.0); // (1, 1)
    }

    #[test]
    fn separate_file_uses_raw_name() {
        let out = ImageConverter::image()
            .with_separate_file(true)
            .to_volume(&small_field(), 1, None, "surface");
        assert_eq!(out.volume.element_data_file, "surface.raw");
        assert!(out.warning.is_none());
    }

    #[test]
    fn separate_file_without_name_falls_back_to_local() {
        let out = ImageConverter::image()
            .with_separate_file(true)
            .to_volume(&small_field(), 1, None, "");
        assert_eq!(out.warning, Some(BridgeWarning::MissingName));
        assert_eq!(out.volume.element_data_file, LOCAL_DATA_FILE);
    }

    #[test]
    fn wrong_sub_type_or_kind_is_a_type_mismatch() {
        let export = ImageConverter::mask().to_volume(&small_field(), 1, None, "m");
        let err = ImageConverter::image()
            .from_volume::<f32>(&export.volume)
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::TypeMismatch {
                expected: "Image".into(),
                found: "ImageMask".into()
            }
        );

        let group = PersistedObject::Group(GroupObject {
            id: 2,
            parent_id: None,
            name: "g".into(),
        });
        assert!(matches!(
            ImageConverter::image().from_object::<f32>(&group),
            Err(BridgeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn payload_length_is_checked() {
        let mut v = ImageConverter::image()
            .to_volume(&small_field(), 1, None, "x")
            .volume;
        v.dim_size = vec![4, 2];
        assert_eq!(
            ImageConverter::image().from_volume::<f32>(&v).unwrap_err(),
            BridgeError::PayloadLength { expected: 8, found: 6 }
        );
        v.n_dims = 3;
        assert!(matches!(
            ImageConverter::image().from_volume::<f32>(&v),
            Err(BridgeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn overflowing_extent_is_rejected() {
        let mut v = ImageConverter::image()
            .to_volume(&small_field(), 1, None, "x")
            .volume;
        v.dim_size = vec![usize::MAX / 2, 3];
        v.element_data = PixelBuffer::Float(vec![]);
        assert_eq!(
            ImageConverter::image().from_volume::<f32>(&v).unwrap_err(),
            BridgeError::ExtentOverflow {
                dim_size: vec![usize::MAX / 2, 3]
            }
        );
    }

    #[test]
    fn import_narrows_other_pixel_types() {
        let f = ScalarField::from_vec(Grid::unit(&[3]), vec![1.75_f64, -2.5, 300.0]);
        let v = ImageConverter::image().to_volume(&f, 0, None, "").volume;
        let (g, _) = ImageConverter::image().from_volume::<u8>(&v).unwrap();
        // `as` truncates toward zero and saturates
        assert_eq!(g.data, vec![1, 0, 255]);
    }
}
