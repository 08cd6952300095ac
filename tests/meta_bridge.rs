// tests/meta_bridge.rs
//
// Field <-> persisted volume conversion through the public API.
// Run with: cargo test --test meta_bridge

use std::path::PathBuf;

use aniso_levelset::error::{BridgeError, BridgeWarning};
use aniso_levelset::evolution::LevelSetEvolution;
use aniso_levelset::grid::Grid;
use aniso_levelset::initial_states::centered_square_step;
use aniso_levelset::meta::{
    GroupObject, ImageConverter, PersistedObject, PixelBuffer, PixelTypeTag, VolumeIdentity,
    VolumeSubType, LOCAL_DATA_FILE,
};
use aniso_levelset::scalar_field::ScalarField;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("aniso_levelset_{}", std::process::id()))
        .join(name)
}

#[test]
fn u8_mask_round_trips_exactly() {
    let grid = Grid::new(&[5, 4, 3], &[0.25, 0.5, 2.0]);
    let mask = ScalarField::from_fn(grid, |ix| ((ix[0] + ix[1] * ix[2]) % 2) as u8 * 255);

    let conv = ImageConverter::mask();
    let out = conv.to_volume(&mask, 11, Some(3), "mask");
    assert_eq!(out.volume.sub_type, VolumeSubType::ImageMask);
    assert_eq!(out.volume.element_type(), PixelTypeTag::UChar);

    let (back, id) = conv.from_volume::<u8>(&out.volume).unwrap();
    assert_eq!(back, mask);
    assert_eq!(
        id,
        VolumeIdentity {
            id: 11,
            parent_id: Some(3),
            name: "mask".into()
        }
    );
}

#[test]
fn signed_and_float_images_round_trip_exactly() {
    let grid = Grid::new(&[7, 3], &[1.5, 0.75]);

    let shorts = ScalarField::from_fn(grid.clone(), |ix| ix[0] as i16 * 1000 - ix[1] as i16 * 7 - 3000);
    let v = ImageConverter::image().to_volume(&shorts, 1, None, "s").volume;
    assert_eq!(v.element_type(), PixelTypeTag::Short);
    assert_eq!(ImageConverter::image().from_volume::<i16>(&v).unwrap().0, shorts);

    let floats = ScalarField::from_fn(grid.clone(), |ix| (ix[0] as f32).sin() / (1.0 + ix[1] as f32));
    let v = ImageConverter::image().to_volume(&floats, 2, None, "f").volume;
    assert_eq!(ImageConverter::image().from_volume::<f32>(&v).unwrap().0, floats);

    let doubles = ScalarField::from_fn(grid, |ix| 1.0 / (3.0 + ix[0] as f64 * ix[1] as f64));
    let v = ImageConverter::image().to_volume(&doubles, 3, None, "d").volume;
    assert_eq!(v.element_type(), PixelTypeTag::Double);
    assert_eq!(ImageConverter::image().from_volume::<f64>(&v).unwrap().0, doubles);
}

#[test]
fn zero_spacing_is_normalised_on_import() {
    let field = ScalarField::filled(Grid::unit(&[2, 2]), 1.0_f64);
    let mut v = ImageConverter::image().to_volume(&field, 0, None, "z").volume;
    v.element_spacing = vec![0.0, 0.5];

    let (back, _) = ImageConverter::image().from_volume::<f64>(&v).unwrap();
    assert_eq!(back.grid.spacing(), &[1.0, 0.5]);
}

#[test]
fn unnamed_separate_file_export_warns_and_stays_local() {
    let field = centered_square_step(8, 2);
    let conv = ImageConverter::image().with_separate_file(true);

    let named = conv.to_volume(&field, 0, None, "phi");
    assert_eq!(named.volume.element_data_file, "phi.raw");
    assert!(named.warning.is_none());

    let unnamed = conv.to_volume(&field, 0, None, "");
    assert_eq!(unnamed.warning, Some(BridgeWarning::MissingName));
    assert_eq!(unnamed.volume.element_data_file, LOCAL_DATA_FILE);
    assert!(unnamed.volume.is_local());
    // the payload is still complete
    let (back, _) = conv.from_volume::<f64>(&unnamed.volume).unwrap();
    assert_eq!(back, field);
}

#[test]
fn mask_converter_rejects_images_and_groups() {
    let field = centered_square_step(6, 2);
    let (obj, _) = ImageConverter::image().to_object(
        &field,
        &VolumeIdentity {
            id: 1,
            parent_id: None,
            name: "phi".into(),
        },
    );

    let err = ImageConverter::mask().from_object::<f64>(&obj).unwrap_err();
    assert_eq!(
        err,
        BridgeError::TypeMismatch {
            expected: "ImageMask".into(),
            found: "Image".into()
        }
    );

    let group = PersistedObject::Group(GroupObject {
        id: 9,
        parent_id: Some(1),
        name: "scene".into(),
    });
    match ImageConverter::mask().from_object::<u8>(&group) {
        Err(BridgeError::TypeMismatch { found, .. }) => assert_eq!(found, "Group"),
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[test]
fn evolved_field_survives_json_persistence() {
    let mut ev = LevelSetEvolution::new();
    ev.configure(1, 2, 0.5, 0.1).unwrap();
    let phi = ev.run(centered_square_step(16, 2)).unwrap();

    let identity = VolumeIdentity {
        id: 5,
        parent_id: None,
        name: "smoothed".into(),
    };
    let (obj, warning) = ImageConverter::image().to_object(&phi, &identity);
    assert!(warning.is_none());

    let path = temp_path("smoothed.json");
    obj.save_json(&path).unwrap();
    let loaded = PersistedObject::load_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    // decimal text may lose the last ulp
    let (back, id) = ImageConverter::image().from_object::<f64>(&loaded).unwrap();
    assert_eq!(back.grid, phi.grid);
    assert!(back.max_abs_diff(&phi) < 1e-12);
    assert_eq!(id, identity);
}

#[test]
fn extent_too_large_for_memory_is_an_error() {
    // each axis holds half the address bits, so the product cannot fit in usize
    let big = 1usize << (usize::BITS / 2);
    let mut v = ImageConverter::image()
        .to_volume(&centered_square_step(4, 2), 0, None, "huge")
        .volume;
    v.dim_size = vec![big, big];
    v.element_data = PixelBuffer::Double(Vec::new());

    // the same record after a trip through JSON
    let text = PersistedObject::Volume(v).to_json_string().unwrap();
    let loaded = PersistedObject::from_json_str(&text).unwrap();

    match ImageConverter::image().from_object::<f64>(&loaded) {
        Err(BridgeError::ExtentOverflow { dim_size }) => assert_eq!(dim_size, vec![big, big]),
        other => panic!("expected ExtentOverflow, got {other:?}"),
    }
}
