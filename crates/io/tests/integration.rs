use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use asbuilt_io::{discover_scans, load_model, save_model, save_updated_model, write_report_file};
use asbuilt_recon::config::ReconConfig;
use asbuilt_recon::element::{ElementGeometry, ElementId, ElementKind, FloorId, ModelElement, Placement, Profile};
use asbuilt_recon::evidence::build_report;
use asbuilt_recon::geometry::Point3;
use asbuilt_recon::model::ReconInput;
use asbuilt_recon::store::{MemoryStore, ModelStore};
use asbuilt_recon::run;

fn wall(id: &str, start: (f64, f64), dir: Option<[f64; 3]>, length: f64) -> ModelElement {
    ModelElement {
        id: ElementId::new(id),
        name: id.into(),
        kind: ElementKind::Wall,
        type_ref: Some("Basic Wall:Generic 200".into()),
        properties: BTreeMap::new(),
        openings: vec![],
        geometry: ElementGeometry {
            floor: Some(FloorId::new("L1")),
            placement: Placement {
                location: Point3::new(start.0, start.1, 0.0),
                ref_direction: dir,
            },
            mapped_origin: None,
            axis_length: Some(length),
            profile: Profile::Rectangle { x_dim: length, y_dim: 0.2 },
            height: 3.0,
        },
    }
}

/// Grid-sampled box written as an ASCII cloud with a trailing intensity field.
fn write_slab(dir: &Path, file: &str, x: (f64, f64), y: (f64, f64), z: (f64, f64)) {
    let mut text = String::from("// x y z intensity\n");
    for i in 0..=4 {
        for j in 0..=4 {
            for k in 0..=2 {
                let px = x.0 + (x.1 - x.0) * i as f64 / 4.0;
                let py = y.0 + (y.1 - y.0) * j as f64 / 4.0;
                let pz = z.0 + (z.1 - z.0) * k as f64 / 2.0;
                writeln!(text, "{px} {py} {pz} 128").unwrap();
            }
        }
    }
    std::fs::write(dir.join(file), text).unwrap();
}

#[test]
fn scans_and_model_on_disk_round_trip_through_update() {
    let root = tempfile::tempdir().unwrap();
    let scans = root.path().join("scans");
    std::fs::create_dir(&scans).unwrap();
    write_slab(&scans, "wall1.txt", (0.0, 8.0), (-0.1, 0.1), (0.0, 3.0));
    write_slab(&scans, "wall2.xyz", (0.0, 5.0), (9.9, 10.1), (0.0, 3.0));
    std::fs::write(scans.join("readme.md"), "not a cloud").unwrap();

    let mut model = MemoryStore::new().with_floor("L1", 0.0);
    model.insert(wall("w_south", (0.0, 0.0), None, 8.0)).unwrap();
    model.insert(wall("w_west", (0.0, 0.0), Some([0.0, 1.0, 0.0]), 6.0)).unwrap();
    let model_path = root.path().join("model.json");
    save_model(&model, &model_path).unwrap();

    let clouds = discover_scans(&scans).unwrap();
    assert_eq!(clouds.len(), 2);
    assert!(clouds.iter().all(|c| c.points.len() == 75));

    let mut store = load_model(&model_path).unwrap();
    let input = ReconInput { clouds, region: None };
    let result = run(&ReconConfig::named("disk"), &input, &mut store, true).unwrap();
    assert_eq!(result.summary.created, 1);
    assert_eq!(result.summary.delete, 1);

    let out = save_updated_model(&store, &root.path().join("out")).unwrap();
    let name = out.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("updated_model_") && name.ends_with(".json"), "{name}");
    let reloaded = load_model(&out).unwrap();
    assert!(reloaded.element(&ElementId::new("w_west")).is_none());
    assert_eq!(reloaded.elements(ElementKind::Wall).len(), 2);

    let report = root.path().join("report.csv");
    write_report_file(&build_report(&result), &report).unwrap();
    let text = std::fs::read_to_string(&report).unwrap();
    assert_eq!(text.lines().count(), 1 + result.decisions.len());
    assert!(text.lines().any(|l| l.starts_with("model,w_west,w_west,wall,delete,applied")));
}
