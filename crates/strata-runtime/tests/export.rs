use std::fs;
use std::path::Path;
use std::sync::Mutex;

use strata_geom::GridRect;
use strata_io::MeshFormat;
use strata_raster::{GrayImage, ManifestStack, MemoryStack, PixelSize, RasterError};
use strata_runtime::{
    CancelToken, ExportError, ExportObserver, ExportReport, ExportOptions, NoopObserver, Stage, export_mesh,
};

fn gray(rows: &[&str]) -> GrayImage {
    let h = rows.len();
    let w = rows.first().map_or(0, |r| r.len());
    let data = rows
        .iter()
        .flat_map(|r| r.bytes().map(|b| if b == b'#' { 255 } else { 0 }))
        .collect();
    GrayImage::new(w, h, data).unwrap()
}

fn stack(layers: &[&[&str]]) -> MemoryStack {
    let images = layers.iter().map(|rows| gray(rows)).collect();
    MemoryStack::uniform(PixelSize::new(0.05, 0.05), 0.05, images).unwrap()
}

fn run(stack: &MemoryStack, out: &Path, opts: &ExportOptions) -> Result<ExportReport, ExportError> {
    export_mesh(stack, out, opts, &CancelToken::new(), &NoopObserver)
}

fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn stacked_square_exports_six_faces() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cube.stl");
    let s = stack(&[&["##", "##"], &["##", "##"]]);
    let report = run(&s, &out, &ExportOptions::default()).unwrap();

    assert_eq!(report.format, MeshFormat::Stl);
    assert_eq!(report.layers, 2);
    assert_eq!(report.faces.root_faces, 6);
    assert_eq!(report.faces.root_faces + report.faces.links, report.faces.run_faces);
    assert_eq!(report.triangles, 12);
    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes.len(), 84 + 12 * 50);
    assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 12);
    // only the finished mesh is left behind
    assert_eq!(entries(dir.path()), 1);
}

#[test]
fn single_pixel_in_every_format() {
    let dir = tempfile::tempdir().unwrap();
    let s = stack(&[&["...", ".#.", "..."]]);
    for format in MeshFormat::ALL {
        let out = dir.path().join(format!("pixel.{}", format.extension()));
        let report = run(&s, &out, &ExportOptions::default()).unwrap();
        assert_eq!(report.format, format);
        assert_eq!(report.faces.raw_faces, 6);
        assert_eq!(report.triangles, 12, "{format}");
        assert!(out.exists());
    }
    assert_eq!(entries(dir.path()), MeshFormat::ALL.len());
}

#[test]
fn quality_shrinks_the_grid() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("q.obj");
    let s = stack(&[&["#...", "....", "....", "...#"]]);
    let opts = ExportOptions {
        quality: 4,
        ..ExportOptions::default()
    };
    let report = run(&s, &out, &opts).unwrap();
    // the any-rule folds both pixels into one cell
    assert_eq!(report.faces.raw_faces, 6);
    let text = fs::read_to_string(&out).unwrap();
    let max_x = text
        .lines()
        .filter_map(|l| l.strip_prefix("v "))
        .filter_map(|l| l.split_whitespace().next()?.parse::<f32>().ok())
        .fold(0.0f32, f32::max);
    assert!((max_x - 0.2).abs() < 1e-5, "{max_x}");
}

#[test]
fn blank_layers_write_an_empty_mesh() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("empty.stl");
    let s = stack(&[&["..", ".."], &["..", ".."]]);
    let report = run(&s, &out, &ExportOptions::default()).unwrap();
    assert_eq!(report.triangles, 0);
    assert_eq!(fs::metadata(&out).unwrap().len(), 84);
}

#[test]
fn no_layers_write_an_empty_mesh() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("none.ply");
    let s = MemoryStack::new(PixelSize::default(), Vec::new()).unwrap();
    let report = run(&s, &out, &ExportOptions::default()).unwrap();
    assert_eq!(report.layers, 0);
    assert_eq!(report.triangles, 0);
    assert!(out.exists());
}

#[test]
fn unknown_extension_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("model.dxf");
    let err = run(&stack(&[&["#"]]), &out, &ExportOptions::default()).unwrap_err();
    assert!(matches!(err, ExportError::Mesh { stage: Stage::Setup, .. }), "{err}");
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn zero_quality_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("a.stl");
    let opts = ExportOptions {
        quality: 0,
        ..ExportOptions::default()
    };
    let err = run(&stack(&[&["#"]]), &out, &opts).unwrap_err();
    assert!(matches!(err, ExportError::InvalidOptions(_)));
    assert_eq!(err.stage(), Stage::Setup);
    assert!(!out.exists());
}

#[test]
fn bounds_outside_the_image_give_an_empty_grid() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("a.stl");
    let s = stack(&[&["##", "##"]]).with_bounds(GridRect::new(10, 10, 4, 4));
    let err = run(&s, &out, &ExportOptions::default()).unwrap_err();
    assert!(matches!(err, ExportError::EmptyGrid));
    assert!(!out.exists());
}

#[test]
fn mismatched_layer_sizes_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("a.stl");
    let s = stack(&[&["##", "##"], &["###", "###"]]);
    let err = run(&s, &out, &ExportOptions::default()).unwrap_err();
    assert!(
        matches!(
            err,
            ExportError::Raster {
                stage: Stage::Extract,
                source: RasterError::SizeMismatch { .. }
            }
        ),
        "{err}"
    );
    assert_eq!(entries(dir.path()), 0);
}

/// Cancels the export as soon as `stage` begins.
struct CancelAt {
    stage: Stage,
    token: CancelToken,
    seen: Mutex<Vec<Stage>>,
}

impl ExportObserver for CancelAt {
    fn stage_started(&self, stage: Stage, _layers: usize) {
        self.seen.lock().unwrap().push(stage);
        if stage == self.stage {
            self.token.cancel();
        }
    }

    fn layer_done(&self, _stage: Stage, _layer: usize) {}
}

#[test]
fn cancelling_during_collapse_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cancelled.stl");
    let ring: &[&str] = &["###", "#.#", "###"];
    let s = stack(&vec![ring; 6]);
    let token = CancelToken::new();
    let observer = CancelAt {
        stage: Stage::Collapse,
        token: token.clone(),
        seen: Mutex::new(Vec::new()),
    };
    let err = export_mesh(&s, &out, &ExportOptions::default(), &token, &observer).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.stage(), Stage::Collapse);
    assert_eq!(*observer.seen.lock().unwrap(), vec![Stage::Extract, Stage::Collapse]);
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn cancelling_before_emit_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cancelled.ply");
    let s = stack(&[&["#"], &["#"]]);
    let token = CancelToken::new();
    let observer = CancelAt {
        stage: Stage::Emit,
        token: token.clone(),
        seen: Mutex::new(Vec::new()),
    };
    let err = export_mesh(&s, &out, &ExportOptions::default(), &token, &observer).unwrap_err();
    assert!(matches!(err, ExportError::Cancelled { stage: Stage::Emit }));
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn manifest_stack_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let square = "P2\n2 2\n255\n255 255\n255 255\n";
    fs::write(dir.path().join("a.pgm"), square).unwrap();
    fs::write(dir.path().join("b.pgm"), square).unwrap();
    fs::write(
        dir.path().join("stack.toml"),
        "pixel_size = [0.1, 0.1]\nlayer_height = 0.1\n\n[[layer]]\nimage = \"a.pgm\"\n\n[[layer]]\nimage = \"b.pgm\"\n",
    )
    .unwrap();
    let s = ManifestStack::from_path(dir.path().join("stack.toml")).unwrap();
    let out = dir.path().join("out.stl");
    let opts = ExportOptions {
        encoding: strata_io::MeshEncoding::Ascii,
        threads: Some(2),
        ..ExportOptions::default()
    };
    let report = export_mesh(&s, &out, &opts, &CancelToken::new(), &NoopObserver).unwrap();
    assert_eq!(report.triangles, 12);
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("solid strata"));
    assert_eq!(text.matches("facet normal").count(), 12);
}

#[test]
fn options_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("strata.toml");
    fs::write(&cfg, "quality = 3\nthreads = 2\nemit_window = 4\n").unwrap();
    let opts = ExportOptions::from_path(&cfg).unwrap();
    assert_eq!(opts.quality, 3);
    assert_eq!(opts.thread_count(), 2);
    assert_eq!(opts.emit_window, 4);
    assert!(ExportOptions::from_path(dir.path().join("missing.toml")).is_err());
}

fn stl_z_range(text: &str) -> (f32, f32) {
    text.lines()
        .filter_map(|l| l.trim().strip_prefix("vertex "))
        .map(|v| v.split_whitespace().nth(2).unwrap().parse::<f32>().unwrap())
        .fold((f32::MAX, f32::MIN), |(lo, hi), z| (lo.min(z), hi.max(z)))
}

#[test]
fn layer_range_exports_a_closed_slab() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("slab.stl");
    let sq: &[&str] = &["##", "##"];
    // the first layer is out of range, so its size never matters
    let s = stack(&[&["###", "###", "###"], sq, sq, sq]);
    let opts = ExportOptions {
        encoding: strata_io::MeshEncoding::Ascii,
        layer_start: 1,
        layer_end: Some(2),
        ..ExportOptions::default()
    };
    let report = run(&s, &out, &opts).unwrap();
    assert_eq!(report.first_layer, 1);
    assert_eq!(report.layers, 2);
    assert_eq!(report.faces.root_faces, 6);
    assert_eq!(report.triangles, 12);
    let (lo, hi) = stl_z_range(&fs::read_to_string(&out).unwrap());
    assert!((lo - 0.05).abs() < 1e-5, "{lo}");
    assert!((hi - 0.15).abs() < 1e-5, "{hi}");
}

#[test]
fn layer_range_past_the_stack_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("slab.stl");
    let sq: &[&str] = &["#"];
    let opts = ExportOptions {
        layer_start: 1,
        layer_end: Some(2),
        ..ExportOptions::default()
    };
    let err = run(&stack(&[sq, sq]), &out, &opts).unwrap_err();
    assert!(matches!(err, ExportError::InvalidOptions(_)), "{err}");
    assert_eq!(err.stage(), Stage::Setup);
    assert_eq!(entries(dir.path()), 0);
}
