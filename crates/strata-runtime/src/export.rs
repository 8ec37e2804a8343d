use std::mem;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use strata_io::{DEFAULT_VERTEX_CACHE, MeshFormat, MeshSink, MeshWriter};
use strata_raster::{
    LayerImage, LayerInfo, LayerStack, PixelSize, PrepareOptions, RasterError, Rotate,
    prepare_layer,
};
use strata_voxel::{
    CancelToken, FaceStats, GridGeometry, LayerFaces, StageCtl, Triangle, UvFace, layer_faces,
    link_layers, triangulate_layer,
};

use crate::error::ExportError;
use crate::observer::{ExportObserver, Stage};
use crate::options::ExportOptions;

type Prepared = Result<LayerImage, RasterError>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub extract: Duration,
    pub collapse: Duration,
    pub emit: Duration,
    pub total: Duration,
}

/// Outcome of a finished export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportReport {
    pub output: PathBuf,
    pub format: MeshFormat,
    /// Stack index of the first exported layer.
    pub first_layer: usize,
    /// Number of exported layers.
    pub layers: usize,
    pub faces: FaceStats,
    pub triangles: u64,
    pub timings: StageTimings,
}

#[inline]
fn ms(d: Duration) -> u128 {
    d.as_millis()
}

/// Voxelizes `stack` and streams the exterior surface to `output`.
///
/// The output format comes from the extension of `output`. Only the layers in
/// `options.layer_range` are exported; observer layer indices count from the
/// first of them. The file only appears once the whole mesh is written; on
/// error or cancellation nothing is left at `output`.
pub fn export_mesh(
    stack: &dyn LayerStack,
    output: &Path,
    options: &ExportOptions,
    cancel: &CancelToken,
    observer: &dyn ExportObserver,
) -> Result<ExportReport, ExportError> {
    let started = Instant::now();
    options.validate()?;
    let format = MeshFormat::from_path(output).map_err(ExportError::mesh(Stage::Setup))?;
    let range = options.layer_range(stack.layer_count())?;
    let layer_count = range.len();
    let infos = range
        .clone()
        .map(|i| stack.layer_info(i))
        .collect::<Result<Vec<LayerInfo>, _>>()
        .map_err(ExportError::raster(Stage::Setup))?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(options.thread_count())
        .thread_name(|i| format!("strata-worker-{i}"))
        .build()?;
    let prep = options.prepare(stack.bounds());
    let geom = grid_geometry(stack.pixel_size(), options, infos);
    log::info!(
        target: "export",
        "layers {:?} of {} -> {} ({format}, {} threads, quality {})",
        range,
        stack.layer_count(),
        output.display(),
        pool.current_num_threads(),
        options.quality
    );
    let mut timings = StageTimings::default();

    observer.stage_started(Stage::Extract, layer_count);
    let t0 = Instant::now();
    let (mut layers, mut faces) =
        extract_stage(stack, range.clone(), &prep, &geom, cancel, observer, &pool)?;
    timings.extract = t0.elapsed();
    log::info!(
        target: "export",
        "extracted {} voxel faces into {} runs in {}ms",
        faces.raw_faces,
        faces.run_faces,
        ms(timings.extract)
    );

    observer.stage_started(Stage::Collapse, layer_count);
    let t0 = Instant::now();
    let on_layer = |l: usize| observer.layer_done(Stage::Collapse, l);
    let ctl = StageCtl::new(cancel, &on_layer);
    faces.links = pool
        .install(|| link_layers(&mut layers, &ctl))
        .map_err(|_| ExportError::Cancelled {
            stage: Stage::Collapse,
        })?;
    faces.root_faces = FaceStats::count_roots(&layers);
    timings.collapse = t0.elapsed();
    log::info!(
        target: "export",
        "collapsed {} links, {} faces left in {}ms",
        faces.links,
        faces.root_faces,
        ms(timings.collapse)
    );

    observer.stage_started(Stage::Emit, layer_count);
    let t0 = Instant::now();
    let triangles = emit_stage(
        &mut layers,
        &geom,
        output,
        format,
        options,
        cancel,
        observer,
        &pool,
    )?;
    timings.emit = t0.elapsed();
    timings.total = started.elapsed();
    log::info!(
        target: "export",
        "wrote {triangles} triangles to {} in {}ms (total {}ms)",
        output.display(),
        ms(timings.emit),
        ms(timings.total)
    );

    Ok(ExportReport {
        output: output.to_path_buf(),
        format,
        first_layer: range.start,
        layers: layer_count,
        faces,
        triangles,
        timings,
    })
}

/// Cell size follows the raster axes, which swap under a quarter turn.
fn grid_geometry(pixel: PixelSize, options: &ExportOptions, infos: Vec<LayerInfo>) -> GridGeometry {
    let p = pixel.effective();
    let (px, py) = match options.rotate {
        Rotate::Cw90 | Rotate::Cw270 => (p.y, p.x),
        Rotate::None | Rotate::Cw180 => (p.x, p.y),
    };
    let q = options.quality as f32;
    GridGeometry::new(px * q, py * q, infos)
}

fn run_loader(
    stack: &dyn LayerStack,
    range: Range<usize>,
    prep: &PrepareOptions,
    cancel: &CancelToken,
    tx: Sender<Prepared>,
) {
    for i in range {
        if cancel.is_cancelled() {
            break;
        }
        let item = stack
            .load_layer(i)
            .and_then(|gray| prepare_layer(&gray, prep));
        let failed = item.is_err();
        // a closed channel means the extractor gave up
        if tx.send(item).is_err() || failed {
            break;
        }
    }
}

fn recv_layer(rx: &Receiver<Prepared>, cancel: &CancelToken) -> Result<LayerImage, ExportError> {
    match rx.recv() {
        Ok(item) => item.map_err(ExportError::raster(Stage::Extract)),
        Err(_) if cancel.is_cancelled() => Err(ExportError::Cancelled {
            stage: Stage::Extract,
        }),
        Err(_) => Err(ExportError::LoaderPanicked),
    }
}

/// Stages 1 and 2. A loader thread prepares layers one step ahead over a
/// rendezvous channel; the extractor holds at most below, current and above.
fn extract_stage(
    stack: &dyn LayerStack,
    range: Range<usize>,
    prep: &PrepareOptions,
    geom: &GridGeometry,
    cancel: &CancelToken,
    observer: &dyn ExportObserver,
    pool: &ThreadPool,
) -> Result<(LayerFaces, FaceStats), ExportError> {
    if geom.layers.is_empty() {
        return Ok((Vec::new(), FaceStats::default()));
    }
    let (tx, rx) = bounded::<Prepared>(0);
    thread::scope(|s| -> Result<(LayerFaces, FaceStats), ExportError> {
        let loader = thread::Builder::new()
            .name("strata-loader".into())
            .spawn_scoped(s, move || run_loader(stack, range, prep, cancel, tx))
            .map_err(ExportError::Spawn)?;
        let extracted = extract_layers(&rx, geom, cancel, observer, pool);
        drop(rx);
        match loader.join() {
            Ok(()) => extracted,
            Err(_) => Err(ExportError::LoaderPanicked),
        }
    })
}

fn extract_layers(
    rx: &Receiver<Prepared>,
    geom: &GridGeometry,
    cancel: &CancelToken,
    observer: &dyn ExportObserver,
    pool: &ThreadPool,
) -> Result<(LayerFaces, FaceStats), ExportError> {
    let n = geom.layers.len();
    let mut layers: LayerFaces = Vec::with_capacity(n);
    let mut stats = FaceStats::default();

    let mut current = recv_layer(rx, cancel)?;
    if current.is_empty() {
        return Err(ExportError::EmptyGrid);
    }
    let dims = current.dims();
    log::debug!(target: "export", "voxel grid {}x{}", dims.0, dims.1);
    let mut below: Option<LayerImage> = None;

    for i in 0..n {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled {
                stage: Stage::Extract,
            });
        }
        let above = if i + 1 < n {
            let next = recv_layer(rx, cancel)?;
            if next.dims() != dims {
                return Err(ExportError::Raster {
                    stage: Stage::Extract,
                    source: RasterError::SizeMismatch {
                        expected: dims,
                        got: next.dims(),
                    },
                });
            }
            Some(next)
        } else {
            None
        };

        let (faces, raw) = pool.install(|| {
            layer_faces(i, &current, below.as_ref(), above.as_ref())
        });
        log::debug!(target: "export", "layer {i}: {raw} voxel faces, {} runs", faces.len());
        stats.raw_faces += raw;
        stats.run_faces += faces.len();
        layers.push(faces);
        observer.layer_done(Stage::Extract, i);

        match above {
            Some(next) => below = Some(mem::replace(&mut current, next)),
            None => break,
        }
    }
    Ok((layers, stats))
}

/// Stage 4. Triangulates `emit_window` layers in parallel, writes them in
/// layer order and drops each layer's faces once written.
#[allow(clippy::too_many_arguments)]
fn emit_stage(
    layers: &mut LayerFaces,
    geom: &GridGeometry,
    output: &Path,
    format: MeshFormat,
    options: &ExportOptions,
    cancel: &CancelToken,
    observer: &dyn ExportObserver,
    pool: &ThreadPool,
) -> Result<u64, ExportError> {
    let cancelled = || ExportError::Cancelled { stage: Stage::Emit };
    if cancel.is_cancelled() {
        return Err(cancelled());
    }
    let mut writer = MeshWriter::new(output, format, options.encoding, DEFAULT_VERTEX_CACHE);
    writer
        .begin_write()
        .map_err(ExportError::mesh(Stage::Emit))?;

    let n = layers.len();
    let mut start = 0;
    while start < n {
        let end = (start + options.emit_window).min(n);
        let batch: Vec<Vec<Triangle>> = {
            let shared: &[Vec<UvFace>] = layers;
            pool.install(|| {
                (start..end)
                    .into_par_iter()
                    .map(|l| triangulate_layer(shared, l, geom))
                    .collect()
            })
        };
        for (l, tris) in (start..end).zip(batch) {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            for t in tris {
                writer
                    .write_triangle(t.a, t.b, t.c, t.normal)
                    .map_err(ExportError::mesh(Stage::Emit))?;
            }
            // chains only reach upward, later layers never look back here
            layers[l] = Vec::new();
            observer.layer_done(Stage::Emit, l);
        }
        start = end;
    }

    writer.end_write().map_err(ExportError::mesh(Stage::Emit))?;
    Ok(writer.triangles_written())
}
