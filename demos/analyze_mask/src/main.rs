use argh::FromArgs;
use std::path::PathBuf;

use phenocv::{
    composition::compose_objects,
    descriptor::analyze_object,
    image::{Image, ImageSize},
    imgproc::contours::{Contour, ContourSource, SuzukiContours},
    landmarks::{axis_landmarks, Axis},
    roi::{classify_objects, RoiPolicy},
    scale::scale_landmarks,
    turgor::turgor_proxy,
    DiagnosticsSink, NoopSink, PipelineContext, PngSink,
};

#[derive(FromArgs)]
/// Describe the objects of a binary mask and print the records as JSON
struct Args {
    /// path to the binary mask
    #[argh(option, short = 'm')]
    mask_path: PathBuf,

    /// path to the color image the mask was segmented from
    #[argh(option, short = 'i')]
    image_path: Option<PathBuf>,

    /// region of interest as x,y,width,height, the whole frame by default
    #[argh(option)]
    roi: Option<String>,

    /// ROI policy: partial, cutto, largest, massc or <N>pct
    #[argh(option, default = "String::from(\"partial\")")]
    policy: String,

    /// landmark axis, x or y
    #[argh(option, default = "String::from(\"x\")")]
    axis: String,

    /// directory receiving the diagnostic images
    #[argh(option)]
    debug_dir: Option<PathBuf>,
}

fn parse_roi(roi: &str) -> Result<Contour, Box<dyn std::error::Error>> {
    let values = roi
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x, y, w, h] => Ok(Contour::rectangle(*x, *y, *w, *h)),
        _ => Err(format!("expected x,y,width,height but got {roi}").into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    // read the mask
    let luma = image::open(&args.mask_path)?.to_luma8();
    let size = ImageSize {
        width: luma.width() as usize,
        height: luma.height() as usize,
    };
    let mask = Image::<u8, 1>::new(size, luma.into_raw())?;

    // read the color image or use a black frame for the overlays
    let img = match &args.image_path {
        Some(path) => {
            let rgb = image::open(path)?.to_rgb8();
            Image::<u8, 3>::new(size, rgb.into_raw())?
        }
        None => Image::<u8, 3>::from_size_val(size, 0)?,
    };

    let roi = match &args.roi {
        Some(roi) => parse_roi(roi)?,
        None => Contour::rectangle(0, 0, size.width as i32, size.height as i32),
    };
    let policy: RoiPolicy = args.policy.parse()?;
    let axis: Axis = args.axis.parse()?;

    let mut png_sink;
    let mut noop_sink = NoopSink;
    let sink: &mut dyn DiagnosticsSink = match &args.debug_dir {
        Some(dir) => {
            png_sink = PngSink::new(dir);
            &mut png_sink
        }
        None => &mut noop_sink,
    };

    let source = SuzukiContours;
    let objects = source.find_contours(&mask);
    log::info!("found {} contours", objects.len());

    let ctx = PipelineContext::default().next();
    let kept = classify_objects(ctx, &img, &[roi], &objects, policy, &source, sink)?;

    let Some(object) = compose_objects(size, &kept.contours)? else {
        println!("{}", serde_json::json!({ "roi_area": kept.area, "warnings": kept.warnings }));
        return Ok(());
    };

    let ctx = ctx.next();
    let shape = analyze_object(ctx, &img, &object.points, &object.mask, sink)?;

    let ctx = ctx.next();
    let landmarks = axis_landmarks(ctx, &img, &object.points, &object.mask, axis, sink)?;

    let ctx = ctx.next();
    let scaled = match &landmarks {
        Some(sets) => scale_landmarks(ctx, &object.points, &object.mask, &sets.center, None, sink)?,
        None => None,
    };
    let turgor = scaled.as_ref().map(turgor_proxy);

    let report = serde_json::json!({
        "roi_area": kept.area,
        "warnings": kept.warnings,
        "shape": shape,
        "landmarks": landmarks,
        "scaled_center": scaled,
        "turgor": turgor,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
