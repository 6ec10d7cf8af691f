//! Rectangle grid drawn three ways: a textured surface, its wireframe and
//! its vertices as points.
//!
//! Opens a desktop window; `--headless` runs 120 frames without one. Draw
//! calls go to the in-memory device and are reported in the log.

use std::rc::Rc;

use anyhow::Result;
use tartan::prelude::*;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = AppConfig::default()
        .with_size(500, 500)
        .with_title("Rectangle Test")
        .with_frame_budget(Some(120));
    let device: SharedDevice = Rc::new(HeadlessDevice::new());

    if std::env::args().any(|arg| arg == "--headless") {
        let window = HeadlessWindow::new(&config);
        run(TartanApp::new(window, device, config.renderer))
    } else {
        run(TartanApp::windowed(config, device)?)
    }
}

fn run<W: Window>(mut app: TartanApp<W>) -> Result<()> {
    let renderer = app.renderer_mut();

    let material = renderer.create_standard_material();

    let surface = renderer.create_geometry_from_data(
        PrimitiveTopology::Triangles,
        &generate_rectangle_surface(1.0, 1.0, 5, 5),
    );
    let edges = renderer.create_geometry_from_data(
        PrimitiveTopology::Lines,
        &generate_rectangle_edges(1.0, 1.0, 5, 5).offset_z(-0.01),
    );
    let points = renderer.create_geometry_from_data(
        PrimitiveTopology::Points,
        &generate_rectangle_points(1.0, 1.0, 5, 5)
            .offset_z(-0.02)
            .with_color([1.0, 0.0, 0.0, 1.0]),
    );

    let image = Image::checkerboard(256, 8, [40, 40, 40, 255], [230, 230, 230, 255]);
    let texture = renderer.create_texture(&image, false);

    renderer.set_material_current(Some(material));
    renderer.set_material_line_width(3.0)?;
    renderer.set_material_point_size(10.0)?;

    let frames = app.run(|renderer, _dt| {
        renderer.set_texture_current(Some(texture));
        renderer.set_geometry_current(Some(surface));
        renderer.render_current_geometry()?;

        renderer.set_texture_current(None);
        renderer.set_geometry_current(Some(edges));
        renderer.render_current_geometry()?;
        renderer.set_geometry_current(Some(points));
        renderer.render_current_geometry()
    })?;

    let stats = app.renderer().frame_stats();
    log::info!(
        "{} frames, last frame: {} draw calls, {} indices",
        frames,
        stats.draw_calls,
        stats.indices_submitted
    );

    let renderer = app.renderer_mut();
    renderer.destroy_texture(texture);
    renderer.destroy_geometry(surface);
    renderer.destroy_geometry(edges);
    renderer.destroy_geometry(points);
    renderer.destroy_material(material);

    Ok(())
}
