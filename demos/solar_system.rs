//! Sun, Venus, Earth and Moon placed with the matrix stack, plus Mars and
//! Phobos placed through scene-object parenting. W/A/S/D turn the camera,
//! the arrow keys move it.
//!
//! Opens a desktop window; `--headless` runs 600 frames with a scripted
//! camera turn and move instead. Draw calls go to the in-memory device.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;
use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4};
use tartan::gfx::transform::{rotation_matrix, translation_matrix};
use tartan::prelude::*;

const CAMERA_SPEED: f32 = 6.0;
const CAMERA_ROT_SPEED: f32 = 1.5;
const CAMERA_FOV: f32 = 1.13;
const CAMERA_NEAR_PLANE: f32 = 0.1;
const CAMERA_FAR_PLANE: f32 = 100.0;

#[derive(Debug, Clone, Copy)]
struct Camera {
    position: Vector3<f32>,
    rotation: Vector3<f32>,
}

impl Camera {
    fn world_matrix(&self) -> Matrix4<f32> {
        translation_matrix(self.position) * rotation_matrix(self.rotation)
    }

    fn view_matrix(&self) -> Matrix4<f32> {
        self.world_matrix().invert().unwrap_or_else(Matrix4::identity)
    }
}

/// Spin around the body's own axis plus an orbit around its parent.
#[derive(Debug, Clone, Copy)]
struct Body {
    rotation: f32,
    delta_angle: f32,
    orbit: f32,
    orbit_delta_angle: f32,
}

impl Body {
    fn new(delta_angle: f32, orbit_delta_angle: f32) -> Self {
        Self {
            rotation: 0.0,
            delta_angle,
            orbit: 0.0,
            orbit_delta_angle,
        }
    }

    fn advance(&mut self, dt: f32) {
        self.rotation += self.delta_angle * dt;
        self.orbit += self.orbit_delta_angle * dt;
    }
}

fn yaw(angle: f32) -> Vector3<f32> {
    Vector3::new(0.0, angle, 0.0)
}

fn planet_texture(renderer: &mut Renderer, a: [u8; 4], b: [u8; 4]) -> TextureId {
    renderer.create_texture(&Image::checkerboard(128, 16, a, b), true)
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = AppConfig::default()
        .with_title("Transformation Test")
        .with_frame_budget(Some(600));
    let aspect = config.aspect_ratio();

    let device: SharedDevice = Rc::new(HeadlessDevice::new());

    if std::env::args().any(|arg| arg == "--headless") {
        let window = HeadlessWindow::new(&config)
            .with_key_press(60, KeyCode::KeyA)
            .with_key_release(90, KeyCode::KeyA)
            .with_key_press(120, KeyCode::ArrowUp)
            .with_key_release(150, KeyCode::ArrowUp);
        run(TartanApp::new(window, device, config.renderer), aspect)
    } else {
        run(TartanApp::windowed(config, device)?, aspect)
    }
}

fn run<W: Window>(mut app: TartanApp<W>, aspect: f32) -> Result<()> {
    let renderer = app.renderer_mut();

    let material = renderer.create_standard_material();
    let sphere = renderer.create_geometry_from_data(
        PrimitiveTopology::Triangles,
        &generate_sphere(0.5, 20, 20),
    );

    let sun_texture = planet_texture(renderer, [255, 200, 40, 255], [255, 140, 0, 255]);
    let venus_texture = planet_texture(renderer, [220, 190, 140, 255], [180, 150, 100, 255]);
    let earth_texture = planet_texture(renderer, [40, 90, 200, 255], [60, 160, 70, 255]);
    let moon_texture = planet_texture(renderer, [180, 180, 180, 255], [120, 120, 120, 255]);
    let mars_texture = planet_texture(renderer, [190, 80, 40, 255], [140, 50, 30, 255]);

    let mars_material = Material::standard(renderer.device())
        .with_name("mars")
        .with_face_culling(true)
        .with_depth_test(true)
        .with_texture(mars_texture);
    let mars_material = renderer.insert_material(mars_material);

    renderer.set_material_current(Some(material));
    renderer.set_material_face_culling_enabled(true)?;
    renderer.set_material_depth_test_enabled(true)?;

    let stack = renderer.matrix_stack_mut();
    stack.set_mode(MatrixMode::Projection);
    stack.load_perspective(CAMERA_FOV, aspect, CAMERA_NEAR_PLANE, CAMERA_FAR_PLANE);

    // Mars and Phobos are positioned by parenting instead of the stack.
    let mut scene = Scene::new();
    let mars_orbit = scene.add_object(SceneObject::new("mars orbit", Transform::default()));
    let mars = scene.add_object(
        SceneObject::new(
            "mars",
            Transform::from_position(Vector3::new(7.0, 0.0, 0.0)).with_uniform_scale(0.3),
        )
        .with_parent(mars_orbit)
        .with_mesh(sphere, mars_material),
    );
    let phobos = scene.add_object(
        SceneObject::new(
            "phobos",
            Transform::from_position(Vector3::new(1.2, 0.0, 0.0)).with_uniform_scale(0.2),
        )
        .with_parent(mars)
        .with_mesh(sphere, mars_material),
    );

    let camera = Rc::new(Cell::new(Camera {
        position: Vector3::new(0.0, 3.23, 6.34),
        rotation: Vector3::new(-0.6, 0.0, 0.0),
    }));

    let handler_camera = camera.clone();
    app.set_keys_down_handler(move |keys, _renderer, dt| {
        let mut camera = handler_camera.get();
        for key in keys {
            match key {
                KeyCode::KeyW => camera.rotation.x -= CAMERA_ROT_SPEED * dt,
                KeyCode::KeyA => camera.rotation.y += CAMERA_ROT_SPEED * dt,
                KeyCode::KeyS => camera.rotation.x += CAMERA_ROT_SPEED * dt,
                KeyCode::KeyD => camera.rotation.y -= CAMERA_ROT_SPEED * dt,
                KeyCode::ArrowUp | KeyCode::ArrowDown => {
                    let forward = camera.world_matrix() * Vector4::new(0.0, 0.0, 1.0, 0.0);
                    let shift = forward.truncate() * (CAMERA_SPEED * dt);
                    if *key == KeyCode::ArrowUp {
                        camera.position -= shift;
                    } else {
                        camera.position += shift;
                    }
                }
                _ => {}
            }
        }
        handler_camera.set(camera);
    });

    let mut sun = Body::new(0.2, 0.0);
    let mut venus = Body::new(-0.8, -0.1);
    let mut earth = Body::new(-0.8, 0.5);
    let mut moon = Body::new(0.1, 1.0);
    let mut mars_body = Body::new(0.6, 0.3);

    let frames = app.run(|renderer, dt| {
        let stack = renderer.matrix_stack_mut();
        stack.set_mode(MatrixMode::View);
        stack.load_matrix(camera.get().view_matrix());

        stack.set_mode(MatrixMode::Model);

        // Sun
        stack.load_identity();
        stack.rotate(yaw(sun.rotation));
        stack.scale(Vector3::new(2.0, 2.0, 2.0));

        renderer.set_texture_current(Some(sun_texture));
        renderer.set_geometry_current(Some(sphere));
        renderer.render_current_geometry()?;

        // Venus
        let stack = renderer.matrix_stack_mut();
        stack.load_identity();
        stack.rotate(yaw(venus.orbit));
        stack.translate(Vector3::new(3.0, 0.0, 0.0));
        stack.rotate(yaw(venus.rotation));
        stack.scale(Vector3::new(0.42, 0.42, 0.42));

        renderer.set_texture_current(Some(venus_texture));
        renderer.render_current_geometry()?;

        // Earth
        let stack = renderer.matrix_stack_mut();
        stack.load_identity();
        stack.rotate(yaw(earth.orbit));
        stack.translate(Vector3::new(5.0, 0.0, 0.0));

        stack.push();
        stack.rotate(yaw(earth.rotation));
        stack.scale(Vector3::new(0.4, 0.4, 0.4));

        renderer.set_texture_current(Some(earth_texture));
        renderer.render_current_geometry()?;

        // Moon
        let stack = renderer.matrix_stack_mut();
        stack.pop();
        stack.rotate(yaw(moon.orbit));
        stack.translate(Vector3::new(0.5, 0.0, 0.0));
        stack.rotate(yaw(moon.rotation));
        stack.scale(Vector3::new(0.1, 0.1, 0.1));

        renderer.set_texture_current(Some(moon_texture));
        renderer.render_current_geometry()?;

        // Mars and Phobos
        renderer.matrix_stack_mut().load_identity();
        if let Some(orbit) = scene.object_mut(mars_orbit) {
            orbit.transform.rotation = yaw(mars_body.orbit);
        }
        if let Some(planet) = scene.object_mut(mars) {
            planet.transform.rotation = yaw(mars_body.rotation);
        }
        renderer.render_scene(&scene);

        for body in [&mut sun, &mut venus, &mut earth, &mut moon, &mut mars_body] {
            body.advance(dt);
        }
        Ok(())
    })?;

    let statistics = scene.get_statistics();
    log::info!(
        "{} frames; scene: {} objects, {} renderable, depth {}",
        frames,
        statistics.object_count,
        statistics.renderable_count,
        statistics.max_depth
    );
    if let Some(world) = scene.world_matrix(phobos) {
        log::info!("phobos at {:?}", world.w.truncate());
    }

    let renderer = app.renderer_mut();
    for texture in [sun_texture, venus_texture, earth_texture, moon_texture, mars_texture] {
        renderer.destroy_texture(texture);
    }
    renderer.destroy_geometry(sphere);
    renderer.destroy_material(material);
    renderer.destroy_material(mars_material);

    Ok(())
}
