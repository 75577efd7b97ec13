//! Interactive landmark placement viewer. Loads a mesh (or falls back to a
//! procedural sphere), hands it to the viewport core, and runs the winit
//! event loop: orbit and zoom with the mouse, pick with a click, drag a
//! selection box while editing, and toggle cameras, connectivity, and
//! editing from the keyboard.

mod controls;
mod renderer;
mod shaders;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use meshmark_model::landmarks::load_landmark_set;
use meshmark_model::mesh::{load_mesh_asset, unit_sphere};
use meshmark_model::{LandmarkSet, MeshAsset, ModelEvent};
use meshmark_viewport::camera::CameraMode;
use meshmark_viewport::picking::{PickTarget, ScreenRect};
use meshmark_viewport::viewport::{ModelView, Viewport};
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use crate::controls::OrbitController;
use crate::renderer::Renderer;

/// Drags shorter than this (in pixels) count as a click.
const CLICK_TOLERANCE: f32 = 4.0;

#[derive(Parser, Debug)]
#[command(about = "Interactive 3D landmark placement viewer", version)]
struct Args {
    /// Mesh JSON file to load; a procedural sphere is shown when omitted
    #[arg(long)]
    mesh: Option<PathBuf>,

    /// Landmark set JSON to load alongside the mesh
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Start with connectivity lines visible
    #[arg(long)]
    connectivity: bool,

    /// Print the scene summary and exit without opening a window
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    let mesh_asset = match args.mesh.as_ref() {
        Some(path) => load_mesh_asset(path)
            .with_context(|| format!("loading mesh {}", path.display()))?,
        None => {
            log::info!("no mesh given; using the procedural sphere");
            MeshAsset::new(unit_sphere())
        }
    };

    let landmark_set = match args.landmarks.as_ref() {
        Some(path) => load_landmark_set(path)
            .with_context(|| format!("loading landmarks {}", path.display()))?,
        None => LandmarkSet::default(),
    };

    print_scene_summary(&args, &mesh_asset, &landmark_set);

    if args.headless {
        println!("Headless mode requested; viewer window bootstrap skipped.");
        return Ok(());
    }

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Meshmark Viewer")
            .with_inner_size(PhysicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut renderer = Renderer::new(window.clone()).block_on()?;

    let mut viewport = Viewport::new(window.inner_size());
    viewport.attach_target();
    viewport.run_atomic(|viewport| {
        viewport.apply_event(
            &ModelEvent::NewMeshAvailable,
            ModelView {
                mesh: Some(&mesh_asset),
                landmarks: &landmark_set,
            },
        );
        viewport.apply_event(
            &ModelEvent::LandmarksChanged,
            ModelView {
                mesh: Some(&mesh_asset),
                landmarks: &landmark_set,
            },
        );
        if args.connectivity {
            viewport.apply_event(
                &ModelEvent::ConnectivityToggled(true),
                ModelView {
                    mesh: Some(&mesh_asset),
                    landmarks: &landmark_set,
                },
            );
        }
    });

    let mut controller = OrbitController::new();
    let mut connectivity_on = args.connectivity;
    let mut editing = false;
    let mut cursor = [0.0f32; 2];
    let mut drag_anchor: Option<[f32; 2]> = None;

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event }
                    if window_id == renderer.window().id() =>
                {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key,
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => match logical_key {
                            Key::Named(NamedKey::Escape) => target.exit(),
                            Key::Character(text) => {
                                let model = ModelView {
                                    mesh: Some(&mesh_asset),
                                    landmarks: &landmark_set,
                                };
                                match text.as_str() {
                                    "o" | "O" => {
                                        let next = match viewport.rig().mode() {
                                            CameraMode::Perspective => CameraMode::Orthographic,
                                            CameraMode::Orthographic => CameraMode::Perspective,
                                        };
                                        viewport.set_camera_mode(next);
                                    }
                                    "c" | "C" => {
                                        connectivity_on = !connectivity_on;
                                        viewport.apply_event(
                                            &ModelEvent::ConnectivityToggled(connectivity_on),
                                            model,
                                        );
                                    }
                                    "e" | "E" => {
                                        editing = !editing;
                                        viewport.apply_event(
                                            &ModelEvent::EditingToggled(editing),
                                            model,
                                        );
                                        println!(
                                            "[meshmark_viewer] editing {}",
                                            if editing { "on" } else { "off" }
                                        );
                                    }
                                    "x" | "X" => viewport.reorient_up(Vec3::X),
                                    "y" | "Y" => viewport.reorient_up(Vec3::Y),
                                    "z" | "Z" => viewport.reorient_up(Vec3::Z),
                                    _ => {}
                                }
                            }
                            _ => {}
                        },
                        WindowEvent::Resized(new_size) => {
                            renderer.resize(new_size);
                            viewport.resize(new_size);
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            let previous = cursor;
                            cursor = [position.x as f32, position.y as f32];
                            if let Some(anchor) = drag_anchor {
                                if editing {
                                    let overlay = viewport.overlay_mut();
                                    overlay.clear();
                                    overlay.draw_selection_box(anchor, cursor);
                                    viewport.request_render();
                                } else {
                                    controller.orbit(
                                        viewport.rig_mut(),
                                        cursor[0] - previous[0],
                                        cursor[1] - previous[1],
                                    );
                                }
                            }
                        }
                        WindowEvent::MouseInput {
                            state,
                            button: MouseButton::Left,
                            ..
                        } => match state {
                            ElementState::Pressed => drag_anchor = Some(cursor),
                            ElementState::Released => {
                                if let Some(anchor) = drag_anchor.take() {
                                    finish_gesture(&mut viewport, editing, anchor, cursor);
                                }
                            }
                        },
                        WindowEvent::MouseWheel { delta, .. } => {
                            let notches = match delta {
                                MouseScrollDelta::LineDelta(_, y) => y,
                                MouseScrollDelta::PixelDelta(position) => {
                                    position.y as f32 / 40.0
                                }
                            };
                            controller.zoom(viewport.rig_mut(), notches);
                        }
                        WindowEvent::RedrawRequested => {
                            if let Some(plan) = viewport.render_frame() {
                                match renderer.render(&plan, &viewport) {
                                    Ok(()) => {}
                                    Err(SurfaceError::Lost) => renderer.resize(renderer.size()),
                                    Err(SurfaceError::OutOfMemory) => target.exit(),
                                    Err(err) => {
                                        eprintln!("[meshmark_viewer] render error: {err:?}")
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    if viewport.needs_redraw() {
                        renderer.window().request_redraw();
                    }
                }
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(())
}

/// Resolve a released left button: a short press picks, a selection drag
/// while editing reports the boxed landmarks.
fn finish_gesture(viewport: &mut Viewport, editing: bool, anchor: [f32; 2], cursor: [f32; 2]) {
    let travel = ((cursor[0] - anchor[0]).powi(2) + (cursor[1] - anchor[1]).powi(2)).sqrt();

    if editing && travel > CLICK_TOLERANCE {
        let rect = ScreenRect::from_corners(anchor, cursor);
        let selected = viewport.landmarks_in_rect(&rect);
        println!("[meshmark_viewer] selection box: landmarks {selected:?}");
        viewport.overlay_mut().clear();
        viewport.request_render();
        return;
    }

    if editing {
        viewport.overlay_mut().clear();
        viewport.request_render();
    }
    if travel > CLICK_TOLERANCE {
        return;
    }

    let landmark_hits = viewport.intersect(cursor[0], cursor[1], PickTarget::Landmarks);
    if let Some(hit) = landmark_hits.first() {
        println!(
            "[meshmark_viewer] picked {:?} at distance {:.3}",
            hit.hit, hit.distance
        );
        return;
    }
    let mesh_hits = viewport.intersect(cursor[0], cursor[1], PickTarget::Mesh);
    match mesh_hits.first() {
        Some(hit) => println!(
            "[meshmark_viewer] picked {:?} at {:?} (distance {:.3})",
            hit.hit, hit.point, hit.distance
        ),
        None => println!("[meshmark_viewer] picked nothing"),
    }
}

fn print_scene_summary(args: &Args, asset: &MeshAsset, landmarks: &LandmarkSet) {
    let sphere = asset.mesh.bounding_sphere();
    let source = args
        .mesh
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "procedural sphere".to_string());
    println!(
        "Loaded {} ({} vertices, {} triangles)",
        source,
        asset.mesh.vertices.len(),
        asset.mesh.triangle_count()
    );
    println!(
        "  bounding sphere: centre {:?}, radius {:.3}; up hint {:?}",
        sphere.center, sphere.radius, asset.up
    );
    let placed = landmarks.placed().count();
    println!(
        "  landmarks: {} placed / {} total, {} connectivity edges",
        placed,
        landmarks.landmarks.len(),
        landmarks.connectivity.len()
    );
    println!();
    println!("Keys: O camera mode, C connectivity, E editing, X/Y/Z reorient up, Esc quit.");
}
