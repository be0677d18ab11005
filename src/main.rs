// main.rs — 3D 商品预览：窗口事件循环、叠加层按钮与状态栏

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod config;
mod cube;
mod i18n;
mod renderer;
mod rotation;
mod ticker;
mod transition;
mod viewer;

use renderer::Renderer;
use viewer::PreviewViewer;

use winit::{
    dpi::{LogicalPosition, LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

use std::sync::Arc;
use std::time::Instant;

const LANGUAGES: [(&str, &str); 4] = [
    ("en", "English"),
    ("zh-Hans", "简体中文"),
    ("fr", "Français"),
    ("ja", "日本語"),
];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // i18n
    let mut current_lang = crate::i18n::resolve_lang_from_args();
    crate::i18n::init(current_lang.clone());

    let cfg = crate::config::load(crate::config::resolve_config_path_from_args());

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title(crate::i18n::tr("app.title"))
        .with_inner_size(LogicalSize::new(cfg.window_width, cfg.window_height))
        .build(&event_loop)
    {
        Ok(w) => Arc::new(w),
        Err(e) => {
            log::error!("failed to create window: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = match pollster::block_on(Renderer::new(window.clone())) {
        Ok(r) => r,
        Err(e) => {
            log::error!("renderer setup failed: {e}");
            std::process::exit(1);
        }
    };
    let mut viewer = PreviewViewer::new(&cfg);

    // 交互状态：最近一次光标位置（逻辑像素）
    let mut cursor: Option<LogicalPosition<f32>> = None;

    // FPS 计算
    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;
    let mut show_fps = false;
    let mut exit_requested = false;

    event_loop.run(move |event, _, control_flow| {
        match event {
            Event::WindowEvent { event, .. } => {
                // 光标位置与松开按键总是先交给控制器，避免叠加层吞掉事件后拖拽卡住
                if let WindowEvent::CursorMoved { position, .. } = &event {
                    cursor = Some(to_logical(*position, window.scale_factor()));
                }
                if let WindowEvent::MouseInput {
                    state: ElementState::Released,
                    button: MouseButton::Left,
                    ..
                } = &event
                {
                    if viewer.controller.is_dragging() {
                        viewer.pointer_up();
                        window.request_redraw();
                    }
                }

                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.repaint {
                    window.request_redraw();
                }
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        window.request_redraw();
                    }

                    WindowEvent::ScaleFactorChanged {
                        scale_factor,
                        new_inner_size,
                    } => {
                        renderer.set_scale_factor(scale_factor as f32);
                        renderer.resize(*new_inner_size);
                        window.request_redraw();
                    }

                    // 键盘快捷键
                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::R) => viewer.reset(),
                                Some(VirtualKeyCode::Space) => viewer.toggle_auto_rotate(),
                                Some(VirtualKeyCode::F11) => {
                                    viewer.is_fullscreen = !viewer.is_fullscreen;
                                    apply_fullscreen(&window, viewer.is_fullscreen);
                                }
                                _ => {}
                            }
                            window.request_redraw();
                        }
                    }

                    // 鼠标交互
                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        button: MouseButton::Left,
                        ..
                    } => {
                        if let Some(p) = cursor {
                            viewer.pointer_down(p.x, p.y);
                            window.request_redraw();
                        }
                    }

                    WindowEvent::CursorMoved { .. } => {
                        if let (true, Some(p)) = (viewer.controller.is_dragging(), cursor) {
                            viewer.pointer_move(p.x, p.y);
                            window.request_redraw();
                        }
                    }

                    WindowEvent::CursorLeft { .. } => {
                        cursor = None;
                        viewer.pointer_leave();
                        window.request_redraw();
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        viewer.scroll(scroll);
                        window.request_redraw();
                    }

                    _ => {}
                }
            }

            Event::MainEventsCleared => {
                if viewer.update(Instant::now()) {
                    window.request_redraw();
                }
            }

            Event::RedrawRequested(_) => {
                // FPS 统计
                frame_count += 1;
                let now = Instant::now();
                if now.duration_since(last_frame_time).as_secs_f32() >= 1.0 {
                    fps = frame_count as f32 / now.duration_since(last_frame_time).as_secs_f32();
                    frame_count = 0;
                    last_frame_time = now;
                }

                renderer.update_model(viewer.shown(), viewer.zoom);

                let render_result = renderer.render_with_ui(&window, |ctx| {
                    draw_ui(
                        ctx,
                        &mut viewer,
                        &mut show_fps,
                        &mut exit_requested,
                        fps,
                        &window,
                        &mut current_lang,
                    );
                });

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory");
                        *control_flow = ControlFlow::Exit;
                    }
                    Err(e) => log::warn!("render error: {e:?}"),
                }
            }

            // 按钮点击发生在 RedrawRequested 里，所以在这里才决定下一次唤醒
            Event::RedrawEventsCleared => {
                if exit_requested {
                    *control_flow = ControlFlow::Exit;
                } else if *control_flow != ControlFlow::Exit {
                    *control_flow = match viewer.wake_at(Instant::now()) {
                        Some(t) => ControlFlow::WaitUntil(t),
                        None => ControlFlow::Wait,
                    };
                }
            }

            Event::LoopDestroyed => {
                log::info!("preview closed");
            }

            _ => {}
        }
    });
}

fn to_logical(position: PhysicalPosition<f64>, scale_factor: f64) -> LogicalPosition<f32> {
    let p: LogicalPosition<f64> = position.to_logical(scale_factor);
    LogicalPosition::new(p.x as f32, p.y as f32)
}

fn apply_fullscreen(window: &winit::window::Window, on: bool) {
    if on {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn draw_ui(
    ctx: &egui::Context,
    viewer: &mut PreviewViewer,
    show_fps: &mut bool,
    exit_requested: &mut bool,
    fps: f32,
    window: &winit::window::Window,
    current_lang: &mut String,
) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            // View
            ui.menu_button(crate::i18n::tr("menu.view"), |ui| {
                if ui.button(crate::i18n::tr("view.reset")).clicked() {
                    viewer.reset();
                    ui.close_menu();
                }

                let mut auto_rotate = viewer.controller.auto_rotate();
                if ui
                    .checkbox(&mut auto_rotate, crate::i18n::tr("view.auto_rotate_enabled"))
                    .changed()
                {
                    viewer.controller.set_auto_rotate(auto_rotate);
                }

                if ui
                    .button(if viewer.is_fullscreen {
                        crate::i18n::tr("view.fullscreen.exit")
                    } else {
                        crate::i18n::tr("view.fullscreen.enter")
                    })
                    .clicked()
                {
                    viewer.is_fullscreen = !viewer.is_fullscreen;
                    apply_fullscreen(window, viewer.is_fullscreen);
                    ui.close_menu();
                }

                ui.separator();
                ui.menu_button(crate::i18n::tr("view.drag_sensitivity"), |ui| {
                    let mut s = viewer.drag_sensitivity();
                    if ui
                        .add(
                            egui::Slider::new(&mut s, 0.05..=2.0)
                                .text(crate::i18n::tr("view.degrees_per_px")),
                        )
                        .changed()
                    {
                        viewer.set_drag_sensitivity(s);
                    }
                    let default = viewer.default_drag_sensitivity();
                    if ui
                        .button(crate::i18n::tr_with(
                            "view.reset_default",
                            &[("value", format!("{default:.2}"))],
                        ))
                        .clicked()
                    {
                        viewer.set_drag_sensitivity(default);
                    }
                });

                ui.separator();
                if ui.checkbox(show_fps, crate::i18n::tr("view.show_fps")).clicked() {
                    ui.close_menu();
                }

                ui.separator();
                if ui.button(crate::i18n::tr("menu.exit")).clicked() {
                    *exit_requested = true;
                    ui.close_menu();
                }
            });

            // Language
            ui.menu_button(crate::i18n::tr("menu.language"), |ui| {
                for (code, name) in LANGUAGES {
                    if ui.radio_value(current_lang, code.to_string(), name).clicked() {
                        crate::i18n::init(current_lang.clone());
                        window.set_title(&crate::i18n::tr("app.title"));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(format!(
                "{} {}",
                crate::i18n::tr("status.state"),
                crate::i18n::tr(viewer.state_label_key())
            ));
            ui.label("|");
            let o = viewer.controller.orientation();
            ui.label(crate::i18n::tr_with(
                "status.yaw",
                &[("yaw", format!("{:.1}", o.yaw.rem_euclid(360.0)))],
            ));
            ui.label("|");
            ui.label(crate::i18n::tr_with(
                "status.pitch",
                &[("pitch", format!("{:.1}", o.pitch))],
            ));
            ui.label("|");
            ui.label(crate::i18n::tr_with(
                "status.zoom",
                &[("zoom", format!("{:.1}", viewer.zoom))],
            ));

            if *show_fps {
                ui.label("|");
                ui.label(
                    egui::RichText::new(format!("FPS: {:.1}", fps)).color(egui::Color32::GREEN),
                );
            }
        });
    });

    // 预览区域上是抓手光标，拖拽中为抓紧；悬停在菜单和按钮上时交给 egui
    if viewer.controller.is_dragging() || !ctx.is_pointer_over_area() {
        ctx.set_cursor_icon(viewer.cursor_icon());
    }

    // 右上角角标
    egui::Area::new("preview_badge")
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 16.0))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::none()
                .fill(egui::Color32::from_rgb(0x08, 0x91, 0xb2))
                .rounding(egui::Rounding::same(12.0))
                .inner_margin(egui::Margin::symmetric(12.0, 4.0))
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(crate::i18n::tr("badge.preview"))
                            .color(egui::Color32::WHITE)
                            .small()
                            .strong(),
                    );
                });
        });

    // 中央提示，不拦截鼠标
    egui::Area::new("drag_hint")
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .interactable(false)
        .show(ctx, |ui| {
            ui.label(
                egui::RichText::new(format!("✥ {}", crate::i18n::tr("hint.drag")))
                    .color(egui::Color32::from_rgb(0x4b, 0x55, 0x63)),
            );
        });

    // 底部按钮：重置 / 停止-自动旋转
    egui::Area::new("rotation_buttons")
        .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -40.0))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button(format!("⟳ {}", crate::i18n::tr("view.reset"))).clicked() {
                    viewer.reset();
                }

                let auto = viewer.controller.auto_rotate();
                let label = egui::RichText::new(crate::i18n::tr(viewer.toggle_label_key()));
                let button = if auto {
                    egui::Button::new(label).fill(egui::Color32::from_rgb(0xcf, 0xfa, 0xfe))
                } else {
                    egui::Button::new(label)
                };
                if ui.add(button).clicked() {
                    viewer.toggle_auto_rotate();
                }
            });
        });
}
