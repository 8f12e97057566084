// src/bin/hand_viewer/app.rs
use crate::ui::{pose_from_matrix, OrbitCamera, UIComponents};

use eframe::egui;
use hand_fitter::angles::{finger_joint_index, TRANSLATION_RANGE, WRIST_RANGE};
use hand_fitter::data::{FitExporter, JointErrorStats};
use hand_fitter::labels::{read_label_file, target_from_label, LABEL_JOINT_COUNT};
use hand_fitter::reference::example_target;
use hand_fitter::skeleton::JOINTS_PER_FINGER;
use hand_fitter::{
    evaluate, AngleVector, AppConfig, EnergyKind, FitOutcome, Fitter, Finger, LossSample,
};
use nalgebra::DMatrix;
use std::f64::consts::{PI, TAU};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewMode {
    Skeleton,
    LossHistory,
}

enum FitMessage {
    Progress(LossSample, AngleVector),
    Finished(FitOutcome),
    Failed(String),
}

/// A fit running on a worker thread.
struct FitJob {
    receiver: Receiver<FitMessage>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for FitJob {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub struct HandViewerApp {
    config: AppConfig,

    // Model state
    theta: AngleVector,
    target: DMatrix<f64>,
    target_name: String,

    // Fitting
    job: Option<FitJob>,
    losses: Vec<LossSample>,
    last_outcome: Option<FitOutcome>,

    // UI State
    view_mode: ViewMode,
    camera: OrbitCamera,
    show_target: bool,
    show_residuals: bool,
    show_settings: bool,
    show_about: bool,
    label_path: String,
    status: String,

    // UI Components
    ui_components: UIComponents,
}

impl HandViewerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config = AppConfig::load_or_default(None).unwrap_or_else(|err| {
            warn!("Falling back to default configuration: {err:#}");
            AppConfig::default()
        });
        let theta = AngleVector::uniform(config.initial_angle);

        Self {
            theta,
            target: hand_fitter::reference::example_target_matrix2(),
            target_name: "Example 2".to_string(),
            job: None,
            losses: Vec::new(),
            last_outcome: None,
            view_mode: ViewMode::Skeleton,
            camera: OrbitCamera::default(),
            show_target: true,
            show_residuals: false,
            show_settings: false,
            show_about: false,
            label_path: String::new(),
            status: "Ready".to_string(),
            ui_components: UIComponents::new(),
            config,
        }
    }

    fn is_fitting(&self) -> bool {
        self.job.is_some()
    }

    fn start_fit(&mut self) {
        if self.is_fitting() {
            return;
        }

        let (sender, receiver) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let energy = self.config.energy;
        let target = self.target.clone();
        let skeleton = self.config.skeleton.clone();
        let params = self.config.fit.clone();
        let initial = self.theta;

        let handle = thread::spawn(move || {
            let progress = sender.clone();
            let result = Fitter::new(&energy, &target, &skeleton, initial, params).and_then(
                |fitter| {
                    fitter.run_with(Some(&worker_cancel), |sample, theta| {
                        let _ = progress.send(FitMessage::Progress(*sample, *theta));
                    })
                },
            );
            let message = match result {
                Ok(outcome) => FitMessage::Finished(outcome),
                Err(err) => FitMessage::Failed(err.to_string()),
            };
            let _ = sender.send(message);
        });

        self.losses.clear();
        self.last_outcome = None;
        self.status = format!("Fitting {} with {} energy...", self.target_name, energy);
        self.job = Some(FitJob {
            receiver,
            cancel,
            handle: Some(handle),
        });
    }

    fn cancel_fit(&mut self) {
        if let Some(job) = &self.job {
            job.cancel.store(true, Ordering::Relaxed);
            self.status = "Cancelling...".to_string();
        }
    }

    fn poll_fit(&mut self) {
        let Some(job) = &mut self.job else {
            return;
        };

        let mut finished = false;
        loop {
            match job.receiver.try_recv() {
                Ok(FitMessage::Progress(sample, theta)) => {
                    self.losses.push(sample);
                    self.theta = theta;
                }
                Ok(FitMessage::Finished(outcome)) => {
                    self.theta = outcome.theta;
                    self.losses = outcome.losses.clone();
                    self.status = match (outcome.cancelled, outcome.final_loss()) {
                        (true, _) => format!("Cancelled after {} iterations", outcome.iterations),
                        (false, Some(loss)) => format!("Finished: loss {loss:.3}"),
                        (false, None) => "Finished".to_string(),
                    };
                    self.last_outcome = Some(outcome);
                    finished = true;
                }
                Ok(FitMessage::Failed(message)) => {
                    error!("Fit failed: {message}");
                    self.status = format!("Fit failed: {message}");
                    finished = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    finished = true;
                    break;
                }
            }
        }

        if finished {
            if let Some(handle) = job.handle.take() {
                if handle.join().is_err() {
                    self.status = "Fit worker panicked".to_string();
                }
            }
            self.job = None;
        }
    }

    fn load_label(&mut self) {
        let path = self.label_path.trim().to_string();
        match read_label_file(&path, LABEL_JOINT_COUNT).and_then(|joints| target_from_label(&joints)) {
            Ok(target) => {
                info!(path = %path, "loaded label target");
                self.target = target;
                self.target_name = path;
                self.status = format!("Loaded {}", self.target_name);
            }
            Err(err) => {
                self.status = format!("Could not load label: {err}");
            }
        }
    }

    fn select_example(&mut self, number: u8) {
        if let Some(target) = example_target(number) {
            self.target = target;
            self.target_name = format!("Example {number}");
            self.status = format!("Selected {}", self.target_name);
        }
    }

    fn export_results(&mut self) {
        let Some(outcome) = &self.last_outcome else {
            self.status = "Nothing to export yet".to_string();
            return;
        };
        let pose = evaluate(&outcome.theta, &self.config.skeleton);
        let exporter = FitExporter::new(&self.config.output_directory, None);
        self.status = match exporter.export_all(outcome, &pose, &self.target) {
            Ok(dir) => format!("Exported to {}", dir.display()),
            Err(err) => format!("Export failed: {err:#}"),
        };
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(10.0);
            egui::menu::bar(ui, |ui| {
                ui.heading("Hand Skeleton Viewer");

                ui.separator();

                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.view_mode, ViewMode::Skeleton, "Skeleton");
                    ui.selectable_value(&mut self.view_mode, ViewMode::LossHistory, "Loss History");
                });

                ui.separator();

                ui.horizontal(|ui| {
                    for number in [1u8, 2] {
                        let name = format!("Example {number}");
                        if ui.selectable_label(self.target_name == name, name.as_str()).clicked() {
                            self.select_example(number);
                        }
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙ Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                    if ui.button("ℹ About").clicked() {
                        self.show_about = !self.show_about;
                    }
                });
            });
            ui.add_space(10.0);
        });
    }

    fn render_angle_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("angles")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.heading("Angle Vector");
                ui.add_enabled_ui(!self.is_fitting(), |ui| {
                    if ui.button("Reset").clicked() {
                        self.theta = AngleVector::uniform(self.config.initial_angle);
                    }

                    egui::ScrollArea::vertical().show(ui, |ui| {
                        let values = self.theta.as_mut_slice();

                        egui::CollapsingHeader::new("Wrist")
                            .default_open(true)
                            .show(ui, |ui| {
                                for (i, name) in WRIST_RANGE.zip(["x", "y", "z"]) {
                                    ui.add(egui::Slider::new(&mut values[i], -PI..=TAU).text(name));
                                }
                            });

                        for finger in Finger::ALL {
                            egui::CollapsingHeader::new(finger.name()).show(ui, |ui| {
                                for joint in 0..JOINTS_PER_FINGER {
                                    let i = finger_joint_index(finger, joint);
                                    ui.add(
                                        egui::Slider::new(&mut values[i], -PI..=TAU)
                                            .text(format!("joint {joint}")),
                                    );
                                }
                            });
                        }

                        egui::CollapsingHeader::new("Root translation").show(ui, |ui| {
                            for (i, name) in TRANSLATION_RANGE.zip(["x", "y", "z"]) {
                                ui.add(
                                    egui::Slider::new(&mut values[i], -200.0..=200.0)
                                        .text(name)
                                        .suffix(" mm"),
                                );
                            }
                        });
                    });
                });
            });
    }

    fn render_main_content(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| match self.view_mode {
            ViewMode::Skeleton => self.render_skeleton_view(ui),
            ViewMode::LossHistory => self.render_loss_view(ui),
        });
    }

    fn render_skeleton_view(&mut self, ui: &mut egui::Ui) {
        let fitted = evaluate(&self.theta, &self.config.skeleton);
        let target = pose_from_matrix(&self.target);

        ui.horizontal(|ui| {
            ui.checkbox(&mut self.show_target, "Target");
            ui.checkbox(&mut self.show_residuals, "Residuals");
            ui.label("Drag to orbit");
        });

        if let Ok(stats) = JointErrorStats::compute(&fitted, &self.target) {
            self.ui_components.draw_error_bar(ui, "Mean joint error", stats.mean);
            self.ui_components.draw_error_bar(ui, "Max joint error ", stats.max);
        }

        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::drag());
        self.camera.orbit(response.drag_delta());
        let rect = response.rect;
        painter.rect_filled(rect, egui::Rounding::same(8.0), self.ui_components.theme.surface);

        if let Some(target) = &target {
            if self.show_target {
                self.ui_components
                    .draw_hand(&painter, rect, &self.camera, target, true);
            }
            if self.show_residuals {
                self.ui_components
                    .draw_residuals(&painter, rect, &self.camera, &fitted, target);
            }
        }
        self.ui_components
            .draw_hand(&painter, rect, &self.camera, &fitted, false);
    }

    fn render_loss_view(&mut self, ui: &mut egui::Ui) {
        ui.heading("Loss History");
        if let Some(last) = self.losses.last() {
            ui.label(format!("Iteration {}: loss {:.4}", last.iteration, last.loss));
        }
        self.ui_components.draw_loss_chart(ui, &self.losses);
    }

    fn render_control_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                let fit_btn = if self.is_fitting() {
                    ui.add_sized(
                        [120.0, 40.0],
                        egui::Button::new("⏹ Cancel").fill(self.ui_components.theme.error),
                    )
                } else {
                    ui.add_sized(
                        [120.0, 40.0],
                        egui::Button::new("▶ Fit").fill(self.ui_components.theme.success),
                    )
                };
                if fit_btn.clicked() {
                    if self.is_fitting() {
                        self.cancel_fit();
                    } else {
                        self.start_fit();
                    }
                }

                ui.separator();

                let max_iterations = self.config.fit.max_iterations.max(1);
                let done = self.losses.last().map_or(0, |s| s.iteration + 1);
                ui.add(
                    egui::ProgressBar::new(done as f32 / max_iterations as f32)
                        .desired_width(200.0)
                        .show_percentage()
                        .animate(self.is_fitting()),
                );

                ui.separator();

                if ui
                    .add_enabled(self.last_outcome.is_some(), egui::Button::new("Export"))
                    .clicked()
                {
                    self.export_results();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        egui::RichText::new(&self.status)
                            .color(self.ui_components.theme.text_secondary),
                    );
                });
            });
            ui.add_space(10.0);
        });
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        let mut load_label = false;
        let fitting = self.is_fitting();

        egui::Window::new("Settings")
            .open(&mut self.show_settings)
            .resizable(true)
            .default_size([400.0, 500.0])
            .show(ctx, |ui| {
                ui.heading("Fit Settings");
                ui.add_space(10.0);

                ui.add_enabled_ui(!fitting, |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Iterations:");
                        ui.add(
                            egui::DragValue::new(&mut self.config.fit.max_iterations)
                                .clamp_range(0..=1_000_000),
                        );
                    });
                    ui.horizontal(|ui| {
                        ui.label("Learning rate:");
                        ui.add(
                            egui::DragValue::new(&mut self.config.fit.learning_rate)
                                .speed(1e-6)
                                .clamp_range(1e-9..=1.0),
                        );
                    });
                    ui.horizontal(|ui| {
                        ui.label("Log interval:");
                        ui.add(
                            egui::DragValue::new(&mut self.config.fit.log_interval)
                                .clamp_range(1..=100_000),
                        );
                    });

                    egui::ComboBox::from_label("Energy")
                        .selected_text(self.config.energy.to_string())
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut self.config.energy, EnergyKind::Total, "Total");
                            ui.selectable_value(&mut self.config.energy, EnergyKind::Position, "Position");
                            ui.selectable_value(&mut self.config.energy, EnergyKind::Limit, "Limit");
                        });
                });

                ui.separator();

                ui.heading("Target");
                ui.label("Label file:");
                ui.text_edit_singleline(&mut self.label_path);
                if ui.button("Load label").clicked() {
                    load_label = true;
                }

                ui.separator();

                ui.heading("View");
                ui.add(egui::Slider::new(&mut self.camera.zoom, 0.2..=5.0).text("Zoom"));
                if ui.button("Reset view").clicked() {
                    self.camera = OrbitCamera::default();
                }

                ui.separator();

                ui.heading("Output Settings");
                ui.label("Output Directory:");
                ui.label(self.config.output_directory.display().to_string());
            });

        if load_label {
            self.load_label();
        }
    }

    fn render_about_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("About")
            .open(&mut self.show_about)
            .resizable(false)
            .default_size([400.0, 300.0])
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading("Hand Skeleton Viewer");
                    ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                    ui.add_space(20.0);
                    ui.label("Forward kinematics and joint-angle fitting");
                    ui.label("for 21-joint hand skeletons.");
                });
            });
    }
}

impl eframe::App for HandViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_fit();

        self.render_header(ctx);
        self.render_control_panel(ctx);
        self.render_angle_panel(ctx);

        if self.show_settings {
            self.render_settings_window(ctx);
        }

        if self.show_about {
            self.render_about_window(ctx);
        }

        self.render_main_content(ctx);

        if self.is_fitting() {
            ctx.request_repaint();
        }
    }
}
