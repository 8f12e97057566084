// src/bin/hand_viewer/ui.rs
use egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use hand_fitter::fitter::LossSample;
use hand_fitter::skeleton::HAND_JOINT_COUNT;
use hand_fitter::{rotate, Axis, Finger, HandPose};
use nalgebra::{DMatrix, Vector3};

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub secondary: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(70, 130, 240),
            secondary: Color32::from_rgb(255, 152, 0),
            surface: Color32::from_rgb(30, 30, 35),
            error: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

impl Theme {
    pub fn finger_color(&self, finger: Finger) -> Color32 {
        match finger {
            Finger::Thumb => Color32::from_rgb(239, 83, 80),
            Finger::Index => self.secondary,
            Finger::Middle => Color32::from_rgb(255, 235, 59),
            Finger::Ring => self.success,
            Finger::Little => self.primary,
        }
    }
}

/// Orthographic view of the hand, turned by yaw then pitch.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub yaw: f64,
    pub pitch: f64,
    pub zoom: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            zoom: 1.0,
        }
    }
}

impl OrbitCamera {
    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw += f64::from(delta.x) * 0.01;
        self.pitch += f64::from(delta.y) * 0.01;
    }

    /// Millimetres to screen; the hand root sits at the centre of `rect`.
    pub fn project(&self, rect: Rect, point: &Vector3<f64>) -> Pos2 {
        let turned = rotate(Axis::X, &rotate(Axis::Y, point, self.yaw), self.pitch);
        let scale = self.zoom * rect.height().min(rect.width()) / 450.0;
        Pos2::new(
            rect.center().x + turned.x as f32 * scale,
            rect.center().y - turned.y as f32 * scale,
        )
    }
}

/// Reads a 20x3 or 21x3 joint matrix as a pose; a missing root is the origin.
pub fn pose_from_matrix(matrix: &DMatrix<f64>) -> Option<HandPose> {
    let offset = match matrix.shape() {
        (rows, 3) if rows == HAND_JOINT_COUNT => 0,
        (rows, 3) if rows == HAND_JOINT_COUNT + 1 => 1,
        _ => return None,
    };
    let row = |r: usize| Vector3::new(matrix[(r, 0)], matrix[(r, 1)], matrix[(r, 2)]);

    let root = if offset == 1 { row(0) } else { Vector3::zeros() };
    let mut joints = [Vector3::zeros(); HAND_JOINT_COUNT];
    for (i, joint) in joints.iter_mut().enumerate() {
        *joint = row(i + offset);
    }
    Some(HandPose { root, joints })
}

pub struct UIComponents {
    pub theme: Theme,
}

impl UIComponents {
    pub fn new() -> Self {
        Self {
            theme: Theme::default(),
        }
    }

    pub fn draw_hand(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        camera: &OrbitCamera,
        pose: &HandPose,
        faded: bool,
    ) {
        for (finger, from, to) in pose.bone_segments() {
            let mut color = self.theme.finger_color(finger);
            if faded {
                color = color.gamma_multiply(0.35);
            }
            let width = if faded { 1.5 } else { 3.0 };
            painter.line_segment(
                [camera.project(rect, &from), camera.project(rect, &to)],
                Stroke::new(width, color),
            );
        }

        for joint in &pose.joints {
            let pos = camera.project(rect, joint);
            if faded {
                painter.circle_stroke(pos, 4.0, Stroke::new(1.0, self.theme.text_secondary));
            } else {
                painter.circle_filled(pos, 3.5, self.theme.text_primary);
            }
        }
        painter.circle_filled(camera.project(rect, &pose.root), 5.0, self.theme.error);
    }

    pub fn draw_residuals(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        camera: &OrbitCamera,
        fitted: &HandPose,
        target: &HandPose,
    ) {
        let stroke = Stroke::new(1.0, self.theme.error.gamma_multiply(0.6));
        for (a, b) in fitted.joints.iter().zip(&target.joints) {
            painter.line_segment([camera.project(rect, a), camera.project(rect, b)], stroke);
        }
    }

    pub fn draw_loss_chart(&self, ui: &mut egui::Ui, losses: &[LossSample]) {
        let size = Vec2::new(ui.available_width(), ui.available_height().max(200.0));
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());
        let painter = ui.painter();
        painter.rect_filled(rect, egui::Rounding::same(8.0), self.theme.surface);

        if losses.len() < 2 {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No loss history yet",
                egui::FontId::proportional(16.0),
                self.theme.text_secondary,
            );
            return;
        }

        let plot = rect.shrink(30.0);
        let min = losses.iter().map(|s| s.loss).fold(f64::INFINITY, f64::min);
        let max = losses.iter().map(|s| s.loss).fold(f64::NEG_INFINITY, f64::max);
        let span = (max - min).max(f64::EPSILON);
        let last_iteration = losses.last().map_or(1, |s| s.iteration.max(1));

        let points: Vec<Pos2> = losses
            .iter()
            .map(|s| {
                let x = plot.left() + plot.width() * s.iteration as f32 / last_iteration as f32;
                let y = plot.bottom() - plot.height() * ((s.loss - min) / span) as f32;
                Pos2::new(x, y)
            })
            .collect();
        painter.add(egui::Shape::line(points, Stroke::new(2.0, self.theme.primary)));

        painter.text(
            plot.left_top(),
            egui::Align2::LEFT_BOTTOM,
            format!("{max:.1}"),
            egui::FontId::proportional(12.0),
            self.theme.text_secondary,
        );
        painter.text(
            plot.left_bottom(),
            egui::Align2::LEFT_TOP,
            format!("{min:.1}"),
            egui::FontId::proportional(12.0),
            self.theme.text_secondary,
        );
        painter.text(
            plot.right_bottom(),
            egui::Align2::RIGHT_TOP,
            format!("iteration {last_iteration}"),
            egui::FontId::proportional(12.0),
            self.theme.text_secondary,
        );
    }

    /// Horizontal bar for a joint error in millimetres; green when small.
    pub fn draw_error_bar(&self, ui: &mut egui::Ui, label: &str, error_mm: f64) {
        ui.horizontal(|ui| {
            ui.label(label);

            let bar_width = 200.0;
            let bar_height = 20.0;
            let rect = ui.allocate_space(Vec2::new(bar_width, bar_height)).1;

            let painter = ui.painter();
            painter.rect_filled(rect, egui::Rounding::same(4.0), self.theme.surface);

            // Full bar at 50 mm.
            let value = (error_mm / 50.0).clamp(0.0, 1.0) as f32;
            let fill_rect = Rect::from_min_size(rect.min, Vec2::new(bar_width * value, bar_height));
            let color = if error_mm < 5.0 {
                self.theme.success
            } else if error_mm < 20.0 {
                self.theme.warning
            } else {
                self.theme.error
            };
            painter.rect_filled(fill_rect, egui::Rounding::same(4.0), color);

            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                format!("{error_mm:.1} mm"),
                egui::FontId::proportional(12.0),
                self.theme.text_primary,
            );
        });
    }
}
