// src/bin/hand_viewer/main.rs
mod app;
mod ui;

use eframe::egui;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 700.0]),
        centered: true,
        ..Default::default()
    };

    let result = eframe::run_native(
        "Hand Skeleton Viewer",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(create_visuals());
            Box::new(app::HandViewerApp::new(cc))
        }),
    );

    if let Err(e) = result {
        eprintln!("Error running application: {:?}", e);
    }
}

fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(30, 30, 35);
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(55, 55, 65);
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(70, 130, 240);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals.window_rounding = egui::Rounding::same(12.0);

    visuals
}
