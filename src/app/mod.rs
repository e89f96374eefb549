use eframe::egui::{self, Align2, Color32, Context, FontId, Sense, vec2};

use crate::config::NetworkConfig;
use crate::driver::{DriverMode, FrameDriver};
use crate::sim::physics::PointerSample;

mod fps;
mod painter_surface;

pub use painter_surface::EguiSurface;

use fps::FpsCounter;

pub struct BackdropApp {
    driver: FrameDriver,
    background: Color32,
    fps: Option<FpsCounter>,
}

impl BackdropApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: NetworkConfig,
        mode: DriverMode,
        seed: Option<u64>,
        show_fps: bool,
    ) -> Self {
        let background = config.render.background;
        let mut driver = FrameDriver::new(config, mode, seed);
        driver.start(&cc.egui_ctx);
        tracing::info!(?mode, seed, "backdrop started");

        Self {
            driver,
            background: Color32::from_rgb(background.r, background.g, background.b),
            fps: show_fps.then(FpsCounter::default),
        }
    }
}

impl eframe::App for BackdropApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if let Some(fps) = &mut self.fps {
            fps.record(ctx.input(|input| input.stable_dt));
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(self.background))
            .show(ctx, |ui| {
                let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
                let painter = ui.painter_at(rect);

                let timestamp_ms = ctx.input(|input| input.time) * 1000.0;
                let pointer = ctx
                    .input(|input| input.pointer.hover_pos())
                    .filter(|position| rect.contains(*position))
                    .map(|position| PointerSample {
                        x: position.x - rect.min.x,
                        y: position.y - rect.min.y,
                        active: true,
                    });

                let mut surface = EguiSurface::new(&painter, rect);
                self.driver
                    .frame(timestamp_ms, (rect.width(), rect.height()), pointer, &mut surface, ctx);

                if let Some(text) = self.fps.as_ref().and_then(FpsCounter::display_text) {
                    painter.text(
                        rect.left_top() + vec2(12.0, 10.0),
                        Align2::LEFT_TOP,
                        text,
                        FontId::monospace(13.0),
                        Color32::from_gray(220),
                    );
                }
            });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.driver.stop();
        tracing::info!("backdrop stopped");
    }
}
