//! GUI module - application state and egui rendering
//!
//! Drives one comparison session: two image panes, keyboard decisions,
//! and the popups that close the session out.

use std::collections::HashMap;
use std::path::PathBuf;

use eframe::egui;
use rfd::FileDialog;

use crate::file_ops::{FolderStore, StorageError};
use crate::scanner::SessionConfig;
use crate::scheduler::{Decision, ImageId, ImageStore, NextPair, PairScheduler};

const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(0x20, 0x20, 0x20);
const DIVIDER_COLOR: egui::Color32 = egui::Color32::from_rgb(0x40, 0x40, 0x40);
const DIVIDER_WIDTH: f32 = 4.0;
const PANE_PADDING: f32 = 40.0;
const MAX_TEXTURE_SIDE: u32 = 2048;

/// Key triggers for each decision. Arrow keys plus their WASD aliases
/// by default.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub keep_both: Vec<egui::Key>,
    pub discard_left: Vec<egui::Key>,
    pub discard_right: Vec<egui::Key>,
    pub discard_both: Vec<egui::Key>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            keep_both: vec![egui::Key::ArrowUp, egui::Key::W],
            discard_left: vec![egui::Key::ArrowLeft, egui::Key::A],
            discard_right: vec![egui::Key::ArrowRight, egui::Key::D],
            discard_both: vec![egui::Key::ArrowDown, egui::Key::S],
        }
    }
}

impl KeyBindings {
    fn decision_for_key(&self, key: egui::Key) -> Option<Decision> {
        for (keys, decision) in [
            (&self.keep_both, Decision::KeepBoth),
            (&self.discard_left, Decision::DiscardLeft),
            (&self.discard_right, Decision::DiscardRight),
            (&self.discard_both, Decision::DiscardBoth),
        ] {
            if keys.contains(&key) {
                return Some(decision);
            }
        }
        None
    }

    /// Map this frame's key presses to a decision, ignoring auto-repeat.
    fn decision(&self, input: &egui::InputState) -> Option<Decision> {
        input.events.iter().find_map(|event| match event {
            egui::Event::Key {
                key,
                pressed: true,
                repeat: false,
                ..
            } => self.decision_for_key(*key),
            _ => None,
        })
    }
}

#[derive(Clone)]
enum SessionView {
    Comparing { left: ImageId, right: ImageId },
    FinalPair { left: ImageId, right: ImageId },
    Remainder(ImageId),
    SelectFolder,
    Finished,
}

#[derive(Clone)]
enum MessageType {
    Info,
    Success,
    Error,
}

/// Application state
pub struct PairCullApp {
    store: FolderStore,
    scheduler: PairScheduler,
    bindings: KeyBindings,
    view: SessionView,
    loaded_images: HashMap<ImageId, egui::TextureHandle>,
    status_message: Option<(String, MessageType)>,
    remaining: usize,
    fatal_error: Option<StorageError>,
}

impl PairCullApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: SessionConfig) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let mut app = Self {
            store: FolderStore::new(config),
            scheduler: PairScheduler::new(),
            bindings: KeyBindings::default(),
            view: SessionView::SelectFolder,
            loaded_images: HashMap::new(),
            status_message: None,
            remaining: 0,
            fatal_error: None,
        };
        app.advance();
        app
    }

    /// Ask the scheduler what to show next and update the view.
    fn advance(&mut self) {
        match self.scheduler.next_pair(&self.store) {
            Ok(NextPair::Pair(left, right)) => {
                self.view = SessionView::Comparing { left, right };
            }
            Ok(NextPair::FinalPair(left, right)) => {
                self.status_message =
                    Some(("2 images remaining".to_string(), MessageType::Success));
                self.view = SessionView::FinalPair { left, right };
            }
            Ok(NextPair::Remainder(id)) => {
                self.status_message =
                    Some(("1 image remaining".to_string(), MessageType::Success));
                self.view = SessionView::Remainder(id);
            }
            Ok(NextPair::Ended) => {
                if matches!(self.view, SessionView::SelectFolder) {
                    // Nothing was ever comparable here; let the user pick
                    // another folder instead of closing.
                    self.status_message = Some((
                        "No images found. Select another folder.".to_string(),
                        MessageType::Error,
                    ));
                } else {
                    self.view = SessionView::Finished;
                }
            }
            Err(err) => {
                log::error!("session aborted: {err}");
                self.fatal_error = Some(err);
            }
        }

        self.remaining = self
            .store
            .list_eligible()
            .map(|listing| listing.len())
            .unwrap_or(0);
    }

    fn handle_decision(&mut self, decision: Decision) {
        let SessionView::Comparing { left, right } = self.view.clone() else {
            return;
        };

        if let Err(err) = self
            .scheduler
            .apply_decision(&mut self.store, &left, &right, decision)
        {
            log::error!("session aborted: {err}");
            self.fatal_error = Some(err);
            return;
        }

        self.status_message = Some(match decision {
            Decision::KeepBoth => ("Kept both".to_string(), MessageType::Info),
            Decision::DiscardLeft => (format!("Discarded {left}"), MessageType::Success),
            Decision::DiscardRight => (format!("Discarded {right}"), MessageType::Success),
            Decision::DiscardBoth => (
                format!("Discarded {left} and {right}"),
                MessageType::Success,
            ),
        });

        match decision {
            Decision::KeepBoth => {}
            Decision::DiscardLeft => self.forget_texture(&left),
            Decision::DiscardRight => self.forget_texture(&right),
            Decision::DiscardBoth => {
                self.forget_texture(&left);
                self.forget_texture(&right);
            }
        }

        self.advance();
    }

    fn forget_texture(&mut self, id: &ImageId) {
        self.loaded_images.remove(id);
    }

    fn select_folder(&mut self) {
        let start = dirs::picture_dir().unwrap_or_else(|| self.store.config().folder.clone());
        if let Some(folder) = FileDialog::new().set_directory(start).pick_folder() {
            self.restart(folder);
        }
    }

    fn restart(&mut self, folder: PathBuf) {
        log::info!("Comparing images in {}", folder.display());
        self.store = FolderStore::new(SessionConfig::new(folder));
        self.scheduler = PairScheduler::new();
        self.loaded_images.clear();
        self.status_message = None;
        self.view = SessionView::SelectFolder;
        self.advance();
    }

    fn load_image_texture(
        &mut self,
        ctx: &egui::Context,
        id: &ImageId,
    ) -> Option<egui::TextureHandle> {
        if let Some(texture) = self.loaded_images.get(id) {
            return Some(texture.clone());
        }

        let path = self.store.config().folder.join(id.as_str());
        match image::open(&path) {
            Ok(img) => {
                // Downscale before upload to keep texture memory bounded
                let img = img.thumbnail(MAX_TEXTURE_SIDE, MAX_TEXTURE_SIDE).to_rgba8();
                let size = [img.width() as usize, img.height() as usize];
                let pixels = img.into_raw();
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &pixels);
                let texture =
                    ctx.load_texture(id.as_str(), color_image, egui::TextureOptions::LINEAR);
                self.loaded_images.insert(id.clone(), texture.clone());
                Some(texture)
            }
            Err(err) => {
                log::warn!("failed to decode {}: {}", id, err);
                None
            }
        }
    }

    fn render_pane(
        &mut self,
        ui: &mut egui::Ui,
        ctx: &egui::Context,
        id: &ImageId,
        rect: egui::Rect,
    ) {
        let inner = rect.shrink(PANE_PADDING);

        match self.load_image_texture(ctx, id) {
            Some(texture) => {
                let size = texture.size_vec2();
                let scale = (inner.width() / size.x)
                    .min(inner.height() / size.y)
                    .min(1.0);
                let image_rect = egui::Rect::from_center_size(inner.center(), size * scale);
                ui.painter().image(
                    texture.id(),
                    image_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                ui.painter().text(
                    inner.center(),
                    egui::Align2::CENTER_CENTER,
                    format!("Could not load {}", id),
                    egui::FontId::proportional(16.0),
                    egui::Color32::LIGHT_GRAY,
                );
            }
        }
    }

    fn render_pair(
        &mut self,
        ui: &mut egui::Ui,
        ctx: &egui::Context,
        left: &ImageId,
        right: &ImageId,
    ) {
        let rect = ui.max_rect();
        let center_x = rect.center().x;

        let left_rect = egui::Rect::from_min_max(rect.min, egui::pos2(center_x, rect.max.y));
        let right_rect = egui::Rect::from_min_max(egui::pos2(center_x, rect.min.y), rect.max);

        self.render_pane(ui, ctx, left, left_rect);
        self.render_pane(ui, ctx, right, right_rect);

        ui.painter().line_segment(
            [
                egui::pos2(center_x, rect.top()),
                egui::pos2(center_x, rect.bottom()),
            ],
            egui::Stroke::new(DIVIDER_WIDTH, DIVIDER_COLOR),
        );
    }

    fn render_central(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        match self.view.clone() {
            SessionView::Comparing { left, right } | SessionView::FinalPair { left, right } => {
                self.render_pair(ui, ctx, &left, &right);
            }
            SessionView::Remainder(id) => {
                let rect = ui.max_rect();
                self.render_pane(ui, ctx, &id, rect);
            }
            SessionView::SelectFolder => {
                ui.vertical_centered(|ui| {
                    ui.add_space(60.0);
                    ui.label(egui::RichText::new("No images to compare in this folder.").size(16.0));
                    ui.add_space(12.0);
                    if ui.button("Select image folder").clicked() {
                        self.select_folder();
                    }
                });
            }
            SessionView::Finished => {}
        }
    }

    fn render_session_popup(&mut self, ctx: &egui::Context) {
        let (title, names) = match &self.view {
            SessionView::FinalPair { left, right } => {
                ("2 images remaining", vec![left.clone(), right.clone()])
            }
            SessionView::Remainder(id) => ("1 image remaining", vec![id.clone()]),
            _ => return,
        };

        egui::Window::new("Image Comparison")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(title);
                ui.add_space(4.0);
                for name in &names {
                    ui.label(egui::RichText::new(name.as_str()).small());
                }
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        self.advance();
                    }
                    if ui.button("Open folder").clicked() {
                        let _ = open::that(self.store.config().folder.clone());
                    }
                });
            });
    }

    fn render_fatal_error(&mut self, ctx: &egui::Context) {
        let message = match &self.fatal_error {
            Some(err) => err.to_string(),
            None => return,
        };

        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new("The session cannot continue.")
                        .color(egui::Color32::RED)
                        .strong(),
                );
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("Exit").clicked() {
                    std::process::exit(1);
                }
            });
    }

    fn render_status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let Some((msg, msg_type)) = &self.status_message {
                let color = match msg_type {
                    MessageType::Info => egui::Color32::GRAY,
                    MessageType::Success => egui::Color32::from_rgb(100, 255, 100),
                    MessageType::Error => egui::Color32::RED,
                };
                ui.label(egui::RichText::new(msg).color(color));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!(
                    "Round {} | {} images left",
                    self.scheduler.round(),
                    self.remaining
                ));
                ui.separator();
                ui.label(
                    egui::RichText::new(
                        "W keep both | A discard left | D discard right | S discard both",
                    )
                    .small(),
                );
            });
        });
    }
}

impl eframe::App for PairCullApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.fatal_error.is_none() {
            if matches!(self.view, SessionView::Comparing { .. }) {
                if let Some(decision) = ctx.input(|i| self.bindings.decision(i)) {
                    self.handle_decision(decision);
                }
            }
        }

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(28.0)
            .show(ctx, |ui| {
                self.render_status_bar(ui);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(BACKGROUND))
            .show(ctx, |ui| {
                self.render_central(ui, ctx);
            });

        self.render_session_popup(ctx);
        self.render_fatal_error(ctx);

        if self.fatal_error.is_none() && matches!(self.view, SessionView::Finished) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_cover_all_decisions() {
        let bindings = KeyBindings::default();

        assert_eq!(
            bindings.decision_for_key(egui::Key::W),
            Some(Decision::KeepBoth)
        );
        assert_eq!(
            bindings.decision_for_key(egui::Key::ArrowUp),
            Some(Decision::KeepBoth)
        );
        assert_eq!(
            bindings.decision_for_key(egui::Key::A),
            Some(Decision::DiscardLeft)
        );
        assert_eq!(
            bindings.decision_for_key(egui::Key::ArrowLeft),
            Some(Decision::DiscardLeft)
        );
        assert_eq!(
            bindings.decision_for_key(egui::Key::D),
            Some(Decision::DiscardRight)
        );
        assert_eq!(
            bindings.decision_for_key(egui::Key::ArrowRight),
            Some(Decision::DiscardRight)
        );
        assert_eq!(
            bindings.decision_for_key(egui::Key::S),
            Some(Decision::DiscardBoth)
        );
        assert_eq!(
            bindings.decision_for_key(egui::Key::ArrowDown),
            Some(Decision::DiscardBoth)
        );
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let bindings = KeyBindings::default();

        assert_eq!(bindings.decision_for_key(egui::Key::Q), None);
        assert_eq!(bindings.decision_for_key(egui::Key::Space), None);
        assert_eq!(bindings.decision_for_key(egui::Key::Enter), None);
    }

    #[test]
    fn rebound_keys_take_effect() {
        let bindings = KeyBindings {
            discard_both: vec![egui::Key::X],
            ..KeyBindings::default()
        };

        assert_eq!(
            bindings.decision_for_key(egui::Key::X),
            Some(Decision::DiscardBoth)
        );
        assert_eq!(bindings.decision_for_key(egui::Key::ArrowDown), None);
    }
}
